//! Фронтенд SimpleScript: исходник -> токены -> AST -> трёхадресный код.

pub mod backends;
pub mod error;
pub mod ir;
pub mod parser;
pub mod span;

pub use error::{CompileError, Expected};
pub use ir::tac::TacProgram;

/// Полный прогон: разбор и понижение в TAC со свежими счётчиками
pub fn compile(source: &str) -> Result<TacProgram, CompileError> {
    let program = parser::parse(source)?;
    backends::tac::lower(&program)
}
