pub mod tac;

use crate::ir::ast;
use crate::error::CompileError;

/// Бэкенд превращает AST в текстовый листинг целевого представления
pub trait Backend {
    fn compile(&mut self, program: &ast::Program) -> Result<String, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Tac,
}

impl BackendType {
    pub fn all() -> Vec<Self> {
        vec![Self::Tac]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|b| b.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tac => "tac",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Tac => "Three-address code listing",
        }
    }

    /// Расширение выходного файла по умолчанию
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tac => "tac",
        }
    }

    pub fn create(&self) -> Box<dyn Backend> {
        match self {
            Self::Tac => Box::new(tac::TacBackend::new()),
        }
    }
}
