use std::fmt;

use thiserror::Error;

use crate::parser::lexer::TokenKind;
use crate::span::Span;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Syntax error at {span}: expected {expected}, found {found}{suffix}", suffix = describe_text(.text))]
    SyntaxError {
        expected: Expected,
        found: TokenKind,
        text: Option<String>,
        span: Span,
    },

    /// Скобки, вызовы или блоки вложены глубже допустимого
    #[error("Nesting too deep at {span}: more than {limit} levels")]
    NestingTooDeep { limit: usize, span: Span },

    /// Конструкция разобрана, но для неё нет правила понижения в TAC
    #[error("Unsupported construct in TAC lowering: {construct}")]
    Unsupported { construct: &'static str },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

/// Что парсер ожидал увидеть в месте ошибки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Любой токен данной категории
    Kind(TokenKind),
    /// Конкретный токен: `do`, `end`, `(`, `:` ...
    Lexeme(TokenKind, &'static str),
    Statement,
    Expression,
}

impl Expected {
    /// Категория токена, если ожидание сводится к одной категории
    pub fn kind(&self) -> Option<TokenKind> {
        match self {
            Self::Kind(kind) | Self::Lexeme(kind, _) => Some(*kind),
            Self::Statement | Self::Expression => None,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "{}", kind),
            Self::Lexeme(kind, lexeme) => write!(f, "{} '{}'", kind, lexeme),
            Self::Statement => write!(f, "a statement"),
            Self::Expression => write!(f, "an expression"),
        }
    }
}

fn describe_text(text: &Option<String>) -> String {
    match text {
        Some(text) => format!(" '{}'", text),
        None => String::new(),
    }
}
