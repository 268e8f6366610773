use std::fmt;

use crate::ir::ast::{BinaryOperator, CompareOperator};

/// Временная переменная `tN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp(pub u32);

/// Метка перехода `LN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Значение-операнд: имя/число из исходника или временная переменная
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Name(String),
    Temp(Temp),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Temp(temp) => write!(f, "{}", temp),
        }
    }
}

/// Оператор инструкции `t := a op b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacOperator {
    Arithmetic(BinaryOperator),
    Compare(CompareOperator),
}

impl TacOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Arithmetic(op) => op.symbol(),
            Self::Compare(op) => op.symbol(),
        }
    }
}

impl fmt::Display for TacOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// name := value
    Copy { target: String, value: Operand },
    /// t1 := a + b
    Binary {
        target: Temp,
        left: Operand,
        op: TacOperator,
        right: Operand,
    },
    /// if not cond goto L1
    JumpIfNot { condition: Operand, label: Label },
    /// if cond goto L1
    JumpIf { condition: Operand, label: Label },
    /// goto L1
    Jump(Label),
    /// L1:
    Label(Label),
    /// log value
    LogValue(Operand),
    /// log "text"
    LogText(String),
    /// func name(a, b):
    FuncBegin { name: String, params: Vec<String> },
    /// end name
    FuncEnd { name: String },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { target, value } => write!(f, "{} := {}", target, value),
            Self::Binary { target, left, op, right } => {
                write!(f, "{} := {} {} {}", target, left, op, right)
            }
            Self::JumpIfNot { condition, label } => {
                write!(f, "if not {} goto {}", condition, label)
            }
            Self::JumpIf { condition, label } => write!(f, "if {} goto {}", condition, label),
            Self::Jump(label) => write!(f, "goto {}", label),
            Self::Label(label) => write!(f, "{}:", label),
            Self::LogValue(value) => write!(f, "log {}", value),
            Self::LogText(text) => write!(f, "log \"{}\"", text),
            Self::FuncBegin { name, params } => write!(f, "func {}({}):", name, params.join(", ")),
            Self::FuncEnd { name } => write!(f, "end {}", name),
        }
    }
}

/// Результат одного прогона понижения
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TacProgram {
    pub instructions: Vec<Instruction>,
}

impl TacProgram {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Текстовые строки листинга, по одной на инструкцию
    pub fn lines(&self) -> Vec<String> {
        self.instructions.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for TacProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}
