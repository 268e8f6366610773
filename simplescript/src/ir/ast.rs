#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Последовательность операторов: тело функции, цикла, ветки if
pub type Block = Vec<Statement>;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// присваивание, например: x := y + 1
    Assign {
        target: String,
        value: Expression,
    },
    /// ? x > 0 do ... : ... end
    If {
        condition: Expression,
        then_branch: Block,
        else_branch: Block,
    },
    /// repeat ... until x > 10
    Loop {
        body: Block,
        condition: Expression,
    },
    /// func add(a, b) do ... end
    FuncDef {
        name: String,
        params: Vec<String>,
        body: Block,
    },
    /// вызов как оператор: draw(x, y)
    Call(FuncCall),
    /// return или return x + 1
    Return(Option<Expression>),
    /// log("text") или log(x)
    Log(LogArgument),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogArgument {
    /// Строковый литерал без кавычек
    Text(String),
    Value(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// 10, 3.14 - текст числа хранится как есть
    Number(String),
    /// x, counter
    Identifier(String),
    /// a + 5
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// a >= b
    Compare {
        op: CompareOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// a > 0 && b > 0
    Logical {
        op: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// f(x, 1)
    Call(FuncCall),
}

/// Цепочка `1 + 1 + ...` из тысяч слагаемых - это дерево такой же глубины,
/// поэтому поддеревья освобождаются через явный стек, а не рекурсией.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        take_children(self, &mut stack);
        while let Some(mut expr) = stack.pop() {
            take_children(&mut expr, &mut stack);
        }
    }
}

fn take_children(expr: &mut Expression, stack: &mut Vec<Expression>) {
    match expr {
        Expression::BinaryOp { left, right, .. }
        | Expression::Compare { left, right, .. }
        | Expression::Logical { left, right, .. } => {
            stack.push(std::mem::replace(&mut **left, Expression::Number(String::new())));
            stack.push(std::mem::replace(&mut **right, Expression::Number(String::new())));
        }
        Expression::Call(call) => stack.append(&mut call.args),
        Expression::Number(_) | Expression::Identifier(_) => {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Greater,      // >
    Less,         // <
    Equal,        // ==
    NotEqual,     // !=
    GreaterEqual, // >=
    LessEqual,    // <=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And, // &&
    Or,  // ||
}

impl BinaryOperator {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    /// Аддитивные операторы связывают слабее мультипликативных
    pub fn is_additive(&self) -> bool {
        matches!(self, Self::Add | Self::Subtract)
    }
}

impl CompareOperator {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            ">=" => Some(Self::GreaterEqual),
            "<=" => Some(Self::LessEqual),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
        }
    }
}

impl LogicalOperator {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "&&" => Some(Self::And),
            "||" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_chain_drops_without_overflow() {
        let mut expr = Expression::Number("0".to_string());
        for i in 0..200_000 {
            expr = Expression::BinaryOp {
                op: BinaryOperator::Add,
                left: Box::new(expr),
                right: Box::new(Expression::Identifier(format!("x{}", i))),
            };
        }
        let right_deep = (0..200_000).fold(Expression::Number("1".to_string()), |inner, _| {
            Expression::Call(FuncCall { name: "f".to_string(), args: vec![inner] })
        });
        drop(expr);
        drop(right_deep);
    }
}
