use crate::error::{CompileError, Expected};
use crate::ir::ast;
use super::lexer::{Token, TokenKind};

/// Предел вложенности выражений и блоков: дальше рекурсивный спуск
/// рискует переполнить стек
pub const MAX_NESTING: usize = 128;

pub fn parse_tokens(tokens: Vec<Token>) -> Result<ast::Program, CompileError> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        // Последовательность всегда заканчивается EOF, даже если её собрали вручную
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token { kind: TokenKind::Eof, text: None, span });
        }
        Self { tokens, position: 0, depth: 0 }
    }

    fn parse_program(&mut self) -> Result<ast::Program, CompileError> {
        let statements = self.parse_statement_list()?;
        // `end`, `until` или `:` на верхнем уровне ничему не соответствуют
        self.expect_kind(TokenKind::Eof)?;
        Ok(ast::Program { statements })
    }

    fn parse_statement_list(&mut self) -> Result<ast::Block, CompileError> {
        self.enter()?;
        let block = self.parse_statements();
        self.leave();
        block
    }

    fn parse_statements(&mut self) -> Result<ast::Block, CompileError> {
        let mut statements = Vec::new();
        while !self.is_terminator() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn is_terminator(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Eof
            || token.is(TokenKind::Keyword, "end")
            || token.is(TokenKind::Keyword, "until")
            || token.is(TokenKind::Delimiter, ":")
    }

    fn parse_statement(&mut self) -> Result<ast::Statement, CompileError> {
        let token = self.peek();
        match (token.kind, token.text()) {
            (TokenKind::Identifier, _) => self.parse_assignment_or_call(),
            (TokenKind::Question, _) => self.parse_if(),
            (TokenKind::Keyword, Some("repeat")) => self.parse_loop(),
            (TokenKind::Keyword, Some("func")) => self.parse_function_def(),
            (TokenKind::Keyword, Some("log")) => self.parse_log(),
            (TokenKind::Keyword, Some("return")) => self.parse_return(),
            _ => Err(self.error(Expected::Statement)),
        }
    }

    fn parse_assignment_or_call(&mut self) -> Result<ast::Statement, CompileError> {
        let name = self.expect_kind(TokenKind::Identifier)?;

        if self.peek().kind == TokenKind::Assign {
            self.advance(); // consume ':='
            let value = self.parse_expression()?;
            Ok(ast::Statement::Assign { target: name, value })
        } else if self.check(TokenKind::Delimiter, "(") {
            Ok(ast::Statement::Call(self.parse_function_call(name)?))
        } else {
            Err(self.error(Expected::Kind(TokenKind::Assign)))
        }
    }

    fn parse_if(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect_kind(TokenKind::Question)?;
        let condition = self.parse_expression()?;
        self.expect_lexeme(TokenKind::Keyword, "do")?;

        let then_branch = self.parse_statement_list()?;
        // else-ветка обязательна, `:` отделяет её от then
        self.expect_lexeme(TokenKind::Delimiter, ":")?;
        let else_branch = self.parse_statement_list()?;

        self.expect_lexeme(TokenKind::Keyword, "end")?;
        Ok(ast::Statement::If { condition, then_branch, else_branch })
    }

    fn parse_loop(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect_lexeme(TokenKind::Keyword, "repeat")?;
        let body = self.parse_statement_list()?;
        self.expect_lexeme(TokenKind::Keyword, "until")?;
        let condition = self.parse_expression()?;
        Ok(ast::Statement::Loop { body, condition })
    }

    fn parse_function_def(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect_lexeme(TokenKind::Keyword, "func")?;
        let name = self.expect_kind(TokenKind::Identifier)?;
        self.expect_lexeme(TokenKind::Delimiter, "(")?;
        let params = self.parse_param_list()?;
        self.expect_lexeme(TokenKind::Delimiter, ")")?;
        self.expect_lexeme(TokenKind::Keyword, "do")?;
        let body = self.parse_statement_list()?;
        self.expect_lexeme(TokenKind::Keyword, "end")?;
        Ok(ast::Statement::FuncDef { name, params, body })
    }

    fn parse_log(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect_lexeme(TokenKind::Keyword, "log")?;
        self.expect_lexeme(TokenKind::Delimiter, "(")?;

        let argument = if self.peek().kind == TokenKind::String {
            let literal = self.expect_kind(TokenKind::String)?;
            ast::LogArgument::Text(strip_quotes(&literal).to_string())
        } else {
            ast::LogArgument::Value(self.parse_expression()?)
        };

        self.expect_lexeme(TokenKind::Delimiter, ")")?;
        Ok(ast::Statement::Log(argument))
    }

    fn parse_return(&mut self) -> Result<ast::Statement, CompileError> {
        self.expect_lexeme(TokenKind::Keyword, "return")?;

        // Выражение есть, только если дальше не DELIMITER, не KEYWORD и не конец.
        // Эвристика: выражение не может начинаться с ключевого слова.
        let value = match self.peek().kind {
            TokenKind::Delimiter | TokenKind::Keyword | TokenKind::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        Ok(ast::Statement::Return(value))
    }

    fn parse_param_list(&mut self) -> Result<Vec<String>, CompileError> {
        let mut params = Vec::new();
        if self.check(TokenKind::Delimiter, ")") {
            return Ok(params);
        }

        params.push(self.expect_kind(TokenKind::Identifier)?);
        while self.check(TokenKind::Delimiter, ",") {
            self.advance(); // consume ','
            params.push(self.expect_kind(TokenKind::Identifier)?);
        }
        Ok(params)
    }

    /// Имя функции уже съедено, текущий токен - `(`
    fn parse_function_call(&mut self, name: String) -> Result<ast::FuncCall, CompileError> {
        self.expect_lexeme(TokenKind::Delimiter, "(")?;
        let args = self.parse_arg_list()?;
        self.expect_lexeme(TokenKind::Delimiter, ")")?;
        Ok(ast::FuncCall { name, args })
    }

    fn parse_arg_list(&mut self) -> Result<Vec<ast::Expression>, CompileError> {
        let mut args = Vec::new();
        if self.check(TokenKind::Delimiter, ")") {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.check(TokenKind::Delimiter, ",") {
            self.advance(); // consume ','
            args.push(self.parse_expression()?);
        }
        Ok(args)
    }

    /// Каждое выражение в скобках или аргументе вызова - новый уровень вложенности
    fn parse_expression(&mut self) -> Result<ast::Expression, CompileError> {
        self.enter()?;
        let expr = self.parse_logical();
        self.leave();
        expr
    }

    fn parse_logical(&mut self) -> Result<ast::Expression, CompileError> {
        let mut left = self.parse_comparison()?;

        while let Some(op) = self.peek_operator().and_then(ast::LogicalOperator::from_lexeme) {
            self.advance(); // consume '&&' / '||'
            let right = self.parse_comparison()?;
            left = ast::Expression::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<ast::Expression, CompileError> {
        let mut left = self.parse_term()?;

        while let Some(op) = self.peek_operator().and_then(ast::CompareOperator::from_lexeme) {
            self.advance();
            let right = self.parse_term()?;
            left = ast::Expression::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<ast::Expression, CompileError> {
        let mut left = self.parse_factor()?;

        while let Some(op) = self
            .peek_operator()
            .and_then(ast::BinaryOperator::from_lexeme)
            .filter(|op| op.is_additive())
        {
            self.advance(); // consume '+' / '-'
            let right = self.parse_factor()?;
            left = ast::Expression::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<ast::Expression, CompileError> {
        let mut left = self.parse_primary()?;

        while let Some(op) = self
            .peek_operator()
            .and_then(ast::BinaryOperator::from_lexeme)
            .filter(|op| !op.is_additive())
        {
            self.advance(); // consume '*' / '/'
            let right = self.parse_primary()?;
            left = ast::Expression::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<ast::Expression, CompileError> {
        match self.peek().kind {
            TokenKind::Identifier => {
                let name = self.expect_kind(TokenKind::Identifier)?;
                if self.check(TokenKind::Delimiter, "(") {
                    Ok(ast::Expression::Call(self.parse_function_call(name)?))
                } else {
                    Ok(ast::Expression::Identifier(name))
                }
            }
            TokenKind::Number => {
                let text = self.expect_kind(TokenKind::Number)?;
                Ok(ast::Expression::Number(text))
            }
            TokenKind::Delimiter if self.check(TokenKind::Delimiter, "(") => {
                self.advance(); // consume '('
                let expr = self.parse_expression()?;
                self.expect_lexeme(TokenKind::Delimiter, ")")?;
                Ok(expr)
            }
            _ => Err(self.error(Expected::Expression)),
        }
    }

    // Вспомогательные методы
    fn enter(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::NestingTooDeep {
                limit: MAX_NESTING,
                span: self.peek().span,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_operator(&self) -> Option<&str> {
        let token = self.peek();
        match token.kind {
            TokenKind::Operator => token.text(),
            _ => None,
        }
    }

    /// Сдвигается на следующий токен, но никогда не уходит дальше EOF
    fn advance(&mut self) -> &Token {
        let index = self.position;
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        &self.tokens[index]
    }

    fn check(&self, kind: TokenKind, lexeme: &str) -> bool {
        self.peek().is(kind, lexeme)
    }

    /// Съедает токен нужной категории и возвращает его текст
    fn expect_kind(&mut self, kind: TokenKind) -> Result<String, CompileError> {
        if self.peek().kind == kind {
            Ok(self.advance().text.clone().unwrap_or_default())
        } else {
            Err(self.error(Expected::Kind(kind)))
        }
    }

    fn expect_lexeme(&mut self, kind: TokenKind, lexeme: &'static str) -> Result<(), CompileError> {
        if self.check(kind, lexeme) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(Expected::Lexeme(kind, lexeme)))
        }
    }

    fn error(&self, expected: Expected) -> CompileError {
        let token = self.peek();
        CompileError::SyntaxError {
            expected,
            found: token.kind,
            text: token.text.clone(),
            span: token.span,
        }
    }
}

fn strip_quotes(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use crate::ir::ast::{BinaryOperator, CompareOperator, Expression, LogicalOperator, Statement};

    fn parse(source: &str) -> Result<ast::Program, CompileError> {
        parse_tokens(tokenize(source))
    }

    fn parse_ok(source: &str) -> Vec<Statement> {
        match parse(source) {
            Ok(program) => program.statements,
            Err(e) => panic!("failed to parse {:?}: {}", source, e),
        }
    }

    fn num(text: &str) -> Expression {
        Expression::Number(text.to_string())
    }

    fn ident(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    fn bin(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::BinaryOp { op, left: Box::new(left), right: Box::new(right) }
    }

    fn expect_syntax_error(source: &str) -> (Expected, TokenKind) {
        match parse(source) {
            Err(CompileError::SyntaxError { expected, found, .. }) => (expected, found),
            other => panic!("expected syntax error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_empty_program() {
        assert!(parse_ok("").is_empty());
        assert!(parse_ok("   \n ").is_empty());
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let statements = parse_ok("x := 1 + 2 * 3");
        assert_eq!(
            statements,
            vec![Statement::Assign {
                target: "x".to_string(),
                value: bin(
                    BinaryOperator::Add,
                    num("1"),
                    bin(BinaryOperator::Multiply, num("2"), num("3")),
                ),
            }]
        );
    }

    #[test]
    fn test_left_associativity() {
        let statements = parse_ok("x := a - b - c");
        let expected = bin(
            BinaryOperator::Subtract,
            bin(BinaryOperator::Subtract, ident("a"), ident("b")),
            ident("c"),
        );
        assert!(matches!(&statements[0], Statement::Assign { value, .. } if *value == expected));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let statements = parse_ok("x := (1 + 2) * 3");
        let expected = bin(
            BinaryOperator::Multiply,
            bin(BinaryOperator::Add, num("1"), num("2")),
            num("3"),
        );
        assert!(matches!(&statements[0], Statement::Assign { value, .. } if *value == expected));
    }

    #[test]
    fn test_logical_binds_weakest() {
        let statements = parse_ok("ok := a > 1 && b + 1 <= c");
        match &statements[0] {
            Statement::Assign { value: Expression::Logical { op, left, right }, .. } => {
                assert_eq!(*op, LogicalOperator::And);
                assert!(matches!(**left, Expression::Compare { op: CompareOperator::Greater, .. }));
                match &**right {
                    Expression::Compare { op, left, .. } => {
                        assert_eq!(*op, CompareOperator::LessEqual);
                        assert!(matches!(**left, Expression::BinaryOp { op: BinaryOperator::Add, .. }));
                    }
                    other => panic!("expected comparison, got {:?}", other),
                }
            }
            other => panic!("expected logical assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_if_with_both_branches() {
        let statements = parse_ok("? x > 0 do y := 1 : y := 2 end");
        match &statements[0] {
            Statement::If { condition, then_branch, else_branch } => {
                assert!(matches!(condition, Expression::Compare { op: CompareOperator::Greater, .. }));
                assert_eq!(then_branch.len(), 1);
                assert_eq!(else_branch.len(), 1);
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_if_with_empty_branches() {
        let statements = parse_ok("? x do : end");
        assert!(matches!(
            &statements[0],
            Statement::If { then_branch, else_branch, .. } if then_branch.is_empty() && else_branch.is_empty()
        ));
    }

    #[test]
    fn test_if_without_else_is_rejected() {
        let (expected, found) = expect_syntax_error("? x > 0 do y := 1 end");
        assert_eq!(expected.kind(), Some(TokenKind::Delimiter));
        assert_eq!(expected, Expected::Lexeme(TokenKind::Delimiter, ":"));
        assert_eq!(found, TokenKind::Keyword);
    }

    #[test]
    fn test_loop() {
        let statements = parse_ok("repeat y := y + 1 until y > 10");
        match &statements[0] {
            Statement::Loop { body, condition } => {
                assert_eq!(body.len(), 1);
                assert!(matches!(condition, Expression::Compare { op: CompareOperator::Greater, .. }));
            }
            other => panic!("expected loop, got {:?}", other),
        }
    }

    #[test]
    fn test_function_definitions() {
        assert_eq!(
            parse_ok("func f() do end"),
            vec![Statement::FuncDef { name: "f".to_string(), params: vec![], body: vec![] }]
        );

        let statements = parse_ok("func add(a, b) do return a + b end");
        match &statements[0] {
            Statement::FuncDef { name, params, body } => {
                assert_eq!(name, "add");
                assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
                assert!(matches!(&body[0], Statement::Return(Some(Expression::BinaryOp { .. }))));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_comma_in_params_is_rejected() {
        let (expected, found) = expect_syntax_error("func f(a,) do end");
        assert_eq!(expected, Expected::Kind(TokenKind::Identifier));
        assert_eq!(found, TokenKind::Delimiter);
    }

    #[test]
    fn test_calls_as_statement_and_expression() {
        let statements = parse_ok("draw(x, 1 + 2) y := max(a, b) * 2 tick()");
        assert!(matches!(&statements[0], Statement::Call(call) if call.name == "draw" && call.args.len() == 2));
        match &statements[1] {
            Statement::Assign { value: Expression::BinaryOp { left, .. }, .. } => {
                assert!(matches!(&**left, Expression::Call(call) if call.name == "max" && call.args.len() == 2));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
        assert!(matches!(&statements[2], Statement::Call(call) if call.args.is_empty()));
    }

    #[test]
    fn test_call_with_parenthesized_argument() {
        let statements = parse_ok("f((1))");
        assert!(matches!(&statements[0], Statement::Call(call) if call.args == vec![num("1")]));
    }

    #[test]
    fn test_log_forms() {
        let statements = parse_ok(r#"log("hello") log(x * 2)"#);
        assert_eq!(statements[0], Statement::Log(ast::LogArgument::Text("hello".to_string())));
        assert!(matches!(
            &statements[1],
            Statement::Log(ast::LogArgument::Value(Expression::BinaryOp { .. }))
        ));
    }

    #[test]
    fn test_return_lookahead() {
        let statements = parse_ok("func f() do return end");
        assert!(matches!(&statements[0], Statement::FuncDef { body, .. } if body == &vec![Statement::Return(None)]));

        assert_eq!(parse_ok("return"), vec![Statement::Return(None)]);
        assert_eq!(parse_ok("return 5"), vec![Statement::Return(Some(num("5")))]);

        // `(` это DELIMITER, поэтому выражение не разбирается и скобка остаётся лишней
        let (expected, found) = expect_syntax_error("return (1)");
        assert_eq!(expected, Expected::Statement);
        assert_eq!(found, TokenKind::Delimiter);
    }

    #[test]
    fn test_identifier_without_assign_or_call() {
        let (expected, found) = expect_syntax_error("x 1");
        assert_eq!(expected, Expected::Kind(TokenKind::Assign));
        assert_eq!(found, TokenKind::Number);
    }

    #[test]
    fn test_unknown_character_fails_in_parser() {
        let (expected, found) = expect_syntax_error("x := 1 # 2");
        assert_eq!(expected, Expected::Statement);
        assert_eq!(found, TokenKind::Unknown);

        let (expected, found) = expect_syntax_error("x := $");
        assert_eq!(expected, Expected::Expression);
        assert_eq!(found, TokenKind::Unknown);
    }

    #[test]
    fn test_stray_terminator_at_top_level() {
        let (expected, found) = expect_syntax_error("x := 1 end");
        assert_eq!(expected, Expected::Kind(TokenKind::Eof));
        assert_eq!(found, TokenKind::Keyword);
    }

    #[test]
    fn test_wrong_keyword_is_rejected() {
        let (expected, _) = expect_syntax_error("? x until y := 1 : end");
        assert_eq!(expected, Expected::Lexeme(TokenKind::Keyword, "do"));
    }

    #[test]
    fn test_error_reports_position() {
        match parse("x := 1\ny := (2") {
            Err(CompileError::SyntaxError { span, found, .. }) => {
                assert_eq!(found, TokenKind::Eof);
                assert_eq!(span.line, 2);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let source = "
            func count(n) do
                i := 0
                repeat
                    ? i == 5 do log(\"five\") : log(i) end
                    i := i + 1
                until i < n
            end
        ";
        let statements = parse_ok(source);
        match &statements[0] {
            Statement::FuncDef { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(&body[1], Statement::Loop { body, .. } if body.len() == 2));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_outside_every_tier_ends_expression() {
        let (expected, found) = expect_syntax_error("x := a =! b");
        assert_eq!(expected, Expected::Statement);
        assert_eq!(found, TokenKind::Operator);

        match parse("x := a = b") {
            Err(CompileError::SyntaxError { expected, text, .. }) => {
                assert_eq!(expected, Expected::Statement);
                assert_eq!(text.as_deref(), Some("="));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_keywords_that_start_no_statement() {
        for source in ["var x := 1", "const y := 2", "do x := 1"] {
            let (expected, found) = expect_syntax_error(source);
            assert_eq!(expected, Expected::Statement, "{}", source);
            assert_eq!(found, TokenKind::Keyword, "{}", source);
        }
    }

    fn nested_parens(depth: usize) -> String {
        format!("x := {}1{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_nesting_below_limit_parses() {
        // программа и само выражение занимают по уровню
        let statements = parse_ok(&nested_parens(MAX_NESTING - 2));
        assert!(matches!(&statements[0], Statement::Assign { value, .. } if *value == num("1")));
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        for depth in [MAX_NESTING - 1, 5_000] {
            match parse(&nested_parens(depth)) {
                Err(CompileError::NestingTooDeep { limit, span }) => {
                    assert_eq!(limit, MAX_NESTING);
                    assert_eq!(span.line, 1);
                }
                other => panic!("expected nesting error at depth {}, got {:?}", depth, other),
            }
        }
    }

    #[test]
    fn test_deep_calls_and_blocks_are_rejected() {
        let calls = format!("x := {}1{}", "f(".repeat(1_000), ")".repeat(1_000));
        assert!(matches!(parse(&calls), Err(CompileError::NestingTooDeep { .. })));

        let ifs = format!("{}{}", "? x do ".repeat(1_000), ": end ".repeat(1_000));
        assert!(matches!(parse(&ifs), Err(CompileError::NestingTooDeep { .. })));

        let loops = format!("{}{}", "repeat ".repeat(1_000), "until x ".repeat(1_000));
        assert!(matches!(parse(&loops), Err(CompileError::NestingTooDeep { .. })));
    }

    #[test]
    fn test_long_flat_sum_is_not_nesting() {
        let source = format!("x := {}", vec!["1"; 10_000].join(" + "));
        let statements = parse_ok(&source);
        assert_eq!(statements.len(), 1);
    }
}
