use thiserror::Error;

use crate::ast::{
    BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected token = '{expected}', got = '{got}'")]
    UnexpectedToken {
        expected: TokenKind,
        got: TokenKind,
    },
    #[error("no prefix parse function for {kind} found")]
    NoPrefixParseFn { kind: TokenKind },
    #[error("could not parse integer literal '{literal}'")]
    InvalidIntegerLiteral { literal: String },
}

/// Binding powers for the Pratt loop, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn token_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::LParen => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn infix_operator(kind: TokenKind) -> Option<InfixOperator> {
    match kind {
        TokenKind::Plus => Some(InfixOperator::Plus),
        TokenKind::Minus => Some(InfixOperator::Minus),
        TokenKind::Asterisk => Some(InfixOperator::Asterisk),
        TokenKind::Slash => Some(InfixOperator::Slash),
        TokenKind::Lt => Some(InfixOperator::Lt),
        TokenKind::Gt => Some(InfixOperator::Gt),
        TokenKind::Eq => Some(InfixOperator::Eq),
        TokenKind::NotEq => Some(InfixOperator::NotEq),
        _ => None,
    }
}

/// Pratt parser with one token of lookahead.
///
/// Tokens are pulled from the lexer on demand. Errors accumulate: a
/// statement that fails to parse is dropped and parsing resumes at the
/// next one, so a single pass reports every diagnostic at once.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    peek: Token<'a>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        Program { statements }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Identifier) {
            return None;
        }
        let name = self.current.literal.to_string();

        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek.kind == TokenKind::Semicolon {
            self.next_token();
        }
        Some(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek.kind == TokenKind::Semicolon {
            self.next_token();
        }
        Some(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;

        if self.peek.kind == TokenKind::Semicolon {
            self.next_token();
        }
        Some(Statement::Expression(expression))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix()?;

        while self.peek.kind != TokenKind::Semicolon
            && precedence < token_precedence(self.peek.kind)
        {
            left = match self.peek.kind {
                TokenKind::LParen => {
                    self.next_token();
                    self.parse_call_expression(left)?
                }
                TokenKind::LBracket => {
                    self.next_token();
                    self.parse_index_expression(left)?
                }
                kind if infix_operator(kind).is_some() => {
                    self.next_token();
                    self.parse_infix_expression(left)?
                }
                _ => break,
            };
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        match self.current.kind {
            TokenKind::Identifier => {
                Some(Expression::Identifier(self.current.literal.to_string()))
            }
            TokenKind::Integer => self.parse_integer_literal(),
            TokenKind::String => Some(Expression::String(self.current.literal.to_string())),
            TokenKind::True => Some(Expression::Boolean(true)),
            TokenKind::False => Some(Expression::Boolean(false)),
            TokenKind::Bang => self.parse_prefix_expression(PrefixOperator::Bang),
            TokenKind::Minus => self.parse_prefix_expression(PrefixOperator::Minus),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::LBracket => {
                let elements = self.parse_expression_list(TokenKind::RBracket)?;
                Some(Expression::Array(elements))
            }
            TokenKind::LBrace => self.parse_hash_literal(),
            kind => {
                self.errors.push(ParseError::NoPrefixParseFn { kind });
                None
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer(value)),
            Err(_) => {
                self.errors.push(ParseError::InvalidIntegerLiteral {
                    literal: self.current.literal.to_string(),
                });
                None
            }
        }
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let operator = infix_operator(self.current.kind)?;
        let precedence = token_precedence(self.current.kind);
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_prefix_expression(&mut self, operator: PrefixOperator) -> Option<Expression> {
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();

        let alternative = if self.peek.kind == TokenKind::Else {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block_statement())
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_block_statement(&mut self) -> BlockStatement {
        let mut statements = Vec::new();
        self.next_token();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        BlockStatement { statements }
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement();

        Some(Expression::Function { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut parameters = Vec::new();
        if self.peek.kind == TokenKind::RParen {
            self.next_token();
            return Some(parameters);
        }

        if !self.expect_peek(TokenKind::Identifier) {
            return None;
        }
        parameters.push(self.current.literal.to_string());

        while self.peek.kind == TokenKind::Comma {
            self.next_token();
            if !self.expect_peek(TokenKind::Identifier) {
                return None;
            }
            parameters.push(self.current.literal.to_string());
        }

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(parameters)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    /// Comma-separated expressions up to (and consuming) `end`. The
    /// current token is the opening delimiter when called.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut items = Vec::new();
        if self.peek.kind == end {
            self.next_token();
            return Some(items);
        }

        self.next_token();
        items.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek.kind == TokenKind::Comma {
            self.next_token();
            self.next_token();
            items.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(items)
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let mut pairs = Vec::new();
        while self.peek.kind != TokenKind::RBrace {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if self.peek.kind != TokenKind::RBrace && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }

        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expression::Hash(pairs))
    }

    fn expect_peek(&mut self, expected: TokenKind) -> bool {
        if self.peek.kind == expected {
            self.next_token();
            true
        } else {
            self.errors.push(ParseError::UnexpectedToken {
                expected,
                got: self.peek.kind,
            });
            false
        }
    }

    fn next_token(&mut self) {
        self.current = self.peek;
        self.peek = self.lexer.next_token();
    }
}

/// Parses a complete source string, returning the accumulated errors on
/// failure so a driver can print them all.
pub fn parse(input: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse_program();
    if parser.errors().is_empty() {
        Ok(program)
    } else {
        Err(parser.errors().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Program {
        let mut parser = Parser::new(Lexer::new(input));
        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "unexpected parse errors for {input:?}: {:?}",
            parser.errors()
        );
        program
    }

    fn parse_errors(input: &str) -> Vec<ParseError> {
        let mut parser = Parser::new(Lexer::new(input));
        parser.parse_program();
        parser.errors().to_vec()
    }

    fn single_expression(input: &str) -> Expression {
        let program = parse_ok(input);
        assert_eq!(program.statements.len(), 1, "expected one statement");
        match program.statements.into_iter().next().expect("one statement") {
            Statement::Expression(expression) => expression,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn parses_let_statements() {
        let program = parse_ok("let x = 5; let y = true; let foobar = y;");
        assert_eq!(
            program.statements,
            vec![
                Statement::Let {
                    name: "x".to_string(),
                    value: Expression::Integer(5),
                },
                Statement::Let {
                    name: "y".to_string(),
                    value: Expression::Boolean(true),
                },
                Statement::Let {
                    name: "foobar".to_string(),
                    value: Expression::Identifier("y".to_string()),
                },
            ]
        );
    }

    #[test]
    fn parses_return_statements() {
        let program = parse_ok("return 5; return x + y;");
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0], Statement::Return(Expression::Integer(5)));
        assert_eq!(program.statements[1].to_string(), "return (x+y);");
    }

    #[test]
    fn records_error_for_let_without_identifier() {
        let errors = parse_errors("let = 5;");
        assert_eq!(
            errors[0],
            ParseError::UnexpectedToken {
                expected: TokenKind::Identifier,
                got: TokenKind::Assign,
            }
        );
        assert_eq!(errors[0].to_string(), "expected token = 'IDENT', got = '='");
    }

    #[test]
    fn records_error_for_missing_prefix_parse_fn() {
        let errors = parse_errors("+5;");
        assert_eq!(
            errors[0],
            ParseError::NoPrefixParseFn {
                kind: TokenKind::Plus,
            }
        );
        assert_eq!(errors[0].to_string(), "no prefix parse function for + found");
    }

    #[test]
    fn records_error_for_unparseable_integer_literal() {
        let errors = parse_errors("92233720368547758089");
        assert_eq!(
            errors,
            vec![ParseError::InvalidIntegerLiteral {
                literal: "92233720368547758089".to_string(),
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "could not parse integer literal '92233720368547758089'"
        );
    }

    #[test]
    fn recovers_and_reports_every_broken_statement() {
        // Recovery resumes mid-statement, so the dangling `=` also gets a
        // no-prefix diagnostic of its own.
        let errors = parse_errors("let x 5; let = 10; let 838383;");
        assert_eq!(
            errors,
            vec![
                ParseError::UnexpectedToken {
                    expected: TokenKind::Assign,
                    got: TokenKind::Integer,
                },
                ParseError::UnexpectedToken {
                    expected: TokenKind::Identifier,
                    got: TokenKind::Assign,
                },
                ParseError::NoPrefixParseFn {
                    kind: TokenKind::Assign,
                },
                ParseError::UnexpectedToken {
                    expected: TokenKind::Identifier,
                    got: TokenKind::Integer,
                },
            ]
        );
    }

    #[test]
    fn parses_prefix_expressions() {
        let cases = [
            ("!5;", "(!5)"),
            ("-15;", "(-15)"),
            ("!true;", "(!true)"),
            ("!!false;", "(!(!false))"),
        ];
        for (input, expected) in cases {
            assert_eq!(single_expression(input).to_string(), expected);
        }
    }

    #[test]
    fn parses_infix_expressions() {
        let expression = single_expression("5 + 6;");
        assert_eq!(
            expression,
            Expression::Infix {
                left: Box::new(Expression::Integer(5)),
                operator: InfixOperator::Plus,
                right: Box::new(Expression::Integer(6)),
            }
        );
    }

    #[test]
    fn applies_operator_precedence() {
        let cases = [
            ("-a * b", "((-a)*b)"),
            ("!-a", "(!(-a))"),
            ("a + b + c", "((a+b)+c)"),
            ("a + b - c", "((a+b)-c)"),
            ("a * b * c", "((a*b)*c)"),
            ("a * b / c", "((a*b)/c)"),
            ("a + b / c", "(a+(b/c))"),
            ("a + b * c + d / e - f", "(((a+(b*c))+(d/e))-f)"),
            ("3 + 4; -5 * 5", "(3+4)((-5)*5)"),
            ("5 > 4 == 3 < 4", "((5>4)==(3<4))"),
            ("5 < 4 != 3 > 4", "((5<4)!=(3>4))"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3+(4*5))==((3*1)+(4*5)))"),
            ("true", "true"),
            ("3 > 5 == false", "((3>5)==false)"),
            ("1 + (2 + 3) + 4", "((1+(2+3))+4)"),
            ("(5 + 5) * 2", "((5+5)*2)"),
            ("2 / (5 + 5)", "(2/(5+5))"),
            ("-(5 + 5)", "(-(5+5))"),
            ("!(true == true)", "(!(true==true))"),
            ("a + add(b * c) + d", "((a+add((b*c)))+d)"),
            (
                "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
                "add(a,b,1,(2*3),(4+5),add(6,(7*8)))",
            ),
            ("add(a + b + c * d / f + g)", "add((((a+b)+((c*d)/f))+g))"),
            ("a * [1, 2, 3, 4][b * c] * d", "((a*([1,2,3,4][(b*c)]))*d)"),
            (
                "add(a * b[2], b[1], 2 * [1, 2][1])",
                "add((a*(b[2])),(b[1]),(2*([1,2][1])))",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_ok(input).to_string(), expected, "for input {input:?}");
        }
    }

    #[test]
    fn canonical_form_is_a_fixed_point() {
        let inputs = [
            "a + b * c + d / e - f",
            "add(a, b, 1, 2 * 3)",
            "a * [1, 2, 3, 4][b * c] * d",
            "!(true == true)",
            "let x = 1 + 2;",
            "return a + b;",
        ];
        for input in inputs {
            let canonical = parse_ok(input).to_string();
            let reparsed = parse_ok(&canonical).to_string();
            assert_eq!(reparsed, canonical, "for input {input:?}");
        }
    }

    #[test]
    fn parses_if_expression_without_alternative() {
        let expression = single_expression("if (x < y) { x }");
        match expression {
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                assert_eq!(condition.to_string(), "(x<y)");
                assert_eq!(consequence.to_string(), "x");
                assert!(alternative.is_none());
            }
            other => panic!("expected if expression, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_expression_with_alternative() {
        assert_eq!(
            single_expression("if (x < y) { x } else { y }").to_string(),
            "if(x<y) x else y"
        );
    }

    #[test]
    fn parses_function_literal_parameters() {
        let cases = [
            ("fn() {};", vec![]),
            ("fn(x) {};", vec!["x"]),
            ("fn(x, y, z) {};", vec!["x", "y", "z"]),
        ];
        for (input, expected) in cases {
            match single_expression(input) {
                Expression::Function { parameters, .. } => {
                    assert_eq!(parameters, expected, "for input {input:?}");
                }
                other => panic!("expected function literal, got {other:?}"),
            }
        }
    }

    #[test]
    fn parses_function_literal_body() {
        assert_eq!(
            single_expression("fn(x, y) { x + y; }").to_string(),
            "fn(x,y)(x+y)"
        );
    }

    #[test]
    fn parses_call_expression() {
        let expression = single_expression("add(1, 2 * 3, 4 + 5);");
        match expression {
            Expression::Call {
                function,
                arguments,
            } => {
                assert_eq!(function.to_string(), "add");
                assert_eq!(arguments.len(), 3);
                assert_eq!(arguments[1].to_string(), "(2*3)");
            }
            other => panic!("expected call expression, got {other:?}"),
        }
    }

    #[test]
    fn parses_string_literal() {
        assert_eq!(
            single_expression(r#""hello world";"#),
            Expression::String("hello world".to_string())
        );
    }

    #[test]
    fn parses_array_literal_and_index_expression() {
        assert_eq!(
            single_expression("[1, 2 * 2, 3 + 3]").to_string(),
            "[1,(2*2),(3+3)]"
        );
        assert_eq!(
            single_expression("myArray[1 + 1]").to_string(),
            "(myArray[(1+1)])"
        );
    }

    #[test]
    fn parses_hash_literals() {
        let expression = single_expression(r#"{"one": 1, "two": 2, "three": 3}"#);
        match &expression {
            Expression::Hash(pairs) => {
                assert_eq!(pairs.len(), 3);
                assert_eq!(pairs[0].0, Expression::String("one".to_string()));
                assert_eq!(pairs[2].1, Expression::Integer(3));
            }
            other => panic!("expected hash literal, got {other:?}"),
        }

        assert_eq!(single_expression("{}"), Expression::Hash(vec![]));
        assert_eq!(
            single_expression(r#"{"a": 0 + 1, 2: "b", true: 3}"#).to_string(),
            "{a:(0+1), 2:b, true:3}"
        );
    }

    #[test]
    fn parse_helper_splits_success_from_errors() {
        assert!(parse("let x = 1;").is_ok());
        let errors = parse("let = 1;").expect_err("expected parse errors");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "expected token = 'IDENT', got = '='");
    }
}
