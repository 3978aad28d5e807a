use crate::ast::{BinaryOp, Expression, Number, Program, Statement, UnaryOp};
use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::SyntaxError;

type OperatorTable = &'static [(TokenKind, BinaryOp)];

const EQUALITY: OperatorTable = &[
    (TokenKind::EqualEqual, BinaryOp::Equal),
    (TokenKind::BangEqual, BinaryOp::NotEqual),
];
// `<=` and `>=` collapse to the operator of their first character.
const COMPARISON: OperatorTable = &[
    (TokenKind::Greater, BinaryOp::Greater),
    (TokenKind::GreaterEqual, BinaryOp::Greater),
    (TokenKind::Less, BinaryOp::Less),
    (TokenKind::LessEqual, BinaryOp::Less),
];
const TERM: OperatorTable = &[
    (TokenKind::Plus, BinaryOp::Add),
    (TokenKind::Minus, BinaryOp::Sub),
];
const FACTOR: OperatorTable = &[
    (TokenKind::Star, BinaryOp::Mul),
    (TokenKind::Slash, BinaryOp::Div),
];

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(Token::kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(Token::span).unwrap_or_default();
            tokens.push(Token::new(
                TokenKind::Eof,
                "",
                Span {
                    start: span.end,
                    ..span
                },
            ));
        }
        Self { tokens, current: 0 }
    }

    /// `cook { statement* }` followed by end of input.
    pub fn parse_program(mut self) -> Result<Program, SyntaxError> {
        self.consume(TokenKind::Cook, "'cook' at start of program")?;
        let body = self.block()?;
        if !self.check(TokenKind::Eof) {
            let token = self.peek();
            return Err(SyntaxError::TrailingInput {
                found: token.describe(),
                line: token.span.line,
            });
        }
        Ok(Program { body })
    }

    fn block(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        self.consume(TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            statements.push(self.statement()?);
        }
        self.consume(TokenKind::RightBrace, "'}' after block")?;
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek().kind {
            TokenKind::Yap => {
                self.advance();
                self.print_statement()
            }
            TokenKind::Fr | TokenKind::NoCap => {
                self.advance();
                self.if_statement()
            }
            TokenKind::Bet => {
                self.advance();
                self.for_statement()
            }
            TokenKind::Pookie => {
                self.advance();
                let declaration = self.var_declaration()?;
                self.consume(TokenKind::Semicolon, "';' after variable declaration")?;
                Ok(declaration)
            }
            TokenKind::Bruh => {
                self.advance();
                self.function_declaration()
            }
            _ => Err(self.error("statement")),
        }
    }

    fn print_statement(&mut self) -> Result<Statement, SyntaxError> {
        self.consume(TokenKind::LeftParen, "'(' after 'yap'")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if self.matches(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after arguments")?;
        self.consume(TokenKind::Semicolon, "';' after yap statement")?;
        Ok(Statement::Print { args })
    }

    /// Shared by `fr` and `no_cap`; the keyword is already consumed.
    fn if_statement(&mut self) -> Result<Statement, SyntaxError> {
        self.consume(TokenKind::LeftParen, "'(' before condition")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "')' after condition")?;
        let then_body = self.block()?;
        let else_body = if self.matches(&[TokenKind::Cap]).is_some() {
            self.block()?
        } else {
            Vec::new()
        };
        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    /// `bet ( init , condition , name = value ) block`
    fn for_statement(&mut self) -> Result<Statement, SyntaxError> {
        self.consume(TokenKind::LeftParen, "'(' after 'bet'")?;
        let init = if self.matches(&[TokenKind::Pookie]).is_some() {
            self.var_declaration()?
        } else {
            Statement::Expression(self.assignment()?)
        };
        self.consume(TokenKind::Comma, "',' after loop initializer")?;
        let condition = self.expression()?;
        self.consume(TokenKind::Comma, "',' after loop condition")?;
        let increment = Statement::Expression(self.assignment()?);
        self.consume(TokenKind::RightParen, "')' after loop clauses")?;
        let body = self.block()?;

        Ok(Statement::For {
            init: Some(Box::new(init)),
            condition: Some(condition),
            increment: Some(Box::new(increment)),
            body,
        })
    }

    /// `name = value` after `pookie`; the caller owns the terminator.
    fn var_declaration(&mut self) -> Result<Statement, SyntaxError> {
        let name = self.consume(TokenKind::Identifier, "variable name")?.text;
        self.consume(TokenKind::Equal, "'=' after variable name")?;
        let initializer = self.expression()?;
        Ok(Statement::VarDecl { name, initializer })
    }

    fn assignment(&mut self) -> Result<Expression, SyntaxError> {
        let target = self.consume(TokenKind::Identifier, "variable name")?.text;
        self.consume(TokenKind::Equal, "'=' after variable name")?;
        let value = self.expression()?;
        Ok(Expression::assign(target, value))
    }

    fn function_declaration(&mut self) -> Result<Statement, SyntaxError> {
        let name = self.consume(TokenKind::Identifier, "function name")?.text;
        self.consume(TokenKind::LeftParen, "'(' after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier, "parameter name")?.text);
                if self.matches(&[TokenKind::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "')' after parameters")?;
        let body = self.block()?;
        Ok(Statement::FunctionDecl { name, params, body })
    }

    fn expression(&mut self) -> Result<Expression, SyntaxError> {
        self.equality()
    }

    fn equality(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.comparison()?;
        while let Some(op) = self.operator(EQUALITY) {
            let right = self.comparison()?;
            expr = Expression::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.term()?;
        while let Some(op) = self.operator(COMPARISON) {
            let right = self.term()?;
            expr = Expression::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.factor()?;
        while let Some(op) = self.operator(TERM) {
            let right = self.factor()?;
            expr = Expression::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.unary()?;
        while let Some(op) = self.operator(FACTOR) {
            let right = self.unary()?;
            expr = Expression::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expression, SyntaxError> {
        if let Some(token) = self.matches(&[TokenKind::Minus, TokenKind::Bang]) {
            let op = if token.kind == TokenKind::Minus {
                UnaryOp::Negate
            } else {
                UnaryOp::Not
            };
            let operand = self.unary()?;
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expression, SyntaxError> {
        match self.peek().kind {
            TokenKind::Number => {
                let token = self.advance();
                number_literal(&token).map(Expression::Number)
            }
            TokenKind::Identifier => Ok(Expression::Variable(self.advance().text)),
            TokenKind::String => Ok(Expression::String(self.advance().text)),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "')' after expression")?;
                Ok(Expression::Grouping(Box::new(inner)))
            }
            _ => Err(self.error("expression")),
        }
    }

    /// Consumes the current token when `table` lists it as a binary operator.
    fn operator(&mut self, table: OperatorTable) -> Option<BinaryOp> {
        let kind = self.peek().kind;
        let (_, op) = table.iter().find(|(candidate, _)| *candidate == kind)?;
        self.advance();
        Some(*op)
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if kinds.contains(&self.peek().kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Returns the current token; the cursor never moves past `Eof`.
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn error(&self, expected: &'static str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::Expected {
            expected,
            found: token.describe(),
            line: token.span.line,
        }
    }
}

fn number_literal(token: &Token) -> Result<Number, SyntaxError> {
    let invalid = || SyntaxError::InvalidNumber {
        literal: token.text.clone(),
        line: token.span.line,
    };
    if token.is_float {
        token.text.parse().map(Number::Float).map_err(|_| invalid())
    } else {
        token.text.parse().map(Number::Int).map_err(|_| invalid())
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> Result<Program, SyntaxError> {
    Parser::new(tokens).parse_program()
}
