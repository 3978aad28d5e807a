//! Syntax tree produced by the parser and consumed by the lowering engine.
//!
//! Every node owns its children; the tree is built bottom-up and never
//! mutated afterwards.

use std::fmt;

/// Numeric literal with an authoritative integer or floating representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// Floating view; integers widen.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// Integer view; floats truncate toward zero.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Number::Int(value) => value,
            Number::Float(value) => value as i64,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Number(Number),
    String(String),
    Variable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Call {
        callee: String,
        args: Vec<Expression>,
    },
    Grouping(Box<Expression>),
    Assign {
        target: String,
        value: Box<Expression>,
    },
}

impl Expression {
    pub fn int(value: i64) -> Self {
        Expression::Number(Number::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expression::Number(Number::Float(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(target: impl Into<String>, value: Expression) -> Self {
        Expression::Assign {
            target: target.into(),
            value: Box::new(value),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    Greater,
    Equal,
    NotEqual,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::Equal | BinaryOp::NotEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Print {
        args: Vec<Expression>,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        increment: Option<Box<Statement>>,
        body: Vec<Statement>,
    },
    /// Parsed for completeness; the lowering engine skips it.
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
    },
    Expression(Expression),
    VarDecl {
        name: String,
        initializer: Expression,
    },
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_views_widen_and_truncate() {
        assert_eq!(Number::Int(3).as_f64(), 3.0);
        assert_eq!(Number::Float(3.9).as_i64(), 3);
        assert_eq!(Number::Float(-3.9).as_i64(), -3);
        assert!(Number::Float(1.5).is_float());
        assert!(!Number::Int(1).is_float());
    }
}
