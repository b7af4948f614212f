//! AST node types for the script subset.

use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Statement {
    /// `var a = expr, b;` — one entry per declarator.
    Var(Vec<(String, Option<Expression>)>),
    If {
        test: Expression,
        consequent: Vec<Statement>,
        alternate: Option<Vec<Statement>>,
    },
    Return(Option<Expression>),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    Assignment {
        target: AssignTarget,
        value: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Expression>,
    },
    Member {
        object: Box<Expression>,
        property: String,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// Function expression. The body is shared so the closure value built at
    /// evaluation time does not copy it.
    Function {
        params: Vec<String>,
        body: Rc<Vec<Statement>>,
    },
    Object(Vec<(String, Expression)>),
    Array(Vec<Expression>),
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Identifier(String),
    Member {
        object: Box<Expression>,
        property: String,
    },
}

#[derive(Debug, Clone)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    StrictEquals,
    StrictNotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Negate,
}
