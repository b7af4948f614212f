//! PEG parser for the script subset, built on pest.

use std::rc::Rc;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::{AssignTarget, BinaryOp, Expression, Literal, Statement, UnaryOp};
use crate::error::EngineError;

#[derive(Parser)]
#[grammar = "sandbox/script_grammar.pest"] // relative to src
pub struct ScriptParser;

/// Parse script source into a statement list.
pub fn parse_script(source: &str) -> Result<Vec<Statement>, EngineError> {
    let mut pairs = ScriptParser::parse(Rule::script, source)
        .map_err(|e| EngineError::Syntax(e.to_string()))?;
    let script = pairs.next().ok_or_else(|| {
        EngineError::Syntax("empty parse result".to_string())
    })?;
    let mut statements = vec![];
    for pair in script.into_inner() {
        match pair.as_rule() {
            Rule::statement => statements.push(build_statement(pair)?),
            Rule::EOI => {}
            _ => return Err(unexpected(&pair)),
        }
    }
    Ok(statements)
}

fn unexpected(pair: &Pair<Rule>) -> EngineError {
    EngineError::Syntax(format!(
        "unexpected {:?} at '{}'",
        pair.as_rule(),
        pair.as_str()
    ))
}

fn build_statement(pair: Pair<Rule>) -> Result<Statement, EngineError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| EngineError::Syntax("empty statement".to_string()))?;
    match inner.as_rule() {
        Rule::var_statement => build_var_statement(inner),
        Rule::if_statement => build_if_statement(inner),
        Rule::return_statement => {
            let mut argument = None;
            for p in inner.into_inner() {
                if p.as_rule() == Rule::expression {
                    argument = Some(build_expression(p)?);
                }
            }
            Ok(Statement::Return(argument))
        }
        Rule::expression_statement => {
            let expr = inner
                .into_inner()
                .next()
                .ok_or_else(|| EngineError::Syntax("empty expression statement".to_string()))?;
            Ok(Statement::Expression(build_expression(expr)?))
        }
        _ => Err(unexpected(&inner)),
    }
}

fn build_var_statement(pair: Pair<Rule>) -> Result<Statement, EngineError> {
    let mut declarations = vec![];
    for p in pair.into_inner() {
        if p.as_rule() == Rule::variable_declaration {
            let mut name = String::new();
            let mut init = None;
            for d in p.into_inner() {
                match d.as_rule() {
                    Rule::identifier => name = d.as_str().to_string(),
                    Rule::expression => init = Some(build_expression(d)?),
                    Rule::assign_op => {}
                    _ => return Err(unexpected(&d)),
                }
            }
            declarations.push((name, init));
        }
    }
    Ok(Statement::Var(declarations))
}

fn build_if_statement(pair: Pair<Rule>) -> Result<Statement, EngineError> {
    let mut test = None;
    let mut consequent = vec![];
    let mut alternate = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_if => {}
            Rule::expression => test = Some(build_expression(p)?),
            Rule::block => consequent = build_block(p)?,
            Rule::else_clause => {
                for e in p.into_inner() {
                    match e.as_rule() {
                        Rule::kw_else => {}
                        Rule::if_statement => {
                            alternate = Some(vec![build_if_statement(e)?]);
                        }
                        Rule::block => alternate = Some(build_block(e)?),
                        _ => return Err(unexpected(&e)),
                    }
                }
            }
            _ => return Err(unexpected(&p)),
        }
    }
    Ok(Statement::If {
        test: test.ok_or_else(|| EngineError::Syntax("if without a test".to_string()))?,
        consequent,
        alternate,
    })
}

fn build_block(pair: Pair<Rule>) -> Result<Vec<Statement>, EngineError> {
    let mut statements = vec![];
    for p in pair.into_inner() {
        if p.as_rule() == Rule::statement {
            statements.push(build_statement(p)?);
        }
    }
    Ok(statements)
}

fn build_expression(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    match pair.as_rule() {
        Rule::expression => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| EngineError::Syntax("empty expression".to_string()))?;
            build_expression(inner)
        }
        Rule::assignment => build_assignment(pair),
        Rule::equality | Rule::relational | Rule::additive | Rule::multiplicative => {
            build_binary_chain(pair)
        }
        Rule::unary => build_unary(pair),
        Rule::postfix => build_postfix(pair),
        Rule::primary => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| EngineError::Syntax("empty primary".to_string()))?;
            build_expression(inner)
        }
        Rule::new_expression => build_new_expression(pair),
        Rule::function_expression => build_function_expression(pair),
        Rule::member_path => build_member_path(pair),
        Rule::paren_expression => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| EngineError::Syntax("empty parenthesis".to_string()))?;
            build_expression(inner)
        }
        Rule::literal => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| EngineError::Syntax("empty literal".to_string()))?;
            build_literal(inner)
        }
        Rule::identifier => Ok(Expression::Identifier(pair.as_str().to_string())),
        _ => Err(unexpected(&pair)),
    }
}

fn build_assignment(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut inner = pair.into_inner();
    let left = build_expression(inner.next().ok_or_else(|| {
        EngineError::Syntax("empty assignment".to_string())
    })?)?;
    let mut rest: Vec<Pair<Rule>> = inner.collect();
    if rest.is_empty() {
        return Ok(left);
    }
    // assign_op then the right-hand assignment
    let value = build_expression(rest.pop().ok_or_else(|| {
        EngineError::Syntax("assignment without a value".to_string())
    })?)?;
    let target = match left {
        Expression::Identifier(name) => AssignTarget::Identifier(name),
        Expression::Member { object, property } => AssignTarget::Member { object, property },
        other => {
            return Err(EngineError::Syntax(format!(
                "invalid assignment target: {:?}",
                other
            )))
        }
    };
    Ok(Expression::Assignment {
        target,
        value: Box::new(value),
    })
}

fn binary_op(op: &str) -> Result<BinaryOp, EngineError> {
    Ok(match op {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Subtract,
        "*" => BinaryOp::Multiply,
        "/" => BinaryOp::Divide,
        "===" => BinaryOp::StrictEquals,
        "!==" => BinaryOp::StrictNotEquals,
        "<" => BinaryOp::LessThan,
        ">" => BinaryOp::GreaterThan,
        "<=" => BinaryOp::LessThanOrEqual,
        ">=" => BinaryOp::GreaterThanOrEqual,
        other => {
            return Err(EngineError::Syntax(format!(
                "unknown binary operator '{}'",
                other
            )))
        }
    })
}

/// Fold `operand (op operand)*` left-associatively.
fn build_binary_chain(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut inner = pair.into_inner();
    let mut left = build_expression(inner.next().ok_or_else(|| {
        EngineError::Syntax("empty operand".to_string())
    })?)?;
    while let Some(op_pair) = inner.next() {
        let op = binary_op(op_pair.as_str())?;
        let right_pair = inner.next().ok_or_else(|| {
            EngineError::Syntax("binary operator without a right operand".to_string())
        })?;
        let right = build_expression(right_pair)?;
        left = Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn build_unary(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut inner = pair.into_inner();
    let first = inner.next().ok_or_else(|| {
        EngineError::Syntax("empty unary expression".to_string())
    })?;
    match first.as_rule() {
        Rule::unary_op => {
            let op = match first.as_str() {
                "!" => UnaryOp::Not,
                "-" => UnaryOp::Negate,
                other => {
                    return Err(EngineError::Syntax(format!(
                        "unknown unary operator '{}'",
                        other
                    )))
                }
            };
            let argument = build_expression(inner.next().ok_or_else(|| {
                EngineError::Syntax("unary operator without an operand".to_string())
            })?)?;
            Ok(Expression::Unary {
                op,
                argument: Box::new(argument),
            })
        }
        Rule::postfix => build_postfix(first),
        _ => Err(unexpected(&first)),
    }
}

fn build_postfix(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut inner = pair.into_inner();
    let mut expr = build_expression(inner.next().ok_or_else(|| {
        EngineError::Syntax("empty postfix expression".to_string())
    })?)?;
    for op in inner {
        let op_inner = op
            .into_inner()
            .next()
            .ok_or_else(|| EngineError::Syntax("empty postfix operator".to_string()))?;
        match op_inner.as_rule() {
            Rule::member_access => {
                let property = op_inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| EngineError::Syntax("member access without a name".to_string()))?
                    .as_str()
                    .to_string();
                expr = Expression::Member {
                    object: Box::new(expr),
                    property,
                };
            }
            Rule::call_arguments => {
                let arguments = build_arguments(op_inner)?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            }
            _ => return Err(unexpected(&op_inner)),
        }
    }
    Ok(expr)
}

fn build_arguments(pair: Pair<Rule>) -> Result<Vec<Expression>, EngineError> {
    let mut arguments = vec![];
    for p in pair.into_inner() {
        if p.as_rule() == Rule::expression {
            arguments.push(build_expression(p)?);
        }
    }
    Ok(arguments)
}

fn build_member_path(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut inner = pair.into_inner();
    let first = inner.next().ok_or_else(|| {
        EngineError::Syntax("empty member path".to_string())
    })?;
    let mut expr = Expression::Identifier(first.as_str().to_string());
    for access in inner {
        let property = access
            .into_inner()
            .next()
            .ok_or_else(|| EngineError::Syntax("member access without a name".to_string()))?
            .as_str()
            .to_string();
        expr = Expression::Member {
            object: Box::new(expr),
            property,
        };
    }
    Ok(expr)
}

fn build_new_expression(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut callee = None;
    let mut arguments = vec![];
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_new => {}
            Rule::member_path => callee = Some(build_member_path(p)?),
            Rule::call_arguments => arguments = build_arguments(p)?,
            _ => return Err(unexpected(&p)),
        }
    }
    Ok(Expression::New {
        callee: Box::new(callee.ok_or_else(|| {
            EngineError::Syntax("new expression without a callee".to_string())
        })?),
        arguments,
    })
}

fn build_function_expression(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let mut params = vec![];
    let mut body = vec![];
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_function => {}
            // The optional function name carries no meaning here.
            Rule::identifier => {}
            Rule::parameter_list => {
                for param in p.into_inner() {
                    params.push(param.as_str().to_string());
                }
            }
            Rule::block => body = build_block(p)?,
            _ => return Err(unexpected(&p)),
        }
    }
    Ok(Expression::Function {
        params,
        body: Rc::new(body),
    })
}

fn build_literal(pair: Pair<Rule>) -> Result<Expression, EngineError> {
    let literal = match pair.as_rule() {
        Rule::string_literal => Literal::String(unescape_string(pair.as_str())),
        Rule::number_literal => {
            let text = pair.as_str();
            if text.contains('.') {
                Literal::Float(text.parse::<f64>().map_err(|_| {
                    EngineError::Syntax(format!("invalid number literal '{}'", text))
                })?)
            } else {
                Literal::Integer(text.parse::<i64>().map_err(|_| {
                    EngineError::Syntax(format!("invalid number literal '{}'", text))
                })?)
            }
        }
        Rule::boolean_literal => Literal::Boolean(pair.as_str() == "true"),
        Rule::null_literal => Literal::Null,
        Rule::undefined_literal => Literal::Undefined,
        Rule::object_literal => {
            let mut properties = vec![];
            for p in pair.into_inner() {
                if p.as_rule() == Rule::property {
                    let mut key = String::new();
                    let mut value = None;
                    for part in p.into_inner() {
                        match part.as_rule() {
                            Rule::property_key => {
                                let k = part.into_inner().next().ok_or_else(|| {
                                    EngineError::Syntax("empty property key".to_string())
                                })?;
                                key = match k.as_rule() {
                                    Rule::string_literal => unescape_string(k.as_str()),
                                    _ => k.as_str().to_string(),
                                };
                            }
                            Rule::expression => value = Some(build_expression(part)?),
                            _ => return Err(unexpected(&part)),
                        }
                    }
                    let value = value.ok_or_else(|| {
                        EngineError::Syntax(format!("property '{}' without a value", key))
                    })?;
                    properties.push((key, value));
                }
            }
            return Ok(Expression::Object(properties));
        }
        Rule::array_literal => {
            let mut items = vec![];
            for p in pair.into_inner() {
                if p.as_rule() == Rule::expression {
                    items.push(build_expression(p)?);
                }
            }
            return Ok(Expression::Array(items));
        }
        _ => return Err(unexpected(&pair)),
    };
    Ok(Expression::Literal(literal))
}

/// Strip the surrounding quotes and process the basic escapes.
fn unescape_string(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
