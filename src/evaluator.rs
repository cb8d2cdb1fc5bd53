//! Tree-walking evaluator.
//!
//! `eval` recurses over the AST carrying an environment handle. Runtime
//! failures short-circuit through `Result`; `return` travels in-band as
//! `Object::ReturnValue` so it can unwind out of nested blocks, and is
//! unwrapped exactly once at program level or at a call boundary.

use std::io::Write;
use std::rc::Rc;

use crate::ast::{
    BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::builtins::Builtin;
use crate::environment::{Env, Environment};
use crate::object::{Function, HashKey, Object, RuntimeError};

pub type EvalResult = Result<Object, RuntimeError>;

/// Evaluates a program in the given environment. `puts` output goes to
/// `out`; drivers pass stdout, tests pass a buffer.
pub fn eval(program: &Program, env: &Env, out: &mut impl Write) -> EvalResult {
    Evaluator { out }.eval_program(program, env)
}

struct Evaluator<'a, W: Write> {
    out: &'a mut W,
}

impl<W: Write> Evaluator<'_, W> {
    fn eval_program(&mut self, program: &Program, env: &Env) -> EvalResult {
        let mut result = Object::Null;
        for statement in &program.statements {
            result = self.eval_statement(statement, env)?;
            if let Object::ReturnValue(value) = result {
                return Ok(*value);
            }
        }
        Ok(result)
    }

    fn eval_statement(&mut self, statement: &Statement, env: &Env) -> EvalResult {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expression(value, env)?;
                env.borrow_mut().set(name.clone(), value);
                Ok(Object::Null)
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value, env)?;
                Ok(Object::ReturnValue(Box::new(value)))
            }
            Statement::Expression(expression) => self.eval_expression(expression, env),
        }
    }

    // Unlike eval_program, a block passes ReturnValue through still
    // wrapped, so a return deep inside nested blocks unwinds the whole
    // function body.
    fn eval_block(&mut self, block: &BlockStatement, env: &Env) -> EvalResult {
        let mut result = Object::Null;
        for statement in &block.statements {
            result = self.eval_statement(statement, env)?;
            if matches!(result, Object::ReturnValue(_)) {
                return Ok(result);
            }
        }
        Ok(result)
    }

    fn eval_expression(&mut self, expression: &Expression, env: &Env) -> EvalResult {
        match expression {
            Expression::Integer(value) => Ok(Object::Integer(*value)),
            Expression::Boolean(value) => Ok(Object::Boolean(*value)),
            Expression::String(value) => Ok(Object::String(value.clone())),
            Expression::Identifier(name) => eval_identifier(name, env),
            Expression::Prefix { operator, right } => {
                let right = self.eval_expression(right, env)?;
                eval_prefix_expression(*operator, right)
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left, env)?;
                let right = self.eval_expression(right, env)?;
                eval_infix_expression(*operator, left, right)
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = self.eval_expression(condition, env)?;
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(Object::Null)
                }
            }
            Expression::Function { parameters, body } => {
                Ok(Object::Function(Rc::new(Function {
                    parameters: parameters.clone(),
                    body: body.clone(),
                    env: Rc::clone(env),
                })))
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let function = self.eval_expression(function, env)?;
                let arguments = self.eval_expressions(arguments, env)?;
                self.apply_function(function, arguments)
            }
            Expression::Array(elements) => {
                Ok(Object::Array(self.eval_expressions(elements, env)?))
            }
            Expression::Index { left, index } => {
                let left = self.eval_expression(left, env)?;
                let index = self.eval_expression(index, env)?;
                eval_index_expression(left, index)
            }
            Expression::Hash(pairs) => self.eval_hash_literal(pairs, env),
        }
    }

    fn eval_expressions(
        &mut self,
        expressions: &[Expression],
        env: &Env,
    ) -> Result<Vec<Object>, RuntimeError> {
        expressions
            .iter()
            .map(|expression| self.eval_expression(expression, env))
            .collect()
    }

    fn apply_function(&mut self, function: Object, arguments: Vec<Object>) -> EvalResult {
        match function {
            Object::Function(function) => {
                let scope = Environment::new_enclosed(Rc::clone(&function.env));
                {
                    let mut scope = scope.borrow_mut();
                    for (position, parameter) in function.parameters.iter().enumerate() {
                        // Arity is not checked: missing arguments bind to
                        // null, extra arguments are dropped.
                        let value = arguments.get(position).cloned().unwrap_or(Object::Null);
                        scope.set(parameter.clone(), value);
                    }
                }
                match self.eval_block(&function.body, &scope)? {
                    Object::ReturnValue(value) => Ok(*value),
                    other => Ok(other),
                }
            }
            Object::Builtin(builtin) => builtin.apply(arguments, self.out),
            other => Err(RuntimeError::NotAFunction {
                type_name: other.type_name(),
            }),
        }
    }

    fn eval_hash_literal(
        &mut self,
        pairs: &[(Expression, Expression)],
        env: &Env,
    ) -> EvalResult {
        let mut entries: Vec<(HashKey, Object)> = Vec::with_capacity(pairs.len());
        for (key_expression, value_expression) in pairs {
            let key = self.eval_expression(key_expression, env)?.hash_key()?;
            let value = self.eval_expression(value_expression, env)?;
            if let Some(entry) = entries.iter_mut().find(|(existing, _)| *existing == key) {
                entry.1 = value;
            } else {
                entries.push((key, value));
            }
        }
        Ok(Object::Hash(entries))
    }
}

fn eval_identifier(name: &str, env: &Env) -> EvalResult {
    if let Some(value) = env.borrow().get(name) {
        return Ok(value);
    }
    if let Some(builtin) = Builtin::lookup(name) {
        return Ok(Object::Builtin(builtin));
    }
    Err(RuntimeError::IdentifierNotFound {
        name: name.to_string(),
    })
}

fn eval_prefix_expression(operator: PrefixOperator, right: Object) -> EvalResult {
    match operator {
        PrefixOperator::Bang => Ok(Object::Boolean(!right.is_truthy())),
        PrefixOperator::Minus => match right {
            Object::Integer(value) => Ok(Object::Integer(value.wrapping_neg())),
            other => Err(RuntimeError::UnknownPrefixOperator {
                operator,
                operand: other.type_name(),
            }),
        },
    }
}

// Dispatch order matters: the equality cases come before the
// type-mismatch check, so `5 == true` is `false` rather than an error,
// while `5 + true` is a type mismatch.
fn eval_infix_expression(operator: InfixOperator, left: Object, right: Object) -> EvalResult {
    match (&left, &right) {
        (Object::Integer(l), Object::Integer(r)) => {
            eval_integer_infix_expression(operator, *l, *r)
        }
        _ if operator == InfixOperator::Eq => Ok(Object::Boolean(values_equal(&left, &right))),
        _ if operator == InfixOperator::NotEq => {
            Ok(Object::Boolean(!values_equal(&left, &right)))
        }
        _ if left.type_name() != right.type_name() => Err(RuntimeError::TypeMismatch {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
        (Object::String(l), Object::String(r)) if operator == InfixOperator::Plus => {
            Ok(Object::String(format!("{l}{r}")))
        }
        _ => Err(RuntimeError::UnknownInfixOperator {
            left: left.type_name(),
            operator,
            right: right.type_name(),
        }),
    }
}

fn eval_integer_infix_expression(operator: InfixOperator, left: i64, right: i64) -> EvalResult {
    let result = match operator {
        InfixOperator::Plus => Object::Integer(left.wrapping_add(right)),
        InfixOperator::Minus => Object::Integer(left.wrapping_sub(right)),
        InfixOperator::Asterisk => Object::Integer(left.wrapping_mul(right)),
        InfixOperator::Slash => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Object::Integer(left.wrapping_div(right))
        }
        InfixOperator::Lt => Object::Boolean(left < right),
        InfixOperator::Gt => Object::Boolean(left > right),
        InfixOperator::Eq => Object::Boolean(left == right),
        InfixOperator::NotEq => Object::Boolean(left != right),
    };
    Ok(result)
}

// Equality by content for the scalar variants; functions, arrays and
// hashes never compare equal through `==`.
fn values_equal(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Integer(l), Object::Integer(r)) => l == r,
        (Object::Boolean(l), Object::Boolean(r)) => l == r,
        (Object::String(l), Object::String(r)) => l == r,
        (Object::Null, Object::Null) => true,
        _ => false,
    }
}

fn eval_index_expression(left: Object, index: Object) -> EvalResult {
    match (left, index) {
        (Object::Array(elements), Object::Integer(position)) => {
            // Out-of-bounds and negative indices yield null, not errors.
            let element = usize::try_from(position)
                .ok()
                .and_then(|position| elements.get(position).cloned());
            Ok(element.unwrap_or(Object::Null))
        }
        (Object::Hash(entries), key) => {
            let key = key.hash_key()?;
            let value = entries
                .iter()
                .find(|(existing, _)| *existing == key)
                .map(|(_, value)| value.clone());
            Ok(value.unwrap_or(Object::Null))
        }
        (other, _) => Err(RuntimeError::IndexNotSupported {
            type_name: other.type_name(),
        }),
    }
}
