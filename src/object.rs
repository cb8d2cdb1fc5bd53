//! Runtime value model for the evaluator.
//!
//! One closed sum type covers every value the language can produce.
//! `inspect()` is the user-visible rendering; `type_name()` is the tag
//! used in error messages.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{BlockStatement, InfixOperator, PrefixOperator};
use crate::builtins::Builtin;
use crate::environment::Env;

#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    String(String),
    Null,
    /// In-band marker produced by `return`; blocks propagate it, the
    /// program and function application unwrap it. Never user-visible.
    ReturnValue(Box<Object>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Array(Vec<Object>),
    /// Entries keep literal insertion order, so `inspect()` is
    /// deterministic. Lookup goes through the key fingerprint.
    Hash(Vec<(HashKey, Object)>),
}

/// A user-defined function value: parameters, body, and the environment
/// captured at the definition site.
#[derive(Debug)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Env,
}

/// Deterministic fingerprint of a hashable value. Only `Integer`,
/// `Boolean` and `String` values hash; the enum discriminant keeps keys
/// of different types distinct even when their contents collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::Boolean(_) => "BOOLEAN",
            Self::String(_) => "STRING",
            Self::Null => "NULL",
            Self::ReturnValue(_) => "RETURN_VALUE",
            Self::Function(_) => "FUNCTION",
            Self::Builtin(_) => "BUILTIN",
            Self::Array(_) => "ARRAY",
            Self::Hash(_) => "HASH",
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Boolean(value) => value.to_string(),
            Self::String(value) => value.clone(),
            Self::Null => "null".to_string(),
            Self::ReturnValue(wrapped) => wrapped.inspect(),
            Self::Function(function) => {
                format!(
                    "fn({}) {{\n{}\n}}",
                    function.parameters.join(", "),
                    function.body
                )
            }
            Self::Builtin(_) => "builtin function".to_string(),
            Self::Array(elements) => {
                let rendered = elements
                    .iter()
                    .map(Object::inspect)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Self::Hash(entries) => {
                let rendered = entries
                    .iter()
                    .map(|(key, value)| format!("{key}: {}", value.inspect()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{rendered}}}")
            }
        }
    }

    /// Only `false` and `null` are falsy; integer zero and empty
    /// collections are truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false) | Self::Null)
    }

    pub fn hash_key(&self) -> Result<HashKey, RuntimeError> {
        match self {
            Self::Integer(value) => Ok(HashKey::Integer(*value)),
            Self::Boolean(value) => Ok(HashKey::Boolean(*value)),
            Self::String(value) => Ok(HashKey::String(value.clone())),
            other => Err(RuntimeError::UnusableHashKey {
                type_name: other.type_name(),
            }),
        }
    }
}

// Function values compare by identity; everything else by content.
// Derivation would recurse into captured environments (and any closure
// cycle in them), so equality is spelled out.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (Self::ReturnValue(a), Self::ReturnValue(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Hash(a), Self::Hash(b)) => a == b,
            _ => false,
        }
    }
}

/// Runtime failures, shared by the evaluator and the builtins. The
/// `#[error]` strings are the user-visible messages; drivers prefix them
/// with `ERROR: ` when rendering results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("unknown operator: {operator}{operand}")]
    UnknownPrefixOperator {
        operator: PrefixOperator,
        operand: &'static str,
    },
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("identifier not found: {name}")]
    IdentifierNotFound { name: String },
    #[error("not a function: {type_name}")]
    NotAFunction { type_name: &'static str },
    #[error("unusable as hash key: {type_name}")]
    UnusableHashKey { type_name: &'static str },
    #[error("index operator not supported: {type_name}")]
    IndexNotSupported { type_name: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("wrong number of arguments. got={got}, want={want}")]
    WrongArgumentCount { got: usize, want: usize },
    #[error("argument to `len` not supported, got {type_name}")]
    LenNotSupported { type_name: &'static str },
    #[error("argument to `{builtin}` must be ARRAY, got {type_name}")]
    ExpectedArray {
        builtin: &'static str,
        type_name: &'static str,
    },
    #[error("could not write output: {message}")]
    Output { message: String },
}
