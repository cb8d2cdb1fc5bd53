use std::io::Write;

use crate::object::{Object, RuntimeError};

/// The fixed table of built-in functions. Builtins are resolved by name
/// only after environment lookup fails, so user bindings shadow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Len,
    First,
    Last,
    Rest,
    Push,
    Puts,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "len" => Some(Self::Len),
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            "rest" => Some(Self::Rest),
            "push" => Some(Self::Push),
            "puts" => Some(Self::Puts),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::First => "first",
            Self::Last => "last",
            Self::Rest => "rest",
            Self::Push => "push",
            Self::Puts => "puts",
        }
    }

    pub fn apply(self, args: Vec<Object>, out: &mut dyn Write) -> Result<Object, RuntimeError> {
        match self {
            Self::Len => {
                expect_arity(&args, 1)?;
                match &args[0] {
                    Object::String(value) => Ok(Object::Integer(value.len() as i64)),
                    Object::Array(elements) => Ok(Object::Integer(elements.len() as i64)),
                    other => Err(RuntimeError::LenNotSupported {
                        type_name: other.type_name(),
                    }),
                }
            }
            Self::First => {
                expect_arity(&args, 1)?;
                let elements = expect_array(self, &args[0])?;
                Ok(elements.first().cloned().unwrap_or(Object::Null))
            }
            Self::Last => {
                expect_arity(&args, 1)?;
                let elements = expect_array(self, &args[0])?;
                Ok(elements.last().cloned().unwrap_or(Object::Null))
            }
            Self::Rest => {
                expect_arity(&args, 1)?;
                let elements = expect_array(self, &args[0])?;
                if elements.is_empty() {
                    Ok(Object::Null)
                } else {
                    Ok(Object::Array(elements[1..].to_vec()))
                }
            }
            Self::Push => {
                expect_arity(&args, 2)?;
                let elements = expect_array(self, &args[0])?;
                let mut extended = elements.to_vec();
                extended.push(args[1].clone());
                Ok(Object::Array(extended))
            }
            Self::Puts => {
                for arg in &args {
                    writeln!(out, "{}", arg.inspect()).map_err(|error| RuntimeError::Output {
                        message: error.to_string(),
                    })?;
                }
                Ok(Object::Null)
            }
        }
    }
}

fn expect_arity(args: &[Object], want: usize) -> Result<(), RuntimeError> {
    if args.len() == want {
        Ok(())
    } else {
        Err(RuntimeError::WrongArgumentCount {
            got: args.len(),
            want,
        })
    }
}

fn expect_array(builtin: Builtin, arg: &Object) -> Result<&[Object], RuntimeError> {
    match arg {
        Object::Array(elements) => Ok(elements),
        other => Err(RuntimeError::ExpectedArray {
            builtin: builtin.name(),
            type_name: other.type_name(),
        }),
    }
}
