//! Static type checking for expression trees of a small Java-like language:
//! variable reads, literals, method invocations and object instantiations.
//! Expressions are validated against a class registry provided by the
//! `type-system` crate; nothing here evaluates anything.
#![warn(rust_2018_idioms)]
#![warn(clippy::print_stdout)]

pub mod ast;
pub mod expr_typechecker;

pub use crate::{ast::Expr, expr_typechecker::TypeCheckError};
