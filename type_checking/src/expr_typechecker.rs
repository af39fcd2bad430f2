//! Validation of expression trees against the class registry: `static_type`
//! computes the compile-time type of an expression, `check_types` reports
//! the first logical inconsistency in depth-first, left-to-right order.

use crate::ast::{Expr, ExprDiscriminants};
use failure::Fail;
use itertools::Itertools;
use std::rc::Rc;
use type_system::{CheckedType, ClassMethodDef, MethodParamDef, TypeSystem};

/// A compile-time type error in an expression.
#[derive(Debug, Fail, PartialEq)]
pub enum TypeCheckError {
    /// A method was invoked on an expression statically known to be null.
    #[fail(display = "cannot invoke method {}() on null", method_name)]
    NoSuchMethod { method_name: String },

    #[fail(display = "no method named '{}' on type '{}'", method_name, ty)]
    MethodDoesNotExistOnType { method_name: String, ty: String },

    #[fail(display = "type '{}' does not have methods", ty)]
    TypeDoesNotHaveMethods { ty: String },

    #[fail(
        display = "wrong number of arguments for {}.{}(): expected {}, got {}",
        ty, method_name, expected_args, actual_args
    )]
    MethodArgCountDoesNotMatch {
        ty: String,
        method_name: String,
        expected_args: usize,
        actual_args: usize,
    },

    #[fail(
        display = "{}.{}() expects arguments of type ({}), but got ({})",
        ty, method_name, expected, actual
    )]
    MethodArgTypeMismatch {
        ty: String,
        method_name: String,
        expected: String,
        actual: String,
    },

    #[fail(display = "type '{}' is not instantiable", ty)]
    NotInstantiable { ty: String },

    #[fail(
        display = "wrong number of arguments for {} constructor: expected {}, got {}",
        ty, expected_args, actual_args
    )]
    ConstructorArgCountDoesNotMatch {
        ty: String,
        expected_args: usize,
        actual_args: usize,
    },

    #[fail(
        display = "{} constructor expects arguments of type ({}), but got ({})",
        ty, expected, actual
    )]
    ConstructorArgTypeMismatch {
        ty: String,
        expected: String,
        actual: String,
    },
}

impl<'src> Expr<'src> {
    /// Returns the compile-time type of this expression, i.e. the most
    /// specific type that describes all the possible values it could take on
    /// at runtime.
    ///
    /// Total and pure: an invocation whose method cannot be resolved yields
    /// an unknown type instead of failing; [`Expr::check_types`] is the
    /// place that reports the inconsistency. The type is recomputed on every
    /// call.
    pub fn static_type(&self, type_system: &TypeSystem<'src>) -> CheckedType<'src> {
        match self {
            Expr::Var(_, declared_ty) => declared_ty.clone(),
            Expr::Literal(_, ty) => ty.clone(),
            Expr::Null => CheckedType::Null,
            Expr::MethodInvocation(target, name, _) => {
                match resolve_method_on(&target.static_type(type_system), name, type_system) {
                    Some(method) => method.return_ty.clone(),
                    None => CheckedType::UnknownType(*name),
                }
            }
            Expr::NewObject(ty, _) => ty.clone(),
        }
    }

    /// Validates the structure of this expression, checking for logical
    /// inconsistencies in the child nodes and the operation this expression
    /// applies to them.
    ///
    /// Arguments are validated before the enclosing call, left to right; the
    /// first inconsistency aborts the remaining traversal.
    pub fn check_types(&self, type_system: &TypeSystem<'src>) -> Result<(), TypeCheckError> {
        log::debug!("check {} expression", ExprDiscriminants::from(self));

        match self {
            Expr::Var(..) | Expr::Literal(..) | Expr::Null => Ok(()),
            Expr::MethodInvocation(target, name, args) => {
                for arg in args {
                    arg.check_types(type_system)?;
                }
                check_method_invocation(target, name, args, type_system)
            }
            Expr::NewObject(ty, args) => {
                for arg in args {
                    arg.check_types(type_system)?;
                }
                check_object_instantiation(ty, args, type_system)
            }
        }
    }
}

fn resolve_method_on<'src>(
    target_ty: &CheckedType<'src>,
    name: &str,
    type_system: &TypeSystem<'src>,
) -> Option<Rc<ClassMethodDef<'src>>> {
    match target_ty {
        CheckedType::TypeRef(id) => type_system.resolve_method(*id, name),
        _ => None,
    }
}

fn check_method_invocation<'src>(
    target: &Expr<'src>,
    method_name: &str,
    args: &[Expr<'src>],
    type_system: &TypeSystem<'src>,
) -> Result<(), TypeCheckError> {
    let target_ty = target.static_type(type_system);
    let class_id = match &target_ty {
        // the null type has no methods, whatever the name
        CheckedType::Null => {
            return Err(TypeCheckError::NoSuchMethod {
                method_name: method_name.to_string(),
            });
        }
        CheckedType::TypeRef(id) => *id,
        _ => {
            return Err(TypeCheckError::TypeDoesNotHaveMethods {
                ty: target_ty.to_string(),
            });
        }
    };

    let method = match type_system.resolve_method(class_id, method_name) {
        Some(method) => method,
        None => {
            return Err(TypeCheckError::MethodDoesNotExistOnType {
                method_name: method_name.to_string(),
                ty: target_ty.to_string(),
            });
        }
    };

    if args.len() != method.params.len() {
        return Err(TypeCheckError::MethodArgCountDoesNotMatch {
            ty: target_ty.to_string(),
            method_name: method_name.to_string(),
            expected_args: method.params.len(),
            actual_args: args.len(),
        });
    }

    if !arguments_convertible(args, &method.params, type_system) {
        return Err(TypeCheckError::MethodArgTypeMismatch {
            ty: target_ty.to_string(),
            method_name: method_name.to_string(),
            expected: param_type_names(&method.params),
            actual: arg_type_names(args, type_system),
        });
    }

    Ok(())
}

fn check_object_instantiation<'src>(
    instantiated_ty: &CheckedType<'src>,
    args: &[Expr<'src>],
    type_system: &TypeSystem<'src>,
) -> Result<(), TypeCheckError> {
    let class_id = match instantiated_ty {
        CheckedType::TypeRef(id) => *id,
        _ => {
            return Err(TypeCheckError::NotInstantiable {
                ty: instantiated_ty.to_string(),
            });
        }
    };

    let constructor = type_system.class(class_id).constructor();

    if args.len() != constructor.params.len() {
        return Err(TypeCheckError::ConstructorArgCountDoesNotMatch {
            ty: instantiated_ty.to_string(),
            expected_args: constructor.params.len(),
            actual_args: args.len(),
        });
    }

    if !arguments_convertible(args, &constructor.params, type_system) {
        return Err(TypeCheckError::ConstructorArgTypeMismatch {
            ty: instantiated_ty.to_string(),
            expected: param_type_names(&constructor.params),
            actual: arg_type_names(args, type_system),
        });
    }

    Ok(())
}

/// Judges per-position compatibility only. Argument count is the caller's
/// concern; pairs beyond the shorter list are ignored here. Stops at the
/// first incompatible pair.
fn arguments_convertible<'src>(
    args: &[Expr<'src>],
    params: &[Rc<MethodParamDef<'src>>],
    type_system: &TypeSystem<'src>,
) -> bool {
    args.iter().zip(params.iter()).all(|(arg, param)| {
        let arg_ty = arg.static_type(type_system);
        // null is accepted wherever a reference type is expected, even
        // though the null type reports no reference supertype
        arg_ty.is_subtype_of(&param.ty, type_system)
            || (arg_ty == CheckedType::Null && param.ty.is_reference())
    })
}

fn param_type_names<'src>(params: &[Rc<MethodParamDef<'src>>]) -> String {
    params.iter().map(|param| param.ty.to_string()).join(", ")
}

fn arg_type_names<'src>(args: &[Expr<'src>], type_system: &TypeSystem<'src>) -> String {
    args.iter()
        .map(|arg| arg.static_type(type_system).to_string())
        .join(", ")
}
