use strum_macros::{Display, EnumDiscriminants};
use type_system::CheckedType;

pub type ArgumentList<'src> = Vec<Expr<'src>>;

/// AST for simple expressions of a Java-like language. This deals only with
/// compile-time types; expressions are never evaluated.
///
/// Nodes are immutable once built. Checking them is a pure traversal, see
/// [`crate::expr_typechecker`].
#[derive(EnumDiscriminants, Debug, PartialEq, Clone)]
#[strum_discriminants(derive(Display))]
pub enum Expr<'src> {
    /// A read of a variable with the given declared type, e.g. `x`.
    Var(&'src str, CheckedType<'src>),

    /// A literal value as entered in the code, e.g. `5`. The text is kept
    /// verbatim and never interpreted.
    Literal(&'src str, CheckedType<'src>),

    /// The `null` literal. Its static type is the distinguished null type.
    Null,

    /// A method invocation, i.e. `foo.bar(0, 1, 2)`.
    MethodInvocation(Box<Expr<'src>>, &'src str, ArgumentList<'src>),

    /// An object instantiation, i.e. `new Foo(0, 1, 2)`. The instantiated
    /// type may be any checked type; `check_types` rejects non-reference
    /// ones as not instantiable.
    NewObject(CheckedType<'src>, ArgumentList<'src>),
}
