//! The class registry consumed by the expression type checker: class
//! definitions with their supertypes, method signatures and constructors,
//! plus the subtype relation over checked types.

use failure::Fail;
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    rc::Rc,
};

#[derive(Debug, Fail)]
#[fail(display = "class '{}' is already declared", name)]
pub struct ClassAlreadyDeclared {
    pub name: String,
}

#[derive(Debug, Fail)]
#[fail(display = "redefinition of {} '{}'", kind, name)]
pub struct RedefinitionError {
    pub kind: String, // "method", "parameter", ...
    pub name: String,
}

#[derive(Debug, Default)]
pub struct TypeSystem<'src> {
    defined_classes: HashMap<&'src str, Rc<ClassDef<'src>>>,
}

impl<'src> TypeSystem<'src> {
    pub fn is_type_defined(&self, name: &str) -> bool {
        self.defined_classes.contains_key(name)
    }

    pub fn add_class_def(
        &mut self,
        class_def: ClassDef<'src>,
    ) -> Result<ClassDefId<'src>, ClassAlreadyDeclared> {
        match self.defined_classes.entry(class_def.name) {
            Entry::Occupied(_) => Err(ClassAlreadyDeclared {
                name: class_def.name.to_string(),
            }),
            Entry::Vacant(e) => {
                let id = ClassDefId { id: class_def.name };
                log::debug!("add class {}", class_def.name);
                e.insert(Rc::new(class_def));
                Ok(id)
            }
        }
    }

    /// Mutable access for the second phase of building a type system:
    /// register all classes first, then fill in members, so signatures may
    /// refer to any registered class, including the one being filled in.
    /// Only usable while no other `Rc` handle to the class is held.
    pub fn class_mut(&mut self, id: ClassDefId<'src>) -> &mut ClassDef<'src> {
        self.defined_classes
            .get_mut(&id.id)
            .and_then(Rc::get_mut)
            .expect("Ids always point to existing classes")
    }

    pub fn class(&self, id: ClassDefId<'src>) -> Rc<ClassDef<'src>> {
        self.defined_classes
            .get(&id.id)
            .map(Rc::clone)
            .expect("Ids always point to existing classes")
    }

    pub fn lookup_class(&self, name: &str) -> Option<(Rc<ClassDef<'src>>, ClassDefId<'src>)> {
        self.defined_classes
            .get_key_value(name)
            .map(|(key, class)| (Rc::clone(class), ClassDefId { id: *key }))
    }

    /// Resolves a method by name on the given class, searching the class
    /// itself first and then its declared supertypes transitively. Each
    /// class is visited at most once, so the walk terminates on any
    /// hierarchy.
    pub fn resolve_method(
        &self,
        id: ClassDefId<'src>,
        name: &str,
    ) -> Option<Rc<ClassMethodDef<'src>>> {
        let mut worklist = vec![id];
        let mut visited: Vec<ClassDefId<'src>> = Vec::new();

        while let Some(current) = worklist.pop() {
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);

            let class = self.class(current);
            if let Some(method) = class.method(name) {
                return Some(method);
            }
            worklist.extend(class.supertypes().iter().cloned());
        }

        None
    }

    /// The reflexive-transitive closure of the declared supertype edges.
    pub fn is_subclass_of(&self, sub: ClassDefId<'src>, sup: ClassDefId<'src>) -> bool {
        let mut worklist = vec![sub];
        let mut visited: Vec<ClassDefId<'src>> = Vec::new();

        while let Some(current) = worklist.pop() {
            if current == sup {
                return true;
            }
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            worklist.extend(self.class(current).supertypes().iter().cloned());
        }

        false
    }
}

/// A `ClassDefId` refers to a class definition.
///
/// Having an instance of this struct ensures that
/// the type system that issued this instance can
/// provide the definition of that class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassDefId<'src> {
    id: &'src str,
}

impl<'src> From<ClassDefId<'src>> for CheckedType<'src> {
    fn from(id: ClassDefId<'src>) -> CheckedType<'src> {
        CheckedType::TypeRef(id)
    }
}

impl<'src> fmt::Display for ClassDefId<'src> {
    fn fmt(&self, f: &'_ mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl<'src> ClassDefId<'src> {
    pub fn as_str(&self) -> &'src str {
        self.id
    }
}

#[derive(Debug)]
pub struct ClassDef<'src> {
    pub name: &'src str,
    supertypes: Vec<ClassDefId<'src>>,
    methods: HashMap<&'src str, Rc<ClassMethodDef<'src>>>,
    constructor: Rc<ConstructorDef<'src>>,
}

impl<'src> ClassDef<'src> {
    pub fn new(name: &'src str) -> ClassDef<'src> {
        ClassDef {
            name,
            supertypes: Vec::new(),
            methods: HashMap::new(),
            constructor: Rc::new(ConstructorDef::default()),
        }
    }

    /// Declares a direct supertype. The id proves the supertype is already
    /// registered.
    pub fn add_supertype(&mut self, supertype: ClassDefId<'src>) {
        self.supertypes.push(supertype);
    }

    pub fn supertypes(&self) -> &[ClassDefId<'src>] {
        &self.supertypes
    }

    pub fn add_method(&mut self, method: ClassMethodDef<'src>) -> Result<(), RedefinitionError> {
        match self.methods.entry(method.name) {
            Entry::Occupied(_) => Err(RedefinitionError {
                kind: "method".to_string(),
                name: method.name.to_string(),
            }),
            Entry::Vacant(e) => {
                e.insert(Rc::new(method));
                Ok(())
            }
        }
    }

    pub fn method(&self, name: &str) -> Option<Rc<ClassMethodDef<'src>>> {
        self.methods.get(name).map(Rc::clone)
    }

    /// Every class has exactly one constructor; a fresh class starts with a
    /// zero-parameter one.
    pub fn set_constructor(&mut self, constructor: ConstructorDef<'src>) {
        self.constructor = Rc::new(constructor);
    }

    pub fn constructor(&self) -> Rc<ConstructorDef<'src>> {
        Rc::clone(&self.constructor)
    }
}

#[derive(Debug)]
pub struct ClassMethodDef<'src> {
    /// Name of the method
    pub name: &'src str,
    pub params: Vec<Rc<MethodParamDef<'src>>>,
    pub return_ty: CheckedType<'src>,
}

impl<'src> ClassMethodDef<'src> {
    pub fn new(
        name: &'src str,
        params: Vec<MethodParamDef<'src>>,
        return_ty: CheckedType<'src>,
    ) -> ClassMethodDef<'src> {
        ClassMethodDef {
            name,
            params: params.into_iter().map(Rc::new).collect(),
            return_ty,
        }
    }
}

#[derive(Debug)]
pub struct MethodParamDef<'src> {
    pub name: &'src str,
    pub ty: CheckedType<'src>,
}

impl<'src> MethodParamDef<'src> {
    pub fn new(name: &'src str, ty: CheckedType<'src>) -> MethodParamDef<'src> {
        MethodParamDef { name, ty }
    }
}

#[derive(Debug, Default)]
pub struct ConstructorDef<'src> {
    pub params: Vec<Rc<MethodParamDef<'src>>>,
}

impl<'src> ConstructorDef<'src> {
    pub fn new(params: Vec<MethodParamDef<'src>>) -> ConstructorDef<'src> {
        ConstructorDef {
            params: params.into_iter().map(Rc::new).collect(),
        }
    }
}

/// Classes every type system starts out with. `Object` is the root of the
/// reference type hierarchy; user classes normally declare it as a
/// supertype, directly or transitively.
pub struct BuiltinTypes<'src> {
    pub object: ClassDefId<'src>,
}

impl<'src> BuiltinTypes<'src> {
    pub fn add_to(type_system: &mut TypeSystem<'src>) -> BuiltinTypes<'src> {
        let object = type_system
            .add_class_def(ClassDef::new("Object"))
            .expect("builtins are added to a fresh type system");
        BuiltinTypes { object }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedType<'src> {
    Int,
    Boolean,
    Void,
    Null,
    TypeRef(ClassDefId<'src>),
    UnknownType(&'src str),
}

impl<'src> CheckedType<'src> {
    /// Reference types are the types that carry methods and constructors, as
    /// opposed to primitive-like types.
    pub fn is_reference(&self) -> bool {
        match self {
            CheckedType::TypeRef(_) => true,
            _ => false,
        }
    }

    pub fn is_subtype_of(&self, other: &CheckedType<'src>, ts: &TypeSystem<'src>) -> bool {
        use self::CheckedType::*;

        match (self, other) {
            // dont generate errors for unknown types as they are invalid anyways
            (UnknownType(_), _) | (_, UnknownType(_)) => true,
            (TypeRef(sub), TypeRef(sup)) => ts.is_subclass_of(*sub, *sup),
            // primitives and null are subtypes of themselves only; in
            // particular null does not report any reference type as a
            // supertype
            _ => self == other,
        }
    }
}

impl<'src> fmt::Display for CheckedType<'src> {
    fn fmt(&self, f: &'_ mut fmt::Formatter<'_>) -> fmt::Result {
        use self::CheckedType::*;
        match self {
            Int => write!(f, "int"),
            Boolean => write!(f, "boolean"),
            Void => write!(f, "void"),
            Null => write!(f, "null"),
            TypeRef(name) => write!(f, "{}", name),
            UnknownType(name) => write!(f, "?{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> (
        TypeSystem<'static>,
        ClassDefId<'static>,
        ClassDefId<'static>,
        ClassDefId<'static>,
    ) {
        let mut ts = TypeSystem::default();
        let object = BuiltinTypes::add_to(&mut ts).object;

        let mut shape = ClassDef::new("Shape");
        shape.add_supertype(object);
        shape
            .add_method(ClassMethodDef::new("area", vec![], CheckedType::Int))
            .unwrap();
        let shape = ts.add_class_def(shape).unwrap();

        let mut rect = ClassDef::new("Rectangle");
        rect.add_supertype(shape);
        let rect = ts.add_class_def(rect).unwrap();

        (ts, object, shape, rect)
    }

    #[test]
    fn registry_add_and_lookup() {
        let (ts, _, shape, _) = hierarchy();

        assert!(ts.is_type_defined("Shape"));
        assert!(!ts.is_type_defined("Circle"));

        let (class, id) = ts.lookup_class("Shape").expect("Shape was registered");
        assert_eq!(class.name, "Shape");
        assert_eq!(id, shape);
        assert_eq!(id.as_str(), "Shape");
        assert!(ts.lookup_class("Circle").is_none());
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let (mut ts, _, _, _) = hierarchy();

        let err = ts.add_class_def(ClassDef::new("Shape")).unwrap_err();
        assert_eq!(err.to_string(), "class 'Shape' is already declared");
    }

    #[test]
    fn duplicate_method_is_rejected() {
        let mut class = ClassDef::new("Shape");
        class
            .add_method(ClassMethodDef::new("area", vec![], CheckedType::Int))
            .unwrap();
        let err = class
            .add_method(ClassMethodDef::new("area", vec![], CheckedType::Boolean))
            .unwrap_err();
        assert_eq!(err.to_string(), "redefinition of method 'area'");
    }

    #[test]
    fn members_can_refer_to_their_own_class() {
        let mut ts = TypeSystem::default();
        let node = ts.add_class_def(ClassDef::new("Node")).unwrap();

        // second phase: the signature mentions the class it belongs to
        ts.class_mut(node)
            .add_method(ClassMethodDef::new(
                "next",
                vec![],
                CheckedType::TypeRef(node),
            ))
            .unwrap();

        let method = ts.resolve_method(node, "next").unwrap();
        assert_eq!(method.return_ty, CheckedType::TypeRef(node));
    }

    #[test]
    fn method_resolution_searches_supertypes() {
        let (ts, _, _, rect) = hierarchy();

        let method = ts.resolve_method(rect, "area").expect("inherited method");
        assert_eq!(method.name, "area");
        assert_eq!(method.return_ty, CheckedType::Int);
        assert!(ts.resolve_method(rect, "perimeter").is_none());
    }

    #[test]
    fn own_method_shadows_inherited_one() {
        let (mut ts, _, shape, _) = hierarchy();

        let mut square = ClassDef::new("Square");
        square.add_supertype(shape);
        square
            .add_method(ClassMethodDef::new("area", vec![], CheckedType::Boolean))
            .unwrap();
        let square = ts.add_class_def(square).unwrap();

        let method = ts.resolve_method(square, "area").unwrap();
        assert_eq!(method.return_ty, CheckedType::Boolean);
    }

    #[test]
    fn subclass_relation_is_reflexive_and_transitive() {
        let (ts, object, shape, rect) = hierarchy();

        assert!(ts.is_subclass_of(rect, rect));
        assert!(ts.is_subclass_of(rect, shape));
        assert!(ts.is_subclass_of(rect, object));
        assert!(!ts.is_subclass_of(shape, rect));
        assert!(!ts.is_subclass_of(object, shape));
    }

    #[test]
    fn cyclic_supertypes_terminate() {
        let mut ts = TypeSystem::default();
        let a = ts.add_class_def(ClassDef::new("A")).unwrap();
        let b = ts.add_class_def(ClassDef::new("B")).unwrap();
        ts.class_mut(a).add_supertype(b);
        ts.class_mut(b).add_supertype(a);

        assert!(ts.is_subclass_of(a, b));
        assert!(ts.is_subclass_of(b, a));
        let c = ts.add_class_def(ClassDef::new("C")).unwrap();
        assert!(!ts.is_subclass_of(a, c));
        assert!(ts.resolve_method(a, "anything").is_none());
    }

    #[test]
    fn subtype_relation() {
        let (ts, object, shape, rect) = hierarchy();
        use super::CheckedType::*;

        assert!(Int.is_subtype_of(&Int, &ts));
        assert!(!Int.is_subtype_of(&Boolean, &ts));
        assert!(Null.is_subtype_of(&Null, &ts));
        assert!(TypeRef(rect).is_subtype_of(&TypeRef(shape), &ts));
        assert!(!TypeRef(shape).is_subtype_of(&TypeRef(rect), &ts));
        assert!(TypeRef(shape).is_subtype_of(&TypeRef(object), &ts));

        // null supports no method and reports no reference supertype; the
        // checker grants it reference compatibility separately
        assert!(!Null.is_subtype_of(&TypeRef(object), &ts));
        assert!(!Int.is_subtype_of(&TypeRef(object), &ts));

        assert!(UnknownType("x").is_subtype_of(&Int, &ts));
        assert!(TypeRef(rect).is_subtype_of(&UnknownType("x"), &ts));
    }

    #[test]
    fn constructor_defaults_to_no_parameters() {
        let (mut ts, _, _, _) = hierarchy();

        let plain = ts.add_class_def(ClassDef::new("Plain")).unwrap();
        assert!(ts.class(plain).constructor().params.is_empty());

        let mut point = ClassDef::new("Point");
        point.set_constructor(ConstructorDef::new(vec![
            MethodParamDef::new("x", CheckedType::Int),
            MethodParamDef::new("y", CheckedType::Int),
        ]));
        let point = ts.add_class_def(point).unwrap();

        let ctor = ts.class(point).constructor();
        assert_eq!(ctor.params.len(), 2);
        assert_eq!(ctor.params[0].ty, CheckedType::Int);
    }

    #[test]
    fn display_renderings() {
        let (_ts, _, shape, _) = hierarchy();

        assert_eq!(CheckedType::Int.to_string(), "int");
        assert_eq!(CheckedType::Boolean.to_string(), "boolean");
        assert_eq!(CheckedType::Void.to_string(), "void");
        assert_eq!(CheckedType::Null.to_string(), "null");
        assert_eq!(CheckedType::TypeRef(shape).to_string(), "Shape");
        assert_eq!(CheckedType::UnknownType("area").to_string(), "?area");
    }
}
