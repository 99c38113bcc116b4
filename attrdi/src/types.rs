//! Runtime type identities
//!
//! A [`TypeRef`] pairs a `TypeId` with a readable name and, for instances of a
//! generic contract such as `dyn Repository<Vec<Order>>`, the generic
//! definition and its arguments. The definition of a generic is represented
//! by the same type with every argument replaced by [`Open`], so
//! `dyn Repository<Open>` stands for "any `dyn Repository<_>`".
//!
//! The attribute macros build these values; hand-written code can use
//! [`TypeRef::of`] and [`TypeRef::generic`].

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Placeholder for an unbound generic argument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Open;

/// Identity of a generic type definition
#[derive(Clone, Copy)]
pub struct GenericDef {
    id: TypeId,
    name: &'static str,
}

impl GenericDef {
    /// Definition whose arguments have been replaced by [`Open`]
    pub fn of<D: ?Sized + 'static>() -> Self {
        let full = type_name::<D>();
        let name = full.split('<').next().unwrap_or(full);
        Self {
            id: TypeId::of::<D>(),
            name,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Path of the definition without its argument list
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for GenericDef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GenericDef {}

impl Hash for GenericDef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for GenericDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<..>", self.name)
    }
}

struct GenericShape {
    definition: GenericDef,
    arguments: Vec<TypeRef>,
}

/// A runtime type handle, compared by `TypeId`
#[derive(Clone)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    generic: Option<Arc<GenericShape>>,
}

impl TypeRef {
    /// Handle for a non-generic type (or a generic one whose shape is not needed)
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            generic: None,
        }
    }

    /// Handle for an instance of a generic definition
    ///
    /// `T` is the instance itself and `D` the definition with every argument
    /// replaced by [`Open`].
    ///
    /// # Example
    /// ```rust,ignore
    /// let contract = TypeRef::generic::<dyn Repository<Order>, dyn Repository<Open>>(
    ///     vec![TypeRef::of::<Order>()],
    /// );
    /// ```
    pub fn generic<T: ?Sized + 'static, D: ?Sized + 'static>(arguments: Vec<TypeRef>) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            generic: Some(Arc::new(GenericShape {
                definition: GenericDef::of::<D>(),
                arguments,
            })),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name as reported by `std::any::type_name`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name with module paths stripped, e.g. `dyn Repository<Vec<Order>>`
    pub fn short_name(&self) -> String {
        shorten(self.name)
    }

    /// Whether this handle names a trait object (`dyn Trait`)
    pub fn is_trait_object(&self) -> bool {
        self.name.starts_with("dyn ")
    }

    pub fn is_generic(&self) -> bool {
        self.generic.is_some()
    }

    pub fn definition(&self) -> Option<GenericDef> {
        self.generic.as_ref().map(|shape| shape.definition)
    }

    pub fn arguments(&self) -> &[TypeRef] {
        self.generic
            .as_ref()
            .map(|shape| shape.arguments.as_slice())
            .unwrap_or(&[])
    }

    /// True for [`Open`] itself or any generic with an open argument
    pub fn is_open(&self) -> bool {
        self.id == TypeId::of::<Open>() || self.arguments().iter().any(TypeRef::is_open)
    }

    /// Whether this handle is an instance of the given generic definition
    pub fn is_instance_of(&self, definition: &GenericDef) -> bool {
        self.definition().as_ref() == Some(definition)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.short_name())
    }
}

fn shorten(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut segment = String::new();
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
        } else if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Repository<T> {}
    struct Order;

    #[test]
    fn short_name_strips_module_paths() {
        assert_eq!(TypeRef::of::<dyn Repository<Vec<Order>>>().short_name(), "dyn Repository<Vec<Order>>");
        assert_eq!(TypeRef::of::<Order>().short_name(), "Order");
        assert_eq!(shorten("(alloc::string::String, u8)"), "(String, u8)");
    }

    #[test]
    fn equality_ignores_generic_shape() {
        let plain = TypeRef::of::<dyn Repository<Order>>();
        let shaped =
            TypeRef::generic::<dyn Repository<Order>, dyn Repository<Open>>(vec![TypeRef::of::<Order>()]);
        assert_eq!(plain, shaped);
        assert!(!plain.is_generic());
        assert!(shaped.is_generic());
    }

    #[test]
    fn generic_definition_is_shared_by_instances() {
        let orders =
            TypeRef::generic::<dyn Repository<Order>, dyn Repository<Open>>(vec![TypeRef::of::<Order>()]);
        let numbers = TypeRef::generic::<dyn Repository<u64>, dyn Repository<Open>>(vec![TypeRef::of::<u64>()]);
        let definition = GenericDef::of::<dyn Repository<Open>>();

        assert_ne!(orders, numbers);
        assert!(orders.is_instance_of(&definition));
        assert!(numbers.is_instance_of(&definition));
        assert!(definition.name().ends_with("Repository"));
    }

    #[test]
    fn open_arguments_are_detected() {
        let open = TypeRef::generic::<dyn Repository<Open>, dyn Repository<Open>>(vec![TypeRef::of::<Open>()]);
        let nested = TypeRef::generic::<dyn Repository<Vec<Open>>, dyn Repository<Open>>(vec![
            TypeRef::generic::<Vec<Open>, Vec<Open>>(vec![TypeRef::of::<Open>()]),
        ]);
        let closed = TypeRef::generic::<dyn Repository<Order>, dyn Repository<Open>>(vec![TypeRef::of::<Order>()]);

        assert!(open.is_open());
        assert!(nested.is_open());
        assert!(!closed.is_open());
        assert!(TypeRef::of::<dyn Repository<Order>>().is_trait_object());
        assert!(!TypeRef::of::<Order>().is_trait_object());
    }
}
