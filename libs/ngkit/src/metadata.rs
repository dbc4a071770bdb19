//! Per-class metadata store.
//!
//! Design goals:
//! - Declarations attach metadata once per `(key, class)`; the assembler reads it many times.
//! - Keys are typed (`MetadataKey<V>`), so readers get back exactly what writers stored.
//! - Metadata belongs to the class identity (`ClassId`), never to instances.
//!
//! Implementation details:
//! - Key = (key name, `ClassId`). `ClassId` wraps `type_name::<T>()`, which is stable
//!   across crates linked into the same binary.
//! - Value = `V` stored as `Box<dyn Any + Send + Sync>` (downcast + clone on read).
//!
//! Notes:
//! - `attach` overwrites the previous value for the exact pair. Merging (e.g. bindings)
//!   is done by callers through `update`.
//! - `MetadataStore::discover()` runs every `Registrator` submitted with [`declare!`](crate::declare).

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, fmt, marker::PhantomData};

use crate::declarations::{Bindings, DeclarationKind, DeclarationRecipe, ServiceRecipe};
use crate::error::DeclareError;

/// Identity of a declared type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(&'static str);

impl ClassId {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        ClassId(std::any::type_name::<T>())
    }

    /// Fully-qualified type path, e.g. `my_app::widgets::UserCard`.
    pub fn path(&self) -> &'static str {
        self.0
    }

    /// The type's own identifier without module path or generic arguments.
    pub fn short_name(&self) -> &'static str {
        let base = self.0.split('<').next().unwrap_or(self.0);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl serde::Serialize for ClassId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

/// Typed metadata key.
pub struct MetadataKey<V> {
    name: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> MetadataKey<V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<V> Clone for MetadataKey<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for MetadataKey<V> {}

impl<V> fmt::Debug for MetadataKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Keys written by the declaration functions in [`crate::decorators`].
pub mod keys {
    use super::*;

    pub const KIND: MetadataKey<DeclarationKind> = MetadataKey::new("ngkit:kind");
    pub const NAME: MetadataKey<String> = MetadataKey::new("ngkit:name");
    pub const BINDINGS: MetadataKey<Bindings> = MetadataKey::new("ngkit:bindings");
    pub const OPTIONS: MetadataKey<DeclarationRecipe> = MetadataKey::new("ngkit:options");
    pub const SERVICE: MetadataKey<ServiceRecipe> = MetadataKey::new("ngkit:service");
}

type Boxed = Box<dyn Any + Send + Sync>;

/// Key/value metadata attached to classes.
pub struct MetadataStore {
    map: RwLock<HashMap<(&'static str, ClassId), Boxed>>,
}

impl MetadataStore {
    #[inline]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Build a store from every registrator submitted with [`declare!`](crate::declare).
    pub fn discover() -> Result<Self, DeclareError> {
        let store = Self::new();
        for r in ::inventory::iter::<Registrator> {
            r.0(&store)?;
        }
        tracing::debug!(entries = store.len(), "metadata discovered");
        Ok(store)
    }
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore {
    /// Associate `value` with `(key, target)`, replacing any previous value.
    pub fn attach<V>(&self, key: MetadataKey<V>, value: V, target: ClassId)
    where
        V: Send + Sync + 'static,
    {
        let mut w = self.map.write();
        w.insert((key.name, target), Box::new(value));
    }

    /// Read the value for `(key, target)`; `None` when absent.
    pub fn read<V>(&self, key: MetadataKey<V>, target: ClassId) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        let r = self.map.read();
        r.get(&(key.name, target))?.downcast_ref::<V>().cloned()
    }

    /// Read-modify-write under a single write lock; starts from `V::default()` when absent.
    pub fn update<V, F>(&self, key: MetadataKey<V>, target: ClassId, f: F)
    where
        V: Default + Send + Sync + 'static,
        F: FnOnce(&mut V),
    {
        let mut w = self.map.write();
        let slot = w
            .entry((key.name, target))
            .or_insert_with(|| Box::new(V::default()));
        if slot.downcast_ref::<V>().is_none() {
            *slot = Box::new(V::default());
        }
        if let Some(value) = slot.downcast_mut::<V>() {
            f(value);
        }
    }

    pub fn contains<V>(&self, key: MetadataKey<V>, target: ClassId) -> bool
    where
        V: Send + Sync + 'static,
    {
        self.map
            .read()
            .get(&(key.name, target))
            .is_some_and(|v| v.is::<V>())
    }

    /// Clear everything (useful in tests).
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Introspection: total `(key, class)` entries.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.map.read();
        let mut entries: Vec<_> = r.keys().map(|(k, c)| format!("{k}@{c:?}")).collect();
        entries.sort();
        f.debug_struct("MetadataStore")
            .field("entries", &entries)
            .finish()
    }
}

/// The function type submitted via `inventory::submit!` (see [`declare!`](crate::declare)).
pub struct Registrator(pub fn(&MetadataStore) -> Result<(), DeclareError>);

inventory::collect!(Registrator);

/// Submit a registration function that declares classes into the store built by
/// [`MetadataStore::discover`].
///
/// ```rust,ignore
/// fn declare_widgets(store: &ngkit::MetadataStore) -> Result<(), ngkit::DeclareError> {
///     ngkit::decorators::input::<UserCard>(store, "user", None);
///     ngkit::decorators::component::<UserCard>(store, ngkit::ComponentOptions::new("userCard"))
/// }
/// ngkit::declare!(declare_widgets);
/// ```
#[macro_export]
macro_rules! declare {
    ($registrator:path) => {
        $crate::inventory::submit! {
            $crate::metadata::Registrator($registrator)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;
    struct Bar;
    mod nested {
        pub struct Generic<T>(pub T);
    }

    const COUNT: MetadataKey<u32> = MetadataKey::new("test:count");
    const LABEL: MetadataKey<String> = MetadataKey::new("test:label");

    #[test]
    fn short_name_strips_path_and_generics() {
        assert_eq!(ClassId::of::<Foo>().short_name(), "Foo");
        assert_eq!(
            ClassId::of::<nested::Generic<Vec<u8>>>().short_name(),
            "Generic"
        );
        assert!(ClassId::of::<Foo>().path().ends_with("::Foo"));
    }

    #[test]
    fn attach_and_read_are_scoped_to_the_class() {
        let store = MetadataStore::new();
        store.attach(COUNT, 3, ClassId::of::<Foo>());

        assert_eq!(store.read(COUNT, ClassId::of::<Foo>()), Some(3));
        assert_eq!(store.read(COUNT, ClassId::of::<Bar>()), None);
        assert_eq!(store.read(LABEL, ClassId::of::<Foo>()), None);
    }

    #[test]
    fn attach_overwrites_the_exact_pair() {
        let store = MetadataStore::new();
        let foo = ClassId::of::<Foo>();
        store.attach(LABEL, "a".to_string(), foo);
        store.attach(LABEL, "b".to_string(), foo);
        store.attach(COUNT, 1, foo);

        assert_eq!(store.read(LABEL, foo).as_deref(), Some("b"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_starts_from_default_and_accumulates() {
        let store = MetadataStore::new();
        let foo = ClassId::of::<Foo>();
        store.update(COUNT, foo, |c| *c += 1);
        store.update(COUNT, foo, |c| *c += 1);
        assert_eq!(store.read(COUNT, foo), Some(2));
        assert!(store.contains(COUNT, foo));

        store.clear();
        assert!(store.is_empty());
    }
}
