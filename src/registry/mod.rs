//! Type registry mapping type names to operation bundles.
//!
//! The registry is populated at startup and then shared read-only (usually
//! behind an `Arc`) with every [`Marshaller`](crate::Marshaller). IDs are
//! assigned sequentially starting from 1 (0 is reserved for "unknown").
//!
//! # Example
//!
//! ```
//! use procwire_marshal::registry::TypeRegistry;
//!
//! let mut registry = TypeRegistry::with_builtins();
//! registry.declare::<Vec<u16>>("Samples");
//!
//! assert!(registry.contains("QString"));
//! assert!(registry.type_id("Samples").is_some());
//! assert!(registry.type_id("Missing").is_none());
//!
//! let value = registry.wrap("int", 42i32).unwrap();
//! assert_eq!(value.type_name(), "int");
//! ```

mod builtin;
pub(crate) mod meta_type;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MarshalError, Result};
use crate::value::GenericValue;

pub use builtin::register_builtins;
pub use meta_type::{
    DeclaredType, MetaType, NativeType, SerdeType, Storage, StorageValue, Streamable,
};

/// Identifier assigned to a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaTypeId(u32);

impl MetaTypeId {
    /// Reserved id, never assigned.
    pub const UNKNOWN: MetaTypeId = MetaTypeId(0);

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MetaTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry for a registered type.
struct TypeEntry {
    /// Assigned id.
    id: MetaTypeId,
    /// Operation bundle.
    ops: Arc<dyn MetaType>,
}

/// Registry of known types, keyed by name.
pub struct TypeRegistry {
    /// Types by name.
    types: HashMap<String, TypeEntry>,
    /// Id to name mapping.
    id_to_name: HashMap<MetaTypeId, String>,
    /// Next id to assign.
    next_id: u32,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            id_to_name: HashMap::new(),
            next_id: 1, // Start from 1, 0 is reserved
        }
    }

    /// Create a registry with the built-in types registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Register an operation bundle under its own name.
    ///
    /// Re-registering a name replaces its operations and keeps its id.
    pub fn register<M: MetaType>(&mut self, ops: M) -> MetaTypeId {
        self.register_shared(Arc::new(ops))
    }

    /// Register a shared operation bundle.
    pub fn register_shared(&mut self, ops: Arc<dyn MetaType>) -> MetaTypeId {
        let name = ops.name().to_string();

        if let Some(entry) = self.types.get_mut(&name) {
            tracing::debug!("Replacing operations of registered type {}", name);
            entry.ops = ops;
            return entry.id;
        }

        let id = MetaTypeId(self.next_id);
        self.next_id += 1;

        self.id_to_name.insert(id, name.clone());
        self.types.insert(name, TypeEntry { id, ops });
        id
    }

    /// Register a [`Streamable`] type under `T::TYPE_NAME`.
    pub fn register_type<T: Streamable>(&mut self) -> MetaTypeId {
        self.register(NativeType::<T>::new())
    }

    /// Register a [`Streamable`] type under another name.
    pub fn register_alias<T: Streamable>(&mut self, name: &str) -> MetaTypeId {
        self.register(NativeType::<T>::aliased(name.to_string()))
    }

    /// Register a type without stream operators.
    pub fn declare<T: StorageValue>(&mut self, name: &str) -> MetaTypeId {
        self.register(DeclaredType::<T>::new(name.to_string()))
    }

    /// Register a serde type, carried as MsgPack on the wire.
    pub fn register_serde<T>(&mut self, name: &str) -> MetaTypeId
    where
        T: StorageValue + Serialize + DeserializeOwned,
    {
        self.register(SerdeType::<T>::new(name.to_string()))
    }

    /// Get a type id by name.
    pub fn type_id(&self, name: &str) -> Option<MetaTypeId> {
        self.types.get(name).map(|e| e.id)
    }

    /// Get a type name by id.
    pub fn type_name(&self, id: MetaTypeId) -> Option<&str> {
        self.id_to_name.get(&id).map(|s| s.as_str())
    }

    /// Get the operation bundle for a type name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn MetaType>> {
        self.types.get(name).map(|e| &e.ops)
    }

    /// Get the operation bundle for a type id.
    pub fn get_by_id(&self, id: MetaTypeId) -> Option<&Arc<dyn MetaType>> {
        self.id_to_name.get(&id).and_then(|name| self.get(name))
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<(MetaTypeId, &Arc<dyn MetaType>)> {
        self.types
            .get(name)
            .map(|e| (e.id, &e.ops))
            .ok_or_else(|| MarshalError::UnknownType(name.to_string()))
    }

    /// Check whether a type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over registered type names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|s| s.as_str())
    }

    /// Construct a default-initialized value of a registered type.
    pub fn construct(&self, name: &str) -> Result<GenericValue> {
        let (id, ops) = self.lookup(name)?;
        Ok(GenericValue::from_storage(id, ops.clone(), ops.construct()))
    }

    /// Construct a value of a registered type holding `value`.
    ///
    /// Fails with `StorageMismatch` if `T` is not the type's storage type.
    pub fn wrap<T: Any + Send>(&self, name: &str, value: T) -> Result<GenericValue> {
        let (_, ops) = self.lookup(name)?;
        if ops.storage_type() != TypeId::of::<T>() {
            return Err(MarshalError::StorageMismatch {
                type_name: name.to_string(),
            });
        }
        let mut generic = self.construct(name)?;
        generic.set(value)?;
        Ok(generic)
    }

    /// Construct a value of a [`Streamable`] type under its default name.
    pub fn value_of<T: Streamable>(&self, value: T) -> Result<GenericValue> {
        self.wrap(T::TYPE_NAME, value)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
