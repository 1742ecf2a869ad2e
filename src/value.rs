//! Generic value - a dynamically-typed, owned argument.
//!
//! A [`GenericValue`] pairs a registered type with the storage built by that
//! type's `construct` operation. The wrapper is the only owner of the
//! storage: dropping it hands the storage back to the type's `destroy`
//! exactly once, on every path (success, failed load, truncated decode).
//!
//! Values are only created through the [`TypeRegistry`](crate::TypeRegistry),
//! so storage always belongs to a recognized type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::registry::meta_type::{downcast, downcast_mut};
use crate::registry::{MetaType, MetaTypeId, Storage};

/// Dynamically-typed value owned by an envelope or a caller.
pub struct GenericValue {
    id: MetaTypeId,
    ops: Arc<dyn MetaType>,
    // Always `Some` until drop.
    data: Option<Storage>,
}

impl GenericValue {
    pub(crate) fn from_storage(id: MetaTypeId, ops: Arc<dyn MetaType>, data: Storage) -> Self {
        Self {
            id,
            ops,
            data: Some(data),
        }
    }

    /// Registered type name.
    #[inline]
    pub fn type_name(&self) -> &str {
        self.ops.name()
    }

    /// Registry id of the value's type.
    #[inline]
    pub fn meta_type_id(&self) -> MetaTypeId {
        self.id
    }

    pub(crate) fn meta_type(&self) -> &Arc<dyn MetaType> {
        &self.ops
    }

    pub(crate) fn storage(&self) -> &(dyn Any + Send) {
        match &self.data {
            Some(data) => data.as_ref(),
            None => unreachable!("generic value storage is only taken on drop"),
        }
    }

    pub(crate) fn storage_mut(&mut self) -> &mut (dyn Any + Send) {
        match &mut self.data {
            Some(data) => data.as_mut(),
            None => unreachable!("generic value storage is only taken on drop"),
        }
    }

    /// Borrow the value as `T`, if that is its storage type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.storage().downcast_ref::<T>()
    }

    /// Mutably borrow the value as `T`, if that is its storage type.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.storage_mut().downcast_mut::<T>()
    }

    /// Clone the value out as `T`.
    pub fn get<T: Any + Clone>(&self) -> Result<T> {
        downcast::<T>(self.type_name(), self.storage()).cloned()
    }

    /// Replace the value's contents.
    pub fn set<T: Any>(&mut self, value: T) -> Result<()> {
        let name = self.ops.name().to_string();
        *downcast_mut::<T>(&name, self.storage_mut())? = value;
        Ok(())
    }

    /// Copy-construct an independent value of the same type.
    pub fn try_clone(&self) -> Result<Self> {
        let data = self.ops.copy(self.storage())?;
        Ok(Self::from_storage(self.id, self.ops.clone(), data))
    }
}

impl Drop for GenericValue {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.ops.destroy(data);
        }
    }
}

impl PartialEq for GenericValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.ops.equals(self.storage(), other.storage())
    }
}

impl fmt::Debug for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Value<'a>(&'a GenericValue);

        impl fmt::Debug for Value<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.ops.fmt_value(self.0.storage(), f)
            }
        }

        f.debug_struct("GenericValue")
            .field("type_name", &self.type_name())
            .field("value", &Value(self))
            .finish()
    }
}

/// Release a sequence of arguments.
///
/// Each value is destroyed exactly once through its registered type.
pub fn release_arguments(args: Vec<GenericValue>) {
    tracing::trace!("Releasing {} arguments", args.len());
    drop(args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarshalError;
    use crate::TypeRegistry;

    #[test]
    fn test_construct_is_default() {
        let registry = TypeRegistry::with_builtins();
        let value = registry.construct("int").unwrap();

        assert_eq!(value.type_name(), "int");
        assert_eq!(value.downcast_ref::<i32>(), Some(&0));
        assert_eq!(value.meta_type_id(), registry.type_id("int").unwrap());
    }

    #[test]
    fn test_get_and_set() {
        let registry = TypeRegistry::with_builtins();
        let mut value = registry.construct("QString").unwrap();

        value.set(String::from("hello")).unwrap();
        assert_eq!(value.get::<String>().unwrap(), "hello");

        assert!(matches!(
            value.set(5i32),
            Err(MarshalError::StorageMismatch { .. })
        ));
        assert!(value.get::<i32>().is_err());
        assert!(value.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn test_equality_requires_type_and_value() {
        let registry = TypeRegistry::with_builtins();
        let a = registry.wrap("int", 42i32).unwrap();
        let b = registry.wrap("int", 42i32).unwrap();
        let c = registry.wrap("int", 7i32).unwrap();
        let d = registry.wrap("uint", 42u32).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_try_clone() {
        let registry = TypeRegistry::with_builtins();
        let original = registry.wrap("QString", String::from("copy me")).unwrap();
        let mut copy = original.try_clone().unwrap();

        assert_eq!(original, copy);
        copy.set(String::from("changed")).unwrap();
        assert_ne!(original, copy);
    }

    #[test]
    fn test_debug_shows_type_and_value() {
        let registry = TypeRegistry::with_builtins();
        let value = registry.wrap("int", 42i32).unwrap();

        let debug = format!("{:?}", value);
        assert!(debug.contains("int"));
        assert!(debug.contains("42"));
    }

    #[test]
    fn test_release_arguments() {
        let registry = TypeRegistry::with_builtins();
        let args = vec![
            registry.wrap("int", 1i32).unwrap(),
            registry.wrap("QString", String::from("two")).unwrap(),
        ];
        release_arguments(args);
    }
}
