//! Per-type operation bundles stored in the registry.
//!
//! A [`MetaType`] is everything the marshaller knows about a type: how to
//! build a default instance, copy it, destroy it, and move it to and from a
//! stream. Storage is type-erased as `Box<dyn Any + Send>`.
//!
//! Three adapters cover the common registrations:
//! - [`NativeType`] - types implementing [`Streamable`] (stream operators)
//! - [`DeclaredType`] - known to the registry but without stream operators
//! - [`SerdeType`] - any serde type, carried as a MsgPack byte array

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::MsgPackCodec;
use crate::error::{MarshalError, Result};
use crate::stream::{StreamReader, StreamWriter};

/// Type-erased value storage owned by a [`GenericValue`](crate::GenericValue).
pub type Storage = Box<dyn Any + Send>;

/// Operation bundle for one registered type.
///
/// Implementations must be `Send + Sync`: the registry is shared across
/// threads once registration is complete.
pub trait MetaType: Send + Sync + 'static {
    /// Registered type name (wire identifier).
    fn name(&self) -> &str;

    /// Rust type held in the storage box.
    fn storage_type(&self) -> TypeId;

    /// Build a default-initialized instance.
    fn construct(&self) -> Storage;

    /// Copy-construct a new instance from `data`.
    fn copy(&self, data: &(dyn Any + Send)) -> Result<Storage>;

    /// Release an instance. Called exactly once per constructed instance.
    fn destroy(&self, data: Storage) {
        drop(data);
    }

    /// Append the binary representation of `data` to `stream`.
    fn save(&self, data: &(dyn Any + Send), stream: &mut StreamWriter) -> Result<()>;

    /// Load a value from `stream` into the existing instance `data`.
    fn load(&self, data: &mut (dyn Any + Send), stream: &mut StreamReader<'_>) -> Result<()>;

    /// Compare two instances of this type.
    fn equals(&self, a: &(dyn Any + Send), b: &(dyn Any + Send)) -> bool;

    /// Debug-format an instance.
    fn fmt_value(&self, data: &(dyn Any + Send), f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Bounds every storable value satisfies.
pub trait StorageValue: Any + Send + Clone + Default + PartialEq + fmt::Debug {}

impl<T> StorageValue for T where T: Any + Send + Clone + Default + PartialEq + fmt::Debug {}

/// A type with stream operators.
///
/// `load` writes into an existing instance so response decoding can reuse
/// caller-owned storage.
pub trait Streamable: StorageValue {
    /// Default registered name.
    const TYPE_NAME: &'static str;

    /// Append the value to the stream.
    fn save(&self, stream: &mut StreamWriter) -> Result<()>;

    /// Replace the value with one read from the stream.
    fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()>;
}

pub(crate) fn downcast<'a, T: Any>(name: &str, data: &'a (dyn Any + Send)) -> Result<&'a T> {
    data.downcast_ref::<T>()
        .ok_or_else(|| MarshalError::StorageMismatch {
            type_name: name.to_string(),
        })
}

pub(crate) fn downcast_mut<'a, T: Any>(
    name: &str,
    data: &'a mut (dyn Any + Send),
) -> Result<&'a mut T> {
    data.downcast_mut::<T>()
        .ok_or_else(|| MarshalError::StorageMismatch {
            type_name: name.to_string(),
        })
}

fn equals_as<T: StorageValue>(a: &(dyn Any + Send), b: &(dyn Any + Send)) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn fmt_as<T: StorageValue>(data: &(dyn Any + Send), f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match data.downcast_ref::<T>() {
        Some(value) => fmt::Debug::fmt(value, f),
        None => f.write_str("<storage mismatch>"),
    }
}

/// Meta type for a [`Streamable`] Rust type.
pub struct NativeType<T> {
    name: Cow<'static, str>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Streamable> NativeType<T> {
    /// Register under `T::TYPE_NAME`.
    pub fn new() -> Self {
        Self {
            name: Cow::Borrowed(T::TYPE_NAME),
            _phantom: PhantomData,
        }
    }

    /// Register under an alternative name (e.g. `qint32` for `i32`).
    pub fn aliased(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Streamable> Default for NativeType<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Streamable> MetaType for NativeType<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn construct(&self) -> Storage {
        Box::new(T::default())
    }

    fn copy(&self, data: &(dyn Any + Send)) -> Result<Storage> {
        Ok(Box::new(downcast::<T>(&self.name, data)?.clone()))
    }

    fn save(&self, data: &(dyn Any + Send), stream: &mut StreamWriter) -> Result<()> {
        downcast::<T>(&self.name, data)?.save(stream)
    }

    fn load(&self, data: &mut (dyn Any + Send), stream: &mut StreamReader<'_>) -> Result<()> {
        downcast_mut::<T>(&self.name, data)?.load(stream)
    }

    fn equals(&self, a: &(dyn Any + Send), b: &(dyn Any + Send)) -> bool {
        equals_as::<T>(a, b)
    }

    fn fmt_value(&self, data: &(dyn Any + Send), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_as::<T>(data, f)
    }
}

/// Meta type registered without stream operators.
///
/// Values can be constructed and passed around locally, but every attempt
/// to put them on the wire fails with `SaveFailed` / `LoadFailed`.
pub struct DeclaredType<T> {
    name: Cow<'static, str>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: StorageValue> DeclaredType<T> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<T: StorageValue> MetaType for DeclaredType<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn construct(&self) -> Storage {
        Box::new(T::default())
    }

    fn copy(&self, data: &(dyn Any + Send)) -> Result<Storage> {
        Ok(Box::new(downcast::<T>(&self.name, data)?.clone()))
    }

    fn save(&self, _data: &(dyn Any + Send), _stream: &mut StreamWriter) -> Result<()> {
        Err(MarshalError::save_failed(
            &self.name,
            "no stream operators registered for this type",
        ))
    }

    fn load(&self, _data: &mut (dyn Any + Send), _stream: &mut StreamReader<'_>) -> Result<()> {
        Err(MarshalError::load_failed(
            &self.name,
            "no stream operators registered for this type",
        ))
    }

    fn equals(&self, a: &(dyn Any + Send), b: &(dyn Any + Send)) -> bool {
        equals_as::<T>(a, b)
    }

    fn fmt_value(&self, data: &(dyn Any + Send), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_as::<T>(data, f)
    }
}

/// Meta type for any serde type.
///
/// The payload is a length-prefixed byte array holding the value encoded
/// with [`MsgPackCodec`].
pub struct SerdeType<T> {
    name: Cow<'static, str>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> SerdeType<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<T> MetaType for SerdeType<T>
where
    T: StorageValue + Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn storage_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn construct(&self) -> Storage {
        Box::new(T::default())
    }

    fn copy(&self, data: &(dyn Any + Send)) -> Result<Storage> {
        Ok(Box::new(downcast::<T>(&self.name, data)?.clone()))
    }

    fn save(&self, data: &(dyn Any + Send), stream: &mut StreamWriter) -> Result<()> {
        let value = downcast::<T>(&self.name, data)?;
        let encoded =
            MsgPackCodec::encode(value).map_err(|e| MarshalError::save_failed(&self.name, e))?;
        stream.write_bytes(&encoded);
        Ok(())
    }

    fn load(&self, data: &mut (dyn Any + Send), stream: &mut StreamReader<'_>) -> Result<()> {
        let payload = stream.read_bytes()?;
        let decoded: T =
            MsgPackCodec::decode(payload).map_err(|e| MarshalError::load_failed(&self.name, e))?;
        *downcast_mut::<T>(&self.name, data)? = decoded;
        Ok(())
    }

    fn equals(&self, a: &(dyn Any + Send), b: &(dyn Any + Send)) -> bool {
        equals_as::<T>(a, b)
    }

    fn fmt_value(&self, data: &(dyn Any + Send), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_as::<T>(data, f)
    }
}
