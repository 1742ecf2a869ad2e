//! Built-in types and their stream operators.
//!
//! Names and encodings match what peer processes expect:
//! ```text
//! bool         u8 (0/1)
//! int          i32 BE
//! uint         u32 BE
//! qlonglong    i64 BE
//! qulonglong   u64 BE
//! double       f64 BE
//! float        f64 BE (double precision on the wire)
//! QString      string
//! QByteArray   byte array
//! QStringList  u32 count + strings
//! QImage       pixel buffer fast path
//! ```

use bytes::Bytes;

use super::meta_type::Streamable;
use super::TypeRegistry;
use crate::error::Result;
use crate::pixel::PixelBuffer;
use crate::stream::{StreamReader, StreamWriter};

/// Register every built-in type.
pub fn register_builtins(registry: &mut TypeRegistry) {
    registry.register_type::<bool>();
    registry.register_type::<i32>();
    registry.register_type::<u32>();
    registry.register_type::<i64>();
    registry.register_type::<u64>();
    registry.register_type::<f64>();
    registry.register_type::<f32>();
    registry.register_type::<String>();
    registry.register_type::<Bytes>();
    registry.register_type::<Vec<String>>();
    registry.register_type::<PixelBuffer>();
}

macro_rules! streamable_primitive {
    ($ty:ty, $name:literal, $write:ident, $read:ident) => {
        impl Streamable for $ty {
            const TYPE_NAME: &'static str = $name;

            fn save(&self, stream: &mut StreamWriter) -> Result<()> {
                stream.$write(*self);
                Ok(())
            }

            fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()> {
                *self = stream.$read()?;
                Ok(())
            }
        }
    };
}

streamable_primitive!(bool, "bool", write_bool, read_bool);
streamable_primitive!(i32, "int", write_i32, read_i32);
streamable_primitive!(u32, "uint", write_u32, read_u32);
streamable_primitive!(i64, "qlonglong", write_i64, read_i64);
streamable_primitive!(u64, "qulonglong", write_u64, read_u64);
streamable_primitive!(f64, "double", write_f64, read_f64);

impl Streamable for f32 {
    const TYPE_NAME: &'static str = "float";

    fn save(&self, stream: &mut StreamWriter) -> Result<()> {
        stream.write_f64(f64::from(*self));
        Ok(())
    }

    fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()> {
        *self = stream.read_f64()? as f32;
        Ok(())
    }
}

impl Streamable for String {
    const TYPE_NAME: &'static str = "QString";

    fn save(&self, stream: &mut StreamWriter) -> Result<()> {
        stream.write_string(self);
        Ok(())
    }

    fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()> {
        *self = stream.read_string()?;
        Ok(())
    }
}

impl Streamable for Bytes {
    const TYPE_NAME: &'static str = "QByteArray";

    fn save(&self, stream: &mut StreamWriter) -> Result<()> {
        stream.write_bytes(self);
        Ok(())
    }

    fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()> {
        *self = Bytes::copy_from_slice(stream.read_bytes()?);
        Ok(())
    }
}

impl Streamable for Vec<String> {
    const TYPE_NAME: &'static str = "QStringList";

    fn save(&self, stream: &mut StreamWriter) -> Result<()> {
        stream.write_u32(self.len() as u32);
        for item in self {
            stream.write_string(item);
        }
        Ok(())
    }

    fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()> {
        let count = stream.read_u32()? as usize;
        // Every string carries at least a 4-byte length.
        let mut items = Vec::with_capacity(count.min(stream.remaining() / 4));
        for _ in 0..count {
            items.push(stream.read_string()?);
        }
        *self = items;
        Ok(())
    }
}
