//! Argument marshalling - one generic value to and from a stream.
//!
//! Wire layout:
//! ```text
//! ┌───────────┬──────────────────────────────────────────────┐
//! │ type name │ payload                                      │
//! │ string    │ MetaType::save output                        │
//! └───────────┴──────────────────────────────────────────────┘
//! ```

use crate::error::Result;
use crate::registry::TypeRegistry;
use crate::stream::{StreamReader, StreamWriter};
use crate::value::GenericValue;

/// Encode one argument: type name, then payload.
///
/// Nothing is appended to `stream` on failure.
pub fn encode_argument(
    registry: &TypeRegistry,
    value: &GenericValue,
    stream: &mut StreamWriter,
) -> Result<()> {
    let name = value.type_name();
    let (_, ops) = registry.lookup(name).map_err(|e| {
        tracing::warn!("Type {} has not been registered", name);
        e
    })?;

    let mut field = StreamWriter::new();
    field.write_string(name);

    if let Err(e) = ops.save(value.storage(), &mut field) {
        tracing::warn!("Failed to serialize {} to data stream: {}", name, e);
        return Err(e);
    }

    stream.append(field);
    Ok(())
}

/// Decode one argument, constructing its value through the registry.
///
/// On an unknown type only the type name is consumed. If the payload fails
/// to load, the constructed value is dropped (and destroyed) before the
/// error is returned.
pub fn decode_argument(registry: &TypeRegistry, stream: &mut StreamReader<'_>) -> Result<GenericValue> {
    let name = stream.read_string()?;
    let (id, ops) = registry.lookup(&name).map_err(|e| {
        tracing::warn!("Unsupported type of argument: {}", name);
        e
    })?;

    let mut value = GenericValue::from_storage(id, ops.clone(), ops.construct());
    if let Err(e) = ops.load(value.storage_mut(), stream) {
        tracing::warn!("Failed to deserialize argument value of type {}: {}", name, e);
        return Err(e);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarshalError;
    use crate::pixel::{decode_pixel_buffer, PixelBuffer, PixelFormat};
    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Rect {
        x: i32,
        y: i32,
        w: u32,
        h: u32,
    }

    fn round_trip(registry: &TypeRegistry, value: &GenericValue) -> GenericValue {
        let mut writer = StreamWriter::new();
        encode_argument(registry, value, &mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = StreamReader::new(&bytes);
        let decoded = decode_argument(registry, &mut reader).unwrap();
        assert!(reader.is_empty());
        decoded
    }

    #[test]
    fn test_int_wire_layout() {
        let registry = TypeRegistry::with_builtins();
        let value = registry.wrap("int", 42i32).unwrap();

        let mut writer = StreamWriter::new();
        encode_argument(&registry, &value, &mut writer).unwrap();

        assert_eq!(
            &writer.into_bytes()[..],
            &[0, 0, 0, 6, 0, b'i', 0, b'n', 0, b't', 0, 0, 0, 42]
        );
    }

    #[test]
    fn test_round_trip_every_builtin() {
        let registry = TypeRegistry::with_builtins();
        let mut image = PixelBuffer::new(3, 3, PixelFormat::RGB888).unwrap();
        image.bits_mut()[4] = 0x7F;

        let values = vec![
            registry.wrap("bool", true).unwrap(),
            registry.wrap("int", -1i32).unwrap(),
            registry.wrap("uint", 7u32).unwrap(),
            registry.wrap("qlonglong", -1i64 << 40).unwrap(),
            registry.wrap("qulonglong", 1u64 << 63).unwrap(),
            registry.wrap("double", 0.1f64).unwrap(),
            registry.wrap("float", 2.5f32).unwrap(),
            registry.wrap("QString", String::from("żółw")).unwrap(),
            registry
                .wrap("QByteArray", Bytes::from_static(b"\x00raw\xFF"))
                .unwrap(),
            registry
                .wrap("QStringList", vec![String::from("a"), String::from("b")])
                .unwrap(),
            registry.wrap("QImage", image).unwrap(),
        ];

        for value in &values {
            let decoded = round_trip(&registry, value);
            assert_eq!(&decoded, value, "round trip of {}", value.type_name());
        }
    }

    #[test]
    fn test_serde_type_round_trip() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register_serde::<Rect>("Rect");

        let value = registry
            .wrap("Rect", Rect { x: -1, y: 2, w: 30, h: 40 })
            .unwrap();
        assert_eq!(round_trip(&registry, &value), value);
    }

    #[test]
    fn test_encode_unknown_type() {
        let mut local = TypeRegistry::with_builtins();
        local.register_serde::<Rect>("Rect");
        let value = local.wrap("Rect", Rect::default()).unwrap();

        let remote = TypeRegistry::with_builtins();
        let mut writer = StreamWriter::new();
        let err = encode_argument(&remote, &value, &mut writer).unwrap_err();

        assert!(err.is_registry_skew());
        assert!(writer.is_empty());
    }

    #[test]
    fn test_encode_save_failed_writes_nothing() {
        let mut registry = TypeRegistry::with_builtins();
        registry.declare::<Rect>("Rect");
        let value = registry.wrap("Rect", Rect::default()).unwrap();

        let mut writer = StreamWriter::new();
        writer.write_i32(1);
        let err = encode_argument(&registry, &value, &mut writer).unwrap_err();

        assert!(matches!(err, MarshalError::SaveFailed { .. }));
        assert_eq!(writer.len(), 4);
    }

    #[test]
    fn test_decode_unknown_type_leaves_payload() {
        let registry = TypeRegistry::with_builtins();
        let mut writer = StreamWriter::new();
        writer.write_string("Mystery");
        writer.write_i32(0x0BAD_F00D);
        let bytes = writer.into_bytes();

        let mut reader = StreamReader::new(&bytes);
        let err = decode_argument(&registry, &mut reader).unwrap_err();

        assert!(matches!(err, MarshalError::UnknownType(ref name) if name == "Mystery"));
        assert_eq!(reader.remaining(), 4);
        assert_eq!(reader.read_i32().unwrap(), 0x0BAD_F00D);
    }

    #[test]
    fn test_decode_load_failed() {
        let mut registry = TypeRegistry::with_builtins();
        registry.declare::<Rect>("Rect");

        let mut writer = StreamWriter::new();
        writer.write_string("Rect");
        let bytes = writer.into_bytes();

        let err = decode_argument(&registry, &mut StreamReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, MarshalError::LoadFailed { .. }));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let registry = TypeRegistry::with_builtins();
        let mut writer = StreamWriter::new();
        writer.write_string("qlonglong");
        writer.write_i32(1);
        let bytes = writer.into_bytes();

        let err = decode_argument(&registry, &mut StreamReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, MarshalError::StreamUnderflow { .. }));
    }

    #[test]
    fn test_decode_empty_stream() {
        let registry = TypeRegistry::with_builtins();
        let err = decode_argument(&registry, &mut StreamReader::new(&[])).unwrap_err();
        assert!(matches!(err, MarshalError::StreamUnderflow { .. }));
    }

    #[test]
    fn test_pixel_fast_path_layout() {
        let registry = TypeRegistry::with_builtins();
        let image = PixelBuffer::new(1, 1, PixelFormat::ARGB32).unwrap();
        let value = registry.wrap("QImage", image.clone()).unwrap();

        let mut writer = StreamWriter::new();
        encode_argument(&registry, &value, &mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = StreamReader::new(&bytes);
        assert_eq!(reader.read_string().unwrap(), "QImage");
        assert_eq!(decode_pixel_buffer(&mut reader).unwrap(), image);
    }

    #[test]
    fn test_images_use_the_registered_operations() {
        let mut registry = TypeRegistry::with_builtins();
        registry.declare::<PixelBuffer>("QImage");

        let image = PixelBuffer::new(2, 2, PixelFormat::RGB32).unwrap();
        let value = registry.wrap("QImage", image).unwrap();

        let mut writer = StreamWriter::new();
        assert!(matches!(
            encode_argument(&registry, &value, &mut writer),
            Err(MarshalError::SaveFailed { .. })
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_pixel_truncated_argument() {
        let registry = TypeRegistry::with_builtins();
        let mut writer = StreamWriter::new();
        writer.write_string("QImage");
        writer.write_i32(250);
        writer.write_i32(1);
        writer.write_i32(PixelFormat::ARGB32.0);
        writer.write_i32(0);
        writer.write_i32(1000);
        writer.write_raw(&[0; 500]);
        let bytes = writer.into_bytes();

        let err = decode_argument(&registry, &mut StreamReader::new(&bytes)).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::TruncatedPixelData {
                expected: 1000,
                available: 500
            }
        ));
    }
}
