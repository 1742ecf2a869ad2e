//! Integration tests for procwire-marshal.
//!
//! These tests drive whole envelopes through the public API, the way a
//! transport and a dispatcher on either side of a connection would.

use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use procwire_marshal::stream::{StreamReader, StreamWriter};
use procwire_marshal::{
    peek_kind, Envelope, EnvelopeKind, MarshalConfig, MarshalError, Marshaller, MismatchPolicy,
    PixelBuffer, PixelFormat, ResponseOutcome, TypeRegistry,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Contact {
    name: String,
    phones: Vec<String>,
    favourite: bool,
}

fn registry_with_contact() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::with_builtins();
    registry.register_serde::<Contact>("Contact");
    Arc::new(registry)
}

/// Full call carrying every built-in type plus a serde type.
#[test]
fn test_call_with_mixed_arguments() {
    let registry = registry_with_contact();
    let marshaller = Marshaller::new(registry.clone());

    let contact = Contact {
        name: "Ada".to_string(),
        phones: vec!["+48 123".to_string()],
        favourite: true,
    };

    let call = Envelope::call("store", "bool")
        .with_argument(registry.wrap("int", 42i32).unwrap())
        .with_argument(registry.wrap("double", 2.75f64).unwrap())
        .with_argument(registry.wrap("QString", "zażółć".to_string()).unwrap())
        .with_argument(
            registry
                .wrap("QByteArray", Bytes::from_static(&[0, 1, 2, 255]))
                .unwrap(),
        )
        .with_argument(
            registry
                .wrap("QStringList", vec!["a".to_string(), "b".to_string()])
                .unwrap(),
        )
        .with_argument(registry.wrap("qulonglong", u64::MAX).unwrap())
        .with_argument(registry.wrap("Contact", contact.clone()).unwrap());

    let bytes = marshaller.encode_envelope(&call).unwrap();
    let decoded = marshaller
        .decode_envelope(&bytes)
        .unwrap()
        .into_complete()
        .unwrap();

    assert_eq!(decoded, call);
    assert_eq!(decoded.arguments[6].get::<Contact>().unwrap(), contact);
}

/// The `ping` scenario: no arguments, void return.
#[test]
fn test_ping_call() {
    let marshaller = Marshaller::new(Arc::new(TypeRegistry::with_builtins()));
    let ping = Envelope::call("ping", "void");

    let bytes = marshaller.encode_envelope(&ping).unwrap();
    let decoded = marshaller.decode_envelope(&bytes).unwrap();

    assert!(decoded.is_complete());
    assert_eq!(decoded.envelope.kind, EnvelopeKind::Call);
    assert_eq!(decoded.envelope.method, "ping");
    assert_eq!(decoded.envelope.return_type, "void");
    assert!(decoded.envelope.arguments.is_empty());
}

/// A dispatcher branches on the kind before paying for a full decode.
#[test]
fn test_dispatch_by_peeked_kind() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let marshaller = Marshaller::new(registry.clone());

    let messages = vec![
        marshaller
            .encode_envelope(&Envelope::call("ping", "void"))
            .unwrap(),
        marshaller
            .encode_envelope(
                &Envelope::signal("valueChanged")
                    .with_argument(registry.wrap("int", 1i32).unwrap()),
            )
            .unwrap(),
        marshaller
            .encode_envelope(&Envelope::response("ping", "void", None))
            .unwrap(),
    ];

    let kinds: Vec<EnvelopeKind> = messages.iter().map(|m| peek_kind(m).unwrap()).collect();
    assert_eq!(
        kinds,
        vec![EnvelopeKind::Call, EnvelopeKind::Signal, EnvelopeKind::Response]
    );
}

/// Peers with different registries: the receiver reports the skew and keeps
/// the prefix it understood.
#[test]
fn test_skewed_registries() {
    let sender = registry_with_contact();
    let receiver = Marshaller::new(Arc::new(TypeRegistry::with_builtins()));

    let call = Envelope::call("store", "void")
        .with_argument(sender.wrap("int", 1i32).unwrap())
        .with_argument(sender.wrap("Contact", Contact::default()).unwrap())
        .with_argument(sender.wrap("int", 3i32).unwrap());
    let bytes = Marshaller::new(sender.clone()).encode_envelope(&call).unwrap();

    let decoded = receiver.decode_envelope(&bytes).unwrap();
    assert_eq!(decoded.envelope.arguments.len(), 1);
    assert_eq!(decoded.lost_arguments(), 2);

    let failure = decoded.failure.as_ref().unwrap();
    assert_eq!(failure.index, 1);
    assert!(matches!(&failure.error, MarshalError::UnknownType(name) if name == "Contact"));

    // The sender cannot encode for a receiver that lacks the type either.
    let err = receiver.encode_envelope(&call).unwrap_err();
    assert!(err.is_registry_skew());
}

/// An unknown type consumes only its name; a manually resynchronized reader
/// still finds the sentinel that follows.
#[test]
fn test_unknown_type_sentinel_untouched() {
    let marshaller = Marshaller::new(Arc::new(TypeRegistry::with_builtins()));
    let sentinel = 0x7E57_1E55;

    let mut writer = StreamWriter::new();
    writer.write_string("UnregisteredThing");
    writer.write_i32(sentinel);
    let bytes = writer.into_bytes();

    assert!(matches!(
        marshaller.decode_value(&bytes),
        Err(MarshalError::UnknownType(_))
    ));

    let mut reader = StreamReader::new(&bytes);
    assert!(procwire_marshal::marshal::decode_argument(marshaller.registry(), &mut reader).is_err());
    assert_eq!(reader.read_i32().unwrap(), sentinel);
    assert!(reader.is_empty());

    // Typed decode of the resynchronized tail.
    let mut tail = StreamWriter::new();
    tail.write_string("int");
    tail.write_raw(&bytes[bytes.len() - 4..]);
    let value = marshaller.decode_value(&tail.into_bytes()).unwrap();
    assert_eq!(value.get::<i32>().unwrap(), sentinel);
}

/// Grayscale image transfer through the fast path.
#[test]
fn test_grayscale_image_transfer() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let marshaller = Marshaller::new(registry.clone());

    let mut image = PixelBuffer::new(33, 17, PixelFormat::INDEXED8).unwrap();
    image.set_color_table((0..=255u32).map(|i| 0xFF00_0000 | i * 0x0001_0101).collect());
    for row in 0..image.height() {
        let line = image.scan_line_mut(row).unwrap();
        for (x, px) in line.iter_mut().enumerate().take(33) {
            *px = (x as u32 * 7 + row) as u8;
        }
    }
    assert_eq!(image.bytes_per_line(), 36);

    let call = Envelope::call("showImage", "void")
        .with_argument(registry.wrap("QImage", image.clone()).unwrap());
    let bytes = marshaller.encode_envelope(&call).unwrap();

    let decoded = marshaller
        .decode_envelope(&bytes)
        .unwrap()
        .into_complete()
        .unwrap();
    let received = decoded.arguments[0].get::<PixelBuffer>().unwrap();

    assert_eq!(received, image);
    assert_eq!(received.color_table().len(), 256);
    assert_eq!(received.format(), PixelFormat::INDEXED8);
}

/// Large RGB image, truncated in transit.
#[test]
fn test_truncated_image_in_transit() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let marshaller = Marshaller::new(registry.clone());

    let image = PixelBuffer::new(640, 480, PixelFormat::RGB32).unwrap();
    let call = Envelope::call("showImage", "void")
        .with_argument(registry.wrap("QImage", image).unwrap());
    let bytes = marshaller.encode_envelope(&call).unwrap();

    let decoded = marshaller.decode_envelope(&bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(
        decoded.failure.as_ref().map(|f| &f.error),
        Some(MarshalError::TruncatedPixelData {
            expected: 1_228_800,
            ..
        })
    ));
}

/// Response delivered into caller-owned slots.
#[test]
fn test_response_slots() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let marshaller = Marshaller::new(registry.clone());

    let response = Envelope::response(
        "title",
        "QString",
        Some(registry.wrap("QString", "Main window".to_string()).unwrap()),
    );
    let bytes = marshaller.encode_envelope(&response).unwrap();

    let mut text = registry.construct("QString").unwrap();
    let decoded = marshaller.decode_response_into(&bytes, &mut text).unwrap();
    assert_eq!(decoded.outcome, ResponseOutcome::Loaded);
    assert_eq!(decoded.envelope.return_type, "QString");
    assert_eq!(text.get::<String>().unwrap(), "Main window");

    // Wrong destination type: strict rejection keeps the old value.
    let strict = Marshaller::with_config(
        registry.clone(),
        MarshalConfig::default().type_mismatch(MismatchPolicy::Strict),
    )
    .unwrap();
    let mut number = registry.wrap("int", 99i32).unwrap();
    assert!(matches!(
        strict.decode_response_into(&bytes, &mut number),
        Err(MarshalError::TypeMismatch { .. })
    ));
    assert_eq!(number.get::<i32>().unwrap(), 99);
}

/// Configuration loaded from JSON drives the marshaller.
#[test]
fn test_config_from_json() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let config =
        MarshalConfig::from_json(r#"{ "max_arguments": 2, "type_mismatch": "strict" }"#).unwrap();
    let marshaller = Marshaller::with_config(registry.clone(), config).unwrap();

    let call = Envelope::call("triple", "void")
        .with_argument(registry.wrap("int", 1i32).unwrap())
        .with_argument(registry.wrap("int", 2i32).unwrap())
        .with_argument(registry.wrap("int", 3i32).unwrap());

    assert!(matches!(
        marshaller.encode_envelope(&call),
        Err(MarshalError::ArityExceeded { count: 3, max: 2 })
    ));
}

/// Distinct envelopes encoded and decoded on many threads at once.
#[test]
fn test_concurrent_marshalling() {
    let registry = Arc::new(TypeRegistry::with_builtins());
    let marshaller = Marshaller::new(registry);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let marshaller = marshaller.clone();
            thread::spawn(move || {
                for i in 0..200i32 {
                    let registry = marshaller.registry();
                    let call = Envelope::call(format!("worker{}", worker), "int")
                        .with_argument(registry.wrap("int", i).unwrap())
                        .with_argument(registry.wrap("QString", format!("{}:{}", worker, i)).unwrap());

                    let bytes = marshaller.encode_envelope(&call).unwrap();
                    let decoded = marshaller
                        .decode_envelope(&bytes)
                        .unwrap()
                        .into_complete()
                        .unwrap();
                    assert_eq!(decoded, call);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
