//! Envelope marshalling.
//!
//! Wire layout of an envelope:
//! ```text
//! ┌──────┬────────┬─────────────┬───────┬──────────────────────┐
//! │ kind │ method │ return type │ argc  │ argc × argument      │
//! │ i32  │ string │ string      │ i32   │ type name + payload  │
//! └──────┴────────┴─────────────┴───────┴──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use procwire_marshal::{Envelope, Marshaller, TypeRegistry};
//!
//! let registry = Arc::new(TypeRegistry::with_builtins());
//! let marshaller = Marshaller::new(registry.clone());
//!
//! let call = Envelope::call("add", "int")
//!     .with_argument(registry.wrap("int", 2i32).unwrap())
//!     .with_argument(registry.wrap("int", 3i32).unwrap());
//!
//! let bytes = marshaller.encode_envelope(&call).unwrap();
//! let decoded = marshaller.decode_envelope(&bytes).unwrap();
//!
//! assert!(decoded.is_complete());
//! assert_eq!(decoded.envelope, call);
//! ```

mod argument;

use std::sync::Arc;

use bytes::Bytes;

use crate::config::{MarshalConfig, MismatchPolicy};
use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::{MarshalError, Result};
use crate::registry::TypeRegistry;
use crate::stream::{StreamReader, StreamWriter};
use crate::value::GenericValue;

pub use argument::{decode_argument, encode_argument};

/// Fixed part of an envelope, before the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EnvelopeHeader {
    kind: EnvelopeKind,
    method: String,
    return_type: String,
    argument_count: usize,
}

/// Argument that stopped an envelope decode.
#[derive(Debug)]
pub struct ArgumentFailure {
    /// Position of the failed argument.
    pub index: usize,
    /// Why it failed.
    pub error: MarshalError,
}

/// Result of [`Marshaller::decode_envelope`].
///
/// Decoding stops at the first argument that fails; the envelope then holds
/// only the arguments before it and `failure` says what went wrong.
#[derive(Debug)]
pub struct DecodedEnvelope {
    /// Envelope with every argument decoded before the first failure.
    pub envelope: Envelope,
    /// Argument count declared on the wire.
    pub declared_arguments: usize,
    /// First argument failure, if any.
    pub failure: Option<ArgumentFailure>,
}

impl DecodedEnvelope {
    /// Whether every declared argument was decoded.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of declared arguments that were not decoded.
    #[inline]
    pub fn lost_arguments(&self) -> usize {
        self.declared_arguments - self.envelope.arguments.len()
    }

    /// Return the envelope if complete, otherwise the argument error.
    ///
    /// Arguments of a truncated envelope are released.
    pub fn into_complete(self) -> Result<Envelope> {
        match self.failure {
            None => Ok(self.envelope),
            Some(failure) => Err(failure.error),
        }
    }
}

/// How a response value reached its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Response carried no value.
    Void,
    /// Value loaded into the destination.
    Loaded,
    /// Wire type differed from the destination but shares its storage.
    LoadedWithMismatch { wire_type: String },
}

/// Result of [`Marshaller::decode_response_into`].
#[derive(Debug)]
pub struct DecodedResponse {
    /// Response envelope (never carries arguments).
    pub envelope: Envelope,
    /// What happened to the destination.
    pub outcome: ResponseOutcome,
}

/// Read only the kind of an envelope.
pub fn peek_kind(bytes: &[u8]) -> Result<EnvelopeKind> {
    let mut stream = StreamReader::new(bytes);
    EnvelopeKind::try_from(stream.read_i32()?)
}

/// Stateless envelope encoder/decoder bound to a type registry.
///
/// Cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Marshaller {
    registry: Arc<TypeRegistry>,
    config: MarshalConfig,
}

impl Marshaller {
    /// Create a marshaller with the default configuration.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            config: MarshalConfig::default(),
        }
    }

    /// Create a marshaller with a custom configuration.
    pub fn with_config(registry: Arc<TypeRegistry>, config: MarshalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    #[inline]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Encode a whole envelope.
    ///
    /// Fails with `ArityExceeded` before writing anything if the envelope
    /// carries too many arguments, and at the first argument that cannot be
    /// encoded. No partial output is ever returned.
    pub fn encode_envelope(&self, envelope: &Envelope) -> Result<Bytes> {
        let count = envelope.arguments.len();
        if count > self.config.max_arguments {
            tracing::warn!(
                "Refusing to marshal {} with {} arguments (max {})",
                envelope.method,
                count,
                self.config.max_arguments
            );
            return Err(MarshalError::ArityExceeded {
                count: count as i64,
                max: self.config.max_arguments,
            });
        }

        let mut stream = StreamWriter::with_capacity(64);
        stream.write_i32(envelope.kind.as_i32());
        stream.write_string(&envelope.method);
        stream.write_string(&envelope.return_type);
        stream.write_i32(count as i32);

        for (index, arg) in envelope.arguments.iter().enumerate() {
            if let Err(e) = encode_argument(&self.registry, arg, &mut stream) {
                tracing::warn!(
                    "Failed to marshal argument {} of {}: {}",
                    index,
                    envelope.method,
                    e
                );
                return Err(e);
            }
        }

        tracing::debug!(
            "Marshalled {} {} ({} arguments, {} bytes)",
            envelope.kind,
            envelope.method,
            count,
            stream.len()
        );
        Ok(stream.into_bytes())
    }

    /// Decode a whole envelope.
    ///
    /// Header errors and a declared argument count outside `0..=max` fail
    /// the whole decode without allocating any argument. An argument
    /// failure stops decoding and is reported in
    /// [`DecodedEnvelope::failure`].
    pub fn decode_envelope(&self, bytes: &[u8]) -> Result<DecodedEnvelope> {
        let mut stream = StreamReader::new(bytes);
        let header = self.read_header(&mut stream)?;

        let mut envelope = Envelope::new(header.kind, header.method, header.return_type);
        envelope.arguments.reserve(header.argument_count);

        let mut failure = None;
        for index in 0..header.argument_count {
            match decode_argument(&self.registry, &mut stream) {
                Ok(value) => envelope.arguments.push(value),
                Err(error) => {
                    tracing::warn!(
                        "Failed to deserialize argument {} of {}, {} of {} arguments lost",
                        index,
                        envelope.method,
                        header.argument_count - index,
                        header.argument_count
                    );
                    failure = Some(ArgumentFailure { index, error });
                    break;
                }
            }
        }

        if failure.is_none() && !stream.is_empty() {
            tracing::debug!(
                "Ignoring {} trailing bytes after {}",
                stream.remaining(),
                envelope.method
            );
        }

        Ok(DecodedEnvelope {
            envelope,
            declared_arguments: header.argument_count,
            failure,
        })
    }

    /// Read only the kind of an envelope.
    #[inline]
    pub fn peek_kind(&self, bytes: &[u8]) -> Result<EnvelopeKind> {
        peek_kind(bytes)
    }

    /// Decode a response, loading its value into a caller-owned destination.
    ///
    /// The destination's storage is reused (nothing is constructed). A zero
    /// argument count is a void return and leaves the destination as is.
    ///
    /// When the wire type name differs from the destination's:
    /// - [`MismatchPolicy::Strict`] fails with `TypeMismatch`
    /// - [`MismatchPolicy::BestEffort`] loads anyway if both types share a
    ///   storage type, otherwise fails with `TypeMismatch`
    ///
    /// A `TypeMismatch` never touches the destination.
    pub fn decode_response_into(
        &self,
        bytes: &[u8],
        destination: &mut GenericValue,
    ) -> Result<DecodedResponse> {
        let mut stream = StreamReader::new(bytes);
        let header = self.read_header(&mut stream)?;
        let envelope = Envelope::new(header.kind, header.method, header.return_type);

        if header.argument_count == 0 {
            return Ok(DecodedResponse {
                envelope,
                outcome: ResponseOutcome::Void,
            });
        }

        let wire_type = stream.read_string()?;
        let (_, wire_ops) = self.registry.lookup(&wire_type).map_err(|e| {
            tracing::warn!("Unsupported type of argument: {}", wire_type);
            e
        })?;

        let expected = destination.type_name().to_string();
        let mut outcome = ResponseOutcome::Loaded;
        let mut loader = destination.meta_type().clone();

        if wire_type != expected {
            let compatible = wire_ops.storage_type() == loader.storage_type();
            if self.config.type_mismatch == MismatchPolicy::Strict || !compatible {
                tracing::warn!("Type doesn't match: {}, expected: {}", wire_type, expected);
                return Err(MarshalError::TypeMismatch {
                    expected,
                    found: wire_type,
                });
            }

            tracing::warn!(
                "Type doesn't match: {}, expected: {}; storage is compatible",
                wire_type,
                expected
            );
            loader = wire_ops.clone();
            outcome = ResponseOutcome::LoadedWithMismatch {
                wire_type: wire_type.clone(),
            };
        }

        if let Err(e) = loader.load(destination.storage_mut(), &mut stream) {
            tracing::warn!(
                "Failed to deserialize argument value of type {}: {}",
                wire_type,
                e
            );
            return Err(e);
        }

        Ok(DecodedResponse { envelope, outcome })
    }

    /// Encode a single value (type name + payload).
    pub fn encode_value(&self, value: &GenericValue) -> Result<Bytes> {
        let mut stream = StreamWriter::new();
        encode_argument(&self.registry, value, &mut stream)?;
        Ok(stream.into_bytes())
    }

    /// Decode a single value (type name + payload).
    pub fn decode_value(&self, bytes: &[u8]) -> Result<GenericValue> {
        decode_argument(&self.registry, &mut StreamReader::new(bytes))
    }

    fn read_header(&self, stream: &mut StreamReader<'_>) -> Result<EnvelopeHeader> {
        let kind = EnvelopeKind::try_from(stream.read_i32()?)?;
        let method = stream.read_string()?;
        let return_type = stream.read_string()?;

        let count = stream.read_i32()?;
        let argument_count = usize::try_from(count)
            .ok()
            .filter(|n| *n <= self.config.max_arguments)
            .ok_or_else(|| {
                tracing::warn!(
                    "Envelope {} declares {} arguments (max {})",
                    method,
                    count,
                    self.config.max_arguments
                );
                MarshalError::ArityExceeded {
                    count: i64::from(count),
                    max: self.config.max_arguments,
                }
            })?;

        Ok(EnvelopeHeader {
            kind,
            method,
            return_type,
            argument_count,
        })
    }
}
