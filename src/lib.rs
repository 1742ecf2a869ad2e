//! # procwire-marshal
//!
//! Marshalling core for Procwire remote-invocation envelopes.
//!
//! Converts a call, signal or response (method name, return type, ordered
//! dynamically-typed arguments) to bytes and back. Argument types are open:
//! they are looked up at runtime in a [`TypeRegistry`] that the application
//! populates at startup.
//!
//! ## Architecture
//!
//! - **Stream** ([`stream`]): big-endian primitive fields
//! - **Registry** ([`registry`]): type name → construct/copy/destroy/save/load
//! - **Value** ([`GenericValue`]): owned, dynamically-typed argument
//! - **Envelope** ([`Envelope`]): kind, method, return type, arguments (max 10)
//! - **Marshaller** ([`Marshaller`]): envelope encode/decode, with a fast
//!   path for [`PixelBuffer`] images
//!
//! Transport and dispatch live elsewhere: the marshaller only turns
//! envelopes into byte buffers and byte buffers into envelopes.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use procwire_marshal::{Envelope, EnvelopeKind, Marshaller, TypeRegistry};
//!
//! let registry = Arc::new(TypeRegistry::with_builtins());
//! let marshaller = Marshaller::new(registry.clone());
//!
//! let call = Envelope::call("setTitle", "void")
//!     .with_argument(registry.wrap("QString", String::from("Hello")).unwrap());
//! let bytes = marshaller.encode_envelope(&call).unwrap();
//!
//! assert_eq!(marshaller.peek_kind(&bytes).unwrap(), EnvelopeKind::Call);
//!
//! let decoded = marshaller.decode_envelope(&bytes).unwrap().into_complete().unwrap();
//! assert_eq!(decoded.arguments[0].get::<String>().unwrap(), "Hello");
//! ```

pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod marshal;
pub mod pixel;
pub mod registry;
pub mod stream;

mod value;

pub use config::{MarshalConfig, MismatchPolicy};
pub use envelope::{Envelope, EnvelopeKind, MAX_ARGUMENTS, VOID_TYPE};
pub use error::{MarshalError, Result};
pub use marshal::{
    peek_kind, ArgumentFailure, DecodedEnvelope, DecodedResponse, Marshaller, ResponseOutcome,
};
pub use pixel::{PixelBuffer, PixelFormat};
pub use registry::{MetaType, MetaTypeId, Streamable, TypeRegistry};
pub use value::{release_arguments, GenericValue};
