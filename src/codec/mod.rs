//! Codec module - payload encoding for serde-registered argument types.
//!
//! Types registered with
//! [`TypeRegistry::register_serde`](crate::TypeRegistry::register_serde)
//! have no hand-written stream operators. Their value is encoded with
//! [`MsgPackCodec`] and carried as a length-prefixed byte array.
//!
//! # Example
//!
//! ```
//! use procwire_marshal::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
