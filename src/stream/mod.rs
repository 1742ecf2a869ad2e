//! Stream module - primitive field encoding over byte buffers.
//!
//! Sequential, forward-only codec used by every higher layer:
//! - [`StreamWriter`] appends fields to a growable `BytesMut`
//! - [`StreamReader`] consumes fields from a borrowed byte cursor
//!
//! Field layout is QDataStream-compatible:
//! ```text
//! i32/u32      4 bytes BE
//! i64/u64      8 bytes BE
//! bool/u8      1 byte
//! f64          8 bytes BE IEEE-754
//! string       u32 byte length + UTF-16BE units (0xFFFFFFFF = null)
//! byte array   u32 length + bytes (0xFFFFFFFF = null)
//! raw block    bytes verbatim
//! ```
//!
//! # Example
//!
//! ```
//! use procwire_marshal::stream::{StreamReader, StreamWriter};
//!
//! let mut writer = StreamWriter::new();
//! writer.write_i32(42);
//! writer.write_string("ping");
//! let bytes = writer.into_bytes();
//!
//! let mut reader = StreamReader::new(&bytes);
//! assert_eq!(reader.read_i32().unwrap(), 42);
//! assert_eq!(reader.read_string().unwrap(), "ping");
//! assert!(reader.is_empty());
//! ```

mod reader;
mod writer;

pub use reader::StreamReader;
pub use writer::StreamWriter;

/// Length marker for null strings and byte arrays.
pub const NULL_LENGTH: u32 = 0xFFFF_FFFF;
