//! Envelope - the logical message exchanged between processes.
//!
//! # Example
//!
//! ```
//! use procwire_marshal::{Envelope, EnvelopeKind, TypeRegistry};
//!
//! let registry = TypeRegistry::with_builtins();
//! let envelope = Envelope::call("resize", "void")
//!     .with_argument(registry.wrap("int", 640i32).unwrap())
//!     .with_argument(registry.wrap("int", 480i32).unwrap());
//!
//! assert_eq!(envelope.kind, EnvelopeKind::Call);
//! assert_eq!(envelope.arguments.len(), 2);
//! ```

use std::fmt;

use crate::error::{MarshalError, Result};
use crate::value::GenericValue;

/// Maximum number of arguments an envelope may carry.
pub const MAX_ARGUMENTS: usize = 10;

/// Return type name of calls without a result.
pub const VOID_TYPE: &str = "void";

/// Kind of envelope (first field on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EnvelopeKind {
    /// Remote method call.
    Call = 0,
    /// Signal notification.
    Signal = 1,
    /// Response to a call.
    Response = 2,
}

impl EnvelopeKind {
    /// Wire discriminant.
    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for EnvelopeKind {
    type Error = MarshalError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::Signal),
            2 => Ok(Self::Response),
            other => Err(MarshalError::InvalidKind(other)),
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Call => "call",
            Self::Signal => "signal",
            Self::Response => "response",
        };
        f.write_str(name)
    }
}

/// A call, signal or response with its ordered arguments.
#[derive(Debug, PartialEq)]
pub struct Envelope {
    /// Envelope kind.
    pub kind: EnvelopeKind,
    /// Method (or signal) name.
    pub method: String,
    /// Return type name (`"void"` if none).
    pub return_type: String,
    /// Ordered arguments, owned by the envelope.
    pub arguments: Vec<GenericValue>,
}

impl Envelope {
    /// Create an envelope with no arguments.
    pub fn new(kind: EnvelopeKind, method: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            kind,
            method: method.into(),
            return_type: return_type.into(),
            arguments: Vec::new(),
        }
    }

    /// Create a call envelope.
    pub fn call(method: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Call, method, return_type)
    }

    /// Create a signal envelope.
    pub fn signal(method: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Signal, method, VOID_TYPE)
    }

    /// Create a response envelope, carrying `value` if the method returns one.
    pub fn response(
        method: impl Into<String>,
        return_type: impl Into<String>,
        value: Option<GenericValue>,
    ) -> Self {
        let mut envelope = Self::new(EnvelopeKind::Response, method, return_type);
        envelope.arguments.extend(value);
        envelope
    }

    /// Append an argument (builder style).
    pub fn with_argument(mut self, value: GenericValue) -> Self {
        self.arguments.push(value);
        self
    }

    /// Append an argument, refusing to grow past [`MAX_ARGUMENTS`].
    pub fn push_argument(&mut self, value: GenericValue) -> Result<()> {
        if self.arguments.len() >= MAX_ARGUMENTS {
            return Err(MarshalError::ArityExceeded {
                count: self.arguments.len() as i64 + 1,
                max: MAX_ARGUMENTS,
            });
        }
        self.arguments.push(value);
        Ok(())
    }

    /// Take ownership of the arguments, leaving the envelope empty.
    pub fn take_arguments(&mut self) -> Vec<GenericValue> {
        std::mem::take(&mut self.arguments)
    }
}
