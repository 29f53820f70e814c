//! Data structures and converter functions for dealing with channel frames.
//!
//! All the data types are in the `frame` module, the `codec` implements
//! the encoding and the decoding of the JSON envelope
//! `{topic, event, payload, ref}`.
pub mod codec;
pub mod frame;


use std::fmt;

/// Error returned when an inbound text cannot be turned into a frame.
///
/// Decoding errors are never fatal to a connection, the router logs the raw
/// text and discards the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub message: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot decode frame: {}", self.message)
    }
}

impl std::error::Error for DecodeError {}

/// Shorthand for making decode errors.
///
/// ```no_run
/// use phxmux_codec::decode_error;
/// use phxmux_codec::DecodeError;
///
/// fn non_empty(s: &str) -> Result<&str, DecodeError> {
///     if s.is_empty() {
///         return decode_error!("empty field");
///     }
///
///     Ok(s)
/// }
/// ```
#[macro_export]
macro_rules! decode_error {
    ($message:expr) => {
        ::std::result::Result::Err($crate::DecodeError {
            message: ::std::string::String::from($message),
        })
    };
}
