use std::io;

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by bitmap operations
#[derive(Debug, Error)]
pub enum Error {
    /// An index was outside of `[0, cardinality)`
    #[error("index {index} is out of range for a set of cardinality {cardinality}")]
    OutOfRange { index: u64, cardinality: u64 },

    /// The allocation strategy was configured incorrectly
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Serialized input could not be decoded into a valid bitmap
    #[error("corrupt data: {0}")]
    CorruptData(#[from] DeserializeError),

    /// A container was found in a state that should be unreachable
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The underlying reader or writer failed
    #[error("io error: {0}")]
    Io(io::Error)
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // A short read is a property of the input, not of the stream
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::CorruptData(DeserializeError::Truncated)
        }
        else {
            Error::Io(err)
        }
    }
}

/// Misuse of the process wide allocation hook
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An allocator was already registered, or the default was already put in use
    #[error("a bitset allocator has already been registered")]
    AlreadyRegistered,

    /// Bitset storage was allocated before the allocator was registered
    #[error("bitset containers were allocated before the allocator was registered")]
    ContainersExist
}

/// An error that occured while deserializing a bitmap
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeserializeError {
    /// An invalid cookie was detected. This is likely not a bitmap. Contains the found value
    #[error("invalid cookie: {0}")]
    InvalidCookie(u32),

    /// An invalid container count was detected. Contains the value found
    #[error("invalid container count: {0}")]
    InvalidContainerCount(u32),

    /// The input ended before the declared content was read
    #[error("input is truncated")]
    Truncated,

    /// Container keys are not strictly increasing
    #[error("container key {key} at index {index} is out of order")]
    UnsortedKeys { index: usize, key: u16 },

    /// A declared payload offset does not match the position of the payload
    #[error("container {index} declares offset {found}, expected {expected}")]
    InvalidOffset { index: usize, found: u32, expected: u32 },

    /// A container payload disagrees with the cardinality in the header
    #[error("container {index} declares cardinality {declared} but holds {found}")]
    CardinalityMismatch { index: usize, declared: u32, found: u32 },

    /// A container payload is malformed
    #[error("container {index} is malformed: {reason}")]
    InvalidContainer { index: usize, reason: &'static str }
}
