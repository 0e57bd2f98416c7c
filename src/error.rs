use crate::types::TypeMismatch;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The IDL document could not be loaded or refers to undeclared types.
    #[error("IDL parser error: {0}")]
    IdlParser(String),

    #[error("unknown IDL function: {0}")]
    UnknownIdlFunction(String),

    #[error("unrecognized type mapping: {0}")]
    TypeMappingParser(String),

    /// A value path does not resolve against the native type, or a wire value cannot be
    /// assigned to the native type it resolves to.
    #[error("incompatible native type: {0}")]
    IncompatibleNativeType(String),

    #[error("(BUG in rpcwire) {0}")]
    Internal(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unhandled exception for call {call_id}: {exception}")]
    UnhandledException { call_id: u32, exception: String },

    #[error("unexpected end of data: needed {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("malformed JSON message: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TypeMismatch> for Error {
    fn from(mismatch: TypeMismatch) -> Self {
        Error::IncompatibleNativeType(mismatch.to_string())
    }
}
