//! RPC middleware core: functions declared in an IDL are called across a connection,
//! with arguments and results laid out on the wire by per-function type mappings.
//!
//! The pieces, bottom up:
//!
//! * [`types`], [`path`], [`accessor`] and [`constructor`] model native values and reach
//!   into them,
//! * [`protocol`] compiles a [`TypeMapping`](protocol::TypeMapping) into wire
//!   encodings that [`codec`] reads and writes,
//! * [`mapping`] holds the native functions registered under IDL names,
//! * [`connection`] sends calls and dispatches replies over a transport, in JSON or in
//!   the binary format, and [`net`] carries binary frames over TCP.

#[macro_use]
mod macros;

pub mod accessor;
pub mod call;
pub mod codec;
pub mod connection;
pub mod constructor;
pub mod convert;
pub mod encoding;
pub mod error;
pub mod idl;
pub mod json;
pub mod mapping;
pub mod native;
pub mod net;
pub mod path;
pub mod protocol;
pub mod schemas;
pub mod types;

pub use error::{Error, Result};
pub use types::{Decode, Encode, Fields, StructType, Type, TypeMismatch, Typed, Value};
