//! Call dispatch over a transport.
//!
//! Two adapters share the same call model: [`json::JsonConnection`] speaks JSON arrays
//! over a text transport, [`callback`] speaks the binary wire format. Either way the
//! transport pushes [`TransportEvent`]s into the connection, and calls made through a
//! [`FunctionWrapper`] come back as [`FunctionCall`] handles that resolve later.

pub mod callback;
pub mod json;

use crate::{
    call::{FunctionCall, Handler},
    error::{Error, Result},
    native::Params,
    types::Value,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// A transport carrying binary frames.
pub trait CallbackTransport {
    /// Returns `false` if the frame could not be handed to the transport.
    fn send(&self, data: &[u8]) -> bool;

    /// Start delivering inbound frames, including any buffered so far.
    fn listen(&self) {}

    fn is_reliable(&self) -> bool {
        true
    }
}

/// A transport carrying text messages, such as a WebSocket.
pub trait JsonTransport {
    fn send(&self, message: &str) -> bool;

    fn listen(&self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent<M> {
    Message(M),
    Close,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Functions that are never answered. Calls to them return no [`FunctionCall`].
    pub one_way_functions: Vec<String>,
    /// Reason given to pending calls when the transport closes.
    pub close_reason: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            one_way_functions: vec!["opensim.connect.handshake".to_owned()],
            close_reason: "Connection closed.".to_owned(),
        }
    }
}

impl ConnectionConfig {
    pub fn is_one_way(&self, name: &str) -> bool {
        self.one_way_functions.iter().any(|f| f == name)
    }
}

/// Calls waiting for their reply, by call id.
#[derive(Debug)]
pub(crate) struct ActiveCalls<C = FunctionCall> {
    next_id: Option<u32>,
    calls: BTreeMap<u32, C>,
}

impl<C> Default for ActiveCalls<C> {
    fn default() -> Self {
        Self {
            next_id: Some(0),
            calls: BTreeMap::new(),
        }
    }
}

impl<C> ActiveCalls<C> {
    /// Ids count up from 0 and are never reused.
    pub(crate) fn allocate_id(&mut self) -> Result<u32> {
        let id = self
            .next_id
            .ok_or_else(|| Error::Connection("call ids exhausted".to_owned()))?;
        self.next_id = id.checked_add(1);
        Ok(id)
    }

    pub(crate) fn insert(&mut self, id: u32, call: C) {
        self.calls.insert(id, call);
    }

    pub(crate) fn remove(&mut self, id: u32) -> Option<C> {
        self.calls.remove(&id)
    }

    pub(crate) fn take_all(&mut self) -> Vec<C> {
        std::mem::take(&mut self.calls).into_values().collect()
    }

    pub(crate) fn ids(&self) -> Vec<u32> {
        self.calls.keys().copied().collect()
    }
}

/// Default handlers may only take results or errors.
pub(crate) fn validate_default_handlers(handlers: &[Handler]) -> Result<()> {
    match handlers
        .iter()
        .find(|h| !matches!(h, Handler::Result { .. } | Handler::Error(_)))
    {
        Some(handler) => Err(Error::InvalidArgument(format!(
            "invalid default handler type: {handler:?}"
        ))),
        None => Ok(()),
    }
}

pub(crate) fn new_call(id: u32, default_handlers: &[Handler]) -> Result<FunctionCall> {
    let call = FunctionCall::new(id);
    for handler in default_handlers {
        call.on(handler.event_name(), handler.clone())?;
    }
    Ok(call)
}

type Invoke = Box<dyn Fn(Vec<Value>) -> Result<Option<FunctionCall>>>;

/// Sends calls to one remote function. Obtained from a connection's
/// `generate_function_wrapper`.
pub struct FunctionWrapper {
    name: String,
    invoke: Invoke,
}

impl FunctionWrapper {
    pub(crate) fn new(
        name: &str,
        invoke: impl Fn(Vec<Value>) -> Result<Option<FunctionCall>> + 'static,
    ) -> Self {
        Self {
            name: name.to_owned(),
            invoke: Box::new(invoke),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends a call. One-way functions return `None`.
    pub fn call<P: Params>(&self, args: P) -> Result<Option<FunctionCall>> {
        self.call_values(args.encode_params())
    }

    pub fn call_values(&self, args: Vec<Value>) -> Result<Option<FunctionCall>> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for FunctionWrapper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FunctionWrapper")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_ids_count_up_until_exhausted() {
        let mut calls = ActiveCalls::<()>::default();
        assert_eq!(calls.allocate_id().unwrap(), 0);
        assert_eq!(calls.allocate_id().unwrap(), 1);

        calls.next_id = Some(u32::MAX);
        assert_eq!(calls.allocate_id().unwrap(), u32::MAX);
        assert!(matches!(calls.allocate_id(), Err(Error::Connection(_))));
    }

    #[test]
    fn take_all_empties_the_table() {
        let mut calls = ActiveCalls::default();
        calls.insert(0, 'a');
        calls.insert(4, 'b');
        assert_eq!(calls.ids(), vec![0, 4]);
        assert_eq!(calls.take_all(), vec!['a', 'b']);
        assert!(calls.ids().is_empty());
        assert_eq!(calls.remove(0), None);
    }

    #[test]
    fn config_defaults_apply_to_missing_keys() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"close_reason": "bye"}"#).unwrap();
        assert_eq!(config.close_reason, "bye");
        assert!(config.is_one_way("opensim.connect.handshake"));
        assert!(!config.is_one_way("opensim.login.login_to_simulator"));
    }

    #[test]
    fn only_result_and_error_handlers_are_defaults() {
        assert!(validate_default_handlers(&[
            Handler::result(|_: String| ()),
            Handler::error(|_| ()),
        ])
        .is_ok());
        assert!(matches!(
            validate_default_handlers(&[Handler::exception(|_: String| ())]),
            Err(Error::InvalidArgument(_))
        ));
    }
}
