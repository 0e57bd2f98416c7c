use super::{
    new_call, validate_default_handlers, ActiveCalls, ConnectionConfig, FunctionWrapper,
    JsonTransport, TransportEvent,
};
use crate::{
    call::{FunctionCall, Handler, Payload},
    error::{Error, Result},
    json,
    mapping::FunctionMapping,
    native::{CallError, Exception, NativeFunction},
    types::{Encode, Type, Value},
};
use serde_json::{json, Value as JsonValue};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};
use tracing::{debug, trace, warn};

/// Connection speaking JSON arrays over a text transport:
///
/// * call: `["call", id, "service.function", arg0, arg1, ...]`
/// * reply: `["call-reply", id, success, result or exception]`, without the last
///   element for a successful call to a function returning nothing.
///
/// Handles are cheap to clone. Wrappers created from a connection stop working once
/// every handle is dropped.
pub struct JsonConnection<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for JsonConnection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T> {
    transport: T,
    config: ConnectionConfig,
    mapping: RefCell<FunctionMapping>,
    active: RefCell<ActiveCalls>,
}

impl<T: JsonTransport + 'static> JsonConnection<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FunctionMapping::new(), ConnectionConfig::default())
    }

    /// Starts listening on `transport` before returning.
    pub fn with_config(transport: T, mapping: FunctionMapping, config: ConnectionConfig) -> Self {
        let connection = Self {
            inner: Rc::new(Inner {
                transport,
                config,
                mapping: RefCell::new(mapping),
                active: RefCell::new(ActiveCalls::default()),
            }),
        };
        connection.inner.transport.listen();
        connection
    }

    pub fn load_idl(&self, uri: &str) -> Result<()> {
        self.inner.mapping.borrow_mut().load_idl(uri)
    }

    pub fn register_func_implementation<F>(
        &self,
        qualified_name: &str,
        type_mapping: &str,
        native: F,
    ) -> Result<()>
    where
        F: NativeFunction + 'static,
    {
        self.inner
            .mapping
            .borrow_mut()
            .register_function(qualified_name, native, type_mapping)
    }

    /// Both the type mapping and the default handlers are checked here, before anything
    /// is sent.
    pub fn generate_function_wrapper(
        &self,
        qualified_name: &str,
        type_mapping: &str,
        default_handlers: Vec<Handler>,
    ) -> Result<FunctionWrapper> {
        self.inner.mapping.borrow().encoding(type_mapping)?;
        validate_default_handlers(&default_handlers)?;

        let inner = Rc::downgrade(&self.inner);
        let name = qualified_name.to_owned();
        Ok(FunctionWrapper::new(qualified_name, move |args| {
            upgrade(&inner)?.send_call(&name, args, &default_handlers)
        }))
    }

    pub fn handle_event(&self, event: TransportEvent<String>) -> Result<()> {
        match event {
            TransportEvent::Message(message) => self.handle_message(&message),
            TransportEvent::Close => {
                self.handle_close();
                Ok(())
            }
            TransportEvent::Error(reason) => {
                self.handle_error(&reason);
                Ok(())
            }
        }
    }

    /// Processes one inbound message. Malformed messages, replies to unknown calls and
    /// calls to unregistered functions are errors of the connection; it keeps working.
    pub fn handle_message(&self, message: &str) -> Result<()> {
        trace!(len = message.len(), "received message");
        let result = self.inner.dispatch(message);
        if let Err(err) = &result {
            if !matches!(err, Error::UnhandledException { .. }) {
                warn!(%err, "failed to handle message");
            }
        }
        result
    }

    pub fn handle_close(&self) {
        self.handle_error(&self.inner.config.close_reason);
    }

    /// Fails every pending call with `reason`.
    pub fn handle_error(&self, reason: &str) {
        let pending = self.inner.active.borrow_mut().take_all();
        debug!(pending = pending.len(), reason, "failing pending calls");
        for call in pending {
            call.set_error(reason);
        }
    }

    /// Ids of the calls still waiting for a reply.
    pub fn active_calls(&self) -> Vec<u32> {
        self.inner.active.borrow().ids()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }
}

fn upgrade<T>(inner: &Weak<Inner<T>>) -> Result<Rc<Inner<T>>> {
    inner
        .upgrade()
        .ok_or_else(|| Error::Connection("connection was dropped".to_owned()))
}

fn call_id(value: Option<&JsonValue>) -> Result<u32> {
    value
        .and_then(JsonValue::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| Error::Connection(format!("invalid call id: {value:?}")))
}

impl<T: JsonTransport> Inner<T> {
    fn send(&self, message: &[JsonValue]) -> Result<()> {
        let text = serde_json::to_string(message)?;
        if !self.transport.send(&text) {
            warn!(len = text.len(), "transport refused message");
        }
        Ok(())
    }

    fn send_call(
        &self,
        name: &str,
        args: Vec<Value>,
        default_handlers: &[Handler],
    ) -> Result<Option<FunctionCall>> {
        let id = self.active.borrow_mut().allocate_id()?;
        let mut message = vec![json!("call"), json!(id), json!(name)];
        message.extend(args.iter().map(json::to_json));
        debug!(call_id = id, name, "sending call");
        self.send(&message)?;

        if self.config.is_one_way(name) {
            return Ok(None);
        }
        let call = new_call(id, default_handlers)?;
        self.active.borrow_mut().insert(id, call.clone());
        Ok(Some(call))
    }

    fn dispatch(&self, message: &str) -> Result<()> {
        let message: Vec<JsonValue> = serde_json::from_str(message)?;
        let Some((kind, rest)) = message.split_first() else {
            return Err(Error::Connection("empty message".to_owned()));
        };
        match kind.as_str() {
            Some("call-reply") => self.handle_reply(rest),
            Some("call") => self.handle_call(rest),
            _ => Err(Error::Connection(format!("unknown message type: {kind}"))),
        }
    }

    fn handle_reply(&self, rest: &[JsonValue]) -> Result<()> {
        let id = call_id(rest.first())?;
        let success = rest
            .get(1)
            .and_then(JsonValue::as_bool)
            .ok_or_else(|| Error::Connection(format!("reply to call {id} lacks a status")))?;
        let call = self.active.borrow_mut().remove(id).ok_or_else(|| {
            Error::Connection(format!("received a response for an unrecognized call id: {id}"))
        })?;
        debug!(call_id = id, success, "received reply");

        let payload = Payload::Json(rest.get(2));
        if success {
            call.set_result(payload)
        } else {
            call.set_exception(payload)
        }
    }

    fn handle_call(&self, rest: &[JsonValue]) -> Result<()> {
        let id = call_id(rest.first())?;
        let name = rest
            .get(1)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::Connection(format!("call {id} lacks a method name")))?;
        let args = rest.get(2..).unwrap_or_default();

        let function = self.mapping.borrow().function(name).cloned().ok_or_else(|| {
            Error::Connection(format!("received a call for an unregistered method: {name}"))
        })?;
        let domain = function.domain();
        if args.len() != domain.len() {
            return Err(Error::InvalidArgument(format!(
                "incorrect number of arguments for method {name}: expected {}, got {}",
                domain.len(),
                args.len()
            )));
        }
        let args = args
            .iter()
            .zip(domain)
            .map(|(arg, ty)| json::from_json(arg, ty))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(call_id = id, name, "received call");

        let mut reply = vec![json!("call-reply"), json!(id)];
        match function.native().call(args) {
            Ok(value) => {
                reply.push(json!(true));
                if *function.range() != Type::Nil {
                    reply.push(json::to_json(&value));
                }
            }
            Err(CallError::Exception(exception)) => {
                debug!(call_id = id, name, %exception, "native function raised an exception");
                reply.push(json!(false));
                reply.push(json::to_json(&Exception::encode(exception)));
            }
            Err(CallError::Domain(mismatch)) => return Err(mismatch.into()),
        }

        if self.config.is_one_way(name) {
            return Ok(());
        }
        self.send(&reply)
    }
}
