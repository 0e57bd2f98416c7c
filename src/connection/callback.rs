//! The binary adapter.
//!
//! A request frame is the call id (`u32`), the function name as a zero-terminated UTF-16
//! string, then the arguments laid out by the function's argument encoding. A reply
//! frame is the call id followed by the result laid out by the result encoding.
//! There is no exception frame: a native function that fails produces no reply.

use super::{
    new_call, validate_default_handlers, ActiveCalls, CallbackTransport, ConnectionConfig,
    FunctionWrapper, TransportEvent,
};
use crate::{
    call::{FunctionCall, Handler, Payload},
    codec::{ObjectDeserializer, ObjectSerializer, SerializedDataReader, SerializedDataWriter},
    encoding::WireEncoding,
    error::{Error, Result},
    mapping::FunctionMapping,
    native::CallError,
    protocol::{FunctionEncoding, ProtocolGenerator},
    types::Value,
};
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, error, trace, warn};

/// Serves calls arriving over `transport` from the functions registered in a
/// [`FunctionMapping`].
pub struct ClientHandler<T> {
    transport: T,
    mapping: Rc<FunctionMapping>,
    config: ConnectionConfig,
}

impl<T: CallbackTransport> ClientHandler<T> {
    pub fn new(transport: T, mapping: Rc<FunctionMapping>) -> Self {
        Self::with_config(transport, mapping, ConnectionConfig::default())
    }

    /// Starts listening on `transport` before returning.
    pub fn with_config(transport: T, mapping: Rc<FunctionMapping>, config: ConnectionConfig) -> Self {
        if !transport.is_reliable() {
            debug!("serving calls over an unreliable transport");
        }
        transport.listen();
        Self {
            transport,
            mapping,
            config,
        }
    }

    pub fn handle_event(&self, event: TransportEvent<Vec<u8>>) -> Result<()> {
        match event {
            TransportEvent::Message(data) => self.handle_data_message(&data),
            TransportEvent::Close => {
                debug!("client disconnected");
                Ok(())
            }
            TransportEvent::Error(reason) => {
                warn!(%reason, "client transport failed");
                Ok(())
            }
        }
    }

    /// Decodes one request frame, calls the function and sends the reply frame.
    pub fn handle_data_message(&self, data: &[u8]) -> Result<()> {
        trace!(len = data.len(), "received request frame");
        let mut reader = SerializedDataReader::new(data);
        let id = reader.read_u32()?;
        let name = reader.read_zcstring()?;
        let Some(function) = self.mapping.function(&name) else {
            warn!(call_id = id, %name, "call to unregistered function");
            return Err(Error::Connection(format!(
                "received a call for an unregistered method: {name}"
            )));
        };
        let args = ObjectDeserializer::deserialize_args(
            &mut reader,
            function.domain(),
            function.args_encoding(),
        )?;
        if reader.remaining() > 0 {
            debug!(call_id = id, %name, extra = reader.remaining(), "ignoring trailing bytes");
        }
        debug!(call_id = id, %name, "received call");

        let result = match function.native().call(args) {
            Ok(result) => result,
            Err(CallError::Exception(exception)) => {
                error!(call_id = id, %name, %exception, "native function raised an exception");
                return Ok(());
            }
            Err(CallError::Domain(mismatch)) => return Err(mismatch.into()),
        };
        if self.config.is_one_way(&name) {
            return Ok(());
        }

        let mut writer = SerializedDataWriter::new();
        writer.write_u32(id);
        ObjectSerializer::serialize(&mut writer, &result, function.result_encoding())?;
        trace!(call_id = id, len = writer.len(), "sending reply frame");
        if !self.transport.send(writer.as_bytes()) {
            warn!(call_id = id, "transport refused reply");
        }
        Ok(())
    }
}

struct PendingCall {
    call: FunctionCall,
    encoding: Rc<FunctionEncoding>,
}

struct Inner<T> {
    transport: T,
    config: ConnectionConfig,
    generator: ProtocolGenerator,
    active: RefCell<ActiveCalls<PendingCall>>,
}

/// Calling side of the binary adapter.
pub struct CallbackConnection<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for CallbackConnection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: CallbackTransport + 'static> CallbackConnection<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ProtocolGenerator::new(), ConnectionConfig::default())
    }

    /// Starts listening on `transport` before returning.
    pub fn with_config(transport: T, generator: ProtocolGenerator, config: ConnectionConfig) -> Self {
        let connection = Self {
            inner: Rc::new(Inner {
                transport,
                config,
                generator,
                active: RefCell::new(ActiveCalls::default()),
            }),
        };
        connection.inner.transport.listen();
        connection
    }

    pub fn generate_function_wrapper(
        &self,
        qualified_name: &str,
        type_mapping: &str,
        default_handlers: Vec<Handler>,
    ) -> Result<FunctionWrapper> {
        let encoding = Rc::new(self.inner.generator.generate(type_mapping)?);
        validate_default_handlers(&default_handlers)?;

        let inner = Rc::downgrade(&self.inner);
        let name = qualified_name.to_owned();
        Ok(FunctionWrapper::new(qualified_name, move |args| {
            let inner = inner
                .upgrade()
                .ok_or_else(|| Error::Connection("connection was dropped".to_owned()))?;
            inner.send_call(&name, args, &encoding, &default_handlers)
        }))
    }

    pub fn handle_event(&self, event: TransportEvent<Vec<u8>>) -> Result<()> {
        match event {
            TransportEvent::Message(data) => self.handle_data_message(&data),
            TransportEvent::Close => {
                self.handle_error(&self.inner.config.close_reason);
                Ok(())
            }
            TransportEvent::Error(reason) => {
                self.handle_error(&reason);
                Ok(())
            }
        }
    }

    /// Resolves the call a reply frame answers.
    pub fn handle_data_message(&self, data: &[u8]) -> Result<()> {
        trace!(len = data.len(), "received reply frame");
        let mut reader = SerializedDataReader::new(data);
        let id = reader.read_u32()?;
        let Some(pending) = self.inner.active.borrow_mut().remove(id) else {
            warn!(call_id = id, "reply for unknown call");
            return Err(Error::Connection(format!(
                "received a response for an unrecognized call id: {id}"
            )));
        };
        debug!(call_id = id, "received reply");
        pending.call.set_result(Payload::Wire {
            data: reader.rest(),
            encoding: &pending.encoding.result,
        })
    }

    /// Fails every pending call with `reason`.
    pub fn handle_error(&self, reason: &str) {
        let pending = self.inner.active.borrow_mut().take_all();
        debug!(pending = pending.len(), reason, "failing pending calls");
        for PendingCall { call, .. } in pending {
            call.set_error(reason);
        }
    }

    pub fn active_calls(&self) -> Vec<u32> {
        self.inner.active.borrow().ids()
    }
}

impl<T: CallbackTransport> Inner<T> {
    fn send_call(
        &self,
        name: &str,
        args: Vec<Value>,
        encoding: &Rc<FunctionEncoding>,
        default_handlers: &[Handler],
    ) -> Result<Option<FunctionCall>> {
        let id = self.active.borrow_mut().allocate_id()?;
        let frame = encode_request(id, name, &args, &encoding.args)?;
        debug!(call_id = id, name, len = frame.len(), "sending call");
        if !self.transport.send(&frame) {
            warn!(call_id = id, name, "transport refused call");
        }

        if self.config.is_one_way(name) {
            return Ok(None);
        }
        let call = new_call(id, default_handlers)?;
        self.active.borrow_mut().insert(
            id,
            PendingCall {
                call: call.clone(),
                encoding: encoding.clone(),
            },
        );
        Ok(Some(call))
    }
}

/// Builds a request frame.
pub fn encode_request(
    id: u32,
    name: &str,
    args: &[Value],
    args_encoding: &[WireEncoding],
) -> Result<Vec<u8>> {
    let mut writer = SerializedDataWriter::new();
    writer.write_u32(id);
    writer.write_zcstring(name);
    ObjectSerializer::serialize_args(&mut writer, args, args_encoding)?;
    Ok(writer.into_bytes())
}
