//! In-flight calls and the handlers that receive their outcome.

use crate::{
    codec::{ObjectDeserializer, SerializedDataReader},
    encoding::WireEncoding,
    error::{Error, Result},
    json,
    native::Exception,
    types::{Decode, Type, Typed, Value},
};
use serde_json::Value as JsonValue;
use std::{cell::RefCell, fmt, rc::Rc};
use tracing::error;

type ValueCallback = Rc<dyn Fn(Value) -> Result<()>>;
type PairCallback = Rc<dyn Fn(Option<Value>, Option<Value>) -> Result<()>>;

/// A callback for one event of a [`FunctionCall`]. The shape decides which event the
/// handler can be registered for; payloads are cast to the declared types before the
/// callback runs.
#[derive(Clone)]
pub enum Handler {
    Result { ty: Type, callback: ValueCallback },
    Exception { ty: Type, callback: ValueCallback },
    ExcResult {
        exception_ty: Type,
        result_ty: Type,
        callback: PairCallback,
    },
    Error(Rc<dyn Fn(&str)>),
}

fn decode<T: Decode>(value: Value) -> Result<T> {
    Ok(T::decode(value)?)
}

impl Handler {
    pub fn result<T, F>(f: F) -> Self
    where
        T: Typed + Decode,
        F: Fn(T) + 'static,
    {
        Handler::Result {
            ty: T::rpc_type(),
            callback: Rc::new(move |value| decode(value).map(&f)),
        }
    }

    pub fn exception<E, F>(f: F) -> Self
    where
        E: Typed + Decode,
        F: Fn(E) + 'static,
    {
        Handler::Exception {
            ty: E::rpc_type(),
            callback: Rc::new(move |value| decode(value).map(&f)),
        }
    }

    /// Receives either the exception or the result; the other slot is `None`.
    pub fn exc_result<E, T, F>(f: F) -> Self
    where
        E: Typed + Decode,
        T: Typed + Decode,
        F: Fn(Option<E>, Option<T>) + 'static,
    {
        Handler::ExcResult {
            exception_ty: E::rpc_type(),
            result_ty: T::rpc_type(),
            callback: Rc::new(move |exception, result| {
                let exception = exception.map(decode::<E>).transpose()?;
                let result = result.map(decode::<T>).transpose()?;
                f(exception, result);
                Ok(())
            }),
        }
    }

    pub fn error<F>(f: F) -> Self
    where
        F: Fn(&str) + 'static,
    {
        Handler::Error(Rc::new(f))
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Handler::Result { .. } => "result",
            Handler::Exception { .. } => "exception",
            Handler::ExcResult { .. } => "exc_result",
            Handler::Error(_) => "error",
        }
    }

    /// Fails unless this handler has the shape `event` requires.
    pub fn check_event(&self, event: &str) -> Result<()> {
        match event {
            "result" | "exception" | "exc_result" | "error" if event == self.event_name() => Ok(()),
            "result" | "exception" | "exc_result" | "error" => Err(Error::InvalidArgument(format!(
                "invalid handler type for {event} event: expected a {event} handler, got a {} handler",
                self.event_name()
            ))),
            _ => Err(Error::InvalidArgument(format!("invalid event name: {event}"))),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Handler::Result { ty, .. } => write!(f, "Result({ty})"),
            Handler::Exception { ty, .. } => write!(f, "Exception({ty})"),
            Handler::ExcResult {
                exception_ty,
                result_ty,
                ..
            } => write!(f, "ExcResult({exception_ty}, {result_ty})"),
            Handler::Error(_) => f.write_str("Error"),
        }
    }
}

/// The outcome of a call as received, cast lazily to each handler's type.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Payload<'a> {
    /// `None` when a successful reply carries no value.
    Json(Option<&'a JsonValue>),
    Wire {
        data: &'a [u8],
        encoding: &'a [WireEncoding],
    },
}

impl Payload<'_> {
    pub(crate) fn cast(&self, ty: &Type) -> Result<Value> {
        match self {
            Payload::Json(Some(json)) => Ok(json::from_json(json, ty)?),
            Payload::Json(None) => Ok(ty.default_value()),
            Payload::Wire { data, encoding } => {
                let mut reader = SerializedDataReader::new(data);
                ObjectDeserializer::deserialize(&mut reader, ty, encoding)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Payload::Json(Some(json)) => match Exception::decode(json::from_json_untyped(json)) {
                Ok(exception) if !exception.message.is_empty() => exception.message,
                _ => json.to_string(),
            },
            Payload::Json(None) => "(no details)".to_owned(),
            Payload::Wire { data, .. } => format!("{} byte payload", data.len()),
        }
    }
}

fn result_type(handler: &Handler) -> Option<&Type> {
    match handler {
        Handler::Result { ty, .. } => Some(ty),
        Handler::ExcResult { result_ty, .. } => Some(result_ty),
        _ => None,
    }
}

fn exception_type(handler: &Handler) -> Option<&Type> {
    match handler {
        Handler::Exception { ty, .. } => Some(ty),
        Handler::ExcResult { exception_ty, .. } => Some(exception_ty),
        _ => None,
    }
}

struct CallState {
    id: u32,
    resolved: bool,
    handlers: Vec<Handler>,
}

/// One call sent to the remote end. Handles are cheap to clone and share the call.
///
/// A call resolves exactly once: with a result, an exception, or an error when the
/// connection fails first. Handlers are dropped on resolution.
#[derive(Clone)]
pub struct FunctionCall {
    state: Rc<RefCell<CallState>>,
}

impl FunctionCall {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(CallState {
                id,
                resolved: false,
                handlers: Vec::new(),
            })),
        }
    }

    pub fn id(&self) -> u32 {
        self.state.borrow().id
    }

    pub fn is_resolved(&self) -> bool {
        self.state.borrow().resolved
    }

    /// Registers `handler` for `event`. An `error` handler replaces the previous one.
    ///
    /// ```
    /// # use rpcwire::call::Handler;
    /// # fn demo(call: &rpcwire::call::FunctionCall) -> rpcwire::Result<()> {
    /// call.on("result", Handler::result(|n: i32| println!("{n}")))?
    ///     .on("error", Handler::error(|reason| eprintln!("{reason}")))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn on(&self, event: &str, handler: Handler) -> Result<&Self> {
        handler.check_event(event)?;
        let mut state = self.state.borrow_mut();
        if state.resolved {
            return Err(Error::InvalidArgument(format!(
                "call {} is already resolved",
                state.id
            )));
        }
        if matches!(handler, Handler::Error(_)) {
            state.handlers.retain(|h| !matches!(h, Handler::Error(_)));
        }
        state.handlers.push(handler);
        Ok(self)
    }

    /// Marks the call resolved and hands out its handlers; `None` if it already was.
    fn resolve(&self) -> Option<Vec<Handler>> {
        let mut state = self.state.borrow_mut();
        if state.resolved {
            return None;
        }
        state.resolved = true;
        Some(std::mem::take(&mut state.handlers))
    }

    /// Casts `payload` for every handler `slot` gives a type for, without resolving.
    /// A payload that does not fit fails the call with an `error` event.
    fn cast_for(
        &self,
        payload: &Payload,
        slot: fn(&Handler) -> Option<&Type>,
    ) -> Result<Vec<(Handler, Value)>> {
        let handlers = self.state.borrow().handlers.clone();
        let mut casts = Vec::with_capacity(handlers.len());
        for handler in handlers {
            match slot(&handler).map(|ty| payload.cast(ty)) {
                None => {}
                Some(Ok(value)) => casts.push((handler, value)),
                Some(Err(err)) => {
                    self.set_error(&err.to_string());
                    return Err(err);
                }
            }
        }
        Ok(casts)
    }

    pub(crate) fn set_result(&self, payload: Payload) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }
        let casts = self.cast_for(&payload, result_type)?;
        self.resolve();
        let mut outcome = Ok(());
        for (handler, value) in casts {
            let delivered = match handler {
                Handler::Result { callback, .. } => callback(value),
                Handler::ExcResult { callback, .. } => callback(None, Some(value)),
                _ => Ok(()),
            };
            if outcome.is_ok() {
                outcome = delivered;
            }
        }
        outcome
    }

    /// Fails with [`Error::UnhandledException`] when no handler takes exceptions.
    pub(crate) fn set_exception(&self, payload: Payload) -> Result<()> {
        let id = self.id();
        if self.is_resolved() {
            return Ok(());
        }
        let handled = self
            .state
            .borrow()
            .handlers
            .iter()
            .any(|h| exception_type(h).is_some());
        if !handled {
            self.resolve();
            let exception = payload.describe();
            error!(call_id = id, %exception, "unhandled exception");
            return Err(Error::UnhandledException {
                call_id: id,
                exception,
            });
        }

        let casts = self.cast_for(&payload, exception_type)?;
        self.resolve();
        let mut outcome = Ok(());
        for (handler, value) in casts {
            let delivered = match handler {
                Handler::Exception { callback, .. } => callback(value),
                Handler::ExcResult { callback, .. } => callback(Some(value), None),
                _ => Ok(()),
            };
            if outcome.is_ok() {
                outcome = delivered;
            }
        }
        outcome
    }

    pub(crate) fn set_error(&self, reason: &str) {
        for handler in self.resolve().unwrap_or_default() {
            if let Handler::Error(callback) = handler {
                callback(reason);
            }
        }
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FunctionCall")
            .field("id", &state.id)
            .field("resolved", &state.resolved)
            .field("handlers", &state.handlers)
            .finish()
    }
}
