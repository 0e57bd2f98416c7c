use crate::types::{Decode, Encode, Type, TypeMismatch, Typed, Value};
use std::{fmt, marker::PhantomData, rc::Rc};
use thiserror::Error;

/// A parameter list: a tuple whose elements each convert to and from [`Value`].
pub trait Params: Sized {
    fn types() -> Vec<Type>;
    fn encode_params(self) -> Vec<Value>;
    /// Missing values decode as [`Value::Nil`]; surplus values are ignored.
    fn decode_params(values: Vec<Value>) -> Result<Self, TypeMismatch>;
}

macro_rules! impl_params {
    ($($param:ident $var:ident),*) => {
        impl<$($param: Typed + Encode + Decode),*> Params for ($($param,)*) {
            fn types() -> Vec<Type> {
                vec![$(<$param as Typed>::rpc_type()),*]
            }

            fn encode_params(self) -> Vec<Value> {
                let ($($var,)*) = self;
                vec![$(<$param as Encode>::encode($var)),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn decode_params(values: Vec<Value>) -> Result<Self, TypeMismatch> {
                let mut values = values.into_iter();
                Ok(($(<$param as Decode>::decode(values.next().unwrap_or(Value::Nil))?,)*))
            }
        }
    };
}

impl_params!();
impl_params!(A a);
impl_params!(A a, B b);
impl_params!(A a, B b, C c);
impl_params!(A a, B b, C c, D d);

crate::native_struct! {
    /// Failure raised by a native function and delivered to the caller's exception
    /// handlers.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Exception {
        pub message: String,
    }
}

impl Exception {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Exception {}

/// A function that can be registered under an IDL name and called remotely.
pub trait NativeFunction {
    type Domain: Params;
    type Range: Typed + Encode;

    fn call(&self, args: Self::Domain) -> Result<Self::Range, Exception>;
}

pub struct FnNative<F, D, R> {
    f: F,
    _signature: PhantomData<fn(D) -> R>,
}

/// Wraps a closure taking its arguments as a tuple.
///
/// ```
/// use rpcwire::native::{native_fn, Exception};
/// let add = native_fn(|(a, b): (i32, i32)| Ok::<_, Exception>(a + b));
/// # let _ = add;
/// ```
pub fn native_fn<D, R, F>(f: F) -> FnNative<F, D, R>
where
    D: Params,
    R: Typed + Encode,
    F: Fn(D) -> Result<R, Exception>,
{
    FnNative {
        f,
        _signature: PhantomData,
    }
}

impl<F, D, R> NativeFunction for FnNative<F, D, R>
where
    D: Params,
    R: Typed + Encode,
    F: Fn(D) -> Result<R, Exception>,
{
    type Domain = D;
    type Range = R;

    fn call(&self, args: D) -> Result<R, Exception> {
        (self.f)(args)
    }
}

#[derive(Debug, Error)]
pub(crate) enum CallError {
    #[error("domain type mismatch: {0}")]
    Domain(TypeMismatch),

    #[error("{0}")]
    Exception(Exception),
}

/// A type-erased version of [`NativeFunction`].
pub(crate) trait DynamicNativeFunction {
    fn domain(&self) -> &[Type];
    fn range(&self) -> &Type;
    fn call(&self, args: Vec<Value>) -> Result<Value, CallError>;
}

struct TypedNativeFunction<F> {
    native: F,
    domain: Vec<Type>,
    range: Type,
}

impl<F: NativeFunction> DynamicNativeFunction for TypedNativeFunction<F> {
    fn domain(&self) -> &[Type] {
        &self.domain
    }

    fn range(&self) -> &Type {
        &self.range
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, CallError> {
        let args = F::Domain::decode_params(args).map_err(CallError::Domain)?;
        let ret = self.native.call(args).map_err(CallError::Exception)?;
        Ok(F::Range::encode(ret))
    }
}

pub(crate) fn erase<F: NativeFunction + 'static>(native: F) -> Rc<dyn DynamicNativeFunction> {
    Rc::new(TypedNativeFunction {
        native,
        domain: F::Domain::types(),
        range: F::Range::rpc_type(),
    })
}
