use crate::convert;
use std::{cell::RefCell, collections::BTreeMap, error::Error, fmt, rc::Rc, sync::Arc};

/// Describes the shape of a native value. Paths are resolved against this descriptor
/// instead of inspecting values at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Nil,
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    Float,
    Double,
    String,
    Array(Box<Type>),
    /// A record with copy semantics: reading a field yields an independent copy.
    Struct(Arc<StructType>),
    /// A record with reference semantics: every copy shares the same fields.
    Object(Arc<StructType>),
}

/// Field table of a record type, built once per native type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<(String, Type)>,
}

impl StructType {
    pub fn new<N: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = (N, Type)>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

impl Type {
    fn name(&self) -> &str {
        use Type::*;
        match self {
            Nil => "Nil",
            Bool => "Bool",
            U8 => "U8",
            I8 => "I8",
            U16 => "U16",
            I16 => "I16",
            U32 => "U32",
            I32 => "I32",
            U64 => "U64",
            I64 => "I64",
            Float => "Float",
            Double => "Double",
            String => "String",
            Array(_) => "Array",
            Struct(st) | Object(st) => &st.name,
        }
    }

    pub fn array_of(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn record(&self) -> Option<&StructType> {
        match self {
            Type::Struct(st) | Type::Object(st) => Some(st),
            _ => None,
        }
    }

    /// The value a freshly constructed instance of this type holds. Strings start out
    /// empty and records get every field at its own default.
    pub fn default_value(&self) -> Value {
        use Type::*;
        match self {
            Nil => Value::Nil,
            Bool => Value::Bool(false),
            U8 => Value::U8(0),
            I8 => Value::I8(0),
            U16 => Value::U16(0),
            I16 => Value::I16(0),
            U32 => Value::U32(0),
            I32 => Value::I32(0),
            U64 => Value::U64(0),
            I64 => Value::I64(0),
            Float => Value::Float(0.0),
            Double => Value::Double(0.0),
            String => Value::String(std::string::String::new()),
            Array(_) => Value::Array(Vec::new()),
            Struct(st) => Value::Struct(default_fields(st)),
            Object(st) => Value::new_object(default_fields(st)),
        }
    }
}

fn default_fields(st: &StructType) -> Fields {
    st.fields
        .iter()
        .map(|(name, ty)| (name.clone(), ty.default_value()))
        .collect()
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Type::Array(element) = self {
            return write!(f, "{element}[]");
        }
        f.write_str(self.name())
    }
}

pub type Fields = BTreeMap<String, Value>;

/// A native value as seen by the marshaling engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(Fields),
    Object(Rc<RefCell<Fields>>),
}

impl Value {
    pub fn new_struct(fields: Fields) -> Self {
        Value::Struct(fields)
    }

    pub fn new_object(fields: Fields) -> Self {
        Value::Object(Rc::new(RefCell::new(fields)))
    }

    /// `false` only for reference containers, whose mutations are visible to every owner.
    pub fn is_value_type(&self) -> bool {
        !matches!(self, Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widens any integer variant, used for checked conversions between widths.
    pub fn as_integer(&self) -> Option<i128> {
        use Value::*;
        Some(match *self {
            U8(n) => n.into(),
            I8(n) => n.into(),
            U16(n) => n.into(),
            I16(n) => n.into(),
            U32(n) => n.into(),
            I32(n) => n.into(),
            U64(n) => n.into(),
            I64(n) => n.into(),
            _ => return None,
        })
    }

    /// Takes the fields out of a record; shared records are copied. Any other value is
    /// handed back unchanged.
    pub fn into_fields(self) -> Result<Fields, Value> {
        match self {
            Value::Struct(fields) => Ok(fields),
            Value::Object(shared) => Ok(shared.borrow().clone()),
            other => Err(other),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::I32(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::U32(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

pub trait Typed {
    fn rpc_type() -> Type;
}

pub trait Encode {
    fn encode(val: Self) -> Value;
}

pub trait Decode: Sized {
    fn decode(val: Value) -> Result<Self, TypeMismatch>;
}

macro_rules! impl_encode_decode {
    ($rust_type:ty, $rpc_type:expr, $encode_name:pat => $encode_expr:expr, $($from_rpc_arm:tt)*) => {
        impl Typed for $rust_type {
            fn rpc_type() -> Type {
                $rpc_type
            }
        }

        impl Encode for $rust_type {
            fn encode($encode_name: $rust_type) -> Value {
                $encode_expr
            }
        }

        impl Decode for $rust_type {
            fn decode(val: Value) -> Result<Self, TypeMismatch> {
                let val = convert::cast(val, &<Self as Typed>::rpc_type())?;
                Ok(match val {
                    $($from_rpc_arm)*,
                    _ => return Err(TypeMismatch::new(&val, <Self as Typed>::rpc_type()))
                })
            }
        }
    };
}

impl_encode_decode!((), Type::Nil, () => Value::Nil, Value::Nil => ());
impl_encode_decode!(bool, Type::Bool, b => Value::Bool(b), Value::Bool(b) => b);
impl_encode_decode!(u8, Type::U8, n => Value::U8(n), Value::U8(n) => n);
impl_encode_decode!(i8, Type::I8, n => Value::I8(n), Value::I8(n) => n);
impl_encode_decode!(u16, Type::U16, n => Value::U16(n), Value::U16(n) => n);
impl_encode_decode!(i16, Type::I16, n => Value::I16(n), Value::I16(n) => n);
impl_encode_decode!(u32, Type::U32, n => Value::U32(n), Value::U32(n) => n);
impl_encode_decode!(i32, Type::I32, n => Value::I32(n), Value::I32(n) => n);
impl_encode_decode!(u64, Type::U64, n => Value::U64(n), Value::U64(n) => n);
impl_encode_decode!(i64, Type::I64, n => Value::I64(n), Value::I64(n) => n);
impl_encode_decode!(f32, Type::Float, x => Value::Float(x), Value::Float(x) => x);
impl_encode_decode!(f64, Type::Double, x => Value::Double(x), Value::Double(x) => x);
impl_encode_decode!(String, Type::String, s => Value::String(s), Value::String(s) => s);

impl<T: Typed> Typed for Vec<T> {
    fn rpc_type() -> Type {
        Type::array_of(T::rpc_type())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(val: Self) -> Value {
        Value::Array(val.into_iter().map(T::encode).collect())
    }
}

impl<T: Decode + Typed> Decode for Vec<T> {
    fn decode(val: Value) -> Result<Self, TypeMismatch> {
        match val {
            Value::Array(items) => items.into_iter().map(T::decode).collect(),
            other => Err(TypeMismatch::new(&other, <Self as Typed>::rpc_type())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeMismatch {
    value: String,
    expected_type: Type,
}

impl TypeMismatch {
    pub fn new(value: &Value, expected_type: Type) -> Self {
        Self {
            value: format!("{value:?}"),
            expected_type,
        }
    }

    pub fn expected_type(&self) -> &Type {
        &self.expected_type
    }
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Type error: {} :/: {}", self.value, self.expected_type)
    }
}

impl Error for TypeMismatch {}
