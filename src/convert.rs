//! Checked casts of a [`Value`] onto a [`Type`].
//!
//! Integers convert between any widths as long as the value fits, floats accept any
//! number, and records are cast field by field against their field table.

use crate::types::{Fields, Type, TypeMismatch, Value};

pub fn cast(value: Value, ty: &Type) -> Result<Value, TypeMismatch> {
    let mismatch = |value: &Value| TypeMismatch::new(value, ty.clone());

    if let Some(n) = value.as_integer() {
        let cast = match ty {
            Type::U8 => u8::try_from(n).ok().map(Value::U8),
            Type::I8 => i8::try_from(n).ok().map(Value::I8),
            Type::U16 => u16::try_from(n).ok().map(Value::U16),
            Type::I16 => i16::try_from(n).ok().map(Value::I16),
            Type::U32 => u32::try_from(n).ok().map(Value::U32),
            Type::I32 => i32::try_from(n).ok().map(Value::I32),
            Type::U64 => u64::try_from(n).ok().map(Value::U64),
            Type::I64 => i64::try_from(n).ok().map(Value::I64),
            Type::Float => Some(Value::Float(n as f32)),
            Type::Double => Some(Value::Double(n as f64)),
            _ => None,
        };
        return cast.ok_or_else(|| mismatch(&value));
    }

    match (ty, value) {
        (Type::Nil, Value::Nil) => Ok(Value::Nil),
        (Type::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (Type::Float, Value::Float(x)) => Ok(Value::Float(x)),
        (Type::Float, Value::Double(x)) => Ok(Value::Float(x as f32)),
        (Type::Double, Value::Float(x)) => Ok(Value::Double(x.into())),
        (Type::Double, Value::Double(x)) => Ok(Value::Double(x)),
        (Type::String, Value::String(s)) => Ok(Value::String(s)),
        (Type::String, Value::Nil) => Ok(Value::String(String::new())),
        (Type::Array(element), Value::Array(items)) => items
            .into_iter()
            .map(|item| cast(item, element))
            .collect::<Result<_, _>>()
            .map(Value::Array),
        (Type::Struct(st), value @ (Value::Struct(_) | Value::Object(_))) => {
            cast_fields(value, &st.fields, ty).map(Value::Struct)
        }
        (Type::Object(st), Value::Object(shared)) => {
            // Already the right kind of container: keep the identity of the shared record.
            let fields = cast_fields(Value::Object(shared.clone()), &st.fields, ty)?;
            *shared.borrow_mut() = fields;
            Ok(Value::Object(shared))
        }
        (Type::Object(st), value @ Value::Struct(_)) => {
            cast_fields(value, &st.fields, ty).map(Value::new_object)
        }
        (_, value) => Err(mismatch(&value)),
    }
}

fn cast_fields(value: Value, table: &[(String, Type)], ty: &Type) -> Result<Fields, TypeMismatch> {
    let original = value.clone();
    let mut fields = value
        .into_fields()
        .map_err(|other| TypeMismatch::new(&other, ty.clone()))?;
    let mut cast_fields = Fields::new();
    for (name, field_ty) in table {
        let field = match fields.remove(name) {
            Some(field) => cast(field, field_ty)?,
            None => field_ty.default_value(),
        };
        cast_fields.insert(name.clone(), field);
    }
    if !fields.is_empty() {
        // Fields the native type does not have.
        return Err(TypeMismatch::new(&original, ty.clone()));
    }
    Ok(cast_fields)
}
