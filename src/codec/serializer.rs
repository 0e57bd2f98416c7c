use super::SerializedDataWriter;
use crate::{
    accessor::ObjectAccessor,
    convert,
    encoding::{BaseEncoding, EnumTable, WireEncoding},
    error::{Error, Result},
    types::{Type, Value},
};

pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Writes the parts of `obj` named by `encoding`, in encoding order.
    pub fn serialize(
        writer: &mut SerializedDataWriter,
        obj: &Value,
        encoding: &[WireEncoding],
    ) -> Result<()> {
        for entry in encoding {
            let value = ObjectAccessor::get(obj, entry.path())?;
            match entry {
                WireEncoding::Base { kind, .. } => write_base(writer, *kind, value)?,
                WireEncoding::Array { element, .. } => {
                    let Value::Array(items) = value else {
                        return Err(Error::IncompatibleNativeType(format!(
                            "expected an array, found {value:?}"
                        )));
                    };
                    let count = u32::try_from(items.len()).map_err(|_| {
                        Error::IncompatibleNativeType(format!(
                            "array of {} elements does not fit the wire count",
                            items.len()
                        ))
                    })?;
                    writer.write_u32(count);
                    for item in &items {
                        Self::serialize(writer, item, element)?;
                    }
                }
                WireEncoding::Enum { table, .. } => write_enum(writer, table, value)?,
            }
        }
        Ok(())
    }

    /// Writes an argument list. Entries address their parameter with a leading index and
    /// are written in the order of `encoding`.
    pub fn serialize_args(
        writer: &mut SerializedDataWriter,
        args: &[Value],
        encoding: &[WireEncoding],
    ) -> Result<()> {
        for entry in encoding {
            let (param, entry) = entry.split_parameter()?;
            let arg = args.get(param).ok_or_else(|| {
                Error::IncompatibleNativeType(format!(
                    "encoding addresses argument {param} but only {} were given",
                    args.len()
                ))
            })?;
            Self::serialize(writer, arg, std::slice::from_ref(&entry))?;
        }
        Ok(())
    }
}

fn write_base(writer: &mut SerializedDataWriter, kind: BaseEncoding, value: Value) -> Result<()> {
    match convert::cast(value, &kind.native_type())? {
        Value::String(s) if s.contains('\0') => {
            return Err(Error::IncompatibleNativeType(format!(
                "{s:?} contains a zero unit and cannot be a {kind:?}"
            )))
        }
        Value::String(s) => writer.write_zcstring(&s),
        Value::U8(n) => writer.write_u8(n),
        Value::I8(n) => writer.write_i8(n),
        Value::U16(n) => writer.write_u16(n),
        Value::I16(n) => writer.write_i16(n),
        Value::U32(n) => writer.write_u32(n),
        Value::I32(n) => writer.write_i32(n),
        Value::Float(x) => writer.write_f32(x),
        Value::Double(x) => writer.write_f64(x),
        Value::Bool(b) => writer.write_bool(b),
        other => {
            return Err(Error::Internal(format!(
                "{kind:?} cast produced {other:?}"
            )))
        }
    }
    Ok(())
}

fn write_enum(writer: &mut SerializedDataWriter, table: &EnumTable, value: Value) -> Result<()> {
    let raw = match value {
        Value::String(key) => table.value_by_key(&key),
        number => match convert::cast(number, &Type::I32)? {
            Value::I32(n) => n,
            other => return Err(Error::Internal(format!("I32 cast produced {other:?}"))),
        },
    };
    // Negative values travel as their two's complement.
    writer.write_i32(raw);
    Ok(())
}
