use super::SerializedDataReader;
use crate::{
    accessor::ObjectAccessor,
    constructor::ObjectConstructor,
    convert,
    encoding::{BaseEncoding, WireEncoding},
    error::{Error, Result},
    types::{Type, Value},
};

pub struct ObjectDeserializer;

impl ObjectDeserializer {
    /// Reads a value of type `ty` laid out as `encoding`. Parts of the value the encoding
    /// does not mention keep their defaults.
    pub fn deserialize(
        reader: &mut SerializedDataReader,
        ty: &Type,
        encoding: &[WireEncoding],
    ) -> Result<Value> {
        let mut obj = ObjectConstructor::construct_object(encoding, ty)?;
        read_into(reader, &mut obj, ty, encoding)?;
        Ok(obj)
    }

    /// Reads an argument list with one value per entry of `types`. Parameters that no
    /// entry addresses are default-constructed.
    pub fn deserialize_args(
        reader: &mut SerializedDataReader,
        types: &[Type],
        encoding: &[WireEncoding],
    ) -> Result<Vec<Value>> {
        let entries = encoding
            .iter()
            .map(WireEncoding::split_parameter)
            .collect::<Result<Vec<_>>>()?;

        let mut args = types
            .iter()
            .enumerate()
            .map(|(param, ty)| {
                let own: Vec<WireEncoding> = entries
                    .iter()
                    .filter(|(p, _)| *p == param)
                    .map(|(_, entry)| entry.clone())
                    .collect();
                ObjectConstructor::construct_object(&own, ty)
            })
            .collect::<Result<Vec<_>>>()?;

        for (param, entry) in &entries {
            let (Some(arg), Some(ty)) = (args.get_mut(*param), types.get(*param)) else {
                return Err(Error::IncompatibleNativeType(format!(
                    "encoding addresses argument {param} but the function takes {}",
                    types.len()
                )));
            };
            read_into(reader, arg, ty, std::slice::from_ref(entry))?;
        }
        Ok(args)
    }
}

fn read_into(
    reader: &mut SerializedDataReader,
    obj: &mut Value,
    ty: &Type,
    encoding: &[WireEncoding],
) -> Result<()> {
    for entry in encoding {
        let target = ObjectAccessor::type_at(ty, entry.path())?;
        let value = match entry {
            WireEncoding::Base { kind, .. } => convert::cast(read_base(reader, *kind)?, &target)?,
            WireEncoding::Array { element, .. } => {
                let count = reader.read_u32()?;
                let count = usize::try_from(count).map_err(|_| {
                    Error::IncompatibleNativeType(format!("array count {count} is too large"))
                })?;
                // Every element of a non-empty encoding takes at least one byte.
                if !element.is_empty() && count > reader.remaining() {
                    return Err(Error::UnexpectedEof {
                        offset: reader.offset(),
                        needed: count,
                    });
                }
                let element_ty = ObjectAccessor::element_type(&target)?;
                let mut items = ObjectConstructor::construct_array(&target, element, count)?;
                for item in &mut items {
                    read_into(reader, item, &element_ty, element)?;
                }
                Value::Array(items)
            }
            WireEncoding::Enum { table, .. } => {
                let raw = reader.read_u32()?;
                if target == Type::String {
                    Value::from(table.key_by_value(raw as i32))
                } else {
                    convert::cast(Value::U32(raw), &target)
                        .or_else(|_| convert::cast(Value::I32(raw as i32), &target))?
                }
            }
        };
        ObjectAccessor::set(obj, entry.path(), value)?;
    }
    Ok(())
}

fn read_base(reader: &mut SerializedDataReader, kind: BaseEncoding) -> Result<Value> {
    use BaseEncoding::*;
    Ok(match kind {
        ZCString => Value::String(reader.read_zcstring()?),
        U8 => Value::U8(reader.read_u8()?),
        I8 => Value::I8(reader.read_i8()?),
        U16 => Value::U16(reader.read_u16()?),
        I16 => Value::I16(reader.read_i16()?),
        U32 => Value::U32(reader.read_u32()?),
        I32 => Value::I32(reader.read_i32()?),
        Float => Value::Float(reader.read_f32()?),
        Double => Value::Double(reader.read_f64()?),
        Boolean => Value::Bool(reader.read_bool()?),
    })
}
