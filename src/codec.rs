//! Binary wire codec: primitive readers and writers plus the value traversals driven by a
//! compiled encoding.

mod deserializer;
mod reader;
mod serializer;
mod writer;

pub use deserializer::ObjectDeserializer;
pub use reader::SerializedDataReader;
pub use serializer::ObjectSerializer;
pub use writer::SerializedDataWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encoding::{BaseEncoding, EnumTable, WireEncoding},
        error::Error,
        path,
        path::ValuePath,
        types::{Type, Value},
        Decode, Encode, Typed,
    };

    crate::native_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Echo {
            value: String,
        }
    }

    crate::native_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Reading {
            sensor: String,
            samples: Vec<i32>,
            level: String,
            code: u16,
        }
    }

    crate::native_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Batch {
            readings: Vec<Reading>,
            count: u64,
            ok: bool,
        }
    }

    fn base(kind: BaseEncoding, path: ValuePath) -> WireEncoding {
        WireEncoding::Base { kind, path }
    }

    fn levels() -> EnumTable {
        let mut table = EnumTable::new("low", 0);
        table.insert("low", 0).unwrap();
        table.insert("high", 1).unwrap();
        table
    }

    fn reading_encoding() -> Vec<WireEncoding> {
        vec![
            base(BaseEncoding::ZCString, path!["sensor"]),
            WireEncoding::Array {
                path: path!["samples"],
                element: vec![base(BaseEncoding::I32, path![])],
            },
            WireEncoding::Enum {
                path: path!["level"],
                table: levels(),
            },
            base(BaseEncoding::U16, path!["code"]),
        ]
    }

    fn batch_encoding() -> Vec<WireEncoding> {
        vec![
            WireEncoding::Array {
                path: path!["readings"],
                element: reading_encoding(),
            },
            base(BaseEncoding::U32, path!["count"]),
            base(BaseEncoding::Boolean, path!["ok"]),
        ]
    }

    fn zc(s: &str) -> Vec<u8> {
        s.encode_utf16()
            .chain([0])
            .flat_map(u16::to_le_bytes)
            .collect()
    }

    #[test]
    fn echo_argument_frame() {
        let encoding = [base(BaseEncoding::ZCString, path![0, "value"])];
        let mut writer = SerializedDataWriter::new();
        writer.write_u32(0);
        writer.write_zcstring("svc.echo");
        let arg = Echo::encode(Echo { value: "hi".into() });
        ObjectSerializer::serialize_args(&mut writer, &[arg], &encoding).unwrap();

        let expected: Vec<u8> = [vec![0, 0, 0, 0], zc("svc.echo"), zc("hi")].concat();
        assert_eq!(writer.as_bytes(), &expected[..]);

        let mut reader = SerializedDataReader::new(writer.as_bytes());
        assert_eq!(reader.read_u32().unwrap(), 0);
        assert_eq!(reader.read_zcstring().unwrap(), "svc.echo");
        let args =
            ObjectDeserializer::deserialize_args(&mut reader, &[Echo::rpc_type()], &encoding)
                .unwrap();
        assert_eq!(Echo::decode(args[0].clone()).unwrap().value, "hi");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn nested_arrays_round_trip_including_empty_ones() {
        let batch = Batch {
            readings: vec![
                Reading {
                    sensor: "north".into(),
                    samples: vec![1, -2, 3],
                    level: "high".into(),
                    code: 7,
                },
                Reading {
                    sensor: String::new(),
                    samples: vec![],
                    level: "low".into(),
                    code: 0,
                },
            ],
            count: 2,
            ok: true,
        };
        let mut writer = SerializedDataWriter::new();
        ObjectSerializer::serialize(&mut writer, &Batch::encode(batch.clone()), &batch_encoding())
            .unwrap();

        let mut reader = SerializedDataReader::new(writer.as_bytes());
        let value =
            ObjectDeserializer::deserialize(&mut reader, &Batch::rpc_type(), &batch_encoding())
                .unwrap();
        assert_eq!(Batch::decode(value).unwrap(), batch);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn enum_falls_back_in_both_directions() {
        let reading = Reading {
            level: "critical".into(),
            ..Reading::default()
        };
        let encoding = [WireEncoding::Enum {
            path: path!["level"],
            table: levels(),
        }];
        let mut writer = SerializedDataWriter::new();
        ObjectSerializer::serialize(&mut writer, &Reading::encode(reading), &encoding).unwrap();
        assert_eq!(writer.as_bytes(), &[0, 0, 0, 0]);

        let data = 9u32.to_le_bytes();
        let mut reader = SerializedDataReader::new(&data);
        let value =
            ObjectDeserializer::deserialize(&mut reader, &Reading::rpc_type(), &encoding).unwrap();
        assert_eq!(Reading::decode(value).unwrap().level, "low");
    }

    #[test]
    fn negative_enum_values_round_trip() {
        let mut table = EnumTable::new("low", 0);
        table.insert("low", 0).unwrap();
        table.insert("unknown", -1).unwrap();
        let encoding = [WireEncoding::Enum {
            path: path!["level"],
            table,
        }];
        let reading = Reading {
            level: "unknown".into(),
            ..Reading::default()
        };
        let mut writer = SerializedDataWriter::new();
        ObjectSerializer::serialize(&mut writer, &Reading::encode(reading), &encoding).unwrap();
        assert_eq!(writer.as_bytes(), &[0xff, 0xff, 0xff, 0xff]);

        let mut reader = SerializedDataReader::new(writer.as_bytes());
        let value =
            ObjectDeserializer::deserialize(&mut reader, &Reading::rpc_type(), &encoding).unwrap();
        assert_eq!(Reading::decode(value).unwrap().level, "unknown");
    }

    #[test]
    fn enum_into_numeric_field_keeps_the_raw_value() {
        let encoding = [WireEncoding::Enum {
            path: path!["code"],
            table: levels(),
        }];
        let data = 9u32.to_le_bytes();
        let mut reader = SerializedDataReader::new(&data);
        let value =
            ObjectDeserializer::deserialize(&mut reader, &Reading::rpc_type(), &encoding).unwrap();
        assert_eq!(Reading::decode(value).unwrap().code, 9);
    }

    #[test]
    fn narrowing_is_checked() {
        // A u32 on the wire that does not fit the u16 field.
        let encoding = [base(BaseEncoding::U32, path!["code"])];
        let data = 70_000u32.to_le_bytes();
        let mut reader = SerializedDataReader::new(&data);
        assert!(matches!(
            ObjectDeserializer::deserialize(&mut reader, &Reading::rpc_type(), &encoding),
            Err(Error::IncompatibleNativeType(_))
        ));

        let mut writer = SerializedDataWriter::new();
        let big = Batch {
            count: u64::from(u32::MAX) + 1,
            ..Batch::default()
        };
        assert!(ObjectSerializer::serialize(
            &mut writer,
            &Batch::encode(big),
            &[base(BaseEncoding::U32, path!["count"])]
        )
        .is_err());
    }

    #[test]
    fn implausible_array_counts_are_rejected() {
        let data = [0xff, 0xff, 0xff, 0x0f];
        let mut reader = SerializedDataReader::new(&data);
        assert!(matches!(
            ObjectDeserializer::deserialize(
                &mut reader,
                &Type::array_of(Type::I32),
                &[WireEncoding::Array {
                    path: path![],
                    element: vec![base(BaseEncoding::I32, path![])],
                }]
            ),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn truncated_frames_fail() {
        let mut writer = SerializedDataWriter::new();
        ObjectSerializer::serialize(
            &mut writer,
            &Reading::encode(Reading::default()),
            &reading_encoding(),
        )
        .unwrap();
        let bytes = writer.into_bytes();
        let mut reader = SerializedDataReader::new(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            ObjectDeserializer::deserialize(&mut reader, &Reading::rpc_type(), &reading_encoding()),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn strings_with_zero_units_are_rejected() {
        let reading = Reading {
            sensor: "a\0b".into(),
            ..Reading::default()
        };
        let mut writer = SerializedDataWriter::new();
        assert!(matches!(
            ObjectSerializer::serialize(
                &mut writer,
                &Reading::encode(reading),
                &reading_encoding()
            ),
            Err(Error::IncompatibleNativeType(_))
        ));
    }

    #[test]
    fn nil_strings_write_only_the_terminator() {
        let mut writer = SerializedDataWriter::new();
        ObjectSerializer::serialize(&mut writer, &Value::Nil, &[base(BaseEncoding::ZCString, path![])])
            .unwrap();
        assert_eq!(writer.as_bytes(), &[0, 0]);
    }
}
