/// Growing little-endian frame buffer.
#[derive(Debug, Clone, Default)]
pub struct SerializedDataWriter {
    buf: Vec<u8>,
}

macro_rules! write_le {
    ($($name:ident($ty:ty)),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                self.buf.extend_from_slice(&value.to_le_bytes());
            }
        )*
    };
}

impl SerializedDataWriter {
    pub fn new() -> Self {
        Self::default()
    }

    write_le! {
        write_u8(u8),
        write_i8(i8),
        write_u16(u16),
        write_i16(i16),
        write_u32(u32),
        write_i32(i32),
        write_f32(f32),
        write_f64(f64),
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// UTF-16 code units followed by a zero unit; the empty string is the terminator
    /// alone.
    pub fn write_zcstring(&mut self, value: &str) {
        for unit in value.encode_utf16() {
            self.write_u16(unit);
        }
        self.write_u16(0);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zcstrings_are_utf16_with_terminator() {
        let mut writer = SerializedDataWriter::new();
        writer.write_zcstring("");
        writer.write_zcstring("hé");
        assert_eq!(writer.as_bytes(), &[0, 0, b'h', 0, 0xe9, 0, 0, 0]);
    }

    #[test]
    fn writes_little_endian() {
        let mut writer = SerializedDataWriter::new();
        writer.write_u32(7);
        writer.write_i16(-2);
        writer.write_bool(true);
        assert_eq!(writer.into_bytes(), vec![7, 0, 0, 0, 0xfe, 0xff, 1]);
    }
}
