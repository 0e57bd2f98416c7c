use crate::error::{Error, Result};

/// Cursor over a received frame. Every read either consumes exactly the bytes of one
/// primitive or fails without moving the cursor.
#[derive(Debug, Clone)]
pub struct SerializedDataReader<'a> {
    data: &'a [u8],
    offset: usize,
}

macro_rules! read_le {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::from_le_bytes(self.take()?))
            }
        )*
    };
}

impl<'a> SerializedDataReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// The bytes not read yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let eof = || Error::UnexpectedEof {
            offset: self.offset,
            needed: N,
        };
        let end = self.offset.checked_add(N).ok_or_else(eof)?;
        let bytes = self.data.get(self.offset..end).ok_or_else(eof)?;
        let bytes = <[u8; N]>::try_from(bytes).map_err(|_| eof())?;
        self.offset = end;
        Ok(bytes)
    }

    read_le! {
        read_u8 -> u8,
        read_i8 -> i8,
        read_u16 -> u16,
        read_i16 -> i16,
        read_u32 -> u32,
        read_i32 -> i32,
        read_f32 -> f32,
        read_f64 -> f64,
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads UTF-16 code units up to and including the zero terminator. Unpaired
    /// surrogates become U+FFFD.
    pub fn read_zcstring(&mut self) -> Result<String> {
        let start = self.offset;
        let mut units = Vec::new();
        loop {
            match self.read_u16() {
                Ok(0) => break,
                Ok(unit) => units.push(unit),
                Err(err) => {
                    self.offset = start;
                    return Err(err);
                }
            }
        }
        Ok(String::from_utf16_lossy(&units))
    }
}
