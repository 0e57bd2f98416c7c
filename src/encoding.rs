//! Compiled wire encodings. Each node names a wire representation and the path of the
//! value it applies to, relative to the value its parent node applies to.

use crate::{
    error::{Error, Result},
    path::{PathEntry, ValuePath},
    types::Type,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BaseEncoding {
    /// UTF-16 code units terminated by a zero unit.
    ZCString,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    Float,
    Double,
    Boolean,
}

impl BaseEncoding {
    /// The native type a wire primitive of this kind is read as.
    pub fn native_type(self) -> Type {
        use BaseEncoding::*;
        match self {
            ZCString => Type::String,
            U8 => Type::U8,
            I8 => Type::I8,
            U16 => Type::U16,
            I16 => Type::I16,
            U32 => Type::U32,
            I32 => Type::I32,
            Float => Type::Float,
            Double => Type::Double,
            Boolean => Type::Bool,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WireEncoding {
    Base {
        kind: BaseEncoding,
        path: ValuePath,
    },
    /// A `u32` element count followed by every element. `element` paths are relative to
    /// one element.
    Array {
        path: ValuePath,
        element: Vec<WireEncoding>,
    },
    /// A string (or integer) value sent as a `u32`.
    Enum { path: ValuePath, table: EnumTable },
}

impl WireEncoding {
    pub fn path(&self) -> &[PathEntry] {
        match self {
            WireEncoding::Base { path, .. }
            | WireEncoding::Array { path, .. }
            | WireEncoding::Enum { path, .. } => path,
        }
    }

    /// Copy of this entry addressing `path` instead.
    pub fn with_path(&self, path: ValuePath) -> Self {
        let mut entry = self.clone();
        match &mut entry {
            WireEncoding::Base { path: p, .. }
            | WireEncoding::Array { path: p, .. }
            | WireEncoding::Enum { path: p, .. } => *p = path,
        }
        entry
    }

    /// Splits an argument entry into the parameter it addresses and an entry re-rooted at
    /// that parameter.
    pub fn split_parameter(&self) -> Result<(usize, WireEncoding)> {
        match self.path().split_first() {
            Some((PathEntry::Index(index), rest)) if *index >= 0 => {
                let param = usize::try_from(*index)
                    .map_err(|_| Error::Internal(format!("parameter index {index} out of range")))?;
                Ok((param, self.with_path(rest.to_vec())))
            }
            _ => Err(Error::Internal(format!(
                "argument encoding entry {} does not start with a parameter index",
                crate::path::display(self.path())
            ))),
        }
    }
}

/// Bidirectional key/value table of an enum encoding. Lookups never fail: unknown keys
/// map to the default value and unknown values to the default key.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumTable {
    default_key: String,
    default_value: i32,
    value_by_key: HashMap<String, i32>,
    key_by_value: HashMap<i32, String>,
}

impl EnumTable {
    pub fn new(default_key: impl Into<String>, default_value: i32) -> Self {
        Self {
            default_key: default_key.into(),
            default_value,
            value_by_key: HashMap::new(),
            key_by_value: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: i32) -> Result<()> {
        let key = key.into();
        if self.value_by_key.contains_key(&key) || self.key_by_value.contains_key(&value) {
            return Err(Error::TypeMappingParser(format!(
                "duplicate enum entry {key:?} = {value}"
            )));
        }
        self.key_by_value.insert(value, key.clone());
        self.value_by_key.insert(key, value);
        Ok(())
    }

    pub fn value_by_key(&self, key: &str) -> i32 {
        self.value_by_key
            .get(key)
            .copied()
            .unwrap_or(self.default_value)
    }

    pub fn key_by_value(&self, value: i32) -> &str {
        self.key_by_value
            .get(&value)
            .map_or(self.default_key.as_str(), String::as_str)
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn default_value(&self) -> i32 {
        self.default_value
    }
}
