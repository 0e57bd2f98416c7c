//! Compiles type mappings into wire encodings.
//!
//! A [`TypeMapping`] is the declarative description of how one function's arguments and
//! result are laid out on the wire. Mappings are registered under an identifier; the
//! generator looks them up by that identifier and produces a [`FunctionEncoding`].

use crate::{
    encoding::{BaseEncoding, EnumTable, WireEncoding},
    error::{Error, Result},
    path::{PathEntry, ValuePath},
    schemas,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum MappingEntry {
    Base {
        kind: BaseEncoding,
        path: ValuePath,
    },
    Array {
        path: ValuePath,
        element: Vec<MappingEntry>,
    },
    Enum {
        path: ValuePath,
        default_key: String,
        default_value: i32,
        values: Vec<(String, i32)>,
    },
}

impl MappingEntry {
    pub fn base(kind: BaseEncoding, path: ValuePath) -> Self {
        MappingEntry::Base { kind, path }
    }

    pub fn array(element: Vec<MappingEntry>, path: ValuePath) -> Self {
        MappingEntry::Array { path, element }
    }

    pub fn enumeration(
        default_key: &str,
        default_value: i32,
        values: &[(&str, i32)],
        path: ValuePath,
    ) -> Self {
        MappingEntry::Enum {
            path,
            default_key: default_key.to_owned(),
            default_value,
            values: values.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
        }
    }

    fn path(&self) -> &[PathEntry] {
        match self {
            MappingEntry::Base { path, .. }
            | MappingEntry::Array { path, .. }
            | MappingEntry::Enum { path, .. } => path,
        }
    }
}

/// Argument entries start with `Index(n)` selecting the parameter; result entries are
/// relative to the returned value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TypeMapping {
    pub args: Vec<MappingEntry>,
    pub result: Vec<MappingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionEncoding {
    pub args: Vec<WireEncoding>,
    pub result: Vec<WireEncoding>,
}

pub struct ProtocolGenerator {
    mappings: BTreeMap<String, TypeMapping>,
}

impl Default for ProtocolGenerator {
    fn default() -> Self {
        let mut generator = Self::empty();
        generator.define(schemas::LOGIN_TYPE_MAPPING, schemas::login_type_mapping());
        generator
    }
}

impl ProtocolGenerator {
    /// A generator knowing the built-in mappings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            mappings: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the mapping known as `id`.
    pub fn define(&mut self, id: &str, mapping: TypeMapping) {
        self.mappings.insert(id.to_owned(), mapping);
    }

    pub fn generate(&self, id: &str) -> Result<FunctionEncoding> {
        let mapping = self
            .mappings
            .get(id)
            .ok_or_else(|| Error::TypeMappingParser(id.to_owned()))?;

        if let Some(entry) = mapping
            .args
            .iter()
            .find(|e| !matches!(e.path().first(), Some(PathEntry::Index(i)) if *i >= 0))
        {
            return Err(Error::TypeMappingParser(format!(
                "{id}: argument entry {} does not select a parameter",
                crate::path::display(entry.path())
            )));
        }

        Ok(FunctionEncoding {
            args: compile(&mapping.args)?,
            result: compile(&mapping.result)?,
        })
    }
}

fn compile(entries: &[MappingEntry]) -> Result<Vec<WireEncoding>> {
    entries.iter().map(compile_entry).collect()
}

fn compile_entry(entry: &MappingEntry) -> Result<WireEncoding> {
    Ok(match entry {
        MappingEntry::Base { kind, path } => WireEncoding::Base {
            kind: *kind,
            path: path.clone(),
        },
        MappingEntry::Array { path, element } => WireEncoding::Array {
            path: path.clone(),
            element: compile(element)?,
        },
        MappingEntry::Enum {
            path,
            default_key,
            default_value,
            values,
        } => {
            let mut table = EnumTable::new(default_key.as_str(), *default_value);
            for (key, value) in values {
                table.insert(key.as_str(), *value)?;
            }
            WireEncoding::Enum {
                path: path.clone(),
                table,
            }
        }
    })
}
