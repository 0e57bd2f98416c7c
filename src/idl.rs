//! Type and service tables populated from IDL documents.
//!
//! Parsing IDL documents is not done here: an [`IdlLoader`] hands over an already built
//! [`Idl`] for a URI.

use crate::{
    error::{Error, Result},
    schemas,
    types::{StructType, Type},
};
use std::{collections::BTreeMap, sync::Arc};

const MAX_TYPE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum IdlType {
    /// Field names paired with type names.
    Struct(Vec<(String, String)>),
    Enum(Vec<(String, i32)>),
    Array(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdlFunction {
    pub return_type: String,
    pub params: Vec<(String, String)>,
}

impl IdlFunction {
    pub fn new(return_type: &str, params: &[(&str, &str)]) -> Self {
        Self {
            return_type: return_type.to_owned(),
            params: owned_pairs(params),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdlService {
    pub protocol: String,
    pub uri: String,
    pub functions: BTreeMap<String, IdlFunction>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Idl {
    pub types: BTreeMap<String, IdlType>,
    pub services: BTreeMap<String, IdlService>,
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(a, b)| ((*a).to_owned(), (*b).to_owned()))
        .collect()
}

impl Idl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_struct(mut self, name: &str, fields: &[(&str, &str)]) -> Self {
        self.types
            .insert(name.to_owned(), IdlType::Struct(owned_pairs(fields)));
        self
    }

    pub fn with_enum(mut self, name: &str, values: &[(&str, i32)]) -> Self {
        let values = values.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect();
        self.types.insert(name.to_owned(), IdlType::Enum(values));
        self
    }

    pub fn with_service<'a>(
        mut self,
        name: &str,
        protocol: &str,
        uri: &str,
        functions: impl IntoIterator<Item = (&'a str, IdlFunction)>,
    ) -> Self {
        let service = IdlService {
            protocol: protocol.to_owned(),
            uri: uri.to_owned(),
            functions: functions
                .into_iter()
                .map(|(n, f)| (n.to_owned(), f))
                .collect(),
        };
        self.services.insert(name.to_owned(), service);
        self
    }

    /// Adds every type and service of `other`, replacing same-named declarations.
    pub fn merge(&mut self, other: Idl) {
        self.types.extend(other.types);
        self.services.extend(other.services);
    }

    /// Finds the declaration of `service.function`. Service names may contain dots, the
    /// function name is whatever follows the last one.
    pub fn function(&self, qualified_name: &str) -> Option<(&str, &IdlFunction)> {
        let (service, function) = qualified_name.rsplit_once('.')?;
        let (service_name, service) = self.services.get_key_value(service)?;
        service
            .functions
            .get(function)
            .map(|f| (service_name.as_str(), f))
    }

    /// Resolves an IDL type name to the native type descriptor values of it are decoded
    /// into. Enums resolve to their string keys.
    pub fn resolve_type(&self, name: &str) -> Result<Type> {
        self.resolve_type_at(name, 0)
    }

    fn resolve_type_at(&self, name: &str, depth: usize) -> Result<Type> {
        if depth > MAX_TYPE_DEPTH {
            return Err(Error::IdlParser(format!(
                "type {name} nests deeper than {MAX_TYPE_DEPTH} levels"
            )));
        }
        if let Some(element) = name.strip_suffix("[]") {
            return Ok(Type::array_of(self.resolve_type_at(element, depth + 1)?));
        }
        if let Some(base) = base_type(name) {
            return Ok(base);
        }
        match self.types.get(name) {
            Some(IdlType::Struct(fields)) => {
                let fields = fields
                    .iter()
                    .map(|(field, ty)| Ok((field.as_str(), self.resolve_type_at(ty, depth + 1)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Type::Struct(Arc::new(StructType::new(name, fields))))
            }
            Some(IdlType::Enum(_)) => Ok(Type::String),
            Some(IdlType::Array(element)) => {
                Ok(Type::array_of(self.resolve_type_at(element, depth + 1)?))
            }
            None => Err(Error::IdlParser(format!("unknown type {name}"))),
        }
    }
}

fn base_type(name: &str) -> Option<Type> {
    Some(match name {
        "boolean" => Type::Bool,
        "i8" => Type::I8,
        "u8" => Type::U8,
        "i16" => Type::I16,
        "u16" => Type::U16,
        "i32" => Type::I32,
        "u32" => Type::U32,
        "i64" => Type::I64,
        "u64" => Type::U64,
        "float" => Type::Float,
        "double" => Type::Double,
        "string" => Type::String,
        "void" => Type::Nil,
        _ => return None,
    })
}

/// Source of IDL documents. Implementations may fetch and parse real documents.
pub trait IdlLoader {
    fn load(&self, uri: &str) -> Result<Idl>;
}

/// Serves documents registered up front.
#[derive(Debug, Clone, Default)]
pub struct StaticIdlLoader {
    documents: BTreeMap<String, Idl>,
}

impl StaticIdlLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Knows the hard-coded documents of [`schemas`].
    pub fn builtin() -> Self {
        Self::new().with_document(schemas::LOGIN_IDL_URI, schemas::login_idl())
    }

    pub fn with_document(mut self, uri: &str, idl: Idl) -> Self {
        self.documents.insert(uri.to_owned(), idl);
        self
    }
}

impl IdlLoader for StaticIdlLoader {
    fn load(&self, uri: &str) -> Result<Idl> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::IdlParser(format!("cannot load IDL from {uri}")))
    }
}
