//! Pre-allocation of values before decoding.
//!
//! Construction happens in two passes: the paths of an encoding are merged into a
//! [`Sketch`] following the native type, and the sketch is then instantiated. Arrays get
//! exactly as many slots as the highest index any path uses.

use crate::{
    accessor::ObjectAccessor,
    encoding::WireEncoding,
    error::{Error, Result},
    path::{self, PathEntry},
    types::{Type, Value},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    ty: Type,
    shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Base,
    Array {
        /// Highest index used by any path, plus one.
        size: usize,
        elements: BTreeMap<usize, Sketch>,
    },
    Object {
        fields: BTreeMap<String, Sketch>,
    },
}

impl Sketch {
    fn leaf(ty: Type) -> Self {
        Sketch {
            ty,
            shape: Shape::Base,
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    fn add_path(&mut self, full: &[PathEntry], rest: &[PathEntry]) -> Result<()> {
        let Some((step, rest)) = rest.split_first() else {
            return Ok(());
        };
        if matches!(self.shape, Shape::Base) {
            self.shape = match step {
                PathEntry::Index(_) => Shape::Array {
                    size: 0,
                    elements: BTreeMap::new(),
                },
                PathEntry::Name(_) => Shape::Object {
                    fields: BTreeMap::new(),
                },
            };
        }

        let child = match (step, &mut self.shape) {
            (PathEntry::Index(index), Shape::Array { size, elements }) => {
                let element_ty = ObjectAccessor::element_type(&self.ty)
                    .map_err(|e| in_path(full, e))?;
                let index = ObjectAccessor::index(*index)?;
                *size = (*size).max(index + 1);
                elements
                    .entry(index)
                    .or_insert_with(|| Sketch::leaf(element_ty))
            }
            (PathEntry::Name(name), Shape::Object { fields }) => {
                let field_ty = ObjectAccessor::field_type(&self.ty, name)
                    .map_err(|e| in_path(full, e))?;
                fields
                    .entry(name.clone())
                    .or_insert_with(|| Sketch::leaf(field_ty))
            }
            _ => {
                return Err(Error::IncompatibleNativeType(format!(
                    "path {} addresses {} both by index and by name",
                    path::display(full),
                    self.ty
                )))
            }
        };
        child.add_path(full, rest)
    }

    /// Required length of an array sketch, `None` for anything else.
    pub fn array_size(&self) -> Option<usize> {
        match &self.shape {
            Shape::Array { size, .. } => Some(*size),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Sketch> {
        match &self.shape {
            Shape::Object { fields } => fields.get(name),
            _ => None,
        }
    }

    pub fn element(&self, index: usize) -> Option<&Sketch> {
        match &self.shape {
            Shape::Array { elements, .. } => elements.get(&index),
            _ => None,
        }
    }

    pub fn instantiate(&self) -> Result<Value> {
        match &self.shape {
            Shape::Base => Ok(self.ty.default_value()),
            Shape::Array { size, elements } => {
                let element_ty = ObjectAccessor::element_type(&self.ty)?;
                (0..*size)
                    .map(|index| match elements.get(&index) {
                        Some(element) => element.instantiate(),
                        None => Ok(element_ty.default_value()),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            Shape::Object { fields } => {
                let mut value = self.ty.default_value();
                for (name, field) in fields {
                    ObjectAccessor::set_member(
                        &mut value,
                        &PathEntry::Name(name.clone()),
                        field.instantiate()?,
                    )?;
                }
                Ok(value)
            }
        }
    }
}

fn in_path(full: &[PathEntry], err: Error) -> Error {
    match err {
        Error::IncompatibleNativeType(msg) => {
            Error::IncompatibleNativeType(format!("{msg} (in path {})", path::display(full)))
        }
        other => other,
    }
}

pub struct ObjectConstructor;

impl ObjectConstructor {
    /// Merges the paths of every entry of `encoding` into one sketch of `ty`.
    pub fn sketch(encoding: &[WireEncoding], ty: &Type) -> Result<Sketch> {
        let mut sketch = Sketch::leaf(ty.clone());
        for entry in encoding {
            sketch.add_path(entry.path(), entry.path())?;
        }
        Ok(sketch)
    }

    /// Builds the smallest value of type `ty` in which every path of `encoding` exists.
    pub fn construct_object(encoding: &[WireEncoding], ty: &Type) -> Result<Value> {
        Self::sketch(encoding, ty)?.instantiate()
    }

    /// Allocates `size` elements for an array of type `array_ty`, each shaped for
    /// `element_encoding`.
    pub fn construct_array(
        array_ty: &Type,
        element_encoding: &[WireEncoding],
        size: usize,
    ) -> Result<Vec<Value>> {
        let element_ty = ObjectAccessor::element_type(array_ty)?;
        let sketch = Self::sketch(element_encoding, &element_ty)?;
        (0..size).map(|_| sketch.instantiate()).collect()
    }
}
