use crate::{
    error::{Error, Result},
    path::{self, PathEntry},
    types::{Type, Value},
};

/// Reads and writes values nested inside other values, and resolves the types found at
/// a path.
pub struct ObjectAccessor;

impl ObjectAccessor {
    pub fn get(obj: &Value, path: &[PathEntry]) -> Result<Value> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(obj.clone());
        };
        let mut value = Self::get_member(obj, first)?;
        for step in rest {
            value = Self::get_member(&value, step)?;
        }
        Ok(value)
    }

    /// Stores `value` at `path` inside `obj`; the empty path replaces `obj`.
    ///
    /// Reading a member out of a copy-semantics container yields a copy, so every copied
    /// container between the last reference container (or the root) and the leaf is
    /// written back into its parent once the leaf has been assigned.
    pub fn set(obj: &mut Value, path: &[PathEntry], value: Value) -> Result<()> {
        let Some((leaf, parents)) = path.split_last() else {
            *obj = value;
            return Ok(());
        };

        // None: the trail hangs off `obj` itself.
        let mut anchor: Option<Value> = None;
        let mut trail: Vec<(&PathEntry, Value)> = Vec::new();
        for step in parents {
            let parent = match (trail.last(), &anchor) {
                (Some((_, container)), _) => container,
                (None, Some(shared)) => shared,
                (None, None) => &*obj,
            };
            let next = Self::get_member(parent, step)?;
            if next.is_value_type() {
                trail.push((step, next));
            } else {
                trail.clear();
                anchor = Some(next);
            }
        }

        let mut written = value;
        let mut step = leaf;
        while let Some((parent_step, mut container)) = trail.pop() {
            Self::set_member(&mut container, step, written)?;
            written = container;
            step = parent_step;
        }
        match anchor.as_mut() {
            Some(shared) => Self::set_member(shared, step, written),
            None => Self::set_member(obj, step, written),
        }
    }

    /// Type of the value at `path` inside a value of type `ty`.
    pub fn type_at(ty: &Type, path: &[PathEntry]) -> Result<Type> {
        let mut current = ty.clone();
        for step in path {
            current = match step {
                PathEntry::Index(_) => Self::element_type(&current)?,
                PathEntry::Name(name) => Self::field_type(&current, name)?,
            };
        }
        Ok(current)
    }

    pub fn element_type(ty: &Type) -> Result<Type> {
        match ty {
            Type::Array(element) => Ok((**element).clone()),
            other => Err(Error::IncompatibleNativeType(format!(
                "{other} is not an array type"
            ))),
        }
    }

    pub fn field_type(ty: &Type, name: &str) -> Result<Type> {
        let record = ty.record().ok_or_else(|| {
            Error::IncompatibleNativeType(format!("{ty} has no fields, cannot access .{name}"))
        })?;
        record.field(name).cloned().ok_or_else(|| {
            Error::IncompatibleNativeType(format!("{} has no field named {name}", record.name))
        })
    }

    pub fn get_member(obj: &Value, step: &PathEntry) -> Result<Value> {
        match (obj, step) {
            (Value::Array(items), PathEntry::Index(index)) => items
                .get(Self::index(*index)?)
                .cloned()
                .ok_or_else(|| out_of_bounds(*index, items.len())),
            (Value::Struct(fields), PathEntry::Name(name)) => {
                fields.get(name).cloned().ok_or_else(|| missing_field(name))
            }
            (Value::Object(shared), PathEntry::Name(name)) => shared
                .borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| missing_field(name)),
            (obj, step) => Err(wrong_container(obj, step)),
        }
    }

    pub fn set_member(obj: &mut Value, step: &PathEntry, value: Value) -> Result<()> {
        let slot = match (obj, step) {
            (Value::Array(items), PathEntry::Index(index)) => {
                let len = items.len();
                items
                    .get_mut(Self::index(*index)?)
                    .ok_or_else(|| out_of_bounds(*index, len))?
            }
            (Value::Struct(fields), PathEntry::Name(name)) => {
                fields.get_mut(name).ok_or_else(|| missing_field(name))?
            }
            (Value::Object(shared), PathEntry::Name(name)) => {
                let mut fields = shared.borrow_mut();
                let slot = fields.get_mut(name).ok_or_else(|| missing_field(name))?;
                *slot = value;
                return Ok(());
            }
            (obj, step) => return Err(wrong_container(obj, step)),
        };
        *slot = value;
        Ok(())
    }

    pub(crate) fn index(index: i32) -> Result<usize> {
        usize::try_from(index)
            .map_err(|_| Error::IncompatibleNativeType(format!("negative index {index}")))
    }
}

fn out_of_bounds(index: i32, len: usize) -> Error {
    Error::IncompatibleNativeType(format!("index {index} out of bounds for length {len}"))
}

fn missing_field(name: &str) -> Error {
    Error::IncompatibleNativeType(format!("no field named {name}"))
}

fn wrong_container(obj: &Value, step: &PathEntry) -> Error {
    Error::IncompatibleNativeType(format!(
        "cannot apply {} to {obj:?}",
        path::display(std::slice::from_ref(step))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, Encode, Typed};

    crate::native_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Inner {
            x: i32,
        }
    }

    crate::native_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Middle {
            inner: Inner,
            items: Vec<Inner>,
        }
    }

    crate::native_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Outer {
            middle: Middle,
        }
    }

    crate::native_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Shared {
            middle: Middle,
        }
    }

    #[test]
    fn nested_value_type_write_is_visible_in_the_root() {
        // Regression: writes two levels deep inside copy-semantics containers used to
        // land in a temporary copy and vanish.
        let mut outer = Outer::encode(Outer::default());
        ObjectAccessor::set(&mut outer, &path!["middle", "inner", "x"], Value::I32(7)).unwrap();
        assert_eq!(
            ObjectAccessor::get(&outer, &path!["middle", "inner", "x"]).unwrap(),
            Value::I32(7)
        );
    }

    #[test]
    fn write_through_array_elements() {
        let mut middle = Middle::encode(Middle {
            inner: Inner::default(),
            items: vec![Inner::default(), Inner::default()],
        });
        ObjectAccessor::set(&mut middle, &path!["items", 1, "x"], Value::I32(3)).unwrap();
        assert_eq!(
            ObjectAccessor::get(&middle, &path!["items", 1, "x"]).unwrap(),
            Value::I32(3)
        );
        assert_eq!(
            ObjectAccessor::get(&middle, &path!["items", 0, "x"]).unwrap(),
            Value::I32(0)
        );
    }

    #[test]
    fn writes_below_a_reference_container_reach_every_owner() {
        let root = Shared::encode(Shared::default());
        let mut alias = root.clone();
        ObjectAccessor::set(&mut alias, &path!["middle", "inner", "x"], Value::I32(9)).unwrap();
        assert_eq!(
            ObjectAccessor::get(&root, &path!["middle", "inner", "x"]).unwrap(),
            Value::I32(9)
        );
    }

    #[test]
    fn empty_path_replaces_the_root() {
        let mut value = Value::from("a");
        ObjectAccessor::set(&mut value, &[], Value::from("b")).unwrap();
        assert_eq!(value, Value::from("b"));
        assert_eq!(ObjectAccessor::get(&value, &[]).unwrap(), Value::from("b"));
    }

    #[test]
    fn unknown_members_are_incompatible() {
        let mut outer = Outer::encode(Outer::default());
        for bad in [path!["nope"], path!["middle", 0], path!["middle", "items", 3]] {
            assert!(matches!(
                ObjectAccessor::get(&outer, &bad),
                Err(Error::IncompatibleNativeType(_))
            ));
            assert!(matches!(
                ObjectAccessor::set(&mut outer, &bad, Value::Nil),
                Err(Error::IncompatibleNativeType(_))
            ));
        }
    }

    #[test]
    fn resolves_types_along_paths() {
        let ty = Outer::rpc_type();
        assert_eq!(
            ObjectAccessor::type_at(&ty, &path!["middle", "items", 0, "x"]).unwrap(),
            Type::I32
        );
        assert_eq!(
            ObjectAccessor::element_type(&Vec::<Inner>::rpc_type()).unwrap(),
            Inner::rpc_type()
        );
        assert!(ObjectAccessor::type_at(&ty, &path!["middle", "missing"]).is_err());
        assert!(ObjectAccessor::element_type(&Type::String).is_err());
    }
}
