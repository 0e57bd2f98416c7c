/// Builds a [`ValuePath`](crate::path::ValuePath): integers become `Index` steps and
/// strings become `Name` steps.
///
/// ```
/// let p = rpcwire::path![0, "name", "first"];
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    ($($step:expr),* $(,)?) => {
        ::std::vec![$($crate::path::PathEntry::from($step)),*]
    };
}

/// Declares a struct with copy semantics and implements [`Typed`](crate::Typed),
/// [`Encode`](crate::Encode) and [`Decode`](crate::Decode) for it from its fields.
///
/// Every field type must itself implement the three traits.
#[macro_export]
macro_rules! native_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$field_meta])* $field_vis $field: $field_ty),*
        }

        $crate::__native_record!(Struct, new_struct, $name { $($field: $field_ty),* });
    };
}

/// Like [`native_struct!`], but values of the type are reference containers: every copy
/// of the encoded value shares its fields.
#[macro_export]
macro_rules! native_object {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$field_meta])* $field_vis $field: $field_ty),*
        }

        $crate::__native_record!(Object, new_object, $name { $($field: $field_ty),* });
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __native_record {
    ($kind:ident, $ctor:ident, $name:ident { $($field:ident : $field_ty:ty),* }) => {
        impl $crate::Typed for $name {
            fn rpc_type() -> $crate::Type {
                let fields: ::std::vec::Vec<(&'static str, $crate::Type)> = ::std::vec![
                    $((stringify!($field), <$field_ty as $crate::Typed>::rpc_type())),*
                ];
                $crate::Type::$kind(::std::sync::Arc::new($crate::StructType::new(
                    stringify!($name),
                    fields,
                )))
            }
        }

        impl $crate::Encode for $name {
            fn encode(val: Self) -> $crate::Value {
                #[allow(unused_mut)]
                let mut fields = $crate::Fields::new();
                $(fields.insert(
                    stringify!($field).to_owned(),
                    <$field_ty as $crate::Encode>::encode(val.$field),
                );)*
                $crate::Value::$ctor(fields)
            }
        }

        impl $crate::Decode for $name {
            fn decode(val: $crate::Value) -> ::std::result::Result<Self, $crate::TypeMismatch> {
                #[allow(unused_mut, unused_variables)]
                let mut fields = val.into_fields().map_err(|other| {
                    $crate::TypeMismatch::new(&other, <Self as $crate::Typed>::rpc_type())
                })?;
                Ok(Self {
                    $($field: <$field_ty as $crate::Decode>::decode(
                        fields.remove(stringify!($field)).unwrap_or_else(|| {
                            <$field_ty as $crate::Typed>::rpc_type().default_value()
                        }),
                    )?),*
                })
            }
        }
    };
}
