//! Macros for opting user types into shallow comparison.

/// Define a plain record struct and implement [`Shallow`](crate::core::Shallow)
/// for it, comparing every field by identity.
///
/// The `impl` form implements the trait for a struct defined elsewhere.
/// Every listed field must implement [`Same`](crate::core::Same).
///
/// # Example
///
/// ```
/// use mindstore::core::shallow_equal;
/// use mindstore::shallow_record;
///
/// shallow_record! {
///     #[derive(Clone, Debug)]
///     pub struct Viewport {
///         pub width: u32,
///         pub height: u32,
///     }
/// }
///
/// let a = Viewport { width: 80, height: 24 };
/// let b = Viewport { width: 80, height: 24 };
/// assert!(shallow_equal(&a, &b));
///
/// struct Cursor {
///     row: u16,
///     col: u16,
/// }
///
/// shallow_record!(impl Cursor { row, col });
///
/// assert!(!shallow_equal(&Cursor { row: 1, col: 2 }, &Cursor { row: 2, col: 1 }));
/// ```
#[macro_export]
macro_rules! shallow_record {
    (impl $name:ident { $($field:ident),* $(,)? }) => {
        impl $crate::core::Shallow for $name {
            const CATEGORY: $crate::core::Category = $crate::core::Category::Record;

            fn shallow_eq(&self, other: &Self) -> bool {
                true $(&& $crate::core::Same::same(&self.$field, &other.$field))*
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty
            ),*
        }

        $crate::shallow_record!(impl $name { $($field),* });
    };
}

/// Implement [`Same`](crate::core::Same) and [`Shallow`](crate::core::Shallow)
/// for value types whose `PartialEq` already means "the same value", such as
/// fieldless enums and newtypes around scalars.
///
/// # Example
///
/// ```
/// use mindstore::core::{shallow_equal, Same};
/// use mindstore::shallow_atom;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Filter {
///     All,
///     Active,
/// }
///
/// shallow_atom!(Filter);
///
/// assert!(Filter::All.same(&Filter::All));
/// assert!(!shallow_equal(&Filter::All, &Filter::Active));
/// ```
#[macro_export]
macro_rules! shallow_atom {
    ($($name:ty),+ $(,)?) => {
        $(
            impl $crate::core::Same for $name {
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }

            impl $crate::core::Shallow for $name {
                const CATEGORY: $crate::core::Category = $crate::core::Category::Atom;

                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )+
    };
}
