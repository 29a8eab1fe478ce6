//! Shallow structural equality for selected slices.
//!
//! Every [`Shallow`] type is classified into exactly one [`Category`], and its
//! comparison is one of the routines in this module: identity for atoms,
//! [`sequence_eq`] for ordered sequences, [`mapping_eq`] for key-value
//! mappings, [`set_eq`] for unique-value collections, instant comparison for
//! dates and field-wise identity for records.
//!
//! Comparisons never recurse: members of a composite are compared with
//! [`Same`], not with [`Shallow`].

use super::identity::Same;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Runtime category of a comparable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Scalars and strings, compared by identity only
    Atom,
    /// Present-or-absent values; absence is only equal to absence
    Optional,
    /// Shared handles (`Rc`/`Arc`), pointer shortcut then pointee comparison
    Shared,
    /// Ordered sequences, compared index by index
    Sequence,
    /// Key-value mappings, compared entry by entry
    Mapping,
    /// Unique-value collections, compared by membership
    Set,
    /// Points in time, compared by the instant they denote
    Instant,
    /// Plain keyed records, compared field by field
    Record,
}

/// Shallow "no observable difference" comparison.
///
/// Implemented for scalars, strings, sequences, mappings, sets, instants,
/// tuples and `Option`/`Rc`/`Arc` wrappers. User structs opt in with the
/// [`shallow_record!`](crate::shallow_record) macro and user value types with
/// [`shallow_atom!`](crate::shallow_atom).
///
/// # Example
///
/// ```rust
/// use mindstore::core::{shallow_equal, Category, Shallow};
/// use std::collections::HashMap;
///
/// assert!(shallow_equal(&vec![1, 2], &vec![1, 2]));
/// assert!(!shallow_equal(&vec![1, 2], &vec![1, 2, 3]));
///
/// let a = HashMap::from([("a", 1)]);
/// let b = HashMap::from([("a", 1)]);
/// assert!(shallow_equal(&a, &b));
/// assert_eq!(<HashMap<&str, i32>>::CATEGORY, Category::Mapping);
/// ```
pub trait Shallow {
    /// The category this type is dispatched under.
    const CATEGORY: Category;

    /// Compare two values of this type without recursing into members.
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Compare two values for "no observable difference".
///
/// Returns `true` immediately when both arguments are the same reference,
/// otherwise dispatches to the value's [`Shallow`] implementation.
pub fn shallow_equal<T: Shallow + ?Sized>(a: &T, b: &T) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    a.shallow_eq(b)
}

/// Same length and identity-equal elements at every index.
pub fn sequence_eq<'a, T, I>(a: I, b: I) -> bool
where
    T: Same + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
    I::IntoIter: ExactSizeIterator,
{
    let (a, b) = (a.into_iter(), b.into_iter());
    a.len() == b.len() && a.zip(b).all(|(x, y)| x.same(y))
}

/// Same entry count and every key of `a` present in `b` with an
/// identity-equal value.
pub fn mapping_eq<'a, 'b, K, V, I, F>(mut a: I, b_len: usize, mut lookup: F) -> bool
where
    K: 'a,
    V: Same + 'a + 'b,
    I: ExactSizeIterator<Item = (&'a K, &'a V)>,
    F: FnMut(&K) -> Option<&'b V>,
{
    if a.len() != b_len {
        return false;
    }
    a.all(|(key, value)| lookup(key).is_some_and(|other| value.same(other)))
}

/// Same size and every element of `a` contained in `b`.
pub fn set_eq<'a, T, I, F>(mut a: I, b_len: usize, mut contains: F) -> bool
where
    T: 'a,
    I: ExactSizeIterator<Item = &'a T>,
    F: FnMut(&T) -> bool,
{
    a.len() == b_len && a.all(|value| contains(value))
}

macro_rules! shallow_atom_impls {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Shallow for $ty {
                const CATEGORY: Category = Category::Atom;

                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self.same(other)
                }
            }
        )*
    };
}

shallow_atom_impls!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    str,
    String,
    std::time::Duration,
    Uuid,
);

impl<T: Shallow + ?Sized> Shallow for &T {
    const CATEGORY: Category = T::CATEGORY;

    fn shallow_eq(&self, other: &Self) -> bool {
        shallow_equal(*self, *other)
    }
}

impl<T: Shallow + ?Sized> Shallow for Box<T> {
    const CATEGORY: Category = T::CATEGORY;

    fn shallow_eq(&self, other: &Self) -> bool {
        shallow_equal(&**self, &**other)
    }
}

impl<T: Shallow> Shallow for Option<T> {
    const CATEGORY: Category = Category::Optional;

    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => shallow_equal(a, b),
            _ => false,
        }
    }
}

impl<T: Shallow + ?Sized> Shallow for Rc<T> {
    const CATEGORY: Category = Category::Shared;

    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).shallow_eq(&**other)
    }
}

impl<T: Shallow + ?Sized> Shallow for Arc<T> {
    const CATEGORY: Category = Category::Shared;

    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).shallow_eq(&**other)
    }
}

impl<T: Same> Shallow for [T] {
    const CATEGORY: Category = Category::Sequence;

    fn shallow_eq(&self, other: &Self) -> bool {
        sequence_eq(self.iter(), other.iter())
    }
}

impl<T: Same, const N: usize> Shallow for [T; N] {
    const CATEGORY: Category = Category::Sequence;

    fn shallow_eq(&self, other: &Self) -> bool {
        sequence_eq(self.iter(), other.iter())
    }
}

impl<T: Same> Shallow for Vec<T> {
    const CATEGORY: Category = Category::Sequence;

    fn shallow_eq(&self, other: &Self) -> bool {
        sequence_eq(self.iter(), other.iter())
    }
}

impl<T: Same> Shallow for VecDeque<T> {
    const CATEGORY: Category = Category::Sequence;

    fn shallow_eq(&self, other: &Self) -> bool {
        sequence_eq(self.iter(), other.iter())
    }
}

impl<K, V, H> Shallow for HashMap<K, V, H>
where
    K: Eq + Hash,
    V: Same,
    H: BuildHasher,
{
    const CATEGORY: Category = Category::Mapping;

    fn shallow_eq(&self, other: &Self) -> bool {
        mapping_eq(self.iter(), other.len(), |key| other.get(key))
    }
}

impl<K: Ord, V: Same> Shallow for BTreeMap<K, V> {
    const CATEGORY: Category = Category::Mapping;

    fn shallow_eq(&self, other: &Self) -> bool {
        mapping_eq(self.iter(), other.len(), |key| other.get(key))
    }
}

impl<T, H> Shallow for HashSet<T, H>
where
    T: Eq + Hash,
    H: BuildHasher,
{
    const CATEGORY: Category = Category::Set;

    fn shallow_eq(&self, other: &Self) -> bool {
        set_eq(self.iter(), other.len(), |value| other.contains(value))
    }
}

impl<T: Ord> Shallow for BTreeSet<T> {
    const CATEGORY: Category = Category::Set;

    fn shallow_eq(&self, other: &Self) -> bool {
        set_eq(self.iter(), other.len(), |value| other.contains(value))
    }
}

impl<Tz: TimeZone> Shallow for DateTime<Tz> {
    const CATEGORY: Category = Category::Instant;

    fn shallow_eq(&self, other: &Self) -> bool {
        self.timestamp() == other.timestamp()
            && self.timestamp_subsec_nanos() == other.timestamp_subsec_nanos()
    }
}

impl Shallow for NaiveDateTime {
    const CATEGORY: Category = Category::Instant;

    fn shallow_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl Shallow for SystemTime {
    const CATEGORY: Category = Category::Instant;

    fn shallow_eq(&self, other: &Self) -> bool {
        self == other
    }
}

// Tuples are records keyed by position.
macro_rules! shallow_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Same),+> Shallow for ($($name,)+) {
            const CATEGORY: Category = Category::Record;

            fn shallow_eq(&self, other: &Self) -> bool {
                true $(&& self.$idx.same(&other.$idx))+
            }
        }
    };
}

shallow_tuple!(A: 0);
shallow_tuple!(A: 0, B: 1);
shallow_tuple!(A: 0, B: 1, C: 2);
shallow_tuple!(A: 0, B: 1, C: 2, D: 3);
shallow_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
shallow_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
shallow_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
shallow_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
