//! Identity comparison for the values held inside selected slices.
//!
//! Identity is the strictest notion of "the same value": scalars compare by
//! value, floats compare bit-for-bit (except that every NaN is the same as
//! every other NaN), and shared handles compare by pointer. Plain owned
//! containers such as `Vec` or `HashMap` deliberately do not implement
//! [`Same`]: a composite nested inside a slice must be shared through an
//! `Rc`/`Arc`, which keeps every comparison shallow.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Identity-equality between two values of the same type.
///
/// # Example
///
/// ```rust
/// use mindstore::core::Same;
/// use std::rc::Rc;
///
/// assert!(f64::NAN.same(&f64::NAN));
/// assert!(!0.0_f64.same(&-0.0_f64));
///
/// let shared = Rc::new(vec![1, 2]);
/// assert!(shared.same(&Rc::clone(&shared)));
/// assert!(!shared.same(&Rc::new(vec![1, 2])));
/// ```
pub trait Same {
    /// Returns `true` when `self` and `other` are indistinguishable by identity.
    fn same(&self, other: &Self) -> bool;
}

macro_rules! same_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Same for $ty {
                #[inline]
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_by_value!(
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
    str,
    String,
    Duration,
    SystemTime,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    Uuid,
);

macro_rules! same_float {
    ($($ty:ty),*) => {
        $(
            impl Same for $ty {
                #[inline]
                fn same(&self, other: &Self) -> bool {
                    if self.is_nan() && other.is_nan() {
                        return true;
                    }
                    self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

same_float!(f32, f64);

impl<Tz: TimeZone> Same for DateTime<Tz> {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Same + ?Sized> Same for &T {
    fn same(&self, other: &Self) -> bool {
        (**self).same(*other)
    }
}

impl<T: Same> Same for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        }
    }
}

impl<T: ?Sized> Same for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Same for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn nan_is_same_as_itself() {
        assert!(f64::NAN.same(&f64::NAN));
        assert!(f32::NAN.same(&f32::NAN));
        assert!(f64::NAN.same(&-f64::NAN));
    }

    #[test]
    fn signed_zeros_are_distinct() {
        assert!(!0.0_f64.same(&-0.0_f64));
        assert!(!(-0.0_f32).same(&0.0_f32));
        assert!(0.0_f64.same(&0.0_f64));
    }

    #[test]
    fn strings_compare_by_value() {
        assert!(String::from("a").same(&String::from("a")));
        assert!("a".same(&"a"));
        assert!(!"a".same(&"b"));
    }

    #[test]
    fn shared_handles_compare_by_pointer() {
        let a = Arc::new(vec![1]);
        let b = Arc::new(vec![1]);
        assert!(a.same(&Arc::clone(&a)));
        assert!(!a.same(&b));
    }

    #[test]
    fn option_treats_absence_as_its_own_value() {
        assert!(None::<u8>.same(&None));
        assert!(!Some(1).same(&None));
        assert!(Some(1).same(&Some(1)));
    }

    #[test]
    fn datetimes_compare_by_instant() {
        let utc = Utc::now();
        let shifted = utc.with_timezone(&FixedOffset::east_opt(3600).unwrap());
        assert!(utc.same(&shifted.with_timezone(&Utc)));
    }
}
