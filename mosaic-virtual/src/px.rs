//! Physical pixel lengths along the scroll axis.
//!
//! Every size, offset and extent handled by the virtualization engine is a
//! [`Px`]: an integral count of physical pixels. Offsets may go negative while
//! intermediate arithmetic runs, so the value is signed, and all accumulation
//! done by the layout engine saturates instead of overflowing.
//!
//! # Example
//!
//! ```
//! use mosaic_virtual::px::Px;
//!
//! let estimate = Px::new(300);
//! let measured = Px::new(450);
//!
//! assert_eq!(measured - estimate, Px::new(150));
//! assert_eq!(estimate * 3, Px::new(900));
//! assert_eq!(Px::MAX.saturating_add(estimate), Px::MAX);
//! ```

use std::{
    fmt,
    ops::{AddAssign, Neg, SubAssign},
};

use serde::{Deserialize, Serialize};

/// A physical pixel length.
///
/// `Px` supports negative values so that deltas (measured minus estimated
/// size, for example) can be expressed directly. Sizes reported to the
/// measurement store must still be strictly positive.
///
/// # Examples
///
/// ```
/// use mosaic_virtual::px::Px;
///
/// let a = Px::new(100);
/// let b = Px::new(-50);
///
/// assert_eq!(a + b, Px::new(50));
/// assert!(b < Px::ZERO);
/// assert_eq!(b.raw(), -50);
/// ```
#[derive(
    Debug, Default, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Px(pub i32);

impl Px {
    /// A constant representing zero pixels.
    pub const ZERO: Self = Self(0);

    /// A constant representing the maximum possible pixel value.
    pub const MAX: Self = Self(i32::MAX);

    /// Creates a new `Px` instance from an i32 value.
    pub const fn new(value: i32) -> Self {
        Px(value)
    }

    /// Returns the raw i32 value.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Whether this length can be used as an item size.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Saturating addition.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Px(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Px(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl std::ops::Add for Px {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Px(self.0 + rhs.0)
    }
}

impl Neg for Px {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Px::new(-self.0)
    }
}

impl std::ops::Sub for Px {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Px(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i32> for Px {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output {
        Px(self.0 * rhs)
    }
}

impl std::ops::Div<i32> for Px {
    type Output = Self;

    fn div(self, rhs: i32) -> Self::Output {
        Px(self.0 / rhs)
    }
}

impl From<i32> for Px {
    fn from(value: i32) -> Self {
        Px(value)
    }
}

impl From<u32> for Px {
    fn from(value: u32) -> Self {
        Px(i32::try_from(value).unwrap_or(i32::MAX))
    }
}

impl AddAssign for Px {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Px {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
