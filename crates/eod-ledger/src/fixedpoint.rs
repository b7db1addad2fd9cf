//! Fixed-point money and quantity types.
//!
//! # Scale
//!
//! Both types store an `i64` at 1e-6 scale (micros).  `Micros` carries prices
//! and money amounts (1 rupee = `Micros(1_000_000)`); `Qty` carries contract /
//! share quantities so that fractional exports stay exact.
//!
//! The two are distinct types: a quantity can never be added to
//! a price by accident, and the only bridge between them is [`value_of`].
//!
//! # Arithmetic
//!
//! - `Add`, `Sub`, `Neg`, `AddAssign`, `SubAssign` are closed over each type.
//! - `saturating_add` / `saturating_sub` clamp at `i64::MAX` / `i64::MIN`.
//! - [`value_of`] multiplies price by quantity in `i128` and rounds half away
//!   from zero back to micros; returns `None` on overflow.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Fixed-point scale shared by [`Micros`] and [`Qty`].
pub const MICROS_SCALE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Micros newtype
// ---------------------------------------------------------------------------

/// A fixed-point monetary amount or price at 1e-6 scale.
///
/// There is no `From<i64>` implementation: callers must be
/// deliberate about when a raw integer represents money.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Micros(i64);

impl Micros {
    pub const ZERO: Micros = Micros(0);
    pub const MAX: Micros = Micros(i64::MAX);
    pub const MIN: Micros = Micros(i64::MIN);

    /// Construct from a raw micros value.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Micros(raw)
    }

    /// Construct from whole currency units (`Micros::from_units(15)` = 15.000000).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Micros(units * MICROS_SCALE)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn saturating_add(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn checked_add(self, rhs: Micros) -> Option<Micros> {
        self.0.checked_add(rhs.0).map(Micros)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Micros) -> Option<Micros> {
        self.0.checked_sub(rhs.0).map(Micros)
    }

    /// Absolute value.  `Micros::MIN.abs()` saturates to `Micros::MAX`.
    #[inline]
    pub fn abs(self) -> Micros {
        Micros(self.0.saturating_abs())
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

// ---------------------------------------------------------------------------
// Qty newtype
// ---------------------------------------------------------------------------

/// A fixed-point quantity at 1e-6 scale.
///
/// Execution and lot quantities are always positive; the signed form is used
/// only for net positions (+long, -short).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qty(i64);

impl Qty {
    pub const ZERO: Qty = Qty(0);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Qty(raw)
    }

    /// Construct from whole units (`Qty::from_units(75)` = 75 contracts).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Qty(units * MICROS_SCALE)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn abs(self) -> Qty {
        Qty(self.0.saturating_abs())
    }

    #[inline]
    pub fn min(self, other: Qty) -> Qty {
        Qty(self.0.min(other.0))
    }

    #[inline]
    pub fn saturating_add(self, rhs: Qty) -> Qty {
        Qty(self.0.saturating_add(rhs.0))
    }
}

// ---------------------------------------------------------------------------
// price x qty
// ---------------------------------------------------------------------------

/// `price × qty`, rounded half away from zero to micros.
///
/// Returns `None` if the result does not fit in `i64` micros.
pub fn value_of(price: Micros, qty: Qty) -> Option<Micros> {
    let product = (price.0 as i128) * (qty.0 as i128);
    let scale = MICROS_SCALE as i128;
    let half = scale / 2;
    let rounded = if product >= 0 {
        (product + half) / scale
    } else {
        (product - half) / scale
    };
    i64::try_from(rounded).ok().map(Micros)
}

/// Like [`value_of`] but clamps at the `Micros` bounds instead of failing.
pub fn value_of_saturating(price: Micros, qty: Qty) -> Micros {
    match value_of(price, qty) {
        Some(v) => v,
        None if (price.0 < 0) != (qty.0 < 0) => Micros::MIN,
        None => Micros::MAX,
    }
}

// ---------------------------------------------------------------------------
// Arithmetic operators
// ---------------------------------------------------------------------------

macro_rules! closed_arith {
    ($t:ident) => {
        impl Add for $t {
            type Output = $t;
            #[inline]
            fn add(self, rhs: $t) -> $t {
                $t(self.0 + rhs.0)
            }
        }

        impl Sub for $t {
            type Output = $t;
            #[inline]
            fn sub(self, rhs: $t) -> $t {
                $t(self.0 - rhs.0)
            }
        }

        impl Neg for $t {
            type Output = $t;
            #[inline]
            fn neg(self) -> $t {
                $t(-self.0)
            }
        }

        impl AddAssign for $t {
            #[inline]
            fn add_assign(&mut self, rhs: $t) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $t {
            #[inline]
            fn sub_assign(&mut self, rhs: $t) {
                self.0 -= rhs.0;
            }
        }

        impl std::iter::Sum for $t {
            fn sum<I: Iterator<Item = $t>>(iter: I) -> $t {
                iter.fold($t(0), |acc, x| $t(acc.0.saturating_add(x.0)))
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                fmt_fixed(self.0, f)
            }
        }
    };
}

closed_arith!(Micros);
closed_arith!(Qty);

/// Six-decimal rendering shared by both types.  A negative value above -1
/// keeps its sign ("-0.250000").
fn fmt_fixed(raw: i64, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let units = raw / MICROS_SCALE;
    let frac = (raw % MICROS_SCALE).abs();
    if raw < 0 && units == 0 {
        write!(f, "-{units}.{frac:06}")
    } else {
        write!(f, "{units}.{frac:06}")
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
