//! Fixed-point scalar and vector types.
//!
//! Every value that feeds a decision is an `FP`: a signed 48.16 fixed-point number stored in an
//! `i64`. Arithmetic saturates instead of wrapping or panicking, so replays stay bit-exact and a
//! bad asset value can never crash the simulation.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct FP {
    raw: i64,
}

impl FP {
    pub const FRACTIONAL_BITS: u32 = 16;

    pub const ZERO: FP = FP::from_raw(0);
    pub const ONE: FP = FP::from_raw(1 << Self::FRACTIONAL_BITS);
    pub const HALF: FP = FP::from_raw(1 << (Self::FRACTIONAL_BITS - 1));
    pub const EPSILON: FP = FP::from_raw(1);
    pub const MAX: FP = FP::from_raw(i64::MAX);
    pub const MIN: FP = FP::from_raw(i64::MIN);

    pub const fn from_raw(raw: i64) -> Self {
        Self { raw }
    }

    pub const fn raw(self) -> i64 {
        self.raw
    }

    pub const fn from_int(value: i32) -> Self {
        Self::from_raw((value as i64) << Self::FRACTIONAL_BITS)
    }

    /// `num / den`, rounded toward zero. A zero denominator yields `ZERO`.
    pub const fn from_ratio(num: i32, den: i32) -> Self {
        if den == 0 {
            return Self::ZERO;
        }
        Self::from_raw(((num as i64) << Self::FRACTIONAL_BITS) / (den as i64))
    }

    /// Conversion used at asset-load time only; simulation code never touches floats.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        let scaled = (value * (1u64 << Self::FRACTIONAL_BITS) as f64).round();
        if scaled >= i64::MAX as f64 {
            Self::MAX
        } else if scaled <= i64::MIN as f64 {
            Self::MIN
        } else {
            Self::from_raw(scaled as i64)
        }
    }

    pub fn to_f64(self) -> f64 {
        self.raw as f64 / (1u64 << Self::FRACTIONAL_BITS) as f64
    }

    /// Integer part, rounded toward negative infinity.
    pub const fn to_int(self) -> i32 {
        let whole = self.raw >> Self::FRACTIONAL_BITS;
        if whole > i32::MAX as i64 {
            i32::MAX
        } else if whole < i32::MIN as i64 {
            i32::MIN
        } else {
            whole as i32
        }
    }

    pub const fn abs(self) -> Self {
        Self::from_raw(self.raw.saturating_abs())
    }

    pub const fn is_zero(self) -> bool {
        self.raw == 0
    }

    pub const fn is_negative(self) -> bool {
        self.raw < 0
    }

    pub fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }

    pub fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        if self < lo {
            lo
        } else if self > hi {
            hi
        } else {
            self
        }
    }

    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.raw == 0 {
            return None;
        }
        let wide = ((self.raw as i128) << Self::FRACTIONAL_BITS) / rhs.raw as i128;
        Some(Self::from_raw(saturate(wide)))
    }

    /// Square root; negative inputs yield `ZERO`.
    pub fn sqrt(self) -> Self {
        if self.raw <= 0 {
            return Self::ZERO;
        }
        let wide = (self.raw as u128) << Self::FRACTIONAL_BITS;
        Self::from_raw(isqrt(wide) as i64)
    }
}

fn saturate(wide: i128) -> i64 {
    if wide > i64::MAX as i128 {
        i64::MAX
    } else if wide < i64::MIN as i128 {
        i64::MIN
    } else {
        wide as i64
    }
}

fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

impl Add for FP {
    type Output = FP;

    fn add(self, rhs: Self) -> Self::Output {
        FP::from_raw(self.raw.saturating_add(rhs.raw))
    }
}

impl Sub for FP {
    type Output = FP;

    fn sub(self, rhs: Self) -> Self::Output {
        FP::from_raw(self.raw.saturating_sub(rhs.raw))
    }
}

impl Mul for FP {
    type Output = FP;

    fn mul(self, rhs: Self) -> Self::Output {
        let wide = (self.raw as i128 * rhs.raw as i128) >> FP::FRACTIONAL_BITS;
        FP::from_raw(saturate(wide))
    }
}

/// Division by zero saturates toward the sign of the numerator.
impl Div for FP {
    type Output = FP;

    fn div(self, rhs: Self) -> Self::Output {
        match self.checked_div(rhs) {
            Some(value) => value,
            None if self.raw < 0 => FP::MIN,
            None if self.raw > 0 => FP::MAX,
            None => FP::ZERO,
        }
    }
}

impl Neg for FP {
    type Output = FP;

    fn neg(self) -> Self::Output {
        FP::from_raw(self.raw.saturating_neg())
    }
}

impl AddAssign for FP {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for FP {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for FP {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl From<i32> for FP {
    fn from(value: i32) -> Self {
        FP::from_int(value)
    }
}

impl From<f64> for FP {
    fn from(value: f64) -> Self {
        FP::from_f64(value)
    }
}

impl From<FP> for f64 {
    fn from(value: FP) -> Self {
        value.to_f64()
    }
}

impl fmt::Debug for FP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FP({:.4})", self.to_f64())
    }
}

impl fmt::Display for FP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FPVector2 {
    pub x: FP,
    pub y: FP,
}

impl FPVector2 {
    pub const ZERO: FPVector2 = FPVector2::new(FP::ZERO, FP::ZERO);

    pub const fn new(x: FP, y: FP) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> FP {
        self.x * other.x + self.y * other.y
    }

    pub fn sqr_magnitude(self) -> FP {
        self.dot(self)
    }

    pub fn magnitude(self) -> FP {
        self.sqr_magnitude().sqrt()
    }

    pub fn scale(self, factor: FP) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl Add for FPVector2 {
    type Output = FPVector2;

    fn add(self, rhs: Self) -> Self::Output {
        FPVector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FPVector2 {
    type Output = FPVector2;

    fn sub(self, rhs: Self) -> Self::Output {
        FPVector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for FPVector2 {
    type Output = FPVector2;

    fn neg(self) -> Self::Output {
        FPVector2::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FPVector3 {
    pub x: FP,
    pub y: FP,
    pub z: FP,
}

impl FPVector3 {
    pub const ZERO: FPVector3 = FPVector3::new(FP::ZERO, FP::ZERO, FP::ZERO);

    pub const fn new(x: FP, y: FP, z: FP) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> FP {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn sqr_magnitude(self) -> FP {
        self.dot(self)
    }

    pub fn magnitude(self) -> FP {
        self.sqr_magnitude().sqrt()
    }

    pub fn scale(self, factor: FP) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Add for FPVector3 {
    type Output = FPVector3;

    fn add(self, rhs: Self) -> Self::Output {
        FPVector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for FPVector3 {
    type Output = FPVector3;

    fn sub(self, rhs: Self) -> Self::Output {
        FPVector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for FPVector3 {
    type Output = FPVector3;

    fn neg(self) -> Self::Output {
        FPVector3::new(-self.x, -self.y, -self.z)
    }
}
