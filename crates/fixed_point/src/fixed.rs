//! Q8.8 fixed-point scalar codec

/// Number of fractional bits in a Q8.8 value
pub const FRAC_BITS: u32 = 8;

/// Scale between a real value and its Q8.8 encoding (2^8)
pub const SCALE_FACTOR: f32 = 256.0;

/// Rounding bias applied (with the sign of the scaled value) before truncation
pub const ROUND_FACTOR: f32 = 0.5;

/// Largest real value accepted by the saturating conversions
pub const MAX_Q: f32 = 127.9940;

/// Smallest real value accepted by the saturating conversions
pub const MIN_Q: f32 = -128.0;

/// Convert a float to Q8.8 without clamping.
///
/// The value is scaled by 256 and rounded to nearest with ties away from
/// zero: a bias of 0.5 carrying the sign of the scaled value is added, then
/// the result is truncated toward zero. Out-of-range inputs saturate at the
/// `i16` bounds and NaN maps to 0, but callers that care about the Q8.8 range
/// should pre-clamp or use [`float_to_q8_8_saturating`].
#[inline]
pub fn float_to_q8_8(v: f32) -> i16 {
    let scaled = v * SCALE_FACTOR;
    (scaled + ROUND_FACTOR.copysign(scaled)) as i16
}

/// Clamp a float into `[MIN_Q, MAX_Q]`.
///
/// NaN resolves to `MAX_Q`: `f32::min` returns the non-NaN operand, which is
/// the same minNum/maxNum ordering the vector backends use.
#[inline]
pub fn clamp_to_q8_8_range(v: f32) -> f32 {
    MIN_Q.max(v.min(MAX_Q))
}

/// Clamp to the Q8.8 range, then convert with [`float_to_q8_8`].
#[inline]
pub fn float_to_q8_8_saturating(v: f32) -> i16 {
    float_to_q8_8(clamp_to_q8_8_range(v))
}

/// Convert a Q8.8 value back to float (exact)
#[inline]
pub fn q8_8_to_float(q: i16) -> f32 {
    f32::from(q) / SCALE_FACTOR
}

/// A Q8.8 fixed-point scalar: 8 integer bits, 8 fractional bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Q8_8(pub i16);

impl Q8_8 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRAC_BITS);
    pub const MIN: Self = Self(i16::MIN);
    pub const MAX: Self = Self(i16::MAX);

    /// Wrap a raw Q8.8 integer
    pub const fn from_raw(raw: i16) -> Self {
        Self(raw)
    }

    /// Encode without clamping (see [`float_to_q8_8`])
    pub fn from_f32(value: f32) -> Self {
        Self(float_to_q8_8(value))
    }

    /// Encode with clamping to `[MIN_Q, MAX_Q]`
    pub fn from_f32_saturating(value: f32) -> Self {
        Self(float_to_q8_8_saturating(value))
    }

    /// The raw integer value
    pub const fn raw(self) -> i16 {
        self.0
    }

    /// Decode to float
    pub fn to_f32(self) -> f32 {
        q8_8_to_float(self.0)
    }
}

impl From<Q8_8> for f32 {
    fn from(q: Q8_8) -> Self {
        q.to_f32()
    }
}

impl std::fmt::Display for Q8_8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.to_f32())
    }
}
