//! Sigmoid lookup table for Q8.8 pre-activations
//!
//! 2048 entries cover the Q8.8 inputs `[-1024, 1023]`, i.e. the real domain
//! `[-4.0, 3.996]`. Inputs outside saturate to the boundary entries, which
//! hold `sigmoid(-4)` and `sigmoid(4)`. The table is built once and never
//! mutated; share it with `Arc<SigmoidTable>`.

use qlogit_fixed_point::{float_to_q8_8, q8_8_to_float, Q8_8, FRAC_BITS};

/// Number of table entries
pub const SIGMOID_TABLE_LEN: usize = 2048;

/// Added to a clamped Q8.8 input to form the table index
pub const TABLE_OFFSET: i32 = 1024;

/// Magnitude of the tabulated real domain
pub const DOMAIN_LIMIT: f32 = 4.0;

const INDEX_MIN: i32 = -TABLE_OFFSET;
const INDEX_MAX: i32 = TABLE_OFFSET - 1;

/// Exact logistic function
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Precomputed Q8.8 sigmoid values
#[derive(Clone, PartialEq, Eq)]
pub struct SigmoidTable {
    entries: Box<[i16; SIGMOID_TABLE_LEN]>,
}

impl SigmoidTable {
    pub fn new() -> Self {
        let mut entries = Box::new([0i16; SIGMOID_TABLE_LEN]);

        for (i, entry) in entries.iter_mut().enumerate() {
            let x = q8_8_to_float((i as i32 - TABLE_OFFSET) as i16);
            *entry = float_to_q8_8(sigmoid(x));
        }
        entries[0] = float_to_q8_8(sigmoid(-DOMAIN_LIMIT));
        entries[SIGMOID_TABLE_LEN - 1] = float_to_q8_8(sigmoid(DOMAIN_LIMIT));

        tracing::debug!(
            low = entries[0],
            high = entries[SIGMOID_TABLE_LEN - 1],
            "Sigmoid table built"
        );

        Self { entries }
    }

    /// Sigmoid of a Q8.8 pre-activation
    #[inline]
    pub fn lookup_q8_8(&self, x: Q8_8) -> Q8_8 {
        self.lookup_index(i32::from(x.raw()))
    }

    /// Sigmoid of a Q16.16-scaled accumulator (the output of `dot_q8_8`).
    ///
    /// The shift recovers Q8.8 scale; clamping happens in 32 bits so large
    /// accumulators saturate rather than wrap.
    #[inline]
    pub fn lookup_q16_16(&self, acc: i32) -> Q8_8 {
        self.lookup_index(acc >> FRAC_BITS)
    }

    /// Sigmoid of a float pre-activation, quantized with saturation first
    #[inline]
    pub fn lookup_f32(&self, x: f32) -> Q8_8 {
        self.lookup_q8_8(Q8_8::from_f32_saturating(x))
    }

    #[inline]
    fn lookup_index(&self, q: i32) -> Q8_8 {
        let index = (q.clamp(INDEX_MIN, INDEX_MAX) + TABLE_OFFSET) as usize;
        Q8_8(self.entries[index])
    }

    /// The raw table
    pub fn entries(&self) -> &[i16; SIGMOID_TABLE_LEN] {
        &self.entries
    }

    /// Largest |decoded entry - exact sigmoid| over the tabulated domain
    pub fn max_abs_error(&self) -> f32 {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, &q)| {
                let x = q8_8_to_float((i as i32 - TABLE_OFFSET) as i16);
                (q8_8_to_float(q) - sigmoid(x)).abs()
            })
            .fold(0.0f32, f32::max)
    }
}

impl Default for SigmoidTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SigmoidTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigmoidTable")
            .field("len", &SIGMOID_TABLE_LEN)
            .field("low", &self.entries[0])
            .field("high", &self.entries[SIGMOID_TABLE_LEN - 1])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_monotonic() {
        let table = SigmoidTable::new();
        for pair in table.entries().windows(2) {
            assert!(pair[0] <= pair[1], "{} > {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_boundaries() {
        let table = SigmoidTable::new();
        assert_eq!(table.entries()[0], float_to_q8_8(sigmoid(-4.0)));
        assert_eq!(table.entries()[SIGMOID_TABLE_LEN - 1], float_to_q8_8(sigmoid(4.0)));
        // sigmoid(0) = 0.5
        assert_eq!(table.entries()[TABLE_OFFSET as usize], 128);
    }

    #[test]
    fn test_lookup_saturates_outside_domain() {
        let table = SigmoidTable::new();
        let low = Q8_8(table.entries()[0]);
        let high = Q8_8(table.entries()[SIGMOID_TABLE_LEN - 1]);

        assert_eq!(table.lookup_q8_8(Q8_8::MIN), low);
        assert_eq!(table.lookup_q8_8(Q8_8::from_f32(-4.0)), low);
        assert_eq!(table.lookup_q8_8(Q8_8::MAX), high);
        assert_eq!(table.lookup_f32(100.0), high);
        assert_eq!(table.lookup_f32(-100.0), low);
    }

    #[test]
    fn test_lookup_q16_16_shifts_before_indexing() {
        let table = SigmoidTable::new();
        // 1.0 in Q16.16
        let one = 1 << 16;
        assert_eq!(table.lookup_q16_16(one), table.lookup_q8_8(Q8_8::ONE));
        assert_eq!(table.lookup_q16_16(-one), table.lookup_q8_8(Q8_8(-256)));
        assert_eq!(table.lookup_q16_16(0), Q8_8(128));
    }

    #[test]
    fn test_lookup_q16_16_large_accumulators_saturate() {
        let table = SigmoidTable::new();
        let high = Q8_8(table.entries()[SIGMOID_TABLE_LEN - 1]);
        let low = Q8_8(table.entries()[0]);
        // 40000 << 8 would wrap if narrowed to i16 before clamping
        assert_eq!(table.lookup_q16_16(40_000 << 8), high);
        assert_eq!(table.lookup_q16_16(i32::MAX), high);
        assert_eq!(table.lookup_q16_16(-40_000 << 8), low);
        assert_eq!(table.lookup_q16_16(i32::MIN), low);
    }

    #[test]
    fn test_error_is_bounded_by_quantization_step() {
        let table = SigmoidTable::new();
        // Output rounding contributes at most half an LSB
        assert!(table.max_abs_error() <= 0.5 / 256.0 + 1e-6);
    }

    #[test]
    fn test_lookup_f32_tracks_exact_sigmoid() {
        let table = SigmoidTable::new();
        let mut x = -3.9f32;
        while x < 3.9 {
            let approx = table.lookup_f32(x).to_f32();
            // one input step (slope <= 1/4) plus output rounding
            assert!((approx - sigmoid(x)).abs() < 2.0 / 256.0, "x={x}");
            x += 0.01;
        }
    }
}
