//! Small non-cryptographic RNG for effect parameters (positions, glyphs,
//! durations). Quality only needs to be "looks random on screen".

use std::cell::Cell;

/// xorshift64* generator behind a `Cell` so spawners can share it by `&`.
pub struct FxRng {
    state: Cell<u64>,
}

impl FxRng {
    pub fn seeded(seed: u64) -> Self {
        // Zero is a fixed point of xorshift; nudge it.
        let seed = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state: Cell::new(seed) }
    }

    /// Seed from the browser crypto source (feature `rng`), falling back to
    /// the supplied value when that is unavailable.
    pub fn from_entropy(fallback: u64) -> Self {
        #[cfg(feature = "rng")]
        {
            let mut buf = [0u8; 8];
            if getrandom::getrandom(&mut buf).is_ok() {
                return Self::seeded(u64::from_le_bytes(buf));
            }
        }
        Self::seeded(fallback)
    }

    fn next_u64(&self) -> u64 {
        let mut x = self.state.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state.set(x);
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `[0, 1)`.
    pub fn unit(&self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[lo, hi)`.
    pub fn range(&self, lo: f64, hi: f64) -> f64 {
        lo + self.unit() * (hi - lo)
    }

    pub fn index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.unit() * len as f64) as usize).min(len - 1)
    }

    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.index(items.len()))
        }
    }
}
