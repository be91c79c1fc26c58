//! Fixed-point phase accumulators for the fast oscillator kernels.
//!
//! Phase is an unsigned integer whose full range maps onto [0, 2 * pi):
//! advancing is plain wrapping addition, so the modulo comes for free, and
//! conversion back to a float reinterprets the high bits as IEEE 754 mantissa
//! bits (`f32::from_bits`, portable across endianness).

use super::math::{fast_modp, TAU};
use super::param::Frequency;
use super::SampleRate;

/// Reference frequency for increment derivation (C4).
pub const F_C4: f32 = 261.62556530059862;

/// 32-bit phase accumulator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Phase32 {
    pub bits: u32,
}

impl Phase32 {
    /// Convert radians in [0, 2 * pi) to fixed point.
    #[inline]
    pub fn from_radians(radians: f32) -> Self {
        Phase32 {
            bits: (radians * (4294967296.0 / TAU)) as u64 as u32,
        }
    }

    /// Phase angle in [0, 2 * pi).
    #[inline]
    pub fn radians(self) -> f32 {
        fast_modp(self.bits)
    }

    /// Phase as a cycle fraction in [0, 1).
    #[inline]
    pub fn cycles(self) -> f32 {
        f32::from_bits((self.bits >> 9) | 0x3f80_0000) - 1.0
    }

    /// Advance by an increment; wraps for free.
    #[inline]
    pub fn advance(&mut self, increment: Increment32) {
        self.bits = self.bits.wrapping_add(increment.bits as u32);
    }

    /// Phase shifted by `offset`, wrapping.
    #[inline]
    pub fn offset_by(self, offset: Phase32) -> Phase32 {
        Phase32 {
            bits: self.bits.wrapping_add(offset.bits),
        }
    }
}

/// 32-bit signed phase increment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Increment32 {
    pub bits: i32,
}

impl Increment32 {
    /// Derive the per-sample increment for `frequency` at sample rate `fs`.
    #[inline]
    pub fn from_frequency(frequency: Frequency, fs: SampleRate) -> Self {
        const F_C4_FINTMAX: f32 = F_C4 * 2147483648.0;
        let fbase = F_C4_FINTMAX / fs.f;
        Increment32 {
            bits: ((fbase / F_C4 * frequency.0) as i32).wrapping_mul(2),
        }
    }

    /// Increment as a cycle fraction per sample.
    #[inline]
    pub fn cycles(self) -> f32 {
        f32::from_bits(((self.bits as u32) >> 9) | 0x3f80_0000) - 1.0
    }
}

/// 64-bit phase accumulator for double-precision paths.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Phase64 {
    pub bits: u64,
}

impl Phase64 {
    #[inline]
    pub fn from_radians(radians: f64) -> Self {
        Phase64 {
            bits: (radians * (18446744073709551616.0 / core::f64::consts::TAU)) as u128 as u64,
        }
    }

    #[inline]
    pub fn radians(self) -> f64 {
        let i = (self.bits >> 12) | 0x3ff0_0000_0000_0000;
        (f64::from_bits(i) - 1.0) * core::f64::consts::TAU
    }

    #[inline]
    pub fn advance(&mut self, increment: i64) {
        self.bits = self.bits.wrapping_add(increment as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PI;

    #[test]
    fn radians_round_trip() {
        for i in 0..8 {
            let x = i as f32 * PI / 4.0;
            let p = Phase32::from_radians(x);
            assert!((p.radians() - x).abs() < 1e-4, "x = {x}");
        }
        let p = Phase64::from_radians(3.0);
        assert!((p.radians() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn stepping_matches_multiplication() {
        let fs = SampleRate::new(48000.0);
        let inc = Increment32::from_frequency(Frequency(440.0), fs);
        let mut p = Phase32::default();
        let n = 1000u32;
        for _ in 0..n {
            p.advance(inc);
        }
        let expected = Phase32 {
            bits: (inc.bits as u32).wrapping_mul(n),
        };
        assert_eq!(p.bits, expected.bits);
        // One period of 440 Hz at 48 kHz is about 109.09 samples.
        let cycles_per_sample = inc.cycles();
        assert!((cycles_per_sample - 440.0 / 48000.0).abs() < 1e-6);
    }

    #[test]
    fn negative_frequency_runs_backwards() {
        let fs = SampleRate::new(48000.0);
        let forward = Increment32::from_frequency(Frequency(440.0), fs);
        let backward = Increment32::from_frequency(Frequency(-440.0), fs);
        assert_eq!(forward.bits, -backward.bits);
        let mut p = Phase32::from_radians(PI);
        p.advance(backward);
        assert!(p.radians() < PI);
    }
}
