//! One-pole, Butterworth and biquad filter family.

use super::flow::{Generator, Modifier};
use super::math::*;
use super::signal::Signal;
use super::SampleRate;
use num_complex::Complex64;

/// Single-coefficient exponential smoother: `y = a * x + (1 - a) * y`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Iir {
    a: f32,
    b: f32,
    input: Signal,
    out: Signal,
}

impl Iir {
    pub fn new(coeff: f32) -> Self {
        let mut iir = Iir::default();
        iir.set(coeff);
        iir
    }

    pub fn set(&mut self, coeff: f32) {
        self.a = coeff;
        self.b = 1.0 - coeff;
    }
}

impl Generator for Iir {
    type Out = Signal;
    #[inline]
    fn process(&mut self) {
        self.out = Signal(self.a * self.input.0 + self.b * self.out.0);
    }
    #[inline]
    fn output(&self) -> Signal {
        self.out
    }
}

impl Modifier for Iir {
    #[inline]
    fn input(&mut self, x: Signal) {
        self.input = x;
    }
}

/// First order (one-pole, one-zero) filters.
pub mod onepole {
    use super::*;

    /// One-pole low-pass filter.
    #[derive(Copy, Clone, Debug)]
    pub struct Lpf {
        f: f32,
        a1: f32,
        b0: f32,
        fs: SampleRate,
        input: Signal,
        out: Signal,
    }

    impl Lpf {
        pub fn new(fs: SampleRate) -> Self {
            Lpf {
                f: 0.0,
                a1: 0.0,
                b0: 1.0,
                fs,
                input: Signal::default(),
                out: Signal::default(),
            }
        }

        /// Set the cutoff frequency in Hz.
        pub fn set(&mut self, f: f32) {
            if self.f != f {
                self.f = f;
                let exp0 = (-f * self.fs.w).exp();
                self.b0 = 1.0 - exp0;
                self.a1 = exp0;
            }
        }

        pub fn reset(&mut self) {
            self.out = Signal::default();
        }
    }

    impl Generator for Lpf {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.out = Signal(self.b0 * self.input.0 + self.a1 * self.out.0 + DENORMAL_EPS);
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }

    impl Modifier for Lpf {
        #[inline]
        fn input(&mut self, x: Signal) {
            self.input = x;
        }
    }

    /// One-pole high-pass filter.
    #[derive(Copy, Clone, Debug)]
    pub struct Hpf {
        f: f32,
        a1: f32,
        b0: f32,
        b1: f32,
        z: f32,
        fs: SampleRate,
        input: Signal,
        out: Signal,
    }

    impl Hpf {
        pub fn new(fs: SampleRate) -> Self {
            Hpf {
                f: 0.0,
                a1: 0.0,
                b0: 1.0,
                b1: 0.0,
                z: 0.0,
                fs,
                input: Signal::default(),
                out: Signal::default(),
            }
        }

        /// Set the cutoff frequency in Hz.
        pub fn set(&mut self, f: f32) {
            if self.f != f {
                self.f = f;
                let exp0 = (-f * self.fs.w).exp();
                self.b0 = 0.5 * (1.0 + exp0);
                self.b1 = -self.b0;
                self.a1 = exp0;
            }
        }

        pub fn reset(&mut self) {
            self.z = 0.0;
            self.out = Signal::default();
        }
    }

    impl Generator for Hpf {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.out = Signal(
                self.b0 * self.input.0 + self.b1 * self.z + self.a1 * self.out.0 + DENORMAL_EPS,
            );
            self.z = self.input.0;
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }

    impl Modifier for Hpf {
        #[inline]
        fn input(&mut self, x: Signal) {
            self.input = x;
        }
    }
}

/// Butterworth-derived one-pole filters.
pub mod butterworth {
    use super::*;

    /// Butterworth one-pole low-pass filter.
    #[derive(Copy, Clone, Debug)]
    pub struct Lpf {
        f: f32,
        a1: f32,
        z: f32,
        fs: SampleRate,
        input: Signal,
        out: Signal,
    }

    impl Lpf {
        pub fn new(fs: SampleRate) -> Self {
            Lpf {
                f: 0.0,
                a1: 0.0,
                z: 0.0,
                fs,
                input: Signal::default(),
                out: Signal::default(),
            }
        }

        /// Set the cutoff frequency in Hz.
        pub fn set(&mut self, f: f32) {
            if self.f != f {
                self.f = f;
                let c = 1.0 / (PI * f * self.fs.inv).tan();
                self.a1 = (1.0 - c) / (1.0 + c);
            }
        }

        pub fn reset(&mut self) {
            self.z = 0.0;
            self.out = Signal::default();
        }
    }

    impl Generator for Lpf {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.out = Signal(self.input.0 + self.z + self.a1 * self.out.0 + DENORMAL_EPS);
            self.z = self.input.0;
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }

    impl Modifier for Lpf {
        #[inline]
        fn input(&mut self, x: Signal) {
            self.input = x;
        }
    }
}

/// Transposed direct form II biquadratic filters, with coefficient
/// derivations from the RBJ audio cookbook.
pub mod biquad {
    use super::*;

    /// Biquad coefficient block.
    #[derive(Copy, Clone, Debug, Default, PartialEq)]
    pub struct Coefs {
        pub a1: f32,
        pub a2: f32,
        pub b0: f32,
        pub b1: f32,
        pub b2: f32,
    }

    impl Coefs {
        /// Frequency response at `omega` expressed as a fraction of the
        /// sample rate.
        pub fn response(&self, omega: f64) -> Complex64 {
            let z1 = Complex64::from_polar(1.0, -core::f64::consts::TAU * omega);
            let z2 = z1 * z1;
            (Complex64::new(self.b0 as f64, 0.0)
                + Complex64::new(self.b1 as f64, 0.0) * z1
                + Complex64::new(self.b2 as f64, 0.0) * z2)
                / (Complex64::new(1.0, 0.0)
                    + Complex64::new(self.a1 as f64, 0.0) * z1
                    + Complex64::new(self.a2 as f64, 0.0) * z2)
        }
    }

    /// Filter shape of a [`Biquad`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum Kind {
        Lpf,
        Hpf,
        /// Band-pass with constant skirt gain.
        BpfSkirt,
        /// Band-pass with constant peak gain.
        BpfPeak,
        /// Band-reject (notch).
        Brf,
        /// All-pass.
        Apf,
    }

    /// Second order IIR filter in transposed direct form II: two state
    /// samples, six multiply-adds per sample.
    #[derive(Copy, Clone, Debug)]
    pub struct Biquad {
        kind: Kind,
        f: f32,
        q: f32,
        coefs: Coefs,
        alpha: f32,
        cos0: f32,
        sin0: f32,
        z: [f32; 2],
        fs: SampleRate,
        input: Signal,
        out: Signal,
    }

    impl Biquad {
        pub fn new(kind: Kind, fs: SampleRate) -> Self {
            Biquad {
                kind,
                f: 0.0,
                q: 0.0,
                coefs: Coefs {
                    b0: 1.0,
                    ..Coefs::default()
                },
                alpha: 0.0,
                cos0: 1.0,
                sin0: 0.0,
                z: [0.0; 2],
                fs,
                input: Signal::default(),
                out: Signal::default(),
            }
        }

        pub fn lpf(fs: SampleRate) -> Self {
            Biquad::new(Kind::Lpf, fs)
        }
        pub fn hpf(fs: SampleRate) -> Self {
            Biquad::new(Kind::Hpf, fs)
        }
        pub fn bpf(fs: SampleRate) -> Self {
            Biquad::new(Kind::BpfPeak, fs)
        }
        pub fn brf(fs: SampleRate) -> Self {
            Biquad::new(Kind::Brf, fs)
        }
        pub fn apf(fs: SampleRate) -> Self {
            Biquad::new(Kind::Apf, fs)
        }

        pub fn kind(&self) -> Kind {
            self.kind
        }

        /// Switch the filter shape, rederiving coefficients.
        pub fn set_kind(&mut self, kind: Kind) {
            self.kind = kind;
            self.init();
        }

        /// Set centre/cutoff frequency in Hz and resonance. `q` is clamped
        /// to at least 0.5.
        pub fn set(&mut self, f: f32, q: f32) {
            if self.f != f || self.q != q {
                self.f = f;
                self.q = q;

                let w = f * self.fs.w;
                self.cos0 = w.cos();
                self.sin0 = w.sin();
                self.alpha = self.sin0 / (2.0 * q.max(0.5));
                self.init();
            }
        }

        pub fn reset(&mut self) {
            self.z = [0.0; 2];
            self.out = Signal::default();
        }

        pub fn coefs(&self) -> &Coefs {
            &self.coefs
        }

        fn init(&mut self) {
            let a0_inv = 1.0 / (1.0 + self.alpha);
            let c = &mut self.coefs;
            match self.kind {
                Kind::Lpf => {
                    c.a1 = a0_inv * (-2.0 * self.cos0);
                    c.a2 = a0_inv * (1.0 - self.alpha);
                    c.b0 = a0_inv * (1.0 - self.cos0) * 0.5;
                    c.b2 = c.b0;
                    c.b1 = a0_inv * (1.0 - self.cos0);
                }
                Kind::Hpf => {
                    c.a1 = a0_inv * (-2.0 * self.cos0);
                    c.a2 = a0_inv * (1.0 - self.alpha);
                    c.b0 = a0_inv * (1.0 + self.cos0) * 0.5;
                    c.b2 = c.b0;
                    c.b1 = -a0_inv * (1.0 + self.cos0);
                }
                Kind::BpfSkirt => {
                    c.a1 = a0_inv * (-2.0 * self.cos0);
                    c.a2 = a0_inv * (1.0 - self.alpha);
                    c.b0 = a0_inv * self.sin0 * 0.5;
                    c.b1 = 0.0;
                    c.b2 = -c.b0;
                }
                Kind::BpfPeak => {
                    c.a1 = a0_inv * (-2.0 * self.cos0);
                    c.a2 = a0_inv * (1.0 - self.alpha);
                    c.b0 = a0_inv * self.alpha;
                    c.b1 = 0.0;
                    c.b2 = -a0_inv * self.alpha;
                }
                Kind::Brf => {
                    c.a1 = a0_inv * (-2.0 * self.cos0);
                    c.b1 = c.a1;
                    c.a2 = a0_inv * (1.0 - self.alpha);
                    c.b0 = a0_inv;
                    c.b2 = a0_inv;
                }
                Kind::Apf => {
                    c.a1 = a0_inv * (-2.0 * self.cos0);
                    c.b1 = c.a1;
                    c.a2 = a0_inv * (1.0 - self.alpha);
                    c.b0 = c.a2;
                    c.b2 = 1.0;
                }
            }
        }
    }

    impl Generator for Biquad {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            let x = self.input.0;
            let c = &self.coefs;
            let y = c.b0 * x + self.z[0];
            self.z[0] = c.b1 * x - c.a1 * y + self.z[1];
            self.z[1] = c.b2 * x - c.a2 * y;
            self.out = Signal(y);
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }

    impl Modifier for Biquad {
        #[inline]
        fn input(&mut self, x: Signal) {
            self.input = x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::biquad::{Biquad, Kind};
    use super::*;

    #[test]
    fn stable_filters_decay_to_silence() {
        let fs = SampleRate::new(48000.0);
        let mut filters: Vec<Box<dyn FnMut(Signal) -> Signal>> = Vec::new();
        let mut lp = onepole::Lpf::new(fs);
        lp.set(500.0);
        let mut bw = butterworth::Lpf::new(fs);
        bw.set(500.0);
        let mut bq = Biquad::lpf(fs);
        bq.set(500.0, 0.707);
        filters.push(Box::new(move |x| lp.modify(x)));
        filters.push(Box::new(move |x| bw.modify(x)));
        filters.push(Box::new(move |x| bq.modify(x)));

        for filter in filters.iter_mut() {
            filter(Signal(1.0));
            let mut peak: f32 = 0.0;
            for _ in 0..48000 {
                peak = filter(Signal(0.0)).0.abs();
            }
            assert!(peak < 1e-5, "filter rings: {peak}");
        }
    }

    #[test]
    fn lpf_response_at_cutoff_is_minus_three_db() {
        let fs = SampleRate::new(48000.0);
        let mut bq = Biquad::lpf(fs);
        bq.set(1000.0, 0.707);
        let gain = bq.coefs().response(1000.0 / 48000.0).norm();
        assert!((0.70..=0.71).contains(&gain), "gain {gain}");
    }

    #[test]
    fn apf_has_unit_magnitude_everywhere() {
        let fs = SampleRate::new(48000.0);
        let mut apf = Biquad::apf(fs);
        apf.set(1000.0, 0.707);
        for f in [100.0, 1000.0, 5000.0, 20000.0] {
            let gain = apf.coefs().response(f / 48000.0).norm();
            assert!((gain - 1.0).abs() < 1e-4, "f = {f}: {gain}");
        }
    }

    #[test]
    fn q_clamps_below_half() {
        let fs = SampleRate::new(48000.0);
        let mut a = Biquad::lpf(fs);
        let mut b = Biquad::lpf(fs);
        a.set(1000.0, 0.1);
        b.set(1000.0, 0.5);
        assert_eq!(a.coefs(), b.coefs());
    }

    #[test]
    fn kind_selects_the_derivation() {
        let fs = SampleRate::new(48000.0);
        let mut bq = Biquad::new(Kind::BpfSkirt, fs);
        bq.set(1000.0, 1.0);
        let skirt = *bq.coefs();
        bq.set_kind(Kind::BpfPeak);
        assert_ne!(skirt, *bq.coefs());
    }
}
