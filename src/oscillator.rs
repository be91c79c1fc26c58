//! Oscillators in exact and fast variants, and the band-limited OSM
//! generator.
//!
//! The `basic` bank computes waveforms from a float phase with exact math;
//! the `fast` bank runs on the fixed-point accumulators from [`phase`] and
//! polynomial approximations. The fast saw/triangle/square/pulse are built on
//! the oscillator state machine ([`fast::Osm`]), which integrates the ideal
//! waveform per sample and subtracts a closed-form correction for each
//! discontinuity the sample crosses.
//!
//! [`phase`]: crate::phase

use super::envelope::Envelope;
use super::flow::{Generator, Modifier, Oscillator};
use super::math::*;
use super::param::{Amplitude, Frequency, Phase};
use super::phase::{Increment32, Phase32};
use super::signal::Signal;
use super::wavetable::Wavetable;
use super::SampleRate;
use duplicate::{duplicate, duplicate_item};
use funutd::Rnd;

/// Shared phase bookkeeping for the exact oscillators.
#[derive(Copy, Clone, Debug)]
struct Core {
    frequency: Frequency,
    increment: f32,
    position: Phase,
    offset: f32,
    fs: SampleRate,
    out: Signal,
}

impl Core {
    fn new(fs: SampleRate) -> Self {
        Core {
            frequency: Frequency(0.0),
            increment: 0.0,
            position: Phase::default(),
            offset: 0.0,
            fs,
            out: Signal::default(),
        }
    }

    #[inline]
    fn set_frequency(&mut self, frequency: Frequency) {
        self.frequency = frequency;
        self.increment = frequency.0 * TAU / self.fs.f;
    }

    #[inline]
    fn step(&mut self) {
        self.position += self.increment;
    }
}

/// Exact oscillators using a float phase and standard library trig.
pub mod basic {
    use super::*;

    #[duplicate_item(osc; [Sine]; [Saw]; [Triangle]; [Square])]
    #[derive(Copy, Clone, Debug)]
    pub struct osc {
        core: Core,
    }

    #[duplicate_item(osc; [Sine]; [Saw]; [Triangle]; [Square])]
    impl osc {
        pub fn new(fs: SampleRate) -> Self {
            Self {
                core: Core::new(fs),
            }
        }
    }

    impl Generator for Sine {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.core.out = Signal((self.core.position.radians() + self.core.offset).sin());
            self.core.step();
        }
        #[inline]
        fn output(&self) -> Signal {
            self.core.out
        }
    }

    impl Generator for Saw {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.core.out = Signal(self.core.position.radians() / PI - 1.0);
            self.core.step();
        }
        #[inline]
        fn output(&self) -> Signal {
            self.core.out
        }
    }

    impl Generator for Triangle {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.core.out =
                Signal((2.0 * self.core.position.radians() / PI - 2.0).abs() - 1.0);
            self.core.step();
        }
        #[inline]
        fn output(&self) -> Signal {
            self.core.out
        }
    }

    impl Generator for Square {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.core.out = Signal(if self.core.position.radians() > PI {
                1.0
            } else {
                -1.0
            });
            self.core.step();
        }
        #[inline]
        fn output(&self) -> Signal {
            self.core.out
        }
    }

    #[duplicate_item(osc; [Sine]; [Saw]; [Triangle]; [Square])]
    impl Oscillator for osc {
        fn reset(&mut self) {
            self.core.position = Phase::default();
        }
        fn set_sample_rate(&mut self, fs: SampleRate) {
            self.core.fs = fs;
            self.core.set_frequency(self.core.frequency);
        }
        fn set_frequency(&mut self, frequency: Frequency) {
            self.core.set_frequency(frequency);
        }
        fn set_phase(&mut self, phase: Phase) {
            self.core.position = phase;
        }
        fn set_offset(&mut self, offset: Phase) {
            self.core.offset = offset.radians();
        }
        fn frequency(&self) -> Frequency {
            self.core.frequency
        }
    }

    /// Rectangular wave with a variable duty cycle.
    #[derive(Copy, Clone, Debug)]
    pub struct Pulse {
        core: Core,
        duty: f32,
    }

    impl Pulse {
        pub fn new(fs: SampleRate) -> Self {
            Pulse {
                core: Core::new(fs),
                duty: 0.5,
            }
        }

        pub fn set_duty(&mut self, duty: f32) {
            self.duty = duty;
        }
    }

    impl Generator for Pulse {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.core.out = Signal(if self.core.position.radians() > self.duty * PI {
                1.0
            } else {
                -1.0
            });
            self.core.step();
        }
        #[inline]
        fn output(&self) -> Signal {
            self.core.out
        }
    }

    impl Oscillator for Pulse {
        fn reset(&mut self) {
            self.core.position = Phase::default();
        }
        fn set_sample_rate(&mut self, fs: SampleRate) {
            self.core.fs = fs;
            self.core.set_frequency(self.core.frequency);
        }
        fn set_frequency(&mut self, frequency: Frequency) {
            self.core.set_frequency(frequency);
        }
        fn set_phase(&mut self, phase: Phase) {
            self.core.position = phase;
        }
        fn set_offset(&mut self, offset: Phase) {
            self.core.offset = offset.radians();
        }
        fn frequency(&self) -> Frequency {
            self.core.frequency
        }
    }

    /// Uniform white noise in [-1, 1].
    #[derive(Clone)]
    pub struct Noise {
        rnd: Rnd,
        out: Signal,
    }

    impl Noise {
        pub fn new() -> Self {
            Noise {
                rnd: Rnd::new(),
                out: Signal::default(),
            }
        }

        pub fn from_seed(seed: u64) -> Self {
            Noise {
                rnd: Rnd::from_u64(seed),
                out: Signal::default(),
            }
        }
    }

    impl Default for Noise {
        fn default() -> Self {
            Noise::new()
        }
    }

    impl Generator for Noise {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.out = Signal(self.rnd.f32_in(-1.0, 1.0));
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }
}

/// Fixed-point oscillators with polynomial and state-machine kernels.
pub mod fast {
    use super::*;

    /// Sine synthesis from the integer phase: the accumulator is range
    /// reduced to a quarter turn and fed to the odd-minimax polynomial.
    #[derive(Copy, Clone, Debug)]
    pub struct Sine {
        frequency: Frequency,
        increment: Increment32,
        position: Phase32,
        offset: Phase32,
        fs: SampleRate,
        out: Signal,
    }

    impl Sine {
        pub fn new(fs: SampleRate) -> Self {
            Sine {
                frequency: Frequency(0.0),
                increment: Increment32::default(),
                position: Phase32::default(),
                offset: Phase32::default(),
                fs,
                out: Signal::default(),
            }
        }
    }

    impl Generator for Sine {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.out = Signal(fastsinp(self.position.offset_by(self.offset).bits));
            self.position.advance(self.increment);
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }

    impl Oscillator for Sine {
        fn reset(&mut self) {
            self.position = Phase32::default();
            self.offset = Phase32::default();
        }
        fn set_sample_rate(&mut self, fs: SampleRate) {
            self.fs = fs;
            self.increment = Increment32::from_frequency(self.frequency, fs);
        }
        fn set_frequency(&mut self, frequency: Frequency) {
            if frequency != self.frequency {
                self.frequency = frequency;
                self.increment = Increment32::from_frequency(frequency, self.fs);
            }
        }
        fn set_phase(&mut self, phase: Phase) {
            self.position = Phase32::from_radians(phase.radians());
        }
        fn set_offset(&mut self, offset: Phase) {
            // rem_euclid keeps negative modulation (e.g. FM) in range.
            self.offset = Phase32::from_radians(offset.radians().rem_euclid(TAU));
        }
        fn frequency(&self) -> Frequency {
            self.frequency
        }
    }

    // 3-bit transition state: carry | old_up | new_up.
    const NEW_UP: u8 = 0b001;
    const OLD_UP: u8 = 0b010;
    const CARRY: u8 = 0b100;

    const DOWN: u8 = 0;
    const UP: u8 = OLD_UP | NEW_UP;
    const UP_DOWN: u8 = OLD_UP;
    const DOWN_UP: u8 = NEW_UP | CARRY;
    const UP_DOWN_UP: u8 = OLD_UP | NEW_UP | CARRY;
    const DOWN_UP_DOWN: u8 = CARRY;

    /// Which ideal waveform the state machine integrates.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum OsmWave {
        Saw,
        Pulse,
    }

    /// Oscillator state machine: band-limited saw and pulse.
    ///
    /// Each sample is the average of the ideal waveform over the sample
    /// period. The 3-bit transition state selects which closed-form integral
    /// applies; coefficients are cached whenever frequency or duty changes.
    #[derive(Copy, Clone, Debug)]
    pub struct Osm {
        wave: OsmWave,
        frequency: Frequency,
        increment: Increment32,
        offset: Phase32,
        duty: Phase32,
        duty_value: f32,
        state: u8,
        delta: f32,
        f: f32,
        omf: f32,
        rcpf: f32,
        rcpf2: f32,
        col: f32,
        c1: f32,
        c2: f32,
        fs: SampleRate,
        out: Signal,
    }

    impl Osm {
        pub fn new(wave: OsmWave, duty: f32, fs: SampleRate) -> Self {
            let mut osm = Osm {
                wave,
                frequency: Frequency(0.0),
                increment: Increment32::default(),
                offset: Phase32::default(),
                duty: Phase32::default(),
                duty_value: duty,
                state: DOWN,
                delta: 0.0,
                f: 0.0,
                omf: 1.0,
                rcpf: 0.0,
                rcpf2: 0.0,
                col: 0.0,
                c1: 0.0,
                c2: -1.0,
                fs,
                out: Signal::default(),
            };
            osm.set_duty(duty);
            osm
        }

        /// Set the duty cycle in 0...1 (breakpoint of the falling edge).
        pub fn set_duty(&mut self, duty: f32) {
            self.duty_value = duty;
            self.duty = Phase32 {
                bits: (duty as f64 * 0.5 * 4294967296.0) as u64 as u32,
            };
            self.init();
        }

        pub fn duty(&self) -> f32 {
            self.duty_value
        }

        fn init(&mut self) {
            self.state = if self.offset.bits.wrapping_sub(self.increment.bits as u32) < self.duty.bits
            {
                UP
            } else {
                DOWN
            };
            self.f = self.delta;
            self.omf = 1.0 - self.f;
            self.rcpf = 1.0 / self.f;
            self.rcpf2 = 2.0 * self.rcpf;
            self.col = self.duty.cycles();
            self.c1 = 1.0 / self.col;
            self.c2 = -1.0 / (1.0 - self.col);
        }

        #[inline]
        fn tick(&mut self) -> u8 {
            // old_up = new_up, new_up = (phase < breakpoint)
            self.state =
                ((self.state << 1) | u8::from(self.offset.bits < self.duty.bits)) & (NEW_UP | OLD_UP);

            // The increment was added going from the previous sample to this
            // one, so a phase below the increment means we carried.
            let transition = self.state
                | if self.offset.bits < self.increment.bits as u32 {
                    CARRY
                } else {
                    0
                };

            self.offset.advance(self.increment);
            transition
        }

        #[inline]
        fn saw(&self, p: f32, transition: u8) -> f32 {
            let sqr = |x: f32| x * x;
            match transition {
                // Average of a linear segment = the sample at its middle.
                UP => self.c1 * (p + p - self.f) + 1.0,
                DOWN => self.c2 * (p + p - self.f) + 1.0,
                UP_DOWN => self.rcpf * (self.c2 * sqr(p) - self.c1 * sqr(p - self.f)) + 1.0,
                DOWN_UP => {
                    -self.rcpf * (1.0 + self.c2 * sqr(p + self.omf) - self.c1 * sqr(p)) + 1.0
                }
                UP_DOWN_UP => -self.rcpf * (1.0 + self.c1 * self.omf * (p + p + self.omf)) + 1.0,
                DOWN_UP_DOWN => -self.rcpf * (1.0 + self.c2 * self.omf * (p + p + self.omf)) + 1.0,
                _ => 0.0,
            }
        }

        #[inline]
        fn pulse(&self, p: f32, transition: u8) -> f32 {
            match transition {
                UP => 1.0,
                DOWN => -1.0,
                UP_DOWN => self.rcpf2 * (self.col - p) + 1.0,
                DOWN_UP => self.rcpf2 * p - 1.0,
                UP_DOWN_UP => self.rcpf2 * (self.col - 1.0) + 1.0,
                DOWN_UP_DOWN => self.rcpf2 * self.col - 1.0,
                _ => 0.0,
            }
        }
    }

    impl Generator for Osm {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            self.out = Signal(match self.wave {
                OsmWave::Saw => {
                    let p = self.offset.cycles() - self.col;
                    let transition = self.tick();
                    self.saw(p, transition)
                }
                OsmWave::Pulse => {
                    let p = self.offset.cycles();
                    let transition = self.tick();
                    self.pulse(p, transition)
                }
            });
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }

    impl Oscillator for Osm {
        fn reset(&mut self) {
            self.offset = Phase32::default();
            self.init();
        }
        fn set_sample_rate(&mut self, fs: SampleRate) {
            self.fs = fs;
            self.increment = Increment32::from_frequency(self.frequency, fs);
            self.delta = self.increment.cycles();
            self.init();
        }
        fn set_frequency(&mut self, frequency: Frequency) {
            if frequency != self.frequency {
                self.frequency = frequency;
                self.increment = Increment32::from_frequency(frequency, self.fs);
                self.delta = self.increment.cycles();
                self.init();
            }
        }
        fn set_phase(&mut self, phase: Phase) {
            self.offset = Phase32::from_radians(phase.radians());
            self.init();
        }
        fn set_offset(&mut self, offset: Phase) {
            self.set_phase(offset);
        }
        fn frequency(&self) -> Frequency {
            self.frequency
        }
    }

    duplicate! {
        [
            osc        wave              duty;
            [Saw]      [OsmWave::Saw]    [0.0];
            [Triangle] [OsmWave::Saw]    [1.0];
            [Square]   [OsmWave::Pulse]  [1.0];
            [Pulse]    [OsmWave::Pulse]  [0.5];
        ]
        /// Band-limited waveform built on the oscillator state machine.
        #[derive(Copy, Clone, Debug)]
        pub struct osc {
            pub osm: Osm,
        }

        impl osc {
            pub fn new(fs: SampleRate) -> Self {
                Self { osm: Osm::new(wave, duty, fs) }
            }
        }

        impl Generator for osc {
            type Out = Signal;
            #[inline]
            fn process(&mut self) {
                self.osm.process();
            }
            #[inline]
            fn output(&self) -> Signal {
                self.osm.output()
            }
        }

        impl Oscillator for osc {
            fn reset(&mut self) {
                self.osm.reset();
            }
            fn set_sample_rate(&mut self, fs: SampleRate) {
                self.osm.set_sample_rate(fs);
            }
            fn set_frequency(&mut self, frequency: Frequency) {
                self.osm.set_frequency(frequency);
            }
            fn set_phase(&mut self, phase: Phase) {
                self.osm.set_phase(phase);
            }
            fn set_offset(&mut self, offset: Phase) {
                self.osm.set_offset(offset);
            }
            fn frequency(&self) -> Frequency {
                self.osm.frequency()
            }
        }
    }

    impl Pulse {
        /// Set the duty cycle in 0...1.
        pub fn set_duty(&mut self, duty: f32) {
            self.osm.set_duty(duty);
        }
    }

    /// White noise from mantissa bits.
    #[derive(Clone)]
    pub struct Noise {
        rnd: Rnd,
        out: Signal,
    }

    const NOISE_BIAS: u32 = 0b100_0011_1000_0000_0000_0000_0000_0000;

    impl Noise {
        pub fn new() -> Self {
            Noise {
                rnd: Rnd::new(),
                out: Signal::default(),
            }
        }

        pub fn from_seed(seed: u64) -> Self {
            Noise {
                rnd: Rnd::from_u64(seed),
                out: Signal::default(),
            }
        }
    }

    impl Default for Noise {
        fn default() -> Self {
            Noise::new()
        }
    }

    impl Generator for Noise {
        type Out = Signal;
        #[inline]
        fn process(&mut self) {
            let bits = (((self.rnd.u64() as u32) & 0x7fff) << 1) | NOISE_BIAS;
            self.out = Signal(f32::from_bits(bits) - 257.0);
        }
        #[inline]
        fn output(&self) -> Signal {
            self.out
        }
    }
}

/// An oscillator paired with an envelope and amplitude, with a modulation
/// input driving its phase offset. Chaining operators with `>>` yields
/// phase modulation; [`Operator::feedback`] routes the averaged last two
/// outputs back into the phase.
#[derive(Clone)]
pub struct Operator<O: Oscillator> {
    pub osc: O,
    pub env: Envelope,
    pub amp: Amplitude,
    input: Signal,
    last: Signal,
    feedback: Signal,
    out: Signal,
}

impl<O: Oscillator> Operator<O> {
    pub fn new(osc: O, fs: SampleRate) -> Self {
        Operator {
            osc,
            env: Envelope::new(fs),
            amp: Amplitude(1.0),
            input: Signal::default(),
            last: Signal::default(),
            feedback: Signal::default(),
            out: Signal::default(),
        }
    }

    pub fn set_frequency(&mut self, frequency: Frequency) {
        self.osc.set_frequency(frequency);
    }

    /// Route this operator's own output back into its phase input.
    #[inline]
    pub fn feedback(&mut self) {
        self.feedback = (self.last + self.out) * 0.5;
    }

    /// Route an external feedback signal into the phase input.
    #[inline]
    pub fn set_feedback(&mut self, x: Signal) {
        self.feedback = x;
    }
}

impl<O: Oscillator> Generator for Operator<O> {
    type Out = Signal;
    #[inline]
    fn process(&mut self) {
        self.osc
            .set_offset(Phase::new((self.input + self.feedback).0 * TAU));
        self.last = self.out;
        self.osc.process();
        self.out = self.osc.output() * self.env.step() * self.amp.0;
    }
    #[inline]
    fn output(&self) -> Signal {
        self.out
    }
}

impl<O: Oscillator> Modifier for Operator<O> {
    #[inline]
    fn input(&mut self, x: Signal) {
        self.input = x;
    }
}

/// Runtime-selectable oscillator.
#[derive(Clone)]
pub enum Waveform {
    Sine(fast::Sine),
    Saw(fast::Saw),
    Triangle(fast::Triangle),
    Square(fast::Square),
    Pulse(fast::Pulse),
    Noise(fast::Noise),
    Wavetable(Wavetable),
}

impl Generator for Waveform {
    type Out = Signal;
    #[inline]
    fn process(&mut self) {
        match self {
            Waveform::Sine(o) => o.process(),
            Waveform::Saw(o) => o.process(),
            Waveform::Triangle(o) => o.process(),
            Waveform::Square(o) => o.process(),
            Waveform::Pulse(o) => o.process(),
            Waveform::Noise(o) => o.process(),
            Waveform::Wavetable(o) => o.process(),
        }
    }
    #[inline]
    fn output(&self) -> Signal {
        match self {
            Waveform::Sine(o) => o.output(),
            Waveform::Saw(o) => o.output(),
            Waveform::Triangle(o) => o.output(),
            Waveform::Square(o) => o.output(),
            Waveform::Pulse(o) => o.output(),
            Waveform::Noise(o) => o.output(),
            Waveform::Wavetable(o) => o.output(),
        }
    }
}

impl Oscillator for Waveform {
    fn reset(&mut self) {
        match self {
            Waveform::Sine(o) => o.reset(),
            Waveform::Saw(o) => o.reset(),
            Waveform::Triangle(o) => o.reset(),
            Waveform::Square(o) => o.reset(),
            Waveform::Pulse(o) => o.reset(),
            Waveform::Noise(_) => {}
            Waveform::Wavetable(o) => o.reset(),
        }
    }
    fn set_sample_rate(&mut self, fs: SampleRate) {
        match self {
            Waveform::Sine(o) => o.set_sample_rate(fs),
            Waveform::Saw(o) => o.set_sample_rate(fs),
            Waveform::Triangle(o) => o.set_sample_rate(fs),
            Waveform::Square(o) => o.set_sample_rate(fs),
            Waveform::Pulse(o) => o.set_sample_rate(fs),
            Waveform::Noise(_) => {}
            Waveform::Wavetable(o) => o.set_sample_rate(fs),
        }
    }
    fn set_frequency(&mut self, frequency: Frequency) {
        match self {
            Waveform::Sine(o) => o.set_frequency(frequency),
            Waveform::Saw(o) => o.set_frequency(frequency),
            Waveform::Triangle(o) => o.set_frequency(frequency),
            Waveform::Square(o) => o.set_frequency(frequency),
            Waveform::Pulse(o) => o.set_frequency(frequency),
            Waveform::Noise(_) => {}
            Waveform::Wavetable(o) => o.set_frequency(frequency),
        }
    }
    fn set_phase(&mut self, phase: Phase) {
        match self {
            Waveform::Sine(o) => o.set_phase(phase),
            Waveform::Saw(o) => o.set_phase(phase),
            Waveform::Triangle(o) => o.set_phase(phase),
            Waveform::Square(o) => o.set_phase(phase),
            Waveform::Pulse(o) => o.set_phase(phase),
            Waveform::Noise(_) => {}
            Waveform::Wavetable(o) => o.set_phase(phase),
        }
    }
    fn set_offset(&mut self, offset: Phase) {
        match self {
            Waveform::Sine(o) => o.set_offset(offset),
            Waveform::Saw(o) => o.set_offset(offset),
            Waveform::Triangle(o) => o.set_offset(offset),
            Waveform::Square(o) => o.set_offset(offset),
            Waveform::Pulse(o) => o.set_offset(offset),
            Waveform::Noise(_) => {}
            Waveform::Wavetable(o) => o.set_offset(offset),
        }
    }
    fn frequency(&self) -> Frequency {
        match self {
            Waveform::Sine(o) => o.frequency(),
            Waveform::Saw(o) => o.frequency(),
            Waveform::Triangle(o) => o.frequency(),
            Waveform::Square(o) => o.frequency(),
            Waveform::Pulse(o) => o.frequency(),
            Waveform::Noise(_) => Frequency(0.0),
            Waveform::Wavetable(o) => o.frequency(),
        }
    }
}
