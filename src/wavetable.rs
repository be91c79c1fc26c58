//! Wavetable oscillator: a sampled period read back with fractional
//! interpolation.

use super::buffer::Buffer;
use super::flow::{Generator, Oscillator};
use super::math::TAU;
use super::oscillator::basic;
use super::param::{Delta, Frequency, Param, Phase};
use super::signal::Signal;
use super::SampleRate;
use lazy_static::lazy_static;

/// A periodic source holding one sampled cycle of `size` samples.
///
/// The table is filled by running any oscillator at `fs / size` Hz for one
/// period. Output reads the fractional position with linear interpolation,
/// wrapping at the table boundary; the per-sample increment is
/// `frequency * size / fs`.
#[derive(Clone)]
pub struct Wavetable {
    buffer: Buffer,
    size: usize,
    frequency: Frequency,
    increment: f32,
    position: Param,
    offset: f32,
    fs: SampleRate,
    out: Signal,
}

impl Wavetable {
    pub const DEFAULT_SIZE: usize = 2048;

    pub fn new(fs: SampleRate) -> Self {
        Wavetable::with_size(fs, Wavetable::DEFAULT_SIZE)
    }

    pub fn with_size(fs: SampleRate, size: usize) -> Self {
        assert!(size > 1);
        Wavetable {
            buffer: Buffer::new(size),
            size,
            frequency: Frequency(0.0),
            increment: 0.0,
            position: Param::default(),
            offset: 0.0,
            fs,
            out: Signal::default(),
        }
    }

    /// Build a table by sampling `osc` for one period.
    pub fn from_oscillator(osc: &mut impl Oscillator, fs: SampleRate, size: usize) -> Self {
        let mut table = Wavetable::with_size(fs, size);
        table.fill(osc);
        table
    }

    /// Build a table from one precomputed cycle.
    pub fn from_samples(fs: SampleRate, samples: &[f32]) -> Self {
        let mut table = Wavetable::with_size(fs, samples.len());
        for (i, &x) in samples.iter().enumerate() {
            table.buffer.set_at(i, Signal(x));
        }
        table
    }

    /// Refill the table by sampling `osc` at one cycle per table length.
    pub fn fill(&mut self, osc: &mut impl Oscillator) {
        osc.set_sample_rate(self.fs);
        osc.set_frequency(Frequency(self.fs.f / self.size as f32));
        for i in 0..self.size {
            self.buffer.set_at(i, osc.generate());
        }
    }

    /// Table sample at `index`.
    pub fn at(&self, index: usize) -> Signal {
        self.buffer.at(index)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Generator for Wavetable {
    type Out = Signal;
    #[inline]
    fn process(&mut self) {
        self.position += Delta::with_modulus(self.increment, self.size as f32);
        let mut index = self.position.value() + self.offset;
        if index >= self.size as f32 {
            index -= self.size as f32;
        }
        self.out = self.buffer.at_frac(index);
    }
    #[inline]
    fn output(&self) -> Signal {
        self.out
    }
}

impl Oscillator for Wavetable {
    fn reset(&mut self) {
        self.position = Param::default();
    }
    fn set_sample_rate(&mut self, fs: SampleRate) {
        self.fs = fs;
        self.increment = self.frequency.0 * self.size as f32 / fs.f;
    }
    fn set_frequency(&mut self, frequency: Frequency) {
        self.frequency = frequency;
        self.increment = frequency.0 * self.size as f32 / self.fs.f;
    }
    fn set_phase(&mut self, phase: Phase) {
        self.position = Param::new(phase.radians() / TAU * self.size as f32);
    }
    fn set_offset(&mut self, offset: Phase) {
        self.offset = offset.radians() / TAU * self.size as f32;
    }
    fn frequency(&self) -> Frequency {
        self.frequency
    }
}

lazy_static! {
    static ref SINE_CYCLE: Vec<f32> = sample_cycle(|fs| basic::Sine::new(fs));
    static ref SAW_CYCLE: Vec<f32> = sample_cycle(|fs| basic::Saw::new(fs));
}

fn sample_cycle<O: Oscillator>(make: impl Fn(SampleRate) -> O) -> Vec<f32> {
    let fs = SampleRate::default();
    let mut osc = make(fs);
    osc.set_frequency(Frequency(fs.f / Wavetable::DEFAULT_SIZE as f32));
    (0..Wavetable::DEFAULT_SIZE)
        .map(|_| osc.generate().0)
        .collect()
}

/// Wavetable holding one shared sine cycle.
pub fn sine(fs: SampleRate) -> Wavetable {
    Wavetable::from_samples(fs, &SINE_CYCLE)
}

/// Wavetable holding one shared sawtooth cycle.
pub fn saw(fs: SampleRate) -> Wavetable {
    Wavetable::from_samples(fs, &SAW_CYCLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PI;

    #[test]
    fn table_filled_from_sine_reads_back_the_sine() {
        let fs = SampleRate::new(48000.0);
        let mut osc = basic::Sine::new(fs);
        let table = Wavetable::from_oscillator(&mut osc, fs, 256);
        for i in 0..256 {
            let expected = (TAU * i as f32 / 256.0).sin();
            assert!(
                (table.at(i).0 - expected).abs() < 1e-5,
                "index {i}: {} vs {expected}",
                table.at(i).0
            );
        }
    }

    #[test]
    fn reads_at_oscillator_rate() {
        let fs = SampleRate::new(48000.0);
        let mut table = sine(fs);
        table.set_frequency(Frequency(480.0));
        // One cycle is 100 samples at 480 Hz.
        let mut last = table.generate().0;
        let mut rising = 0;
        for _ in 0..50 {
            let x = table.generate().0;
            if x > last {
                rising += 1;
            }
            last = x;
        }
        assert!(rising >= 20);
    }

    #[test]
    fn phase_offset_shifts_the_read_position() {
        let fs = SampleRate::new(48000.0);
        let mut a = sine(fs);
        let mut b = sine(fs);
        a.set_frequency(Frequency(100.0));
        b.set_frequency(Frequency(100.0));
        b.set_offset(Phase::new(PI));
        let x = a.generate().0;
        let y = b.generate().0;
        assert!((x + y).abs() < 1e-2);
    }
}
