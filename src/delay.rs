//! Fractional-tap ring-buffer delay.

use super::buffer::Buffer;
use super::flow::{Generator, Modifier};
use super::signal::Signal;

/// A delay line of `capacity` samples with a fractional read tap.
///
/// The ring is stored in a power-of-two masked [`Buffer`], so reads cannot
/// escape the allocation. Writing advances a position counter modulo the
/// capacity; reading `d` samples into the past linearly interpolates the two
/// adjacent samples. Delay times above the capacity clamp (and assert in
/// debug builds).
#[derive(Clone, Debug)]
pub struct Delay {
    buffer: Buffer,
    capacity: usize,
    time: f32,
    position: usize,
    input: Signal,
    out: Signal,
}

impl Delay {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Delay {
            buffer: Buffer::new(capacity + 1),
            capacity,
            time: 1.0,
            position: 0,
            input: Signal::default(),
            out: Signal::default(),
        }
    }

    /// Zero the delay memory.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.position = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the delay time in samples, clamped to the capacity.
    pub fn set(&mut self, delay: f32) {
        debug_assert!(delay <= self.capacity as f32);
        self.time = delay.clamp(0.0, self.capacity as f32);
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Write a sample into the ring and advance.
    #[inline]
    pub fn write(&mut self, x: Signal) {
        self.buffer.set_at(self.position, x);
        self.position += 1;
        if self.position >= self.capacity {
            self.position = 0;
        }
    }

    /// Read `delay` samples into the past with linear interpolation.
    #[inline]
    pub fn tap(&self, delay: f32) -> Signal {
        let mut read = (self.position as f32 - 1.0) - delay;
        while read < 0.0 {
            read += self.capacity as f32;
        }
        let f = read.floor();
        let frac = read - f;
        let i = f as usize;
        let j = if i >= self.capacity - 1 { 0 } else { i + 1 };
        self.buffer.at(i) * (1.0 - frac) + self.buffer.at(j) * frac
    }
}

impl Generator for Delay {
    type Out = Signal;
    #[inline]
    fn process(&mut self) {
        self.write(self.input);
        self.out = self.tap(self.time);
    }
    #[inline]
    fn output(&self) -> Signal {
        self.out
    }
}

impl Modifier for Delay {
    #[inline]
    fn input(&mut self, x: Signal) {
        self.input = x;
    }
}
