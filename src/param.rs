//! Control parameters and typed units with explicit conversion.

use super::math::*;
use super::signal::Signal;
use crate::control::Caption;
use duplicate::duplicate_item;
use core::ops::{Add, AddAssign, Deref, DerefMut, Div, Mul, Sub};

/// A signal used as a control value, possibly updated at audio rate.
///
/// Besides the plain signal algebra, a param supports a phase-increment add
/// that wraps at a configurable modulus (default `2 * PI`); see [`Delta`].
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Param(pub Signal);

const _: () = assert!(core::mem::size_of::<Param>() == core::mem::size_of::<f32>());

impl Param {
    #[inline]
    pub fn new(value: f32) -> Self {
        Param(Signal(value))
    }

    #[inline]
    pub fn value(self) -> f32 {
        self.0 .0
    }
}

impl Deref for Param {
    type Target = Signal;
    #[inline]
    fn deref(&self) -> &Signal {
        &self.0
    }
}

impl DerefMut for Param {
    #[inline]
    fn deref_mut(&mut self) -> &mut Signal {
        &mut self.0
    }
}

#[duplicate_item(scalar; [f32]; [f64]; [i32])]
impl From<scalar> for Param {
    #[inline]
    fn from(x: scalar) -> Self {
        Param(Signal(x as f32))
    }
}

impl From<Signal> for Param {
    #[inline]
    fn from(x: Signal) -> Self {
        Param(x)
    }
}

impl From<Param> for f32 {
    #[inline]
    fn from(x: Param) -> Self {
        x.value()
    }
}

/// A wrapping increment for a [`Param`] or [`Phase`]: adds `amount` and wraps
/// the result at `modulus`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Delta {
    pub amount: f32,
    pub modulus: f32,
}

impl Delta {
    /// Increment wrapping at `2 * PI`.
    #[inline]
    pub fn new(amount: f32) -> Self {
        Delta {
            amount,
            modulus: TAU,
        }
    }

    #[inline]
    pub fn with_modulus(amount: f32, modulus: f32) -> Self {
        Delta { amount, modulus }
    }
}

impl AddAssign<Delta> for Param {
    #[inline]
    fn add_assign(&mut self, d: Delta) {
        self.0 .0 += d.amount;
        if self.0 .0 >= d.modulus {
            self.0 .0 -= d.modulus;
        }
    }
}

/// Phase parameter in radians, wrapping at `2 * PI`.
///
/// An increment of a full turn or more leaves the phase unchanged.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Phase(pub f32);

impl Phase {
    #[inline]
    pub fn new(radians: f32) -> Self {
        Phase(radians)
    }

    #[inline]
    pub fn radians(self) -> f32 {
        self.0
    }

    /// Phase reduced by `modulus` using the fast mantissa trick.
    #[inline]
    pub fn rem(self, modulus: f32) -> Phase {
        Phase(fast_mod(self.0, modulus))
    }
}

impl AddAssign<f32> for Phase {
    #[inline]
    fn add_assign(&mut self, increment: f32) {
        if increment >= TAU {
            return;
        }
        self.0 += increment;
        if self.0 > TAU {
            self.0 -= TAU;
        }
    }
}

impl AddAssign<Delta> for Phase {
    #[inline]
    fn add_assign(&mut self, d: Delta) {
        if d.amount >= d.modulus {
            return;
        }
        self.0 += d.amount;
        if self.0 > d.modulus {
            self.0 -= d.modulus;
        }
    }
}

impl Add<Delta> for Phase {
    type Output = Phase;
    #[inline]
    fn add(self, d: Delta) -> Phase {
        let mut p = self;
        p += d;
        p
    }
}

/// Pitch as a MIDI note number in 0..=127, fractional values allowed.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Pitch(pub f32);

impl Pitch {
    #[inline]
    pub fn new(note: f32) -> Self {
        Pitch(note)
    }

    /// Equal-tempered frequency, A4 = 440 Hz.
    #[inline]
    pub fn frequency(self) -> Frequency {
        Frequency(midi_hz(self.0))
    }

    /// Pitch class and octave, e.g. "A4" or "C#/Db5".
    pub fn text(self) -> Caption {
        const NOTES: [&str; 12] = [
            "C", "C#/Db", "D", "D#/Eb", "E", "F", "F#/Gb", "G", "G#/Ab", "A", "A#/Bb", "B",
        ];
        let note = self.0 as i32;
        let mut caption = Caption::from(NOTES[(note % 12) as usize]);
        caption.push_i32(note / 12);
        caption
    }
}

impl Default for Pitch {
    fn default() -> Self {
        Pitch(60.0)
    }
}

impl From<u8> for Pitch {
    #[inline]
    fn from(note: u8) -> Self {
        Pitch(note as f32)
    }
}

#[duplicate_item(scalar; [f32]; [f64]; [i32])]
impl Add<scalar> for Pitch {
    type Output = Pitch;
    #[inline]
    fn add(self, x: scalar) -> Pitch {
        Pitch(self.0 + x as f32)
    }
}

#[duplicate_item(scalar; [f32]; [f64]; [i32])]
impl Sub<scalar> for Pitch {
    type Output = Pitch;
    #[inline]
    fn sub(self, x: scalar) -> Pitch {
        Pitch(self.0 - x as f32)
    }
}

/// Frequency in Hz.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Frequency(pub f32);

impl Frequency {
    #[inline]
    pub fn new(hz: f32) -> Self {
        Frequency(hz)
    }

    #[inline]
    pub fn hz(self) -> f32 {
        self.0
    }

    /// MIDI note number of the frequency.
    #[inline]
    pub fn pitch(self) -> Pitch {
        Pitch(hz_midi(self.0))
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency(1000.0)
    }
}

impl From<f32> for Frequency {
    #[inline]
    fn from(hz: f32) -> Self {
        Frequency(hz)
    }
}

#[duplicate_item(scalar; [f32]; [f64]; [i32])]
impl Mul<scalar> for Frequency {
    type Output = Frequency;
    #[inline]
    fn mul(self, x: scalar) -> Frequency {
        Frequency(self.0 * x as f32)
    }
}

#[duplicate_item(scalar; [f32]; [f64]; [i32])]
impl Div<scalar> for Frequency {
    type Output = Frequency;
    #[inline]
    fn div(self, x: scalar) -> Frequency {
        Frequency(self.0 / x as f32)
    }
}

/// Linear amplitude. Unity gain is 1.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Amplitude(pub f32);

impl Amplitude {
    #[inline]
    pub fn new(gain: f32) -> Self {
        Amplitude(gain)
    }

    /// Logarithmic gain, `20 * log10(amplitude)`.
    #[inline]
    pub fn db(self) -> Db {
        Db(amp_db(self.0))
    }
}

impl Default for Amplitude {
    fn default() -> Self {
        Amplitude(1.0)
    }
}

impl From<f32> for Amplitude {
    #[inline]
    fn from(gain: f32) -> Self {
        Amplitude(gain)
    }
}

impl From<Db> for Amplitude {
    #[inline]
    fn from(db: Db) -> Self {
        db.amplitude()
    }
}

impl Mul<Signal> for Amplitude {
    type Output = Signal;
    #[inline]
    fn mul(self, x: Signal) -> Signal {
        x * self.0
    }
}

impl Mul<Amplitude> for Signal {
    type Output = Signal;
    #[inline]
    fn mul(self, x: Amplitude) -> Signal {
        self * x.0
    }
}

/// Gain in decibels. 0 dB is unity.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Db(pub f32);

impl Db {
    #[inline]
    pub fn new(db: f32) -> Self {
        Db(db)
    }

    /// Linear gain, `10 ^ (dB / 20)`.
    #[inline]
    pub fn amplitude(self) -> Amplitude {
        Amplitude(db_amp(self.0))
    }
}

impl From<Amplitude> for Db {
    #[inline]
    fn from(a: Amplitude) -> Self {
        a.db()
    }
}

/// Note velocity, expressed as linear amplitude.
pub type Velocity = Amplitude;
