//! Flat re-exports of the framework surface.

pub use super::buffer::Buffer;
pub use super::control::{
    button, dial, menu, meter, mod_wheel, pitch_bend, preset, slider, toggle, Caption, Control,
    ControlKind, Controls, Options, Presets, Program, Rect, Table, Values,
};
pub use super::delay::Delay;
pub use super::envelope::{
    dx, Adsr, DxRamp, Envelope, Linear, Loop, Mode, Point, Ramp, Stage as EnvelopeStage,
};
pub use super::filter::{biquad, butterworth, onepole, Iir};
pub use super::flow::{Bypass, Generator, Modifier, Oscillator};
pub use super::graph::{
    console_has_text, console_take, console_write, with_debug, with_graph, Content, DebugBuffer,
    Graph, Tap,
};
pub use super::math::*;
pub use super::note::{Note, NoteBase, Stage, Voices, MAX_VOICES};
pub use super::oscillator::{basic, fast, Operator, Waveform};
pub use super::param::{
    Amplitude, Db, Delta, Frequency, Param, Phase, Pitch, Velocity,
};
pub use super::phase::{Increment32, Phase32, Phase64, F_C4};
pub use super::signal::{
    as_floats, as_signals, as_signals_mut, Sample, Signal, Signals, Stereo,
};
pub use super::synth::{
    Effect, Events, Message, Plugin, StereoEffect, Synth, EVENT_CAPACITY, MAX_BLOCK,
};
pub use super::wavetable::{self, Wavetable};
pub use super::{SampleRate, DEFAULT_SR};
