//! Effect and synth shells: plugin metadata, event ingress and block
//! orchestration.
//!
//! Event producers (UI or host) push MIDI-like messages into a bounded
//! lock-free queue; the audio thread drains the queue, in insertion order,
//! at the start of each block before any audio is produced. The queue never
//! allocates after construction and drops events when full.

use super::control::{ControlKind, Controls, Presets};
use super::flow::{Bypass, Modifier};
use super::note::{Note, Stage, Voices};
use super::param::{Amplitude, Pitch, Velocity};
use super::signal::{Sample, Signal, Stereo};
use super::SampleRate;
use thingbuf::mpsc::blocking::{channel, Receiver, Sender};

/// One plug-in's data: control surface and preset bank.
#[derive(Clone, Debug, Default)]
pub struct Plugin {
    pub controls: Controls,
    pub presets: Presets,
}

impl Plugin {
    pub fn new(controls: Controls, presets: Presets) -> Self {
        Plugin { controls, presets }
    }

    /// Apply a stored program to the control values. Returns false for an
    /// unknown preset index.
    pub fn load_preset(&mut self, index: usize) -> bool {
        let Some(program) = self.presets.get(index) else {
            return false;
        };
        for (i, &value) in program.values.iter().enumerate() {
            self.controls.set(i, value);
        }
        true
    }
}

/// A sample-by-sample transformer with plugin metadata and block drivers.
///
/// Implementors provide the per-sample [`Modifier`] processing; the block
/// drivers iterate host channels in place. Channels are planar float slices.
pub trait Effect: Modifier<Out = Signal> {
    fn plugin(&self) -> &Plugin;
    fn plugin_mut(&mut self) -> &mut Plugin;

    /// Called once before each block.
    fn prepare(&mut self) {}

    /// A control value changed.
    fn on_control(&mut self, index: usize, value: f32) {
        let _ = (index, value);
    }

    /// A preset was loaded.
    fn on_preset(&mut self, index: usize) {
        let _ = index;
    }

    /// Host-facing parameter write: clamp into range, notify, and release
    /// push buttons.
    fn set_parameter(&mut self, index: usize, value: f32) {
        if index >= self.plugin().controls.len() {
            return;
        }
        self.plugin_mut().controls.set(index, value);
        let clamped = self.plugin().controls.value(index).0;
        self.on_control(index, clamped);
        if self.plugin().controls[index].kind == ControlKind::Button {
            self.plugin_mut().controls.set(index, 0.0);
        }
    }

    /// Host-facing preset load.
    fn load_preset(&mut self, index: usize) {
        if self.plugin_mut().load_preset(index) {
            self.on_preset(index);
        }
    }

    /// Process one channel in place.
    fn process_buffer(&mut self, io: &mut [f32]) {
        self.prepare();
        for sample in io.iter_mut() {
            *sample = self.modify(Signal(*sample)).0;
        }
    }

    /// Copy the input then process in place.
    fn process_replacing(&mut self, input: &[f32], output: &mut [f32]) {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        self.process_buffer(&mut output[..n]);
    }
}

/// Stereo counterpart of [`Effect`] over planar left/right channels.
pub trait StereoEffect: Modifier<Out = Stereo> {
    fn plugin(&self) -> &Plugin;
    fn plugin_mut(&mut self) -> &mut Plugin;

    fn prepare(&mut self) {}

    fn on_control(&mut self, index: usize, value: f32) {
        let _ = (index, value);
    }

    fn on_preset(&mut self, index: usize) {
        let _ = index;
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index >= self.plugin().controls.len() {
            return;
        }
        self.plugin_mut().controls.set(index, value);
        let clamped = self.plugin().controls.value(index).0;
        self.on_control(index, clamped);
        if self.plugin().controls[index].kind == ControlKind::Button {
            self.plugin_mut().controls.set(index, 0.0);
        }
    }

    fn load_preset(&mut self, index: usize) {
        if self.plugin_mut().load_preset(index) {
            self.on_preset(index);
        }
    }

    fn process_buffer(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.prepare();
        let n = left.len().min(right.len());
        for s in 0..n {
            let out = self.modify(Stereo::new(left[s], right[s]));
            left[s] = out.l.0;
            right[s] = out.r.0;
        }
    }

    fn process_replacing(
        &mut self,
        input: (&[f32], &[f32]),
        output: (&mut [f32], &mut [f32]),
    ) {
        let n = input.0.len().min(output.0.len());
        output.0[..n].copy_from_slice(&input.0[..n]);
        let m = input.1.len().min(output.1.len());
        output.1[..m].copy_from_slice(&input.1[..m]);
        self.process_buffer(output.0, output.1);
    }
}

/// MIDI-like message payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Message {
    #[default]
    None,
    NoteOn {
        pitch: u8,
        velocity: u8,
    },
    NoteOff {
        pitch: u8,
        velocity: u8,
    },
    ControlChange {
        controller: u8,
        value: u8,
    },
    PitchWheel {
        value: u16,
    },
}

/// Event queue capacity; the queue never reallocates.
pub const EVENT_CAPACITY: usize = 1024;

/// Cloneable producer handle for the event queue. Safe to use from other
/// threads; sends are non-blocking and drop when the queue is full.
#[derive(Clone)]
pub struct Events {
    tx: Sender<Message>,
}

impl Events {
    /// Queue a message. Returns false if the queue was full.
    pub fn send(&self, message: Message) -> bool {
        self.tx.try_send(message).is_ok()
    }

    pub fn note_on(&self, pitch: u8, velocity: u8) -> bool {
        self.send(Message::NoteOn {
            pitch: pitch & 0x7f,
            velocity: velocity & 0x7f,
        })
    }

    pub fn note_off(&self, pitch: u8, velocity: u8) -> bool {
        self.send(Message::NoteOff {
            pitch: pitch & 0x7f,
            velocity: velocity & 0x7f,
        })
    }

    pub fn control_change(&self, controller: u8, value: u8) -> bool {
        self.send(Message::ControlChange { controller, value })
    }

    pub fn pitch_wheel(&self, value: u16) -> bool {
        self.send(Message::PitchWheel { value })
    }
}

/// Largest chunk rendered at once; longer host blocks are split.
pub const MAX_BLOCK: usize = 8192;

/// Polyphonic synthesiser shell.
///
/// Owns the control surface, the voice bank, the event queue and a scratch
/// voice buffer. `process` drains queued events, renders each live voice
/// into the scratch buffer, sums into the output, then runs the master
/// section. Nothing here allocates after construction.
pub struct Synth<V: Note, E: Modifier<Out = Stereo> = Bypass> {
    pub plugin: Plugin,
    pub voices: Voices<V>,
    pub master: E,
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
    mono_right: Vec<f32>,
    fs: SampleRate,
}

impl<V: Note> Synth<V, Bypass> {
    pub fn new(fs: SampleRate) -> Self {
        Synth::with_master(fs, Bypass::default())
    }
}

impl<V: Note, E: Modifier<Out = Stereo>> Synth<V, E> {
    pub fn with_master(fs: SampleRate, master: E) -> Self {
        let (sender, receiver) = channel(EVENT_CAPACITY);
        Synth {
            plugin: Plugin::default(),
            voices: Voices::new(),
            master,
            sender,
            receiver,
            scratch_left: vec![0.0; MAX_BLOCK],
            scratch_right: vec![0.0; MAX_BLOCK],
            mono_right: vec![0.0; MAX_BLOCK],
            fs,
        }
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.fs
    }

    /// A cloneable producer handle for queueing events from other threads.
    pub fn events(&self) -> Events {
        Events {
            tx: self.sender.clone(),
        }
    }

    /// Queue a NoteOn for the next block.
    pub fn note_on(&self, pitch: u8, velocity: u8) -> bool {
        self.events().note_on(pitch, velocity)
    }

    /// Queue a NoteOff for the next block.
    pub fn note_off(&self, pitch: u8, velocity: u8) -> bool {
        self.events().note_off(pitch, velocity)
    }

    /// Host-facing parameter write: clamp into range and release buttons.
    pub fn set_parameter(&mut self, index: usize, value: f32) {
        if index >= self.plugin.controls.len() {
            return;
        }
        self.plugin.controls.set(index, value);
        if self.plugin.controls[index].kind == ControlKind::Button {
            self.plugin.controls.set(index, 0.0);
        }
    }

    pub fn load_preset(&mut self, index: usize) -> bool {
        self.plugin.load_preset(index)
    }

    /// Render a stereo block into planar output channels.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len().min(right.len());
        let mut start = 0;
        while start < n {
            let end = (start + MAX_BLOCK).min(n);
            self.process_block(&mut left[start..end], &mut right[start..end]);
            start = end;
        }
    }

    /// Render a mono block; voices render as usual and the left channel is
    /// kept.
    pub fn process_mono(&mut self, buffer: &mut [f32]) {
        let mut right = core::mem::take(&mut self.mono_right);
        let n = buffer.len();
        let mut start = 0;
        while start < n {
            let end = (start + MAX_BLOCK).min(n);
            let len = end - start;
            right[..len].fill(0.0);
            self.process_block(&mut buffer[start..end], &mut right[..len]);
            start = end;
        }
        self.mono_right = right;
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        // Consume queued messages, in insertion order, before any audio.
        while let Ok(message) = self.receiver.try_recv() {
            self.dispatch(message);
        }

        left.fill(0.0);
        right.fill(0.0);
        let n = left.len().min(right.len());

        for voice in self.voices.iter_mut() {
            if voice.stage() == Stage::Off {
                continue;
            }
            voice.prepare();
            self.scratch_left[..n].fill(0.0);
            self.scratch_right[..n].fill(0.0);
            for s in 0..n {
                if voice.finished() {
                    break;
                }
                let out = voice.process(&self.plugin.controls).to_stereo();
                self.scratch_left[s] = out.l.0;
                self.scratch_right[s] = out.r.0;
            }
            for s in 0..n {
                left[s] += self.scratch_left[s];
                right[s] += self.scratch_right[s];
            }
        }

        // Master section over the summed bus.
        for s in 0..n {
            let out = self.master.modify(Stereo::new(left[s], right[s]));
            left[s] = out.l.0;
            right[s] = out.r.0;
        }
    }

    /// Apply one message to the voice bank.
    pub fn dispatch(&mut self, message: Message) {
        match message {
            Message::NoteOn { pitch, velocity } => {
                if self.voices.is_empty() {
                    return;
                }
                let index = self.voices.assign();
                self.voices[index].start(
                    Pitch(pitch as f32),
                    Amplitude(velocity as f32 / 127.0),
                    &self.plugin.controls,
                );
            }
            Message::NoteOff { pitch, velocity } => {
                for voice in self.voices.iter_mut() {
                    if voice.stage() != Stage::Off && voice.pitch().0 as i32 == pitch as i32 {
                        voice.release(
                            Amplitude(velocity as f32 / 127.0),
                            &self.plugin.controls,
                        );
                    }
                }
            }
            Message::ControlChange { controller, value } => {
                for voice in self.voices.iter_mut() {
                    if voice.stage() != Stage::Off {
                        voice.control_change(controller as i32, value as i32);
                    }
                }
            }
            Message::PitchWheel { value } => {
                for voice in self.voices.iter_mut() {
                    if voice.stage() != Stage::Off {
                        voice.pitch_wheel(value);
                    }
                }
            }
            Message::None => {}
        }
    }
}
