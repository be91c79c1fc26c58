//! Synth shell tests: voice allocation, stealing, event ordering and the
//! allocation-free audio path.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};
use minisyn::prelude::*;

#[global_allocator]
static ALLOCATOR: AllocDisabler = AllocDisabler;

/// A sine voice with an ADSR release tail.
struct SineVoice {
    base: NoteBase,
    osc: fast::Sine,
    env: Adsr,
}

impl SineVoice {
    fn new(fs: SampleRate) -> Self {
        SineVoice {
            base: NoteBase::default(),
            osc: fast::Sine::new(fs),
            env: Adsr::new(fs),
        }
    }
}

impl Note for SineVoice {
    type Out = Signal;

    fn base(&self) -> &NoteBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NoteBase {
        &mut self.base
    }

    fn on(&mut self, pitch: Pitch, velocity: Velocity, _controls: &Controls) {
        self.osc.reset();
        self.osc.set_frequency(pitch.frequency());
        self.env.set(0.001, 0.001, velocity.0, 0.02);
    }

    fn off(&mut self, _velocity: Velocity, _controls: &Controls) {
        self.env.release();
    }

    fn process(&mut self, _controls: &Controls) -> Signal {
        let out = self.osc.generate() * self.env.step();
        if self.env.finished() {
            self.stop();
        }
        out
    }
}

fn make_synth(voice_count: usize) -> Synth<SineVoice> {
    let fs = SampleRate::new(48000.0);
    let mut synth = Synth::new(fs);
    synth.voices.add_voices(voice_count, || SineVoice::new(fs));
    synth
}

#[test]
fn test_notes_sound_and_sum() {
    let mut synth = make_synth(4);
    synth.note_on(60, 100);
    synth.note_on(67, 100);
    let mut left = vec![0.0f32; 1024];
    let mut right = vec![0.0f32; 1024];
    synth.process(&mut left, &mut right);
    let energy: f32 = left.iter().map(|x| x.abs()).sum();
    assert!(energy > 10.0, "synth is silent: {energy}");
    assert_eq!(left, right);
}

#[test]
fn test_voice_stealing_takes_the_oldest() {
    let mut synth = make_synth(4);
    for pitch in [60, 62, 64, 65] {
        synth.note_on(pitch, 100);
    }
    let mut left = vec![0.0f32; 64];
    let mut right = vec![0.0f32; 64];
    synth.process(&mut left, &mut right);
    for (slot, pitch) in [60.0, 62.0, 64.0, 65.0].iter().enumerate() {
        assert_eq!(synth.voices[slot].pitch().0, *pitch);
    }

    // A fifth note steals the oldest voice and restarts it.
    synth.note_on(67, 100);
    synth.process(&mut left, &mut right);
    assert_eq!(synth.voices[0].pitch().0, 67.0);
    assert_eq!(synth.voices[0].stage(), Stage::Sustain);
    for (slot, pitch) in [62.0, 64.0, 65.0].iter().enumerate() {
        assert_eq!(synth.voices[slot + 1].pitch().0, *pitch);
        assert_eq!(synth.voices[slot + 1].stage(), Stage::Sustain);
    }
}

#[test]
fn test_released_voices_are_preferred_for_stealing() {
    let mut synth = make_synth(2);
    synth.note_on(60, 100);
    synth.note_on(62, 100);
    synth.note_off(62, 0);
    let mut left = vec![0.0f32; 64];
    let mut right = vec![0.0f32; 64];
    synth.process(&mut left, &mut right);
    assert_eq!(synth.voices[1].stage(), Stage::Release);

    synth.note_on(64, 100);
    synth.process(&mut left, &mut right);
    assert_eq!(synth.voices[1].pitch().0, 64.0);
    assert_eq!(synth.voices[0].pitch().0, 60.0);
    assert_eq!(synth.voices[0].stage(), Stage::Sustain);
}

#[test]
fn test_note_off_during_off_is_harmless() {
    let mut synth = make_synth(2);
    synth.note_off(60, 0);
    let mut left = vec![0.0f32; 32];
    let mut right = vec![0.0f32; 32];
    synth.process(&mut left, &mut right);
    assert!(left.iter().all(|&x| x == 0.0));
}

#[test]
fn test_release_tail_then_self_termination() {
    let mut synth = make_synth(1);
    synth.note_on(69, 127);
    let mut left = vec![0.0f32; 480];
    let mut right = vec![0.0f32; 480];
    synth.process(&mut left, &mut right);
    assert_eq!(synth.voices[0].stage(), Stage::Sustain);

    synth.note_off(69, 0);
    synth.process(&mut left, &mut right);
    // 10 ms block: the 20 ms release tail is still sounding.
    assert_eq!(synth.voices[0].stage(), Stage::Release);
    let tail: f32 = left.iter().map(|x| x.abs()).sum();
    assert!(tail > 0.0, "release tail is silent");

    // Further blocks pass the end of the release; the voice stops itself.
    synth.process(&mut left, &mut right);
    synth.process(&mut left, &mut right);
    assert_eq!(synth.voices[0].stage(), Stage::Off);
    synth.process(&mut left, &mut right);
    assert!(left.iter().all(|&x| x == 0.0), "off voice must be silent");
}

#[test]
fn test_events_apply_in_insertion_order() {
    let mut synth = make_synth(2);
    let events = synth.events();
    // On and immediately off within the same block: the voice must end up
    // released, not restarted.
    events.note_on(60, 100);
    events.note_off(60, 0);
    let mut left = vec![0.0f32; 32];
    let mut right = vec![0.0f32; 32];
    synth.process(&mut left, &mut right);
    assert_ne!(synth.voices[0].stage(), Stage::Sustain);
}

#[test]
fn test_event_queue_drops_when_full() {
    let synth = make_synth(1);
    let events = synth.events();
    let mut accepted = 0;
    for _ in 0..EVENT_CAPACITY + 100 {
        if events.note_on(60, 1) {
            accepted += 1;
        }
    }
    assert!(accepted <= EVENT_CAPACITY);
    assert!(accepted >= EVENT_CAPACITY - 1);
}

#[test]
fn test_audio_path_does_not_allocate() {
    let mut synth = make_synth(8);
    for pitch in [60, 64, 67, 71] {
        synth.note_on(pitch, 100);
    }
    let mut left = vec![0.0f32; 512];
    let mut right = vec![0.0f32; 512];
    // Warm-up block, then the steady state must be allocation free.
    synth.process(&mut left, &mut right);
    synth.note_on(72, 100);
    assert_no_alloc(|| {
        synth.process(&mut left, &mut right);
    });
}

#[test]
fn test_master_section_processes_the_sum() {
    struct HalfGain {
        input: Stereo,
        out: Stereo,
    }
    impl Generator for HalfGain {
        type Out = Stereo;
        fn process(&mut self) {
            self.out = self.input * 0.5;
        }
        fn output(&self) -> Stereo {
            self.out
        }
    }
    impl Modifier for HalfGain {
        fn input(&mut self, x: Stereo) {
            self.input = x;
        }
    }

    let fs = SampleRate::new(48000.0);
    let mut plain = make_synth(1);
    let mut mastered: Synth<SineVoice, HalfGain> = Synth::with_master(
        fs,
        HalfGain {
            input: Stereo::default(),
            out: Stereo::default(),
        },
    );
    mastered.voices.add_voices(1, || SineVoice::new(fs));

    plain.note_on(60, 127);
    mastered.note_on(60, 127);
    let mut left_a = vec![0.0f32; 256];
    let mut right_a = vec![0.0f32; 256];
    let mut left_b = vec![0.0f32; 256];
    let mut right_b = vec![0.0f32; 256];
    plain.process(&mut left_a, &mut right_a);
    mastered.process(&mut left_b, &mut right_b);
    for i in 0..256 {
        assert!((left_a[i] * 0.5 - left_b[i]).abs() < 1e-6, "sample {i}");
    }
}

#[test]
fn test_stereo_effect_drives_planar_channels() {
    /// Swaps the channels and applies a gain control.
    struct Swap {
        plugin: Plugin,
        input: Stereo,
        out: Stereo,
    }
    impl Generator for Swap {
        type Out = Stereo;
        fn process(&mut self) {
            let gain = self.plugin.controls.value(0);
            self.out = Stereo {
                l: self.input.r * gain,
                r: self.input.l * gain,
            };
        }
        fn output(&self) -> Stereo {
            self.out
        }
    }
    impl Modifier for Swap {
        fn input(&mut self, x: Stereo) {
            self.input = x;
        }
    }
    impl StereoEffect for Swap {
        fn plugin(&self) -> &Plugin {
            &self.plugin
        }
        fn plugin_mut(&mut self) -> &mut Plugin {
            &mut self.plugin
        }
    }

    let mut effect = Swap {
        plugin: Plugin::default(),
        input: Stereo::default(),
        out: Stereo::default(),
    };
    effect.plugin.controls.add(dial("Gain", 0.0, 2.0, 2.0));
    let input_left = [1.0f32, 2.0, 3.0];
    let input_right = [0.0f32, -1.0, -2.0];
    let mut left = [0.0f32; 3];
    let mut right = [0.0f32; 3];
    effect.process_replacing(
        (&input_left, &input_right),
        (&mut left, &mut right),
    );
    assert_eq!(left, [0.0, -2.0, -4.0]);
    assert_eq!(right, [2.0, 4.0, 6.0]);
}

#[test]
fn test_mono_render_matches_left_channel() {
    let mut stereo = make_synth(2);
    let mut mono = make_synth(2);
    stereo.note_on(60, 100);
    mono.note_on(60, 100);
    let mut left = vec![0.0f32; 256];
    let mut right = vec![0.0f32; 256];
    let mut buffer = vec![0.0f32; 256];
    stereo.process(&mut left, &mut right);
    mono.process_mono(&mut buffer);
    assert_eq!(buffer, left);
}
