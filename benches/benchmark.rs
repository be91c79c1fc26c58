use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minisyn::prelude::*;

fn sine_bench(samples: usize) -> f32 {
    let fs = SampleRate::new(44100.0);
    let mut osc = fast::Sine::new(fs);
    osc.set_frequency(Frequency(440.0));
    let mut sum = 0.0;
    for _ in 0..samples {
        sum += osc.generate().0;
    }
    sum
}

fn osm_saw_bench(samples: usize) -> f32 {
    let fs = SampleRate::new(44100.0);
    let mut osc = fast::Saw::new(fs);
    osc.set_frequency(Frequency(220.0));
    let mut sum = 0.0;
    for _ in 0..samples {
        sum += osc.generate().0;
    }
    sum
}

fn filter_chain_bench(samples: usize) -> f32 {
    let fs = SampleRate::new(44100.0);
    let mut noise = fast::Noise::from_seed(1);
    let mut lpf = biquad::Biquad::lpf(fs);
    lpf.set(2000.0, 0.707);
    let mut delay = Delay::new(4410);
    delay.set(2205.0);
    let mut out = Signal(0.0);
    for _ in 0..samples {
        (&mut noise >> &mut lpf >> &mut delay) >> &mut out;
    }
    out.0
}

struct BenchVoice {
    base: NoteBase,
    osc: fast::Saw,
    env: Adsr,
}

impl Note for BenchVoice {
    type Out = Signal;
    fn base(&self) -> &NoteBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut NoteBase {
        &mut self.base
    }
    fn on(&mut self, pitch: Pitch, velocity: Velocity, _controls: &Controls) {
        self.osc.set_frequency(pitch.frequency());
        self.env.set(0.005, 0.1, velocity.0, 0.2);
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

fn synth_bench(blocks: usize) -> f32 {
    let fs = SampleRate::new(44100.0);
    let mut synth: Synth<BenchVoice> = Synth::new(fs);
    synth.voices.add_voices(8, || BenchVoice {
        base: NoteBase::default(),
        osc: fast::Saw::new(fs),
        env: Adsr::new(fs),
    });
    for pitch in [48, 55, 60, 64, 67, 72] {
        synth.note_on(pitch, 100);
    }
    let mut left = [0.0f32; 512];
    let mut right = [0.0f32; 512];
    for _ in 0..blocks {
        synth.process(&mut left, &mut right);
    }
    left[0]
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("sine", |b| b.iter(|| sine_bench(black_box(44100))));
    c.bench_function("osm_saw", |b| b.iter(|| osm_saw_bench(black_box(44100))));
    c.bench_function("filter_chain", |b| {
        b.iter(|| filter_chain_bench(black_box(44100)))
    });
    c.bench_function("synth_8_voices", |b| b.iter(|| synth_bench(black_box(86))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
