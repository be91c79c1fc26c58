//! Oscillator tests: fast sine accuracy, OSM saw statistics and band
//! limiting.

use funutd::Rnd;
use minisyn::prelude::*;
use realfft::RealFftPlanner;

#[test]
fn test_fast_sine_matches_reference() {
    let mut rnd = Rnd::from_u64(42);
    for _ in 0..1000 {
        let x = rnd.f32_in(0.0, TAU);
        let fast = fastsin(x);
        let reference = x.sin();
        assert!(
            (fast - reference).abs() < 1e-5,
            "x = {x}: {fast} vs {reference}"
        );
    }
}

#[test]
fn test_fast_sine_integer_phase_matches_reference() {
    let mut rnd = Rnd::from_u64(43);
    for _ in 0..1000 {
        let x = rnd.f32_in(0.0, TAU);
        let p = Phase32::from_radians(x);
        let fast = fastsinp(p.bits);
        let reference = x.sin();
        assert!(
            (fast - reference).abs() < 1e-5,
            "x = {x}: {fast} vs {reference}"
        );
    }
}

#[test]
fn test_fast_sine_oscillator_tracks_frequency() {
    let fs = SampleRate::new(48000.0);
    let mut osc = fast::Sine::new(fs);
    osc.set_frequency(Frequency(440.0));
    // Count zero crossings over one second: expect two per cycle.
    let mut crossings = 0;
    let mut last = osc.generate().0;
    for _ in 0..48000 {
        let x = osc.generate().0;
        if (last < 0.0) != (x < 0.0) {
            crossings += 1;
        }
        last = x;
    }
    assert!((878..=882).contains(&crossings), "{crossings} crossings");
}

#[test]
fn test_osm_saw_mean_magnitude() {
    let fs = SampleRate::new(48000.0);
    let mut saw = fast::Saw::new(fs);
    saw.set_frequency(Frequency(200.0));
    let mut sum = 0.0f32;
    for _ in 0..480 {
        sum += saw.generate().0.abs();
    }
    let mean = sum / 480.0;
    assert!((0.45..=0.55).contains(&mean), "mean magnitude {mean}");
}

#[test]
fn test_osm_saw_has_no_dc() {
    let fs = SampleRate::new(48000.0);
    let mut saw = fast::Saw::new(fs);
    saw.set_frequency(Frequency(200.0));
    // Average over exactly one period (240 samples at 200 Hz).
    let mut sum = 0.0f32;
    for _ in 0..240 {
        sum += saw.generate().0;
    }
    let dc = sum / 240.0;
    assert!(dc.abs() < 0.05, "dc component {dc}");
}

#[test]
fn test_osm_square_alternates() {
    let fs = SampleRate::new(48000.0);
    let mut square = fast::Square::new(fs);
    square.set_frequency(Frequency(1000.0));
    let mut high = 0;
    let mut low = 0;
    for _ in 0..4800 {
        let x = square.generate().0;
        if x > 0.5 {
            high += 1;
        } else if x < -0.5 {
            low += 1;
        }
    }
    // Roughly half the time in each state.
    assert!(high > 2000, "{high} high samples");
    assert!(low > 2000, "{low} low samples");
}

#[test]
fn test_pulse_duty_skews_the_waveform() {
    let fs = SampleRate::new(48000.0);
    let mut pulse = fast::Pulse::new(fs);
    pulse.set_frequency(Frequency(1000.0));
    let mut mean = 0.0f32;
    for _ in 0..4800 {
        mean += pulse.generate().0;
    }
    mean /= 4800.0;
    // A 25% high cycle sits well below zero on average.
    assert!(mean < -0.2, "mean {mean}");
}

/// Sum of spectral magnitudes outside the harmonic bins of `f0`.
fn alias_energy(samples: &[f32], fundamental_bin: usize) -> f32 {
    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(samples.len());
    let mut input = samples.to_vec();
    let mut spectrum = fft.make_output_vec();
    fft.process(&mut input, &mut spectrum)
        .expect("fft size mismatch");
    let mut energy = 0.0;
    for (bin, value) in spectrum.iter().enumerate().skip(2) {
        let distance = bin % fundamental_bin;
        let near_harmonic = distance <= 2 || distance >= fundamental_bin - 2;
        if !near_harmonic {
            energy += value.norm();
        }
    }
    energy
}

#[test]
fn test_osm_saw_is_band_limited() {
    let fs = SampleRate::new(48000.0);
    let n = 4800;
    // 5 kHz lands exactly on bin 500 of a 4800-point transform.
    let f0 = Frequency(5000.0);

    let mut naive = basic::Saw::new(fs);
    naive.set_frequency(f0);
    let naive_samples: Vec<f32> = (0..n).map(|_| naive.generate().0).collect();

    let mut osm = fast::Saw::new(fs);
    osm.set_frequency(f0);
    let osm_samples: Vec<f32> = (0..n).map(|_| osm.generate().0).collect();

    let naive_alias = alias_energy(&naive_samples, 500);
    let osm_alias = alias_energy(&osm_samples, 500);
    assert!(
        osm_alias < naive_alias * 0.5,
        "osm {osm_alias} vs naive {naive_alias}"
    );
}

#[test]
fn test_negative_frequency_mirrors_the_waveform() {
    let fs = SampleRate::new(48000.0);
    let mut forward = fast::Sine::new(fs);
    forward.set_frequency(Frequency(440.0));
    let mut backward = fast::Sine::new(fs);
    backward.set_frequency(Frequency(-440.0));
    for i in 0..1000 {
        let f = forward.generate().0;
        let b = backward.generate().0;
        assert!((f + b).abs() < 1e-4, "sample {i}: {f} vs {b}");
    }
}

#[test]
fn test_basic_oscillator_shapes() {
    let fs = SampleRate::new(48000.0);
    let mut saw = basic::Saw::new(fs);
    saw.set_frequency(Frequency(100.0));
    let first = saw.generate().0;
    assert!((first + 1.0).abs() < 1e-6, "saw starts at -1: {first}");

    let mut triangle = basic::Triangle::new(fs);
    triangle.set_frequency(Frequency(100.0));
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for _ in 0..960 {
        let x = triangle.generate().0;
        min = min.min(x);
        max = max.max(x);
    }
    assert!(min >= -1.0 - 1e-5 && min < -0.95, "triangle min {min}");
    assert!(max <= 1.0 + 1e-5 && max > 0.95, "triangle max {max}");
}
