//! Breakpoint envelopes, ramp kernels and the ADSR.
//!
//! An envelope is an ordered list of `(time, value)` breakpoints walked by a
//! [`Ramp`]. While in [`Stage::Sustain`] the envelope advances segment by
//! segment, honouring an optional loop window; [`Stage::Release`] retargets
//! toward a release level; [`Stage::Off`] holds. Breakpoint x values must be
//! non-decreasing.

use super::flow::Generator;
use super::signal::Signal;
use super::SampleRate;
use core::ops::Index;

/// Envelope lifecycle stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Sustain,
    Release,
    Off,
}

/// How breakpoint x values are interpreted when retargeting: as absolute
/// times in seconds, or as raw per-sample rates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Time,
    Rate,
}

/// An envelope breakpoint.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point { x, y }
    }
}

/// Loop window between two breakpoints, repeating while in Sustain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Loop {
    range: Option<(usize, usize)>,
}

impl Loop {
    pub fn set(&mut self, start: usize, end: usize) {
        self.range = Some((start, end));
    }

    pub fn reset(&mut self) {
        self.range = None;
    }

    pub fn is_active(&self) -> bool {
        self.range.is_some()
    }

    pub fn start(&self) -> usize {
        self.range.map_or(0, |(s, _)| s)
    }

    pub fn end(&self) -> usize {
        self.range.map_or(0, |(_, e)| e)
    }
}

/// Linear ramp toward a target value. Advancing clips at the target and
/// clears the active flag.
#[derive(Copy, Clone, Debug)]
pub struct Linear {
    out: f32,
    target: f32,
    rate: f32,
    active: bool,
}

impl Linear {
    pub fn new(value: f32) -> Self {
        Linear {
            out: value,
            target: value,
            rate: 0.0,
            active: false,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.out
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set a new target, retaining the rate.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        self.active = self.out != target;
    }

    /// Jump immediately to `value`, deactivating the ramp.
    pub fn set_value(&mut self, value: f32) {
        self.out = value;
        self.target = value;
        self.active = false;
    }

    /// Rate of change per sample.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Rate of change by duration in seconds.
    pub fn set_time(&mut self, time: f32, fs: SampleRate) {
        self.rate = if time != 0.0 { 1.0 / (time * fs.f) } else { 0.0 };
    }

    /// Return the current output, then advance toward the target.
    #[inline]
    pub fn step(&mut self) -> Signal {
        let output = self.out;
        if self.active {
            if self.target > self.out {
                self.out += self.rate;
                if self.out >= self.target {
                    self.out = self.target;
                    self.active = false;
                }
            } else {
                self.out -= self.rate;
                if self.out <= self.target {
                    self.out = self.target;
                    self.active = false;
                }
            }
        }
        Signal(output)
    }
}

impl Default for Linear {
    fn default() -> Self {
        Linear::new(1.0)
    }
}

/// Rate-quantized ramp: rates quantize to 64 steps, and the ramp advances
/// only on sample indices admitted by a bit-mask pattern, with further
/// skipping at the slowest rates.
#[derive(Copy, Clone, Debug)]
pub struct DxRamp {
    base: Linear,
    rising: bool,
    qrate: i32,
    shift: i32,
    i: u32,
    rate_scaling: i32,
    sr_mult: f32,
}

// Stepping patterns indexed by `qrate mod 4`.
const STEP_MASK: [[u8; 8]; 4] = [
    [0, 1, 0, 1, 0, 1, 0, 1],
    [0, 1, 0, 1, 0, 1, 1, 1],
    [0, 1, 1, 1, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 1],
];

impl DxRamp {
    pub fn new(fs: SampleRate) -> Self {
        DxRamp {
            base: Linear::new(0.0),
            rising: false,
            qrate: 0,
            shift: -11,
            i: 0,
            rate_scaling: 0,
            sr_mult: 44100.0 / fs.f,
        }
    }

    /// Additional rate scaling added to the quantized rate (e.g. derived
    /// from key position).
    pub fn set_rate_scaling(&mut self, rate_scaling: i32) {
        self.rate_scaling = rate_scaling;
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.base.value()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.base.is_active()
    }

    pub fn set_target(&mut self, target: f32) {
        self.base.set_target(target);
    }

    pub fn set_value(&mut self, value: f32) {
        self.base.set_value(value);
    }

    /// Quantize `rate` (0..99 scale) to `qrate` in 0..=63 and derive the
    /// shift amount.
    pub fn set_rate(&mut self, rate: f32) {
        if self.base.target() != self.base.value() {
            self.rising = self.base.target() > self.base.value();
            self.qrate = (self.rate_scaling + (rate * 41.0 / 64.0) as i32).min(63);
            self.shift = (self.qrate >> 2) - 11;
        }
    }

    #[inline]
    fn gate(&self, index: u32) -> bool {
        let mut i = index;
        if self.shift < 0 {
            let mask = (1u32 << -self.shift) - 1;
            if i & mask != mask {
                return false;
            }
            i >>= -self.shift;
        }
        STEP_MASK[(self.qrate & 3) as usize][(i & 7) as usize] != 0
    }

    #[inline]
    fn attack_slope(&self) -> f32 {
        let slope = 17 - ((self.base.value() as i32) >> 8);
        (slope << self.shift.max(0)) as f32
    }

    #[inline]
    fn decay_slope(&self) -> f32 {
        (1i32 << self.shift.max(0)) as f32
    }

    /// Advance if the current sample index is admitted, then return the
    /// output.
    #[inline]
    pub fn step(&mut self) -> Signal {
        let index = self.i;
        self.i = self.i.wrapping_add(1);
        if self.gate(index) {
            let slope = if self.rising {
                self.attack_slope()
            } else {
                self.decay_slope()
            };
            self.base.set_rate(slope * self.sr_mult);
            self.base.step();
        }
        Signal(self.base.value())
    }
}

/// Ramp kernel walking envelope segments.
#[derive(Copy, Clone, Debug)]
pub enum Ramp {
    Linear(Linear),
    Dx(DxRamp),
}

impl Ramp {
    #[inline]
    pub fn value(&self) -> f32 {
        match self {
            Ramp::Linear(r) => r.value(),
            Ramp::Dx(r) => r.value(),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        match self {
            Ramp::Linear(r) => r.is_active(),
            Ramp::Dx(r) => r.is_active(),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        match self {
            Ramp::Linear(r) => r.set_target(target),
            Ramp::Dx(r) => r.set_target(target),
        }
    }

    pub fn set_value(&mut self, value: f32) {
        match self {
            Ramp::Linear(r) => r.set_value(value),
            Ramp::Dx(r) => r.set_value(value),
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        match self {
            Ramp::Linear(r) => r.set_rate(rate),
            Ramp::Dx(r) => r.set_rate(rate),
        }
    }

    #[inline]
    pub fn step(&mut self) -> Signal {
        match self {
            Ramp::Linear(r) => r.step(),
            Ramp::Dx(r) => r.step(),
        }
    }
}

/// Models a changing value (e.g. amplitude) over time using breakpoints.
#[derive(Clone, Debug)]
pub struct Envelope {
    points: Vec<Point>,
    loop_window: Loop,
    index: usize,
    time: f32,
    time_inc: f32,
    stage: Stage,
    mode: Mode,
    ramp: Ramp,
    out: Signal,
    fs: SampleRate,
}

impl Envelope {
    /// Constant full-level envelope.
    pub fn new(fs: SampleRate) -> Self {
        Envelope::from_points(fs, &[(0.0, 1.0)])
    }

    /// Envelope from `(time, value)` breakpoints.
    pub fn from_points(fs: SampleRate, points: &[(f32, f32)]) -> Self {
        let mut envelope = Envelope {
            points: Vec::new(),
            loop_window: Loop::default(),
            index: 0,
            time: 0.0,
            time_inc: 0.0,
            stage: Stage::Sustain,
            mode: Mode::Time,
            ramp: Ramp::Linear(Linear::default()),
            out: Signal::default(),
            fs,
        };
        envelope.set(points);
        envelope
    }

    /// Replace the breakpoints and restart.
    pub fn set(&mut self, points: &[(f32, f32)]) {
        self.points.clear();
        self.points.extend(points.iter().map(|&p| Point::from(p)));
        self.initialise();
    }

    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
        self.initialise();
    }

    /// Convert breakpoint x values from per-segment durations to absolute
    /// times.
    pub fn sequence(&mut self) {
        let mut time = 0.0;
        for point in self.points.iter_mut() {
            let delta = point.x;
            time += delta + 0.00001;
            point.x = time;
        }
        self.initialise();
    }

    /// Loop between two breakpoints while sustaining.
    pub fn set_loop(&mut self, start: usize, end: usize) {
        if end < self.points.len() && start <= end {
            self.loop_window.set(start, end);
        }
    }

    /// Remove the loop, retargeting the current segment if sustaining.
    pub fn reset_loop(&mut self) {
        self.loop_window.reset();
        if self.stage == Stage::Sustain && self.index + 1 < self.points.len() {
            self.set_target(self.points[self.index + 1], self.points[self.index].x);
        }
    }

    /// Interpolated envelope value at `time` seconds, ignoring loops.
    pub fn at(&self, time: f32) -> Signal {
        if self.points.is_empty() {
            return Signal(0.0);
        }
        let mut last = Point::new(0.0, self.points[0].y);
        for &point in &self.points {
            if point.x >= time {
                let dx = point.x - last.x;
                let dy = point.y - last.y;
                let x = time - last.x;
                return Signal(if dx == 0.0 { last.y } else { last.y + x * dy / dx });
            }
            last = point;
        }
        Signal(self.points[self.points.len() - 1].y)
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Total envelope length in seconds, ignoring loops.
    pub fn length(&self) -> f32 {
        self.points.last().map_or(0.0, |p| p.x)
    }

    /// Trigger the release: ramp to `level` over `time` seconds.
    pub fn release(&mut self, time: f32, level: f32) {
        self.stage = Stage::Release;
        let point = Point::new(time, level);
        match self.mode {
            Mode::Time => self.set_target_time(point, 0.0),
            Mode::Rate => self.set_target_rate(point),
        }
    }

    pub fn finished(&self) -> bool {
        self.stage == Stage::Off
    }

    /// Prepare the envelope to (re)start.
    pub fn initialise(&mut self) {
        self.index = 0;
        self.time_inc = self.fs.inv;
        self.loop_window.reset();
        self.stage = Stage::Sustain;
        if !self.points.is_empty() {
            self.out = Signal(self.points[0].y);
            self.ramp.set_value(self.points[0].y);
            if self.points.len() > 1 {
                self.set_target(self.points[1], self.points[0].x);
            }
        } else {
            self.out = Signal(1.0);
            self.ramp.set_value(1.0);
        }
    }

    /// Scale the breakpoint times so the envelope lasts `length` samples.
    pub fn resize(&mut self, length: f32) {
        let old_length = self.length();
        if old_length == 0.0 {
            return;
        }
        let multiplier = length / (self.fs.f * old_length);
        for point in self.points.iter_mut() {
            point.x *= multiplier;
        }
        self.initialise();
    }

    /// Retarget the ramp at `point`; `time` is the segment start in Time
    /// mode and ignored in Rate mode.
    pub fn set_target(&mut self, point: Point, time: f32) {
        match self.mode {
            Mode::Time => self.set_target_time(point, time),
            Mode::Rate => self.set_target_rate(point),
        }
    }

    fn set_target_time(&mut self, point: Point, time: f32) {
        self.time = time;
        self.ramp.set_target(point.y);
        self.ramp
            .set_rate((point.y - self.ramp.value()).abs() / ((point.x - time) * self.fs.f));
    }

    fn set_target_rate(&mut self, point: Point) {
        self.time = 0.0;
        if point.x == 0.0 {
            self.ramp.set_value(point.y);
        } else {
            self.ramp.set_target(point.y);
            self.ramp.set_rate(point.x);
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Replace the ramp kernel and restart.
    pub fn set_ramp(&mut self, ramp: Ramp) {
        self.ramp = ramp;
        self.initialise();
    }

    pub fn value(&self) -> Signal {
        self.out
    }

    /// Emit the current value and advance the envelope state machine.
    pub fn step(&mut self) -> Signal {
        self.out = self.ramp.step();

        match self.stage {
            Stage::Sustain => {
                self.time += self.time_inc;
                if !self.ramp.is_active() {
                    // Reached the end of the segment.
                    if self.loop_window.is_active() && self.index + 1 >= self.loop_window.end() {
                        self.index = self.loop_window.start();
                        self.ramp.set_value(self.points[self.index].y);
                        if self.loop_window.start() != self.loop_window.end() {
                            let next = self.points[self.index + 1];
                            let from = self.points[self.index].x;
                            self.set_target(next, from);
                        }
                    } else if self.index + 1 < self.points.len() {
                        if self.mode == Mode::Rate || self.time >= self.points[self.index + 1].x {
                            self.index += 1;
                            // Land exactly on the breakpoint value.
                            self.ramp.set_value(self.points[self.index].y);
                            if self.index + 1 < self.points.len() {
                                let next = self.points[self.index + 1];
                                let from = self.points[self.index].x;
                                self.set_target(next, from);
                            }
                        }
                    } else {
                        self.stage = Stage::Off;
                    }
                }
            }
            Stage::Release => {
                if !self.ramp.is_active() {
                    self.stage = Stage::Off;
                }
            }
            Stage::Off => {}
        }

        self.out
    }
}

impl Index<usize> for Envelope {
    type Output = Point;
    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

impl Generator for Envelope {
    type Out = Signal;
    #[inline]
    fn process(&mut self) {
        self.out = Signal(self.ramp.value());
    }
    #[inline]
    fn output(&self) -> Signal {
        self.out
    }
}

/// Attack-decay-sustain-release envelope.
///
/// Three breakpoints `(0, 0) (A, 1) (A + D, S)` with a loop holding the
/// sustain point; `release` retargets to zero over the release time. Attack
/// and decay carry a 5 ms guard so zero-length segments stay click free.
#[derive(Clone, Debug)]
pub struct Adsr {
    env: Envelope,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release_time: f32,
}

impl Adsr {
    pub fn new(fs: SampleRate) -> Self {
        let mut adsr = Adsr {
            env: Envelope::new(fs),
            attack: 0.5,
            decay: 0.5,
            sustain: 1.0,
            release_time: 0.5,
        };
        adsr.set(0.5, 0.5, 1.0, 0.5);
        adsr
    }

    pub fn with(fs: SampleRate, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut adsr = Adsr::new(fs);
        adsr.set(attack, decay, sustain, release);
        adsr
    }

    pub fn set(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack = attack + 0.005;
        self.decay = decay + 0.005;
        self.sustain = sustain;
        self.release_time = release;

        // Reuses the point storage, so retriggering never allocates.
        self.env.set(&[
            (0.0, 0.0),
            (self.attack, 1.0),
            (self.attack + self.decay, sustain),
        ]);
        self.env.set_loop(2, 2);
    }

    /// Release to silence over the configured release time.
    pub fn release(&mut self) {
        self.env.release(self.release_time, 0.0);
    }

    /// Release to `level` over `time` seconds (0 = configured release time).
    pub fn release_over(&mut self, time: f32, level: f32) {
        let time = if time != 0.0 { time } else { self.release_time };
        self.env.release(time, level);
    }

    #[inline]
    pub fn step(&mut self) -> Signal {
        self.env.step()
    }

    pub fn stage(&self) -> Stage {
        self.env.stage()
    }

    pub fn finished(&self) -> bool {
        self.env.finished()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.env
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.env
    }
}

/// Level and rate scaling tables for the rate-quantized envelope family.
/// Table contents are the established hardware values, carried verbatim.
pub mod dx {
    /// Output level in units of 0.75 dB.
    pub const OUTPUT_LEVEL: [i32; 128] = build_output_level();

    const fn build_output_level() -> [i32; 128] {
        const LOW: [i32; 20] = [
            0, 5, 9, 13, 17, 20, 23, 25, 27, 29, 31, 33, 35, 37, 39, 41, 42, 43, 45, 46,
        ];
        let mut table = [0; 128];
        let mut x = 0;
        while x < 128 {
            table[x] = if x < 20 { LOW[x] } else { 28 + x as i32 };
            x += 1;
        }
        table
    }

    /// Actual level curve.
    pub const ACTUAL_LEVEL: [i32; 128] = build_actual_level();

    const fn build_actual_level() -> [i32; 128] {
        let mut table = [0; 128];
        let mut x = 0;
        while x < 128 {
            let v = x as i32;
            table[x] = if x < 5 {
                2 * v
            } else if x < 17 {
                5 + v
            } else if x < 20 {
                4 + v
            } else {
                14 + (v >> 1)
            };
            x += 1;
        }
        table
    }

    /// Exponential scale curve groups.
    pub const EXP_SCALE: [u8; 33] = [
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 14, 16, 19, 23, 27, 33, 39, 47, 56, 66, 80, 94, 110,
        126, 142, 158, 174, 190, 206, 222, 238, 250,
    ];

    /// Velocity sensitivity curve.
    pub const VELOCITY_SCALE: [u8; 64] = [
        0, 70, 86, 97, 106, 114, 121, 126, 132, 138, 142, 148, 152, 156, 160, 163, 166, 170, 173,
        174, 178, 181, 184, 186, 189, 190, 194, 196, 198, 200, 202, 205, 206, 209, 211, 214, 216,
        218, 220, 222, 224, 225, 227, 229, 230, 232, 233, 235, 237, 238, 240, 241, 242, 243, 244,
        246, 246, 248, 249, 250, 251, 252, 253, 254,
    ];

    /// Fixed detune offsets in Hz for detune settings -7..=7.
    pub const DETUNE: [f32; 15] = [
        -3.5, -3.0, -2.5, -2.0, -1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5,
    ];

    pub fn detune(setting: i32) -> f32 {
        DETUNE[(setting + 7).clamp(0, 14) as usize]
    }

    /// Keyboard scaling amount for a scale `group`, `depth` and `curve`
    /// (0/3 linear, 1/2 exponential; curves below 2 are negative).
    pub fn scale_curve(group: i32, depth: i32, curve: i32) -> i32 {
        let mut scale = if curve == 0 || curve == 3 {
            (group * depth * 329) >> 12
        } else {
            let raw_exp = EXP_SCALE[group.clamp(0, 32) as usize] as i32;
            (raw_exp * depth * 329) >> 15
        };
        if curve < 2 {
            scale = -scale;
        }
        scale
    }

    /// Level scaling across the keyboard split point.
    pub fn scale_level(
        pitch: i32,
        breakpoint: i32,
        left: (i32, i32),
        right: (i32, i32),
    ) -> i32 {
        let split = pitch - breakpoint - 17;
        if split >= 0 {
            scale_curve((1 + split) / 3, right.0, right.1)
        } else {
            scale_curve((1 - split) / 3, left.0, left.1)
        }
    }

    /// Velocity scaling for a sensitivity setting in 0..=7.
    pub fn scale_velocity(velocity: i32, sensitivity: i32) -> i32 {
        let clamped = velocity.clamp(0, 127);
        let value = VELOCITY_SCALE[(clamped >> 1) as usize] as i32 - 239;
        ((sensitivity * value + 7) >> 3) << 4
    }

    /// Composite output level for an operator.
    pub fn operator_level(
        pitch: i32,
        velocity: i32,
        output_level: i32,
        breakpoint: i32,
        left: (i32, i32),
        right: (i32, i32),
        velocity_sensitivity: i32,
    ) -> i32 {
        let mut level = OUTPUT_LEVEL[output_level.clamp(0, 127) as usize];
        level += scale_level(pitch, breakpoint, left, right);
        level = level.min(127) * 32;
        level += scale_velocity(velocity, velocity_sensitivity);
        level.max(0)
    }

    /// Envelope target level for a breakpoint level setting.
    pub fn target_level(env_level: i32) -> i32 {
        ((OUTPUT_LEVEL[env_level.clamp(0, 127) as usize] << 5) - 224).max(0)
    }
}
