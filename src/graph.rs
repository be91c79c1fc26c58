//! Diagnostic sinks: the plotting graph, the console, and the audio debug
//! tap.
//!
//! Graph and debug buffer are thread-local; console writes take a mutex.
//! None of these touch the audio output path: piping a signal into the debug
//! tap records it and passes it through unchanged.

use super::buffer::Buffer;
use super::signal::Signal;
use core::ops::Shr;
use std::cell::RefCell;
use std::sync::Mutex;

/// Points per plotted series.
pub const GRAPH_SIZE: usize = 44100;

/// A plotted point.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// y may be infinite (poles); x must be finite.
    pub fn valid(&self) -> bool {
        !self.x.is_nan() && !self.x.is_infinite() && !self.y.is_nan()
    }
}

/// One axis range.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
}

impl Axis {
    pub fn valid(&self) -> bool {
        self.max != self.min
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clear(&mut self) {
        self.min = 0.0;
        self.max = 0.0;
    }

    /// Fit the axis to one coordinate of a series, discarding degenerate
    /// ranges.
    pub fn fit(&mut self, series: &Series, coord: impl Fn(&Point) -> f64) {
        if series.points.is_empty() {
            return;
        }
        let mut count = 0;
        for point in &series.points {
            let v = coord(point);
            if point.valid() && !v.is_infinite() {
                if count == 0 || v < self.min {
                    self.min = v;
                }
                if count == 0 || v > self.max {
                    self.max = v;
                }
                count += 1;
            }
        }
        if self.max.abs() < 1e-10 || self.max.abs() > 1e9 {
            self.max = 0.0;
        }
        if self.min.abs() < 1e-10 || self.min.abs() > 1e9 {
            self.min = 0.0;
        }
        if self.min > self.max {
            self.min = 0.0;
            self.max = 0.0;
        }
    }
}

/// Both axis ranges.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Axes {
    pub x: Axis,
    pub y: Axis,
}

impl Axes {
    pub fn valid(&self) -> bool {
        self.x.valid() && self.y.valid()
    }

    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
    }

    pub fn contains(&self, point: &Point) -> bool {
        self.x.contains(point.x) && self.y.contains(point.y)
    }
}

/// A sequence of plotted points, possibly sampled from a function.
#[derive(Clone, Debug, Default)]
pub struct Series {
    points: Vec<Point>,
    function: Option<usize>,
}

impl Series {
    pub fn add(&mut self, point: Point) {
        if self.points.len() <= GRAPH_SIZE {
            self.points.push(point);
        }
    }

    /// Append a y value at the next integer x.
    pub fn add_y(&mut self, y: f64) {
        self.add(Point::new(self.points.len() as f64, y));
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.function = None;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Sample `function` across `x_axis`. Replotting the same function is a
    /// no-op.
    pub fn plot(&mut self, function: fn(f64) -> f64, x_axis: &Axis) {
        if self.function == Some(function as usize) {
            return;
        }
        self.points.clear();
        self.function = Some(function as usize);
        let dx = x_axis.range() / GRAPH_SIZE as f64;
        for i in 0..=GRAPH_SIZE {
            let x = x_axis.min + i as f64 * dx;
            self.add(Point::new(x, function(x)));
        }
    }
}

/// Up to 16 series sharing one pair of axes.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    axes: Axes,
    data: Vec<Series>,
    dirty: bool,
}

pub const MAX_SERIES: usize = 16;

impl Graph {
    pub fn new() -> Self {
        Graph {
            axes: Axes::default(),
            data: vec![Series::default(); MAX_SERIES],
            dirty: false,
        }
    }

    pub fn clear(&mut self) {
        self.dirty = true;
        self.axes.clear();
        for series in self.data.iter_mut() {
            series.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.data.iter().any(|s| !s.is_empty())
    }

    /// Set the x axis range.
    pub fn set_range(&mut self, min: f64, max: f64) {
        self.dirty = true;
        self.axes.x = Axis { min, max };
    }

    /// Set both axis ranges.
    pub fn set_ranges(&mut self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
        self.dirty = true;
        self.axes.x = Axis {
            min: x_min,
            max: x_max,
        };
        self.axes.y = Axis {
            min: y_min,
            max: y_max,
        };
    }

    pub fn series(&mut self, index: usize) -> &mut Series {
        self.dirty = true;
        &mut self.data[index]
    }

    /// Plot a function, reusing its series if already plotted.
    pub fn plot(&mut self, function: fn(f64) -> f64) {
        self.dirty = true;
        if !self.axes.x.valid() {
            self.axes.x = Axis { min: -1.0, max: 1.0 };
        }
        let slot = self
            .data
            .iter()
            .position(|s| s.function == Some(function as usize))
            .or_else(|| self.data.iter().position(|s| s.is_empty()));
        if let Some(slot) = slot {
            let axis = self.axes.x;
            self.data[slot].plot(function, &axis);
        }
    }

    /// Append a y value to the first series.
    pub fn add(&mut self, y: f64) {
        self.dirty = true;
        self.data[0].add_y(y);
    }

    pub fn add_point(&mut self, point: Point) {
        self.dirty = true;
        self.data[0].add(point);
    }

    /// The user-defined axes.
    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    /// Derive axes from the data where the user left them unset.
    pub fn fit_axes(&self, axes: &mut Axes) {
        if !axes.x.valid() {
            axes.x.clear();
            for series in &self.data {
                axes.x.fit(series, |p| p.x);
            }
        }
        if !axes.y.valid() {
            axes.y.clear();
            for series in &self.data {
                axes.y.fit(series, |p| p.y);
            }
        }
    }

    pub fn data(&self) -> &[Series] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

thread_local! {
    static GRAPH: RefCell<Graph> = RefCell::new(Graph::new());
}

/// Run `f` against this thread's graph.
pub fn with_graph<R>(f: impl FnOnce(&mut Graph) -> R) -> R {
    GRAPH.with(|graph| f(&mut graph.borrow_mut()))
}

/// Console text capacity.
pub const CONSOLE_CAPACITY: usize = 16384;

struct Console {
    text: String,
}

static CONSOLE: Mutex<Console> = Mutex::new(Console {
    text: String::new(),
});

fn with_console<R>(f: impl FnOnce(&mut Console) -> R) -> R {
    let mut guard = match CONSOLE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    f(&mut guard)
}

/// Append text to the console, truncating at capacity.
pub fn console_write(text: &str) {
    with_console(|console| {
        let space = CONSOLE_CAPACITY.saturating_sub(console.text.len());
        let mut take = text.len().min(space);
        while take > 0 && !text.is_char_boundary(take) {
            take -= 1;
        }
        console.text.push_str(&text[..take]);
    });
}

/// Whether any console text is pending.
pub fn console_has_text() -> bool {
    with_console(|console| !console.text.is_empty())
}

/// Drain the console text.
pub fn console_take() -> String {
    with_console(|console| core::mem::take(&mut console.text))
}

/// What the debug buffer currently holds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Content {
    #[default]
    Empty,
    Notes,
    Effect,
    Synth,
}

/// Debug audio buffer capacity.
pub const DEBUG_CAPACITY: usize = 16384;

/// Thread-local audio tap for inspecting intermediate signals.
pub struct DebugBuffer {
    buffer: Buffer,
    content: Content,
    active: bool,
}

impl DebugBuffer {
    fn new() -> Self {
        DebugBuffer {
            buffer: Buffer::new(DEBUG_CAPACITY),
            content: Content::Empty,
            active: false,
        }
    }

    /// Start a capture session for one block of `n` samples.
    pub fn begin(&mut self, content: Content, n: usize) {
        if self.content != Content::Notes {
            self.buffer.clear_n(n);
        }
        self.content = content;
        self.buffer.rewind();
    }

    /// Record a sample at the cursor.
    #[inline]
    pub fn push(&mut self, x: Signal) {
        self.active = true;
        self.buffer.accumulate(x);
    }

    /// Move the cursor forward one sample.
    #[inline]
    pub fn step(&mut self) {
        self.buffer.rewind_to(self.buffer.offset() + 1);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn content(&self) -> Content {
        self.content
    }

    /// Captured samples, clearing the active flag.
    pub fn drain(&mut self, out: &mut [f32]) -> usize {
        if !self.active {
            return 0;
        }
        self.active = false;
        let n = out.len().min(self.buffer.len());
        out[..n].copy_from_slice(&self.buffer.as_slice()[..n]);
        n
    }
}

thread_local! {
    static DEBUG: RefCell<DebugBuffer> = RefCell::new(DebugBuffer::new());
}

/// Run `f` against this thread's debug buffer.
pub fn with_debug<R>(f: impl FnOnce(&mut DebugBuffer) -> R) -> R {
    DEBUG.with(|debug| f(&mut debug.borrow_mut()))
}

/// Zero-sized pipe target recording into the thread-local debug buffer:
/// `signal >> Tap` records the sample, advances the capture cursor, and
/// passes the signal through.
#[derive(Copy, Clone, Debug, Default)]
pub struct Tap;

impl Shr<Tap> for Signal {
    type Output = Signal;
    #[inline]
    fn shr(self, _: Tap) -> Signal {
        with_debug(|debug| {
            debug.push(self);
            debug.step();
        });
        self
    }
}
