//! Raw-sample to event extraction.
//!
//! The encoder board exhibits two independent fault shapes on the shared bus:
//! large spurious position jumps (clock-stretching artifacts) and electrical
//! bounce on the buttons. Each gets its own filter: a magnitude threshold
//! for rotation and a time threshold for presses.

use std::time::{Duration, Instant};

/// Maximum believable position change between two polls. Anything larger is
/// treated as bus noise, not a real rotation.
pub const MAX_ROTATION_DELTA: i32 = 10;

/// Minimum time between two accepted presses of the same button.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Raw position patterns produced by failed bus transactions rather than the
/// encoder: all-bits-set at 16 and 24 bit widths, -1, and the all-zero read
/// (which is also the counter's boot value, so skipping it costs nothing).
const SENTINEL_READINGS: [i32; 4] = [-1, 0, 0xFFFF, 0xFF_FFFF];

/// One snapshot from the sample source: the raw position counter and the GPIO
/// bitmask. Carries no identity beyond the moment it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub position: i32,
    pub buttons: u32,
}

/// A validated, non-noise change in encoder position since the previous
/// accepted sample. `|delta| <= MAX_ROTATION_DELTA` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationEvent {
    pub delta: i32,
}

/// Logical inputs carried in the sample bitmask.
///
/// The four directional buttons ring the encoder; `Select` is the center
/// push and `Voice` is the assistant call button, merged into the same
/// bitmask by the sample source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Select,
    Up,
    Down,
    Left,
    Right,
    Voice,
}

impl ButtonId {
    pub const ALL: [ButtonId; 6] = [
        ButtonId::Select,
        ButtonId::Up,
        ButtonId::Down,
        ButtonId::Left,
        ButtonId::Right,
        ButtonId::Voice,
    ];

    /// Bit for this input in the GPIO bitmask (active-low under pull-up
    /// wiring: bit clear = pressed).
    pub fn mask(self) -> u32 {
        match self {
            ButtonId::Select => 1 << 0,
            ButtonId::Up => 1 << 1,
            ButtonId::Down => 1 << 2,
            ButtonId::Left => 1 << 3,
            ButtonId::Right => 1 << 4,
            ButtonId::Voice => 1 << 5,
        }
    }

    fn index(self) -> usize {
        match self {
            ButtonId::Select => 0,
            ButtonId::Up => 1,
            ButtonId::Down => 2,
            ButtonId::Left => 3,
            ButtonId::Right => 4,
            ButtonId::Voice => 5,
        }
    }
}

/// A debounced press transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub id: ButtonId,
    pub accepted_at: Instant,
}

/// Noise filter over the raw position counter.
///
/// Sentinel readings are dropped without touching the baseline. Jumps larger
/// than [`MAX_ROTATION_DELTA`] are dropped too, but *resynchronize* the
/// baseline to the glitched value, otherwise a single glitch would produce a
/// large backlog of phantom deltas on the next good read.
#[derive(Debug)]
pub struct RotationFilter {
    last: i32,
}

impl RotationFilter {
    pub fn new(initial: i32) -> Self {
        Self { last: initial }
    }

    /// Baseline position the next delta will be computed against.
    pub fn baseline(&self) -> i32 {
        self.last
    }

    pub fn update(&mut self, raw: i32) -> Option<RotationEvent> {
        if SENTINEL_READINGS.contains(&raw) {
            return None;
        }

        let delta = raw - self.last;
        if delta.abs() > MAX_ROTATION_DELTA {
            tracing::debug!(delta, raw, "rotation noise filtered, resyncing baseline");
            self.last = raw;
            return None;
        }

        if delta != 0 {
            self.last = raw;
            return Some(RotationEvent { delta });
        }

        None
    }
}

/// Per-button falling-edge detector with a shared debounce window.
///
/// The shadow level is updated on every poll, accepted press or not, so a
/// suppressed bounce never loses the following release edge.
#[derive(Debug)]
pub struct ButtonDebouncer {
    window: Duration,
    /// Last observed electrical level per button (true = released).
    shadow: [bool; ButtonId::ALL.len()],
    last_accepted: [Option<Instant>; ButtonId::ALL.len()],
}

impl ButtonDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            shadow: [true; ButtonId::ALL.len()],
            last_accepted: [None; ButtonId::ALL.len()],
        }
    }

    pub fn update(&mut self, buttons: u32, now: Instant) -> Vec<ButtonEvent> {
        let mut accepted = Vec::new();

        for id in ButtonId::ALL {
            let i = id.index();
            let level = buttons & id.mask() != 0;
            let falling_edge = self.shadow[i] && !level;
            self.shadow[i] = level;

            if !falling_edge {
                continue;
            }

            let debounced = match self.last_accepted[i] {
                Some(prev) => now.duration_since(prev) > self.window,
                None => true,
            };
            if debounced {
                self.last_accepted[i] = Some(now);
                accepted.push(ButtonEvent {
                    id,
                    accepted_at: now,
                });
            }
        }

        accepted
    }
}
