//! Event to command mapping.
//!
//! Owns the mixer-level mirror and the dial mode. Rotation drives the volume
//! or the tuner depending on the dial mode; the directional buttons scan with
//! a fixed priority so simultaneous presses stay deterministic.

use crate::events::{ButtonEvent, ButtonId, RotationEvent};

/// Default volume change per rotation step, in percent.
pub const DEFAULT_VOLUME_STEP: u8 = 5;

/// What the rotary dial currently drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialMode {
    Volume,
    Tuning,
}

/// Process-owned mirror of the system mixer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeState {
    pub percent: u8,
}

/// Commands produced from one poll iteration's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the system mixer to an absolute, already clamped level.
    SetVolume { percent: u8 },
    /// Dial-driven tuner movement, in scan increments.
    TuneStep { steps: i32 },
    ScanUp,
    ScanDown,
    /// Toggle the radio/ai operating mode.
    ToggleOperatingMode,
}

/// Scan resolution order when several directional buttons land in the same
/// iteration: first hit wins, one scan action at most.
const SCAN_PRIORITY: [(ButtonId, Command); 4] = [
    (ButtonId::Up, Command::ScanUp),
    (ButtonId::Right, Command::ScanUp),
    (ButtonId::Down, Command::ScanDown),
    (ButtonId::Left, Command::ScanDown),
];

pub struct CommandMapper {
    dial_mode: DialMode,
    volume: VolumeState,
    volume_step: u8,
}

impl CommandMapper {
    pub fn new(initial_volume: u8, volume_step: u8) -> Self {
        Self {
            dial_mode: DialMode::Volume,
            volume: VolumeState {
                percent: initial_volume.min(100),
            },
            volume_step,
        }
    }

    pub fn dial_mode(&self) -> DialMode {
        self.dial_mode
    }

    pub fn volume(&self) -> VolumeState {
        self.volume
    }

    /// Map one iteration's extracted events to commands.
    ///
    /// A Select press flips the dial mode before rotation is interpreted, so
    /// a press and a detent in the same poll act in the new mode.
    pub fn map(&mut self, rotation: Option<RotationEvent>, buttons: &[ButtonEvent]) -> Vec<Command> {
        let mut commands = Vec::new();

        if buttons.iter().any(|b| b.id == ButtonId::Select) {
            self.dial_mode = match self.dial_mode {
                DialMode::Volume => DialMode::Tuning,
                DialMode::Tuning => DialMode::Volume,
            };
            tracing::info!("Dial mode: {:?}", self.dial_mode);
        }

        if let Some(rotation) = rotation {
            match self.dial_mode {
                DialMode::Volume => {
                    let target = i32::from(self.volume.percent)
                        + rotation.delta * i32::from(self.volume_step);
                    self.volume.percent = target.clamp(0, 100) as u8;
                    commands.push(Command::SetVolume {
                        percent: self.volume.percent,
                    });
                }
                DialMode::Tuning => commands.push(Command::TuneStep {
                    steps: rotation.delta,
                }),
            }
        }

        if let Some((_, scan)) = SCAN_PRIORITY
            .iter()
            .find(|(id, _)| buttons.iter().any(|b| b.id == *id))
        {
            commands.push(*scan);
        }

        if buttons.iter().any(|b| b.id == ButtonId::Voice) {
            commands.push(Command::ToggleOperatingMode);
        }

        commands
    }
}
