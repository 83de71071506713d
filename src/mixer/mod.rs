//! System mixer seam.
//!
//! The appliance's loudspeaker volume is the ALSA master level. The
//! production implementation shells out to `amixer` with a short timeout;
//! the trait keeps the service loop testable without a sound card.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

const AMIXER_TIMEOUT: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Mixer: Send + Sync {
    /// Set the master level. The caller clamps; `percent` is 0-100.
    async fn set_volume(&self, percent: u8) -> anyhow::Result<()>;

    /// Current master level, when it can be determined.
    async fn read_volume(&self) -> Option<u8>;
}

/// `amixer`-backed mixer.
pub struct AlsaMixer {
    control: String,
}

impl AlsaMixer {
    pub fn new(control: impl Into<String>) -> Self {
        Self {
            control: control.into(),
        }
    }
}

#[async_trait]
impl Mixer for AlsaMixer {
    async fn set_volume(&self, percent: u8) -> anyhow::Result<()> {
        let output = tokio::time::timeout(
            AMIXER_TIMEOUT,
            Command::new("amixer")
                .args(["set", &self.control, &format!("{}%", percent)])
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("amixer timed out"))??;

        if !output.status.success() {
            anyhow::bail!("amixer exited with {}", output.status);
        }
        Ok(())
    }

    async fn read_volume(&self) -> Option<u8> {
        let output = tokio::time::timeout(
            AMIXER_TIMEOUT,
            Command::new("amixer").args(["get", &self.control]).output(),
        )
        .await
        .ok()?
        .ok()?;

        parse_amixer_level(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the percentage from amixer's `[NN%]` channel lines.
fn parse_amixer_level(stdout: &str) -> Option<u8> {
    let re = Regex::new(r"\[(\d+)%\]").ok()?;
    for line in stdout.lines() {
        if line.contains("Front Left:") || line.contains("Mono:") {
            if let Some(cap) = re.captures(line) {
                if let Ok(level) = cap[1].parse::<u8>() {
                    return Some(level.min(100));
                }
            }
        }
    }
    None
}
