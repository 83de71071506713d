//! Configuration management

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the backend API.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// I2C character device carrying the encoder and the tuner.
    #[serde(default = "default_i2c_device")]
    pub i2c_device: String,

    /// Encoder poll cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Button debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Volume change per rotation detent, in percent.
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,

    /// Tuner scan increment in MHz.
    #[serde(default = "default_scan_step_mhz")]
    pub scan_step_mhz: f64,

    /// ALSA simple control driven by the dial.
    #[serde(default = "default_mixer_control")]
    pub mixer_control: String,

    /// Seconds of assistant silence before falling back to radio mode.
    #[serde(default = "default_ai_silence_timeout_secs")]
    pub ai_silence_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_i2c_device() -> String {
    "/dev/i2c-1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_volume_step() -> u8 {
    5
}

fn default_scan_step_mhz() -> f64 {
    0.1
}

fn default_mixer_control() -> String {
    "Master".to_string()
}

fn default_ai_silence_timeout_secs() -> u64 {
    10
}

/// Get config directory (XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("SRB_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/smart-radio-bridge");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join("smart-radio-bridge");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".config/smart-radio-bridge");
        }
    }

    // Fallback to current directory
    std::path::PathBuf::from(".")
}

/// Get data directory (XDG_DATA_HOME or platform default); holds the
/// persisted tuner state.
pub fn get_data_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("SRB_DATA_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/smart-radio-bridge");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return std::path::PathBuf::from(xdg).join("smart-radio-bridge");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".local/share/smart-radio-bridge");
        }
    }

    // Fallback to ./data
    std::path::PathBuf::from("./data")
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let builder = ::config::Config::builder()
        // Load from config file if it exists
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // Override with environment variables (SRB_BACKEND_URL, SRB_VOLUME_STEP, etc.)
        .add_source(
            ::config::Environment::with_prefix("SRB")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}
