use crate::input::controller::ButtonMap;
use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{fs::File, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// City to resolve on startup. Anything the weather API accepts, e.g.
    /// `Toronto` or `Mississauga, CA`
    pub city: Option<String>,
    pub weather: WeatherConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub input: InputConfig,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the working directory
    pub fn load() -> anyhow::Result<Self> {
        info!("Loading config from `{}`", Self::PATH);
        let file = File::open(Self::PATH)
            .with_context(|| format!("Error opening {}", Self::PATH))?;
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,
    #[serde(default = "default_api_host")]
    pub api_host: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path. If omitted we grab the first port the OS reports, which
    /// assumes the display is the only thing plugged in
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Pause after each field of an update, so the sketch can keep up
    field_delay_ms: u64,
}

impl SerialConfig {
    pub fn field_delay(&self) -> Duration {
        Duration::from_millis(self.field_delay_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            field_delay_ms: 2000,
        }
    }
}

/// Where user commands come from
#[derive(Debug, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    #[default]
    Console,
    Controller(ControllerConfig),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Byte offset of the button bitmap within an input report
    pub button_offset: usize,
    pub buttons: ButtonMap,
    poll_interval_ms: u64,
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Defaults are for a wired PS3 controller
impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x054c,
            product_id: 0x0268,
            button_offset: 2,
            buttons: ButtonMap::default(),
            poll_interval_ms: 10,
        }
    }
}

fn default_api_host() -> String {
    "https://api.openweathermap.org".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: Config =
            serde_json::from_str(r#"{"weather": {"api_key": "abc"}}"#)
                .unwrap();
        assert_eq!(config.city, None);
        assert_eq!(config.weather.api_host, "https://api.openweathermap.org");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.field_delay(), Duration::from_secs(2));
        assert!(matches!(config.input, InputConfig::Console));
    }

    #[test]
    fn test_controller_config() {
        let config: Config = serde_json::from_str(
            r#"{
                "city": "Mississauga, CA",
                "weather": {"api_key": "abc"},
                "serial": {"port": "/dev/ttyACM0", "field_delay_ms": 0},
                "input": {"type": "controller", "buttons": {"left": 1}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.city.as_deref(), Some("Mississauga, CA"));
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.field_delay(), Duration::ZERO);
        let InputConfig::Controller(controller) = config.input else {
            panic!("Expected controller input");
        };
        assert_eq!(controller.vendor_id, 0x054c);
        assert_eq!(controller.buttons.left, 1);
        assert_eq!(controller.buttons.right, 5);
        assert_eq!(controller.poll_interval(), Duration::from_millis(10));
    }
}
