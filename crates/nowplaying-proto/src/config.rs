use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub stars: StarsConfig,
    #[serde(default)]
    pub title: TitleConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

/// Where finished frames go.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Half-block rendering in the controlling terminal.
    #[default]
    Preview,
    /// Raw page buffer written to `sink_path` every frame.
    File,
    /// Frames are dropped.
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Target frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub sink: SinkKind,
    /// Target of the `file` sink (a framebuffer node or a FIFO).
    #[serde(default = "default_sink_path")]
    pub sink_path: PathBuf,
    /// Panel rotation in quarter turns, as the SH1106 driver counts them.
    /// Only `0` and `2` (upside-down mount) are supported.
    #[serde(default)]
    pub rotate: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarsConfig {
    #[serde(default = "default_star_count")]
    pub count: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: f32,
    /// Depth lost by every star per tick.
    #[serde(default = "default_depth_step")]
    pub depth_step: f32,
    /// Stars spawn with x and y in `[-spread, spread)`.
    #[serde(default = "default_spread")]
    pub spread: i32,
    /// Perspective constant: `k = projection / depth`.
    #[serde(default = "default_projection")]
    pub projection: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Built-in mono font name, e.g. "7x13".  Unknown names fall back to 6x10.
    #[serde(default = "default_font")]
    pub font: String,
    /// Height of the title band at the top of the frame, in pixels.
    #[serde(default = "default_band_height")]
    pub band_height: u32,
    /// Pixels per tick.
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: f32,
    /// Pause before each scroll pass, in seconds.
    #[serde(default = "default_dwell_secs")]
    pub dwell_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Prefix shairport-sync publishes under, without trailing slash.
    #[serde(default = "default_topic_base")]
    pub topic_base: String,
    #[serde(default = "platform::default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl DisplayConfig {
    /// Wall-clock budget of a single frame.
    pub fn tick_budget(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

impl TitleConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_secs_f32(self.dwell_secs.max(0.0))
    }
}

impl MqttConfig {
    pub fn keep_alive(&self) -> Duration {
        // rumqttc rejects keep-alives below 5 seconds
        Duration::from_secs(self.keep_alive_secs.max(5))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            sink: SinkKind::default(),
            sink_path: default_sink_path(),
            rotate: 0,
        }
    }
}

impl Default for StarsConfig {
    fn default() -> Self {
        Self {
            count: default_star_count(),
            max_depth: default_max_depth(),
            depth_step: default_depth_step(),
            spread: default_spread(),
            projection: default_projection(),
        }
    }
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            font: default_font(),
            band_height: default_band_height(),
            scroll_speed: default_scroll_speed(),
            dwell_secs: default_dwell_secs(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: String::new(),
            password: String::new(),
            topic_base: default_topic_base(),
            client_id: platform::default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

const MAX_DWELL_SECS: f32 = 3600.0;

fn default_width() -> u32 {
    128
}

fn default_height() -> u32 {
    64
}

fn default_fps() -> u32 {
    30
}

fn default_sink_path() -> PathBuf {
    platform::data_dir().join("frame.bin")
}

fn default_star_count() -> usize {
    512
}

fn default_max_depth() -> f32 {
    32.0
}

fn default_depth_step() -> f32 {
    0.2
}

fn default_spread() -> i32 {
    25
}

fn default_projection() -> f32 {
    128.0
}

fn default_font() -> String {
    "7x13".to_string()
}

fn default_band_height() -> u32 {
    15
}

fn default_scroll_speed() -> f32 {
    2.0
}

fn default_dwell_secs() -> f32 {
    2.0
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_topic_base() -> String {
    "iotstack/shairport".to_string()
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing a default config there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would stall or break the animations.
    pub fn validate(&self) -> anyhow::Result<()> {
        fn positive(name: &str, value: f32) -> anyhow::Result<()> {
            if !value.is_finite() || value <= 0.0 {
                anyhow::bail!("{} must be a positive number, got {}", name, value);
            }
            Ok(())
        }

        positive("stars.max_depth", self.stars.max_depth)?;
        positive("stars.depth_step", self.stars.depth_step)?;
        positive("stars.projection", self.stars.projection)?;
        positive("title.scroll_speed", self.title.scroll_speed)?;

        let dwell = self.title.dwell_secs;
        if !dwell.is_finite() || !(0.0..=MAX_DWELL_SECS).contains(&dwell) {
            anyhow::bail!(
                "title.dwell_secs must be between 0 and {}, got {}",
                MAX_DWELL_SECS,
                dwell
            );
        }
        if !matches!(self.display.rotate, 0 | 2) {
            anyhow::bail!(
                "display.rotate must be 0 or 2, got {}",
                self.display.rotate
            );
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Apply the `MQTT_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MQTT_BROKER").filter(|v| !v.is_empty()) {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup("MQTT_PORT") {
            match port.trim().parse() {
                Ok(port) => self.mqtt.port = port,
                Err(_) => tracing::warn!("ignoring invalid MQTT_PORT {:?}", port),
            }
        }
        if let Some(user) = lookup("MQTT_USER") {
            self.mqtt.username = user;
        }
        if let Some(pass) = lookup("MQTT_PASS") {
            self.mqtt.password = pass;
        }
        if let Some(base) = lookup("MQTT_TOPIC_BASE").filter(|v| !v.is_empty()) {
            self.mqtt.topic_base = base.trim_end_matches('/').to_string();
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            stars: StarsConfig::default(),
            title: TitleConfig::default(),
            mqtt: MqttConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.width, 128);
        assert_eq!(config.display.height, 64);
        assert_eq!(config.display.fps, 30);
        assert_eq!(config.display.sink, SinkKind::Preview);
        assert_eq!(config.stars.count, 512);
        assert_eq!(config.title.band_height, 15);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic_base, "iotstack/shairport");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [display]
            fps = 20
            sink = "null"

            [title]
            font = "6x10"
            "#,
        )
        .unwrap();
        assert_eq!(config.display.fps, 20);
        assert_eq!(config.display.sink, SinkKind::Null);
        assert_eq!(config.display.width, 128);
        assert_eq!(config.title.font, "6x10");
        assert_eq!(config.title.scroll_speed, 2.0);
        assert_eq!(config.stars.max_depth, 32.0);
    }

    #[test]
    fn test_tick_budget() {
        let display = DisplayConfig {
            fps: 25,
            ..DisplayConfig::default()
        };
        assert_eq!(display.tick_budget(), Duration::from_millis(40));

        let stalled = DisplayConfig {
            fps: 0,
            ..DisplayConfig::default()
        };
        assert_eq!(stalled.tick_budget(), Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_broken_animation_values() {
        assert!(Config::default().validate().is_ok());

        let cases: [fn(&mut Config); 7] = [
            |c| c.stars.depth_step = -0.5,
            |c| c.stars.depth_step = 0.0,
            |c| c.stars.max_depth = f32::INFINITY,
            |c| c.stars.projection = f32::NAN,
            |c| c.title.scroll_speed = 0.0,
            |c| c.title.dwell_secs = f32::INFINITY,
            |c| c.display.rotate = 1,
        ];
        for (i, break_it) in cases.iter().enumerate() {
            let mut config = Config::default();
            break_it(&mut config);
            assert!(config.validate().is_err(), "case {} accepted", i);
        }
    }

    #[test]
    fn test_validate_accepts_edge_values() {
        let mut config = Config::default();
        config.title.dwell_secs = 0.0;
        config.display.rotate = 2;
        config.stars.depth_step = 40.0;
        assert!(config.validate().is_ok());
        assert_eq!(config.title.dwell(), Duration::ZERO);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MQTT_BROKER", "10.0.0.50"),
            ("MQTT_PORT", "not-a-port"),
            ("MQTT_USER", "mqtt"),
            ("MQTT_TOPIC_BASE", "home/airplay/"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.mqtt.host, "10.0.0.50");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.username, "mqtt");
        assert_eq!(config.mqtt.password, "");
        assert_eq!(config.mqtt.topic_base, "home/airplay");
    }
}
