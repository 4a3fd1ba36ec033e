//! Weather raster overlay selection.

use log::debug;
use web_time::SystemTime;

use crate::config::WeatherConfig;
use crate::layer::WeatherSelection;

/// Weather keys in the order they are cycled through.
pub const WEATHER_KEYS: [&str; 5] = ["precipitation", "clouds", "temp", "wind", "pressure"];

const SUPPORTED_PROVIDER: &str = "metservice";

/// Why the weather overlay cannot be shown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WeatherUnavailable {
    /// Configured provider is not supported.
    UnsupportedProvider,
    /// No tiles are configured for the selected key.
    NoTiles,
    /// No tiles are configured at all, so there is nothing to cycle through.
    NoLayers,
}

impl WeatherUnavailable {
    /// Status line shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            WeatherUnavailable::UnsupportedProvider => "Unsupported weather provider.",
            WeatherUnavailable::NoTiles => "No MetService tiles configured.",
            WeatherUnavailable::NoLayers => "No MetService layers available.",
        }
    }
}

/// Cycles through the configured weather overlays.
#[derive(Debug, Clone)]
pub struct WeatherCycle {
    config: WeatherConfig,
    keys: Vec<String>,
    index: usize,
}

impl WeatherCycle {
    /// Creates a cycle over the keys that have a non-empty tile url. Starts at the default key if
    /// it is available, or at the first available key.
    pub fn new(config: WeatherConfig) -> Self {
        let keys: Vec<String> = WEATHER_KEYS
            .iter()
            .filter(|key| {
                config
                    .tiles
                    .get(**key)
                    .is_some_and(|url| !url.trim().is_empty())
            })
            .map(|key| key.to_string())
            .collect();
        let index = keys
            .iter()
            .position(|key| *key == config.default_key)
            .unwrap_or(0);

        Self {
            config,
            keys,
            index,
        }
    }

    /// Available keys.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Selected key.
    pub fn current_key(&self) -> Option<&str> {
        self.keys.get(self.index).map(String::as_str)
    }

    /// Selects the next key, wrapping around after the last one.
    pub fn advance(&mut self) -> Result<&str, WeatherUnavailable> {
        if self.keys.is_empty() {
            return Err(WeatherUnavailable::NoLayers);
        }

        self.index = (self.index + 1) % self.keys.len();
        self.current_key().ok_or(WeatherUnavailable::NoLayers)
    }

    /// Overlay for the selected key. The tile url gets a cache buster, so every selection
    /// fetches fresh tiles.
    pub fn selection(&self, now: SystemTime) -> Result<WeatherSelection, WeatherUnavailable> {
        if self.config.provider != SUPPORTED_PROVIDER {
            return Err(WeatherUnavailable::UnsupportedProvider);
        }

        let key = self.current_key().ok_or(WeatherUnavailable::NoTiles)?;
        let url = self
            .config
            .tiles
            .get(key)
            .filter(|url| !url.trim().is_empty())
            .ok_or(WeatherUnavailable::NoTiles)?;

        debug!("Selected weather overlay {key}");
        Ok(WeatherSelection {
            key: key.to_string(),
            tiles_url: with_cache_buster(url, now),
            opacity: self.config.opacity,
        })
    }
}

/// Appends a `_cb=<unix millis>` query parameter to the url.
pub fn with_cache_buster(url: &str, now: SystemTime) -> String {
    let millis = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_cb={millis}")
}

/// Human readable name of a weather key: the key with the first letter capitalized.
pub fn weather_label(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
