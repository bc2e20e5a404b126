use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::links::DEFAULT_COOLDOWN_DAYS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    pub profile_file: String,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            profile_file: "data/traffic-url-profile.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    pub enabled: bool,
    pub pool_file: String,
    pub cooldown_days: u32,
    pub generated_dir: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pool_file: "data/note-internal-links.json".to_string(),
            cooldown_days: DEFAULT_COOLDOWN_DAYS,
            generated_dir: "generated".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub traffic: TrafficConfig,
    pub links: LinksConfig,
}

impl EngineConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse config: {}", err))?
            } else {
                EngineConfig::default()
            }
        } else {
            EngineConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create config dir: {}", err))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload).map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = env::var("NOTE_INTERNAL_LINKS_ENABLED") {
            if !enabled.trim().is_empty() {
                self.links.enabled = parse_bool(&enabled);
            }
        }
        if let Ok(pool_file) = env::var("NOTE_INTERNAL_LINK_POOL_FILE") {
            if !pool_file.trim().is_empty() {
                self.links.pool_file = pool_file;
            }
        }
        if let Ok(profile_file) = env::var("TRAFFIC_URL_PROFILE_FILE") {
            if !profile_file.trim().is_empty() {
                self.traffic.profile_file = profile_file;
            }
        }
    }
}

fn parse_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}

fn default_config_path() -> Option<PathBuf> {
    env::var("PLANNER_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/planner.toml")))
}
