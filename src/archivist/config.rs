use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archivist::classify::Zone;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub logs_dir: PathBuf,
    pub timezone: String,
    pub dedupe_identical: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            timezone: "local".to_string(),
            dedupe_identical: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub initial_delay_secs: u64,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchivistConfig {
    pub archive: ArchiveConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialArchivistConfig {
    archive: Option<ArchiveConfig>,
    schedule: Option<ScheduleConfig>,
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub logs_dir: PathBuf,
    pub zone: Zone,
    pub dedupe_identical: bool,
}

impl ArchivistConfig {
    pub fn settings(&self) -> Result<ArchiveSettings> {
        Ok(ArchiveSettings {
            logs_dir: self.archive.logs_dir.clone(),
            zone: parse_zone(&self.archive.timezone)?,
            dedupe_identical: self.archive.dedupe_identical,
        })
    }
}

pub fn parse_zone(raw: &str) -> Result<Zone> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("local") {
        return Ok(Zone::Local);
    }
    trimmed
        .parse::<Tz>()
        .map(Zone::Named)
        .map_err(|err| anyhow!("invalid timezone `{trimmed}`: {err}"))
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_path(var: &str, fallback: &Path) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback.to_path_buf(),
    }
}

fn validate(cfg: &ArchivistConfig) -> Result<()> {
    if cfg.archive.logs_dir.as_os_str().is_empty() {
        return Err(anyhow!("invalid logs dir: cannot be empty"));
    }
    if cfg.schedule.interval_secs == 0 {
        return Err(anyhow!("invalid schedule interval: must be >= 1 second"));
    }
    parse_zone(&cfg.archive.timezone)?;
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("ARCHIVIST_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("archivist").join("archivist.toml"))
}

fn merge_file_config(base: &mut ArchivistConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialArchivistConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse archivist config {}: {err}", path.display()))?;
    if let Some(archive) = parsed.archive {
        base.archive = archive;
    }
    if let Some(schedule) = parsed.schedule {
        base.schedule = schedule;
    }
    Ok(())
}

/// Defaults, then the TOML file, then `ARCHIVIST_*` env vars, then the CLI override.
pub fn load_config(logs_dir_override: Option<&Path>) -> Result<ArchivistConfig> {
    let mut cfg = ArchivistConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.archive.logs_dir = env_or_path("ARCHIVIST_LOGS_DIR", &cfg.archive.logs_dir);
    cfg.archive.timezone = env_or_string("ARCHIVIST_TIMEZONE", &cfg.archive.timezone);
    cfg.archive.dedupe_identical =
        env_or_bool("ARCHIVIST_DEDUPE_IDENTICAL", cfg.archive.dedupe_identical);
    cfg.schedule.initial_delay_secs = env_or_u64(
        "ARCHIVIST_INITIAL_DELAY_SECS",
        cfg.schedule.initial_delay_secs,
    );
    cfg.schedule.interval_secs =
        env_or_u64("ARCHIVIST_INTERVAL_SECS", cfg.schedule.interval_secs);

    if let Some(dir) = logs_dir_override {
        cfg.archive.logs_dir = dir.to_path_buf();
    }

    validate(&cfg)?;
    Ok(cfg)
}
