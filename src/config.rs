/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems found while loading are collected in `GameConfig::warnings`
/// so they can be logged once the logger is up.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub play: PlayConfig,
    pub speed: SpeedConfig,
    pub gamepad: GamepadConfig,
    pub general: GeneralConfig,
    pub warnings: Vec<String>,
}

/// Rules of a run: play-area size, starting resources, wave pacing.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayConfig {
    pub width: f32,
    pub height: f32,
    pub initial_lives: u32,
    pub fire_rate_ms: u64,
    pub player_speed: f32,
    pub initial_quota: u32,
    pub quota_step: u32,
    pub spawn_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub frame_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub fire: Vec<String>,
    pub upgrade_speed: Vec<String>,
    pub upgrade_gun: Vec<String>,
    pub upgrade_graphics: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub seed: Option<u64>,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for PlayConfig {
    fn default() -> Self {
        PlayConfig {
            width: default_width(),
            height: default_height(),
            initial_lives: default_lives(),
            fire_rate_ms: default_fire_rate(),
            player_speed: default_player_speed(),
            initial_quota: default_quota(),
            quota_step: default_quota_step(),
            spawn_interval_ms: default_spawn_interval(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    play: TomlPlay,
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPlay {
    #[serde(default = "default_width")]
    width: f32,
    #[serde(default = "default_height")]
    height: f32,
    #[serde(default = "default_lives")]
    initial_lives: u32,
    #[serde(default = "default_fire_rate")]
    fire_rate_ms: u64,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_quota")]
    initial_quota: u32,
    #[serde(default = "default_quota_step")]
    quota_step: u32,
    #[serde(default = "default_spawn_interval")]
    spawn_interval_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_fire")]
    fire: Vec<String>,
    #[serde(default = "default_upgrade_speed")]
    upgrade_speed: Vec<String>,
    #[serde(default = "default_upgrade_gun")]
    upgrade_gun: Vec<String>,
    #[serde(default = "default_upgrade_graphics")]
    upgrade_graphics: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_width() -> f32 { 800.0 }
fn default_height() -> f32 { 600.0 }
fn default_lives() -> u32 { 3 }
fn default_fire_rate() -> u64 { 500 }
fn default_player_speed() -> f32 { 3.0 }
fn default_quota() -> u32 { 15 }
fn default_quota_step() -> u32 { 5 }
fn default_spawn_interval() -> u64 { 1000 }
fn default_frame_ms() -> u64 { 16 }   // ~60 fps

fn default_fire() -> Vec<String> { vec!["A".into(), "R1".into()] }
fn default_upgrade_speed() -> Vec<String> { vec!["X".into()] }
fn default_upgrade_gun() -> Vec<String> { vec!["Y".into()] }
fn default_upgrade_graphics() -> Vec<String> { vec!["B".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_log_file() -> String { "starstrike.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlPlay {
    fn default() -> Self {
        TomlPlay {
            width: default_width(),
            height: default_height(),
            initial_lives: default_lives(),
            fire_rate_ms: default_fire_rate(),
            player_speed: default_player_speed(),
            initial_quota: default_quota(),
            quota_step: default_quota_step(),
            spawn_interval_ms: default_spawn_interval(),
        }
    }
}

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed { frame_ms: default_frame_ms() }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            fire: default_fire(),
            upgrade_speed: default_upgrade_speed(),
            upgrade_gun: default_upgrade_gun(),
            upgrade_graphics: default_upgrade_graphics(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            seed: None,
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let mut warnings = vec![];
        let toml_cfg = load_toml(&candidate_dirs(), &mut warnings);
        GameConfig::from_toml(toml_cfg, warnings)
    }

    /// Parse a config document. Unlike `load`, a syntax error is returned.
    #[cfg(test)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, vec![]))
    }

    fn from_toml(toml_cfg: TomlConfig, mut warnings: Vec<String>) -> Self {
        let play = sanitize_play(toml_cfg.play, &mut warnings);

        let frame_ms = if toml_cfg.speed.frame_ms == 0 {
            warnings.push("speed.frame_ms must be positive, using default".into());
            default_frame_ms()
        } else {
            toml_cfg.speed.frame_ms
        };

        GameConfig {
            play,
            speed: SpeedConfig { frame_ms },
            gamepad: GamepadConfig {
                fire: toml_cfg.gamepad.fire,
                upgrade_speed: toml_cfg.gamepad.upgrade_speed,
                upgrade_gun: toml_cfg.gamepad.upgrade_gun,
                upgrade_graphics: toml_cfg.gamepad.upgrade_graphics,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            general: GeneralConfig {
                seed: toml_cfg.general.seed,
                log_file: PathBuf::from(toml_cfg.general.log_file),
                log_level: toml_cfg.general.log_level,
            },
            warnings,
        }
    }
}

/// Replace nonsensical values with their defaults, noting each one.
fn sanitize_play(p: TomlPlay, warnings: &mut Vec<String>) -> PlayConfig {
    let mut out = PlayConfig {
        width: p.width,
        height: p.height,
        initial_lives: p.initial_lives,
        fire_rate_ms: p.fire_rate_ms,
        player_speed: p.player_speed,
        initial_quota: p.initial_quota,
        quota_step: p.quota_step,
        spawn_interval_ms: p.spawn_interval_ms,
    };
    let defaults = PlayConfig::default();

    // The play area must at least fit a ship and a couple of enemies.
    if !(out.width >= 100.0) {
        warnings.push(format!("play.width {} too small, using {}", out.width, defaults.width));
        out.width = defaults.width;
    }
    if !(out.height >= 100.0) {
        warnings.push(format!("play.height {} too small, using {}", out.height, defaults.height));
        out.height = defaults.height;
    }
    if out.initial_lives == 0 {
        warnings.push("play.initial_lives must be at least 1, using default".into());
        out.initial_lives = defaults.initial_lives;
    }
    if out.initial_quota == 0 {
        warnings.push("play.initial_quota must be at least 1, using default".into());
        out.initial_quota = defaults.initial_quota;
    }
    if !(out.player_speed > 0.0) {
        warnings.push("play.player_speed must be positive, using default".into());
        out.player_speed = defaults.player_speed;
    }
    out
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("config.toml parse error: {e}; using default settings"));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.play, PlayConfig::default());
        assert_eq!(cfg.play.initial_lives, 3);
        assert_eq!(cfg.play.initial_quota, 15);
        assert_eq!(cfg.speed.frame_ms, 16);
        assert_eq!(cfg.general.seed, None);
        assert!(cfg.warnings.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[play]\ninitial_lives = 5\n\n[general]\nseed = 42\n",
        ).unwrap();
        assert_eq!(cfg.play.initial_lives, 5);
        assert_eq!(cfg.play.fire_rate_ms, 500);
        assert_eq!(cfg.general.seed, Some(42));
        assert_eq!(cfg.gamepad.confirm, vec!["Start".to_string()]);
    }

    #[test]
    fn invalid_values_fall_back_with_warning() {
        let cfg = GameConfig::from_toml_str(
            "[play]\nwidth = 10.0\ninitial_quota = 0\n\n[speed]\nframe_ms = 0\n",
        ).unwrap();
        assert_eq!(cfg.play.width, 800.0);
        assert_eq!(cfg.play.initial_quota, 15);
        assert_eq!(cfg.speed.frame_ms, 16);
        assert_eq!(cfg.warnings.len(), 3);
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(GameConfig::from_toml_str("[play\nwidth = ").is_err());
    }
}
