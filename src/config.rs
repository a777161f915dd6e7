use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::*;
use crate::scheduler::RotationWindow;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration as read from YAML. Every field is optional so
/// files and CLI flags can be layered; [`Config::settings`] resolves defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub listen: Option<String>,        // e.g., "0.0.0.0:8080"
    pub static_dir: Option<PathBuf>,
    pub pictures_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub upload_limit_bytes: Option<usize>,
    pub panel: Option<PanelConfig>,
    pub rotation: Option<RotationConfig>,
    pub renderer: Option<RendererConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RotationConfig {
    pub enabled: Option<bool>,
    pub start_hour: Option<u32>,    // inclusive, local time
    pub end_hour: Option<u32>,      // inclusive, local time
    pub interval_mins: Option<u32>,
    pub poll_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RendererConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,  // "{path}" is replaced by the picture path
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "picframe", about = "Slideshow picture frame", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub listen: Option<String>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub pictures_dir: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub static_dir: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub state_file: Option<PathBuf>,
    #[arg(long)]
    pub start_hour: Option<u32>,
    #[arg(long)]
    pub end_hour: Option<u32>,
    #[arg(long)]
    pub interval_mins: Option<u32>,
    #[arg(long)]
    pub poll_secs: Option<u64>,
    /// disable automatic rotation (manual display only)
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_rotation: bool,
    #[arg(long)]
    pub renderer: Option<String>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Fully resolved settings handed to the rest of the frame.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub listen: SocketAddr,
    pub static_dir: PathBuf,
    pub pictures_dir: PathBuf,
    pub state_file: PathBuf,
    pub upload_limit_bytes: usize,
    pub panel_width: u32,
    pub panel_height: u32,
    pub rotation_enabled: bool,
    pub window: RotationWindow,
    pub poll: Duration,
    pub renderer_program: String,
    pub renderer_args: Vec<String>,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
///
/// Returns `None` when `--dump-config` asked us to print and stop.
pub fn load() -> Result<Option<Settings>, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        return Ok(None);
    }

    Ok(Some(cfg.settings()?))
}

/// Layer defaults, YAML and `cli` into one config.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/picframe/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/picframe/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/picframe.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["picframe.yaml", "config.yaml", "config/picframe.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()          { dst.log_level = src.log_level; }
    if src.listen.is_some()             { dst.listen = src.listen; }
    if src.static_dir.is_some()         { dst.static_dir = src.static_dir; }
    if src.pictures_dir.is_some()       { dst.pictures_dir = src.pictures_dir; }
    if src.state_file.is_some()         { dst.state_file = src.state_file; }
    if src.upload_limit_bytes.is_some() { dst.upload_limit_bytes = src.upload_limit_bytes; }
    match (&mut dst.panel, src.panel) {
        (None, Some(c)) => dst.panel = Some(c),
        (Some(d), Some(s)) => {
            if s.width.is_some()  { d.width = s.width; }
            if s.height.is_some() { d.height = s.height; }
        }
        _ => {}
    }
    match (&mut dst.rotation, src.rotation) {
        (None, Some(c)) => dst.rotation = Some(c),
        (Some(d), Some(s)) => merge_rotation(d, s),
        _ => {}
    }
    match (&mut dst.renderer, src.renderer) {
        (None, Some(c)) => dst.renderer = Some(c),
        (Some(d), Some(s)) => {
            if s.program.is_some() { d.program = s.program; }
            if s.args.is_some()    { d.args = s.args; }
        }
        _ => {}
    }
}

fn merge_rotation(dst: &mut RotationConfig, src: RotationConfig) {
    if src.enabled.is_some()       { dst.enabled = src.enabled; }
    if src.start_hour.is_some()    { dst.start_hour = src.start_hour; }
    if src.end_hour.is_some()      { dst.end_hour = src.end_hour; }
    if src.interval_mins.is_some() { dst.interval_mins = src.interval_mins; }
    if src.poll_secs.is_some()     { dst.poll_secs = src.poll_secs; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()    { cfg.log_level = cli.log_level.clone(); }
    if cli.listen.is_some()       { cfg.listen = cli.listen.clone(); }
    if cli.pictures_dir.is_some() { cfg.pictures_dir = cli.pictures_dir.clone(); }
    if cli.static_dir.is_some()   { cfg.static_dir = cli.static_dir.clone(); }
    if cli.state_file.is_some()   { cfg.state_file = cli.state_file.clone(); }

    let rotation = RotationConfig {
        enabled: cli.no_rotation.then_some(false),
        start_hour: cli.start_hour,
        end_hour: cli.end_hour,
        interval_mins: cli.interval_mins,
        poll_secs: cli.poll_secs,
    };
    match cfg.rotation.as_mut() {
        Some(r) => merge_rotation(r, rotation),
        None => cfg.rotation = Some(rotation),
    }

    if let Some(program) = cli.renderer.as_ref() {
        cfg.renderer.get_or_insert_with(RendererConfig::default).program = Some(program.clone());
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(listen) = cfg.listen.as_ref() {
        listen.parse::<SocketAddr>()
            .map_err(|e| ConfigError::Validation(format!("listen address {:?}: {}", listen, e)))?;
    }
    if let Some(panel) = cfg.panel.as_ref() {
        if panel.width == Some(0) || panel.height == Some(0) {
            return Err(ConfigError::Validation("panel width/height must be > 0".into()));
        }
    }
    if let Some(rotation) = cfg.rotation.as_ref() {
        for hour in [rotation.start_hour, rotation.end_hour].into_iter().flatten() {
            if hour > 23 {
                return Err(ConfigError::Validation("rotation hours must be 0..=23".into()));
            }
        }
        if rotation.interval_mins == Some(0) {
            return Err(ConfigError::Validation("rotation interval_mins must be > 0".into()));
        }
        if rotation.poll_secs == Some(0) {
            return Err(ConfigError::Validation("rotation poll_secs must be > 0".into()));
        }
    }
    if let Some(renderer) = cfg.renderer.as_ref() {
        if renderer.program.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation("renderer program must not be empty".into()));
        }
    }
    if cfg.upload_limit_bytes == Some(0) {
        return Err(ConfigError::Validation("upload_limit_bytes must be > 0".into()));
    }
    Ok(())
}

impl Config {
    /// Resolve defaults. Call after validation.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let listen = self.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
        let listen = listen.parse::<SocketAddr>()
            .map_err(|e| ConfigError::Validation(format!("listen address {:?}: {}", listen, e)))?;

        let pictures_dir = self.pictures_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_PICTURES_DIR));
        let static_dir = self.static_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        // beside the static root: never listed as a picture, never served
        let state_file = self.state_file.clone().unwrap_or_else(|| {
            static_dir.parent().unwrap_or(Path::new(".")).join(STATE_FILE_NAME)
        });

        let panel = self.panel.clone().unwrap_or_default();
        let rotation = self.rotation.clone().unwrap_or_default();
        let renderer = self.renderer.clone().unwrap_or_default();

        Ok(Settings {
            log_level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
            listen,
            static_dir,
            pictures_dir,
            state_file,
            upload_limit_bytes: self.upload_limit_bytes.unwrap_or(DEFAULT_UPLOAD_LIMIT_BYTES),
            panel_width: panel.width.unwrap_or(PANEL_WIDTH),
            panel_height: panel.height.unwrap_or(PANEL_HEIGHT),
            rotation_enabled: rotation.enabled.unwrap_or(true),
            window: RotationWindow::new(
                rotation.start_hour.unwrap_or(DEFAULT_ACTIVE_START_HOUR),
                rotation.end_hour.unwrap_or(DEFAULT_ACTIVE_END_HOUR),
                chrono::Duration::minutes(rotation.interval_mins.unwrap_or(DEFAULT_ROTATION_INTERVAL_MINS) as i64),
            ),
            poll: Duration::from_secs(rotation.poll_secs.unwrap_or(DEFAULT_POLL_SECS)),
            renderer_program: renderer.program.unwrap_or_else(|| DEFAULT_RENDERER_PROGRAM.to_string()),
            renderer_args: renderer.args.unwrap_or_else(|| vec![
                DEFAULT_RENDERER_SCRIPT.to_string(),
                "--file".to_string(),
                RENDERER_PATH_PLACEHOLDER.to_string(),
            ]),
        })
    }
}
