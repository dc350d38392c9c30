use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use clap::ValueEnum;
use cross_xdg::BaseDirs;

/// Cells allocated up front before a program starts running.
pub const DEFAULT_TAPE_CELLS: usize = 30_000;

/// Upper bound on the up-front allocation. Larger requests are clamped;
/// the tape still grows past this on demand.
pub const MAX_TAPE_CELLS: usize = 1 << 24;

/// File name looked up inside the XDG config home.
pub const CONFIG_FILE_NAME: &str = "tapebf.toml";

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TAPEBF_CONFIG";

pub const TAPE_CELLS_ENV: &str = "TAPEBF_TAPE_CELLS";
pub const CELL_WIDTH_ENV: &str = "TAPEBF_CELL_WIDTH";
pub const LOOP_STRATEGY_ENV: &str = "TAPEBF_LOOP_STRATEGY";
pub const MAX_STEPS_ENV: &str = "TAPEBF_MAX_STEPS";
pub const TIMEOUT_MS_ENV: &str = "TAPEBF_TIMEOUT_MS";

/// Arithmetic width of a tape cell. Every write is reduced modulo `2^bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CellWidth {
    /// 8-bit wrapping cells (the classic behavior).
    #[default]
    Byte,
    /// 16-bit wrapping cells, wide enough for any UTF-16 code unit.
    Word,
    /// 32-bit wrapping cells.
    Wide,
}

impl CellWidth {
    pub fn mask(self) -> u32 {
        match self {
            CellWidth::Byte => 0xFF,
            CellWidth::Word => 0xFFFF,
            CellWidth::Wide => u32::MAX,
        }
    }

    /// Reduce `value` into the range this width can hold.
    pub fn reduce(self, value: u32) -> u32 {
        value & self.mask()
    }
}

/// How a `[` with a zero cell finds its matching `]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LoopStrategy {
    /// Scan forward at run time, counting bracket depth.
    #[default]
    Scan,
    /// Precompute matching positions once per execution.
    JumpTable,
}

/// Settings consumed by the interpreter engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub tape_cells: usize,
    pub cell_width: CellWidth,
    pub loop_strategy: LoopStrategy,
    pub max_steps: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tape_cells: DEFAULT_TAPE_CELLS,
            cell_width: CellWidth::default(),
            loop_strategy: LoopStrategy::default(),
            max_steps: None,
        }
    }
}

/// Fully resolved settings for one CLI invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub engine: EngineConfig,
    pub timeout_ms: Option<u64>,
}

/// One source of settings (flags, environment, or config file).
/// Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsLayer {
    pub tape_cells: Option<usize>,
    pub cell_width: Option<CellWidth>,
    pub loop_strategy: Option<LoopStrategy>,
    pub max_steps: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl SettingsLayer {
    /// Read the `TAPEBF_*` environment variables. Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            tape_cells: lookup(TAPE_CELLS_ENV).and_then(|s| s.trim().parse().ok()),
            cell_width: lookup(CELL_WIDTH_ENV).and_then(|s| CellWidth::from_str(s.trim(), true).ok()),
            loop_strategy: lookup(LOOP_STRATEGY_ENV)
                .and_then(|s| LoopStrategy::from_str(s.trim(), true).ok()),
            max_steps: lookup(MAX_STEPS_ENV).and_then(|s| s.trim().parse().ok()),
            timeout_ms: lookup(TIMEOUT_MS_ENV).and_then(|s| s.trim().parse().ok()),
        }
    }

    /// Load the `[engine]` section of the config file, if there is one.
    pub fn from_config_file() -> Self {
        config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .map(|content| parse_config(&content))
            .unwrap_or_default()
    }

    /// Fill every unset field of `self` from `fallback`.
    pub fn or(self, fallback: SettingsLayer) -> Self {
        Self {
            tape_cells: self.tape_cells.or(fallback.tape_cells),
            cell_width: self.cell_width.or(fallback.cell_width),
            loop_strategy: self.loop_strategy.or(fallback.loop_strategy),
            max_steps: self.max_steps.or(fallback.max_steps),
            timeout_ms: self.timeout_ms.or(fallback.timeout_ms),
        }
    }

    pub fn into_settings(self) -> Settings {
        let defaults = EngineConfig::default();
        Settings {
            engine: EngineConfig {
                tape_cells: self.tape_cells.unwrap_or(defaults.tape_cells).clamp(1, MAX_TAPE_CELLS),
                cell_width: self.cell_width.unwrap_or(defaults.cell_width),
                loop_strategy: self.loop_strategy.unwrap_or(defaults.loop_strategy),
                max_steps: self.max_steps.or(defaults.max_steps),
            },
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Resolve settings: flags -> env -> config file -> defaults.
pub fn resolve(flags: SettingsLayer) -> Settings {
    flags
        .or(SettingsLayer::from_env())
        .or(SettingsLayer::from_config_file())
        .into_settings()
}

fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }

    // On Linux: resolves to /home/<user>/.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    let mut path = PathBuf::from(base_dirs.config_home());
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

/// Parse the `[engine]` section of a small TOML-like file.
///
/// Only flat `key = value` pairs are understood; values may be quoted.
/// Unknown keys and malformed values are skipped.
pub fn parse_config(content: &str) -> SettingsLayer {
    let mut in_engine = false;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_engine = line[1..line.len() - 1].trim() == "engine";
            continue;
        }
        if !in_engine {
            continue;
        }
        if let Some((key, raw)) = line.split_once('=') {
            let raw = raw.trim();
            let value = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                &raw[1..raw.len() - 1]
            } else {
                raw
            };
            map.insert(key.trim().to_string(), value.to_string());
        }
    }

    SettingsLayer {
        tape_cells: map.get("tape_cells").and_then(|s| s.parse().ok()),
        cell_width: map.get("cell_width").and_then(|s| CellWidth::from_str(s, true).ok()),
        loop_strategy: map
            .get("loop_strategy")
            .and_then(|s| LoopStrategy::from_str(s, true).ok()),
        max_steps: map.get("max_steps").and_then(|s| s.parse().ok()),
        timeout_ms: map.get("timeout_ms").and_then(|s| s.parse().ok()),
    }
}
