use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;

/// Config file name constants.
pub const CONFIG_TOML: &str = "idiombot.toml";
pub const CONFIG_JSON: &str = "idiombot.json";

/// Log levels accepted by `log.level` and `--log-level`, compared case-insensitively.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Find the config file path, preferring idiombot.toml over idiombot.json.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// `<config_dir>/idiombot/idiombot.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idiombot").join(CONFIG_TOML))
}

/// Resolve and load the effective config.
///
/// Priority order (highest first):
/// 1. An explicit `--config` path (must exist)
/// 2. `idiombot.toml` / `idiombot.json` in `dir`
/// 3. The per-user config file
/// 4. Built-in defaults
///
/// Returns the config and the path it came from, if any.
pub fn load_effective(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = Config::load(path)?;
        return Ok((config, Some(path.to_path_buf())));
    }
    let found = find_config(dir).or_else(|| user_config_path().filter(|p| p.exists()));
    match found {
        Some(path) => Ok((Config::load(&path)?, Some(path))),
        None => Ok((Config::default(), None)),
    }
}

/// Top-level idiombot.toml config. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub idioms: IdiomsConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BotConfig {
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Message that starts a guessing session.
    #[serde(default = "default_trigger")]
    pub trigger: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            trigger: default_trigger(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily log files. Empty disables file logging.
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_keep_days", alias = "keepDays", alias = "logDate")]
    pub keep_days: u32,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            keep_days: default_keep_days(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IdiomsConfig {
    /// Try the local picture pool before the remote source.
    #[serde(default, alias = "localFirst")]
    pub local_first: bool,
    /// Pictures named `<answer>.png` or `<answer>.jpg`.
    #[serde(default = "default_image_dir", alias = "imageDir")]
    pub image_dir: PathBuf,
    /// JSON endpoint returning one puzzle per request.
    #[serde(default, alias = "remoteUrl")]
    pub remote_url: Option<String>,
    #[serde(default = "default_timeout_300", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl IdiomsConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IdiomsConfig {
    fn default() -> Self {
        Self {
            local_first: false,
            image_dir: default_image_dir(),
            remote_url: None,
            timeout_secs: default_timeout_300(),
        }
    }
}

/// User-facing texts, rendered as minijinja templates.
///
/// Available variables: `answer`, `owner`, `solver`, `nickname`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessagesConfig {
    #[serde(default = "default_msg_busy")]
    pub busy: String,
    #[serde(default = "default_msg_failed")]
    pub failed: String,
    #[serde(default = "default_msg_announce")]
    pub announce: String,
    #[serde(default = "default_msg_solved")]
    pub solved: String,
    #[serde(default = "default_msg_cancelled")]
    pub cancelled: String,
    #[serde(default = "default_msg_timeout")]
    pub timeout: String,
    #[serde(default = "default_msg_wrong")]
    pub wrong: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            busy: default_msg_busy(),
            failed: default_msg_failed(),
            announce: default_msg_announce(),
            solved: default_msg_solved(),
            cancelled: default_msg_cancelled(),
            timeout: default_msg_timeout(),
            wrong: default_msg_wrong(),
        }
    }
}

// Default value functions for serde
fn default_nickname() -> String { "派蒙".into() }
fn default_trigger() -> String { "猜成语".into() }
fn default_log_level() -> String { "info".into() }
fn default_log_dir() -> String { "log".into() }
const fn default_keep_days() -> u32 { 30 }
fn default_image_dir() -> PathBuf { PathBuf::from("data/img/idioms") }
const fn default_timeout_300() -> u64 { 300 }
fn default_msg_busy() -> String { "群里还有正在猜的成语，先把它猜出来吧".into() }
fn default_msg_failed() -> String { "失败了...".into() }
fn default_msg_announce() -> String { "猜不出来的话，跟我说\"算了\"或者\"不知道\"".into() }
fn default_msg_solved() -> String { "猜对啦".into() }
fn default_msg_cancelled() -> String { "那算啦，其实正确答案是{{ answer }}哦".into() }
fn default_msg_timeout() -> String { "太久啦，其实正确答案是{{ answer }}哦".into() }
fn default_msg_wrong() -> String { "猜错了哦".into() }

impl Config {
    /// Load config from a file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents)),
        }?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")).into())
    }

    /// Parse config from a JSON string.
    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_JSON}: {e}")).into())
    }

    /// Check values serde can't: log level, timeout and message templates.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_log_level(&self.log.level) {
            return Err(ExitError::Config(format!(
                "unknown log level {:?}, valid levels: {LOG_LEVELS:?}",
                self.log.level
            ))
            .into());
        }
        if self.log.keep_days == 0 {
            return Err(ExitError::Config("log.keep_days must be positive".into()).into());
        }
        if self.idioms.timeout_secs == 0 {
            return Err(ExitError::Config("idioms.timeout_secs must be positive".into()).into());
        }
        if self.bot.trigger.trim().is_empty() {
            return Err(ExitError::Config("bot.trigger must not be empty".into()).into());
        }
        crate::template::Messages::new(&self.messages, &self.bot.nickname)?;
        Ok(())
    }

    /// Serialize config to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self).context("serializing config to TOML")?;

        let mut doc: toml_edit::DocumentMut = raw
            .parse()
            .context("parsing generated TOML for comment injection")?;

        doc.decor_mut()
            .set_prefix("# idiombot configuration\n\n");

        fn set_table_comment(doc: &mut toml_edit::DocumentMut, key: &str, comment: &str) {
            if let Some(tbl) = doc.get_mut(key).and_then(toml_edit::Item::as_table_mut) {
                tbl.decor_mut().set_prefix(comment);
            }
        }

        set_table_comment(&mut doc, "bot", "# Bot identity and the word that starts a game\n");
        set_table_comment(&mut doc, "log", "\n# Logging (level: trace|debug|info|warn|error; empty dir disables files)\n");
        set_table_comment(&mut doc, "idioms", "\n# Puzzle sources and the guessing window in seconds\n");
        set_table_comment(&mut doc, "messages", "\n# Reply templates (minijinja); variables: answer, owner, solver, nickname\n");

        Ok(doc.to_string())
    }
}

pub fn is_log_level(level: &str) -> bool {
    LOG_LEVELS.iter().any(|l| l.eq_ignore_ascii_case(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.bot.trigger, "猜成语");
        assert_eq!(config.bot.nickname, "派蒙");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.keep_days, 30);
        assert!(!config.idioms.local_first);
        assert_eq!(config.idioms.timeout(), Duration::from_secs(300));
        assert!(config.idioms.remote_url.is_none());
        assert_eq!(config.messages.wrong, "猜错了哦");
    }

    #[test]
    fn parse_overrides() {
        let toml_str = r#"
[bot]
trigger = "idiom"

[log]
level = "DEBUG"
dir = ""

[idioms]
local_first = true
image_dir = "/srv/idioms"
remote_url = "https://example.com/puzzle"
timeout_secs = 60

[messages]
solved = "{{ solver }} got it"
"#;
        let config = Config::parse_toml(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.bot.trigger, "idiom");
        assert_eq!(config.log.dir, "");
        assert!(config.idioms.local_first);
        assert_eq!(config.idioms.image_dir, PathBuf::from("/srv/idioms"));
        assert_eq!(config.idioms.remote_url.as_deref(), Some("https://example.com/puzzle"));
        assert_eq!(config.idioms.timeout_secs, 60);
        assert_eq!(config.messages.solved, "{{ solver }} got it");
        // untouched templates keep defaults
        assert_eq!(config.messages.busy, "群里还有正在猜的成语，先把它猜出来吧");
    }

    #[test]
    fn parse_json_camel_case_aliases() {
        let json = r#"{
            "log": { "logDate": 7 },
            "idioms": { "localFirst": true, "imageDir": "pics" }
        }"#;
        let config = Config::parse_json(json).unwrap();
        assert_eq!(config.log.keep_days, 7);
        assert!(config.idioms.local_first);
        assert_eq!(config.idioms.image_dir, PathBuf::from("pics"));
    }

    #[test]
    fn parse_malformed_toml() {
        let err = Config::parse_toml("not valid toml [[[").unwrap_err();
        assert!(err.to_string().contains("invalid idiombot.toml"));
        assert!(err.downcast_ref::<ExitError>().is_some());
    }

    #[test]
    fn parse_malformed_json() {
        let err = Config::parse_json("not json").unwrap_err();
        assert!(err.to_string().contains("invalid idiombot.json"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.log.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.idioms.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.log.keep_days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.messages.cancelled = "{{ answer".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip_toml() {
        let mut config = Config::default();
        config.idioms.remote_url = Some("https://example.com/p".into());
        let output = config.to_toml().unwrap();
        assert!(output.starts_with("# idiombot configuration"));
        assert!(output.contains("# Reply templates"));
        let config2 = Config::parse_toml(&output).unwrap();
        assert_eq!(config2.idioms.remote_url, config.idioms.remote_url);
        assert_eq!(config2.messages.cancelled, config.messages.cancelled);
    }

    #[test]
    fn find_config_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_TOML), "").unwrap();
        std::fs::write(dir.path().join(CONFIG_JSON), "{}").unwrap();
        let found = find_config(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with(CONFIG_TOML));
    }

    #[test]
    fn find_config_falls_back_to_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_JSON), "{}").unwrap();
        let found = find_config(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with(CONFIG_JSON));
    }

    #[test]
    fn find_config_returns_none_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config(dir.path()).is_none());
    }

    #[test]
    fn load_effective_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[bot]\ntrigger = \"go\"\n").unwrap();
        let (config, source) = load_effective(Some(&path), dir.path()).unwrap();
        assert_eq!(config.bot.trigger, "go");
        assert_eq!(source, Some(path));
    }

    #[test]
    fn load_effective_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_TOML), "[idioms]\ntimeout_secs = 5\n").unwrap();
        let (config, source) = load_effective(None, dir.path()).unwrap();
        assert_eq!(config.idioms.timeout_secs, 5);
        assert!(source.is_some());
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_TOML);
        std::fs::write(&path, "[log]\nlevel = \"chatty\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("unknown log level"));
    }

    #[test]
    fn log_levels_case_insensitive() {
        assert!(is_log_level("Info"));
        assert!(is_log_level("WARN"));
        assert!(!is_log_level("verbose"));
    }
}
