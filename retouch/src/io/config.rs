//! Watcher configuration stored as TOML under the user's config directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::classifier::{GIT_RENORMALIZE_MARKER, MarkerClassifier};
use crate::core::types::WatchedRepo;
use crate::io::process::{DEFAULT_OUTPUT_LIMIT_BYTES, ProcessRunner};

pub const CONFIG_DIR_NAME: &str = "retouch";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Watcher configuration (TOML).
///
/// Edited by hand; missing fields default to the bootstrap values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Seconds to wait between the end of one timer cycle and the next.
    pub interval_secs: u64,

    /// Repository name → absolute working tree path. Empty paths are skipped.
    pub repos: BTreeMap<String, PathBuf>,

    pub command: CommandConfig,

    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Kill git commands running longer than this. Unset waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Truncate captured command output beyond this many bytes per stream.
    pub output_limit_bytes: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Phrase identifying git's renormalization warning.
    pub marker: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            marker: GIT_RENORMALIZE_MARKER.to_string(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            repos: BTreeMap::new(),
            command: CommandConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl WatcherConfig {
    /// Defaults written on first run: two example repositories under `~/dev`.
    pub fn bootstrap() -> Self {
        Self::bootstrap_in(dirs::home_dir().as_deref())
    }

    /// Bootstrap defaults relative to `home`; without a home directory no
    /// example repositories are listed.
    pub fn bootstrap_in(home: Option<&Path>) -> Self {
        let repos = match home {
            Some(home) => {
                let dev = home.join("dev");
                BTreeMap::from([
                    ("island".to_string(), dev.join("island")),
                    ("island_config".to_string(), dev.join("island_config")),
                ])
            }
            None => {
                warn!("no home directory; bootstrap config lists no repositories");
                BTreeMap::new()
            }
        };
        Self {
            repos,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(anyhow!("interval_secs must be > 0"));
        }
        if self.command.timeout_secs == Some(0) {
            return Err(anyhow!("command.timeout_secs must be > 0 when set"));
        }
        if self.command.output_limit_bytes == 0 {
            return Err(anyhow!("command.output_limit_bytes must be > 0"));
        }
        if self.classifier.marker.is_empty() {
            return Err(anyhow!("classifier.marker must not be empty"));
        }
        for (name, path) in &self.repos {
            if !path.as_os_str().is_empty() && !path.is_absolute() {
                return Err(anyhow!(
                    "repos.{name} must be an absolute path (got {})",
                    path.display()
                ));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Configured repositories in name order, skipping entries with empty paths.
    pub fn repositories(&self) -> Vec<WatchedRepo> {
        self.repos
            .iter()
            .filter(|(_, path)| !path.as_os_str().is_empty())
            .map(|(name, path)| WatchedRepo::new(name.clone(), path.clone()))
            .collect()
    }

    pub fn process_runner(&self) -> ProcessRunner {
        ProcessRunner::new(
            self.command.timeout_secs.map(Duration::from_secs),
            self.command.output_limit_bytes,
        )
    }

    pub fn classifier(&self) -> MarkerClassifier {
        MarkerClassifier::new(self.classifier.marker.clone())
    }
}

/// `<config dir>/retouch/config.toml` for the current user.
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("could not determine config directory")?;
    Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from a TOML file.
///
/// If the file is missing, the bootstrap config is written there and returned.
pub fn load_config(path: &Path) -> Result<WatcherConfig> {
    if !path.exists() {
        let cfg = WatcherConfig::bootstrap();
        write_config(path, &cfg)?;
        info!(path = %path.display(), "wrote default config");
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WatcherConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    if cfg.repositories().is_empty() {
        warn!(path = %path.display(), "no repositories configured");
    }
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WatcherConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs(temp: &tempfile::TempDir, name: &str) -> PathBuf {
        temp.path().join(name)
    }

    #[test]
    fn load_missing_writes_bootstrap() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested/config.toml");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg, WatcherConfig::bootstrap());
        assert_eq!(cfg.interval_secs, 10);
        assert_eq!(cfg.repositories().len(), 2);
        assert!(path.exists());

        let again = load_config(&path).expect("reload");
        assert_eq!(again, cfg);
    }

    #[test]
    fn bootstrap_without_home_is_still_valid() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = WatcherConfig::bootstrap_in(None);

        assert!(cfg.repos.is_empty());
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn bootstrap_lists_repositories_under_home_dev() {
        let cfg = WatcherConfig::bootstrap_in(Some(Path::new("/home/me")));
        assert_eq!(
            cfg.repos.get("island"),
            Some(&PathBuf::from("/home/me/dev/island"))
        );
        assert_eq!(
            cfg.repos.get("island_config"),
            Some(&PathBuf::from("/home/me/dev/island_config"))
        );
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = WatcherConfig {
            interval_secs: 30,
            repos: BTreeMap::from([("a".to_string(), abs(&temp, "a"))]),
            command: CommandConfig {
                timeout_secs: Some(60),
                output_limit_bytes: 4096,
            },
            classifier: ClassifierConfig::default(),
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn parses_hand_written_file_with_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let repo = abs(&temp, "island");
        fs::write(
            &path,
            format!("[repos]\nisland = {:?}\nempty = \"\"\n", repo.display().to_string()),
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.interval(), Duration::from_secs(10));
        assert_eq!(cfg.classifier.marker, GIT_RENORMALIZE_MARKER);
        assert_eq!(cfg.command.timeout_secs, None);
        assert_eq!(cfg.repositories(), vec![WatchedRepo::new("island", repo)]);
    }

    #[test]
    fn repositories_are_sorted_by_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = WatcherConfig {
            repos: BTreeMap::from([
                ("zeta".to_string(), abs(&temp, "z")),
                ("alpha".to_string(), abs(&temp, "a")),
            ]),
            ..WatcherConfig::default()
        };
        let names: Vec<String> = cfg.repositories().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn rejects_zero_interval() {
        let cfg = WatcherConfig {
            interval_secs: 0,
            ..WatcherConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_relative_repo_path() {
        let cfg = WatcherConfig {
            repos: BTreeMap::from([("rel".to_string(), PathBuf::from("dev/rel"))]),
            ..WatcherConfig::default()
        };
        let err = cfg.validate().expect_err("relative path");
        assert!(err.to_string().contains("repos.rel"));
    }

    #[test]
    fn rejects_empty_marker() {
        let cfg = WatcherConfig {
            classifier: ClassifierConfig {
                marker: String::new(),
            },
            ..WatcherConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "interval_secs = 0\n").expect("write");
        assert!(load_config(&path).is_err());
    }
}
