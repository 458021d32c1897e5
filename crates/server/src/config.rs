// crates/server/src/config.rs
//! Server configuration loaded from environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use playbook_runner_jobs::{AutomationSettings, GitRemote};
use playbook_runner_observability::{LogConfig, LogFormat};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the server needs besides its bind address.
///
/// | Env Var                | Default            |
/// |------------------------|--------------------|
/// | `GIT_USER`             | required           |
/// | `GIT_PASSWORD`         | required           |
/// | `GIT_URL`              | required           |
/// | `GIT_BRANCH`           | `main`             |
/// | `ANSIBLE_DIR`          | required           |
/// | `ANSIBLE_USER`         | required           |
/// | `ANSIBLE_PWD`          | required           |
/// | `INVENTORY_DIR`        | `inventory`        |
/// | `GIT_BIN`              | `git`              |
/// | `ANSIBLE_PLAYBOOK_BIN` | `ansible-playbook` |
/// | `LOG_POLL_INTERVAL_MS` | `500`              |
/// | `LOG_FORMAT`           | `compact`          |
/// | `LOG_DIR`              | unset              |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub automation: AutomationSettings,
    pub log: LogConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let git = GitRemote {
            user: required("GIT_USER")?,
            password: required("GIT_PASSWORD")?,
            url: required("GIT_URL")?,
            branch: get("GIT_BRANCH").unwrap_or_else(|| "main".into()),
        };

        let workdir = PathBuf::from(required("ANSIBLE_DIR")?);
        let inventory_dir = absolutize(Path::new(
            &get("INVENTORY_DIR").unwrap_or_else(|| "inventory".into()),
        ))?;

        let mut automation = AutomationSettings::new(git, workdir, inventory_dir)
            .with_ansible_credentials(required("ANSIBLE_USER")?, required("ANSIBLE_PWD")?);
        if let Some(bin) = get("GIT_BIN") {
            automation.git_program = bin;
        }
        if let Some(bin) = get("ANSIBLE_PLAYBOOK_BIN") {
            automation.playbook_program = bin;
        }
        if let Some(raw) = get("LOG_POLL_INTERVAL_MS") {
            automation.poll_interval = parse_poll_interval(&raw)?;
        }

        let mut log = LogConfig::default();
        if let Some(raw) = get("LOG_FORMAT") {
            log.format = raw.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                var: "LOG_FORMAT",
                value: raw.clone(),
                reason,
            })?;
        }
        log.dir = get("LOG_DIR").map(PathBuf::from);

        Ok(Self { automation, log })
    }
}

fn parse_poll_interval(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: "LOG_POLL_INTERVAL_MS",
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let ms: u64 = raw.trim().parse().map_err(|_| invalid("not a whole number"))?;
    if ms == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

fn absolutize(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ConfigError::Invalid {
            var: "INVENTORY_DIR",
            value: path.display().to_string(),
            reason: format!("cannot resolve relative path: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("GIT_USER", "bot"),
        ("GIT_PASSWORD", "pw"),
        ("GIT_URL", "git.example.com/ops.git"),
        ("ANSIBLE_DIR", "/srv/ansible"),
        ("ANSIBLE_USER", "ops"),
        ("ANSIBLE_PWD", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(REQUIRED)).unwrap();
        let a = &config.automation;
        assert_eq!(a.git.branch, "main");
        assert_eq!(a.git_program, "git");
        assert_eq!(a.playbook_program, "ansible-playbook");
        assert_eq!(a.workdir, PathBuf::from("/srv/ansible"));
        assert!(a.inventory_dir.is_absolute());
        assert!(a.inventory_dir.ends_with("inventory"));
        assert_eq!(a.poll_interval, Duration::from_millis(500));
        assert_eq!(config.log.format, LogFormat::Compact);
        assert!(config.log.dir.is_none());
    }

    #[test]
    fn test_missing_required_var() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "ANSIBLE_PWD")
            .collect();
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ANSIBLE_PWD"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs.retain(|(k, _)| *k != "GIT_URL");
        pairs.push(("GIT_URL", "  "));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GIT_URL"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("GIT_BRANCH", "release"),
            ("INVENTORY_DIR", "/var/lib/runner/inventory"),
            ("GIT_BIN", "/usr/local/bin/git"),
            ("ANSIBLE_PLAYBOOK_BIN", "/opt/ansible/bin/ansible-playbook"),
            ("LOG_POLL_INTERVAL_MS", "100"),
            ("LOG_FORMAT", "json"),
            ("LOG_DIR", "/var/log/runner"),
        ]);
        let config = ServerConfig::from_lookup(lookup(&pairs)).unwrap();
        let a = &config.automation;
        assert_eq!(a.git.branch, "release");
        assert_eq!(a.inventory_dir, PathBuf::from("/var/lib/runner/inventory"));
        assert_eq!(a.git_program, "/usr/local/bin/git");
        assert_eq!(a.playbook_program, "/opt/ansible/bin/ansible-playbook");
        assert_eq!(a.poll_interval, Duration::from_millis(100));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.dir, Some(PathBuf::from("/var/log/runner")));
    }

    #[test]
    fn test_invalid_poll_interval() {
        for bad in ["fast", "0", "-5"] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push(("LOG_POLL_INTERVAL_MS", bad));
            let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: "LOG_POLL_INTERVAL_MS", .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn test_invalid_log_format() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LOG_FORMAT", "xml"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "LOG_FORMAT", .. }));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ServerConfig::from_lookup(lookup(REQUIRED)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("\"pw\""));
        assert!(!rendered.contains("secret"));
    }
}
