use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

pub const ENV_IMAGE: &str = "SMOKE_IMAGE";
pub const ENV_VERBOSE: &str = "SMOKE_VERBOSE";
pub const ENV_RUNTIME: &str = "SMOKE_RUNTIME";
pub const ENV_FIXTURE: &str = "SMOKE_FIXTURE";
pub const ENV_TIMEOUT_SECS: &str = "SMOKE_TIMEOUT_SECS";
pub const ENV_SCRATCH_DIR: &str = "SMOKE_SCRATCH_DIR";

/// Harness configuration sourced from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Image under test.
    pub image: String,
    /// Container runtime command, optionally with leading arguments.
    pub runtime: String,
    /// Expected output of the image's default invocation; the built-in
    /// banner when unset.
    pub fixture: Option<PathBuf>,
    /// Per-invocation limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Parent directory for scratch areas; system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Echo every runtime step.
    pub verbose: bool,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            image: "toolchain:latest".to_string(),
            runtime: "docker".to_string(),
            fixture: None,
            timeout: None,
            scratch_dir: None,
            verbose: false,
        }
    }
}

impl SmokeConfig {
    /// Load configuration from `SMOKE_*` environment variables over defaults.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparseable value.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SmokeConfig::load`], reading variables through `lookup`.
    /// Empty values count as unset.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut out = Self::default();

        if let Some(v) = get(ENV_IMAGE) {
            out.image = v.trim().to_string();
        }
        if let Some(v) = get(ENV_RUNTIME) {
            out.runtime = v.trim().to_string();
        }
        if let Some(v) = get(ENV_FIXTURE) {
            out.fixture = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_SCRATCH_DIR) {
            out.scratch_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_TIMEOUT_SECS) {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_TIMEOUT_SECS}: {v}"))?;
            out.timeout = timeout_from_secs(secs);
        }
        if let Some(v) = get(ENV_VERBOSE) {
            out.verbose = is_truthy(&v);
        }

        Ok(out)
    }
}

/// Zero disables the timeout.
#[must_use]
pub const fn timeout_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SmokeConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SmokeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg, SmokeConfig::default());
        assert_eq!(cfg.image, "toolchain:latest");
        assert_eq!(cfg.timeout, None);
        assert_eq!(cfg.fixture, None);
        assert!(!cfg.verbose);
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = load(&[
            (ENV_IMAGE, "registry.example/toolchain:1.2"),
            (ENV_RUNTIME, "podman"),
            (ENV_FIXTURE, "/srv/usage.txt"),
            (ENV_TIMEOUT_SECS, "90"),
            (ENV_SCRATCH_DIR, "/var/tmp/smoke"),
            (ENV_VERBOSE, "1"),
        ])
        .unwrap();

        assert_eq!(cfg.image, "registry.example/toolchain:1.2");
        assert_eq!(cfg.runtime, "podman");
        assert_eq!(cfg.fixture, Some(PathBuf::from("/srv/usage.txt")));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(90)));
        assert_eq!(cfg.scratch_dir, Some(PathBuf::from("/var/tmp/smoke")));
        assert!(cfg.verbose);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = load(&[(ENV_IMAGE, ""), (ENV_VERBOSE, "  ")]).unwrap();
        assert_eq!(cfg.image, "toolchain:latest");
        assert!(!cfg.verbose);
    }

    #[test]
    fn falsy_verbose_values_stay_quiet() {
        for v in ["0", "false", "OFF", "no"] {
            assert!(!load(&[(ENV_VERBOSE, v)]).unwrap().verbose, "{v}");
        }
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let cfg = load(&[(ENV_TIMEOUT_SECS, "0")]).unwrap();
        assert_eq!(cfg.timeout, None);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = load(&[(ENV_TIMEOUT_SECS, "soon")]).unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }
}
