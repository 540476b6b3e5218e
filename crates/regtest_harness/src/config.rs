use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{self, Context, Result};
use prospect_core::EngineParams;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HarnessConfig {
    pub sources: SourceConfig,
    #[serde(default)]
    pub checks: CheckToggles,
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

impl HarnessConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: HarnessConfig = toml::from_str(&data)?;
        Ok(cfg)
    }

    /// Resolves relative source paths against `root`.
    pub fn resolve(mut self, root: &Path) -> Self {
        if self.sources.scenarios.is_relative() {
            self.sources.scenarios = root.join(&self.sources.scenarios);
        }
        if let Some(params) = self.sources.params.as_mut() {
            if params.is_relative() {
                *params = root.join(&*params);
            }
        }
        if let Some(report) = self.report.as_mut() {
            if report.path.is_relative() {
                report.path = root.join(&report.path);
            }
        }
        self
    }

    pub fn source_info(&self) -> crate::report::SourceInfo {
        crate::report::SourceInfo {
            scenarios_path: self.sources.scenarios.clone(),
            params_path: self.sources.params.clone(),
        }
    }

    pub fn validate_sources(&self) -> Result<()> {
        self.sources.ensure_exists()
    }

    /// Engine parameters from the configured file, or the defaults.
    pub fn engine_params(&self) -> Result<EngineParams> {
        match &self.sources.params {
            Some(path) => EngineParams::from_path(path)
                .with_context(|| format!("invalid engine params {}", path.display())),
            None => Ok(EngineParams::default()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// A scenario file or a directory walked for `.json`/`.toml` scenarios.
    pub scenarios: PathBuf,
    #[serde(default)]
    pub params: Option<PathBuf>,
}

impl SourceConfig {
    fn ensure_exists(&self) -> Result<()> {
        if !self.scenarios.exists() {
            anyhow::bail!("Scenarios missing at {}", self.scenarios.display());
        }
        if let Some(params) = &self.params {
            if !params.exists() {
                anyhow::bail!("Engine params missing at {}", params.display());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CheckToggles {
    #[serde(default)]
    pub invariants: Option<bool>,
    #[serde(default)]
    pub replay: Option<bool>,
    #[serde(default)]
    pub reorg: Option<bool>,
}

impl CheckToggles {
    pub fn invariants_enabled(&self) -> bool {
        self.invariants.unwrap_or(true)
    }
    pub fn replay_enabled(&self) -> bool {
        self.replay.unwrap_or(true)
    }
    pub fn reorg_enabled(&self) -> bool {
        self.reorg.unwrap_or(true)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_default_on() {
        let cfg: HarnessConfig = toml::from_str(
            r#"
            [sources]
            scenarios = "scenarios"

            [checks]
            reorg = false
            "#,
        )
        .unwrap();
        assert!(cfg.checks.invariants_enabled());
        assert!(cfg.checks.replay_enabled());
        assert!(!cfg.checks.reorg_enabled());
        assert!(cfg.report.is_none());
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let cfg: HarnessConfig = toml::from_str::<HarnessConfig>(
            r#"
            [sources]
            scenarios = "scenarios"
            params = "params.toml"

            [report]
            path = "out/report.json"
            "#,
        )
        .unwrap()
        .resolve(Path::new("/work"));
        assert_eq!(cfg.sources.scenarios, PathBuf::from("/work/scenarios"));
        assert_eq!(cfg.sources.params, Some(PathBuf::from("/work/params.toml")));
        assert_eq!(
            cfg.report.map(|r| r.path),
            Some(PathBuf::from("/work/out/report.json"))
        );
    }
}
