use crate::models::{RUBRIC_LEN, Rubric, first_duplicate};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A named dataset the evaluator can pick
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Source {
    /// Key shown in the source list and used in export names
    pub key: String,
    /// JSON file holding the records
    pub path: PathBuf,
}

/// Root configuration of an annotation run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Heading shown when the tool starts
    #[serde(default = "default_title")]
    pub title: String,
    /// Share of each dataset drawn for annotation, in (0, 1]
    #[serde(default = "default_sample_fraction")]
    pub sample_fraction: f64,
    /// Directory exports are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Fixed seed for sampling; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Replacement question texts for the rubric
    #[serde(default)]
    pub rubric: Option<Vec<String>>,
    /// Datasets available for annotation, in display order
    pub sources: Vec<Source>,
}

fn default_title() -> String {
    "Dialogue annotation".to_string()
}

fn default_sample_fraction() -> f64 {
    0.1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Relative source paths and the output directory are taken relative to
    /// the directory holding the file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            bail!(
                "sample_fraction must be in (0, 1], got {}",
                self.sample_fraction
            );
        }
        if self.sources.is_empty() {
            bail!("at least one [[sources]] entry is required");
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.key.trim().is_empty() {
                bail!("source keys must not be empty");
            }
            if !seen.insert(source.key.as_str()) {
                bail!("duplicate source key '{}'", source.key);
            }
        }

        if let Some(questions) = &self.rubric {
            if questions.len() != RUBRIC_LEN {
                bail!(
                    "rubric must list exactly {} questions, got {}",
                    RUBRIC_LEN,
                    questions.len()
                );
            }
            if let Some(question) = first_duplicate(questions) {
                bail!("rubric repeats the question '{}'", question);
            }
        }
        Ok(())
    }

    /// The rubric to judge against, configured or default
    pub fn rubric(&self) -> Result<Rubric> {
        match &self.rubric {
            Some(questions) => Ok(Rubric::new(questions.clone())?),
            None => Ok(Rubric::default()),
        }
    }
}
