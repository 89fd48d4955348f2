//! Configuration for Postforge.
//!
//! Fallback chain:
//! 1. Explicit `--config` path
//! 2. `~/.config/postforge/postforge.yml`
//! 3. `./postforge.yml`
//! 4. Built-in defaults
//!
//! API keys never live here; clients read them from the environment.

mod platform;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::content::Platform;
use crate::error::{PostforgeError, Result};
use crate::evaluator::LlmEvaluator;
use crate::llm::{LlmClient, Provider, RetryPolicy};
use crate::prompt::PromptLoader;
use crate::runner::LoopConfig;
use crate::strategy::{GenerationStrategy, SinglePassStrategy, StrategyChain, TemplateStrategy, TwoStageStrategy};

pub use platform::{PlatformOverrides, PlatformProfile};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSettings,
    pub retry: RetryPolicy,
    pub run: RunSettings,
    pub evaluator: EvaluatorSettings,
    pub platforms: BTreeMap<Platform, PlatformOverrides>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    /// Provider default when unset
    pub model: Option<String>,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model: None,
            max_tokens: 8192,
            timeout_ms: 300_000,
            temperature: None,
        }
    }
}

/// Generation strategies, in the order the chain tries them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TwoStage,
    SinglePass,
    Template,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub max_rounds: u32,
    pub deadline_secs: Option<u64>,
    pub max_concurrent_requests: usize,
    pub output_dir: PathBuf,
    /// Reports live under `<reports_dir>/<ticker_lower>/`
    pub reports_dir: PathBuf,
    /// Overrides for the built-in prompt templates
    pub templates_dir: Option<PathBuf>,
    pub strategies: Vec<StrategyKind>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            deadline_secs: None,
            max_concurrent_requests: 4,
            output_dir: PathBuf::from("output"),
            reports_dir: PathBuf::from("reports"),
            templates_dir: None,
            strategies: vec![StrategyKind::TwoStage, StrategyKind::SinglePass, StrategyKind::Template],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Same provider as the writer when unset
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub max_tokens: u32,
    /// Extra calls allowed when the verdict is not valid JSON
    pub reparse_budget: u32,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            max_tokens: 1024,
            reparse_budget: 1,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from {}: {}", primary_config.display(), e),
                }
            }
        }

        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Failed to load config from {}: {}", fallback_config.display(), e),
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PostforgeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content)
            .map_err(|e| PostforgeError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        log::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Built-in profile for `platform` with this config's overrides applied
    pub fn profile(&self, platform: Platform) -> PlatformProfile {
        let mut profile = PlatformProfile::builtin(platform);
        if let Some(overrides) = self.platforms.get(&platform) {
            profile.apply(overrides);
        }
        profile
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_rounds: self.run.max_rounds,
            deadline: self.run.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn prompt_loader(&self) -> PromptLoader {
        match &self.run.templates_dir {
            Some(dir) => PromptLoader::new(dir),
            None => PromptLoader::builtin(),
        }
    }

    /// The strategy chain in configured order, all sharing one client
    pub fn build_chain(&self, client: Arc<dyn LlmClient>, loader: Arc<PromptLoader>) -> StrategyChain {
        let writer = || {
            SinglePassStrategy::new(client.clone(), loader.clone())
                .with_retry(self.retry.clone())
                .with_max_tokens(self.llm.max_tokens)
        };

        let strategies: Vec<Arc<dyn GenerationStrategy>> = self
            .run
            .strategies
            .iter()
            .map(|kind| -> Arc<dyn GenerationStrategy> {
                match kind {
                    StrategyKind::TwoStage => Arc::new(TwoStageStrategy::new(writer())),
                    StrategyKind::SinglePass => Arc::new(writer()),
                    StrategyKind::Template => Arc::new(TemplateStrategy),
                }
            })
            .collect();
        StrategyChain::new(strategies)
    }

    pub fn build_evaluator(&self, client: Arc<dyn LlmClient>) -> LlmEvaluator {
        let mut evaluator = LlmEvaluator::new(client)
            .with_retry(self.retry.clone())
            .with_reparse_budget(self.evaluator.reparse_budget)
            .with_max_tokens(self.evaluator.max_tokens);
        if let Some(model) = &self.evaluator.model {
            evaluator = evaluator.with_model(model.clone());
        }
        evaluator
    }

    /// Provider for the evaluator's client
    pub fn evaluator_provider(&self) -> Provider {
        self.evaluator.provider.unwrap_or(self.llm.provider)
    }
}
