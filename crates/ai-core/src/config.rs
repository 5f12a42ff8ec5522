//! Runtime configuration loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AiError, BrainConfig};

/// Top-level AI configuration, usually loaded from `ai.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    #[serde(default)]
    pub bt: BtConfig,

    #[serde(default)]
    pub goap: GoapConfig,

    #[serde(default)]
    pub brain: BrainConfig,
}

/// Behavior-tree engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtConfig {
    /// Upper bound on descend/ascend steps in one tick. Hitting it leaves the tree Running.
    #[serde(default = "default_max_steps_per_tick")]
    pub max_steps_per_tick: u32,
}

impl Default for BtConfig {
    fn default() -> Self {
        Self {
            max_steps_per_tick: default_max_steps_per_tick(),
        }
    }
}

/// Planner limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoapConfig {
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,

    #[serde(default = "default_max_plan_length")]
    pub max_plan_length: u32,
}

impl Default for GoapConfig {
    fn default() -> Self {
        Self {
            max_expansions: default_max_expansions(),
            max_plan_length: default_max_plan_length(),
        }
    }
}

fn default_max_steps_per_tick() -> u32 {
    256
}
fn default_max_expansions() -> u32 {
    4096
}
fn default_max_plan_length() -> u32 {
    16
}

impl AiConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, AiError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, AiError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded ai config");
        Ok(config)
    }
}
