use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NavigatorError, Result};

/// File names tried, in order, when no configuration path is given
pub const CONFIG_CANDIDATES: [&str; 3] = ["Navigator.toml", "navigator.toml", ".navigator.toml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source parsing configuration
    pub parsing: ParsingConfig,

    /// DOT rendering settings
    pub graph: GraphStyle,

    /// Output settings for the command line
    pub output: OutputConfig,
}

/// How repeated function names are folded into the call mapping.
///
/// Every definition is always kept in the ordered function list; the policy
/// only decides which definition's calls the shared name key reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    LastWins,
    FirstWins,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Maximum source size to parse (in bytes)
    pub max_file_size: usize,

    /// Deepest syntax-tree nesting accepted before analysis
    pub max_depth: usize,

    /// Handling of functions that share a name
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStyle {
    /// Graph identifier written after `digraph`
    pub name: String,

    /// Layout direction
    pub rankdir: String,

    /// Default node shape
    pub node_shape: String,

    /// Default node style list
    pub node_style: String,

    /// Fill colour for function nodes
    pub fill_color: String,

    /// Fill colour for class nodes in dependency graphs
    pub class_fill_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default listing format (text or json)
    pub format: String,

    /// Include each function's source text in listings
    pub include_source: bool,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024, // 1MB
            max_depth: 1000,
            duplicate_policy: DuplicatePolicy::LastWins,
        }
    }
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            name: "G".to_string(),
            rankdir: "LR".to_string(),
            node_shape: "box".to_string(),
            node_style: "rounded,filled".to_string(),
            fill_color: "skyblue".to_string(),
            class_fill_color: "lightgreen".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            include_source: true,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| NavigatorError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NavigatorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                for candidate in &CONFIG_CANDIDATES {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
