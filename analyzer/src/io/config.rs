//! Analyzer configuration stored as `analyzer.toml` at the analyzer root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::formatter::FormatOptions;
use crate::core::markers::{MarkerSet, MarkerStyle};
use crate::core::skeleton::DEFAULT_NODE_NAME;
use crate::core::types::DisplayMode;

/// Analyzer configuration (TOML).
///
/// Edited by humans; missing fields fall back to the engine's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub highlight: HighlightConfig,
    pub format: FormatConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HighlightConfig {
    /// Which fired spans are reported: every match, or only built ones.
    pub mode: DisplayMode,
    /// Markers around spans where a rule built a node.
    pub built_markers: MarkerStyle,
    /// Markers around spans a rule matched without building.
    pub matched_markers: MarkerStyle,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        let markers = MarkerSet::default();
        Self {
            mode: DisplayMode::default(),
            built_markers: markers.built,
            matched_markers: markers.matched,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatConfig {
    pub tab_width: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            tab_width: FormatOptions::default().tab_width,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    /// Node name written into generated rule envelopes.
    pub node_name: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.format.tab_width == 0 {
            return Err(anyhow!("format.tab_width must be > 0"));
        }
        if self.rules.node_name.trim().is_empty()
            || self.rules.node_name.chars().any(char::is_whitespace)
        {
            return Err(anyhow!("rules.node_name must be a single non-empty word"));
        }
        let styles = [
            ("highlight.built_markers", &self.highlight.built_markers),
            ("highlight.matched_markers", &self.highlight.matched_markers),
        ];
        for (field, style) in styles {
            if style.open.is_empty() || style.close.is_empty() {
                return Err(anyhow!("{field} open and close must be non-empty"));
            }
            if style.open == style.close {
                return Err(anyhow!("{field} open and close must differ"));
            }
        }
        let built = &self.highlight.built_markers;
        let matched = &self.highlight.matched_markers;
        let built_delims = [&built.open, &built.close];
        if built_delims.contains(&&matched.open) || built_delims.contains(&&matched.close) {
            return Err(anyhow!(
                "highlight.built_markers and highlight.matched_markers must not share a marker"
            ));
        }
        let delims = [&built.open, &built.close, &matched.open, &matched.close];
        for (i, long) in delims.iter().enumerate() {
            for (j, short) in delims.iter().enumerate() {
                if i != j && long.starts_with(short.as_str()) {
                    return Err(anyhow!(
                        "highlight marker '{long}' starts with marker '{short}'"
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn markers(&self) -> MarkerSet {
        MarkerSet {
            matched: self.highlight.matched_markers.clone(),
            built: self.highlight.built_markers.clone(),
        }
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            tab_width: self.format.tab_width,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AnalyzerConfig::default()`.
pub fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    if !path.exists() {
        let cfg = AnalyzerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AnalyzerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AnalyzerConfig) -> Result<()> {
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
