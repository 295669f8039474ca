//! sus configuration file handling

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use sus_core::{ColorScheme, ObserverOptions, Size};
use sus_widgets::{MediaQueryBag, TailwindBreakpoints};

/// Top-level configuration (sus.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SusConfig {
    #[serde(default)]
    pub viewport: ViewportConfig,
    /// Default observer options for reveals and lazy images
    #[serde(default)]
    pub observer: ObserverOptions,
    /// Named media queries, `alias = "query"`
    #[serde(default)]
    pub media: IndexMap<String, String>,
    #[serde(default)]
    pub breakpoints: TailwindBreakpoints,
}

/// Initial host viewport
#[derive(Debug, Deserialize, Serialize)]
pub struct ViewportConfig {
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default)]
    pub color_scheme: ColorScheme,
}

fn default_width() -> f32 {
    1280.0
}

fn default_height() -> f32 {
    800.0
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            color_scheme: ColorScheme::default(),
        }
    }
}

impl ViewportConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl SusConfig {
    /// Load configuration from a file, or from `sus.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join("sus.toml")
        } else {
            path.to_path_buf()
        };

        if !config_path.exists() {
            anyhow::bail!("No config found at {}", config_path.display());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Load `path` if given, else the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Configured media queries followed by the breakpoint presets.
    /// Configured aliases win over preset names.
    pub fn media_queries(&self) -> MediaQueryBag {
        let mut bag = self.media.clone();
        for (alias, query) in self.breakpoints.query_bag() {
            bag.entry(alias).or_insert(query);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SusConfig::from_toml("").unwrap();
        assert_eq!(config.viewport.size(), Size::new(1280.0, 800.0));
        assert_eq!(config.viewport.color_scheme, ColorScheme::Light);
        assert_eq!(config.observer, ObserverOptions::default());
        assert_eq!(config.breakpoints, TailwindBreakpoints::DEFAULT);
        assert_eq!(config.media_queries().len(), 5);
    }

    #[test]
    fn test_full_config() {
        let config = SusConfig::from_toml(
            r#"
            [viewport]
            width = 390
            height = 844
            color_scheme = "dark"

            [observer]
            root_margin = "100px 0px"
            threshold = [0.0, 0.5]

            [media]
            dark = "(prefers-color-scheme: dark)"
            md = "(min-width: 700px)"

            [breakpoints]
            lg = 1100
            "#,
        )
        .unwrap();

        assert_eq!(config.viewport.size(), Size::new(390.0, 844.0));
        assert_eq!(config.viewport.color_scheme, ColorScheme::Dark);
        assert_eq!(config.observer.threshold.as_slice(), &[0.0, 0.5]);
        assert_eq!(config.breakpoints.lg, 1100.0);

        let bag = config.media_queries();
        assert_eq!(bag.keys().next().map(String::as_str), Some("dark"));
        assert_eq!(bag["md"], "(min-width: 700px)");
        assert_eq!(bag["lg"], "(min-width: 1100px)");
    }

    #[test]
    fn test_invalid_config() {
        assert!(SusConfig::from_toml("[observer]\nroot_margin = \"10 apples\"").is_err());
        assert!(SusConfig::load(Path::new("/definitely/not/here/sus.toml")).is_err());
    }
}
