use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOLDING_THRESHOLD: usize = 5;
pub const DEFAULT_LIST_DATE_FORMAT: &str = "%B %-d, %Y";
pub const DEFAULT_GRID_DATE_FORMAT: &str = "%b %-d, '%y";
pub const DEFAULT_CHAPTER_ICON: &str = "fa-solid fa-book";
pub const DEFAULT_UNASSIGNED_GROUP_LABEL: &str = "Unassigned";

/// Installation-wide settings that shape the chapter list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL used to build chapter links when a chapter has no permalink.
    pub site_url: Option<String>,
    pub enable_chapter_groups: bool,
    pub disable_chapter_folding: bool,
    pub hide_chapter_icons: bool,
    pub enable_checkmarks: bool,
    pub enable_story_chapter_caching: bool,
    pub folding_threshold: usize,
    pub list_date_format: String,
    pub grid_date_format: String,
    pub default_chapter_icon: String,
    pub unassigned_group_label: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            enable_chapter_groups: true,
            disable_chapter_folding: false,
            hide_chapter_icons: false,
            enable_checkmarks: false,
            enable_story_chapter_caching: true,
            folding_threshold: DEFAULT_FOLDING_THRESHOLD,
            list_date_format: DEFAULT_LIST_DATE_FORMAT.to_owned(),
            grid_date_format: DEFAULT_GRID_DATE_FORMAT.to_owned(),
            default_chapter_icon: DEFAULT_CHAPTER_ICON.to_owned(),
            unassigned_group_label: DEFAULT_UNASSIGNED_GROUP_LABEL.to_owned(),
        }
    }
}

impl SiteConfig {
    /// Loads the YAML file (if any), applies `CHAPTERLIST_*` overrides and validates.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .with_context(|| format!("read config: {}", path.display()))?;
                serde_yaml::from_str::<SiteConfig>(&yaml)
                    .with_context(|| format!("parse config: {}", path.display()))?
            }
            None => SiteConfig::default(),
        };
        config
            .apply_overrides(|name| std::env::var(name).ok())
            .context("apply environment overrides")?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CHAPTERLIST_SITE_URL") {
            self.site_url = Some(value);
        }
        override_bool(&lookup, "CHAPTERLIST_ENABLE_GROUPS", &mut self.enable_chapter_groups)?;
        override_bool(
            &lookup,
            "CHAPTERLIST_DISABLE_FOLDING",
            &mut self.disable_chapter_folding,
        )?;
        override_bool(&lookup, "CHAPTERLIST_HIDE_ICONS", &mut self.hide_chapter_icons)?;
        override_bool(&lookup, "CHAPTERLIST_ENABLE_CHECKMARKS", &mut self.enable_checkmarks)?;
        override_bool(
            &lookup,
            "CHAPTERLIST_ENABLE_CACHING",
            &mut self.enable_story_chapter_caching,
        )?;
        if let Some(value) = lookup("CHAPTERLIST_FOLDING_THRESHOLD") {
            self.folding_threshold = value.trim().parse().with_context(|| {
                format!("CHAPTERLIST_FOLDING_THRESHOLD must be an integer: {value}")
            })?;
        }
        if let Some(value) = lookup("CHAPTERLIST_GRID_DATE_FORMAT") {
            self.grid_date_format = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.folding_threshold == 0 {
            anyhow::bail!("folding_threshold must be a positive integer");
        }
        if let Some(site_url) = self.site_url.as_deref() {
            url::Url::parse(site_url).with_context(|| format!("parse site_url: {site_url}"))?;
        }
        Ok(())
    }
}

fn override_bool<F>(lookup: &F, name: &str, target: &mut bool) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(());
    };
    *target = match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        other => anyhow::bail!("{name} must be a boolean: {other}"),
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() -> anyhow::Result<()> {
        let config: SiteConfig =
            serde_yaml::from_str("enable_checkmarks: true\nfolding_threshold: 3\n")?;
        assert!(config.enable_checkmarks);
        assert_eq!(config.folding_threshold, 3);
        assert!(config.enable_chapter_groups);
        assert_eq!(config.grid_date_format, DEFAULT_GRID_DATE_FORMAT);
        Ok(())
    }

    #[test]
    fn overrides_replace_file_values() -> anyhow::Result<()> {
        let env = HashMap::from([
            ("CHAPTERLIST_ENABLE_CACHING", "off"),
            ("CHAPTERLIST_FOLDING_THRESHOLD", " 2 "),
            ("CHAPTERLIST_HIDE_ICONS", "1"),
        ]);
        let mut config = SiteConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| (*v).to_owned()))?;

        assert!(!config.enable_story_chapter_caching);
        assert_eq!(config.folding_threshold, 2);
        assert!(config.hide_chapter_icons);
        assert!(config.enable_chapter_groups);
        Ok(())
    }

    #[test]
    fn bad_override_is_an_error() {
        let mut config = SiteConfig::default();
        let err = config
            .apply_overrides(|name| (name == "CHAPTERLIST_ENABLE_GROUPS").then(|| "maybe".to_owned()))
            .unwrap_err();
        assert!(err.to_string().contains("CHAPTERLIST_ENABLE_GROUPS"));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let config = SiteConfig {
            folding_threshold: 0,
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
