//! Site configuration loading and the variable cascade.
//!
//! Configuration is hierarchical and read once per build: a site file plus
//! one file per section, all YAML, all under `config/` in the project
//! root:
//!
//! ```text
//! config/
//! ├── _site.yaml           # Site-wide settings (optional)
//! ├── blog.yaml            # Section "blog" (file stem = section name)
//! └── docs.yaml            # Section "docs"
//! ```
//!
//! The loaded [`SiteConfig`] is immutable from the render pipeline's point
//! of view: the core reads names, template identifiers, listing lists, and
//! variable maps, and never writes back.
//!
//! ## Section files
//!
//! ```yaml
//! name: Blog
//! templates:
//!   content: entry         # content template for every page
//!   category: cat          # content template for category indexes
//!   listings:              # one directory-index template per depth:
//!     - front              #   front at the section root,
//!     - archive            #   archive one level down, nothing deeper
//! categories:
//!   - name: Tutorials
//!     vars:
//!       blurb: Step by step
//! vars:
//!   accent: teal
//! ```
//!
//! ## Variable cascade
//!
//! Variables merge site → section → category/page, later layers
//! overriding earlier ones. [`cascade`] produces the merged map the
//! render pipeline hands to every template scope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Free-form string variables attached at any cascade level.
pub type Variables = BTreeMap<String, String>;

/// Relative directory holding all configuration files.
pub const CONFIG_DIR: &str = "config";

/// Name of the site-wide configuration file inside [`CONFIG_DIR`].
pub const SITE_FILE: &str = "_site.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("YAML error in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Site-wide configuration, plus the section map loaded alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Extension given to every rendered artifact.
    pub artifact_ext: String,
    pub vars: Variables,
    /// Sections keyed by config file stem, which must match the
    /// section's directory name under `content/`. Populated by [`load`],
    /// never by the YAML decoder.
    #[serde(skip)]
    pub sections: BTreeMap<String, SectionConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            name: String::new(),
            artifact_ext: "html".to_string(),
            vars: Variables::new(),
            sections: BTreeMap::new(),
        }
    }
}

/// Configuration for one content section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub name: String,
    pub templates: TemplateNames,
    pub categories: Vec<CategoryConfig>,
    pub vars: Variables,
}

impl SectionConfig {
    /// Whether `name` matches a declared category. The comparison is
    /// against the lowercased declared name, which is also how category
    /// output directories are named.
    pub fn has_category(&self, name: &str) -> bool {
        self.categories
            .iter()
            .any(|category| category.name.to_lowercase() == name)
    }
}

/// Template identifiers a section renders with, resolved by exact name
/// in the section's template directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateNames {
    /// Content template applied to every page.
    pub content: String,
    /// Content template applied to category indexes.
    pub category: String,
    /// Directory-index templates by depth: first entry at the section
    /// root, next one level down, and so on. Depths past the end of the
    /// list get no index.
    pub listings: Vec<String>,
}

/// A declared logical grouping of pages, independent of directory
/// placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub name: String,
    pub vars: Variables,
}

/// Merge variable layers in cascade order; later layers override.
pub fn cascade(layers: &[&Variables]) -> Variables {
    let mut merged = Variables::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Load the full configuration cascade from `<root>/config/`.
///
/// A missing site file degrades to defaults with a warning; a missing
/// config directory is an error, since a site without sections cannot
/// render anything.
pub fn load(root: &Path) -> Result<SiteConfig, ConfigError> {
    let dir = root.join(CONFIG_DIR);
    let site_path = dir.join(SITE_FILE);

    let mut conf = match fs::read_to_string(&site_path) {
        Ok(raw) => serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: site_path.clone(),
            source,
        })?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %site_path.display(), "site configuration not found, using defaults");
            SiteConfig::default()
        }
        Err(err) => return Err(err.into()),
    };

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name == SITE_FILE || entry.file_type()?.is_dir() {
            continue;
        }
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        if !is_yaml {
            tracing::debug!(path = %path.display(), "skipping non-YAML file in config directory");
            continue;
        }
        let raw = fs::read_to_string(&path)?;
        let section: SectionConfig = serde_yaml::from_str(&raw).map_err(|source| {
            ConfigError::Yaml {
                path: path.clone(),
                source,
            }
        })?;
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or(file_name);
        tracing::debug!(section = %stem, "loaded section configuration");
        conf.sections.insert(stem, section);
    }
    Ok(conf)
}
