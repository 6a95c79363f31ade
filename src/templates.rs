//! Template compilation and caching.
//!
//! Templates live in a directory tree under `templates/` in the project
//! root: shared templates (the site layout) at the top, one subdirectory
//! per section for templates the section resolves by name. A
//! [`TemplateDir`] mirrors one level of that tree and caches compiled
//! templates keyed by file stem, re-parsing lazily when the backing
//! file's stat diff fires.
//!
//! # Template kinds
//!
//! Template capability is a trait ([`Template`]): execute with a
//! context, check staleness against a reference time, reload from disk.
//! The kind registry is keyed by file extension — `.html` compiles with
//! minijinja; anything else is a typed unsupported error, which
//! directory loading downgrades to a warning so one stray file never
//! takes down the whole tree. `.haml` sits in the unsupported bucket
//! the same way unconvertible markup does on the content side.

use crate::mirror::{DirNode, FileNode, MirrorError};
use minijinja::{Environment, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    #[error("template {0:?} has an unsupported extension")]
    Unsupported(PathBuf),
    #[error("template engine error: {0}")]
    Engine(#[from] minijinja::Error),
    #[error("no template named {0:?}")]
    NotFound(String),
    #[error("no template subdirectory named {0:?}")]
    MissingDir(String),
}

/// Capability interface every template kind satisfies.
pub trait Template {
    /// Render the template against `ctx`, producing the artifact body
    /// (or, for content templates, the inner body handed to a layout).
    fn execute(&self, ctx: &Value) -> Result<String, TemplateError>;
    /// True iff the backing file was modified strictly after `t`.
    fn is_newer(&self, t: SystemTime) -> bool;
    /// Re-stat the backing file and recompile iff it changed.
    fn update(&mut self) -> Result<(), TemplateError>;
}

/// A minijinja-compiled `.html` template. Each template owns its own
/// environment so recompilation swaps the whole unit atomically.
pub struct HtmlTemplate {
    file: FileNode,
    env: Environment<'static>,
}

impl HtmlTemplate {
    pub fn new(dir: &Path, file_name: &str) -> Result<HtmlTemplate, TemplateError> {
        let mut template = HtmlTemplate {
            file: FileNode::new(dir, file_name),
            env: Environment::new(),
        };
        template.compile()?;
        Ok(template)
    }

    fn compile(&mut self) -> Result<(), TemplateError> {
        self.file.open_read()?;
        let read = self.file.read_to_string();
        let closed = self.file.close();
        let raw = read?;
        closed?;

        let mut env = Environment::new();
        env.add_template_owned(self.file.name.clone(), raw)?;
        self.env = env;
        tracing::debug!(path = %self.file.path().display(), "compiled template");
        Ok(())
    }
}

impl Template for HtmlTemplate {
    fn execute(&self, ctx: &Value) -> Result<String, TemplateError> {
        let template = self.env.get_template(&self.file.name)?;
        Ok(template.render(ctx)?)
    }

    fn is_newer(&self, t: SystemTime) -> bool {
        self.file.is_newer(t)
    }

    fn update(&mut self) -> Result<(), TemplateError> {
        if self.file.stat()? {
            self.compile()?;
        }
        Ok(())
    }
}

/// Extension-keyed constructor for template kinds.
pub fn new_template(dir: &Path, file_name: &str) -> Result<Box<dyn Template>, TemplateError> {
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some("html") => Ok(Box::new(HtmlTemplate::new(dir, file_name)?)),
        _ => Err(TemplateError::Unsupported(dir.join(file_name))),
    }
}

/// One level of the template tree: a mirror of the directory plus the
/// compiled templates it holds, keyed by file stem.
pub struct TemplateDir {
    dir: DirNode,
    templates: BTreeMap<String, Box<dyn Template>>,
}

impl TemplateDir {
    /// Mirror `path` and compile every recognized template in it.
    /// Unrecognized extensions warn and skip; syntax errors are fatal.
    pub fn load(path: &Path) -> Result<TemplateDir, TemplateError> {
        let dir = DirNode::build(path)?;
        let mut cache = TemplateDir {
            dir,
            templates: BTreeMap::new(),
        };
        cache.reconcile()?;
        Ok(cache)
    }

    /// Exact-name lookup by stem. Absence is a configuration error for
    /// the render step that asked.
    pub fn get(&self, name: &str) -> Result<&dyn Template, TemplateError> {
        self.templates
            .get(name)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    /// Independently cached subtree, used for per-section template
    /// directories that still share the root layout.
    pub fn sub(&self, name: &str) -> Result<TemplateDir, TemplateError> {
        let sub = self
            .dir
            .sub(name)
            .map_err(|_| TemplateError::MissingDir(name.to_string()))?;
        TemplateDir::load(&sub.path)
    }

    /// Reconcile the cache: optionally re-mirror, evict entries whose
    /// backing file vanished, recompile entries whose file changed,
    /// leave the rest untouched.
    pub fn update(&mut self, force: bool) -> Result<(), TemplateError> {
        if force {
            self.dir.refresh()?;
        }
        self.reconcile()
    }

    fn reconcile(&mut self) -> Result<(), TemplateError> {
        let stems: BTreeSet<&str> = self.dir.files.values().map(|f| f.name.as_str()).collect();
        let stale: Vec<String> = self
            .templates
            .keys()
            .filter(|name| !stems.contains(name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            tracing::debug!(template = %name, "evicting template whose file vanished");
            self.templates.remove(&name);
        }

        for (file_name, file) in &self.dir.files {
            match self.templates.get_mut(&file.name) {
                Some(template) => template.update()?,
                None => match new_template(&self.dir.path, file_name) {
                    Ok(template) => {
                        self.templates.insert(file.name.clone(), template);
                    }
                    Err(TemplateError::Unsupported(path)) => {
                        tracing::warn!(path = %path.display(), "skipping template with unsupported extension");
                    }
                    Err(err) => return Err(err),
                },
            }
        }
        Ok(())
    }
}
