//! The render pipeline: configuration-guided, staleness-aware
//! generation of the destination tree.
//!
//! # Composition
//!
//! Rendering walks source and destination trees in lockstep, pairing
//! nodes by name so destination directories can be looked up or lazily
//! created independently of source node lifetime:
//!
//! ```text
//! Site::render
//! ├── prune destination sections with no source counterpart
//! └── per configured section             (Section)
//!     ├── render declared categories     (Category, depth-unbounded scan)
//!     └── walk the directory subtree     (DirRender)
//!         ├── prune stale subdirectories
//!         ├── directory index            (while listing templates last)
//!         ├── one artifact per page
//!         └── recurse, listing list advanced by one
//! ```
//!
//! # Two-pass template composition
//!
//! Every artifact kind — page, directory index, category index — renders
//! the same way: execute the entity's content template against a
//! [`Scope`], capture the output as the scope page's `content`, then
//! execute the shared layout against the same scope. One layout serves
//! the whole site while each artifact kind controls its inner markup.
//!
//! # Staleness
//!
//! A `force` flag threads through every render call. Without it, page
//! artifacts are skipped when the destination file exists and neither
//! the page (primary or sidecar), the content template, nor the layout
//! is newer than the destination's cached mtime. Directory and category
//! indexes rebuild on every pass: their input is a collection, and
//! membership changes (a deleted page, a reassigned category) leave no
//! mtime trace on any surviving input.

mod category;
mod dir;
mod index;
mod page;
mod section;
mod site;

pub use site::Site;

use crate::config::{CategoryConfig, SectionConfig, SiteConfig, Variables};
use crate::content::{ContentError, Page};
use crate::mirror::{DirNode, FileNode, MirrorError};
use crate::templates::{Template, TemplateError};
use chrono::{NaiveDate, Utc};
use minijinja::Value;
use serde::Serialize;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Snapshot of page fields exposed to templates. Index and category
/// artifacts get a synthetic one; page artifacts copy the real page.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PageView {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub category: String,
    pub vars: Variables,
    pub content: String,
}

impl PageView {
    fn synthetic(title: &str, category: &str) -> PageView {
        PageView {
            title: title.to_string(),
            author: String::new(),
            date: Utc::now().date_naive(),
            category: category.to_string(),
            vars: Variables::new(),
            content: String::new(),
        }
    }
}

impl From<&Page> for PageView {
    fn from(page: &Page) -> PageView {
        PageView {
            title: page.title.clone(),
            author: page.author.clone(),
            date: page.date,
            category: page.category.clone(),
            vars: page.vars.clone(),
            content: page.content.clone(),
        }
    }
}

/// Per-artifact render descriptor, serialized into the template
/// context and discarded after producing one artifact.
#[derive(Serialize)]
pub(crate) struct Scope<'a> {
    site: &'a SiteConfig,
    section: &'a SectionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a CategoryConfig>,
    page: PageView,
    pages: Vec<&'a Page>,
    /// Cascaded variables: site ← section ← category/page.
    vars: Variables,
}

/// Two-pass composition shared by every artifact kind.
fn compose(
    content: &dyn Template,
    layout: &dyn Template,
    mut scope: Scope,
) -> Result<String, RenderError> {
    let inner = content.execute(&Value::from_serialize(&scope))?;
    scope.page.content = inner;
    Ok(layout.execute(&Value::from_serialize(&scope))?)
}

/// Write `body` as `file_name` inside `dst`, updating the destination
/// mirror so the new artifact's mtime is cached for staleness checks.
fn write_artifact(dst: &mut DirNode, file_name: &str, body: &str) -> Result<(), RenderError> {
    let mut file = match dst.files.remove(file_name) {
        Some(existing) => existing,
        None => FileNode::new(&dst.path, file_name),
    };
    file.open_write()?;
    let written = file.write_all(body.as_bytes());
    let closed = file.close();
    written?;
    closed?;
    tracing::info!(path = %file.path().display(), "wrote artifact");
    dst.files.insert(file_name.to_string(), file);
    Ok(())
}

/// Whether the artifact `file_name` in `dst` can be skipped: it exists
/// and no relevant input is newer than its cached mtime. `force`
/// always rebuilds.
fn up_to_date<F>(dst: &DirNode, file_name: &str, force: bool, input_newer: F) -> bool
where
    F: Fn(SystemTime) -> bool,
{
    if force {
        return false;
    }
    match dst.files.get(file_name) {
        Some(artifact) => !input_newer(artifact.modified),
        None => false,
    }
}
