//! Typed content tree: pages, sidecar metadata, and per-directory
//! collections over the filesystem mirror.
//!
//! The content tree is the render pipeline's source model. It walks the
//! mirror and the typed tree in lockstep, pairing nodes by name rather
//! than by identity, so pages and child directories can be created or
//! evicted independently of the mirror's own reconciliation.
//!
//! # Classification
//!
//! A file's extension decides what it is:
//!
//! - `.html` — a [`Page`]; the body is used as-is.
//! - `.yaml` / `.yml` — sidecar metadata, consumed by the page sharing
//!   its stem; never a page itself.
//! - everything else — unsupported. Markup that would need conversion
//!   (`.md`, `.haml`) deliberately lands here too: it is reported as a
//!   typed error and the page is skipped, rather than silently dropped.
//!   A future converter would hook into [`ContentKind::from_ext`].
//!
//! # Sidecars
//!
//! A page `post.html` may carry metadata in an adjacent `post.yaml`:
//!
//! ```yaml
//! title: On Mirrors
//! author: B. Meyers
//! date: 2021-06-01
//! category: Tutorials
//! vars:
//!   accent: red
//! ```
//!
//! A missing sidecar is not an error — the page keeps default fields.
//! Fields present in the sidecar overwrite the page's; absent fields
//! keep their current values.

use crate::config::Variables;
use crate::mirror::{DirNode, FileNode, MirrorError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    #[error("content in {path:?} cannot be rendered to an artifact (extension {ext:?})")]
    Unsupported { path: PathBuf, ext: String },
    #[error("sidecar YAML error: {0}")]
    Sidecar(#[from] serde_yaml::Error),
}

/// What a file in a content directory is, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Natively renderable page content.
    Page,
    /// Sidecar metadata for the page sharing its stem.
    Metadata,
    /// Recognized but not renderable without a converter.
    Unsupported,
}

impl ContentKind {
    pub fn from_ext(ext: &str) -> ContentKind {
        match ext {
            ".html" => ContentKind::Page,
            ".yaml" | ".yml" => ContentKind::Metadata,
            // `.md` and `.haml` land here on purpose: markup needing
            // conversion is reported, not silently dropped. A converter
            // registry would extend this match.
            _ => ContentKind::Unsupported,
        }
    }
}

/// A single renderable page: structured fields from the sidecar, raw
/// body from the primary file.
#[derive(Debug, Serialize)]
pub struct Page {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub category: String,
    pub vars: Variables,
    /// Raw body text; the render pipeline replaces this with the
    /// content-template output during two-pass composition.
    pub content: String,
    #[serde(skip)]
    file: FileNode,
    #[serde(skip)]
    meta: FileNode,
}

/// Structured fields a sidecar may carry. All optional: only present
/// fields overwrite the page.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SidecarMeta {
    title: Option<String>,
    author: Option<String>,
    date: Option<NaiveDate>,
    category: Option<String>,
    vars: Option<Variables>,
}

impl Page {
    /// Create a page for `file_name` inside `dir` and read it once.
    pub fn new(dir: &Path, file_name: &str) -> Result<Page, ContentError> {
        let file = FileNode::new(dir, file_name);
        if ContentKind::from_ext(&file.ext) != ContentKind::Page {
            return Err(ContentError::Unsupported {
                path: file.path(),
                ext: file.ext.clone(),
            });
        }
        let meta = FileNode::new(dir, &format!("{}.yaml", file.name));
        let mut page = Page {
            title: String::new(),
            author: String::new(),
            date: NaiveDate::default(),
            category: String::new(),
            vars: Variables::new(),
            content: String::new(),
            file,
            meta,
        };
        page.update()?;
        Ok(page)
    }

    /// Stem of the primary file; artifact names derive from it.
    pub fn stem(&self) -> &str {
        &self.file.name
    }

    /// Re-read the primary file as the content body, then decode the
    /// sidecar if one exists.
    pub fn update(&mut self) -> Result<(), ContentError> {
        self.file.open_read()?;
        let read = self.file.read_to_string();
        let closed = self.file.close();
        self.content = read?;
        closed?;

        match self.meta.open_read() {
            Ok(()) => {}
            Err(MirrorError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
        let read = self.meta.read_to_string();
        let closed = self.meta.close();
        let raw = read?;
        closed?;

        let sidecar: SidecarMeta = serde_yaml::from_str(&raw)?;
        if let Some(title) = sidecar.title {
            self.title = title;
        }
        if let Some(author) = sidecar.author {
            self.author = author;
        }
        if let Some(date) = sidecar.date {
            self.date = date;
        }
        if let Some(category) = sidecar.category {
            self.category = category;
        }
        if let Some(vars) = sidecar.vars {
            self.vars = vars;
        }
        Ok(())
    }

    /// True iff the primary file or the sidecar was modified strictly
    /// after `t`. This is the pipeline's regeneration signal.
    pub fn is_newer(&self, t: SystemTime) -> bool {
        self.file.is_newer(t) || self.meta.is_newer(t)
    }
}

/// New sequence of `pages` sorted newest to oldest by date. The sort is
/// stable: pages with equal dates keep their input order.
pub fn latest<'a, I>(pages: I) -> Vec<&'a Page>
where
    I: IntoIterator<Item = &'a Page>,
{
    let mut sorted: Vec<&Page> = pages.into_iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// New sequence with the exact input order reversed end-to-end.
pub fn reversed<'a, I>(pages: I) -> Vec<&'a Page>
where
    I: IntoIterator<Item = &'a Page>,
{
    let mut out: Vec<&Page> = pages.into_iter().collect();
    out.reverse();
    out
}

/// A directory of the content tree: its pages plus typed children.
/// Pages are owned here and do not outlive their directory.
#[derive(Debug)]
pub struct ContentDir {
    pub path: PathBuf,
    /// Pages keyed by the primary file's on-disk name.
    pub pages: BTreeMap<String, Page>,
    pub subs: BTreeMap<String, ContentDir>,
}

impl ContentDir {
    fn new(path: &Path) -> ContentDir {
        ContentDir {
            path: path.to_path_buf(),
            pages: BTreeMap::new(),
            subs: BTreeMap::new(),
        }
    }
}

/// The full content tree: a mirror of the content root plus the typed
/// view reconciled against it.
#[derive(Debug)]
pub struct ContentTree {
    node: DirNode,
    pub root: ContentDir,
}

impl ContentTree {
    /// Mirror `path` and build the typed view over it.
    pub fn new(path: &Path) -> Result<ContentTree, ContentError> {
        let node = DirNode::build(path)?;
        let mut root = ContentDir::new(path);
        sync(&node, &mut root)?;
        Ok(ContentTree { node, root })
    }

    /// Refresh the mirror and reconcile the typed view: evict pages and
    /// children whose backing entries vanished, pick up new ones, and
    /// re-read every surviving page.
    pub fn update(&mut self) -> Result<(), ContentError> {
        self.node.refresh()?;
        sync(&self.node, &mut self.root)
    }
}

/// Lockstep reconciliation of one (mirror, typed) directory pair.
fn sync(node: &DirNode, dir: &mut ContentDir) -> Result<(), ContentError> {
    dir.subs.retain(|name, _| node.dirs.contains_key(name));
    dir.pages.retain(|name, _| node.files.contains_key(name));

    for (file_name, file) in &node.files {
        match ContentKind::from_ext(&file.ext) {
            ContentKind::Metadata => {}
            ContentKind::Page => {
                if let Some(page) = dir.pages.get_mut(file_name) {
                    page.update()?;
                } else {
                    let page = Page::new(&node.path, file_name)?;
                    dir.pages.insert(file_name.clone(), page);
                }
            }
            ContentKind::Unsupported => {
                let err = ContentError::Unsupported {
                    path: node.path.join(file_name),
                    ext: file.ext.clone(),
                };
                tracing::warn!(error = %err, "skipping page");
            }
        }
    }

    for (name, sub_node) in &node.dirs {
        let sub = dir
            .subs
            .entry(name.clone())
            .or_insert_with(|| ContentDir::new(&sub_node.path));
        sync(sub_node, sub)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Page with fabricated metadata, for tests that reason about
    /// ordering and staleness without touching the clock or the disk.
    fn fake_page(title: &str, date: NaiveDate) -> Page {
        Page {
            title: title.to_string(),
            author: String::new(),
            date,
            category: String::new(),
            vars: Variables::new(),
            content: String::new(),
            file: FileNode::new(Path::new("/nonexistent"), "fake.html"),
            meta: FileNode::new(Path::new("/nonexistent"), "fake.yaml"),
        }
    }

    #[test]
    fn classification_by_extension() {
        assert_eq!(ContentKind::from_ext(".html"), ContentKind::Page);
        assert_eq!(ContentKind::from_ext(".yaml"), ContentKind::Metadata);
        assert_eq!(ContentKind::from_ext(".yml"), ContentKind::Metadata);
        assert_eq!(ContentKind::from_ext(".md"), ContentKind::Unsupported);
        assert_eq!(ContentKind::from_ext(".haml"), ContentKind::Unsupported);
        assert_eq!(ContentKind::from_ext(""), ContentKind::Unsupported);
    }

    #[test]
    fn page_reads_body_and_sidecar() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("post.html"), "<p>hello</p>").unwrap();
        fs::write(
            tmp.path().join("post.yaml"),
            "title: Hello\nauthor: ada\ndate: 2021-06-01\ncategory: Tutorials\nvars:\n  accent: red\n",
        )
        .unwrap();

        let page = Page::new(tmp.path(), "post.html").unwrap();
        assert_eq!(page.content, "<p>hello</p>");
        assert_eq!(page.title, "Hello");
        assert_eq!(page.author, "ada");
        assert_eq!(page.date, ymd(2021, 6, 1));
        assert_eq!(page.category, "Tutorials");
        assert_eq!(page.vars["accent"], "red");
    }

    #[test]
    fn missing_sidecar_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bare.html"), "body").unwrap();

        let page = Page::new(tmp.path(), "bare.html").unwrap();
        assert_eq!(page.content, "body");
        assert_eq!(page.title, "");
        assert_eq!(page.category, "");
    }

    #[test]
    fn sidecar_overwrites_only_present_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("post.html"), "one").unwrap();
        fs::write(
            tmp.path().join("post.yaml"),
            "title: First\nauthor: ada\n",
        )
        .unwrap();

        let mut page = Page::new(tmp.path(), "post.html").unwrap();
        assert_eq!(page.author, "ada");

        fs::write(tmp.path().join("post.yaml"), "title: Second\n").unwrap();
        page.update().unwrap();
        assert_eq!(page.title, "Second");
        // Absent fields keep their current values.
        assert_eq!(page.author, "ada");
    }

    #[test]
    fn unsupported_extension_is_a_typed_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("readme.md"), "# nope").unwrap();

        match Page::new(tmp.path(), "readme.md") {
            Err(ContentError::Unsupported { ext, .. }) => assert_eq!(ext, ".md"),
            other => panic!("expected unsupported error, got {other:?}"),
        }
    }

    #[test]
    fn is_newer_uses_max_of_primary_and_sidecar() {
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + std::time::Duration::from_secs(100);
        let t2 = t0 + std::time::Duration::from_secs(200);

        let mut page = fake_page("p", ymd(2021, 1, 1));
        page.file.modified = t1;
        page.meta.modified = t2;

        // true iff t < max(T1, T2)
        assert!(page.is_newer(t0));
        assert!(page.is_newer(t1));
        assert!(!page.is_newer(t2));
        assert!(!page.is_newer(t2 + std::time::Duration::from_secs(1)));
    }

    #[test]
    fn latest_sorts_newest_first_with_stable_ties() {
        let jan = fake_page("jan", ymd(2021, 1, 1));
        let jun = fake_page("jun", ymd(2021, 6, 1));
        let jun_b = fake_page("jun_b", ymd(2021, 6, 1));
        let input = [&jan, &jun, &jun_b];

        let sorted = latest(input.iter().copied());
        let titles: Vec<&str> = sorted.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["jun", "jun_b", "jan"]);
        // Input untouched.
        assert_eq!(input[0].title, "jan");
    }

    #[test]
    fn reversed_swaps_two_elements() {
        let a = fake_page("a", ymd(2021, 1, 1));
        let b = fake_page("b", ymd(2021, 6, 1));

        let out = reversed([&a, &b]);
        let titles: Vec<&str> = out.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn tree_discovers_and_evicts_pages() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.html"), "alpha").unwrap();
        fs::create_dir(tmp.path().join("deep")).unwrap();
        fs::write(tmp.path().join("deep/b.html"), "beta").unwrap();
        // Unsupported and sidecar files never become pages.
        fs::write(tmp.path().join("notes.md"), "# notes").unwrap();
        fs::write(tmp.path().join("a.yaml"), "title: Alpha\n").unwrap();

        let mut tree = ContentTree::new(tmp.path()).unwrap();
        assert_eq!(tree.root.pages.len(), 1);
        assert_eq!(tree.root.pages["a.html"].title, "Alpha");
        assert_eq!(tree.root.subs["deep"].pages.len(), 1);

        fs::remove_file(tmp.path().join("a.html")).unwrap();
        fs::remove_dir_all(tmp.path().join("deep")).unwrap();
        tree.update().unwrap();
        assert!(tree.root.pages.is_empty());
        assert!(tree.root.subs.is_empty());
    }
}
