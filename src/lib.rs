//! # stilt
//!
//! An incremental static site generator. Your filesystem is the data
//! source: a content tree of HTML pages with optional YAML sidecars is
//! mirrored into a build tree of rendered artifacts, under a cascading
//! site → section → category configuration. Only artifacts whose inputs
//! changed are re-rendered.
//!
//! # Architecture: Three Trees in Lockstep
//!
//! Everything is a tree. A build walks three of them together:
//!
//! ```text
//! content/   →  ContentTree   (pages + sidecar metadata)
//! templates/ →  TemplateDir   (compiled templates, lazily re-parsed)
//! build/     →  DirNode       (destination mirror, pruned + rewritten)
//! ```
//!
//! The filesystem mirror underneath all three detects change through a
//! single signal: a stat diff on cached permissions and modification
//! time. Pages re-read, templates recompile, and artifacts re-render
//! exactly when that signal says their inputs moved.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`mirror`] | Filesystem mirror — directory/file nodes, refresh reconciliation, merge, scoped file access |
//! | [`content`] | Typed content tree — page classification, sidecar metadata, orderings, staleness |
//! | [`templates`] | Template cache — minijinja-backed `.html` templates behind a capability trait, per-section subtrees |
//! | [`config`] | YAML configuration cascade — site, sections, categories, variables |
//! | [`render`] | The pipeline — lockstep source/destination walk, pruning, two-pass composition |
//!
//! # Project Layout
//!
//! A stilt project is three directories next to each other:
//!
//! ```text
//! site/
//! ├── config/
//! │   ├── _site.yaml           # site settings + variables
//! │   └── blog.yaml            # one file per section
//! ├── templates/
//! │   ├── layout.html          # shared outer layout
//! │   └── blog/                # per-section templates
//! │       ├── entry.html       #   content template for pages
//! │       ├── front.html       #   listing template (depth 0)
//! │       └── cat.html         #   category index template
//! ├── content/
//! │   └── blog/
//! │       ├── post.html        # a page
//! │       └── post.yaml        # its sidecar metadata
//! └── build/                   # generated, safe to delete
//! ```

pub mod config;
pub mod content;
pub mod mirror;
pub mod render;
pub mod templates;
