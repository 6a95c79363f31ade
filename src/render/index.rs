//! Directory index rendering.

use super::dir::DirRender;
use super::{compose, write_artifact, PageView, RenderError, Scope};
use crate::config::cascade;
use crate::content::{self, ContentDir};
use crate::mirror::DirNode;

/// Render this directory's index from its direct pages, newest first.
///
/// An exhausted listing list at this depth means no index — expected,
/// not an error. Indexes rebuild on every pass regardless of `force`:
/// the page collection itself is the input, and collection membership
/// changes are not observable through any single file's mtime.
pub(super) fn render(
    d: &DirRender,
    src: &ContentDir,
    dst: &mut DirNode,
    _force: bool,
) -> Result<(), RenderError> {
    let Some(listing) = d.listings.first() else {
        return Ok(());
    };
    let template = d.tmpls.get(listing)?;

    let scope = Scope {
        site: d.site,
        section: d.section,
        category: None,
        page: PageView::synthetic(&d.name, ""),
        pages: content::latest(src.pages.values()),
        vars: cascade(&[&d.site.vars, &d.section.vars]),
    };
    let body = compose(template, d.layout, scope)?;
    write_artifact(dst, &format!("index.{}", d.site.artifact_ext), &body)
}
