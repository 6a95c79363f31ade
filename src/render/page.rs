//! Single-page artifact rendering.

use super::dir::DirRender;
use super::{compose, up_to_date, write_artifact, PageView, RenderError, Scope};
use crate::config::cascade;
use crate::content::Page;
use crate::mirror::DirNode;

/// Render one page into `dst`, named after the page's stem with the
/// site's artifact extension. Skipped when the destination exists and
/// no input — page body, sidecar, content template, layout — is newer.
pub(super) fn render(
    d: &DirRender,
    page: &Page,
    dst: &mut DirNode,
    force: bool,
) -> Result<(), RenderError> {
    let artifact = format!("{}.{}", page.stem(), d.site.artifact_ext);
    if up_to_date(dst, &artifact, force, |t| {
        page.is_newer(t) || d.content.is_newer(t) || d.layout.is_newer(t)
    }) {
        tracing::debug!(path = %dst.path.join(&artifact).display(), "artifact up to date, skipping");
        return Ok(());
    }

    let scope = Scope {
        site: d.site,
        section: d.section,
        category: None,
        page: PageView::from(page),
        pages: Vec::new(),
        vars: cascade(&[&d.site.vars, &d.section.vars, &page.vars]),
    };
    let body = compose(d.content, d.layout, scope)?;
    write_artifact(dst, &artifact, &body)
}
