//! Category index rendering.
//!
//! Categories are logical groupings declared in the section
//! configuration, independent of where pages physically live: the
//! gather step scans the entire section subtree, so a matching page
//! three directories deep still lands in its category's index.

use super::section::Section;
use super::{compose, write_artifact, PageView, RenderError, Scope};
use crate::config::{cascade, CategoryConfig, SectionConfig, SiteConfig};
use crate::content::{self, ContentDir, Page};
use crate::mirror::DirNode;
use crate::templates::Template;

/// Rendering state for one declared category.
pub(super) struct Category<'a> {
    site: &'a SiteConfig,
    section: &'a SectionConfig,
    config: &'a CategoryConfig,
    layout: &'a dyn Template,
    template: &'a dyn Template,
    /// Destination directory name: the lowercased category name.
    dir_name: String,
}

impl<'a> Category<'a> {
    pub fn new(
        section: &'a Section<'_>,
        config: &'a CategoryConfig,
    ) -> Result<Category<'a>, RenderError> {
        let template = section.tmpls.get(&section.config.templates.category)?;
        Ok(Category {
            site: section.site,
            section: section.config,
            config,
            layout: section.layout,
            template,
            dir_name: config.name.to_lowercase(),
        })
    }

    /// Render this category's index from every matching page in the
    /// section subtree, newest first. Rebuilt on every pass: category
    /// membership changes leave no mtime trace on surviving inputs.
    pub fn render(
        &self,
        src: &ContentDir,
        dst: &mut DirNode,
        _force: bool,
    ) -> Result<(), RenderError> {
        let mut pages = Vec::new();
        gather(src, &self.config.name, &mut pages);

        let scope = Scope {
            site: self.site,
            section: self.section,
            category: Some(self.config),
            page: PageView::synthetic(&self.config.name, &self.config.name),
            pages: content::latest(pages),
            vars: cascade(&[&self.site.vars, &self.section.vars, &self.config.vars]),
        };
        let body = compose(self.template, self.layout, scope)?;

        let sub = dst.ensure_dir(&self.dir_name)?;
        write_artifact(sub, &format!("index.{}", self.site.artifact_ext), &body)
    }
}

/// Depth-unbounded scan for pages whose category field matches exactly.
fn gather<'p>(dir: &'p ContentDir, category: &str, out: &mut Vec<&'p Page>) {
    for sub in dir.subs.values() {
        gather(sub, category, out);
    }
    for page in dir.pages.values() {
        if page.category == category {
            out.push(page);
        }
    }
}
