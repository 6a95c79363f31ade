//! Per-directory rendering: prune, index, pages, recursion.

use super::section::Section;
use super::{index, page, RenderError};
use crate::config::{SectionConfig, SiteConfig};
use crate::content::ContentDir;
use crate::mirror::DirNode;
use crate::templates::{Template, TemplateDir};

/// Rendering state for one directory level of a section. `sub` derives
/// the state for a child directory: same templates and section
/// identity, listing list advanced by one.
pub(super) struct DirRender<'a> {
    pub site: &'a SiteConfig,
    pub section: &'a SectionConfig,
    pub name: String,
    /// Listing templates still applicable from this depth downward.
    pub listings: &'a [String],
    pub layout: &'a dyn Template,
    pub content: &'a dyn Template,
    pub tmpls: &'a TemplateDir,
    /// Set at the section root, where the section renderer has already
    /// pruned (sparing the directories category output owns).
    section_root: bool,
}

impl<'a> DirRender<'a> {
    pub fn for_section(section: &'a Section<'_>) -> Result<DirRender<'a>, RenderError> {
        let content = section.tmpls.get(&section.config.templates.content)?;
        Ok(DirRender {
            site: section.site,
            section: section.config,
            name: section.name.to_string(),
            listings: &section.config.templates.listings,
            layout: section.layout,
            content,
            tmpls: &section.tmpls,
            section_root: true,
        })
    }

    fn sub(&self, name: &str) -> DirRender<'a> {
        let listings = if self.listings.is_empty() {
            self.listings
        } else {
            &self.listings[1..]
        };
        DirRender {
            site: self.site,
            section: self.section,
            name: name.to_string(),
            listings,
            layout: self.layout,
            content: self.content,
            tmpls: self.tmpls,
            section_root: false,
        }
    }

    /// Render one directory level: prune destination subdirectories the
    /// source no longer has, render the index if a listing template
    /// applies at this depth, render every direct page, then recurse.
    pub fn render(
        &self,
        src: &ContentDir,
        dst: &mut DirNode,
        force: bool,
    ) -> Result<(), RenderError> {
        if !self.section_root {
            let stale: Vec<String> = dst
                .dirs
                .keys()
                .filter(|name| !src.subs.contains_key(*name))
                .cloned()
                .collect();
            for name in stale {
                tracing::info!(path = %dst.path.join(&name).display(), "pruning directory no longer in source");
                dst.remove_all(&name)?;
            }
        }

        index::render(self, src, dst, force)?;
        for page in src.pages.values() {
            page::render(self, page, dst, force)?;
        }
        for (name, sub_src) in &src.subs {
            let sub = self.sub(name);
            let sub_dst = dst.ensure_dir(name)?;
            sub.render(sub_src, sub_dst, force)?;
        }
        Ok(())
    }
}
