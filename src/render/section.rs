//! Section rendering: prune, categories, then the directory subtree.

use super::category::Category;
use super::dir::DirRender;
use super::site::Site;
use super::RenderError;
use crate::config::{SectionConfig, SiteConfig};
use crate::content::ContentDir;
use crate::mirror::DirNode;
use crate::templates::{Template, TemplateDir};

/// Rendering state for one configured section. Owns an independent
/// template cache for the section's directory; the layout stays shared
/// with the site.
pub(super) struct Section<'a> {
    pub site: &'a SiteConfig,
    pub config: &'a SectionConfig,
    pub name: &'a str,
    pub layout: &'a dyn Template,
    pub tmpls: TemplateDir,
}

impl<'a> Section<'a> {
    pub fn new(
        site: &Site<'a>,
        name: &'a str,
        config: &'a SectionConfig,
    ) -> Result<Section<'a>, RenderError> {
        let tmpls = site.tmpls.sub(name)?;
        Ok(Section {
            site: site.config,
            config,
            name,
            layout: site.layout,
            tmpls,
        })
    }

    /// Render this section under `dst`: ensure the destination
    /// directory, prune destination subdirectories that are neither
    /// source subdirectories nor declared category names, render every
    /// declared category, then walk the section's directory subtree.
    pub fn render(
        &self,
        src: &ContentDir,
        dst: &mut DirNode,
        force: bool,
    ) -> Result<(), RenderError> {
        let dst_dir = dst.ensure_dir(self.name)?;

        let stale: Vec<String> = dst_dir
            .dirs
            .keys()
            .filter(|name| {
                !src.subs.contains_key(*name) && !self.config.has_category(name.as_str())
            })
            .cloned()
            .collect();
        for name in stale {
            tracing::info!(path = %dst_dir.path.join(&name).display(), "pruning directory no longer in source");
            dst_dir.remove_all(&name)?;
        }

        for config in &self.config.categories {
            let category = Category::new(self, config)?;
            category.render(src, dst_dir, force)?;
        }

        let dir = DirRender::for_section(self)?;
        dir.render(src, dst_dir, force)
    }
}
