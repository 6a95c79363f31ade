//! Top-level site rendering: section reconciliation and dispatch.

use super::section::Section;
use super::RenderError;
use crate::config::SiteConfig;
use crate::content::ContentTree;
use crate::mirror::DirNode;
use crate::templates::{Template, TemplateDir};

/// Name of the shared layout template, resolved at the template root.
pub const LAYOUT: &str = "layout";

/// One site render: configuration, the shared layout, and the template
/// tree the sections draw from.
pub struct Site<'a> {
    pub config: &'a SiteConfig,
    pub(super) layout: &'a dyn Template,
    pub(super) tmpls: &'a TemplateDir,
}

impl<'a> Site<'a> {
    /// Resolve the shared layout up front; a site without one cannot
    /// render anything.
    pub fn new(config: &'a SiteConfig, tmpls: &'a TemplateDir) -> Result<Site<'a>, RenderError> {
        let layout = tmpls.get(LAYOUT)?;
        Ok(Site {
            config,
            layout,
            tmpls,
        })
    }

    /// Render every configured section present in the source tree into
    /// `dst`, pruning destination sections the source no longer has.
    ///
    /// A source section without configuration is skipped with a warning;
    /// whether that should instead abort the whole render is the
    /// caller's policy, not decided here.
    pub fn render(
        &self,
        src: &ContentTree,
        dst: &mut DirNode,
        force: bool,
    ) -> Result<(), RenderError> {
        let stale: Vec<String> = dst
            .dirs
            .keys()
            .filter(|name| !src.root.subs.contains_key(*name))
            .cloned()
            .collect();
        for name in stale {
            tracing::info!(section = %name, "removing destination section no longer in source");
            dst.remove_all(&name)?;
        }

        for (name, src_dir) in &src.root.subs {
            let Some(config) = self.config.sections.get(name) else {
                tracing::warn!(section = %name, "missing config for section, skipping");
                continue;
            };
            tracing::info!(section = %name, "rendering section");
            let section = Section::new(self, name, config)?;
            section.render(src_dir, dst, force)?;
        }
        Ok(())
    }
}
