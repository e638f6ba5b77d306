//! Viewer for OpenDocument (OpenOffice.org / LibreOffice) attachments.

pub mod tags;

use std::fs;
use std::path::PathBuf;

use quick_xml::escape::escape;
use tempfile::TempDir;

use crate::archive::{ArchiveEntry, ZipArchiveEngine, ZipEngine};
use crate::error::Result;
use crate::sanitize;
use crate::stylesheet::{Stylesheet, StylesheetParams};
use crate::translation::t;
use crate::viewer::{
    Capability, Metadata, MimePart, RenderOutput, RenderedPart, StatusMessage, Viewer,
};

pub const CONTENT_XML: &str = "content.xml";
pub const STYLES_XML: &str = "styles.xml";
pub const META_XML: &str = "meta.xml";

/// Archive members the viewer reads.
pub const REQUIRED_MEMBERS: [&str; 3] = [CONTENT_XML, STYLES_XML, META_XML];

const SCRATCH_PREFIX: &str = "ooo-viewer-";

pub struct Config {
    /// Decompression backend. A [`ZipArchiveEngine`] is used when unset.
    pub zip: Option<Box<dyn ZipEngine>>,
    /// Where per-document scratch directories are created. Defaults to the
    /// system temp directory.
    pub temp_dir: Option<PathBuf>,
    /// Stylesheet for full rendering. Without one, only tag substitution is
    /// done.
    pub stylesheet: Option<Box<dyn Stylesheet>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zip: None,
            temp_dir: None,
            stylesheet: bundled_stylesheet(),
        }
    }
}

impl Config {
    /// Configuration without a stylesheet.
    pub fn fallback() -> Self {
        Self {
            zip: None,
            temp_dir: None,
            stylesheet: None,
        }
    }

    pub fn with_zip(mut self, zip: impl ZipEngine + 'static) -> Self {
        self.zip = Some(Box::new(zip));
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    pub fn with_stylesheet(mut self, stylesheet: impl Stylesheet + 'static) -> Self {
        self.stylesheet = Some(Box::new(stylesheet));
        self
    }
}

#[cfg(feature = "xhtml")]
fn bundled_stylesheet() -> Option<Box<dyn Stylesheet>> {
    Some(Box::new(crate::stylesheet::OpenDocumentXhtml))
}

#[cfg(not(feature = "xhtml"))]
fn bundled_stylesheet() -> Option<Box<dyn Stylesheet>> {
    None
}

pub struct OooViewer {
    zip: Box<dyn ZipEngine>,
    temp_dir: Option<PathBuf>,
    stylesheet: Option<Box<dyn Stylesheet>>,
}

impl Default for OooViewer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl OooViewer {
    pub fn new(config: Config) -> Self {
        Self {
            zip: config.zip.unwrap_or_else(|| Box::new(ZipArchiveEngine)),
            temp_dir: config.temp_dir,
            stylesheet: config.stylesheet,
        }
    }

    pub fn has_stylesheet(&self) -> bool {
        self.stylesheet.is_some()
    }

    fn render_substituted(&self, part: &MimePart, entries: &[ArchiveEntry]) -> Result<RenderOutput> {
        let Some(key) = entries.iter().position(|e| e.name == CONTENT_XML) else {
            log::debug!("part {}: no {CONTENT_XML}, nothing to render", part.mime_id());
            return Ok(RenderOutput::new());
        };

        let content = self.zip.extract(part.contents(), entries, key)?;
        let html = tags::substitute(&String::from_utf8_lossy(&content));
        Ok(single(part, RenderedPart::html(html, Vec::new())))
    }

    fn render_styled(
        &self,
        part: &MimePart,
        entries: &[ArchiveEntry],
        stylesheet: &dyn Stylesheet,
    ) -> Result<RenderOutput> {
        let members: Vec<(usize, &ArchiveEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| REQUIRED_MEMBERS.contains(&e.name.as_str()))
            .collect();
        if !members.iter().any(|(_, e)| e.name == CONTENT_XML) {
            log::debug!("part {}: no {CONTENT_XML}, nothing to render", part.mime_id());
            return Ok(RenderOutput::new());
        }

        let scratch = self.scratch_dir()?;
        for (key, entry) in &members {
            let content = self.zip.extract(part.contents(), entries, *key)?;
            fs::write(scratch.path().join(&entry.name), content)?;
        }

        let params = StylesheetParams::for_dir(scratch.path())?;
        let rendered = match stylesheet.transform(&scratch.path().join(CONTENT_XML), &params) {
            Ok(markup) => RenderedPart::html(sanitize::filter_xss(&markup)?, Vec::new()),
            Err(e) => {
                log::warn!(
                    "part {}: {} failed: {e}",
                    part.mime_id(),
                    stylesheet.name()
                );
                RenderedPart::html(
                    escape(e.message()).into_owned(),
                    vec![StatusMessage::warning(t(
                        "The document could not be converted. The conversion error is shown instead.",
                    ))],
                )
            }
        };

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            log::warn!("could not remove {}: {e}", scratch_path.display());
        }

        Ok(single(part, rendered))
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.temp_dir {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        log::debug!("scratch directory {}", dir.path().display());
        Ok(dir)
    }
}

fn single(part: &MimePart, rendered: RenderedPart) -> RenderOutput {
    RenderOutput::from([(part.mime_id().to_string(), rendered)])
}

impl Viewer for OooViewer {
    fn capability(&self) -> Capability {
        Capability {
            full: true,
            info: false,
            inline: false,
            raw: false,
        }
    }

    fn metadata(&self) -> Metadata {
        // Assume the document takes advantage of ZIP compression.
        Metadata {
            compressed: true,
            embedded: false,
            force_inline: false,
        }
    }

    fn render(&self, part: &MimePart) -> Result<RenderOutput> {
        let entries = self.zip.list(part.contents())?;
        match &self.stylesheet {
            Some(stylesheet) => self.render_styled(part, &entries, stylesheet.as_ref()),
            None => self.render_substituted(part, &entries),
        }
    }
}
