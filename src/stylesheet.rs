#[cfg(feature = "xhtml")]
pub mod meta;
#[cfg(feature = "xhtml")]
pub mod styles;
#[cfg(feature = "xhtml")]
pub mod xhtml;

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result, TransformError};

#[cfg(feature = "xhtml")]
pub use xhtml::OpenDocumentXhtml;

/// Named parameters handed to a stylesheet alongside `content.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetParams {
    pub meta_file_url: String,
    pub styles_file_url: String,
    /// Whether Java extension functions may be used.
    pub java: bool,
}

impl StylesheetParams {
    /// Parameters pointing at `meta.xml` and `styles.xml` inside `dir`.
    pub fn for_dir(dir: &Path) -> Result<Self> {
        let dir = std::path::absolute(dir)?;
        Ok(Self {
            meta_file_url: file_url(&dir.join("meta.xml"))?,
            styles_file_url: file_url(&dir.join("styles.xml"))?,
            java: false,
        })
    }
}

fn file_url(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not an absolute path: {}", path.display()),
            ))
        })
}

/// Resolves a `file://` URL parameter back to a local path.
pub fn url_to_path(url: &str) -> Option<PathBuf> {
    Url::parse(url).ok()?.to_file_path().ok()
}

/// Turns an OpenDocument `content.xml` into HTML markup.
pub trait Stylesheet: Send + Sync {
    fn name(&self) -> &'static str;

    fn transform(
        &self,
        content: &Path,
        params: &StylesheetParams,
    ) -> std::result::Result<String, TransformError>;
}
