use std::collections::BTreeMap;

use crate::error::Result;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// One MIME part handed to a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    mime_id: String,
    mime_type: String,
    contents: Vec<u8>,
}

impl MimePart {
    pub fn new(mime_id: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            mime_id: mime_id.into(),
            mime_type: mime_type.into(),
            contents,
        }
    }

    pub fn mime_id(&self) -> &str {
        &self.mime_id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

/// Display modes a viewer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Capability {
    pub full: bool,
    pub info: bool,
    pub inline: bool,
    pub raw: bool,
}

/// What a viewer reports about the data it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Metadata {
    pub compressed: bool,
    pub embedded: bool,
    pub force_inline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum StatusKind {
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct RenderedPart {
    pub data: String,
    pub status: Vec<StatusMessage>,
    #[cfg_attr(feature = "json", serde(rename = "type"))]
    pub content_type: String,
}

impl RenderedPart {
    pub fn html(data: String, status: Vec<StatusMessage>) -> Self {
        Self {
            data,
            status,
            content_type: HTML_CONTENT_TYPE.to_string(),
        }
    }
}

/// Rendered parts keyed by MIME id. Empty when nothing could be rendered.
pub type RenderOutput = BTreeMap<String, RenderedPart>;

pub trait Viewer {
    fn capability(&self) -> Capability;
    fn metadata(&self) -> Metadata;
    fn render(&self, part: &MimePart) -> Result<RenderOutput>;
}
