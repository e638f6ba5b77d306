use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::error::TransformError;

/// Document properties from `meta.xml`.
///
/// Values are kept XML-escaped so they can be written straight into markup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub generator: Option<String>,
    pub keywords: Vec<String>,
}

impl DocumentMeta {
    pub fn parse(xml: &str) -> Result<Self, TransformError> {
        let mut meta = DocumentMeta::default();
        let mut reader = Reader::from_str(xml);
        let mut current: Option<Vec<u8>> = None;
        let mut text = String::new();
        let mut initial_creator = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    current = Some(e.name().as_ref().to_vec());
                    text.clear();
                }
                Ok(Event::Text(e)) if current.is_some() => {
                    let decoded = e.decode().unwrap_or_default();
                    text.push_str(&escape(&*decoded));
                }
                Ok(Event::GeneralRef(e)) if current.is_some() => {
                    super::xhtml::push_entity(&mut text, &e);
                }
                Ok(Event::End(_)) => {
                    if let Some(name) = current.take() {
                        let value = text.trim().to_string();
                        if !value.is_empty() {
                            match name.as_slice() {
                                b"dc:title" => meta.title = Some(value),
                                b"dc:description" => meta.description = Some(value),
                                b"dc:subject" => meta.subject = Some(value),
                                b"dc:creator" => meta.author = Some(value),
                                b"meta:initial-creator" => initial_creator = Some(value),
                                b"dc:language" => meta.language = Some(value),
                                b"meta:generator" => meta.generator = Some(value),
                                b"meta:keyword" => meta.keywords.push(value),
                                _ => {}
                            }
                        }
                    }
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TransformError::new(format!(
                        "meta.xml: {e} at position {}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        if meta.author.is_none() {
            meta.author = initial_creator;
        }
        Ok(meta)
    }

    /// `<title>` and `<meta>` elements for the document head.
    pub fn head_markup(&self) -> String {
        let mut head = String::new();
        head.push_str("<title>");
        head.push_str(self.title.as_deref().unwrap_or(""));
        head.push_str("</title>");

        let named = [
            ("author", self.author.as_deref()),
            ("description", self.description.as_deref()),
            ("subject", self.subject.as_deref()),
            ("generator", self.generator.as_deref()),
        ];
        for (name, content) in named {
            if let Some(content) = content {
                head.push_str(&format!(r#"<meta name="{name}" content="{content}"/>"#));
            }
        }
        if !self.keywords.is_empty() {
            head.push_str(&format!(
                r#"<meta name="keywords" content="{}"/>"#,
                self.keywords.join(", ")
            ));
        }
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const META: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-meta xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0">
  <office:meta>
    <meta:generator>LibreOffice/7.6</meta:generator>
    <dc:title>Quarterly &amp; Annual</dc:title>
    <meta:initial-creator>Jane Roe</meta:initial-creator>
    <meta:keyword>report</meta:keyword>
    <meta:keyword>finance</meta:keyword>
    <dc:language>en-US</dc:language>
  </office:meta>
</office:document-meta>"#;

    #[rstest]
    fn test_parse_meta() {
        let meta = DocumentMeta::parse(META).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Quarterly &amp; Annual"));
        assert_eq!(meta.author.as_deref(), Some("Jane Roe"));
        assert_eq!(meta.language.as_deref(), Some("en-US"));
        assert_eq!(meta.generator.as_deref(), Some("LibreOffice/7.6"));
        assert_eq!(meta.keywords, vec!["report", "finance"]);
    }

    #[rstest]
    fn test_creator_wins_over_initial_creator() {
        let meta = DocumentMeta::parse(
            "<m><meta:initial-creator>A</meta:initial-creator><dc:creator>B</dc:creator></m>",
        )
        .unwrap();
        assert_eq!(meta.author.as_deref(), Some("B"));
    }

    #[rstest]
    fn test_head_markup() {
        let meta = DocumentMeta::parse(META).unwrap();
        let head = meta.head_markup();
        assert!(head.starts_with("<title>Quarterly &amp; Annual</title>"));
        assert!(head.contains(r#"<meta name="author" content="Jane Roe"/>"#));
        assert!(head.contains(r#"<meta name="keywords" content="report, finance"/>"#));
    }

    #[rstest]
    fn test_markup_in_title_is_escaped() {
        let meta = DocumentMeta::parse("<m><dc:title>a &lt;b&gt;</dc:title></m>").unwrap();
        assert_eq!(meta.title.as_deref(), Some("a &lt;b&gt;"));
    }

    #[rstest]
    fn test_empty_meta() {
        let meta = DocumentMeta::parse("").unwrap();
        assert_eq!(meta, DocumentMeta::default());
        assert_eq!(meta.head_markup(), "<title></title>");
    }
}
