//! OpenDocument to XHTML conversion shipped with the crate.
//!
//! Walks `content.xml` once, turning the body into XHTML, and folds in the
//! document properties from `meta.xml` and the styles from `styles.xml`
//! (plus the automatic styles of `content.xml`) as `<head>` content.

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};

use super::meta::DocumentMeta;
use super::styles::{self, StyleRule};
use super::{Stylesheet, StylesheetParams, url_to_path};
use crate::error::TransformError;

/// Base CSS bundled with the stylesheet.
pub const BASE_CSS: &str = include_str!("../../assets/opendoc2xhtml.css");

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// `text:s` runs longer than this are truncated.
const MAX_SPACES: usize = 1024;

/// Elements whose whole subtree carries no renderable body content.
const SKIPPED: &[&[u8]] = &[
    b"office:automatic-styles",
    b"office:font-face-decls",
    b"office:scripts",
    b"office:forms",
    b"office:settings",
    b"office:event-listeners",
    b"office:annotation",
    b"office:change-info",
    b"text:sequence-decls",
    b"text:variable-decls",
    b"text:user-field-decls",
    b"text:tracked-changes",
    b"table:covered-table-cell",
    b"table:table-columns",
    b"table:table-column",
    b"presentation:notes",
    b"svg:title",
    b"svg:desc",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenDocumentXhtml;

impl Stylesheet for OpenDocumentXhtml {
    fn name(&self) -> &'static str {
        "opendoc2xhtml"
    }

    fn transform(
        &self,
        content: &Path,
        params: &StylesheetParams,
    ) -> Result<String, TransformError> {
        let xml = fs::read_to_string(content).map_err(|e| {
            TransformError::new(format!(
                "failed to load external entity \"{}\": {e}",
                content.display()
            ))
        })?;

        let body = render_body(&xml)?;

        let meta = match load_param(&params.meta_file_url) {
            Some(text) => DocumentMeta::parse(&text).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable document properties: {e}");
                DocumentMeta::default()
            }),
            None => DocumentMeta::default(),
        };

        let mut rules: Vec<StyleRule> = match load_param(&params.styles_file_url) {
            Some(text) => styles::collect(&text).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable styles: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        rules.extend(styles::collect(&xml)?);

        Ok(assemble(&meta, &styles::render_css(&rules), &body))
    }
}

fn load_param(url: &str) -> Option<String> {
    let Some(path) = url_to_path(url) else {
        log::warn!("stylesheet parameter is not a file URL: {url}");
        return None;
    };
    match fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("cannot read {}: {e}", path.display());
            None
        }
    }
}

fn assemble(meta: &DocumentMeta, css: &str, body: &str) -> String {
    let lang = meta
        .language
        .as_deref()
        .map(|l| format!(r#" lang="{l}" xml:lang="{l}""#))
        .unwrap_or_default();

    let mut html = String::with_capacity(BASE_CSS.len() + css.len() + body.len() + 256);
    html.push_str("<!DOCTYPE html>\n");
    html.push_str(&format!(
        r#"<html xmlns="http://www.w3.org/1999/xhtml"{lang}>"#
    ));
    html.push_str(r#"<head><meta charset="UTF-8"/>"#);
    html.push_str(&meta.head_markup());
    html.push_str("<style type=\"text/css\">\n");
    html.push_str(BASE_CSS);
    html.push_str(css);
    html.push_str("</style></head>\n<body>");
    html.push_str(body);
    html.push_str("</body></html>\n");
    html
}

/// Appends an entity or character reference, dropping anything that is not
/// a predefined XML entity or a numeric reference.
pub(crate) fn push_entity(out: &mut String, entity: &BytesRef<'_>) {
    let name = String::from_utf8_lossy(entity);
    let valid = match name.strip_prefix('#') {
        Some(hex) if hex.starts_with(['x', 'X']) => {
            hex.len() > 1 && hex[1..].chars().all(|c| c.is_ascii_hexdigit())
        }
        Some(dec) => !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit()),
        None => matches!(&*name, "amp" | "lt" | "gt" | "quot" | "apos"),
    };
    if valid {
        out.push('&');
        out.push_str(&name);
        out.push(';');
    }
}

enum Close {
    Tag(&'static str),
    Transparent,
    Body,
    Citation,
    NoteBody,
}

#[derive(Default)]
struct BodyWriter {
    body: String,
    notes: String,
    citation: String,
    stack: Vec<Close>,
    skip: usize,
    in_body: bool,
    in_citation: bool,
    note_depth: usize,
}

fn render_body(xml: &str) -> Result<String, TransformError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = BodyWriter::default();
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                seen_root = true;
                writer.open(&e, false);
            }
            Ok(Event::Empty(e)) => {
                seen_root = true;
                writer.open(&e, true);
            }
            Ok(Event::End(_)) => writer.close(),
            Ok(Event::Text(e)) => {
                let text = e.decode().unwrap_or_default();
                writer.text(&partial_escape(&*text));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).to_string();
                writer.text(&partial_escape(text.as_str()));
            }
            Ok(Event::GeneralRef(e)) => {
                let mut text = String::new();
                push_entity(&mut text, &e);
                writer.text(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TransformError::new(format!(
                    "content.xml: {e} at position {}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !seen_root {
        return Err(TransformError::new("content.xml: Document is empty"));
    }
    if !writer.stack.is_empty() || writer.skip > 0 {
        return Err(TransformError::new(format!(
            "content.xml: Premature end of data, {} element(s) not closed",
            writer.stack.len() + writer.skip
        )));
    }

    Ok(writer.finish())
}

impl BodyWriter {
    fn out(&mut self) -> &mut String {
        if self.note_depth > 0 {
            &mut self.notes
        } else {
            &mut self.body
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip > 0 || !self.in_body {
            return;
        }
        if self.in_citation {
            self.citation.push_str(text);
        }
        self.out().push_str(text);
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        if self.skip > 0 {
            if !empty {
                self.skip += 1;
            }
            return;
        }

        let name = e.name();
        let name = name.as_ref();

        if name == b"office:body" {
            self.in_body = !empty;
            if !empty {
                self.stack.push(Close::Body);
            }
            return;
        }
        if !self.in_body {
            if !empty {
                self.stack.push(Close::Transparent);
            }
            return;
        }
        if SKIPPED.iter().any(|skipped| *skipped == name) {
            if !empty {
                self.skip = 1;
            }
            return;
        }

        let close = match name {
            b"text:p" => self.open_tag("p", e),
            b"text:h" => {
                let level = attr(e, b"text:outline-level")
                    .and_then(|l| l.parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, HEADINGS.len());
                self.open_tag(HEADINGS[level - 1], e)
            }
            b"text:span" => self.open_tag("span", e),
            b"text:a" => {
                let href = attr(e, b"xlink:href").unwrap_or_default();
                let markup = format!(r#"<a href="{}">"#, escape(href.as_str()));
                self.out().push_str(&markup);
                Close::Tag("a")
            }
            b"text:list" => self.open_tag("ul", e),
            b"text:list-item" | b"text:list-header" => self.open_tag("li", e),
            b"table:table" => self.open_tag("table", e),
            b"table:table-header-rows" => self.open_tag("thead", e),
            b"table:table-row" => self.open_tag("tr", e),
            b"table:table-cell" => {
                let mut markup = String::from("<td");
                push_class(&mut markup, e);
                if let Some(span) = attr(e, b"table:number-columns-spanned").filter(|s| is_count(s)) {
                    markup.push_str(&format!(r#" colspan="{span}""#));
                }
                if let Some(span) = attr(e, b"table:number-rows-spanned").filter(|s| is_count(s)) {
                    markup.push_str(&format!(r#" rowspan="{span}""#));
                }
                markup.push('>');
                self.out().push_str(&markup);
                Close::Tag("td")
            }
            b"draw:page" => {
                let markup = r#"<div class="page">"#;
                self.out().push_str(markup);
                Close::Tag("div")
            }
            b"text:line-break" => {
                self.out().push_str("<br/>");
                Close::Transparent
            }
            b"text:tab" => {
                self.out().push_str(r#"<span class="tab"> </span>"#);
                Close::Transparent
            }
            b"text:s" => {
                let count = attr(e, b"text:c")
                    .and_then(|c| c.parse::<usize>().ok())
                    .unwrap_or(1)
                    .min(MAX_SPACES);
                let spaces = "&#160;".repeat(count);
                self.out().push_str(&spaces);
                Close::Transparent
            }
            b"text:note-citation" => {
                self.out().push_str(r#"<sup class="note">"#);
                self.in_citation = true;
                self.citation.clear();
                Close::Citation
            }
            b"text:note-body" => {
                self.note_depth += 1;
                let markup = format!(
                    r#"<div class="footnote"><sup>{}</sup> "#,
                    std::mem::take(&mut self.citation)
                );
                self.notes.push_str(&markup);
                Close::NoteBody
            }
            _ => Close::Transparent,
        };

        if empty {
            self.finish_element(close);
        } else {
            self.stack.push(close);
        }
    }

    fn open_tag(&mut self, tag: &'static str, e: &BytesStart<'_>) -> Close {
        let mut markup = format!("<{tag}");
        push_class(&mut markup, e);
        markup.push('>');
        self.out().push_str(&markup);
        Close::Tag(tag)
    }

    fn close(&mut self) {
        if self.skip > 0 {
            self.skip -= 1;
            return;
        }
        if let Some(close) = self.stack.pop() {
            self.finish_element(close);
        }
    }

    fn finish_element(&mut self, close: Close) {
        match close {
            Close::Tag(tag) => {
                let markup = format!("</{tag}>");
                self.out().push_str(&markup);
            }
            Close::Transparent => {}
            Close::Body => self.in_body = false,
            Close::Citation => {
                self.in_citation = false;
                self.out().push_str("</sup>");
            }
            Close::NoteBody => {
                self.notes.push_str("</div>");
                self.note_depth = self.note_depth.saturating_sub(1);
            }
        }
    }

    fn finish(self) -> String {
        let mut body = self.body;
        if !self.notes.is_empty() {
            body.push_str(r#"<div class="footnotes"><hr/>"#);
            body.push_str(&self.notes);
            body.push_str("</div>");
        }
        body
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).to_string();
            match unescape(&raw) {
                Ok(value) => value.into_owned(),
                Err(_) => raw,
            }
        })
}

fn push_class(markup: &mut String, e: &BytesStart<'_>) {
    let style = attr(e, b"text:style-name")
        .or_else(|| attr(e, b"table:style-name"))
        .or_else(|| attr(e, b"draw:style-name"));
    if let Some(style) = style {
        markup.push_str(&format!(r#" class="{}""#, styles::class_name(&style)));
    }
}

fn is_count(value: &str) -> bool {
    !value.is_empty() && value.len() <= 5 && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const OFFICE_NS: &str = r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" xmlns:xlink="http://www.w3.org/1999/xlink""#;

    fn content_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content {OFFICE_NS}>
  <office:automatic-styles>
    <style:style style:name="P1" style:family="paragraph">
      <style:text-properties fo:font-style="italic"/>
    </style:style>
  </office:automatic-styles>
  <office:body><office:text>{body}</office:text></office:body>
</office:document-content>"#
        )
    }

    #[fixture]
    fn workdir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn transform(dir: &TempDir, content: &str, extra: &[(&str, &str)]) -> Result<String, TransformError> {
        fs::write(dir.path().join("content.xml"), content).unwrap();
        for (name, text) in extra {
            fs::write(dir.path().join(name), text).unwrap();
        }
        let params = StylesheetParams::for_dir(dir.path()).unwrap();
        OpenDocumentXhtml.transform(&dir.path().join("content.xml"), &params)
    }

    fn body_of(html: &str) -> &str {
        let start = html.find("<body>").unwrap() + "<body>".len();
        let end = html.find("</body>").unwrap();
        &html[start..end]
    }

    #[rstest]
    #[case::paragraph("<text:p>Hello</text:p>", "<p>Hello</p>")]
    #[case::styled_paragraph(
        r#"<text:p text:style-name="P1">Hi</text:p>"#,
        r#"<p class="P1">Hi</p>"#
    )]
    #[case::empty_paragraph("<text:p/>", "<p></p>")]
    #[case::heading(
        r#"<text:h text:outline-level="2">Title</text:h>"#,
        "<h2>Title</h2>"
    )]
    #[case::heading_level_clamped(
        r#"<text:h text:outline-level="9">Deep</text:h>"#,
        "<h6>Deep</h6>"
    )]
    #[case::span(
        r#"<text:p>a <text:span text:style-name="T 1">b</text:span></text:p>"#,
        r#"<p>a <span class="T_1">b</span></p>"#
    )]
    #[case::link(
        r#"<text:p><text:a xlink:href="https://example.com/?a=1&amp;b=2">x</text:a></text:p>"#,
        r#"<p><a href="https://example.com/?a=1&amp;b=2">x</a></p>"#
    )]
    #[case::list(
        "<text:list><text:list-item><text:p>one</text:p></text:list-item></text:list>",
        "<ul><li><p>one</p></li></ul>"
    )]
    #[case::line_break("<text:p>a<text:line-break/>b</text:p>", "<p>a<br/>b</p>")]
    #[case::spaces(r#"<text:p>a<text:s text:c="3"/>b</text:p>"#, "<p>a&#160;&#160;&#160;b</p>")]
    #[case::entities("<text:p>1 &lt; 2 &amp;&#65;</text:p>", "<p>1 &lt; 2 &amp;&#65;</p>")]
    #[case::markup_in_text("<text:p><![CDATA[<b>]]></text:p>", "<p>&lt;b&gt;</p>")]
    #[case::annotation_skipped(
        "<text:p>x<office:annotation><text:p>note</text:p></office:annotation></text:p>",
        "<p>x</p>"
    )]
    fn test_body(workdir: TempDir, #[case] body: &str, #[case] expected: &str) {
        let html = transform(&workdir, &content_xml(body), &[]).unwrap();
        assert_eq!(body_of(&html), expected);
    }

    #[rstest]
    fn test_table(workdir: TempDir) {
        let body = r#"<table:table table:name="T"><table:table-column table:number-columns-repeated="2"/>
<table:table-row><table:table-cell table:number-columns-spanned="2"><text:p>wide</text:p></table:table-cell><table:covered-table-cell/></table:table-row>
</table:table>"#;
        let html = transform(&workdir, &content_xml(body), &[]).unwrap();
        let body = body_of(&html);
        assert!(body.contains(r#"<td colspan="2"><p>wide</p></td>"#));
        assert!(body.starts_with("<table>"));
        assert!(body.ends_with("</table>"));
        assert_eq!(body.matches("<td").count(), 1);
    }

    #[rstest]
    fn test_footnote(workdir: TempDir) {
        let body = "<text:p>Claim<text:note><text:note-citation>1</text:note-citation>\
                    <text:note-body><text:p>Source</text:p></text:note-body></text:note></text:p>";
        let html = transform(&workdir, &content_xml(body), &[]).unwrap();
        let body = body_of(&html);
        assert!(body.starts_with(r#"<p>Claim<sup class="note">1</sup></p>"#));
        assert!(body.contains(r#"<div class="footnote"><sup>1</sup> <p>Source</p></div>"#));
    }

    #[rstest]
    fn test_head_from_params(workdir: TempDir) {
        let meta = "<office:document-meta><office:meta><dc:title>Plan</dc:title>\
                    <dc:language>de</dc:language></office:meta></office:document-meta>";
        let styles = r#"<office:document-styles><office:styles><style:style style:name="Standard">
<style:text-properties fo:font-weight="bold"/></style:style></office:styles></office:document-styles>"#;
        let html = transform(
            &workdir,
            &content_xml("<text:p>x</text:p>"),
            &[("meta.xml", meta), ("styles.xml", styles)],
        )
        .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"lang="de""#));
        assert!(html.contains("<title>Plan</title>"));
        assert!(html.contains(".Standard { font-weight: bold; }"));
        assert!(html.contains(".P1 { font-style: italic; }"));
        assert!(html.contains(BASE_CSS));
    }

    #[rstest]
    fn test_missing_params_are_tolerated(workdir: TempDir) {
        let html = transform(&workdir, &content_xml("<text:p>x</text:p>"), &[]).unwrap();
        assert!(html.contains("<title></title>"));
    }

    #[rstest]
    fn test_broken_meta_is_tolerated(workdir: TempDir) {
        let html = transform(
            &workdir,
            &content_xml("<text:p>x</text:p>"),
            &[("meta.xml", "<a><b></a>")],
        )
        .unwrap();
        assert!(html.contains("<p>x</p>"));
    }

    #[rstest]
    #[case::mismatched("<office:document-content><office:body></office:text></office:document-content>")]
    #[case::unclosed("<office:document-content><office:body>")]
    #[case::empty("")]
    #[case::not_xml("just some text")]
    fn test_malformed_content(workdir: TempDir, #[case] content: &str) {
        let err = transform(&workdir, content, &[]).unwrap_err();
        assert!(err.message().starts_with("content.xml:"), "{err}");
    }

    #[rstest]
    fn test_missing_content_file(workdir: TempDir) {
        let params = StylesheetParams::for_dir(workdir.path()).unwrap();
        let err = OpenDocumentXhtml
            .transform(&workdir.path().join("content.xml"), &params)
            .unwrap_err();
        assert!(err.message().contains("failed to load external entity"));
    }

    #[rstest]
    #[case::decimal("#65", "&#65;")]
    #[case::hex("#x41", "&#x41;")]
    #[case::named("quot", "&quot;")]
    #[case::unknown("nbsp", "")]
    #[case::bogus("#x", "")]
    fn test_push_entity(#[case] name: &str, #[case] expected: &str) {
        let mut out = String::new();
        push_entity(&mut out, &BytesRef::new(name));
        assert_eq!(out, expected);
    }
}
