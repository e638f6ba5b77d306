use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::TransformError;

/// A `style:style` definition reduced to the CSS it can be expressed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub name: String,
    pub family: String,
    pub declarations: Vec<(&'static str, String)>,
}

impl StyleRule {
    pub fn class_name(&self) -> String {
        class_name(&self.name)
    }
}

/// Collects style rules from a `styles.xml` or `content.xml` document.
pub fn collect(xml: &str) -> Result<Vec<StyleRule>, TransformError> {
    let mut rules = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut current: Option<StyleRule> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"style:style" => {
                current = start_rule(&e);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"style:style" => {
                if let Some(rule) = start_rule(&e) {
                    rules.push(rule);
                }
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if let Some(rule) = current.as_mut()
                    && is_properties(e.name().as_ref())
                {
                    read_properties(&e, &mut rule.declarations);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"style:style" => {
                if let Some(rule) = current.take() {
                    rules.push(rule);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TransformError::new(format!(
                    "styles: {e} at position {}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Ok(rules)
}

/// Renders rules as a CSS block. Rules without declarations are dropped.
pub fn render_css(rules: &[StyleRule]) -> String {
    let mut css = String::new();
    for rule in rules.iter().filter(|r| !r.declarations.is_empty()) {
        css.push('.');
        css.push_str(&rule.class_name());
        css.push_str(" {");
        for (property, value) in &rule.declarations {
            css.push_str(&format!(" {property}: {value};"));
        }
        css.push_str(" }\n");
    }
    css
}

/// Maps an OpenDocument style name to a CSS class name.
///
/// Style names may contain spaces and punctuation; anything outside
/// `[A-Za-z0-9_-]` becomes `_`, and a leading digit gets an `s` prefix.
pub fn class_name(style_name: &str) -> String {
    let mut class: String = style_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if class.starts_with(|c: char| c.is_ascii_digit()) {
        class.insert(0, 's');
    }
    class
}

fn start_rule(e: &BytesStart<'_>) -> Option<StyleRule> {
    let mut name = None;
    let mut family = String::new();
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"style:name" => name = Some(String::from_utf8_lossy(&attr.value).to_string()),
            b"style:family" => family = String::from_utf8_lossy(&attr.value).to_string(),
            _ => {}
        }
    }
    name.map(|name| StyleRule {
        name,
        family,
        declarations: Vec::new(),
    })
}

fn is_properties(name: &[u8]) -> bool {
    matches!(
        name,
        b"style:text-properties"
            | b"style:paragraph-properties"
            | b"style:table-cell-properties"
            | b"style:table-properties"
    )
}

fn read_properties(e: &BytesStart<'_>, declarations: &mut Vec<(&'static str, String)>) {
    for attr in e.attributes().flatten() {
        let raw = String::from_utf8_lossy(&attr.value);
        let Some(value) = css_value(&raw) else {
            continue;
        };
        let declaration = match attr.key.as_ref() {
            b"fo:font-weight" => ("font-weight", value),
            b"fo:font-style" => ("font-style", value),
            b"fo:font-size" => ("font-size", value),
            b"fo:color" => ("color", value),
            b"fo:background-color" => ("background-color", value),
            b"fo:text-align" => ("text-align", text_align(&value).to_string()),
            b"fo:text-indent" => ("text-indent", value),
            b"fo:margin-left" => ("margin-left", value),
            b"fo:margin-right" => ("margin-right", value),
            b"fo:margin-top" => ("margin-top", value),
            b"fo:margin-bottom" => ("margin-bottom", value),
            b"fo:padding" => ("padding", value),
            b"fo:border" => ("border", value),
            b"style:width" => ("width", value),
            b"style:text-underline-style" if value != "none" => {
                ("text-decoration", "underline".to_string())
            }
            b"style:text-line-through-style" if value != "none" => {
                ("text-decoration", "line-through".to_string())
            }
            _ => continue,
        };
        declarations.push(declaration);
    }
}

fn text_align(value: &str) -> &str {
    match value {
        "start" => "left",
        "end" => "right",
        other => other,
    }
}

/// Accepts plain CSS values (lengths, colours, keywords) and nothing else.
fn css_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '%' | '.' | '-' | ' ' | ','));
    (plain && !value.is_empty()).then(|| value.to_string())
}
