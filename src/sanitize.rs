//! XSS filter applied to stylesheet output before it reaches the viewer.

use lol_html::html_content::Element;
use lol_html::{RewriteStrSettings, doc_comments, element, rewrite_str, text};

use crate::error::{Error, Result};

/// Elements removed together with everything inside them.
const REMOVED_ELEMENTS: &[&str] = &[
    "script",
    "iframe",
    "frame",
    "frameset",
    "object",
    "embed",
    "applet",
    "base",
    "form",
    "link",
    "noscript",
    "meta[http-equiv]",
    "animate",
    "animatemotion",
    "animatetransform",
    "set",
];

/// Attributes that are dereferenced as URLs.
const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "action",
    "background",
    "lowsrc",
    "dynsrc",
    "formaction",
    "xlink:href",
];

/// Schemes a URL attribute may carry. `data:image/` is only allowed where
/// the value is loaded as an image.
const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:"];

const IMAGE_ATTRIBUTES: &[&str] = &["src", "lowsrc", "dynsrc", "background"];

/// SVG animation attributes that assign a new value to `attributeName`.
const ANIMATION_VALUES: &[&str] = &["values", "to", "from", "by"];

/// Strips executable content from `html`.
pub fn filter_xss(html: &str) -> Result<String> {
    let mut element_content_handlers: Vec<_> = REMOVED_ELEMENTS
        .iter()
        .map(|selector| {
            element!(*selector, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();
    element_content_handlers.push(element!("*", |el| {
        strip_attributes(el);
        Ok(())
    }));
    element_content_handlers.push(text!("style", |chunk| {
        if is_unsafe_css(chunk.as_str()) {
            chunk.remove();
        }
        Ok(())
    }));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            document_content_handlers: vec![doc_comments!(|comment| {
                comment.remove();
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| Error::Sanitize(e.to_string()))
}

fn strip_attributes(el: &mut Element<'_, '_>) {
    let animates_url = el.attributes().iter().any(|attr| {
        attr.name().eq_ignore_ascii_case("attributename")
            && URL_ATTRIBUTES.contains(&attr.value().trim().to_ascii_lowercase().as_str())
    });
    let unsafe_names: Vec<String> = el
        .attributes()
        .iter()
        .filter(|attr| {
            let name = attr.name();
            is_unsafe_attribute(&name, &attr.value())
                || (animates_url
                    && ANIMATION_VALUES.contains(&name.to_ascii_lowercase().as_str()))
        })
        .map(|attr| attr.name())
        .collect();
    for name in unsafe_names {
        el.remove_attribute(&name);
    }
}

fn is_unsafe_attribute(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") || name == "srcdoc" {
        return true;
    }
    if name == "style" {
        return is_unsafe_css(value);
    }
    URL_ATTRIBUTES.contains(&name.as_str())
        && is_unsafe_url(value, IMAGE_ATTRIBUTES.contains(&name.as_str()))
}

/// Attribute values arrive undecoded, so a scheme may be spelled with
/// character references (`javascript&colon;`) or percent escapes. Anything
/// that could be a scheme has to match the allowlist literally.
fn is_unsafe_url(value: &str, image: bool) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let head_end = normalized.find(['/', '?', '#']).unwrap_or(normalized.len());
    if !normalized[..head_end].contains([':', '&', '%']) {
        return false;
    }
    if image && normalized.starts_with("data:image/") {
        return false;
    }
    !SAFE_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

fn is_unsafe_css(css: &str) -> bool {
    let compact: String = css
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    ["expression(", "javascript:", "vbscript:", "behavior:", "@import", "-moz-binding"]
        .iter()
        .any(|needle| compact.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::plain("<p>plain</p>")]
    #[case::styled(r#"<p class="P1" style="color: red">x</p>"#)]
    #[case::safe_link(r#"<a href="https://example.com/">x</a>"#)]
    #[case::mailto(r#"<a href="mailto:a@example.com">x</a>"#)]
    #[case::relative(r#"<a href="doc.html#top">x</a>"#)]
    #[case::data_image(r#"<img src="data:image/png;base64,AAAA"/>"#)]
    fn test_safe_markup_kept(#[case] html: &str) {
        assert_eq!(filter_xss(html).unwrap(), html);
    }

    #[rstest]
    #[case::script("<p>ok</p><script>alert(1)</script>")]
    #[case::mixed_case("<p>ok</p><ScRiPt>alert(1)</ScRiPt>")]
    #[case::nested("<div><p>ok</p><script type=\"text/javascript\">document.cookie</script></div>")]
    #[case::in_head("<html><head><script src=\"x.js\"></script></head><body><p>ok</p></body></html>")]
    fn test_script_removed(#[case] html: &str) {
        let output = filter_xss(html).unwrap();
        assert!(!output.to_ascii_lowercase().contains("<script"), "{output}");
        assert!(!output.contains("alert(1)"));
        assert!(output.contains("<p>ok</p>"));
    }

    #[rstest]
    #[case::iframe(r#"<iframe src="https://evil.example"></iframe>"#)]
    #[case::object(r#"<object data="x.swf"><param name="a"/></object>"#)]
    #[case::embed(r#"<embed src="x.swf"/>"#)]
    #[case::refresh(r#"<meta http-equiv="refresh" content="0;url=https://evil.example"/>"#)]
    #[case::base(r#"<base href="https://evil.example/"/>"#)]
    #[case::form(r#"<form action="https://evil.example"><input name="a"/></form>"#)]
    fn test_dangerous_elements_removed(#[case] html: &str) {
        let output = filter_xss(&format!("<p>keep</p>{html}")).unwrap();
        assert_eq!(output, "<p>keep</p>");
    }

    #[rstest]
    #[case::event_handler(r#"<p onclick="steal()">x</p>"#, "onclick")]
    #[case::upper_event_handler(r#"<img src="a.png" ONERROR="steal()"/>"#, "steal")]
    #[case::javascript_href(r#"<a href="javascript:steal()">x</a>"#, "javascript")]
    #[case::spaced_scheme(r#"<a href=" java script:steal()">x</a>"#, "steal")]
    #[case::encoded_scheme(r#"<a href="jav&#x61;script:steal()">x</a>"#, "steal")]
    #[case::vbscript_src(r#"<img src="vbscript:msgbox(1)"/>"#, "vbscript")]
    #[case::data_html(r#"<a href="data:text/html,&lt;script&gt;">x</a>"#, "data:")]
    #[case::css_expression(r#"<p style="width: expression(alert(1))">x</p>"#, "expression")]
    #[case::css_url(r#"<p style="background: url(javascript:alert(1))">x</p>"#, "javascript")]
    #[case::named_colon(r#"<a href="javascript&colon;alert(1)">x</a>"#, "alert")]
    #[case::decimal_colon(r#"<a href="javascript&#58;alert(1)">x</a>"#, "alert")]
    #[case::hex_colon(r#"<a href="javascript&#x3a;alert(1)">x</a>"#, "alert")]
    #[case::unterminated_colon(r#"<a href="javascript&#58alert(1)">x</a>"#, "alert")]
    #[case::percent_scheme(r#"<a href="javascript%3Aalert(1)">x</a>"#, "alert")]
    #[case::unknown_scheme(r#"<a href="ms-its:steal.chm">x</a>"#, "steal")]
    #[case::data_image_link(r#"<a href="data:image/svg+xml,steal">x</a>"#, "steal")]
    fn test_dangerous_attributes_removed(#[case] html: &str, #[case] needle: &str) {
        let output = filter_xss(html).unwrap();
        assert!(!output.contains(needle), "{output}");
        assert!(output.contains('x') || output.starts_with("<img"));
    }

    #[rstest]
    #[case::relative_query(r#"<a href="view.php?a=1&amp;b=2">x</a>"#)]
    #[case::fragment(r##"<a href="#note1">x</a>"##)]
    #[case::path_with_colon(r#"<a href="docs/a:b.html">x</a>"#)]
    #[case::mixed_case_scheme(r#"<a href="HTTPS://example.com/">x</a>"#)]
    fn test_safe_urls_kept(#[case] html: &str) {
        assert_eq!(filter_xss(html).unwrap(), html);
    }

    #[rstest]
    #[case::animate(r#"<svg><a><animate attributeName="href" values="javascript:alert(1)"/><text>x</text></a></svg>"#)]
    #[case::set(r#"<svg><a><set attributeName="href" to="javascript:alert(1)"/><text>x</text></a></svg>"#)]
    #[case::animate_motion(r#"<svg><a><animateMotion attributeName="xlink:href" from="javascript:alert(1)"/><text>x</text></a></svg>"#)]
    fn test_svg_animation_removed(#[case] html: &str) {
        let output = filter_xss(html).unwrap();
        assert!(!output.contains("javascript"), "{output}");
        assert!(output.contains("<text>x</text>"), "{output}");
    }

    #[rstest]
    fn test_animated_url_values_stripped() {
        let output = filter_xss(
            r#"<svg><a><animateColor attributeName="HREF" values="javascript:alert(1)" dur="1s"/></a></svg>"#,
        )
        .unwrap();
        assert!(!output.contains("javascript"), "{output}");
        assert!(output.contains(r#"dur="1s""#), "{output}");
    }

    #[rstest]
    fn test_unsafe_style_block_emptied() {
        let output =
            filter_xss("<style>@import url(https://evil.example/x.css);</style><p>x</p>").unwrap();
        assert!(!output.contains("@import"));
        assert!(output.contains("<p>x</p>"));
    }

    #[rstest]
    fn test_safe_style_block_kept() {
        let html = "<style>.P1 { font-weight: bold; }</style><p class=\"P1\">x</p>";
        assert_eq!(filter_xss(html).unwrap(), html);
    }

    #[rstest]
    fn test_comments_removed() {
        let output = filter_xss("<p>a<!--[if IE]><script>x</script><![endif]-->b</p>").unwrap();
        assert_eq!(output, "<p>ab</p>");
    }
}
