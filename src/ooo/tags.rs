//! Tag substitution used when no stylesheet engine is configured.

/// Ordered `(pattern, replacement)` pairs. Applied one after another over
/// the whole document, so a pattern must come before any shorter pattern
/// that is a prefix of it.
pub const TAG_MAP: &[(&str, &str)] = &[
    ("table:number-columns-spanned=", "colspan="),
    ("table:table-cell", "td"),
    ("table:table-row", r##"tr bgcolor="#cccccc""##),
    (
        "table:table",
        r#"table border="0" cellspacing="1" cellpadding="0" "#,
    ),
    ("text:p", "p"),
];

/// Rewrites OpenDocument tag names in `content` to rough HTML equivalents.
///
/// Styles and metadata are not consulted.
pub fn substitute(content: &str) -> String {
    TAG_MAP
        .iter()
        .fold(content.to_string(), |acc, (pattern, replacement)| {
            acc.replace(pattern, replacement)
        })
}
