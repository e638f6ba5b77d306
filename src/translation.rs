//! Message translation for the `mime_viewer` text domain.
//!
//! Catalogs are compiled gettext `.mo` files under
//! `<locale dir>/<lang>/LC_MESSAGES/mime_viewer.mo`. The process-wide
//! catalog is loaded on first use and never reloaded.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gettext::Catalog;

pub const DOMAIN: &str = "mime_viewer";

static GLOBAL: OnceLock<Translation> = OnceLock::new();

/// Returns the translation of `message`, or `message` itself.
pub fn t(message: &str) -> &str {
    Translation::global().t(message)
}

/// Returns the plural-aware translation for `n` items.
pub fn ngettext<'a>(singular: &'a str, plural: &'a str, n: u64) -> &'a str {
    Translation::global().ngettext(singular, plural, n)
}

/// Directory holding the per-language catalogs.
pub fn locale_dir() -> PathBuf {
    match option_env!("MIME_VIEWER_DATA_DIR") {
        Some(data_dir) => Path::new(data_dir).join("locale"),
        None => Path::new(env!("CARGO_MANIFEST_DIR")).join("locale"),
    }
}

pub struct Translation {
    catalog: Option<Catalog>,
}

impl Translation {
    pub fn global() -> &'static Translation {
        GLOBAL.get_or_init(|| {
            let languages = languages_from_env();
            let translation = Self::load(&locale_dir(), &languages);
            if translation.catalog.is_none() {
                log::debug!("no {DOMAIN} catalog for {languages:?}, using untranslated messages");
            }
            translation
        })
    }

    /// A translation that returns every message unchanged.
    pub fn untranslated() -> Self {
        Self { catalog: None }
    }

    /// Loads the catalog for the first language in `languages` that has one.
    pub fn load(locale_dir: &Path, languages: &[String]) -> Self {
        for language in languages {
            let path = locale_dir
                .join(language)
                .join("LC_MESSAGES")
                .join(format!("{DOMAIN}.mo"));
            let Ok(file) = File::open(&path) else {
                continue;
            };
            match Catalog::parse(BufReader::new(file)) {
                Ok(catalog) => {
                    log::debug!("loaded catalog {}", path.display());
                    return Self {
                        catalog: Some(catalog),
                    };
                }
                Err(e) => log::warn!("ignoring broken catalog {}: {e}", path.display()),
            }
        }
        Self::untranslated()
    }

    pub fn t<'a>(&'a self, message: &'a str) -> &'a str {
        match &self.catalog {
            Some(catalog) => catalog.gettext(message),
            None => message,
        }
    }

    pub fn ngettext<'a>(&'a self, singular: &'a str, plural: &'a str, n: u64) -> &'a str {
        match &self.catalog {
            Some(catalog) => catalog.ngettext(singular, plural, n),
            None if n == 1 => singular,
            None => plural,
        }
    }
}

fn languages_from_env() -> Vec<String> {
    let vars = ["LANGUAGE", "LC_ALL", "LC_MESSAGES", "LANG"];
    let Some(value) = vars
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.is_empty())
    else {
        return Vec::new();
    };
    value.split(':').flat_map(language_candidates).collect()
}

/// `de_DE.UTF-8@euro` → `["de_DE", "de"]`. `C` and `POSIX` yield nothing.
fn language_candidates(locale: &str) -> Vec<String> {
    let base = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return Vec::new();
    }
    let mut candidates = vec![base.to_string()];
    if let Some((language, _)) = base.split_once('_') {
        candidates.push(language.to_string());
    }
    candidates
}
