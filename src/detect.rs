use std::io::{Cursor, Read};
use std::path::Path;

const OASIS_PREFIX: &str = "application/vnd.oasis.opendocument.";
const SUN_PREFIX: &str = "application/vnd.sun.xml.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdfKind {
    Text,
    Spreadsheet,
    Presentation,
    Drawing,
    Chart,
    Formula,
    Image,
    TextMaster,
    TextTemplate,
    SpreadsheetTemplate,
    PresentationTemplate,
    DrawingTemplate,
    /// StarOffice / OpenOffice.org 1.x formats.
    LegacyWriter,
    LegacyCalc,
    LegacyImpress,
    LegacyDraw,
}

impl OdfKind {
    pub fn detect(filename: Option<&str>, bytes: &[u8]) -> Option<Self> {
        Self::from_magic_bytes(bytes).or_else(|| filename.and_then(Self::from_extension))
    }

    pub fn from_extension(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;

        match ext.as_str() {
            "odt" => Some(Self::Text),
            "ods" => Some(Self::Spreadsheet),
            "odp" => Some(Self::Presentation),
            "odg" => Some(Self::Drawing),
            "odc" => Some(Self::Chart),
            "odf" => Some(Self::Formula),
            "odi" => Some(Self::Image),
            "odm" => Some(Self::TextMaster),
            "ott" => Some(Self::TextTemplate),
            "ots" => Some(Self::SpreadsheetTemplate),
            "otp" => Some(Self::PresentationTemplate),
            "otg" => Some(Self::DrawingTemplate),
            "sxw" => Some(Self::LegacyWriter),
            "sxc" => Some(Self::LegacyCalc),
            "sxi" => Some(Self::LegacyImpress),
            "sxd" => Some(Self::LegacyDraw),
            _ => None,
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let mime_type = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if let Some(sub) = mime_type.strip_prefix(OASIS_PREFIX) {
            return match sub {
                "text" => Some(Self::Text),
                "spreadsheet" => Some(Self::Spreadsheet),
                "presentation" => Some(Self::Presentation),
                "graphics" => Some(Self::Drawing),
                "chart" => Some(Self::Chart),
                "formula" => Some(Self::Formula),
                "image" => Some(Self::Image),
                "text-master" => Some(Self::TextMaster),
                "text-template" => Some(Self::TextTemplate),
                "spreadsheet-template" => Some(Self::SpreadsheetTemplate),
                "presentation-template" => Some(Self::PresentationTemplate),
                "graphics-template" => Some(Self::DrawingTemplate),
                _ => None,
            };
        }
        match mime_type.strip_prefix(SUN_PREFIX)? {
            "writer" => Some(Self::LegacyWriter),
            "calc" => Some(Self::LegacyCalc),
            "impress" => Some(Self::LegacyImpress),
            "draw" => Some(Self::LegacyDraw),
            _ => None,
        }
    }

    /// Reads the `mimetype` member that OpenDocument packages store first.
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        // ZIP local file header: PK\x03\x04
        if !bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return None;
        }

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
        let mut entry = archive.by_name("mimetype").ok()?;
        let mut mime_type = String::new();
        entry.by_ref().take(128).read_to_string(&mut mime_type).ok()?;
        Self::from_mime_type(&mime_type)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Text => "application/vnd.oasis.opendocument.text",
            Self::Spreadsheet => "application/vnd.oasis.opendocument.spreadsheet",
            Self::Presentation => "application/vnd.oasis.opendocument.presentation",
            Self::Drawing => "application/vnd.oasis.opendocument.graphics",
            Self::Chart => "application/vnd.oasis.opendocument.chart",
            Self::Formula => "application/vnd.oasis.opendocument.formula",
            Self::Image => "application/vnd.oasis.opendocument.image",
            Self::TextMaster => "application/vnd.oasis.opendocument.text-master",
            Self::TextTemplate => "application/vnd.oasis.opendocument.text-template",
            Self::SpreadsheetTemplate => "application/vnd.oasis.opendocument.spreadsheet-template",
            Self::PresentationTemplate => "application/vnd.oasis.opendocument.presentation-template",
            Self::DrawingTemplate => "application/vnd.oasis.opendocument.graphics-template",
            Self::LegacyWriter => "application/vnd.sun.xml.writer",
            Self::LegacyCalc => "application/vnd.sun.xml.calc",
            Self::LegacyImpress => "application/vnd.sun.xml.impress",
            Self::LegacyDraw => "application/vnd.sun.xml.draw",
        }
    }
}

impl std::fmt::Display for OdfKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text document"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
            Self::Presentation => write!(f, "presentation"),
            Self::Drawing => write!(f, "drawing"),
            Self::Chart => write!(f, "chart"),
            Self::Formula => write!(f, "formula"),
            Self::Image => write!(f, "image"),
            Self::TextMaster => write!(f, "master document"),
            Self::TextTemplate => write!(f, "text template"),
            Self::SpreadsheetTemplate => write!(f, "spreadsheet template"),
            Self::PresentationTemplate => write!(f, "presentation template"),
            Self::DrawingTemplate => write!(f, "drawing template"),
            Self::LegacyWriter => write!(f, "StarOffice Writer document"),
            Self::LegacyCalc => write!(f, "StarOffice Calc spreadsheet"),
            Self::LegacyImpress => write!(f, "StarOffice Impress presentation"),
            Self::LegacyDraw => write!(f, "StarOffice Draw drawing"),
        }
    }
}
