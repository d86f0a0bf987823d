//! MIME type <-> file extension table
//!
//! A closed, explicit set. Nothing is sniffed from content; a type missing
//! from the table simply has no extension.

const TABLE: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("text/markdown", "md"),
    ("text/html", "html"),
    ("text/css", "css"),
    ("text/csv", "csv"),
    ("text/javascript", "js"),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("audio/mpeg", "mp3"),
    ("audio/wav", "wav"),
    ("video/mp4", "mp4"),
];

/// Extra spellings accepted when mapping an extension back to a type
const EXTENSION_ALIASES: &[(&str, &str)] = &[
    ("jpeg", "image/jpeg"),
    ("htm", "text/html"),
    ("markdown", "text/markdown"),
    ("mjs", "text/javascript"),
];

/// Preferred file extension for `mime_type`, or `""` if the table has none
pub fn mime_type_to_extension(mime_type: &str) -> &'static str {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(mime, _)| *mime == mime_type)
        .map(|(_, ext)| *ext)
        .unwrap_or("")
}

/// MIME type for a file extension (case-insensitive, without the dot)
pub fn extension_to_mime_type(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(mime, _)| *mime)
        .or_else(|| {
            EXTENSION_ALIASES
                .iter()
                .find(|(ext, _)| *ext == extension)
                .map(|(_, mime)| *mime)
        })
}
