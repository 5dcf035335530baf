//! Extension-based media type lookup for files registered by local path.

use std::path::Path;

const OCTET_STREAM: &str = "application/octet-stream";

/// Media type for a local file, `application/octet-stream` when unknown.
#[must_use]
pub fn media_type_for_path(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return OCTET_STREAM;
    };

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::media_type_for_path;

    #[test]
    fn known_extensions_resolve_case_insensitively() {
        assert_eq!(media_type_for_path(Path::new("photo.jpg")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("photo.JPEG")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("notes.md")), "text/markdown");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back_to_octet_stream() {
        assert_eq!(
            media_type_for_path(Path::new("archive.xyz")),
            "application/octet-stream"
        );
        assert_eq!(
            media_type_for_path(Path::new("no-extension")),
            "application/octet-stream"
        );
    }
}
