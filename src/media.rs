//! Media extension and content-type tables
//!
//! One table shared by the asset resolver (serving local files) and the
//! upload tooling (PutObject headers), so both sides of the mirror agree on
//! what a key's content looks like.

/// Image file extensions handled by the upload tooling
pub const IMAGE_EXTS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".tiff", ".avif", ".ico",
];

/// Audio file extensions handled by the upload tooling
pub const AUDIO_EXTS: &[&str] = &[".mp3", ".ogg", ".wav", ".m4a", ".flac", ".aac", ".opus"];

/// Default Cache-Control for mirrored game assets (content-hash friendly)
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Cache-Control for entry HTML, which is republished in place
pub const CACHE_CONTROL_HTML: &str = "public, max-age=60";

/// Returns the lowercased extension of a path or key, dot included
pub fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let dot = name.rfind('.')?;
    Some(name[dot..].to_ascii_lowercase())
}

/// True when the path names an image asset
pub fn is_image(path: &str) -> bool {
    matches!(extension_of(path), Some(ext) if IMAGE_EXTS.contains(&ext.as_str()))
}

/// True when the path names an audio asset
pub fn is_audio(path: &str) -> bool {
    matches!(extension_of(path), Some(ext) if AUDIO_EXTS.contains(&ext.as_str()))
}

/// Content-Type for a path or object key, derived from its extension
pub fn content_type_for(path: &str) -> &'static str {
    let ext = match extension_of(path) {
        Some(ext) => ext,
        None => return "application/octet-stream",
    };

    match ext.as_str() {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".svg" => "image/svg+xml",
        ".bmp" => "image/bmp",
        ".tiff" => "image/tiff",
        ".avif" => "image/avif",
        ".ico" => "image/x-icon",
        ".mp3" => "audio/mpeg",
        ".ogg" => "audio/ogg",
        ".wav" => "audio/wav",
        ".m4a" => "audio/mp4",
        ".flac" => "audio/flac",
        ".aac" => "audio/aac",
        ".opus" => "audio/opus",
        ".mp4" => "video/mp4",
        ".webm" => "video/webm",
        ".json" => "application/json; charset=utf-8",
        ".js" => "application/javascript; charset=utf-8",
        ".css" => "text/css; charset=utf-8",
        ".html" => "text/html; charset=utf-8",
        ".txt" => "text/plain; charset=utf-8",
        ".xml" => "application/xml; charset=utf-8",
        ".wasm" => "application/wasm",
        ".ttf" => "font/ttf",
        ".otf" => "font/otf",
        ".woff" => "font/woff",
        ".woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Cache-Control for an object key: entry HTML is short-lived, everything
/// else is treated as immutable
pub fn cache_control_for(key: &str) -> &'static str {
    if key.ends_with("index.html") {
        CACHE_CONTROL_HTML
    } else {
        CACHE_CONTROL_IMMUTABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_and_dot_prefixed() {
        assert_eq!(extension_of("games/mouseHit/JS/Main.JS").as_deref(), Some(".js"));
        assert_eq!(extension_of("no-extension"), None);
        // A dot in a directory name is not an extension
        assert_eq!(extension_of("games/v1.2/readme"), None);
    }

    #[test]
    fn kind_checks_follow_the_tables() {
        assert!(is_image("cover.PNG"));
        assert!(is_audio("theme.ogg"));
        assert!(!is_image("main.js"));
        assert!(!is_audio("cover.png"));
    }

    #[test]
    fn html_gets_the_short_cache_control() {
        assert_eq!(cache_control_for("games/bloodmoney/index.html"), CACHE_CONTROL_HTML);
        assert_eq!(
            cache_control_for("games/bloodmoney/img/title.png"),
            CACHE_CONTROL_IMMUTABLE
        );
    }
}
