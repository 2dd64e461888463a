//! Deterministic local file and directory names for URLs.

use mime::Mime;
use url::Url;

use crate::resolver::last_segment;

/// Suffix of the directory that holds a page's assets.
pub const ASSETS_DIR_SUFFIX: &str = "_files";
pub const PAGE_SUFFIX: &str = ".html";

/// Derive a local name from `url`.
///
/// The host (with a non-default port) and path are flattened by replacing
/// every non-alphanumeric character with `-`. The query and fragment are
/// dropped. The ending is chosen in this order:
///
/// * `suffix`, verbatim. The path's own extension is dropped first.
/// * the extension implied by `content_type`. The full path is kept.
/// * the path's own extension, or `.html` when it has none.
///
/// Distinct URLs can map to the same name (`a.b` and `a-b`).
pub fn name_for(url: &Url, content_type: Option<&str>, suffix: Option<&str>) -> String {
    name_for_port(url, None, content_type, suffix)
}

/// Like [`name_for`], but `port` overrides the port of `url`.
///
/// Used for the page itself, whose name keeps a default port (`:80` on
/// `http`) when the user wrote one.
pub fn name_for_port(
    url: &Url,
    port: Option<u16>,
    content_type: Option<&str>,
    suffix: Option<&str>,
) -> String {
    let mut location = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = port.or(url.port()) {
        location.push(':');
        location.push_str(&port.to_string());
    }
    let path = url.path().trim_end_matches('/');
    let (stem, path_extension) = split_extension(path);

    if let Some(suffix) = suffix {
        return format!("{}{}", hyphenate(&format!("{location}{stem}")), suffix);
    }

    if let Some(extension) = content_type.and_then(extension_for_content_type) {
        return format!("{}.{}", hyphenate(&format!("{location}{path}")), extension);
    }

    let extension = path_extension.unwrap_or("html");
    format!("{}.{}", hyphenate(&format!("{location}{stem}")), extension)
}

/// File extension (without the dot) for a `Content-Type` header value.
///
/// Parameters such as `charset` are ignored. Returns `None` for values that
/// do not parse or carry no useful type (`application/octet-stream`).
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let mime: Mime = content_type.trim().parse().ok()?;
    let subtype = mime.subtype().as_str();

    match subtype {
        "javascript" | "x-javascript" | "ecmascript" => return Some("js".to_string()),
        "plain" => return Some("txt".to_string()),
        "x-icon" | "vnd.microsoft.icon" => return Some("ico".to_string()),
        "octet-stream" | "*" => return None,
        _ => {}
    }

    let known = mime_guess::get_mime_extensions_str(mime.essence_str());
    let literal = subtype.chars().all(|c| c.is_ascii_alphanumeric());
    if literal && known.map_or(true, |exts| exts.iter().any(|ext| *ext == subtype)) {
        return Some(subtype.to_string());
    }

    known
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}

fn hyphenate(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Split the extension off the last path segment.
fn split_extension(path: &str) -> (&str, Option<&str>) {
    let segment = last_segment(path);
    let Some(dot) = segment.rfind('.') else {
        return (path, None);
    };

    let extension = &segment[dot + 1..];
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return (path, None);
    }

    let split_at = path.len() - segment.len() + dot;
    (&path[..split_at], Some(extension))
}
