//! URL canonicalization, relative reference resolution and same-site checks.
//!
//! Everything here works on [`Url`] values that always carry a scheme and a
//! host. Inputs that cannot be anchored to such a URL are rejected with
//! [`MirrorError::InvalidUrl`].

use url::{Position, Url};

use crate::error::{MirrorError, Result};

pub const DEFAULT_SCHEME: &str = "https";

/// Normalize `input` with the default scheme and no parent.
///
/// ```
/// let url = page_loader::resolver::normalize("example.com/path").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/path/");
/// ```
pub fn normalize(input: &str) -> Result<Url> {
    normalize_with(input, DEFAULT_SCHEME, None)
}

/// Canonicalize `input`.
///
/// With a `parent`, scheme-less input is resolved against it. Without one,
/// `scheme_default` is prepended. Either way the result gets the
/// trailing-slash rule applied (see [`with_trailing_slash`]).
pub fn normalize_with(input: &str, scheme_default: &str, parent: Option<&Url>) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MirrorError::invalid_url(input, "empty URL"));
    }

    let url = match (parent, scheme_of(input)) {
        (_, Some(_)) => parse_absolute(input)?,
        (Some(parent), None) => resolve(input, parent)?,
        (None, None) => match input.strip_prefix("//") {
            Some(rest) => parse_absolute(&format!("{scheme_default}://{rest}"))?,
            None => parse_absolute(&format!("{scheme_default}://{input}"))?,
        },
    };

    Ok(with_trailing_slash(url))
}

/// Resolve `reference` as it appeared in a document served from `parent`.
///
/// Every result goes through the trailing-slash rule, so `/courses`,
/// `courses` and `https://a.com/courses` all name `https://a.com/courses/`.
pub fn resolve(reference: &str, parent: &Url) -> Result<Url> {
    resolve_reference(reference.trim(), &with_trailing_slash(parent.clone()))
        .map(with_trailing_slash)
}

fn resolve_reference(reference: &str, parent: &Url) -> Result<Url> {
    if let Some(rest) = reference.strip_prefix("//") {
        return parse_absolute(&format!("{}://{}", parent.scheme(), rest));
    }

    if reference.starts_with('/') {
        return parse_absolute(&format!("{}{}", origin(parent), reference));
    }

    if scheme_of(reference).is_some() {
        return parse_absolute(reference);
    }

    // A file-like parent resolves against the directory that contains it.
    let mut base = base_directory(parent.path()).to_string();
    let mut rest = reference;
    loop {
        if let Some(tail) = rest.strip_prefix("../") {
            base = parent_directory(&base);
            rest = tail;
        } else if rest == ".." {
            base = parent_directory(&base);
            rest = "";
        } else if let Some(tail) = rest.strip_prefix("./") {
            rest = tail;
        } else if rest == "." {
            rest = "";
        } else {
            break;
        }
    }

    parse_absolute(&format!("{}{}{}", origin(parent), base, rest))
}

/// The port spelled out in `input`, even when it is the scheme's default.
///
/// [`Url`] forgets `:80` on `http` and `:443` on `https`, but the saved file
/// name still carries whatever port the user typed.
pub fn written_port(input: &str) -> Option<u16> {
    let input = input.trim();
    let rest = match scheme_of(input) {
        Some(scheme) => input[scheme.len() + 1..].strip_prefix("//")?,
        None => input.strip_prefix("//").unwrap_or(input),
    };
    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or(rest);
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    let port = match host_port.rsplit_once(']') {
        Some((_, tail)) => tail.strip_prefix(':')?,
        None => host_port.rsplit_once(':')?.1,
    };
    port.parse().ok()
}

/// Whether `candidate` (as written in markup) belongs to the site of
/// `reference`: the same host, or a subdomain of it.
///
/// Path-only references are always same-site. The host test requires a
/// label boundary, so `badhost.com` is not a subdomain of `host.com`.
pub fn is_same_site(reference: &Url, candidate: &str) -> bool {
    let candidate = candidate.trim();

    let parsed = if let Some(rest) = candidate.strip_prefix("//") {
        Url::parse(&format!("{}://{}", reference.scheme(), rest))
    } else if scheme_of(candidate).is_none() {
        return true;
    } else {
        Url::parse(candidate)
    };

    match (parsed, reference.host_str()) {
        (Ok(candidate), Some(site)) => candidate
            .host_str()
            .is_some_and(|host| host_within(host, site)),
        _ => false,
    }
}

/// Whether `url` can be fetched over HTTP.
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Append `/` to paths whose last segment does not look like a file.
pub fn with_trailing_slash(mut url: Url) -> Url {
    let path = url.path();
    if !path.ends_with('/') && !last_segment(path).contains('.') {
        let path = format!("{path}/");
        url.set_path(&path);
    }
    url
}

pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The scheme of `input`, if it has one. `host:8080/x` has none: a digit
/// right after the colon marks a port.
fn scheme_of(input: &str) -> Option<&str> {
    let (scheme, rest) = input.split_once(':')?;
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid || rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(scheme)
}

fn parse_absolute(input: &str) -> Result<Url> {
    let url = Url::parse(input).map_err(|e| MirrorError::invalid_url(input, e))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(MirrorError::invalid_url(input, "missing host")),
    }
}

fn origin(url: &Url) -> &str {
    &url[..Position::BeforePath]
}

fn base_directory(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    }
}

fn parent_directory(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => "/".to_string(),
    }
}

fn host_within(host: &str, site: &str) -> bool {
    host == site
        || host
            .strip_suffix(site)
            .is_some_and(|label| label.ends_with('.'))
}
