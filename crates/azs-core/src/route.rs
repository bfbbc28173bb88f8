//! URL helpers for classification and route tracking
//!
//! These functions avoid allocations and work directly on string slices.

// =============================================================================
// Scheme / Host Extraction
// =============================================================================

/// Get the position after "://".
#[inline]
fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 || !bytes[..colon_pos].iter().all(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'-' || *b == b'.') {
        return None;
    }

    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

/// Byte range of the authority section (after the scheme, before the path).
#[inline]
fn authority_range(url: &str) -> Option<(usize, usize)> {
    let start = get_scheme_end(url)?;
    let end = url[start..]
        .find(['/', '?', '#'])
        .map(|i| start + i)
        .unwrap_or(url.len());
    Some((start, end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL, without userinfo or port.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (start, end) = authority_range(url)?;
    let mut authority = &url[start..end];

    if let Some(at_pos) = authority.rfind('@') {
        authority = &authority[at_pos + 1..];
    }

    // IPv6 literal keeps its colons
    if authority.starts_with('[') {
        return authority.find(']').map(|i| &authority[..=i]);
    }

    if let Some(colon) = authority.find(':') {
        authority = &authority[..colon];
    }

    if authority.is_empty() {
        None
    } else {
        Some(authority)
    }
}

// =============================================================================
// Path Extraction
// =============================================================================

/// Extract the path portion of a URL.
///
/// Bare paths (`/watch?v=1`) are accepted as well so that values read from
/// `location.pathname` and full `location.href` strings go through one helper.
#[inline]
pub fn extract_path(url: &str) -> &str {
    let rest = match authority_range(url) {
        Some((_, end)) => &url[end..],
        None => url,
    };

    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let path = &rest[..end];

    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// First non-empty path segment. `""` for the root path.
#[inline]
pub fn section(path: &str) -> &str {
    path.split('/').find(|seg| !seg.is_empty()).unwrap_or("")
}

/// Section of a full URL or bare path.
#[inline]
pub fn url_section(url: &str) -> &str {
    section(extract_path(url))
}
