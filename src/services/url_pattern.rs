//! URL classification for YouTube tabs.
//!
//! Match patterns follow the extension format: `<scheme>://<host>/<path>`
//! where scheme may be `*`, host may start with `*.` and path is a glob.

/// Every YouTube watch page on the main site.
pub const WATCH_PAGE_PATTERN: &str = "*://www.youtube.com/watch*";

/// Every page on any YouTube host, used for content-script injection.
pub const YOUTUBE_PATTERN: &str = "*://*.youtube.com/*";

/// Splits `scheme://host/path?query` into (scheme, host, path-and-query).
fn split_url(url: &str) -> Option<(&str, &str, &str)> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme != "http" && scheme != "https" {
        return None;
    }
    match rest.find(['/', '?', '#']) {
        Some(i) => Some((scheme, &rest[..i], &rest[i..])),
        None => Some((scheme, rest, "/")),
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Check if a URL matches a match pattern.
/// Supports patterns like `*://*.youtube.com/*`, `https://www.youtube.com/watch*`, `<all_urls>`.
pub fn url_matches_pattern(url: &str, pattern: &str) -> bool {
    let Some((url_scheme, url_host, url_path)) = split_url(url) else {
        return false;
    };
    if pattern == "<all_urls>" {
        return true;
    }

    let Some((scheme_pat, rest)) = pattern.split_once("://") else {
        return false;
    };
    if scheme_pat != "*" && scheme_pat != url_scheme {
        return false;
    }

    let (host_pat, path_pat) = match rest.split_once('/') {
        Some((h, p)) => (h, format!("/{}", p)),
        None => (rest, "/*".to_string()),
    };

    if host_pat != "*" {
        if let Some(domain) = host_pat.strip_prefix("*.") {
            if !host_matches(url_host, domain) {
                return false;
            }
        } else if host_pat != url_host {
            return false;
        }
    }

    simple_glob_match(&path_pat, url_path)
}

/// `*` matches any run of characters; everything else is literal.
fn simple_glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "/*" || pattern == "*" {
        return true;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let mut pos = 0;
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == last {
            return text.len() >= pos + part.len() && text.ends_with(part);
        }
        match text[pos..].find(part) {
            Some(idx) => {
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            }
            None => return false,
        }
    }
    true
}

/// Value of the `v` query parameter, if non-empty.
pub fn video_id(url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "v")
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

/// Whether the URL is on any YouTube host.
pub fn is_youtube_url(url: &str) -> bool {
    split_url(url)
        .map(|(_, host, _)| host_matches(host, "youtube.com"))
        .unwrap_or(false)
}

/// Whether the URL is a watch page: YouTube host, path `/watch`, non-empty `v`.
pub fn is_watch_url(url: &str) -> bool {
    let Some((_, host, path)) = split_url(url) else {
        return false;
    };
    let path_only = path.split(['?', '#']).next().unwrap_or_default();
    host_matches(host, "youtube.com") && path_only == "/watch" && video_id(url).is_some()
}
