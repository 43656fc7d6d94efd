//! URL Utilities — absolute/relative URL composition, local-path
//! derivation, host/page split, cross-domain test, archive-existence check.
//!
//! Deliberately hand-rolled string splitting rather than a delegate to the
//! `url` crate's RFC 3986 parser: the distilled design specifies these as
//! small, specific algorithms (strip-scheme-then-split-on-slash, directory-
//! of-page resolution) and budgets them as one of the seven core
//! components, not a wrapper around a general URL type.

use std::path::{Path, PathBuf};

/// Maximum URL length accepted anywhere in the system (link records, the
/// extractor, the rewriter).
pub const HTTP_URL_MAX: usize = 1024;

/// Per-request URL context: the fields of `Request` (`SPEC_FULL.md` §4 data
/// model) that URL Utilities operates over.
#[derive(Debug, Clone)]
pub struct UrlContext {
    pub full_url: String,
    pub scheme: &'static str,
    pub host: String,
    pub page: String,
    pub primary_host: String,
    pub archive_root: PathBuf,
}

impl UrlContext {
    /// Build a context from a seed/current URL, deriving `host`/`page` from
    /// it and treating it as the crawl's primary host.
    #[must_use]
    pub fn from_url(url: &str, archive_root: PathBuf) -> Self {
        let host = parse_host(url);
        let page = parse_page(url);
        Self {
            full_url: url.to_string(),
            scheme: parse_scheme(url),
            primary_host: host.clone(),
            host,
            page,
            archive_root,
        }
    }

    /// Move this context to a new URL, keeping `primary_host` and
    /// `archive_root` fixed — used when the engine follows a link within
    /// the same crawl.
    pub fn retarget(&mut self, url: &str) {
        self.full_url = url.to_string();
        self.scheme = parse_scheme(url);
        self.host = parse_host(url);
        self.page = parse_page(url);
    }
}

/// The scheme a URL was fetched over — `"https"` if it starts with that
/// prefix, `"http"` otherwise (including for scheme-less/relative input,
/// which should never reach here as a `full_url`).
fn parse_scheme(url: &str) -> &'static str {
    if url.starts_with("https://") {
        "https"
    } else {
        "http"
    }
}

fn strip_scheme(url: &str) -> &str {
    if let Some(rest) = url.strip_prefix("https://") {
        rest
    } else if let Some(rest) = url.strip_prefix("http://") {
        rest
    } else {
        url
    }
}

/// Strip the scheme, then read up to the next `/` or end of string.
#[must_use]
pub fn parse_host(url: &str) -> String {
    let rest = strip_scheme(url);
    let end = rest.find('/').unwrap_or(rest.len());
    rest[..end].to_string()
}

/// Strip the scheme, strip a trailing `/`, then return the first `/`
/// onward, or `"/"` if there is none.
#[must_use]
pub fn parse_page(url: &str) -> String {
    let rest = strip_scheme(url);
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    match rest.find('/') {
        Some(idx) => rest[idx..].to_string(),
        None => "/".to_string(),
    }
}

/// Directory portion of a page path: everything up to and including the
/// last `/`, or `"/"` if the page has none.
fn directory_of(page: &str) -> &str {
    match page.rfind('/') {
        Some(idx) => &page[..=idx],
        None => "/",
    }
}

/// Resolve `relative` against `ctx` into an absolute `http(s)://` URL.
///
/// 1. absolute `http(s)://` URLs pass through unchanged
/// 2. `//host/...` acquires the caller's scheme (`ctx.scheme` — the scheme
///    `ctx.full_url` was itself fetched over, not always `https`)
/// 3. `/...` is resolved against `ctx.host`, same scheme
/// 4. anything else is resolved against the directory portion of `ctx.page`,
///    same scheme
#[must_use]
pub fn make_full_url(ctx: &UrlContext, relative: &str) -> Option<String> {
    if relative.is_empty() || relative.len() >= HTTP_URL_MAX {
        return None;
    }
    if relative.starts_with("http://") || relative.starts_with("https://") {
        return Some(relative.to_string());
    }
    let scheme = ctx.scheme;
    if let Some(rest) = relative.strip_prefix("//") {
        return Some(format!("{scheme}://{rest}"));
    }
    if let Some(rest) = relative.strip_prefix('/') {
        return Some(format!("{scheme}://{}/{}", ctx.host, rest));
    }
    let dir = directory_of(&ctx.page);
    let joined = format!("{dir}{relative}");
    let joined = normalize_dot_segments(&joined);
    Some(format!("{scheme}://{}{}", ctx.host, joined))
}

/// Collapse `./` and `../` segments the way a filesystem path join would;
/// links are frequently authored relative to the current page's directory.
fn normalize_dot_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    format!("/{}", out.join("/"))
}

/// Derive the local archive path for an absolute URL: `<root>/<host>/<path
/// with ? replaced by _>`, with a `.html` suffix appended when the path has
/// no extension. Pure for a fixed `ctx.archive_root` (invariant #6).
#[must_use]
pub fn make_local_url(ctx: &UrlContext, absolute: &str) -> Option<PathBuf> {
    if absolute.len() >= HTTP_URL_MAX {
        return None;
    }
    let host = parse_host(absolute);
    let mut page = parse_page(absolute).replace('?', "_");
    if page == "/" {
        page = "/index.html".to_string();
    }
    let needs_html = Path::new(&page)
        .extension()
        .is_none();
    if needs_html {
        page.push_str(".html");
    }
    let page = page.trim_start_matches('/');
    Some(ctx.archive_root.join(host).join(page))
}

/// Is `url`'s host different from `ctx.host`?
#[must_use]
pub fn is_xdomain(ctx: &UrlContext, url: &str) -> bool {
    parse_host(url) != ctx.host
}

/// Does the derived local path for `url` already exist on disk?
#[must_use]
pub fn local_archive_exists(ctx: &UrlContext, url: &str) -> bool {
    make_local_url(ctx, url).is_some_and(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(url: &str) -> UrlContext {
        UrlContext::from_url(url, PathBuf::from("/tmp/reaped"))
    }

    #[test]
    fn parse_host_strips_scheme_and_path() {
        assert_eq!(parse_host("http://t.test/a/b"), "t.test");
        assert_eq!(parse_host("https://t.test"), "t.test");
    }

    #[test]
    fn parse_page_defaults_to_root() {
        assert_eq!(parse_page("http://t.test"), "/");
        assert_eq!(parse_page("http://t.test/"), "/");
        assert_eq!(parse_page("http://t.test/a/b"), "/a/b");
    }

    #[test]
    fn host_and_page_round_trip_up_to_trailing_slash() {
        let url = "http://t.test/a/b";
        let recombined = format!("{}{}", parse_host(url), parse_page(url));
        assert_eq!(recombined, "t.test/a/b");
    }

    #[test]
    fn make_full_url_variants() {
        let c = ctx("http://t.test/dir/page.html");
        assert_eq!(
            make_full_url(&c, "https://other.test/x").as_deref(),
            Some("https://other.test/x")
        );
        // protocol-relative acquires the caller's own scheme (plain http
        // here), not a hardcoded https
        assert_eq!(
            make_full_url(&c, "//other.test/x").as_deref(),
            Some("http://other.test/x")
        );
        assert_eq!(
            make_full_url(&c, "/abs").as_deref(),
            Some("http://t.test/abs")
        );
        assert_eq!(
            make_full_url(&c, "rel.html").as_deref(),
            Some("http://t.test/dir/rel.html")
        );
    }

    #[test]
    fn make_full_url_preserves_https_scheme() {
        let c = ctx("https://t.test/dir/page.html");
        assert_eq!(
            make_full_url(&c, "//other.test/x").as_deref(),
            Some("https://other.test/x")
        );
        assert_eq!(
            make_full_url(&c, "/abs").as_deref(),
            Some("https://t.test/abs")
        );
    }

    #[test]
    fn make_full_url_resolves_dot_dot() {
        let c = ctx("http://t.test/a/b/page.html");
        assert_eq!(
            make_full_url(&c, "../c.html").as_deref(),
            Some("http://t.test/a/c.html")
        );
    }

    #[test]
    fn make_local_url_appends_html_and_escapes_query() {
        let c = ctx("http://t.test/");
        let p = make_local_url(&c, "http://t.test/a?x=1").unwrap();
        assert_eq!(p, PathBuf::from("/tmp/reaped/t.test/a_x=1.html"));
    }

    #[test]
    fn make_local_url_is_pure() {
        let c = ctx("http://t.test/");
        let a = make_local_url(&c, "http://t.test/a");
        let b = make_local_url(&c, "http://t.test/a");
        assert_eq!(a, b);
    }

    #[test]
    fn make_local_url_root_is_index_html() {
        let c = ctx("http://t.test/");
        let p = make_local_url(&c, "http://t.test/").unwrap();
        assert_eq!(p, PathBuf::from("/tmp/reaped/t.test/index.html"));
    }

    #[test]
    fn is_xdomain_detects_different_host() {
        let c = ctx("http://t.test/");
        assert!(!is_xdomain(&c, "http://t.test/other"));
        assert!(is_xdomain(&c, "http://other.test/other"));
    }
}
