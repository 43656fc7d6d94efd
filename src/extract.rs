//! Link Extractor and Rewriter — a single substring-table sweep over a
//! fetched page's bytes, used twice: once to offer candidate links to the
//! filling frontier, once (after the generation advances) to splice each
//! surviving link into its local-mirror path (`SPEC_FULL.md` §5.F).
//!
//! Table-driven rather than DOM-based: the design calls for scanning fixed
//! attribute prefixes (`href="`, `src='`, ...) rather than building a parse
//! tree, so this never reaches for `html5ever`/`scraper`.

use crate::buf::Buf;
use crate::frontier::{self, Frontier};
use crate::urlutil::{self, UrlContext, HTTP_URL_MAX};

/// One attribute prefix this crawler recognises, paired with the delimiter
/// that closes it.
struct UrlType {
    prefix: &'static str,
    delim: u8,
}

const URL_TYPES: &[UrlType] = &[
    UrlType { prefix: "href=\"", delim: b'"' },
    UrlType { prefix: "href='", delim: b'\'' },
    UrlType { prefix: "src=\"", delim: b'"' },
    UrlType { prefix: "src='", delim: b'\'' },
];

/// One match of a [`UrlType`] within a page's bytes: the byte span of the
/// URL text itself (excluding the prefix and delimiter).
struct Span {
    start: usize,
    end: usize,
}

/// Find every occurrence of every [`UrlType`] prefix, returning the span of
/// the URL text that follows each one up to its delimiter. A span is
/// dropped (not returned) if it is empty or at/over `HTTP_URL_MAX` — both
/// the extractor and the rewriter treat such spans as untouchable.
fn scan(body: &[u8]) -> Vec<Span> {
    let mut spans = Vec::new();
    for ty in URL_TYPES {
        let needle = ty.prefix.as_bytes();
        let mut from = 0;
        while let Some(pos) = find(body, needle, from) {
            let url_start = pos + needle.len();
            let Some(delim_pos) = body[url_start..].iter().position(|&b| b == ty.delim) else {
                from = pos + needle.len();
                continue;
            };
            let url_end = url_start + delim_pos;
            from = url_end + 1;
            let len = url_end - url_start;
            if len == 0 || len >= HTTP_URL_MAX {
                continue;
            }
            spans.push(Span {
                start: url_start,
                end: url_end,
            });
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Sweep a fetched page for links, resolve each to an absolute URL, and
/// offer it to the frontier pair via [`frontier::accept`]. Links that fail
/// `accept` are silently dropped, same as a disallowed or duplicate link
/// would be.
pub fn extract_links(
    ctx: &UrlContext,
    body: &[u8],
    filling: &Frontier,
    draining: &Frontier,
    allow_xdomain: bool,
) {
    for span in scan(body) {
        let raw = match std::str::from_utf8(&body[span.start..span.end]) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let Some(absolute) = urlutil::make_full_url(ctx, raw) else {
            continue;
        };
        let xdomain = urlutil::is_xdomain(ctx, &absolute);
        let archived = urlutil::local_archive_exists(ctx, &absolute);
        if frontier::accept(filling, draining, allow_xdomain, xdomain, archived, &absolute) {
            filling.insert(&absolute);
        }
    }
}

/// Rewrite every recognised link in `buf` in place, replacing each relative
/// or same-mirror URL with the path to its local archive copy. Absolute
/// `http(s)://` URLs that resolve off-mirror, and any span at/over
/// `HTTP_URL_MAX`, are left untouched.
///
/// Rewriting is splice-based (`collapse` the old span, `shift` in the
/// replacement) rather than building a new buffer, so spans found after the
/// first rewritten one must be re-scanned: each splice changes every later
/// offset by the same fixed delta, so this re-scans from scratch per splice
/// rather than trying to track them, which keeps the offset-drift invariant
/// trivially true instead of merely checked.
pub fn rewrite_links(ctx: &UrlContext, buf: &mut Buf) {
    loop {
        let snapshot = buf.as_slice().to_vec();
        let spans = scan(&snapshot);
        let mut rewrote = false;
        for span in spans {
            let Ok(raw) = std::str::from_utf8(&snapshot[span.start..span.end]) else {
                continue;
            };
            let Some(absolute) = urlutil::make_full_url(ctx, raw) else {
                continue;
            };
            let Some(local) = urlutil::make_local_url(ctx, &absolute) else {
                continue;
            };
            let replacement = local.to_string_lossy().into_owned();
            if replacement.as_bytes() == &snapshot[span.start..span.end] {
                continue;
            }
            buf.collapse(span.start, span.end - span.start);
            buf.shift(span.start, replacement.as_bytes());
            rewrote = true;
            break;
        }
        if !rewrote {
            break;
        }
    }
}
