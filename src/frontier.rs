//! URL Frontier — two binary-search trees of link records, one `DRAINING`,
//! one `FILLING`, atop the Arena Cache (`SPEC_FULL.md` §5.B).
//!
//! The BST is unbalanced, keyed on byte-lexicographic URL, built over
//! `arena::Idx` edges rather than raw pointers — see `arena.rs` for why that
//! eliminates the "hole patching" subtlety entirely. Parent back-references
//! from the original design are dropped per the accepted design-note
//! decision (`SPEC_FULL.md` §8.3 lists it as resolved): they existed only to
//! support a post-order teardown walk, and teardown here is "drop the old
//! generation's arena, make a fresh one."

use crate::arena::{Arena, Idx};
use crate::urlutil::HTTP_URL_MAX;
use std::cmp::Ordering;

/// A fixed set of substrings that disqualify a candidate URL outright,
/// regardless of host policy.
const DISALLOWED_SUBSTRINGS: &[&str] = &["javascript:", "data:image", ".exe", ".dll", "cgi-"];

/// Above this many queued records, the filling frontier stops accepting new
/// links for the remainder of the *generation* (open question #1 in
/// `SPEC_FULL.md` §8: the gate persists across URLs within a generation, it
/// does not reset per URL).
pub const NR_LINKS_THRESHOLD: usize = 50_000;

/// A queued link, arena-allocated; `left`/`right` are arena-relative BST
/// edges.
#[derive(Debug)]
struct LinkRecord {
    url: String,
    left: Option<Idx>,
    right: Option<Idx>,
    #[allow(dead_code)] // carried for parity with the data model; not yet read anywhere
    nr_requests: u32,
}

/// One side of the frontier pair: an arena of link records plus the root of
/// the BST built over them.
pub struct Frontier {
    cache: Arena<LinkRecord>,
    root: std::sync::Mutex<Option<Idx>>,
}

impl Frontier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Arena::new(1024),
            root: std::sync::Mutex::new(None),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.nr_used()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Is `url` already present in this frontier's tree? Checked under the
    /// arena's own lock, as the design requires ("the BST walks themselves
    /// are done under the lock because growth may occur").
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        let root = *self.root.lock().expect("frontier root mutex poisoned");
        let Some(mut cursor) = root else {
            return false;
        };
        loop {
            let (cmp, left, right) = self
                .cache
                .with(cursor, |rec| (rec.url.as_str().cmp(url), rec.left, rec.right));
            match cmp {
                Ordering::Equal => return true,
                Ordering::Greater => match left {
                    Some(next) => cursor = next,
                    None => return false,
                },
                Ordering::Less => match right {
                    Some(next) => cursor = next,
                    None => return false,
                },
            }
        }
    }

    /// Insert `url`, rejecting exact duplicates (invariant #2: no two live
    /// records in one frontier share a URL). Returns `true` if inserted.
    ///
    /// Empty URLs are never inserted (open question #3, resolved): the
    /// check happens before any arena interaction, so `accept`'s downstream
    /// BST search never has to special-case them.
    pub fn insert(&self, url: &str) -> bool {
        if url.is_empty() || url.len() >= HTTP_URL_MAX {
            return false;
        }
        let mut root = self.root.lock().expect("frontier root mutex poisoned");
        let Some(root_idx) = *root else {
            let idx = self.cache.alloc(LinkRecord {
                url: url.to_string(),
                left: None,
                right: None,
                nr_requests: 0,
            });
            *root = Some(idx);
            return true;
        };

        let mut cursor = root_idx;
        loop {
            let (cmp, left, right) = self
                .cache
                .with(cursor, |rec| (rec.url.as_str().cmp(url), rec.left, rec.right));
            match cmp {
                Ordering::Equal => return false,
                Ordering::Greater => match left {
                    Some(next) => cursor = next,
                    None => {
                        let idx = self.cache.alloc(LinkRecord {
                            url: url.to_string(),
                            left: None,
                            right: None,
                            nr_requests: 0,
                        });
                        self.cache.with_mut(cursor, |rec| rec.left = Some(idx));
                        return true;
                    }
                },
                Ordering::Less => match right {
                    Some(next) => cursor = next,
                    None => {
                        let idx = self.cache.alloc(LinkRecord {
                            url: url.to_string(),
                            left: None,
                            right: None,
                            nr_requests: 0,
                        });
                        self.cache.with_mut(cursor, |rec| rec.right = Some(idx));
                        return true;
                    }
                },
            }
        }
    }

    /// Visit every queued URL in arena (insertion/BST-walk) order — the
    /// ordering guarantee from `SPEC_FULL.md` §7: "URLs within one BFS
    /// generation are visited in arena order."
    pub fn drain(&self) -> Vec<String> {
        // Arena slots are assigned in insertion order; walking the slab
        // directly (rather than the tree) reproduces that order exactly,
        // since every insert allocates its record before linking it in.
        (0..self.cache.high_water())
            .filter_map(|i| self.cache.try_with(Idx::from_raw(i as u32), |rec| rec.url.clone()))
            .collect()
    }

    /// Free every record and reset the tree — "reset the arena, forget the
    /// tree" in place of a post-order teardown walk.
    pub fn clear(&self) {
        self.cache.clear_all();
        *self.root.lock().expect("frontier root mutex poisoned") = None;
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

/// Which side of a [`FrontierPair`] is currently draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// The DRAINING/FILLING pair. Exactly one side is draining at any instant
/// (invariant #3); `swap` is a single field flip, per the "two caches as a
/// typed state" design note — no globals, the pair is owned by the engine.
pub struct FrontierPair {
    a: Frontier,
    b: Frontier,
    draining: Side,
}

impl FrontierPair {
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: Frontier::new(),
            b: Frontier::new(),
            draining: Side::A,
        }
    }

    #[must_use]
    pub fn draining(&self) -> &Frontier {
        match self.draining {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    #[must_use]
    pub fn filling(&self) -> &Frontier {
        match self.draining {
            Side::A => &self.b,
            Side::B => &self.a,
        }
    }

    /// Swap which side is draining, then clear the side that was just
    /// drained (it becomes the new filling side for the generation after
    /// next, and must start empty).
    pub fn swap_generations(&mut self) {
        self.draining().clear();
        self.draining = match self.draining {
            Side::A => Side::B,
            Side::B => Side::A,
        };
    }
}

impl Default for FrontierPair {
    fn default() -> Self {
        Self::new()
    }
}

/// Acceptability test for a candidate absolute URL offered by the Link
/// Extractor. All conditions must hold (`SPEC_FULL.md` §5.B).
#[must_use]
pub fn accept(
    filling: &Frontier,
    draining: &Frontier,
    allow_xdomain: bool,
    is_xdomain: bool,
    archived: bool,
    candidate_url: &str,
) -> bool {
    if candidate_url.len() >= 256 {
        return false;
    }
    if archived {
        return false;
    }
    if candidate_url.contains('#') {
        return false;
    }
    if DISALLOWED_SUBSTRINGS
        .iter()
        .any(|bad| candidate_url.contains(bad))
    {
        return false;
    }
    if is_xdomain && !allow_xdomain {
        return false;
    }
    if draining.contains(candidate_url) {
        return false;
    }
    if filling.contains(candidate_url) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_exact_duplicates() {
        let f = Frontier::new();
        assert!(f.insert("http://t.test/a"));
        assert!(!f.insert("http://t.test/a"));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn insert_rejects_empty_url() {
        let f = Frontier::new();
        assert!(!f.insert(""));
        assert_eq!(f.len(), 0);
    }

    #[test]
    fn contains_finds_inserted_urls() {
        let f = Frontier::new();
        f.insert("http://t.test/b");
        f.insert("http://t.test/a");
        f.insert("http://t.test/c");
        assert!(f.contains("http://t.test/a"));
        assert!(f.contains("http://t.test/c"));
        assert!(!f.contains("http://t.test/z"));
    }

    #[test]
    fn ten_thousand_unique_urls_all_reachable_after_growth() {
        let f = Frontier::new();
        for i in 0..10_000 {
            let url = format!("http://t.test/{i}");
            assert!(f.insert(&url));
        }
        for i in 0..10_000 {
            let url = format!("http://t.test/{i}");
            assert!(f.contains(&url));
        }
    }

    #[test]
    fn pair_starts_with_a_draining() {
        let pair = FrontierPair::new();
        pair.filling().insert("http://t.test/x");
        assert!(!pair.draining().contains("http://t.test/x"));
        assert!(pair.filling().contains("http://t.test/x"));
    }

    #[test]
    fn swap_generations_clears_drained_side() {
        let mut pair = FrontierPair::new();
        pair.draining().insert("http://t.test/seed");
        pair.filling().insert("http://t.test/child");
        pair.swap_generations();
        // what was filling is now draining, and has the child URL
        assert!(pair.draining().contains("http://t.test/child"));
        // what was draining is now filling, and was cleared
        assert!(pair.filling().is_empty());
    }

    #[test]
    fn accept_rejects_fragment_and_disallowed_tokens() {
        let a = Frontier::new();
        let b = Frontier::new();
        assert!(!accept(&a, &b, false, false, false, "http://t.test/a#frag"));
        assert!(!accept(&a, &b, false, false, false, "javascript:void(0)"));
        assert!(!accept(&a, &b, false, false, false, "http://t.test/x.exe"));
    }

    #[test]
    fn accept_rejects_cross_domain_unless_allowed() {
        let a = Frontier::new();
        let b = Frontier::new();
        assert!(!accept(&a, &b, false, true, false, "http://other.test/x"));
        assert!(accept(&a, &b, true, true, false, "http://other.test/x"));
    }

    #[test]
    fn accept_rejects_already_archived() {
        let a = Frontier::new();
        let b = Frontier::new();
        assert!(!accept(&a, &b, false, false, true, "http://t.test/x"));
    }

    #[test]
    fn accept_rejects_duplicate_in_either_side() {
        let a = Frontier::new();
        let b = Frontier::new();
        a.insert("http://t.test/x");
        assert!(!accept(&a, &b, false, false, false, "http://t.test/x"));
        b.insert("http://t.test/y");
        assert!(!accept(&a, &b, false, false, false, "http://t.test/y"));
    }
}
