//! Crawl Engine — the BFS driver tying every other component together
//! (`SPEC_FULL.md` §5.G).
//!
//! One thread, blocking I/O throughout. `SIGINT` is blocked only around the
//! per-URL sleep (`sigint_guard`), via raw `sigprocmask` calls in the idiom
//! `zonblade-mini-gateway-rs` uses for its own direct `libc` syscalls —
//! matching the "signal delivery must not land mid-write" requirement
//! without reaching for a signal-handling crate this crate has no other use
//! for.

use std::fs;
use std::mem::MaybeUninit;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::buf::Buf;
use crate::connection::Connection;
use crate::display::Display;
use crate::error::{ReaperErrorKind, Result};
use crate::extract;
use crate::frontier::{FrontierPair, NR_LINKS_THRESHOLD};
use crate::http::{self, DoRequestOutcome};
use crate::options::Options;
use crate::urlutil::{self, UrlContext};

/// File extensions the extractor never bothers following links *from* —
/// binary/asset responses aren't HTML, so running Extract on them would
/// just scan noise.
const NON_PARSEABLE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".js", ".css", ".pdf", ".svg", ".ico",
];

/// Outcome of one per-URL step, used by the outer loop to decide whether to
/// continue or abort the whole crawl.
enum StepOutcome {
    Continue,
    Fatal,
}

/// Outcome of dispatching on a single response's status, one level more
/// granular than [`StepOutcome`]: a redirect that required a TLS upgrade
/// reports `Retry` so `step` can re-issue the request against the new
/// connection instead of silently dropping the page for this generation.
enum DispatchOutcome {
    Continue,
    Retry(String),
    Fatal,
}

/// Does this redirect's `Location` call for a TLS upgrade-and-retry? Pure
/// (no I/O) so the Location-resolution logic is unit-testable without a
/// live socket; `dispatch_status` performs the actual upgrade side effect
/// once this returns `Some`.
fn tls_upgrade_redirect_target(ctx: &UrlContext, location: &str, conn_secure: bool) -> Option<String> {
    let absolute = urlutil::make_full_url(ctx, location)?;
    (absolute.starts_with("https://") && !conn_secure).then_some(absolute)
}

/// Drives the BFS crawl from a seed URL to `depth` generations, archiving
/// pages under `archive_root` and reporting progress to `display`.
pub struct Engine<'a> {
    opts: Options,
    display: &'a dyn Display,
    frontiers: FrontierPair,
    current_depth: u32,
    nr_reaped: u64,
    links_gate_closed: bool,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub fn new(opts: Options, display: &'a dyn Display) -> Self {
        Self {
            opts,
            display,
            frontiers: FrontierPair::new(),
            current_depth: 0,
            nr_reaped: 0,
            links_gate_closed: false,
        }
    }

    /// Run the crawl to completion. Returns the number of pages archived.
    pub fn run(&mut self) -> Result<u64> {
        let seed = self.opts.seed_url.clone();
        self.frontiers.filling().insert(&seed);
        self.frontiers.swap_generations();

        let mut ctx = UrlContext::from_url(&seed, self.opts.archive_root.clone());
        let secure = self.opts.force_tls || seed.starts_with("https://");
        let mut conn = Connection::open(&ctx.host, &ctx.host, secure)?;
        self.display.update_connection_state(true);

        loop {
            self.links_gate_closed = false;
            let urls = self.frontiers.draining().drain();
            self.display
                .update_cache_status(self.frontiers.draining().len(), self.frontiers.filling().len());

            for url in urls {
                if url.is_empty() {
                    continue;
                }
                ctx.retarget(&url);
                self.display.update_current_url(&url);

                sigint_guarded_sleep(Duration::from_secs(self.opts.delay_secs));

                match self.step(&mut conn, &mut ctx, &url) {
                    StepOutcome::Continue => {}
                    StepOutcome::Fatal => {
                        self.display.put_error_msg("fatal error, aborting crawl");
                        return Ok(self.nr_reaped);
                    }
                }
            }

            self.frontiers.swap_generations();
            self.current_depth += 1;
            if self.current_depth >= self.opts.depth {
                break;
            }
        }

        Ok(self.nr_reaped)
    }

    /// Fetch `url` and dispatch on its status, retrying once in place if the
    /// response turns out to be an https redirect and the connection needed
    /// a TLS upgrade first — the "Engine upgrades to TLS ... and retries"
    /// scenario. `ctx` is retargeted in place across a retry so the retried
    /// request resolves relative links and the local archive path against
    /// the redirect target, not the original URL.
    fn step(&mut self, conn: &mut Connection, ctx: &mut UrlContext, url: &str) -> StepOutcome {
        let mut current = url.to_string();
        let mut retried = false;

        loop {
            if conn.host() != ctx.host {
                let secure = self.opts.force_tls || ctx.scheme == "https";
                match Connection::open(&ctx.host, &ctx.host, secure) {
                    Ok(fresh) => *conn = fresh,
                    Err(e) => return self.handle_request_error(conn, &e),
                }
                self.display.update_connection_state(true);
            }

            let target = urlutil::parse_page(&current);
            let archive_exists = urlutil::local_archive_exists(ctx, &current);

            let outcome = match http::do_request(conn, &ctx.host, &target, archive_exists) {
                Ok(outcome) => outcome,
                Err(e) => return self.handle_request_error(conn, &e),
            };

            let resp = match outcome {
                DoRequestOutcome::AlreadyExists => return StepOutcome::Continue,
                DoRequestOutcome::HeadStatus(resp) | DoRequestOutcome::Status(resp) => resp,
            };
            let status = resp.status;

            match self.dispatch_status(conn, ctx, status, resp) {
                DispatchOutcome::Continue => return StepOutcome::Continue,
                DispatchOutcome::Fatal => return StepOutcome::Fatal,
                DispatchOutcome::Retry(location) => {
                    // Only ever retry once, to avoid chasing a redirect loop.
                    if retried {
                        return StepOutcome::Continue;
                    }
                    retried = true;
                    current = location;
                    ctx.retarget(&current);
                }
            }
        }
    }

    fn handle_request_error(
        &mut self,
        conn: &mut Connection,
        err: &crate::error::ReaperError,
    ) -> StepOutcome {
        warn!(error = %err, "request failed");
        self.display.put_error_msg(&err.to_string());
        match err.kind() {
            ReaperErrorKind::NetworkTransient | ReaperErrorKind::ProtocolParse => {
                if conn.reconnect().is_err() {
                    return StepOutcome::Fatal;
                }
                self.display.update_connection_state(true);
                StepOutcome::Continue
            }
            ReaperErrorKind::PolicySkip | ReaperErrorKind::HttpTerminal => StepOutcome::Continue,
            ReaperErrorKind::Fatal => StepOutcome::Fatal,
        }
    }

    fn dispatch_status(
        &mut self,
        conn: &mut Connection,
        ctx: &UrlContext,
        status: u16,
        resp: http::Response,
    ) -> DispatchOutcome {
        self.display.update_status_code(status);
        match status {
            200 | 404 | 410 => {
                self.archive(ctx, &resp);
                DispatchOutcome::Continue
            }
            301 | 302 | 303 | 307 | 308 => {
                if let Some(location) = resp.header("Location") {
                    if let Some(target) =
                        tls_upgrade_redirect_target(ctx, &location, conn.is_secure())
                    {
                        info!(%target, "redirected to https, upgrading connection");
                        if conn.upgrade_to_tls().is_err() {
                            return DispatchOutcome::Fatal;
                        }
                        self.display.update_connection_state(true);
                        return DispatchOutcome::Retry(target);
                    }
                }
                DispatchOutcome::Continue
            }
            400 | 401 | 403 | 405 => {
                if conn.reconnect().is_err() {
                    return DispatchOutcome::Fatal;
                }
                DispatchOutcome::Continue
            }
            s if (500..600).contains(&s) => {
                if conn.reconnect().is_err() {
                    return DispatchOutcome::Fatal;
                }
                DispatchOutcome::Continue
            }
            _ => DispatchOutcome::Fatal,
        }
    }

    fn archive(&mut self, ctx: &UrlContext, resp: &http::Response) {
        let Some(local_path) = urlutil::make_local_url(ctx, &ctx.full_url) else {
            return;
        };
        self.display.update_current_local(&local_path.to_string_lossy());

        if !self.links_gate_closed && is_parseable(&ctx.full_url) {
            extract::extract_links(
                ctx,
                &resp.body,
                self.frontiers.filling(),
                self.frontiers.draining(),
                self.opts.allow_xdomain,
            );
            if self.frontiers.filling().len() >= NR_LINKS_THRESHOLD {
                self.links_gate_closed = true;
            }
        }

        let mut buf = Buf::new();
        buf.append(&resp.body);
        extract::rewrite_links(ctx, &mut buf);

        if write_archive(&local_path, buf.as_slice()).is_ok() {
            self.nr_reaped += 1;
        }
    }
}

fn is_parseable(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    !NON_PARSEABLE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn write_archive(path: &PathBuf, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }
    fs::write(path, body)
}

/// Block `SIGINT`, sleep for `dur`, then unblock it — so a `^C` cannot
/// interrupt the engine mid-sleep-then-wake into half-advanced state, but is
/// deliverable at every other point in the loop.
fn sigint_guarded_sleep(dur: Duration) {
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        let mut old: MaybeUninit<libc::sigset_t> = MaybeUninit::zeroed();
        libc::sigprocmask(libc::SIG_BLOCK, &set, old.as_mut_ptr());
        thread::sleep(dur);
        libc::sigprocmask(libc::SIG_SETMASK, old.as_ptr(), std::ptr::null_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_parseable_rejects_known_asset_extensions() {
        assert!(!is_parseable("http://t.test/a.jpg"));
        assert!(!is_parseable("http://t.test/a.CSS"));
        assert!(is_parseable("http://t.test/a.html"));
        assert!(is_parseable("http://t.test/"));
    }

    #[test]
    fn sigint_guarded_sleep_returns_after_duration() {
        let start = std::time::Instant::now();
        sigint_guarded_sleep(Duration::from_millis(10));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn tls_upgrade_redirect_target_detects_https_location_over_plain_conn() {
        let ctx = UrlContext::from_url("http://t.test/", PathBuf::from("/tmp/reaped"));
        let target = tls_upgrade_redirect_target(&ctx, "https://t.test/", false);
        assert_eq!(target.as_deref(), Some("https://t.test/"));
    }

    #[test]
    fn tls_upgrade_redirect_target_ignores_already_secure_connection() {
        let ctx = UrlContext::from_url("http://t.test/", PathBuf::from("/tmp/reaped"));
        assert!(tls_upgrade_redirect_target(&ctx, "https://t.test/", true).is_none());
    }

    #[test]
    fn tls_upgrade_redirect_target_resolves_protocol_relative_location() {
        let ctx = UrlContext::from_url("http://t.test/", PathBuf::from("/tmp/reaped"));
        // an explicit https location still triggers the upgrade even when
        // spelled protocol-relative
        let target = tls_upgrade_redirect_target(&ctx, "//t.test/", false);
        // a bare protocol-relative location resolves to the *current*
        // scheme (http here), so it must NOT be mistaken for an upgrade
        assert!(target.is_none());
    }

    #[test]
    fn tls_upgrade_redirect_target_ignores_same_scheme_redirect() {
        let ctx = UrlContext::from_url("https://t.test/", PathBuf::from("/tmp/reaped"));
        assert!(tls_upgrade_redirect_target(&ctx, "https://t.test/other", true).is_none());
    }
}
