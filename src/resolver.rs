//! Asset resolution policy for the games namespace
//!
//! Game bundles are deliberately kept incomplete locally (to bound
//! repository size) with the remainder mirrored to object storage, so a
//! requested path has to be routed: serve the local copy when one exists,
//! otherwise rewrite to the same path on the remote origin.
//!
//! Precedence:
//! 1. Legacy sprunki prefixes are rewritten to the dedicated remote
//!    sub-prefix unconditionally. That package references content-hash
//!    assets next to its entry HTML, and a partially-local page load would
//!    mix origins for a single game.
//! 2. When `GAMES_FROM_R2=1`, every games path goes remote without a local
//!    existence check (deployments that ship no local assets).
//! 3. Otherwise local-first with remote fallback.
//!
//! A malformed remote origin fails closed: remote rewriting is disabled and
//! only local files are served.

use std::env;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Remote origin used when R2_ASSET_DOMAIN is not set
pub const DEFAULT_REMOTE_ORIGIN: &str = "https://r2bucket.billybobgames.org";

/// The namespace this policy applies to
pub const GAMES_PREFIX: &str = "/games/";

/// Path prefixes rewritten to a dedicated remote sub-prefix regardless of
/// routing mode and local presence
const LEGACY_REWRITES: &[(&str, &str)] = &[
    ("/games/incredibox-sprunki/", "/sprunki/"),
    ("/r2/sprunki/", "/sprunki/"),
];

/// Operator-selected routing behavior for non-legacy games paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    /// Serve local files when present, fall back to the remote origin
    LocalFirst,

    /// Always rewrite to the remote origin, skipping local checks
    AlwaysRemote,
}

/// The routing decision for one requested path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Serve this local file as-is
    Local(PathBuf),

    /// Serve via the rewritten remote URL (query string already carried over)
    Remote(Url),

    /// Nothing to serve: no local file and no usable remote origin
    NotFound,
}

/// Routing policy built once at startup from the environment
#[derive(Debug, Clone)]
pub struct AssetResolver {
    mode: RoutingMode,
    remote_origin: Option<Url>,
    local_root: PathBuf,
}

impl AssetResolver {
    /// Builds the resolver from explicit parts
    pub fn new(mode: RoutingMode, remote_origin: Option<Url>, local_root: PathBuf) -> Self {
        Self {
            mode,
            remote_origin,
            local_root,
        }
    }

    /// Builds the resolver from the environment
    ///
    /// # Environment Variables
    ///
    /// - `GAMES_FROM_R2` - "1" selects always-remote routing
    /// - `R2_ASSET_DOMAIN` - remote origin (default: the fixed CDN hostname)
    pub fn from_env(local_root: PathBuf) -> Self {
        let mode = match env::var("GAMES_FROM_R2") {
            Ok(value) if value == "1" => RoutingMode::AlwaysRemote,
            _ => RoutingMode::LocalFirst,
        };

        let raw_origin =
            env::var("R2_ASSET_DOMAIN").unwrap_or_else(|_| DEFAULT_REMOTE_ORIGIN.to_string());
        let remote_origin = parse_origin(&raw_origin);
        if remote_origin.is_none() {
            // Fail closed: a broken origin must not become a broken redirect
            tracing::warn!(origin = %raw_origin, "invalid R2_ASSET_DOMAIN, serving local assets only");
        }

        Self::new(mode, remote_origin, local_root)
    }

    /// Decides how to serve one requested path
    ///
    /// `path` is the full request path (leading slash); `query` is the raw
    /// query string, preserved unchanged on remote rewrites.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Resolution {
        // Reject traversal before touching the filesystem
        let Some(relative) = safe_relative(path) else {
            return Resolution::NotFound;
        };

        // 1. Legacy prefixes are always remote when an origin is usable
        for (source, target) in LEGACY_REWRITES {
            if let Some(rest) = path.strip_prefix(source) {
                return match self.remote_url(&format!("{}{}", target, rest), query) {
                    Some(url) => Resolution::Remote(url),
                    None => self.local_or_not_found(&relative),
                };
            }
        }

        if !path.starts_with(GAMES_PREFIX) {
            return self.local_or_not_found(&relative);
        }

        // 2. Operator override: no local existence checks at all
        if self.mode == RoutingMode::AlwaysRemote {
            return match self.remote_url(path, query) {
                Some(url) => Resolution::Remote(url),
                None => self.local_or_not_found(&relative),
            };
        }

        // 3. Local-first, remote-fallback
        let local = self.local_root.join(&relative);
        if local.is_file() {
            return Resolution::Local(local);
        }
        match self.remote_url(path, query) {
            Some(url) => Resolution::Remote(url),
            None => Resolution::NotFound,
        }
    }

    fn local_or_not_found(&self, relative: &Path) -> Resolution {
        let local = self.local_root.join(relative);
        if local.is_file() {
            Resolution::Local(local)
        } else {
            Resolution::NotFound
        }
    }

    fn remote_url(&self, path: &str, query: Option<&str>) -> Option<Url> {
        let mut url = self.remote_origin.clone()?;
        url.set_path(path);
        url.set_query(query);
        Some(url)
    }
}

/// Validates and parses the remote origin: absolute http(s) URL with a host
pub fn parse_origin(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let scheme_ok = url.scheme() == "https" || url.scheme() == "http";
    (scheme_ok && url.has_host()).then_some(url)
}

/// Turns a request path into a root-relative filesystem path
///
/// Returns None for anything that could escape the local root: parent
/// segments, absolute components, or prefix components.
fn safe_relative(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let candidate = Path::new(trimmed);
    for component in candidate.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(candidate.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Option<Url> {
        parse_origin(DEFAULT_REMOTE_ORIGIN)
    }

    fn resolver_with_root(mode: RoutingMode, root: &Path) -> AssetResolver {
        AssetResolver::new(mode, origin(), root.to_path_buf())
    }

    #[test]
    fn local_file_wins_in_fallback_mode() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("games/mouseHit/js")).unwrap();
        std::fs::write(root.path().join("games/mouseHit/js/main.js"), "// hi").unwrap();

        let resolver = resolver_with_root(RoutingMode::LocalFirst, root.path());
        match resolver.resolve("/games/mouseHit/js/main.js", None) {
            Resolution::Local(path) => assert!(path.ends_with("games/mouseHit/js/main.js")),
            other => panic!("expected local, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_falls_back_to_remote_with_query() {
        let root = tempfile::tempdir().unwrap();
        let resolver = resolver_with_root(RoutingMode::LocalFirst, root.path());

        match resolver.resolve("/games/mouseHit/js/absent.js", Some("v=3")) {
            Resolution::Remote(url) => {
                assert_eq!(
                    url.as_str(),
                    "https://r2bucket.billybobgames.org/games/mouseHit/js/absent.js?v=3"
                );
            }
            other => panic!("expected remote, got {:?}", other),
        }
    }

    #[test]
    fn legacy_prefix_is_remote_even_when_local_exists() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("games/incredibox-sprunki")).unwrap();
        std::fs::write(root.path().join("games/incredibox-sprunki/index.html"), "x").unwrap();

        let resolver = resolver_with_root(RoutingMode::LocalFirst, root.path());
        match resolver.resolve("/games/incredibox-sprunki/index.html", None) {
            Resolution::Remote(url) => {
                assert_eq!(
                    url.as_str(),
                    "https://r2bucket.billybobgames.org/sprunki/index.html"
                );
            }
            other => panic!("expected remote, got {:?}", other),
        }
    }

    #[test]
    fn r2_sprunki_prefix_maps_to_the_sub_prefix() {
        let root = tempfile::tempdir().unwrap();
        let resolver = resolver_with_root(RoutingMode::LocalFirst, root.path());

        match resolver.resolve("/r2/sprunki/abc123.png", None) {
            Resolution::Remote(url) => {
                assert_eq!(url.as_str(), "https://r2bucket.billybobgames.org/sprunki/abc123.png");
            }
            other => panic!("expected remote, got {:?}", other),
        }
    }

    #[test]
    fn always_remote_skips_local_checks() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("games/pac-man")).unwrap();
        std::fs::write(root.path().join("games/pac-man/game.js"), "x").unwrap();

        let resolver = resolver_with_root(RoutingMode::AlwaysRemote, root.path());
        match resolver.resolve("/games/pac-man/game.js", None) {
            Resolution::Remote(url) => {
                assert_eq!(url.as_str(), "https://r2bucket.billybobgames.org/games/pac-man/game.js");
            }
            other => panic!("expected remote, got {:?}", other),
        }
    }

    #[test]
    fn malformed_origin_fails_closed() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("games/pac-man")).unwrap();
        std::fs::write(root.path().join("games/pac-man/game.js"), "x").unwrap();

        let resolver = AssetResolver::new(RoutingMode::LocalFirst, None, root.path().to_path_buf());

        // Local file still served
        assert!(matches!(
            resolver.resolve("/games/pac-man/game.js", None),
            Resolution::Local(_)
        ));
        // Missing file yields 404, never a broken redirect
        assert_eq!(
            resolver.resolve("/games/pac-man/missing.js", None),
            Resolution::NotFound
        );
        // Legacy prefix falls back to local rather than redirecting
        assert_eq!(
            resolver.resolve("/games/incredibox-sprunki/index.html", None),
            Resolution::NotFound
        );
    }

    #[test]
    fn traversal_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let resolver = resolver_with_root(RoutingMode::LocalFirst, root.path());
        assert_eq!(
            resolver.resolve("/games/../secrets.txt", None),
            Resolution::NotFound
        );
    }

    #[test]
    fn origin_validation_requires_absolute_http() {
        assert!(parse_origin("https://cdn.example.com").is_some());
        assert!(parse_origin("http://localhost:9000").is_some());
        assert!(parse_origin("not a url").is_none());
        assert!(parse_origin("ftp://cdn.example.com").is_none());
        assert!(parse_origin("/relative/path").is_none());
    }
}
