//! Path patterns the routing table and strategies test against.

/// Substrings that mark authentication traffic. Never intercepted.
pub const AUTH_PATH_PATTERNS: [&str; 7] = [
    "/auth",
    "/login",
    "/signup",
    "/signin",
    "/api/auth",
    "/reset-password",
    "/update-password",
];

/// Bundler output; chunks loaded by an auth page inherit the page's bypass.
pub const BUNDLER_ASSET_PREFIX: &str = "/_next/";

pub const STATIC_ASSET_PREFIX: &str = "/_next/static/";
pub const ICON_PREFIX: &str = "/icons/";
pub const MANIFEST_PATH: &str = "/manifest.json";

pub const EXTENSION_SCHEMES: [&str; 4] = [
    "chrome-extension",
    "moz-extension",
    "safari-extension",
    "safari-web-extension",
];

pub const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif"];

/// API paths whose GET responses may be cached. Site information is
/// intentionally absent so organisational data is never served stale.
pub const CACHEABLE_API_PATTERNS: [&str; 4] = [
    "/api/materials",
    "/api/daily-reports",
    "/api/attendance",
    "/api/notifications",
];

/// API paths always fetched fresh with no-cache headers, never stored.
/// `/api/auth` is also bypassed upstream; it stays listed here as a second guard.
pub const ALWAYS_FRESH_API_PATTERNS: [&str; 4] = [
    "/api/site-info",
    "/api/sites",
    "/api/organizations",
    "/api/auth",
];

/// Pages that are never written to or served from the page partition.
pub const PAGE_CACHE_EXCLUDED_PATTERNS: [&str; 5] =
    ["/auth", "/login", "/signup", "/api/auth", "/dashboard"];

pub fn is_auth_path(path: &str) -> bool {
    AUTH_PATH_PATTERNS.iter().any(|p| path.contains(p))
}

pub fn is_extension_scheme(scheme: &str) -> bool {
    EXTENSION_SCHEMES.contains(&scheme)
}

pub fn is_static_asset_path(path: &str) -> bool {
    path.starts_with(STATIC_ASSET_PREFIX) || path.starts_with(ICON_PREFIX) || path == MANIFEST_PATH
}

pub fn has_image_extension(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub fn is_cacheable_api_path(path: &str) -> bool {
    path.contains("/api/") && CACHEABLE_API_PATTERNS.iter().any(|p| path.contains(p))
}

pub fn is_always_fresh_api_path(path: &str) -> bool {
    ALWAYS_FRESH_API_PATTERNS.iter().any(|p| path.contains(p))
}

pub fn is_page_cache_excluded(path: &str) -> bool {
    PAGE_CACHE_EXCLUDED_PATTERNS.iter().any(|p| path.contains(p))
}
