//! Request classification.
//!
//! Classification is an ordered table of `(name, predicate, route)` rules,
//! evaluated first-match-wins. The order is part of the contract: auth traffic
//! is tested before anything that could cache it.

mod patterns;

pub use patterns::*;

use serde::Serialize;
use url::Url;

use crate::http::{path_of, FetchRequest, RequestDestination, RequestMethod, RequestMode};

/// Why a request is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    /// Authentication page/endpoint, or a bundler chunk loaded by one.
    Auth,
    /// Anything other than GET.
    NonGet,
    /// Browser-extension pseudo-protocol.
    Extension,
}

/// The class a request is assigned, and with it the strategy that serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Bypass(BypassReason),
    StaticAsset,
    Image,
    CacheableApi,
    Page,
    NetworkOnly,
}

impl Route {
    pub fn is_bypass(&self) -> bool {
        matches!(self, Self::Bypass(_))
    }
}

/// The parts of a request the rules look at, computed once.
#[derive(Debug, Clone)]
pub struct RequestFacts {
    pub scheme: String,
    pub path: String,
    pub method: RequestMethod,
    pub mode: RequestMode,
    pub destination: RequestDestination,
    pub referrer_path: Option<String>,
}

impl RequestFacts {
    pub fn of(request: &FetchRequest) -> Self {
        let (scheme, path) = match Url::parse(&request.url) {
            Ok(url) => (url.scheme().to_string(), url.path().to_string()),
            Err(_) => (String::new(), path_of(&request.url)),
        };
        Self {
            scheme,
            path,
            method: request.method.clone(),
            mode: request.mode,
            destination: request.destination,
            referrer_path: request.referrer.as_deref().map(path_of),
        }
    }
}

/// One row of the routing table.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&RequestFacts) -> bool,
    pub route: Route,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("route", &self.route)
            .finish()
    }
}

/// Ordered routing table.
#[derive(Debug)]
pub struct RequestClassifier {
    rules: Vec<Rule>,
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RequestClassifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, request: &FetchRequest) -> Route {
        self.classify_facts(&RequestFacts::of(request))
    }

    pub fn classify_facts(&self, facts: &RequestFacts) -> Route {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(facts))
            .map(|rule| rule.route)
            .unwrap_or(Route::NetworkOnly)
    }
}

/// The default table, in precedence order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "auth",
            matches: |f| is_auth_path(&f.path) || is_auth_bundle_chunk(f),
            route: Route::Bypass(BypassReason::Auth),
        },
        Rule {
            name: "extension",
            matches: |f| is_extension_scheme(&f.scheme),
            route: Route::Bypass(BypassReason::Extension),
        },
        Rule {
            name: "non-get",
            matches: |f| f.method != RequestMethod::Get,
            route: Route::Bypass(BypassReason::NonGet),
        },
        Rule {
            name: "static",
            matches: |f| is_static_asset_path(&f.path),
            route: Route::StaticAsset,
        },
        Rule {
            name: "image",
            matches: |f| f.destination == RequestDestination::Image || has_image_extension(&f.path),
            route: Route::Image,
        },
        Rule {
            name: "api",
            matches: |f| is_cacheable_api_path(&f.path),
            route: Route::CacheableApi,
        },
        Rule {
            name: "page",
            matches: |f| {
                (f.mode == RequestMode::Navigate || f.destination == RequestDestination::Document)
                    && !is_page_cache_excluded(&f.path)
            },
            route: Route::Page,
        },
    ]
}

fn is_auth_bundle_chunk(facts: &RequestFacts) -> bool {
    facts.path.starts_with(BUNDLER_ASSET_PREFIX)
        && facts
            .referrer_path
            .as_deref()
            .map(is_auth_path)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(request: FetchRequest) -> Route {
        RequestClassifier::default().classify(&request)
    }

    fn url(path: &str) -> String {
        format!("https://site.example{path}")
    }

    #[test]
    fn auth_paths_bypass_before_anything_else() {
        for path in [
            "/auth/callback",
            "/login",
            "/signup",
            "/signin",
            "/api/auth/session",
            "/reset-password",
            "/update-password",
        ] {
            assert_eq!(
                classify(FetchRequest::get(url(path))),
                Route::Bypass(BypassReason::Auth),
                "{path}"
            );
        }
        // Auth wins over non-GET and over image extension.
        let mut post = FetchRequest::get(url("/api/auth/token"));
        post.method = RequestMethod::Post;
        assert_eq!(classify(post), Route::Bypass(BypassReason::Auth));
        assert_eq!(
            classify(FetchRequest::get(url("/login/logo.png"))),
            Route::Bypass(BypassReason::Auth)
        );
    }

    #[test]
    fn bundler_chunk_requested_from_login_page_bypasses() {
        let request = FetchRequest::get(url("/_next/static/chunks/app.js"))
            .with_referrer(url("/login?next=/dashboard"));
        assert_eq!(classify(request), Route::Bypass(BypassReason::Auth));

        let request = FetchRequest::get(url("/_next/static/chunks/app.js"))
            .with_referrer(url("/dashboard"));
        assert_eq!(classify(request), Route::StaticAsset);
    }

    #[test]
    fn non_get_and_extension_requests_bypass() {
        let mut put = FetchRequest::get(url("/api/materials/1"));
        put.method = RequestMethod::Put;
        assert_eq!(classify(put), Route::Bypass(BypassReason::NonGet));
        assert_eq!(
            classify(FetchRequest::get("chrome-extension://abcdef/content.js")),
            Route::Bypass(BypassReason::Extension)
        );
    }

    #[test]
    fn static_assets_icons_and_manifest() {
        assert_eq!(
            classify(FetchRequest::get(url("/_next/static/css/app.css"))),
            Route::StaticAsset
        );
        assert_eq!(
            classify(FetchRequest::get(url("/icons/icon-192x192.png"))),
            Route::StaticAsset
        );
        assert_eq!(
            classify(FetchRequest::get(url("/manifest.json"))),
            Route::StaticAsset
        );
    }

    #[test]
    fn images_by_destination_or_extension() {
        assert_eq!(
            classify(FetchRequest::get(url("/photos/x.JPG"))),
            Route::Image
        );
        assert_eq!(
            classify(
                FetchRequest::get(url("/storage/v1/object/abc"))
                    .with_destination(RequestDestination::Image)
            ),
            Route::Image
        );
    }

    #[test]
    fn only_allow_listed_api_paths_are_cacheable() {
        assert_eq!(
            classify(FetchRequest::get(url("/api/materials/123"))),
            Route::CacheableApi
        );
        assert_eq!(
            classify(FetchRequest::get(url("/api/daily-reports?siteId=4"))),
            Route::CacheableApi
        );
        assert_eq!(
            classify(FetchRequest::get(url("/api/site-info"))),
            Route::NetworkOnly
        );
        assert_eq!(
            classify(FetchRequest::get(url("/api/payroll/rates"))),
            Route::NetworkOnly
        );
    }

    #[test]
    fn navigations_are_pages_except_dashboard() {
        let nav = |path: &str| FetchRequest::get(url(path)).with_mode(RequestMode::Navigate);
        assert_eq!(classify(nav("/")), Route::Page);
        assert_eq!(classify(nav("/reports/weekly")), Route::Page);
        assert_eq!(classify(nav("/dashboard/attendance")), Route::NetworkOnly);
        assert_eq!(
            classify(
                FetchRequest::get(url("/offline.html"))
                    .with_destination(RequestDestination::Document)
            ),
            Route::Page
        );
    }

    #[test]
    fn table_is_ordered_with_auth_first() {
        let classifier = RequestClassifier::default();
        let names: Vec<_> = classifier.rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            ["auth", "extension", "non-get", "static", "image", "api", "page"]
        );
    }
}
