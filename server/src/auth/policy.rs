//! Path classification.
//!
//! Every request path maps to exactly one [`PathClass`] through an ordered
//! table of `(pattern, class)` rules compiled once at startup.  The first
//! matching rule wins; paths matching no rule are [`PathClass::Public`].
//!
//! Rules are matched against the page a path resolves to, not its raw
//! spelling: `//dashboard`, `/x/../dashboard` and `/dashboard.html` all
//! name the admin dashboard and classify as such.

use std::fmt;

use shared::types::jwt::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathClass {
    Public,
    /// A login page; signed-in visitors are bounced to their dashboard.
    Login(Role),
    /// A browser page that redirects to the role's login page on denial.
    ProtectedPage(Role),
    /// A JSON endpoint that answers 401/403 on denial.
    ProtectedApi(Role),
}

impl PathClass {
    /// Role a credential must carry to pass, if any.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            PathClass::ProtectedPage(role) | PathClass::ProtectedApi(role) => Some(*role),
            PathClass::Public | PathClass::Login(_) => None,
        }
    }
}

impl fmt::Display for PathClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathClass::Public => f.write_str("public"),
            PathClass::Login(role) => write!(f, "login-{}", role),
            PathClass::ProtectedPage(role) => write!(f, "protected-{}-page", role),
            PathClass::ProtectedApi(role) => write!(f, "protected-{}-api", role),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches the path itself, with or without one trailing slash.
    Exact(String),
    /// Matches the path and everything below it, on segment boundaries:
    /// `/dashboard` covers `/dashboard` and `/dashboard/x`, not `/dashboardx`.
    Prefix(String),
}

impl PathPattern {
    pub fn exact(path: &str) -> Self {
        PathPattern::Exact(path.to_string())
    }

    pub fn prefix(path: &str) -> Self {
        PathPattern::Prefix(path.trim_end_matches('/').to_string())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p || path.strip_suffix('/') == Some(p.as_str()),
            PathPattern::Prefix(p) => match path.strip_prefix(p.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathPolicy {
    rules: Vec<(PathPattern, PathClass)>,
}

impl PathPolicy {
    pub fn new(rules: Vec<(PathPattern, PathClass)>) -> Self {
        Self { rules }
    }

    /// The portal's route-to-role binding.
    pub fn standard() -> Self {
        Self::new(vec![
            (PathPattern::exact("/login"), PathClass::Login(Role::Admin)),
            (
                PathPattern::exact("/partner/login"),
                PathClass::Login(Role::Partner),
            ),
            (
                PathPattern::prefix("/partner/dashboard"),
                PathClass::ProtectedPage(Role::Partner),
            ),
            (
                PathPattern::prefix("/dashboard"),
                PathClass::ProtectedPage(Role::Admin),
            ),
            (
                PathPattern::prefix("/api/admin"),
                PathClass::ProtectedApi(Role::Admin),
            ),
            (
                PathPattern::prefix("/api/partner"),
                PathClass::ProtectedApi(Role::Partner),
            ),
        ])
    }

    pub fn classify(&self, path: &str) -> PathClass {
        let normalized = normalize_path(path);
        let page = page_identity(&normalized);
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(page))
            .map(|(_, class)| *class)
            .unwrap_or(PathClass::Public)
    }
}

/// Canonical spelling of a request path: repeated slashes collapse, `.`
/// segments drop and `..` removes its parent.  A trailing slash survives.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() || path.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// The page a normalized path is served as: `P.html` and `P/index.html`
/// are both `P`.
fn page_identity(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    let page = trimmed
        .strip_suffix("/index.html")
        .or_else(|| trimmed.strip_suffix(".html"))
        .unwrap_or(path);
    if page.is_empty() { "/" } else { page }
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(path: &str) -> PathClass {
        PathPolicy::standard().classify(path)
    }

    #[test]
    fn login_pages() {
        assert_eq!(classify("/login"), PathClass::Login(Role::Admin));
        assert_eq!(classify("/login/"), PathClass::Login(Role::Admin));
        assert_eq!(classify("/partner/login"), PathClass::Login(Role::Partner));
    }

    #[test]
    fn login_is_exact_only() {
        assert_eq!(classify("/login/extra"), PathClass::Public);
        assert_eq!(classify("/loginx"), PathClass::Public);
    }

    #[test]
    fn admin_pages() {
        assert_eq!(classify("/dashboard"), PathClass::ProtectedPage(Role::Admin));
        assert_eq!(
            classify("/dashboard/payouts"),
            PathClass::ProtectedPage(Role::Admin)
        );
        assert_eq!(
            classify("/dashboard/my-affiliates/active"),
            PathClass::ProtectedPage(Role::Admin)
        );
    }

    #[test]
    fn partner_pages() {
        assert_eq!(
            classify("/partner/dashboard"),
            PathClass::ProtectedPage(Role::Partner)
        );
        assert_eq!(
            classify("/partner/dashboard/earnings"),
            PathClass::ProtectedPage(Role::Partner)
        );
    }

    #[test]
    fn apis() {
        assert_eq!(
            classify("/api/admin/partners"),
            PathClass::ProtectedApi(Role::Admin)
        );
        assert_eq!(
            classify("/api/partner/stats"),
            PathClass::ProtectedApi(Role::Partner)
        );
    }

    #[test]
    fn prefix_respects_segment_boundary() {
        assert_eq!(classify("/dashboardx"), PathClass::Public);
        assert_eq!(classify("/api/administrator"), PathClass::Public);
        assert_eq!(classify("/api/partners"), PathClass::Public);
    }

    #[test]
    fn everything_else_is_public() {
        for path in [
            "/",
            "/api/auth/login",
            "/api/auth/signup",
            "/partner/signup",
            "/health",
            "/static/app.js",
        ] {
            assert_eq!(classify(path), PathClass::Public, "{}", path);
        }
    }

    #[test]
    fn page_files_classify_as_their_page() {
        assert_eq!(classify("/dashboard.html"), PathClass::ProtectedPage(Role::Admin));
        assert_eq!(
            classify("/dashboard/index.html"),
            PathClass::ProtectedPage(Role::Admin)
        );
        assert_eq!(
            classify("/partner/dashboard.html"),
            PathClass::ProtectedPage(Role::Partner)
        );
        assert_eq!(
            classify("/partner/dashboard/index.html/"),
            PathClass::ProtectedPage(Role::Partner)
        );
        assert_eq!(classify("/login.html"), PathClass::Login(Role::Admin));
        assert_eq!(classify("/index.html"), PathClass::Public);
        assert_eq!(classify("/dashboardx.html"), PathClass::Public);
    }

    #[test]
    fn odd_spellings_classify_as_canonical_path() {
        assert_eq!(classify("//dashboard"), PathClass::ProtectedPage(Role::Admin));
        assert_eq!(
            classify("/partner//dashboard"),
            PathClass::ProtectedPage(Role::Partner)
        );
        assert_eq!(
            classify("/partner/./dashboard"),
            PathClass::ProtectedPage(Role::Partner)
        );
        assert_eq!(
            classify("/static/../dashboard.html"),
            PathClass::ProtectedPage(Role::Admin)
        );
        assert_eq!(
            classify("//api//admin/stats"),
            PathClass::ProtectedApi(Role::Admin)
        );
    }

    #[test]
    fn normalize_collapses_slashes_and_dots() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("//dashboard"), "/dashboard");
        assert_eq!(normalize_path("/partner//dashboard/"), "/partner/dashboard/");
        assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_path("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(normalize_path("/api/partner/stats"), "/api/partner/stats");
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = PathPolicy::new(vec![
            (PathPattern::prefix("/a"), PathClass::ProtectedApi(Role::Admin)),
            (PathPattern::prefix("/a/b"), PathClass::ProtectedApi(Role::Partner)),
        ]);
        assert_eq!(policy.classify("/a/b/c"), PathClass::ProtectedApi(Role::Admin));
    }

    #[test]
    fn required_role_only_for_protected_classes() {
        assert_eq!(PathClass::Public.required_role(), None);
        assert_eq!(PathClass::Login(Role::Admin).required_role(), None);
        assert_eq!(
            PathClass::ProtectedApi(Role::Partner).required_role(),
            Some(Role::Partner)
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(PathClass::ProtectedApi(Role::Admin).to_string(), "protected-admin-api");
        assert_eq!(PathClass::Login(Role::Partner).to_string(), "login-partner");
    }

    proptest! {
        #[test]
        fn paths_outside_known_roots_are_public(tail in "[a-z0-9/_-]{0,40}") {
            let path = format!("/public-{}", tail);
            prop_assert_eq!(classify(&path), PathClass::Public);
        }

        #[test]
        fn anything_under_dashboard_is_admin_page(tail in "[a-z0-9/_-]{0,40}") {
            let path = format!("/dashboard/{}", tail);
            prop_assert_eq!(classify(&path), PathClass::ProtectedPage(Role::Admin));
        }

        #[test]
        fn extra_slashes_never_unprotect(
            leading in 1usize..4,
            inner in 1usize..4,
            tail in "[a-z0-9_-]{0,12}",
        ) {
            let path = format!(
                "{}partner{}dashboard/{}",
                "/".repeat(leading),
                "/".repeat(inner),
                tail
            );
            prop_assert_eq!(classify(&path), PathClass::ProtectedPage(Role::Partner));
            prop_assert_eq!(
                classify(&format!("{}.html", path.trim_end_matches('/'))),
                PathClass::ProtectedPage(Role::Partner)
            );
        }
    }
}
