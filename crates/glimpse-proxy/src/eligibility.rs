use std::collections::HashSet;

/// Common static asset extensions, matched case-insensitively against the end
/// of the request path.
const STATIC_EXTENSIONS: &[&str] = &[
    ".js", ".mjs", ".css", ".map", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp",
    ".avif", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".txt", ".xml", ".json", ".pdf", ".mp4",
    ".webm", ".mp3",
];

/// Substrings marking crawler traffic, matched case-insensitively anywhere in
/// the user-agent value.
const BOT_TOKENS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "headless",
    "lighthouse",
    "facebookexternalhit",
    "pingdom",
    "uptimerobot",
    "scraper",
    "curl",
    "wget",
    "python-requests",
    "go-http-client",
];

/// Paths containing any of these substrings are infrastructure endpoints, not
/// page views.
const SYSTEM_PATH_MARKERS: &[&str] = &["/health", "/status", "/admin"];

/// Why a request was excluded from tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UntrackedHost,
    StaticAsset,
    BotUserAgent,
    SystemPath,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UntrackedHost => "untracked_host",
            SkipReason::StaticAsset => "static_asset",
            SkipReason::BotUserAgent => "bot_user_agent",
            SkipReason::SystemPath => "system_path",
        }
    }
}

/// Outcome of the eligibility rules for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingDecision {
    Track,
    Skip(SkipReason),
}

impl TrackingDecision {
    pub fn is_tracked(&self) -> bool {
        matches!(self, TrackingDecision::Track)
    }
}

/// Static tracking rules, built once at startup and shared by the proxy.
#[derive(Debug, Clone)]
pub struct TrackingPolicy {
    tracked_hostnames: HashSet<String>,
}

impl TrackingPolicy {
    pub fn new(tracked_hostnames: HashSet<String>) -> Self {
        Self { tracked_hostnames }
    }

    /// Evaluate the skip rules in order; the first match wins.
    pub fn evaluate(&self, host: &str, path: &str, user_agent: Option<&str>) -> TrackingDecision {
        if !self.tracked_hostnames.contains(&host.to_lowercase()) {
            return TrackingDecision::Skip(SkipReason::UntrackedHost);
        }
        if is_static_asset(path) {
            return TrackingDecision::Skip(SkipReason::StaticAsset);
        }
        if is_bot(user_agent) {
            return TrackingDecision::Skip(SkipReason::BotUserAgent);
        }
        if is_system_path(path) {
            return TrackingDecision::Skip(SkipReason::SystemPath);
        }
        TrackingDecision::Track
    }
}

/// Whether the path points at a static asset.
pub fn is_static_asset(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    STATIC_EXTENSIONS
        .iter()
        .any(|ext| path_lower.ends_with(ext))
}

/// Whether the user agent belongs to a known crawler.
///
/// An absent or empty user-agent is not a bot; such requests fall through to
/// the remaining rules.
pub fn is_bot(user_agent: Option<&str>) -> bool {
    match user_agent {
        Some(ua) if !ua.is_empty() => {
            let ua_lower = ua.to_lowercase();
            BOT_TOKENS.iter().any(|token| ua_lower.contains(token))
        }
        _ => false,
    }
}

/// Whether the path names an infrastructure endpoint. Substring containment
/// on purpose: `/administrator` and `/my-health-app` both count.
pub fn is_system_path(path: &str) -> bool {
    SYSTEM_PATH_MARKERS
        .iter()
        .any(|marker| path.contains(marker))
}
