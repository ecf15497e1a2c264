/// Name of the cookie carrying the durable client identifier.
pub const CLIENT_ID_COOKIE_NAME: &str = "client_id";

/// Client identifier cookie lifetime: two years.
pub const CLIENT_ID_COOKIE_MAX_AGE_SECS: i64 = 63_072_000;

/// Upper bound for one analytics delivery attempt.
pub const ANALYTICS_TIMEOUT_MS: u64 = 2_000;

/// Default base URL for the GA4 Measurement Protocol.
pub const DEFAULT_GA_ENDPOINT: &str = "https://www.google-analytics.com";

/// User-agent sent on outbound analytics calls.
pub const COLLECTOR_USER_AGENT: &str = "Glimpse-Collector/1.0";

/// Default proxy listen address.
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:8080";
