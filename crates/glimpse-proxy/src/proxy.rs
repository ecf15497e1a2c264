use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use pingora::Error;
use pingora_core::{upstreams::peer::HttpPeer, Result};
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session as PingoraSession};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use glimpse_analytics::PageView;
use glimpse_core::Settings;

use crate::eligibility::{TrackingDecision, TrackingPolicy};
use crate::identity::{client_cookie, should_set_cookie, ClientIdentity};
use crate::traits::PageViewSink;

/// Per-request state carried across the proxy phases
pub struct RequestContext {
    pub request_id: String,
    pub start_time: Instant,
    pub method: String,
    pub host: String,
    pub path: String,
    pub client_id: Option<String>,
    pub is_new_client: bool,
    pub tracked: bool,
    pub status: Option<u16>,
}

/// Reverse proxy that mirrors eligible page views to an analytics sink
///
/// Every request is forwarded verbatim to the configured origin. Tracking is
/// a side channel: eligibility is decided before the upstream call, the event
/// is handed to the sink from a detached task, and a browser seen for the
/// first time gets a `client_id` cookie on the way out.
pub struct TrackingProxy {
    settings: Arc<Settings>,
    policy: TrackingPolicy,
    sink: Arc<dyn PageViewSink>,
}

impl TrackingProxy {
    pub fn new(settings: Arc<Settings>, sink: Arc<dyn PageViewSink>) -> Self {
        let policy = TrackingPolicy::new(settings.tracked_hostnames.clone());
        Self {
            settings,
            policy,
            sink,
        }
    }

    #[cfg(test)]
    pub fn policy(&self) -> &TrackingPolicy {
        &self.policy
    }

    fn get_host_header(&self, session: &PingoraSession) -> Result<String> {
        let host_with_port = if let Some(host) = session.req_header().headers.get("host") {
            host.to_str()
                .map_err(|_| Error::new_str("Invalid host header encoding"))?
                .to_string()
        } else if let Some(host) = session.req_header().uri.host() {
            // The :authority pseudo-header lands here for HTTP/2
            host.to_string()
        } else {
            return Err(Error::new_str("Missing Host or :authority header"));
        };

        // Remove port from host before returning (e.g., "example.com:3000" -> "example.com")
        let host = host_with_port.split(':').next().unwrap_or(&host_with_port);
        Ok(host.to_string())
    }

    fn is_https_request(&self, session: &PingoraSession) -> bool {
        session
            .req_header()
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .map(|proto| proto == "https")
            .unwrap_or_else(|| session.req_header().uri.scheme_str() == Some("https"))
    }

    fn header_value(session: &PingoraSession, name: &str) -> Option<String> {
        session
            .req_header()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }

    /// Hand the page view to the sink without blocking the request path
    ///
    /// Delivery failures are logged and swallowed here; the response to the
    /// client must never depend on the analytics backend.
    pub(crate) fn dispatch_page_view(&self, page_view: PageView, request_id: &str) {
        let sink = self.sink.clone();
        let request_id = request_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(page_view).await {
                warn!("[{}] Failed to deliver page view: {}", request_id, e);
            }
        });
    }
}

/// Absolute URL the client requested, reported as the page location
pub(crate) fn page_location(is_https: bool, host: &str, path: &str, query: Option<&str>) -> String {
    let scheme = if is_https { "https" } else { "http" };
    match query {
        Some(query) => format!("{}://{}{}?{}", scheme, host, path, query),
        None => format!("{}://{}{}", scheme, host, path),
    }
}

/// Append the `client_id` cookie when this request minted a fresh identity
/// and the origin answered with a non-error status
///
/// Appending keeps any `Set-Cookie` headers the origin produced.
pub(crate) fn apply_client_cookie(
    upstream_response: &mut ResponseHeader,
    ctx: &RequestContext,
) -> Result<()> {
    if should_set_cookie(ctx.is_new_client, upstream_response.status.as_u16()) {
        if let Some(client_id) = &ctx.client_id {
            upstream_response.append_header("Set-Cookie", client_cookie(client_id))?;
        }
    }
    Ok(())
}

#[async_trait]
impl ProxyHttp for TrackingProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext {
            request_id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            method: String::new(),
            host: String::new(),
            path: String::new(),
            client_id: None,
            is_new_client: false,
            tracked: false,
            status: None,
        }
    }

    async fn request_filter(
        &self,
        session: &mut PingoraSession,
        ctx: &mut Self::CTX,
    ) -> Result<bool>
    where
        Self::CTX: Send + Sync,
    {
        ctx.start_time = Instant::now();

        // A request without a resolvable host cannot match the allow-list;
        // it is forwarded untouched rather than rejected.
        ctx.host = self.get_host_header(session).unwrap_or_default();
        ctx.method = session.req_header().method.to_string();
        ctx.path = session.req_header().uri.path().to_string();

        let user_agent = Self::header_value(session, "user-agent");

        let decision = self
            .policy
            .evaluate(&ctx.host, &ctx.path, user_agent.as_deref());
        if let TrackingDecision::Skip(reason) = decision {
            debug!(
                request_id = %ctx.request_id,
                host = %ctx.host,
                path = %ctx.path,
                reason = reason.as_str(),
                "Request not tracked"
            );
            return Ok(false);
        }
        ctx.tracked = true;

        let cookie_header = Self::header_value(session, "cookie");
        let identity = ClientIdentity::resolve(cookie_header.as_deref());
        ctx.client_id = Some(identity.id.clone());
        ctx.is_new_client = identity.is_new;

        let location = page_location(
            self.is_https_request(session),
            &ctx.host,
            &ctx.path,
            session.req_header().uri.query(),
        );
        let page_view = PageView::new(
            identity.id,
            location,
            Self::header_value(session, "referer").as_deref(),
            user_agent.as_deref(),
            Self::header_value(session, "accept-language").as_deref(),
        );

        self.dispatch_page_view(page_view, &ctx.request_id);

        Ok(false)
    }

    async fn upstream_peer(
        &self,
        session: &mut PingoraSession,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        // SNI follows the requested host so virtual-hosted origins present
        // the right certificate.
        let sni = if self.settings.upstream_tls {
            self.get_host_header(session).unwrap_or_default()
        } else {
            String::new()
        };

        debug!(
            request_id = %ctx.request_id,
            upstream = %self.settings.upstream_address,
            tls = self.settings.upstream_tls,
            "Connecting to upstream"
        );

        let peer = Box::new(HttpPeer::new(
            self.settings.upstream_address.clone(),
            self.settings.upstream_tls,
            sni,
        ));
        Ok(peer)
    }

    fn upstream_response_filter(
        &self,
        _session: &mut PingoraSession,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        ctx.status = Some(upstream_response.status.as_u16());

        // The only mutation this proxy ever applies to a response.
        apply_client_cookie(upstream_response, ctx)
    }

    async fn logging(&self, _session: &mut PingoraSession, e: Option<&Error>, ctx: &mut Self::CTX) {
        let duration_ms = ctx.start_time.elapsed().as_millis() as u64;

        if let Some(error) = e {
            error!(
                request_id = %ctx.request_id,
                method = %ctx.method,
                host = %ctx.host,
                path = %ctx.path,
                duration_ms = duration_ms,
                error = %error,
                "Request failed"
            );
        } else {
            info!(
                request_id = %ctx.request_id,
                method = %ctx.method,
                host = %ctx.host,
                path = %ctx.path,
                status = ctx.status.unwrap_or(0),
                tracked = ctx.tracked,
                duration_ms = duration_ms,
                "Request completed"
            );
        }
    }

    fn fail_to_connect(
        &self,
        _session: &mut PingoraSession,
        _peer: &HttpPeer,
        ctx: &mut Self::CTX,
        e: Box<Error>,
    ) -> Box<Error> {
        error!(
            request_id = %ctx.request_id,
            upstream = %self.settings.upstream_address,
            "Failed to connect to upstream: {:?}",
            e
        );
        e
    }
}
