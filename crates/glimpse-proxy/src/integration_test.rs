#[cfg(test)]
mod tracking_flow_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::Result;
    use pingora_http::ResponseHeader;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use uuid::Uuid;

    use glimpse_analytics::PageView;
    use glimpse_core::Settings;

    use crate::eligibility::{TrackingDecision, TrackingPolicy};
    use crate::identity::ClientIdentity;
    use crate::proxy::{apply_client_cookie, page_location, RequestContext, TrackingProxy};
    use crate::services::GaEventSink;
    use crate::traits::PageViewSink;

    /// Whether a buffered HTTP/1.1 request has arrived in full (headers plus
    /// the body announced by content-length).
    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(headers_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..headers_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        raw.len() >= headers_end + 4 + content_length
    }

    /// One-shot collection endpoint answering 204 and handing the captured
    /// request bytes back on a channel.
    async fn start_collect_server() -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if request_complete(&buf) {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }

                let _ = socket
                    .write_all(
                        b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                    .await;
                let _ = socket.flush().await;
                let _ = tx.send(String::from_utf8_lossy(&buf).to_string()).await;
            }
        });

        (format!("http://{}", addr), rx)
    }

    fn settings_with_endpoint(endpoint: &str) -> Arc<Settings> {
        Arc::new(
            Settings::new(
                "127.0.0.1:8080".to_string(),
                "127.0.0.1:3000".to_string(),
                false,
                "example.com",
                "G-FLOW1".to_string(),
                "flow-secret".to_string(),
                endpoint.to_string(),
            )
            .expect("Failed to build settings"),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_page_view_tracking() -> Result<()> {
        println!("\n🚀 END-TO-END Page View Tracking Test");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        // Step 1: Start a mock collection endpoint
        println!("\n📦 Step 1: Starting mock collection endpoint");
        let (endpoint, mut collected) = start_collect_server().await;
        println!("   ✅ Listening on {}", endpoint);

        // Step 2: Build settings pointing at it
        println!("\n⚙️  Step 2: Building settings");
        let settings = settings_with_endpoint(&endpoint);
        println!("   ✅ Tracking hostname: example.com");

        // Step 3: Evaluate eligibility for a browser page load
        println!("\n🔍 Step 3: Evaluating eligibility");
        let policy = TrackingPolicy::new(settings.tracked_hostnames.clone());
        let decision = policy.evaluate(
            "example.com",
            "/pricing",
            Some("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"),
        );
        assert!(decision.is_tracked());
        println!("   ✅ GET example.com/pricing is tracked");

        // Step 4: Resolve a first-time visitor identity
        println!("\n🪪 Step 4: Resolving client identity");
        let identity = ClientIdentity::resolve(None);
        assert!(identity.is_new);
        assert!(Uuid::parse_str(&identity.id).is_ok());
        println!("   ✅ Minted client_id {}", identity.id);

        // Step 5: Compose and dispatch the page view
        println!("\n📤 Step 5: Dispatching page view");
        let location = page_location(true, "example.com", "/pricing", Some("plan=team"));
        let page_view = PageView::new(
            identity.id.clone(),
            location,
            Some("https://www.google.com/"),
            Some("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"),
            Some("en-US,en;q=0.9"),
        );

        let sink = Arc::new(GaEventSink::from_settings(&settings)) as Arc<dyn PageViewSink>;
        let proxy = TrackingProxy::new(settings.clone(), sink);
        proxy.dispatch_page_view(page_view, "req-flow-1");

        let captured = timeout(Duration::from_secs(2), collected.recv())
            .await
            .expect("collection endpoint never saw the event")
            .expect("capture channel closed");
        assert!(captured
            .starts_with("POST /mp/collect?measurement_id=G-FLOW1&api_secret=flow-secret HTTP/1.1"));

        let body = captured
            .split_once("\r\n\r\n")
            .map(|(_, body)| body)
            .expect("request should carry a body");
        let payload: serde_json::Value = serde_json::from_str(body)?;
        assert_eq!(payload["client_id"], identity.id.as_str());
        assert_eq!(payload["events"][0]["name"], "page_view");
        assert_eq!(
            payload["events"][0]["params"]["page_location"],
            "https://example.com/pricing?plan=team"
        );
        assert_eq!(
            payload["events"][0]["params"]["page_referrer"],
            "https://www.google.com/"
        );
        println!("   ✅ Event received by the collection endpoint");

        // Step 6: Stamp the identity onto the origin response
        println!("\n🍪 Step 6: Writing the client_id cookie");
        let mut response = ResponseHeader::build(200, None).expect("Failed to build response");
        let ctx = RequestContext {
            request_id: "req-flow-1".to_string(),
            start_time: Instant::now(),
            method: "GET".to_string(),
            host: "example.com".to_string(),
            path: "/pricing".to_string(),
            client_id: Some(identity.id.clone()),
            is_new_client: identity.is_new,
            tracked: true,
            status: Some(200),
        };
        apply_client_cookie(&mut response, &ctx).expect("Failed to apply cookie");

        let cookie = response
            .headers
            .get("set-cookie")
            .expect("cookie should be set")
            .to_str()
            .expect("cookie should be valid UTF-8");
        assert!(cookie.contains(&format!("client_id={}", identity.id)));
        assert!(cookie.contains("Max-Age=63072000"));
        println!("   ✅ Set-Cookie: {}", cookie);

        println!("\n✨ Tracking flow complete\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_skipped_requests_produce_no_analytics() -> Result<()> {
        let (endpoint, mut collected) = start_collect_server().await;
        let settings = settings_with_endpoint(&endpoint);
        let policy = TrackingPolicy::new(settings.tracked_hostnames.clone());
        let sink = Arc::new(GaEventSink::from_settings(&settings)) as Arc<dyn PageViewSink>;
        let proxy = TrackingProxy::new(settings.clone(), sink);

        // Crawler hit, static asset, untracked host: none may reach the sink.
        let requests = [
            ("example.com", "/pricing", Some("Googlebot/2.1")),
            ("example.com", "/assets/app.js", Some("Mozilla/5.0")),
            ("internal.example.net", "/pricing", Some("Mozilla/5.0")),
        ];

        for (host, path, user_agent) in requests {
            let decision = policy.evaluate(host, path, user_agent);
            match decision {
                TrackingDecision::Track => {
                    // Mirrors the request path: identity and dispatch only
                    // happen for tracked requests.
                    let identity = ClientIdentity::resolve(None);
                    let page_view = PageView::new(
                        identity.id,
                        page_location(false, host, path, None),
                        None,
                        user_agent,
                        None,
                    );
                    proxy.dispatch_page_view(page_view, "req-skip");
                }
                TrackingDecision::Skip(reason) => {
                    println!("   ⏭️  {}{} skipped: {}", host, path, reason.as_str());
                }
            }
        }

        let quiet = timeout(Duration::from_millis(250), collected.recv()).await;
        assert!(quiet.is_err(), "no event may reach the collection endpoint");
        Ok(())
    }
}
