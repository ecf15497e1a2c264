use std::sync::Arc;

use clap::Args;
use glimpse_analytics::GaCollector;
use glimpse_core::{Settings, DEFAULT_GA_ENDPOINT, DEFAULT_LISTEN_ADDRESS};
use glimpse_proxy::{GaEventSink, PageViewSink, ProxyShutdownSignal};
use tracing::{error, info};

/// Shutdown signal implementation for Ctrl+C
struct CtrlCShutdownSignal;

impl ProxyShutdownSignal for CtrlCShutdownSignal {
    fn wait_for_signal(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c signal");
            info!("Received Ctrl+C, initiating graceful shutdown...");
        })
    }
}

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the proxy to
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS, env = "GLIMPSE_ADDRESS")]
    pub address: String,

    /// Origin server to forward requests to, as host:port
    #[arg(long, env = "GLIMPSE_UPSTREAM")]
    pub upstream: String,

    /// Connect to the origin over TLS
    #[arg(long, env = "GLIMPSE_UPSTREAM_TLS")]
    pub upstream_tls: bool,

    /// Comma-separated hostnames whose page views are tracked
    #[arg(long, env = "GLIMPSE_TRACKED_HOSTNAMES")]
    pub tracked_hostnames: String,

    /// GA4 measurement ID (G-XXXXXXX)
    #[arg(long, env = "GLIMPSE_GA_MEASUREMENT_ID")]
    pub measurement_id: String,

    /// GA4 Measurement Protocol API secret
    #[arg(long, env = "GLIMPSE_GA_API_SECRET")]
    pub api_secret: String,

    /// Base URL of the analytics collection endpoint
    #[arg(long, default_value = DEFAULT_GA_ENDPOINT, env = "GLIMPSE_GA_ENDPOINT")]
    pub ga_endpoint: String,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let settings = Arc::new(Settings::new(
            self.address,
            self.upstream,
            self.upstream_tls,
            &self.tracked_hostnames,
            self.measurement_id,
            self.api_secret,
            self.ga_endpoint,
        )?);

        info!(
            "Starting Glimpse on {} forwarding to {} (tls: {})",
            settings.listen_address, settings.upstream_address, settings.upstream_tls
        );
        info!("Tracking {} hostname(s)", settings.tracked_hostnames.len());

        let collector = GaCollector::new(
            &settings.ga_endpoint,
            settings.measurement_id.clone(),
            settings.api_secret.clone(),
        );
        let sink = Arc::new(GaEventSink::new(collector)) as Arc<dyn PageViewSink>;
        let shutdown_signal = Box::new(CtrlCShutdownSignal) as Box<dyn ProxyShutdownSignal>;

        match glimpse_proxy::setup_proxy_server(settings, sink, shutdown_signal) {
            Ok(()) => {
                info!("Proxy server exited");
                Ok(())
            }
            Err(e) => {
                error!("Failed to start proxy server: {}", e);
                Err(anyhow::anyhow!("Failed to start proxy server: {}", e))
            }
        }
    }
}
