use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use pingora::server::RunArgs;
use pingora_core::server::configuration::Opt;
use pingora_proxy::http_proxy_service;
use tracing::info;

use glimpse_core::Settings;

use crate::proxy::TrackingProxy;
use crate::traits::PageViewSink;

/// Custom shutdown signal trait that callers can implement
pub trait ProxyShutdownSignal: Send + Sync {
    /// Wait for the shutdown signal to be triggered
    fn wait_for_signal(&self) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Bridge between our custom trait and Pingora's ShutdownSignalWatch
struct ShutdownSignalBridge {
    signal: Box<dyn ProxyShutdownSignal>,
}

impl ShutdownSignalBridge {
    fn new(signal: Box<dyn ProxyShutdownSignal>) -> Self {
        Self { signal }
    }
}

#[async_trait]
impl pingora::server::ShutdownSignalWatch for ShutdownSignalBridge {
    async fn recv(&self) -> pingora::server::ShutdownSignal {
        self.signal.wait_for_signal().await;
        pingora::server::ShutdownSignal::FastShutdown
    }
}

/// Setup and run the tracking proxy server
///
/// Blocks the calling thread until the shutdown signal fires. Pingora owns
/// the runtime; callers must not invoke this from inside one.
pub fn setup_proxy_server(
    settings: Arc<Settings>,
    sink: Arc<dyn PageViewSink>,
    shutdown_signal: Box<dyn ProxyShutdownSignal>,
) -> Result<()> {
    let proxy = TrackingProxy::new(settings.clone(), sink);

    let opt = Opt {
        daemon: false,
        ..Default::default()
    };

    let mut server = pingora_core::server::Server::new(opt)?;
    server.bootstrap();

    let mut proxy_service = http_proxy_service(&server.configuration, proxy);
    proxy_service.add_tcp(&settings.listen_address);
    server.add_service(proxy_service);

    info!("Starting tracking proxy on {}", settings.listen_address);
    info!(
        "Forwarding to origin {} (tls: {})",
        settings.upstream_address, settings.upstream_tls
    );

    let run_args = RunArgs {
        shutdown_signal: Box::new(ShutdownSignalBridge::new(shutdown_signal)),
    };
    server.run(run_args);

    Ok(())
}
