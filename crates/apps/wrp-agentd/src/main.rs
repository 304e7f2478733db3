//! Demonstration agent daemon: wires the router, the QoS handler, the
//! handler pipeline, and the libparodus adapter together and runs them
//! until interrupted. The transport client that would carry egress traffic
//! off-device is out of scope, so egress is a stand-in that logs what it
//! would have sent.

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use wrp_core::{Locator, Message, WrpError};
use wrp_parodus::{AdapterConfig, LibparodusAdapter};
use wrp_router::{AuthorizationHandler, Handler, LoggingHandler, MissingResponseHandler, QosConfig, QosHandler, Router, RouterConfig, WILDCARD};

#[derive(Parser, Debug)]
#[command(name = "wrp-agentd")]
struct Args {
    /// This device's own locator identity, e.g. `mac:112233445566`.
    #[arg(long, default_value = "mac:000000000000")]
    self_identity: String,

    /// Unix domain socket the libparodus adapter's pull listener binds to.
    #[arg(long, default_value = "/tmp/wrp-agentd-parodus.sock")]
    parodus_socket: String,

    /// Comma-separated partner IDs authorized to exchange traffic with this
    /// agent. `*` authorizes everyone.
    #[arg(long, default_value = "*")]
    authorized_partners: String,
}

/// Stand-in for the real transport client: logs what would have gone out
/// over the websocket/QUIC connection and reports success.
struct LoggingEgress;

#[async_trait]
impl Handler for LoggingEgress {
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError> {
        log::info!(
            "egress (stand-in): source={} destination={} transaction_uuid={:?}",
            msg.source,
            msg.destination,
            msg.transaction_uuid,
        );
        Ok(())
    }
}

/// Stand-in for a locally implemented service: this demo wires no real
/// business logic, so every event falls through to the missing-response
/// handler and gets a synthesized 531.
struct NoLocalHandler;

#[async_trait]
impl Handler for NoLocalHandler {
    async fn handle_wrp(&self, _msg: Message) -> Result<(), WrpError> {
        Err(WrpError::NotHandled)
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let self_identity = match Locator::parse(&args.self_identity) {
        Ok(locator) => locator,
        Err(err) => {
            log::error!("invalid --self-identity {:?}: {err}", args.self_identity);
            std::process::exit(1);
        }
    };
    let source = self_identity.to_string();

    let allow_list: Vec<String> = args
        .authorized_partners
        .split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    let router = Arc::new(Router::new(RouterConfig::new(self_identity)));

    let egress: Arc<dyn Handler> = Arc::new(LoggingEgress);
    let qos = Arc::new(QosHandler::new(egress.clone(), QosConfig::default()));
    qos.start();
    router.subscribe_egress(qos.clone());

    let local = Arc::new(NoLocalHandler);
    let missing_response = Arc::new(MissingResponseHandler::new(local, egress.clone(), source.clone()));
    let authorization = Arc::new(AuthorizationHandler::new(allow_list, missing_response, egress, source));
    let entry: Arc<dyn Handler> = Arc::new(LoggingHandler::new(authorization));
    if let Err(err) = router.subscribe_event(WILDCARD, entry) {
        log::error!("failed to subscribe the demo handler pipeline: {err}");
        std::process::exit(1);
    }

    let adapter = Arc::new(LibparodusAdapter::new(
        Arc::clone(&router),
        AdapterConfig {
            parodus_service_url: args.parodus_socket.clone(),
            ..AdapterConfig::default()
        },
    ));
    if let Err(err) = adapter.start().await {
        log::error!("failed to start libparodus adapter on {:?}: {err}", args.parodus_socket);
        std::process::exit(1);
    }
    log::info!("wrp-agentd listening on {}", args.parodus_socket);

    let _ = tokio::signal::ctrl_c().await;

    log::info!("shutting down");
    adapter.stop().await;
    qos.stop().await;
}
