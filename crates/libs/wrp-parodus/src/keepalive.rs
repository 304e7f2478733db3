//! Per-registration keepalive task (§4.5): sends the authorization-accepted
//! ack on dial, then a `ServiceAlive` ping every `heartbeat_interval` until
//! cancellation or a send failure, at which point it tears the registration
//! down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::registration::{authorization_accepted_ack, service_alive_ping, Registration};

pub fn spawn_keepalive(registration: Arc<Registration>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let ack = authorization_accepted_ack(&registration.service_name);
        if let Err(err) = registration.send(&ack).await {
            log::warn!("wrp-parodus: {}: authorization ack failed: {err}", registration.service_name);
            registration.cancel().await;
            return;
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(registration.heartbeat_interval) => {
                    let ping = service_alive_ping(&registration.service_name);
                    if let Err(err) = registration.send(&ping).await {
                        log::warn!("wrp-parodus: {}: keepalive send failed: {err}", registration.service_name);
                        registration.cancel().await;
                        return;
                    }
                }
            }
        }
    })
}
