//! The QoS handler: a `Handler` that owns the priority queue and a single
//! delivery worker (§4.4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wrp_core::{Message, QosClass, WrpError};
use wrp_queue::{PriorityQueue, QueueConfig};

use crate::handler::Handler;

/// Per-class expiries consulted at dequeue time, not by a per-item timer
/// (§4.4, and the §9 open question on how the four expiries are consulted).
#[derive(Clone, Copy, Debug)]
pub struct QosExpiries {
    pub low: Duration,
    pub medium: Duration,
    pub high: Duration,
    pub critical: Duration,
}

impl Default for QosExpiries {
    fn default() -> Self {
        Self {
            low: Duration::from_secs(60),
            medium: Duration::from_secs(60),
            high: Duration::from_secs(60),
            critical: Duration::from_secs(60),
        }
    }
}

impl QosExpiries {
    fn ttl(&self, class: QosClass) -> Duration {
        match class {
            QosClass::Low => self.low,
            QosClass::Medium => self.medium,
            QosClass::High => self.high,
            QosClass::Critical => self.critical,
        }
    }
}

/// Configuration surface for [`QosHandler`] (§6).
#[derive(Clone, Copy, Debug, Default)]
pub struct QosConfig {
    pub queue: QueueConfig,
    pub expiries: QosExpiries,
}

enum WorkerEvent {
    /// The in-flight delivery worker finished; `Some` carries the message
    /// back for re-enqueue if delivery failed.
    Finished(Option<Message>),
}

/// Owns the priority queue and the single delivery worker that drains it
/// into `next` (§4.4). `stopped -> running -> stopped`; both `start` and
/// `stop` are idempotent.
pub struct QosHandler {
    next: Arc<dyn Handler>,
    config: QosConfig,
    running: AtomicBool,
    ingress: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    cancel: Mutex<Option<CancellationToken>>,
    service_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl QosHandler {
    pub fn new(next: Arc<dyn Handler>, config: QosConfig) -> Self {
        Self {
            next,
            config,
            running: AtomicBool::new(false),
            ingress: Mutex::new(None),
            cancel: Mutex::new(None),
            service_task: Mutex::new(None),
        }
    }

    /// Spawns the single service task. A second call while already running
    /// is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let (ingress_tx, ingress_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        *self.ingress.lock().expect("ingress mutex poisoned") = Some(ingress_tx);
        *self.cancel.lock().expect("cancel mutex poisoned") = Some(cancel.clone());

        let next = Arc::clone(&self.next);
        let config = self.config;
        let handle = tokio::spawn(service_task(next, config, ingress_rx, cancel));
        *self.service_task.lock().expect("service task mutex poisoned") = Some(handle);
    }

    /// Closes the ingress channel, cancels the service task, and waits for
    /// it to exit. A second call while already stopped is a no-op.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.ingress.lock().expect("ingress mutex poisoned").take();
        if let Some(cancel) = self.cancel.lock().expect("cancel mutex poisoned").take() {
            cancel.cancel();
        }
        let handle = self.service_task.lock().expect("service task mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl Handler for QosHandler {
    /// Enqueues `msg` for delivery. Returns [`WrpError::Shutdown`] once
    /// stopped.
    async fn handle_wrp(&self, msg: Message) -> Result<(), WrpError> {
        let sender = self.ingress.lock().expect("ingress mutex poisoned").clone();
        match sender {
            Some(sender) => sender.send(msg).map_err(|_| WrpError::Shutdown),
            None => Err(WrpError::Shutdown),
        }
    }
}

async fn service_task(
    next: Arc<dyn Handler>,
    config: QosConfig,
    mut ingress: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    let mut queue = PriorityQueue::new(config.queue);
    let (worker_tx, mut worker_rx) = mpsc::unbounded_channel::<WorkerEvent>();
    let mut worker_in_flight = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            maybe_msg = ingress.recv() => {
                match maybe_msg {
                    Some(msg) => {
                        // Oversize rejection is not a service-task failure; the
                        // sender already has nothing useful to retry (§4.4).
                        let _ = queue.enqueue(msg);
                    }
                    None => return,
                }
            }
            Some(WorkerEvent::Finished(failed)) = worker_rx.recv() => {
                worker_in_flight = false;
                if let Some(msg) = failed {
                    let _ = queue.enqueue(msg);
                }
            }
        }

        if !worker_in_flight && !queue.is_empty() {
            queue.sweep_expired(|class| config.expiries.ttl(class));
            if let Some(msg) = queue.dequeue() {
                worker_in_flight = true;
                let next = Arc::clone(&next);
                let worker_tx = worker_tx.clone();
                tokio::spawn(async move {
                    let failed = match next.handle_wrp(msg.clone()).await {
                        Ok(()) => None,
                        Err(err) => {
                            log::warn!("wrp-qos: delivery failed, re-enqueuing: {err}");
                            Some(msg)
                        }
                    };
                    let _ = worker_tx.send(WorkerEvent::Finished(failed));
                });
            }
        }
    }
}
