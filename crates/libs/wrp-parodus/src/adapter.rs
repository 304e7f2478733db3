//! The libparodus adapter (§4.5): listens on a pull socket, accepts service
//! registrations, and proxies WRP between the router and locally connected
//! services.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wrp_core::{Locator, Message, MessageType, WrpError};
use wrp_router::{Handler, Router};

use crate::config::AdapterConfig;
use crate::framing;
use crate::keepalive::spawn_keepalive;
use crate::registration::Registration;

type RegistrationMap = Arc<Mutex<HashMap<String, Arc<Registration>>>>;

/// Owns the pull listener and the `name -> registration` map (§3). `Start`
/// and `Stop` are both idempotent.
pub struct LibparodusAdapter {
    router: Arc<Router>,
    config: AdapterConfig,
    registrations: RegistrationMap,
    running: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl LibparodusAdapter {
    pub fn new(router: Arc<Router>, config: AdapterConfig) -> Self {
        Self {
            router,
            config,
            registrations: Arc::new(Mutex::new(HashMap::new())),
            running: AtomicBool::new(false),
            cancel: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Binds the pull listener and spawns the accept loop and the single
    /// receive/dispatch task. A bind failure is fatal and prevents `start`
    /// from succeeding (§7); a second call while running is a no-op.
    pub async fn start(self: &Arc<Self>) -> Result<(), WrpError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let path = Path::new(&self.config.parodus_service_url);
        let _ = std::fs::remove_file(path);
        let listener = match UnixListener::bind(path) {
            Ok(listener) => listener,
            Err(err) => {
                self.running.store(false, Ordering::Release);
                return Err(err.into());
            }
        };

        let cancel = CancellationToken::new();
        *self.cancel.lock().expect("cancel mutex poisoned") = Some(cancel.clone());

        let (pull_tx, pull_rx) = mpsc::unbounded_channel();
        let accept_task = tokio::spawn(accept_loop(listener, pull_tx, cancel.clone()));

        let this = Arc::clone(self);
        let dispatch_task = tokio::spawn(async move { this.dispatch_loop(pull_rx, cancel).await });

        let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
        tasks.push(accept_task);
        tasks.push(dispatch_task);
        Ok(())
    }

    /// Cancels the receive task, cancels every registration, and waits for
    /// all tasks to exit. A second call while stopped is a no-op.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(cancel) = self.cancel.lock().expect("cancel mutex poisoned").take() {
            cancel.cancel();
        }

        let registrations: Vec<Arc<Registration>> = {
            let mut map = self.registrations.lock().expect("registrations mutex poisoned");
            map.drain().map(|(_, reg)| reg).collect()
        };
        for registration in registrations {
            registration.cancel().await;
        }

        let tasks: Vec<_> = self.tasks.lock().expect("tasks mutex poisoned").drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }

        let _ = std::fs::remove_file(&self.config.parodus_service_url);
    }

    async fn dispatch_loop(self: Arc<Self>, mut pull_rx: mpsc::UnboundedReceiver<Message>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                received = tokio::time::timeout(self.config.receive_timeout, pull_rx.recv()) => {
                    match received {
                        Ok(Some(msg)) => self.dispatch(msg).await,
                        Ok(None) => return,
                        Err(_elapsed) => continue,
                    }
                }
            }
        }
    }

    async fn dispatch(&self, msg: Message) {
        match msg.message_type {
            MessageType::ServiceRegistration => self.register_service(msg).await,
            MessageType::Invalid0 | MessageType::Invalid1 | MessageType::ServiceAlive => {}
            _ => {
                let source_service = Locator::parse(&msg.source).ok().and_then(|loc| loc.service);
                if let Err(err) = self.router.handle_wrp(msg.clone()).await {
                    log::debug!("wrp-parodus: router did not handle message: {err}");
                }
                if let Some(service) = source_service {
                    if let Err(err) = self.forward_to_service(&service, msg).await {
                        log::debug!("wrp-parodus: forward to service '{service}' failed: {err}");
                    }
                }
            }
        }
    }

    async fn forward_to_service(&self, service: &str, msg: Message) -> Result<(), WrpError> {
        let registration = self.registrations.lock().expect("registrations mutex poisoned").get(service).cloned();
        match registration {
            Some(registration) => registration.send(&msg).await,
            None => Err(WrpError::NoService),
        }
    }

    /// Installs a registration for `msg.service_name`, replacing any
    /// existing one for that name (§9 open question: replace, not reject).
    async fn register_service(&self, msg: Message) {
        let (Some(service_name), Some(url)) = (msg.service_name.clone(), msg.url.clone()) else {
            log::warn!("wrp-parodus: service registration missing service_name/url, dropping");
            return;
        };

        let previous = self.registrations.lock().expect("registrations mutex poisoned").remove(&service_name);
        if let Some(previous) = previous {
            previous.cancel().await;
        }

        let stream = match UnixStream::connect(&url).await {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("wrp-parodus: failed to dial push socket for '{service_name}' at {url}: {err}");
                return;
            }
        };
        let (_read_half, write_half) = stream.into_split();

        let registration = Registration::new(
            service_name.clone(),
            write_half,
            self.config.send_timeout,
            self.config.keepalive_interval,
        );

        let route_cancel = match self.router.subscribe_service(&service_name, Arc::clone(&registration) as Arc<dyn Handler>) {
            Ok(route_cancel) => route_cancel,
            Err(err) => {
                log::warn!("wrp-parodus: cannot subscribe '{service_name}': {err}");
                return;
            }
        };
        registration.attach_route_cancel(route_cancel).await;

        self.registrations
            .lock()
            .expect("registrations mutex poisoned")
            .insert(service_name.clone(), Arc::clone(&registration));

        let cancel_token = registration.cancellation_token();
        spawn_keepalive(Arc::clone(&registration), cancel_token.clone());
        spawn_cleanup_on_cancel(Arc::clone(&self.registrations), service_name, registration, cancel_token);
    }
}

/// Removes a registration from the map once it has been cancelled (by
/// keepalive failure, explicit replacement, or adapter shutdown), as long as
/// it hasn't already been replaced by a newer registration of the same name.
fn spawn_cleanup_on_cancel(
    registrations: RegistrationMap,
    service_name: String,
    registration: Arc<Registration>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        cancel.cancelled().await;
        let mut map = registrations.lock().expect("registrations mutex poisoned");
        if let Some(current) = map.get(&service_name) {
            if Arc::ptr_eq(current, &registration) {
                map.remove(&service_name);
            }
        }
    });
}

async fn accept_loop(listener: UnixListener, pull_tx: mpsc::UnboundedSender<Message>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let pull_tx = pull_tx.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(read_connection(stream, pull_tx, cancel));
                    }
                    Err(err) => log::warn!("wrp-parodus: accept failed: {err}"),
                }
            }
        }
    }
}

async fn read_connection(stream: UnixStream, pull_tx: mpsc::UnboundedSender<Message>, cancel: CancellationToken) {
    let (mut read_half, _write_half) = stream.into_split();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            decoded = framing::read_message(&mut read_half) => {
                match decoded {
                    Ok(msg) => {
                        if pull_tx.send(msg).is_err() {
                            return;
                        }
                    }
                    Err(_err) => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wrp_core::Locator;
    use wrp_router::RouterConfig;

    async fn connect_retrying(path: &Path) -> UnixStream {
        for _ in 0..50 {
            if let Ok(stream) = UnixStream::connect(path).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("could not connect to {path:?}");
    }

    #[tokio::test]
    async fn registration_ack_keepalive_and_forward() {
        // Scenario 5 (§8): a service registers, receives an ack and
        // periodic keepalives, and receives a message published into the
        // router addressed to it.
        let _ = env_logger::try_init();
        let dir = tempfile::tempdir().expect("tempdir");
        let pull_path = dir.path().join("parodus.sock");
        let service_push_path = dir.path().join("test-service.sock");

        let self_identity = Locator::parse("mac:112233445566").expect("parse");
        let router = Arc::new(Router::new(RouterConfig::new(self_identity)));

        let config = AdapterConfig {
            parodus_service_url: pull_path.to_string_lossy().into_owned(),
            receive_timeout: Duration::from_millis(50),
            send_timeout: Duration::from_millis(500),
            keepalive_interval: Duration::from_millis(100),
        };
        let adapter = Arc::new(LibparodusAdapter::new(Arc::clone(&router), config));
        adapter.start().await.expect("start adapter");

        let service_listener = UnixListener::bind(&service_push_path).expect("bind service push listener");

        let client = connect_retrying(&pull_path).await;
        let (_client_read, mut client_write) = client.into_split();

        let mut registration = Message::new(MessageType::ServiceRegistration, "mac:112233445566/test", "self:/parodus");
        registration.service_name = Some("test".to_string());
        registration.url = Some(service_push_path.to_string_lossy().into_owned());
        framing::write_message(&mut client_write, &registration).await.expect("send registration");

        let (push_stream, _addr) = tokio::time::timeout(Duration::from_secs(1), service_listener.accept())
            .await
            .expect("accept within deadline")
            .expect("accept push connection");
        let (mut push_read, _push_write) = push_stream.into_split();

        let ack = tokio::time::timeout(Duration::from_secs(1), framing::read_message(&mut push_read))
            .await
            .expect("ack within deadline")
            .expect("decode ack");
        assert!(matches!(ack.message_type, MessageType::Authorization));
        assert_eq!(ack.status, Some(200));

        let ping = tokio::time::timeout(Duration::from_secs(1), framing::read_message(&mut push_read))
            .await
            .expect("ping within deadline")
            .expect("decode ping");
        assert!(matches!(ping.message_type, MessageType::ServiceAlive));

        let routed = Message::new(MessageType::SimpleEvent, "mac:112233445566/eventer", "mac:112233445566/test");
        router.handle_wrp(routed).await.expect("routed to registration");

        let forwarded = tokio::time::timeout(Duration::from_secs(1), framing::read_message(&mut push_read))
            .await
            .expect("forwarded within deadline")
            .expect("decode forwarded");
        assert_eq!(forwarded.destination, "mac:112233445566/test");

        adapter.stop().await;
    }

    #[tokio::test]
    async fn second_registration_replaces_the_first() {
        let _ = env_logger::try_init();
        let dir = tempfile::tempdir().expect("tempdir");
        let pull_path = dir.path().join("parodus.sock");
        let first_push_path = dir.path().join("first.sock");
        let second_push_path = dir.path().join("second.sock");

        let self_identity = Locator::parse("mac:112233445566").expect("parse");
        let router = Arc::new(Router::new(RouterConfig::new(self_identity)));
        let config = AdapterConfig {
            parodus_service_url: pull_path.to_string_lossy().into_owned(),
            receive_timeout: Duration::from_millis(50),
            send_timeout: Duration::from_millis(500),
            keepalive_interval: Duration::from_secs(60),
        };
        let adapter = Arc::new(LibparodusAdapter::new(Arc::clone(&router), config));
        adapter.start().await.expect("start adapter");

        let first_listener = UnixListener::bind(&first_push_path).expect("bind first");
        let second_listener = UnixListener::bind(&second_push_path).expect("bind second");

        let client = connect_retrying(&pull_path).await;
        let (_client_read, mut client_write) = client.into_split();

        for push_path in [&first_push_path, &second_push_path] {
            let mut registration =
                Message::new(MessageType::ServiceRegistration, "mac:112233445566/test", "self:/parodus");
            registration.service_name = Some("test".to_string());
            registration.url = Some(push_path.to_string_lossy().into_owned());
            framing::write_message(&mut client_write, &registration).await.expect("send registration");
        }

        let (first_push, _) = tokio::time::timeout(Duration::from_secs(1), first_listener.accept())
            .await
            .expect("accept first within deadline")
            .expect("accept first push connection");
        let (second_push, _) = tokio::time::timeout(Duration::from_secs(1), second_listener.accept())
            .await
            .expect("accept second within deadline")
            .expect("accept second push connection");

        let (mut first_read, _first_write) = first_push.into_split();
        let (mut second_read, _second_write) = second_push.into_split();

        tokio::time::timeout(Duration::from_secs(1), framing::read_message(&mut first_read))
            .await
            .expect("first ack within deadline")
            .expect("decode first ack");
        tokio::time::timeout(Duration::from_secs(1), framing::read_message(&mut second_read))
            .await
            .expect("second ack within deadline")
            .expect("decode second ack");

        assert_eq!(adapter.registrations.lock().expect("lock").len(), 1, "only the newest registration remains");

        adapter.stop().await;
    }
}
