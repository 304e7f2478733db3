//! Configuration surface for the libparodus adapter (§6).

use std::time::Duration;

/// Configuration surface for [`crate::adapter::LibparodusAdapter`].
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Filesystem path to the Unix domain socket the adapter's pull listener
    /// binds to (§4.5.1 substitutes this for the nanomsg
    /// `scheme://host:port` pull URL named in the distilled spec).
    pub parodus_service_url: String,
    pub receive_timeout: Duration,
    pub send_timeout: Duration,
    pub keepalive_interval: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            parodus_service_url: String::new(),
            receive_timeout: Duration::from_secs(1),
            send_timeout: Duration::from_secs(1),
            keepalive_interval: Duration::from_secs(30),
        }
    }
}
