use std::time::Duration;

/// Recognized connection-level options (spec §4.4).
#[derive(Clone, Debug)]
pub struct ConnectionOptions {
    /// Used in log messages and the handshake `CIW` field.
    pub remote_hostname: Option<String>,
    /// Seconds before a silent connection is declared dead.
    pub read_timeout: Duration,
    /// Seconds an outgoing write may block.
    pub send_timeout: Duration,
    /// Whether `connect` performs the authentication exchange.
    pub auto_auth: bool,
    /// Whether the server sends the initial `LINK HELO`.
    pub auto_link: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            remote_hostname: None,
            read_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(30),
            auto_auth: true,
            auto_link: true,
        }
    }
}

pub type ServerOptions = ConnectionOptions;
