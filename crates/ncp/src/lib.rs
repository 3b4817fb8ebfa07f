//! A meta crate re-exporting NCP crates for convenience.

#[cfg(feature = "acceptor")]
#[doc(inline)]
pub use ncp_acceptor as acceptor;

#[cfg(feature = "client")]
#[doc(inline)]
pub use ncp_client as client;

#[cfg(feature = "connection")]
#[doc(inline)]
pub use ncp_connection as connection;

#[cfg(feature = "connector")]
#[doc(inline)]
pub use ncp_connector as connector;

#[cfg(feature = "core")]
#[doc(inline)]
pub use ncp_core as core;

#[cfg(feature = "pdu")]
#[doc(inline)]
pub use ncp_pdu as pdu;

#[cfg(feature = "server")]
#[doc(inline)]
pub use ncp_server as server;
