//! Server-driven `LINK` handshake, the accept-side counterpart of
//! `ncp-connector` (spec §4.3 "Handshake"):
//!
//! 1. Exchange `LINK HELO`.
//! 2. Read `LINK CCRE` carrying the client identity in `CIW`; generate a
//!    nonce and send `LINK SCAR` carrying it in `SIW`.
//! 3. Read `LINK CARE` carrying the response in `CIW`; if the caller's
//!    [`AuthPredicate`] accepts it, send `LINK SCON`, else send a field
//!    carrying `ERRC` and close.

#[macro_use]
mod macros;

use std::fmt;

use ncp_async::{Framed, FramedRead, FramedWrite};
use ncp_pdu::{Field, Identifier, Packet, ParamValue, Parameter};
use rand::RngCore as _;

pub type AcceptorResult<T> = Result<T, AcceptorError>;
pub type AcceptorError = ncp_error::Error<AcceptorErrorKind>;

const NONCE_LEN: usize = 16;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum AcceptorErrorKind {
    Network,
    Protocol { reason: &'static str },
    AuthenticationRejected,
}

impl std::error::Error for AcceptorErrorKind {}

impl fmt::Display for AcceptorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error during handshake"),
            Self::Protocol { reason } => write!(f, "protocol error during handshake: {reason}"),
            Self::AuthenticationRejected => write!(f, "client identity or response rejected"),
        }
    }
}

pub trait AcceptorErrorExt {
    fn protocol(context: &'static str, reason: &'static str) -> Self;
    fn network(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self;
}

impl AcceptorErrorExt for AcceptorError {
    fn protocol(context: &'static str, reason: &'static str) -> Self {
        Self::new(context, AcceptorErrorKind::Protocol { reason })
    }

    fn network(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(context, AcceptorErrorKind::Network).with_source(source)
    }
}

/// Validates a client's declared identity against the nonce/response pair
/// presented during `LINK CARE`. An external collaborator, same role as
/// the `auth_response` closure on the connector side.
pub trait AuthPredicate {
    fn accept(&self, identity: &str, nonce: &[u8], response: &[u8]) -> bool;
}

impl<F> AuthPredicate for F
where
    F: Fn(&str, &[u8], &[u8]) -> bool,
{
    fn accept(&self, identity: &str, nonce: &[u8], response: &[u8]) -> bool {
        self(identity, nonce, response)
    }
}

fn link_id() -> Identifier {
    Identifier::try_from("LINK").expect("LINK is a valid identifier")
}

fn field_id(name: &str) -> Identifier {
    Identifier::try_from(name).expect("caller passes a valid 1-4 char field name")
}

async fn read_link_field<S>(framed: &mut Framed<S>, expected: &str) -> AcceptorResult<Field>
where
    S: FramedRead,
{
    loop {
        let packet = framed
            .read_packet(false)
            .await
            .map_err(|e| network_err!("read_link_field", e))?;
        let Some(field) = packet.fields.into_iter().next() else {
            continue;
        };
        if field.name.as_str() == expected {
            return Ok(field);
        }
        tracing::debug!(got = %field.name, expected, "unexpected field while waiting for handshake field");
    }
}

async fn send_link_field<S>(framed: &mut Framed<S>, packet_id: u32, name: &str, params: Vec<Parameter>) -> AcceptorResult<()>
where
    S: FramedWrite,
{
    let packet = Packet::new(
        link_id(),
        packet_id,
        chrono::Utc::now(),
        [0; 4],
        vec![Field::new(field_id(name), 0, params)],
    );
    framed.write_packet(&packet).await.map_err(|e| network_err!("send_link_field", e))
}

/// Drives the server side of the NCP handshake to completion. On
/// rejection, sends a field carrying `ERRC` and returns
/// `AcceptorErrorKind::AuthenticationRejected` rather than closing the
/// stream itself — callers decide when to drop the connection.
pub async fn server_handshake<S>(framed: &mut Framed<S>, auth: &impl AuthPredicate) -> AcceptorResult<String>
where
    S: FramedRead + FramedWrite,
{
    read_link_field(framed, "HELO").await?;
    send_link_field(framed, 1, "HELO", vec![]).await?;

    let ccre = read_link_field(framed, "CCRE").await?;
    let identity = match ccre.param("CIW").map(|p| &p.value) {
        Some(ParamValue::Str(s)) => s.clone(),
        _ => return Err(protocol_err!("server_handshake", "LINK CCRE missing CIW identity")),
    };

    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    send_link_field(framed, 2, "SCAR", vec![Parameter::new(field_id("SIW"), nonce.to_vec())]).await?;

    let care = read_link_field(framed, "CARE").await?;
    let response = match care.param("CIW").map(|p| &p.value) {
        Some(ParamValue::Raw(bytes)) => bytes.clone(),
        Some(ParamValue::Str(s)) => s.as_bytes().to_vec(),
        _ => return Err(protocol_err!("server_handshake", "LINK CARE missing CIW response")),
    };

    if !auth.accept(&identity, &nonce, &response) {
        send_link_field(framed, 3, "SCON", vec![Parameter::new(field_id("ERRC"), 1i32)]).await?;
        return Err(AcceptorError::new("server_handshake", AcceptorErrorKind::AuthenticationRejected));
    }

    send_link_field(framed, 3, "SCON", vec![]).await?;
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_predicate_adapts() {
        let predicate = |identity: &str, nonce: &[u8], response: &[u8]| identity == "a" && nonce == response;
        assert!(predicate.accept("a", &[1, 2], &[1, 2]));
        assert!(!predicate.accept("a", &[1, 2], &[3, 4]));
    }
}
