//! Client-driven `LINK` handshake (spec §4.3 "Handshake"):
//!
//! 1. Exchange `LINK HELO`.
//! 2. Send `LINK CCRE` carrying the client identity in `CIW`; read `LINK SCAR`
//!    carrying a nonce in `SIW`.
//! 3. Send `LINK CARE` carrying the computed response in `CIW`; read
//!    `LINK SCON` (success) or any field carrying `ERRC` (failure).

#[macro_use]
mod macros;

use std::fmt;

use ncp_async::{Framed, FramedRead, FramedWrite};
use ncp_pdu::{field_error_code, field_error_detail, Field, Identifier, Packet, ParamValue, Parameter};
use tracing::debug;

pub type ConnectorResult<T> = Result<T, ConnectorError>;
pub type ConnectorError = ncp_error::Error<ConnectorErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ConnectorErrorKind {
    Network,
    Protocol { reason: &'static str },
    Authentication { detail: Option<String>, code: Option<u32> },
}

impl std::error::Error for ConnectorErrorKind {}

impl fmt::Display for ConnectorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error during handshake"),
            Self::Protocol { reason } => write!(f, "protocol error during handshake: {reason}"),
            Self::Authentication { detail, code } => {
                write!(f, "authentication failed")?;
                if let Some(code) = code {
                    write!(f, " (code {code})")?;
                }
                if let Some(detail) = detail {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
        }
    }
}

pub trait ConnectorErrorExt {
    fn protocol(context: &'static str, reason: &'static str) -> Self;
    fn network(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self;
}

impl ConnectorErrorExt for ConnectorError {
    fn protocol(context: &'static str, reason: &'static str) -> Self {
        Self::new(context, ConnectorErrorKind::Protocol { reason })
    }

    fn network(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(context, ConnectorErrorKind::Network).with_source(source)
    }
}

const LINK: &str = "LINK";

fn link_id() -> Identifier {
    Identifier::try_from(LINK).expect("LINK is a valid identifier")
}

fn field_id(name: &str) -> Identifier {
    Identifier::try_from(name).expect("caller passes a valid 1-4 char field name")
}

async fn read_link_field<S>(framed: &mut Framed<S>, expected: &str) -> ConnectorResult<(Packet, Field)>
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
        if field.name.as_str() != expected {
            debug!(got = %field.name, expected, "unexpected field while waiting for handshake field");
            continue;
        }
        return Ok((
            Packet {
                packet_type: packet.packet_type,
                id: packet.id,
                timestamp: packet.timestamp,
                info: packet.info,
                fields: vec![],
            },
            field,
        ));
    }
}

async fn send_link_field<S>(framed: &mut Framed<S>, packet_id: u32, name: &str, params: Vec<Parameter>) -> ConnectorResult<()>
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

/// Drives the client side of the NCP handshake to completion.
///
/// `auth_response` computes the `CIW` response bytes from the server's
/// nonce (the `SIW` parameter of `LINK SCAR`); the algorithm itself is an
/// external collaborator (spec §4.3).
pub async fn client_handshake<S>(
    framed: &mut Framed<S>,
    identity: &str,
    auth_response: impl FnOnce(&[u8]) -> Vec<u8>,
) -> ConnectorResult<()>
where
    S: FramedRead + FramedWrite,
{
    send_link_field(framed, 1, "HELO", vec![]).await?;
    read_link_field(framed, "HELO").await?;

    send_link_field(framed, 2, "CCRE", vec![Parameter::new(field_id("CIW"), identity)]).await?;
    let (_, scar) = read_link_field(framed, "SCAR").await?;
    let nonce = match scar.param("SIW").map(|p| &p.value) {
        Some(ParamValue::Raw(bytes)) => bytes.clone(),
        Some(ParamValue::Str(s)) => s.as_bytes().to_vec(),
        _ => return Err(protocol_err!("client_handshake", "LINK SCAR missing SIW nonce")),
    };

    let response = auth_response(&nonce);
    send_link_field(framed, 3, "CARE", vec![Parameter::new(field_id("CIW"), response)]).await?;

    let (_, reply) = read_any_link_field(framed).await?;
    if let Some(code) = field_error_code(&reply) {
        return Err(ConnectorError::new(
            "client_handshake",
            ConnectorErrorKind::Authentication {
                detail: field_error_detail(&reply),
                code: Some(code),
            },
        ));
    }
    if reply.name.as_str() != "SCON" {
        return Err(protocol_err!("client_handshake", "expected LINK SCON after CARE"));
    }

    Ok(())
}

async fn read_any_link_field<S>(framed: &mut Framed<S>) -> ConnectorResult<(Packet, Field)>
where
    S: FramedRead,
{
    let packet = framed
        .read_packet(false)
        .await
        .map_err(|e| network_err!("read_any_link_field", e))?;
    let field = packet
        .fields
        .first()
        .cloned()
        .ok_or_else(|| protocol_err!("read_any_link_field", "packet carried no fields"))?;
    Ok((
        Packet {
            packet_type: packet.packet_type,
            id: packet.id,
            timestamp: packet.timestamp,
            info: packet.info,
            fields: vec![],
        },
        field,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncp_pdu::ParamValue;

    #[test]
    fn identity_round_trips_through_ciw_param() {
        let p = Parameter::new(field_id("CIW"), "node-7");
        assert_eq!(p.value, ParamValue::Str("node-7".to_owned()));
    }
}
