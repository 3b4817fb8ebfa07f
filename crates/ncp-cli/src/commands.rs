#![allow(clippy::print_stdout)]

use std::future::Future;
use std::pin::Pin;

use anyhow::{Context as _, Result};
use ncp_connection::{Connection, ConnectionHandler, ConnectionOptions, FieldData};
use ncp_pdu::Identifier;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

/// Reads whitespace-separated `PACKET_TYPE FIELD_NAME` lines from stdin,
/// sends each as a one-field packet, and prints whatever comes back.
///
/// A placeholder passthrough is used for the handshake response (`CIW` =
/// the server's nonce, unmodified); real deployments compute this from a
/// shared secret, which is out of this crate's scope.
pub async fn run_connect(host: &str, port: u16, identity: &str, options: ConnectionOptions) -> Result<()> {
    let connection = ncp_client::connect(host, port, identity, |nonce| nonce.to_vec(), options)
        .await
        .context("failed to connect")?;
    info!(host, port, "connected");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let mut parts = line.split_whitespace();
        let (Some(packet_type), Some(field_name)) = (parts.next(), parts.next()) else {
            warn!(%line, "expected `PACKET_TYPE FIELD_NAME`, skipping");
            continue;
        };

        let packet_type = parse_identifier(packet_type)?;
        let field_name = parse_identifier(field_name)?;

        let mut response = connection
            .send_and_recv(packet_type, vec![FieldData::new(field_name, vec![])])
            .await
            .context("send_and_recv failed")?;
        match response.next().await {
            Ok(reply) => println!("{} {}", reply.packet_type, reply.field.name),
            Err(error) => warn!(?error, "no reply"),
        }
    }

    connection.close().await;
    Ok(())
}

fn parse_identifier(text: &str) -> Result<Identifier> {
    Identifier::try_from(text).with_context(|| format!("invalid identifier {text:?}"))
}

#[derive(Clone)]
struct EchoHandler;

impl ConnectionHandler<TcpStream> for EchoHandler {
    type Future = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn handle(&self, connection: Connection<TcpStream>) -> Self::Future {
        Box::pin(async move {
            loop {
                match connection.recv().await {
                    Ok(field) => {
                        info!(packet_type = %field.packet_type, field = %field.field.name, "echoing field");
                        let reply = vec![FieldData::new(field.field.name, field.field.params.clone())];
                        if let Err(error) = connection.send_packet(field.packet_type, field.packet_id, reply).await {
                            warn!(?error, "failed to echo field");
                            return;
                        }
                    }
                    Err(error) => {
                        info!(?error, "connection ended");
                        return;
                    }
                }
            }
        })
    }
}

pub async fn run_serve(host: &str, port: u16, allowed_identities: Vec<String>, options: ConnectionOptions) -> Result<()> {
    let auth = move |identity: &str, _nonce: &[u8], _response: &[u8]| {
        allowed_identities.is_empty() || allowed_identities.iter().any(|allowed| allowed == identity)
    };

    let server = ncp_server::start_server(host, port, auth, EchoHandler, options)
        .await
        .context("failed to start server")?;
    info!(local_addr = %server.local_addr(), "serving");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");
    server.close().await;
    Ok(())
}
