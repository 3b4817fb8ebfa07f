use std::time::Duration;

use clap::{Parser, Subcommand};
use ncp_connection::ConnectionOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "NCP command-line client and server")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); overridden by `RUST_LOG` if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a remote NCP node and exchange fields read from stdin.
    Connect {
        /// Node hostname or address.
        host: String,

        #[arg(long, default_value_t = ncp_client::DEFAULT_PORT)]
        port: u16,

        /// Identity presented during the `LINK CCRE` handshake step.
        #[arg(long)]
        identity: String,

        #[arg(long, default_value_t = 60)]
        read_timeout_secs: u64,

        #[arg(long, default_value_t = 30)]
        send_timeout_secs: u64,
    },

    /// Accept NCP connections and echo every field back to its sender.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value_t = ncp_client::DEFAULT_PORT)]
        port: u16,

        /// Identities allowed to authenticate; empty means accept any identity.
        #[arg(long = "allow")]
        allowed_identities: Vec<String>,

        #[arg(long, default_value_t = 60)]
        read_timeout_secs: u64,

        #[arg(long, default_value_t = 30)]
        send_timeout_secs: u64,
    },
}

impl Command {
    pub fn connection_options(&self) -> ConnectionOptions {
        let (read_timeout_secs, send_timeout_secs) = match self {
            Command::Connect {
                read_timeout_secs,
                send_timeout_secs,
                ..
            }
            | Command::Serve {
                read_timeout_secs,
                send_timeout_secs,
                ..
            } => (*read_timeout_secs, *send_timeout_secs),
        };

        ConnectionOptions {
            read_timeout: Duration::from_secs(read_timeout_secs),
            send_timeout: Duration::from_secs(send_timeout_secs),
            ..ConnectionOptions::default()
        }
    }
}
