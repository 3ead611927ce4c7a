//! e2ee-chat - end-to-end encrypted chat between two terminals
//!
//! One side listens, the other connects. After the handshake both sides print
//! the session fingerprint; compare it out of band before trusting the channel.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use e2ee_chat::{
    ChannelBuilder, ConsoleSink, ConsoleSource, DEFAULT_MAX_FRAME_SIZE, DuplexSession, EndReason,
    Listener, QUIT_COMMAND, SecureChannel, SymmetricAlgorithm,
};

/// End-to-end encrypted chat over TCP
#[derive(Parser)]
#[command(name = "e2ee-chat")]
#[command(version)]
#[command(about = "End-to-end encrypted duplex chat over TCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    channel: ChannelArgs,
}

#[derive(Args)]
struct ChannelArgs {
    /// Message cipher; both sides must agree
    #[arg(long, global = true, default_value_t = SymmetricAlgorithm::Aes256Gcm)]
    cipher: SymmetricAlgorithm,

    /// Abort the handshake if a step stalls for this many seconds
    #[arg(long, global = true)]
    handshake_timeout: Option<u64>,

    /// Largest frame accepted from the peer, in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for one peer on a TCP port
    Listen {
        /// Port to listen on
        #[arg(short, long)]
        port: u16,
    },

    /// Connect to a listening peer
    Connect {
        /// Host name or address of the peer
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port the peer listens on
        #[arg(short, long)]
        port: u16,
    },
}

impl ChannelArgs {
    fn builder(&self) -> ChannelBuilder {
        ChannelBuilder::new()
            .with_symmetric(self.cipher)
            .with_max_frame_size(self.max_frame_size)
            .with_handshake_timeout(self.handshake_timeout.map(Duration::from_secs))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("e2ee_chat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let builder = cli.channel.builder();

    let channel = match cli.command {
        Commands::Listen { port } => {
            let listener = Listener::listen(port)
                .with_context(|| format!("Failed to listen on port {}", port))?;
            eprintln!("Waiting for a peer on port {}...", port);
            builder.accept(&listener).context("Failed to establish a secure channel")?
        }
        Commands::Connect { host, port } => builder
            .connect(&host, port)
            .with_context(|| format!("Failed to establish a secure channel with {}:{}", host, port))?,
    };

    chat(channel)
}

fn chat(channel: SecureChannel) -> Result<()> {
    eprintln!("Secure channel established ({}).", channel.cipher().algorithm());
    eprintln!("Session fingerprint: {}", channel.fingerprint_hex());
    eprintln!("Type messages and press Enter. {} or Ctrl-D ends the chat.", QUIT_COMMAND);

    let summary = DuplexSession::new(channel)
        .run(ConsoleSource::stdin(), ConsoleSink::stdout())
        .context("Failed to start the chat session")?;

    match summary.reason {
        EndReason::LocalEnd => eprintln!("Chat closed."),
        EndReason::PeerClosed => eprintln!("Peer left the chat."),
        EndReason::Failed(e) => {
            return Err(anyhow::Error::new(e).context("Chat ended with an error"));
        }
    }
    eprintln!(
        "{} sent, {} received, {} dropped",
        summary.sent, summary.received, summary.decrypt_failures
    );

    Ok(())
}
