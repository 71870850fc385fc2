use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaa_events::admin::{commands, AdminEndpoint};
use vaa_events::error::Result;

#[derive(Parser)]
#[command(name = "guardian-admin", version, about = "Guardian node admin commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConnectArgs {
    /// Admin server socket to connect to
    #[arg(long, value_name = "PATH")]
    socket: PathBuf,

    /// Upper bound for the whole RPC exchange, in seconds
    #[arg(long, default_value_t = 5, value_name = "SECS")]
    timeout_secs: u64,
}

impl ConnectArgs {
    fn endpoint(&self) -> AdminEndpoint {
        AdminEndpoint::new(&self.socket).with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Inject and sign a governance VAA from a TOML request file
    GovernanceVaaInject {
        #[command(flatten)]
        connect: ConnectArgs,
        filename: PathBuf,
    },

    /// Find sequence number gaps for the given chain ID and emitter address
    FindMissingMessages {
        #[command(flatten)]
        connect: ConnectArgs,
        chain_id: String,
        emitter_address_hex: String,
    },

    /// Retrieve a VAA by message ID (chain/emitter/seq) and decode and dump it
    DumpVaaByMessageId {
        #[command(flatten)]
        connect: ConnectArgs,
        message_id: String,
    },
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::GovernanceVaaInject { connect, filename } => {
            commands::inject_governance_vaa(&connect.endpoint(), &filename).await?;
        }
        Command::FindMissingMessages {
            connect,
            chain_id,
            emitter_address_hex,
        } => {
            let report =
                commands::find_missing_messages(&connect.endpoint(), &chain_id, &emitter_address_hex)
                    .await?;
            for id in &report.missing_messages {
                println!("{id}");
            }
        }
        Command::DumpVaaByMessageId {
            connect,
            message_id,
        } => {
            let dump = commands::dump_vaa_by_message_id(&connect.endpoint(), &message_id).await?;
            println!("Bytes:\n{}", dump.hex_bytes());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
