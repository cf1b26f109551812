//! Command line client for the Mixin Computer.
//!
//! # Usage
//!
//! ```bash
//! # Is the user registered?
//! mixcomp check c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d
//!
//! # Registration payment link
//! mixcomp register c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d
//!
//! # Pay for a transfer to a program
//! mixcomp invoke --program <PUBKEY> --user <USER_ID> [--from <PUBKEY>]
//!
//! # Inspect an invoice
//! mixcomp decode MIN...
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `mixcomp.toml`)
//! - `COMPUTER_API_URL` - Override the API endpoint
//! - `MIXIN_PAY_URL` - Override the payment link base
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mixcomp::amount::Amount;
use mixcomp::invoice::Invoice;
use mixcomp_svm::builder::parse_pubkey;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use mixcomp_cli::config::{ClientConfig, DEFAULT_CONFIG_PATH};
use mixcomp_cli::error::FlowError;
use mixcomp_cli::pipeline::{InvokeRequest, Pipeline};
use mixcomp_cli::{fee, invoice, registration};

#[derive(Debug, Parser)]
#[command(name = "mixcomp", version, about = "Pay for Mixin Computer system calls")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print whether a user is registered.
    Check {
        /// Mixin user id.
        user: Uuid,
    },
    /// Print the registration payment link.
    Register {
        /// Mixin user id.
        user: Uuid,
    },
    /// Print a fee quote.
    Fee {
        /// SOL amount to quote for.
        amount: Amount,
    },
    /// Build the invoices for a program call and print their payment links.
    Invoke {
        /// Program receiving the transfer.
        #[arg(long)]
        program: String,
        /// Mixin user id of the caller.
        #[arg(long)]
        user: Uuid,
        /// Source of the transfer; defaults to the user's chain address.
        #[arg(long)]
        from: Option<String>,
    },
    /// Decode an invoice string and print it as JSON.
    Decode {
        /// Invoice string, starting with `MIN`.
        invoice: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("mixcomp failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), FlowError> {
    let config = ClientConfig::load_from(&cli.config)?;
    tracing::debug!(api_url = %config.api_url, "loaded configuration");

    match cli.command {
        Command::Check { user } => {
            let client = config.client()?;
            let registered = registration::is_registered(&client, user).await?;
            println!("{user}: {}", if registered { "registered" } else { "not registered" });
        }
        Command::Register { user } => {
            let client = config.client()?;
            if registration::is_registered(&client, user).await? {
                println!("{user} is already registered");
            } else {
                println!("{}", registration::register(&client, &config.pay_url, user).await?);
            }
        }
        Command::Fee { amount } => {
            let client = config.client()?;
            let quote = fee::get_fee(&client, amount).await?;
            println!(
                "fee_id={} xin_amount={} expires_at={}",
                quote.fee_id,
                quote.xin_amount,
                quote.expires_at(config.fee_ttl_secs)
            );
        }
        Command::Invoke {
            program,
            user,
            from,
        } => {
            let client = config.client()?;
            let mut request = InvokeRequest::new(parse_pubkey("program", &program)?, user);
            if let Some(from) = from {
                request = request.with_from(parse_pubkey("from", &from)?);
            }
            for url in Pipeline::new(&client, &config).invoke(&request).await? {
                println!("{url}");
            }
        }
        Command::Decode { invoice: text } => {
            let decoded: Invoice = text.trim().parse()?;
            println!("{:#}", invoice::describe(&decoded));
        }
    }
    Ok(())
}
