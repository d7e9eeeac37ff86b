//! Biller CLI
//!
//! Command-line interface for the H2H biller API, acting as a collecting
//! agent: computes checksums and sends signed Inquiry and Payment requests.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use biller_client::{BillerClient, ClientError};
use biller_types::security::{inquiry_checksum, payment_checksum};
use biller_types::{BillerResponse, InquiryRequest, PaymentRequest};

#[derive(Parser)]
#[command(name = "biller")]
#[command(author, version, about = "H2H biller API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the biller gateway
    #[arg(long, env = "BILLER_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Shared H2H secret used to sign requests
    #[arg(long, env = "BILLER_SECRET_KEY", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a checksum without sending anything
    Checksum {
        #[command(subcommand)]
        action: ChecksumCommands,
    },
    /// Look up the outstanding bill for a payer
    Inquiry(InquiryArgs),
    /// Pay the outstanding bill for a payer
    Payment {
        #[command(flatten)]
        inquiry: InquiryArgs,
        /// Invoice being paid
        #[arg(long)]
        invoice: String,
        /// Amount in minor units
        #[arg(long)]
        amount: String,
        /// Bank journal reference
        #[arg(long)]
        journal: String,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum ChecksumCommands {
    /// sha1(payer + secret + date)
    Inquiry {
        #[arg(long)]
        payer: String,
        #[arg(long)]
        date: String,
    },
    /// sha1(payer + secret + date + amount + journal)
    Payment {
        #[arg(long)]
        payer: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        journal: String,
    },
}

#[derive(Args)]
struct InquiryArgs {
    /// Payer reference (nomorPembayaran)
    #[arg(long)]
    payer: String,
    /// Transaction date as agreed with the biller, e.g. 2024-01-10
    #[arg(long)]
    date: String,
    /// Bank transaction id
    #[arg(long)]
    transaction_id: String,
    /// Collecting agent code
    #[arg(long, default_value = "BSM")]
    bank: String,
    /// Origination channel
    #[arg(long, default_value = "TELLER")]
    channel: String,
    #[arg(long, default_value = "SPP")]
    biller: String,
    #[arg(long, default_value = "CLI")]
    terminal: String,
}

impl InquiryArgs {
    fn into_request(self) -> InquiryRequest {
        InquiryRequest {
            kode_bank: Some(self.bank),
            kode_channel: Some(self.channel),
            kode_biller: Some(self.biller),
            kode_terminal: Some(self.terminal),
            nomor_pembayaran: Some(self.payer),
            tanggal_transaksi: Some(self.date),
            id_transaksi: Some(self.transaction_id),
            checksum: None,
        }
    }
}

fn require_secret(secret: Option<String>) -> Result<String> {
    secret.ok_or_else(|| anyhow::anyhow!("--secret or BILLER_SECRET_KEY is required"))
}

/// Prints the gateway's answer; non-OK codes exit with status 1.
fn report(result: Result<BillerResponse, ClientError>) -> Result<()> {
    match result {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(ClientError::Api {
            status,
            rc,
            message,
        }) => {
            eprintln!("✗ {} (HTTP {}): {}", rc, status, message);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Health => {
            let client = BillerClient::new(&cli.api_url, "");
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Checksum { action } => {
            let secret = require_secret(cli.secret)?;
            let checksum = match action {
                ChecksumCommands::Inquiry { payer, date } => {
                    inquiry_checksum(&payer, &secret, &date)
                }
                ChecksumCommands::Payment {
                    payer,
                    date,
                    amount,
                    journal,
                } => payment_checksum(&payer, &secret, &date, &amount, &journal),
            };
            println!("{}", checksum);
        }

        Commands::Inquiry(args) => {
            let secret = require_secret(cli.secret)?;
            let client = BillerClient::new(&cli.api_url, secret).with_collecting_agent(&args.bank);
            report(client.inquiry(args.into_request()).await)?;
        }

        Commands::Payment {
            inquiry,
            invoice,
            amount,
            journal,
        } => {
            let secret = require_secret(cli.secret)?;
            let client =
                BillerClient::new(&cli.api_url, secret).with_collecting_agent(&inquiry.bank);
            let req = PaymentRequest {
                inquiry: inquiry.into_request(),
                id_tagihan: Some(invoice),
                total_nominal: Some(amount),
                nomor_jurnal_pembukuan: Some(journal),
            };
            report(client.payment(req).await)?;
        }
    }

    Ok(())
}
