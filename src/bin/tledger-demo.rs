use anyhow::Result;
use clap::Parser;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use token_ledger::{amount::to_ui_string, Identity, Ledger, LedgerConfig, LedgerRequest};
use tracing_subscriber::EnvFilter;

/// Walk through the mint flow against an in-memory ledger: create a mint,
/// open the wallet's associated account, mint into it and print the balance.
#[derive(Parser, Debug)]
#[command(name = "tledger-demo")]
struct Args {
    #[arg(long, default_value_t = 6)]
    decimals: u8,

    /// Raw amount to mint (1 token at 6 decimals by default)
    #[arg(long, default_value_t = 1_000_000)]
    amount: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let wallet = Identity::from(SigningKey::generate(&mut OsRng).verifying_key().to_bytes());
    let mint = Identity::from(SigningKey::generate(&mut OsRng).verifying_key().to_bytes());
    tracing::info!(%wallet, %mint, "generated demo identities");

    let mut ledger = Ledger::in_memory(LedgerConfig::default());
    ledger.apply(&LedgerRequest::CreateMint {
        mint,
        decimals: args.decimals,
        authority: wallet,
    })?;
    ledger.apply(&LedgerRequest::CreateAssociatedAccount {
        owner: wallet,
        mint,
    })?;
    let ata = Identity::associated_account(&wallet, &mint);

    let receipt = ledger.apply(&LedgerRequest::MintTo {
        mint,
        to: ata,
        authority: wallet,
        amount: args.amount,
    })?;
    println!("tx: {}", receipt.digest_hex());

    let balance = ledger
        .token_account(&ata)
        .map(|account| account.balance)
        .unwrap_or_default();
    println!(
        "balance: {} ({} tokens)",
        balance,
        to_ui_string(balance, args.decimals)
    );
    println!("state root: {}", hex::encode(ledger.state_root()));
    Ok(())
}
