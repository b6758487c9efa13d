use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use token_ledger::{
    amount::to_ui_string, Identity, Ledger, LedgerOutcome, LedgerRequest, Receipt, Record,
    RecordStore as _,
};
use tracing_subscriber::EnvFilter;

mod config;
mod state_file;
mod wallet;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "tledger", version)]
#[command(about = "Create mints and balance records, mint supply and transfer tokens")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "tledger.toml")]
    config: PathBuf,

    /// Ledger state file (overrides `state_path`)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Signer secret key file (overrides `keypair_path`)
    #[arg(short, long, global = true)]
    keypair: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an ed25519 keypair (sk.hex / pk.hex)
    Keygen {
        #[arg(long, default_value = "keys")]
        out_dir: PathBuf,
    },
    /// Create a mint; the signer becomes its mint authority
    CreateMint {
        #[arg(long)]
        decimals: u8,
        /// Mint identity, random when omitted
        #[arg(long)]
        mint: Option<Identity>,
    },
    /// Create a bootstrap balance record owned by the signer
    CreateAccount {
        /// Record identity, random when omitted
        #[arg(long)]
        account: Option<Identity>,
    },
    /// Create the empty associated balance record of (owner, mint)
    CreateAssociated {
        #[arg(long)]
        mint: Identity,
        /// Owner identity, the signer when omitted
        #[arg(long)]
        owner: Option<Identity>,
    },
    /// Mint new supply into a balance record; the signer must be the mint authority
    MintTo {
        #[arg(long)]
        mint: Identity,
        #[arg(long)]
        to: Identity,
        /// Amount in the smallest unit
        #[arg(long)]
        amount: u64,
    },
    /// Move tokens between balance records; the signer must own `from`
    Transfer {
        #[arg(long)]
        from: Identity,
        #[arg(long)]
        to: Identity,
        #[arg(long)]
        amount: u64,
    },
    /// Print a record
    Show { id: Identity },
    /// Print height, last receipt and state root
    Status,
    /// Apply a JSON array of requests in order, as given
    Replay { file: PathBuf },
}

//==================== setup ====================//

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn signer_identity(settings: &CliConfig) -> Result<Identity> {
    let sk = wallet::load_signer(&settings.keypair_path)?;
    Ok(wallet::identity_of(&sk))
}

/// Load state, apply one request, persist, report.
fn submit(settings: &CliConfig, request: LedgerRequest) -> Result<()> {
    let mut ledger = state_file::load(&settings.state_path, settings.ledger.clone())?;
    let receipt = ledger
        .apply(&request)
        .with_context(|| format!("{} rejected", request.name()))?;
    state_file::save(&settings.state_path, &ledger)?;
    report(&ledger, &receipt);
    Ok(())
}

fn report(ledger: &Ledger, receipt: &Receipt) {
    println!("tx: {}", receipt.digest_hex());
    match receipt.outcome {
        LedgerOutcome::MintCreated { mint, record } => {
            println!("mint: {mint}");
            println!("decimals: {}", record.decimals);
            println!("mint authority: {}", record.mint_authority);
        }
        LedgerOutcome::AccountCreated { account, record } => {
            println!("account: {account}");
            println!("owner: {}", record.owner);
            println!("balance: {}", display_balance(ledger, record.balance, record.mint));
        }
        LedgerOutcome::MintedTo { mint, to, minted } => {
            println!("account: {to}");
            println!("balance: {}", display_balance(ledger, minted.account.balance, Some(mint)));
            if let Some(supply) = minted.mint.supply {
                println!("supply: {}", to_ui_string(supply, minted.mint.decimals));
            }
        }
        LedgerOutcome::Transferred { from, to, moved } => {
            println!(
                "{from}: {}",
                display_balance(ledger, moved.from.balance, moved.from.mint)
            );
            println!("{to}: {}", display_balance(ledger, moved.to.balance, moved.to.mint));
        }
    }
}

fn display_balance(ledger: &Ledger, balance: u64, mint: Option<Identity>) -> String {
    match mint.and_then(|id| ledger.mint(&id)) {
        Some(mint) => format!("{balance} ({})", to_ui_string(balance, mint.decimals)),
        None => balance.to_string(),
    }
}

//==================== commands ====================//

fn keygen_cmd(out_dir: PathBuf) -> Result<()> {
    let identity = wallet::keygen(&out_dir)?;
    println!("identity: {identity}");
    println!("keypair written → {}", out_dir.display());
    Ok(())
}

fn create_mint_cmd(settings: &CliConfig, decimals: u8, mint: Option<Identity>) -> Result<()> {
    let authority = signer_identity(settings)?;
    let mint = mint.unwrap_or_else(wallet::fresh_identity);
    submit(
        settings,
        LedgerRequest::CreateMint {
            mint,
            decimals,
            authority,
        },
    )
}

fn create_account_cmd(settings: &CliConfig, account: Option<Identity>) -> Result<()> {
    let owner = signer_identity(settings)?;
    let account = account.unwrap_or_else(wallet::fresh_identity);
    submit(settings, LedgerRequest::CreateAccount { account, owner })
}

fn create_associated_cmd(
    settings: &CliConfig,
    mint: Identity,
    owner: Option<Identity>,
) -> Result<()> {
    let owner = match owner {
        Some(owner) => owner,
        None => signer_identity(settings)?,
    };
    submit(settings, LedgerRequest::CreateAssociatedAccount { owner, mint })
}

fn mint_to_cmd(settings: &CliConfig, mint: Identity, to: Identity, amount: u64) -> Result<()> {
    let authority = signer_identity(settings)?;
    submit(
        settings,
        LedgerRequest::MintTo {
            mint,
            to,
            authority,
            amount,
        },
    )
}

fn transfer_cmd(settings: &CliConfig, from: Identity, to: Identity, amount: u64) -> Result<()> {
    let owner = signer_identity(settings)?;
    submit(
        settings,
        LedgerRequest::Transfer {
            from,
            to,
            owner,
            amount,
        },
    )
}

fn show_cmd(settings: &CliConfig, id: Identity) -> Result<()> {
    let ledger = state_file::load(&settings.state_path, settings.ledger.clone())?;
    match ledger.record(&id) {
        Some(Record::Mint(mint)) => {
            println!("mint: {id}");
            println!("decimals: {}", mint.decimals);
            println!("mint authority: {}", mint.mint_authority);
            match mint.supply {
                Some(supply) => println!("supply: {}", to_ui_string(supply, mint.decimals)),
                None => println!("supply: untracked"),
            }
        }
        Some(Record::TokenAccount(account)) => {
            println!("account: {id}");
            println!("owner: {}", account.owner);
            if let Some(mint) = account.mint {
                println!("mint: {mint}");
            }
            println!("balance: {}", display_balance(&ledger, account.balance, account.mint));
        }
        None => anyhow::bail!("no record {id}"),
    }
    Ok(())
}

fn status_cmd(settings: &CliConfig) -> Result<()> {
    let ledger = state_file::load(&settings.state_path, settings.ledger.clone())?;
    let records = ledger.store().records();
    let mints = records
        .iter()
        .filter(|(_, record)| record.as_mint().is_some())
        .count();
    println!("state: {}", settings.state_path.display());
    println!("height: {}", ledger.meta().height);
    match ledger.meta().last_receipt {
        Some(digest) => println!("last receipt: {}", hex::encode(digest)),
        None => println!("last receipt: none"),
    }
    println!("state root: {}", hex::encode(ledger.state_root()));
    println!("mints: {mints}, accounts: {}", records.len() - mints);
    Ok(())
}

fn replay_cmd(settings: &CliConfig, file: PathBuf) -> Result<()> {
    let bytes = fs::read(&file).with_context(|| format!("read {}", file.display()))?;
    let requests: Vec<LedgerRequest> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse requests {}", file.display()))?;

    let mut ledger = state_file::load(&settings.state_path, settings.ledger.clone())?;
    let (mut ok, mut rejected) = (0usize, 0usize);
    for (idx, request) in requests.iter().enumerate() {
        match ledger.apply(request) {
            Ok(receipt) => {
                ok += 1;
                println!("#{idx} {}: tx {}", request.name(), receipt.digest_hex());
            }
            Err(err) => {
                rejected += 1;
                tracing::warn!(index = idx, op = request.name(), error = %err, "request rejected");
                println!("#{idx} {}: rejected ({err})", request.name());
            }
        }
    }
    state_file::save(&settings.state_path, &ledger)?;
    println!("replay summary: ok={ok}, rejected={rejected}");
    Ok(())
}

//==================== main ====================//

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = CliConfig::load(&cli.config)?.with_overrides(cli.state, cli.keypair);

    match cli.command {
        Command::Keygen { out_dir } => keygen_cmd(out_dir),
        Command::CreateMint { decimals, mint } => create_mint_cmd(&settings, decimals, mint),
        Command::CreateAccount { account } => create_account_cmd(&settings, account),
        Command::CreateAssociated { mint, owner } => create_associated_cmd(&settings, mint, owner),
        Command::MintTo { mint, to, amount } => mint_to_cmd(&settings, mint, to, amount),
        Command::Transfer { from, to, amount } => transfer_cmd(&settings, from, to, amount),
        Command::Show { id } => show_cmd(&settings, id),
        Command::Status => status_cmd(&settings),
        Command::Replay { file } => replay_cmd(&settings, file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn identities_parse_from_hex_arguments() {
        let id = "ab".repeat(32);
        let cli = Cli::try_parse_from(["tledger", "show", id.as_str()]).unwrap();
        match cli.command {
            Command::Show { id: parsed } => assert_eq!(parsed.to_string(), id),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["tledger", "show", "abcd"]).is_err());
    }

    #[test]
    fn replay_applies_requests_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let owner = Identity::new([0x42; 32]);
        let a = Identity::new([0x0a; 32]);
        let b = Identity::new([0x0b; 32]);
        let requests = vec![
            LedgerRequest::CreateAccount { account: a, owner },
            LedgerRequest::CreateAccount { account: b, owner },
            LedgerRequest::Transfer {
                from: a,
                to: b,
                owner,
                amount: 250,
            },
            LedgerRequest::Transfer {
                from: a,
                to: b,
                owner: b,
                amount: 1,
            },
        ];
        let file = dir.path().join("requests.json");
        fs::write(&file, serde_json::to_vec(&requests).unwrap()).unwrap();
        let settings = CliConfig::default()
            .with_overrides(Some(dir.path().join("ledger.json")), None);

        replay_cmd(&settings, file).unwrap();

        let ledger = state_file::load(&settings.state_path, settings.ledger.clone()).unwrap();
        assert_eq!(ledger.meta().height, 3);
        assert_eq!(ledger.token_account(&a).unwrap().balance, 750);
        assert_eq!(ledger.token_account(&b).unwrap().balance, 1_250);
    }
}
