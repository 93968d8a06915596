//! coffer-cli: command-line interface for the Coffer wallet.
//!
//! Reads wallet keys from a JSON key store and outputs from a JSON ledger
//! snapshot, reports balances, and prints unsigned transactions for an
//! external signer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use coffer_core::address::Address;
use coffer_core::ledger::MemoryLedger;
use coffer_core::types::{Hash256, Transaction};
use coffer_wallet::{ChangePolicy, FileKeyStore, PaymentRequest, Wallet, WalletConfig};

/// Coffer command-line wallet interface.
#[derive(Parser)]
#[command(name = "coffer-cli")]
#[command(version, about = "UTXO wallet accounting and unsigned transaction assembly.")]
struct Cli {
    /// Path to a TOML config file. `COFFER_*` environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List wallet addresses in creation order.
    Addrs,
    /// Generate a new address.
    NewAddress,
    /// Show the balance of one address, or of the whole wallet.
    Balance(BalanceArgs),
    /// List every address with the ledger's aggregate balance.
    List,
    /// Build an unsigned transaction.
    Send(SendArgs),
    /// Write an empty ledger snapshot.
    InitLedger(InitLedgerArgs),
    /// Apply a JSON transaction to the ledger snapshot.
    Ingest(IngestArgs),
    /// Mark a ledger transaction as confirmed.
    Confirm(ConfirmArgs),
}

#[derive(Args)]
struct BalanceArgs {
    /// Address to query (default: every wallet address).
    address: Option<String>,
}

#[derive(Args)]
struct SendArgs {
    /// Single-address payment, `ADDRESS:VALUE` in base units. Repeatable.
    #[arg(long = "pay")]
    pay: Vec<String>,

    /// Multisig payment, `M:ADDR,ADDR,...:VALUE`. Repeatable.
    #[arg(long = "multisig")]
    multisig: Vec<String>,

    /// Flat fee in base units (default: config `default_fee`).
    #[arg(short, long)]
    fee: Option<u64>,

    /// Change destination: `new`, `default`, or an address.
    #[arg(long, default_value = "default")]
    change: String,
}

#[derive(Args)]
struct InitLedgerArgs {
    /// Overwrite an existing snapshot.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct IngestArgs {
    /// Path to a JSON-encoded transaction.
    file: PathBuf,

    /// Record the transaction as pending.
    #[arg(long)]
    unconfirmed: bool,
}

#[derive(Args)]
struct ConfirmArgs {
    /// Transaction id (64 hex characters).
    txid: String,
}

/// What `send` prints.
#[derive(Serialize)]
struct SendOutput<'a> {
    txid: String,
    transaction: &'a Transaction,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WalletConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command {
        Commands::Addrs => cmd_addrs(config),
        Commands::NewAddress => cmd_new_address(config),
        Commands::Balance(args) => cmd_balance(config, args),
        Commands::List => cmd_list(config),
        Commands::Send(args) => cmd_send(config, args),
        Commands::InitLedger(args) => cmd_init_ledger(&config, args),
        Commands::Ingest(args) => cmd_ingest(&config, args),
        Commands::Confirm(args) => cmd_confirm(&config, args),
    }
}

fn cmd_addrs(config: WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;
    for address in wallet.addrs()? {
        println!("{address}");
    }
    Ok(())
}

fn cmd_new_address(config: WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;
    println!("{}", wallet.new_address()?);
    Ok(())
}

fn cmd_balance(config: WalletConfig, args: BalanceArgs) -> Result<()> {
    let wallet = open_wallet(config)?;
    match args.address {
        Some(s) => {
            let address: Address = s.parse().with_context(|| format!("Invalid address: {s}"))?;
            println!("{}", wallet.balance(&address)?);
        }
        None => println!("{}", wallet.total_balance()?),
    }
    Ok(())
}

fn cmd_list(config: WalletConfig) -> Result<()> {
    let wallet = open_wallet(config)?;
    for (address, balance) in wallet.list()? {
        println!("{address}  {balance}");
    }
    Ok(())
}

fn cmd_send(config: WalletConfig, args: SendArgs) -> Result<()> {
    let mut payments = Vec::new();
    for s in &args.pay {
        payments.push(parse_payment(s)?);
    }
    for s in &args.multisig {
        payments.push(parse_multisig(s)?);
    }
    if payments.is_empty() {
        bail!("Nothing to pay: give at least one --pay or --multisig");
    }
    let change: ChangePolicy = args
        .change
        .parse()
        .with_context(|| format!("Invalid change destination: {}", args.change))?;

    let fee = args.fee.unwrap_or(config.default_fee);
    let wallet = open_wallet(config)?;
    let Some(tx) = wallet.tx(payments, fee, change)? else {
        bail!(
            "Insufficient funds: wallet balance is {}",
            wallet.total_balance()?
        );
    };

    info!(inputs = tx.inputs.len(), outputs = tx.outputs.len(), fee, "cli: unsigned transaction built");
    let output = SendOutput {
        txid: tx.txid()?.to_string(),
        transaction: &tx,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_init_ledger(config: &WalletConfig, args: InitLedgerArgs) -> Result<()> {
    let path = &config.ledger_path;
    if path.exists() && !args.force {
        bail!("Ledger snapshot already exists: {}", path.display());
    }
    ensure_parent(path)?;
    MemoryLedger::new(config.network)
        .save(path)
        .context("Failed to write ledger snapshot")?;
    info!(path = %path.display(), network = %config.network, "cli: ledger initialised");
    println!("Ledger initialised at {}", path.display());
    Ok(())
}

fn cmd_ingest(config: &WalletConfig, args: IngestArgs) -> Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let tx: Transaction = serde_json::from_slice(&data).context("Invalid transaction JSON")?;

    let ledger = load_ledger(config)?;
    let txid = ledger.apply_transaction(&tx, !args.unconfirmed)?;
    ensure_parent(&config.ledger_path)?;
    ledger.save(&config.ledger_path).context("Failed to write ledger snapshot")?;
    info!(%txid, confirmed = !args.unconfirmed, "cli: transaction ingested");
    println!("{txid}");
    Ok(())
}

fn cmd_confirm(config: &WalletConfig, args: ConfirmArgs) -> Result<()> {
    let txid = Hash256::from_hex(&args.txid).context("Invalid txid")?;
    let ledger = load_ledger(config)?;
    ledger.confirm(&txid)?;
    ledger.save(&config.ledger_path).context("Failed to write ledger snapshot")?;
    info!(%txid, "cli: transaction confirmed");
    Ok(())
}

/// Open the key store and ledger named by `config`.
fn open_wallet(config: WalletConfig) -> Result<Wallet> {
    let ledger = Arc::new(load_ledger(&config)?);
    let keystore = FileKeyStore::open(&config.keystore_path, config.network).with_context(|| {
        format!("Failed to open key store: {}", config.keystore_path.display())
    })?;
    Ok(Wallet::new(ledger, Box::new(keystore), config))
}

/// Load the ledger snapshot, or start empty if none exists yet.
fn load_ledger(config: &WalletConfig) -> Result<MemoryLedger> {
    let path = &config.ledger_path;
    if !path.exists() {
        return Ok(MemoryLedger::new(config.network));
    }
    let ledger = MemoryLedger::load(path)
        .with_context(|| format!("Failed to load ledger snapshot: {}", path.display()))?;
    if ledger.network() != config.network {
        bail!(
            "Ledger snapshot is for {}, config says {}",
            ledger.network(),
            config.network
        );
    }
    Ok(ledger)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Parse `ADDRESS:VALUE`.
fn parse_payment(s: &str) -> Result<PaymentRequest> {
    let (addr, value) = s
        .rsplit_once(':')
        .with_context(|| format!("Expected ADDRESS:VALUE, got {s}"))?;
    let address: Address = addr.parse().with_context(|| format!("Invalid address: {addr}"))?;
    let value: u64 = value.parse().with_context(|| format!("Invalid value: {value}"))?;
    Ok(PaymentRequest::single(address, value))
}

/// Parse `M:ADDR,ADDR,...:VALUE`.
fn parse_multisig(s: &str) -> Result<PaymentRequest> {
    let mut parts = s.splitn(3, ':');
    let (Some(threshold), Some(participants), Some(value)) =
        (parts.next(), parts.next(), parts.next())
    else {
        bail!("Expected M:ADDR,ADDR,...:VALUE, got {s}");
    };
    let threshold: usize = threshold
        .parse()
        .with_context(|| format!("Invalid threshold: {threshold}"))?;
    let participants = participants
        .split(',')
        .map(|a| a.trim().parse::<Address>().with_context(|| format!("Invalid address: {a}")))
        .collect::<Result<Vec<_>>>()?;
    let value: u64 = value.parse().with_context(|| format!("Invalid value: {value}"))?;
    Ok(PaymentRequest::multisig(threshold, participants, value))
}
