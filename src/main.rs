use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};
use tracing::info;

use hello_ledger::{
    client::RecordClient,
    config::LedgerConfig,
    ledger::{LocalLedger, Transaction, TransactionReceipt},
    telemetry,
};
use record_program::{ProgramKind, Pubkey};

#[derive(Parser)]
#[command(
    name = "hello-ledger",
    version,
    about = "Run the message and greeting record programs against a local ledger file"
)]
struct Cli {
    /// Ledger snapshot to read and update.
    #[arg(long, global = true, default_value = "ledger.json")]
    ledger: PathBuf,

    /// JSON config; only used when the ledger file does not exist yet.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a fresh ed25519 secret key (hex) and print its public key.
    Keypair {
        #[arg(long)]
        out: PathBuf,
    },
    /// Credit lamports to a funding identity.
    Airdrop {
        #[arg(long)]
        to: Pubkey,
        #[arg(long)]
        lamports: Option<u64>,
    },
    /// Create a record in the slot owned by --slot-sk, funded by --payer-sk.
    Init {
        #[arg(long)]
        program: ProgramKind,
        /// 32-byte payer secret, hex.
        #[arg(long)]
        payer_sk: String,
        /// 32-byte slot secret, hex.
        #[arg(long)]
        slot_sk: String,
        #[arg(long)]
        message: String,
    },
    /// Replace a greeting and bump its counter.
    Update {
        #[arg(long, default_value = "greeting")]
        program: ProgramKind,
        #[arg(long)]
        slot: Pubkey,
        #[arg(long)]
        message: String,
    },
    /// Submit a read-only get for a slot.
    Get {
        #[arg(long)]
        program: ProgramKind,
        #[arg(long)]
        slot: Pubkey,
    },
    /// Ask a program to say hello.
    Ping {
        #[arg(long)]
        program: ProgramKind,
    },
    /// Print the decoded record in a slot as JSON.
    Show {
        #[arg(long)]
        slot: Pubkey,
    },
    /// Print the lamports held by a funding identity.
    Balance {
        #[arg(long)]
        of: Pubkey,
    },
    /// Print height, state root and account count.
    Snapshot,
}

fn parse_sk_hex(name: &str, sk_hex: &str) -> Result<SigningKey> {
    let bytes = hex::decode(sk_hex.trim()).with_context(|| format!("invalid --{name}"))?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("--{name} must be 32 bytes (64 hex chars), got {}", bytes.len()))?;
    Ok(SigningKey::from_bytes(&arr))
}

fn open_ledger(path: &Path, config: &LedgerConfig) -> Result<LocalLedger> {
    if path.exists() {
        LocalLedger::load(path).with_context(|| format!("loading ledger {}", path.display()))
    } else {
        info!(path = %path.display(), "starting a new ledger");
        Ok(LocalLedger::new(config.rent))
    }
}

fn submit(ledger: &mut LocalLedger, path: &Path, tx: Transaction) -> Result<TransactionReceipt> {
    let receipt = ledger.execute(&tx)?;
    ledger
        .save(path)
        .with_context(|| format!("saving ledger {}", path.display()))?;
    println!("tx {} confirmed at height {}", hex::encode(receipt.id), receipt.height);
    for line in &receipt.logs {
        println!("  log: {line}");
    }
    Ok(receipt)
}

fn keypair_cmd(out: &Path) -> Result<()> {
    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);
    let sk = SigningKey::from_bytes(&sk_bytes);
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(out, hex::encode(sk_bytes)).with_context(|| format!("writing {}", out.display()))?;
    println!("{}", Pubkey::from(sk.verifying_key()));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = LedgerConfig::load(cli.config.as_deref())?;
    telemetry::init_tracing(&config.log_filter);

    let path = cli.ledger.as_path();
    match cli.command {
        Command::Keypair { out } => keypair_cmd(&out)?,
        Command::Airdrop { to, lamports } => {
            let mut ledger = open_ledger(path, &config)?;
            ledger.airdrop(to, lamports.unwrap_or(config.airdrop_lamports));
            ledger
                .save(path)
                .with_context(|| format!("saving ledger {}", path.display()))?;
            println!("{} lamports", ledger.balance(&to));
        }
        Command::Init {
            program,
            payer_sk,
            slot_sk,
            message,
        } => {
            let payer = parse_sk_hex("payer-sk", &payer_sk)?;
            let slot = parse_sk_hex("slot-sk", &slot_sk)?;
            let mut ledger = open_ledger(path, &config)?;
            let tx = RecordClient::with_nonce(program, ledger.height())
                .initialize(&payer, &slot, &message)?;
            submit(&mut ledger, path, tx)?;
            println!("slot {}", Pubkey::from(slot.verifying_key()));
        }
        Command::Update {
            program,
            slot,
            message,
        } => {
            let mut ledger = open_ledger(path, &config)?;
            let tx = RecordClient::with_nonce(program, ledger.height()).update(slot, &message)?;
            submit(&mut ledger, path, tx)?;
        }
        Command::Get { program, slot } => {
            let mut ledger = open_ledger(path, &config)?;
            let tx = RecordClient::with_nonce(program, ledger.height()).get(slot)?;
            submit(&mut ledger, path, tx)?;
        }
        Command::Ping { program } => {
            let mut ledger = open_ledger(path, &config)?;
            let tx = RecordClient::with_nonce(program, ledger.height()).ping()?;
            submit(&mut ledger, path, tx)?;
        }
        Command::Show { slot } => {
            let ledger = open_ledger(path, &config)?;
            let Some(record) = ledger.fetch(&slot) else {
                bail!("slot {slot} is not initialized");
            };
            println!("{}", serde_json::to_string_pretty(&record?)?);
        }
        Command::Balance { of } => {
            let ledger = open_ledger(path, &config)?;
            println!("{}", ledger.balance(&of));
        }
        Command::Snapshot => {
            let ledger = open_ledger(path, &config)?;
            let snapshot = ledger.snapshot();
            println!("height      {}", snapshot.meta.height);
            println!("state root  {}", hex::encode(snapshot.state_root));
            println!("accounts    {}", snapshot.accounts.len());
            println!("funders     {}", snapshot.balances.len());
        }
    }
    Ok(())
}
