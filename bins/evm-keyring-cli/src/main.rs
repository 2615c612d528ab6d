//! evm-keyring — command-line front end for the encrypted EVM keyring.
//!
//! Every invocation opens the vault file, prompts for its password where
//! needed, performs one operation and exits. Chain data comes from the
//! selected preset's JSON-RPC endpoint unless `--rpc-url` overrides it.

mod rpc;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use evm_keyring::chains;
use evm_keyring::personal::message_bytes;
use evm_keyring::{
    CHAIN_PRESETS, ChainPreset, ControllerConfig, FileVaultStore, KeySource, KeyringController,
    PasswordEncryptor, RawTransactionRequest, TypedDataPayload,
};
use rpc::RpcChainProvider;
use serde_json::json;

/// Encrypted multi-chain keyring.
#[derive(Parser)]
#[command(name = "evm-keyring")]
#[command(version, about = "Encrypted keyring for EVM chains.")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Vault file (default: <data dir>/evm-keyring/vault.dat).
    #[arg(long, global = true, env = "EVM_KEYRING_VAULT")]
    vault: Option<PathBuf>,

    /// Chain preset name (see `chains`).
    #[arg(long, global = true, default_value = "ethereum")]
    chain: String,

    /// JSON-RPC endpoint overriding the preset's.
    #[arg(long, global = true, env = "EVM_KEYRING_RPC_URL")]
    rpc_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a vault with a freshly generated mnemonic.
    Create {
        /// Replace an existing vault.
        #[arg(long)]
        force: bool,
    },
    /// Create a vault from an existing mnemonic.
    Restore {
        /// Mnemonic phrase. Prompted for when omitted.
        #[arg(long)]
        phrase: Option<String>,
    },
    /// List all accounts.
    Accounts,
    /// Derive the next account of an HD keyring.
    AddAccount {
        /// Keyring position.
        #[arg(long, default_value_t = 0)]
        keyring: usize,
    },
    /// Import a raw private key.
    Import {
        /// Hex private key. Prompted for when omitted.
        #[arg(long)]
        key: Option<String>,
    },
    /// Print an account's private key.
    Export {
        /// Account address.
        address: Address,
    },
    /// Print the HD mnemonic.
    Mnemonic,
    /// Sign a transaction request (JSON file, `-` for stdin).
    SignTx {
        /// Signing account.
        #[arg(long)]
        from: Address,
        /// Request file.
        tx: PathBuf,
    },
    /// Personal-sign a message (`0x` hex is signed as raw bytes).
    SignMessage {
        /// Signing account.
        #[arg(long)]
        from: Address,
        /// Message text.
        message: String,
    },
    /// Sign EIP-712 typed data (JSON file, `-` for stdin).
    SignTyped {
        /// Signing account.
        #[arg(long)]
        from: Address,
        /// Payload file.
        payload: PathBuf,
    },
    /// Quote slow / standard / fast fees for a request.
    Fees(FeesArgs),
    /// Native balance of an address.
    Balance {
        /// Account address.
        address: Address,
    },
    /// Next nonce of an address.
    Nonce {
        /// Account address.
        address: Address,
    },
    /// List known chain presets.
    Chains,
}

#[derive(Args)]
struct FeesArgs {
    /// Request file (JSON, `-` for stdin).
    tx: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let preset = resolve_chain(&cli.global.chain)?;
    let controller = open_controller(&cli.global, preset)?;

    match cli.command {
        Commands::Create { force } => create(&controller, force),
        Commands::Restore { phrase } => restore(&controller, phrase),
        Commands::Accounts => {
            let accounts = unlock(&controller)?;
            print_json(&json!({ "accounts": accounts }))
        }
        Commands::AddAccount { keyring } => {
            unlock(&controller)?;
            let address = controller
                .add_new_account(keyring)
                .context("Failed to add account")?;
            println!("{address}");
            Ok(())
        }
        Commands::Import { key } => {
            unlock(&controller)?;
            let key = match key {
                Some(k) => k,
                None => prompt_password("Private key")?,
            };
            let address = controller.import_wallet(&key).context("Failed to import key")?;
            println!("{address}");
            Ok(())
        }
        Commands::Export { address } => {
            unlock(&controller)?;
            let key = controller.export_account(address)?;
            println!("{}", key.as_str());
            Ok(())
        }
        Commands::Mnemonic => {
            unlock(&controller)?;
            let phrase = controller.get_mnemonic()?;
            println!("{}", phrase.as_str());
            Ok(())
        }
        Commands::SignTx { from, tx } => {
            let tx: RawTransactionRequest = read_json(&tx)?;
            unlock(&controller)?;
            let signed = controller
                .sign_transaction(&tx, KeySource::Account(from))
                .context("Failed to sign transaction")?;
            print_json(&json!({
                "type": signed.tx_type,
                "hash": signed.hash,
                "raw": signed.raw_hex(),
                "v": signed.v,
                "r": signed.r,
                "s": signed.s,
            }))
        }
        Commands::SignMessage { from, message } => {
            unlock(&controller)?;
            let signature = controller.sign_personal_message(from, &message_bytes(&message))?;
            println!("{signature}");
            Ok(())
        }
        Commands::SignTyped { from, payload } => {
            let raw = read_input(&payload)?;
            let payload = TypedDataPayload::from_json(&raw)?;
            unlock(&controller)?;
            let signature = controller.sign_typed_message(from, &payload)?;
            println!("{signature}");
            Ok(())
        }
        Commands::Fees(args) => {
            let tx: RawTransactionRequest = read_json(&args.tx)?;
            let provider = connect(&cli.global, preset).await?;
            let estimate = controller.get_fees(&tx, &provider).await?;
            print_json(&estimate)
        }
        Commands::Balance { address } => {
            let provider = connect(&cli.global, preset).await?;
            let balance = controller.get_balance(address, &provider).await?;
            print_json(&json!({ "address": address, "balance": balance, "symbol": preset.symbol }))
        }
        Commands::Nonce { address } => {
            let provider = connect(&cli.global, preset).await?;
            let nonce = controller.next_nonce(address, &provider).await?;
            println!("{nonce}");
            Ok(())
        }
        Commands::Chains => {
            for p in CHAIN_PRESETS {
                println!("{:<10} {:>7}  {:<6} {:<10} {}", p.name, p.chain_id, p.symbol, p.tx_type.to_string(), p.rpc_url);
            }
            Ok(())
        }
    }
}

/// Create a vault, show the new mnemonic once.
fn create(controller: &KeyringController, force: bool) -> Result<()> {
    let password = prompt_new_password()?;
    let accounts = controller
        .create_new_vault_and_keychain_with(&password, force)
        .context("Failed to create vault")?;
    let phrase = controller.get_mnemonic()?;

    println!("\n=== VAULT CREATED ===");
    println!("Account: {}", accounts[0]);
    println!("\nMNEMONIC (BACKUP THESE WORDS):");
    println!("  {}", phrase.as_str());
    println!("\nWARNING: This phrase will NOT be shown again.");
    Ok(())
}

/// Replace the vault with one restored from a phrase.
fn restore(controller: &KeyringController, phrase: Option<String>) -> Result<()> {
    let phrase = match phrase {
        Some(p) => p,
        None => prompt_password("Mnemonic phrase")?,
    };
    let password = prompt_new_password()?;
    let accounts = controller
        .create_new_vault_and_restore(&password, &phrase)
        .context("Failed to restore vault")?;

    println!("\n=== VAULT RESTORED ===");
    println!("Account: {}", accounts[0]);
    Ok(())
}

fn unlock(controller: &KeyringController) -> Result<Vec<Address>> {
    let password = prompt_password("Vault password")?;
    controller
        .unlock(&password)
        .context("Failed to unlock vault (check password)")
}

fn open_controller(global: &GlobalArgs, preset: &ChainPreset) -> Result<KeyringController> {
    let path = resolve_vault_path(global.vault.clone())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(KeyringController::new(
        Arc::new(PasswordEncryptor::new()),
        Arc::new(FileVaultStore::new(path)),
        ControllerConfig::for_chain(preset),
    ))
}

async fn connect(global: &GlobalArgs, preset: &ChainPreset) -> Result<RpcChainProvider> {
    let url = global.rpc_url.as_deref().unwrap_or(preset.rpc_url);
    RpcChainProvider::connect(url).await
}

fn resolve_chain(name: &str) -> Result<&'static ChainPreset> {
    match chains::by_name(name) {
        Some(preset) => Ok(preset),
        None => bail!("Unknown chain '{name}' (run `evm-keyring chains` for the list)"),
    }
}

/// Resolve the vault path, using the default if not provided.
fn resolve_vault_path(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    let data = dirs::data_dir().context("Could not determine data directory")?;
    Ok(data.join("evm-keyring").join("vault.dat"))
}

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prompt for a password securely (no echo).
fn prompt_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{prompt}: ")).context("Failed to read password")
}

fn prompt_new_password() -> Result<String> {
    let password = prompt_password("New vault password")?;
    let confirm = prompt_password("Confirm password")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}
