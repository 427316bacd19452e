use clap::{Parser, ValueEnum};
use mixpool_core::domain::{MessageSigner, OutPoint};
use mixpool_core::infrastructure::config::IdentityConfig;
use mixpool_core::infrastructure::crypto::{pubkey_hash, Secp256k1MessageSigner};
use mixpool_core::infrastructure::logging::init_logger;
use mixpool_core::{MixError, Result};
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Toml,
}

#[derive(Parser, Debug)]
#[command(name = "mixpool-keygen")]
#[command(about = "Generate coordinator signing keys for a mixing pool", long_about = None)]
struct Args {
    /// Number of key pairs to generate.
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Collateral outpoint (`txid:index`) to register the first key under.
    #[arg(long)]
    collateral: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[arg(long, default_value = "warn")]
    log_filters: String,
}

#[derive(Serialize)]
struct KeyOut {
    secret_key_hex: String,
    public_key_hex: String,
    pubkey_hash_hex: String,
}

#[derive(Serialize)]
struct Output {
    keys: Vec<KeyOut>,
    /// Ready to paste as the `[identity]` section of `mixpool.toml`.
    identity: IdentityConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(None, &args.log_filters)?;
    if args.count == 0 {
        return Err(MixError::ConfigError("--count must be at least 1".to_string()));
    }
    let collateral = args.collateral.as_deref().map(str::parse::<OutPoint>).transpose()?;

    let signers: Vec<Secp256k1MessageSigner> = (0..args.count).map(|_| Secp256k1MessageSigner::generate()).collect();
    let keys = signers
        .iter()
        .map(|signer| {
            let public_key = signer.public_key();
            KeyOut {
                secret_key_hex: signer.secret_hex(),
                public_key_hex: hex::encode(&public_key),
                pubkey_hash_hex: hex::encode(pubkey_hash(&public_key)),
            }
        })
        .collect::<Vec<_>>();
    let identity = IdentityConfig {
        secret_key_hex: keys.first().map(|key| key.secret_key_hex.clone()),
        collateral_outpoint: collateral.map(|outpoint| outpoint.to_string()),
    };
    let output = Output { keys, identity };

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&output)?,
        OutputFormat::Toml => toml::to_string_pretty(&output)?,
    };
    println!("{rendered}");
    Ok(())
}
