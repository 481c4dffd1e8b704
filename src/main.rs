// kb-blast - command line client for the KBase kb_blast service
//
// Runs one remote call per invocation and prints the JSON result:
// - status
// - search <flavor> (BLASTn, BLASTp, BLASTx, tBLASTn, tBLASTx, PSI-BLAST)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kb_blast_client::config::{Config, Credentials};
use kb_blast_client::{BlastParams, KbBlastClient};
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// kb-blast: run BLAST searches on the KBase kb_blast service
#[derive(Parser, Debug)]
#[command(name = "kb-blast")]
#[command(version)]
#[command(about = "Command line client for the KBase kb_blast service", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.config/kb-blast/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service endpoint URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Auth token
    #[arg(long, env = "KB_AUTH_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Auth service URL
    #[arg(long, global = true)]
    auth_url: Option<String>,

    /// Pin the service version (e.g. release, beta, dev)
    #[arg(long, global = true)]
    service_version: Option<String>,

    /// Connection/read timeout in seconds (0 disables the timeout)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Allow sending the token over plain http
    #[arg(long, global = true)]
    insecure_http: bool,

    /// Trust all TLS certificates, self-signed included
    #[arg(long, global = true)]
    trust_all_certs: bool,

    /// Stream the request body in chunks
    #[arg(long, global = true)]
    streaming: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the service status
    Status,
    /// Run a BLAST search
    Search {
        /// Search flavor
        #[arg(value_enum)]
        flavor: Flavor,

        /// JSON file holding the search parameters ("-" for stdin)
        #[arg(long, default_value = "-")]
        params: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Flavor {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
    Psiblast,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let config = apply_args(config, &args);
    config.validate()?;

    init_tracing(&config, args.verbose)?;

    let credentials = args
        .token
        .clone()
        .map(Credentials::Token)
        .unwrap_or_default();
    let client = KbBlastClient::connect(config.client_config(credentials)?)
        .await
        .context("Failed to create kb_blast client")?;

    let output = match args.command {
        Commands::Status => {
            info!("Fetching kb_blast status");
            serde_json::to_value(client.status(None).await?)?
        }
        Commands::Search { flavor, params } => {
            let params = read_params(&params)?;
            info!("Running {:?} search", flavor);
            let output = match flavor {
                Flavor::Blastn => client.blastn_search(&params, None).await?,
                Flavor::Blastp => client.blastp_search(&params, None).await?,
                Flavor::Blastx => client.blastx_search(&params, None).await?,
                Flavor::Tblastn => client.tblastn_search(&params, None).await?,
                Flavor::Tblastx => client.tblastx_search(&params, None).await?,
                Flavor::Psiblast => client.psi_blast_msa_start_search(&params, None).await?,
            };
            serde_json::to_value(output)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Command line flags take precedence over the config file
fn apply_args(mut config: Config, args: &Args) -> Config {
    if let Some(url) = &args.url {
        config.service.url = url.clone();
    }
    if let Some(auth_url) = &args.auth_url {
        config.service.auth_url = auth_url.clone();
    }
    if let Some(version) = &args.service_version {
        config.service.service_version = Some(version.clone());
    }
    if let Some(timeout) = args.timeout_secs {
        config.service.timeout_secs = Some(timeout);
    }
    config.service.insecure_http |= args.insecure_http;
    config.service.trust_all_certificates |= args.trust_all_certs;
    config.service.streaming |= args.streaming;
    config
}

fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // Logs go to stderr so stdout stays pipeable JSON
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
    Ok(())
}

fn read_params(source: &str) -> Result<BlastParams> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read search parameters from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read search parameters from {}", source))?
    };
    serde_json::from_str(&raw).context("Search parameters are not valid BLAST_Params JSON")
}
