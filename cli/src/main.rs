use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use anchor_client::solana_sdk::signature::{write_keypair_file, Keypair};
use anchor_client::solana_sdk::signer::Signer;

use ambigram::app::App;
use ambigram::portal::PortalClient;
use ambigram::wallet;
use ambigram::{
    default_cluster_rpc_url, default_config_file_path, expand_tilde, get_config_value,
    load_config_with_overrides, save_default_config, set_config_value, write_config_file,
    AmbigramConfig, AmbigramError,
};

#[derive(Debug, Parser)]
#[command(name = "ambigram", version, about = "Ambigram portal CLI")]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate the base account keypair used for one-time initialization
    Keygen(KeygenCmd),
    /// Connect the wallet and show the current state
    Connect(SessionCmd),
    /// Show connection state and the fetched list
    Status(SessionCmd),
    /// One-time initialization of the on-chain base account
    Init(SessionCmd),
    /// Submit an ambigram request
    Submit(SubmitCmd),
    /// Fetch and print the ambigram list
    List(SessionCmd),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Generate a configuration file (TOML)
    Init(ConfigInitCmd),
    /// Get current config settings
    Get(ConfigGetCmd),
    /// Set a config setting
    Set(ConfigSetCmd),
}

#[derive(Debug, Args)]
struct ConfigInitCmd {
    /// Output path for the config file. Defaults to XDG config dir.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Overwrite existing file if present
    #[arg(long = "force")]
    force: bool,
    /// Cluster shortcut: devnet|testnet|mainnet-beta|localnet
    #[arg(long = "cluster")]
    cluster: Option<String>,
    /// RPC URL (overrides cluster default)
    #[arg(long = "rpc-url")]
    rpc_url: Option<String>,
    /// Path to the wallet keypair (id.json)
    #[arg(long = "keypair")]
    keypair_path: Option<PathBuf>,
    /// Path to the base account keypair
    #[arg(long = "base-account")]
    base_account_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ConfigGetCmd {
    /// Optional config key to read. If omitted, prints full config.
    key: Option<String>,
}

#[derive(Debug, Args)]
struct ConfigSetCmd {
    /// Config key to set (cluster|rpc_url|commitment|keypair_path|base_account_path|program_id)
    key: String,
    /// Value to set
    value: String,
}

#[derive(Debug, Args)]
struct KeygenCmd {
    /// Output path for the keypair. Defaults to base_account_path from config.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Overwrite existing file if present
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Args)]
struct NodeArgs {
    /// RPC URL (overrides config and env)
    #[arg(long = "rpc-url")]
    rpc_url: Option<String>,
    /// Path to the wallet keypair (overrides config and env)
    #[arg(long = "keypair")]
    keypair_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SessionCmd {
    #[command(flatten)]
    node: NodeArgs,
}

#[derive(Debug, Args)]
struct SubmitCmd {
    /// Request text, usually a link to the rendered ambigram
    text: String,
    #[command(flatten)]
    node: NodeArgs,
}

enum PageAction {
    Render,
    Initialize,
    Submit(String),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// One CLI invocation is one page visit: reconnect the wallet, fetch, run
/// the requested action, render whatever state that left us in.
async fn run_page(cfg: AmbigramConfig, silent: bool, action: PageAction) -> Result<()> {
    let outcome = wallet::connect(&cfg, silent);
    let mut app = App::new(outcome.provider_detected);
    if let Some(session) = outcome.session {
        let portal = PortalClient::new(&cfg, &session)?;
        app.connect(session.address, portal).await;
        match action {
            PageAction::Render => {}
            PageAction::Initialize => app.initialize().await,
            PageAction::Submit(text) => app.submit(&text).await,
        }
    }
    print!("{}", app.view().render());
    Ok(())
}

fn run_config(cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Init(cmd) => {
            let mut cfg = AmbigramConfig::default();
            if let Some(cluster) = cmd.cluster.as_deref() {
                cfg.cluster = cluster.to_string();
                cfg.rpc_url = default_cluster_rpc_url(cluster);
            }
            if let Some(rpc) = cmd.rpc_url.as_deref() {
                cfg.rpc_url = rpc.to_string();
            }
            if let Some(path) = cmd.keypair_path.as_deref() {
                cfg.keypair_path = expand_tilde(path);
            }
            if let Some(path) = cmd.base_account_path.as_deref() {
                cfg.base_account_path = expand_tilde(path);
            }

            let output_path = cmd
                .output
                .as_deref()
                .map(expand_tilde)
                .unwrap_or_else(default_config_file_path);

            write_config_file(&output_path, &cfg, cmd.force)?;
            println!(
                "Wrote config to {}\ncluster={}\nrpc_url={}\nkeypair_path={}\nbase_account_path={}",
                output_path.display(),
                cfg.cluster,
                cfg.rpc_url,
                cfg.keypair_path.display(),
                cfg.base_account_path.display()
            );
            Ok(())
        }
        ConfigCommand::Get(cmd) => {
            let cfg = ambigram::read_config_file().or_else(|_| {
                let cfg = AmbigramConfig::default();
                save_default_config(&cfg).ok();
                Ok::<AmbigramConfig, anyhow::Error>(cfg)
            })?;
            if let Some(key) = cmd.key.as_deref() {
                let value = get_config_value(&cfg, key)?;
                println!("{}", value);
            } else {
                let toml_string = toml::to_string_pretty(&cfg)?;
                println!("{}", toml_string);
            }
            Ok(())
        }
        ConfigCommand::Set(cmd) => {
            let mut cfg = ambigram::read_config_file().unwrap_or_default();
            set_config_value(&mut cfg, &cmd.key, &cmd.value)?;
            save_default_config(&cfg)?;
            println!("updated {}", cmd.key);
            Ok(())
        }
    }
}

fn run_keygen(cmd: KeygenCmd) -> Result<()> {
    let cfg = load_config_with_overrides(None, None)?;
    let path = cmd.output.as_deref().map(expand_tilde).unwrap_or(cfg.base_account_path);
    if path.exists() && !cmd.force {
        return Err(AmbigramError::KeypairExists(path.display().to_string()).into());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let keypair = Keypair::new();
    write_keypair_file(&keypair, &path)
        .map_err(|e| anyhow!("write keypair at {}: {}", path.display(), e))?;
    println!("Wrote base account keypair to {}\naddress={}", path.display(), keypair.pubkey());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Config(cmd) => run_config(cmd),
        Commands::Keygen(cmd) => run_keygen(cmd),
        Commands::Connect(cmd) => {
            let config = load_config_with_overrides(cmd.node.rpc_url, cmd.node.keypair_path)?;
            run_page(config, false, PageAction::Render).await
        }
        Commands::Status(cmd) => {
            let config = load_config_with_overrides(cmd.node.rpc_url, cmd.node.keypair_path)?;
            println!(
                "cluster={} rpc_url={} commitment={}",
                config.cluster, config.rpc_url, config.commitment
            );
            run_page(config, true, PageAction::Render).await
        }
        Commands::Init(cmd) => {
            let config = load_config_with_overrides(cmd.node.rpc_url, cmd.node.keypair_path)?;
            run_page(config, true, PageAction::Initialize).await
        }
        Commands::Submit(cmd) => {
            let config = load_config_with_overrides(cmd.node.rpc_url, cmd.node.keypair_path)?;
            run_page(config, true, PageAction::Submit(cmd.text)).await
        }
        Commands::List(cmd) => {
            let config = load_config_with_overrides(cmd.node.rpc_url, cmd.node.keypair_path)?;
            run_page(config, true, PageAction::Render).await
        }
    }
}
