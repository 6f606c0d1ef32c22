mod vault_commands;

use std::path::PathBuf;

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser, Debug)]
#[command(name = "ledgerlock", about = "ledgerlock: PIN-protected ledger vault", version)]
struct Cli {
    #[command(subcommand)]
    command: vault_commands::VaultCommand,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/ledgerlock/).
    #[arg(long, global = true, env = "LEDGERLOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Custom data directory (holds ledgerlock.db unless the config names a file).
    #[arg(long, global = true, env = "LEDGERLOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output stays pipeable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "ledgerlock starting");

    if let Some(ref dir) = cli.data_dir {
        ledgerlock_config::set_data_dir(dir.clone());
    }
    let config = match cli.config {
        Some(ref path) => ledgerlock_config::load_config(path)?,
        None => ledgerlock_config::discover_and_load(),
    };

    vault_commands::handle_vault(cli.command, &config).await
}
