use {
    clap::{Parser, Subcommand},
    secrecy::Secret,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "sift", about = "Gemini File Search gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Only look for config files in this directory.
    #[arg(long, global = true)]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Serve {
        /// Override the configured bind address.
        #[arg(long)]
        bind: Option<String>,
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// List file search stores under the configured API key.
    Stores,
    /// Show the persisted store handle and registered files.
    Status,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config file path in use (or the default).
    Path,
    /// Write a default config file.
    Init,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn build_client(config: &sift_config::SiftConfig) -> anyhow::Result<sift_gemini::GeminiClient> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .ok()
        .or_else(|| config.gemini.api_key.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("GEMINI_API_KEY not set (env var or [gemini].api_key in config)")
        })?;
    let mut client = sift_gemini::GeminiClient::new(Secret::new(api_key));
    if let Some(base) = &config.gemini.base_url {
        client = client.with_base_url(base);
    }
    Ok(client)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli);
    if let Some(dir) = &cli.config_dir {
        sift_config::set_config_dir(dir.clone());
    }

    match cli.command {
        Commands::Serve { bind, port } => {
            let mut config = sift_config::discover_and_load();
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            sift_gateway::start_gateway(config).await
        },
        Commands::Stores => {
            let config = sift_config::discover_and_load();
            let client = build_client(&config)?;
            let stores = client.list_stores().await?;
            if stores.is_empty() {
                println!("no file search stores");
                return Ok(());
            }
            for store in stores {
                println!(
                    "{}  {}  {}",
                    store.name,
                    store.display_name.as_deref().unwrap_or("-"),
                    store.create_time.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        },
        Commands::Status => {
            let config = sift_config::discover_and_load();
            let registry = sift_state::StoreRegistry::load(config.uploads.state_file.clone());
            match registry.store_name() {
                Some(name) => println!("store: {name}"),
                None => println!("store: <none>"),
            }
            println!("files: {}", registry.len());
            for file in registry.files() {
                println!("  {}  {} bytes  {}", file.filename, file.size, file.uploaded_at);
            }
            Ok(())
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = sift_config::discover_and_load();
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            },
            ConfigAction::Path => {
                println!("{}", sift_config::find_or_default_config_path().display());
                Ok(())
            },
            ConfigAction::Init => {
                let path = sift_config::save_config(&sift_config::SiftConfig::default())?;
                println!("wrote {}", path.display());
                Ok(())
            },
        },
    }
}
