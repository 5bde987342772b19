use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use revelado::{
    Config, create_app,
    auth::{ClientToken, TokenDirectory, parse_timestamp},
    startup_checks, sync,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Sync album manifests from the cloud drive
    Sync {
        /// Path to the sync job config
        #[arg(short = 'f', long, default_value = "sync.json")]
        sync_config: PathBuf,
    },

    /// Manage client tokens
    #[command(subcommand)]
    Token(TokenCommands),
}

#[derive(Subcommand, Debug)]
enum TokenCommands {
    /// List all tokens
    List {
        /// Path to the token directory file
        #[arg(short, long, default_value = "tokens.json")]
        directory: PathBuf,
    },
    /// Add a new token
    Add {
        /// Client name
        owner: String,
        /// Event category (casamento, batizado, ...)
        category: String,
        /// Albums the token unlocks
        #[arg(required = true)]
        albums: Vec<String>,
        /// Days until the token expires
        #[arg(short = 'e', long, default_value_t = 30)]
        days: i64,
        /// Use this token string instead of generating one
        #[arg(short, long)]
        token: Option<String>,
        /// Path to the token directory file
        #[arg(short, long, default_value = "tokens.json")]
        directory: PathBuf,
    },
    /// Deactivate a token (the entry is kept)
    Revoke {
        /// Token to revoke
        token: String,
        /// Path to the token directory file
        #[arg(short, long, default_value = "tokens.json")]
        directory: PathBuf,
    },
    /// Show the status of every token
    Report {
        /// Path to the token directory file
        #[arg(short, long, default_value = "tokens.json")]
        directory: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Token(token_cmd)) => handle_token_command(token_cmd).await,
        Some(Commands::Sync { sync_config }) => {
            if let Err(e) = sync::run(&sync_config).await {
                eprintln!("Sync failed: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(cli.config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(cli.config, None, None, None).await
        }
    }
}

fn generate_token() -> String {
    use rand::{Rng, rng};

    rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

async fn handle_token_command(cmd: TokenCommands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TokenCommands::List { directory } => {
            if !directory.exists() {
                println!("No token directory found at: {}", directory.display());
                return Ok(());
            }
            let db = TokenDirectory::load_from_file(&directory).await?;

            if db.is_empty() {
                println!("No tokens in directory");
            } else {
                println!("Tokens in directory:");
                let mut tokens: Vec<_> = db.tokens.iter().collect();
                tokens.sort_by(|a, b| a.1.owner.cmp(&b.1.owner));
                for (token, record) in tokens {
                    println!(
                        "  {} - {} ({}) expires {} [{}]",
                        token,
                        record.owner,
                        record.category,
                        record.expires_at,
                        if record.active { "active" } else { "revoked" }
                    );
                }
            }
        }
        TokenCommands::Add {
            owner,
            category,
            albums,
            days,
            token,
            directory,
        } => {
            let mut db = if directory.exists() {
                TokenDirectory::load_from_file(&directory).await?
            } else {
                println!("Creating new token directory at: {}", directory.display());
                TokenDirectory::new()
            };

            let token = token.unwrap_or_else(generate_token);
            if db.get(&token).is_some() {
                eprintln!("Error: Token '{}' already exists", token);
                std::process::exit(1);
            }

            let now = chrono::Utc::now();
            let record = ClientToken {
                owner: owner.trim().to_string(),
                category: category.trim().to_string(),
                legacy_album: None,
                allowed_albums: albums,
                active: true,
                created_at: now.to_rfc3339(),
                expires_at: (now + chrono::Duration::days(days)).to_rfc3339(),
                download_log: Vec::new(),
            };

            db.insert(token.clone(), record);
            db.save_to_file(&directory).await?;
            println!("Added token '{}' for '{}' ({} days)", token, owner, days);
        }
        TokenCommands::Revoke { token, directory } => {
            if !directory.exists() {
                eprintln!(
                    "Error: No token directory found at: {}",
                    directory.display()
                );
                std::process::exit(1);
            }
            let mut db = TokenDirectory::load_from_file(&directory).await?;

            if db.revoke(&token) {
                db.save_to_file(&directory).await?;
                println!("Revoked token '{}'", token);
            } else {
                eprintln!("Error: Token '{}' not found", token);
                std::process::exit(1);
            }
        }
        TokenCommands::Report { directory } => {
            if !directory.exists() {
                eprintln!(
                    "Error: No token directory found at: {}",
                    directory.display()
                );
                std::process::exit(1);
            }
            let db = TokenDirectory::load_from_file(&directory).await?;

            let now = chrono::Utc::now();
            let mut tokens: Vec<_> = db.tokens.iter().collect();
            tokens.sort_by(|a, b| a.1.owner.cmp(&b.1.owner));

            for (token, record) in tokens {
                let status = if !record.active {
                    "revoked".to_string()
                } else {
                    match parse_timestamp(&record.expires_at) {
                        Some(expires_at) if now > expires_at => "expired".to_string(),
                        Some(expires_at) => {
                            format!("{} days remaining", (expires_at - now).num_days())
                        }
                        None => "unparseable expiry".to_string(),
                    }
                };

                println!(
                    "{} - {} ({}): {}, {} downloads",
                    token,
                    record.owner,
                    record.category,
                    status,
                    record.download_log.len()
                );
            }
        }
    }

    Ok(())
}

async fn run_server(
    config_path: PathBuf,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        let config_content = std::fs::read_to_string(&config_path)?;
        toml_edit::de::from_str::<Config>(&config_content)?
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Config::default()
    };

    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Template directory: {:?}", config.templates.directory);
    info!(
        "Static files directory: {:?}",
        config.static_files.directory
    );
    info!("Token directory source: {}", config.auth.directory_source);
    info!(
        "Manifest directory: {:?}",
        config.gallery.manifest_directory
    );

    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => {}
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }
            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_app(config).await;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
