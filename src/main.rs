//! studybot-server - HTTP API server and terminal chat for Study Bot.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use studybot::{
    AppState, ChatStore, ConfigBasedLLMFactory, DatabaseProvider, ProviderRegistry,
    StudyAssistant, StudyBotConfig, StudyBotConfigManager,
    api::routes::create_router,
    assistant::AssistantSettings,
    cli::{
        Cli, Commands, commands,
        init::{self, InitConfig, InitResult},
        output::Output,
        repl,
    },
    utils::toml_config::{ConfigError, LogFormat, ServerConfig},
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Terminal commands log to stderr
/// at `warn` so the conversation stays readable.
fn init_tracing(server: &ServerConfig, verbose: bool, interactive: bool) {
    let level = if verbose {
        "debug"
    } else if interactive {
        "warn"
    } else {
        server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},studybot={level},studybot_server={level},tower_http={level}"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match (server.log_format, interactive) {
        (_, true) => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        (LogFormat::Json, false) => registry.with(fmt::layer().json()).init(),
        (LogFormat::Pretty, false) => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match run(cli, &output).await {
        Ok(code) => code,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<ExitCode> {
    match cli.command {
        None | Some(Commands::Serve) => serve(&cli.config, cli.verbose, output).await,

        Some(Commands::Init {
            ref path,
            force,
            backend,
            ref host,
            port,
        }) => {
            let result = init::run(
                InitConfig {
                    path: path.clone(),
                    force,
                    backend,
                    host: host.clone(),
                    port,
                },
                output,
            );
            Ok(match result {
                InitResult::Success => ExitCode::SUCCESS,
                InitResult::AlreadyExists | InitResult::Error(_) => ExitCode::FAILURE,
            })
        }

        Some(Commands::Config { full, validate }) => {
            let Some(config) = read_config(&cli.config)? else {
                missing_config(&cli.config, output);
                return Ok(ExitCode::FAILURE);
            };
            let valid = commands::show_config(&config, &cli.config, full, validate, output);
            Ok(if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Some(Commands::Chat {
            ref user,
            no_memory,
        }) => {
            let config = config_or_default(&cli.config, output)?;
            init_tracing(&config.server, cli.verbose, true);

            let store = if no_memory {
                DatabaseProvider::Memory.create_store().await?
            } else {
                match open_store(&config, &cli.config).await {
                    Ok(store) => store,
                    Err(e) => {
                        output.warning(&format!("Could not open history store: {}", e));
                        output.warning("Falling back to an in-memory history for this session");
                        DatabaseProvider::Memory.create_store().await?
                    }
                }
            };

            let registry = ProviderRegistry::from_config(&config);
            let api_key = registry.api_key_status(&config.assistant.model);
            let mut settings = AssistantSettings::from(&config.assistant);
            if no_memory {
                settings.use_memory = false;
            }
            let assistant = StudyAssistant::new(
                store,
                Arc::new(ConfigBasedLLMFactory::from_config(&config)?),
                settings,
            );

            repl::run(assistant, user.clone(), api_key, output).await?;
            Ok(ExitCode::SUCCESS)
        }

        Some(Commands::History { ref user, limit }) => {
            let config = config_or_default(&cli.config, output)?;
            init_tracing(&config.server, cli.verbose, true);

            let assistant = StudyAssistant::new(
                open_store(&config, &cli.config).await?,
                Arc::new(ConfigBasedLLMFactory::from_config(&config)?),
                AssistantSettings::from(&config.assistant),
            );
            commands::show_history(&assistant, user, limit, output).await?;
            Ok(ExitCode::SUCCESS)
        }

        Some(Commands::Models) => {
            let config = config_or_default(&cli.config, output)?;
            init_tracing(&config.server, cli.verbose, true);

            let registry = ProviderRegistry::from_config(&config);
            commands::list_models(&registry, &config.assistant.model, output).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(config_path: &Path, verbose: bool, output: &Output) -> anyhow::Result<ExitCode> {
    let mut config_manager = match StudyBotConfigManager::new(config_path) {
        Ok(manager) => manager,
        Err(ConfigError::FileNotFound(_)) => {
            missing_config(config_path, output);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    let config = config_manager.config();

    init_tracing(&config.server, verbose, false);
    info!("Loaded configuration from {}", config_manager.path().display());

    for warning in config.validate_with_warnings()? {
        warn!(kind = ?warning.kind, "{}", warning);
    }

    if let Err(e) = config_manager.start_watching() {
        warn!("Configuration hot reload disabled: {}", e);
    }

    let store = DatabaseProvider::from_config(&config)?.create_store().await?;
    match store.ping().await {
        Ok(()) => info!(backend = store.backend_name(), "History store connected"),
        Err(e) => warn!(
            backend = store.backend_name(),
            error = %e,
            "History store unreachable, answers will not use memory until it recovers"
        ),
    }

    let config_manager = Arc::new(config_manager);
    let llm_factory = Arc::new(ConfigBasedLLMFactory::live(config_manager.clone())?);
    let state = AppState::new(config_manager.clone(), store, llm_factory);
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Study Bot API listening on http://{}", addr);
    info!("OpenAPI document at http://{}/openapi.json", addr);

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    config_manager.stop_watching();
    info!("Server stopped cleanly");
    Ok(ExitCode::SUCCESS)
}

/// Parse the config file without validating it; `None` when it does not exist
fn read_config(path: &Path) -> anyhow::Result<Option<StudyBotConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(StudyBotConfig::parse(&content)?))
}

/// The config file for terminal commands, or built-in defaults when there is none
fn config_or_default(path: &Path, output: &Output) -> anyhow::Result<StudyBotConfig> {
    match read_config(path)? {
        Some(config) => {
            if let Err(e) = config.validate() {
                output.warning(&format!("{}: {}", path.display(), e));
            }
            Ok(config)
        }
        None => {
            output.info(&format!(
                "{} not found, using built-in defaults",
                path.display()
            ));
            Ok(StudyBotConfig::default())
        }
    }
}

/// History store for terminal commands
///
/// Without a config file the store is chosen from `MONGODB_URI` and `DATABASE_PATH`.
async fn open_store(
    config: &StudyBotConfig,
    config_path: &Path,
) -> anyhow::Result<Arc<dyn ChatStore>> {
    let provider = if config_path.exists() {
        DatabaseProvider::from_config(config)?
    } else {
        DatabaseProvider::from_env()
    };
    Ok(provider.create_store().await?)
}

fn missing_config(path: &Path, output: &Output) {
    output.error(&format!("Configuration file not found: {}", path.display()));
    output.hint("Run 'studybot-server init' to create one");
}
