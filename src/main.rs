//! A2A agent server entry point

use a2a_agent::agent::LlmAgent;
use a2a_agent::config::AgentConfig;
use a2a_agent::llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use a2a_agent::observability::logging::{init_default_logging, init_logging, LogFormat};
use a2a_agent::server::A2aServer;
use a2a_agent::task::InMemoryTaskStore;
use a2a_agent::tools::ToolSystem;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn, Level};

/// JSON-RPC task server exposing an LLM agent over A2A
#[derive(Parser)]
#[command(name = "a2a-agent")]
#[command(about = "A2A JSON-RPC task server")]
#[command(version)]
struct Cli {
    /// Configuration file path (built-in time agent when omitted)
    #[arg(short, long, value_name = "FILE", env = "A2A_CONFIG")]
    config: Option<PathBuf>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        level => init_logging(
            if level == 1 { Level::DEBUG } else { Level::TRACE },
            LogFormat::parse(&env::var("LOG_FORMAT").unwrap_or_default()),
            false,
        ),
    }

    info!("Starting a2a-agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_server(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(cli: &Cli) -> Result<AgentConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            AgentConfig::load_from_file(path)?
        }
        None => {
            info!("No configuration file given, using the built-in time agent");
            AgentConfig::default()
        }
    };

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;
    Ok(config)
}

/// Build the LLM provider named by `llm.provider`
fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, Box<dyn std::error::Error>> {
    match config.llm.provider.as_str() {
        "openai" => {
            let api_key = config.get_llm_api_key()?;
            let provider = OpenAiProvider::new(OpenAiConfig::from_section(&config.llm, api_key))?;
            Ok(Arc::new(provider))
        }
        provider => Err(format!("Unsupported LLM provider: {provider}").into()),
    }
}

async fn run_server(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = create_provider(&config)?;
    if !provider.available_models().contains(&config.llm.model) {
        warn!(
            provider = provider.name(),
            model = %config.llm.model,
            "Configured model is not in the provider's known model list"
        );
    }

    let mut tools = ToolSystem::new();
    tools.initialize(&config.tools).await?;

    let agent = LlmAgent::new(
        config.agent.name.clone(),
        config.llm.clone(),
        provider,
        Arc::new(tools),
        config.tasks.max_tool_iterations,
    );

    let server = A2aServer::new(&config, Arc::new(agent), Arc::new(InMemoryTaskStore::new()))?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
        }
    };

    server.serve(shutdown).await?;
    info!("Application shutdown complete");
    Ok(())
}

fn handle_config_command(config: &AgentConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
