//! roleguard
//!
//! Serves an application behind the role-based security filter, or checks
//! how a path would be decided under the loaded configuration.

use clap::{Parser, Subcommand};
use roleguard::{
    access_control::{Principal, SecurityConfigurationBuilder},
    config::{AppConfig, LogFormat, load_config},
    server::{AppState, HttpConfig, build_router, run_http_blocking},
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// roleguard - Role-based URL protection with form login
#[derive(Parser, Debug)]
#[command(name = "roleguard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ROLEGUARD_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "ROLEGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the protected application (default)
    Serve {
        /// HTTP server host
        #[arg(long, env = "ROLEGUARD_HTTP_HOST")]
        host: Option<String>,

        /// HTTP server port
        #[arg(long, env = "ROLEGUARD_HTTP_PORT")]
        port: Option<u16>,
    },

    /// Print the access decision for a path
    Check {
        /// Servlet path to evaluate, relative to the context path
        #[arg(long)]
        path: String,

        /// Role held by the principal (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Evaluate without a principal
        #[arg(long, conflicts_with = "roles")]
        anonymous: bool,

        /// Principal identifier
        #[arg(long, default_value = "cli")]
        user: String,
    },
}

fn init_logging(config: &AppConfig, level: Option<&str>) {
    let level = level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (pretty, json) = match config.logging.format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(pretty)
        .with(json)
        .with(filter)
        .init();
}

fn check(config: &AppConfig, path: &str, principal: Option<Principal>) -> anyhow::Result<()> {
    let security = SecurityConfigurationBuilder::from_config(config).build()?;
    let decision = security.evaluator.evaluate(path, principal.as_ref());

    match security.evaluator.governing_rule(path) {
        Some(rule) => println!("{} -> {} (rule {})", path, decision, rule.pattern),
        None => println!("{} -> {} (no rule)", path, decision),
    }

    Ok(())
}

async fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config)
        .inspect_err(|e| error!(error = %e, "Failed to initialize security filter"))?;

    let http_config = HttpConfig::from_server_config(&config.server)?;
    run_http_blocking(build_router(state), http_config).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration; logging settings live in it
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    init_logging(&config, args.log_level.as_deref());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        context_path = %config.server.context_path,
        rules = config.security.paths.len(),
        "Configuration loaded"
    );

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Check {
            path,
            roles,
            anonymous,
            user,
        } => {
            let principal = (!anonymous).then(|| Principal::authenticated(user, roles));
            check(&config, &path, principal)
        }
    }
}
