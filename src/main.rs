//! admissions-server binary
//!
//! Runs the HTTP server by default; `init`, `config` and `user` are
//! offline helpers that never bind a port.

use admissions::{
    build_router,
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        user::{self, CreateUserArgs},
        Cli, Commands, UserCommands,
    },
    AdmissionsConfig, AdmissionsConfigManager, AdmissionsDb, AppState, AuthService,
};
use anyhow::Context;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = Output::from_flags(cli.no_color);

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            host,
            port,
            mail,
        }) => {
            let result = init::run(
                InitConfig {
                    path,
                    force,
                    host,
                    port,
                    mail,
                },
                &output,
            );
            match result {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => std::process::exit(exit_with(&output, &e)),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        Some(Commands::User(command)) => run_user_command(&cli.config, command, &output).await,
        None => serve(&cli.config, cli.verbose, &output).await,
    }
}

fn exit_with(output: &Output, message: &str) -> i32 {
    output.error(message);
    1
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    output.banner();

    let config = match AdmissionsConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Run 'admissions-server init' to create a configuration");
            std::process::exit(1);
        }
    };

    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    output.kv(
        "server",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv(
        "database",
        if config.turso_credentials().is_some() {
            "turso (remote)"
        } else {
            config.database.url.as_str()
        },
    );
    output.kv("mail", &format!("{:?}", config.mail.provider).to_lowercase());
    output.kv("campuses", &config.auth.allowed_campuses.join(", "));
    output.kv(
        "session lifetime",
        &format!("{}s", config.auth.access_token_expiry),
    );

    if validate {
        output.header("Validation");
        match config.validate_with_warnings() {
            Ok(warnings) => {
                output.success("Configuration is valid");
                for warning in warnings {
                    output.warning(&warning.to_string());
                }
            }
            Err(e) => std::process::exit(exit_with(output, &e.to_string())),
        }
    }

    Ok(())
}

async fn run_user_command(
    path: &Path,
    command: UserCommands,
    output: &Output,
) -> anyhow::Result<()> {
    let config = AdmissionsConfig::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let db = AdmissionsDb::from_config(&config).await?;

    match command {
        UserCommands::Create {
            email,
            name,
            contact,
            campus,
            role,
            password,
        } => {
            let auth = AuthService::new(
                config.jwt_secret()?,
                config.auth.access_token_expiry,
                config.auth.reset_token_expiry,
            );
            let args = CreateUserArgs {
                email,
                name,
                contact,
                campus,
                role,
                password,
            };
            if let Err(e) = user::create(&db, &auth, &config, &args, output).await {
                std::process::exit(exit_with(output, &e.to_string()));
            }
        }
        UserCommands::List => {
            user::list(&db, output).await?;
        }
    }

    Ok(())
}

async fn serve(path: &Path, verbose: bool, output: &Output) -> anyhow::Result<()> {
    let config_manager = match AdmissionsConfigManager::new(path) {
        Ok(manager) => manager,
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Run 'admissions-server init' to create a configuration");
            std::process::exit(1);
        }
    };

    let config = config_manager.config();
    init_tracing(&config.server.log_level, config.server.log_json, verbose);

    info!(
        "Starting admissions-server v{} with config {}",
        env!("CARGO_PKG_VERSION"),
        config_manager.path().display()
    );

    for warning in config.validate_with_warnings()? {
        warn!(kind = ?warning.kind, "{}", warning);
    }

    if let Err(e) = config_manager.start_watching() {
        warn!("Config hot reload disabled: {}", e);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config_manager).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// `RUST_LOG` wins over `server.log_level`; `--verbose` forces debug.
fn init_tracing(log_level: &str, json: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { log_level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", default_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
