use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pat_dashboard::app::{self, AppState};
use pat_dashboard::cli;
use pat_dashboard::config::{self, Config};
use pat_dashboard::jobs;
use pat_dashboard::logto::LogtoClient;
use pat_dashboard::models::pat::{CreatePersonalAccessTokenRequest, Expiration, PatView};
use pat_dashboard::settings::{self, CliSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // OTLP export only when a collector is configured
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "pat-dashboard"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "pat_dashboard=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => match config::load() {
            Ok(cfg) => {
                let port = port.unwrap_or(cfg.port);
                run_server(cfg, port).await
            }
            Err(e) => Err(e),
        },
        None => match config::load() {
            Ok(cfg) => {
                let port = cfg.port;
                run_server(cfg, port).await
            }
            Err(e) => Err(e),
        },
        Some(cli::Commands::Pat { command }) => {
            handle_pat_command(command, args.config.as_deref())
        }
        Some(cli::Commands::Deploy { command }) => {
            handle_deploy_command(command, args.config.as_deref()).await
        }
        Some(cli::Commands::Tokens { command }) => match config::load() {
            Ok(cfg) => handle_tokens_command(command, &cfg).await,
            Err(e) => Err(e),
        },
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Logto endpoint: {}", cfg.logto_endpoint);
    let state = Arc::new(AppState::from_config(cfg)?);

    if state.queries.is_enabled() {
        jobs::cleanup::spawn(state.queries.clone());
        tracing::info!("Query cache sweeper started");
    }

    let app = app::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("PAT dashboard listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn handle_pat_command(cmd: cli::PatCommands, config_path: Option<&Path>) -> anyhow::Result<()> {
    match cmd {
        cli::PatCommands::Add { token } => {
            let path = settings::resolve_path(config_path)?;
            let mut cfg = CliSettings::load(&path)?;
            cfg.set_pat(&token)?;
            cfg.save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("PAT saved to {}", path.display());
        }
    }
    Ok(())
}

async fn handle_deploy_command(
    cmd: cli::DeployCommands,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match cmd {
        cli::DeployCommands::Test => {
            let path = settings::resolve_path(config_path)?;
            let cfg = CliSettings::load(&path)?;
            let target = cfg
                .exchange_target()
                .with_context(|| format!("incomplete settings in {}", path.display()))?;

            let client = LogtoClient::new(target.tenant_url, target.client_id, target.client_secret)?;
            let token = client
                .exchange_personal_access_token(target.pat, target.resource, target.scope)
                .await
                .context("token exchange failed")?;

            println!("Token exchange succeeded:");
            println!("  Token type:  {}", token.token_type);
            println!("  Issued type: {}", token.issued_token_type);
            println!("  Expires in:  {}s", token.expires_in);
            if let Some(scope) = token.scope.as_deref().filter(|s| !s.is_empty()) {
                println!("  Scope:       {}", scope);
            }
            println!("  Access token: {}", token.access_token);
        }
    }
    Ok(())
}

async fn handle_tokens_command(cmd: cli::TokenCommands, cfg: &Config) -> anyhow::Result<()> {
    let client = LogtoClient::new(&cfg.logto_endpoint, &cfg.client_id, &cfg.client_secret)?;
    let management = client
        .get_access_token(&cfg.management_resource, &cfg.management_scope)
        .await
        .context("failed to obtain a Management API token")?;
    let token = management.access_token.as_str();

    match cmd {
        cli::TokenCommands::List { user_id } => {
            let pats = client.list_personal_access_tokens(&user_id, token).await?;
            if pats.is_empty() {
                println!("No tokens found.");
            } else {
                println!(
                    "{:<24} {:<18} {:<26} {:<26}",
                    "NAME", "VALUE", "CREATED", "EXPIRES"
                );
                for pat in pats {
                    let view = PatView::try_from(pat)?;
                    println!(
                        "{:<24} {:<18} {:<26} {:<26}",
                        view.name,
                        preview(&view.value),
                        view.created_at.to_rfc3339(),
                        view.expires_at
                            .map(|at| at.to_rfc3339())
                            .unwrap_or_else(|| "never".into()),
                    );
                }
            }
        }
        cli::TokenCommands::Create {
            user_id,
            name,
            expires_in_days,
        } => {
            let expiration = match expires_in_days {
                Some(days) => Expiration::in_days(Utc::now(), days)
                    .with_context(|| format!("--expires-in-days {} is out of range", days))?,
                None => Expiration::Never,
            };
            let request = CreatePersonalAccessTokenRequest::new(name, expiration);
            let created = client
                .create_personal_access_token(&user_id, &request, token)
                .await?;
            let view = PatView::try_from(created)?;
            println!(
                "Token created:\n  Name:    {}\n  Value:   {}\n  Expires: {}",
                view.name,
                view.value,
                view.expires_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "never".into()),
            );
            println!("\nCopy the value now; it is shown in full only here and in the dashboard.");
        }
        cli::TokenCommands::Revoke { user_id, name } => {
            client
                .delete_personal_access_token(&user_id, &name, token)
                .await?;
            println!("Token \"{}\" revoked.", name);
        }
    }
    Ok(())
}

/// First 12 characters of a token value.
fn preview(value: &str) -> String {
    match value.char_indices().nth(12) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}
