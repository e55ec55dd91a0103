use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use realtime_relay::config::Args;
use realtime_relay::mailer::{MailTransport, Mailer, SmtpMailTransport, UnconfiguredTransport};
use realtime_relay::models::EmailRequest;
use realtime_relay::rate_limit::RateLimiter;
use realtime_relay::sessions::{SessionRegistry, spawn_sweeper};
use realtime_relay::upstream::{HttpSessionApi, UpstreamSessionClient};
use realtime_relay::worker::spawn_mail_worker;
use realtime_relay::{AppState, create_router, metrics};

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,realtime_relay=debug")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();
    log_configuration(&args);

    let upstream_config = args.upstream_config();
    if upstream_config.api_key.is_none() {
        tracing::error!("OPENAI_API_KEY not found in environment variables");
        std::process::exit(1);
    }
    tracing::info!("API key found");

    metrics::init();

    let transport: Arc<dyn MailTransport> = match args.smtp_config() {
        Some(smtp) => match SmtpMailTransport::new(&smtp) {
            Ok(t) => Arc::new(t),
            Err(e) => {
                tracing::warn!(error = %e, "invalid SMTP configuration, email disabled");
                Arc::new(UnconfiguredTransport)
            }
        },
        None => {
            tracing::warn!("SMTP credentials missing, email notifications will fail");
            Arc::new(UnconfiguredTransport)
        }
    };
    let mailer = spawn_mail_worker(transport);

    let session_config = args.session_config();
    let sessions = Arc::new(SessionRegistry::new(session_config.timeout));
    spawn_sweeper(Arc::clone(&sessions), session_config);

    let api = HttpSessionApi::new(reqwest::Client::new(), &upstream_config);
    tracing::info!(endpoint = api.endpoint(), "forwarding sessions upstream");

    // creating shared state
    let state = Arc::new(AppState {
        rate_limiter: RateLimiter::new(args.rate_limit_config()),
        sessions: Arc::clone(&sessions),
        upstream: UpstreamSessionClient::new(
            Arc::new(api),
            upstream_config.api_key.clone(),
            args.retry_policy(),
            sessions,
        ),
        mailer: mailer.clone(),
    });

    if args.verify_smtp {
        verify_smtp(&args, &mailer).await;
    }

    let app = create_router(state, args.static_dir.as_deref());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Relay running on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn log_configuration(args: &Args) {
    tracing::info!("Configuration loaded:");
    tracing::info!("  SMTP_SERVER: {}", args.smtp_server);
    tracing::info!("  SMTP_PORT: {}", args.smtp_port);
    tracing::info!(
        "  SMTP_USERNAME: {}",
        args.smtp_username.as_deref().unwrap_or("<unset>")
    );
    tracing::info!(
        "  SMTP_PASSWORD: {}",
        if args.smtp_password.is_some() { "***********" } else { "<unset>" }
    );
    tracing::info!("  YOUR_EMAIL: {}", args.sender.as_deref().unwrap_or("<unset>"));
    tracing::info!(
        "  Rate limit: {} requests per {} seconds",
        args.rate_limit, args.rate_window
    );
    tracing::info!(
        "  Sessions expire after {} seconds idle (sweep every {} seconds)",
        args.session_timeout, args.sweep_interval
    );
}

// Startup self-test, failure only warns
async fn verify_smtp(args: &Args, mailer: &Mailer) {
    let Some(to) = args.sender.clone().or_else(|| args.smtp_username.clone()) else {
        tracing::warn!("no sender address configured, skipping email check");
        return;
    };
    tracing::info!("Testing email configuration...");
    let test = EmailRequest {
        to,
        subject: "AI Assistant Test Email".to_string(),
        body: "Your AI Assistant email configuration is working correctly.".to_string(),
    };
    match mailer.send(test).await {
        Ok(()) => tracing::info!("Email configuration verified"),
        Err(e) => tracing::warn!(error = %e, "email configuration failed"),
    }
}
