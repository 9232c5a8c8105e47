use std::sync::Arc;

use fin_triage::alert::WebhookAlerter;
use fin_triage::config::AppConfig;
use fin_triage::docai::CloudDocClient;
use fin_triage::llm::create_provider;
use fin_triage::mail::{ResendMailbox, SmtpMailer};
use fin_triage::pipeline::{ReplyIdentity, TriagePipeline};
use fin_triage::server::{AppState, webhook_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("📬 fin-triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{}/webhook", config.bind_addr);
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   SMTP: {}:{}", config.smtp.host, config.smtp.port);
    eprintln!("   Reply from: {}", config.smtp.from_address);
    eprintln!("   Run timeout: {}s\n", config.run_timeout.as_secs());

    let llm = create_provider(&config.llm)?;

    let mailbox = Arc::new(ResendMailbox::new(
        config.mail_api.api_key.clone(),
        config.mail_api.base_url.clone(),
    ));
    let doc_client = Arc::new(CloudDocClient::new(
        config.doc_cloud.api_key.clone(),
        config.doc_cloud.base_url.clone(),
    ));
    let mailer = Arc::new(SmtpMailer::new(config.smtp.clone()));
    let alerts = Arc::new(WebhookAlerter::new(config.alert_webhook_url.clone()));

    let pipeline = Arc::new(TriagePipeline::new(
        mailbox,
        doc_client.clone(),
        doc_client,
        llm,
        mailer,
        alerts,
        ReplyIdentity {
            from: config.smtp.from_address.clone(),
            reply_to: config.smtp.reply_to.clone(),
        },
    ));

    let app = webhook_routes(AppState::new(pipeline, config.run_timeout));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
