use dotenvy::dotenv;
use gitvault_client::config::get_configuration;
use gitvault_client::VaultClient;
use gitvault_core::observability::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let telemetry = &configuration.telemetry;
    init_tracing(
        &telemetry.service_name,
        &telemetry.log_level,
        telemetry.otlp_endpoint.as_deref(),
    )?;

    let client = VaultClient::from_settings(&configuration)?;

    if !client.session.is_authenticated() {
        let email = std::env::var("GITVAULT_EMAIL")
            .map_err(|_| anyhow::anyhow!("No stored session and GITVAULT_EMAIL is not set"))?;
        let password = std::env::var("GITVAULT_PASSWORD")
            .map_err(|_| anyhow::anyhow!("No stored session and GITVAULT_PASSWORD is not set"))?;
        let principal = client.session.login(&email, &password).await?;
        info!("Signed in as {}", principal.display_name());
    }

    let snapshot = client.dashboard.snapshot().await?;
    let posture = &snapshot.posture;
    info!(
        score = posture.score,
        tier = ?posture.tier(),
        repositories = snapshot.counts.total_repos,
        active_tokens = snapshot.counts.active_tokens,
        "Security posture"
    );
    for strength in &posture.strengths {
        info!("Strength: {}", strength);
    }
    for concern in &posture.concerns {
        info!("Concern: {}", concern);
    }
    for recent in client.dashboard.recent(&snapshot) {
        info!(
            role = recent.role.map(|r| r.as_str()).unwrap_or("none"),
            "Recent repository: {}",
            recent.repository.name
        );
    }

    Ok(())
}
