use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let restorer = photo_restorer::build().await?;

    tracing::info!(
        addr = %restorer.settings.addr(),
        backend = ?restorer.settings.backend,
        model = %restorer.settings.model,
        prefix = %restorer.settings.public_prefix,
        "photo restorer starting"
    );

    restorer.listen().await
}
