use estimo::{EstimoError, EstimoServerBuilder, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), EstimoError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let path = config.path.clone();

    let server = EstimoServerBuilder::from_config(config).build().await?;
    tracing::info!(
        addr = %server.local_addr()?,
        path = path.as_deref().unwrap_or("*"),
        "listening"
    );

    server.run().await
}
