use skyfall::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        respawn_ms = config.arena.respawn_delay.as_millis() as u64,
        max_health = config.arena.max_health,
        "starting dogfight server"
    );

    let server = SkyfallServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
