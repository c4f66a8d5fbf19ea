//! `ddrgate serve`: Start the HTTP API server.

use ddrgate_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ddrgate gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Auth: {}", if config.auth_enabled() { "bearer tokens" } else { "open" });

    ddrgate_gateway::start(config).await?;

    Ok(())
}
