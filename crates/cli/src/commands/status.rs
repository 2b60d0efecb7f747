//! `warden status` — Show configuration and check reachability.

use std::time::Duration;
use warden_config::AppConfig;
use warden_core::memory::MemoryStore;
use warden_memory::HippocampusClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Warden Status");
    println!("=============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {:?} at {}", config.provider, config.provider_url);
    println!("  Model:        {}", config.model);
    println!("  Temperature:  {}", config.temperature);
    println!("  Memory:       {}", config.memory.address);
    println!(
        "  Rate limit:   {} msgs / {}s",
        config.defense.rate_limit_max, config.defense.rate_limit_window_secs
    );
    println!("  Anomaly:      > {}", config.defense.anomaly_threshold);
    println!(
        "  Context:      {} msgs, {} chars each, recall x{}",
        config.context.window_messages, config.context.max_chars_per_message, config.context.max_expansion
    );
    println!("  Tool rounds:  {}", config.agent.max_tool_rounds);

    println!();
    match warden_providers::router::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  [ok]   Provider reachable"),
            Ok(false) => println!("  [warn] Provider responded but is not healthy"),
            Err(e) => println!("  [fail] Provider unreachable: {e}"),
        },
        Err(e) => println!("  [fail] Provider not configured: {e}"),
    }

    let store = HippocampusClient::new(&config.memory.address, Duration::from_secs(config.memory.timeout_secs));
    match store.ping().await {
        Ok(true) => println!("  [ok]   Hippocampus reachable at {}", store.address()),
        Ok(false) => println!("  [warn] Hippocampus at {} gave an unexpected PING reply", store.address()),
        Err(e) => println!("  [fail] Hippocampus unreachable: {e}"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!();
        println!("  No config file; using defaults. Run `warden config` for a template.");
    }

    Ok(())
}
