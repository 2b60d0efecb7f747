//! `warden config` — Print the default configuration.

use warden_config::AppConfig;

pub fn run() {
    println!("# Save as {}", AppConfig::config_dir().join("config.toml").display());
    println!();
    print!("{}", AppConfig::default_toml());
}
