use anyhow::Result;
use hubfetch_core::config::KEYS;
use hubfetch_core::Config;

pub async fn execute(key: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;

    match (key, value) {
        // Show all config
        (None, _) => {
            println!("Configuration file: {:?}\n", Config::config_path()?);
            for key in KEYS {
                let value = config.get(key)?;
                let shown = if value.is_empty() { "(not set)".to_string() } else { value };
                println!("  {} = {}", key, shown);
            }
        }

        // Get a specific key
        (Some(key), None) => {
            println!("{}", config.get(key)?);
        }

        // Set a specific key
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
    }

    Ok(())
}
