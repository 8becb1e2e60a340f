//! `aide onboard`: first-time setup.

use aide_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("Aide: First-Time Setup");
    println!("======================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
    }

    let knowledge_dir = AppConfig::default().knowledge.knowledge_dir();
    if !knowledge_dir.exists() {
        std::fs::create_dir_all(&knowledge_dir)?;
        println!("  Created knowledge folder: {}", knowledge_dir.display());
    }

    println!("\n  Next steps:");
    println!("    1. Add your language model key to {}", config_path.display());
    println!("    2. Optionally set NOTION_API_KEY and OBSIDIAN_VAULT_PATH");
    println!("    3. Run: aide doctor");
    println!("    4. Run: aide chat\n");

    Ok(())
}
