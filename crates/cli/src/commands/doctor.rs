//! `aide doctor`: check configuration and every data source.

use std::path::Path;

use aide_config::AppConfig;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Aide Doctor: System Diagnostics");
    println!("===============================\n");

    let mut issues = 0;

    let path = AppConfig::resolve_path(config_path);
    if path.exists() {
        println!("  [ok]   Config file found: {}", path.display());
    } else {
        println!("  [warn] No config file at {}; using defaults (run `aide onboard`)", path.display());
    }

    let config = match AppConfig::load_with(config_path) {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] {e}");
            println!("\n  1 issue found. Fix the config before running other checks.");
            return Ok(());
        }
    };

    match config.require_llm_credentials() {
        Ok(()) => println!(
            "  [ok]   Language model: {} ({})",
            config.llm.provider, config.llm.model
        ),
        Err(e) => {
            println!("  [fail] {e}");
            issues += 1;
        }
    }

    if !config.calendar.enabled {
        println!("  [skip] Calendar disabled");
    } else if config.calendar.token_file().exists() {
        println!("  [ok]   Calendar token: {}", config.calendar.token_file().display());
    } else {
        println!(
            "  [warn] No calendar token at {}",
            config.calendar.token_file().display()
        );
        issues += 1;
    }

    if config.notion.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
        println!("  [ok]   Notion API key configured");
    } else {
        println!("  [warn] No Notion API key (set NOTION_API_KEY)");
        issues += 1;
    }

    match config.obsidian.vault_dir() {
        Some(vault) if vault.is_dir() => println!("  [ok]   Obsidian vault: {}", vault.display()),
        Some(vault) => {
            println!("  [warn] Obsidian vault not found: {}", vault.display());
            issues += 1;
        }
        None => {
            println!("  [warn] No Obsidian vault (set OBSIDIAN_VAULT_PATH)");
            issues += 1;
        }
    }

    let knowledge = config.knowledge.knowledge_dir();
    if knowledge.is_dir() {
        println!("  [ok]   Knowledge folder: {}", knowledge.display());
    } else {
        println!("  [warn] No knowledge folder at {} (run `aide onboard`)", knowledge.display());
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
