//! `aide snapshot`: the daily brief.

use std::path::Path;

pub async fn run(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = super::start(config)?;

    eprint!("  Gathering your day...");
    let answer = assistant.get_snapshot().await;
    eprint!("\r                       \r");
    println!("{answer}");

    assistant.shutdown().await;
    Ok(())
}
