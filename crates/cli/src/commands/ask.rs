//! `aide ask`: answer one question.

use std::path::Path;

pub async fn run(config: Option<&Path>, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = super::start(config)?;

    eprint!("  Thinking...");
    let answer = assistant.process_command(question).await;
    eprint!("\r              \r");
    println!("{answer}");

    assistant.shutdown().await;
    Ok(())
}
