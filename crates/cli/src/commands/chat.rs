//! `aide chat`: interactive session with conversational memory.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use aide_core::event::DomainEvent;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = Arc::new(super::start(config)?);

    println!();
    println!("  Aide: Interactive Mode");
    println!("  ======================");
    println!();
    println!("  Model:     {}", assistant.synthesizer_name());
    println!("  Sources:   {}", assistant.tool_names().join(", "));
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'snapshot' for your daily brief, 'exit' or Ctrl+D to quit.");
    println!();

    // Progress lines while a source is consulted
    let mut events = assistant.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DomainEvent::ToolSelected {
                tool_name: Some(tool),
                ..
            } = event.as_ref()
            {
                eprintln!("  (checking {})", tool.replace('_', " "));
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let answer = if input.eq_ignore_ascii_case("snapshot") {
            assistant.get_snapshot().await
        } else {
            assistant.process_command(input).await
        };

        println!();
        for line in answer.lines() {
            println!("  Aide > {line}");
        }
        println!();

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    assistant.shutdown().await;
    progress.abort();

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
