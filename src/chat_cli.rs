//! Line-oriented console front-end.
//!
//! Reads utterances from stdin, drives the conversation controller, and
//! prints replies. Complaint operations go over HTTP to the configured
//! API; question answering uses a locally built knowledge pipeline.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use tracing::warn;

use crate::client::HttpComplaintsClient;
use crate::config::Config;
use crate::controller::{Answerer, ChatSession, Controller};
use crate::rag::KnowledgePipeline;

pub async fn run_chat(config: &Config) -> Result<()> {
    let gateway = HttpComplaintsClient::new(&config.api.base_url)?;

    let pipeline = match KnowledgePipeline::build(config).await {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "knowledge pipeline unavailable");
            println!("(knowledge assistant unavailable; complaint commands still work)");
            None
        }
    };

    println!("Welcome to the Complaint Desk assistant!");
    println!("Type your question, or use the following commands:");
    println!("  file                 : File a new complaint");
    println!("  fetch <complaint_id> : Retrieve a complaint by ID");
    println!("  exit                 : Exit the assistant");
    println!();

    let mut session = ChatSession::new();
    let controller = Controller {
        gateway: &gateway,
        answerer: pipeline.as_ref().map(|p| p as &dyn Answerer),
    };

    let stdin = io::stdin();
    print!("You: ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        if input.is_empty() {
            print!("You: ");
            io::stdout().flush()?;
            continue;
        }

        if input.eq_ignore_ascii_case("exit") {
            println!("Bot: bye!");
            break;
        }

        let reply = controller.handle(&mut session, input).await;
        println!("Bot: {}", reply);

        print!("You: ");
        io::stdout().flush()?;
    }

    Ok(())
}
