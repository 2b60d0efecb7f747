//! `warden chat` — Interactive or single-message chat with one agent.

use chrono::Utc;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use warden_agent::{AgentRegistry, AgentServices, CustomerAgent, TurnKind};
use warden_config::AppConfig;
use warden_core::memory::MemoryStore;
use warden_memory::{HippocampusClient, InMemoryStore};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    Reset,
    Clear,
    Status,
    Quit,
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" => None,
            "reset" => Some(Self::Reset),
            "clear" => Some(Self::Clear),
            "status" => Some(Self::Status),
            "quit" | "exit" => Some(Self::Quit),
            text => Some(Self::Message(text)),
        }
    }
}

pub async fn run(
    agent_id: String,
    message: Option<String>,
    in_memory: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = warden_providers::router::build_from_config(&config)?;
    let store: Arc<dyn MemoryStore> = if in_memory {
        Arc::new(InMemoryStore::new())
    } else {
        let client = HippocampusClient::new(&config.memory.address, Duration::from_secs(config.memory.timeout_secs));
        if !client.ping().await.unwrap_or(false) {
            warn!(
                address = client.address(),
                "Hippocampus not reachable; knowledge search will come back empty"
            );
        }
        Arc::new(client)
    };

    let model = config.model.clone();
    let registry = AgentRegistry::new(AgentServices::new(provider, store, config));
    let agent = registry.get_or_create(&agent_id).await;

    if let Some(msg) = message {
        // Single message mode
        let mut agent = agent.lock().await;
        let reply = turn(&mut agent, &msg).await;
        println!("{reply}");
        return Ok(());
    }

    println!();
    println!("  Warden — Interactive Mode");
    println!();
    println!("  Agent:     {agent_id}");
    println!("  Model:     {model}");
    println!("  Commands:  reset, clear, status, quit");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let Some(input) = Input::parse(&line) else {
            prompt()?;
            continue;
        };

        let mut agent = agent.lock().await;
        match input {
            Input::Quit => break,
            Input::Reset => {
                agent.reset();
                println!("  Conversation reset.");
            }
            Input::Clear => {
                agent.clear_knowledge().await;
                println!("  Knowledge cleared; base module reloaded.");
            }
            Input::Status => {
                println!("{}", serde_json::to_string_pretty(&agent.status())?);
            }
            Input::Message(text) => {
                let reply = turn(&mut agent, text).await;
                println!();
                for line in reply.lines() {
                    println!("  Assistant > {line}");
                }
            }
        }
        println!();
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

async fn turn(agent: &mut CustomerAgent, text: &str) -> String {
    let outcome = agent.chat(text, Utc::now()).await;
    if outcome.kind == TurnKind::Answered {
        info!(anomaly_score = outcome.anomaly_score, rounds = outcome.rounds, "Turn complete");
    } else {
        warn!(
            kind = ?outcome.kind,
            anomaly_score = outcome.anomaly_score,
            injection = outcome.injection_detected,
            "Turn did not produce an answer"
        );
    }
    outcome.response
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
