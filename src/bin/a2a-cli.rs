//! Interactive command-line client for an A2A agent
//!
//! Reads prompts from stdin and sends each one as a new task within a shared
//! session, printing the agent's reply.

use a2a_agent::client::A2aClient;
use a2a_agent::observability::init_default_logging;
use a2a_agent::protocol::task::{Task, TaskState};
use clap::Parser;
use std::io::Write;
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "a2a-cli")]
#[command(about = "Send messages to an A2A agent and print its replies")]
#[command(version)]
struct Cli {
    /// Base URL of the agent server
    #[arg(long, default_value = "http://localhost:10002")]
    agent: String,

    /// Session id (0 generates a new one)
    #[arg(long, default_value = "0")]
    session: String,

    /// Print the full task history after each reply
    #[arg(long)]
    history: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_default_logging();

    let client = match A2aClient::new(&cli.agent) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let session_id = if cli.session == "0" {
        Uuid::new_v4().simple().to_string()
    } else {
        cli.session.clone()
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nWhat do you want to send to the agent? (type ':q' or 'quit' to exit)\n> ");
        let _ = std::io::stdout().flush();

        let prompt = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {e}");
                break;
            }
        };

        let trimmed = prompt.trim();
        if matches!(trimmed.to_lowercase().as_str(), ":q" | "quit") {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }

        let task_id = Uuid::new_v4().simple().to_string();
        match client.send_text(&task_id, Some(&session_id), trimmed).await {
            Ok(task) => print_task(&task, cli.history),
            Err(e) => eprintln!("\nError while sending task: {e}"),
        }
    }
}

fn print_task(task: &Task, history: bool) {
    match task.last_agent_message() {
        Some(reply) if task.status.state == TaskState::Failed => {
            println!("\nAgent says: [FAILED] {}", reply.text());
        }
        Some(reply) => println!("\nAgent says: {}", reply.text()),
        None => println!("\nNo response received."),
    }

    if history {
        println!("\n========= Conversation History =========");
        for message in &task.messages {
            println!("[{}] {}", message.role, message.text());
        }
    }
}
