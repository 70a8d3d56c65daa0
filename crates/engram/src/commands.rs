//! engram command implementations

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use engram_agent::orchestrator::LoopSettings;
use engram_agent::{Orchestrator, ProviderRegistry, WorkspaceProvider};
use engram_archive::{Archive, ArchiveProvider};
use engram_bus::{EventBus, EventLogger};
use engram_config::{self, Config};
use engram_memory::TaskId;
use engram_provider::OpenRouterProvider;

/// Initialize config and directories
pub async fn init_command() -> Result<()> {
    let config = Config::load().await.unwrap_or_default();
    config.save().await.context("saving config")?;

    engram_config::paths::ensure_dir(&config.workspace())
        .await
        .context("creating workspace")?;
    engram_config::paths::ensure_dir(&config.archive_dir())
        .await
        .context("creating archive dir")?;

    println!("✓ Config at {}", engram_config::config_path().display());
    println!("✓ Workspace at {}", config.workspace().display());
    println!("✓ Archive at {}", config.archive_dir().display());

    if config.api_key().is_none() {
        println!();
        println!("No API key configured yet. Add one to the config file:");
        println!("  {{\"backends\": {{\"openrouter\": {{\"api_key\": \"sk-or-...\"}}}}}}");
    }

    Ok(())
}

/// Show configuration and archive status
pub async fn status_command() -> Result<()> {
    let config = Config::load().await?;

    println!("engram status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Model:         {}", config.model());
    println!("Summary model: {}", config.summary_model());
    println!("Max turns:     {}", config.max_turns());
    println!(
        "Backend:       {}",
        if config.api_key().is_some() {
            "[configured]"
        } else {
            "[not configured]"
        }
    );
    println!("Workspace:     {}", config.workspace().display());

    let archive_dir = config.archive_dir();
    let records = match tokio::fs::read_dir(&archive_dir).await {
        Ok(mut entries) => {
            let mut count = 0;
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                    count += 1;
                }
            }
            count
        }
        Err(_) => 0,
    };
    println!("Archive:       {} ({} records)", archive_dir.display(), records);

    Ok(())
}

/// Build the agent from config
async fn build_agent(config: &Config) -> Result<Orchestrator> {
    let api_key = config
        .api_key()
        .context("no API key configured; run `engram init` and add one")?;

    let provider = Arc::new(OpenRouterProvider::new(
        api_key,
        config.api_base(),
        Some(config.model()),
    ));

    engram_config::paths::ensure_dir(&config.workspace()).await?;

    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(WorkspaceProvider::new(config.workspace())));
    registry.register(Arc::new(ArchiveProvider::new(Archive::new(
        config.archive_dir(),
        config.archive.search_limit,
    ))));
    debug!(tools = ?registry.names(), "providers registered");

    let bus = EventBus::new();
    tokio::spawn(EventLogger::new(bus.subscribe()).run());

    Ok(Orchestrator::new(
        provider,
        registry,
        bus,
        LoopSettings {
            model: config.model(),
            summary_model: config.summary_model(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature(),
            max_turns: config.max_turns(),
        },
    ))
}

/// Chat with the agent: one-shot or interactive
pub async fn engage_command(message: Option<String>) -> Result<()> {
    let config = Config::load().await?;
    let mut agent = build_agent(&config).await?;

    if let Some(message) = message {
        let answer = agent.chat(&message).await?;
        println!("{}", answer);
        return Ok(());
    }

    println!("engram interactive session. /help for commands, /quit to leave.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("/tasks           list tasks");
                println!("/task <title>    create a task and switch to it");
                println!("/switch <id>     switch to a task by number");
                println!("/quit            leave");
            }
            "/tasks" => {
                let current = agent.space_mut().tasks.current_id();
                for task in agent.space().tasks.iter() {
                    let marker = if task.id == current { "*" } else { " " };
                    println!("{} {} {}", marker, task.id, task.title);
                }
            }
            _ if line.starts_with("/task ") => {
                let title = line.trim_start_matches("/task ").trim();
                let id = agent.space_mut().tasks.create(title);
                println!("switched to {} ({})", id, title);
            }
            _ if line.starts_with("/switch ") => {
                let raw = line.trim_start_matches("/switch ").trim();
                let parsed = raw.trim_start_matches("task-").parse::<u64>();
                match parsed {
                    Ok(n) if agent.space_mut().tasks.switch_to(TaskId(n)) => {
                        println!("switched to task-{}", n);
                    }
                    _ => println!("no task {}", raw),
                }
            }
            _ => match agent.chat(line).await {
                Ok(answer) => println!("{}", answer),
                Err(e) => println!("Error: {:#}", e),
            },
        }
    }

    Ok(())
}
