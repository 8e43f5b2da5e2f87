use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use flightchat::config::AssistantConfig;
use flightchat::{
    AirportResolver, Assistant, Clock, FlightSearchClient, Gazetteer, GeminiSession,
    ParamExtractor, SystemClock, TemplateStore, logging,
};

const EXIT_COMMANDS: &[&str] = &["quit", "exit"];

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config =
        AssistantConfig::load_from_path(config_path).context("Failed to load configuration")?;
    logging::init(&config.logging)?;

    let assistant = build_assistant(&config).await?;
    info!(
        "FlightChat {} ready (AI engine {})",
        flightchat::VERSION,
        if assistant.has_dialogue() { "on" } else { "off" }
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if EXIT_COMMANDS.contains(&message.to_lowercase().as_str()) {
            break;
        }
        if message.is_empty() {
            continue;
        }

        let reply = assistant.handle_chat_message(message).await;
        println!("{}\n", reply.reply);
    }

    info!("Session ended");
    Ok(())
}

async fn build_assistant(config: &AssistantConfig) -> Result<Assistant> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let gazetteer = Gazetteer::from_path(&config.data.airports_path)
        .context("Failed to load airport gazetteer")?;
    let extractor = ParamExtractor::new(
        AirportResolver::new(Arc::new(gazetteer)),
        config.defaults.home_airports.clone(),
    );

    let templates = TemplateStore::from_path(&config.data.responses_path)
        .await
        .context("Failed to load response templates")?;

    let search = FlightSearchClient::from_config(&config.provider, clock.clone())?;
    if !search.has_credentials() {
        warn!("No SerpApi key configured; flight searches will report an error");
    }

    let mut assistant = Assistant::new(extractor, Arc::new(templates), Arc::new(search), clock)?;

    if config.dialogue_available() {
        let session = GeminiSession::new(&config.dialogue)?;
        assistant = assistant.with_dialogue(Arc::new(session));
    } else {
        info!("AI engine disabled; using the deterministic pipeline only");
    }

    Ok(assistant)
}
