//! Solace application binary - composition root.
//!
//! 1. Parse CLI arguments and resolve configuration (file, env, flags)
//! 2. Build the collaborators: normalizer, emotion classifier, response source
//! 3. Run the chosen subcommand: HTTP server, terminal chat, or probe client

mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use solace_api::routes;
use solace_api::state::AppState;
use solace_chat::{
    Collaborators, CsvSinkFactory, EmotionClassifier, LexiconClassifier, LexiconNormalizer,
    PassthroughNormalizer, RemoteClassifier, ResponseSource, ResponseTable, SerpApiProvider,
    SessionRegistry, TextNormalizer, EMPTY_MESSAGE_REPLY,
};
use solace_core::config::{ClassifierBackend, SolaceConfig};

use cli::{session_for_name, CliArgs, Command};

const FAREWELL: &str = "Thank you for chatting. Take care!";

fn build_normalizer(config: &SolaceConfig) -> Arc<dyn TextNormalizer> {
    if !config.normalizer.enabled {
        tracing::info!("Typo correction disabled");
        return Arc::new(PassthroughNormalizer);
    }
    match LexiconNormalizer::from_config(&config.normalizer) {
        Ok(normalizer) => {
            tracing::info!(words = normalizer.vocabulary_len(), "Typo correction ready");
            Arc::new(normalizer)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Extra vocabulary unavailable, using built-in words");
            Arc::new(LexiconNormalizer::new())
        }
    }
}

fn build_classifier(
    config: &SolaceConfig,
) -> Result<Arc<dyn EmotionClassifier>, Box<dyn std::error::Error>> {
    Ok(match config.classifier.backend {
        ClassifierBackend::Lexicon => {
            tracing::info!("Using lexicon emotion classifier");
            Arc::new(LexiconClassifier::new())
        }
        ClassifierBackend::Remote => {
            tracing::info!(endpoint = %config.classifier.endpoint, "Using remote emotion classifier");
            Arc::new(RemoteClassifier::new(&config.classifier)?)
        }
    })
}

fn build_responses(config: &SolaceConfig) -> Result<ResponseSource, Box<dyn std::error::Error>> {
    let table = ResponseTable::load_or_empty(Path::new(&config.responses.path));

    let search = SerpApiProvider::new(&config.search)?;
    if !search.has_api_key() {
        tracing::warn!("No search API key configured; questions will get the search error reply");
    }
    let timeout = Duration::from_secs(config.search.timeout_secs.max(1));

    Ok(match config.responses.seed {
        Some(seed) => ResponseSource::with_seed(table, Arc::new(search), timeout, seed),
        None => ResponseSource::new(table, Arc::new(search), timeout),
    })
}

fn build_registry(config: &SolaceConfig) -> Result<SessionRegistry, Box<dyn std::error::Error>> {
    let collaborators = Collaborators {
        normalizer: build_normalizer(config),
        classifier: build_classifier(config)?,
        responses: Arc::new(build_responses(config)?),
    };
    Ok(SessionRegistry::new(
        collaborators,
        config.memory.clone(),
        Arc::new(CsvSinkFactory::new(&config.journal.dir)),
    ))
}

async fn serve(config: SolaceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(&config)?;
    let state = AppState::new(registry, config.journal.default_session.clone());
    routes::start_server(&config, state).await?;
    Ok(())
}

async fn read_line(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    prompt: &str,
) -> std::io::Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    lines.next_line().await
}

async fn chat(config: SolaceConfig, name: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry(&config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Welcome to the Mental Health Chatbot. Please enter your name to start chatting.");
    let name = match name {
        Some(name) => name,
        None => read_line(&mut lines, "Your Name: ").await?.unwrap_or_default(),
    };
    let session = session_for_name(&name);
    let orchestrator = registry.get_or_create(&session).await?;

    println!("Hello {}, type 'exit' anytime to end the chat.", session);
    while let Some(line) = read_line(&mut lines, "You: ").await? {
        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") {
            break;
        }
        let response = if message.is_empty() {
            EMPTY_MESSAGE_REPLY.to_string()
        } else {
            orchestrator.generate_response(message).await
        };
        println!("Chatbot: {}", response);
    }
    println!("Chatbot: {}", FAREWELL);
    Ok(())
}

async fn probe(config: SolaceConfig, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let response = client
        .post(&config.general.base_url)
        .json(&serde_json::json!({ "message": message }))
        .send()
        .await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    tracing::info!(url = %config.general.base_url, status = %status, "Probe finished");
    println!("Response from chatbot: {}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config_exists = config_file.exists();
    let mut config = if config_exists {
        SolaceConfig::load(&config_file)?
    } else {
        SolaceConfig::default()
    };
    config.apply_env_overrides();
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.general.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Solace v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
    }

    match args.command() {
        Command::Serve => serve(config).await,
        Command::Chat { name } => chat(config, name).await,
        Command::Probe { message } => probe(config, message).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_build_registry_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SolaceConfig::default();
        config.journal.dir = dir.path().to_string_lossy().to_string();
        config.responses.path = dir.path().join("missing.csv").to_string_lossy().to_string();
        assert!(build_registry(&config).is_ok());
    }

    #[tokio::test]
    async fn test_registry_writes_csv_journal() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("responses.csv");
        let mut file = std::fs::File::create(&table_path).unwrap();
        writeln!(file, "emotion,response\nsadness,I'm here with you.").unwrap();

        let mut config = SolaceConfig::default();
        config.journal.dir = dir.path().to_string_lossy().to_string();
        config.responses.path = table_path.to_string_lossy().to_string();
        config.responses.seed = Some(1);

        let registry = build_registry(&config).unwrap();
        let orchestrator = registry.get_or_create("Ada").await.unwrap();
        let reply = orchestrator.generate_response("I feel sad today").await;
        assert_eq!(reply, "I'm here with you.");

        let journal = std::fs::read_to_string(dir.path().join("Ada_memory.csv")).unwrap();
        let mut rows = journal.lines();
        assert_eq!(
            rows.next(),
            Some("timestamp,user_message,emotion,chatbot_response")
        );
        assert!(rows.next().unwrap().ends_with(",I feel sad today,sadness,I'm here with you."));
    }

    #[test]
    fn test_disabled_normalizer_passes_through() {
        let mut config = SolaceConfig::default();
        config.normalizer.enabled = false;
        let normalizer = build_normalizer(&config);
        assert_eq!(normalizer.correct("I fel sda").unwrap(), "I fel sda");
    }

    #[test]
    fn test_missing_vocabulary_falls_back_to_builtin() {
        let mut config = SolaceConfig::default();
        config.normalizer.vocabulary_path = Some("/nonexistent/words.txt".to_string());
        let normalizer = build_normalizer(&config);
        assert_eq!(normalizer.correct("I fel sda tday").unwrap(), "I feel sad today");
    }
}
