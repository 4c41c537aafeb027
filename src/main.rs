use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use stutter_live::{
    event_channel, AudioSource, ClassifierAdapter, CommandEngine, Config, DisabledEngine,
    EstimatorKind, JsonDatasetProvider, ListenerConfig, Microphone, ModelConfiguration,
    ModelManager, ModelStrategy, RecordingSession, SessionConfig, SessionEvent,
    TranscriptionEngine, WavFile,
};

#[derive(Parser)]
#[command(name = "stutter-live", about = "Live speech disfluency monitor")]
struct Cli {
    /// Configuration file (TOML, extension optional)
    #[arg(long, default_value = "config/stutter-live")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record and print pipeline events until ctrl-c
    Run {
        /// Classify a WAV file instead of the default microphone
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// Classification target label (per-label strategy)
        #[arg(long, default_value = "Prolongation")]
        target: String,
    },
    /// Train one model configuration and print its test score
    Score {
        /// "per-label" or "all-labels"
        #[arg(long, default_value = "per-label")]
        strategy: String,

        /// Target label for the per-label strategy
        #[arg(long, default_value = "Prolongation")]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Run { file, json, target } => run(cfg, file, json, target).await,
        Command::Score { strategy, target } => score(cfg, &strategy, target),
    }
}

fn model_configuration(cfg: &Config, strategy: ModelStrategy) -> ModelConfiguration {
    ModelConfiguration {
        estimator: EstimatorKind::DecisionTree { max_depth: None },
        strategy,
        feature_length: cfg.model.feature_length,
        test_fraction: cfg.model.test_fraction,
        seed: cfg.model.seed,
    }
}

fn parse_strategy(strategy: &str, target: String) -> Result<ModelStrategy> {
    match strategy {
        "per-label" => Ok(ModelStrategy::PerLabel { target }),
        "all-labels" => Ok(ModelStrategy::AllLabels),
        other => bail!("Unknown strategy: {} (expected per-label or all-labels)", other),
    }
}

async fn run(cfg: Config, file: Option<PathBuf>, json: bool, target: String) -> Result<()> {
    let provider = Arc::new(JsonDatasetProvider::new(&cfg.model.dataset_path));
    let (events, mut rx) = event_channel();

    let initial = model_configuration(&cfg, ModelStrategy::PerLabel { target });
    let models = Arc::new(ModelManager::new(provider, initial, events.clone())?);

    let source: Arc<dyn AudioSource> = match file {
        Some(path) => Arc::new(WavFile::new(path)),
        None => Arc::new(Microphone::new(cfg.audio.sample_rate)),
    };

    let engine: Arc<dyn TranscriptionEngine> = match &cfg.transcription.command {
        Some(command) => Arc::new(CommandEngine::new(command)?),
        None => {
            warn!("No transcription command configured; utterances will not be decoded");
            Arc::new(DisabledEngine)
        }
    };

    let session_config = SessionConfig {
        window: Duration::from_secs_f32(cfg.audio.window_secs),
        sample_rate: cfg.audio.sample_rate,
        ..SessionConfig::default()
    };
    let listener_config = ListenerConfig {
        calibration: Duration::from_secs_f32(cfg.transcription.calibration_secs),
        trailing_silence: Duration::from_secs_f32(cfg.transcription.trailing_silence_secs),
        max_utterance: Duration::from_secs_f32(cfg.transcription.max_utterance_secs),
        ..ListenerConfig::default()
    };

    let session = RecordingSession::new(
        session_config,
        listener_config,
        source,
        engine,
        models,
        events,
    );
    session.start()?;
    info!("Recording; press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(event) => print_event(&event, json)?,
                None => break,
            }
        }
    }

    session.stop()?;
    while let Ok(event) = rx.try_recv() {
        print_event(&event, json)?;
    }

    let stats = session.stats();
    info!(
        "Session finished: {} windows, {} utterances in {:.1}s",
        stats.windows_processed, stats.utterances_transcribed, stats.duration_secs
    );
    Ok(())
}

fn print_event(event: &SessionEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        SessionEvent::Prediction { label } => println!("[prediction] {label}"),
        SessionEvent::Transcription { text } if text.is_empty() => println!("[transcript reset]"),
        SessionEvent::Transcription { text } => println!("[transcript] {text}"),
        SessionEvent::Score { value } => println!("[model score] {value:.3}"),
    }
    Ok(())
}

fn score(cfg: Config, strategy: &str, target: String) -> Result<()> {
    let strategy = parse_strategy(strategy, target)?;
    let provider = JsonDatasetProvider::new(&cfg.model.dataset_path);
    let adapter = ClassifierAdapter::train(model_configuration(&cfg, strategy), &provider)?;
    println!("test score: {:.4}", adapter.score()?);
    Ok(())
}
