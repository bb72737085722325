//! Counsel CLI entry point
//!
//! - `counsel-server run <TOPIC>` - research a topic and print the results
//! - `counsel-server models` - list backend models
//! - `counsel-server config` - show or validate the effective configuration

use anyhow::Context;
use counsel::{
    cli::{
        output::{follow_progress, Output},
        Cli, Commands, RunArgs,
    },
    research::{InMemoryRecorder, NoopRecorder, ResearchService},
    types::{RunMode, RunRequest},
    utils::toml_config::{ConfigError, CounselConfig},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let (config, missing_file) = load_config(&cli)?;
    init_tracing(&config, cli.verbose);
    if missing_file {
        tracing::warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Run(args) => run(config, args, &output).await,
        Commands::Models => models(config, &output).await,
        Commands::Config { validate } => show_config(&config, validate, &output),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<(CounselConfig, bool)> {
    let (mut config, missing_file) = match CounselConfig::load(&cli.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound(_)) => (CounselConfig::default(), true),
        Err(e) => return Err(e).context("failed to load configuration"),
    };
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok((config, missing_file))
}

fn init_tracing(config: &CounselConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = config.logging.json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

async fn run(mut config: CounselConfig, args: RunArgs, output: &Output) -> anyhow::Result<()> {
    if let Some(max_depth) = args.max_depth {
        config.crawl.max_depth = max_depth;
    }
    if let Some(max_pages) = args.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if args.seed.is_some() {
        config.counsel.voting_seed = args.seed;
    }
    config.validate().context("invalid run options")?;

    let request = RunRequest {
        topic: args.topic,
        model: args.model.unwrap_or_default(),
        mode: args.mode,
        num_members: args.members.unwrap_or(config.counsel.default_members),
    };

    output.banner();
    output.kv("Topic", &request.topic);
    output.kv("Mode", &request.mode.to_string());
    if request.mode == RunMode::Counsel {
        output.kv("Members", &request.num_members.to_string());
    }
    output.newline();

    let recorder = Arc::new(InMemoryRecorder::new());
    let service = ResearchService::from_config(config, recorder.clone())?;

    let printer_output = if output.colored {
        Output::new()
    } else {
        Output::no_color()
    };
    let printer = tokio::spawn(follow_progress(printer_output, service.subscribe()));

    let status = match service.run_to_completion(request).await {
        Ok(status) => status,
        Err(e) => {
            printer.abort();
            return Err(e.into());
        }
    };
    if let Err(e) = printer.await {
        output.error(&format!("Progress display stopped: {}", e));
    }

    output.run_report(&status);

    if let Some(path) = args.save {
        let run = recorder
            .last_run()
            .context("run finished without a completed-run record")?;
        let json = serde_json::to_string_pretty(&run)?;
        std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        output.success(&format!("Saved run to {}", path.display()));
    }

    output.newline();
    Ok(())
}

async fn models(config: CounselConfig, output: &Output) -> anyhow::Result<()> {
    let base_url = config.inference.base_url.clone();
    let service = ResearchService::from_config(config, Arc::new(NoopRecorder))?;
    let models = service.models().await;

    output.header("Models");
    if models.is_empty() {
        output.warning(&format!("No models available from {}", base_url));
        output.hint("Is Ollama running? Pull a model with `ollama pull llama3.2`.");
    } else {
        output.info(&format!("{} model(s) available from {}", models.len(), base_url));
        for model in &models {
            output.list_item(model);
        }
    }
    output.newline();
    Ok(())
}

fn show_config(config: &CounselConfig, validate: bool, output: &Output) -> anyhow::Result<()> {
    if validate {
        output.success("Configuration is valid");
        return Ok(());
    }

    let rendered = toml::to_string_pretty(config).context("failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
