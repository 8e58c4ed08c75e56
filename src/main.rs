use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::warn;

use gemini_flows::{
    client::ImagenGenerator,
    flows::{self, FlowDeps},
    logging,
    prompt::PromptLibrary,
    services::{FileImageSink, ModelTranscriber, YouTubeSearch},
    tools::{CreateImageBlog, GetTranscription, SearchYoutubeVideos},
    CancelToken, Config, FlowEngine, GenerativeModel, ModelInvoker, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "gemini-flows", version, about = "Run Gemini-backed flows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered flows with their input and output schemas
    List,
    /// Run a flow and print its JSON result
    Run {
        /// Flow name, e.g. translationFlow
        flow: String,
        /// Flow input as JSON
        #[arg(long, default_value = "{}")]
        input: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    logging::init_logging(&config.log_level);

    let engine = build_engine(&config)?;

    match cli.command {
        Command::List => {
            for flow in engine.flows() {
                println!("{}", flow.name);
                println!("  input:  {}", flow.input.to_json_schema());
                println!("  output: {}", flow.output.to_json_schema());
            }
        }
        Command::Run { flow, input } => {
            let input: Value =
                serde_json::from_str(&input).context("--input must be valid JSON")?;

            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling");
                    on_interrupt.cancel();
                }
            });

            let output = engine.invoke_with_cancel(&flow, input, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn build_engine(config: &Config) -> Result<FlowEngine> {
    let gemini = GenerativeModel::from_config(config)?;
    let invoker = Arc::new(ModelInvoker::from_config(Arc::new(gemini.clone()), config));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    let search = YouTubeSearch::new(
        http,
        config.youtube_api_key.clone().unwrap_or_default(),
        config.youtube_max_results,
    );
    let transcriber = ModelTranscriber::new(Arc::clone(&invoker), config.transcription_model.clone());
    let images = ImagenGenerator::new(gemini, config.image_model.clone());
    let sink = FileImageSink::new(config.image_output_path.clone());

    let tools = ToolRegistry::new()
        .with(Arc::new(SearchYoutubeVideos::new(Arc::new(search))))
        .with(Arc::new(GetTranscription::new(Arc::new(transcriber))))
        .with(Arc::new(CreateImageBlog::new(Arc::new(images), Arc::new(sink))));

    let deps = FlowDeps {
        config: config.clone(),
        tools,
        prompts: Arc::new(PromptLibrary::builtin()?),
    };
    let mut engine = FlowEngine::new(invoker);
    flows::register_all(&mut engine, &deps)?;
    Ok(engine)
}
