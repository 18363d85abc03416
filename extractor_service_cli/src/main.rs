use std::env;

use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use extractor_service_cli::ai::AiAnalyzer;
use extractor_service_cli::assemble::ContentPipeline;
use extractor_service_cli::utils;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to analyze
    #[arg(short, long)]
    url: String,

    /// Model to use for AI analysis
    #[arg(short, long)]
    model: Option<String>,

    /// Skip AI analysis and use the heuristic fallback
    #[arg(short, long)]
    skip_ai: bool,

    /// Output file for the result record
    #[arg(short, long, default_value = "result.json")]
    output: String,

    /// Also write the reader-mode HTML to this file
    #[arg(long)]
    content_output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let ai = if args.skip_ai {
        None
    } else {
        match env::var("GEMINI_API_KEY") {
            Ok(key) => Some(AiAnalyzer::new(key, args.model.clone())),
            Err(_) => {
                eprintln!("GEMINI_API_KEY not set, falling back to heuristic analysis");
                None
            }
        }
    };

    let pipeline = ContentPipeline::new(ai)?;
    let result = pipeline.analyze(&args.url).await?;

    utils::save_json(&serde_json::to_value(&result)?, &args.output)?;
    if let Some(path) = &args.content_output {
        utils::save_text(&result.content, path)?;
    }

    println!("Analyzed \"{}\" ({}) -> {}", result.title, result.used_model, args.output);
    Ok(())
}
