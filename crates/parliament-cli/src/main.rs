use std::env;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cliclack::spinner;
use console::style;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use parliament::society::{run_society, SocietyResult, DEFAULT_ROUND_LIMIT};

mod society;

use society::Settings;

const DEFAULT_HOST: &str = "https://api.groq.com/openai";

/// The example task executed when no task is given on the command line
const DEFAULT_TASK: &str = "Go to amazon.com and search for the cheapest laptop with a rtx 3050 \
    graphics card and ryzen 5. Provide the product name, its price, and a brief description of \
    the design and what the general consensus the reviews are saying about the laptop. I have a \
    budget of 80000 INR";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The task for the society to work on (defaults to the example task)
    task: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint (can also be set via the
    /// PARLIAMENT_HOST environment variable)
    #[arg(long)]
    host: Option<String>,

    /// API key (can also be set via the PARLIAMENT_API_KEY or OPENAI_API_KEY
    /// environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Model to use
    #[arg(short, long, default_value = "llama-3.3-70b-versatile")]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.4)]
    temperature: f32,

    /// Maximum tokens per completion
    #[arg(long, default_value_t = 4096)]
    max_tokens: i32,

    /// Maximum number of instruction rounds before the run is cut off
    #[arg(long, default_value_t = DEFAULT_ROUND_LIMIT)]
    round_limit: usize,

    /// Directory where the file and spreadsheet tools write their output
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Log the snippets the code execution tool runs
    #[arg(long)]
    verbose_code: bool,
}

fn settings_from(cli: &Cli) -> Result<Settings> {
    let api_key = cli
        .api_key
        .clone()
        .or_else(|| env::var("PARLIAMENT_API_KEY").ok())
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .context(
            "API key must be provided via --api-key or the PARLIAMENT_API_KEY / OPENAI_API_KEY \
             environment variable",
        )?;

    let host = cli
        .host
        .clone()
        .or_else(|| env::var("PARLIAMENT_HOST").ok())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    Ok(Settings {
        host,
        api_key,
        model: cli.model.clone(),
        temperature: cli.temperature,
        max_tokens: cli.max_tokens,
        round_limit: cli.round_limit,
        output_dir: cli.output_dir.clone(),
        verbose_code: cli.verbose_code,
    })
}

fn render_answer<W: Write>(out: &mut W, result: &SocietyResult) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{} {}", style("Answer:").blue().bold(), result.answer)?;

    let usage = &result.usage;
    writeln!(
        out,
        "{}",
        style(format!(
            "{} rounds, tokens: {} prompt / {} completion / {} total",
            result.chat_history.len(),
            usage.input_tokens.unwrap_or(0),
            usage.output_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        ))
        .dim()
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parliament=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = settings_from(&cli)?;
    let question = cli.task.clone().unwrap_or_else(|| DEFAULT_TASK.to_string());

    tracing::info!(model = %settings.model, host = %settings.host, "constructing society");
    let mut society = society::construct_society(&question, &settings).await?;

    let spin = spinner();
    spin.start("Running the society");
    let result = match run_society(&mut society, settings.round_limit).await {
        Ok(result) => {
            spin.stop("Task complete");
            result
        }
        Err(e) => {
            spin.stop("Run failed");
            return Err(e);
        }
    };

    render_answer(&mut std::io::stdout(), &result)?;
    Ok(())
}
