// src/bin/brief_cli.rs
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use voice_market_brief::brief::clean_for_speech;
use voice_market_brief::config::DEFAULT_TICKERS_CSV;
use voice_market_brief::resolver::Thresholds;
use voice_market_brief::symbols::{load_reference_table_from_path, primary_table};
use voice_market_brief::{BriefConfig, BriefGenerator, TickerResolver};

#[derive(Parser)]
#[command(name = "brief-cli")]
#[command(about = "Spoken stock question → ticker → market brief", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a query to a ticker without calling any external service
    Resolve {
        query: String,
        #[arg(long, env = "TICKERS_CSV", default_value = DEFAULT_TICKERS_CSV)]
        tickers: PathBuf,
    },
    /// Compose a market brief for a query
    Brief { query: String },
    /// Answer transcribed queries read line by line from stdin
    Listen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve { query, tickers } => {
            let reference = load_reference_table_from_path(&tickers)?;
            let resolver = TickerResolver::new(primary_table(), reference)
                .with_thresholds(Thresholds::from_env()?);
            match resolver.find_match(&query) {
                Some(m) => println!(
                    "{} ('{}', {:?} tier, score {:.1})",
                    m.ticker, m.name, m.tier, m.score
                ),
                None => println!("unresolved"),
            }
        }
        Commands::Brief { query } => {
            let generator = build_generator()?;
            println!("{}", clean_for_speech(&generator.build_brief(&query).await));
        }
        Commands::Listen => {
            let generator = build_generator()?;
            let stdin = io::stdin();
            prompt()?;
            for line in stdin.lock().lines() {
                let query = line?;
                if !query.trim().is_empty() {
                    println!("{}", clean_for_speech(&generator.build_brief(&query).await));
                }
                prompt()?;
            }
        }
    }

    Ok(())
}

fn build_generator() -> anyhow::Result<BriefGenerator> {
    let config = BriefConfig::from_env().context("Invalid configuration")?;
    BriefGenerator::from_config(&config).context("Failed to initialise brief generator")
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}
