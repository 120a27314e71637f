use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{fs, path::PathBuf};
use tracing::info;

use livefutbol_season_scraper::{
    config::ScraperConfig,
    lineup::LineupExtractor,
    pipeline::{build_features, SeasonScraper},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a full season: fixtures, lineups and team statistics
    ScrapeSeason {
        /// Optional limit on number of matches to process
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Build the per-team per-matchday feature tables from scraped CSVs
    BuildFeatures {
        /// Directory holding the season CSVs (defaults to OUTPUT_DIR)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Parse a single saved lineup page and print the appearances
    ProcessLineup {
        /// Path to the HTML file to process
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();

    match cli.command {
        Commands::ScrapeSeason { limit } => {
            let mut scraper = SeasonScraper::new(config)?;
            scraper.run(limit)?;
        }
        Commands::BuildFeatures { data_dir } => {
            let dir = data_dir.unwrap_or_else(|| PathBuf::from(&config.output.data_dir));
            build_features(dir)?;
        }
        Commands::ProcessLineup { file } => {
            let html = fs::read_to_string(&file)?;
            info!("Processing lineup page {:?}", file);

            let players = LineupExtractor::new().parse(&html);
            let mut appearances: Vec<_> = players.values().collect();
            appearances.sort_by(|a, b| (&a.equipo, &a.nombre).cmp(&(&b.equipo, &b.nombre)));

            for appearance in appearances {
                println!(
                    "{:<30} {:<25} {:>3} min {:>2} goals",
                    appearance.nombre, appearance.equipo, appearance.minutos, appearance.goles
                );
            }
        }
    }

    Ok(())
}
