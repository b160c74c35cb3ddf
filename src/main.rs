use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cyclearb::arb::{AnalysisResult, ArbitrageSearch, CycleSearch, Currency};
use cyclearb::bootstrap::load_graph;
use cyclearb::config::Config;
use cyclearb::utils::logger::setup_logger;
use eyre::Result;
use log::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single search over an edge file and print the best cycle
    Search {
        /// JSON array of edge records
        #[arg(long)]
        graph: PathBuf,
        /// Overrides ARB_HOME_CURRENCY
        #[arg(long)]
        home: Option<String>,
        /// Overrides ARB_MAX_PATH_LENGTH
        #[arg(long)]
        max_hops: Option<usize>,
    },
    /// Run the background analysis loop until Ctrl-C
    Watch {
        /// JSON array of edge records
        #[arg(long)]
        graph: PathBuf,
        /// Overrides ARB_HOME_CURRENCY
        #[arg(long)]
        home: Option<String>,
        /// Overrides ARB_MAX_PATH_LENGTH
        #[arg(long)]
        max_hops: Option<usize>,
    },
}

fn apply_overrides(mut config: Config, home: Option<String>, max_hops: Option<usize>) -> Config {
    if let Some(home) = home {
        config.home_currency = Currency::new(home);
    }
    if let Some(max_hops) = max_hops {
        config.max_path_length = max_hops;
    }
    config
}

fn report(result: &AnalysisResult) {
    if result.is_profitable() {
        info!("Arbitrage found: {result}");
    } else {
        info!("No profitable cycle: {result}");
    }
}

async fn run_search(config: Config, graph: PathBuf) -> Result<()> {
    let graph = Arc::new(load_graph(&graph).await?);
    let search = CycleSearch::new(graph, config.home_currency, config.max_path_length)?;
    let result = search.search_for_arbitrage()?;
    report(&result);
    println!("{result}");
    Ok(())
}

async fn run_watch(config: Config, graph: PathBuf) -> Result<()> {
    let graph = Arc::new(load_graph(&graph).await?);
    let analyzer = ArbitrageSearch::new(
        graph,
        config.home_currency.clone(),
        config.max_path_length,
        |result: AnalysisResult| report(&result),
    )?
    .with_cadence(config.cadence());

    info!(
        "Watching for cycles through {} (max {} hops, {:?})",
        config.home_currency,
        config.max_path_length,
        config.cadence()
    );
    analyzer.start()?;

    tokio::signal::ctrl_c().await?;
    warn!("Ctrl-C received, stopping analysis");
    analyzer.stop().await?;
    info!("Analysis stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger()?;
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Search {
            graph,
            home,
            max_hops,
        } => run_search(apply_overrides(config, home, max_hops), graph).await,
        Commands::Watch {
            graph,
            home,
            max_hops,
        } => run_watch(apply_overrides(config, home, max_hops), graph).await,
    }
}
