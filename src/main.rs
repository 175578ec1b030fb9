//! expert-discovery: command-line front end for the discovery engine
//!
//! Runs against the REST directory by default, or against a local JSON
//! catalog with `--catalog` for offline use.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use expert_discovery::{
    load_trending_domains, DirectoryService, DiscoveryConfig, DiscoveryEngine, Expert, ExpertId,
    HttpDirectoryClient, InMemoryDirectory, SearchFilterEngine, Session, ToggleOutcome,
};

#[derive(Parser)]
#[command(name = "expert-discovery")]
#[command(about = "Search, recommend and bookmark experts")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "expert-discovery.toml")]
    config: PathBuf,

    /// Directory service base URL (overrides config file)
    #[arg(long, env = "DISCOVERY_BASE_URL")]
    base_url: Option<String>,

    /// Serve from a local JSON catalog instead of the REST service
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Signed-in user's email
    #[arg(long, env = "DISCOVERY_EMAIL", requires = "token")]
    email: Option<String>,

    /// Auth token issued for the user
    #[arg(long, env = "DISCOVERY_TOKEN", requires = "email")]
    token: Option<String>,

    /// Log filter directive, e.g. `expert_discovery=debug`
    #[arg(long, default_value = "expert_discovery=info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the catalog
    Search {
        query: String,
        /// Restrict to a domain; repeatable
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Show recent searches
    Recent,
    /// Show the recommendation feed
    Recommend,
    /// Show the trending carousel
    Trending {
        /// Carousel advances to show
        #[arg(long, default_value_t = 0)]
        ticks: u32,
    },
    /// List catalog domains and trending domains
    Domains,
    /// Bookmark an expert
    Save { id: String },
    /// Remove a bookmark
    Unsave { id: String },
    /// List bookmarked experts
    Saved,
    /// Catalog statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = DiscoveryConfig::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.service.base_url = base_url;
    }
    if config.service.api_token.is_none() {
        config.service.api_token = cli.token.clone();
    }

    let service: Arc<dyn DirectoryService> = match &cli.catalog {
        Some(path) => {
            info!(path = %path.display(), "Using local catalog");
            Arc::new(InMemoryDirectory::from_json(&std::fs::read_to_string(path)?)?)
        }
        None => {
            info!(base_url = %config.service.base_url, "Using directory service");
            Arc::new(HttpDirectoryClient::new(config.service.clone())?)
        }
    };

    let session = Session::in_memory();
    if let (Some(email), Some(token)) = (cli.email, cli.token) {
        session.login(email, token);
    }
    debug!(?session, "Session ready");

    let engine = DiscoveryEngine::new(service, session, &config);
    run(&engine, cli.command, &config).await
}

async fn run(engine: &DiscoveryEngine, command: Command, config: &DiscoveryConfig) -> anyhow::Result<()> {
    match command {
        Command::Search { query, domains } => {
            let mut search = SearchFilterEngine::with_query(query);
            for domain in &domains {
                search.toggle_domain(domain);
            }
            let results = engine.search(&search).await?;
            println!("{} result(s)", results.len());
            print_experts(&results);
        }
        Command::Recent => {
            engine.session().require_user()?;
            for (i, entry) in engine.recent.load().await?.iter().enumerate() {
                println!("{}. {}", i + 1, entry);
            }
        }
        Command::Recommend => {
            engine.session().require_user()?;
            let feed = engine.recommendations.refresh().await;
            if let Some(featured) = engine.recommendations.featured() {
                println!("Featured: {} ({})", featured.name, featured.domain);
            }
            print_experts(&feed);
        }
        Command::Trending { ticks } => {
            engine
                .trending
                .load_from_catalog(&engine.catalog, engine.service())
                .await?;
            print_window(engine);
            for _ in 0..ticks {
                if !engine.trending.is_running() {
                    break;
                }
                tokio::time::sleep(config.trending.tick_interval()).await;
                print_window(engine);
            }
            engine.trending.stop();
        }
        Command::Domains => {
            let (catalog, trending) = tokio::join!(
                engine.catalog.ensure_loaded(engine.service()),
                load_trending_domains(engine.service())
            );
            catalog?;
            println!("Domains:");
            for domain in engine.catalog.domains().await {
                println!("  {}", domain);
            }
            if !trending.is_empty() {
                println!("Trending:");
                for domain in trending {
                    println!("  {} {}", domain.icon, domain.name);
                }
            }
        }
        Command::Save { id } => {
            let id = ExpertId::new(id);
            engine.bookmarks.load().await?;
            if engine.bookmarks.is_saved(&id) {
                println!("Already saved: {}", id);
            } else {
                report_toggle(engine.bookmarks.toggle(&id).await)?;
            }
        }
        Command::Unsave { id } => {
            engine.session().require_user()?;
            engine.saved.load().await?;
            let id = ExpertId::new(id);
            if engine.bookmarks.is_saved(&id) {
                report_toggle(engine.saved.remove(&id).await)?;
            } else {
                println!("Not saved: {}", id);
            }
        }
        Command::Saved => {
            engine.session().require_user()?;
            print_experts(&engine.saved.load().await?);
        }
        Command::Stats => {
            engine.catalog.ensure_loaded(engine.service()).await?;
            let stats = engine.catalog.stats().await;
            println!("Experts: {}", stats.total_experts);
            println!("Domains covered: {}", stats.domains_covered);
        }
    }
    Ok(())
}

fn report_toggle(outcome: ToggleOutcome) -> anyhow::Result<()> {
    match outcome {
        ToggleOutcome::Saved => println!("Expert saved successfully."),
        ToggleOutcome::Removed => println!("Expert removed from saved."),
        ToggleOutcome::Ignored => println!("Request already in flight"),
        ToggleOutcome::RequiresAuth => anyhow::bail!("sign in with --email and --token"),
        ToggleOutcome::Failed { message } => anyhow::bail!(message),
    }
    Ok(())
}

fn print_experts(experts: &[Expert]) {
    for e in experts {
        println!("{:<12} {:<28} {} | {}", e.id, e.name, e.domain, e.location);
    }
}

fn print_window(engine: &DiscoveryEngine) {
    let line: Vec<String> = engine
        .trending
        .window()
        .into_iter()
        .map(|slot| {
            if slot.highlighted {
                format!("[{}]", slot.item.name)
            } else {
                slot.item.name
            }
        })
        .collect();
    println!("{}", line.join("  "));
}
