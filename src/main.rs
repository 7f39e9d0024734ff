use anyhow::{Context, Result};
use arxiv_reviews::config::{
    default_config_path, find_config_file, load_config, Config, LogFormat, LOCAL_CONFIG_FILE,
};
use arxiv_reviews::models::ExportRecord;
use arxiv_reviews::search::{SearchPlan, Searcher};
use arxiv_reviews::sources::ArxivSource;
use arxiv_reviews::utils::{format_markdown, format_table, HttpClient};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arXiv Reviews - Find review, survey and tutorial articles on arXiv
#[derive(Parser, Debug)]
#[command(name = "arxiv-reviews")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find review, survey and tutorial articles on arXiv", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log line format (overrides the configuration file)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Markdown bullet list
    Markdown,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the title and ID searches and print the merged results
    #[command(alias = "s")]
    Search {
        /// Maximum number of results (overrides the configuration file)
        #[arg(long, short)]
        max_results: Option<usize>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
        output: OutputFormat,
    },

    /// Print the title query and the ID list built from the rules
    Query,

    /// Validate the configuration and summarize the rules
    Check,

    /// Write a default configuration file
    Init {
        /// Destination (default: the per-user configuration path)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(cli: &Cli, config: Option<&Config>) {
    let log_level = match cli.verbose {
        0 => config.map_or("info", |c| c.logging.level.as_str()),
        1 => "debug",
        _ => "trace",
    };
    let level = if cli.quiet { "error" } else { log_level };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_reviews={}", level)),
    );
    let format = cli
        .log_format
        .or_else(|| config.map(|c| c.logging.format))
        .unwrap_or_default();

    // Logs go to stderr so stdout stays clean for results
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn resolve_config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(find_config_file)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path, force } = &cli.command {
        init_tracing(&cli, None);
        return write_default_config(path.clone(), *force);
    }

    let config_path = resolve_config_path(&cli).with_context(|| {
        format!(
            "No configuration file found. Pass --config, create ./{}, or run `arxiv-reviews init`",
            LOCAL_CONFIG_FILE
        )
    })?;
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing(&cli, Some(&config));
    tracing::info!("Using config file: {}", config_path.display());

    let rules = Arc::new(config.validate()?);

    match cli.command {
        Commands::Search {
            max_results,
            output,
        } => {
            let client = HttpClient::with_timeout(config.search.request_timeout())?;
            let source = ArxivSource::with_client(Arc::new(client));
            let settings = config.search.to_settings(max_results)?;
            let searcher = Searcher::new(source, rules.clone(), settings);

            let outcome = searcher.search().await?;
            output_records(&outcome.to_records(&rules), output)?;
        }
        Commands::Query => {
            let plan = SearchPlan::new(&rules);
            println!(
                "Title query: {}",
                plan.title_query().unwrap_or("(none, no whitelist terms)")
            );
            println!("ID list ({}): {}", plan.id_list().len(), plan.id_list().join(","));
            println!("Combined: {}", plan.render());
        }
        Commands::Check => {
            let assertions = rules
                .whitelist()
                .iter()
                .chain(rules.blacklist())
                .filter(|term| term.has_assertions())
                .count();
            println!("Configuration OK: {}", config_path.display());
            println!("  categories:        {}", rules.categories().len());
            println!("  whitelist terms:   {}", rules.whitelist().len());
            println!("  blacklist terms:   {}", rules.blacklist().len());
            println!("  terms w/ context:  {}", assertions);
            println!("  whitelisted IDs:   {}", rules.id_whitelist().len());
            println!("  blacklisted IDs:   {}", rules.id_blacklist().len());
            println!(
                "  ignored overlaps:  {}",
                rules.id_whitelist_intersection_ignored().len()
            );
        }
        Commands::Init { .. } => unreachable!("handled before configuration is loaded"),
    }

    Ok(())
}

fn write_default_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path
        .or_else(default_config_path)
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::create_default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn output_records(records: &[ExportRecord], format: OutputFormat) -> Result<()> {
    let actual_format = if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    match actual_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Markdown => print!("{}", format_markdown(records)),
        OutputFormat::Table => {
            println!("{}", format_table(records));
            println!("{} results", records.len());
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_arguments() {
        let cli = Cli::parse_from([
            "arxiv-reviews",
            "-v",
            "--log-format",
            "json",
            "search",
            "--max-results",
            "25",
            "--output",
            "markdown",
        ]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        match cli.command {
            Commands::Search {
                max_results,
                output,
            } => {
                assert_eq!(max_results, Some(25));
                assert_eq!(output, OutputFormat::Markdown);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_init_with_path() {
        let cli = Cli::parse_from(["arxiv-reviews", "init", "/tmp/cfg.toml", "--force"]);
        match cli.command {
            Commands::Init { path, force } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/cfg.toml")));
                assert!(force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
