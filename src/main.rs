mod cli;
#[cfg(test)]
mod fixtures;
mod html;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Cli;
use opinion_core::{AppConfig, DateRange, ErrorExt, ErrorReporter, SearchQuery};
use opinion_search::{SearchOutcome, SearchSession};
use render::View;
use solr_client::SolrApiClient;
use std::io::{self, BufRead, Write};
use std::path::Path;
use text_analysis::Decorator;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG_FILE: &str = "ev-opinion-search.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);
    info!("Using Solr core {}", config.core_url());

    let client = SolrApiClient::new(&config.solr)?;
    let mut session = SearchSession::from_config(client, &config);

    let date_range = match (cli.from, cli.to) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
        _ => None,
    };
    let query = SearchQuery::new(cli.query_text(), cli.result_type.into())
        .with_exact_phrase(cli.exact)
        .with_date_range(date_range)
        .with_rows(cli.rows.unwrap_or(config.search.default_rows));

    let view = View {
        model: cli.model.clone(),
        category: cli.category,
        cloud_size: config.display.word_cloud_size,
    };

    let mut outcome = match session.submit(query).await {
        Ok(outcome) => outcome,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            bail!(e.user_friendly_message());
        }
    };

    if let Some(model) = &view.model {
        if !outcome.aggregation.models().contains(model) {
            bail!(
                "Unknown model '{}', expected one of: {}",
                model,
                outcome.aggregation.models().join(", ")
            );
        }
    }

    print_outcome(&outcome, &view, cli.json)?;

    if !cli.no_prompt && !cli.json {
        if let Some(suggestion) = session.pending_suggestion().cloned() {
            if confirm(&format!("Search for '{}' instead? [y/N] ", suggestion.suggested))? {
                match session.accept_suggestion().await {
                    Ok(Some(rerun)) => {
                        outcome = rerun;
                        print_outcome(&outcome, &view, false)?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        e.log_warn();
                        bail!(e.user_friendly_message());
                    }
                }
            } else {
                session.dismiss_suggestion();
            }
        }
    }

    if let Some(path) = &cli.html {
        let decorator = Decorator::new(config.display.highlight_color.clone());
        html::write_page(path, &outcome, &decorator, view.cloud_size)
            .with_context(|| format!("Failed to write dashboard page {}", path.display()))?;
        info!("Wrote dashboard page to {}", path.display());
    }

    let backend = session.orchestrator().backend();
    for (kind, stats) in &backend.get_metrics().await.by_kind {
        debug!(
            "{:?}: {} requests, {} failed, avg {:?} (Solr {:?})",
            kind,
            stats.requests,
            stats.failures,
            stats.average_round_trip(),
            stats.average_q_time()
        );
    }
    match backend.export_metrics().await {
        Ok(metrics) => debug!("Solr request metrics: {}", metrics),
        Err(e) => warn!("Could not export request metrics: {}", e),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return AppConfig::load(default_path)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE));
    }

    let mut config = AppConfig::default();
    config.apply_env_overrides(std::env::vars());
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &AppConfig, verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = if verbose {
        "debug"
    } else {
        config.log_filter.0.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn print_outcome(outcome: &SearchOutcome, view: &View, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &render::render_json(outcome))?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", render::render_text(outcome, view))?;
    }
    stdout.flush()?;
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
