use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use taxo_logging::{JsonRunLog, RunEvent};
use taxo_resolve::{Resolver, ResolverConfig};
use taxo_table::{annotate, AnnotatedTable, FoodTable};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "taxo",
    version,
    about = "Annotates food composition tables with Open Tree taxonomy identifiers"
)]
struct Cli {
    /// Input CSV with a header row and a units row.
    input: PathBuf,
    /// Output CSV with the annotation columns appended.
    output: PathBuf,
    /// Optional TOML file with resolver settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured TNRS endpoint.
    #[arg(long)]
    endpoint: Option<String>,
    /// Overrides the configured batch size.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Overrides the configured inter-batch pause, in milliseconds.
    #[arg(long)]
    pause_ms: Option<u64>,
    /// Header of the column holding scientific names.
    #[arg(long, default_value = "Scientific Name")]
    column: String,
    /// Appends structured run events to this JSON-lines file.
    #[arg(long)]
    run_log: Option<PathBuf>,
}

impl Cli {
    fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::load(path)?,
            None => ResolverConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size.max(1);
        }
        if let Some(pause_ms) = self.pause_ms {
            config.pause_ms = pause_ms;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolver_config()?;
    let run_log = cli
        .run_log
        .as_ref()
        .map(JsonRunLog::open)
        .transpose()
        .context("opening run log")?;

    let table = FoodTable::load(&cli.input, &cli.column)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    println!("Loaded {} rows from {}", table.row_count(), cli.input.display());

    let names = table.distinct_names();
    record_event(
        run_log.as_ref(),
        RunEvent::phase("load", "dataset loaded")
            .with_counter("rows", table.row_count())
            .with_counter("distinct_names", names.len()),
    )?;

    if names.is_empty() {
        println!("No scientific names found; writing output without annotations.");
        record_event(
            run_log.as_ref(),
            RunEvent::phase("cascade", "no scientific names found; skipping service"),
        )?;
        let annotated = annotate(&table, &IndexMap::new());
        save(&annotated, &cli)?;
        return Ok(());
    }
    println!("Found {} distinct scientific names.", names.len());

    let resolver = Resolver::from_config(config).context("building match service client")?;
    let outcome = resolver.resolve_names(&names).await;
    for stage in &outcome.stages {
        println!(
            "Stage {}: {} queried, {} matched, {} remaining",
            stage.stage, stage.queried, stage.matched, stage.remaining
        );
        record_event(
            run_log.as_ref(),
            RunEvent::phase(format!("cascade.{}", stage.stage), "stage complete")
                .with_counter("queried", stage.queried)
                .with_counter("matched", stage.matched)
                .with_counter("remaining", stage.remaining),
        )?;
    }

    let annotated = annotate(&table, &outcome.records);
    save(&annotated, &cli)?;
    record_event(
        run_log.as_ref(),
        RunEvent::phase("save", "output written")
            .with_counter("rows", annotated.row_count()),
    )?;

    println!("\nMatch level summary:");
    for (label, count) in annotated.summary().entries() {
        println!("  {label}: {count}");
    }
    Ok(())
}

fn save(annotated: &AnnotatedTable, cli: &Cli) -> Result<()> {
    annotated
        .save(&cli.output)
        .with_context(|| format!("saving {}", cli.output.display()))?;
    println!(
        "Saved {} annotated rows to {}",
        annotated.row_count(),
        cli.output.display()
    );
    Ok(())
}

fn record_event(log: Option<&JsonRunLog>, event: RunEvent) -> Result<()> {
    if let Some(log) = log {
        log.record(&event)?;
    }
    Ok(())
}
