use anyhow::Context;
use clap::Parser;
use reqcheck_cli::cli::{Cli, Commands};
use reqcheck_cli::replay::{replay, Scenario};
use reqcheck_core::{ComplianceState, LeafId, NodeId, SubjectId};
use reqcheck_engine::EngineConfig;
use reqcheck_expression::{ExpressionDocument, NamedCollection};
use std::collections::HashMap;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render {
            document,
            name,
            nested,
            combined,
        } => {
            let named = load_document(&document)?;
            let renderer = named.collection().renderer();

            if combined {
                println!("{}", renderer.render_top_level()?);
                return Ok(());
            }

            let targets = match name {
                Some(name) => vec![named.require(&name)?],
                None => named.collection().top_level(),
            };
            for id in targets {
                let text = if nested {
                    renderer.render_nested(id)?
                } else {
                    renderer.render(id)?
                };
                println!("{}: {}", display_name(&named, id), text);
            }
        }

        Commands::TopLevel { document } => {
            let named = load_document(&document)?;
            for id in named.collection().top_level() {
                println!("{}", display_name(&named, id));
            }
        }

        Commands::Scope { document, name } => {
            let named = load_document(&document)?;
            let subject = named.require(&name)?;
            for id in named.collection().consumer_scope(subject)? {
                println!("{}", display_name(&named, id));
            }
        }

        Commands::Evaluate {
            document,
            results,
            name,
        } => {
            let named = load_document(&document)?;
            let content = std::fs::read_to_string(&results)
                .with_context(|| format!("failed to read results {}", results.display()))?;
            let verdicts: HashMap<LeafId, bool> = serde_yaml::from_str(&content)?;

            let targets = match name {
                Some(name) => vec![named.require(&name)?],
                None => named.collection().top_level(),
            };
            let subject = SubjectId::new("cli");
            for id in targets {
                let state = match named.collection().evaluate(id, &subject, &verdicts)? {
                    Some(verdict) => ComplianceState::from_verdict(verdict),
                    None => ComplianceState::Unknown,
                };
                println!("{}: {}", display_name(&named, id), state);
            }
        }

        Commands::Replay {
            scenario,
            config,
            settle_delay_ms,
            json,
        } => {
            let mut engine_config = EngineConfig::load(&config)?;
            if let Some(delay) = settle_delay_ms {
                engine_config = engine_config.with_settle_delay_ms(delay);
            }
            reqcheck_engine::describe_metrics();

            let scenario = Scenario::from_file(&scenario)?;
            let report = replay(&scenario, engine_config).await?;

            if json {
                for timed in &report.changes {
                    println!("{}", serde_json::to_string(timed)?);
                }
                return Ok(());
            }

            for timed in &report.changes {
                println!(
                    "[{:>6} ms] {}: {} -> {}",
                    timed.at_ms, timed.change.subject, timed.change.previous, timed.change.current
                );
            }

            println!();
            println!("Final states:");
            for (subject, state) in &report.final_states {
                println!("  {}: {}", subject, state);
            }

            let metrics = report.metrics;
            println!();
            println!(
                "  events: {}  settles: {}  superseded: {}  invalidations: {}  faults: {}",
                metrics.events,
                metrics.settles,
                metrics.superseded,
                metrics.invalidations,
                metrics.faults
            );
        }
    }

    Ok(())
}

fn load_document(path: &Path) -> anyhow::Result<NamedCollection> {
    let document = ExpressionDocument::from_file(path)?;
    Ok(document.build()?)
}

fn display_name(named: &NamedCollection, id: NodeId) -> String {
    named
        .name(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "reqcheck=debug,reqcheck_cli=debug,reqcheck_engine=debug,reqcheck_expression=debug"
    } else {
        "reqcheck=info,reqcheck_cli=info,reqcheck_engine=warn,reqcheck_expression=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
