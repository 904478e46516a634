//! stashguard
//!
//! Command-line collaborator for the stashguard rule engine: explains rule
//! sets, runs scenario files, and writes the audit trail.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use stashguard_cli::{ActionReport, ActionResult, Cli, CliConfig, Commands, Renderer, Scenario, World};
use stashguard_policy::{PolicyEngine, RuleRegistry, RuleSetSpec};
use stashguard_telemetry::{AuditTrail, MetricsCollector};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = CliConfig::load(&cli.config, &cli)?;
    let engine = PolicyEngine::with_config(RuleRegistry::with_builtins(), config.engine.clone());
    let renderer = Renderer::new(config.money_format)?;

    match &cli.command {
        Commands::Explain { policy, json } => explain(&engine, &renderer, policy, *json),
        Commands::Check {
            scenario,
            print_metrics,
            json,
            ..
        } => {
            let handle = if *print_metrics {
                Some(init_metrics()?)
            } else {
                None
            };

            check(&engine, &renderer, &config, scenario, *json)?;

            if let Some(handle) = handle {
                println!();
                print!("{}", handle.render());
            }
            Ok(())
        }
        Commands::Kinds => {
            for kind in engine.registry().kinds() {
                println!("{}", kind);
            }
            Ok(())
        }
    }
}

fn explain(engine: &PolicyEngine, renderer: &Renderer, policy: &Path, json: bool) -> Result<()> {
    let spec = RuleSetSpec::from_file(policy)
        .with_context(|| format!("failed to load rule set {}", policy.display()))?;
    let ruleset = engine.load_ruleset(&spec)?;
    let entries = ruleset.explain();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("(no conditions: every action is permitted)");
    } else {
        for line in renderer.render_trace(&entries) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn check(engine: &PolicyEngine, renderer: &Renderer, config: &CliConfig, path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut world = World::build(&scenario, engine, base_dir)?;
    let mut audit = AuditTrail::new();
    let metrics = MetricsCollector::new();

    let reports = world.run(
        &scenario.actions,
        engine,
        config.commit_permitted,
        &mut audit,
        &metrics,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(renderer, report);
        }
        let snapshot = metrics.snapshot();
        println!(
            "{} actions: {} permitted, {} denied, {} failed, {} entries recorded",
            snapshot.evaluations, snapshot.permitted, snapshot.denied, snapshot.errors, snapshot.recorded
        );
    }

    if let Some(audit_path) = &config.audit_path {
        audit
            .write_json(audit_path)
            .with_context(|| format!("failed to write audit trail {}", audit_path.display()))?;
        info!(path = %audit_path.display(), events = audit.events().len(), "Audit trail written");
    }

    Ok(())
}

fn print_report(renderer: &Renderer, report: &ActionReport) {
    match &report.result {
        ActionResult::Decided {
            decision,
            committed,
            commit_error,
        } => {
            let verdict = if decision.permitted { "PERMITTED" } else { "DENIED" };
            println!(
                "#{} {} by {} on {}: {}",
                report.index, report.kind, report.agent, report.stash, verdict
            );
            for evaluation in &decision.evaluations {
                println!("  stash {}:", evaluation.stash);
                for line in renderer.render_trace(&evaluation.evaluation.explain()) {
                    println!("    {}", line);
                }
            }
            if !committed.is_empty() {
                let ids: Vec<String> = committed.iter().map(ToString::to_string).collect();
                println!("  recorded in {}", ids.join(", "));
            }
            if let Some(error) = commit_error {
                println!("  not recorded: {}", error);
            }
        }
        ActionResult::Failed { error, message } => {
            println!(
                "#{} {} by {} on {}: ERROR ({})",
                report.index, report.kind, report.agent, report.stash, error
            );
            println!("  {}", message);
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("stashguard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stashguard=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "stashguard_decisions_total",
        "Total number of authorization decisions by verdict"
    );
    metrics::describe_counter!(
        "stashguard_evaluation_errors_total",
        "Total number of failed evaluations by error type"
    );
    metrics::describe_histogram!(
        "stashguard_evaluation_latency_us",
        metrics::Unit::Microseconds,
        "Authorization latency in microseconds"
    );

    Ok(handle)
}
