//! Subcommand implementations.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;
use tracing::info;

use kiln_cooccur::{ClassificationRules, CoOccurrenceGraph, parse_git_log};
use kiln_inference::{InferredDependency, infer_rigging_dependencies, load_feature_map,
    predict_impacted_targets};
use kiln_manifest::{Manifest, TestDag};
use kiln_runner::NativeRunner;
use kiln_status::{StatusFile, StatusLock, StoreConfig, TestEntry, TestState};
use kiln_sweep::{BurnInSweep, DEFAULT_MAX_ITERATIONS, DEFAULT_TIMEOUT_SECS, handle_stable_failure};
use kiln_telemetry::parse_output;
use kiln_workspace::{WorkspaceDiscovery, merge_discovered_tests};

use super::{Cli, Command, GraphCommand};
use crate::config::{DEFAULT_STATUS_FILE, FileConfig};

pub(super) fn dispatch(cli: &Cli, file_config: &FileConfig) -> Result<()> {
    let status_path = resolve_status_path(cli, file_config);

    match &cli.command {
        Command::Burnin {
            manifest,
            tests,
            max_iterations,
            timeout_secs,
            min_reliability,
            statistical_significance,
        } => burnin(
            &status_path,
            manifest,
            tests,
            max_iterations.or(file_config.max_iterations),
            timeout_secs.or(file_config.timeout_secs),
            min_reliability.or(file_config.min_reliability),
            statistical_significance.or(file_config.statistical_significance),
        ),
        Command::Promote { tests } => promote(&status_path, tests),
        Command::Deflake { tests } => deflake(&status_path, tests),
        Command::Demote {
            manifest,
            test,
            max_reruns,
            timeout_secs,
        } => demote(
            &status_path,
            manifest,
            test,
            *max_reruns,
            timeout_secs.or(file_config.timeout_secs),
        ),
        Command::Status { json } => status(&status_path, *json),
        Command::Parse {
            file,
            manifest,
            test,
            feature_map,
        } => parse(file, manifest.as_deref(), test.as_deref(), feature_map.as_deref()),
        Command::Graph { command } => match command {
            GraphCommand::Build { git_log, output } => graph_build(git_log.as_deref(), output),
        },
        Command::Predict {
            graph,
            manifest,
            files,
        } => predict(graph, manifest, files),
        Command::MergeDiscovery {
            manifest,
            discovery,
            output,
        } => merge_discovery(manifest, discovery, output.as_deref()),
    }
}

fn resolve_status_path(cli: &Cli, file_config: &FileConfig) -> Utf8PathBuf {
    cli.status_file
        .clone()
        .or_else(|| file_config.status_file.clone())
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_STATUS_FILE))
}

#[allow(clippy::too_many_arguments)]
fn burnin(
    status_path: &Utf8Path,
    manifest_path: &Utf8Path,
    tests: &[String],
    max_iterations: Option<u32>,
    timeout_secs: Option<u64>,
    min_reliability: Option<f64>,
    statistical_significance: Option<f64>,
) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let dag = TestDag::from_manifest(&manifest);

    let mut lock = StatusLock::new(status_path)?;
    let _guard = lock.try_exclusive()?;

    let mut status = StatusFile::open(status_path);
    if min_reliability.is_some() || statistical_significance.is_some() {
        status.set_config(min_reliability, statistical_significance);
    }

    let mut sweep = BurnInSweep::new(&dag, &mut status, NativeRunner::new())
        .max_iterations(max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS))
        .timeout(Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)));

    let names = (!tests.is_empty()).then_some(tests);
    let result = sweep.run(names)?;

    for (test, state) in &result.decided {
        println!("{test}: {state}");
    }
    for test in &result.undecided {
        println!("{test}: undecided");
    }
    info!(
        decided = result.decided.len(),
        undecided = result.undecided.len(),
        total_runs = result.total_runs,
        "sweep finished"
    );
    println!(
        "sweep: {} decided, {} undecided, {} runs",
        result.decided.len(),
        result.undecided.len(),
        result.total_runs
    );
    Ok(())
}

fn promote(status_path: &Utf8Path, tests: &[String]) -> Result<()> {
    let mut status = StatusFile::open(status_path);
    for test in tests {
        status.promote(test)?;
        println!("{test}: burning_in");
    }
    status.save()
}

fn deflake(status_path: &Utf8Path, tests: &[String]) -> Result<()> {
    let mut status = StatusFile::open(status_path);
    for test in tests {
        status.deflake(test)?;
        println!("{test}: burning_in (counters reset)");
    }
    status.save()
}

fn demote(
    status_path: &Utf8Path,
    manifest_path: &Utf8Path,
    test: &str,
    max_reruns: u32,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let dag = TestDag::from_manifest(&manifest);

    let mut lock = StatusLock::new(status_path)?;
    let _guard = lock.try_exclusive()?;

    let mut status = StatusFile::open(status_path);
    if status.get_test_state(test) != Some(TestState::Stable) {
        bail!("{test} is not stable; demotion evaluates failed stable tests");
    }

    let runner = NativeRunner::new();
    let decision = handle_stable_failure(
        test,
        &dag,
        &mut status,
        &runner,
        max_reruns,
        Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    )?;
    println!("{test}: {}", decision.as_str());
    Ok(())
}

#[derive(Serialize)]
struct StatusReport<'a> {
    config: &'a StoreConfig,
    summary: BTreeMap<&'static str, usize>,
    tests: &'a BTreeMap<String, TestEntry>,
}

fn status(status_path: &Utf8Path, json: bool) -> Result<()> {
    let status = StatusFile::open(status_path);
    let tests = status.get_all_tests();

    let mut summary: BTreeMap<&'static str, usize> = BTreeMap::new();
    for entry in tests.values() {
        *summary.entry(entry.state.as_str()).or_insert(0) += 1;
    }

    if json {
        let report = StatusReport {
            config: status.config(),
            summary,
            tests,
        };
        let canonical = serde_json_canonicalizer::to_string(&report)
            .context("failed to emit canonical status JSON")?;
        println!("{canonical}");
        return Ok(());
    }

    println!(
        "store: {status_path} (min_reliability={}, significance={})",
        status.min_reliability(),
        status.statistical_significance()
    );
    if tests.is_empty() {
        println!("no tests tracked");
        return Ok(());
    }
    for (state, count) in &summary {
        println!("{state}: {count}");
    }
    for (label, entry) in tests {
        println!(
            "{label}  {}  runs={} passes={}  {}",
            entry.state, entry.runs, entry.passes, entry.last_updated
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ParseReport {
    #[serde(flatten)]
    parsed: kiln_telemetry::ParsedOutput,
    rigging_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inferred_dependencies: Option<Vec<InferredDependency>>,
}

fn parse(
    file: &Utf8Path,
    manifest_path: Option<&Utf8Path>,
    test: Option<&str>,
    feature_map_path: Option<&Utf8Path>,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read capture: {file}"))?;
    let parsed = parse_output(&text);
    let rigging_features = parsed.rigging_features();

    let inferred_dependencies = match (manifest_path, test) {
        (Some(manifest_path), Some(test)) => {
            let manifest = Manifest::load(manifest_path)?;
            let feature_map = feature_map_path.and_then(load_feature_map);
            Some(infer_rigging_dependencies(
                test,
                &rigging_features,
                &manifest,
                feature_map.as_ref(),
            ))
        }
        _ => None,
    };

    let report = ParseReport {
        parsed,
        rigging_features,
        inferred_dependencies,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn graph_build(git_log: Option<&Utf8Path>, output: &Utf8Path) -> Result<()> {
    let text = match git_log {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read git log capture: {path}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read git log from stdin")?;
            buffer
        }
    };
    let commits = parse_git_log(&text);

    let mut graph = CoOccurrenceGraph::load(output)
        .unwrap_or_else(|| CoOccurrenceGraph::empty(ClassificationRules::default()));
    graph.update(&commits)?;
    graph.save(output)?;

    println!(
        "graph: {} commits analyzed, {} files tracked -> {output}",
        graph.metadata.total_commits_analyzed,
        graph.file_commits.len()
    );
    Ok(())
}

fn predict(graph_path: &Utf8Path, manifest_path: &Utf8Path, files: &[String]) -> Result<()> {
    let Some(graph) = CoOccurrenceGraph::load(graph_path) else {
        bail!("no co-occurrence graph at {graph_path}; run `kiln graph build` first");
    };
    let manifest = Manifest::load(manifest_path)?;

    for target in predict_impacted_targets(&graph, &manifest, files) {
        println!("{target}");
    }
    Ok(())
}

fn merge_discovery(
    manifest_path: &Utf8Path,
    discovery_path: &Utf8Path,
    output: Option<&Utf8Path>,
) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let discovery = WorkspaceDiscovery::load(discovery_path)?;
    let merged = merge_discovered_tests(&manifest, &discovery);

    let json = serde_json::to_string_pretty(&merged)?;
    match output {
        Some(path) => kiln_utils::write_file_atomic(path, &json)?,
        None => println!("{json}"),
    }
    Ok(())
}
