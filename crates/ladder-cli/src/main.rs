// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ladder CLI entrypoint.
//!
//! Runs a rewrite program and prints the summary object to stdout.
//!
//! # Exit codes
//! - `0`: success (including `--dry-run` on a valid program)
//! - `2`: validation error (parse, signature, overlapping filters, bad
//!   budgets, conflict detection)
//! - `3`: runtime guard failure (term limit, ambiguous match under strict)
//! - `4`: I/O failure (program, snapshot, signature, or trace files)

#![deny(rust_2018_idioms)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]
// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use ladder_core::{
    CustomActions, GuardConfig, JsonlTracer, ResumeError, ResumeOverrides, RunConfig, Runtime,
    SchedulerKind, SignatureSet, Snapshot,
};
use ladder_lang::parse_program;

#[derive(Parser, Debug)]
#[command(name = "ladder", version, about = "Scale-labelled term rewriting runtime")]
struct Args {
    /// Program path, or `-` to read the program from stdin.
    program: String,

    /// Validate the program and exit without stepping.
    #[arg(long)]
    dry_run: bool,

    /// Append one JSON event per line to this file.
    #[arg(long, value_name = "PATH")]
    trace_jsonl: Option<PathBuf>,

    /// Also enqueue children of every newly inserted term.
    #[arg(long, overrides_with = "no_walk_children")]
    walk_children: bool,
    /// Disable the child walk (overrides a snapshot's stored flag).
    #[arg(long, overrides_with = "walk_children")]
    no_walk_children: bool,

    /// Depth bound for the child walk.
    #[arg(long, value_name = "N")]
    walk_depth: Option<u32>,

    /// Treat multiple matching rules as a fatal ambiguity.
    #[arg(long, overrides_with = "no_strict_matching")]
    strict_matching: bool,
    /// First matching rule wins (overrides a snapshot's stored flag).
    #[arg(long, overrides_with = "strict_matching")]
    no_strict_matching: bool,

    /// Reject programs with deterministically overlapping rules.
    #[arg(long)]
    detect_conflicts: bool,

    /// Per-symbol arity/scale signature file (JSON).
    #[arg(long, value_name = "PATH")]
    signature: Option<PathBuf>,

    /// Cap on unique store entries.
    #[arg(long, value_name = "N")]
    max_terms: Option<usize>,

    /// Write the final state as a resumable snapshot.
    #[arg(long, value_name = "PATH")]
    store_json: Option<PathBuf>,

    /// Resume from a snapshot written by --store-json.
    #[arg(long, value_name = "PATH")]
    load_store: Option<PathBuf>,

    /// Print only the applied-step count instead of the summary object.
    #[arg(long)]
    steps_only: bool,

    /// Frontier strategy: fifo, lifo, or random.
    #[arg(long, value_name = "KIND")]
    scheduler: Option<SchedulerKind>,

    /// Seed for the random scheduler.
    #[arg(long, value_name = "N")]
    scheduler_seed: Option<u64>,

    /// Per-rule fire budget, as name=N. Repeatable.
    #[arg(long = "rule-budget", value_name = "NAME=N")]
    rule_budget: Vec<String>,

    /// Allowlist a rule. Repeatable; other rules stop matching.
    #[arg(long = "only-rule", value_name = "NAME")]
    only_rule: Vec<String>,
    /// Blocklist a rule. Repeatable.
    #[arg(long = "skip-rule", value_name = "NAME")]
    skip_rule: Vec<String>,
    /// Allowlist a scale. Repeatable.
    #[arg(long = "only-scale", value_name = "N")]
    only_scale: Vec<u32>,
    /// Blocklist a scale. Repeatable.
    #[arg(long = "skip-scale", value_name = "N")]
    skip_scale: Vec<u32>,

    /// Override the program's step budget (also used on resume).
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,
}

/// Failure classes mapped onto process exit codes.
#[derive(Debug)]
enum Failure {
    /// Exit 2: the inputs are wrong; rerun with adjusted inputs.
    Validation(String),
    /// Exit 3: a guard stopped the run; the summary was still emitted.
    Guard(String),
    /// Exit 4: the filesystem got in the way.
    Io(String),
}

impl Failure {
    fn code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Guard(_) => 3,
            Self::Io(_) => 4,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) | Self::Guard(msg) | Self::Io(msg) => f.write_str(msg),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("ladder: {failure}");
            ExitCode::from(failure.code())
        }
    }
}

fn read_program_source(path: &str) -> Result<(String, String), Failure> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| Failure::Io(format!("reading stdin: {e}")))?;
        return Ok(("<stdin>".to_owned(), text));
    }
    let text = fs::read_to_string(path)
        .map_err(|e| Failure::Io(format!("reading program {path:?}: {e}")))?;
    let name = Path::new(path)
        .file_stem()
        .map_or_else(|| path.to_owned(), |s| s.to_string_lossy().into_owned());
    Ok((name, text))
}

fn parse_rule_budgets(entries: &[String]) -> Result<std::collections::BTreeMap<String, u64>, Failure> {
    let mut budgets = std::collections::BTreeMap::new();
    for entry in entries {
        let (name, count) = entry.split_once('=').ok_or_else(|| {
            Failure::Validation(format!("--rule-budget {entry:?} is not of the form name=N"))
        })?;
        let count: u64 = count.parse().map_err(|_| {
            Failure::Validation(format!("--rule-budget {entry:?} has a non-integer count"))
        })?;
        budgets.insert(name.to_owned(), count);
    }
    Ok(budgets)
}

fn load_signatures(path: Option<&PathBuf>) -> Result<Option<SignatureSet>, Failure> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = fs::read_to_string(path)
        .map_err(|e| Failure::Io(format!("reading signature {}: {e}", path.display())))?;
    let set = SignatureSet::from_json(&text)
        .map_err(|e| Failure::Validation(format!("signature {}: {e}", path.display())))?;
    Ok(Some(set))
}

fn guard_config(args: &Args) -> Result<GuardConfig, Failure> {
    Ok(GuardConfig {
        max_terms: args.max_terms,
        rule_budgets: parse_rule_budgets(&args.rule_budget)?,
        include_rules: args.only_rule.iter().cloned().collect::<BTreeSet<_>>(),
        exclude_rules: args.skip_rule.iter().cloned().collect::<BTreeSet<_>>(),
        include_scales: args.only_scale.iter().copied().collect::<BTreeSet<_>>(),
        exclude_scales: args.skip_scale.iter().copied().collect::<BTreeSet<_>>(),
    })
}

/// Tri-state reading of a `--flag` / `--no-flag` pair: `None` when neither
/// was given, so snapshot-stored settings can win on resume.
fn flag_override(set: bool, unset: bool) -> Option<bool> {
    match (set, unset) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn build_runtime(
    args: &Args,
    program: ladder_core::Program,
    signatures: Option<SignatureSet>,
) -> Result<Runtime, Failure> {
    let customs = CustomActions::new();

    if let Some(path) = &args.load_store {
        let text = fs::read_to_string(path)
            .map_err(|e| Failure::Io(format!("reading snapshot {}: {e}", path.display())))?;
        let snapshot = Snapshot::from_json(&text)
            .map_err(|e| Failure::Io(format!("snapshot {}: {e}", path.display())))?;
        let overrides = ResumeOverrides {
            scheduler: args.scheduler,
            scheduler_seed: args.scheduler_seed,
            walk_children: flag_override(args.walk_children, args.no_walk_children),
            walk_depth: args.walk_depth.map(Some),
            strict_matching: flag_override(args.strict_matching, args.no_strict_matching),
        };
        return Runtime::resume(program, &snapshot, &overrides, customs, signatures).map_err(
            |err| match err {
                ResumeError::Corrupt(_) => Failure::Io(err.to_string()),
                ResumeError::Validation(_) | ResumeError::StoreRejected(_) => {
                    Failure::Validation(err.to_string())
                }
            },
        );
    }

    let config = RunConfig {
        scheduler: args.scheduler.unwrap_or(SchedulerKind::Fifo),
        scheduler_seed: args.scheduler_seed.unwrap_or(0),
        walk_children: flag_override(args.walk_children, args.no_walk_children)
            .unwrap_or(false),
        walk_depth: args.walk_depth,
        strict_matching: flag_override(args.strict_matching, args.no_strict_matching)
            .unwrap_or(false),
        detect_conflicts: args.detect_conflicts,
        guards: guard_config(args)?,
    };
    Runtime::new(program, config, customs, signatures)
        .map_err(|e| Failure::Validation(e.to_string()))
}

fn write_snapshot(path: &Path, runtime: &Runtime) -> Result<(), Failure> {
    let text = runtime
        .snapshot()
        .to_json()
        .map_err(|e| Failure::Io(format!("encoding snapshot: {e}")))?;
    fs::write(path, text)
        .map_err(|e| Failure::Io(format!("writing snapshot {}: {e}", path.display())))
}

fn run(args: &Args) -> Result<(), Failure> {
    let (name, source) = read_program_source(&args.program)?;
    let mut program =
        parse_program(&name, &source).map_err(|e| Failure::Validation(e.to_string()))?;
    if let Some(max_steps) = args.max_steps {
        program.max_steps = max_steps;
    }
    let rule_count = program.rules.len();
    let signatures = load_signatures(args.signature.as_ref())?;

    let mut runtime = build_runtime(args, program, signatures)?;

    if args.dry_run {
        let echo = serde_json::json!({
            "program": name,
            "valid": true,
            "root": runtime.root().to_string(),
            "rules": rule_count,
        });
        println!("{echo}");
        return Ok(());
    }

    if let Some(path) = &args.trace_jsonl {
        let file = fs::File::create(path)
            .map_err(|e| Failure::Io(format!("opening trace {}: {e}", path.display())))?;
        runtime.set_tracer(Box::new(JsonlTracer::new(file)));
    }

    let outcome = runtime.run();

    // Guard failures still flush the snapshot and the summary; the caller
    // reruns with adjusted inputs, nothing is retried here.
    if let Some(path) = &args.store_json {
        write_snapshot(path, &runtime)?;
    }
    if let Some(warning) = runtime.tracer_warning() {
        eprintln!("ladder: {warning}");
    }

    let summary = runtime.summary();
    if args.steps_only {
        println!("{}", summary.events);
    } else {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| Failure::Io(format!("encoding summary: {e}")))?;
        println!("{text}");
    }

    outcome
        .map(|_| ())
        .map_err(|err| Failure::Guard(err.to_string()))
}
