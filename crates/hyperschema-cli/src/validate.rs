//! # Validate Subcommand
//!
//! Compiles one schema (after preloading any `--store` documents) and
//! checks each data file against it.
//!
//! Exit status: 0 when every file is valid, 1 when any file is invalid.
//! Unreadable files and invalid schemas are reported as errors.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use hyperschema_core::{NodeId, SchemaConfig, ValidationError};
use hyperschema_schema::{Mode, SchemaSet};

use crate::load::load_document;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema document to validate against.
    #[arg(long, short)]
    pub schema: PathBuf,

    /// Supporting schema documents that references may name by `id`.
    #[arg(long = "store", value_name = "PATH")]
    pub store: Vec<PathBuf>,

    /// Validate against the subschema at this pointer (e.g. `#/definitions/app`).
    #[arg(long, value_name = "POINTER")]
    pub schema_pointer: Option<String>,

    /// Stop at the first violation in each file.
    #[arg(long)]
    pub fail_fast: bool,

    /// Print one JSON report per data file.
    #[arg(long)]
    pub json: bool,

    /// Reject patterns that are not portable to ECMA 262.
    #[arg(long)]
    pub ecma_regex: bool,

    /// Report per-branch errors when an `allOf` fails.
    #[arg(long)]
    pub all_of_sub_errors: bool,

    /// Data files to validate.
    #[arg(required = true)]
    pub data: Vec<PathBuf>,
}

impl ValidateArgs {
    /// Environment configuration with command-line flags applied on top.
    fn config(&self) -> Result<SchemaConfig> {
        let mut config = SchemaConfig::from_env().context("invalid HYPERSCHEMA_* environment")?;
        if self.ecma_regex {
            config = config.with_ecma262_regex();
        }
        if self.all_of_sub_errors {
            config = config.with_all_of_sub_errors(true);
        }
        Ok(config)
    }

    fn mode(&self) -> Mode {
        if self.fail_fast {
            Mode::FailFast
        } else {
            Mode::CollectAll
        }
    }
}

/// Outcome for one data file, as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct Report {
    pub file: String,
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Run the validate subcommand, printing reports to stdout.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let reports = check(args)?;
    for report in &reports {
        if args.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            print!("{}", render(report));
        }
    }
    let invalid = reports.iter().filter(|r| !r.valid).count();
    tracing::info!(files = reports.len(), invalid, "validation finished");
    Ok(if invalid == 0 { 0 } else { 1 })
}

/// Validate every data file and collect the reports.
pub fn check(args: &ValidateArgs) -> Result<Vec<Report>> {
    let mut set = SchemaSet::new(args.config()?);

    if !args.store.is_empty() {
        let documents = args
            .store
            .iter()
            .map(|path| load_document(path))
            .collect::<Result<Vec<_>>>()?;
        set.initialize_store(&documents)
            .context("failed to load the document store")?;
    }

    let raw = load_document(&args.schema)?;
    let root = set
        .compile(&raw)
        .with_context(|| format!("failed to compile {}", args.schema.display()))?;
    let target = select(&set, root, args.schema_pointer.as_deref())?;

    let mode = args.mode();
    args.data
        .iter()
        .map(|path| {
            let data = load_document(path)?;
            let errors = match set.validate_with(target, &data, mode) {
                Ok(()) => Vec::new(),
                Err(errors) => errors.into_inner(),
            };
            Ok(Report {
                file: path.display().to_string(),
                valid: errors.is_empty(),
                errors,
            })
        })
        .collect()
}

fn select(set: &SchemaSet, root: NodeId, pointer: Option<&str>) -> Result<NodeId> {
    let Some(pointer) = pointer else {
        return Ok(root);
    };
    match set.graph().evaluate_pointer(root, pointer) {
        Some(id) => Ok(id),
        None => bail!("no subschema at {pointer}"),
    }
}

/// Human-readable rendering of a report.
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    if report.valid {
        out.push_str(&format!("{}: valid\n", report.file));
        return out;
    }
    out.push_str(&format!("{}: invalid\n", report.file));
    for error in &report.errors {
        render_error(&mut out, error, 1);
    }
    out
}

fn render_error(out: &mut String, error: &ValidationError, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{indent}{}: {} [{}] (schema {})\n",
        error.path, error.message, error.kind, error.pointer
    ));
    for (i, branch) in error.sub_errors.iter().flatten().enumerate() {
        if branch.is_empty() {
            continue;
        }
        out.push_str(&format!("{indent}  branch {i}:\n"));
        for nested in branch {
            render_error(out, nested, depth + 2);
        }
    }
}
