//! CLI: check a schema file, or validate JSON/NDJSON documents against it.
use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use beancheck::{Validators, ValidationErrors};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile constraint schemas into validators and check JSON documents against them
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the build-time checks on a schema and report what would be validated
    Check(CheckOut),
    /// validate documents and print a JSON error report
    Validate(ValidateOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document (`{ "root": ..., "types": { ... } }`)
    #[arg(long, short)]
    schema: PathBuf,

    /// root type to validate (defaults to the document's `root`, else its first type)
    #[arg(long)]
    root: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

#[derive(clap::Parser, Debug)]
struct ValidateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// partial-update mode: missing not_null fields are not reported
    #[arg(long, default_value_t = false)]
    partial: bool,

    /// output .json report file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document after pointer/jq selection.
struct Document {
    source: String,
    index: usize,
    value: Value,
}

#[derive(Serialize)]
struct DocumentReport<'a> {
    source: &'a str,
    index: usize,
    errors: Vec<ErrorReport<'a>>,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    path: &'a str,
    message: String,
    template: &'a str,
    #[serde(skip_serializing_if = "no_params")]
    params: &'a IndexMap<String, String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .map_err(|error| anyhow!("failed to resolve input file paths: {error}"))?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            let raw_values = if self.ndjson {
                source.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(serde_json::from_str::<Value>)
                    .collect::<Result<Vec<_>, _>>()
            } else {
                serde_json::from_str::<Value>(&source).map(|v| vec![v])
            };
            let raw_values = raw_values
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            let mut index = 0;
            for raw in raw_values {
                for value in self.select(raw, &source_path_str)? {
                    out.push(Document { source: source_path_str.clone(), index, value });
                    index += 1;
                }
            }
        }
        Ok(out)
    }

    fn select(&self, value: Value, source_path_str: &str) -> Result<Vec<Value>> {
        let value = match self.json_pointer.as_ref() {
            None => value,
            Some(pointer) => value.pointer(pointer).cloned().ok_or_else(|| {
                anyhow!("JSON pointer {pointer} selects nothing in {source_path_str}")
            })?,
        };
        match self.jq_expr.as_ref() {
            None => Ok(vec![value]),
            Some(jq_expr) => beancheck::jq_exec::run_jaq(jq_expr, &value)
                .with_context(|| format!("failed to apply jq expression to source file ({source_path_str})")),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns `false` when any document failed validation.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                let settings = &target.schema_settings;
                let (schema, root) = beancheck::path_de::load_schema(&settings.schema, settings.root.as_deref())?;
                let handle = beancheck::build(&schema, &root)
                    .with_context(|| format!("schema {} rejected", settings.schema.display()))?;
                if handle.is_noop() {
                    eprintln!("{} {root}: no reachable constraint, validation is skipped", "ok".green().bold());
                } else {
                    eprintln!("{} {root}: validator built", "ok".green().bold());
                }
                Ok(true)
            }
            Command::Validate(target) => {
                let settings = &target.schema_settings;
                let (schema, root) = beancheck::path_de::load_schema(&settings.schema, settings.root.as_deref())?;
                let validators = Validators::new();
                let handle = validators.register_named(&schema, &root)
                    .with_context(|| format!("schema {} rejected", settings.schema.display()))?;

                let documents = target.input_settings.load_documents()?;
                let results = documents
                    .par_iter()
                    .map(|doc| {
                        handle.validate_value(&doc.value, target.partial)
                            .with_context(|| format!("document {}#{} does not match `{root}`", doc.source, doc.index))
                    })
                    .collect::<Result<Vec<ValidationErrors>>>()?;

                let reports = documents.iter()
                    .zip(&results)
                    .map(|(doc, errors)| DocumentReport {
                        source: &doc.source,
                        index: doc.index,
                        errors: errors.iter().map(|e| ErrorReport {
                            path: &e.path,
                            message: e.message(),
                            template: &e.template,
                            params: &e.params,
                        }).collect(),
                    })
                    .collect::<Vec<_>>();
                let report_src = serde_json::to_string_pretty(&reports)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &report_src)?;
                } else {
                    println!("{report_src}");
                }

                let failed = reports.iter().filter(|r| !r.errors.is_empty()).count();
                print_summary(documents.len(), failed);
                Ok(failed == 0)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn no_params(params: &&IndexMap<String, String>) -> bool {
    params.is_empty()
}

fn print_summary(total: usize, failed: usize) {
    if failed == 0 {
        eprintln!("{} {total} document(s) valid", "ok".green().bold());
    } else {
        eprintln!("{} {failed} of {total} document(s) failed validation", "error".red().bold());
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error + Send + Sync>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(entry?);
            }
            if !matched_any {
                // an explicit glob that matched nothing is almost certainly a typo
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
