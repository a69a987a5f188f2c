//! fontpatch - reconciles a regenerated font JSON file with a tuned copy.
//!
//! Identifies the shared document type of the old and new files against the
//! schema catalog, copies the type's regeneration-owned fields from the new
//! file into the old one, and writes the result next to the old file.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use font_patch::catalog::load_dir;
use font_patch::{
    builtin_rules, Confirm, DocRole, MergeEvent, MergeReport, PatchError, Patcher,
    BUILTIN_TYPE_ORDER,
};

/// Schema-driven JSON patching for regenerated font assets
#[derive(Parser, Debug)]
#[command(name = "fontpatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the newly regenerated JSON file
    #[arg(long)]
    new: PathBuf,

    /// Path to the old JSON file receiving the patch
    #[arg(long)]
    old: PathBuf,

    /// Directory holding the schema catalog
    #[arg(long, default_value = "Schema")]
    schema_dir: PathBuf,

    /// Where to write the patched file (default: <old>_patched.json)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Dry run: log every decision but write nothing
    #[arg(long)]
    debug: bool,

    /// Message catalog language code
    #[arg(long, default_value = "en-us")]
    lang: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = run(cli) {
        error!("{}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Installs a stdout layer plus a timestamped log file in the working
/// directory.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let log_path = format!("{}_log.txt", chrono::Local::now().format("%Y-%m-%d-%H%M%S"));
    let log_file = fs::File::create(&log_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    info!("log file created: {}", log_path);
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let messages = Messages::load(&cli.lang);

    let new_doc = load_json(&cli.new, &messages)?;
    let old_doc = load_json(&cli.old, &messages)?;

    let catalog = load_dir(&cli.schema_dir, &BUILTIN_TYPE_ORDER, builtin_rules())?;
    if catalog.is_empty() {
        return Err(format!("no schema files found in {}", cli.schema_dir.display()).into());
    }

    let mut confirm = PromptConfirm {
        messages: &messages,
        cli: &cli,
    };
    let outcome = match Patcher::new(&catalog).patch(old_doc, &new_doc, &mut confirm) {
        Ok(outcome) => outcome,
        Err(e) => return Err(render_patch_error(e, &cli, &messages).into()),
    };

    info!(
        "{}",
        messages.format("{} is of type {}.", &[&cli.old.display(), &outcome.type_name])
    );
    render_report(&outcome.report, &messages);

    if cli.debug {
        info!(
            "{}",
            messages.format("Debug mode enabled; no changes were written.", &[])
        );
        return Ok(());
    }

    let output = cli.output.clone().unwrap_or_else(|| patched_path(&cli.old));
    write_pretty_json(&output, &outcome.patched)?;
    info!(
        "{}",
        messages.format("{} patched file generated.", &[&output.display()])
    );
    Ok(())
}

/// Message catalog mapping English templates to the selected language.
/// Missing catalogs and unknown templates fall back to English.
#[derive(Debug, Default)]
struct Messages {
    translations: HashMap<String, String>,
}

impl Messages {
    fn load(lang: &str) -> Messages {
        let path = format!("{}.json", lang);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                warn!("language file '{}' not found, using default language", path);
                return Messages::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(translations) => {
                info!("loaded language file: {}", path);
                Messages { translations }
            }
            Err(_) => {
                error!(
                    "language file {} has invalid format, using default language",
                    path
                );
                Messages::default()
            }
        }
    }

    fn get<'a>(&'a self, template: &'a str) -> &'a str {
        self.translations
            .get(template)
            .map(String::as_str)
            .unwrap_or(template)
    }

    /// Renders a template, substituting `{}` placeholders in order.
    fn format(&self, template: &str, args: &[&dyn fmt::Display]) -> String {
        let resolved = self.get(template);
        let mut out = String::with_capacity(resolved.len());
        let mut args = args.iter();
        let mut rest = resolved;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            match args.next() {
                Some(arg) => out.push_str(&arg.to_string()),
                None => out.push_str("{}"),
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// Stdin-backed confirmation for discarding keys only the new file has.
struct PromptConfirm<'a> {
    messages: &'a Messages,
    cli: &'a Cli,
}

impl Confirm for PromptConfirm<'_> {
    fn confirm_discard(&mut self, keys: &BTreeSet<String>) -> bool {
        let list = join_keys(keys);
        warn!(
            "{}",
            self.messages.format(
                "{} contains keys that are not present in {}: {}",
                &[&self.cli.new.display(), &self.cli.old.display(), &list]
            )
        );
        print!(
            "{}",
            self.messages
                .format("These keys will be discarded. Confirm? [Y/N]: ", &[])
        );
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        let confirmed = answer.trim().eq_ignore_ascii_case("y");
        if confirmed {
            info!(
                "{}",
                self.messages.format("User confirmed the operation.", &[])
            );
        }
        confirmed
    }
}

fn render_patch_error(err: PatchError, cli: &Cli, messages: &Messages) -> String {
    match err {
        PatchError::UnknownType { role } => {
            let path = match role {
                DocRole::Old => &cli.old,
                DocRole::New => &cli.new,
            };
            messages.format("{} has an unknown file type.", &[&path.display()])
        }
        PatchError::TypeMismatch { old_type, new_type } => messages.format(
            "{} ({}) and {} ({}) are of different types.",
            &[
                &cli.old.display(),
                &old_type,
                &cli.new.display(),
                &new_type,
            ],
        ),
        PatchError::MissingInNew { keys } => {
            warn!(
                "{}",
                messages.format(
                    "{} contains keys that are not present in {}: {}",
                    &[&cli.old.display(), &cli.new.display(), &join_keys(&keys)]
                )
            );
            messages.format(
                "Please adjust the new file to include the missing keys.",
                &[],
            )
        }
        PatchError::Aborted { .. } => messages.format("User aborted the operation.", &[]),
    }
}

fn render_report(report: &MergeReport, messages: &Messages) {
    for event in report.iter() {
        match event {
            MergeEvent::KeyReplaced { key } => info!(
                "{}",
                messages.format(
                    "{} from the new file has been applied to the old file.",
                    &[key]
                )
            ),
            MergeEvent::SubkeyReplaced { key, subkey } => info!(
                "{}",
                messages.format(
                    "{}.{} from the new file has been applied to the old file.",
                    &[key, subkey]
                )
            ),
            MergeEvent::SubkeySkipped { key, subkey } => warn!(
                "{}",
                messages.format(
                    "{}.{} does not exist in one of the files; not updated.",
                    &[key, subkey]
                )
            ),
            MergeEvent::TypeMismatchFallback { key } => info!(
                "{}",
                messages.format("Due to type mismatch, {} has been fully replaced.", &[key])
            ),
            MergeEvent::KeySkipped { key } => warn!(
                "{}",
                messages.format("{} does not exist in both files; no replacement made.", &[key])
            ),
            MergeEvent::NoRulesForType { type_name } => warn!(
                "{}",
                messages.format("No replacement rules defined for type {}.", &[type_name])
            ),
        }
    }
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn load_json(path: &Path, messages: &Messages) -> Result<Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|_| messages.format("{} not found.", &[&path.display()]))?;
    let doc = serde_json::from_str(&content).map_err(|_| {
        messages.format(
            "{} cannot be read as a JSON file. Please check the format.",
            &[&path.display()],
        )
    })?;
    Ok(doc)
}

fn patched_path(old: &Path) -> PathBuf {
    match old.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => old.with_file_name(format!("{}_patched.json", stem)),
        None => old.with_extension("patched.json"),
    }
}

/// Writes the document as 4-space-indented JSON, matching the formatting
/// of the hand-maintained inputs.
fn write_pretty_json(path: &Path, doc: &Value) -> Result<(), Box<dyn std::error::Error>> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    buf.push(b'\n');
    fs::write(path, buf)?;
    Ok(())
}
