use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use sheetfill::{
    CharacterRecord, PortraitSource, SchemaTag, SheetExporter, SheetFillError,
    inspect_template_path, schema_coverage,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Repeat for more detail (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fill a template from a character JSON file.
    Export {
        #[arg(long, value_name = "CHARACTER.json")]
        character: PathBuf,
        #[arg(long, value_name = "TEMPLATE.pdf")]
        template: PathBuf,
        /// PNG or JPEG file, or a data: URI.
        #[arg(long, value_name = "IMAGE")]
        portrait: Option<String>,
        #[arg(long, value_name = "OUT.pdf")]
        out: PathBuf,
        #[arg(long, value_name = "PATH")]
        debug_log: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        perf_log: Option<PathBuf>,
    },
    /// List a template's form fields.
    Inspect {
        #[arg(value_name = "TEMPLATE.pdf")]
        template: PathBuf,
        #[arg(long)]
        json: bool,
        /// Check the template against a schema table (legacy|current).
        #[arg(long, value_name = "SCHEMA")]
        schema: Option<String>,
    },
    /// Print the field map an export would apply, without touching a PDF.
    Fields {
        #[arg(long, value_name = "CHARACTER.json")]
        character: PathBuf,
        /// Only the name matters; it selects the schema.
        #[arg(long, value_name = "TEMPLATE.pdf")]
        template: PathBuf,
    },
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn load_portrait(raw: &str) -> Result<PortraitSource, String> {
    let source = if raw.starts_with("data:") {
        PortraitSource::from_data_uri(raw)
    } else {
        PortraitSource::from_path(Path::new(raw))
    };
    source.map_err(|err| err.to_string())
}

fn run_export(
    character: &Path,
    template: &Path,
    portrait: Option<&str>,
    out: &Path,
    debug_log: Option<PathBuf>,
    perf_log: Option<PathBuf>,
) -> Result<(), String> {
    let record = CharacterRecord::from_json_path(character).map_err(|err| err.to_string())?;
    // A bad portrait only costs the picture.
    let portrait = portrait.and_then(|raw| match load_portrait(raw) {
        Ok(source) => Some(source),
        Err(err) => {
            log::warn!("portrait skipped: {err}");
            None
        }
    });

    let mut builder = SheetExporter::builder();
    if let Some(path) = debug_log {
        builder = builder.debug_log(path);
    }
    if let Some(path) = perf_log {
        builder = builder.perf_log(path);
    }
    let exporter = builder.build().map_err(|err| err.to_string())?;
    let report = exporter
        .export_to_path(&record, template, portrait.as_ref(), out)
        .map_err(|err: SheetFillError| format!("{}: {err}", err.code().as_str()))?;

    println!(
        "{}: {} text, {} checkboxes, {} hidden, {} warnings",
        out.display(),
        report.text_filled,
        report.checkboxes_set,
        report.widgets_hidden,
        report.warnings.len()
    );
    Ok(())
}

fn run_inspect(template: &Path, json: bool, schema: Option<&str>) -> Result<(), String> {
    let report = inspect_template_path(template).map_err(|err| err.to_string())?;
    let schema = match schema {
        Some(raw) => Some(
            SchemaTag::from_id(raw).ok_or_else(|| format!("unknown schema `{raw}`"))?,
        ),
        None => None,
    };
    let coverage = schema.map(|tag| schema_coverage(&report, tag));

    if json {
        let value = serde_json::json!({ "template": report, "coverage": coverage });
        let text = serde_json::to_string_pretty(&value).map_err(|err| err.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "PDF {} | {} page(s) | {} bytes | {} field(s)",
        report.pdf_version,
        report.page_count,
        report.file_size_bytes,
        report.fields.len()
    );
    for field in &report.fields {
        println!("{:<12} {}", field.kind.as_str(), field.name);
    }
    if let Some(coverage) = coverage {
        println!(
            "schema {}: {} matched, {} missing, {} kind mismatches",
            coverage.schema,
            coverage.matched,
            coverage.missing.len(),
            coverage.kind_mismatches.len()
        );
        for name in &coverage.missing {
            println!("  missing  {name}");
        }
        for name in &coverage.kind_mismatches {
            println!("  mismatch {name}");
        }
    }
    Ok(())
}

fn run_fields(character: &Path, template: &Path) -> Result<(), String> {
    let record = CharacterRecord::from_json_path(character).map_err(|err| err.to_string())?;
    let exporter = SheetExporter::builder()
        .build()
        .map_err(|err| err.to_string())?;
    let (schema, map) = exporter.field_map(&record, &template.to_string_lossy());
    let value = serde_json::json!({ "schema": schema.id(), "fields": map });
    let text = serde_json::to_string_pretty(&value).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Command::Export {
            character,
            template,
            portrait,
            out,
            debug_log,
            perf_log,
        } => run_export(
            &character,
            &template,
            portrait.as_deref(),
            &out,
            debug_log,
            perf_log,
        ),
        Command::Inspect {
            template,
            json,
            schema,
        } => run_inspect(&template, json, schema.as_deref()),
        Command::Fields {
            character,
            template,
        } => run_fields(&character, &template),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
