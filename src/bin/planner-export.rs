//! Planner export CLI tool
//!
//! A command-line tool for exporting the year planner to PDF and managing
//! the persisted debug mode.

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;

use planner_export::date::{parse_date_expression, resolve_date};
use planner_export::deps::DependencyConfig;
use planner_export::dom::{Element, HostDocument};
use planner_export::export::{ExportConfig, ExportRequest, ExportedDocument, Exporter};
use planner_export::logging::{LogBridge, LoggerRegistry, LoggingConfig};
use planner_export::pdf::extract_metadata;
use planner_export::planner::{
    build_legend, build_year_grid, load_entries, print_view_document, used_categories, Category,
    PlannerEntry,
};
use planner_export::render::RasterOptions;

/// Planner Export - Export the year planner as a landscape PDF
#[derive(Parser)]
#[command(name = "planner-export")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Export 2025 with entries and a legend
    planner-export export --year 2025 --entries planner.json -o planner.pdf

    # Export what the print view shows, sharper and without waiting
    planner-export print-view --year 2025 --entries planner.json --scale 3 --settle-ms 0

    # Keep debug logging on for future runs
    planner-export debug enable

    # Inspect exported files
    planner-export info \"year-planner-*.pdf\"")]
struct Cli {
    /// Log at DEBUG (overrides the persisted debug mode)
    #[arg(
        long,
        global = true,
        env = "PLANNER_EXPORT_DEBUG",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    debug: Option<bool>,

    /// Directory holding the persisted debug mode
    #[arg(long, global = true, env = "PLANNER_EXPORT_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Year to export
    #[arg(long)]
    year: i32,

    /// Planner entries as a JSON array
    #[arg(long)]
    entries: Option<PathBuf>,

    /// Day highlighted as today (e.g., "today", "none", "2025-03-14")
    #[arg(long, default_value = "today")]
    today: String,

    /// Leave the legend strip out
    #[arg(long)]
    no_legend: bool,

    /// Rasterization scale for print sharpness (1-4)
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Wait before rasterizing, in milliseconds
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,

    /// Additional font directory (repeatable)
    #[arg(long)]
    font_dir: Vec<PathBuf>,

    /// Page title (default "Year Planner <year>")
    #[arg(long)]
    title: Option<String>,

    /// Also write the rasterized grid as PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Output PDF file path (default year-planner-<year>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Open the output file after creation
    #[arg(long)]
    open: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a year grid built from planner entries
    Export(ExportArgs),

    /// Export the print container of the planner page
    PrintView(ExportArgs),

    /// Enable, disable or show the persisted debug mode
    Debug {
        #[arg(value_enum)]
        action: DebugAction,
    },

    /// Show information about exported PDF files
    Info {
        /// PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DebugAction {
    Enable,
    Disable,
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let state_dir = cli
        .state_dir
        .or_else(|| dirs::config_dir().map(|dir| dir.join("planner-export")))
        .context("no configuration directory available; pass --state-dir")?;

    let registry =
        LoggerRegistry::new(LoggingConfig::console(&state_dir).with_explicit_debug(cli.debug));
    LogBridge::new(&registry).install()?;

    match cli.command {
        Commands::Export(args) => cmd_export(&registry, args, false).await,
        Commands::PrintView(args) => cmd_export(&registry, args, true).await,
        Commands::Debug { action } => cmd_debug(&registry, &state_dir, action),
        Commands::Info { inputs } => cmd_info(inputs),
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> planner_export::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let entries = glob(&pattern)
                .map_err(|e| planner_export::Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
            let mut matched = false;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                return Err(planner_export::Error::NoFilesMatched(pattern));
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

fn read_entries(path: Option<&Path>) -> Result<Vec<PlannerEntry>> {
    match path {
        Some(path) => load_entries(path)
            .with_context(|| format!("failed to load entries from {}", path.display())),
        None => Ok(Vec::new()),
    }
}

fn resolve_today(expr: &str) -> Result<Option<NaiveDate>> {
    let expr = parse_date_expression(expr)?;
    Ok(resolve_date(&expr))
}

fn legend_categories(entries: &[PlannerEntry]) -> Vec<Category> {
    let used = used_categories(entries);
    if used.is_empty() {
        Category::ALL.to_vec()
    } else {
        used
    }
}

fn export_config(args: &ExportArgs) -> ExportConfig {
    ExportConfig {
        raster: RasterOptions {
            scale: args.scale,
            ..Default::default()
        },
        settle_delay: Duration::from_millis(args.settle_ms),
        deps: DependencyConfig {
            font_dirs: args.font_dir.clone(),
            ..Default::default()
        },
        title: args.title.clone(),
        ..Default::default()
    }
}

/// Export the planner, either from a built grid or from the print view
async fn cmd_export(registry: &LoggerRegistry, args: ExportArgs, print_view: bool) -> Result<()> {
    let entries = read_entries(args.entries.as_deref())?;
    let today = resolve_today(&args.today)?;
    let exporter = Exporter::new(export_config(&args), registry.export());

    registry
        .grid()
        .debug(format!("building {} with {} entries", args.year, entries.len()));

    let doc = if print_view {
        let host = print_view_document(args.year, &entries, today, !args.no_legend);
        exporter.export_print_view(&host, args.year).await?
    } else {
        let host = HostDocument::new(Element::new("body"));
        let grid = build_year_grid(args.year, &entries, today);
        let legend = (!args.no_legend).then(|| build_legend(&legend_categories(&entries)));

        let mut request = ExportRequest::new(args.year, &grid);
        if let Some(legend) = &legend {
            request = request.with_legend(legend);
        }
        exporter.export_grid(&host, request).await?
    };

    write_outputs(&doc, &args)
}

fn write_outputs(doc: &ExportedDocument, args: &ExportArgs) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&doc.file_name));
    doc.save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    eprintln!("Created: {}", output.display());

    if let Some(snapshot) = &args.snapshot {
        std::fs::write(snapshot, doc.grid_bitmap.encode_png()?)
            .with_context(|| format!("failed to write {}", snapshot.display()))?;
        eprintln!("Snapshot: {}", snapshot.display());
    }

    if args.open {
        open_file(&output)?;
    }
    Ok(())
}

fn cmd_debug(registry: &LoggerRegistry, state_dir: &Path, action: DebugAction) -> Result<()> {
    match action {
        DebugAction::Enable => {
            registry.enable_debug_mode();
            eprintln!("Debug mode enabled (state in {})", state_dir.display());
        }
        DebugAction::Disable => {
            registry.disable_debug_mode();
            eprintln!("Debug mode disabled");
        }
        DebugAction::Status => {
            let state = if registry.debug_mode_persisted() { "on" } else { "off" };
            println!("Debug mode: {}", state);
            println!("Export logger level: {}", registry.export().level());
        }
    }
    Ok(())
}

/// Show information about exported PDFs
fn cmd_info(inputs: Vec<String>) -> Result<()> {
    for path in expand_globs(inputs)? {
        let info = extract_metadata(&path)?;
        println!("{}", path.display());
        println!("  Pages: {}", info.page_count);
        if let Some((w, h)) = info.page_size_mm {
            println!("  Page size: {:.0} x {:.0} mm", w, h);
        }
        println!("  Images: {}", info.image_count);
        if let Some(title) = &info.title {
            println!("  Title: {}", title);
        }
    }
    Ok(())
}
