use clap::{Parser, Subcommand};
use imgdiff_common::{
    ensure_config, load_config, AppConfig, ArchiveComparison, DirDiff, Image, SIZE_UNKNOWN,
};
use imgdiff_core::{
    multi_version_analysis, multi_version_diff, single_version_analysis, single_version_diff,
    DirectoryDiffEngine, FileAnalyzer, InventoryFileAnalyzer, SnapshotBuilder,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_DIFFERENT: i32 = 2;

#[derive(Parser)]
#[command(name = "imgdiff")]
#[command(author = "imgdiff Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Structural diffs of container image filesystems and package inventories")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two filesystem snapshots
    Dirs {
        /// Old directory
        left: PathBuf,

        /// New directory
        right: PathBuf,

        /// List direct children only instead of every descendant
        #[arg(long)]
        shallow: bool,

        /// Compare archives byte for byte instead of by size
        #[arg(long)]
        strict_archives: bool,

        /// Ignore patterns (can be specified multiple times)
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diff the extracted filesystems of two images
    Files {
        /// Root of the old image's filesystem
        image1: PathBuf,

        /// Root of the new image's filesystem
        image2: PathBuf,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diff two package inventories saved as JSON
    Packages {
        /// Old inventory
        old: PathBuf,

        /// New inventory
        new: PathBuf,

        /// Inventories map each package to several versions
        #[arg(short, long)]
        multi_version: bool,

        /// Label written into the result
        #[arg(long, default_value = "Package")]
        label: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one package inventory
    Analyze {
        inventory: PathBuf,

        #[arg(short, long)]
        multi_version: bool,

        #[arg(long, default_value = "Package")]
        label: String,
    },

    /// Show the configuration file
    Config {
        /// Write the default configuration if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    // Initialize tracing to stderr (so JSON output can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dirs {
            left,
            right,
            shallow,
            strict_archives,
            ignore,
            json,
        } => run_dirs(left, right, shallow, strict_archives, ignore, json),
        Commands::Files {
            image1,
            image2,
            json,
        } => run_files(image1, image2, json),
        Commands::Packages {
            old,
            new,
            multi_version,
            label,
            json,
        } => run_packages(old, new, multi_version, label, json),
        Commands::Analyze {
            inventory,
            multi_version,
            label,
        } => run_analyze(inventory, multi_version, label),
        Commands::Config { init } => run_config(init),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_DIFFERENT),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

type CliResult = Result<bool, Box<dyn std::error::Error>>;

fn run_dirs(
    left: PathBuf,
    right: PathBuf,
    shallow: bool,
    strict_archives: bool,
    ignore_patterns: Vec<String>,
    json: bool,
) -> CliResult {
    validate_path("Left", &left)?;
    validate_path("Right", &right)?;

    info!("Comparing:");
    info!("  Left:  {}", left.display());
    info!("  Right: {}", right.display());

    let mut config = load_config(false)?.config;
    apply_overrides(&mut config, shallow, strict_archives, ignore_patterns);

    let builder = SnapshotBuilder::new(config.clone());
    let d1 = builder.snapshot(&left)?;
    let d2 = builder.snapshot(&right)?;
    info!("Found {} entries left, {} entries right", d1.content.len(), d2.content.len());

    let engine = DirectoryDiffEngine::from_config(&config);
    let (diff, same) = engine.diff(&d1, &d2);

    if json {
        let report = DirReport {
            left: left.to_string_lossy().to_string(),
            right: right.to_string_lossy().to_string(),
            same,
            diff,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_dir_diff(&left.display().to_string(), &right.display().to_string(), &diff);
    }

    Ok(same)
}

fn run_files(image1: PathBuf, image2: PathBuf, json: bool) -> CliResult {
    validate_path("Image", &image1)?;
    validate_path("Image", &image2)?;

    let config = load_config(false)?.config;
    let analyzer = FileAnalyzer::new(config);
    let result = analyzer.diff(&image_for(&image1), &image_for(&image2))?;
    let same = result.diff.is_empty();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n{} diff", result.diff_type);
        print_dir_diff(&result.image1, &result.image2, &result.diff);
    }

    Ok(same)
}

fn run_packages(
    old: PathBuf,
    new: PathBuf,
    multi_version: bool,
    label: String,
    json: bool,
) -> CliResult {
    let analyzer = InventoryFileAnalyzer::new(label);
    let image1 = image_for(&old);
    let image2 = image_for(&new);

    if multi_version {
        let result = multi_version_diff(&image1, &image2, &analyzer)?;
        let same = result.diff.is_empty();
        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(same);
        }

        print_header(&format!("{} diff: {} -> {}", result.diff_type, result.image1, result.image2));
        for (name, delta) in &result.diff.packages {
            for (version, info) in &delta.added {
                println!("  +  {} {} ({})", name, version, format_size(info.size));
            }
            for (version, info) in &delta.removed {
                println!("  -  {} {} ({})", name, version, format_size(info.size));
            }
        }
        println!("{}", "=".repeat(80));
        println!("Changed packages: {}", result.diff.packages.len());
        return Ok(same);
    }

    let result = single_version_diff(&image1, &image2, &analyzer)?;
    let same = result.diff.is_empty();
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(same);
    }

    print_header(&format!("{} diff: {} -> {}", result.diff_type, result.image1, result.image2));
    for (name, info) in &result.diff.added {
        println!("  +  {} {} ({})", name, info.version, format_size(info.size));
    }
    for (name, info) in &result.diff.removed {
        println!("  -  {} {} ({})", name, info.version, format_size(info.size));
    }
    for (name, change) in &result.diff.modified {
        println!(
            "  ~  {} {} -> {} ({} -> {})",
            name,
            change.before.version,
            change.after.version,
            format_size(change.before.size),
            format_size(change.after.size)
        );
    }
    println!("{}", "=".repeat(80));
    println!("Summary:");
    println!("  Added:    {}", result.diff.added.len());
    println!("  Removed:  {}", result.diff.removed.len());
    println!("  Modified: {}", result.diff.modified.len());
    Ok(same)
}

fn run_analyze(inventory: PathBuf, multi_version: bool, label: String) -> CliResult {
    let analyzer = InventoryFileAnalyzer::new(label);
    let image = image_for(&inventory);

    let output = if multi_version {
        serde_json::to_string_pretty(&multi_version_analysis(&image, &analyzer)?)?
    } else {
        serde_json::to_string_pretty(&single_version_analysis(&image, &analyzer)?)?
    };
    println!("{output}");
    Ok(true)
}

fn run_config(init: bool) -> CliResult {
    let loaded = if init { ensure_config(false)? } else { load_config(false)? };

    println!("Config file: {}", loaded.path.display());
    if !loaded.exists && !init {
        println!("(not present, showing defaults)");
    }
    println!("{}", toml::to_string_pretty(&loaded.config)?);
    Ok(true)
}

#[derive(Serialize)]
struct DirReport {
    left: String,
    right: String,
    same: bool,
    diff: DirDiff,
}

fn apply_overrides(
    config: &mut AppConfig,
    shallow: bool,
    strict_archives: bool,
    ignore_patterns: Vec<String>,
) {
    if shallow {
        config.deep_listing = false;
    }
    if strict_archives {
        config.archive_comparison = ArchiveComparison::Content;
    }
    config.ignore_patterns.extend(ignore_patterns);
}

fn validate_path(side: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("{} path does not exist: {}", side, path.display()).into());
    }
    Ok(())
}

fn image_for(path: &Path) -> Image {
    Image::new(path.to_string_lossy(), path)
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{}", title);
    println!("{}", "=".repeat(80));
}

fn print_dir_diff(left: &str, right: &str, diff: &DirDiff) {
    print_header(&format!("{} -> {}", left, right));

    for entry in &diff.adds {
        println!("  >>  {} ({})", entry.name, format_size(entry.size));
    }
    for entry in &diff.dels {
        println!("  <<  {} ({})", entry.name, format_size(entry.size));
    }
    for entry in &diff.mods {
        println!(
            "  !=  {} ({} -> {})",
            entry.name,
            format_size(entry.size1),
            format_size(entry.size2)
        );
    }

    println!("\n{}", "=".repeat(80));
    println!("Summary:");
    println!("  Added:    {}", diff.adds.len());
    println!("  Deleted:  {}", diff.dels.len());
    println!("  Modified: {}", diff.mods.len());
    println!("{}", "=".repeat(80));
}

fn format_size(size: i64) -> String {
    if size == SIZE_UNKNOWN {
        return "unknown".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", size)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
