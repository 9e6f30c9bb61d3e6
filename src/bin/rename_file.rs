use anyhow::{Context, Result};
use clap::Parser;
use csv_renamer::{Renamer, RenamerConfig, StrategyKind, Upload};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rename_file")]
#[command(about = "Write a copy of a CSV export named after its test set and date range")]
struct Args {
    /// CSV file to rename
    input: PathBuf,

    /// `scan` (label search, placeholders on miss) or `fixed` (fixed rows, strict)
    #[arg(short, long)]
    strategy: Option<StrategyKind>,

    /// Directory for the renamed copy; defaults to the input's directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// YAML file overriding the built-in lookup tables and date formats
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the derived name without writing anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(env).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let mut config = RenamerConfig::load_or_default(args.config.as_deref())?;
    if let Some(kind) = args.strategy {
        config.strategy = kind;
    }
    let renamer = Renamer::new(&config);

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    let upload = Upload::new(file_name, bytes);

    let renamed = renamer
        .rename(&upload)
        .with_context(|| format!("Failed to rename {}", args.input.display()))?;

    if args.dry_run {
        println!("{}", renamed.file_name);
        return Ok(());
    }

    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => args
            .input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("could not create `{}`", out_dir.display()))?;

    let out_path = out_dir.join(&renamed.file_name);
    fs::write(&out_path, &renamed.content)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    info!(path = %out_path.display(), "wrote renamed copy");

    println!("{}", out_path.display());
    Ok(())
}
