//! pmxmerge CLI - Command-line tool for merging PMX models by record name.
//!
//! This is the main entry point for the pmxmerge command-line application.

mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use pmxmerge::pmx::Header;
use pmxmerge::prelude::*;

use settings::Settings;

/// pmxmerge - merge a patch PMX model into a base model
#[derive(Parser)]
#[command(name = "pmxmerge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a patch model into a base model
    Merge {
        /// Base model, receives the patch records
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Patch model, donates records by name
        #[arg(short, long)]
        patch: Option<PathBuf>,

        /// Output model (default: overwrite the base model)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Families to append besides bones and materials
        /// (MORPH, PHYSICS, DISPLAY, all, none)
        #[arg(long, value_name = "LIST")]
        append: Option<String>,

        /// Families whose existing records are updated (BONE_LOCATION,
        /// BONE_SETTING, BONE, MATERIAL_SETTING, MORPH, PHYSICS, DISPLAY, all, none)
        #[arg(long, value_name = "LIST")]
        update: Option<String>,

        /// Settings file holding the last used paths and toggles
        #[arg(long, env = "PMXMERGE_SETTINGS", default_value = settings::DEFAULT_FILE)]
        settings: PathBuf,

        /// Do not write the settings file back
        #[arg(long)]
        no_save_settings: bool,
    },

    /// Report empty and duplicate record names
    Validate {
        /// Models to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the header and record counts of a model
    Info {
        /// Model to inspect
        file: PathBuf,
    },

    /// Load and re-save a model, comparing the bytes with the input
    Roundtrip {
        /// Model to round-trip
        file: PathBuf,

        /// Also write the re-saved model here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Merge {
            base,
            patch,
            output,
            append,
            update,
            settings,
            no_save_settings,
        } => {
            let args = MergeArgs {
                base,
                patch,
                output,
                append,
                update,
            };
            cmd_merge(args, &settings, !no_save_settings)?;
        }
        Commands::Validate { files } => {
            cmd_validate(&files)?;
        }
        Commands::Info { file } => {
            cmd_info(&file)?;
        }
        Commands::Roundtrip { file, output } => {
            cmd_roundtrip(&file, output.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to install logger")
}

struct MergeArgs {
    base: Option<PathBuf>,
    patch: Option<PathBuf>,
    output: Option<PathBuf>,
    append: Option<String>,
    update: Option<String>,
}

fn cmd_merge(args: MergeArgs, settings_path: &Path, save_settings: bool) -> Result<()> {
    let mut stored = Settings::load(settings_path);

    let base = args
        .base
        .or_else(|| stored.base.clone())
        .context("No base model given (use --base)")?;
    let patch = args
        .patch
        .or_else(|| stored.patch.clone())
        .context("No patch model given (use --patch)")?;

    let mut options = stored.options();
    if let Some(list) = &args.append {
        options.append = AppendFeatures::parse_list(list).context("Invalid --append list")?;
    }
    if let Some(list) = &args.update {
        options.update = UpdateFeatures::parse_list(list).context("Invalid --update list")?;
    }

    let mut request = MergeRequest::new(base, patch).with_options(options);
    if let Some(output) = args.output {
        request = request.with_output(output);
    }

    let start = Instant::now();
    let outcome = merge_pmx_files(&request, &mut LogDiagnostics).context("Merge failed")?;

    println!("Base:   {}", outcome.base.display());
    println!("Patch:  {}", outcome.patch.display());
    println!("Output: {}", outcome.output.display());
    println!("Merged in {:?}: {}", start.elapsed(), outcome.stats);

    if save_settings {
        stored.record(&request);
        if let Err(err) = stored.save(settings_path) {
            log::warn!("{err:#}");
        }
    }

    Ok(())
}

fn cmd_validate(files: &[PathBuf]) -> Result<()> {
    let mut problems = 0;
    for path in files {
        let model = Model::open(path)
            .with_context(|| format!("Failed to load '{}'", path.display()))?;
        let issues = model.validate();
        if issues.is_empty() {
            println!("{}: ok", path.display());
            continue;
        }
        println!("{}: {} problem(s)", path.display(), issues.len());
        for issue in &issues {
            println!("  {issue}");
        }
        problems += issues.len();
    }

    if problems > 0 {
        anyhow::bail!("{problems} naming problem(s) found");
    }
    Ok(())
}

fn cmd_info(path: &Path) -> Result<()> {
    let start = Instant::now();
    let model =
        Model::open(path).with_context(|| format!("Failed to load '{}'", path.display()))?;
    println!("Loaded {} in {:?}", path.display(), start.elapsed());

    let header = Header::for_model(&model);
    let widths = header.widths;
    println!("Name:      {} / {}", model.name, model.name_en);
    println!("Encoding:  {:?}", header.encoding);
    println!("Extra UVs: {}", header.extra_uv_count);
    println!(
        "Index widths: vertex {}, texture {}, material {}, bone {}, morph {}, rigid {}",
        widths.vertex.bytes(),
        widths.texture.bytes(),
        widths.material.bytes(),
        widths.bone.bytes(),
        widths.morph.bytes(),
        widths.rigid.bytes()
    );
    println!("Contents:  {}", model.summary());

    let empty = model.empty_vertex_morphs();
    if !empty.is_empty() {
        println!("\nEmpty vertex morphs: {}", empty.len());
        for (index, name) in empty {
            println!("  {index:>5} {name}");
        }
    }

    Ok(())
}

fn cmd_roundtrip(path: &Path, output: Option<&Path>) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let mut model = Model::parse(&data).context("Failed to parse model")?;
    warn_name_issues(&model);
    let saved = model.to_bytes().context("Failed to serialize model")?;

    if let Some(output) = output {
        model
            .save(output)
            .with_context(|| format!("Failed to write '{}'", output.display()))?;
        println!("Written to {}", output.display());
    }

    match first_difference(&data, &saved) {
        None => {
            println!("Identical: {} bytes", data.len());
            Ok(())
        }
        Some(offset) => anyhow::bail!(
            "Re-saved model differs at byte {offset:#x} ({} bytes in, {} bytes out)",
            data.len(),
            saved.len()
        ),
    }
}

/// Log every empty or duplicate name. References to a duplicated name are
/// written against its first occurrence, so such a model may not survive a
/// round trip unchanged. Returns the number of issues.
fn warn_name_issues(model: &Model) -> usize {
    let issues = model.validate();
    for issue in &issues {
        log::warn!("{issue}");
    }
    if !issues.is_empty() {
        log::warn!(
            "references to duplicated names will point at the first record of that name"
        );
    }
    issues.len()
}

/// Offset of the first byte where `a` and `b` differ, counting a length
/// mismatch as a difference at the end of the shorter one.
fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}
