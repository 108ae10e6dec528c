//! protoc-gen-zig - generate Zig message types from protobuf schemas
//!
//! Launched by `protoc` (`--zig_out=DIR`), the plugin reads a
//! `CodeGeneratorRequest` on stdin and answers with a `CodeGeneratorResponse`
//! on stdout. With `--descriptor-set` it runs standalone against a
//! `FileDescriptorSet` and writes the generated units itself.

use anyhow::{bail, Context, Result};
use clap::Parser;
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::FileDescriptorSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, trace, Level};
use tracing_subscriber::EnvFilter;
use zigpb_core::{generate_from_bytes, generate_units, GeneratorConfig, Unit};

/// Generate Zig message types and wire descriptor tables from protobuf schemas
#[derive(Parser, Debug)]
#[command(name = "protoc-gen-zig")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Read a FileDescriptorSet instead of a plugin request on stdin
    #[arg(long, value_name = "FILE", requires = "output")]
    descriptor_set: Option<PathBuf>,

    /// Output directory for generated .pb.zig files
    #[arg(short, long, value_name = "DIR", requires = "descriptor_set")]
    output: Option<PathBuf>,

    /// Proto file to generate, repeatable (default: every file in the set, imports included)
    #[arg(long = "file", value_name = "NAME", requires = "descriptor_set")]
    files: Vec<String>,

    /// Generator parameter, same syntax as --zig_opt (e.g. "runtime=protobuf,presence=bare")
    #[arg(long, default_value = "")]
    parameter: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry run - don't write files, just show what would be generated
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files that differ from the generated output
    #[arg(long)]
    force: bool,
}

/// Result of writing one unit to disk
#[derive(Debug, PartialEq, Eq)]
enum WriteOutcome {
    Written,
    Unchanged,
}

#[derive(Default)]
struct WriteStats {
    written: usize,
    unchanged: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // stdout carries the plugin response, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match (&cli.descriptor_set, &cli.output) {
        (Some(set), Some(output)) => run_offline(&cli, set, output),
        (None, None) => run_plugin(),
        _ => bail!("--descriptor-set and --output must be given together"),
    }
}

/// Answer a single protoc plugin request over stdin/stdout
fn run_plugin() -> Result<()> {
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("Failed to read CodeGeneratorRequest from stdin")?;
    trace!("Read {} bytes from stdin", input.len());

    let response =
        generate_from_bytes(&input).context("Failed to decode CodeGeneratorRequest from stdin")?;
    if let Some(err) = &response.error {
        debug!("Reporting error to protoc: {}", err);
    }

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&response.encode_to_vec())
        .context("Failed to write CodeGeneratorResponse to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;

    Ok(())
}

/// Generate from a FileDescriptorSet into an output directory
fn run_offline(cli: &Cli, set_path: &Path, output: &Path) -> Result<()> {
    trace!("Reading {}", set_path.display());
    let data = fs::read(set_path)
        .with_context(|| format!("Failed to read descriptor set: {}", set_path.display()))?;
    let set = FileDescriptorSet::decode(data.as_slice())
        .with_context(|| format!("Failed to decode descriptor set: {}", set_path.display()))?;

    let files = if cli.files.is_empty() {
        set.file.iter().map(|f| f.name().to_string()).collect()
    } else {
        cli.files.clone()
    };
    debug!("Generating {} of {} file(s)", files.len(), set.file.len());

    let config = GeneratorConfig::from_parameter(&cli.parameter)?;
    let request = CodeGeneratorRequest {
        file_to_generate: files,
        parameter: Some(cli.parameter.clone()),
        proto_file: set.file,
        ..Default::default()
    };

    let units = generate_units(&request, &config)
        .with_context(|| format!("Failed to generate from {}", set_path.display()))?;

    let mut stats = WriteStats::default();
    for unit in &units {
        let path = resolve_output_path(output, &unit.name)?;

        if cli.dry_run {
            println!("Would write: {}", path.display());
            if cli.verbose > 0 {
                println!("---");
                println!("{}", unit.content);
                println!("---");
            }
            continue;
        }

        match write_unit_file(&path, unit, cli.force)? {
            WriteOutcome::Written => {
                println!("Wrote {}", path.display());
                stats.written += 1;
            }
            WriteOutcome::Unchanged => {
                debug!("Unchanged: {}", path.display());
                stats.unchanged += 1;
            }
        }
    }

    if !cli.dry_run {
        info!(
            "Summary: {} units, {} written, {} unchanged",
            units.len(),
            stats.written,
            stats.unchanged
        );
    }

    Ok(())
}

/// Join a unit name onto the output directory, refusing names that escape it
fn resolve_output_path(output: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        bail!("Path traversal detected: '{}' would escape output directory", name);
    }
    Ok(output.join(relative))
}

/// Write a unit to disk, leaving byte-identical files untouched
fn write_unit_file(path: &Path, unit: &Unit, force: bool) -> Result<WriteOutcome> {
    if path.exists() {
        let existing = fs::read(path)
            .with_context(|| format!("Failed to read existing file: {}", path.display()))?;

        let hash = blake3::hash(unit.content.as_bytes());
        if blake3::hash(&existing) == hash {
            trace!("{} matches hash {}", path.display(), &hash.to_hex()[..8]);
            return Ok(WriteOutcome::Unchanged);
        }
        if !force {
            bail!(
                "File already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    file.write_all(unit.content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    Ok(WriteOutcome::Written)
}
