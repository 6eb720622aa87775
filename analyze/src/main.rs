use bioassay::io::{read_path, write_path, FormatKind, ImaGeneOutput, ReadStats};
use bioassay::{BioAssay, Column};
use rayon::prelude::*;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

const USAGE: &str = "usage: analyze [-v | -q] [-t <format>] <command>

commands:
    convert <input> <output>        convert between formats, by content and extension
    summary <input>...              print fields, types and missing values
    imagene <green> <red> <output>  merge two ImaGene channel files
    batch <dir> <format>            convert every scanner file of a directory

formats: atf, gal, gpr, idma, agilent, imagene-list, imagene, or a file extension.
-t sets the output format of convert and imagene instead of the output extension.";

enum Command {
    Convert {
        input: PathBuf,
        output: PathBuf,
        to: Option<FormatKind>,
    },
    Summary(Vec<PathBuf>),
    ImaGene {
        green: PathBuf,
        red: PathBuf,
        output: PathBuf,
        to: Option<FormatKind>,
    },
    Batch {
        dir: PathBuf,
        to: FormatKind,
    },
}

/// Parse the command line. The returned filter overrides `RUST_LOG`.
fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Option<(Command, Option<&'static str>)> {
    let mut filter = None;
    let mut to = None;
    let mut rest = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" => filter = Some("debug"),
            "-q" => filter = Some("error"),
            "-t" => to = Some(args.next()?.parse::<FormatKind>().ok()?),
            _ => rest.push(arg),
        }
    }

    let mut rest = rest.into_iter();
    let command = match rest.next()?.as_str() {
        "convert" => Command::Convert {
            input: rest.next()?.into(),
            output: rest.next()?.into(),
            to,
        },
        "summary" => {
            let inputs = rest.by_ref().map(PathBuf::from).collect::<Vec<_>>();
            if inputs.is_empty() {
                return None;
            }
            Command::Summary(inputs)
        }
        "imagene" => Command::ImaGene {
            green: rest.next()?.into(),
            red: rest.next()?.into(),
            output: rest.next()?.into(),
            to,
        },
        "batch" => Command::Batch {
            dir: rest.next()?.into(),
            to: rest.next()?.parse().ok()?,
        },
        _ => return None,
    };
    if rest.next().is_some() {
        return None;
    }
    Some((command, filter))
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn detect(path: &Path) -> Result<FormatKind> {
    match FormatKind::detect(path)? {
        Some(kind) => Ok(kind),
        None => Err(format!("{}: unknown format", path.display()).into()),
    }
}

/// The requested output format, or the one named by the extension of `path`
fn output_kind(path: &Path, to: Option<FormatKind>) -> Result<FormatKind> {
    to.or_else(|| FormatKind::from_path(path))
        .ok_or_else(|| format!("{}: unknown output format", path.display()).into())
}

fn report(path: &Path, kind: FormatKind, stats: &ReadStats) {
    info!("read {} as {}: {} lines", path.display(), kind, stats.lines);
    if stats.skipped_lines > 0 {
        warn!(
            "{}: skipped {} lines with the wrong number of fields",
            path.display(),
            stats.skipped_lines
        );
    }
}

fn convert(input: &Path, output: &Path, to: Option<FormatKind>) -> Result<()> {
    let to = output_kind(output, to)?;
    let from = detect(input)?;
    let (assay, stats) = read_path(input, from)?;
    report(input, from, &stats);
    write_path(output, to, &assay)?;
    info!("wrote {} spots to {} as {}", assay.len(), output.display(), to);
    Ok(())
}

fn describe(assay: &BioAssay) -> Vec<String> {
    assay
        .fields()
        .filter_map(|field| {
            let line = match assay.column(field)? {
                Column::Ints(_) => format!("  {}\tint", field),
                Column::Strings(v) => {
                    let empty = v.iter().filter(|s| s.is_empty()).count();
                    format!("  {}\ttext\t{} empty", field, empty)
                }
                Column::Doubles(v) => {
                    let missing = v.iter().filter(|x| x.is_nan()).count();
                    format!("  {}\tdouble\t{} missing", field, missing)
                }
            };
            Some(line)
        })
        .collect()
}

fn summarize(path: &Path) -> Result<String> {
    let kind = detect(path)?;
    let (assay, stats) = read_path(path, kind)?;
    report(path, kind, &stats);

    let mut lines = vec![format!(
        "{}\t{}\t{} spots\t{} skipped lines",
        path.display(),
        kind,
        assay.len(),
        stats.skipped_lines
    )];
    lines.extend(describe(&assay));
    for (key, value) in &assay.annotation {
        lines.push(format!("  # {}={}", key, value));
    }
    Ok(lines.join("\n"))
}

/// Summaries are computed in parallel and printed in argument order
fn summary(inputs: &[PathBuf]) -> Result<()> {
    let results = inputs
        .par_iter()
        .map(|path| summarize(path))
        .collect::<Vec<_>>();

    let mut failed = 0;
    for (path, result) in inputs.iter().zip(results) {
        match result {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(format!("{} of {} files could not be read", failed, inputs.len()).into());
    }
    Ok(())
}

fn imagene(green: &Path, red: &Path, output: &Path, to: Option<FormatKind>) -> Result<()> {
    let to = output_kind(output, to).unwrap_or(FormatKind::Gpr);
    let mut reader = ImaGeneOutput::reader(
        BufReader::new(File::open(green)?),
        BufReader::new(File::open(red)?),
    );
    let assay = reader.read()?.ok_or("no channel read")?;
    write_path(output, to, &assay)?;
    info!(
        "merged {} and {} into {} ({} spots)",
        green.display(),
        red.display(),
        output.display(),
        assay.len()
    );
    Ok(())
}

/// Files of `dir` whose format is recognized, excluding those already in
/// the target format
fn scan_directory(dir: &Path, target: FormatKind) -> Result<Vec<(PathBuf, FormatKind)>> {
    let mut v = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match FormatKind::detect(&path)? {
            Some(kind) if kind != target => v.push((path, kind)),
            Some(_) => {}
            None => info!("skipping {}", path.display()),
        }
    }
    v.sort();
    Ok(v)
}

/// Output path of every input. Inputs whose output already exists are
/// skipped; two inputs sharing an output are an error, reported before
/// anything is written.
fn plan_outputs(files: Vec<(PathBuf, FormatKind)>, extension: &str) -> Result<Vec<(PathBuf, FormatKind, PathBuf)>> {
    let mut sources: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut plan = Vec::new();
    for (path, kind) in files {
        let output = path.with_extension(extension);
        if output.exists() {
            warn!("{} exists, not converting {}", output.display(), path.display());
            continue;
        }
        if let Some(other) = sources.insert(output.clone(), path.clone()) {
            return Err(format!(
                "{} and {} would both be written to {}",
                other.display(),
                path.display(),
                output.display()
            )
            .into());
        }
        plan.push((path, kind, output));
    }
    Ok(plan)
}

fn batch(dir: &Path, target: FormatKind) -> Result<()> {
    let files = scan_directory(dir, target)?;
    let plan = plan_outputs(files, target.extension())?;
    info!("converting {} files to {}", plan.len(), target);

    let failed = plan
        .into_par_iter()
        .map(|(path, kind, output)| {
            let result = read_path(&path, kind).and_then(|(assay, stats)| {
                report(&path, kind, &stats);
                write_path(&output, target, &assay)
            });
            match result {
                Ok(()) => 0,
                Err(e) => {
                    error!("{}: {}", path.display(), e);
                    1
                }
            }
        })
        .sum::<usize>();

    if failed > 0 {
        return Err(format!("{} files could not be converted", failed).into());
    }
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Convert { input, output, to } => convert(&input, &output, to),
        Command::Summary(inputs) => summary(&inputs),
        Command::ImaGene { green, red, output, to } => imagene(&green, &red, &output, to),
        Command::Batch { dir, to } => batch(&dir, to),
    }
}

fn main() {
    let (command, filter) = match parse_args(env::args().skip(1)) {
        Some(parsed) => parsed,
        None => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };
    init_logging(filter);

    if let Err(e) = run(command) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
