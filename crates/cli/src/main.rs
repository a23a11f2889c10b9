use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use uppout_collect::{
    collect, collect_projected, AggregationResult, CollectConfig, CollectOptions, SimIdStrategy,
};
use uppout_core::{OutputKind, RunDirectory};

#[derive(Parser, Debug)]
#[command(name = "uppout", version, about = "Index and aggregate UppASD output files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Only log errors (overridden by RUST_LOG)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Average one output kind over every run directory matching a template
    Collect(CollectArgs),
    /// Print the identifier, prefixes and derived counts of a run directory
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct CollectArgs {
    /// TOML file with [collect], [rows] and [output] sections
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding one subdirectory per run
    #[arg(long)]
    root: Option<PathBuf>,
    /// Run-name template, e.g. "bccFe_temp_T{T}"
    #[arg(long)]
    template: Option<String>,
    /// Output kind (averages, cumulants, energy, projavgs, projcumulants)
    #[arg(long, value_parser = parse_kind)]
    kind: Option<OutputKind>,
    /// "auto", "newest" or an 8-character simulation identifier
    #[arg(long)]
    simid: Option<String>,
    /// First row of the averaging range (negative counts from the end)
    #[arg(long, allow_hyphen_values = true)]
    start: Option<isize>,
    /// End of the averaging range, exclusive
    #[arg(long, allow_hyphen_values = true)]
    end: Option<isize>,
    /// Row stride of the averaging range
    #[arg(long, allow_hyphen_values = true)]
    step: Option<isize>,
    /// Skip failing runs with a warning instead of aborting
    #[arg(long)]
    lenient: bool,
    /// Process runs in parallel
    #[arg(long)]
    parallel: bool,
    /// Show a progress bar
    #[arg(long)]
    progress: bool,
    /// Path to CSV output (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Run directory
    dir: PathBuf,
    /// Simulation identifier to restrict to
    #[arg(long)]
    simid: Option<String>,
}

fn parse_kind(value: &str) -> Result<OutputKind, String> {
    value.parse()
}

/// A collect invocation after merging the configuration file and the flags.
#[derive(Debug)]
struct Request {
    root: PathBuf,
    template: String,
    kind: OutputKind,
    options: CollectOptions,
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let default_level = if cli.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Collect(args) => run_collect(args, cli.quiet),
        Command::Info(args) => run_info(&args),
    }
}

fn build_request(args: CollectArgs) -> Result<Request, Box<dyn std::error::Error>> {
    let mut request = match &args.config {
        Some(path) => {
            let config = CollectConfig::from_file(path)?;
            Request {
                options: config.options()?,
                root: config.collect.root,
                template: config.collect.template,
                kind: config.collect.kind,
                output: config.output.path,
            }
        }
        None => Request {
            root: args.root.clone().ok_or("--root is required without --config")?,
            template: args
                .template
                .clone()
                .ok_or("--template is required without --config")?,
            kind: args.kind.ok_or("--kind is required without --config")?,
            options: CollectOptions::default(),
            output: None,
        },
    };

    // Flags override the configuration file.
    if let Some(root) = args.root {
        request.root = root;
    }
    if let Some(template) = args.template {
        request.template = template;
    }
    if let Some(kind) = args.kind {
        request.kind = kind;
    }
    if let Some(simid) = args.simid {
        request.options.simid = simid.parse::<SimIdStrategy>()?;
    }
    if args.start.is_some() {
        request.options.start = args.start;
    }
    if args.end.is_some() {
        request.options.end = args.end;
    }
    if args.step.is_some() {
        request.options.step = args.step;
    }
    if args.lenient {
        request.options.strict = false;
    }
    request.options.parallel |= args.parallel;
    request.options.progress |= args.progress;
    if args.output.is_some() {
        request.output = args.output;
    }
    Ok(request)
}

fn run_collect(args: CollectArgs, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let request = build_request(args)?;
    if !quiet {
        eprintln!(
            "[cli] collecting {} from {} (template \"{}\")",
            request.kind,
            request.root.display(),
            request.template
        );
    }

    if request.kind.is_projected() {
        let results =
            collect_projected(&request.root, &request.template, request.kind, &request.options)?;
        emit_projected(&results, request.output.as_deref())?;
        if !quiet {
            eprintln!("[cli] wrote {} projection indices", results.len());
        }
    } else {
        let result = collect(&request.root, &request.template, request.kind, &request.options)?;
        emit_csv(&result, request.output.as_deref())?;
        if !quiet {
            match &request.output {
                Some(path) => eprintln!("[cli] wrote {} rows to {}", result.len(), path.display()),
                None => eprintln!("[cli] wrote {} rows to stdout", result.len()),
            }
        }
    }
    Ok(())
}

fn open_writer(dest: Option<&Path>) -> io::Result<Box<dyn Write>> {
    Ok(match dest {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn emit_csv(result: &AggregationResult, dest: Option<&Path>) -> io::Result<()> {
    let mut writer = open_writer(dest)?;
    result.write_csv(&mut writer)?;
    writer.flush()
}

/// One `<stem>_proj<N>.<ext>` file per projection index, or consecutive
/// blocks on stdout headed by `# proj <N>`.
fn emit_projected(results: &BTreeMap<i64, AggregationResult>, dest: Option<&Path>) -> io::Result<()> {
    match dest {
        Some(path) => {
            for (proj, result) in results {
                emit_csv(result, Some(&projection_path(path, *proj)))?;
            }
            Ok(())
        }
        None => {
            let mut writer = open_writer(None)?;
            for (idx, (proj, result)) in results.iter().enumerate() {
                if idx > 0 {
                    writeln!(writer)?;
                }
                writeln!(writer, "# proj {proj}")?;
                result.write_csv(&mut writer)?;
            }
            writer.flush()
        }
    }
}

fn projection_path(path: &Path, proj: i64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collect".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    path.with_file_name(format!("{stem}_proj{proj}.{ext}"))
}

fn run_info(args: &InfoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let run = RunDirectory::open(&args.dir, args.simid.as_deref())?;
    let counts = run.counts()?;
    let mut out = io::stdout().lock();

    writeln!(out, "directory:      {}", run.path().display())?;
    writeln!(out, "simid:          {}", run.simid().unwrap_or("-"))?;
    writeln!(out, "prefixes:       {}", run.prefixes().join(", "))?;
    for kind in OutputKind::ALL {
        if let Ok(path) = run.resolve(kind.prefix()) {
            writeln!(out, "{:<15} {}", format!("{kind}:"), path.display())?;
        }
    }

    let show = |value: Option<usize>| value.map_or("-".to_string(), |v| v.to_string());
    let show_range =
        |range: Option<(f64, f64)>| range.map_or("-".to_string(), |(lo, hi)| format!("{lo} .. {hi}"));
    writeln!(out, "atoms:          {}", show(counts.num_atoms))?;
    writeln!(out, "atoms per cell: {}", show(counts.num_atoms_cell))?;
    writeln!(out, "atom types:     {}", show(counts.num_atom_types))?;
    writeln!(out, "ensembles:      {}", show(counts.num_ens))?;
    writeln!(out, "x range:        {}", show_range(counts.xrange))?;
    writeln!(out, "y range:        {}", show_range(counts.yrange))?;
    writeln!(out, "z range:        {}", show_range(counts.zrange))?;
    Ok(())
}
