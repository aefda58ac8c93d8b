use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propres::{
    DirectoryResources, Loader, NoResources, RawMapping, ResolvedMapping, Resolver,
    ResolverOptions, SelfReferencePolicy, TokenTable,
};

#[derive(Parser, Debug)]
#[command(name = "propres")]
#[command(about = "Resolve ${key} placeholders across property files")]
struct Args {
    /// Property files, later files override earlier ones
    #[arg(required = true)]
    paths: Vec<String>,

    /// How a value referring to its own key is handled
    #[arg(long, value_enum, default_value_t = SelfReference::Drop)]
    self_reference: SelfReference,

    /// Longest chain of nested references to follow
    #[arg(long, default_value_t = ResolverOptions::default().max_depth)]
    max_depth: usize,

    /// Directory searched for names that are not files
    #[arg(long)]
    resource_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SelfReference {
    /// Expand the reference to nothing
    Drop,
    /// Report the reference as a cycle
    Error,
}

impl From<SelfReference> for SelfReferencePolicy {
    fn from(value: SelfReference) -> Self {
        match value {
            SelfReference::Drop => SelfReferencePolicy::Drop,
            SelfReference::Error => SelfReferencePolicy::Error,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propres=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(resolved) => match print(&resolved) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ResolvedMapping> {
    let raw = load(args)?;
    let options = ResolverOptions::default()
        .with_self_reference(args.self_reference.into())
        .with_max_depth(args.max_depth);

    let table = TokenTable::from_raw(raw).context("failed to parse properties")?;
    let resolved = Resolver::with_options(table, options)
        .resolve_table()
        .context("failed to resolve properties")?;
    Ok(resolved)
}

fn load(args: &Args) -> anyhow::Result<RawMapping> {
    let raw = match &args.resource_dir {
        Some(dir) => Loader::with_resources(DirectoryResources::new(dir)).load(&args.paths),
        None => Loader::with_resources(NoResources).load(&args.paths),
    };
    raw.context("failed to load properties")
}

fn print(resolved: &ResolvedMapping) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    for (key, value) in resolved {
        writeln!(out, "{key}={value}")?;
    }
    out.flush()?;
    Ok(())
}
