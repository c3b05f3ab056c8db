use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chemgraph::{
    cache::MemoizeMode,
    clique::{max_clique, triangles},
    connectivity::{ring_bonds, ring_systems},
    isomorphism::{molecule_matches, MatchMode, Vf2Options},
    loader,
    mcs::{molecule_mcs, McsMode, McsOptions},
    Molecule,
};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use tracing::{debug, info};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum Analysis {
    Components,
    CutVertices,
    Bridges,
    Blocks,
    TwoEdgeComponents,
    RingBonds,
    RingSystems,
    MaxClique,
    Triangles,
    /// Count embeddings of `--pattern`.
    Match,
    /// Size of the maximum common substructure with `--other`.
    Mcs,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum ParallelMode {
    /// Process the input files one after another.
    None,
    /// Process the input files in parallel.
    Always,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// One or more `.mol` files.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Analyses to run on every molecule.
    #[arg(short, long, value_delimiter = ',', default_value = "components")]
    analysis: Vec<Analysis>,

    /// Pattern molecule for `--analysis match`.
    #[arg(long)]
    pattern: Option<PathBuf>,

    /// Second molecule for `--analysis mcs`.
    #[arg(long)]
    other: Option<PathBuf>,

    #[arg(long, default_value_t = MatchMode::Subgraph, value_enum)]
    mode: MatchMode,

    /// Stop counting embeddings after this many.
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = McsMode::NodeInduced, value_enum)]
    mcs_mode: McsMode,

    /// Only report connected common substructures.
    #[arg(long)]
    connected: bool,

    #[arg(long, default_value_t = MemoizeMode::Properties, value_enum)]
    memoize: MemoizeMode,

    #[arg(long, default_value_t = ParallelMode::Always, value_enum)]
    parallel: ParallelMode,
}

/// Inputs shared by every file. Each rayon worker gets its own copy.
#[derive(Clone)]
struct Job {
    analyses: Vec<Analysis>,
    pattern: Option<Molecule>,
    other: Option<Molecule>,
    vf2: Vf2Options,
    limit: Option<usize>,
    mcs: McsOptions,
    memoize: MemoizeMode,
}

fn format_set(set: &BTreeSet<usize>) -> String {
    let items: Vec<String> = set.iter().map(usize::to_string).collect();
    format!("{{{}}}", items.join(" "))
}

fn format_sets<'a>(sets: impl IntoIterator<Item = &'a BTreeSet<usize>>) -> String {
    let items: Vec<String> = sets.into_iter().map(format_set).collect();
    items.join(" ")
}

fn analyze(job: &Job, molecule: &Molecule, analysis: Analysis) -> Result<String> {
    let value = match analysis {
        Analysis::Components => format_sets(&molecule.connected_components()?),
        Analysis::CutVertices => format_set(&molecule.cut_vertices()?),
        Analysis::Bridges => format_set(&molecule.bridges()?),
        Analysis::Blocks => format_sets(&molecule.biconnected_components()?),
        Analysis::TwoEdgeComponents => format_sets(&molecule.two_edge_connected_components()?),
        Analysis::RingBonds => format_set(&ring_bonds(molecule)?),
        Analysis::RingSystems => format_sets(&ring_systems(molecule)?),
        Analysis::MaxClique => format_set(&max_clique(molecule)?),
        Analysis::Triangles => {
            let found: Vec<BTreeSet<usize>> = triangles(molecule)?
                .into_iter()
                .map(BTreeSet::from)
                .collect();
            format_sets(&found)
        }
        Analysis::Match => {
            let Some(pattern) = &job.pattern else {
                bail!("--analysis match needs --pattern");
            };
            let matches = molecule_matches(pattern, molecule, job.vf2.clone())?;
            let count = match job.limit {
                Some(limit) => matches.take(limit).count(),
                None => matches.count(),
            };
            count.to_string()
        }
        Analysis::Mcs => {
            let Some(other) = &job.other else {
                bail!("--analysis mcs needs --other");
            };
            molecule_mcs(molecule, other, &job.mcs)?.size().to_string()
        }
    };
    Ok(value)
}

fn process(job: &Job, path: &Path) -> Result<Vec<[String; 3]>> {
    let mut molecule =
        loader::parse(path).with_context(|| format!("failed to read {}", path.display()))?;
    molecule.set_memoize(job.memoize);
    debug!(path = %path.display(), "loaded molecule");

    job.analyses
        .iter()
        .map(|&analysis| {
            let value = analyze(job, &molecule, analysis)
                .with_context(|| format!("{analysis:?} failed on {}", path.display()))?;
            let name = analysis
                .to_possible_value()
                .map(|v| v.get_name().to_string())
                .unwrap_or_default();
            Ok([path.display().to_string(), name, value])
        })
        .collect()
}

fn load_optional(path: &Option<PathBuf>) -> Result<Option<Molecule>> {
    path.as_ref()
        .map(|p| loader::parse(p).with_context(|| format!("failed to read {}", p.display())))
        .transpose()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let job = Job {
        analyses: cli.analysis,
        pattern: load_optional(&cli.pattern)?,
        other: load_optional(&cli.other)?,
        vf2: Vf2Options {
            mode: cli.mode,
            ..Default::default()
        },
        limit: cli.limit,
        mcs: McsOptions {
            mode: cli.mcs_mode,
            connected: cli.connected,
            ..Default::default()
        },
        memoize: cli.memoize,
    };
    info!(files = cli.paths.len(), "starting");

    let rows: Vec<Result<Vec<[String; 3]>>> = match cli.parallel {
        ParallelMode::None => cli.paths.iter().map(|p| process(&job, p)).collect(),
        ParallelMode::Always => cli
            .paths
            .par_iter()
            .map_with(job.clone(), |job, p| process(job, p))
            .collect(),
    };

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["file", "analysis", "result"])?;
    for result in rows {
        for row in result? {
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    Ok(())
}
