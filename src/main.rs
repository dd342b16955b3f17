use std::fs::{self, File};
use std::io::{self, BufWriter, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use itertools::Itertools;
use tracing::{info, span, Level};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use pairalign::aligner::scoring::SimilarityMatrix;
use pairalign::io::load_sequences;
use pairalign::nucmer::query_strands;
use pairalign::{
    AlignerConfig, Alphabet, NucmerAligner, NucmerConfig, PairwiseAligner,
    PairwiseSequenceAlignment, SequenceAligner,
};

mod cli;

/// Install a stderr logger. `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_filter(filter_layer);

    Registry::default().with(stderr_log).init();

    Ok(())
}

fn load_matrix(
    path: Option<&std::path::Path>,
    default: SimilarityMatrix,
) -> Result<SimilarityMatrix> {
    match path {
        Some(path) => SimilarityMatrix::from_file(path)
            .with_context(|| format!("Could not load similarity matrix from {}", path.display())),
        None => Ok(default),
    }
}

fn write_alignments(
    alignments: &[PairwiseSequenceAlignment<'_>],
    output: &cli::OutputArgs,
) -> Result<()> {
    // Determine where to write the alignments to
    let mut writer: Box<dyn Write> = if let Some(path) = &output.output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?
        }

        let file = File::create(path)
            .with_context(|| format!("Could not create output file {}", path.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match output.output_type {
        cli::OutputType::Text => {
            for alignment in alignments {
                writeln!(
                    writer,
                    "# {} vs {}",
                    alignment.first_sequence().id(),
                    alignment.second_sequence().id()
                )?;

                for aligned in alignment {
                    writeln!(
                        writer,
                        "score: {}, first offset: {}, second offset: {}, identities: {}/{}",
                        aligned.score,
                        aligned.first_offset,
                        aligned.second_offset,
                        aligned.metadata.identical_count,
                        aligned.len(),
                    )?;
                    writeln!(writer, "{aligned}\n")?;
                }
            }
        },
        cli::OutputType::Json => {
            serde_json::to_writer_pretty(&mut writer, alignments)?;
            writeln!(writer)?;
        },
    }

    writer.flush()?;

    Ok(())
}

fn align_subcommand(args: &cli::AlignArgs) -> Result<()> {
    let alphabet = args.alphabet.map(Alphabet::from);

    let mut sequences = load_sequences(&args.sequences, alphabet)
        .with_context(|| format!("Could not read sequences from {}", args.sequences.display()))?;

    if let Some(second) = &args.second {
        let other = load_sequences(second, alphabet)
            .with_context(|| format!("Could not read sequences from {}", second.display()))?;

        sequences.truncate(1);
        sequences.extend(other.into_iter().take(1));
    } else {
        sequences.truncate(2);
    }

    if sequences.len() < 2 {
        bail!("Two sequences are required for alignment, found {}.", sequences.len());
    }

    let default_matrix = SimilarityMatrix::diagonal(args.match_score, args.mismatch);
    let matrix = load_matrix(args.matrix.as_deref(), default_matrix)?;
    let mut config = AlignerConfig::new(matrix, args.gap_open);
    if let Some(gap_extend) = args.gap_extend {
        config = config.with_gap_extension_cost(gap_extend);
    }

    let aligner = PairwiseAligner::new(args.mode.into(), config);

    let span = span!(Level::INFO, "align_subcommand", aligner = aligner.name());
    let _enter = span.enter();

    info!("Aligning {}", sequences.iter().map(|s| s.id()).join(" and "));

    let alignments = if args.gap_extend.is_some() {
        aligner.align_list(&sequences)?
    } else {
        aligner.align_list_simple(&sequences)?
    };

    write_alignments(&alignments, &args.output)
}

fn nucmer_subcommand(args: &cli::NucmerArgs) -> Result<()> {
    let references = load_sequences(&args.reference, Some(Alphabet::Dna))
        .with_context(|| {
            format!("Could not read reference sequences from {}", args.reference.display())
        })?;
    let queries = load_sequences(&args.query, Some(Alphabet::Dna))
        .with_context(|| format!("Could not read query sequences from {}", args.query.display()))?;
    let queries = query_strands(queries, args.strand.into());

    let defaults = NucmerConfig::default();
    let matrix = load_matrix(args.matrix.as_deref(), defaults.similarity_matrix().clone())?;

    let config = defaults
        .with_similarity_matrix(matrix)
        .with_gap_open_cost(args.gap_open)
        .with_gap_extension_cost(args.gap_extend)
        .with_length_of_mum(args.mum_length)
        .with_fixed_separation(args.fixed_separation)
        .with_maximum_separation(args.maximum_separation)
        .with_minimum_score(args.minimum_score)
        .with_separation_factor(args.separation_factor)
        .with_break_length(args.break_length)
        .with_match_uniqueness(args.uniqueness.into())
        .with_extension(!args.no_extend);

    let aligner = NucmerAligner::new(config);

    let span = span!(Level::INFO, "nucmer_subcommand");
    let _enter = span.enter();

    info!(
        "Aligning {} queries to references {}",
        queries.len(),
        references.iter().map(|s| s.id()).join(", ")
    );

    let alignments = if args.linear {
        aligner.align_many_simple(&references, &queries)?
    } else {
        aligner.align_many(&references, &queries)?
    };

    info!("Found alignments for {} sequence pairs", alignments.len());

    write_alignments(&alignments, &args.output)
}

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    init_logging(args.verbose)?;

    match &args.command {
        Some(cli::CliSubcommand::Align(v)) => align_subcommand(v)?,
        Some(cli::CliSubcommand::Nucmer(v)) => nucmer_subcommand(v)?,
        None => bail!("No subcommand given."),
    };

    Ok(())
}
