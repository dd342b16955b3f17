use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use pairalign::aligner::config::DEFAULT_GAP_OPEN_COST;
use pairalign::nucmer::{self, MatchUniqueness, QueryStrand};
use pairalign::{AlignmentMode, Alphabet};

/// The output formats supported by pairalign
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputType {
    /// Human readable alignments, three lines per aligned region
    Text,

    /// All alignments as a JSON array
    Json,
}

/// The kind of dynamic programming alignment to perform
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Needleman-Wunsch global alignment
    Global,

    /// Smith-Waterman local alignment
    Local,

    /// Overlap alignment, gaps at the sequence ends are free
    Overlap,
}

impl From<ModeArg> for AlignmentMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Global => AlignmentMode::Global,
            ModeArg::Local => AlignmentMode::Local,
            ModeArg::Overlap => AlignmentMode::Overlap,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AlphabetArg {
    Dna,
    Rna,
    Protein,
}

impl From<AlphabetArg> for Alphabet {
    fn from(value: AlphabetArg) -> Self {
        match value {
            AlphabetArg::Dna => Alphabet::Dna,
            AlphabetArg::Rna => Alphabet::Rna,
            AlphabetArg::Protein => Alphabet::Protein,
        }
    }
}

/// Which matches anchor a nucmer alignment
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum UniquenessArg {
    /// Matches unique in both the reference and the query
    Mum,

    /// Matches unique in the reference
    MumReference,

    /// All maximal matches
    MaxMatch,
}

impl From<UniquenessArg> for MatchUniqueness {
    fn from(value: UniquenessArg) -> Self {
        match value {
            UniquenessArg::Mum => MatchUniqueness::Mum,
            UniquenessArg::MumReference => MatchUniqueness::MumReference,
            UniquenessArg::MaxMatch => MatchUniqueness::MaxMatch,
        }
    }
}

/// Query strands aligned to the references
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrandArg {
    Forward,

    /// Reverse complement only
    Reverse,

    /// Forward and reverse complement
    Both,
}

impl From<StrandArg> for QueryStrand {
    fn from(value: StrandArg) -> Self {
        match value {
            StrandArg::Forward => QueryStrand::Forward,
            StrandArg::Reverse => QueryStrand::Reverse,
            StrandArg::Both => QueryStrand::Both,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Set verbosity level. Use multiple times to increase the verbosity level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<CliSubcommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliSubcommand {
    /// Align two sequences with Needleman-Wunsch, Smith-Waterman or overlap alignment
    Align(AlignArgs),

    /// Align query sequences to reference sequences, anchored on maximal unique matches
    Nucmer(NucmerArgs),
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output filename. If not given, defaults to stdout
    #[arg(short, long)]
    #[clap(help_heading = "Outputs")]
    pub output: Option<PathBuf>,

    /// Output file type.
    #[arg(value_enum, short = 'O', long, default_value = "text")]
    #[clap(help_heading = "Outputs")]
    pub output_type: OutputType,
}

#[derive(Args, Debug)]
pub struct AlignArgs {
    /// FASTA file with the sequences to align. Without a second file, its first two
    /// records are aligned.
    #[clap(help_heading = "Inputs")]
    pub sequences: PathBuf,

    /// Optional second FASTA file, its first record is aligned to the first record of the
    /// first file.
    #[clap(help_heading = "Inputs")]
    pub second: Option<PathBuf>,

    /// Alphabet of the input sequences. Detected from the symbols if not given.
    #[arg(value_enum, short, long)]
    #[clap(help_heading = "Inputs")]
    pub alphabet: Option<AlphabetArg>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Alignment mode
    #[arg(value_enum, short = 'm', long, default_value = "global")]
    #[clap(help_heading = "Alignment configuration")]
    pub mode: ModeArg,

    /// Similarity matrix file. If not given, a diagonal matrix with the match and
    /// mismatch scores below is used.
    #[arg(short = 'M', long)]
    #[clap(help_heading = "Alignment configuration")]
    pub matrix: Option<PathBuf>,

    /// Score of two identical symbols
    #[arg(long = "match", default_value_t = 2, allow_negative_numbers = true)]
    #[clap(help_heading = "Alignment configuration")]
    pub match_score: i32,

    /// Score of two different symbols
    #[arg(long, default_value_t = -2, allow_negative_numbers = true)]
    #[clap(help_heading = "Alignment configuration")]
    pub mismatch: i32,

    /// Score for opening a gap (non-positive)
    #[arg(short = 'g', long, default_value_t = DEFAULT_GAP_OPEN_COST)]
    #[arg(allow_negative_numbers = true)]
    #[clap(help_heading = "Alignment configuration")]
    pub gap_open: i32,

    /// Score for extending a gap (non-positive). When given, affine gap costs are used,
    /// otherwise every gap symbol costs the gap open score.
    #[arg(short = 'e', long, allow_negative_numbers = true)]
    #[clap(help_heading = "Alignment configuration")]
    pub gap_extend: Option<i32>,
}

#[derive(Args, Debug)]
pub struct NucmerArgs {
    /// Reference sequences in FASTA format
    #[clap(help_heading = "Inputs")]
    pub reference: PathBuf,

    /// Query sequences in FASTA format
    #[clap(help_heading = "Inputs")]
    pub query: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Minimum length of a maximal unique match
    #[arg(short = 'l', long, default_value_t = nucmer::DEFAULT_LENGTH_OF_MUM)]
    #[clap(help_heading = "Anchoring")]
    pub mum_length: usize,

    /// Diagonal difference always allowed between anchors of one cluster
    #[arg(long, default_value_t = nucmer::DEFAULT_FIXED_SEPARATION)]
    #[clap(help_heading = "Anchoring")]
    pub fixed_separation: i64,

    /// Maximum distance between neighbouring anchors of one cluster
    #[arg(long, default_value_t = nucmer::DEFAULT_MAXIMUM_SEPARATION)]
    #[clap(help_heading = "Anchoring")]
    pub maximum_separation: i64,

    /// Minimum total anchor length of a cluster
    #[arg(long, default_value_t = nucmer::DEFAULT_MINIMUM_SCORE)]
    #[clap(help_heading = "Anchoring")]
    pub minimum_score: i64,

    /// Diagonal difference allowed between anchors, as fraction of their distance
    #[arg(long, default_value_t = nucmer::DEFAULT_SEPARATION_FACTOR)]
    #[clap(help_heading = "Anchoring")]
    pub separation_factor: f32,

    /// Maximum extension length past the outermost anchors
    #[arg(short = 'b', long, default_value_t = nucmer::DEFAULT_BREAK_LENGTH)]
    #[clap(help_heading = "Anchoring")]
    pub break_length: usize,

    /// Which matches are used as anchors
    #[arg(value_enum, short = 'u', long, default_value = "mum-reference")]
    #[clap(help_heading = "Anchoring")]
    pub uniqueness: UniquenessArg,

    /// Query strands to align. Reverse complements are reported as "<id> Reverse".
    #[arg(value_enum, short = 's', long, default_value = "forward")]
    #[clap(help_heading = "Anchoring")]
    pub strand: StrandArg,

    /// Do not extend alignments past their outermost anchors. Sequence between anchors
    /// is still aligned.
    #[arg(long)]
    #[clap(help_heading = "Anchoring")]
    pub no_extend: bool,

    /// Similarity matrix file. Defaults to match score 3, mismatch score -7.
    #[arg(short = 'M', long)]
    #[clap(help_heading = "Alignment configuration")]
    pub matrix: Option<PathBuf>,

    /// Score for opening a gap (non-positive)
    #[arg(short = 'g', long, default_value_t = nucmer::DEFAULT_GAP_OPEN_COST)]
    #[arg(allow_negative_numbers = true)]
    #[clap(help_heading = "Alignment configuration")]
    pub gap_open: i32,

    /// Score for extending a gap (non-positive)
    #[arg(short = 'e', long, default_value_t = nucmer::DEFAULT_GAP_EXTENSION_COST)]
    #[arg(allow_negative_numbers = true)]
    #[clap(help_heading = "Alignment configuration")]
    pub gap_extend: i32,

    /// Use linear gap costs, every gap symbol costs the gap open score
    #[arg(long)]
    #[clap(help_heading = "Alignment configuration")]
    pub linear: bool,
}
