//! Substitution scores for pairs of symbols.
//!
//! Besides the implicit diagonal matrix, matrices can be loaded from text in the
//! following format:
//!
//! ```text
//! # comment lines and blank lines are ignored
//! <name>
//! <molecule type: DNA, RNA or PROTEIN>
//! <symbol> <symbol> ...
//! [<symbol>] <score> <score> ...
//! ```
//!
//! The third line lists the symbols labelling the columns, followed by one row of
//! integer scores per symbol, in the same order. Rows may start with their symbol as
//! label. Values can be separated by spaces, tabs or commas. Lookups are
//! case-insensitive.

use std::fmt::{Debug, Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};

use crate::errors::AlignError;

const NUM_SYMBOLS: usize = 256;

const BLOSUM62: &str = include_str!("data/blosum62.txt");
const DNA_IDENTITY: &str = include_str!("data/dna_identity.txt");

/// Kind of molecule a similarity matrix is designed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoleculeType {
    Dna,
    Rna,
    Protein,
}

impl FromStr for MoleculeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DNA" | "NA" => Ok(Self::Dna),
            "RNA" => Ok(Self::Rna),
            "PROTEIN" => Ok(Self::Protein),
            other => Err(format!("unknown molecule type '{other}'")),
        }
    }
}

/// Substitution matrices shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardMatrix {
    Blosum62,

    /// Score 1 for identical nucleotides, 0 otherwise
    DnaIdentity,
}

/// A matrix with an explicit score for each pair of supported symbols.
#[derive(Clone, PartialEq, Eq)]
pub struct DenseMatrix {
    name: String,
    molecule_type: MoleculeType,
    symbols: Vec<u8>,
    supported: [bool; NUM_SYMBOLS],

    /// Scores indexed by `a * NUM_SYMBOLS + b`, with lower and upper case variants filled in
    scores: Box<[i32]>,
}

impl DenseMatrix {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn molecule_type(&self) -> MoleculeType {
        self.molecule_type
    }

    /// Symbols in the order of the matrix rows
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    fn set(&mut self, a: u8, b: u8, score: i32) {
        for x in [a.to_ascii_uppercase(), a.to_ascii_lowercase()] {
            for y in [b.to_ascii_uppercase(), b.to_ascii_lowercase()] {
                self.supported[x as usize] = true;
                self.supported[y as usize] = true;
                self.scores[x as usize * NUM_SYMBOLS + y as usize] = score;
            }
        }
    }
}

impl Debug for DenseMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseMatrix")
            .field("name", &self.name)
            .field("molecule_type", &self.molecule_type)
            .field("symbols", &String::from_utf8_lossy(&self.symbols))
            .finish()
    }
}

/// Maps an ordered pair of symbols to a substitution score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimilarityMatrix {
    /// Every symbol scores `match_score` against itself and `mismatch_score` against any
    /// other symbol.
    Diagonal { match_score: i32, mismatch_score: i32 },

    /// Matrix loaded from text, see the module documentation for the format.
    Dense(DenseMatrix),
}

fn format_error(line: usize, reason: impl Into<String>) -> AlignError {
    AlignError::MatrixFormat { line, reason: reason.into() }
}

fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

impl SimilarityMatrix {
    pub fn diagonal(match_score: i32, mismatch_score: i32) -> Self {
        Self::Diagonal { match_score, mismatch_score }
    }

    pub fn standard(matrix: StandardMatrix) -> Result<Self, AlignError> {
        match matrix {
            StandardMatrix::Blosum62 => BLOSUM62.parse(),
            StandardMatrix::DnaIdentity => DNA_IDENTITY.parse(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AlignError> {
        let file = File::open(path.as_ref())
            .map_err(|source| AlignError::FileReadError { source })?;

        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, AlignError> {
        let mut lines = reader.lines()
            .enumerate()
            .map(|(ix, line)| line.map(|l| (ix + 1, l)))
            .filter(|line| match line {
                Ok((_, l)) => !l.trim().is_empty() && !l.trim_start().starts_with('#'),
                Err(_) => true,
            });

        let (_, name) = lines.next()
            .transpose()?
            .ok_or_else(|| format_error(1, "missing matrix name"))?;

        let (type_lineno, molecule_line) = lines.next()
            .transpose()?
            .ok_or_else(|| format_error(2, "missing molecule type"))?;
        let molecule_type: MoleculeType = molecule_line.parse()
            .map_err(|reason: String| format_error(type_lineno, reason))?;

        let (header_lineno, header) = lines.next()
            .transpose()?
            .ok_or_else(|| format_error(type_lineno + 1, "missing symbol header"))?;

        let mut symbols = Vec::new();
        let mut seen = FxHashSet::default();
        for token in tokenize(&header) {
            let &[symbol] = token.as_bytes() else {
                let reason = format!("'{token}' is not a single symbol");
                return Err(format_error(header_lineno, reason));
            };

            if !seen.insert(symbol.to_ascii_uppercase()) {
                return Err(format_error(header_lineno, format!("duplicated symbol '{token}'")));
            }

            symbols.push(symbol);
        }

        if symbols.is_empty() {
            return Err(format_error(header_lineno, "no symbols in header"));
        }

        let mut matrix = DenseMatrix {
            name: name.trim().to_string(),
            molecule_type,
            symbols,
            supported: [false; NUM_SYMBOLS],
            scores: vec![0; NUM_SYMBOLS * NUM_SYMBOLS].into_boxed_slice(),
        };

        let num_symbols = matrix.symbols.len();
        let mut last_lineno = header_lineno;
        for row in 0..num_symbols {
            let (lineno, line) = lines.next()
                .transpose()?
                .ok_or_else(|| format_error(last_lineno + 1,
                    format!("expected {num_symbols} score rows, found {row}")))?;
            last_lineno = lineno;

            let mut tokens: Vec<&str> = tokenize(&line).collect();
            if tokens.len() == num_symbols + 1 && tokens[0].parse::<i32>().is_err() {
                let label = tokens.remove(0);
                if !label.as_bytes().eq_ignore_ascii_case(&[matrix.symbols[row]]) {
                    return Err(format_error(lineno, format!(
                        "row label '{label}' does not match header symbol '{}'",
                        matrix.symbols[row].escape_ascii())));
                }
            }

            if tokens.len() != num_symbols {
                let reason = format!("expected {num_symbols} values, found {}", tokens.len());
                return Err(format_error(lineno, reason));
            }

            for (col, token) in tokens.into_iter().enumerate() {
                let score: i32 = token.parse()
                    .map_err(|_| format_error(lineno, format!("invalid score '{token}'")))?;

                let (a, b) = (matrix.symbols[row], matrix.symbols[col]);
                matrix.set(a, b, score);
            }
        }

        if let Some((lineno, _)) = lines.next().transpose()? {
            return Err(format_error(lineno, "unexpected data after the last score row"));
        }

        Ok(Self::Dense(matrix))
    }

    pub fn name(&self) -> String {
        match self {
            Self::Diagonal { match_score, mismatch_score } =>
                format!("Diagonal: match value {match_score}, non-match value {mismatch_score}"),
            Self::Dense(m) => m.name.clone(),
        }
    }

    /// Whether this matrix defines scores for the given symbol
    #[inline]
    pub fn supports(&self, symbol: u8) -> bool {
        match self {
            Self::Diagonal { .. } => true,
            Self::Dense(m) => m.supported[symbol as usize],
        }
    }

    /// Position and value of the first symbol not supported by this matrix, if any.
    pub fn validate(&self, symbols: &[u8]) -> Option<(usize, u8)> {
        symbols.iter()
            .position(|&s| !self.supports(s))
            .map(|pos| (pos, symbols[pos]))
    }

    /// Checked lookup
    pub fn get_score(&self, a: u8, b: u8) -> Result<i32, AlignError> {
        if self.supports(a) && self.supports(b) {
            Ok(self.score(a, b))
        } else {
            Err(AlignError::UnknownSymbolPair(a, b))
        }
    }

    /// Unchecked lookup used while filling alignment matrices. Symbols must have been
    /// validated with [`SimilarityMatrix::validate`]; unsupported symbols score zero.
    #[inline(always)]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        match self {
            Self::Diagonal { match_score, mismatch_score } => {
                if a.eq_ignore_ascii_case(&b) { *match_score } else { *mismatch_score }
            },
            Self::Dense(m) => m.scores[a as usize * NUM_SYMBOLS + b as usize],
        }
    }
}

impl Default for SimilarityMatrix {
    fn default() -> Self {
        Self::diagonal(2, -2)
    }
}

impl FromStr for SimilarityMatrix {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

impl Serialize for SimilarityMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl Display for SimilarityMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{MoleculeType, SimilarityMatrix, StandardMatrix};
    use crate::errors::AlignError;

    const SMALL_DNA: &str = "\
# test matrix
Small DNA
DNA
A C G T
A  5 -4 -4 -4
C -4  5 -4 -4
G -4 -4  5 -4
T -4 -4 -4  5
";

    #[test]
    fn test_diagonal() {
        let m = SimilarityMatrix::diagonal(3, -7);
        assert_eq!(m.score(b'A', b'A'), 3);
        assert_eq!(m.score(b'A', b'a'), 3);
        assert_eq!(m.score(b'A', b'C'), -7);
        assert_eq!(m.get_score(b'?', b'?').unwrap(), 3);
        assert_eq!(m.validate(b"ANYTHING"), None);
    }

    #[test]
    fn test_parse_labelled_rows() {
        let m: SimilarityMatrix = SMALL_DNA.parse().unwrap();

        let SimilarityMatrix::Dense(ref dense) = m else {
            panic!("Expected a dense matrix");
        };
        assert_eq!(dense.name(), "Small DNA");
        assert_eq!(dense.molecule_type(), MoleculeType::Dna);
        assert_eq!(dense.symbols(), b"ACGT");

        assert_eq!(m.get_score(b'A', b'A').unwrap(), 5);
        assert_eq!(m.get_score(b'g', b'T').unwrap(), -4);
        assert_eq!(m.get_score(b'c', b'c').unwrap(), 5);
        assert!(matches!(m.get_score(b'A', b'N'), Err(AlignError::UnknownSymbolPair(b'A', b'N'))));
        assert_eq!(m.validate(b"ACGNT"), Some((3, b'N')));
    }

    #[test]
    fn test_parse_unlabelled_rows_with_commas() {
        let text = "Tiny\nPROTEIN\nW,Y\n11,2\n2,7\n";
        let m: SimilarityMatrix = text.parse().unwrap();

        assert_eq!(m.score(b'W', b'Y'), 2);
        assert_eq!(m.score(b'y', b'y'), 7);
        assert_eq!(m.name(), "Tiny");
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("", 1),
            ("Name\n", 2),
            ("Name\nPEPTIDE\nA C\n1 0\n0 1\n", 2),
            ("Name\nDNA\nA C A\n", 3),
            ("Name\nDNA\nA C\n1 0\n", 5),
            ("Name\nDNA\nA C\n1 0\n0\n", 5),
            ("Name\nDNA\nA C\n1 x\n0 1\n", 4),
            ("Name\nDNA\nA C\nC 1 0\n0 1\n", 4),
            ("Name\nDNA\nA C\n1 0\n0 1\n1 1\n", 6),
        ];

        for (text, expected_line) in cases {
            match text.parse::<SimilarityMatrix>() {
                Err(AlignError::MatrixFormat { line, .. }) => {
                    assert_eq!(line, expected_line, "{text:?}")
                }
                other => panic!("Expected format error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_dna_identity() {
        let m = SimilarityMatrix::standard(StandardMatrix::DnaIdentity).unwrap();

        assert_eq!(m.name(), "DNA identity");
        assert_eq!(m.score(b'a', b'A'), 1);
        assert_eq!(m.score(b'G', b'T'), 0);
        assert_eq!(m.validate(b"ACGU"), Some((3, b'U')));
    }

    #[test]
    fn test_blosum62() {
        let m = SimilarityMatrix::standard(StandardMatrix::Blosum62).unwrap();
        assert_eq!(m.name(), "BLOSUM62");

        assert_eq!(m.score(b'A', b'A'), 4);
        assert_eq!(m.score(b'W', b'W'), 11);
        assert_eq!(m.score(b'C', b'C'), 9);
        assert_eq!(m.score(b'E', b'K'), 1);
        assert_eq!(m.score(b'*', b'*'), 1);

        let SimilarityMatrix::Dense(ref dense) = m else {
            panic!("Expected a dense matrix");
        };
        for &a in dense.symbols() {
            for &b in dense.symbols() {
                assert_eq!(m.score(a, b), m.score(b, a), "{} {}", a as char, b as char);
            }
        }
    }
}
