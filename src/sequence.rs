//! Minimal sequence model consumed by the aligners: an identifier, an alphabet and
//! an ordered array of byte-sized symbols.

use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

use crate::errors::AlignError;

/// Symbol used for gaps in aligned sequences, for every alphabet.
pub const GAP_SYMBOL: u8 = b'-';

/// The alphabet a sequence is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Alphabet {
    Dna,
    Rna,
    Protein,
}

const NT_A: u8 = 0b0001;
const NT_C: u8 = 0b0010;
const NT_G: u8 = 0b0100;
const NT_T: u8 = 0b1000;

/// IUPAC nucleotide code as a bit set over A, C, G and T/U.
fn nucleotide_mask(symbol: u8) -> Option<u8> {
    let mask = match symbol.to_ascii_uppercase() {
        b'A' => NT_A,
        b'C' => NT_C,
        b'G' => NT_G,
        b'T' | b'U' => NT_T,
        b'R' => NT_A | NT_G,
        b'Y' => NT_C | NT_T,
        b'S' => NT_C | NT_G,
        b'W' => NT_A | NT_T,
        b'K' => NT_G | NT_T,
        b'M' => NT_A | NT_C,
        b'B' => NT_C | NT_G | NT_T,
        b'D' => NT_A | NT_G | NT_T,
        b'H' => NT_A | NT_C | NT_T,
        b'V' => NT_A | NT_C | NT_G,
        b'N' => NT_A | NT_C | NT_G | NT_T,
        _ => return None,
    };

    Some(mask)
}

/// Complementary bases swap A with T and C with G.
fn complement_mask(mask: u8) -> u8 {
    ((mask & NT_A) << 3) | ((mask & NT_C) << 1) | ((mask & NT_G) >> 1) | ((mask & NT_T) >> 3)
}

fn mask_to_nucleotide(mask: u8, alphabet: Alphabet) -> u8 {
    match mask {
        NT_A => b'A',
        NT_C => b'C',
        NT_G => b'G',
        NT_T if alphabet == Alphabet::Rna => b'U',
        NT_T => b'T',
        0b0101 => b'R',
        0b1010 => b'Y',
        0b0110 => b'S',
        0b1001 => b'W',
        0b1100 => b'K',
        0b0011 => b'M',
        0b1110 => b'B',
        0b1101 => b'D',
        0b1011 => b'H',
        0b0111 => b'V',
        _ => b'N',
    }
}

impl Alphabet {
    pub fn gap_symbol(&self) -> u8 {
        GAP_SYMBOL
    }

    pub fn is_gap(&self, symbol: u8) -> bool {
        symbol == GAP_SYMBOL
    }

    /// Guess the alphabet from the symbols of a sequence. Sequences consisting only of
    /// IUPAC nucleotide codes are DNA, or RNA when they contain U but no T.
    pub fn detect(symbols: &[u8]) -> Self {
        let mut has_t = false;
        let mut has_u = false;

        for &s in symbols {
            if s == GAP_SYMBOL {
                continue;
            }

            if nucleotide_mask(s).is_none() {
                return Self::Protein;
            }

            match s.to_ascii_uppercase() {
                b'T' => has_t = true,
                b'U' => has_u = true,
                _ => (),
            }
        }

        if has_u && !has_t {
            Self::Rna
        } else {
            Self::Dna
        }
    }

    /// Complement of a nucleotide symbol, keeping its case. Symbols that are not IUPAC
    /// nucleotide codes are returned unchanged.
    pub fn complement(&self, symbol: u8) -> u8 {
        let Some(mask) = nucleotide_mask(symbol) else {
            return symbol;
        };

        let complement = mask_to_nucleotide(complement_mask(mask), *self);
        if symbol.is_ascii_lowercase() {
            complement.to_ascii_lowercase()
        } else {
            complement
        }
    }

    /// Resolve a single consensus symbol for an aligned column.
    ///
    /// Identical symbols resolve to themselves and a gap resolves to the other symbol.
    /// Differing nucleotides resolve to the IUPAC code covering both, differing amino acids
    /// to `X`.
    pub fn consensus(&self, a: u8, b: u8) -> u8 {
        if a.eq_ignore_ascii_case(&b) {
            return a.to_ascii_uppercase();
        }

        if self.is_gap(a) {
            return b.to_ascii_uppercase();
        } else if self.is_gap(b) {
            return a.to_ascii_uppercase();
        }

        match self {
            Self::Dna | Self::Rna => match (nucleotide_mask(a), nucleotide_mask(b)) {
                (Some(ma), Some(mb)) => mask_to_nucleotide(ma | mb, *self),
                _ => b'N',
            },
            Self::Protein => b'X',
        }
    }
}

fn serialize_symbols<S>(symbols: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(symbols))
}

/// An identified sequence of symbols over a known alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    id: String,
    alphabet: Alphabet,

    #[serde(serialize_with = "serialize_symbols")]
    symbols: Vec<u8>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, alphabet: Alphabet, symbols: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            alphabet,
            symbols: symbols.into(),
        }
    }

    /// Create a sequence, detecting the alphabet from its symbols
    pub fn with_detected_alphabet(id: impl Into<String>, symbols: impl Into<Vec<u8>>) -> Self {
        let symbols = symbols.into();
        let alphabet = Alphabet::detect(&symbols);

        Self::new(id, alphabet, symbols)
    }

    #[inline(always)]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline(always)]
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    #[inline(always)]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols without gap characters.
    pub fn ungapped(&self) -> Vec<u8> {
        self.symbols.iter()
            .copied()
            .filter(|s| !self.alphabet.is_gap(*s))
            .collect()
    }

    /// Copy `count` symbols starting at `start` into the beginning of `dest`.
    ///
    /// Fails without touching `dest` if the range exceeds either the sequence or the
    /// destination buffer.
    pub fn copy_to(&self, start: usize, dest: &mut [u8], count: usize) -> Result<(), AlignError> {
        let end = start.checked_add(count)
            .filter(|end| *end <= self.symbols.len())
            .ok_or(AlignError::IndexOutOfRange { start, count, length: self.symbols.len() })?;

        if count > dest.len() {
            return Err(AlignError::IndexOutOfRange { start: 0, count, length: dest.len() });
        }

        dest[..count].copy_from_slice(&self.symbols[start..end]);

        Ok(())
    }

    /// Reverse complement of a nucleotide sequence, named after this one with a `" Reverse"`
    /// suffix. Protein sequences have none.
    pub fn reverse_complement(&self) -> Option<Sequence> {
        if self.alphabet == Alphabet::Protein {
            return None;
        }

        let symbols: Vec<u8> = self.symbols.iter()
            .rev()
            .map(|&s| self.alphabet.complement(s))
            .collect();

        Some(Self::new(format!("{} Reverse", self.id), self.alphabet, symbols))
    }
}

impl AsRef<[u8]> for Sequence {
    fn as_ref(&self) -> &[u8] {
        &self.symbols
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.symbols))
    }
}
