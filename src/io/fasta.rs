use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;

use crate::errors::AlignError;
use crate::sequence::{Alphabet, Sequence};

/// Open a FASTA file for reading, decompressing it when the file name ends in `.gz`.
pub fn open_fasta(path: &Path) -> Result<Box<dyn BufRead>, AlignError> {
    let is_gzipped = path.file_name()
        .map(|v| v.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false);

    let file = File::open(path)
        .map_err(|source| AlignError::FileReadError { source })?;

    let reader: Box<dyn BufRead> = if is_gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

/// Read all records from a FASTA stream. Without an explicit alphabet, the alphabet of
/// each record is detected from its symbols.
pub fn read_sequences<R: BufRead>(
    reader: R,
    alphabet: Option<Alphabet>,
) -> Result<Vec<Sequence>, AlignError> {
    let mut reader = fasta::Reader::new(reader);
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result?;
        let name = String::from_utf8_lossy(record.name()).into_owned();
        let symbols = record.sequence().as_ref().to_vec();

        let sequence = match alphabet {
            Some(alphabet) => Sequence::new(name, alphabet, symbols),
            None => Sequence::with_detected_alphabet(name, symbols),
        };

        sequences.push(sequence);
    }

    Ok(sequences)
}

/// Load all sequences from a plain or gzip compressed FASTA file.
pub fn load_sequences(
    path: impl AsRef<Path>,
    alphabet: Option<Alphabet>,
) -> Result<Vec<Sequence>, AlignError> {
    read_sequences(open_fasta(path.as_ref())?, alphabet)
}
