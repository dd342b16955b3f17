pub mod fasta;

pub use fasta::load_sequences;
