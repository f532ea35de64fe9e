

pub mod artifact;
pub mod lexical;
pub mod tokenizer;
pub mod vector;
pub mod vocabulary;

pub use artifact::INDEX_FORMAT_VERSION;
pub use lexical::{CorpusFingerprint, LexicalIndex};
pub use tokenizer::{tokenize, MIN_TOKEN_CHARS};
pub use vector::DocumentVector;
pub use vocabulary::Vocabulary;
