pub mod cleanup;
pub mod dataset;
pub mod discovery;
pub mod paragraphs;
pub mod pipeline;
pub mod reconstruct;
pub mod sent_tokenize;
pub mod sentence_part;

// Re-export main types for convenient access
pub use reconstruct::{reconstruct_direct_speech, QuoteStyle, SpeechReconstructor};
pub use sent_tokenize::{RegexSentenceTokenizer, SentenceTokenizer};
pub use sentence_part::SentencePart;

// Re-export pipeline utilities used by the CLI and integration tests
pub use pipeline::{aux_file_path, FileStats, PipelineConfig, RunStats, TextPreparer};
