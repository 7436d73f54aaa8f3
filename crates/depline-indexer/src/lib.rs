//! Java source analysis feeding the versioned graph

pub mod error;
pub mod parser_pool;
pub mod extractor;
pub mod languages;
pub mod class_index;
pub mod resolve;
pub mod manifest;
pub mod coordinator;


pub use error::{ExtractionError, ExtractionErrorKind};
pub use parser_pool::{ParserPool, ParseResult, ParseRequest, FileType, create_parser_pool};
pub use extractor::{ExtractionResult, LanguageExtractor};
pub use class_index::{ClassIndex, MethodEntry};
pub use manifest::{DeclaredDependency, ManifestType, detect_manifest, read_manifest};
pub use coordinator::{Coordinator, IndexOptions, IndexReport, DEFAULT_EXTERNAL_PROJECT};
