//! Source language front ends

pub mod java;

use crate::extractor::LanguageExtractor;
use crate::parser_pool::{FileType, ParserPool};
use std::path::Path;

pub use java::JavaExtractor;

/// Get the extractor for a file based on its extension
pub fn get_extractor(path: &Path, parser_pool: &ParserPool) -> Option<Box<dyn LanguageExtractor>> {
    match FileType::from_path(path)? {
        FileType::Java => Some(Box::new(JavaExtractor::new(parser_pool.clone()))),
    }
}
