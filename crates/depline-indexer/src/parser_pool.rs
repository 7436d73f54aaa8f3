//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not Send + Sync, so each worker thread owns one
//! parser and requests are handed over through a channel.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use tree_sitter::{Language, Parser};

/// Source languages the pool can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Java,
}

impl FileType {
    /// Determine file type from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "java" => Some(FileType::Java),
            _ => None,
        }
    }

    /// Get the tree-sitter language for this file type
    pub fn get_language(&self) -> Language {
        match self {
            FileType::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }
}

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub file_type: FileType,
    pub content: String,
    pub path: PathBuf,
}

/// Result of a parsing operation
#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<Result<ParseResult>>,
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        let mut current: Option<FileType> = None;

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            let WorkerRequest { request, response_sender } = match next {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            if current != Some(request.file_type) {
                if let Err(e) = parser.set_language(&request.file_type.get_language()) {
                    let _ = response_sender.send(Err(anyhow::anyhow!("Failed to set language: {}", e)));
                    continue;
                }
                current = Some(request.file_type);
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(anyhow::anyhow!("Failed to parse {}", request.path.display())),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Parse content, blocking the current thread until a worker is done.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = std::sync::mpsc::channel();

        self.sender
            .send(WorkerRequest {
                request,
                response_sender,
            })
            .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;

        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("Parser worker died"))?
    }

    /// Parse content from async code without blocking the runtime.
    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.parse_blocking(request))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }
}

/// Create a parser pool with `workers` threads, or one per core (at least 2).
pub fn create_parser_pool(workers: Option<usize>) -> ParserPool {
    let num_workers = workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get().max(2))
            .unwrap_or(2)
    });

    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_java() {
        let pool = create_parser_pool(Some(2));
        let content = r#"
package com.acme;

public class Greeter {
    public String greet(String name) { return "Hello " + name; }
}
"#
        .to_string();

        let request = ParseRequest {
            file_type: FileType::Java,
            content,
            path: PathBuf::from("Greeter.java"),
        };

        let result = pool.parse(request).await.unwrap();
        assert_eq!(result.tree.root_node().kind(), "program");
        assert!(!result.tree.root_node().has_error());
    }

    #[test]
    fn only_java_sources_are_parsed() {
        assert_eq!(FileType::from_path(Path::new("src/A.java")), Some(FileType::Java));
        assert_eq!(FileType::from_path(Path::new("Cargo.toml")), None);
        assert_eq!(FileType::from_path(Path::new("README")), None);
    }
}
