//! Destinations for trees produced during training.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::WriteError;
use super::schema::NodeSchema;
use crate::repr::{Ensemble, Tree};

/// Receives finished trees one at a time.
///
/// Trees arrive in completion order, which under parallel training differs
/// from `tree_idx` order. Implementations need not support concurrent
/// writers; the trainer serializes access behind a mutex.
pub trait TreeSink: Send {
    fn write_tree(&mut self, tree_idx: usize, tree: &Tree) -> Result<(), WriteError>;
}

/// Collects trees in memory, ordered by tree index.
#[derive(Debug, Default)]
pub struct VecSink {
    trees: Vec<(usize, Tree)>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn into_ensemble(mut self) -> Ensemble {
        self.trees.sort_by_key(|(idx, _)| *idx);
        Ensemble::from_trees(self.trees.into_iter().map(|(_, tree)| tree).collect())
    }
}

impl TreeSink for VecSink {
    fn write_tree(&mut self, tree_idx: usize, tree: &Tree) -> Result<(), WriteError> {
        self.trees.push((tree_idx, tree.clone()));
        Ok(())
    }
}

/// Streams trees into a JSON array as they arrive.
///
/// The output is only a complete document after [`finish`](Self::finish).
#[derive(Debug)]
pub struct JsonArraySink<W: Write> {
    writer: W,
    n_written: usize,
}

impl JsonArraySink<BufWriter<File>> {
    /// Create (or truncate) `path` and stream into it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonArraySink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            n_written: 0,
        }
    }

    pub fn n_written(&self) -> usize {
        self.n_written
    }

    /// Close the array, flush, and return the writer.
    pub fn finish(mut self) -> Result<W, WriteError> {
        let tail: &[u8] = if self.n_written == 0 { b"[]" } else { b"]" };
        self.writer.write_all(tail)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write + Send> TreeSink for JsonArraySink<W> {
    fn write_tree(&mut self, _tree_idx: usize, tree: &Tree) -> Result<(), WriteError> {
        let sep: &[u8] = if self.n_written == 0 { b"[" } else { b"," };
        self.writer.write_all(sep)?;
        serde_json::to_writer(&mut self.writer, &NodeSchema::from(tree))?;
        self.writer.flush()?;
        self.n_written += 1;
        Ok(())
    }
}
