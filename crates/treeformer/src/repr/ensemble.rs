//! Collection of independently trained trees.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::Tree;
use crate::data::State;
use crate::inference::Distribution;
use crate::persist::{ReadError, WriteError, read_ensemble_json, write_ensemble_json};

/// Ensemble of trees. Tree order carries no meaning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ensemble {
    trees: Vec<Tree>,
}

impl Ensemble {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_trees(trees: Vec<Tree>) -> Self {
        Self { trees }
    }

    pub fn push(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    #[inline]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Sum of every tree's predicted table for `history`.
    ///
    /// Trees with no table on the path contribute nothing.
    pub fn predict_distribution(&self, history: &[u16]) -> Distribution {
        let state = State::for_inference(history);
        let mut dist = Distribution::new(self.trees.len());
        for tree in &self.trees {
            if let Some(table) = tree.predict(state) {
                dist.accumulate(table);
            }
        }
        dist
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self, ReadError> {
        read_ensemble_json(reader)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), WriteError> {
        write_ensemble_json(self, writer)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        Self::read_json(BufReader::new(File::open(path)?))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WriteError> {
        self.write_json(BufWriter::new(File::create(path)?))
    }
}
