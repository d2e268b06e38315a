//! Conversion between runtime trees and schema types.
//!
//! Both directions are iterative. Writing walks the arena backward (children
//! always have larger ids than their parents), reading walks the nested
//! schema breadth-first, so neither recurses proportionally to tree depth.

use std::collections::VecDeque;
use std::io::{Read, Write};

use super::error::{ReadError, WriteError};
use super::schema::{ClassProbsSchema, EnsembleSchema, NodeSchema};
use crate::repr::{ClassProbs, Ensemble, NodeId, Predicate, PredicateKind, Tree};

/// Deepest node accepted when reading a tree. The root has depth 0.
pub const MAX_TREE_DEPTH: usize = 64;

// =============================================================================
// Probability tables
// =============================================================================

fn probs_to_schema(probs: &ClassProbs) -> Option<ClassProbsSchema> {
    if probs.is_empty() {
        return None;
    }
    Some(probs.iter().map(|(token, &p)| (token.to_string(), p)).collect())
}

fn probs_from_schema(schema: Option<ClassProbsSchema>) -> Result<ClassProbs, ReadError> {
    let Some(schema) = schema else {
        return Ok(ClassProbs::new());
    };
    schema
        .into_iter()
        .map(|(key, p)| {
            let token = key
                .parse::<u16>()
                .map_err(|_| ReadError::Validation(format!("invalid token id {key:?}")))?;
            if !p.is_finite() {
                return Err(ReadError::Validation(format!(
                    "non-finite probability for token {token}"
                )));
            }
            Ok((token, p))
        })
        .collect()
}

fn predicate_from_schema(schema: &NodeSchema) -> Result<Predicate, ReadError> {
    let predicate = Predicate::from_flags(
        schema.dynamic_lookback,
        schema.relative_lookback,
        schema.lookback,
        schema.compare,
    );
    if predicate.kind() == PredicateKind::Absolute && predicate.lookback() < 0 {
        return Err(ReadError::Validation(format!(
            "absolute lookback must be non-negative, got {}",
            predicate.lookback()
        )));
    }
    Ok(predicate)
}

// =============================================================================
// Tree conversions
// =============================================================================

impl From<&Tree> for NodeSchema {
    fn from(tree: &Tree) -> Self {
        let mut built: Vec<Option<NodeSchema>> = (0..tree.n_nodes()).map(|_| None).collect();
        for id in (0..tree.n_nodes()).rev() {
            let node = tree.node(id as NodeId);
            let predicate = node.predicate();
            let mut take_child =
                |branch: bool| node.child(branch).and_then(|c| built[c as usize].take()).map(Box::new);
            let child_true = take_child(true);
            let child_false = take_child(false);
            built[id] = Some(NodeSchema {
                child_true,
                child_false,
                lookback: predicate.lookback(),
                compare: predicate.compare(),
                dynamic_lookback: predicate.is_dynamic(),
                relative_lookback: predicate.is_relative(),
                class_probs_true: probs_to_schema(node.class_probs(true)),
                class_probs_false: probs_to_schema(node.class_probs(false)),
            });
        }
        built.first_mut().and_then(Option::take).unwrap_or_default()
    }
}

struct Pending {
    schema: NodeSchema,
    parent: NodeId,
    branch: bool,
    depth: usize,
}

/// Copy tables into `id` and queue the schema's children.
fn attach(
    tree: &mut Tree,
    id: NodeId,
    mut schema: NodeSchema,
    depth: usize,
    queue: &mut VecDeque<Pending>,
) -> Result<(), ReadError> {
    tree.set_class_probs(id, true, probs_from_schema(schema.class_probs_true.take())?);
    tree.set_class_probs(id, false, probs_from_schema(schema.class_probs_false.take())?);
    for (branch, child) in [(false, schema.child_false), (true, schema.child_true)] {
        if let Some(child) = child {
            queue.push_back(Pending {
                schema: *child,
                parent: id,
                branch,
                depth: depth + 1,
            });
        }
    }
    Ok(())
}

impl TryFrom<NodeSchema> for Tree {
    type Error = ReadError;

    fn try_from(root: NodeSchema) -> Result<Self, Self::Error> {
        let mut tree = Tree::new(predicate_from_schema(&root)?);
        let mut queue = VecDeque::new();
        let root_id = tree.root();
        attach(&mut tree, root_id, root, 0, &mut queue)?;

        while let Some(Pending {
            schema,
            parent,
            branch,
            depth,
        }) = queue.pop_front()
        {
            if depth > MAX_TREE_DEPTH {
                return Err(ReadError::TooDeep { max: MAX_TREE_DEPTH });
            }
            let id = tree.add_child(parent, branch, predicate_from_schema(&schema)?);
            attach(&mut tree, id, schema, depth, &mut queue)?;
        }

        debug_assert!(tree.validate().is_ok());
        Ok(tree)
    }
}

// =============================================================================
// Ensemble conversions
// =============================================================================

pub fn ensemble_to_schema(ensemble: &Ensemble) -> EnsembleSchema {
    ensemble.trees().iter().map(NodeSchema::from).collect()
}

impl TryFrom<EnsembleSchema> for Ensemble {
    type Error = ReadError;

    fn try_from(schema: EnsembleSchema) -> Result<Self, Self::Error> {
        let trees = schema
            .into_iter()
            .enumerate()
            .map(|(tree_idx, root)| {
                Tree::try_from(root).map_err(|err| match err {
                    ReadError::Validation(reason) => ReadError::InvalidTree { tree_idx, reason },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ensemble::from_trees(trees))
    }
}

/// Read an ensemble from a JSON array of root nodes.
pub fn read_ensemble_json<R: Read>(reader: R) -> Result<Ensemble, ReadError> {
    let schema: EnsembleSchema = serde_json::from_reader(reader)?;
    Ensemble::try_from(schema)
}

/// Write an ensemble as a JSON array of root nodes.
pub fn write_ensemble_json<W: Write>(ensemble: &Ensemble, mut writer: W) -> Result<(), WriteError> {
    serde_json::to_writer(&mut writer, &ensemble_to_schema(ensemble))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::State;

    fn sample_tree() -> Tree {
        let mut tree = Tree::new(Predicate::absolute(0, 1));
        let f = tree.add_child(0, false, Predicate::dynamic(4));
        tree.add_child(0, true, Predicate::relative(-1, 2));
        tree.add_child(f, true, Predicate::absolute(2, 3));
        let mut probs = ClassProbs::new();
        probs.insert(7, 0.5);
        probs.insert(300, 0.5);
        tree.set_class_probs(f, false, probs);
        tree
    }

    #[test]
    fn tree_roundtrip() {
        let tree = sample_tree();
        let schema = NodeSchema::from(&tree);
        assert!(schema.child_false.is_some());
        assert_eq!(schema.compare, 1);

        let restored = Tree::try_from(schema).unwrap();
        assert_eq!(restored, tree);
        assert_eq!(restored.n_nodes(), tree.n_nodes());

        let h = [9u16, 9, 9];
        let s = State::new(&h, 0);
        assert_eq!(restored.predict(s), tree.predict(s));
        assert_eq!(restored.predict(s).map(|p| p.len()), Some(2));
    }

    #[test]
    fn rejects_bad_token_keys() {
        let mut schema = NodeSchema::from(&sample_tree());
        let mut probs = ClassProbsSchema::new();
        probs.insert("not-a-token".into(), 1.0);
        schema.class_probs_true = Some(probs);
        assert!(matches!(Tree::try_from(schema), Err(ReadError::Validation(_))));
    }

    #[test]
    fn rejects_negative_absolute_lookback() {
        let schema = NodeSchema {
            lookback: -2,
            ..Default::default()
        };
        assert!(matches!(Tree::try_from(schema), Err(ReadError::Validation(_))));
    }

    #[test]
    fn rejects_overly_deep_trees() {
        let mut schema = NodeSchema::default();
        for _ in 0..=MAX_TREE_DEPTH {
            schema = NodeSchema {
                child_true: Some(Box::new(schema)),
                ..Default::default()
            };
        }
        assert!(matches!(
            Tree::try_from(schema),
            Err(ReadError::TooDeep { max: MAX_TREE_DEPTH })
        ));
    }

    #[test]
    fn ensemble_json_roundtrip() {
        let ensemble = Ensemble::from_trees(vec![sample_tree(), Tree::new(Predicate::dynamic(5))]);
        let mut buf = Vec::new();
        write_ensemble_json(&ensemble, &mut buf).unwrap();
        let restored = read_ensemble_json(buf.as_slice()).unwrap();
        assert_eq!(restored, ensemble);
    }
}
