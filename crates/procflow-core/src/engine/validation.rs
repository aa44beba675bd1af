use super::error::CheckError;
use super::tree::ProcedureTree;
use crate::core::expression::NodeValue;
use crate::core::ids::{NodeId, SequenceId};
use crate::core::keywords::KeywordData;
use tracing::warn;

/// A repair to apply to one node-reference keyword.
enum Repair {
    Reset,
    Retain(Vec<NodeId>),
}

impl ProcedureTree {
    /// Returns whether `target` is a valid reference from `from` under the given rules.
    fn reference_is_valid(&self, from: NodeId, target: NodeId, only_in_scope: bool) -> bool {
        let (Some(source), Some(referenced)) = (self.node(from), self.node(target)) else {
            return false;
        };
        let Some(scope) = source.scope() else {
            return false;
        };
        let name = referenced.name();
        let found = if only_in_scope {
            self.node_in_scope(scope, Some(from), name, None, &[])
        } else {
            self.node_exists(scope, name, None, &[])
        };
        found == Some(target)
    }

    /// Resets every node-reference keyword whose target is no longer reachable.
    ///
    /// Walks all nodes of `sequence` and its branches. A single reference that fails
    /// is reset to its unset default; a reference list keeps only its valid targets.
    ///
    /// # Return
    ///
    /// Returns `true` if every reference was valid and nothing had to be repaired.
    pub fn validate_node_keywords(&mut self, sequence: SequenceId) -> bool {
        let mut repairs = Vec::new();

        for id in self.nodes(sequence, &[]) {
            let Some(node) = self.node(id) else {
                continue;
            };
            for keyword in node.keywords.iter() {
                match &keyword.data {
                    KeywordData::Node(reference) => {
                        let Some(target) = reference.target else {
                            continue;
                        };
                        let valid = self.node(target).is_some_and(|t| reference.accepts(t.node_type()))
                            && self.reference_is_valid(id, target, reference.only_in_scope);
                        if !valid {
                            repairs.push((id, keyword.name(), Repair::Reset));
                        }
                    }
                    KeywordData::NodeList(list) => {
                        let kept: Vec<NodeId> = list
                            .targets
                            .iter()
                            .copied()
                            .filter(|&target| {
                                self.node(target).is_some_and(|t| list.accepts(t.node_type()))
                                    && self.reference_is_valid(id, target, list.only_in_scope)
                            })
                            .collect();
                        if kept.len() != list.targets.len() {
                            let repair = if kept.is_empty() {
                                Repair::Reset
                            } else {
                                Repair::Retain(kept)
                            };
                            repairs.push((id, keyword.name(), repair));
                        }
                    }
                    _ => {}
                }
            }
        }

        let all_valid = repairs.is_empty();
        for (id, keyword_name, repair) in repairs {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            warn!(
                node = node.name(),
                keyword = keyword_name,
                "Keyword references a node that is no longer reachable and has been reset"
            );
            let Some(keyword) = node.keywords.find_mut(keyword_name) else {
                continue;
            };
            match repair {
                Repair::Reset => keyword.reset(),
                Repair::Retain(kept) => {
                    if let KeywordData::NodeList(list) = &mut keyword.data {
                        list.targets = kept;
                    }
                }
            }
        }

        all_valid
    }

    /// Recursively checks the structural consistency of a sequence.
    ///
    /// Every node must point back to the sequence holding it and be relevant to its
    /// effective context, and every node-value expression must parse and reference
    /// only parameters visible from its node. Branches are checked in turn.
    pub fn check(&self, sequence: SequenceId) -> Result<(), CheckError> {
        let Some(seq) = self.sequence(sequence) else {
            return Ok(());
        };
        let context = self.effective_context(sequence);

        for &id in seq.nodes() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if node.scope() != Some(sequence) {
                return Err(CheckError::ScopeMismatch {
                    node: node.name().to_string(),
                });
            }
            if !node.is_context_relevant(context) {
                return Err(CheckError::ContextMismatch {
                    node: node.name().to_string(),
                    node_type: node.node_type(),
                    context,
                });
            }

            for keyword in node.keywords.iter() {
                if let KeywordData::Value(value @ NodeValue::Expression(_)) = &keyword.data {
                    value
                        .validate(|name| self.get_parameter(id, name).is_some())
                        .map_err(|source| CheckError::InvalidExpression {
                            node: node.name().to_string(),
                            keyword: keyword.name(),
                            source,
                        })?;
                }
            }

            if let Some(branch) = node.branch() {
                self.check(branch)?;
            }
        }

        Ok(())
    }
}
