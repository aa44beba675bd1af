//! Site selection over named site stacks, driving the `ForEach` branch once per site.

use super::{NodeState, NodeType, node_name, referenced_node};
use crate::core::configuration::Site;
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::core::parameter::ExpressionValue;
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::lifecycle::Phase;
use crate::engine::tree::ProcedureTree;
use nalgebra::Point3;
use tracing::info;

pub static KEYWORDS: [KeywordSpec; 5] = [
    KeywordSpec {
        name: "Site",
        description: "Site stacks from which to select",
        default: KeywordDefault::TextList,
    },
    KeywordSpec {
        name: "ExcludeSameSite",
        description: "Exclude the site currently selected by each of these nodes",
        default: KeywordDefault::NodeList {
            allowed: &[NodeType::Select],
            only_in_scope: true,
        },
    },
    KeywordSpec {
        name: "ExcludeSameMolecule",
        description: "Exclude sites in the same molecule as the site selected by each of these nodes",
        default: KeywordDefault::NodeList {
            allowed: &[NodeType::Select],
            only_in_scope: true,
        },
    },
    KeywordSpec {
        name: "ReferenceSite",
        description: "Node whose current site is the origin for the distance range",
        default: KeywordDefault::Node {
            allowed: &[NodeType::Select],
            only_in_scope: true,
        },
    },
    KeywordSpec {
        name: "InclusiveRange",
        description: "Distance range from the reference site within which sites are selected",
        default: KeywordDefault::Range { min: 0.0, max: 5.0 },
    },
];

const PARAMETERS: [&str; 4] = ["nSelected", "siteIndex", "stackIndex", "index"];

/// One site picked by a selection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSite {
    pub stack: String,
    /// Index of the stack within the node's `Site` list.
    pub stack_index: usize,
    /// Index of the site within its stack.
    pub site_index: usize,
    pub site: Site,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectState {
    pub selected: Vec<SelectedSite>,
    /// Index into `selected` of the site the branch is currently running for.
    pub current: Option<usize>,
    pub n_selections: u64,
    pub n_cumulative: u64,
}

impl SelectState {
    pub fn current_site(&self) -> Option<&SelectedSite> {
        self.selected.get(self.current?)
    }

    pub fn average_selected(&self) -> f64 {
        if self.n_selections == 0 {
            0.0
        } else {
            self.n_cumulative as f64 / self.n_selections as f64
        }
    }
}

pub(crate) fn initialise(tree: &mut ProcedureTree, node: NodeId) {
    for name in PARAMETERS {
        tree.add_parameter(node, name, ExpressionValue::Integer(0));
    }
}

pub fn state(tree: &ProcedureTree, node: NodeId) -> Option<&SelectState> {
    match &tree.node(node)?.state {
        NodeState::Select(state) => Some(state),
        _ => None,
    }
}

fn state_mut(tree: &mut ProcedureTree, node: NodeId) -> Option<&mut SelectState> {
    match &mut tree.node_mut(node)?.state {
        NodeState::Select(state) => Some(state),
        _ => None,
    }
}

/// The site a Select node's branch is currently running for.
pub fn current_site(tree: &ProcedureTree, node: NodeId) -> Option<&SelectedSite> {
    state(tree, node)?.current_site()
}

fn require_current_site(tree: &ProcedureTree, node: NodeId) -> Result<&SelectedSite, NodeError> {
    current_site(tree, node).ok_or_else(|| {
        NodeError::NoData(format!(
            "Select node '{}' has no current site",
            node_name(tree, node)
        ))
    })
}

pub(crate) fn prepare(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let has_sites = tree
        .node(node)
        .and_then(|n| n.keywords.text_list("Site"))
        .is_some_and(|sites| !sites.is_empty());
    if !has_sites {
        return Err(NodeError::MissingKeyword { keyword: "Site" });
    }

    if let Some(state) = state_mut(tree, node) {
        *state = SelectState::default();
    }

    tree.run_branch(node, Phase::Prepare, ctx)
}

/// Criteria gathered from the node's keywords for one selection pass.
struct Criteria {
    stacks: Vec<String>,
    same_site: Vec<(String, usize)>,
    same_molecule: Vec<usize>,
    reference: Option<(Point3<f64>, f64, f64)>,
}

fn gather_criteria(tree: &ProcedureTree, node: NodeId) -> Result<Criteria, NodeError> {
    let Some(keywords) = tree.node(node).map(|n| &n.keywords) else {
        return Err(NodeError::NoData("Select node no longer exists".into()));
    };

    let stacks = keywords.text_list("Site").unwrap_or_default().to_vec();

    let mut same_site = Vec::new();
    for &other in keywords.nodes("ExcludeSameSite") {
        let site = require_current_site(tree, other)?;
        same_site.push((site.stack.clone(), site.site_index));
    }

    let mut same_molecule = Vec::new();
    for &other in keywords.nodes("ExcludeSameMolecule") {
        same_molecule.push(require_current_site(tree, other)?.site.molecule);
    }

    let reference = match keywords.node("ReferenceSite") {
        Some(_) => {
            let origin = require_current_site(tree, referenced_node(tree, node, "ReferenceSite")?)?
                .site
                .origin;
            let (min, max) = keywords.range("InclusiveRange").unwrap_or((0.0, f64::MAX));
            Some((origin, min, max))
        }
        None => None,
    };

    Ok(Criteria {
        stacks,
        same_site,
        same_molecule,
        reference,
    })
}

pub(crate) fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let criteria = gather_criteria(tree, node)?;
    let configuration = &*ctx.configuration;

    let mut selected = Vec::new();
    for (stack_index, stack) in criteria.stacks.iter().enumerate() {
        let sites = configuration
            .site_stack(stack)
            .ok_or_else(|| NodeError::MissingSiteStack(stack.clone()))?;
        for (site_index, site) in sites.iter().enumerate() {
            if criteria
                .same_site
                .iter()
                .any(|(s, i)| s == stack && *i == site_index)
            {
                continue;
            }
            if criteria.same_molecule.contains(&site.molecule) {
                continue;
            }
            if let Some((origin, min, max)) = criteria.reference {
                let r = configuration.minimum_distance(&origin, &site.origin);
                if r < min || r > max {
                    continue;
                }
            }
            selected.push(SelectedSite {
                stack: stack.clone(),
                stack_index,
                site_index,
                site: site.clone(),
            });
        }
    }

    let n_selected = selected.len();
    let iterations: Vec<(usize, usize)> = selected
        .iter()
        .map(|s| (s.stack_index, s.site_index))
        .collect();
    if let Some(state) = state_mut(tree, node) {
        state.selected = selected;
        state.current = None;
        state.n_selections += 1;
        state.n_cumulative += n_selected as u64;
    }
    set_integer(tree, node, "nSelected", n_selected);

    for (index, (stack_index, site_index)) in iterations.into_iter().enumerate() {
        if let Some(state) = state_mut(tree, node) {
            state.current = Some(index);
        }
        set_integer(tree, node, "siteIndex", site_index);
        set_integer(tree, node, "stackIndex", stack_index);
        set_integer(tree, node, "index", index + 1);

        tree.run_branch(node, Phase::Execute, ctx)?;
    }

    if let Some(state) = state_mut(tree, node) {
        state.current = None;
    }
    Ok(())
}

fn set_integer(tree: &mut ProcedureTree, node: NodeId, name: &str, value: usize) {
    if let Some(n) = tree.node_mut(node) {
        n.set_parameter(name, ExpressionValue::Integer(value as i64));
    }
}

pub(crate) fn finalise(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    if let Some(state) = state(tree, node) {
        info!(
            node = %node_name(tree, node),
            selections = state.n_selections,
            "Average number of sites selected per selection: {:.2}",
            state.average_selected()
        );
    }
    tree.run_branch(node, Phase::Finalise, ctx)
}
