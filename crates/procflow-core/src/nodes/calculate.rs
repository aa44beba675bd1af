use super::{NodeType, node_name, referenced_node, select};
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::core::parameter::ExpressionValue;
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::tree::ProcedureTree;

pub static KEYWORDS: [KeywordSpec; 2] = [
    KeywordSpec {
        name: "I",
        description: "Select node providing the first site",
        default: KeywordDefault::Node {
            allowed: &[NodeType::Select],
            only_in_scope: true,
        },
    },
    KeywordSpec {
        name: "J",
        description: "Select node providing the second site",
        default: KeywordDefault::Node {
            allowed: &[NodeType::Select],
            only_in_scope: true,
        },
    },
];

const VALUE_PARAMETER: &str = "value";

pub(crate) fn initialise(tree: &mut ProcedureTree, node: NodeId) {
    tree.add_parameter(node, VALUE_PARAMETER, ExpressionValue::Double(0.0));
}

/// The most recently calculated distance.
pub fn value(tree: &ProcedureTree, node: NodeId) -> Option<f64> {
    tree.node(node)?
        .find_parameter(VALUE_PARAMETER)
        .map(|(_, p)| p.value().as_f64())
}

pub(crate) fn prepare(tree: &mut ProcedureTree, node: NodeId) -> Result<(), NodeError> {
    referenced_node(tree, node, "I")?;
    referenced_node(tree, node, "J")?;
    Ok(())
}

pub(crate) fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let mut origins = Vec::with_capacity(2);
    for keyword in ["I", "J"] {
        let target = referenced_node(tree, node, keyword)?;
        let site = select::current_site(tree, target).ok_or_else(|| {
            NodeError::NoData(format!(
                "Select node '{}' has no current site",
                node_name(tree, target)
            ))
        })?;
        origins.push(site.site.origin);
    }

    let distance = ctx
        .configuration
        .minimum_distance(&origins[0], &origins[1]);
    if let Some(n) = tree.node_mut(node) {
        n.set_parameter(VALUE_PARAMETER, ExpressionValue::Double(distance));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::configuration::{Configuration, Site};
    use crate::core::context::NodeContext;
    use crate::core::keywords::KeywordData;
    use crate::engine::registry::NodeRegistry;
    use nalgebra::Point3;

    #[test]
    fn distance_between_current_sites_is_published_as_a_parameter() {
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Analysis, None, "Analyser");
        let a = NodeRegistry::create(&mut tree, NodeType::Select);
        tree.set_name(a, "A");
        tree.append(root, a, None);
        tree.node_mut(a)
            .unwrap()
            .keywords
            .set("Site", KeywordData::TextList(vec!["X".into()]));
        let for_each = tree.node(a).unwrap().branch().unwrap();
        let b = NodeRegistry::create(&mut tree, NodeType::Select);
        tree.set_name(b, "B");
        tree.append(for_each, b, None);
        tree.node_mut(b)
            .unwrap()
            .keywords
            .set("Site", KeywordData::TextList(vec!["Y".into()]));
        let inner = tree.node(b).unwrap().branch().unwrap();
        let d = NodeRegistry::create(&mut tree, NodeType::CalculateDistance);
        tree.set_name(d, "D");
        tree.append(inner, d, None);
        let keywords = &mut tree.node_mut(d).unwrap().keywords;
        keywords.set_node("I", a);
        keywords.set_node("J", b);

        let mut config = Configuration::new(10.0);
        config.add_site("X", Site::new(Point3::new(1.0, 1.0, 1.0), 0));
        config.add_site("Y", Site::new(Point3::new(9.0, 1.0, 1.0), 1));
        let mut ctx = ProcedureContext::new(&mut config);
        tree.prepare_sequence(root, &mut ctx).unwrap();
        tree.execute_sequence(root, &mut ctx).unwrap();

        let distance = value(&tree, d).unwrap();
        assert!((distance - 2.0).abs() < 1e-12);
        assert_eq!(
            tree.node(d).unwrap().parameters()[0].name(),
            "D.value"
        );
    }

    #[test]
    fn prepare_requires_both_sites() {
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Analysis, None, "Analyser");
        let d = NodeRegistry::create(&mut tree, NodeType::CalculateDistance);
        tree.append(root, d, None);

        assert!(matches!(
            prepare(&mut tree, d),
            Err(NodeError::MissingKeyword { keyword: "I" })
        ));
    }
}
