//! Processing of collected histograms, with optional CSV export.

use super::{NodeState, NodeType, collect, node_name, referenced_node};
use crate::core::data::Data1D;
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::lifecycle::Phase;
use crate::engine::tree::ProcedureTree;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub static KEYWORDS: [KeywordSpec; 4] = [
    KeywordSpec {
        name: "SourceData",
        description: "Collect1D node providing the histogram to process",
        default: KeywordDefault::Node {
            allowed: &[NodeType::Collect1D],
            only_in_scope: false,
        },
    },
    KeywordSpec {
        name: "LabelX",
        description: "Column label for the abscissa",
        default: KeywordDefault::Text("x"),
    },
    KeywordSpec {
        name: "LabelValue",
        description: "Column label for the processed values",
        default: KeywordDefault::Text("value"),
    },
    KeywordSpec {
        name: "Export",
        description: "CSV file to write the processed data to",
        default: KeywordDefault::Text(""),
    },
];

#[derive(Debug, Serialize)]
struct ExportRow {
    x: f64,
    value: f64,
}

pub fn data(tree: &ProcedureTree, node: NodeId) -> Option<&Data1D> {
    match &tree.node(node)?.state {
        NodeState::Process1D(data) => Some(data),
        _ => None,
    }
}

pub(crate) fn data_mut(tree: &mut ProcedureTree, node: NodeId) -> Option<&mut Data1D> {
    match &mut tree.node_mut(node)?.state {
        NodeState::Process1D(data) => Some(data),
        _ => None,
    }
}

pub(crate) fn prepare(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    referenced_node(tree, node, "SourceData")?;
    if let Some(data) = data_mut(tree, node) {
        *data = Data1D::default();
    }
    tree.run_branch(node, Phase::Prepare, ctx)
}

pub(crate) fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let source = referenced_node(tree, node, "SourceData")?;
    let processed = collect::histogram(tree, source)
        .map(Data1D::from_histogram)
        .ok_or_else(|| {
            NodeError::NoData(format!(
                "Collect1D node '{}' holds no histogram",
                node_name(tree, source)
            ))
        })?;
    if let Some(data) = data_mut(tree, node) {
        *data = processed;
    }

    tree.run_branch(node, Phase::Execute, ctx)
}

pub(crate) fn finalise(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    tree.run_branch(node, Phase::Finalise, ctx)?;

    let Some(keywords) = tree.node(node).map(|n| &n.keywords) else {
        return Ok(());
    };
    let path = keywords.text("Export").unwrap_or_default();
    if path.is_empty() {
        return Ok(());
    }
    let labels = [
        keywords.text("LabelX").unwrap_or("x"),
        keywords.text("LabelValue").unwrap_or("value"),
    ];

    match data(tree, node) {
        Some(data) if !data.is_empty() => {
            export(Path::new(path), labels, data)?;
            info!(
                node = %node_name(tree, node),
                "Exported {} points to '{}'",
                data.len(),
                path
            );
        }
        _ => warn!(
            node = %node_name(tree, node),
            "No processed data to export to '{}'",
            path
        ),
    }
    Ok(())
}

fn export(path: &Path, labels: [&str; 2], data: &Data1D) -> Result<(), NodeError> {
    let csv_error = |source| NodeError::Csv {
        path: PathBuf::from(path),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;

    writer.write_record(labels).map_err(csv_error)?;
    for (&x, &value) in data.x().iter().zip(data.values()) {
        writer.serialize(ExportRow { x, value }).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| NodeError::Io {
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::configuration::{Configuration, Site};
    use crate::core::context::NodeContext;
    use crate::core::expression::NodeValue;
    use crate::core::ids::SequenceId;
    use crate::core::keywords::KeywordData;
    use crate::engine::registry::NodeRegistry;
    use nalgebra::Point3;

    fn create(
        tree: &mut ProcedureTree,
        sequence: SequenceId,
        node_type: NodeType,
        name: Option<&str>,
    ) -> NodeId {
        let id = NodeRegistry::create(tree, node_type);
        if let Some(name) = name {
            tree.set_name(id, name);
        }
        tree.append(sequence, id, None);
        id
    }

    /// A-B distance histogram processed and normalised by the number of A sites.
    fn rdf_tree(export: &str) -> (ProcedureTree, SequenceId, NodeId) {
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Analysis, None, "Analyser");

        let a = create(&mut tree, root, NodeType::Select, Some("A"));
        tree.node_mut(a)
            .unwrap()
            .keywords
            .set("Site", KeywordData::TextList(vec!["COM".into()]));
        let a_branch = tree.node(a).unwrap().branch().unwrap();

        let b = create(&mut tree, a_branch, NodeType::Select, Some("B"));
        let keywords = &mut tree.node_mut(b).unwrap().keywords;
        keywords.set("Site", KeywordData::TextList(vec!["COM".into()]));
        keywords.set_node("ExcludeSameSite", a);
        let b_branch = tree.node(b).unwrap().branch().unwrap();

        let d = create(&mut tree, b_branch, NodeType::CalculateDistance, Some("D"));
        let keywords = &mut tree.node_mut(d).unwrap().keywords;
        keywords.set_node("I", a);
        keywords.set_node("J", b);

        let histogram = create(&mut tree, b_branch, NodeType::Collect1D, Some("H"));
        let keywords = &mut tree.node_mut(histogram).unwrap().keywords;
        keywords.set_node("QuantityX", d);
        keywords.set(
            "RangeX",
            KeywordData::Bins {
                min: 0.0,
                max: 4.0,
                width: 1.0,
            },
        );

        let process = create(&mut tree, root, NodeType::Process1D, Some("RDF"));
        let keywords = &mut tree.node_mut(process).unwrap().keywords;
        keywords.set_node("SourceData", histogram);
        keywords.set("Export", KeywordData::Text(export.to_string()));
        keywords.set("LabelX", KeywordData::Text("r".into()));
        let normalisation = tree.node(process).unwrap().branch().unwrap();

        let divide = create(&mut tree, normalisation, NodeType::OperateDivide, None);
        tree.node_mut(divide).unwrap().keywords.set(
            "Value",
            KeywordData::Value(NodeValue::from_text("A.nSelected")),
        );

        (tree, root, process)
    }

    fn line_of_three() -> Configuration {
        let mut config = Configuration::new(100.0);
        for (i, x) in [0.0, 1.5, 2.5].into_iter().enumerate() {
            config.add_site("COM", Site::new(Point3::new(x, 0.0, 0.0), i));
        }
        config
    }

    #[test]
    fn processes_normalises_and_exports_the_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rdf.csv");
        let (mut tree, root, process) = rdf_tree(path.to_str().unwrap());

        let mut config = line_of_three();
        let mut ctx = ProcedureContext::new(&mut config);
        tree.prepare_sequence(root, &mut ctx).unwrap();
        tree.execute_sequence(root, &mut ctx).unwrap();
        tree.finalise_sequence(root, &mut ctx).unwrap();

        // Pair distances 1.5, 2.5, 1.0 (each seen twice) divided by three A sites
        let data = data(&tree, process).unwrap();
        assert_eq!(data.x(), &[0.5, 1.5, 2.5, 3.5]);
        let expected = [0.0, 4.0 / 3.0, 2.0 / 3.0, 0.0];
        for (value, expected) in data.values().iter().zip(expected) {
            assert!((value - expected).abs() < 1e-12);
        }

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("r,value"));
        assert_eq!(lines.count(), 4);
    }

    #[test]
    fn operate_divide_rejects_zero() {
        let (mut tree, root, _) = rdf_tree("");
        let divide = tree.nodes(root, &[NodeType::OperateDivide])[0];
        tree.node_mut(divide)
            .unwrap()
            .keywords
            .set("Value", KeywordData::Value(NodeValue::Constant(0.0)));

        let mut config = line_of_three();
        let mut ctx = ProcedureContext::new(&mut config);
        tree.prepare_sequence(root, &mut ctx).unwrap();
        let result = tree.execute_sequence(root, &mut ctx);

        match result {
            Err(NodeError::Node { name, source, .. }) => {
                assert_eq!(name, "OperateDivide01");
                assert!(matches!(*source, NodeError::InvalidKeyword { keyword: "Value", .. }));
            }
            other => panic!("expected a division failure, got {other:?}"),
        }
    }

    #[test]
    fn export_without_data_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.csv");
        let (mut tree, root, _) = rdf_tree(path.to_str().unwrap());

        let mut config = line_of_three();
        let mut ctx = ProcedureContext::new(&mut config);
        tree.prepare_sequence(root, &mut ctx).unwrap();
        tree.finalise_sequence(root, &mut ctx).unwrap();

        assert!(!path.exists());
    }
}
