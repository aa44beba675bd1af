//! The typed keyword store configuring each node.
//!
//! Every node kind declares a static table of [`KeywordSpec`]s. When a node is created
//! the table is instantiated into a [`KeywordStore`] holding one [`Keyword`] per spec,
//! initialised from the spec's [`KeywordDefault`]. Reading and writing keyword values
//! from text needs access to the procedure tree (node references are stored as arena
//! keys but written as names), so the codecs live in `engine::serialise`.

use super::expression::NodeValue;
use super::ids::NodeId;
use crate::nodes::NodeType;
use phf::{Map, phf_map};

/// Outcome of offering one script line to a keyword store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseResult {
    Success,
    Unrecognised,
    Deprecated,
    Failed,
}

/// Old keyword names still accepted on input, mapped to their replacements.
static DEPRECATED_KEYWORDS: Map<&'static str, &'static str> = phf_map! {
    "species" => "Site",
    "samemolecule" => "ExcludeSameMolecule",
    "samesite" => "ExcludeSameSite",
    "bins" => "RangeX",
    "data" => "SourceData",
};

/// Returns the replacement for a deprecated keyword name, if there is one.
pub fn deprecated_replacement(name: &str) -> Option<&'static str> {
    DEPRECATED_KEYWORDS.get(name.to_lowercase().as_str()).copied()
}

/// Compile-time default for a keyword, from which its runtime data is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeywordDefault {
    Integer(i64),
    Double(f64),
    Text(&'static str),
    TextList,
    Range {
        min: f64,
        max: f64,
    },
    Bins {
        min: f64,
        max: f64,
        width: f64,
    },
    Value(f64),
    Node {
        allowed: &'static [NodeType],
        only_in_scope: bool,
    },
    NodeList {
        allowed: &'static [NodeType],
        only_in_scope: bool,
    },
}

/// Static description of one keyword of a node kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub default: KeywordDefault,
}

/// A non-owning reference from a keyword to another node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReference {
    pub target: Option<NodeId>,
    /// Node types the reference may point to; empty means any.
    pub allowed: &'static [NodeType],
    /// Whether the target must be visible under the scoping rules, rather than merely
    /// existing somewhere in the procedure.
    pub only_in_scope: bool,
}

impl NodeReference {
    pub fn accepts(&self, node_type: NodeType) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&node_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeReferenceList {
    pub targets: Vec<NodeId>,
    pub allowed: &'static [NodeType],
    pub only_in_scope: bool,
}

impl NodeReferenceList {
    pub fn accepts(&self, node_type: NodeType) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&node_type)
    }
}

/// Runtime data held by a keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordData {
    Integer(i64),
    Double(f64),
    Text(String),
    TextList(Vec<String>),
    Range { min: f64, max: f64 },
    Bins { min: f64, max: f64, width: f64 },
    Value(NodeValue),
    Node(NodeReference),
    NodeList(NodeReferenceList),
}

impl From<KeywordDefault> for KeywordData {
    fn from(default: KeywordDefault) -> Self {
        match default {
            KeywordDefault::Integer(i) => KeywordData::Integer(i),
            KeywordDefault::Double(d) => KeywordData::Double(d),
            KeywordDefault::Text(s) => KeywordData::Text(s.to_string()),
            KeywordDefault::TextList => KeywordData::TextList(Vec::new()),
            KeywordDefault::Range { min, max } => KeywordData::Range { min, max },
            KeywordDefault::Bins { min, max, width } => KeywordData::Bins { min, max, width },
            KeywordDefault::Value(v) => KeywordData::Value(NodeValue::Constant(v)),
            KeywordDefault::Node {
                allowed,
                only_in_scope,
            } => KeywordData::Node(NodeReference {
                target: None,
                allowed,
                only_in_scope,
            }),
            KeywordDefault::NodeList {
                allowed,
                only_in_scope,
            } => KeywordData::NodeList(NodeReferenceList {
                targets: Vec::new(),
                allowed,
                only_in_scope,
            }),
        }
    }
}

/// A keyword instance: its static spec, current data and whether it has been set.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    spec: &'static KeywordSpec,
    pub data: KeywordData,
    set: bool,
}

impl Keyword {
    pub fn new(spec: &'static KeywordSpec) -> Self {
        Self {
            spec,
            data: spec.default.into(),
            set: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn description(&self) -> &'static str {
        self.spec.description
    }

    pub fn is_set(&self) -> bool {
        self.set
    }

    pub fn mark_set(&mut self) {
        self.set = true;
    }

    /// Restores the default data and clears the set flag.
    pub fn reset(&mut self) {
        self.data = self.spec.default.into();
        self.set = false;
    }
}

/// Ordered collection of the keywords configuring one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordStore {
    keywords: Vec<Keyword>,
}

impl KeywordStore {
    pub fn from_specs(specs: &'static [KeywordSpec]) -> Self {
        Self {
            keywords: specs.iter().map(Keyword::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Keyword> {
        self.keywords.iter_mut()
    }

    /// Case-insensitive lookup by keyword name.
    pub fn find(&self, name: &str) -> Option<&Keyword> {
        self.keywords
            .iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Keyword> {
        self.keywords
            .iter_mut()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&KeywordData> {
        self.find(name).map(|k| &k.data)
    }

    /// Replaces a keyword's data and marks it as set. Returns false if no such keyword.
    pub fn set(&mut self, name: &str, data: KeywordData) -> bool {
        match self.find_mut(name) {
            Some(keyword) => {
                keyword.data = data;
                keyword.mark_set();
                true
            }
            None => false,
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.find(name).is_some_and(Keyword::is_set)
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            KeywordData::Double(d) => Some(*d),
            KeywordData::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            KeywordData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn text_list(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            KeywordData::TextList(items) => Some(items),
            _ => None,
        }
    }

    pub fn range(&self, name: &str) -> Option<(f64, f64)> {
        match self.get(name)? {
            KeywordData::Range { min, max } => Some((*min, *max)),
            _ => None,
        }
    }

    pub fn bins(&self, name: &str) -> Option<(f64, f64, f64)> {
        match self.get(name)? {
            KeywordData::Bins { min, max, width } => Some((*min, *max, *width)),
            _ => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<&NodeValue> {
        match self.get(name)? {
            KeywordData::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn node(&self, name: &str) -> Option<NodeId> {
        match self.get(name)? {
            KeywordData::Node(reference) => reference.target,
            _ => None,
        }
    }

    pub fn nodes(&self, name: &str) -> &[NodeId] {
        match self.get(name) {
            Some(KeywordData::NodeList(list)) => &list.targets,
            _ => &[],
        }
    }

    pub fn set_node(&mut self, name: &str, target: NodeId) -> bool {
        match self.find_mut(name) {
            Some(keyword) => match &mut keyword.data {
                KeywordData::Node(reference) => {
                    reference.target = Some(target);
                    keyword.set = true;
                    true
                }
                KeywordData::NodeList(list) => {
                    if !list.targets.contains(&target) {
                        list.targets.push(target);
                    }
                    keyword.set = true;
                    true
                }
                _ => false,
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    static SPECS: [KeywordSpec; 4] = [
        KeywordSpec {
            name: "Site",
            description: "Sites to select",
            default: KeywordDefault::TextList,
        },
        KeywordSpec {
            name: "RangeX",
            description: "Histogram range",
            default: KeywordDefault::Bins {
                min: 0.0,
                max: 10.0,
                width: 0.05,
            },
        },
        KeywordSpec {
            name: "Value",
            description: "A value",
            default: KeywordDefault::Value(1.0),
        },
        KeywordSpec {
            name: "ReferenceSite",
            description: "Reference node",
            default: KeywordDefault::Node {
                allowed: &[NodeType::Select],
                only_in_scope: true,
            },
        },
    ];

    #[test]
    fn store_is_built_from_specs_with_defaults() {
        let store = KeywordStore::from_specs(&SPECS);
        assert_eq!(store.len(), 4);
        assert_eq!(store.bins("rangex"), Some((0.0, 10.0, 0.05)));
        assert_eq!(store.value("Value"), Some(&NodeValue::Constant(1.0)));
        assert_eq!(store.text_list("Site"), Some(&[][..]));
        assert!(store.iter().all(|k| !k.is_set()));
    }

    #[test]
    fn set_marks_keyword_and_reset_restores_default() {
        let mut store = KeywordStore::from_specs(&SPECS);
        assert!(store.set("Value", KeywordData::Value(NodeValue::from_text("x*2"))));
        assert!(store.is_set("value"));
        assert!(!store.set("Missing", KeywordData::Integer(1)));

        store.find_mut("Value").unwrap().reset();
        assert!(!store.is_set("Value"));
        assert_eq!(store.value("Value"), Some(&NodeValue::Constant(1.0)));
    }

    #[test]
    fn set_node_fills_references() {
        let mut ids: SlotMap<NodeId, ()> = SlotMap::with_key();
        let target = ids.insert(());
        let mut store = KeywordStore::from_specs(&SPECS);

        assert!(store.set_node("ReferenceSite", target));
        assert_eq!(store.node("ReferenceSite"), Some(target));
        assert!(!store.set_node("Value", target));
    }

    #[test]
    fn node_reference_type_filter() {
        let reference = NodeReference {
            target: None,
            allowed: &[NodeType::Select],
            only_in_scope: true,
        };
        assert!(reference.accepts(NodeType::Select));
        assert!(!reference.accepts(NodeType::Collect1D));

        let open = NodeReference {
            target: None,
            allowed: &[],
            only_in_scope: false,
        };
        assert!(open.accepts(NodeType::Temperature));
    }

    #[test]
    fn deprecated_keywords_map_to_replacements() {
        assert_eq!(deprecated_replacement("Species"), Some("Site"));
        assert_eq!(deprecated_replacement("Site"), None);
    }
}
