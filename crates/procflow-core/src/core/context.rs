use std::fmt;
use std::str::FromStr;

/// Context tag restricting where a node kind may legally be placed.
///
/// Every [`NodeSequence`](super::sequence::NodeSequence) carries one of these tags, and
/// every node kind declares the set of tags in which it is relevant. The `Inherit`
/// variant is a sentinel meaning "use the context of my owner node's scope" and must be
/// resolved to a concrete tag before it is ever compared against a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeContext {
    /// Building or modifying the contents of a configuration.
    Generation,
    /// Analysing an existing configuration.
    Analysis,
    /// Control flow not tied to either generation or analysis.
    Control,
    /// Operating on data produced by a processing node.
    Operate,
    /// Relevant everywhere.
    Any,
    /// Resolved through the owner node's scope.
    Inherit,
}

impl NodeContext {
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeContext::Generation => "Generation",
            NodeContext::Analysis => "Analysis",
            NodeContext::Control => "Control",
            NodeContext::Operate => "Operate",
            NodeContext::Any => "Any",
            NodeContext::Inherit => "Inherit",
        }
    }
}

impl fmt::Display for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for NodeContext {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generation" => Ok(NodeContext::Generation),
            "analysis" => Ok(NodeContext::Analysis),
            "control" => Ok(NodeContext::Control),
            "operate" => Ok(NodeContext::Operate),
            "any" => Ok(NodeContext::Any),
            "inherit" => Ok(NodeContext::Inherit),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!(NodeContext::from_str("analysis"), Ok(NodeContext::Analysis));
        assert_eq!(NodeContext::from_str("GENERATION"), Ok(NodeContext::Generation));
        assert_eq!(NodeContext::from_str("Operate"), Ok(NodeContext::Operate));
        assert_eq!(NodeContext::from_str("inHerit"), Ok(NodeContext::Inherit));
    }

    #[test]
    fn from_str_rejects_unknown_contexts() {
        assert_eq!(NodeContext::from_str("analyser"), Err(()));
        assert_eq!(NodeContext::from_str(""), Err(()));
    }
}
