use super::ids::NodeId;
use std::fmt;

/// A scalar value held by a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpressionValue {
    Integer(i64),
    Double(f64),
}

impl ExpressionValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ExpressionValue::Integer(i) => i as f64,
            ExpressionValue::Double(d) => d,
        }
    }

    /// Parses a value from text, preferring an integer representation.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(ExpressionValue::Integer(i));
        }
        text.parse::<f64>().ok().map(ExpressionValue::Double)
    }
}

impl Default for ExpressionValue {
    fn default() -> Self {
        ExpressionValue::Integer(0)
    }
}

impl fmt::Display for ExpressionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionValue::Integer(i) => write!(f, "{}", i),
            ExpressionValue::Double(d) => write!(f, "{:?}", d),
        }
    }
}

/// A named, typed scalar variable declared by a node.
///
/// The externally visible name is `"<prefix>.<base name>"` when a prefix is present,
/// and the bare base name otherwise. The prefix is the declaring node's name for all
/// node kinds except `Parameters`, whose parameters are exposed unprefixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    base_name: String,
    prefix: Option<String>,
    value: ExpressionValue,
}

impl Parameter {
    pub fn new(base_name: &str, value: ExpressionValue) -> Self {
        Self {
            base_name: base_name.to_string(),
            prefix: None,
            value,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Returns the externally visible name of the parameter.
    pub fn name(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, self.base_name),
            _ => self.base_name.clone(),
        }
    }

    pub fn set_prefix(&mut self, prefix: Option<&str>) {
        self.prefix = prefix.map(str::to_string);
    }

    pub fn value(&self) -> ExpressionValue {
        self.value
    }

    pub fn set_value(&mut self, value: ExpressionValue) {
        self.value = value;
    }

    /// Case-insensitive comparison against the externally visible name.
    pub fn matches(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }
}

/// Non-owning handle to a parameter: the declaring node and the parameter's index
/// within that node's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterRef {
    pub node: NodeId,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_without_prefix_is_base_name() {
        let param = Parameter::new("x", ExpressionValue::Double(1.5));
        assert_eq!(param.name(), "x");
        assert!(param.matches("X"));
    }

    #[test]
    fn name_with_prefix_is_dotted() {
        let mut param = Parameter::new("x", ExpressionValue::default());
        param.set_prefix(Some("Calc01"));
        assert_eq!(param.name(), "Calc01.x");
        assert!(param.matches("calc01.x"));
        assert!(!param.matches("x"));
    }

    #[test]
    fn empty_prefix_is_treated_as_absent() {
        let mut param = Parameter::new("x", ExpressionValue::default());
        param.set_prefix(Some(""));
        assert_eq!(param.name(), "x");
    }

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(ExpressionValue::parse("3"), Some(ExpressionValue::Integer(3)));
        assert_eq!(ExpressionValue::parse("3.5"), Some(ExpressionValue::Double(3.5)));
        assert_eq!(ExpressionValue::parse("1e3"), Some(ExpressionValue::Double(1000.0)));
        assert_eq!(ExpressionValue::parse("three"), None);
    }

    #[test]
    fn display_keeps_doubles_distinguishable() {
        assert_eq!(ExpressionValue::Integer(4).to_string(), "4");
        assert_eq!(ExpressionValue::Double(4.0).to_string(), "4.0");
    }
}
