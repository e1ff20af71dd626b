//! Serialized description of a solution.
//!
//! This is the on-disk form of a [`Snapshot`](super::Snapshot). Types are
//! referenced by canonical qualified name (`App.Models.Outer+Inner`),
//! methods by `<type>::<name>` or `<type>::<name>(<params>)`.

use serde::{Deserialize, Serialize};

use super::TypeKind;

/// Top-level solution description.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SnapshotDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectDescription>,
    /// Types known only through metadata, such as test framework attributes.
    #[serde(default)]
    pub external_types: Vec<TypeDescription>,
}

/// One project of the solution.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProjectDescription {
    pub name: String,
    /// Names of projects this one depends on.
    #[serde(default)]
    pub references: Vec<String>,
    /// Set when the project could not be compiled.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeDescription>,
}

/// A type declaration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TypeDescription {
    pub name: String,
    /// Dotted namespace; empty or absent for the global namespace.
    /// Ignored for nested types.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    /// Display form used when this type contains other symbols (`Box<T>`).
    #[serde(default)]
    pub display_name: Option<String>,
    /// Qualified name of the direct base class.
    #[serde(default)]
    pub base: Option<String>,
    /// Qualified names of directly implemented interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDescription>,
    #[serde(default)]
    pub nested_types: Vec<TypeDescription>,
}

/// A method declaration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MethodDescription {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Qualified names of the attribute types applied to the method.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Methods this method calls directly.
    #[serde(default)]
    pub calls: Vec<String>,
}

/// A parsed `<type>::<name>(<params>)` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MethodPath {
    pub type_name: String,
    pub name: String,
    pub parameters: Option<Vec<String>>,
}

impl MethodPath {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (type_name, rest) = raw.rsplit_once("::")?;
        let (name, parameters) = match rest.find('(') {
            Some(open) => {
                let inner = rest[open + 1..].strip_suffix(')')?;
                let params = split_parameters(inner);
                (&rest[..open], Some(params))
            }
            None => (rest, None),
        };
        let name = name.trim();
        let type_name = type_name.trim();
        if name.is_empty() || type_name.is_empty() {
            return None;
        }
        Some(Self {
            type_name: type_name.to_string(),
            name: name.to_string(),
            parameters,
        })
    }
}

/// Split a parameter list on top-level commas (`Dictionary<K, V>, int`).
fn split_parameters(inner: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in inner.chars() {
        match c {
            '<' | '[' | '(' => {
                depth += 1;
                current.push(c);
            }
            '>' | ']' | ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                params.push(normalize_parameter(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        params.push(normalize_parameter(&current));
    }
    params
}

/// Drop whitespace so `Dictionary<K, V>` and `Dictionary<K,V>` compare equal.
pub(crate) fn normalize_parameter(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_path_without_parameters() {
        let path = MethodPath::parse("App.Core.Calculator::Add").unwrap();
        assert_eq!(path.type_name, "App.Core.Calculator");
        assert_eq!(path.name, "Add");
        assert_eq!(path.parameters, None);
    }

    #[test]
    fn test_parse_method_path_with_generic_parameters() {
        let path = MethodPath::parse("App.Outer+Inner::Run(Dictionary<string, int>, int)").unwrap();
        assert_eq!(path.type_name, "App.Outer+Inner");
        assert_eq!(path.name, "Run");
        assert_eq!(
            path.parameters,
            Some(vec!["Dictionary<string,int>".to_string(), "int".to_string()])
        );
    }

    #[test]
    fn test_parse_method_path_empty_parameter_list() {
        let path = MethodPath::parse("App.Calc::Reset()").unwrap();
        assert_eq!(path.parameters, Some(vec![]));
    }

    #[test]
    fn test_parse_method_path_rejects_garbage() {
        assert!(MethodPath::parse("NoSeparator").is_none());
        assert!(MethodPath::parse("::Add").is_none());
        assert!(MethodPath::parse("App.Calc::Add(int").is_none());
    }

    #[test]
    fn test_parse_description_yaml() {
        let yaml = r#"
projects:
  - name: App.Core
    types:
      - name: Calculator
        namespace: App.Core
        methods:
          - name: Add
            parameters: [int, int]
external_types:
  - name: TestAttribute
    namespace: NUnit.Framework
"#;
        let desc: SnapshotDescription = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(desc.projects.len(), 1);
        assert_eq!(desc.projects[0].types[0].kind, TypeKind::Class);
        assert_eq!(desc.projects[0].types[0].methods[0].parameters.len(), 2);
        assert_eq!(desc.external_types[0].name, "TestAttribute");
    }
}
