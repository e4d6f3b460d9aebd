//! The quantity document: a flat name-to-formula map.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lastform_core::group::Group;
use lastform_resolve::{Registration, Resolver};

/// Errors that can occur while loading or saving quantity documents.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document file could not be read or written.
    #[error("failed to access quantity document: {0}")]
    Io(#[from] std::io::Error),

    /// The document contained invalid YAML.
    #[error("failed to parse quantity document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document contained invalid TOML.
    #[error("failed to parse quantity document: {0}")]
    Toml(#[from] toml::de::Error),

    /// Neither YAML nor TOML parsing succeeded for an unknown extension.
    #[error("quantity document '{path}' is neither valid YAML nor valid TOML")]
    UnknownFormat {
        /// The offending path.
        path: String,
    },
}

/// A specialized `Result` type for document operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// One document entry: either a bare formula string or a detailed form
/// with id and group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    /// Shorthand: the value is the formula, global, no id.
    Formula(String),
    /// Full form.
    Detailed {
        /// Formula source text.
        formula: String,
        /// Quantity name, when it differs from the document key. Variants
        /// of one quantity share a name but need distinct keys.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Optional numeric identity.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u32>,
        /// Variant group tag; absent or empty means global.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
}

impl Entry {
    /// The formula source text.
    pub fn formula(&self) -> &str {
        match self {
            Entry::Formula(f) => f,
            Entry::Detailed { formula, .. } => formula,
        }
    }

    /// The quantity name, falling back to the document key.
    pub fn name<'a>(&'a self, key: &'a str) -> &'a str {
        match self {
            Entry::Formula(_) => key,
            Entry::Detailed { name, .. } => name.as_deref().unwrap_or(key),
        }
    }

    /// The numeric id, if any.
    pub fn id(&self) -> Option<u32> {
        match self {
            Entry::Formula(_) => None,
            Entry::Detailed { id, .. } => *id,
        }
    }

    /// The group tag, defaulting to global.
    pub fn group(&self) -> Group {
        match self {
            Entry::Formula(_) => Group::Global,
            Entry::Detailed { group, .. } => {
                group.as_deref().map(Group::tag).unwrap_or(Group::Global)
            }
        }
    }
}

/// A flat, ordered key-to-entry map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuantityDoc {
    /// Document key to entry. The key doubles as the quantity name unless
    /// the entry overrides it.
    pub entries: BTreeMap<String, Entry>,
}

impl QuantityDoc {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a YAML document.
    pub fn parse_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parses a TOML document.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a document from a file, detecting YAML vs TOML by extension.
    /// Unknown extensions try YAML first, then TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::parse_yaml(&content),
            Some("toml") => Self::parse_toml(&content),
            _ => Self::parse_yaml(&content)
                .or_else(|_| Self::parse_toml(&content))
                .map_err(|_| ConfigError::UnknownFormat {
                    path: path.display().to_string(),
                }),
        }
    }

    /// Writes the document as YAML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Sparse merge: entries from `other` replace same-named entries here;
    /// keys absent from `other` are left unchanged.
    pub fn merge(&mut self, other: &QuantityDoc) {
        for (name, entry) in &other.entries {
            self.entries.insert(name.clone(), entry.clone());
        }
    }

    /// Registers every entry with a resolver.
    pub fn register_all(&self, resolver: &mut Resolver) {
        for (key, entry) in &self.entries {
            let name = entry.name(key);
            let mut registration = match entry.group() {
                Group::Global => Registration::global(name, entry.formula()),
                Group::Tag(tag) => Registration::grouped(name, entry.formula(), tag),
            };
            if let Some(id) = entry.id() {
                registration = registration.with_id(id);
            }
            resolver.register(registration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_yaml_shorthand() {
        let doc = QuantityDoc::parse_yaml("heel_height: \"40\"\nwedge: \"heel_height / 2\"\n")
            .unwrap();
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(doc.entries["wedge"].formula(), "heel_height / 2");
        assert_eq!(doc.entries["wedge"].group(), Group::Global);
    }

    #[test]
    fn parse_yaml_detailed() {
        let yaml = r#"
girth_left:
  formula: "240"
  id: 7
  group: left
"#;
        let doc = QuantityDoc::parse_yaml(yaml).unwrap();
        let entry = &doc.entries["girth_left"];
        assert_eq!(entry.formula(), "240");
        assert_eq!(entry.id(), Some(7));
        assert_eq!(entry.group(), Group::tag("left"));
    }

    #[test]
    fn parse_toml_detailed() {
        let toml_str = r#"
heel_height = "40"

[girth]
formula = "220"
group = "right"
"#;
        let doc = QuantityDoc::parse_toml(toml_str).unwrap();
        assert_eq!(doc.entries["heel_height"].formula(), "40");
        assert_eq!(doc.entries["girth"].group(), Group::tag("right"));
    }

    #[test]
    fn merge_is_sparse() {
        let mut base = QuantityDoc::parse_yaml("a: \"1\"\nb: \"2\"\n").unwrap();
        let patch = QuantityDoc::parse_yaml("b: \"20\"\nc: \"3\"\n").unwrap();
        base.merge(&patch);

        assert_eq!(base.entries["a"].formula(), "1"); // untouched
        assert_eq!(base.entries["b"].formula(), "20"); // replaced
        assert_eq!(base.entries["c"].formula(), "3"); // added
    }

    #[test]
    fn register_all_feeds_resolver() {
        let yaml = r#"
w_left:
  formula: "10"
  name: w
  group: left
w_right:
  formula: "20"
  name: w
  group: right
total: "w * 2"
"#;
        let doc = QuantityDoc::parse_yaml(yaml).unwrap();
        let mut resolver = Resolver::default();
        doc.register_all(&mut resolver);
        assert_eq!(resolver.len(), 3);

        resolver.update().unwrap();
        resolver.calculate().unwrap();
        // The global total splits per group and uses each group's w.
        let left = resolver.get_by_name("total", &Group::tag("left")).unwrap();
        let right = resolver.get_by_name("total", &Group::tag("right")).unwrap();
        assert_eq!(resolver.value(left), 20.0);
        assert_eq!(resolver.value(right), 40.0);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quantities.yaml");

        let doc = QuantityDoc::parse_yaml("a: \"1\"\nb: \"a * 2\"\n").unwrap();
        doc.save(&path).unwrap();
        let back = QuantityDoc::load(&path).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn unknown_extension_tries_both() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quantities.conf");
        std::fs::write(&path, "a = \"1\"\n").unwrap();
        let doc = QuantityDoc::load(&path).unwrap();
        assert_eq!(doc.entries["a"].formula(), "1");
    }
}
