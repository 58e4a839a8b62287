//! Serializable mirror of the driver's configuration graph.
//!
//! A node is either a section holding ordered children or a typed leaf.
//! The kind-specific payload lives in [`NodeBody`], so a leaf can never carry
//! children and a section can never carry a value.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    pub label: String,
    pub id: i32,
    #[serde(flatten)]
    pub body: NodeBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeBody {
    Section {
        children: Vec<ConfigNode>,
    },
    Text {
        value: String,
        #[serde(default)]
        choices: Vec<String>,
    },
    Radio {
        value: String,
        choices: Vec<String>,
    },
    Menu {
        value: String,
        choices: Vec<String>,
    },
    Toggle {
        value: bool,
        #[serde(default)]
        choices: Vec<String>,
    },
    Range {
        value: f32,
        min: f32,
        max: f32,
        step: f32,
        #[serde(default)]
        choices: Vec<String>,
    },
}

impl NodeBody {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Text {
            value: value.into(),
            choices: Vec::new(),
        }
    }

    pub fn toggle(value: bool) -> Self {
        Self::Toggle {
            value,
            choices: Vec::new(),
        }
    }

    pub fn range(value: f32, min: f32, max: f32, step: f32) -> Self {
        Self::Range {
            value,
            min,
            max,
            step,
            choices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Section,
    Text,
    Radio,
    Menu,
    Toggle,
    Range,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Section => "section",
            Self::Text => "text",
            Self::Radio => "radio",
            Self::Menu => "menu",
            Self::Toggle => "toggle",
            Self::Range => "range",
        };
        f.write_str(name)
    }
}

/// Leaf value in its native type
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    Text(String),
    Toggle(bool),
    Range(f32),
}

impl ConfigNode {
    pub fn section<S: Into<String>>(name: S, label: S, id: i32, children: Vec<ConfigNode>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            id,
            body: NodeBody::Section { children },
        }
    }

    pub fn leaf<S: Into<String>>(name: S, label: S, id: i32, body: NodeBody) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            id,
            body,
        }
    }

    pub fn kind(&self) -> ConfigKind {
        match self.body {
            NodeBody::Section { .. } => ConfigKind::Section,
            NodeBody::Text { .. } => ConfigKind::Text,
            NodeBody::Radio { .. } => ConfigKind::Radio,
            NodeBody::Menu { .. } => ConfigKind::Menu,
            NodeBody::Toggle { .. } => ConfigKind::Toggle,
            NodeBody::Range { .. } => ConfigKind::Range,
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self.body, NodeBody::Section { .. })
    }

    pub fn children(&self) -> &[ConfigNode] {
        match &self.body {
            NodeBody::Section { children } => children,
            _ => &[],
        }
    }

    /// Choice list for enumerated leaves, empty otherwise
    pub fn choices(&self) -> &[String] {
        match &self.body {
            NodeBody::Section { .. } => &[],
            NodeBody::Text { choices, .. }
            | NodeBody::Radio { choices, .. }
            | NodeBody::Menu { choices, .. }
            | NodeBody::Toggle { choices, .. }
            | NodeBody::Range { choices, .. } => choices,
        }
    }

    pub fn value(&self) -> Option<LeafValue> {
        match &self.body {
            NodeBody::Section { .. } => None,
            NodeBody::Text { value, .. }
            | NodeBody::Radio { value, .. }
            | NodeBody::Menu { value, .. } => Some(LeafValue::Text(value.clone())),
            NodeBody::Toggle { value, .. } => Some(LeafValue::Toggle(*value)),
            NodeBody::Range { value, .. } => Some(LeafValue::Range(*value)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Resolve a dotted path relative to this node, e.g. `imgsettings.iso`
    pub fn find(&self, path: &str) -> Option<&ConfigNode> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.')
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Depth-first search for the first node with the given name
    pub fn find_by_name(&self, name: &str) -> Option<&ConfigNode> {
        if self.name == name {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find_by_name(name))
    }

    pub fn leaf_count(&self) -> usize {
        match &self.body {
            NodeBody::Section { children } => children.iter().map(ConfigNode::leaf_count).sum(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigNode {
        ConfigNode::section(
            "main",
            "Camera and Driver Configuration",
            0,
            vec![ConfigNode::section(
                "imgsettings",
                "Image Settings",
                1,
                vec![
                    ConfigNode::leaf(
                        "iso",
                        "ISO Speed",
                        2,
                        NodeBody::Radio {
                            value: "100".to_string(),
                            choices: vec!["100".to_string(), "200".to_string()],
                        },
                    ),
                    ConfigNode::leaf("flash", "Flash", 3, NodeBody::toggle(false)),
                ],
            )],
        )
    }

    #[test]
    fn test_find_dotted_path() {
        let tree = sample();
        let iso = tree.find("imgsettings.iso").unwrap();
        assert_eq!(iso.kind(), ConfigKind::Radio);
        assert_eq!(iso.choices(), ["100", "200"]);
        assert!(tree.find("imgsettings.missing").is_none());
        assert!(tree.find("iso").is_none());
    }

    #[test]
    fn test_find_by_name_descends() {
        let tree = sample();
        assert_eq!(tree.find_by_name("flash").unwrap().id, 3);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_sections_have_no_value() {
        let tree = sample();
        assert!(tree.value().is_none());
        assert!(tree.choices().is_empty());
        let flash = tree.find("imgsettings.flash").unwrap();
        assert_eq!(flash.value(), Some(LeafValue::Toggle(false)));
        assert!(flash.children().is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let tree = sample();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["kind"], "section");
        let iso = &json["children"][0]["children"][0];
        assert_eq!(iso["kind"], "radio");
        assert_eq!(iso["value"], "100");
        assert_eq!(iso["choices"][1], "200");
        assert!(json.get("value").is_none());
        assert!(json.get("choices").is_none());
    }

    #[test]
    fn test_every_leaf_serializes_choices() {
        let tree = sample();
        let json = serde_json::to_value(&tree).unwrap();
        let flash = &json["children"][0]["children"][1];
        assert_eq!(flash["kind"], "toggle");
        assert_eq!(flash["choices"], serde_json::json!([]));

        let zoom = ConfigNode::leaf("zoom", "Zoom", 4, NodeBody::range(0.0, 0.0, 100.0, 1.0));
        let serial = ConfigNode::leaf("serialnumber", "Serial Number", 5, NodeBody::text("1234"));
        for leaf in [zoom, serial] {
            let json = serde_json::to_value(&leaf).unwrap();
            assert_eq!(json["choices"], serde_json::json!([]), "{}", leaf.name);
        }
    }

    #[test]
    fn test_leaf_without_choices_key_still_parses() {
        let json = r#"{"name":"flash","label":"Flash","id":3,"kind":"toggle","value":true}"#;
        let node: ConfigNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.body, NodeBody::toggle(true));
        assert!(node.choices().is_empty());
    }
}
