//! Template AST as produced by the Svelte compiler (`compile(...).ast.html`).
//!
//! Only the fields the checker reads are modelled. The compiler embeds ESTree
//! nodes for expressions, and some of their fields reuse template field names
//! with different shapes (`expression: true` on arrow functions, `value: "x"`
//! on literals), so those fields are read leniently: a shape that does not fit
//! is treated as absent instead of failing the whole document.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Fragment,
    Element,
    InlineComponent,
    Attribute,
    Text,
    MustacheTag,
    Spread,
    AttributeShorthand,
    Identifier,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub end: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub children: Vec<Node>,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub attributes: Vec<Node>,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: AttributeValue,
    #[serde(default, deserialize_with = "lenient")]
    pub expression: Option<Box<Node>>,
    #[serde(rename = "else", default, deserialize_with = "lenient")]
    pub else_branch: Option<Box<Node>>,
}

/// Value of an `Attribute` node: text and mustache segments, or `true` for a
/// valueless attribute such as `<Button disabled />`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    None,
    Flag(bool),
    Nodes(Vec<Node>),
}

impl AttributeValue {
    pub fn nodes(&self) -> &[Node] {
        match self {
            AttributeValue::Nodes(nodes) => nodes,
            _ => &[],
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind, start: u32, end: u32) -> Self {
        Self {
            kind,
            start,
            end,
            name: None,
            children: Vec::new(),
            attributes: Vec::new(),
            value: AttributeValue::None,
            expression: None,
            else_branch: None,
        }
    }

    pub fn is_inline_component(&self) -> bool {
        self.kind == NodeKind::InlineComponent
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == NodeKind::Attribute
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == NodeKind::Identifier
    }

    pub fn is_spread(&self) -> bool {
        self.kind == NodeKind::Spread
    }

    /// Nodes that wrap exactly one expression: `{x}`, `{...x}` and `{x}` in
    /// attribute position.
    pub fn is_expression_wrapper(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::MustacheTag | NodeKind::Spread | NodeKind::AttributeShorthand
        )
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_nodes<'de, D>(deserializer: D) -> Result<Vec<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(nodes_from_value(value))
}

fn lenient_value<'de, D>(deserializer: D) -> Result<AttributeValue, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => AttributeValue::Flag(flag),
        Value::Array(_) => AttributeValue::Nodes(nodes_from_value(value)),
        _ => AttributeValue::None,
    })
}

fn nodes_from_value(value: Value) -> Vec<Node> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}
