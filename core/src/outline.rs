//! Serializable structural view of a command tree.
//!
//! Outlines drop everything that cannot be compared or exported (typers,
//! accessors, actions) and keep the shape: names, descriptions and option
//! metadata. Two compilations of the same schema produce equal outlines.

use serde::{Deserialize, Serialize};

use crate::option::{OptionDef, OptionKind, Position};

/// Structure of one command and its sub-commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutline {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionOutline>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommandOutline>,
}

impl CommandOutline {
    /// Serializes the outline as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses an outline previously produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Finds a descendant outline by command path.
    pub fn find(&self, path: &[&str]) -> Option<&CommandOutline> {
        path.iter().try_fold(self, |outline, name| {
            outline.children.iter().find(|c| c.name == *name)
        })
    }
}

/// Structure of one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionOutline {
    pub name: String,
    pub kind: OptionKind,
    /// Rust type name of the bound field.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub triggers_usage: bool,
}

impl From<&OptionDef> for OptionOutline {
    fn from(option: &OptionDef) -> Self {
        Self {
            name: option.name().to_string(),
            kind: option.kind(),
            type_name: option.typer().type_name().to_string(),
            default: option.default().map(str::to_string),
            description: option.description().to_string(),
            arg_name: option.arg_name().map(str::to_string),
            position: option.position(),
            triggers_usage: option.triggers_usage(),
        }
    }
}
