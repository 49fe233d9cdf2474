//! Registry Documents
//!
//! Typed, owned view of a registry XML document. Only the sections the
//! analysis consumes are modelled: tags, platforms, extensions, features,
//! types and commands. The loader turns the raw XML into this tree once;
//! every later pass pattern-matches on it instead of probing attributes.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

// =============================================================================
// API Lists
// =============================================================================

/// Comma-separated API variant list (`api="vulkan,vulkansc"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiList(pub Vec<String>);

impl ApiList {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn includes(&self, api: &str) -> bool {
        self.0.iter().any(|a| a == api)
    }
}

/// True when a node with the given `api` attribute applies to `target`.
/// Nodes without the attribute apply to every API.
pub fn applies_to(api: Option<&ApiList>, target: &str) -> bool {
    api.map_or(true, |list| list.includes(target))
}

// =============================================================================
// Top-level sections
// =============================================================================

/// A platform and the preprocessor guard protecting its symbols
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub protect: String,
}

/// Support state of an extension relative to the target API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportState {
    /// Supported by the target API
    Enabled,
    /// Explicitly `supported="disabled"`
    Disabled,
    /// Supported only by other API variants
    OtherApi(ApiList),
}

impl SupportState {
    pub fn parse(raw: Option<&str>, target: &str) -> Self {
        match raw {
            Some("disabled") => Self::Disabled,
            Some(list) => {
                let apis = ApiList::parse(list);
                if apis.includes(target) {
                    Self::Enabled
                } else {
                    Self::OtherApi(apis)
                }
            }
            None => Self::Enabled,
        }
    }
}

/// One `<require>` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiList>,
    pub commands: Vec<String>,
    pub enums: Vec<String>,
    pub types: Vec<String>,
}

/// An `<extension>` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    /// Raw `supported` attribute; interpreted against the target API by `support`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub requires: Vec<RequireBlock>,
}

impl Extension {
    pub fn support(&self, target: &str) -> SupportState {
        SupportState::parse(self.supported.as_deref(), target)
    }

    /// Every command named by any require block, in document order
    pub fn all_commands(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .flat_map(|r| r.commands.iter().map(String::as_str))
    }

    pub fn all_types(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .flat_map(|r| r.types.iter().map(String::as_str))
    }
}

/// A `<feature>` element (an API level)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiList>,
    /// Version number attribute, e.g. `1.3`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    pub requires: Vec<RequireBlock>,
}

// =============================================================================
// Types
// =============================================================================

/// Definition macro of a handle type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleKind {
    /// `VK_DEFINE_HANDLE`
    Dispatchable,
    /// `VK_DEFINE_NON_DISPATCHABLE_HANDLE` or anything else
    NonDispatchable,
}

impl HandleKind {
    pub fn from_macro(macro_name: &str) -> Self {
        if macro_name == "VK_DEFINE_HANDLE" {
            Self::Dispatchable
        } else {
            Self::NonDispatchable
        }
    }
}

/// Category-specific payload of a `<type>` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeCategory {
    Struct {
        members: Vec<MemberNode>,
        /// `structextends` list
        extends: Vec<String>,
    },
    Handle {
        parents: Vec<String>,
        /// `None` for alias-form nodes
        kind: Option<HandleKind>,
    },
    Enum,
    BaseType {
        underlying: Option<String>,
    },
    Bitmask {
        /// `None` for alias-form nodes
        underlying: Option<String>,
    },
    /// Categories the analysis does not classify (include, define, union, ...)
    Other(String),
}

/// A `<type>` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiList>,
    pub category: TypeCategory,
}

impl TypeNode {
    pub fn is_alias(&self) -> bool {
        self.alias.is_some()
    }
}

// =============================================================================
// Members, parameters and commands
// =============================================================================

/// A struct `<member>` or command `<param>`
///
/// `decl` keeps the full declaration text (`const VkFoo* const* pFoo[4]`)
/// so pointer depth, constness and array suffixes can be derived later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberNode {
    pub name: String,
    pub type_name: String,
    pub decl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altlen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externsync: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
}

impl MemberNode {
    /// `optional="true,false"`: both present and absent use are admitted
    pub fn optional_both_ways(&self) -> bool {
        self.optional
            .as_deref()
            .map_or(false, |o| o.contains("true") && o.contains("false"))
    }

    /// First element of the `optional` list
    pub fn optional_outer(&self) -> bool {
        self.optional
            .as_deref()
            .and_then(|o| o.split(',').next())
            .map_or(false, |o| o.trim() == "true")
    }
}

/// A `<command>` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiList>,
    /// Empty for alias nodes
    pub params: Vec<MemberNode>,
}

// =============================================================================
// Document
// =============================================================================

/// One parsed registry document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub tags: Vec<String>,
    pub platforms: Vec<Platform>,
    pub extensions: Vec<Extension>,
    pub features: Vec<Feature>,
    pub types: Vec<TypeNode>,
    pub commands: Vec<CommandNode>,
}

impl RegistryDocument {
    /// Parse a registry document from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        loader::parse_document(xml)
    }

    /// Read and parse a registry document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    pub fn platform(&self, name: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.name == name)
    }
}
