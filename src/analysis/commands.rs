//! Command Classification
//!
//! Final pass over the `<commands>` section. Aliases are resolved first; each
//! canonical command is then classified once per bound name (itself plus every
//! alias), so an alias always inherits the canonical node's parameter data.
//!
//! Per name the pass decides: admission, query-twice shape, create/destroy
//! role, external synchronization, and chain scope.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use super::collect::SymbolSets;
use super::params::{describe, ParamDescriptor};
use super::rules::{self, LifecycleRole, SyncValue};
use super::types::TypeTables;
use super::AnalysisOptions;
use crate::error::{RegistryError, Result};
use crate::filter::VendorFilter;
use crate::ordered::{OrderedMap, OrderedSet};
use crate::registry::{applies_to, CommandNode, MemberNode, RegistryDocument};

// =============================================================================
// Output records
// =============================================================================

/// Call-chain scope of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainScope {
    /// Callable before an instance exists (loader-level)
    Global,
    Instance,
    Device,
}

/// One (name, type) output of a query-twice command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub name: String,
    pub type_name: String,
}

/// A command following the call-once-for-count, call-again-for-data contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTwice {
    pub count_name: String,
    pub count_type: String,
    pub outputs: Vec<QueryOutput>,
}

/// The object a create/destroy command produces or consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEntry {
    /// Parameter holding the handle (or handle array)
    pub handle: String,
    /// Count parameter, nested count member, or the literal `1`
    pub count: String,
    pub handle_type: String,
}

/// An (owner, member) pair needing caller-enforced exclusive access.
/// The owner is a command for whole-parameter annotations and a structure
/// for path annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncAnnotation {
    pub owner: String,
    pub member: String,
}

impl SyncAnnotation {
    pub fn new(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
        }
    }
}

/// Output of the command pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandTables {
    /// Every admitted command in registration order
    pub functions: OrderedSet<String>,
    pub special_commands: OrderedSet<String>,
    pub instance_chain_commands: OrderedSet<String>,
    pub device_chain_commands: OrderedSet<String>,
    pub scopes: OrderedMap<String, ChainScope>,
    pub functions_create: OrderedMap<String, LifecycleEntry>,
    pub functions_destroy: OrderedMap<String, LifecycleEntry>,
    pub query_twice: OrderedMap<String, QueryTwice>,
    pub externally_synchronized: OrderedSet<SyncAnnotation>,
    /// Alias -> canonical command
    pub function_aliases: OrderedMap<String, String>,
    /// Canonical command -> aliases
    pub aliases_to_functions: OrderedMap<String, Vec<String>>,
    /// Command -> parameter descriptors (aliases share the canonical signature)
    pub params: OrderedMap<String, Vec<ParamDescriptor>>,
}

impl CommandTables {
    pub fn scope_of(&self, name: &str) -> Option<ChainScope> {
        self.scopes.get(name).copied()
    }

    /// Resolve a bound name to its canonical command
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.function_aliases.get(name).map_or(name, String::as_str)
    }
}

// =============================================================================
// Pass
// =============================================================================

/// Run the command pass
pub fn classify_commands(
    docs: &[&RegistryDocument],
    symbols: &SymbolSets,
    types: &TypeTables,
    filter: &VendorFilter,
    options: &AnalysisOptions,
) -> Result<CommandTables> {
    let mut tables = CommandTables::default();
    let target = options.target_api.as_str();

    let nodes: Vec<&CommandNode> = docs
        .iter()
        .flat_map(|doc| doc.commands.iter())
        .filter(|c| applies_to(c.api.as_ref(), target))
        .collect();

    resolve_aliases(&nodes, filter, &mut tables);

    for node in nodes.iter().filter(|n| n.alias.is_none()) {
        let params: Vec<MemberNode> = node
            .params
            .iter()
            .filter(|p| applies_to(p.api.as_ref(), target))
            .cloned()
            .collect();
        let descriptors: Vec<ParamDescriptor> = params.iter().map(|p| describe(p, false, types)).collect();

        let mut bound = vec![node.name.clone()];
        if let Some(aliases) = tables.aliases_to_functions.get(&node.name) {
            bound.extend(aliases.iter().cloned());
        }

        for name in bound {
            if !symbols.valid_functions.contains(&name) || filter.is_vendor_only(&name) {
                continue;
            }
            classify_one(&name, &params, &descriptors, types, &mut tables)?;
        }
    }

    check_scope_lists(&tables)?;

    tracing::info!(
        functions = tables.functions.len(),
        instance = tables.instance_chain_commands.len(),
        device = tables.device_chain_commands.len(),
        special = tables.special_commands.len(),
        query_twice = tables.query_twice.len(),
        "Classified commands"
    );
    Ok(tables)
}

/// Build alias -> canonical and canonical -> aliases, following alias chains
fn resolve_aliases(nodes: &[&CommandNode], filter: &VendorFilter, tables: &mut CommandTables) {
    let by_name: HashMap<&str, &CommandNode> = nodes.iter().map(|n| (n.name.as_str(), *n)).collect();

    for node in nodes {
        let Some(first) = node.alias.as_deref() else {
            continue;
        };
        if filter.is_vendor_only(&node.name) {
            continue;
        }

        let mut canonical = first;
        let mut seen = HashSet::from([node.name.as_str()]);
        while let Some(next) = by_name.get(canonical).and_then(|n| n.alias.as_deref()) {
            if !seen.insert(canonical) {
                break;
            }
            canonical = next;
        }

        tables
            .function_aliases
            .insert(node.name.clone(), canonical.to_string());
        tables
            .aliases_to_functions
            .entry(canonical.to_string())
            .or_default()
            .push(node.name.clone());
    }
}

fn classify_one(
    name: &str,
    params: &[MemberNode],
    descriptors: &[ParamDescriptor],
    types: &TypeTables,
    tables: &mut CommandTables,
) -> Result<()> {
    if tables.functions.contains(name) {
        tracing::debug!(command = %name, "Command already registered");
        return Ok(());
    }

    if rules::is_query_command(name) {
        if let Some(query) = detect_query_twice(name, params) {
            tables.query_twice.insert(name.to_string(), query);
        }
    }

    if let Some(role) = rules::lifecycle_role(name) {
        if let Some(entry) = detect_lifecycle(name, params) {
            match role {
                LifecycleRole::Create => tables.functions_create.insert(name.to_string(), entry),
                LifecycleRole::Destroy => tables.functions_destroy.insert(name.to_string(), entry),
            };
        }
    }

    for annotation in sync_annotations(name, params, types)? {
        tables.externally_synchronized.add(annotation);
    }

    let scope = chain_scope(params.iter().map(|p| p.type_name.as_str()));
    let list = match scope {
        ChainScope::Instance => &mut tables.instance_chain_commands,
        ChainScope::Device => &mut tables.device_chain_commands,
        ChainScope::Global => &mut tables.special_commands,
    };
    list.add(name.to_string());
    tables.functions.add(name.to_string());
    tables.scopes.insert(name.to_string(), scope);
    tables.params.insert(name.to_string(), descriptors.to_vec());
    Ok(())
}

// =============================================================================
// Rules applied per command
// =============================================================================

/// Query-twice detection. The last parameter is the default output; a
/// dual-optional `*Count`/`*Size` parameter of an accepted type marks the shape.
pub fn detect_query_twice(name: &str, params: &[MemberNode]) -> Option<QueryTwice> {
    let mut last: Option<&MemberNode> = None;
    let mut count: Option<&MemberNode> = None;

    for param in params {
        last = Some(param);
        if !param.optional_both_ways() {
            continue;
        }
        if rules::is_query_count(&param.name, &param.type_name) {
            count = Some(param);
        }
    }

    let count = count?;
    let last = last?;
    let mut last_type = last.type_name.clone();
    if last_type == "void" {
        last_type = "char".to_string();
    }

    let mut outputs = Vec::new();
    let (double_cmd, extra_name, extra_type) = rules::DOUBLE_OUTPUT_QUERY;
    if name == double_cmd {
        outputs.push(QueryOutput {
            name: extra_name.to_string(),
            type_name: extra_type.to_string(),
        });
    }
    outputs.push(QueryOutput {
        name: last.name.clone(),
        type_name: last_type,
    });

    Some(QueryTwice {
        count_name: count.name.clone(),
        count_type: count.type_name.clone(),
        outputs,
    })
}

/// Create/destroy detection: the last non-allocator parameter is the handle
pub fn detect_lifecycle(name: &str, params: &[MemberNode]) -> Option<LifecycleEntry> {
    let mut count = rules::DEFAULT_LIFECYCLE_COUNT.to_string();
    let mut handle: Option<&MemberNode> = None;

    for param in params {
        if rules::is_lifecycle_count(&param.name, &param.type_name) {
            count = param.name.clone();
        }
        if param.name == rules::ALLOCATOR_PARAM {
            continue;
        }
        handle = Some(param);
    }

    if let Some(nested) = rules::nested_lifecycle_count(name) {
        count = nested.to_string();
    }

    let handle = handle?;
    Some(LifecycleEntry {
        handle: handle.name.clone(),
        count,
        handle_type: handle.type_name.clone(),
    })
}

/// First parameter type in declaration order found in a scope set wins
pub fn chain_scope<'a>(param_types: impl IntoIterator<Item = &'a str>) -> ChainScope {
    for ty in param_types {
        if rules::INSTANCE_CHAIN_TYPES.contains(&ty) {
            return ChainScope::Instance;
        }
        if rules::DEVICE_CHAIN_TYPES.contains(&ty) {
            return ChainScope::Device;
        }
    }
    ChainScope::Global
}

fn sync_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_]\w*(?:\[\])?(?:(?:->|\.)[A-Za-z_]\w*(?:\[\])?)+$").expect("valid sync path regex")
    })
}

/// Split a sync path into its member segments.
///
/// Accepted forms are a direct member (`pInfo->buffer`) or an array
/// dereference followed by a member (`pBinds[].memory`), possibly nested.
/// Returns `None` for anything else.
pub fn parse_sync_path(path: &str) -> Option<Vec<String>> {
    if !sync_path_regex().is_match(path) {
        return None;
    }
    if !path.contains("->") && !path.contains("[].") {
        return None;
    }
    Some(
        path.replace("->", ".")
            .split('.')
            .map(|s| s.trim_end_matches("[]").to_string())
            .collect(),
    )
}

/// Extract the synchronization pairs contributed by one command
pub fn sync_annotations(command: &str, params: &[MemberNode], types: &TypeTables) -> Result<Vec<SyncAnnotation>> {
    let mut found = Vec::new();
    for param in params {
        let Some(value) = param.externsync.as_deref() else {
            continue;
        };
        match rules::classify_sync_value(value) {
            SyncValue::Whole => found.push(SyncAnnotation::new(command, &param.name)),
            SyncValue::Ambiguous | SyncValue::Unsynchronized => {}
            SyncValue::Paths(paths) => {
                for path in paths {
                    let segments = parse_sync_path(path).ok_or_else(|| RegistryError::UnparseableSyncPath {
                        command: command.to_string(),
                        param: param.name.clone(),
                        path: path.to_string(),
                    })?;
                    found.push(resolve_owner(&param.type_name, &segments, types));
                }
            }
        }
    }
    Ok(found)
}

/// Walk intermediate segments through struct members to find the structure
/// that owns the leaf. Unknown intermediates leave the last resolved owner.
fn resolve_owner(param_type: &str, segments: &[String], types: &TypeTables) -> SyncAnnotation {
    let mut owner = param_type.to_string();
    let (leaf, middle) = match segments.split_last() {
        Some((leaf, rest)) => (leaf.clone(), rest.get(1..).unwrap_or(&[])),
        None => (String::new(), &[][..]),
    };
    for segment in middle {
        match types.member(&owner, segment) {
            Some(member) => owner = member.type_name.clone(),
            None => break,
        }
    }
    SyncAnnotation::new(owner, leaf)
}

/// Every scope list entry must be unique across all three lists
fn check_scope_lists(tables: &CommandTables) -> Result<()> {
    let mut seen = HashSet::new();
    for name in tables
        .instance_chain_commands
        .iter()
        .chain(tables.device_chain_commands.iter())
        .chain(tables.special_commands.iter())
    {
        if !seen.insert(name.as_str()) {
            return Err(RegistryError::DuplicateScopedCommand { name: name.clone() });
        }
    }
    Ok(())
}
