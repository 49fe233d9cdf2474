//! Type Classification
//!
//! Second pass: walks the `<types>` section of both documents and builds the
//! per-category cross-reference tables. Structures and handles are only
//! classified when they survive the vendor filter; structures must also have
//! been admitted by the collector.
//!
//! Member descriptors are built afterwards, once every struct and handle name
//! is known, so a member can reference a type declared later in the document.

use serde::Serialize;

use super::collect::SymbolSets;
use super::params::{describe, ParamDescriptor, TypeLookup};
use super::rules;
use super::AnalysisOptions;
use crate::error::{RegistryError, Result};
use crate::filter::VendorFilter;
use crate::ordered::{OrderedMap, OrderedSet};
use crate::registry::{applies_to, HandleKind, MemberNode, RegistryDocument, TypeCategory, TypeNode};

/// Output of the type pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTables {
    /// Every admitted structure, alias-form nodes included
    pub structures: OrderedSet<String>,
    /// Structure -> structure type tag
    pub type_to_stype: OrderedMap<String, String>,
    /// Structure type tag -> structure
    pub stype_to_type: OrderedMap<String, String>,
    pub feature_structs: OrderedSet<String>,
    /// Structures that can be chained onto a base structure
    pub extension_structs: OrderedSet<String>,
    /// Structure -> members requiring external synchronization
    pub sync_members: OrderedMap<String, OrderedSet<String>>,
    /// Handle -> parent handles
    pub parents: OrderedMap<String, Vec<String>>,
    pub dispatchable_handles: OrderedSet<String>,
    pub non_dispatchable_handles: OrderedSet<String>,
    pub all_handles: OrderedSet<String>,
    /// Type name -> storage representation
    pub storage: OrderedMap<String, String>,
    /// Structure -> member descriptors
    pub struct_members: OrderedMap<String, Vec<ParamDescriptor>>,
}

impl TypeLookup for TypeTables {
    fn is_struct(&self, name: &str) -> bool {
        self.structures.contains(name)
    }

    fn handle_kind(&self, name: &str) -> Option<HandleKind> {
        if self.dispatchable_handles.contains(name) {
            Some(HandleKind::Dispatchable)
        } else if self.non_dispatchable_handles.contains(name) {
            Some(HandleKind::NonDispatchable)
        } else {
            None
        }
    }
}

impl TypeTables {
    /// Find a member descriptor of an admitted structure
    pub fn member(&self, structure: &str, member: &str) -> Option<&ParamDescriptor> {
        self.struct_members
            .get(structure)
            .and_then(|members| members.iter().find(|m| m.name == member))
    }
}

struct TypeClassifier<'a> {
    symbols: &'a SymbolSets,
    filter: &'a VendorFilter,
    tables: TypeTables,
    /// Structures whose members still need descriptors
    pending_members: Vec<(String, Vec<MemberNode>)>,
}

/// Run the type pass over both documents
pub fn classify_types(
    docs: &[&RegistryDocument],
    symbols: &SymbolSets,
    filter: &VendorFilter,
    options: &AnalysisOptions,
) -> Result<TypeTables> {
    let mut classifier = TypeClassifier {
        symbols,
        filter,
        tables: seeded_tables(),
        pending_members: Vec::new(),
    };

    for doc in docs {
        for node in &doc.types {
            if !applies_to(node.api.as_ref(), &options.target_api) {
                continue;
            }
            classifier.classify(node, &options.target_api)?;
        }
    }

    let TypeClassifier {
        mut tables,
        pending_members,
        ..
    } = classifier;

    for (name, members) in pending_members {
        let descriptors = members.iter().map(|m| describe(m, false, &tables)).collect();
        tables.struct_members.insert(name, descriptors);
    }

    tracing::info!(
        structures = tables.structures.len(),
        handles = tables.all_handles.len(),
        feature_structs = tables.feature_structs.len(),
        extension_structs = tables.extension_structs.len(),
        "Classified types"
    );
    Ok(tables)
}

fn seeded_tables() -> TypeTables {
    let mut tables = TypeTables::default();
    for (name, storage) in rules::STORAGE_SEEDS {
        tables.storage.insert(name.to_string(), storage.to_string());
    }
    for (owner, members) in rules::SYNC_MEMBER_SEEDS {
        tables.sync_members.insert(
            owner.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }
    tables
}

impl TypeClassifier<'_> {
    fn classify(&mut self, node: &TypeNode, target_api: &str) -> Result<()> {
        match &node.category {
            TypeCategory::Struct { members, extends } => {
                let members: Vec<MemberNode> = members
                    .iter()
                    .filter(|m| applies_to(m.api.as_ref(), target_api))
                    .cloned()
                    .collect();
                self.classify_struct(node, members, extends)
            }
            TypeCategory::Handle { parents, kind } => {
                self.classify_handle(node, parents, *kind);
                Ok(())
            }
            TypeCategory::Enum => {
                self.tables
                    .storage
                    .insert(node.name.clone(), rules::ENUM_STORAGE.to_string());
                Ok(())
            }
            TypeCategory::BaseType { underlying } => {
                if let Some(underlying) = underlying {
                    self.tables
                        .storage
                        .insert(node.name.clone(), underlying.clone());
                }
                Ok(())
            }
            TypeCategory::Bitmask { underlying } => self.classify_bitmask(node, underlying.as_deref()),
            TypeCategory::Other(_) => Ok(()),
        }
    }

    fn classify_struct(&mut self, node: &TypeNode, members: Vec<MemberNode>, extends: &[String]) -> Result<()> {
        let name = &node.name;
        let stype = members
            .iter()
            .filter_map(|m| m.values.as_deref())
            .find(|v| rules::is_structure_type_value(v))
            .map(str::to_string);

        if self.filter.is_vendor_only_opt(stype.as_deref()) || !self.symbols.valid_types.contains(name) {
            return Ok(());
        }

        if let Some(stype) = &stype {
            self.tables.type_to_stype.insert(name.clone(), stype.clone());
            self.tables.stype_to_type.insert(stype.clone(), name.clone());
        }

        if rules::is_sentinel_struct(name) || rules::is_packed_bitfield(name) {
            return Ok(());
        }

        self.tables.structures.add(name.clone());

        for member in &members {
            let Some(value) = member.externsync.as_deref() else {
                continue;
            };
            if value == "false" {
                continue;
            }
            self.tables
                .sync_members
                .entry(name.clone())
                .or_default()
                .add(member.name.clone());
        }

        if rules::is_feature_struct(name, node.is_alias()) {
            self.tables.feature_structs.add(name.clone());
        }

        if !node.is_alias() {
            self.pending_members.push((name.clone(), members));
        }

        if self.symbols.protected_types.contains_key(name) || extends.is_empty() {
            return Ok(());
        }

        if stype.is_none() {
            return Err(RegistryError::StructExtendsWithoutTag {
                name: name.clone(),
                extends: extends.join(","),
            });
        }
        if self.filter.is_vendor_only(name) || extends.iter().any(|e| self.filter.is_vendor_only(e)) {
            tracing::debug!(structure = %name, "Dropping vendor extension structure");
            return Ok(());
        }
        self.tables.extension_structs.add(name.clone());
        Ok(())
    }

    fn classify_handle(&mut self, node: &TypeNode, parents: &[String], kind: Option<HandleKind>) {
        // Alias-form handles carry no data of their own
        if node.is_alias() {
            return;
        }
        let name = &node.name;
        if self.filter.is_vendor_only(name) {
            return;
        }
        if !parents.is_empty() {
            self.tables
                .parents
                .entry(name.clone())
                .or_default()
                .extend(parents.iter().cloned());
        }
        match kind.unwrap_or(HandleKind::NonDispatchable) {
            HandleKind::Dispatchable => self.tables.dispatchable_handles.add(name.clone()),
            HandleKind::NonDispatchable => self.tables.non_dispatchable_handles.add(name.clone()),
        };
        self.tables.all_handles.add(name.clone());
    }

    fn classify_bitmask(&mut self, node: &TypeNode, underlying: Option<&str>) -> Result<()> {
        let name = &node.name;
        if let Some(target) = &node.alias {
            let storage = self.tables.storage.get(target).cloned().ok_or_else(|| {
                RegistryError::UnresolvedBitmaskAlias {
                    name: name.clone(),
                    target: target.clone(),
                }
            })?;
            self.tables.storage.insert(name.clone(), storage);
            return Ok(());
        }

        let flag_word = underlying.unwrap_or("");
        let storage = rules::bitmask_storage(flag_word).ok_or_else(|| RegistryError::UnknownBitmaskStorage {
            name: name.clone(),
            storage: flag_word.to_string(),
        })?;
        self.tables.storage.insert(name.clone(), storage.to_string());
        Ok(())
    }
}
