//! Registry Analysis
//!
//! Single entry point that turns the registry documents into the immutable
//! table set consumed by code generators.
//!
//! ## Passes
//!
//! ```text
//! collect   -> valid commands/enums/types, disabled sets, platform guards
//! types     -> structures, handles, storage, member descriptors
//! commands  -> aliases, scopes, lifecycle, query-twice, synchronization
//! ```
//!
//! Each pass only reads the output of earlier passes. Any inconsistency in
//! the input aborts the whole run; no partial tables are returned.

pub mod collect;
pub mod commands;
pub mod handles;
pub mod params;
pub mod rules;
pub mod types;

use serde::Serialize;
use std::path::Path;

use crate::checksum::TableDigest;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::feature_detect::FeatureDetectList;
use crate::filter::VendorFilter;
use crate::ordered::OrderedMap;
use crate::registry::RegistryDocument;
use crate::version::ApiVersion;

pub use collect::SymbolSets;
pub use commands::{ChainScope, CommandTables, LifecycleEntry, QueryOutput, QueryTwice, SyncAnnotation};
pub use handles::HandleHierarchy;
pub use params::{Direction, LengthSpec, ParamDescriptor, PointerKind};
pub use types::TypeTables;

/// Knobs for one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// API name matched against `api` and `supported` attributes
    pub target_api: String,
    /// Vendor tags exempt from filtering
    pub allowed_tags: Vec<String>,
    /// Features numbered above this are skipped
    pub max_version: Option<ApiVersion>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            target_api: "vulkan".to_string(),
            allowed_tags: rules::ALWAYS_ALLOWED_TAGS.iter().map(|t| t.to_string()).collect(),
            max_version: None,
        }
    }
}

/// Every table derived from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryTables {
    pub target_api: String,
    pub symbols: SymbolSets,
    pub types: TypeTables,
    pub commands: CommandTables,
    /// Commands wrapped by a feature-detection check
    pub feature_detect_functions: FeatureDetectList,
    /// Owner -> non-`*Count` parameters that size other parameters
    pub other_counts: OrderedMap<String, Vec<String>>,
    /// Admitted indirect command -> struct read from its indirect buffer
    pub indirect_command_structs: OrderedMap<String, String>,
}

/// Run every pass over the primary document and the optional video document
pub fn analyze(
    primary: &RegistryDocument,
    secondary: Option<&RegistryDocument>,
    feature_detect: FeatureDetectList,
    options: &AnalysisOptions,
) -> Result<RegistryTables> {
    let docs: Vec<&RegistryDocument> = std::iter::once(primary).chain(secondary).collect();

    let filter = VendorFilter::new(
        docs.iter().flat_map(|d| d.tags.iter().cloned()),
        options.allowed_tags.iter().cloned(),
    );
    tracing::debug!(denied = ?filter.denied_tags(), "Vendor filter");

    let symbols = collect::collect_symbols(&docs, &filter, options)?;
    let types = types::classify_types(&docs, &symbols, &filter, options)?;
    let commands = commands::classify_commands(&docs, &symbols, &types, &filter, options)?;

    let other_counts = rules::OTHER_COUNTS
        .iter()
        .map(|(owner, params)| (owner.to_string(), params.iter().map(|p| p.to_string()).collect()))
        .collect();
    let indirect_command_structs = rules::INDIRECT_COMMAND_STRUCTS
        .iter()
        .filter(|(command, _)| commands.functions.contains(*command))
        .map(|(command, structure)| (command.to_string(), structure.to_string()))
        .collect();

    let tables = RegistryTables {
        target_api: options.target_api.clone(),
        symbols,
        types,
        commands,
        feature_detect_functions: feature_detect,
        other_counts,
        indirect_command_structs,
    };
    tables.report_curated_divergence();
    Ok(tables)
}

/// Load the documents named by `config` (relative to `base`) and analyze them
pub fn analyze_from_config(config: &AnalysisConfig, base: &Path) -> Result<RegistryTables> {
    let primary_path = config.resolve(&config.registry.primary, base);
    tracing::info!(path = %primary_path.display(), "Loading primary registry");
    let primary = RegistryDocument::from_path(&primary_path)?;

    let secondary_path = config.resolve(&config.registry.secondary, base);
    let secondary = if secondary_path.exists() {
        tracing::info!(path = %secondary_path.display(), "Loading video registry");
        Some(RegistryDocument::from_path(&secondary_path)?)
    } else {
        tracing::warn!(path = %secondary_path.display(), "Video registry not found, continuing without it");
        None
    };

    let feature_detect = match &config.registry.feature_detect {
        Some(path) => FeatureDetectList::from_path(config.resolve(path, base))?,
        None => FeatureDetectList::default(),
    };

    analyze(&primary, secondary.as_ref(), feature_detect, &config.options()?)
}

/// Table sizes for logs and the export summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub functions: usize,
    pub instance_chain: usize,
    pub device_chain: usize,
    pub special: usize,
    pub create: usize,
    pub destroy: usize,
    pub query_twice: usize,
    pub externally_synchronized: usize,
    pub structures: usize,
    pub extension_structs: usize,
    pub feature_structs: usize,
    pub handles: usize,
    pub aliases: usize,
    pub vendor_excluded: usize,
    pub disabled_extensions: usize,
}

impl RegistryTables {
    pub fn is_valid_function(&self, name: &str) -> bool {
        self.commands.functions.contains(name)
    }

    pub fn scope_of(&self, name: &str) -> Option<ChainScope> {
        self.commands.scope_of(name)
    }

    /// True if the command has a feature-detection wrapper
    pub fn has_feature_check(&self, command: &str) -> bool {
        self.feature_detect_functions.contains(command)
    }

    /// Parameters of `owner` that need a temporary count
    pub fn other_counts_for(&self, owner: &str) -> &[String] {
        self.other_counts.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Structure -> members needing external synchronization
    pub fn sync_members(&self, structure: &str) -> Option<impl Iterator<Item = &String>> {
        self.types.sync_members.get(structure).map(|m| m.iter())
    }

    pub fn handle_hierarchy(&self) -> HandleHierarchy {
        HandleHierarchy::build(&self.types)
    }

    /// Fingerprint of the serialized tables
    pub fn digest(&self) -> Result<TableDigest> {
        TableDigest::of(self)
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            functions: self.commands.functions.len(),
            instance_chain: self.commands.instance_chain_commands.len(),
            device_chain: self.commands.device_chain_commands.len(),
            special: self.commands.special_commands.len(),
            create: self.commands.functions_create.len(),
            destroy: self.commands.functions_destroy.len(),
            query_twice: self.commands.query_twice.len(),
            externally_synchronized: self.commands.externally_synchronized.len(),
            structures: self.types.structures.len(),
            extension_structs: self.types.extension_structs.len(),
            feature_structs: self.types.feature_structs.len(),
            handles: self.types.all_handles.len(),
            aliases: self.commands.function_aliases.len(),
            vendor_excluded: self.symbols.vendor_excluded.len(),
            disabled_extensions: self.symbols.disabled_extensions.len(),
        }
    }

    /// Warn about curated entries naming symbols the registry did not yield.
    /// The curated data is kept as-is; the warning is the only effect.
    fn report_curated_divergence(&self) {
        for (owner, _) in rules::SYNC_MEMBER_SEEDS {
            if !self.types.structures.contains(*owner) {
                tracing::warn!(owner, "Curated synchronization entry names no admitted structure");
            }
        }
        for (owner, _) in rules::OTHER_COUNTS {
            if !self.types.structures.contains(*owner) && !self.commands.functions.contains(*owner) {
                tracing::debug!(owner, "Curated count entry names no admitted symbol");
            }
        }
        for command in self.feature_detect_functions.iter() {
            if !self.is_valid_function(command) {
                tracing::warn!(%command, "Feature-detect wrapper for a command that is not admitted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<registry>
  <tags><tag name="NV"/></tags>
  <types>
    <type category="handle" name="VkInstance" objtypeenum="VK_OBJECT_TYPE_INSTANCE"><type>VK_DEFINE_HANDLE</type>(<name>VkInstance</name>)</type>
    <type category="handle" parent="VkInstance" name="VkPhysicalDevice"><type>VK_DEFINE_HANDLE</type>(<name>VkPhysicalDevice</name>)</type>
  </types>
  <commands>
    <command>
      <proto><type>VkResult</type> <name>vkEnumeratePhysicalDevices</name></proto>
      <param><type>VkInstance</type> <name>instance</name></param>
      <param optional="false,true"><type>uint32_t</type>* <name>pPhysicalDeviceCount</name></param>
      <param optional="true" len="pPhysicalDeviceCount"><type>VkPhysicalDevice</type>* <name>pPhysicalDevices</name></param>
    </command>
  </commands>
  <feature api="vulkan" name="VK_VERSION_1_0" number="1.0">
    <require><command name="vkEnumeratePhysicalDevices"/><type name="VkInstance"/></require>
  </feature>
</registry>"#;

    #[test]
    fn test_default_options() {
        let options = AnalysisOptions::default();
        assert_eq!(options.target_api, "vulkan");
        assert!(options.allowed_tags.contains(&"KHR".to_string()));
        assert!(options.max_version.is_none());
    }

    #[test]
    fn test_analyze_single_document() {
        let doc = RegistryDocument::parse(XML).unwrap();
        let header = "VkResult check_vkEnumeratePhysicalDevices(VkInstance instance, uint32_t* pPhysicalDeviceCount, VkPhysicalDevice* pPhysicalDevices);";
        let tables = analyze(&doc, None, FeatureDetectList::parse(header), &AnalysisOptions::default()).unwrap();

        assert!(tables.is_valid_function("vkEnumeratePhysicalDevices"));
        assert_eq!(tables.scope_of("vkEnumeratePhysicalDevices"), Some(ChainScope::Instance));
        assert!(tables.has_feature_check("vkEnumeratePhysicalDevices"));
        assert!(tables.commands.query_twice.contains_key("vkEnumeratePhysicalDevices"));
        assert_eq!(tables.handle_hierarchy().ancestors("VkPhysicalDevice"), vec!["VkInstance"]);
        assert_eq!(tables.summary().functions, 1);
        assert_eq!(tables.other_counts_for("vkCreateShaderModule"), &["codeSize".to_string()]);
        assert!(tables.other_counts_for("vkQueueSubmit").is_empty());
        assert!(tables.indirect_command_structs.is_empty());
    }

    #[test]
    fn test_repeated_runs_are_independent() {
        let doc = RegistryDocument::parse(XML).unwrap();
        let options = AnalysisOptions::default();
        let first = analyze(&doc, None, FeatureDetectList::default(), &options).unwrap();
        let second = analyze(&doc, None, FeatureDetectList::default(), &options).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    }
}
