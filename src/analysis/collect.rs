//! Symbol Collection
//!
//! First pass over the registry: walks the require blocks of enabled
//! extensions (both documents), then of enabled features (both documents), and
//! builds the monotone sets of valid commands, enums and types. Disabled
//! extensions only contribute to the disabled sets. Platform guards are
//! recorded here too since they hang off the same extension nodes.

use serde::Serialize;

use super::AnalysisOptions;
use crate::error::{RegistryError, Result};
use crate::filter::VendorFilter;
use crate::ordered::{OrderedMap, OrderedSet};
use crate::registry::{applies_to, RegistryDocument, RequireBlock, SupportState};
use crate::version::ApiVersion;

/// Output of the collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolSets {
    pub valid_functions: OrderedSet<String>,
    pub valid_enums: OrderedSet<String>,
    pub valid_types: OrderedSet<String>,
    /// Commands required by `supported="disabled"` extensions
    pub disabled_functions: OrderedSet<String>,
    pub disabled_extensions: OrderedSet<String>,
    /// Reachable names dropped by the vendor filter
    pub vendor_excluded: OrderedSet<String>,
    /// Platform name -> guard macro
    pub platforms: OrderedMap<String, String>,
    /// Command -> guard macro of its extension's platform
    pub protected_functions: OrderedMap<String, String>,
    /// Type -> guard macro of its extension's platform
    pub protected_types: OrderedMap<String, String>,
}

struct Collector<'a> {
    filter: &'a VendorFilter,
    options: &'a AnalysisOptions,
    sets: SymbolSets,
}

/// Run the collection pass over both documents
pub fn collect_symbols(
    docs: &[&RegistryDocument],
    filter: &VendorFilter,
    options: &AnalysisOptions,
) -> Result<SymbolSets> {
    let mut collector = Collector {
        filter,
        options,
        sets: SymbolSets::default(),
    };

    for doc in docs {
        for platform in &doc.platforms {
            collector
                .sets
                .platforms
                .entry(platform.name.clone())
                .or_insert_with(|| platform.protect.clone());
        }
    }

    for doc in docs {
        collector.scan_extensions(doc)?;
    }
    for doc in docs {
        collector.scan_features(doc)?;
    }

    let sets = collector.sets;
    tracing::info!(
        functions = sets.valid_functions.len(),
        enums = sets.valid_enums.len(),
        types = sets.valid_types.len(),
        disabled = sets.disabled_extensions.len(),
        vendor_excluded = sets.vendor_excluded.len(),
        "Collected valid symbols"
    );
    Ok(sets)
}

impl Collector<'_> {
    fn target(&self) -> &str {
        &self.options.target_api
    }

    fn scan_extensions(&mut self, doc: &RegistryDocument) -> Result<()> {
        for ext in &doc.extensions {
            match ext.support(self.target()) {
                SupportState::Disabled => {
                    for command in ext.all_commands() {
                        self.sets.disabled_functions.add(command.to_string());
                    }
                    self.sets.disabled_extensions.add(ext.name.clone());
                }
                SupportState::Enabled => {
                    for req in &ext.requires {
                        self.scan_require(req);
                    }
                }
                SupportState::OtherApi(_) => {
                    tracing::debug!(extension = %ext.name, "Skipping extension for other API");
                }
            }

            if let Some(platform) = &ext.platform {
                let guard = self
                    .sets
                    .platforms
                    .get(platform)
                    .cloned()
                    .ok_or_else(|| RegistryError::UnknownPlatform {
                        extension: ext.name.clone(),
                        platform: platform.clone(),
                    })?;
                for command in ext.all_commands() {
                    self.sets
                        .protected_functions
                        .insert(command.to_string(), guard.clone());
                }
                for ty in ext.all_types() {
                    self.sets.protected_types.insert(ty.to_string(), guard.clone());
                }
            }
        }
        Ok(())
    }

    fn scan_features(&mut self, doc: &RegistryDocument) -> Result<()> {
        for feature in &doc.features {
            if !applies_to(feature.api.as_ref(), self.target()) {
                continue;
            }
            if let (Some(max), Some(number)) = (&self.options.max_version, &feature.number) {
                let version = ApiVersion::parse(number)?;
                if !version.within(Some(max)) {
                    tracing::debug!(feature = %feature.name, %version, "Feature above version ceiling");
                    continue;
                }
            }
            for req in &feature.requires {
                self.scan_require(req);
            }
        }
        Ok(())
    }

    fn scan_require(&mut self, req: &RequireBlock) {
        if !applies_to(req.api.as_ref(), &self.options.target_api) {
            return;
        }
        for name in &req.commands {
            admit(self.filter, &mut self.sets.valid_functions, &mut self.sets.vendor_excluded, name);
        }
        for name in &req.enums {
            admit(self.filter, &mut self.sets.valid_enums, &mut self.sets.vendor_excluded, name);
        }
        for name in &req.types {
            admit(self.filter, &mut self.sets.valid_types, &mut self.sets.vendor_excluded, name);
        }
    }
}

fn admit(
    filter: &VendorFilter,
    set: &mut OrderedSet<String>,
    excluded: &mut OrderedSet<String>,
    name: &str,
) {
    if set.contains(name) {
        return;
    }
    if filter.is_vendor_only(name) {
        excluded.add(name.to_string());
    } else {
        set.add(name.to_string());
    }
}
