//! Classification Rule Tables
//!
//! Name-based heuristics and their curated exceptions. Each rule is a constant
//! table plus a small predicate so that every carve-out can be tested on its
//! own, away from the traversal code that applies it.

// =============================================================================
// Chain scope
// =============================================================================

/// Parameter types that put a command on the instance chain
pub const INSTANCE_CHAIN_TYPES: &[&str] = &["VkInstance", "VkPhysicalDevice"];

/// Parameter types that put a command on the device chain
pub const DEVICE_CHAIN_TYPES: &[&str] = &["VkDevice", "VkQueue", "VkCommandBuffer"];

// =============================================================================
// Vendor tags
// =============================================================================

/// Tags whose symbols are kept even though the registry lists them as tags
pub const ALWAYS_ALLOWED_TAGS: &[&str] = &["KHR", "EXT", "ANDROID", "GOOGLE", "ARM"];

// =============================================================================
// Structures
// =============================================================================

/// Marker identifying the member value that carries a structure type tag
pub const STRUCTURE_TYPE_MARKER: &str = "VK_STRUCTURE_TYPE";

/// Generic chain headers; never classified as structures
pub const SENTINEL_STRUCTS: &[&str] = &["VkBaseOutStructure", "VkBaseInStructure"];

/// Video std structs made of packed bitfields, which cannot be walked member by member
pub const PACKED_BITFIELD_STRUCTS: &[&str] = &[
    "StdVideoAV1ColorConfigFlags",
    "StdVideoAV1TimingInfoFlags",
    "StdVideoAV1LoopFilterFlags",
    "StdVideoAV1QuantizationFlags",
    "StdVideoAV1TileInfoFlags",
    "StdVideoAV1FilmGrainFlvags",
    "StdVideoAV1SequenceHeaderFlags",
    "StdVideoDecodeAV1PictureInfoFlags",
    "StdVideoDecodeAV1ReferenceInfoFlags",
    "StdVideoDecodeH264PictureInfoFlags",
    "StdVideoDecodeH264ReferenceInfoFlags",
    "StdVideoDecodeH265PictureInfoFlags",
    "StdVideoDecodeH265ReferenceInfoFlags",
    "StdVideoEncodeH265SliceSegmentHeaderFlags",
    "StdVideoEncodeH265PictureInfoFlags",
    "StdVideoEncodeH265ReferenceInfoFlags",
];

/// Substring marking a feature-toggle structure
pub const FEATURE_STRUCT_MARKER: &str = "Features";

/// Structures named like feature structs that are not pNext feature toggles
pub const FEATURE_STRUCT_EXCLUSIONS: &[&str] = &[
    "VkPhysicalDeviceFeatures2",
    "VkPhysicalDeviceFeatures",
    "VkValidationFeaturesEXT",
];

pub fn is_sentinel_struct(name: &str) -> bool {
    SENTINEL_STRUCTS.contains(&name)
}

pub fn is_packed_bitfield(name: &str) -> bool {
    PACKED_BITFIELD_STRUCTS.contains(&name)
}

/// Feature-struct rule: name contains the marker, the node is not an alias,
/// and the name is not excluded
pub fn is_feature_struct(name: &str, is_alias: bool) -> bool {
    name.contains(FEATURE_STRUCT_MARKER) && !is_alias && !FEATURE_STRUCT_EXCLUSIONS.contains(&name)
}

pub fn is_structure_type_value(values: &str) -> bool {
    values.contains(STRUCTURE_TYPE_MARKER)
}

// =============================================================================
// External synchronization
// =============================================================================

/// Struct members that need external synchronization but that the registry
/// cannot express with `externsync`
pub const SYNC_MEMBER_SEEDS: &[(&str, &[&str])] = &[
    ("VkDescriptorSetAllocateInfo", &["descriptorPool"]),
    ("VkCommandBufferAllocateInfo", &["commandPool"]),
    ("VkSwapchainCreateInfoKHR", &["surface", "oldSwapchain"]),
    ("VkDebugMarkerObjectTagInfoEXT", &["object"]),
    ("VkDebugMarkerObjectNameInfoEXT", &["object"]),
    ("VkDebugUtilsObjectNameInfoEXT", &["objectHandle"]),
    ("vkSetDebugUtilsObjectTagEXT", &["objectHandle"]),
];

/// How an `externsync` attribute value is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncValue<'a> {
    /// `true`: the parameter itself
    Whole,
    /// `maybe`: ambiguous, intentionally not recorded
    Ambiguous,
    /// `false`: explicitly unsynchronized
    Unsynchronized,
    /// Comma-separated path expressions into the parameter
    Paths(Vec<&'a str>),
}

pub fn classify_sync_value(value: &str) -> SyncValue<'_> {
    match value {
        "true" => SyncValue::Whole,
        "maybe" => SyncValue::Ambiguous,
        "false" => SyncValue::Unsynchronized,
        paths => SyncValue::Paths(paths.split(',').map(str::trim).collect()),
    }
}

// =============================================================================
// Storage representation
// =============================================================================

/// Fixed storage types for scalar names; extended from the registry during analysis
pub const STORAGE_SEEDS: &[(&str, &str)] = &[
    ("char", "uint8_t"),
    ("int", "int32_t"),
    ("long", "int64_t"),
    ("size_t", "uint64_t"),
    ("VkFlags", "uint32_t"),
    ("VkFlags64", "uint64_t"),
    ("void", "uint8_t"),
    ("xcb_visualid_t", "uint32_t"),
];

/// Storage type of every enum
pub const ENUM_STORAGE: &str = "uint32_t";

/// Storage type of a bitmask given its flag word, or `None` for an unknown width
pub fn bitmask_storage(flag_word: &str) -> Option<&'static str> {
    match flag_word {
        "VkFlags64" => Some("uint64_t"),
        "VkFlags" => Some("uint32_t"),
        _ => None,
    }
}

// =============================================================================
// Counts
// =============================================================================

/// Substrings marking a parameter as carrying an element count or byte size
pub const COUNT_NAME_MARKERS: &[&str] = &["Count", "Size"];

/// Count types accepted by the query-twice rule
pub const QUERY_COUNT_TYPES: &[&str] = &["uint32_t", "size_t"];

/// Count type accepted by the create/destroy rule
pub const LIFECYCLE_COUNT_TYPE: &str = "uint32_t";

/// Count used when a lifecycle command has no count parameter
pub const DEFAULT_LIFECYCLE_COUNT: &str = "1";

/// Parameters not named `*Count` that still size other parameters and need
/// temporaries, keyed by owning command or struct
pub const OTHER_COUNTS: &[(&str, &[&str])] = &[
    ("VkPipelineShaderStageModuleIdentifierCreateInfoEXT", &["identifierSize"]),
    ("VkPushConstantsInfoKHR", &["size"]),
    ("VkShaderModuleIdentifierEXT", &["identifierSize"]),
    ("vkCreateRayTracingPipelinesKHR", &["dataSize"]),
    ("vkGetPipelineExecutableInternalRepresentationsKHR", &["dataSize"]),
    ("vkCreateGraphicsPipelines", &["rasterizationSamples", "dataSize", "pRasterizationState"]),
    ("vkCreateComputePipelines", &["dataSize"]),
    ("vkUpdateDescriptorSets", &["dataSize", "descriptorType"]),
    ("vkCmdPushDescriptorSetKHR", &["dataSize", "descriptorType"]),
    ("vkSetDebugUtilsObjectTagEXT", &["tagSize"]),
    ("vkCreateShaderModule", &["codeSize"]),
    ("vkCreateValidationCacheEXT", &["initialDataSize"]),
    ("vkDebugMarkerSetObjectTagEXT", &["tagSize"]),
    ("vkCreatePipelineCache", &["initialDataSize"]),
];

/// Command struct read from the indirect buffer of each indirect draw/dispatch
pub const INDIRECT_COMMAND_STRUCTS: &[(&str, &str)] = &[
    ("vkCmdDispatchIndirect", "VkDispatchIndirectCommand"),
    ("vkCmdDrawIndirect", "VkDrawIndirectCommand"),
    ("vkCmdDrawIndexedIndirect", "VkDrawIndexedIndirectCommand"),
    ("vkCmdDrawMeshTasksIndirectEXT", "VkDrawMeshTasksIndirectCommandEXT"),
    ("vkCmdDrawIndirectCount", "VkDrawIndirectCommand"),
    ("vkCmdDrawIndirectCountAMD", "VkDrawIndirectCommand"),
    ("vkCmdDrawIndexedIndirectCount", "VkDrawIndexedIndirectCommand"),
    ("vkCmdDrawIndexedIndirectCountAMD", "VkDrawIndexedIndirectCommand"),
];

pub fn is_count_name(name: &str) -> bool {
    COUNT_NAME_MARKERS.iter().any(|m| name.contains(m))
}

// =============================================================================
// Query-twice
// =============================================================================

/// Command name markers for the query-twice pattern
pub const QUERY_MARKERS: &[&str] = &["vkGet", "vkEnum"];

/// The one query with two paired outputs: (command, extra output name, extra output type)
pub const DOUBLE_OUTPUT_QUERY: (&str, &str, &str) = (
    "vkEnumeratePhysicalDeviceQueueFamilyPerformanceQueryCountersKHR",
    "pCounters",
    "VkPerformanceCounterKHR",
);

pub fn is_query_command(name: &str) -> bool {
    QUERY_MARKERS.iter().any(|m| name.contains(m))
}

/// Candidate count parameter of a query-twice command
pub fn is_query_count(name: &str, type_name: &str) -> bool {
    is_count_name(name) && QUERY_COUNT_TYPES.contains(&type_name)
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Role a command plays in an object's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleRole {
    Create,
    Destroy,
}

pub const CREATE_MARKERS: &[&str] = &["vkCreate", "vkAllocate"];
pub const DESTROY_MARKERS: &[&str] = &["vkFree", "vkDestroy"];

/// Parameter never treated as the created/destroyed object
pub const ALLOCATOR_PARAM: &str = "pAllocator";

/// Lifecycle commands whose count lives inside a create-info struct
pub const NESTED_LIFECYCLE_COUNTS: &[(&str, &str)] = &[
    ("vkAllocateDescriptorSets", "descriptorSetCount"),
    ("vkAllocateCommandBuffers", "commandBufferCount"),
];

/// Destroy markers win over create markers
pub fn lifecycle_role(name: &str) -> Option<LifecycleRole> {
    if DESTROY_MARKERS.iter().any(|m| name.contains(m)) {
        Some(LifecycleRole::Destroy)
    } else if CREATE_MARKERS.iter().any(|m| name.contains(m)) {
        Some(LifecycleRole::Create)
    } else {
        None
    }
}

pub fn nested_lifecycle_count(command: &str) -> Option<&'static str> {
    NESTED_LIFECYCLE_COUNTS
        .iter()
        .find(|(c, _)| *c == command)
        .map(|(_, count)| *count)
}

pub fn is_lifecycle_count(name: &str, type_name: &str) -> bool {
    is_count_name(name) && type_name == LIFECYCLE_COUNT_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_struct_rule() {
        assert!(is_feature_struct("VkPhysicalDeviceVulkan12Features", false));
        assert!(!is_feature_struct("VkPhysicalDeviceVulkan12Features", true));
        assert!(!is_feature_struct("VkPhysicalDeviceFeatures2", false));
        assert!(!is_feature_struct("VkValidationFeaturesEXT", false));
        assert!(!is_feature_struct("VkPhysicalDeviceProperties", false));
    }

    #[test]
    fn test_struct_exception_lists() {
        assert!(is_sentinel_struct("VkBaseInStructure"));
        assert!(!is_sentinel_struct("VkApplicationInfo"));
        assert!(is_packed_bitfield("StdVideoDecodeH264PictureInfoFlags"));
        assert!(!is_packed_bitfield("StdVideoDecodeH264PictureInfo"));
    }

    #[test]
    fn test_sync_values() {
        assert_eq!(classify_sync_value("true"), SyncValue::Whole);
        assert_eq!(classify_sync_value("maybe"), SyncValue::Ambiguous);
        assert_eq!(classify_sync_value("false"), SyncValue::Unsynchronized);
        assert_eq!(
            classify_sync_value("pInfo->buffer, pBinds[].memory"),
            SyncValue::Paths(vec!["pInfo->buffer", "pBinds[].memory"])
        );
    }

    #[test]
    fn test_bitmask_storage() {
        assert_eq!(bitmask_storage("VkFlags"), Some("uint32_t"));
        assert_eq!(bitmask_storage("VkFlags64"), Some("uint64_t"));
        assert_eq!(bitmask_storage("uint16_t"), None);
    }

    #[test]
    fn test_count_rules() {
        assert!(is_query_count("pPropertyCount", "uint32_t"));
        assert!(is_query_count("pDataSize", "size_t"));
        assert!(!is_query_count("pPropertyCount", "uint64_t"));
        assert!(!is_query_count("pProperties", "uint32_t"));

        assert!(is_lifecycle_count("commandBufferCount", "uint32_t"));
        assert!(!is_lifecycle_count("initialDataSize", "size_t"));
    }

    #[test]
    fn test_command_markers() {
        assert!(is_query_command("vkGetPhysicalDeviceQueueFamilyProperties"));
        assert!(is_query_command("vkEnumeratePhysicalDevices"));
        assert!(!is_query_command("vkQueueSubmit"));

        assert_eq!(lifecycle_role("vkCreateBuffer"), Some(LifecycleRole::Create));
        assert_eq!(lifecycle_role("vkAllocateMemory"), Some(LifecycleRole::Create));
        assert_eq!(lifecycle_role("vkFreeCommandBuffers"), Some(LifecycleRole::Destroy));
        assert_eq!(lifecycle_role("vkDestroyBuffer"), Some(LifecycleRole::Destroy));
        assert_eq!(lifecycle_role("vkCmdDraw"), None);
    }

    #[test]
    fn test_nested_lifecycle_counts() {
        assert_eq!(nested_lifecycle_count("vkAllocateDescriptorSets"), Some("descriptorSetCount"));
        assert_eq!(nested_lifecycle_count("vkAllocateCommandBuffers"), Some("commandBufferCount"));
        assert_eq!(nested_lifecycle_count("vkAllocateMemory"), None);
    }
}
