//! Feature-detection function list
//!
//! The feature-detect header declares one `check_<command>(...)` wrapper per
//! command whose arguments can enable optional device features. Only the set
//! of wrapped command names is used here.

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::Result;
use crate::ordered::OrderedSet;

const CHECK_PREFIX: &str = "check_";

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bcheck_(vk\w+)\s*\(").expect("valid check declaration regex"))
}

/// Commands with a feature-detection wrapper, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureDetectList {
    functions: OrderedSet<String>,
}

impl FeatureDetectList {
    /// Scan header text for `check_vk*(` declarations.
    ///
    /// Comment lines are skipped so prose mentioning a wrapper does not count.
    pub fn parse(header: &str) -> Self {
        let mut functions = OrderedSet::new();
        for line in header.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*") {
                continue;
            }
            for caps in declaration_regex().captures_iter(line) {
                functions.add(caps[1].to_string());
            }
        }
        tracing::debug!(count = functions.len(), "Parsed feature-detect declarations");
        Self { functions }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&content))
    }

    pub fn contains(&self, command: &str) -> bool {
        self.functions.contains(command)
    }

    /// Wrapper name for a command, if one is declared
    pub fn wrapper_name(&self, command: &str) -> Option<String> {
        self.contains(command).then(|| format!("{}{}", CHECK_PREFIX, command))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.functions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"
#pragma once
// These check_* functions have identical function definition as their Vulkan equivalent.
// check_vkNotADeclaration( is mentioned here only in prose
VkResult check_vkCreateShaderModule(VkDevice device, const VkShaderModuleCreateInfo* pCreateInfo, const VkAllocationCallbacks* pAllocator, VkShaderModule* pShaderModule);
VkResult check_vkCreateDevice(VkPhysicalDevice physicalDevice, const VkDeviceCreateInfo* pCreateInfo, const VkAllocationCallbacks* pAllocator, VkDevice* pDevice);
void check_vkCmdDraw (VkCommandBuffer commandBuffer, uint32_t vertexCount);
VkResult check_vkCreateDevice(VkPhysicalDevice physicalDevice, const VkDeviceCreateInfo* pCreateInfo, const VkAllocationCallbacks* pAllocator, VkDevice* pDevice);
void uncheck_vkFoo(void);
"#;

    #[test]
    fn test_parse_declarations_in_order() {
        let list = FeatureDetectList::parse(HEADER);
        let names: Vec<_> = list.iter().cloned().collect();
        assert_eq!(names, vec!["vkCreateShaderModule", "vkCreateDevice", "vkCmdDraw"]);
        assert!(!list.contains("vkNotADeclaration"));
        assert!(!list.contains("vkFoo"));
    }

    #[test]
    fn test_wrapper_name() {
        let list = FeatureDetectList::parse(HEADER);
        assert_eq!(list.wrapper_name("vkCmdDraw").as_deref(), Some("check_vkCmdDraw"));
        assert_eq!(list.wrapper_name("vkQueueSubmit"), None);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feature_detect.h");
        std::fs::write(&path, HEADER).unwrap();
        let list = FeatureDetectList::from_path(&path).unwrap();
        assert_eq!(list.len(), 3);
        assert!(FeatureDetectList::from_path(dir.path().join("missing.h")).is_err());
    }
}
