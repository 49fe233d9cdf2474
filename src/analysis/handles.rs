//! Handle Hierarchy
//!
//! The handle parent map as a directed graph. Edges point from a child
//! handle to each of its parents (`VkFence -> VkDevice`), so a topological
//! order lists children before the objects that own them, which is the
//! order handles must be torn down in.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use petgraph::Direction;
use std::collections::HashMap;

use super::types::TypeTables;
use crate::error::{RegistryError, Result};

/// Parent graph over every classified handle
pub struct HandleHierarchy {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl HandleHierarchy {
    /// Build the graph from the type tables.
    ///
    /// Parents that were never classified as handles themselves (vendor-only,
    /// or declared in a section that did not apply) still appear as nodes.
    pub fn build(types: &TypeTables) -> Self {
        let mut graph = DiGraph::with_capacity(types.all_handles.len(), types.parents.len());
        let mut node_indices = HashMap::with_capacity(types.all_handles.len());

        for handle in &types.all_handles {
            let idx = graph.add_node(handle.clone());
            node_indices.insert(handle.clone(), idx);
        }

        for (child, parents) in &types.parents {
            let child_idx = *node_indices
                .entry(child.clone())
                .or_insert_with(|| graph.add_node(child.clone()));
            for parent in parents {
                let parent_idx = *node_indices
                    .entry(parent.clone())
                    .or_insert_with(|| graph.add_node(parent.clone()));
                graph.update_edge(child_idx, parent_idx, ());
            }
        }

        Self { graph, node_indices }
    }

    pub fn handle_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.node_indices.contains_key(handle)
    }

    /// Direct parents in declaration order
    pub fn parents(&self, handle: &str) -> Vec<&str> {
        self.neighbors(handle, Direction::Outgoing)
    }

    /// Handles that name `handle` as a parent
    pub fn children(&self, handle: &str) -> Vec<&str> {
        self.neighbors(handle, Direction::Incoming)
    }

    fn neighbors(&self, handle: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(handle) else {
            return Vec::new();
        };
        // petgraph yields the most recently added edge first
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        names.reverse();
        names
    }

    /// Every handle reachable through parent links, nearest first
    pub fn ancestors(&self, handle: &str) -> Vec<&str> {
        let Some(&start) = self.node_indices.get(handle) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                found.push(self.graph[idx].as_str());
            }
        }
        found
    }

    /// True if `ancestor` can be reached from `handle` through parent links
    pub fn descends_from(&self, handle: &str, ancestor: &str) -> bool {
        match (self.node_indices.get(handle), self.node_indices.get(ancestor)) {
            (Some(&from), Some(&to)) if from != to => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Children-before-parents order; fails if the parent links form a cycle
    pub fn teardown_order(&self) -> Result<Vec<&str>> {
        let order = toposort(&self.graph, None).map_err(|cycle| RegistryError::HandleCycle {
            name: self.graph[cycle.node_id()].clone(),
        })?;
        Ok(order.into_iter().map(|idx| self.graph[idx].as_str()).collect())
    }

    /// Handles with no parent (the roots of the object tree)
    pub fn roots(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors_directed(idx, Direction::Outgoing).next().is_none())
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn tables(edges: &[(&str, &[&str])]) -> TypeTables {
        let mut types = TypeTables::default();
        for (child, parents) in edges {
            types.all_handles.add(child.to_string());
            if !parents.is_empty() {
                types
                    .parents
                    .insert(child.to_string(), parents.iter().map(|p| p.to_string()).collect());
            }
        }
        types
    }

    fn vulkan_tree() -> TypeTables {
        tables(&[
            ("VkInstance", &[]),
            ("VkPhysicalDevice", &["VkInstance"]),
            ("VkDevice", &["VkPhysicalDevice"]),
            ("VkQueue", &["VkDevice"]),
            ("VkCommandPool", &["VkDevice"]),
            ("VkCommandBuffer", &["VkCommandPool"]),
            ("VkSwapchainKHR", &["VkSurfaceKHR", "VkDevice"]),
            ("VkSurfaceKHR", &["VkInstance"]),
        ])
    }

    #[test]
    fn test_ancestors() {
        let hierarchy = HandleHierarchy::build(&vulkan_tree());
        assert_eq!(
            hierarchy.ancestors("VkCommandBuffer"),
            vec!["VkCommandPool", "VkDevice", "VkPhysicalDevice", "VkInstance"]
        );
        assert!(hierarchy.descends_from("VkSwapchainKHR", "VkInstance"));
        assert!(!hierarchy.descends_from("VkInstance", "VkDevice"));
        assert!(hierarchy.ancestors("VkUnknown").is_empty());
    }

    #[test]
    fn test_ancestors_are_nearest_first() {
        let hierarchy = HandleHierarchy::build(&vulkan_tree());
        let ancestors = hierarchy.ancestors("VkSwapchainKHR");
        assert_eq!(ancestors.len(), 4);

        let direct: HashSet<&str> = ancestors[..2].iter().copied().collect();
        assert_eq!(direct, HashSet::from(["VkSurfaceKHR", "VkDevice"]));
        let distant: HashSet<&str> = ancestors[2..].iter().copied().collect();
        assert_eq!(distant, HashSet::from(["VkPhysicalDevice", "VkInstance"]));
    }

    #[test]
    fn test_parents_and_children() {
        let hierarchy = HandleHierarchy::build(&vulkan_tree());
        assert_eq!(hierarchy.parents("VkSwapchainKHR"), vec!["VkSurfaceKHR", "VkDevice"]);
        assert_eq!(hierarchy.children("VkDevice"), vec!["VkQueue", "VkCommandPool", "VkSwapchainKHR"]);
        assert_eq!(hierarchy.roots(), vec!["VkInstance"]);
    }

    #[test]
    fn test_teardown_order_children_first() {
        let hierarchy = HandleHierarchy::build(&vulkan_tree());
        let order = hierarchy.teardown_order().unwrap();
        let pos = |name: &str| order.iter().position(|h| *h == name).unwrap();
        assert_eq!(order.len(), 8);
        assert!(pos("VkCommandBuffer") < pos("VkCommandPool"));
        assert!(pos("VkCommandPool") < pos("VkDevice"));
        assert!(pos("VkSwapchainKHR") < pos("VkSurfaceKHR"));
        assert!(pos("VkDevice") < pos("VkInstance"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let hierarchy = HandleHierarchy::build(&tables(&[("VkA", &["VkB"]), ("VkB", &["VkA"])]));
        assert!(matches!(
            hierarchy.teardown_order(),
            Err(RegistryError::HandleCycle { .. })
        ));
    }

    #[test]
    fn test_unclassified_parent_becomes_node() {
        let hierarchy = HandleHierarchy::build(&tables(&[("VkFoo", &["VkVendorParentNV"])]));
        assert_eq!(hierarchy.handle_count(), 2);
        assert!(hierarchy.contains("VkVendorParentNV"));
    }
}
