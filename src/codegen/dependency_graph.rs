//! Inheritance graph for class processing order
//!
//! Builds a directed acyclic graph (DAG) from class descriptions, where a
//! class depends on the generated class it extends, and computes the
//! topological processing order.

use crate::codegen::types::ClassDescription;
use crate::schema::SchemaError;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub class: String,
    pub depends_on: Vec<String>,
    pub level: usize,
}

#[derive(Debug)]
pub struct DependencyGraph {
    pub nodes: HashMap<String, DependencyNode>,
    pub levels: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Build the inheritance graph; unknown parents and cycles are schema errors
    pub fn build(classes: &[ClassDescription]) -> Result<Self, SchemaError> {
        let mut nodes = HashMap::new();

        for class in classes {
            let mut depends_on = Vec::new();
            if let Some(parent) = class.parent() {
                if !classes.iter().any(|c| c.name == parent) {
                    return Err(SchemaError::UnknownSuperclass {
                        class: class.name.clone(),
                        parent: parent.to_string(),
                    });
                }
                depends_on.push(parent.to_string());
            }

            nodes.insert(
                class.name.clone(),
                DependencyNode {
                    class: class.name.clone(),
                    depends_on,
                    level: 0, // Will be computed
                },
            );
        }

        let levels = Self::compute_levels(&nodes).map_err(|unprocessed| {
            SchemaError::InheritanceCycle(unprocessed.into_iter().next().unwrap_or_default())
        })?;

        for (level_num, level_classes) in levels.iter().enumerate() {
            for class_name in level_classes {
                if let Some(node) = nodes.get_mut(class_name) {
                    node.level = level_num;
                }
            }
        }

        Ok(DependencyGraph { nodes, levels })
    }

    /// Compute processing levels using topological sort (Kahn's algorithm).
    /// Classes within a level are sorted by name. On a cycle, returns the
    /// classes that could not be ordered.
    fn compute_levels(nodes: &HashMap<String, DependencyNode>) -> Result<Vec<Vec<String>>, Vec<String>> {
        // Build reverse dependency map (who depends on this class)
        let mut reverse_deps: HashMap<String, Vec<String>> = HashMap::new();
        let mut in_degree: HashMap<String, usize> = HashMap::new();

        for (class_name, node) in nodes {
            let valid_deps: Vec<&String> = node
                .depends_on
                .iter()
                .filter(|dep| nodes.contains_key(*dep))
                .collect();

            in_degree.insert(class_name.clone(), valid_deps.len());

            for dep in valid_deps {
                reverse_deps
                    .entry(dep.clone())
                    .or_default()
                    .push(class_name.clone());
            }
        }

        let mut roots: Vec<String> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(name, _)| name.clone())
            .collect();
        roots.sort();
        let mut queue: VecDeque<String> = roots.into();

        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut processed = HashSet::new();

        // Process level by level
        while !queue.is_empty() {
            let mut current_level = Vec::new();
            let mut next = Vec::new();

            let level_size = queue.len();
            for _ in 0..level_size {
                if let Some(class_name) = queue.pop_front() {
                    processed.insert(class_name.clone());

                    // Reduce in-degree for dependents
                    if let Some(dependents) = reverse_deps.get(&class_name) {
                        for dependent in dependents {
                            if let Some(degree) = in_degree.get_mut(dependent) {
                                *degree -= 1;
                                if *degree == 0 {
                                    next.push(dependent.clone());
                                }
                            }
                        }
                    }
                    current_level.push(class_name);
                }
            }

            next.sort();
            queue.extend(next);
            if !current_level.is_empty() {
                levels.push(current_level);
            }
        }

        // Check for cycles
        if processed.len() != nodes.len() {
            let mut unprocessed: Vec<String> = nodes
                .keys()
                .filter(|k| !processed.contains(*k))
                .cloned()
                .collect();
            unprocessed.sort();
            return Err(unprocessed);
        }

        Ok(levels)
    }

    /// Get total number of levels
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Get all classes in processing order (flattened levels)
    pub fn processing_order(&self) -> Vec<String> {
        self.levels.iter().flatten().cloned().collect()
    }

    /// Check if a class extends another one, directly or indirectly
    pub fn depends_on(&self, class: &str, ancestor: &str) -> bool {
        if let Some(node) = self.nodes.get(class) {
            for dep in &node.depends_on {
                if dep == ancestor || self.depends_on(dep, ancestor) {
                    return true;
                }
            }
        }
        false
    }
}
