//! Privilege level tracking with graph-based navigation.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

use crate::error::{DriverError, Result};
use crate::platform::PrivilegeLevel;

/// Tracks the current privilege level and finds routes between levels.
///
/// Levels form a bidirectional graph where each level connects to its
/// parent (`previous_priv`).
#[derive(Debug)]
pub struct PrivilegeManager {
    /// All defined privilege levels.
    levels: IndexMap<String, PrivilegeLevel>,

    /// Adjacency list for the privilege graph.
    graph: HashMap<String, HashSet<String>>,

    /// Current privilege level name.
    current: Option<String>,
}

impl PrivilegeManager {
    /// Create a new privilege manager from privilege level definitions.
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        let graph = Self::build_graph(&levels);

        Self {
            levels,
            graph,
            current: None,
        }
    }

    /// Build the bidirectional adjacency list from privilege definitions.
    fn build_graph(levels: &IndexMap<String, PrivilegeLevel>) -> HashMap<String, HashSet<String>> {
        let mut graph: HashMap<String, HashSet<String>> = HashMap::new();

        for (name, level) in levels {
            graph.entry(name.clone()).or_default();

            if let Some(ref parent) = level.previous_priv {
                graph.entry(name.clone()).or_default().insert(parent.clone());
                graph.entry(parent.clone()).or_default().insert(name.clone());
            }
        }

        graph
    }

    /// Determine the privilege level a prompt belongs to.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Get the current privilege level.
    pub fn current(&self) -> Option<&PrivilegeLevel> {
        self.current.as_ref().and_then(|name| self.levels.get(name))
    }

    /// Set the current privilege level by name.
    pub fn set_current(&mut self, name: &str) -> Result<()> {
        if self.levels.contains_key(name) {
            self.current = Some(name.to_string());
            Ok(())
        } else {
            Err(DriverError::UnknownPrivilege {
                prompt: name.to_string(),
            }
            .into())
        }
    }

    /// Find the shortest path from one privilege level to another.
    ///
    /// Returns the level names to traverse, including both ends.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        if from == to {
            return Ok(vec![from.to_string()]);
        }

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        let mut parent: HashMap<String, String> = HashMap::new();

        queue.push_back(from.to_string());
        visited.insert(from.to_string());

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to.to_string()];
                let mut node = to.to_string();

                while let Some(prev) = parent.get(&node) {
                    path.push(prev.clone());
                    node = prev.clone();
                }

                path.reverse();
                return Ok(path);
            }

            if let Some(neighbors) = self.graph.get(&current) {
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        parent.insert(neighbor.clone(), current.clone());
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }

        Err(DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into())
    }

    /// Command that moves from one level to an adjacent level.
    pub fn transition_command(&self, from: &str, to: &str) -> Option<String> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        // Escalating to a child of the current level
        if to_level.previous_priv.as_deref() == Some(from) {
            return to_level.escalate_command.clone();
        }

        // De-escalating to the parent
        if from_level.previous_priv.as_deref() == Some(to) {
            return from_level.deescalate_command.clone();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::juniper;

    fn manager() -> PrivilegeManager {
        PrivilegeManager::new(juniper::platform().privilege_levels)
    }

    #[test]
    fn test_determine_privilege() {
        let manager = manager();

        let level = manager.determine_from_prompt("admin@ex2300> ").unwrap();
        assert_eq!(level.name, "exec");

        let level = manager.determine_from_prompt("admin@ex2300# ").unwrap();
        assert_eq!(level.name, "configuration");

        let level = manager.determine_from_prompt("root@ex2300:RE:0% ").unwrap();
        assert_eq!(level.name, "shell");

        assert!(manager.determine_from_prompt("login: ").is_err());
    }

    #[test]
    fn test_find_path() {
        let manager = manager();

        let path = manager.find_path("shell", "configuration").unwrap();
        assert_eq!(path, vec!["shell", "exec", "configuration"]);

        let path = manager.find_path("configuration", "exec").unwrap();
        assert_eq!(path, vec!["configuration", "exec"]);

        let path = manager.find_path("exec", "exec").unwrap();
        assert_eq!(path, vec!["exec"]);

        assert!(manager.find_path("exec", "enable").is_err());
    }

    #[test]
    fn test_transition_command() {
        let manager = manager();

        assert_eq!(
            manager.transition_command("exec", "configuration").as_deref(),
            Some("configure")
        );
        assert_eq!(
            manager.transition_command("configuration", "exec").as_deref(),
            Some("exit configuration-mode")
        );
        assert_eq!(
            manager.transition_command("shell", "exec").as_deref(),
            Some("cli")
        );
        assert_eq!(manager.transition_command("shell", "configuration"), None);
    }

    #[test]
    fn test_set_current() {
        let mut manager = manager();
        assert!(manager.current().is_none());

        manager.set_current("exec").unwrap();
        assert_eq!(manager.current().map(|l| l.name.as_str()), Some("exec"));

        assert!(manager.set_current("enable").is_err());
    }
}
