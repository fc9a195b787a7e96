//! Registry of generated code snippets and their dependency graph.
//!
//! Every emitted declaration (interface, helper function, error class,
//! accessor) is stored once under a unique name. Registration through a
//! [`SnippetScope`] that carries an owner name records an owner -> snippet
//! dependency edge, so nested declarations end up ordered before the code
//! that needs them without the renderers threading that bookkeeping
//! explicitly.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::BuildError;

/// Shared store of named, immutable code snippets plus dependency edges.
///
/// One registry instance corresponds to one generated output file.
#[derive(Debug, Default)]
pub struct SnippetRegistry {
    snippets: BTreeMap<String, String>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snippets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.snippets.get(name).map(String::as_str)
    }

    /// Root scope: additions record no dependency edge.
    pub fn scope(&mut self) -> SnippetScope<'_> {
        SnippetScope {
            registry: self,
            owner: None,
        }
    }

    fn insert(&mut self, name: &str, code: &str) -> Result<(), BuildError> {
        if let Some(existing) = self.snippets.get(name) {
            if existing != code {
                return Err(BuildError::ConflictingSnippet(name.to_string()));
            }
            return Ok(());
        }
        self.snippets.insert(name.to_string(), code.to_string());
        Ok(())
    }

    fn record_dependency(&mut self, owner: &str, child: &str) {
        self.dependencies
            .entry(owner.to_string())
            .or_default()
            .insert(child.to_string());
    }

    /// Names that nothing else depends on: the roots of the graph, emitted
    /// last in the generated file.
    pub fn top_level_snippets(&self) -> BTreeSet<String> {
        let mut roots: BTreeSet<String> = self.snippets.keys().cloned().collect();
        for children in self.dependencies.values() {
            for child in children {
                roots.remove(child);
            }
        }
        roots
    }

    /// Global topological order over all registered names, computed by
    /// repeated leaf extraction with alphabetical tie-breaking.
    fn global_order(&self) -> Result<Vec<String>, BuildError> {
        let mut remaining: BTreeSet<&str> = self.snippets.keys().map(String::as_str).collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            // BTreeSet iteration keeps each extraction round alphabetical.
            let leaves: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|name| {
                    self.dependencies
                        .get(*name)
                        .map_or(true, |deps| deps.iter().all(|d| !remaining.contains(d.as_str())))
                })
                .collect();

            if leaves.is_empty() {
                let cycle = remaining.iter().map(|s| (*s).to_string()).collect();
                return Err(BuildError::CircularDependency(cycle));
            }

            for leaf in leaves {
                remaining.remove(leaf);
                order.push(leaf.to_string());
            }
        }

        Ok(order)
    }

    /// Every name reachable from `root` via dependency edges, `root` included.
    fn reachable(&self, root: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root.to_string()];
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(deps) = self.dependencies.get(&name) {
                stack.extend(deps.iter().cloned());
            }
        }
        seen
    }

    /// Emission order for the generated file: for each root in alphabetical
    /// order, its dependency closure leaves-first, each name exactly once.
    pub fn natural_order(&self) -> Result<Vec<String>, BuildError> {
        let global = self.global_order()?;
        let mut emitted = BTreeSet::new();
        let mut order = Vec::with_capacity(global.len());

        for root in self.top_level_snippets() {
            let closure = self.reachable(&root);
            for name in &global {
                if closure.contains(name) && emitted.insert(name.clone()) {
                    order.push(name.clone());
                }
            }
        }

        Ok(order)
    }
}

/// Mutable handle onto a [`SnippetRegistry`], optionally tagged with the
/// name of the snippet currently being rendered. Additions made through a
/// tagged scope become dependencies of that owner.
#[derive(Debug)]
pub struct SnippetScope<'a> {
    registry: &'a mut SnippetRegistry,
    owner: Option<String>,
}

impl SnippetScope<'_> {
    /// Register a snippet. Registering the same name twice is a no-op if
    /// the contents are identical and an error otherwise.
    pub fn add(&mut self, name: &str, code: &str) -> Result<(), BuildError> {
        self.registry.insert(name, code)?;
        if let Some(owner) = &self.owner {
            let owner = owner.clone();
            self.registry.record_dependency(&owner, name);
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Scope for rendering the body of `owner`: additions through it are
    /// recorded as dependencies of `owner`.
    pub fn nested(&mut self, owner: &str) -> SnippetScope<'_> {
        SnippetScope {
            registry: self.registry,
            owner: Some(owner.to_string()),
        }
    }
}
