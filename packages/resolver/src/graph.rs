//! Template dependency graph.
//!
//! Tracks which templates each resolved template directly instantiates,
//! with a reverse index, so invalidating a template can also drop every
//! cached template that embeds it (directly or transitively).

use std::collections::{HashMap, HashSet, VecDeque};

use stencil_document::TemplateId;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// template -> templates it instantiates
    dependencies: HashMap<TemplateId, Vec<TemplateId>>,

    /// template -> templates that instantiate it
    dependents: HashMap<TemplateId, Vec<TemplateId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all dependencies recorded for `source`.
    pub fn set_dependencies(&mut self, source: TemplateId, targets: Vec<TemplateId>) {
        self.remove(&source);

        for target in &targets {
            self.dependents
                .entry(target.clone())
                .or_default()
                .push(source.clone());
        }
        self.dependencies.insert(source, targets);
    }

    /// Drop `source`'s outgoing edges (and the matching reverse edges).
    pub fn remove(&mut self, source: &str) {
        if let Some(old_targets) = self.dependencies.remove(source) {
            for target in old_targets {
                if let Some(back) = self.dependents.get_mut(&target) {
                    back.retain(|id| id != source);
                }
            }
        }
    }

    pub fn dependencies(&self, template_id: &str) -> Option<&[TemplateId]> {
        self.dependencies.get(template_id).map(|v| v.as_slice())
    }

    pub fn dependents(&self, template_id: &str) -> Option<&[TemplateId]> {
        self.dependents.get(template_id).map(|v| v.as_slice())
    }

    /// The template plus everything that transitively instantiates it.
    pub fn dependents_transitive(&self, template_id: &str) -> HashSet<TemplateId> {
        let mut affected = HashSet::new();
        let mut queue = VecDeque::new();
        affected.insert(template_id.to_string());
        queue.push_back(template_id.to_string());

        while let Some(current) = queue.pop_front() {
            if let Some(parents) = self.dependents.get(&current) {
                for parent in parents {
                    if affected.insert(parent.clone()) {
                        queue.push_back(parent.clone());
                    }
                }
            }
        }

        affected
    }

    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }
}
