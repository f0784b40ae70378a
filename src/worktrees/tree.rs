//! Branch dependency tree built from the declared configuration.
//!
//! The merge-into relation links each worktree to the one its branch merges
//! back into, forming one or more rooted trees. Nodes live in an arena and
//! refer to each other by index; the tree is rebuilt fresh on every
//! invocation and never cached across runs.
//!
//! All orderings are lexical by worktree name so identical configuration
//! always produces identical traversals.

use std::collections::BTreeMap;

use super::spec::{ConfigError, WorktreeConfig, WorktreeSpec};

/// Index of a node in the tree's arena.
pub type NodeId = usize;

/// One worktree wired into the dependency tree.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    spec: WorktreeSpec,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl DependencyNode {
    pub fn spec(&self) -> &WorktreeSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn branch(&self) -> &str {
        &self.spec.branch
    }
}

/// A forest of worktree nodes linked by merge-into edges.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    nodes: Vec<DependencyNode>,
    index: BTreeMap<String, NodeId>,
    roots: Vec<NodeId>,
}

impl DependencyTree {
    /// Build the forest: one pass to allocate nodes and the name index, a
    /// second to wire parent/child edges, then a bounded parent-walk from
    /// every node to reject cycles.
    pub fn build(config: &WorktreeConfig) -> Result<Self, ConfigError> {
        let mut nodes: Vec<DependencyNode> = Vec::with_capacity(config.len());
        let mut index = BTreeMap::new();

        for spec in config.iter() {
            let id = nodes.len();
            index.insert(spec.name.clone(), id);
            nodes.push(DependencyNode {
                spec: spec.clone(),
                parent: None,
                children: Vec::new(),
            });
        }

        for id in 0..nodes.len() {
            if let Some(target) = nodes[id].spec.merge_into.clone() {
                let parent_id = *index.get(&target).ok_or(ConfigError::UnknownMergeTarget {
                    name: nodes[id].spec.name.clone(),
                    target: target.clone(),
                })?;
                nodes[id].parent = Some(parent_id);
                nodes[parent_id].children.push(id);
            }
        }

        // Nodes were allocated in lexical name order, so child lists built in
        // allocation order are already lexically sorted.
        let roots: Vec<NodeId> = (0..nodes.len())
            .filter(|&id| nodes[id].parent.is_none())
            .collect();

        let tree = Self {
            nodes,
            index,
            roots,
        };
        tree.check_acyclic()?;
        Ok(tree)
    }

    /// Walk from every node toward its root; revisiting a node, or walking
    /// longer than the arena is large, means the merge-into relation loops.
    fn check_acyclic(&self) -> Result<(), ConfigError> {
        for start in 0..self.nodes.len() {
            let mut visited = vec![false; self.nodes.len()];
            let mut current = start;
            let mut steps = 0;

            loop {
                if visited[current] || steps > self.nodes.len() {
                    return Err(ConfigError::MergeCycle(self.nodes[start].name().to_string()));
                }
                visited[current] = true;
                steps += 1;

                match self.nodes[current].parent {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id]
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].children.is_empty()
    }

    /// Root nodes (no merge-into target) in lexical name order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Distance from `id` to its root
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
            depth += 1;
        }
        depth
    }

    /// The deployment chain from `id` up to its root, inclusive
    pub fn chain_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// The deepest leaf(s) of every root's tree: the "production end(s)" of
    /// each deployment chain. Ties are all returned, lexically ordered
    /// within a root; roots contribute in lexical order.
    pub fn chain_heads(&self) -> Vec<NodeId> {
        let mut heads = Vec::new();
        for &root in &self.roots {
            let mut leaves: Vec<(NodeId, usize)> = Vec::new();
            self.collect_leaves(root, 0, &mut leaves);

            let max_depth = leaves.iter().map(|&(_, d)| d).max().unwrap_or(0);
            let mut deepest: Vec<NodeId> = leaves
                .into_iter()
                .filter(|&(_, d)| d == max_depth)
                .map(|(id, _)| id)
                .collect();
            deepest.sort_by(|&a, &b| self.nodes[a].name().cmp(self.nodes[b].name()));
            heads.extend(deepest);
        }
        heads
    }

    fn collect_leaves(&self, id: NodeId, depth: usize, out: &mut Vec<(NodeId, usize)>) {
        if self.nodes[id].children.is_empty() {
            out.push((id, depth));
            return;
        }
        for &child in &self.nodes[id].children {
            self.collect_leaves(child, depth + 1, out);
        }
    }
}
