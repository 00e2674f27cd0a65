//! In-memory resource pool.
//!
//! Tracks which resource instances have been created so far. Nodes live in an
//! arena and refer to their parent and children by index; a path -> index map
//! gives direct lookup. Subscription-level and tenant-level paths are implicit
//! roots: they always exist and are never stored.

use crate::models::VirtualServerRequest;
use crate::utils::{get_path, is_management_url_level, strip_provider_pairs};
use std::collections::HashMap;
use tracing::debug;

/// A created resource instance
#[derive(Debug, Clone)]
struct ResourceNode {
    /// Path as first seen (original casing, no query)
    url: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Process-lifetime tree of created resources
#[derive(Debug, Default)]
pub struct ResourcePool {
    nodes: Vec<Option<ResourceNode>>,
    index: HashMap<String, usize>,
    free: Vec<usize>,
    cascade_enabled: bool,
}

impl ResourcePool {
    /// `cascade_enabled` lets a DELETE remove a node together with its subtree.
    pub fn new(cascade_enabled: bool) -> Self {
        Self {
            cascade_enabled,
            ..Default::default()
        }
    }

    /// PUT is the only creating method
    pub fn is_create_method(req: &VirtualServerRequest) -> bool {
        req.method.eq_ignore_ascii_case("PUT")
    }

    pub fn has_url(&self, req: &VirtualServerRequest) -> bool {
        self.has_path(&req.url)
    }

    pub fn has_path(&self, url: &str) -> bool {
        self.index.contains_key(&normalize(url))
    }

    /// Number of created resources
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Created resource paths, sorted
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .index
            .values()
            .filter_map(|&i| self.nodes[i].as_ref().map(|n| n.url.clone()))
            .collect();
        urls.sort();
        urls
    }

    /// Apply the request's side effect to the tree.
    ///
    /// Returns `false` only when the mutation is structurally illegal: a create
    /// under a missing parent, or a delete of a node that still has children
    /// (with cascading disabled). Deleting an absent node is a legal no-op.
    pub fn update_resource_pool(&mut self, req: &VirtualServerRequest) -> bool {
        let segments = get_path(&req.url);
        if !is_management_url_level(segments.len(), &req.url) {
            return true;
        }

        if Self::is_create_method(req) {
            self.create(&segments)
        } else if req.method.eq_ignore_ascii_case("DELETE") {
            self.delete(&segments)
        } else {
            true
        }
    }

    fn create(&mut self, segments: &[&str]) -> bool {
        let key = join_key(segments);
        if self.index.contains_key(&key) {
            return true;
        }

        let parent = match parent_segments(segments) {
            Some(parent) => match self.index.get(&join_key(&parent)) {
                Some(&idx) => Some(idx),
                None => {
                    debug!("Resource pool: parent of /{} missing", segments.join("/"));
                    return false;
                }
            },
            None => None,
        };

        let node = ResourceNode {
            url: format!("/{}", segments.join("/")),
            parent,
            children: Vec::new(),
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        if let Some(p) = parent {
            if let Some(parent_node) = self.nodes[p].as_mut() {
                parent_node.children.push(idx);
            }
        }
        self.index.insert(key, idx);
        true
    }

    fn delete(&mut self, segments: &[&str]) -> bool {
        let Some(&idx) = self.index.get(&join_key(segments)) else {
            return true;
        };
        let has_children = self.nodes[idx]
            .as_ref()
            .map(|n| !n.children.is_empty())
            .unwrap_or(false);
        if has_children && !self.cascade_enabled {
            return false;
        }

        if let Some(parent) = self.nodes[idx].as_ref().and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes[parent].as_mut() {
                parent_node.children.retain(|&c| c != idx);
            }
        }
        self.remove_subtree(idx);
        true
    }

    fn remove_subtree(&mut self, root: usize) {
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.nodes[idx].take() {
                stack.extend(node.children);
                self.index.remove(&normalize(&node.url));
                self.free.push(idx);
            }
        }
    }
}

/// Lower-cased lookup key of a URL's path
fn normalize(url: &str) -> String {
    join_key(&get_path(url))
}

fn join_key(segments: &[&str]) -> String {
    format!("/{}", segments.join("/")).to_lowercase()
}

/// Segments of the containing instance, or `None` when the container is an
/// implicit root (subscription or tenant).
fn parent_segments<'a>(segments: &[&'a str]) -> Option<Vec<&'a str>> {
    let mut parent: Vec<&str> = segments[..segments.len().saturating_sub(2)].to_vec();
    let n = parent.len();
    if n >= 2 && parent[n - 2].eq_ignore_ascii_case("providers") {
        parent.truncate(n - 2);
    }
    if strip_provider_pairs(&parent).len() <= 2 {
        None
    } else {
        Some(parent)
    }
}
