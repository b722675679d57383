//! Pattern index manager
//!
//! Owns the six index trees behind a single lock. Inserting a statement
//! takes the write lock once and updates every tree, so no reader can see
//! a statement in one order and miss it in another.
//!
//! # API
//!
//! - `insert(statement)` - Index a new statement version
//! - `remove_batch(statements)` - Drop purged versions
//! - `scan_batch(pattern, after, limit)` - One bounded range scan

use std::sync::Arc;

use parking_lot::RwLock;

use super::btree::{IndexKey, IndexOrder, IndexTree};
use super::pattern::IdPattern;
use crate::mvcc::VersionedStatement;

/// One bounded slice of a range scan.
#[derive(Debug, Default)]
pub struct ScanBatch {
    /// Entries matching the pattern, in index order.
    pub statements: Vec<Arc<VersionedStatement>>,
    /// Key to resume after. `None` once the range is exhausted.
    pub resume: Option<IndexKey>,
}

#[derive(Debug)]
struct IndexSet {
    trees: Vec<IndexTree>,
}

impl IndexSet {
    fn tree(&self, order: IndexOrder) -> Option<&IndexTree> {
        self.trees.iter().find(|t| t.order() == order)
    }
}

/// The pattern indexes of one store.
#[derive(Debug)]
pub struct PatternIndexes {
    inner: RwLock<IndexSet>,
}

impl PatternIndexes {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexSet {
                trees: IndexOrder::ALL.iter().map(|&o| IndexTree::new(o)).collect(),
            }),
        }
    }

    /// Add `statement` to every tree.
    pub fn insert(&self, statement: &Arc<VersionedStatement>) {
        let mut set = self.inner.write();
        for tree in set.trees.iter_mut() {
            tree.insert(Arc::clone(statement));
        }
    }

    /// Remove the given versions from every tree. Returns how many were
    /// present.
    pub fn remove_batch(&self, statements: &[Arc<VersionedStatement>]) -> usize {
        if statements.is_empty() {
            return 0;
        }
        let mut set = self.inner.write();
        let mut removed = 0;
        for (i, tree) in set.trees.iter_mut().enumerate() {
            for statement in statements {
                let present = tree.remove(statement);
                if i == 0 && present {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Scan at most `limit` index entries in the best order for `pattern`,
    /// strictly after `after`, keeping those that match it.
    pub fn scan_batch(&self, pattern: &IdPattern, after: Option<&IndexKey>, limit: usize) -> ScanBatch {
        let components = pattern.components();
        let order = IndexOrder::for_components(&components);
        let limit = limit.max(1);

        let set = self.inner.read();
        let Some(tree) = set.tree(order) else {
            return ScanBatch::default();
        };
        let entries = tree.scan(&components, after, limit);
        drop(set);

        let resume = if entries.len() < limit {
            None
        } else {
            entries.last().map(|(k, _)| *k)
        };

        let statements = entries
            .into_iter()
            .filter(|(_, s)| pattern.matches(&s.key(), s.is_explicit()))
            .map(|(_, s)| s)
            .collect();

        ScanBatch { statements, resume }
    }

    /// Total index entries, including versions awaiting cleanup.
    pub fn len(&self) -> usize {
        self.inner.read().trees.first().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternIndexes {
    fn default() -> Self {
        Self::new()
    }
}
