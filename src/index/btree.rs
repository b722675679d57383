//! BTreeMap-based pattern index trees
//!
//! Each tree orders statements by one permutation of (s, p, o, c) ids,
//! followed by the statement sequence number so that several versions of
//! one quad coexist. A pattern whose bound components form a prefix of the
//! permutation is answered by one contiguous range scan.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use crate::mvcc::VersionedStatement;

const S: usize = 0;
const P: usize = 1;
const O: usize = 2;
const C: usize = 3;

/// A component permutation served by one index tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOrder {
    Spoc,
    Posc,
    Ospc,
    Cspo,
    Cpos,
    Cosp,
}

impl IndexOrder {
    /// Every maintained order, in tie-break priority.
    pub const ALL: [IndexOrder; 6] = [
        IndexOrder::Spoc,
        IndexOrder::Posc,
        IndexOrder::Ospc,
        IndexOrder::Cspo,
        IndexOrder::Cpos,
        IndexOrder::Cosp,
    ];

    /// Component positions in key order.
    pub fn permutation(&self) -> [usize; 4] {
        match self {
            IndexOrder::Spoc => [S, P, O, C],
            IndexOrder::Posc => [P, O, S, C],
            IndexOrder::Ospc => [O, S, P, C],
            IndexOrder::Cspo => [C, S, P, O],
            IndexOrder::Cpos => [C, P, O, S],
            IndexOrder::Cosp => [C, O, S, P],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexOrder::Spoc => "spoc",
            IndexOrder::Posc => "posc",
            IndexOrder::Ospc => "ospc",
            IndexOrder::Cspo => "cspo",
            IndexOrder::Cpos => "cpos",
            IndexOrder::Cosp => "cosp",
        }
    }

    /// Number of leading key components bound in `components`.
    pub fn prefix_len(&self, components: &[Option<u64>; 4]) -> usize {
        self.permutation()
            .iter()
            .take_while(|&&i| components[i].is_some())
            .count()
    }

    /// The order with the longest bound prefix for `components`.
    pub fn for_components(components: &[Option<u64>; 4]) -> IndexOrder {
        let mut best = IndexOrder::Spoc;
        let mut best_len = best.prefix_len(components);
        for order in IndexOrder::ALL.iter().skip(1) {
            let len = order.prefix_len(components);
            if len > best_len {
                best = *order;
                best_len = len;
            }
        }
        best
    }

    /// Reorder `[s, p, o, c]` into this order.
    #[inline]
    pub fn permute(&self, key: &[u64; 4]) -> [u64; 4] {
        let perm = self.permutation();
        [key[perm[0]], key[perm[1]], key[perm[2]], key[perm[3]]]
    }
}

impl fmt::Display for IndexOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key of one index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey {
    pub terms: [u64; 4],
    pub seq: u64,
}

/// One sorted index over all stored statement versions.
#[derive(Debug)]
pub struct IndexTree {
    order: IndexOrder,
    tree: BTreeMap<IndexKey, Arc<VersionedStatement>>,
}

impl IndexTree {
    pub fn new(order: IndexOrder) -> Self {
        Self {
            order,
            tree: BTreeMap::new(),
        }
    }

    pub fn order(&self) -> IndexOrder {
        self.order
    }

    pub fn key_of(&self, statement: &VersionedStatement) -> IndexKey {
        IndexKey {
            terms: self.order.permute(&statement.key()),
            seq: statement.seq(),
        }
    }

    pub fn insert(&mut self, statement: Arc<VersionedStatement>) {
        let key = self.key_of(&statement);
        self.tree.insert(key, statement);
    }

    /// Remove the entry of `statement`. Returns true if it was present.
    pub fn remove(&mut self, statement: &VersionedStatement) -> bool {
        let key = self.key_of(statement);
        self.tree.remove(&key).is_some()
    }

    /// Entries whose key starts with the bound prefix of `components`,
    /// strictly after `after`, at most `limit` of them.
    pub fn scan(
        &self,
        components: &[Option<u64>; 4],
        after: Option<&IndexKey>,
        limit: usize,
    ) -> Vec<(IndexKey, Arc<VersionedStatement>)> {
        let permuted = self.order.permutation().map(|i| components[i]);
        let prefix = self.order.prefix_len(components);

        let mut low = [0u64; 4];
        let mut high = [u64::MAX; 4];
        for i in 0..prefix {
            if let Some(value) = permuted[i] {
                low[i] = value;
                high[i] = value;
            }
        }

        let lower = match after {
            Some(key) => Bound::Excluded(*key),
            None => Bound::Included(IndexKey { terms: low, seq: 0 }),
        };
        let upper = Bound::Included(IndexKey {
            terms: high,
            seq: u64::MAX,
        });

        if let (Bound::Excluded(from), Bound::Included(to)) = (&lower, &upper) {
            if from >= to {
                return Vec::new();
            }
        }

        self.tree
            .range((lower, upper))
            .take(limit)
            .map(|(k, v)| (*k, Arc::clone(v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
