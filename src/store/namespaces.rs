//! Prefix to namespace map
//!
//! Namespaces are not versioned. A transaction buffers its changes and
//! applies them at commit while it still holds write access.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// One buffered namespace modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NamespaceChange {
    Set { prefix: String, name: String },
    Remove { prefix: String },
    Clear,
}

#[derive(Debug, Default)]
pub(crate) struct NamespaceStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl NamespaceStore {
    pub(crate) fn list(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    pub(crate) fn apply(&self, changes: &[NamespaceChange]) {
        if changes.is_empty() {
            return;
        }
        let mut entries = self.entries.write();
        apply_changes(&mut entries, changes);
    }
}

/// Replay `changes` onto `entries` in order.
pub(crate) fn apply_changes(entries: &mut BTreeMap<String, String>, changes: &[NamespaceChange]) {
    for change in changes {
        match change {
            NamespaceChange::Set { prefix, name } => {
                entries.insert(prefix.clone(), name.clone());
            }
            NamespaceChange::Remove { prefix } => {
                entries.remove(prefix);
            }
            NamespaceChange::Clear => entries.clear(),
        }
    }
}
