//! Request protocol of the serving loop
//!
//! One JSON object per request, discriminated by `op`:
//!
//! ```text
//! {"op":"begin","isolation":"serializable"}
//! {"op":"add","tx":1,"quad":{"subject":{"iri":"…"},"predicate":{"iri":"…"},"object":{"literal":{"lexical":"…"}}}}
//! {"op":"remove","tx":1,"pattern":{"predicate":{"iri":"…"}}}
//! {"op":"query","tx":1,"pattern":{},"limit":10}
//! {"op":"size","tx":1,"context":"default_graph"}
//! {"op":"contexts","tx":1}
//! {"op":"commit","tx":1}
//! {"op":"rollback","tx":1}
//! {"op":"clean","below":8}
//! {"op":"stats"}
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::index::{ContextFilter, QuadPattern};
use crate::model::Quad;
use crate::mvcc::Snapshot;
use crate::store::{MemoryStore, StoreResult, Transaction};
use crate::txn::IsolationLevel;

/// A decoded request line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Begin {
        #[serde(default)]
        isolation: Option<IsolationLevel>,
    },
    Add {
        tx: u64,
        quad: Quad,
        #[serde(default)]
        inferred: bool,
    },
    Remove {
        tx: u64,
        #[serde(default)]
        pattern: QuadPattern,
    },
    Query {
        tx: u64,
        #[serde(default)]
        pattern: QuadPattern,
        #[serde(default)]
        limit: Option<usize>,
    },
    Size {
        tx: u64,
        #[serde(default)]
        context: ContextFilter,
    },
    Contexts {
        tx: u64,
    },
    Commit {
        tx: u64,
    },
    Rollback {
        tx: u64,
    },
    Clean {
        #[serde(default)]
        below: Option<u64>,
    },
    Stats,
}

/// A store plus the transactions opened through the protocol.
///
/// Transactions still open when the session ends are rolled back.
#[derive(Debug)]
pub struct Session {
    store: MemoryStore,
    transactions: HashMap<u64, Transaction>,
}

impl Session {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            transactions: HashMap::new(),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn open_transactions(&self) -> usize {
        self.transactions.len()
    }

    /// Decode and execute one request.
    pub fn handle_value(&mut self, value: Value) -> CliResult<Value> {
        let request: Request = serde_json::from_value(value)
            .map_err(|e| CliError::bad_request(format!("invalid request: {}", e)))?;
        self.handle(request)
    }

    pub fn handle(&mut self, request: Request) -> CliResult<Value> {
        match request {
            Request::Begin { isolation } => {
                let tx = match isolation {
                    Some(level) => self.store.open_transaction(level)?,
                    None => self.store.begin()?,
                };
                let response = json!({
                    "tx": tx.id(),
                    "isolation": tx.isolation(),
                    "snapshot": tx.start_snapshot().unwrap_or_else(|| self.store.current_snapshot()),
                });
                self.transactions.insert(tx.id(), tx);
                Ok(response)
            }
            Request::Add { tx, quad, inferred } => {
                let tx = self.transaction(tx)?;
                let added = if inferred {
                    tx.add_inferred(&quad.subject, &quad.predicate, &quad.object, quad.context.as_ref())?
                } else {
                    tx.add_quad(&quad)?
                };
                Ok(json!({ "added": added }))
            }
            Request::Remove { tx, pattern } => {
                let removed = self.transaction(tx)?.remove(&pattern)?;
                Ok(json!({ "removed": removed }))
            }
            Request::Query { tx, pattern, limit } => {
                let cursor = self.transaction(tx)?.get_statements(&pattern)?;
                let quads = cursor
                    .take(limit.unwrap_or(usize::MAX))
                    .collect::<StoreResult<Vec<Quad>>>()?;
                Ok(json!({ "count": quads.len(), "quads": quads }))
            }
            Request::Size { tx, context } => {
                let size = self.transaction(tx)?.size(context)?;
                Ok(json!({ "size": size }))
            }
            Request::Contexts { tx } => {
                let contexts = self.transaction(tx)?.context_ids()?;
                Ok(json!({ "contexts": contexts }))
            }
            Request::Commit { tx } => {
                let snapshot = self.take(tx)?.commit()?;
                Ok(json!({ "tx": tx, "snapshot": snapshot }))
            }
            Request::Rollback { tx } => {
                self.take(tx)?.rollback()?;
                Ok(json!({ "tx": tx, "rolled_back": true }))
            }
            Request::Clean { below } => {
                let report = match below {
                    Some(limit) => self.store.clean_snapshots_below(Snapshot::new(limit))?,
                    None => self.store.clean_snapshots()?,
                };
                Ok(serde_json::to_value(report)?)
            }
            Request::Stats => Ok(serde_json::to_value(self.store.stats())?),
        }
    }

    /// Roll back every open transaction and close the store.
    pub fn close(mut self) {
        for (_, tx) in self.transactions.drain() {
            let _ = tx.rollback();
        }
        self.store.close();
    }

    fn transaction(&mut self, id: u64) -> CliResult<&mut Transaction> {
        self.transactions
            .get_mut(&id)
            .ok_or_else(|| CliError::unknown_transaction(id))
    }

    fn take(&mut self, id: u64) -> CliResult<Transaction> {
        self.transactions
            .remove(&id)
            .ok_or_else(|| CliError::unknown_transaction(id))
    }
}
