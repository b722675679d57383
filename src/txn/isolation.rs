//! Transaction isolation levels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much of other transactions' work a transaction observes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Reads see uncommitted writes of the active writer.
    None,
    /// Each operation reads the latest committed snapshot.
    ReadCommitted,
    /// All reads use the snapshot taken at transaction start.
    #[default]
    Snapshot,
    /// Snapshot reads plus commit-time conflict validation.
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::None => "none",
            IsolationLevel::ReadCommitted => "read_committed",
            IsolationLevel::Snapshot => "snapshot",
            IsolationLevel::Serializable => "serializable",
        }
    }

    /// True if the read snapshot is fixed at transaction start.
    pub fn uses_fixed_snapshot(&self) -> bool {
        matches!(self, IsolationLevel::Snapshot | IsolationLevel::Serializable)
    }

    pub fn detects_conflicts(&self) -> bool {
        matches!(self, IsolationLevel::Serializable)
    }

    pub fn reads_uncommitted(&self) -> bool {
        matches!(self, IsolationLevel::None)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "none" => Ok(IsolationLevel::None),
            "read_committed" => Ok(IsolationLevel::ReadCommitted),
            "snapshot" => Ok(IsolationLevel::Snapshot),
            "serializable" => Ok(IsolationLevel::Serializable),
            other => Err(format!("unknown isolation level '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            "read-committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "SERIALIZABLE".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!("repeatable_read".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_properties() {
        assert!(IsolationLevel::Snapshot.uses_fixed_snapshot());
        assert!(!IsolationLevel::ReadCommitted.uses_fixed_snapshot());
        assert!(IsolationLevel::Serializable.detects_conflicts());
        assert!(IsolationLevel::None.reads_uncommitted());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&IsolationLevel::ReadCommitted).unwrap();
        assert_eq!(json, "\"read_committed\"");
        assert_eq!(IsolationLevel::default(), IsolationLevel::Snapshot);
    }
}
