use indexmap::IndexMap;
use serde_json::{from_str, Value};
use std::collections::HashSet;
use std::fs;

use crate::model::Result;

pub const UNASSIGNED_OWNER: &str = "Unassigned";

/// One explicitly declared owner with the issue type codes assigned to them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Owner {
    pub name: String,
    pub issue_types: Vec<(i64, String)>,
}

impl Owner {
    fn new(name: impl ToString, issue_types: Vec<(i64, String)>) -> Self {
        Self {
            name: name.to_string(),
            issue_types,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.issue_types
            .iter()
            .map(|(_, label)| label.as_str())
            .collect()
    }
}

/// Ordered owner declarations; declaration order is also render order.
#[derive(Debug, Clone)]
pub struct OwnerMapping {
    pub owners: Vec<Owner>,
}

// Create
impl OwnerMapping {
    pub fn from_config(path: &str) -> Result<Self> {
        let json_str = fs::read_to_string(path)?;
        Self::parse(&json_str)
    }

    /// Appends the synthetic catch-all owner: every code from the tracker's
    /// universal set that no explicit owner claimed.
    pub fn with_unassigned(mut self, all_codes: &IndexMap<i64, String>) -> Self {
        let claimed = self
            .owners
            .iter()
            .flat_map(|owner| owner.issue_types.iter().map(|(code, _)| *code))
            .collect::<HashSet<_>>();
        let unmapped = all_codes
            .iter()
            .filter(|(code, _)| !claimed.contains(code))
            .map(|(code, label)| (*code, label.clone()))
            .collect::<Vec<_>>();
        self.owners.push(Owner::new(UNASSIGNED_OWNER, unmapped));
        self
    }
}

// Parser
impl OwnerMapping {
    fn parse(json_str: &str) -> Result<Self> {
        let elements: IndexMap<String, Value> = from_str(json_str)?;
        let mut owners = Vec::new();
        let mut claimed: HashSet<i64> = HashSet::new();
        for (name, details) in elements {
            let Some(codes) = details["codes"].as_object() else {
                return Err(format!("Not found 'codes' field for owner '{}'", name).into());
            };
            let mut issue_types = Vec::new();
            for (code, label) in codes {
                let Ok(code) = code.parse::<i64>() else {
                    return Err(format!("Not a valid issue type code: {}", code).into());
                };
                let Some(label) = label.as_str() else {
                    return Err(format!("Not a valid label for issue type code {}", code).into());
                };
                if !claimed.insert(code) {
                    return Err(
                        format!("Issue type code {} is claimed by more than one owner", code).into(),
                    );
                }
                issue_types.push((code, label.to_string()));
            }
            owners.push(Owner::new(name, issue_types));
        }
        Ok(Self { owners })
    }
}
