use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A normalized package search hit as stored in the term cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRow {
    pub name: String,
    pub icon_token: String,
}

impl PackageRow {
    pub fn new(name: &str, icon_token: &str) -> Self {
        Self {
            name: name.to_string(),
            icon_token: icon_token.to_string(),
        }
    }

    /// External identifier handed to the dispatcher: `name:iconToken`.
    ///
    /// Package names never contain `:`, which keeps the id reversible.
    pub fn result_id(&self) -> String {
        format!("{}:{}", self.name, self.icon_token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultId<'a> {
    pub name: &'a str,
    pub icon_token: &'a str,
}

/// Splits an id on its first `:` for the name and its last `:` for the token.
pub fn parse_result_id(id: &str) -> Option<ResultId<'_>> {
    let (name, _) = id.split_once(':')?;
    let (_, icon_token) = id.rsplit_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some(ResultId { name, icon_token })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub id: String,
    pub name: String,
    pub icon_path: Option<PathBuf>,
}

/// Joins dispatcher terms and strips the required keyword.
///
/// Returns `None` when the keyword gate does not match or nothing searchable
/// is left once it is removed.
pub fn normalize_terms(terms: &[String], keyword: &str) -> Option<String> {
    let joined = terms.join(" ");
    let trimmed = joined.trim();
    let term = trimmed.strip_prefix(keyword)?;
    if term.trim().is_empty() {
        return None;
    }
    Some(term.to_string())
}
