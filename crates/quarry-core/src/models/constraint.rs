//! Constraint sets: structured filters extracted from question and fragment text.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name of an extracted constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKey {
    DateStart,
    DateEnd,
    CategoryFilter,
    TopN,
    RankBy,
    Kpi,
    KpiFormula,
}

impl ConstraintKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DateStart => "date-start",
            Self::DateEnd => "date-end",
            Self::CategoryFilter => "category-filter",
            Self::TopN => "top-n",
            Self::RankBy => "rank-by",
            Self::Kpi => "kpi",
            Self::KpiFormula => "kpi-formula",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintValue {
    Date(NaiveDate),
    Text(String),
    Count(u32),
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Text(t) => f.write_str(t),
            Self::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Where a constraint value came from. Fragment sources are cited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintSource {
    Question,
    Fragment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub value: ConstraintValue,
    pub source: ConstraintSource,
}

/// Mapping from constraint name to extracted value. May be empty; every
/// consumer tolerates missing entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    entries: BTreeMap<ConstraintKey, Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already set. The first extraction wins, so
    /// explicit question text takes precedence over fragment-derived values
    /// when the planner extracts from the question first.
    pub fn insert(&mut self, key: ConstraintKey, value: ConstraintValue, source: ConstraintSource) {
        self.entries
            .entry(key)
            .or_insert(Constraint { value, source });
    }

    pub fn get(&self, key: ConstraintKey) -> Option<&Constraint> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: ConstraintKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstraintKey, &Constraint)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn date_start(&self) -> Option<NaiveDate> {
        self.date(ConstraintKey::DateStart)
    }

    pub fn date_end(&self) -> Option<NaiveDate> {
        self.date(ConstraintKey::DateEnd)
    }

    pub fn category(&self) -> Option<&str> {
        self.text(ConstraintKey::CategoryFilter)
    }

    pub fn top_n(&self) -> Option<u32> {
        match self.get(ConstraintKey::TopN).map(|c| &c.value) {
            Some(ConstraintValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn rank_by(&self) -> Option<&str> {
        self.text(ConstraintKey::RankBy)
    }

    pub fn kpi(&self) -> Option<&str> {
        self.text(ConstraintKey::Kpi)
    }

    /// Fragment identifiers that supplied at least one constraint, in key order,
    /// without duplicates.
    pub fn fragment_sources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for c in self.entries.values() {
            if let ConstraintSource::Fragment(id) = &c.source {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
        }
        out
    }

    /// One line per constraint, `name = value`, for prompts and traces.
    pub fn describe(&self) -> String {
        if self.entries.is_empty() {
            return "none".to_string();
        }
        self.entries
            .iter()
            .map(|(k, c)| format!("{} = {}", k.as_str(), c.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn date(&self, key: ConstraintKey) -> Option<NaiveDate> {
        match self.get(key).map(|c| &c.value) {
            Some(ConstraintValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    fn text(&self, key: ConstraintKey) -> Option<&str> {
        match self.get(key).map(|c| &c.value) {
            Some(ConstraintValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let mut set = ConstraintSet::new();
        set.insert(ConstraintKey::TopN, ConstraintValue::Count(3), ConstraintSource::Question);
        set.insert(
            ConstraintKey::TopN,
            ConstraintValue::Count(5),
            ConstraintSource::Fragment("catalog::chunk0".into()),
        );
        assert_eq!(set.top_n(), Some(3));
        assert!(set.fragment_sources().is_empty());
    }

    #[test]
    fn describe_lists_entries() {
        let mut set = ConstraintSet::new();
        let d = NaiveDate::from_ymd_opt(1997, 12, 1).unwrap();
        set.insert(ConstraintKey::DateStart, ConstraintValue::Date(d), ConstraintSource::Question);
        assert_eq!(set.describe(), "date-start = 1997-12-01");
        assert_eq!(ConstraintSet::new().describe(), "none");
    }
}
