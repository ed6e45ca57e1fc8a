//! Relation and rule data model.
//!
//! Relations are structs, not code — a problem can be loaded from JSON or
//! constructed programmatically. Relation order and rule order are both
//! significant: the program writer emits them in sequence, and learned
//! weights come back keyed by that sequence.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A data row: one constant per column, with an optional trailing extra
/// column holding a soft weight (observed rows only).
pub type Row = Vec<String>;

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// A named, fixed-arity predicate with observed and/or unobserved row data.
///
/// Identity is the name, compared case-insensitively. When `variable_types`
/// is `None` the types must be inferred before the program can be written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub arity: usize,
    /// One type tag per column. `None` until declared or inferred.
    #[serde(default)]
    pub variable_types: Option<Vec<String>>,
    /// Ground-truth rows fed to the engine as evidence.
    #[serde(default)]
    pub observed_rows: Vec<Row>,
    /// Rows whose truth value is to be inferred.
    #[serde(default)]
    pub unobserved_rows: Vec<Row>,
    /// Evidence-only predicate, closed-world. Declared with a `*` prefix.
    #[serde(default)]
    pub observed: bool,
    /// Per-relation bias against atoms of this relation being true.
    #[serde(default)]
    pub negative_prior_weight: Option<f64>,
}

impl Relation {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            variable_types: None,
            observed_rows: Vec::new(),
            unobserved_rows: Vec::new(),
            observed: false,
            negative_prior_weight: None,
        }
    }

    pub fn has_observed_data(&self) -> bool {
        !self.observed_rows.is_empty()
    }

    pub fn has_unobserved_data(&self) -> bool {
        !self.unobserved_rows.is_empty()
    }

    pub fn has_negative_prior_weight(&self) -> bool {
        self.negative_prior_weight.is_some()
    }

    /// The first `arity` columns of a row, normalized for the engine format.
    ///
    /// This is the identity used both when writing facts and when matching
    /// engine results back onto query rows, so the two sides always agree.
    pub fn key_of(&self, row: &[String]) -> Result<Vec<String>, ModelError> {
        let args = row.get(..self.arity).ok_or_else(|| ModelError::ShortRow {
            relation: self.name.clone(),
            arity: self.arity,
            len: row.len(),
        })?;
        Ok(args.iter().map(|arg| normalize_argument(arg)).collect())
    }
}

/// Replace spaces with underscores. The engine's flat-file format has no
/// quoting, so a space-bearing constant cannot be represented directly.
pub fn normalize_argument(argument: &str) -> String {
    argument.replace(' ', "_")
}

/// Case-insensitive relation lookup by name.
pub fn find_relation<'a>(relations: &'a [Relation], name: &str) -> Option<&'a Relation> {
    relations
        .iter()
        .find(|relation| relation.name.eq_ignore_ascii_case(name))
}

/// Case-insensitive relation position lookup by name.
pub fn find_relation_index(relations: &[Relation], name: &str) -> Option<usize> {
    relations
        .iter()
        .position(|relation| relation.name.eq_ignore_ascii_case(name))
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A first-order logical implication over relations.
///
/// `weight: Some(w)` is a soft rule with weight `w`; `None` is a hard rule
/// (emitted with a trailing period, treated by the engine as a constraint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub text: String,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl Rule {
    pub fn weighted(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight: Some(weight),
        }
    }

    pub fn hard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: None,
        }
    }

    pub fn is_weighted(&self) -> bool {
        self.weight.is_some()
    }
}

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// An ordered set of relations and rules, the unit the bridge operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub relations: Vec<Relation>,
    pub rules: Vec<Rule>,
}

impl Problem {
    /// Load a problem from a JSON file.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| ModelError::Json {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_lookup_is_case_insensitive() {
        let relations = vec![Relation::new("Smokes", 1), Relation::new("Friends", 2)];

        assert_eq!(find_relation(&relations, "SMOKES").unwrap().name, "Smokes");
        assert_eq!(find_relation(&relations, "smokes").unwrap().name, "Smokes");
        assert_eq!(find_relation_index(&relations, "FRIENDS"), Some(1));
        assert!(find_relation(&relations, "Cancer").is_none());
    }

    #[test]
    fn key_slices_to_arity_and_normalizes_spaces() {
        let relation = Relation::new("Lives", 2);
        let row = vec!["alice".to_string(), "New York".to_string(), "0.9".to_string()];

        let key = relation.key_of(&row).unwrap();
        assert_eq!(key, vec!["alice".to_string(), "New_York".to_string()]);
    }

    #[test]
    fn short_row_is_rejected() {
        let relation = Relation::new("Friends", 2);
        let row = vec!["alice".to_string()];

        let err = relation.key_of(&row).unwrap_err();
        assert!(matches!(err, ModelError::ShortRow { arity: 2, len: 1, .. }));
    }

    #[test]
    fn problem_round_trips_through_json() {
        let problem = Problem {
            relations: vec![Relation {
                negative_prior_weight: Some(-0.5),
                observed: true,
                ..Relation::new("Smokes", 1)
            }],
            rules: vec![Rule::weighted("Smokes(x) -> Cancer(x)", 1.5), Rule::hard("Friends(x, y) -> Friends(y, x)")],
        };

        let json = serde_json::to_string(&problem).unwrap();
        let back: Problem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.relations[0].name, "Smokes");
        assert_eq!(back.relations[0].negative_prior_weight, Some(-0.5));
        assert_eq!(back.rules[0].weight, Some(1.5));
        assert!(!back.rules[1].is_weighted());
    }
}
