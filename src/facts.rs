//! Evidence and query writers: ground facts to Tuffy's .db syntax.
//!
//! One fact per line, first `arity` columns only. Evidence rows may carry a
//! trailing soft weight, emitted as a leading float on the line.

use std::fmt::Write as _;

use crate::error::ModelError;
use crate::model::Relation;

/// Write the evidence file: every observed row of every relation.
pub fn write_evidence(relations: &[Relation]) -> Result<String, ModelError> {
    let mut evidence = String::new();

    for relation in relations {
        if !relation.has_observed_data() {
            continue;
        }

        for row in &relation.observed_rows {
            let key = relation.key_of(row)?;
            let fact = format!("{}({})", relation.name, key.join(", "));

            if row.len() > relation.arity {
                let raw = &row[row.len() - 1];
                let weight: f64 = raw.parse().map_err(|_| ModelError::BadSoftWeight {
                    relation: relation.name.clone(),
                    value: raw.clone(),
                })?;
                writeln!(evidence, "{weight:.6} {fact}").unwrap();
            } else {
                writeln!(evidence, "{fact}").unwrap();
            }
        }
    }

    Ok(evidence)
}

/// Write the query file: every unobserved row of every relation.
pub fn write_query(relations: &[Relation]) -> Result<String, ModelError> {
    let mut query = String::new();

    for relation in relations {
        if !relation.has_unobserved_data() {
            continue;
        }

        for row in &relation.unobserved_rows {
            let key = relation.key_of(row)?;
            writeln!(query, "{}({})", relation.name, key.join(", ")).unwrap();
        }
    }

    Ok(query)
}
