//! Variable-type pre-flight and inference.
//!
//! The engine's program format declares a type per predicate column. Callers
//! may omit them; the pre-flight check reports which relations are untyped,
//! and the inference pass fills them in by unifying columns that share
//! constant values across the problem's data.

use std::collections::HashMap;

use crate::model::Relation;

/// Outcome of the pre-flight type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheck {
    /// Every relation has a type per column.
    Complete,
    /// These relations are missing `variable_types`.
    NeedsInference { missing: Vec<String> },
}

/// Scan the relation set for missing variable types.
pub fn check_variable_types(relations: &[Relation]) -> TypeCheck {
    let missing: Vec<String> = relations
        .iter()
        .filter(|relation| relation.variable_types.is_none())
        .map(|relation| relation.name.clone())
        .collect();

    if missing.is_empty() {
        TypeCheck::Complete
    } else {
        TypeCheck::NeedsInference { missing }
    }
}

/// Infer variable types for every relation that lacks them.
///
/// Two columns get the same type exactly when some constant appears in both,
/// transitively (union-find over (relation, column) slots). Classes are named
/// `t0`, `t1`, … in first-use order, so the same problem always infers the
/// same types. Relations with declared types keep them untouched.
pub fn infer_variable_types(relations: &mut [Relation]) {
    // Slot layout: one slot per (relation, column), relations in order.
    let mut base = Vec::with_capacity(relations.len());
    let mut total = 0;
    for relation in relations.iter() {
        base.push(total);
        total += relation.arity;
    }

    let mut parent: Vec<usize> = (0..total).collect();

    // Union slots that share a constant. First slot seen for a constant acts
    // as the anchor for all later occurrences.
    let mut anchor_of: HashMap<String, usize> = HashMap::new();
    for (index, relation) in relations.iter().enumerate() {
        let rows = relation
            .observed_rows
            .iter()
            .chain(relation.unobserved_rows.iter());
        for row in rows {
            for (column, value) in row.iter().take(relation.arity).enumerate() {
                let slot = base[index] + column;
                match anchor_of.get(value.as_str()).copied() {
                    Some(anchor) => union(&mut parent, anchor, slot),
                    None => {
                        anchor_of.insert(value.clone(), slot);
                    }
                }
            }
        }
    }

    // Name classes lazily, in the order untyped relations reference them.
    let mut names: HashMap<usize, String> = HashMap::new();
    let mut next = 0;
    for (index, relation) in relations.iter_mut().enumerate() {
        if relation.variable_types.is_some() {
            continue;
        }
        let types: Vec<String> = (0..relation.arity)
            .map(|column| {
                let root = find(&mut parent, base[index] + column);
                names
                    .entry(root)
                    .or_insert_with(|| {
                        let name = format!("t{next}");
                        next += 1;
                        name
                    })
                    .clone()
            })
            .collect();
        relation.variable_types = Some(types);
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[rb] = ra;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relation;

    fn with_rows(mut relation: Relation, observed: &[&[&str]], unobserved: &[&[&str]]) -> Relation {
        relation.observed_rows = observed
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect();
        relation.unobserved_rows = unobserved
            .iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect();
        relation
    }

    #[test]
    fn complete_when_all_relations_typed() {
        let mut relation = Relation::new("Smokes", 1);
        relation.variable_types = Some(vec!["person".into()]);
        assert_eq!(check_variable_types(&[relation]), TypeCheck::Complete);
    }

    #[test]
    fn reports_untyped_relations_by_name() {
        let mut typed = Relation::new("Smokes", 1);
        typed.variable_types = Some(vec!["person".into()]);
        let untyped = Relation::new("Friends", 2);

        let check = check_variable_types(&[typed, untyped]);
        assert_eq!(
            check,
            TypeCheck::NeedsInference {
                missing: vec!["Friends".into()]
            }
        );
    }

    #[test]
    fn columns_sharing_constants_unify() {
        let smokes = with_rows(Relation::new("Smokes", 1), &[&["alice"]], &[]);
        let friends = with_rows(
            Relation::new("Friends", 2),
            &[&["alice", "bob"]],
            &[&["bob", "carol"]],
        );
        let mut relations = vec![smokes, friends];

        infer_variable_types(&mut relations);

        // "alice" ties Smokes/0 to Friends/0, "bob" ties Friends/0 to Friends/1.
        assert_eq!(relations[0].variable_types, Some(vec!["t0".into()]));
        assert_eq!(
            relations[1].variable_types,
            Some(vec!["t0".into(), "t0".into()])
        );
    }

    #[test]
    fn disjoint_columns_get_distinct_types() {
        let lives = with_rows(Relation::new("Lives", 2), &[&["alice", "New York"]], &[]);
        let mut relations = vec![lives];

        infer_variable_types(&mut relations);
        assert_eq!(
            relations[0].variable_types,
            Some(vec!["t0".into(), "t1".into()])
        );
    }

    #[test]
    fn declared_types_are_untouched() {
        let mut typed = with_rows(Relation::new("Smokes", 1), &[&["alice"]], &[]);
        typed.variable_types = Some(vec!["person".into()]);
        let untyped = with_rows(Relation::new("Cancer", 1), &[&["alice"]], &[]);
        let mut relations = vec![typed, untyped];

        infer_variable_types(&mut relations);
        assert_eq!(relations[0].variable_types, Some(vec!["person".into()]));
        assert_eq!(relations[1].variable_types, Some(vec!["t0".into()]));
    }

    #[test]
    fn inference_is_deterministic() {
        let build = || {
            vec![
                with_rows(Relation::new("A", 2), &[&["x", "y"]], &[]),
                with_rows(Relation::new("B", 2), &[&["y", "z"]], &[]),
            ]
        };
        let mut first = build();
        let mut second = build();
        infer_variable_types(&mut first);
        infer_variable_types(&mut second);

        assert_eq!(first[0].variable_types, second[0].variable_types);
        assert_eq!(first[1].variable_types, second[1].variable_types);
    }
}
