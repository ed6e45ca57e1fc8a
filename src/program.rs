//! Program writer: relations and rules to Tuffy's .mln syntax.
//!
//! Layout: predicate declarations, blank line, rule lines, and (only when a
//! relation carries a negative prior) a further blank line plus one prior
//! rule per such relation. Emission order is load-bearing — the 1-based rule
//! position is the index Tuffy echoes back in its learned-weight comments.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ModelError;
use crate::model::{Relation, Rule};

/// `, (X != Y)` inequality guards, stripped before emission. Tuffy has no
/// inline disequality syntax, so any rule relying on the guard loses it —
/// a known fidelity gap of the translation, kept rather than papered over.
static RE_INEQUALITY_GUARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\(\w+\s*!=\s*\w+\)").unwrap());

const PRIOR_VARIABLES: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Write the full program text for an ordered relation and rule set.
pub fn write_program(relations: &[Relation], rules: &[Rule]) -> Result<String, ModelError> {
    let mut program = String::new();
    let mut has_prior = false;

    for relation in relations {
        has_prior |= relation.has_negative_prior_weight();

        let types = relation
            .variable_types
            .as_ref()
            .ok_or_else(|| ModelError::MissingVariableTypes {
                relation: relation.name.clone(),
            })?;
        if relation.observed {
            program.push('*');
        }
        writeln!(program, "{}({})", relation.name, types.join(", ")).unwrap();
    }

    program.push('\n');

    for rule in rules {
        let text = normalize_rule_text(&rule.text, relations);
        match rule.weight {
            Some(weight) => writeln!(program, "{weight:.6} {text}").unwrap(),
            None => writeln!(program, "{text} .").unwrap(),
        }
    }

    if has_prior {
        program.push('\n');
        for relation in relations {
            if let Some(weight) = relation.negative_prior_weight {
                writeln!(
                    program,
                    "{weight:.6} !{}({})",
                    relation.name,
                    prior_variables(relation.arity)
                )
                .unwrap();
            }
        }
    }

    Ok(program)
}

/// Normalize free-text rule syntax into what the engine accepts.
///
/// In order: logical AND becomes `,`, both implication spellings become
/// `=>`, inequality guards are stripped, then the whole rule is folded to
/// lowercase (Tuffy requires lowercase variables) and each declared relation
/// name is re-cased to its canonical form, in declaration order.
pub fn normalize_rule_text(text: &str, relations: &[Relation]) -> String {
    let rule = text.replace('&', ",").replace("->", "=>").replace(" = ", " => ");
    let rule = RE_INEQUALITY_GUARD.replace_all(&rule, "");

    let mut rule = rule.to_lowercase();
    for relation in relations {
        rule = rule.replace(&relation.name.to_lowercase(), &relation.name);
    }
    rule
}

/// `a, b, c, …` sized to the arity, for prior rules over anonymous variables.
fn prior_variables(arity: usize) -> String {
    let letters: Vec<String> = PRIOR_VARIABLES
        .iter()
        .take(arity)
        .map(|letter| (*letter as char).to_string())
        .collect();
    letters.join(", ")
}
