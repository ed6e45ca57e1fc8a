//! Parsers for the engine's two output grammars.
//!
//! Learn mode: everything before the `WEIGHT OF LAST ITERATION` marker is
//! engine chatter and ignored; after it, every non-blank line must be a
//! prior, a soft rule, or a hard rule — first match wins, in that order, and
//! anything else is a hard parse failure carrying the offending line.
//! Infer mode: tab-delimited atoms with an optional probability column.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::model::{find_relation, find_relation_index, Relation};

/// Learn-mode output section marker. Lines above it are ignored.
pub const WEIGHT_MARKER: &str = "WEIGHT OF LAST ITERATION";

// ── Learn-mode line grammars ────────────────────────────────────────────

static RE_PRIOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+(?:\.\d+))\s+!(\w+)\([^)]+\)\s+//(\d+\.0)$").unwrap());

static RE_SOFT_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+(?:\.\d+))\s+.+?\s+//(\d+\.0)$").unwrap());

static RE_HARD_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \. //(\d+\.0)hardfixed$").unwrap());

/// A learned per-rule outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LearnedWeight {
    /// Soft rule with a learned weight.
    Weight(f64),
    /// Hard rule, weight fixed by the engine.
    Fixed,
}

/// Learned weights in original rule order, plus per-relation priors.
#[derive(Debug, Clone)]
pub struct ParsedWeights {
    /// One entry per input rule, index-aligned with the rule sequence.
    pub rules: Vec<LearnedWeight>,
    /// (relation index, learned negative prior weight) pairs.
    pub priors: Vec<(usize, f64)>,
}

/// Parse learn-mode output into per-rule weights and per-relation priors.
///
/// `rule_count` is the number of rules that were emitted into the program;
/// every one of them must come back with a weight or a hardfixed marker.
pub fn parse_weights(
    output: &str,
    relations: &[Relation],
    rule_count: usize,
) -> Result<ParsedWeights, ParseError> {
    let mut slots: Vec<Option<LearnedWeight>> = vec![None; rule_count];
    let mut priors = Vec::new();
    let mut seeking_marker = true;

    for raw in output.lines() {
        if seeking_marker {
            if raw.contains(WEIGHT_MARKER) {
                seeking_marker = false;
            }
            continue;
        }

        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(captures) = RE_PRIOR.captures(line) {
            let weight: f64 = captures[1].parse().unwrap();
            let name = &captures[2];
            let index = find_relation_index(relations, name).ok_or_else(|| {
                ParseError::UnknownRelation {
                    name: name.to_string(),
                    line: line.to_string(),
                }
            })?;
            priors.push((index, weight));
            continue;
        }

        if let Some(captures) = RE_SOFT_RULE.captures(line) {
            let weight: f64 = captures[1].parse().unwrap();
            let slot = rule_slot(&captures[2], rule_count, line)?;
            slots[slot] = Some(LearnedWeight::Weight(weight));
            continue;
        }

        if let Some(captures) = RE_HARD_RULE.captures(line) {
            let slot = rule_slot(&captures[1], rule_count, line)?;
            slots[slot] = Some(LearnedWeight::Fixed);
            continue;
        }

        return Err(ParseError::MalformedLine {
            line: line.to_string(),
        });
    }

    let rules = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or(ParseError::MissingRuleWeight { index }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedWeights { rules, priors })
}

/// Decode a float-encoded 1-based rule index (`3.0` → slot 2).
fn rule_slot(capture: &str, rule_count: usize, line: &str) -> Result<usize, ParseError> {
    let index = capture.parse::<f64>().unwrap() as usize;
    let slot = index.checked_sub(1).filter(|slot| *slot < rule_count);
    slot.ok_or_else(|| ParseError::RuleIndexOutOfRange {
        index,
        rule_count,
        line: line.to_string(),
    })
}

// ── Infer-mode results ──────────────────────────────────────────────────

/// Inference results: canonical relation name → argument tuple → value.
pub type InferenceResults = BTreeMap<String, HashMap<Vec<String>, f64>>;

/// Parse infer-mode output.
///
/// With `with_probabilities` each line is `atom\t<probability>`; without it,
/// a listed atom is asserted true with value 1.0. Atoms whose predicate is
/// not in the relation set are skipped — the engine may report predicates we
/// do not track.
pub fn parse_results(
    output: &str,
    relations: &[Relation],
    with_probabilities: bool,
) -> Result<InferenceResults, ParseError> {
    let mut results = InferenceResults::new();

    for raw in output.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split('\t');
        let atom = parts.next().unwrap_or_default();
        let value = if with_probabilities {
            parts
                .next()
                .and_then(|field| field.parse::<f64>().ok())
                .ok_or_else(|| ParseError::BadResultLine {
                    line: line.to_string(),
                })?
        } else {
            1.0
        };

        let (predicate, arguments) = match atom.split_once('(') {
            Some((predicate, rest)) => (predicate, rest),
            None => (atom, ""),
        };
        let Some(relation) = find_relation(relations, predicate) else {
            continue;
        };

        let arguments: Vec<String> = arguments
            .trim_end_matches(')')
            .replace('"', "")
            .split(", ")
            .map(str::to_string)
            .collect();

        results
            .entry(relation.name.clone())
            .or_default()
            .insert(arguments, value);
    }

    Ok(results)
}
