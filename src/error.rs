//! Diagnostic error types for the bridge.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Engine output that cannot
//! be parsed is always surfaced with the offending line intact.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the bridge.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Runtime(#[from] RuntimeError),
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("failed to read problem file {path}: {source}")]
    #[diagnostic(
        code(mln::model::io),
        help("Check that the path exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid problem JSON in {path}: {message}")]
    #[diagnostic(
        code(mln::model::json),
        help(
            "A problem file is a JSON object with `relations` and `rules` arrays. \
             See the serde derives on `Relation` and `Rule` for the exact fields."
        )
    )]
    Json { path: String, message: String },

    #[error("relation {relation} has no variable types declared")]
    #[diagnostic(
        code(mln::model::missing_types),
        help(
            "Tuffy predicate declarations need a type per column. Declare \
             `variable_types` on the relation, or let the pre-flight type \
             inference pass run before writing the program."
        )
    )]
    MissingVariableTypes { relation: String },

    #[error("row in relation {relation} has {len} column(s), need at least {arity}")]
    #[diagnostic(
        code(mln::model::short_row),
        help(
            "Every row must carry one value per declared column. Observed rows \
             may carry one extra trailing column holding a soft weight."
        )
    )]
    ShortRow {
        relation: String,
        arity: usize,
        len: usize,
    },

    #[error("bad soft weight {value:?} on observed row in relation {relation}")]
    #[diagnostic(
        code(mln::model::bad_soft_weight),
        help("The trailing extra column of an observed row must parse as a float.")
    )]
    BadSoftWeight { relation: String, value: String },
}

// ---------------------------------------------------------------------------
// Engine-output parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unknown relation {name} in learned prior: '{line}'")]
    #[diagnostic(
        code(mln::parse::unknown_relation),
        help(
            "The engine reported a prior for a predicate that is not in the \
             relation set. Relation names are matched case-insensitively, so \
             this usually means the program and the model went out of sync."
        )
    )]
    UnknownRelation { name: String, line: String },

    #[error("could not parse learned weight from engine output line: '{line}'")]
    #[diagnostic(
        code(mln::parse::malformed_line),
        help(
            "After the WEIGHT OF LAST ITERATION marker every non-blank line \
             must be a prior, a soft rule ending in '//<n>.0', or a hard rule \
             ending in '//<n>.0hardfixed'. This line is none of those."
        )
    )]
    MalformedLine { line: String },

    #[error("rule index {index} out of range (program has {rule_count} rule(s)): '{line}'")]
    #[diagnostic(
        code(mln::parse::rule_index),
        help(
            "The trailing //<n>.0 comment indexes rules 1..=N in program order. \
             An index outside that range means the output does not belong to \
             the program that was staged."
        )
    )]
    RuleIndexOutOfRange {
        index: usize,
        rule_count: usize,
        line: String,
    },

    #[error("engine output assigned no weight to rule {index}")]
    #[diagnostic(
        code(mln::parse::missing_weight),
        help(
            "Every rule emitted into the program must come back with a learned \
             weight or a hardfixed marker. Either the WEIGHT OF LAST ITERATION \
             marker was missing from the output or the engine dropped a rule."
        )
    )]
    MissingRuleWeight { index: usize },

    #[error("could not parse inference result line: '{line}'")]
    #[diagnostic(
        code(mln::parse::bad_result),
        help("A marginal-mode result line is '<atom>\\t<probability>' with a float probability.")
    )]
    BadResultLine { line: String },
}

// ---------------------------------------------------------------------------
// Runtime errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    #[error("failed to stage {path}: {source}")]
    #[diagnostic(
        code(mln::runtime::stage),
        help("Check free disk space and permissions on the system temp directory.")
    )]
    Stage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {command}: {source}")]
    #[diagnostic(
        code(mln::runtime::spawn),
        help("Check that the docker CLI is installed and on PATH.")
    )]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("docker error: {message}")]
    #[diagnostic(
        code(mln::runtime::docker),
        help(
            "The container with our name could not be replaced. A previous run \
             may still be holding it; `docker ps -a` will show it."
        )
    )]
    Docker { message: String },

    #[error("engine exited with status {status}")]
    #[diagnostic(
        code(mln::runtime::engine_failed),
        help(
            "The engine log was streamed above. Re-run with the working \
             directory retained to inspect the staged input files."
        )
    )]
    EngineFailed { status: i32 },

    #[error("engine produced no readable output at {path}: {source}")]
    #[diagnostic(
        code(mln::runtime::output),
        help(
            "The engine exited cleanly but the expected output file is missing \
             or unreadable. The container may not have written to the mounted \
             IO directory."
        )
    )]
    OutputUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning bridge results.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_converts_to_bridge_error() {
        let err = ModelError::MissingVariableTypes {
            relation: "Smokes".into(),
        };
        let bridge: BridgeError = err.into();
        assert!(matches!(
            bridge,
            BridgeError::Model(ModelError::MissingVariableTypes { .. })
        ));
    }

    #[test]
    fn parse_error_converts_to_bridge_error() {
        let err = ParseError::MalformedLine {
            line: "garbage".into(),
        };
        let bridge: BridgeError = err.into();
        assert!(matches!(
            bridge,
            BridgeError::Parse(ParseError::MalformedLine { .. })
        ));
    }

    #[test]
    fn error_messages_carry_the_offending_line() {
        let err = ParseError::UnknownRelation {
            name: "FRIENDS".into(),
            line: "1.5 !FRIENDS(a, b) //3.0".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("FRIENDS"));
        assert!(msg.contains("//3.0"));
    }
}
