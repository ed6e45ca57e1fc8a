//! Bridge facade: `learn` and `solve` over a relation/rule set.
//!
//! Owns the full round trip: stage input files, run the engine, parse its
//! output, and fold the results back onto the model. All fatal conditions
//! abort the whole call — no partial results are ever returned.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{BridgeResult, RuntimeError};
use crate::model::{Problem, Relation, Rule};
use crate::parse::{self, LearnedWeight};
use crate::runtime::{DockerRuntime, Mode, TuffyRuntime, DEFAULT_ENGINE_TAG};
use crate::stage::Workdir;
use crate::types::{self, TypeCheck};
use crate::{facts, program};

/// Configuration for a bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Docker image tag, doubling as the container name.
    pub engine_tag: String,
    /// Ask the engine for marginal probabilities instead of a MAP state.
    pub marginal: bool,
    /// Keep the staged working directory on disk after the run.
    pub retain_files: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine_tag: DEFAULT_ENGINE_TAG.to_string(),
            marginal: false,
            retain_files: false,
        }
    }
}

/// One result row per query row: the key columns plus the inferred value.
///
/// A key the engine did not report comes back with value 0.0 — absent means
/// not concluded true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveRow {
    pub key: Vec<String>,
    pub value: f64,
}

/// Inference results per relation with unobserved data, keyed by canonical
/// relation name.
pub type Solution = BTreeMap<String, Vec<SolveRow>>;

/// The three generated engine input files, for inspection without a run.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedInputs {
    pub program: String,
    pub evidence: String,
    pub query: String,
}

/// Translates a relational problem into engine input, runs the engine, and
/// translates its output back.
pub struct TuffyBridge {
    relations: Vec<Relation>,
    rules: Vec<Rule>,
    config: BridgeConfig,
    runtime: Box<dyn TuffyRuntime>,
}

impl TuffyBridge {
    /// Build a bridge over the given model with an explicit runtime.
    ///
    /// Pre-flight: relations without declared variable types trigger a
    /// warning and a type-inference pass — the engine's program format
    /// cannot be written without them.
    pub fn new(
        mut relations: Vec<Relation>,
        rules: Vec<Rule>,
        config: BridgeConfig,
        runtime: Box<dyn TuffyRuntime>,
    ) -> Self {
        if let TypeCheck::NeedsInference { missing } = types::check_variable_types(&relations) {
            tracing::warn!(
                relations = %missing.join(", "),
                "required variable types are missing, inferring types"
            );
            types::infer_variable_types(&mut relations);
        }

        tracing::info!(
            relations = relations.len(),
            rules = rules.len(),
            engine = %config.engine_tag,
            "initializing tuffy bridge"
        );

        Self {
            relations,
            rules,
            config,
            runtime,
        }
    }

    /// Build a bridge backed by the Docker runtime from the config's tag.
    pub fn with_docker(problem: Problem, config: BridgeConfig) -> Self {
        let runtime = Box::new(DockerRuntime::new(config.engine_tag.clone()));
        Self::new(problem.relations, problem.rules, config, runtime)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Render the program, evidence, and query text without running anything.
    pub fn rendered(&self) -> BridgeResult<RenderedInputs> {
        Ok(RenderedInputs {
            program: program::write_program(&self.relations, &self.rules)?,
            evidence: facts::write_evidence(&self.relations)?,
            query: facts::write_query(&self.relations)?,
        })
    }

    /// Learn rule and prior weights, applying them onto the model in place.
    pub fn learn(&mut self) -> BridgeResult<()> {
        let workdir = Workdir::stage(&self.relations, &self.rules, self.config.retain_files)?;
        self.runtime.run(workdir.path(), Mode::Learn)?;

        let output = read_output(&workdir)?;
        let parsed = parse::parse_weights(&output, &self.relations, self.rules.len())?;

        for (rule, learned) in self.rules.iter_mut().zip(&parsed.rules) {
            rule.weight = match learned {
                LearnedWeight::Weight(weight) => Some(*weight),
                LearnedWeight::Fixed => None,
            };
        }
        for (index, weight) in parsed.priors {
            self.relations[index].negative_prior_weight = Some(weight);
        }

        Ok(())
    }

    /// Run inference and return one result row per query row.
    pub fn solve(&self) -> BridgeResult<Solution> {
        let workdir = Workdir::stage(&self.relations, &self.rules, self.config.retain_files)?;
        let mode = if self.config.marginal {
            Mode::MarginalInference
        } else {
            Mode::MapInference
        };
        self.runtime.run(workdir.path(), mode)?;

        let output = read_output(&workdir)?;
        let raw = parse::parse_results(&output, &self.relations, self.config.marginal)?;

        let mut solution = Solution::new();
        for relation in &self.relations {
            if !relation.has_unobserved_data() {
                continue;
            }

            let reported = raw.get(&relation.name);
            let mut rows = Vec::with_capacity(relation.unobserved_rows.len());
            for row in &relation.unobserved_rows {
                let key = relation.key_of(row)?;
                let value = reported
                    .and_then(|by_key| by_key.get(&key))
                    .copied()
                    .unwrap_or(0.0);
                rows.push(SolveRow { key, value });
            }
            solution.insert(relation.name.clone(), rows);
        }

        Ok(solution)
    }
}

fn read_output(workdir: &Workdir) -> BridgeResult<String> {
    let path = workdir.output_path();
    std::fs::read_to_string(&path).map_err(|source| {
        RuntimeError::OutputUnreadable {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::stage::OUTPUT_FILENAME;
    use std::path::Path;

    /// Stands in for the engine: asserts the requested mode and drops a
    /// canned output file into the working directory.
    struct StubRuntime {
        expect_mode: Mode,
        output: String,
    }

    impl TuffyRuntime for StubRuntime {
        fn run(&self, workdir: &Path, mode: Mode) -> Result<(), RuntimeError> {
            assert_eq!(mode, self.expect_mode);
            std::fs::write(workdir.join(OUTPUT_FILENAME), &self.output).unwrap();
            Ok(())
        }
    }

    struct FailingRuntime;

    impl TuffyRuntime for FailingRuntime {
        fn run(&self, _workdir: &Path, _mode: Mode) -> Result<(), RuntimeError> {
            Err(RuntimeError::EngineFailed { status: 137 })
        }
    }

    fn smokers_relations() -> Vec<Relation> {
        let mut smokes = Relation::new("Smokes", 1);
        smokes.variable_types = Some(vec!["person".into()]);
        smokes.observed_rows = vec![vec!["alice".into()]];
        let mut cancer = Relation::new("Cancer", 1);
        cancer.variable_types = Some(vec!["person".into()]);
        cancer.unobserved_rows = vec![vec!["alice".into()], vec!["bob".into()]];
        vec![smokes, cancer]
    }

    fn smokers_rules() -> Vec<Rule> {
        vec![
            Rule::weighted("Smokes(X) -> Cancer(X)", 1.0),
            Rule::hard("Cancer(X) -> Smokes(X)"),
        ]
    }

    fn bridge_with(runtime: Box<dyn TuffyRuntime>, marginal: bool) -> TuffyBridge {
        TuffyBridge::new(
            smokers_relations(),
            smokers_rules(),
            BridgeConfig {
                marginal,
                ..Default::default()
            },
            runtime,
        )
    }

    #[test]
    fn learn_applies_weights_back_in_rule_order() {
        let output = "noise\nWEIGHT OF LAST ITERATION\n\
                      2.750000 Smokes(x) => Cancer(x) //1.0\n\
                      Cancer(x) => Smokes(x) . //2.0hardfixed\n\
                      -0.500000 !Smokes(a) //3.0\n";
        let mut bridge = bridge_with(
            Box::new(StubRuntime {
                expect_mode: Mode::Learn,
                output: output.into(),
            }),
            false,
        );

        bridge.learn().unwrap();

        assert_eq!(bridge.rules()[0].weight, Some(2.75));
        assert_eq!(bridge.rules()[1].weight, None);
        assert_eq!(bridge.relations()[0].negative_prior_weight, Some(-0.5));
    }

    #[test]
    fn solve_maps_reported_atoms_and_defaults_to_zero() {
        let bridge = bridge_with(
            Box::new(StubRuntime {
                expect_mode: Mode::MapInference,
                output: "Cancer(alice)\n".into(),
            }),
            false,
        );

        let solution = bridge.solve().unwrap();
        let rows = &solution["Cancer"];

        assert_eq!(rows[0], SolveRow { key: vec!["alice".into()], value: 1.0 });
        assert_eq!(rows[1], SolveRow { key: vec!["bob".into()], value: 0.0 });
    }

    #[test]
    fn marginal_config_switches_mode_and_parses_probabilities() {
        let bridge = bridge_with(
            Box::new(StubRuntime {
                expect_mode: Mode::MarginalInference,
                output: "Cancer(alice)\t0.73\n".into(),
            }),
            true,
        );

        let solution = bridge.solve().unwrap();
        assert_eq!(solution["Cancer"][0].value, 0.73);
        assert_eq!(solution["Cancer"][1].value, 0.0);
    }

    #[test]
    fn engine_failure_aborts_without_parsing() {
        let mut bridge = bridge_with(Box::new(FailingRuntime), false);

        let err = bridge.learn().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Runtime(RuntimeError::EngineFailed { status: 137 })
        ));
        // Weights untouched.
        assert_eq!(bridge.rules()[0].weight, Some(1.0));
    }

    #[test]
    fn untyped_relations_are_inferred_on_construction() {
        let mut smokes = Relation::new("Smokes", 1);
        smokes.observed_rows = vec![vec!["alice".into()]];
        let bridge = TuffyBridge::new(
            vec![smokes],
            vec![],
            BridgeConfig::default(),
            Box::new(FailingRuntime),
        );

        assert!(bridge.relations()[0].variable_types.is_some());
    }
}
