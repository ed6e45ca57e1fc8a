//! # mln-bridge
//!
//! A translation and orchestration bridge between in-memory relational
//! models and the Tuffy Markov Logic Network engine. Relations (typed
//! predicates with observed and unobserved rows) and weighted or hard rules
//! go in; Tuffy runs in an isolated Docker container; learned weights and
//! per-atom inference results come back out.
//!
//! The flow is `model` → `program`/`facts` writers → `stage`d working
//! directory → `runtime` (Docker) → `parse` → results applied back onto the
//! model by the `bridge` facade.
//!
//! ## Library usage
//!
//! ```no_run
//! use mln_bridge::bridge::{BridgeConfig, TuffyBridge};
//! use mln_bridge::model::{Problem, Relation, Rule};
//!
//! let mut smokes = Relation::new("Smokes", 1);
//! smokes.observed_rows = vec![vec!["alice".into()]];
//! let mut cancer = Relation::new("Cancer", 1);
//! cancer.unobserved_rows = vec![vec!["alice".into()]];
//!
//! let problem = Problem {
//!     relations: vec![smokes, cancer],
//!     rules: vec![Rule::weighted("Smokes(X) -> Cancer(X)", 1.5)],
//! };
//! let bridge = TuffyBridge::with_docker(problem, BridgeConfig::default());
//! let solution = bridge.solve().unwrap();
//! ```

pub mod bridge;
pub mod error;
pub mod facts;
pub mod model;
pub mod parse;
pub mod program;
pub mod runtime;
pub mod stage;
pub mod types;
