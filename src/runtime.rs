//! Engine execution: run Tuffy in a Docker container.
//!
//! The staged working directory is bind-mounted read-write at a fixed path
//! inside the container, the engine log is streamed line-by-line as it is
//! produced, and a non-zero exit is a hard failure — no retry, no partial
//! parse.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::RuntimeError;

/// Default image and container name for the engine.
pub const DEFAULT_ENGINE_TAG: &str = "mln-bridge.tuffy";

/// Mount point for the staged working directory inside the container.
pub const ENGINE_IO_DIR: &str = "/tuffy/io";

/// What the engine is asked to do with the staged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Learn rule and prior weights from the evidence.
    Learn,
    /// MAP inference: output is the most probable world, atoms only.
    MapInference,
    /// Marginal inference: output carries a probability per atom.
    MarginalInference,
}

impl Mode {
    /// Extra arguments appended to the engine invocation.
    pub fn engine_args(self) -> &'static [&'static str] {
        match self {
            Mode::Learn => &["-learnwt"],
            Mode::MapInference => &[],
            Mode::MarginalInference => &["-marginal"],
        }
    }
}

/// The seam between the bridge and the external engine.
///
/// Production uses [`DockerRuntime`]; tests substitute a stub that drops a
/// canned output file into the working directory.
pub trait TuffyRuntime {
    /// Run the engine against a staged working directory, blocking until it
    /// exits. Implementations must fail on abnormal termination so no output
    /// parsing is attempted afterwards.
    fn run(&self, workdir: &Path, mode: Mode) -> Result<(), RuntimeError>;
}

/// Runs the engine with `docker run`, the working directory bind-mounted at
/// [`ENGINE_IO_DIR`].
///
/// The tag doubles as the container name, making it a singleton resource:
/// any stale container with that name is removed before the run
/// (last-invocation-wins). Concurrent overlapping runs against the same tag
/// are not safe. There is also no execution deadline — a hung engine blocks
/// the caller indefinitely.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    tag: String,
}

impl DockerRuntime {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Remove any stale container holding our name.
    fn replace_named_container(&self) -> Result<(), RuntimeError> {
        let ps = Command::new("docker")
            .args(["ps", "-aq", "--filter"])
            .arg(format!("name=^/{}$", self.tag))
            .output()
            .map_err(|source| RuntimeError::Spawn {
                command: "docker ps".into(),
                source,
            })?;

        if String::from_utf8_lossy(&ps.stdout).trim().is_empty() {
            return Ok(());
        }

        tracing::debug!(name = %self.tag, "removing stale engine container");
        let status = Command::new("docker")
            .args(["rm", "-f", &self.tag])
            .stdout(Stdio::null())
            .status()
            .map_err(|source| RuntimeError::Spawn {
                command: "docker rm".into(),
                source,
            })?;
        if !status.success() {
            return Err(RuntimeError::Docker {
                message: format!("could not remove stale container '{}'", self.tag),
            });
        }
        Ok(())
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_TAG)
    }
}

impl TuffyRuntime for DockerRuntime {
    fn run(&self, workdir: &Path, mode: Mode) -> Result<(), RuntimeError> {
        self.replace_named_container()?;

        let mount = format!("{}:{}", workdir.display(), ENGINE_IO_DIR);
        let mut child = Command::new("docker")
            .args(["run", "--rm", "--name", &self.tag, "-v", &mount, &self.tag])
            .args(mode.engine_args())
            .stdout(Stdio::piped())
            // The engine's stderr passes straight through to the caller.
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: "docker run".into(),
                source,
            })?;

        // Stream the engine log as it is produced.
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = line.map_err(|e| RuntimeError::Docker {
                    message: format!("failed reading engine log: {e}"),
                })?;
                tracing::info!(target: "tuffy", "{line}");
            }
        }

        let status = child.wait().map_err(|source| RuntimeError::Spawn {
            command: "docker run".into(),
            source,
        })?;
        if !status.success() {
            return Err(RuntimeError::EngineFailed {
                status: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}
