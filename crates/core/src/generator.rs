//! Boundary to the external per-service TypeScript client generator.

use std::future::Future;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MergeError, Result};

/// Turns one OpenAPI document into a `core/`, `models/`, `schemas/`,
/// `services/` tree under `out_dir`.
pub trait ClientGenerator {
    /// Generate the client for `service` from the document at `spec_path`.
    fn generate(
        &self,
        service: &str,
        spec_path: &Path,
        out_dir: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Closures act as in-process generators.
impl<F> ClientGenerator for F
where
    F: Fn(&str, &Path, &Path) -> Result<()> + Sync,
{
    fn generate(
        &self,
        service: &str,
        spec_path: &Path,
        out_dir: &Path,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = self(service, spec_path, out_dir);
        async move { result }
    }
}

/// Runs an external program, `npx openapi-typescript-codegen` by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl Default for CommandGenerator {
    fn default() -> Self {
        Self::new("npx", vec!["openapi-typescript-codegen".to_string()])
    }
}

impl CommandGenerator {
    /// Run `program` with `args` ahead of the input and output flags.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl ClientGenerator for CommandGenerator {
    fn generate(
        &self,
        service: &str,
        spec_path: &Path,
        out_dir: &Path,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--input")
            .arg(spec_path)
            .arg("--output")
            .arg(out_dir)
            .arg("--exportSchemas")
            .arg("true");
        let service = service.to_string();
        let program = self.program.clone();

        async move {
            debug!(service = %service, program = %program, "Running client generator.");
            let output = command.output().await.map_err(|err| MergeError::Generator {
                service: service.clone(),
                reason: format!("failed to run {program}: {err}"),
            })?;

            let stderr = String::from_utf8_lossy(&output.stderr);
            if !output.status.success() {
                return Err(MergeError::Generator {
                    service,
                    reason: format!("{program} exited with {}: {}", output.status, stderr.trim()),
                });
            }
            if !stderr.trim().is_empty() {
                warn!(service = %service, stderr = %stderr.trim(), "Client generator wrote to stderr.");
            }
            Ok(())
        }
    }
}
