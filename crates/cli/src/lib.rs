//! `apiweave` command line: argument parsing, logging setup and the merge
//! run itself.

use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use apiweave_common::dotenv::DotenvFile;
use apiweave_common::{ConfigError, resolve_services};
use apiweave_core::{CommandGenerator, Pipeline, PipelineConfig, RunSummary};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_GENERATOR: &str = "npx";
const DEFAULT_GENERATOR_ARG: &str = "openapi-typescript-codegen";

/// Command line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "apiweave",
    version,
    about = "Merge per-service OpenAPI TypeScript clients into one de-duplicated client library",
    long_about = None
)]
pub struct Args {
    /// Output directory, wiped and regenerated on every run
    #[arg(long = "out-dir", value_name = "DIR", default_value = "src/api")]
    pub out_dir: PathBuf,

    /// Service id, optionally with an inline source (`id=url-or-path`)
    #[arg(
        long = "service",
        value_name = "ID",
        env = "APIWEAVE_SERVICES",
        value_delimiter = ',',
        required = true
    )]
    pub services: Vec<String>,

    /// Dotenv file holding `<ID>_OPENAPI_URL` variables
    #[arg(long = "env-file", value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Per-service client generator program
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_GENERATOR)]
    pub generator: String,

    /// Argument passed to the generator before its input/output flags
    #[arg(long = "generator-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub generator_args: Vec<String>,

    /// Timeout for fetching each OpenAPI document
    #[arg(long = "timeout-secs", value_name = "N", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Args {
    /// `npx openapi-typescript-codegen` unless told otherwise.
    pub fn command_generator(&self) -> CommandGenerator {
        let args = if self.generator == DEFAULT_GENERATOR && self.generator_args.is_empty() {
            vec![DEFAULT_GENERATOR_ARG.to_string()]
        } else {
            self.generator_args.clone()
        };
        CommandGenerator::new(self.generator.as_str(), args)
    }

    /// Build the pipeline configuration. Variables from `process_env` take
    /// precedence over the dotenv file.
    pub fn pipeline_config<F>(&self, process_env: F) -> Result<PipelineConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dotenv = DotenvFile::read(&self.env_file)?;
        debug!(path = %dotenv.path().display(), vars = dotenv.get_vars().len(), "Loaded dotenv file.");

        let services = resolve_services(&self.services, |var| {
            process_env(var).or_else(|| dotenv.get(var).map(str::to_string))
        })?;
        let mut config = PipelineConfig::new(self.out_dir.clone(), services);
        config.fetch_timeout = Duration::from_secs(self.timeout_secs);
        Ok(config)
    }
}

/// Resolve the configuration from `args` and the environment, then run one merge.
pub async fn run(args: Args) -> apiweave_core::Result<RunSummary> {
    let config = args.pipeline_config(|var| std::env::var(var).ok())?;
    let out_dir = config.out_dir.clone();
    let summary = Pipeline::new(config, args.command_generator()).run().await?;
    info!(
        out_dir = %out_dir.display(),
        merged = summary.record.merged.len(),
        renamed = summary.record.renamed.len(),
        aliases = summary.record.aliases.len(),
        "Wrote merged client."
    );
    Ok(summary)
}

/// Await `f` and turn its outcome into a process exit code.
pub async fn run_cli_async<F, Fut, T, E>(f: F) -> i32
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match f().await {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

/// Install the stderr `fmt` subscriber, filtered by `APIWEAVE_LOG`.
pub fn init_tracing() {
    // APIWEAVE_LOG takes a plain level ("debug") or a full filter spec.
    let filter = match std::env::var("APIWEAVE_LOG") {
        Ok(level) if is_plain_level(&level) => format!("apiweave_cli={level},apiweave_core={level}"),
        Ok(spec) => spec,
        Err(_) => "apiweave_cli=info,apiweave_core=info".to_string(),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("apiweave").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--service", "identity,booking"]);
        assert_eq!(args.out_dir, PathBuf::from("src/api"));
        assert_eq!(args.services, ["identity", "booking"]);
        assert_eq!(args.env_file, PathBuf::from(".env"));
        assert_eq!(args.timeout_secs, 30);
        assert_eq!(
            args.command_generator(),
            CommandGenerator::new("npx", vec!["openapi-typescript-codegen".to_string()])
        );
    }

    #[test]
    fn test_custom_generator() {
        let args = parse(&[
            "--service",
            "identity",
            "--service",
            "booking",
            "--generator",
            "node",
            "--generator-arg",
            "gen.js",
            "--generator-arg",
            "--client=axios",
        ]);
        assert_eq!(args.services.len(), 2);
        assert_eq!(
            args.command_generator(),
            CommandGenerator::new("node", vec!["gen.js".to_string(), "--client=axios".to_string()])
        );
    }

    #[test]
    fn test_process_env_wins_over_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(
            &env_file,
            "IDENTITY_OPENAPI_URL=specs/identity.json\nBOOKING_OPENAPI_URL=specs/booking-old.json\n",
        )
        .unwrap();
        let args = parse(&[
            "--service",
            "identity,booking",
            "--env-file",
            env_file.to_str().unwrap(),
            "--timeout-secs",
            "5",
        ]);
        let process: HashMap<&str, &str> = HashMap::from([("BOOKING_OPENAPI_URL", "http://localhost:8082/v3/api-docs")]);

        let config = args
            .pipeline_config(|var| process.get(var).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.services[0].source.to_string(), "specs/identity.json");
        assert_eq!(config.services[1].source.to_string(), "http://localhost:8082/v3/api-docs");
    }

    #[test]
    fn test_missing_address_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse(&[
            "--service",
            "identity,booking",
            "--env-file",
            dir.path().join("absent.env").to_str().unwrap(),
        ]);
        let err = args.pipeline_config(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref var, .. } if var == "IDENTITY_OPENAPI_URL"));
    }

    #[tokio::test]
    async fn test_exit_codes() {
        assert_eq!(run_cli_async(|| async { Ok::<_, String>(()) }).await, 0);
        assert_eq!(run_cli_async(|| async { Err::<(), _>("boom".to_string()) }).await, 1);
    }

    #[test]
    fn test_is_plain_level() {
        assert!(is_plain_level("DEBUG"));
        assert!(!is_plain_level("apiweave_core=trace"));
    }
}
