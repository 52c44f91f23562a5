//! End-to-end merge run.

use std::path::PathBuf;
use std::time::Duration;

use apiweave_common::ServiceSource;
use tracing::{debug, info};

use crate::client::write_clients;
use crate::collision::resolve_collisions;
use crate::enums::{EnumRegistry, LiftReport, harvest_enums, lift_enums, reserved_model_names};
use crate::envelope::{EnvelopeAlias, collapse_envelopes};
use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::generator::ClientGenerator;
use crate::layout::OutputLayout;
use crate::loader::{DEFAULT_FETCH_TIMEOUT, SpecDocument, SpecLoader};
use crate::migration::{MigrationRecord, write_record};
use crate::relocation::RelocationMap;
use crate::rewrite::{RewriteReport, rewrite_tree};
use crate::runtime::{bind_services, extract_runtime};
use crate::shared::{SharedSummary, detect_shared, relocate_shared};
use crate::types_index::write_types_index;

/// Inputs of one merge run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Output root; wiped at the start of every run.
    pub out_dir: PathBuf,
    /// Services in run order. Order decides which copy of a shared file is kept.
    pub services: Vec<ServiceSource>,
    /// Per-document fetch timeout.
    pub fetch_timeout: Duration,
}

impl PipelineConfig {
    /// Configuration with the default fetch timeout.
    pub fn new(out_dir: impl Into<PathBuf>, services: Vec<ServiceSource>) -> Self {
        Self {
            out_dir: out_dir.into(),
            services,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// What a run did, step by step.
#[derive(Debug)]
pub struct RunSummary {
    /// Shared and conflicting artifacts found.
    pub shared: SharedSummary,
    /// Shared artifacts moved to `common/`.
    pub relocated: usize,
    /// Per-service copies renamed to resolve collisions.
    pub renamed: usize,
    /// Canonical enums written to `types/index.ts`.
    pub enums: EnumRegistry,
    /// Enum lifting counts.
    pub lift: LiftReport,
    /// Envelope models collapsed to aliases.
    pub aliases: Vec<EnvelopeAlias>,
    /// Combined runtime module.
    pub runtime: PathBuf,
    /// Service classes bound to the runtime config.
    pub bound_services: usize,
    /// Import rewriting counts.
    pub rewrite: RewriteReport,
    /// Per-service entry files written.
    pub clients: Vec<PathBuf>,
    /// Audit trail written to `migration.json`.
    pub record: MigrationRecord,
}

/// The full merge, parameterized over the client generator.
#[derive(Debug)]
pub struct Pipeline<G> {
    config: PipelineConfig,
    generator: G,
}

impl<G: ClientGenerator> Pipeline<G> {
    /// Pipeline for `config` using `generator` per service.
    pub fn new(config: PipelineConfig, generator: G) -> Self {
        Self { config, generator }
    }

    /// Run every step in order. The output directory is reset first.
    pub async fn run(&self) -> Result<RunSummary> {
        let layout = OutputLayout::new(self.config.out_dir.clone());
        let services: Vec<String> = self.config.services.iter().map(|s| s.id.clone()).collect();
        info!(out_dir = %layout.root().display(), services = ?services, "Starting merge run.");

        fsutil::reset_dir(layout.root())?;
        let loader = SpecLoader::new(self.config.fetch_timeout)?;
        let docs = loader.load_all(&self.config.services).await?;
        self.generate_all(&layout, &docs).await?;

        let shared = detect_shared(&layout, &services)?;
        let mut map = RelocationMap::new();
        let mut record = MigrationRecord::default();
        let relocated = relocate_shared(&layout, &services, &shared, &mut map, &mut record)?;
        let renamed = resolve_collisions(&layout, &shared, &mut map, &mut record)?;

        let reserved = reserved_model_names(&layout, &services, &docs)?;
        let mut enums = harvest_enums(&docs, reserved)?;
        let lift = lift_enums(&layout, &services, &mut enums, &mut map)?;
        let aliases = collapse_envelopes(&layout, &services, &mut map, &mut record)?;

        let runtime = extract_runtime(&layout, &services, &mut map)?;
        let bound_services = bind_services(&layout, &services)?;

        // Alias payloads may still name pre-rename paths; the rewrite fixes them.
        write_types_index(&layout, &services, &enums, &aliases)?;
        let rewrite = rewrite_tree(layout.root(), &map)?;
        let clients = write_clients(&layout, &services)?;

        fsutil::remove_dir_all(&layout.specs_dir())?;
        fsutil::prune_empty_dirs(layout.root())?;
        write_record(&layout.migration_record(), &services, &record)?;

        info!(
            shared = shared.shared_count(),
            renamed,
            enums = enums.len(),
            aliases = aliases.len(),
            unresolved = rewrite.unresolved.len(),
            "Merge run complete."
        );
        Ok(RunSummary {
            shared,
            relocated,
            renamed,
            enums,
            lift,
            aliases,
            runtime,
            bound_services,
            rewrite,
            clients,
            record,
        })
    }

    /// Persist each document under `.specs/` and run the generator on it.
    /// Generation is sequential.
    async fn generate_all(&self, layout: &OutputLayout, docs: &[SpecDocument]) -> Result<()> {
        for doc in docs {
            let spec_path = layout.spec_file(&doc.service_id);
            let json = serde_json::to_string_pretty(&doc.root).map_err(|err| {
                MergeError::Parse {
                    origin: spec_path.display().to_string(),
                    reason: err.to_string(),
                }
            })?;
            fsutil::write(&spec_path, &json)?;

            let out_dir = layout.service_dir(&doc.service_id);
            self.generator.generate(&doc.service_id, &spec_path, &out_dir).await?;

            // The barrel written later replaces the generator's own index.
            let index = out_dir.join("index.ts");
            if index.is_file() {
                fsutil::remove(&index)?;
            }
            debug!(service = %doc.service_id, out_dir = %out_dir.display(), "Generated service client.");
        }
        info!(count = docs.len(), "Generated service clients.");
        Ok(())
    }
}
