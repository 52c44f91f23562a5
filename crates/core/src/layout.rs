//! Output tree layout and the generated files inside it.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fsutil;

/// Subdirectory contract of the per-service generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// Transport primitives (`core/`)
    Core,
    /// One type per schema (`models/`)
    Model,
    /// JSON Schema constants (`schemas/`)
    Schema,
    /// API call wrappers (`services/`)
    Service,
}

impl ArtifactKind {
    /// Kinds whose identical copies are lifted into `common/`.
    pub const SHAREABLE: [ArtifactKind; 3] = [Self::Core, Self::Model, Self::Schema];

    /// Subdirectory name inside a service or `common/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Model => "models",
            Self::Schema => "schemas",
            Self::Service => "services",
        }
    }
}

/// Paths inside the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at the output directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One service's generated tree.
    pub fn service_dir(&self, service: &str) -> PathBuf {
        self.root.join(service)
    }

    /// One kind's directory inside a service tree.
    pub fn kind_dir(&self, service: &str, kind: ArtifactKind) -> PathBuf {
        self.service_dir(service).join(kind.dir_name())
    }

    /// Home of the shared artifacts.
    pub fn common_dir(&self) -> PathBuf {
        self.root.join("common")
    }

    /// One kind's directory under `common/`.
    pub fn common_kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.common_dir().join(kind.dir_name())
    }

    /// Consolidated `types/index.ts`.
    pub fn types_index(&self) -> PathBuf {
        self.root.join("types").join("index.ts")
    }

    /// Combined transport runtime.
    pub fn runtime_module(&self) -> PathBuf {
        self.common_kind_dir(ArtifactKind::Core).join("http.ts")
    }

    /// Where loaded documents are handed to the generator.
    pub fn specs_dir(&self) -> PathBuf {
        self.root.join(".specs")
    }

    /// Persisted copy of one service's document.
    pub fn spec_file(&self, service: &str) -> PathBuf {
        self.specs_dir().join(format!("{service}.json"))
    }

    /// Audit trail written at the end of a run.
    pub fn migration_record(&self) -> PathBuf {
        self.root.join("migration.json")
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Owning service.
    pub service: String,
    /// Absolute path.
    pub path: PathBuf,
    /// Directory it was found in.
    pub kind: ArtifactKind,
    /// Contents.
    pub source: String,
}

impl GeneratedFile {
    /// File name with extension, the cross-service comparison key.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Declared name, taken from the file stem (`models/UserDto.ts` -> `UserDto`).
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Load every `.ts` file of one kind for one service.
pub fn load_kind(layout: &OutputLayout, service: &str, kind: ArtifactKind) -> Result<Vec<GeneratedFile>> {
    fsutil::ts_files_in(&layout.kind_dir(service, kind))
        .into_iter()
        .map(|path| {
            Ok(GeneratedFile {
                service: service.to_string(),
                source: fsutil::read(&path)?,
                path,
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new("/out");
        assert_eq!(
            layout.kind_dir("identity", ArtifactKind::Model),
            PathBuf::from("/out/identity/models")
        );
        assert_eq!(layout.runtime_module(), PathBuf::from("/out/common/core/http.ts"));
        assert_eq!(layout.types_index(), PathBuf::from("/out/types/index.ts"));
        assert_eq!(layout.spec_file("booking"), PathBuf::from("/out/.specs/booking.json"));
    }

    #[test]
    fn test_load_kind() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        fsutil::write(&layout.kind_dir("identity", ArtifactKind::Model).join("Link.ts"), "export type Link = {};").unwrap();
        let files = load_kind(&layout, "identity", ArtifactKind::Model).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].stem(), "Link");
        assert_eq!(files[0].file_name(), "Link.ts");
        assert!(load_kind(&layout, "booking", ArtifactKind::Model).unwrap().is_empty());
    }
}
