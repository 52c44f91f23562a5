//! Run-scoped table of moved and renamed files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Exported identifier that changed together with its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRename {
    /// Name before the move.
    pub from: String,
    /// Name after it.
    pub to: String,
}

/// Where a path went, and any identifier renamed with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Final location.
    pub target: PathBuf,
    /// Renamed export, for collision renames.
    pub symbol: Option<SymbolRename>,
}

/// Original path to new path. Chains are compressed on insert, so every key
/// resolves to its final location in one lookup.
#[derive(Debug, Clone, Default)]
pub struct RelocationMap {
    entries: BTreeMap<PathBuf, Relocation>,
}

impl RelocationMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a plain move.
    pub fn insert(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) {
        self.insert_relocation(
            from.into(),
            Relocation {
                target: to.into(),
                symbol: None,
            },
        );
    }

    /// Record a move that also renames the file's exported symbol.
    pub fn insert_renamed(&mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>, symbol: SymbolRename) {
        self.insert_relocation(
            from.into(),
            Relocation {
                target: to.into(),
                symbol: Some(symbol),
            },
        );
    }

    fn insert_relocation(&mut self, from: PathBuf, mut relocation: Relocation) {
        // The new target may itself have moved already.
        if let Some(next) = self.entries.get(&relocation.target) {
            relocation.symbol = compose(relocation.symbol.as_ref(), next.symbol.as_ref());
            relocation.target = next.target.clone();
        }
        if relocation.target == from {
            self.entries.remove(&from);
            return;
        }

        for existing in self.entries.values_mut() {
            if existing.target == from {
                existing.symbol = compose(existing.symbol.as_ref(), relocation.symbol.as_ref());
                existing.target = relocation.target.clone();
            }
        }
        self.entries.insert(from, relocation);
    }

    /// Drop the entry for a path that is live again.
    pub fn remove(&mut self, path: &Path) -> Option<Relocation> {
        self.entries.remove(path)
    }

    /// Final relocation of `path`, if it moved.
    pub fn get(&self, path: &Path) -> Option<&Relocation> {
        self.entries.get(path)
    }

    /// Number of moved paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing moved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compose(first: Option<&SymbolRename>, second: Option<&SymbolRename>) -> Option<SymbolRename> {
    match (first, second) {
        (Some(a), Some(b)) if a.to == b.from => Some(SymbolRename {
            from: a.from.clone(),
            to: b.to.clone(),
        }),
        (Some(a), _) => Some(a.clone()),
        (None, b) => b.cloned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chains_are_compressed_both_ways() {
        let mut map = RelocationMap::new();
        map.insert("/out/a/core/request.ts", "/out/common/core/request.ts");
        map.insert("/out/common/core/request.ts", "/out/common/core/http.ts");
        assert_eq!(
            map.get(Path::new("/out/a/core/request.ts")).unwrap().target,
            PathBuf::from("/out/common/core/http.ts")
        );

        map.insert("/out/b/core/request.ts", "/out/common/core/request.ts");
        assert_eq!(
            map.get(Path::new("/out/b/core/request.ts")).unwrap().target,
            PathBuf::from("/out/common/core/http.ts")
        );
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_later_insert_replaces_key() {
        let mut map = RelocationMap::new();
        map.insert("/out/a/core/OpenAPI.ts", "/out/common/core/OpenAPI.ts");
        map.insert("/out/a/core/OpenAPI.ts", "/out/a/OpenAPI.ts");
        assert_eq!(
            map.get(Path::new("/out/a/core/OpenAPI.ts")).unwrap().target,
            PathBuf::from("/out/a/OpenAPI.ts")
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_symbol_renames_follow_chains() {
        let mut map = RelocationMap::new();
        map.insert_renamed(
            "/out/a/core/ApiError.ts",
            "/out/common/core/http.ts",
            SymbolRename {
                from: "ApiError".into(),
                to: "ApiHttpError".into(),
            },
        );
        map.insert("/out/a/ApiError.ts", "/out/a/core/ApiError.ts");
        let reloc = map.get(Path::new("/out/a/ApiError.ts")).unwrap();
        assert_eq!(reloc.target, PathBuf::from("/out/common/core/http.ts"));
        assert_eq!(reloc.symbol.as_ref().unwrap().to, "ApiHttpError");
    }

    #[test]
    fn test_self_mapping_is_dropped() {
        let mut map = RelocationMap::new();
        map.insert("/out/x.ts", "/out/y.ts");
        map.insert("/out/y.ts", "/out/x.ts");
        assert!(map.get(Path::new("/out/y.ts")).is_none());
        assert_eq!(map.len(), 1);
    }
}
