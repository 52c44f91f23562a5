//! Whole-tree rewrite of relative module specifiers through the
//! [`RelocationMap`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::paths::{is_relative_specifier, rebase_specifier, relative_specifier, resolve_candidates};
use crate::relocation::{Relocation, RelocationMap};
use crate::ts::SyntaxError;
use crate::ts::query::{SpecifierSite, alias_binding, for_each_specifier_mut};
use crate::ts::tree::SourceFile;

/// A relative specifier whose target is neither on disk nor relocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedSpecifier {
    /// File containing the import.
    pub file: PathBuf,
    /// Specifier as written.
    pub specifier: String,
}

/// Counts from one import-graph rewrite.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteReport {
    /// Files visited.
    pub files: usize,
    /// Files written back with at least one change.
    pub changed_files: usize,
    /// Specifiers pointed at a new location.
    pub rewritten: usize,
    /// Bindings or dynamic members renamed along with their file.
    pub aliased: usize,
    /// Relative specifiers that point nowhere.
    pub unresolved: Vec<UnresolvedSpecifier>,
}

/// Rewrite every `.ts` file under `root`.
pub fn rewrite_tree(root: &Path, map: &RelocationMap) -> Result<RewriteReport> {
    let mut report = RewriteReport::default();
    for path in fsutil::ts_files(root) {
        report.files += 1;
        let source = fsutil::read(&path)?;
        let rewritten = rewrite_source(&source, &path, map, &mut report)
            .map_err(|err| MergeError::syntax(&path, &err))?;
        if let Some(rewritten) = rewritten {
            fsutil::write(&path, &rewritten)?;
            report.changed_files += 1;
        }
    }
    info!(
        files = report.files,
        changed = report.changed_files,
        rewritten = report.rewritten,
        aliased = report.aliased,
        unresolved = report.unresolved.len(),
        "Rewrote import graph."
    );
    Ok(report)
}

/// Rewrite one file's specifiers. Returns `None` when nothing changed.
pub fn rewrite_source(
    source: &str,
    file: &Path,
    map: &RelocationMap,
    report: &mut RewriteReport,
) -> std::result::Result<Option<String>, SyntaxError> {
    let dir = file.parent().unwrap_or(Path::new(""));
    let mut tree = SourceFile::parse(source)?;
    let mut changed = false;

    for_each_specifier_mut(&mut tree.nodes, &mut |site| {
        let Some(specifier) = site.specifier() else {
            return;
        };
        if !is_relative_specifier(&specifier) {
            return;
        }
        let candidates = resolve_candidates(dir, &specifier);
        let Some(relocation) = candidates.iter().find_map(|c| map.get(c)) else {
            if !candidates.iter().any(|c| c.exists()) {
                warn!(file = %file.display(), specifier = %specifier, "Import specifier resolves to no file.");
                report.unresolved.push(UnresolvedSpecifier {
                    file: file.to_path_buf(),
                    specifier,
                });
            }
            return;
        };

        let replacement = relative_specifier(dir, &relocation.target);
        changed |= apply(site, &specifier, &replacement, relocation, report);
    });

    if changed {
        debug!(file = %file.display(), "Rewrote specifiers.");
    }
    Ok(changed.then(|| tree.print()))
}

fn apply(
    site: SpecifierSite<'_>,
    specifier: &str,
    replacement: &str,
    relocation: &Relocation,
    report: &mut RewriteReport,
) -> bool {
    let mut changed = false;
    let token = match site {
        SpecifierSite::Static { token, bindings, .. } => {
            if let (Some(symbol), Some(bindings)) = (&relocation.symbol, bindings)
                && alias_binding(bindings, &symbol.from, &symbol.to)
            {
                report.aliased += 1;
                changed = true;
            }
            token
        }
        SpecifierSite::Dynamic { token, member } => {
            if let (Some(symbol), Some(member)) = (&relocation.symbol, member)
                && member.is_ident(&symbol.from)
            {
                member.text.clone_from(&symbol.to);
                report.aliased += 1;
                changed = true;
            }
            token
        }
    };
    if replacement != specifier {
        token.set_string_value(replacement);
        report.rewritten += 1;
        changed = true;
    }
    changed
}

/// Re-point a moved file's own relative specifiers so they reach the same
/// modules from `new_dir`.
pub fn rebase_source(source: &str, old_dir: &Path, new_dir: &Path) -> std::result::Result<String, SyntaxError> {
    if old_dir == new_dir {
        return Ok(source.to_string());
    }
    let mut tree = SourceFile::parse(source)?;
    for_each_specifier_mut(&mut tree.nodes, &mut |site| {
        let token = match site {
            SpecifierSite::Static { token, .. } | SpecifierSite::Dynamic { token, .. } => token,
        };
        if let Some(specifier) = token.string_value().filter(|s| is_relative_specifier(s)) {
            token.set_string_value(&rebase_specifier(&specifier, old_dir, new_dir));
        }
    });
    Ok(tree.print())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::relocation::SymbolRename;

    #[test]
    fn test_rewrites_moved_targets() {
        let mut map = RelocationMap::new();
        map.insert("/out/identity/models/Link.ts", "/out/common/models/Link.ts");
        map.insert("/out/identity/core/request.ts", "/out/common/core/http.ts");

        let source = "import type { Link } from '../models/Link';\nimport { request as __request } from \"../core/request\";\nimport { Other } from 'lib';\n";
        let mut report = RewriteReport::default();
        let out = rewrite_source(
            source,
            Path::new("/out/identity/services/UserService.ts"),
            &map,
            &mut report,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            out,
            "import type { Link } from '../../common/models/Link';\nimport { request as __request } from \"../../common/core/http\";\nimport { Other } from 'lib';\n"
        );
        assert_eq!(report.rewritten, 2);
    }

    #[test]
    fn test_symbol_renames_alias_bindings_and_members() {
        let mut map = RelocationMap::new();
        map.insert_renamed(
            "/out/booking/models/UserDto.ts",
            "/out/booking/models/Booking_UserDto.ts",
            SymbolRename {
                from: "UserDto".into(),
                to: "Booking_UserDto".into(),
            },
        );
        let source = "import type { UserDto } from './UserDto';\nexport type B = { u?: import('./UserDto').UserDto };\n";
        let mut report = RewriteReport::default();
        let out = rewrite_source(
            source,
            Path::new("/out/booking/models/BookingDto.ts"),
            &map,
            &mut report,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            out,
            "import type { Booking_UserDto as UserDto } from './Booking_UserDto';\nexport type B = { u?: import('./Booking_UserDto').Booking_UserDto };\n"
        );
        assert_eq!(report.aliased, 2);
    }

    #[test]
    fn test_index_directories_resolve() {
        let mut map = RelocationMap::new();
        map.insert("/out/identity/index.ts", "/out/identity/client.ts");
        let mut report = RewriteReport::default();
        let out = rewrite_source(
            "export * from '../identity';\n",
            Path::new("/out/booking/x.ts"),
            &map,
            &mut report,
        )
        .unwrap()
        .unwrap();
        assert_eq!(out, "export * from '../identity/client';\n");
    }

    #[test]
    fn test_second_pass_with_empty_map_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsutil::write(&root.join("common/models/Link.ts"), "export type Link = { href?: string };\n").unwrap();
        fsutil::write(
            &root.join("identity/models/UserDto.ts"),
            "import type { Link } from '../models/Link';\nexport type UserDto = { link?: Link };\n",
        )
        .unwrap();

        let mut map = RelocationMap::new();
        map.insert(root.join("identity/models/Link.ts"), root.join("common/models/Link.ts"));
        let first = rewrite_tree(root, &map).unwrap();
        assert_eq!(first.rewritten, 1);
        let after_first = fsutil::read(&root.join("identity/models/UserDto.ts")).unwrap();
        assert!(after_first.contains("'../../common/models/Link'"));

        let second = rewrite_tree(root, &RelocationMap::new()).unwrap();
        assert_eq!(second.rewritten, 0);
        assert_eq!(second.changed_files, 0);
        assert!(second.unresolved.is_empty());
        assert_eq!(fsutil::read(&root.join("identity/models/UserDto.ts")).unwrap(), after_first);
    }

    #[test]
    fn test_dangling_specifiers_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("identity/services/UserService.ts");
        fsutil::write(&file, "import type { Gone } from '../models/Gone';\n").unwrap();
        let report = rewrite_tree(dir.path(), &RelocationMap::new()).unwrap();
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].specifier, "../models/Gone");
        assert_eq!(report.unresolved[0].file, file);
    }

    #[test]
    fn test_rebase_source() {
        let out = rebase_source(
            "import type { Other } from './Other';\nimport { x } from 'lib';\n",
            Path::new("/out/identity/models"),
            Path::new("/out/common/models"),
        )
        .unwrap();
        assert_eq!(
            out,
            "import type { Other } from '../../identity/models/Other';\nimport { x } from 'lib';\n"
        );
    }
}
