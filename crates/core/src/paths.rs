//! Lexical path arithmetic for module specifiers.

use std::path::{Component, Path, PathBuf};

/// Relative specifiers start with `.`; package imports are left alone.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with('.')
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Files a relative specifier may refer to, in lookup order:
/// `<spec>.ts`, `<spec>/index.ts`, then the path itself.
pub fn resolve_candidates(from_dir: &Path, specifier: &str) -> Vec<PathBuf> {
    let base = normalize_path(&from_dir.join(specifier));
    let mut with_ext = base.clone().into_os_string();
    with_ext.push(".ts");
    vec![PathBuf::from(with_ext), base.join("index.ts"), base]
}

/// Specifier that reaches `target` (a `.ts` file) from files in `from_dir`.
///
/// The `.ts` extension is dropped, `index.ts` is addressed through its
/// directory, and the result always starts with `./` or `../`.
pub fn relative_specifier(from_dir: &Path, target: &Path) -> String {
    let target = normalize_path(target);
    let module = if target.file_stem().is_some_and(|s| s == "index") {
        target.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        target.with_extension("")
    };
    let from_dir = normalize_path(from_dir);

    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = module.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    let joined = parts.join("/");
    if joined.is_empty() {
        ".".to_string()
    } else if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Rewrite a specifier written in `old_dir` so it reaches the same module
/// from `new_dir`.
pub fn rebase_specifier(specifier: &str, old_dir: &Path, new_dir: &Path) -> String {
    if !is_relative_specifier(specifier) {
        return specifier.to_string();
    }
    let target = normalize_path(&old_dir.join(specifier));
    let mut as_file = target.into_os_string();
    as_file.push(".ts");
    relative_specifier(new_dir, Path::new(&as_file))
}
