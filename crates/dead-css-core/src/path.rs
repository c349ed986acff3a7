//! Module reference resolution.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Drops a loader chain: everything up to and including the last `!`.
pub fn strip_loader_prefix(reference: &str) -> &str {
    match reference.rfind('!') {
        Some(bang) => &reference[bang + 1..],
        None => reference,
    }
}

/// Lexically normalizes a path: removes `.` and resolves `..` against
/// preceding components without touching the filesystem.
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.last() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return Utf8PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolves `reference` (as written in an import) from `context`.
pub fn resolve_reference(context: &Utf8Path, reference: &str) -> Utf8PathBuf {
    normalize(&context.join(strip_loader_prefix(reference)))
}
