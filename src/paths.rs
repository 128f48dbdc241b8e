//! Path helpers for `.svelte` files and their virtual `.svelte.ts` twins
//!
//! The engine probes ambiguous extensions by appending `.ts`, so a request
//! for `Button.svelte.ts` really means `Button.svelte` on disk.

use std::path::{Path, PathBuf};

pub const SVELTE_EXTENSION: &str = ".svelte";
const VIRTUAL_SUFFIX: &str = ".ts";

pub fn is_svelte_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "svelte")
}

/// `Button.svelte.ts` style paths produced by extension probing
pub fn is_virtual_svelte_path(path: &Path) -> bool {
    path.to_str()
        .is_some_and(|p| p.ends_with(".svelte.ts"))
}

/// Rewrite a virtual path to the real on-disk path, leave everything else alone
pub fn ensure_real_svelte_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(p) if is_virtual_svelte_path(path) => {
            PathBuf::from(&p[..p.len() - VIRTUAL_SUFFIX.len()])
        }
        _ => path.to_path_buf(),
    }
}

/// File name without any extension (`Button.svelte.ts` -> `Button`)
pub fn file_stem(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_paths_map_back_to_real_files() {
        let virtual_path = Path::new("/app/src/Button.svelte.ts");
        assert!(is_virtual_svelte_path(virtual_path));
        assert_eq!(
            ensure_real_svelte_path(virtual_path),
            PathBuf::from("/app/src/Button.svelte")
        );
    }

    #[test]
    fn ordinary_paths_are_untouched() {
        for p in ["/app/a.ts", "/app/Button.svelte", "/app/svelte.ts"] {
            assert_eq!(ensure_real_svelte_path(Path::new(p)), PathBuf::from(p));
        }
        assert!(!is_virtual_svelte_path(Path::new("/app/svelte.ts")));
    }

    #[test]
    fn stem_strips_all_extensions() {
        assert_eq!(file_stem(Path::new("/app/Button.svelte.ts")), "Button");
        assert_eq!(file_stem(Path::new("/app/types.d.ts")), "types");
        assert!(is_svelte_path(Path::new("/app/Button.svelte")));
    }
}
