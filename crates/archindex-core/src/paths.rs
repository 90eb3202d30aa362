//! Allow-list path validation and the extension → language table.

use crate::IndexerError;
use std::path::{Component, Path, PathBuf};

/// Extension (lowercase, no dot) → language name.
pub const SUPPORTED_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("ts", "typescript"),
    ("tsx", "tsx"),
    ("go", "go"),
    ("java", "java"),
];

/// Map a file extension to its language, case-insensitively.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

/// Map a path to its language by extension.
pub fn language_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(language_for_extension)
}

/// Validate a requested project root against the allow-list.
///
/// Returns the canonical path on success. Nothing on the filesystem is
/// touched before the traversal check.
pub fn validate_path(path: &str, allowed_roots: &[PathBuf]) -> Result<PathBuf, IndexerError> {
    if path.trim().is_empty() {
        return Err(IndexerError::Validation("Path must not be empty".to_string()));
    }
    let requested = Path::new(path);
    if path.contains("..")
        || requested
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(IndexerError::Validation(
            "Path traversal not allowed".to_string(),
        ));
    }

    let canonical = requested
        .canonicalize()
        .map_err(|_| IndexerError::Validation(format!("Path does not exist: {path}")))?;

    if !canonical.is_dir() {
        return Err(IndexerError::Validation(format!(
            "Path is not a directory: {path}"
        )));
    }

    let allowed = allowed_roots.iter().any(|root| match root.canonicalize() {
        Ok(root) => canonical.starts_with(&root),
        Err(_) => false,
    });
    if !allowed {
        return Err(IndexerError::Validation(format!(
            "Path not in allowed roots: {path}"
        )));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(language_for_extension("py"), Some("python"));
        assert_eq!(language_for_extension("PY"), Some("python"));
        assert_eq!(language_for_extension(".tsx"), Some("tsx"));
        assert_eq!(language_for_extension("mjs"), Some("javascript"));
        assert_eq!(language_for_extension("rs"), None);
    }

    #[test]
    fn language_for_path_uses_extension() {
        assert_eq!(language_for_path(Path::new("src/Main.java")), Some("java"));
        assert_eq!(language_for_path(Path::new("Makefile")), None);
    }

    #[test]
    fn accepts_directory_under_allowed_root() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("demo");
        std::fs::create_dir(&project).unwrap();

        let validated = validate_path(
            project.to_str().unwrap(),
            &[root.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(validated, project.canonicalize().unwrap());
    }

    #[test]
    fn rejects_traversal_before_filesystem_access() {
        let root = tempfile::tempdir().unwrap();
        let sneaky = format!("{}/demo/../../etc", root.path().display());
        let err = validate_path(&sneaky, &[root.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, IndexerError::Validation(ref m) if m.contains("traversal")));
    }

    #[test]
    fn rejects_path_outside_allow_list() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let err = validate_path(
            other.path().to_str().unwrap(),
            &[allowed.path().to_path_buf()],
        )
        .unwrap_err();
        assert!(matches!(err, IndexerError::Validation(ref m) if m.contains("allowed roots")));
    }

    #[test]
    fn rejects_missing_path_and_regular_file() {
        let root = tempfile::tempdir().unwrap();
        let roots = [root.path().to_path_buf()];

        let missing = root.path().join("nope");
        assert!(matches!(
            validate_path(missing.to_str().unwrap(), &roots),
            Err(IndexerError::Validation(_))
        ));

        let file = root.path().join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();
        let err = validate_path(file.to_str().unwrap(), &roots).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
