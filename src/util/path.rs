use std::path::Path;

/// Expand `~` and `$VAR`/`${VAR}` in a path string; unknown variables are left as written.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|expanded| expanded.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(path).into_owned())
}

/// Whether `path` carries the `.swc` extension (case-insensitive).
pub fn is_swc_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("swc"))
}
