use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory consulted by the single-directory lookup.
pub const FIXED_BIN_DIR: &str = "/bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No executable with this name in any search directory.
    NotFound(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound(name) => write!(f, "{}: command not found", name),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Maps command names to executables on disk.
///
/// Bare names are looked up in an ordered list of directories, first match wins.
/// Names that contain a path separator are taken as paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    dirs: Vec<PathBuf>,
}

impl PathResolver {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Lookup restricted to `/bin`.
    pub fn fixed() -> Self {
        Self::new(vec![PathBuf::from(FIXED_BIN_DIR)])
    }

    /// Directories taken from a `PATH`-style list, e.g. `/usr/bin:/bin`.
    pub fn from_search_paths(search_paths: &OsStr) -> Self {
        Self::new(
            std::env::split_paths(search_paths)
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect(),
        )
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Resolve a command name the way a typical shell would.
    ///
    /// - Empty name: never found.
    /// - Absolute path, or a relative path with more than one component (`./foo`, `bin/sh`):
    ///   returned if it is an executable file.
    /// - Single component: every search directory is tried in order.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ResolveError> {
        let not_found = || ResolveError::NotFound(name.to_string());
        let path = Path::new(name);

        let mut components = path.components();
        let found = match (components.next(), components.next()) {
            (None, _) => None,
            (Some(single), None) if !path.is_absolute() => self.find_in_dirs(single.as_os_str()),
            _ => is_executable(path).then(|| path.to_path_buf()),
        };
        let found = found.ok_or_else(not_found)?;
        log::debug!("resolved {} to {}", name, found.display());
        Ok(found)
    }

    fn find_in_dirs(&self, cmd: &OsStr) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(cmd))
            .find(|candidate| is_executable(candidate))
    }

    /// Names of executables in the search directories starting with `prefix`, sorted and
    /// without duplicates.
    pub fn executables_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .dirs
            .iter()
            .filter_map(|dir| std::fs::read_dir(dir).ok())
            .flat_map(|entries| entries.filter_map(Result::ok))
            .filter(|entry| is_executable(&entry.path()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for PathResolver {
    /// Directories from `PATH`, or `/bin` when it is unset.
    fn default() -> Self {
        match std::env::var_os("PATH") {
            Some(paths) if !paths.is_empty() => Self::from_search_paths(&paths),
            _ => Self::fixed(),
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
