use std::collections::HashMap;
use std::env as stdenv;
use std::io;
use std::path::{Path, PathBuf};

/// Name the shell reports itself as, in the prompt and in error lines.
pub const SHELL_NAME: &str = "shellfyre";

/// Shell-level view of the process state shared by built-ins and the executor.
///
/// The working directory is the process one: `cd` changes it for the shell and for every
/// child spawned afterwards. `vars` only holds overrides; lookups fall back to the process
/// environment and children receive the overrides on top of what they inherit.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables set by the shell itself.
    pub vars: HashMap<String, String>,
    /// When set to true, the interactive loop stops after the current line.
    pub should_exit: bool,
    /// Used as `-<shell_name>: ...` in error reports.
    pub shell_name: String,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            should_exit: false,
            shell_name: SHELL_NAME.to_string(),
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn current_dir(&self) -> io::Result<PathBuf> {
        stdenv::current_dir()
    }

    /// Change the process working directory.
    pub fn change_dir(&mut self, target: &Path) -> io::Result<()> {
        stdenv::set_current_dir(target)?;
        log::debug!("working directory is now {}", target.display());
        Ok(())
    }

    /// Format an error line the way the shell reports failures: `-shellfyre: cd: reason`.
    pub fn error_line(&self, command: &str, reason: impl std::fmt::Display) -> String {
        format!("-{}: {}: {}", self.shell_name, command, reason)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serialises tests that read or change the process working directory.
    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
