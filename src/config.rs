use crate::resolver::{FIXED_BIN_DIR, PathResolver};
use argh::FromArgs;
use std::path::PathBuf;

pub const DEFAULT_HISTORY_SIZE: usize = 1000;

#[derive(FromArgs, Debug, PartialEq)]
/// An interactive shell with pipes, redirections and background jobs.
pub struct Options {
    #[argh(option, long = "search-dir")]
    /// directory searched for executables; repeat to search several, in order.
    /// Defaults to the directories in PATH.
    pub search_dirs: Vec<String>,

    #[argh(switch)]
    /// only look for executables in /bin.
    pub fixed_bin: bool,

    #[argh(option, default = "DEFAULT_HISTORY_SIZE")]
    /// number of lines kept for recall with the up arrow.
    pub history_size: usize,

    #[argh(switch)]
    /// print every parsed command chain before running it.
    pub dump: bool,
}

/// Runtime settings of the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where bare command names are looked up, first match wins.
    pub search_dirs: Vec<PathBuf>,
    pub history_size: usize,
    /// Print the parsed chain of every line.
    pub dump: bool,
}

impl Config {
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.search_dirs.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_dirs: PathResolver::default().dirs().to_vec(),
            history_size: DEFAULT_HISTORY_SIZE,
            dump: false,
        }
    }
}

impl From<Options> for Config {
    fn from(options: Options) -> Self {
        let search_dirs = if options.fixed_bin {
            vec![PathBuf::from(FIXED_BIN_DIR)]
        } else if !options.search_dirs.is_empty() {
            options.search_dirs.into_iter().map(PathBuf::from).collect()
        } else {
            PathResolver::default().dirs().to_vec()
        };
        Self {
            search_dirs,
            history_size: options.history_size,
            dump: options.dump,
        }
    }
}
