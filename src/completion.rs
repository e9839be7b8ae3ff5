use crate::lexer::SPLITTERS;
use crate::resolver::PathResolver;
use std::fs;
use std::path::Path;

/// Completion candidates for the word under the cursor.
///
/// The first word of a stage completes to built-ins and executables from the search
/// directories, anything else completes to file names.
#[derive(Debug, Clone)]
pub struct Completions {
    resolver: PathResolver,
    builtins: Vec<&'static str>,
}

impl Completions {
    pub fn new(resolver: PathResolver, builtins: Vec<&'static str>) -> Self {
        Self { resolver, builtins }
    }

    /// Candidates for the last word of `line`.
    ///
    /// Returns the byte offset where that word starts together with the full replacement
    /// words, sorted.
    pub fn for_line(&self, line: &str) -> (usize, Vec<String>) {
        let start = line.rfind(&SPLITTERS[..]).map(|i| i + 1).unwrap_or(0);
        let word = &line[start..];
        let before = line[..start].trim_end_matches(&SPLITTERS[..]);
        let command_position = before.is_empty() || before.ends_with('|');

        let candidates = if command_position && !word.contains('/') {
            self.commands(word)
        } else {
            files(word)
        };
        (start, candidates)
    }

    fn commands(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .builtins
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| name.to_string())
            .chain(self.resolver.executables_with_prefix(prefix))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Entries of the directory named by `word` up to its last `/`, matching the rest as a
/// prefix. Directories get a trailing `/`; hidden entries only show for a `.` prefix.
fn files(word: &str) -> Vec<String> {
    let (dir_part, prefix) = match word.rfind('/') {
        Some(i) => word.split_at(i + 1),
        None => ("", word),
    };
    let dir = if dir_part.is_empty() { Path::new(".") } else { Path::new(dir_part) };

    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(prefix) || (name.starts_with('.') && !prefix.starts_with('.')) {
                return None;
            }
            let slash = if entry.path().is_dir() { "/" } else { "" };
            Some(format!("{}{}{}", dir_part, name, slash))
        })
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn completions(dir: &Path) -> Completions {
        Completions::new(PathResolver::new(vec![dir.to_path_buf()]), vec!["cd", "exit"])
    }

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn test_first_word_completes_commands() {
        let bin = TempDir::new().unwrap();
        make_executable(bin.path(), "ecstatic");
        make_executable(bin.path(), "echo");
        make_executable(bin.path(), "exiftool");

        let c = completions(bin.path());
        assert_eq!(c.for_line("ec"), (0, vec!["echo".to_string(), "ecstatic".to_string()]));
        assert_eq!(c.for_line("ex"), (0, vec!["exiftool".to_string(), "exit".to_string()]));
    }

    #[test]
    #[cfg(unix)]
    fn test_word_after_pipe_completes_commands() {
        let bin = TempDir::new().unwrap();
        make_executable(bin.path(), "wc");
        let c = completions(bin.path());
        assert_eq!(c.for_line("cat x | w"), (8, vec!["wc".to_string()]));
    }

    #[test]
    fn test_arguments_complete_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("notes")).unwrap();
        fs::write(dir.path().join("notebook.txt"), "").unwrap();
        fs::write(dir.path().join(".notes_hidden"), "").unwrap();
        fs::write(dir.path().join("other"), "").unwrap();

        let c = completions(dir.path());
        let base = format!("{}/", dir.path().display());
        let line = format!("cat {}no", base);
        let (start, found) = c.for_line(&line);
        assert_eq!(start, 4);
        assert_eq!(found, vec![format!("{}notebook.txt", base), format!("{}notes/", base)]);

        let (_, hidden) = c.for_line(&format!("cat {}.no", base));
        assert_eq!(hidden, vec![format!("{}.notes_hidden", base)]);
    }

    #[test]
    fn test_missing_directory_has_no_candidates() {
        let c = completions(Path::new("/nonexistent_completion_dir"));
        assert!(c.for_line("cat /nonexistent_completion_dir/x").1.is_empty());
    }
}
