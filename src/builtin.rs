use crate::command::{Command, ExitCode};
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::io::Write;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "exit".
    fn name() -> &'static str;

    /// Builds the command from the words that followed its name.
    ///
    /// Defaults to argh parsing. Commands whose arguments must be taken literally override it.
    fn from_words(name: &str, args: &[&str]) -> std::result::Result<Self, EarlyExit> {
        Self::from_args(&[name], args)
    }

    /// Executes the command against the shell environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Object-safe form of a built-in, ready to run.
pub trait ExecutableCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match <T as BuiltinCommand>::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stderr, "{}", env.error_line(T::name(), format!("{:#}", e)))?;
                Ok(1)
            }
        }
    }
}

/// `--help` output or an argument error, printed instead of running the built-in.
struct InvalidArgs {
    name: &'static str,
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            writeln!(stderr, "{}", env.error_line(self.name, self.output.trim_end()))?;
            Ok(1)
        } else {
            writeln!(stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

/// Factory that tries to create a built-in from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    fn name(&self) -> &'static str;

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}

/// Factory for one [`BuiltinCommand`] type.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_words(name, args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    name: T::name(),
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Intercepts built-in names before anything is spawned.
pub struct Builtins {
    factories: Vec<Box<dyn CommandFactory>>,
}

impl Builtins {
    pub fn new(factories: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { factories }
    }

    /// Names of all registered built-ins.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Run the head of `command` if it is a built-in.
    ///
    /// Returns `None` when the chain has to go to the executor. The blank-line sentinel is
    /// handled here as a successful no-op. Any stages piped after a built-in are ignored.
    pub fn dispatch(
        &self,
        command: &Command,
        env: &mut Environment,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Option<Result<ExitCode>> {
        if command.is_empty() {
            return Some(Ok(0));
        }
        let args: Vec<&str> = command.arguments.iter().map(String::as_str).collect();
        let builtin = self
            .factories
            .iter()
            .find_map(|f| f.try_create(&command.name, &args))?;
        if command.next.is_some() {
            log::debug!("{} is a built-in, ignoring the rest of the pipeline", command.name);
        }
        Some(builtin.execute(stdout, stderr, env))
    }
}

impl Default for Builtins {
    /// The shell's built-ins: `cd`, `exit`, `take`, `filesearch` and `colortext`.
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Take>::default()),
            Box::new(Factory::<FileSearch>::default()),
            Box::new(Factory::<ColorText>::default()),
        ])
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target the directory is left unchanged. The target is taken literally, so
/// names such as `-dir` or `help` are directories too.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Extra
    /// arguments are ignored.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_words(_name: &str, args: &[&str]) -> std::result::Result<Self, EarlyExit> {
        Ok(Cd {
            targets: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        // TODO: fall back to $HOME once the environment tracks it.
        let Some(target) = self.targets.first() else {
            return Ok(0);
        };
        env.change_dir(Path::new(target))
            .with_context(|| target.clone())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    /// Any arguments at all still exit.
    fn from_words(_name: &str, args: &[&str]) -> std::result::Result<Self, EarlyExit> {
        Ok(Exit {
            _args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create a directory, including any missing parents, and change into it.
pub struct Take {
    #[argh(positional)]
    /// directory path to create and enter.
    pub path: String,
}

impl BuiltinCommand for Take {
    fn name() -> &'static str {
        "take"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let path = Path::new(&self.path);
        fs::create_dir_all(path).with_context(|| format!("can't create {}", self.path))?;
        env.change_dir(path)
            .with_context(|| format!("can't enter {}", self.path))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List entries of the current directory whose names contain a search term.
pub struct FileSearch {
    #[argh(switch, short = 'r')]
    /// descend into subdirectories; hidden ones are skipped.
    pub recursive: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions.
    pub ignore_case: bool,

    #[argh(positional)]
    /// text to look for in file names.
    pub term: String,
}

impl FileSearch {
    fn search(&self, dir: &Path, shown_as: &Path, re: &Regex, stdout: &mut dyn Write) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("can't read {}", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let shown = shown_as.join(name.as_ref());
            if re.is_match(&name) {
                writeln!(stdout, "{}", shown.display())?;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if self.recursive && is_dir && !name.starts_with('.') {
                self.search(&entry.path(), &shown, re, stdout)?;
            }
        }
        Ok(())
    }
}

impl BuiltinCommand for FileSearch {
    fn name() -> &'static str {
        "filesearch"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let re = RegexBuilder::new(&regex::escape(&self.term))
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("invalid search term: {}", self.term))?;
        let root = env.current_dir().context("can't read the working directory")?;
        self.search(&root, Path::new("."), &re, stdout)?;
        Ok(0)
    }
}

const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    /// Rotates through [`RAINBOW`], one entry per line.
    Rainbow,
}

/// Order of the `rainbow` rotation.
const RAINBOW: [Color; 6] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
];

impl Color {
    const NAMES: [(&'static str, Color); 9] = [
        ("black", Color::Black),
        ("red", Color::Red),
        ("green", Color::Green),
        ("yellow", Color::Yellow),
        ("blue", Color::Blue),
        ("magenta", Color::Magenta),
        ("cyan", Color::Cyan),
        ("white", Color::White),
        ("rainbow", Color::Rainbow),
    ];

    /// SGR escape selecting the foreground color. `Rainbow` starts out red.
    fn escape(self) -> &'static str {
        match self {
            Color::Black => "\x1b[30m",
            Color::Red | Color::Rainbow => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Blue => "\x1b[34m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
            Color::White => "\x1b[37m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColor(String);

impl fmt::Display for UnknownColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Color::NAMES.iter().map(|(name, _)| *name).collect();
        write!(f, "unknown color `{}', expected one of: {}", self.0, names.join(", "))
    }
}

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Color::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, color)| *color)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

#[derive(FromArgs)]
/// List the current directory with every entry printed in a color.
pub struct ColorText {
    #[argh(positional)]
    /// one of black, red, green, yellow, blue, magenta, cyan, white or rainbow.
    pub color: Color,
}

impl ColorText {
    fn paint(&self, names: &[String], stdout: &mut dyn Write) -> Result<()> {
        for (i, name) in names.iter().enumerate() {
            let color = match self.color {
                Color::Rainbow => RAINBOW[i % RAINBOW.len()],
                color => color,
            };
            writeln!(stdout, "{}{}{}", color.escape(), name, ANSI_RESET)?;
        }
        Ok(())
    }
}

impl BuiltinCommand for ColorText {
    fn name() -> &'static str {
        "colortext"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let root = env.current_dir().context("can't read the working directory")?;
        let mut names = fs::read_dir(&root)
            .with_context(|| format!("can't read {}", root.display()))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.sort();
        self.paint(&names, stdout)?;
        Ok(0)
    }
}
