use std::fmt;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// What the interactive loop should do once a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Show the prompt again.
    Continue,
    /// Leave the loop, the user asked to `exit`.
    Terminate,
}

/// One of the three I/O rebindings a command may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectSlot {
    /// `<path`: stdin is read from the file.
    Input = 0,
    /// `>path`: stdout is written to the file, truncating it.
    Truncate = 1,
    /// `>>path`: stdout is appended to the file.
    Append = 2,
}

impl RedirectSlot {
    pub const ALL: [RedirectSlot; 3] = [
        RedirectSlot::Input,
        RedirectSlot::Truncate,
        RedirectSlot::Append,
    ];

    /// Operator text as written on the command line.
    pub fn operator(self) -> &'static str {
        match self {
            RedirectSlot::Input => "<",
            RedirectSlot::Truncate => ">",
            RedirectSlot::Append => ">>",
        }
    }
}

/// A single stage of a pipeline, as produced by the parser.
///
/// Stages are chained through [`Command::next`]: the stdout of a stage feeds the stdin of
/// the stage it owns. The chain is an ordinary owned list, so dropping the head drops the
/// whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Program or built-in name. Empty only for a blank line.
    pub name: String,
    /// Arguments in encounter order, without the program name.
    pub arguments: Vec<String>,
    /// Set when the line ended with `&`.
    pub background: bool,
    /// Set when the line ended with `?`.
    pub auto_complete: bool,
    /// Redirect targets indexed by [`RedirectSlot`].
    pub redirects: [Option<String>; 3],
    /// The stage reading this stage's output.
    pub next: Option<Box<Command>>,
}

impl Command {
    /// A command with the given name and no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            background: false,
            auto_complete: false,
            redirects: Default::default(),
            next: None,
        }
    }

    /// True for the blank-line sentinel.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn redirect(&self, slot: RedirectSlot) -> Option<&str> {
        self.redirects[slot as usize].as_deref()
    }

    pub fn set_redirect(&mut self, slot: RedirectSlot, path: impl Into<String>) {
        self.redirects[slot as usize] = Some(path.into());
    }

    /// Iterate over this stage and every stage after it.
    pub fn stages(&self) -> Stages<'_> {
        Stages { current: Some(self) }
    }

    /// Number of stages in the chain starting here.
    pub fn len(&self) -> usize {
        self.stages().count()
    }

    /// The terminal stage of the chain.
    pub fn last(&self) -> &Command {
        let mut stage = self;
        while let Some(next) = stage.next.as_deref() {
            stage = next;
        }
        stage
    }

    /// Whether the pipeline should run without the shell waiting for it.
    pub fn is_background(&self) -> bool {
        self.last().background
    }

    /// Whether the line was a completion request rather than something to run.
    pub fn wants_completion(&self) -> bool {
        self.last().auto_complete
    }

    /// The argument vector handed to the new process: the name followed by the arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .collect()
    }

    /// Multi-line dump of the chain, used by `--dump`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        use std::fmt::Write;

        let pad = "\t".repeat(depth);
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{pad}Command: <{}>", self.name);
        let _ = writeln!(out, "{pad}\tIs Background: {}", yes_no(self.background));
        let _ = writeln!(out, "{pad}\tNeeds Auto-complete: {}", yes_no(self.auto_complete));
        let _ = writeln!(out, "{pad}\tRedirects:");
        for (i, target) in self.redirects.iter().enumerate() {
            let _ = writeln!(out, "{pad}\t\t{i}: {}", target.as_deref().unwrap_or("N/A"));
        }
        let _ = writeln!(out, "{pad}\tArguments ({}):", self.arguments.len());
        for (i, arg) in self.arguments.iter().enumerate() {
            let _ = writeln!(out, "{pad}\t\tArg {i}: {arg}");
        }
        if let Some(next) = &self.next {
            let _ = writeln!(out, "{pad}\tPiped to:");
            next.describe_into(out, depth + 1);
        }
    }
}

// Unlinks iteratively so that very long pipelines do not exhaust the stack.
impl Drop for Command {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut stage) = next {
            next = stage.next.take();
        }
    }
}

/// Reconstructs the command line, e.g. `sort <in.txt | uniq >>out.txt &`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(&stage.name)?;
            for arg in &stage.arguments {
                write!(f, " {arg}")?;
            }
            for slot in RedirectSlot::ALL {
                if let Some(path) = stage.redirect(slot) {
                    write!(f, " {}{}", slot.operator(), path)?;
                }
            }
        }
        if self.is_background() {
            f.write_str(" &")?;
        }
        Ok(())
    }
}

/// Iterator over the stages of a pipeline, see [`Command::stages`].
pub struct Stages<'a> {
    current: Option<&'a Command>,
}

impl<'a> Iterator for Stages<'a> {
    type Item = &'a Command;

    fn next(&mut self) -> Option<Self::Item> {
        let stage = self.current?;
        self.current = stage.next.as_deref();
        Some(stage)
    }
}
