use crate::builtin::Builtins;
use crate::command::Flow;
use crate::completion::Completions;
use crate::config::Config;
use crate::env::Environment;
use crate::executor::Executor;
use crate::parser;
use crate::terminal::{LineSource, ReadOutcome};
use anyhow::Result;
use std::fs;
use std::io::{self, Write};

/// The interactive shell: reads a line, parses it, runs it, repeats.
///
/// Example
/// ```
/// use shellfyre::{Config, Flow, Interpreter};
/// let mut sh = Interpreter::new(&Config::default());
/// let flow = sh.run_line("exit", &mut std::io::sink(), &mut std::io::sink());
/// assert_eq!(flow, Flow::Terminate);
/// ```
pub struct Interpreter {
    env: Environment,
    executor: Executor,
    completions: Completions,
    dump: bool,
}

impl Interpreter {
    pub fn new(config: &Config) -> Self {
        let builtins = Builtins::default();
        let completions = Completions::new(config.resolver(), builtins.names());
        Self {
            env: Environment::new(),
            executor: Executor::new(config.resolver(), builtins),
            completions,
            dump: config.dump,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Completion candidates source, shared with the terminal's tab completion.
    pub fn completions(&self) -> Completions {
        self.completions.clone()
    }

    /// `user@host:cwd shellfyre$ `
    pub fn prompt(&self) -> String {
        let user = self.env.get_var("USER").unwrap_or_default();
        let cwd = self
            .env
            .current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        format!("{}@{}:{} {}$ ", user, self.hostname(), cwd, self.env.shell_name)
    }

    fn hostname(&self) -> String {
        fs::read_to_string("/proc/sys/kernel/hostname")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| self.env.get_var("HOSTNAME"))
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Handle one line of input. Every failure is reported on `stderr`; only `exit`
    /// yields [`Flow::Terminate`].
    pub fn run_line(&mut self, line: &str, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Flow {
        let chain = match parser::parse(line) {
            Ok(chain) => chain,
            Err(e) => {
                let _ = writeln!(stderr, "-{}: {}", self.env.shell_name, e);
                return Flow::Continue;
            }
        };
        if self.dump {
            let _ = write!(stdout, "{}", chain.describe());
        }

        if chain.wants_completion() {
            let request = line.trim().trim_end_matches('?');
            for candidate in self.completions.for_line(request).1 {
                let _ = writeln!(stdout, "{}", candidate);
            }
            return Flow::Continue;
        }

        match self.executor.execute(&chain, &mut self.env, stdout, stderr) {
            Ok(flow) => flow,
            Err(e) => {
                log::debug!("line {:?} aborted: {:?}", line, e);
                let _ = writeln!(stderr, "-{}: {}", self.env.shell_name, e);
                Flow::Continue
            }
        }
    }

    /// Run the read-eval loop on the process streams until `exit` or end of input.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> Result<()> {
        self.repl_with(source, &mut io::stdout(), &mut io::stderr())
    }

    pub fn repl_with(
        &mut self,
        source: &mut dyn LineSource,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<()> {
        loop {
            self.executor.reap_jobs(stderr);
            let prompt = self.prompt();
            match source.read_line(&prompt)? {
                ReadOutcome::Line(line) => {
                    if !line.trim().is_empty() {
                        source.remember(&line);
                    }
                    if self.run_line(&line, stdout, stderr) == Flow::Terminate {
                        break;
                    }
                }
                ReadOutcome::Interrupted => continue,
                ReadOutcome::Eof => break,
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
