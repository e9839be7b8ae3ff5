use crate::builtin::Builtins;
use crate::command::{Command, ExitCode, Flow, RedirectSlot};
use crate::env::Environment;
use crate::resolver::PathResolver;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::process::{Child, ChildStdout, ExitStatus, Stdio};

/// Failures that abort the current line. The shell itself keeps running.
#[derive(Debug)]
pub enum ExecError {
    /// The OS refused to create the process or one of its pipes.
    Spawn { command: String, source: io::Error },
    /// Waiting for a foreground child failed.
    Wait(io::Error),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Spawn { command, source } => write!(f, "{}: {}", command, source),
            ExecError::Wait(source) => write!(f, "wait: {}", source),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecError::Spawn { source, .. } | ExecError::Wait(source) => Some(source),
        }
    }
}

/// A background pipeline the shell has not reaped yet.
struct Job {
    id: usize,
    line: String,
    children: Vec<Child>,
}

/// Runs command chains: built-ins in-process, everything else as one child per stage.
pub struct Executor {
    resolver: PathResolver,
    builtins: Builtins,
    jobs: Vec<Job>,
    last_status: ExitCode,
}

impl Executor {
    pub fn new(resolver: PathResolver, builtins: Builtins) -> Self {
        Self {
            resolver,
            builtins,
            jobs: Vec::new(),
            last_status: 0,
        }
    }

    /// Exit code of the last foreground stage or built-in.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Number of background jobs not reaped yet.
    pub fn running_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Execute one command chain.
    ///
    /// Built-ins run first and never spawn anything. Otherwise every stage is started with
    /// its stdout piped into the next stage's stdin; the shell waits for all of them
    /// unless the final stage is marked as background.
    pub fn execute(
        &mut self,
        chain: &Command,
        env: &mut Environment,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Flow, ExecError> {
        if let Some(result) = self.builtins.dispatch(chain, env, stdout, stderr) {
            self.last_status = match result {
                Ok(code) => code,
                Err(e) => {
                    report(stderr, env.error_line(&chain.name, format!("{:#}", e)));
                    1
                }
            };
            return Ok(if env.should_exit {
                Flow::Terminate
            } else {
                Flow::Continue
            });
        }

        let children = self.spawn_pipeline(chain, env, stderr)?;
        if children.is_empty() {
            self.last_status = 127;
        } else if chain.is_background() {
            self.register_job(chain, children, stderr);
        } else {
            self.wait_all(children)?;
        }
        Ok(Flow::Continue)
    }

    /// Reap finished background jobs without blocking and report them.
    pub fn reap_jobs(&mut self, stderr: &mut dyn Write) {
        self.jobs.retain_mut(|job| {
            job.children.retain_mut(|child| match child.try_wait() {
                Ok(Some(status)) => {
                    log::debug!("background pid {} exited with {}", child.id(), status);
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    log::warn!("can't poll background pid {}: {}", child.id(), e);
                    false
                }
            });
            if job.children.is_empty() {
                report(stderr, format!("[{}]+  Done\t{}", job.id, job.line));
                false
            } else {
                true
            }
        });
    }

    fn register_job(&mut self, chain: &Command, children: Vec<Child>, stderr: &mut dyn Write) {
        let id = self.jobs.iter().map(|job| job.id).max().unwrap_or(0) + 1;
        if let Some(last) = children.last() {
            report(stderr, format!("[{}] {}", id, last.id()));
        }
        self.jobs.push(Job {
            id,
            line: chain.to_string(),
            children,
        });
    }

    fn wait_all(&mut self, children: Vec<Child>) -> Result<(), ExecError> {
        let (last, error) = wait_each(children, |child| {
            let status = child.wait()?;
            log::debug!("pid {} exited with {}", child.id(), status);
            Ok(status)
        });
        if let Some(status) = last {
            self.last_status = exit_code(status);
        }
        match error {
            Some(e) => Err(ExecError::Wait(e)),
            None => Ok(()),
        }
    }

    /// Start every stage of the chain.
    ///
    /// A stage that can't be resolved or whose redirect can't be opened is reported and
    /// skipped: the stage after it reads EOF and the stage before it loses its reader.
    fn spawn_pipeline(
        &self,
        chain: &Command,
        env: &Environment,
        stderr: &mut dyn Write,
    ) -> Result<Vec<Child>, ExecError> {
        let stage_count = chain.len();
        let mut children: Vec<Child> = Vec::with_capacity(stage_count);
        let mut upstream: Option<ChildStdout> = None;

        for (i, stage) in chain.stages().enumerate() {
            let wiring = Wiring {
                first: i == 0,
                last: i + 1 == stage_count,
            };
            match self.spawn_stage(stage, wiring, upstream.take(), env, stderr) {
                Ok(Some(mut child)) => {
                    if !wiring.last {
                        upstream = child.stdout.take();
                    }
                    children.push(child);
                }
                Ok(None) => {}
                Err(e) => {
                    for mut child in children {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Err(e);
                }
            }
        }
        Ok(children)
    }

    fn spawn_stage(
        &self,
        stage: &Command,
        wiring: Wiring,
        upstream: Option<ChildStdout>,
        env: &Environment,
        stderr: &mut dyn Write,
    ) -> Result<Option<Child>, ExecError> {
        let program = match self.resolver.resolve(&stage.name) {
            Ok(program) => program,
            Err(e) => {
                log::debug!("{}", e);
                report(stderr, env.error_line(&stage.name, "command not found"));
                return Ok(None);
            }
        };

        let (stdin, stdout) = match open_streams(stage, wiring, upstream) {
            Ok(streams) => streams,
            Err((path, e)) => {
                report(stderr, env.error_line(&path, e));
                return Ok(None);
            }
        };

        let argv = stage.argv();
        let mut cmd = std::process::Command::new(&program);
        set_arg0(&mut cmd, argv[0]);
        cmd.args(&argv[1..])
            .stdin(stdin)
            .stdout(stdout)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: stage.name.clone(),
            source,
        })?;
        log::debug!("spawned {} ({}) as pid {}", stage.name, program.display(), child.id());
        // `cmd` goes out of scope here and closes the shell's copy of the upstream pipe.
        Ok(Some(child))
    }
}

/// Position of a stage inside its pipeline.
#[derive(Debug, Clone, Copy)]
struct Wiring {
    first: bool,
    last: bool,
}

/// Pick stdin and stdout for a stage. Pipes win over redirects: only the first stage
/// honours `<` and only the last honours `>` and `>>`.
///
/// On failure returns the offending path together with the error.
fn open_streams(
    stage: &Command,
    wiring: Wiring,
    upstream: Option<ChildStdout>,
) -> Result<(Stdio, Stdio), (String, io::Error)> {
    let stdin = if wiring.first {
        match stage.redirect(RedirectSlot::Input) {
            Some(path) => Stdio::from(open_redirect(RedirectSlot::Input, path)?),
            None => Stdio::inherit(),
        }
    } else {
        if let Some(path) = stage.redirect(RedirectSlot::Input) {
            log::debug!("{}: pipe takes precedence over <{}", stage.name, path);
        }
        // The upstream stage may have been skipped; read EOF then.
        upstream.map(Stdio::from).unwrap_or_else(Stdio::null)
    };

    let stdout = if wiring.last {
        let mut target = None;
        for slot in [RedirectSlot::Truncate, RedirectSlot::Append] {
            if let Some(path) = stage.redirect(slot) {
                target = Some(open_redirect(slot, path)?);
            }
        }
        target.map(Stdio::from).unwrap_or_else(Stdio::inherit)
    } else {
        for slot in [RedirectSlot::Truncate, RedirectSlot::Append] {
            if let Some(path) = stage.redirect(slot) {
                log::debug!("{}: pipe takes precedence over {}{}", stage.name, slot.operator(), path);
            }
        }
        Stdio::piped()
    };

    Ok((stdin, stdout))
}

fn open_redirect(slot: RedirectSlot, path: &str) -> Result<File, (String, io::Error)> {
    if path.is_empty() {
        return Err((
            slot.operator().to_string(),
            io::Error::new(io::ErrorKind::InvalidInput, "missing redirect target"),
        ));
    }
    let mut options = OpenOptions::new();
    match slot {
        RedirectSlot::Input => options.read(true),
        RedirectSlot::Truncate => options.write(true).create(true).truncate(true),
        RedirectSlot::Append => options.append(true).create(true),
    };
    options.open(path).map_err(|e| (path.to_string(), e))
}

/// Wait for every child, even after one of the waits failed.
///
/// Returns the status of the last child that was waited successfully and the first error.
fn wait_each<C>(
    children: Vec<C>,
    mut wait: impl FnMut(&mut C) -> io::Result<ExitStatus>,
) -> (Option<ExitStatus>, Option<io::Error>) {
    let mut last = None;
    let mut first_error = None;
    for mut child in children {
        match wait(&mut child) {
            Ok(status) => last = Some(status),
            Err(e) => {
                log::warn!("wait failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }
    (last, first_error)
}

fn report(stderr: &mut dyn Write, line: String) {
    if let Err(e) = writeln!(stderr, "{}", line) {
        log::warn!("can't report {:?}: {}", line, e);
    }
}

#[cfg(unix)]
fn set_arg0(cmd: &mut std::process::Command, name: &str) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut std::process::Command, _name: &str) {}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
