use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::output;

pub mod detect;
pub mod pip;
pub mod virtualenv;

/// External process interface.
///
/// Every tool the pipeline depends on (environment tool, installer, hooks,
/// detection) is reached through this trait, so the orchestrator never spawns
/// processes directly.
///
/// # Behavior
/// - A non-zero exit is reported as `ToolOutcome::Failure`, never as `Err`.
/// - `Err` means the program could not be started or its pipes failed.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutcome>;
}

/// What to do with a child's output while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// Print each line through the indentation filter as it arrives.
    Stream,
    /// Collect silently; the caller decides whether to print.
    Capture,
}

/// A fully described external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete child environment; nothing else is inherited.
    pub env: BTreeMap<String, String>,
    pub echo: Echo,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path, env: &ProcessEnv) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env: env.vars().clone(),
            echo: Echo::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn streamed(mut self) -> Self {
        self.echo = Echo::Stream;
        self
    }

    /// `program arg1 arg2`, for log lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Typed result of an external call.
///
/// The text payload is opaque: callers print it, they do not parse it for
/// control decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success { output: String },
    Failure { code: Option<i32>, diagnostic: String },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success { output } => output,
            ToolOutcome::Failure { diagnostic, .. } => diagnostic,
        }
    }
}

/// Environment snapshot handed to child processes.
///
/// Taken once from the real process environment at startup and then changed
/// only through explicit calls (activation, download cache), so every step
/// can see exactly which variables it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnv {
    vars: BTreeMap<String, String>,
}

impl ProcessEnv {
    pub fn from_current() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Shell-style flag test: set and non-empty.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Put `dir` in front of the search path.
    pub fn prepend_path(&mut self, dir: &Path) {
        let dir = dir.display().to_string();
        let path = match self.get("PATH") {
            Some(existing) if !existing.is_empty() => format!("{dir}:{existing}"),
            _ => dir,
        };
        self.set("PATH", path);
    }
}

/// `std::process::Command` backed runner.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ToolOutcome> {
        debug!(cmd = %invocation.display(), cwd = %invocation.cwd.display(), "spawning process");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let echo = invocation.echo;

        // Both pipes are drained concurrently into one channel so neither can
        // fill up and stall the child, and lines keep their arrival order.
        let (tx, rx) = mpsc::channel();
        let text = std::thread::scope(|scope| -> io::Result<String> {
            let out_handle = scope.spawn({
                let tx = tx.clone();
                move || forward(stdout, tx)
            });
            let err_handle = scope.spawn(move || forward(stderr, tx));

            let mut text = String::new();
            for line in rx {
                if echo == Echo::Stream {
                    println!("{}", output::indent_line(&line));
                }
                text.push_str(&line);
                text.push('\n');
            }

            for handle in [out_handle, err_handle] {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")))?;
            }
            Ok(text)
        })?;

        let status = child.wait()?;
        debug!(cmd = %invocation.program, code = ?status.code(), "process exited");

        if status.success() {
            Ok(ToolOutcome::Success { output: text })
        } else {
            Ok(ToolOutcome::Failure {
                code: status.code(),
                diagnostic: text,
            })
        }
    }
}

fn forward<R: Read>(reader: Option<R>, lines: mpsc::Sender<String>) -> io::Result<()> {
    let Some(reader) = reader else {
        return Ok(());
    };

    // Tool output is not guaranteed to be UTF-8.
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if lines.send(line).is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Invocation {
        let env = ProcessEnv::from_vars([("PATH", "/usr/bin:/bin")]);
        Invocation::new("sh", &std::env::temp_dir(), &env).args(["-c", script])
    }

    #[test]
    fn non_zero_exit_is_a_failure_with_its_code() {
        let outcome = SystemRunner
            .run(&shell("echo out; echo err 1>&2; exit 3"))
            .unwrap();

        match outcome {
            ToolOutcome::Failure { code, diagnostic } => {
                assert_eq!(code, Some(3));
                assert!(diagnostic.contains("out\n"));
                assert!(diagnostic.contains("err\n"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn stdout_and_stderr_are_both_captured_on_success() {
        let outcome = SystemRunner.run(&shell("echo ready; echo warned 1>&2")).unwrap();

        assert!(outcome.is_success());
        let mut lines: Vec<_> = outcome.text().lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["ready", "warned"]);
    }

    #[test]
    fn child_sees_only_the_given_environment() {
        std::env::set_var("VENVPACK_PARENT_ONLY", "leaked");
        let mut invocation = shell("echo \"${VENVPACK_PARENT_ONLY:-unset} $GIVEN\"");
        invocation
            .env
            .insert("GIVEN".to_string(), "given".to_string());

        let outcome = SystemRunner.run(&invocation).unwrap();

        assert_eq!(outcome.text(), "unset given\n");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let outcome = SystemRunner.run(&shell("printf '\\377bad\\n'")).unwrap();

        assert_eq!(outcome.text(), "\u{FFFD}bad\n");
    }

    #[test]
    fn large_stderr_does_not_stall_the_child() {
        // Far more than a pipe buffer holds, while stdout stays open.
        let outcome = SystemRunner
            .run(&shell("yes 0123456789 | head -n 200000 1>&2; echo finished"))
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.text().lines().count(), 200_001);
        assert!(outcome.text().contains("finished\n"));
    }

    #[test]
    fn missing_program_is_an_error() {
        let env = ProcessEnv::from_vars([("PATH", "/usr/bin:/bin")]);
        let invocation = Invocation::new(
            "venvpack-no-such-tool",
            &std::env::temp_dir(),
            &env,
        );

        assert!(SystemRunner.run(&invocation).is_err());
    }
}
