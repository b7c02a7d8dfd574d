//! Persistent tmux session hosting the server.
//!
//! Only one session per name exists. [`SessionManager::launch`] checks for
//! it and then creates, replaces or reuses it. The check and the action are
//! separate multiplexer calls, so two launchers racing on the same name can
//! both see it absent; the launcher is meant for a single operator and does
//! not lock.

use std::io::{self, BufRead, Write};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

use crate::command::LaunchCommand;
use crate::console::Console;
use crate::error::LaunchError;

/// Whether the session slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Active,
}

/// What [`SessionManager::launch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// No session existed; a new one was created.
    Created,
    /// The old session was killed and a new one created.
    Replaced,
    /// The operator kept the running session.
    Reused,
}

/// Operations on named multiplexer sessions.
pub trait Multiplexer {
    fn has_session(&self, name: &str) -> Result<bool, LaunchError>;

    /// Start a detached session running `command`.
    fn create(&mut self, name: &str, command: &LaunchCommand) -> Result<(), LaunchError>;

    fn terminate(&mut self, name: &str) -> Result<(), LaunchError>;

    /// Attach the terminal. Blocks until the operator detaches.
    fn attach(&mut self, name: &str) -> Result<(), LaunchError>;
}

/// Wrap a shell line so the session stays open after the server exits.
///
/// The exit status is printed and the window waits for Enter.
pub fn wrap_with_exit_notice(line: &str) -> String {
    format!(
        "{}; status=$?; echo; echo \"Server exited with status $status. Press Enter to close this session.\"; read _",
        line
    )
}

/// tmux-backed [`Multiplexer`].
#[derive(Debug, Clone)]
pub struct Tmux {
    binary: String,
}

impl Tmux {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    fn spawn_error(&self, e: io::Error) -> LaunchError {
        if e.kind() == io::ErrorKind::NotFound {
            LaunchError::MultiplexerNotFound(self.binary.clone())
        } else {
            LaunchError::Io(e)
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, LaunchError> {
        // The session command carries the API key; log the subcommand only.
        debug!("{} {}", self.binary, args.first().copied().unwrap_or_default());
        self.command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))
    }

    fn run_checked(&self, args: &[&str]) -> Result<(), LaunchError> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(LaunchError::Multiplexer(format!(
                "`{} {}` failed: {}",
                self.binary,
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl Default for Tmux {
    fn default() -> Self {
        Self::new("tmux")
    }
}

/// Exact-match target; plain names would prefix-match other sessions.
fn target(name: &str) -> String {
    format!("={}", name)
}

impl Multiplexer for Tmux {
    fn has_session(&self, name: &str) -> Result<bool, LaunchError> {
        let target = target(name);
        Ok(self.run(&["has-session", "-t", target.as_str()])?.status.success())
    }

    fn create(&mut self, name: &str, command: &LaunchCommand) -> Result<(), LaunchError> {
        let line = wrap_with_exit_notice(&command.to_shell_line());
        self.run_checked(&["new-session", "-d", "-s", name, line.as_str()])
    }

    fn terminate(&mut self, name: &str) -> Result<(), LaunchError> {
        let target = target(name);
        self.run_checked(&["kill-session", "-t", target.as_str()])
    }

    fn attach(&mut self, name: &str) -> Result<(), LaunchError> {
        // Nested attach is refused by tmux; switch the current client instead.
        let subcommand = if std::env::var_os("TMUX").is_some() {
            "switch-client"
        } else {
            "attach-session"
        };
        let target = target(name);
        let status = self
            .command()
            .args([subcommand, "-t", target.as_str()])
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if status.success() {
            Ok(())
        } else {
            Err(LaunchError::Multiplexer(format!(
                "`{} {}` exited with {}",
                self.binary, subcommand, status
            )))
        }
    }
}

fn session_name(name: String) -> String {
    if !name.contains(['.', ':']) {
        return name;
    }
    let sanitized = name.replace(['.', ':'], "_");
    debug!("Session name '{}' is used as '{}'", name, sanitized);
    sanitized
}

/// Owner of the single named session slot.
pub struct SessionManager<M> {
    mux: M,
    name: String,
    attach: bool,
}

impl<M: Multiplexer> SessionManager<M> {
    /// Create a manager for session `name`. Attaches after launch by default.
    ///
    /// tmux stores `.` and `:` in session names as `_`, so the name is
    /// rewritten the same way up front; otherwise the session would never be
    /// found again under the configured name.
    pub fn new(mux: M, name: impl Into<String>) -> Self {
        Self {
            mux,
            name: session_name(name.into()),
            attach: true,
        }
    }

    /// Set whether [`launch`](Self::launch) attaches the terminal afterwards.
    pub fn with_attach(mut self, attach: bool) -> Self {
        self.attach = attach;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    pub(crate) fn multiplexer(&self) -> &M {
        &self.mux
    }

    pub fn state(&self) -> Result<SessionState, LaunchError> {
        if self.mux.has_session(&self.name)? {
            Ok(SessionState::Active)
        } else {
            Ok(SessionState::Absent)
        }
    }

    /// Start `command` in the session, asking before replacing a running one.
    pub fn launch<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        command: &LaunchCommand,
    ) -> Result<LaunchOutcome, LaunchError> {
        let outcome = match self.state()? {
            SessionState::Absent => {
                self.create(command)?;
                LaunchOutcome::Created
            }
            SessionState::Active => {
                let question = format!("Session '{}' is already running. Replace it?", self.name);
                if console.confirm(&question)? {
                    info!("Replacing session '{}'", self.name);
                    self.mux.terminate(&self.name)?;
                    self.create(command)?;
                    LaunchOutcome::Replaced
                } else {
                    info!("Keeping running session '{}'", self.name);
                    LaunchOutcome::Reused
                }
            }
        };

        if self.attach {
            console.say(format_args!(
                "Attaching to session '{}' (detach with Ctrl-b d)...",
                self.name
            ))?;
            self.mux.attach(&self.name)?;
        } else {
            console.say(format_args!(
                "Server running in session '{}'. Attach with: tmux attach -t {}",
                self.name, self.name
            ))?;
        }

        Ok(outcome)
    }

    fn create(&mut self, command: &LaunchCommand) -> Result<(), LaunchError> {
        info!("Creating session '{}'", self.name);
        debug!("Session command: {}", command.to_redacted_line());
        self.mux.create(&self.name, command)
    }

    /// Attach to the running session.
    pub fn attach(&mut self) -> Result<(), LaunchError> {
        if self.state()? == SessionState::Absent {
            return Err(LaunchError::SessionNotFound(self.name.clone()));
        }
        self.mux.attach(&self.name)
    }

    /// Kill the session if it exists. Returns whether one was running.
    pub fn stop(&mut self) -> Result<bool, LaunchError> {
        match self.state()? {
            SessionState::Absent => Ok(false),
            SessionState::Active => {
                info!("Stopping session '{}'", self.name);
                self.mux.terminate(&self.name)?;
                Ok(true)
            }
        }
    }
}
