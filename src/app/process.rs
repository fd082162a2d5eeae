use std::io::{self, Write};
use std::path::Path;
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::config::Config;
use crate::error::ClientError;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

#[cfg(unix)]
struct ScopedSigaction {
    signum: libc::c_int,
    old_action: libc::sigaction,
}

#[cfg(unix)]
impl ScopedSigaction {
    fn ignore(signum: libc::c_int) -> Result<Self> {
        unsafe {
            let mut new_action: libc::sigaction = std::mem::zeroed();
            new_action.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&mut new_action.sa_mask);
            new_action.sa_flags = 0;

            let mut old_action: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(signum, &new_action, &mut old_action) != 0 {
                return Err(anyhow!("failed to update signal action for {signum}"));
            }

            Ok(Self { signum, old_action })
        }
    }
}

#[cfg(unix)]
impl Drop for ScopedSigaction {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::sigaction(self.signum, &self.old_action, std::ptr::null_mut());
        }
    }
}

#[cfg(unix)]
struct TerminalForegroundGuard {
    stdin_fd: libc::c_int,
    parent_pgrp: libc::pid_t,
    child_foreground: bool,
}

#[cfg(unix)]
impl TerminalForegroundGuard {
    fn new(stdin_fd: libc::c_int, parent_pgrp: libc::pid_t) -> Self {
        Self {
            stdin_fd,
            parent_pgrp,
            child_foreground: false,
        }
    }

    fn handoff_to_child(&mut self, child_pgrp: libc::pid_t) {
        self.child_foreground = unsafe { libc::tcsetpgrp(self.stdin_fd, child_pgrp) == 0 };
    }
}

#[cfg(unix)]
impl Drop for TerminalForegroundGuard {
    fn drop(&mut self) {
        if !self.child_foreground {
            return;
        }
        unsafe {
            let _ = libc::tcsetpgrp(self.stdin_fd, self.parent_pgrp);
        }
    }
}

#[cfg(unix)]
fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    let _sigint_guard = ScopedSigaction::ignore(libc::SIGINT)?;
    f()
}

#[cfg(not(unix))]
fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    f()
}

/// Splits a configured command line such as `w3m -dump -T text/html` into
/// a ready-to-spawn command.
fn command_from_line(line: &str) -> Option<(String, ProcessCommand)> {
    let mut parts = line.split_whitespace();
    let program = parts.next()?.to_string();
    let mut cmd = ProcessCommand::new(&program);
    cmd.args(parts);
    Some((program, cmd))
}

fn spawn_error(role: &'static str, program: &str, err: io::Error) -> anyhow::Error {
    if err.kind() == io::ErrorKind::NotFound {
        ClientError::ToolMissing {
            role,
            program: program.to_string(),
        }
        .into()
    } else {
        anyhow::Error::new(err).context(format!("failed to launch {role} `{program}`"))
    }
}

fn missing(role: &'static str, line: &str) -> anyhow::Error {
    ClientError::ToolMissing {
        role,
        program: line.to_string(),
    }
    .into()
}

/// Runs a terminal program in the foreground process group, optionally
/// feeding `input` on its stdin. Ctrl-C goes to the child, not the shell.
#[cfg(unix)]
fn run_interactive_cmd(
    mut cmd: ProcessCommand,
    role: &'static str,
    program: &str,
    input: Option<&[u8]>,
) -> Result<ExitStatus> {
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    }
    let stdin_fd = libc::STDIN_FILENO;
    let parent_pgrp = unsafe { libc::tcgetpgrp(stdin_fd) };
    if parent_pgrp == -1 {
        let child = cmd.spawn().map_err(|err| spawn_error(role, program, err))?;
        return feed_and_wait(child, input, program);
    }

    let _sigttou_guard = ScopedSigaction::ignore(libc::SIGTTOU)?;
    let mut terminal_guard = TerminalForegroundGuard::new(stdin_fd, parent_pgrp);

    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            libc::signal(libc::SIGTSTP, libc::SIG_DFL);
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(|err| spawn_error(role, program, err))?;
    let child_pgid = child.id() as libc::pid_t;
    terminal_guard.handoff_to_child(child_pgid);
    feed_and_wait(child, input, program)
}

#[cfg(not(unix))]
fn run_interactive_cmd(
    mut cmd: ProcessCommand,
    role: &'static str,
    program: &str,
    input: Option<&[u8]>,
) -> Result<ExitStatus> {
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    }
    let child = cmd.spawn().map_err(|err| spawn_error(role, program, err))?;
    feed_and_wait(child, input, program)
}

fn feed_and_wait(
    mut child: std::process::Child,
    input: Option<&[u8]>,
    program: &str,
) -> Result<ExitStatus> {
    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        // the pager may quit before reading everything
        match stdin.write_all(input) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
            Err(err) => return Err(err).with_context(|| format!("failed writing to {program}")),
        }
    }
    child
        .wait()
        .with_context(|| format!("failed waiting on {program}"))
}

/// The three external programs the shell drives.
#[derive(Debug, Clone)]
pub(crate) struct Tools {
    pub(crate) renderer: String,
    pub(crate) pager: Option<String>,
    pub(crate) viewer: String,
}

impl Tools {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            renderer: config.renderer.clone(),
            pager: config.pager.clone(),
            viewer: config.viewer.clone(),
        }
    }

    /// Pipes HTML through the renderer and returns its plain-text output.
    pub(crate) fn render_html(&self, html: &[u8]) -> Result<String> {
        let role = "HTML renderer";
        let (program, mut cmd) =
            command_from_line(&self.renderer).ok_or_else(|| missing(role, &self.renderer))?;
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        debug!(program = %program, "rendering html");
        let mut child = cmd.spawn().map_err(|err| spawn_error(role, &program, err))?;

        let writer = child.stdin.take().map(|mut stdin| {
            let html = html.to_vec();
            thread::spawn(move || {
                let _ = stdin.write_all(&html);
            })
        });
        let output = child
            .wait_with_output()
            .with_context(|| format!("failed waiting on {program}"))?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }
        if !output.status.success() {
            return Err(anyhow!("{program} exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Shows `text` in the pager. Returns `Ok(false)` when no pager is
    /// configured so the caller prints it instead.
    pub(crate) fn page(&self, text: &str) -> Result<bool> {
        let Some(pager) = self.pager.as_deref() else {
            return Ok(false);
        };
        let role = "pager";
        let (program, cmd) = command_from_line(pager).ok_or_else(|| missing(role, pager))?;
        debug!(program = %program, "paging output");
        with_sigint_ignored(|| run_interactive_cmd(cmd, role, &program, Some(text.as_bytes())))?;
        Ok(true)
    }

    pub(crate) fn view_image(&self, path: &Path) -> Result<()> {
        let role = "image viewer";
        let (program, mut cmd) =
            command_from_line(&self.viewer).ok_or_else(|| missing(role, &self.viewer))?;
        cmd.arg(path);
        debug!(program = %program, path = %path.display(), "opening image");
        let status = with_sigint_ignored(|| run_interactive_cmd(cmd, role, &program, None))?;
        if !status.success() {
            return Err(anyhow!("{program} exited with {status}"));
        }
        Ok(())
    }
}
