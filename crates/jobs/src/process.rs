// crates/jobs/src/process.rs
//! Process runner: spawns one external command and exposes its combined
//! stdout+stderr as a stream of lines plus an integer exit status.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::LaunchError;

/// Buffered lines between the pipe reader and the consumer.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Everything needed to launch one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
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

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Mark a value that must never show up in logs.
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    /// Command line with every registered secret masked, for logging.
    pub fn redacted(&self) -> String {
        let rendered = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.redact(&rendered)
    }

    /// Mask this command's secrets in arbitrary text, e.g. its own output.
    pub fn redact(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for secret in &self.secrets {
            masked = masked.replace(secret.as_str(), "***");
        }
        masked
    }

    /// Build the tokio `Command` for this spec (stdio not yet configured).
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Seam between the orchestrator and the operating system.
///
/// Production uses [`SystemLauncher`]; tests substitute launchers that run
/// scripted shells instead of git/ansible.
pub trait ProcessLauncher: Send + Sync + 'static {
    /// Spawn the command. Must not wait for anything beyond process creation.
    fn launch(&self, spec: &CommandSpec) -> Result<RunningProcess, LaunchError>;
}

/// Launches `CommandSpec`s as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &CommandSpec) -> Result<RunningProcess, LaunchError> {
        tracing::debug!(command = %spec.redacted(), cwd = ?spec.cwd, "Spawning process");
        RunningProcess::spawn(spec.to_command(), &spec.program)
    }
}

/// A spawned child whose output is being drained into a line channel.
pub struct RunningProcess {
    child: Child,
    pid: Option<u32>,
    lines: mpsc::Receiver<String>,
}

impl RunningProcess {
    /// Spawn `cmd` with stdin closed and stdout and stderr sharing one pipe,
    /// so lines arrive in the order the process wrote them. The child is
    /// killed if this value is dropped.
    pub fn spawn(mut cmd: Command, program: &str) -> Result<Self, LaunchError> {
        let launch_error = |source: std::io::Error| LaunchError {
            program: program.to_string(),
            source,
        };

        let (reader, writer) = std::io::pipe().map_err(launch_error)?;
        let stderr = writer.try_clone().map_err(launch_error)?;
        cmd.stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr)
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(launch_error)?;
        // Release our copies of the write end; EOF then means the child side closed.
        drop(cmd);
        let pid = child.id();

        let reader = pipe::Receiver::from_owned_fd(reader.into()).map_err(launch_error)?;
        let (tx, lines) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        tokio::spawn(pump_lines(reader, tx));

        Ok(Self { child, pid, lines })
    }

    /// OS process id, if the process had not already been reaped at spawn.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next line of combined output. `None` once the pipe is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Wait for the process to exit and return its exit code.
    pub async fn wait(&mut self) -> std::io::Result<i32> {
        let status = self.child.wait().await?;
        Ok(exit_code(status))
    }

    /// Forcefully kill the process, reap it, and return the resulting code.
    pub async fn kill(&mut self) -> std::io::Result<i32> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(exit_code(status));
        }
        self.child.kill().await?;
        self.wait().await
    }
}

/// Read `reader` line by line into `tx` until EOF or until the consumer
/// goes away.
async fn pump_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(decode_line(&buf)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error reading process output");
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut line = String::from_utf8_lossy(raw).into_owned();
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Exit code of a finished process. Death by signal maps to `-signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
