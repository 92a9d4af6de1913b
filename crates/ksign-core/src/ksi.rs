//! [`Signer`] backed by the `ksi` command-line tool.
//!
//! The canonical payload is staged in a uniquely named temporary file, the
//! tool is run as
//!
//! ```text
//! <program> [leading args] sign -i <payload> -o - -S <aggregator url> --aggr-user <user> --aggr-key <key>
//! ```
//!
//! and the raw signature it writes to stdout is returned base64-encoded.
//! The payload file is removed when the call returns, on every path.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use ksign_canonical::CanonicalBytes;

use crate::signer::{SignatureError, SignatureToken, Signer};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDERR_LOG_LIMIT: usize = 512;

/// Connection settings for the KSI aggregator.
#[derive(Clone)]
pub struct SignerConfig {
    /// Aggregator endpoint.
    pub aggregator_url: String,
    /// Aggregator user name.
    pub aggregator_user: String,
    /// Aggregator credential.
    pub aggregator_key: String,
    /// Upper bound on a single backend invocation.
    pub timeout: Duration,
    /// Directory for staged payloads (system temp dir when `None`).
    pub work_dir: Option<PathBuf>,
}

impl SignerConfig {
    /// Public Guardtime test aggregator.
    pub const DEFAULT_AGGREGATOR_URL: &'static str =
        "http://tryout.guardtime.net:8080/gt-signingservice";
    /// Default backend timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a config with the default timeout and work directory.
    pub fn new(
        aggregator_url: impl Into<String>,
        aggregator_user: impl Into<String>,
        aggregator_key: impl Into<String>,
    ) -> Self {
        Self {
            aggregator_url: aggregator_url.into(),
            aggregator_user: aggregator_user.into(),
            aggregator_key: aggregator_key.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            work_dir: None,
        }
    }

    /// Sets the backend timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the directory used for staged payloads.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("aggregator_url", &self.aggregator_url)
            .field("aggregator_user", &self.aggregator_user)
            .field("aggregator_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

/// Signs payloads by running the `ksi` tool once per call.
#[derive(Debug, Clone)]
pub struct KsiCommandSigner {
    program: OsString,
    leading_args: Vec<OsString>,
    config: SignerConfig,
}

impl KsiCommandSigner {
    /// Default program name, resolved through `PATH`.
    pub const DEFAULT_PROGRAM: &'static str = "ksi";

    /// Creates a signer that runs [`Self::DEFAULT_PROGRAM`].
    pub fn new(config: SignerConfig) -> Self {
        Self {
            program: OsString::from(Self::DEFAULT_PROGRAM),
            leading_args: Vec::new(),
            config,
        }
    }

    /// Replaces the program to run.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments placed before the `sign` subcommand (e.g. for wrapper scripts).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Connection settings in use.
    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    fn stage_payload(&self, payload: &CanonicalBytes) -> io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ksign-payload-").suffix(".json");
        let mut file = match &self.config.work_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    fn command(&self, payload_path: &std::path::Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg("sign")
            .arg("-i")
            .arg(payload_path)
            .args(["-o", "-"])
            .arg("-S")
            .arg(&self.config.aggregator_url)
            .arg("--aggr-user")
            .arg(&self.config.aggregator_user)
            .arg("--aggr-key")
            .arg(&self.config.aggregator_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl Signer for KsiCommandSigner {
    fn sign(&self, payload: &CanonicalBytes) -> Result<SignatureToken, SignatureError> {
        let payload_file = self.stage_payload(payload)?;
        let program = self.program.to_string_lossy().into_owned();

        tracing::debug!(
            program = %program,
            payload_path = %payload_file.path().display(),
            payload_len = payload.len(),
            "launching signing backend"
        );

        let started = Instant::now();
        let mut child = self
            .command(payload_file.path())
            .spawn()
            .map_err(|source| SignatureError::Launch {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(spawn_drain);
        let stderr = child.stderr.take().map(spawn_drain);

        let deadline = started + self.config.timeout;
        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                // Reader threads finish on their own once the pipes close.
                kill_and_reap(&mut child);
                tracing::warn!(
                    program = %program,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "signing backend timed out"
                );
                return Err(SignatureError::TimedOut {
                    after: self.config.timeout,
                });
            }
            Err(err) => {
                kill_and_reap(&mut child);
                return Err(SignatureError::Io(err));
            }
        };

        // A descendant can keep the pipes open after the child itself exits.
        let (signature, diagnostics) = match (collect(stdout, deadline)?, collect(stderr, deadline)?) {
            (Some(signature), Some(diagnostics)) => (signature, diagnostics),
            _ => {
                tracing::warn!(
                    program = %program,
                    status = %status,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "signing backend output still open at deadline"
                );
                return Err(SignatureError::TimedOut {
                    after: self.config.timeout,
                });
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        payload_file.close()?;

        if !status.success() {
            tracing::warn!(
                program = %program,
                status = %status,
                elapsed_ms,
                stderr = %truncate_lossy(&diagnostics, STDERR_LOG_LIMIT),
                "signing backend failed"
            );
            return Err(SignatureError::Failed { status });
        }
        if signature.is_empty() {
            tracing::warn!(program = %program, elapsed_ms, "signing backend wrote no signature");
            return Err(SignatureError::EmptyOutput);
        }

        tracing::debug!(
            program = %program,
            elapsed_ms,
            signature_len = signature.len(),
            "signing backend succeeded"
        );
        Ok(SignatureToken::from_signature_bytes(&signature))
    }
}

type Drained = Receiver<io::Result<Vec<u8>>>;

fn spawn_drain<R: Read + Send + 'static>(mut reader: R) -> Drained {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = reader.read_to_end(&mut buf).map(|_| buf);
        // The receiver is gone if the call already gave up on this stream.
        let _ = tx.send(result);
    });
    rx
}

/// Waits for a drained stream until `deadline` (`Ok(None)` when it passes).
fn collect(output: Option<Drained>, deadline: Instant) -> io::Result<Option<Vec<u8>>> {
    let Some(rx) = output else {
        return Ok(Some(Vec::new()));
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result.map(Some),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => {
            Err(io::Error::other("output reader thread panicked"))
        }
    }
}

/// Polls `child` until it exits or `deadline` passes (`Ok(None)`).
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!(error = %err, "failed to kill signing backend");
    }
    if let Err(err) = child.wait() {
        tracing::debug!(error = %err, "failed to reap signing backend");
    }
}

fn truncate_lossy(bytes: &[u8], max_len: usize) -> String {
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(max_len)]);
    if bytes.len() > max_len {
        format!("{}...", text.trim_end())
    } else {
        text.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_aggregator_key() {
        let config = SignerConfig::new("http://aggr", "alice", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn command_carries_connection_parameters() {
        let signer = KsiCommandSigner::new(SignerConfig::new("http://aggr", "alice", "secret"));
        let command = signer.command(std::path::Path::new("/tmp/payload.json"));
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(command.get_program(), "ksi");
        assert_eq!(
            args,
            [
                "sign",
                "-i",
                "/tmp/payload.json",
                "-o",
                "-",
                "-S",
                "http://aggr",
                "--aggr-user",
                "alice",
                "--aggr-key",
                "secret"
            ]
        );
    }

    #[test]
    fn leading_args_precede_subcommand() {
        let signer = KsiCommandSigner::new(SignerConfig::new("u", "n", "k"))
            .with_program("wrapper")
            .with_leading_args(["--profile", "prod"]);
        let command = signer.command(std::path::Path::new("p"));
        let args: Vec<_> = command.get_args().take(3).collect();
        assert_eq!(command.get_program(), "wrapper");
        assert_eq!(args, ["--profile", "prod", "sign"]);
    }

    #[test]
    fn truncation_marks_long_output() {
        assert_eq!(truncate_lossy(b"short\n", 16), "short");
        assert_eq!(truncate_lossy(b"abcdefgh", 4), "abcd...");
    }
}
