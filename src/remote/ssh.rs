use std::io::Read;
use std::net::TcpStream;

use ssh2::Session;

use super::{FetchError, LogSource};
use crate::config::SshConfig;

const EVENT_PATTERN: &str = "joined the game|left the game";

/// The only stderr content that does not abort a fetch: a glob that
/// matched no files (e.g. no rotated `.gz` logs yet).
const BENIGN_STDERR: &str = "No such file or directory";

/// Fetches join/leave lines by running grep/zgrep on the server over SSH.
#[derive(Debug, Clone)]
pub struct SshLogSource {
    config: SshConfig,
}

impl SshLogSource {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    fn connect(&self) -> Result<Session, FetchError> {
        let cfg = &self.config;
        let tcp = TcpStream::connect((cfg.hostname.as_str(), cfg.port)).map_err(|source| {
            FetchError::Connect {
                host: cfg.hostname.clone(),
                port: cfg.port,
                source,
            }
        })?;

        let mut session = Session::new().map_err(ssh_err("session setup"))?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(ssh_err("handshake"))?;

        session
            .userauth_pubkey_file(
                &cfg.username,
                None,
                &cfg.key_path,
                cfg.passphrase.as_deref(),
            )
            .map_err(ssh_err("public key authentication"))?;

        if !session.authenticated() {
            return Err(FetchError::Auth(cfg.username.clone()));
        }

        Ok(session)
    }
}

fn ssh_err(stage: &'static str) -> impl Fn(ssh2::Error) -> FetchError {
    move |source| FetchError::Ssh { stage, source }
}

impl LogSource for SshLogSource {
    fn describe(&self) -> String {
        format!(
            "{}@{}:{}",
            self.config.username, self.config.hostname, self.config.port
        )
    }

    fn progress(&self) -> String {
        format!(
            "Connecting to {} and fetching player join/leave events...",
            self.describe()
        )
    }

    fn fetch(&self) -> Result<String, FetchError> {
        let session = self.connect()?;
        let command = remote_command(&self.config.log_dir);
        tracing::debug!(%command, "running remote command");

        let mut channel = session.channel_session().map_err(ssh_err("channel open"))?;
        channel.exec(&command).map_err(ssh_err("exec"))?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        channel.wait_close().map_err(ssh_err("channel close"))?;
        tracing::debug!(
            exit_status = channel.exit_status().ok(),
            bytes = stdout.len(),
            "remote command finished"
        );

        check_stderr(&stderr)?;
        Ok(stdout)
    }
}

/// Single-quote a path for POSIX sh.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// grep the plain logs and zgrep the rotated ones in one round trip.
///
/// The two searches are sequenced with `;` so that rotated logs are still
/// searched when the plain ones yield nothing.
pub fn remote_command(log_dir: &str) -> String {
    let dir = shell_quote(log_dir.trim_end_matches('/'));
    format!(
        r#"grep -E "{pat}" {dir}/*.log; zgrep -E "{pat}" {dir}/*.gz"#,
        pat = EVENT_PATTERN,
        dir = dir
    )
}

/// Every non-empty stderr line must be a missing-file complaint.
pub fn check_stderr(stderr: &str) -> Result<(), FetchError> {
    let fatal: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains(BENIGN_STDERR))
        .collect();

    if fatal.is_empty() {
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = stderr.trim(), "ignoring missing-file messages");
        }
        Ok(())
    } else {
        Err(FetchError::RemoteStderr(fatal.join("\n")))
    }
}
