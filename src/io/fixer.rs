use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::model::config::EnforcerConfig;
use crate::ops::enforce::{FixError, TextFixer};

/// A [`TextFixer`] backed by a shell command: the repair prompt goes to its
/// stdin and whatever it prints on stdout is the response.
///
/// The command is killed once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct CommandFixer {
    command: String,
    timeout: Duration,
}

impl CommandFixer {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        CommandFixer {
            command: command.into(),
            timeout,
        }
    }

    /// The fixer named by the config, if any
    pub fn from_config(config: &EnforcerConfig) -> Option<Self> {
        let command = config.fix_command.as_deref()?.trim();
        if command.is_empty() {
            return None;
        }
        Some(CommandFixer::new(command, Duration::from_secs(config.fix_timeout_secs)))
    }

    fn spawn(&self) -> Result<Child, FixError> {
        Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FixError::Unavailable(format!("{}: {}", self.command, e)))
    }
}

/// Kill a command we stopped waiting for and reap it.
fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl TextFixer for CommandFixer {
    fn fix(&self, prompt: &str) -> Result<String, FixError> {
        let mut child = self.spawn()?;
        tracing::debug!(command = %self.command, "running fix command");

        // stdin is written on its own thread so a command that prints before
        // reading everything cannot deadlock against us
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            thread::spawn(move || {
                let _ = stdin.write_all(prompt.as_bytes());
            })
        });
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut out = Vec::new();
                let _ = stdout.read_to_end(&mut out);
                out
            })
        });
        let err_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut out = String::new();
                let _ = stderr.read_to_string(&mut out);
                out
            })
        });

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() < self.timeout => {
                    thread::sleep(Duration::from_millis(10));
                }
                Ok(None) => {
                    abandon(&mut child);
                    return Err(FixError::Timeout(self.timeout.as_secs()));
                }
                Err(e) => {
                    abandon(&mut child);
                    return Err(FixError::Failed(e.to_string()));
                }
            }
        };

        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let stdout = reader
            .and_then(|r| r.join().ok())
            .unwrap_or_default();
        let stderr = err_reader
            .and_then(|r| r.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let detail = stderr.trim();
            return Err(FixError::Failed(if detail.is_empty() {
                format!("exited with {}", status)
            } else {
                format!("exited with {}: {}", status, detail)
            }));
        }
        String::from_utf8(stdout).map_err(|_| FixError::Failed("response is not UTF-8".to_string()))
    }
}
