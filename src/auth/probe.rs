//! VPN CLI availability probe
//!
//! The login screen tells the user whether the VPN command-line tool is
//! installed. The probe is an external collaborator; the gate only consumes
//! its boolean answer.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe unavailable: {0}")]
    Unavailable(String),
}

/// Reports whether the VPN command-line tool is installed
#[async_trait]
pub trait CliProbe: Send + Sync {
    async fn is_available(&self) -> Result<bool, ProbeError>;
}

/// Probe that runs `<program> --version` on the host
pub struct CommandProbe {
    program: String,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CliProbe for CommandProbe {
    async fn is_available(&self) -> Result<bool, ProbeError> {
        let result = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) => {
                debug!("{} --version exited with {}", self.program, status);
                Ok(status.success())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found on PATH", self.program);
                Ok(false)
            }
            Err(source) => Err(ProbeError::Spawn {
                program: self.program.clone(),
                source,
            }),
        }
    }
}

/// Probe with a fixed answer
pub struct StaticProbe(pub bool);

#[async_trait]
impl CliProbe for StaticProbe {
    async fn is_available(&self) -> Result<bool, ProbeError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let probe = CommandProbe::new("securevpn-definitely-not-installed-cli");
        assert!(!probe.is_available().await.unwrap());
    }

    #[tokio::test]
    async fn test_static_probe() {
        assert!(StaticProbe(true).is_available().await.unwrap());
        assert!(!StaticProbe(false).is_available().await.unwrap());
    }
}
