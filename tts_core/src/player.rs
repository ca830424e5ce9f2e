//! Hands finished audio to an external player.
//!
//! The player owns the file once playback starts: it is deleted after the
//! player exits successfully.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::PlayerError;

#[derive(Debug, Clone)]
pub struct AudioPlayer {
    program: String,
    args: Vec<String>,
}

impl AudioPlayer {
    /// Parse a whitespace-separated command line such as `mpv --no-video`.
    pub fn new(command: &str) -> Result<Self, PlayerError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(PlayerError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Play `file` to completion, then delete it.
    pub async fn play(&self, file: &Path) -> Result<(), PlayerError> {
        info!("Playing {} with {}", file.display(), self.program);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| PlayerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(PlayerError::Failed(status));
        }

        match tokio::fs::remove_file(file).await {
            Ok(()) => debug!("Removed played file {}", file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove played file {}: {e}", file.display()),
        }
        Ok(())
    }
}
