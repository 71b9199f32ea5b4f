use std::process::{Command, Stdio};

use crate::config::SpeechConfig;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech is disabled")]
    Disabled,
    #[error("no TTS command configured")]
    NoCommand,
    #[error("failed to spawn TTS command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait Speaker: Send + Sync {
    /// Fire-and-forget; empty text after sanitizing is a no-op.
    fn speak_thai(&self, text: &str) -> Result<(), SpeechError>;
}

/// Drops characters outside the Basic Multilingual Plane (emoji) and trims.
pub fn sanitize_for_speech(text: &str) -> String {
    let kept: String = text.chars().filter(|c| (*c as u32) <= 0xFFFF).collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Runs an external TTS program with the text as its final argument.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    enabled: bool,
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(config: &SpeechConfig) -> Self {
        let mut parts = config.command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            enabled: config.enabled,
            program,
            args: parts.collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.program.is_empty()
    }
}

impl Speaker for CommandSpeaker {
    fn speak_thai(&self, text: &str) -> Result<(), SpeechError> {
        if !self.enabled {
            return Err(SpeechError::Disabled);
        }
        if self.program.is_empty() {
            return Err(SpeechError::NoCommand);
        }
        let text = sanitize_for_speech(text);
        if text.is_empty() {
            return Ok(());
        }
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        // reaped off-thread
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                tracing::debug!(error = %e, "TTS process wait failed");
            }
        });
        Ok(())
    }
}
