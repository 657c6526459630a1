//! Listening audio as a state machine.
//!
//! In an official exam the recording is played exactly once: a countdown
//! precedes automatic playback and nothing can pause, seek, or replay it.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPolicy {
    pub strict: bool,
    pub allow_pause: bool,
    pub countdown_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Idle,
    Countdown { remaining: u32 },
    Playing { position: u32 },
    Paused { position: u32 },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    Play,
    Pause,
    Seek(u32),
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AudioRejection {
    #[error("the recording has already been played")]
    AlreadyPlayed,
    #[error("pausing is disabled")]
    PauseLocked,
    #[error("seeking is disabled")]
    SeekLocked,
    #[error("nothing is playing")]
    NotPlaying,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioGate {
    source: Option<String>,
    duration: Option<u32>,
    policy: AudioPolicy,
    state: AudioState,
}

impl AudioGate {
    pub fn new(source: Option<String>, duration: Option<u32>, policy: AudioPolicy) -> Self {
        Self {
            source,
            duration,
            policy,
            state: AudioState::Idle,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn duration(&self) -> Option<u32> {
        self.duration
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn policy(&self) -> AudioPolicy {
        self.policy
    }

    /// Playback has started at least once.
    pub fn has_played(&self) -> bool {
        matches!(
            self.state,
            AudioState::Playing { .. } | AudioState::Paused { .. } | AudioState::Finished
        )
    }

    pub fn position(&self) -> u32 {
        match self.state {
            AudioState::Playing { position } | AudioState::Paused { position } => position,
            AudioState::Finished => self.duration.unwrap_or(0),
            _ => 0,
        }
    }

    /// Strict sections start their countdown as soon as they become active.
    pub fn arm(&mut self) {
        if self.policy.strict && self.state == AudioState::Idle {
            info!(countdown = self.policy.countdown_secs, "listening countdown started");
            self.state = self.countdown_or_play();
        }
    }

    pub fn apply(&mut self, command: AudioCommand) -> Result<AudioState, AudioRejection> {
        if self.policy.strict {
            self.apply_strict(command)?;
        } else {
            self.apply_practice(command)?;
        }
        Ok(self.state)
    }

    fn apply_strict(&mut self, command: AudioCommand) -> Result<(), AudioRejection> {
        match command {
            AudioCommand::Play => match self.state {
                AudioState::Idle => {
                    self.state = self.countdown_or_play();
                    Ok(())
                }
                AudioState::Finished => Err(AudioRejection::AlreadyPlayed),
                _ => Ok(()),
            },
            AudioCommand::Pause => Err(AudioRejection::PauseLocked),
            AudioCommand::Seek(_) => Err(AudioRejection::SeekLocked),
            AudioCommand::Restart => Err(AudioRejection::AlreadyPlayed),
        }
    }

    fn apply_practice(&mut self, command: AudioCommand) -> Result<(), AudioRejection> {
        match command {
            AudioCommand::Play => {
                self.state = match self.state {
                    AudioState::Paused { position } => AudioState::Playing { position },
                    AudioState::Playing { position } => AudioState::Playing { position },
                    _ => AudioState::Playing { position: 0 },
                };
                Ok(())
            }
            AudioCommand::Pause => match self.state {
                AudioState::Playing { position } if self.policy.allow_pause => {
                    self.state = AudioState::Paused { position };
                    Ok(())
                }
                AudioState::Playing { .. } => Err(AudioRejection::PauseLocked),
                _ => Err(AudioRejection::NotPlaying),
            },
            AudioCommand::Seek(to) => match self.state {
                AudioState::Playing { .. } | AudioState::Paused { .. } => {
                    let to = self.duration.map_or(to, |d| to.min(d));
                    self.state = match self.state {
                        AudioState::Paused { .. } => AudioState::Paused { position: to },
                        _ => AudioState::Playing { position: to },
                    };
                    Ok(())
                }
                _ => Err(AudioRejection::NotPlaying),
            },
            AudioCommand::Restart => {
                self.state = AudioState::Playing { position: 0 };
                Ok(())
            }
        }
    }

    /// One-second step of the playback clock.
    pub fn tick(&mut self) {
        self.state = match self.state {
            AudioState::Countdown { remaining } if remaining <= 1 => {
                info!("listening audio playback started");
                AudioState::Playing { position: 0 }
            }
            AudioState::Countdown { remaining } => AudioState::Countdown {
                remaining: remaining - 1,
            },
            AudioState::Playing { position } => {
                let next = position + 1;
                match self.duration {
                    Some(d) if next >= d => AudioState::Finished,
                    _ => AudioState::Playing { position: next },
                }
            }
            other => other,
        };
    }

    fn countdown_or_play(&self) -> AudioState {
        if self.policy.countdown_secs == 0 {
            AudioState::Playing { position: 0 }
        } else {
            AudioState::Countdown {
                remaining: self.policy.countdown_secs,
            }
        }
    }
}
