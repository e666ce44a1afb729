//! Reply audio playback
//!
//! There is a single shared player: loading new audio replaces whatever was
//! loaded before.

use crate::Result;
use tracing::debug;
#[cfg(feature = "audio-io")]
use tracing::warn;

/// Something that can play one encoded audio resource at a time
pub trait AudioPlayback: Send {
    /// Replace the current audio with `audio` (encoded mp3/wav/ogg/flac
    /// bytes) and start playing it
    fn load_and_play(&mut self, audio: Vec<u8>) -> Result<()>;

    /// Stop playback
    fn stop(&mut self);
}

/// Playback that discards everything. Used when audio output is disabled or
/// no device is present.
#[derive(Debug, Default)]
pub struct NullPlayback;

impl AudioPlayback for NullPlayback {
    fn load_and_play(&mut self, audio: Vec<u8>) -> Result<()> {
        debug!("Playback disabled; discarding {} bytes of audio", audio.len());
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Pick the best playback available
pub fn default_playback(enabled: bool) -> Box<dyn AudioPlayback> {
    if !enabled {
        return Box::new(NullPlayback);
    }

    #[cfg(feature = "audio-io")]
    {
        match SharedPlayer::new() {
            Ok(player) => return Box::new(player),
            Err(e) => warn!("Audio playback unavailable: {}", e),
        }
    }

    Box::new(NullPlayback)
}

#[cfg(feature = "audio-io")]
pub use device::SharedPlayer;

#[cfg(feature = "audio-io")]
mod device {
    use super::AudioPlayback;
    use crate::{MurmurError, Result};
    use crossbeam_channel::{bounded, unbounded, Sender};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::io::Cursor;
    use std::thread::{self, JoinHandle};
    use tracing::{debug, info, warn};

    enum PlayerCommand {
        Play(Vec<u8>),
        Stop,
        Shutdown,
    }

    /// rodio-backed player.
    ///
    /// The output stream is not `Send`, so it lives on its own thread and is
    /// driven through a channel.
    pub struct SharedPlayer {
        command_tx: Sender<PlayerCommand>,
        thread: Option<JoinHandle<()>>,
    }

    impl SharedPlayer {
        /// Open the default output device
        pub fn new() -> Result<Self> {
            let (command_tx, command_rx) = unbounded::<PlayerCommand>();
            let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

            let thread = thread::Builder::new()
                .name("murmur-playback".into())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(output) => output,
                        Err(e) => {
                            let _ = ready_tx.send(Err(MurmurError::AudioDevice(format!(
                                "No output device: {}",
                                e
                            ))));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    info!("Audio playback ready");

                    let mut current: Option<Sink> = None;
                    while let Ok(command) = command_rx.recv() {
                        match command {
                            PlayerCommand::Play(bytes) => {
                                if let Some(sink) = current.take() {
                                    sink.stop();
                                }
                                match play_bytes(&handle, bytes) {
                                    Ok(sink) => current = Some(sink),
                                    Err(e) => warn!("Audio play failed: {}", e),
                                }
                            }
                            PlayerCommand::Stop => {
                                if let Some(sink) = current.take() {
                                    sink.stop();
                                }
                            }
                            PlayerCommand::Shutdown => break,
                        }
                    }

                    debug!("Playback thread stopped");
                })
                .map_err(|e| MurmurError::Io(format!("Failed to spawn playback thread: {}", e)))?;

            ready_rx
                .recv()
                .map_err(|e| MurmurError::Channel(format!("Playback thread died: {}", e)))??;

            Ok(Self {
                command_tx,
                thread: Some(thread),
            })
        }

        fn send(&self, command: PlayerCommand) -> Result<()> {
            self.command_tx
                .send(command)
                .map_err(|e| MurmurError::Channel(format!("Playback thread gone: {}", e)))
        }
    }

    fn play_bytes(handle: &OutputStreamHandle, bytes: Vec<u8>) -> Result<Sink> {
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| MurmurError::Playback(format!("Unsupported audio: {}", e)))?;
        let sink = Sink::try_new(handle)
            .map_err(|e| MurmurError::Playback(format!("Failed to open sink: {}", e)))?;
        sink.append(source);
        sink.play();
        Ok(sink)
    }

    impl AudioPlayback for SharedPlayer {
        fn load_and_play(&mut self, audio: Vec<u8>) -> Result<()> {
            self.send(PlayerCommand::Play(audio))
        }

        fn stop(&mut self) {
            let _ = self.send(PlayerCommand::Stop);
        }
    }

    impl Drop for SharedPlayer {
        fn drop(&mut self) {
            let _ = self.send(PlayerCommand::Shutdown);
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_playback_accepts_anything() {
        let mut playback = NullPlayback;
        assert!(playback.load_and_play(vec![0u8; 16]).is_ok());
        playback.stop();
    }

    #[test]
    fn test_disabled_playback_is_null() {
        let mut playback = default_playback(false);
        assert!(playback.load_and_play(Vec::new()).is_ok());
    }
}
