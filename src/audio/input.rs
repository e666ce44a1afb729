//! Microphone capture for single-shot speech sessions
//!
//! A [`Microphone`] records from the default input device on the calling
//! thread until the caller's block handler says the session is over or the
//! stop flag is raised.

use super::rms;
use crate::{MurmurError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Blocks the device callback may queue ahead of the session loop
const BLOCK_QUEUE: usize = 64;

/// How often the session loop rechecks the stop flag
const STOP_POLL: Duration = Duration::from_millis(100);

/// One callback's worth of mono audio and its level
#[derive(Debug, Clone)]
pub struct CapturedBlock {
    pub samples: Vec<f32>,
    /// RMS level of `samples`
    pub level: f32,
}

impl CapturedBlock {
    pub fn new(samples: Vec<f32>) -> Self {
        let level = rms(&samples);
        Self { samples, level }
    }
}

/// Average interleaved frames down to one channel
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// The default input device
pub struct Microphone {
    device: Device,
    config: StreamConfig,
}

impl Microphone {
    pub fn open() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| MurmurError::AudioDevice("No input device available".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| MurmurError::AudioDevice(format!("Failed to get input config: {}", e)))?
            .into();

        Ok(Self { device, config })
    }

    /// Whether the host has a default input device
    pub fn is_present() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Record one session.
    ///
    /// `on_block` sees every block as it arrives and returns true to end the
    /// session. Returns the whole mono recording at [`Self::sample_rate`].
    pub fn record<F>(&self, stop: &AtomicBool, mut on_block: F) -> Result<Vec<f32>>
    where
        F: FnMut(&CapturedBlock) -> bool,
    {
        let (block_tx, block_rx) = bounded::<CapturedBlock>(BLOCK_QUEUE);
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let block = CapturedBlock::new(downmix(data, channels));
                    if let Err(e) = block_tx.try_send(block) {
                        debug!("Dropped audio block: {}", e);
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(|e| {
                MurmurError::AudioDevice(format!("Failed to build input stream: {}", e))
            })?;

        stream
            .play()
            .map_err(|e| MurmurError::AudioDevice(format!("Failed to start input stream: {}", e)))?;
        debug!("Started audio capture at {} Hz", self.sample_rate());

        let mut recording = Vec::new();
        loop {
            if stop.load(Ordering::SeqCst) {
                debug!("Capture stopped by user");
                break;
            }

            match block_rx.recv_timeout(STOP_POLL) {
                Ok(block) => {
                    let done = on_block(&block);
                    recording.extend_from_slice(&block.samples);
                    if done {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Audio input closed mid-capture");
                    break;
                }
            }
        }

        drop(stream);
        debug!("Stopped audio capture ({} samples)", recording.len());
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let stereo = [0.2, 0.4, -1.0, 1.0, 0.5, 0.5];
        assert_eq!(downmix(&stereo, 2), vec![0.3, 0.0, 0.5]);
        assert_eq!(downmix(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn test_block_level() {
        assert_eq!(CapturedBlock::new(vec![0.0; 32]).level, 0.0);
        let block = CapturedBlock::new(vec![0.5, -0.5, 0.5, -0.5]);
        assert!((block.level - 0.5).abs() < 1e-6);
    }
}
