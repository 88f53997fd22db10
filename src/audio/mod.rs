use std::sync::Arc;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::EngineCommand;
use crate::shared::SharedView;

pub mod engine;
pub mod mixer;
pub mod sample_bank;
pub mod sequencer;
pub mod voice;

use engine::Engine;

pub struct AudioHandle {
    tx: Sender<EngineCommand>,
    shared: Arc<SharedView>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: EngineCommand) {
        let _ = self.tx.try_send(cmd);
    }

    pub fn shared(&self) -> Arc<SharedView> {
        self.shared.clone()
    }

    /// Ticks per second: one output frame is one tick.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<EngineCommand>(1024);
    let shared = Arc::new(SharedView::new());

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;
    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, shared.clone(), channels)?;
            output_stream
                .play()
                .context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                shared,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<EngineCommand>,
    shared: Arc<SharedView>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(shared);

    let err_fn = |err| eprintln!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            // one tick per frame; the engine hands back 8-bit centered
            // samples and the transport conversion to f32 happens here
            for frame in data.chunks_mut(channels) {
                let s = engine.next_sample();
                let value = (s as f32 - 128.0) / 128.0;
                for ch in frame.iter_mut() {
                    *ch = value;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
