// Offline render: run the engine without a sound card and write a few bars
// to a WAV file. Handy for listening tests of the mixer and voices.
//
// Usage: render [out.wav] [--noise]

use std::sync::Arc;

use stepdrum::audio::engine::Engine;
use stepdrum::audio_api::EngineCommand;
use stepdrum::pipeline::pattern::step_index;
use stepdrum::shared::{SharedView, TRACK_KICK, TRACK_SECONDARY, TRACK_SNARE, TRACK_TOM};

const TICK_RATE: u32 = 28_000;
const BARS: u32 = 4;

fn main() -> anyhow::Result<()> {
    let out_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "stepdrum-demo.wav".into());
    let noise_mix = std::env::args().any(|a| a == "--noise");

    let mut engine = Engine::new(Arc::new(SharedView::new()));
    let interval = TICK_RATE * 60 / (120 * 4); // 120 bpm, 16th steps

    engine.handle_cmd(EngineCommand::SetTempoInterval(interval));
    engine.handle_cmd(EngineCommand::SetNoiseMix(noise_mix));
    engine.handle_cmd(EngineCommand::SetClick(true));
    for cmd in demo_pattern() {
        engine.handle_cmd(cmd);
    }
    engine.handle_cmd(EngineCommand::SetTransport(true));

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TICK_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&out_path, spec)?;

    let ticks = (interval + 1) * 32 * BARS;
    for _ in 0..ticks {
        let s = engine.next_sample();
        writer.write_sample(((s as i16) - 128) << 8)?;
    }
    writer.finalize()?;

    println!("wrote {ticks} ticks to {out_path}");
    Ok(())
}

// A basic four-on-the-floor with a bleep line on the secondary track.
fn demo_pattern() -> Vec<EngineCommand> {
    let mut cmds = Vec::new();
    let write = |track: usize, step: u8, rates| EngineCommand::WriteStep {
        track: track as u8,
        index: step_index(0, step) as u8,
        rates,
    };
    for step in (0..32).step_by(8) {
        cmds.push(write(TRACK_KICK, step, None));
    }
    cmds.push(write(TRACK_SNARE, 8, None));
    cmds.push(write(TRACK_SNARE, 24, None));
    for step in (4..32).step_by(8) {
        cmds.push(write(TRACK_TOM, step, None));
    }
    cmds.push(write(TRACK_SECONDARY, 2, Some((320, 0))));
    cmds.push(write(TRACK_SECONDARY, 10, Some((480, 0))));
    cmds.push(write(TRACK_SECONDARY, 18, Some((320, 256))));
    cmds.push(write(TRACK_SECONDARY, 26, Some((640, 0))));
    cmds
}
