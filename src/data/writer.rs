// ============================================================
// Layer 4 — MIDI Writer
// ============================================================
// Converts generated events back into a Standard MIDI File so
// the output is playable by anything that played the input.
//
// Output is SMF Format 1: track 0 carries the tempo, track 1
// the notes on channel 0 (acoustic grand). Steps map back to
// ticks through the same `ticks_per_step` grid the loader
// quantized with, so write → load round-trips exactly.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::domain::event::Event;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Write events to a .mid file.
pub fn write_midi(events: &[Event], path: &Path, ticks_per_step: u32, tempo_bpm: u32) -> Result<()> {
    let smf = events_to_smf(events, ticks_per_step, tempo_bpm);
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(anyhow::Error::msg)
        .context("Cannot serialize MIDI data")?;
    fs::write(path, &buf).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Wrote {} events to '{}'", events.len(), path.display());
    Ok(())
}

fn events_to_smf(events: &[Event], ticks_per_step: u32, tempo_bpm: u32) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo
    let tempo_microseconds = 60_000_000 / tempo_bpm.max(1);
    let tempo_track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ];
    smf.tracks.push(tempo_track);

    // Track 1: notes. Build an absolute-tick on/off list first,
    // then delta-encode. NoteOffs sort before NoteOns at the
    // same tick so retriggered pitches don't collapse.
    let mut moments: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(events.len() * 2);
    let mut onset = 0u32;
    for e in events {
        onset += e.delta;
        let on_tick = onset * ticks_per_step;
        let off_tick = (onset + e.duration) * ticks_per_step;
        moments.push((on_tick, true, e.pitch, e.velocity));
        moments.push((off_tick, false, e.pitch, 0));
    }
    moments.sort_by_key(|&(tick, is_on, pitch, _)| (tick, is_on, pitch));

    let mut track: Track<'static> = Vec::with_capacity(moments.len() + 2);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::ProgramChange { program: u7::new(0) },
        },
    });

    let mut last_tick = 0u32;
    for (tick, is_on, pitch, vel) in moments {
        let delta = tick - last_tick;
        last_tick = tick;
        let message = if is_on {
            MidiMessage::NoteOn { key: u7::new(pitch), vel: u7::new(vel) }
        } else {
            MidiMessage::NoteOff { key: u7::new(pitch), vel: u7::new(0) }
        };
        track.push(TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi { channel: u4::new(0), message },
        });
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    smf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_midi_file;

    #[test]
    fn test_write_then_load_round_trips_events() {
        let events = vec![
            Event::new(60, 0, 2, 80),
            Event::new(64, 0, 2, 72), // chord with the C, pitch-ascending
            Event::new(67, 2, 4, 96),
            Event::new(60, 4, 1, 64),
        ];

        let dir = std::env::temp_dir().join(format!("cadenza-writer-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.mid");

        write_midi(&events, &path, 120, 120).unwrap();
        let piece = load_midi_file(&path, 120).unwrap();
        assert_eq!(piece.events, events);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_event_list_still_writes_a_valid_file() {
        let dir = std::env::temp_dir().join(format!("cadenza-writer-empty-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.mid");

        write_midi(&[], &path, 120, 120).unwrap();
        let piece = load_midi_file(&path, 120).unwrap();
        assert!(piece.events.is_empty());

        fs::remove_dir_all(&dir).ok();
    }
}
