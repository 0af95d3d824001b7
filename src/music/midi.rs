//! MIDI primer writing and generated-file reading
//!
//! Primers are written as single-track Standard MIDI Files so they can be
//! passed through `--primer_midi`. Generated files are only read back for
//! statistics; we never rewrite them.

use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};
use std::path::Path;

use super::primer::{PrimerMelody, PrimerTiming, QuantizedNote, MAX_TEMPO_MICROS, STEPS_PER_QUARTER};

/// Ticks per quarter note in written primers
const TICKS_PER_QUARTER: u16 = 480;

const TICKS_PER_STEP: u32 = TICKS_PER_QUARTER as u32 / STEPS_PER_QUARTER;

/// Largest delta time a track event can carry (28-bit variable length)
const MAX_DELTA_TICKS: u32 = 0x0FFF_FFFF;

/// A note read back from a MIDI file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadNote {
    /// Onset in beats (0.0 = start)
    pub beat: f32,
    /// MIDI note number (0-127)
    pub pitch: u8,
    pub velocity: u8,
    /// MIDI channel (0-15)
    pub channel: u8,
}

/// Quantize a primer and write it to `path`
pub fn write_primer_midi(
    primer: &PrimerMelody,
    timing: &PrimerTiming,
    path: &Path,
) -> Result<(), String> {
    timing
        .validate()
        .map_err(|e| format!("Invalid primer timing: {}", e))?;
    let smf = primer_to_smf(&timing.quantize(primer), timing.qpm);
    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| format!("Failed to encode primer MIDI: {}", e))?;
    std::fs::write(path, &buf)
        .map_err(|e| format!("Failed to write primer MIDI {}: {}", path.display(), e))
}

fn primer_to_smf(notes: &[QuantizedNote], qpm: f64) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    let qpm = if qpm > 0.0 { qpm } else { 120.0 };
    let tempo_microseconds = ((60_000_000.0 / qpm).round() as u32).clamp(1, MAX_TEMPO_MICROS);

    // (tick, is_note_on, pitch, velocity); offs sort before ons at equal ticks
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        events.push((note.start_step.saturating_mul(TICKS_PER_STEP), true, note.pitch, note.velocity));
        events.push((note.end_step.saturating_mul(TICKS_PER_STEP), false, note.pitch, 0));
    }
    events.sort_by_key(|&(tick, on, _, _)| (tick, on));

    let mut track = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
    }];

    let channel = u4::new(0);
    let mut last_tick = 0;
    for (tick, on, pitch, velocity) in events {
        let message = if on {
            MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(velocity.min(127)),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new((tick - last_tick).min(MAX_DELTA_TICKS)),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);
    smf
}

/// Read every sounding note from a MIDI file, ordered by onset.
///
/// Notes from all tracks are merged; ties keep track order.
pub fn read_notes(path: &Path) -> Result<Vec<ReadNote>, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read MIDI file: {}", e))?;

    let smf = Smf::parse(&data)
        .map_err(|e| format!("Failed to parse MIDI file: {}", e))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int().max(1),
        // Rough approximation for SMPTE timing
        Timing::Timecode(fps, tpf) => ((fps.as_f32() * tpf as f32 / 2.0) as u16).max(1),
    };

    let mut notes = Vec::new();
    for track in &smf.tracks {
        let mut current_tick: u32 = 0;
        for event in track {
            current_tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            } = event.kind
            {
                if vel.as_int() > 0 {
                    notes.push(ReadNote {
                        beat: current_tick as f32 / ticks_per_beat as f32,
                        pitch: key.as_int(),
                        velocity: vel.as_int(),
                        channel: channel.as_int(),
                    });
                }
            }
        }
    }

    if notes.is_empty() {
        return Err("MIDI file contains no note data".to_string());
    }

    notes.sort_by(|a, b| a.beat.partial_cmp(&b.beat).unwrap_or(std::cmp::Ordering::Equal));
    Ok(notes)
}

/// Pitches of every note in onset order
pub fn read_pitches(path: &Path) -> Result<Vec<u8>, String> {
    Ok(read_notes(path)?.into_iter().map(|n| n.pitch).collect())
}
