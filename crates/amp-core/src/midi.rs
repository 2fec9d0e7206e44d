//! Tempo patching for compiled MIDI tracks (`.mid_ps3`, `.mid_ps4`).
//!
//! The compiled track ends with a platform terminator. The tempo, in
//! microseconds per quarter note, sits in a three-byte field a fixed
//! distance after it: big-endian at +21 on PS3, little-endian at +19 on PS4.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use amp_model::Platform;

use crate::error::{Result, SongError};

/// Bytes at the end of the stream searched for the terminator.
pub const TEMPO_SCAN_WINDOW: u64 = 1024;

/// Microseconds per quarter note for `bpm`, rounded half to even.
#[must_use]
pub fn tempo_value(bpm: f32) -> u32 {
    (60_000_000.0f32 / bpm).round_ties_even() as u32
}

fn field_offset(platform: Platform) -> usize {
    match platform {
        Platform::Ps3 => 8 + 11 + 2,
        Platform::Ps4 => 8 + 11,
    }
}

fn encode_tempo(tempo: u32, platform: Platform) -> [u8; 3] {
    let [_, high, mid, low] = tempo.to_be_bytes();
    match platform {
        Platform::Ps3 => [high, mid, low],
        Platform::Ps4 => [low, mid, high],
    }
}

/// Overwrite the tempo field of a compiled MIDI track.
///
/// Only the last [`TEMPO_SCAN_WINDOW`] bytes are searched. The stream
/// position is restored whether or not the patch succeeds. Returns the
/// absolute offset of the patched field.
///
/// # Errors
///
/// Returns [`SongError::PatchNotFound`] when no terminator is found and
/// [`SongError::InvalidFormat`] for a non-positive or non-finite `bpm`.
pub fn patch_tempo<S: Read + Write + Seek>(
    stream: &mut S,
    bpm: f32,
    platform: Platform,
) -> Result<u64> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(SongError::invalid_format(format!("bpm {bpm} is out of range")));
    }
    let start = stream.stream_position()?;
    let result = scan_and_patch(stream, tempo_value(bpm), platform);
    stream.seek(SeekFrom::Start(start))?;
    result
}

fn scan_and_patch<S: Read + Write + Seek>(
    stream: &mut S,
    tempo: u32,
    platform: Platform,
) -> Result<u64> {
    let len = stream.seek(SeekFrom::End(0))?;
    let window_start = len.saturating_sub(TEMPO_SCAN_WINDOW);
    stream.seek(SeekFrom::Start(window_start))?;
    let mut window = Vec::with_capacity((len - window_start) as usize);
    stream.read_to_end(&mut window)?;

    let terminator = platform.midi_terminator().to_le_bytes();
    let offset = field_offset(platform);
    let found = window
        .windows(terminator.len())
        .enumerate()
        .filter(|(_, bytes)| *bytes == terminator)
        .map(|(index, _)| index + offset)
        .find(|field| field + 3 <= window.len());

    let Some(field) = found else {
        return Err(SongError::PatchNotFound);
    };
    let position = window_start + field as u64;
    stream.seek(SeekFrom::Start(position))?;
    stream.write_all(&encode_tempo(tempo, platform))?;
    debug!(position, tempo, %platform, "patched tempo");
    Ok(position)
}

/// Patch the tempo of a compiled MIDI file in place.
pub fn patch_tempo_file(path: &Path, bpm: f32, platform: Platform) -> Result<u64> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| SongError::from_io(e, path))?;
    patch_tempo(&mut file, bpm, platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn track(platform: Platform, terminator_at: usize, len: usize) -> Vec<u8> {
        let mut data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let terminator = platform.midi_terminator().to_le_bytes();
        data[terminator_at..terminator_at + 8].copy_from_slice(&terminator);
        data
    }

    #[test]
    fn tempo_rounds_half_to_even() {
        assert_eq!(tempo_value(120.0), 500_000);
        assert_eq!(tempo_value(128.0), 468_750);
        assert_eq!(tempo_value(90.0), 666_667);
    }

    #[test]
    fn patches_exactly_three_bytes_ps3() {
        let original = track(Platform::Ps3, 1500, 1600);
        let mut cursor = Cursor::new(original.clone());
        cursor.set_position(7);

        let offset = patch_tempo(&mut cursor, 120.0, Platform::Ps3).expect("patch");
        assert_eq!(offset, 1500 + 21);
        assert_eq!(cursor.position(), 7);

        let patched = cursor.into_inner();
        assert_eq!(&patched[1521..1524], &[0x07, 0xA1, 0x20]);
        assert_eq!(&patched[..1521], &original[..1521]);
        assert_eq!(&patched[1524..], &original[1524..]);
    }

    #[test]
    fn patches_little_endian_ps4() {
        let original = track(Platform::Ps4, 100, 200);
        let mut cursor = Cursor::new(original.clone());

        let offset = patch_tempo(&mut cursor, 120.0, Platform::Ps4).expect("patch");
        assert_eq!(offset, 119);
        let patched = cursor.into_inner();
        assert_eq!(&patched[119..122], &[0x20, 0xA1, 0x07]);
        assert_eq!(&patched[..119], &original[..119]);
        assert_eq!(&patched[122..], &original[122..]);
    }

    #[test]
    fn terminator_outside_window_is_not_found() {
        let original = track(Platform::Ps3, 10, 2000);
        let mut cursor = Cursor::new(original.clone());
        cursor.set_position(3);
        let err = patch_tempo(&mut cursor, 120.0, Platform::Ps3).expect_err("not found");
        assert!(matches!(err, SongError::PatchNotFound));
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.into_inner(), original);
    }

    #[test]
    fn other_platform_terminator_is_ignored() {
        let mut cursor = Cursor::new(track(Platform::Ps4, 50, 200));
        assert!(patch_tempo(&mut cursor, 120.0, Platform::Ps3).is_err());
    }

    #[test]
    fn rejects_zero_bpm() {
        let mut cursor = Cursor::new(track(Platform::Ps3, 50, 200));
        let err = patch_tempo(&mut cursor, 0.0, Platform::Ps3).expect_err("zero");
        assert!(matches!(err, SongError::InvalidFormat { .. }));
    }
}
