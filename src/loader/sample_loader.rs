use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::{SampleBuffer, TrackId, next_track_id};

// Decode a WAV from disk, ready to hand to the engine's deck
pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<(TrackId, SampleBuffer)> {
    let id = next_track_id();
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    Ok((id, buffer))
}

// Every *.wav directly inside `dir`, sorted by file name so the playlist order is stable
pub fn index_wav_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        w.write_sample(0i16).unwrap();
        w.finalize().unwrap();
    }

    #[test]
    fn indexes_only_wavs_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        touch_wav(&dir.path().join("b-forest.wav"));
        touch_wav(&dir.path().join("a-rain.WAV"));
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub.wav")).unwrap();

        let names: Vec<_> = index_wav_in_dir(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a-rain.WAV", "b-forest.wav"]);
    }

    #[test]
    fn load_gives_each_file_a_fresh_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wind.wav");
        touch_wav(&path);
        let (a, _) = load(&path, 8_000).unwrap();
        let (b, buf) = load(&path, 8_000).unwrap();
        assert_ne!(a, b);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn missing_dir_is_an_error() {
        assert!(index_wav_in_dir(Path::new("/definitely/not/here")).is_err());
    }
}
