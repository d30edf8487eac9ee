use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collects the exchanges of an episode and writes them to a directory,
/// one file per episode.
pub struct Recorder {
    num: usize,
    directory: PathBuf,
    exchanges: Vec<RecordedExchange>,
}

impl Recorder {
    pub fn new(directory: PathBuf) -> anyhow::Result<Self> {
        if !directory.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", directory.display());
        }
        Ok(Self {
            num: 1,
            directory,
            exchanges: Vec::new(),
        })
    }

    pub fn store_exchange(&mut self, request: &str, reply: &str) {
        self.exchanges.push(RecordedExchange {
            request: embed(request),
            reply: embed(reply),
        });
    }

    pub fn has_pending_exchanges(&self) -> bool {
        !self.exchanges.is_empty()
    }

    /// Writes everything stored since the last call and returns the path.
    pub fn write_episode_recording(&mut self) -> anyhow::Result<PathBuf> {
        let filepath = self.directory.join(format!("episode_{:0>6}.json", self.num));
        let writer = BufWriter::new(
            File::create(&filepath)
                .with_context(|| format!("Could not create '{}'", filepath.display()))?,
        );
        let recording = EpisodeRecording {
            exchanges: std::mem::take(&mut self.exchanges),
        };
        serde_json::to_writer_pretty(writer, &recording)?;
        self.num += 1;
        Ok(filepath)
    }
}

/// Frames are stored as JSON when they are JSON, so that recordings stay
/// readable, and as strings otherwise.
fn embed(frame: &str) -> Value {
    serde_json::from_str(frame).unwrap_or_else(|_| Value::String(String::from(frame)))
}

fn unembed(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedExchange {
    request: Value,
    reply: Value,
}

/// The contents of one recording file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeRecording {
    exchanges: Vec<RecordedExchange>,
}

impl EpisodeRecording {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Could not open recording '{}'", path.display()))?;
        let recording = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Could not parse recording '{}'", path.display()))?;
        Ok(recording)
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            exchanges: pairs
                .iter()
                .map(|(request, reply)| RecordedExchange {
                    request: embed(request),
                    reply: embed(reply),
                })
                .collect(),
        }
    }

    /// The `(request, reply)` frames in the order they were exchanged.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.exchanges
            .iter()
            .map(|exchange| (unembed(&exchange.request), unembed(&exchange.reply)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_survive_embedding() {
        let pairs = vec![
            (
                String::from("[1]"),
                String::from(r#"[{"bounds":"{X:0 Y:0 Width:8 Height:8}","solids":"0"},0.0,false]"#),
            ),
            (String::from("[0.5,-1.0]"), String::from("not json")),
        ];
        let recording = EpisodeRecording::from_pairs(pairs.clone());
        assert_eq!(recording.len(), 2);
        assert_eq!(recording.into_pairs(), pairs);
    }

    #[test]
    fn recorder_writes_numbered_files() {
        let directory =
            std::env::temp_dir().join(format!("egogrid_recorder_{}", std::process::id()));
        std::fs::create_dir_all(&directory).unwrap();
        let mut recorder = Recorder::new(directory.clone()).unwrap();
        recorder.store_exchange("[1]", "[1,2]");
        assert!(recorder.has_pending_exchanges());
        let first = recorder.write_episode_recording().unwrap();
        assert!(!recorder.has_pending_exchanges());
        recorder.store_exchange("[0.0,1.0]", "[3]");
        let second = recorder.write_episode_recording().unwrap();
        assert!(first.ends_with("episode_000001.json"));
        assert!(second.ends_with("episode_000002.json"));

        let loaded = EpisodeRecording::load(&second).unwrap().into_pairs();
        assert_eq!(loaded, vec![(String::from("[0.0,1.0]"), String::from("[3]"))]);
        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn recorder_needs_existing_directory() {
        assert!(Recorder::new(PathBuf::from("/nonexistent/egogrid/recordings")).is_err());
    }
}
