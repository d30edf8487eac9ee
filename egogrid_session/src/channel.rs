use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{trace, warn};

use crate::recording::EpisodeRecording;

/// A strictly alternating request/reply connection to the game.
pub trait Channel {
    /// Sends one request and blocks until its reply has arrived.
    fn exchange(&mut self, request: &str) -> anyhow::Result<String>;
}

/// Newline-delimited JSON frames over a byte stream.
pub struct LineChannel<R, W> {
    pub name: String,
    reader: BufReader<R>,
    writer: W,
    // A re-usable buffer for IO.
    // Should always be empty before and after exchange().
    buf: String,
}

impl<R: Read, W: Write> LineChannel<R, W> {
    pub fn new(name: &str, reader: R, writer: W) -> Self {
        Self {
            name: String::from(name),
            reader: BufReader::new(reader),
            writer,
            buf: String::new(),
        }
    }
}

impl LineChannel<TcpStream, TcpStream> {
    pub fn connect(address: impl ToSocketAddrs + std::fmt::Display) -> anyhow::Result<Self> {
        let name = address.to_string();
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;
        Ok(Self::new(&name, reader, stream))
    }
}

/// A game bridge running as a child process, speaking over stdin/stdout.
pub struct ChildChannel {
    // Kept so the process is not detached from us
    _child: Child,
    channel: LineChannel<ChildStdout, ChildStdin>,
}

impl ChildChannel {
    pub fn spawn(executable_path: &Path) -> anyhow::Result<Self> {
        let mut child = Command::new(executable_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("Could not access stdin of the game bridge"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Could not access stdout of the game bridge"))?;
        let name = executable_path.display().to_string();
        Ok(Self {
            _child: child,
            channel: LineChannel::new(&name, stdout, stdin),
        })
    }
}

impl<R: Read, W: Write> Channel for LineChannel<R, W> {
    fn exchange(&mut self, request: &str) -> anyhow::Result<String> {
        trace!(name: "Sending request", channel = &self.name, request);
        self.writer.write_all(request.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.buf.clear();
        let num_bytes_read = self.reader.read_line(&mut self.buf)?;
        if num_bytes_read == 0 {
            anyhow::bail!("'{}' closed the connection", self.name);
        }
        let reply = String::from(self.buf.trim_end());
        self.buf.clear();
        trace!(name: "Received reply", channel = &self.name, reply = %reply);
        Ok(reply)
    }
}

impl Channel for ChildChannel {
    fn exchange(&mut self, request: &str) -> anyhow::Result<String> {
        self.channel.exchange(request)
    }
}

/// Plays back the replies of a recorded episode.
pub struct ReplayChannel {
    exchanges: std::vec::IntoIter<(String, String)>,
    position: usize,
}

impl ReplayChannel {
    pub fn new(recording: EpisodeRecording) -> Self {
        Self {
            exchanges: recording.into_pairs().into_iter(),
            position: 0,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(EpisodeRecording::load(path)?))
    }

    /// How many recorded replies have not been served yet.
    pub fn remaining(&self) -> usize {
        self.exchanges.len()
    }
}

impl Channel for ReplayChannel {
    fn exchange(&mut self, request: &str) -> anyhow::Result<String> {
        let (recorded_request, reply) = self.exchanges.next().ok_or_else(|| {
            anyhow::anyhow!("Recording exhausted after {} exchanges", self.position)
        })?;
        if recorded_request != request {
            warn!(
                position = self.position,
                recorded = %recorded_request,
                sent = request,
                "Request differs from the recording"
            );
        }
        self.position += 1;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn line_channel_alternates() {
        let replies = "first\r\nsecond\n";
        let mut written = Vec::new();
        {
            let mut channel = LineChannel::new("test", Cursor::new(replies), &mut written);
            assert_eq!(channel.exchange("[1]").unwrap(), "first");
            assert_eq!(channel.exchange("[0.5,0.0]").unwrap(), "second");
            assert!(channel.exchange("[0.0,0.0]").is_err());
        }
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "[1]\n[0.5,0.0]\n[0.0,0.0]\n"
        );
    }

    #[test]
    fn replay_channel() {
        let recording = EpisodeRecording::from_pairs(vec![
            (String::from("[1]"), String::from("a")),
            (String::from("[0.0]"), String::from("b")),
        ]);
        let mut channel = ReplayChannel::new(recording);
        assert_eq!(channel.remaining(), 2);
        assert_eq!(channel.exchange("[1]").unwrap(), "a");
        // Diverging requests are tolerated
        assert_eq!(channel.exchange("[1.0,2.0]").unwrap(), "b");
        assert!(channel.exchange("[1]").is_err());
    }
}
