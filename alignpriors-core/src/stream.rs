//! Line-oriented input and output streams.
//!
//! Inputs are selected once at construction time: `-` reads stdin, a `.gz`
//! suffix routes through a gzip decoder, anything else is read as plain
//! text. Callers always hold a `Box<dyn BufRead>` and never branch on the
//! stream kind again.
//!
//! Outputs either go to stdout or through a temporary file in the
//! destination directory that is persisted only on [`OutputSink::commit`],
//! so an aborted run leaves no partially written file behind.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::errors::Result;

/// Open a line stream. `-` means stdin, `*.gz` is gzip-decoded.
pub fn open_text(path: &str) -> io::Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(io::BufReader::new(io::stdin())));
    }
    let file = File::open(path)?;
    if path.ends_with(".gz") {
        Ok(Box::new(io::BufReader::with_capacity(
            1 << 20,
            GzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(io::BufReader::with_capacity(1 << 20, file)))
    }
}

/// Read one line without its trailing newline, `None` at end of stream.
pub fn next_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = String::new();
    let n = reader.read_line(&mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    while buf.ends_with('\n') || buf.ends_with('\r') {
        buf.pop();
    }
    Ok(Some(buf))
}

/// A write target that is either stdout or an atomically persisted file.
pub enum OutputSink {
    Stdout(io::Stdout),
    File {
        tmp: NamedTempFile,
        dest: PathBuf,
    },
}

impl OutputSink {
    /// `-` writes to stdout; any other path gets a temporary file next to
    /// the destination, renamed into place by [`commit`](Self::commit).
    pub fn create(path: &str) -> Result<Self> {
        if path == "-" {
            return Ok(Self::Stdout(io::stdout()));
        }
        let dest = PathBuf::from(path);
        let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(Path::new("."))?,
        };
        Ok(Self::File { tmp, dest })
    }

    /// Flush and, for file sinks, persist the temporary file at its
    /// destination. Dropping an uncommitted sink discards the output.
    pub fn commit(mut self) -> Result<()> {
        self.flush()?;
        if let Self::File { tmp, dest } = self {
            tmp.persist(dest)?;
        }
        Ok(())
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::File { tmp, .. } => tmp.as_file_mut().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::File { tmp, .. } => tmp.as_file_mut().flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_line_strips_newlines_and_signals_eof() {
        let data = "first\nsecond\r\n\nlast";
        let mut reader = io::BufReader::new(data.as_bytes());
        assert_eq!(next_line(&mut reader).unwrap().as_deref(), Some("first"));
        assert_eq!(next_line(&mut reader).unwrap().as_deref(), Some("second"));
        assert_eq!(next_line(&mut reader).unwrap().as_deref(), Some(""));
        assert_eq!(next_line(&mut reader).unwrap().as_deref(), Some("last"));
        assert_eq!(next_line(&mut reader).unwrap(), None);
    }

    #[test]
    fn uncommitted_sink_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.priors");
        let dest_str = dest.to_str().unwrap().to_string();
        {
            let mut sink = OutputSink::create(&dest_str).unwrap();
            sink.write_all(b"partial").unwrap();
            // dropped without commit
        }
        assert!(!dest.exists());

        let mut sink = OutputSink::create(&dest_str).unwrap();
        sink.write_all(b"complete\n").unwrap();
        sink.commit().unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "complete\n");
    }
}
