//! Console report stream
//!
//! Report lines are written to the sink (stdout in the binary) as soon as they are
//! produced, so everything printed before a failing stage stays visible. A transcript
//! of all lines is kept and can be saved next to the figures.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the saved transcript inside the output directory
pub const TRANSCRIPT_FILE_NAME: &str = "report.txt";

/// Line-oriented report writer
pub struct Report<W: Write> {
    sink: W,
    transcript: String,
}

impl<W: Write> Report<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            transcript: String::new(),
        }
    }

    /// Writes one line and flushes the sink
    pub fn line(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        let line = line.as_ref();
        writeln!(self.sink, "{}", line)?;
        self.sink.flush()?;

        self.transcript.push_str(line);
        self.transcript.push('\n');
        Ok(())
    }

    /// Everything written so far
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Saves the transcript as [`TRANSCRIPT_FILE_NAME`] under `output_dir`
    pub fn save_transcript(&self, output_dir: &Path) -> io::Result<PathBuf> {
        let path = output_dir.join(TRANSCRIPT_FILE_NAME);
        fs::write(&path, &self.transcript)?;
        Ok(path)
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
