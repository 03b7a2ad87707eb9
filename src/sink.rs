use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use log::debug;

use crate::engine::ArchiveEvent;

/// The file an archive job writes into.
///
/// A sink is owned by exactly one job. Dropping it releases the file
/// handle; `close` additionally syncs and reports `SinkClosed`.
#[derive(Debug)]
pub struct OutputSink {
    path: PathBuf,
    file: File,
    events: Sender<ArchiveEvent>,
}

impl OutputSink {
    /// Opens the destination, truncating whatever was there before.
    pub fn create<P: AsRef<Path>>(path: P, events: Sender<ArchiveEvent>) -> io::Result<OutputSink> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        debug!("opened output file {}", path.display());
        Ok(OutputSink { path, file, events })
    }

    /// The path of the destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes to disk and releases the handle.
    pub fn close(self) -> io::Result<()> {
        let OutputSink {
            path,
            mut file,
            events,
        } = self;
        file.flush()?;
        file.sync_all()?;
        drop(file);
        debug!("closed output file {}", path.display());
        events.send(ArchiveEvent::SinkClosed).ok();
        Ok(())
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for OutputSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
