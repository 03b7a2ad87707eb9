use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use indicatif::ProgressBar;
use log::debug;
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::command::Secret;
use crate::error::{ConditionKind, EngineCondition};
use crate::sink::OutputSink;

/// Entries at or above this size need the zip64 extension.
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Size of the chunks an entry is streamed in.
const CHUNK_SIZE: usize = 128 * 1024;

/// Something the engine or its sink reports while a job runs.
#[derive(Debug)]
pub enum ArchiveEvent {
    Warning(EngineCondition),
    Error(EngineCondition),
    /// Source bytes streamed into the current entry so far.
    Progress(u64),
    /// The archive was fully written; carries its total size.
    Completed(u64),
    /// The output sink released its file handle.
    SinkClosed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EncryptionMethod {
    /// Legacy password based zip encryption.
    ZipCrypto,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub compression_level: i32,
    pub encryption: EncryptionMethod,
}

impl Default for EngineSettings {
    fn default() -> EngineSettings {
        EngineSettings {
            compression_level: 9,
            encryption: EncryptionMethod::ZipCrypto,
        }
    }
}

/// The capability that turns queued entries into an archive.
///
/// Engines report exclusively through the event channel they were
/// connected to; `finalize` itself never fails.
pub trait ArchiveEngine {
    /// Queues the file at `source` to be stored as `name`.
    fn add_entry(&mut self, source: &Path, name: &str);

    /// Writes every queued entry and closes the output.
    fn finalize(self);
}

fn source_condition(source: &Path, err: io::Error) -> EngineCondition {
    if err.kind() == io::ErrorKind::NotFound {
        EngineCondition::new(
            ConditionKind::SourceVanished,
            format!("{} disappeared before it could be read", source.display()),
        )
    } else {
        EngineCondition::new(
            ConditionKind::Io,
            format!("could not read {}: {}", source.display(), err),
        )
    }
}

/// Deflate + ZipCrypto engine streaming into an `OutputSink`.
pub struct ZipEngine {
    writer: ZipWriter<OutputSink>,
    settings: EngineSettings,
    secret: Secret,
    entries: Vec<(PathBuf, String)>,
    events: Sender<ArchiveEvent>,
    progress: ProgressBar,
}

impl ZipEngine {
    /// Wires a new engine to the sink. Events go to `events`.
    pub fn new(
        sink: OutputSink,
        settings: EngineSettings,
        secret: Secret,
        events: Sender<ArchiveEvent>,
    ) -> ZipEngine {
        ZipEngine {
            writer: ZipWriter::new(sink),
            settings,
            secret,
            entries: vec![],
            events,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports written bytes on the given progress bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> ZipEngine {
        self.progress = progress;
        self
    }

    fn write_entry(&mut self, source: &Path, name: &str) -> Result<u64, EngineCondition> {
        let file = File::open(source).map_err(|err| source_condition(source, err))?;

        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.settings.compression_level.into()));

        match file.metadata() {
            Ok(metadata) => {
                self.progress.set_length(metadata.len());
                options = options.large_file(metadata.len() >= ZIP64_THRESHOLD);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    options = options.unix_permissions(metadata.permissions().mode());
                }
            }
            Err(err) => {
                self.events
                    .send(ArchiveEvent::Warning(EngineCondition::new(
                        ConditionKind::MissingMetadata,
                        format!("could not stat {}: {}", source.display(), err),
                    )))
                    .ok();
            }
        }

        let options = match self.settings.encryption {
            EncryptionMethod::ZipCrypto => {
                options.with_deprecated_encryption(self.secret.expose().as_bytes())
            }
        };

        self.writer.start_file(name, options)?;
        self.stream_entry(file)
            .map_err(|err| source_condition(source, err))
    }

    /// Pumps `reader` into the open entry chunk by chunk, advancing the
    /// progress bar and reporting `Progress` after every chunk.
    fn stream_entry<R: Read>(&mut self, mut reader: R) -> io::Result<u64> {
        let mut chunk = vec![0; CHUNK_SIZE];
        let mut streamed = 0;
        loop {
            let len = match reader.read(&mut chunk) {
                Ok(0) => return Ok(streamed),
                Ok(len) => len,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            self.writer.write_all(&chunk[..len])?;
            streamed += len as u64;
            self.progress.inc(len as u64);
            self.events.send(ArchiveEvent::Progress(streamed)).ok();
        }
    }

    fn finish(self) -> Result<(), EngineCondition> {
        let ZipEngine { writer, events, .. } = self;
        let mut sink = writer.finish()?;
        let total = sink
            .seek(SeekFrom::End(0))
            .map_err(|err| EngineCondition::new(ConditionKind::Io, err.to_string()))?;
        debug!("finished archive {} ({} bytes)", sink.path().display(), total);
        events.send(ArchiveEvent::Completed(total)).ok();
        sink.close()
            .map_err(|err| EngineCondition::new(ConditionKind::Io, err.to_string()))
    }
}

impl ArchiveEngine for ZipEngine {
    fn add_entry(&mut self, source: &Path, name: &str) {
        self.entries.push((source.to_path_buf(), name.to_string()));
    }

    fn finalize(mut self) {
        for (source, name) in mem::replace(&mut self.entries, vec![]) {
            self.progress.set_message(name.clone());
            self.progress.set_position(0);
            match self.write_entry(&source, &name) {
                Ok(size) => debug!("stored {} ({} bytes) as {}", source.display(), size, name),
                Err(condition) => {
                    self.progress.finish_and_clear();
                    self.events.send(ArchiveEvent::Error(condition)).ok();
                    return;
                }
            }
        }
        self.progress.finish_and_clear();

        let events = self.events.clone();
        if let Err(condition) = self.finish() {
            events.send(ArchiveEvent::Error(condition)).ok();
        }
    }
}
