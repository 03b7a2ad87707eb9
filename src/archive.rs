use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use strum_macros::Display;

use crate::command::{CommandSpec, Secret};
use crate::completion::Completion;
use crate::engine::{ArchiveEngine, ArchiveEvent, EngineSettings, ZipEngine};
use crate::error::{PackageCreationFailed, PipelineError};
use crate::sink::OutputSink;
use crate::utils::{check_readable, destination_for, entry_name_for};

/// Where an archive job currently is.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum JobState {
    Validating,
    Writing,
    Finalizing,
    Closed,
    Failed,
}

/// The result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub destination: PathBuf,
    pub total_bytes: u64,
}

impl fmt::Display for ArchiveReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Encrypted package {} was created ({} total bytes).",
            self.destination.display(),
            self.total_bytes
        )
    }
}

/// One compression + encryption run from a source file into
/// `<source>-encrypted`.
#[derive(Debug)]
pub struct ArchiveJob {
    source: PathBuf,
    destination: PathBuf,
    settings: EngineSettings,
    secret: Secret,
    state: JobState,
}

impl ArchiveJob {
    /// Creates the job for a command. The destination is derived up front.
    pub fn new(spec: &CommandSpec) -> ArchiveJob {
        let source = PathBuf::from(spec.target());
        ArchiveJob {
            destination: destination_for(&source),
            source,
            settings: EngineSettings::default(),
            secret: spec.secret().clone(),
            state: JobState::Validating,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Runs the job with the zip engine.
    pub fn run(&mut self) -> Result<ArchiveReport, PackageCreationFailed> {
        let settings = self.settings;
        let secret = self.secret.clone();
        self.run_with(move |sink, events| {
            ZipEngine::new(sink, settings, secret, events).with_progress(progress_bar())
        })
    }

    /// Runs the job with the engine `connect` wires to the output sink.
    ///
    /// `connect` is only invoked once the source was validated and the
    /// sink is open.
    pub fn run_with<E, F>(&mut self, connect: F) -> Result<ArchiveReport, PackageCreationFailed>
    where
        E: ArchiveEngine,
        F: FnOnce(OutputSink, Sender<ArchiveEvent>) -> E,
    {
        match self.execute(connect) {
            Ok(total_bytes) => {
                self.transition(JobState::Closed);
                Ok(ArchiveReport {
                    destination: self.destination.clone(),
                    total_bytes,
                })
            }
            Err(cause) => {
                self.transition(JobState::Failed);
                Err(PackageCreationFailed {
                    path: self.destination.display().to_string(),
                    cause,
                })
            }
        }
    }

    fn execute<E, F>(&mut self, connect: F) -> Result<u64, PipelineError>
    where
        E: ArchiveEngine,
        F: FnOnce(OutputSink, Sender<ArchiveEvent>) -> E,
    {
        check_readable(&self.source).map_err(|cause| PipelineError::SourceUnavailable {
            path: self.source.display().to_string(),
            cause,
        })?;

        let (tx, rx) = mpsc::channel();
        let completion = Completion::new();
        let sink = OutputSink::create(&self.destination, tx.clone()).map_err(PipelineError::Io)?;

        let mut engine = connect(sink, tx);
        self.transition(JobState::Writing);
        engine.add_entry(&self.source, &entry_name_for(&self.source));
        self.transition(JobState::Finalizing);
        engine.finalize();

        let rv = completion.wait(&rx);
        if rv.is_err() {
            self.discard_output();
        }
        rv
    }

    fn transition(&mut self, state: JobState) {
        debug!(
            "job {} -> {}: {} -> {}",
            self.source.display(),
            self.destination.display(),
            self.state,
            state
        );
        self.state = state;
    }

    fn discard_output(&self) {
        match fs::remove_file(&self.destination) {
            Ok(()) => debug!("removed partial output {}", self.destination.display()),
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "could not remove partial output {}: {}",
                self.destination.display(),
                err
            ),
        }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    match ProgressStyle::default_bar()
        .template(" {spinner} {bar:16.cyan.dim}  {wide_msg:.dim} {bytes}/{total_bytes} eta {eta}")
    {
        Ok(style) => pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  ")),
        Err(err) => debug!("unusable progress template: {}", err),
    }
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}
