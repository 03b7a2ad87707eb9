use std::io;

use failure::Fail;
use strum_macros::Display;

/// Why a command rejected its arguments.
///
/// These never leave the command layer; they end in a usage print.
#[derive(Debug, Fail)]
pub enum ArgsError {
    #[fail(display = "could not parse command arguments")]
    Parse(#[cause] clap::Error),
    #[fail(display = "invalid command arguments")]
    Validation,
}

/// The classification of something the archive engine reported.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum ConditionKind {
    /// Auxiliary file metadata could not be read. Not fatal.
    #[strum(serialize = "missing metadata")]
    MissingMetadata,
    /// The source disappeared after it was validated.
    #[strum(serialize = "source vanished")]
    SourceVanished,
    #[strum(serialize = "io failure")]
    Io,
    #[strum(serialize = "zip failure")]
    Format,
}

/// A warning or error raised by the archive engine.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
#[fail(display = "{}: {}", kind, detail)]
pub struct EngineCondition {
    pub kind: ConditionKind,
    pub detail: String,
}

impl EngineCondition {
    pub fn new<S: Into<String>>(kind: ConditionKind, detail: S) -> EngineCondition {
        EngineCondition {
            kind,
            detail: detail.into(),
        }
    }

    /// Benign conditions are logged and otherwise ignored.
    pub fn is_benign(&self) -> bool {
        self.kind == ConditionKind::MissingMetadata
    }
}

impl From<zip::result::ZipError> for EngineCondition {
    fn from(err: zip::result::ZipError) -> EngineCondition {
        match err {
            zip::result::ZipError::Io(err) => EngineCondition::new(ConditionKind::Io, err.to_string()),
            other => EngineCondition::new(ConditionKind::Format, other.to_string()),
        }
    }
}

/// Any fatal condition of an archive job.
#[derive(Debug, Fail)]
pub enum PipelineError {
    #[fail(display = "source file {} is not accessible", path)]
    SourceUnavailable {
        path: String,
        #[cause]
        cause: io::Error,
    },
    #[fail(display = "could not open output file")]
    Io(#[cause] io::Error),
    #[fail(display = "archive engine failed")]
    Engine(#[cause] EngineCondition),
    #[fail(display = "archive engine stopped before completion")]
    Incomplete,
}

/// Raised by the pipeline whenever a job fails. Carries the intended
/// destination and the underlying condition.
#[derive(Debug, Fail)]
#[fail(display = "Encrypted package {} was not created", path)]
pub struct PackageCreationFailed {
    pub path: String,
    #[cause]
    pub cause: PipelineError,
}

#[derive(Debug, Fail)]
#[fail(display = "unknown command '{}' (available: {})", name, available)]
pub struct UnknownCommand {
    pub name: String,
    pub available: String,
}

#[derive(Debug, Fail)]
#[fail(display = "no command given (available: {})", available)]
pub struct MissingCommand {
    pub available: String,
}
