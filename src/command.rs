use std::fmt;
use std::io::{self, Write};
use std::iter;

use clap::{App, AppSettings, Arg, ArgMatches};
use failure::Error;
use log::debug;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::archive::{ArchiveJob, ArchiveReport};
use crate::error::ArgsError;

/// A password that refuses to show up in debug output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(secret: S) -> Secret {
        Secret(secret.into())
    }

    /// Returns the actual password.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Secret(<redacted>)")
    }
}

/// What a command instance was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    name: String,
    target: String,
    secret: Secret,
}

impl CommandSpec {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, target: T, secret: Secret) -> CommandSpec {
        CommandSpec {
            name: name.into(),
            target: target.into(),
            secret,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file the command operates on.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

/// What a successfully executed command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Packaged(ArchiveReport),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Outcome::Packaged(ref report) => write!(f, "{}", report),
        }
    }
}

/// Every command the tool knows about.
#[derive(Debug, Display, EnumIter, IntoStaticStr, Copy, Clone, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum CommandKind {
    /// Packs the target into `<target>-encrypted`.
    Encrypt,
}

impl CommandKind {
    /// The name the command is invoked by.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// One line summary for the top level help.
    pub fn about(self) -> &'static str {
        match self {
            CommandKind::Encrypt => "Creates an encrypted package.",
        }
    }

    /// The argument schema of the command.
    fn app(self) -> App<'static, 'static> {
        match self {
            CommandKind::Encrypt => App::new("encrypt")
                .about(self.about())
                .template("zip-crypt encrypt\n{about}\n\nUSAGE:\n    {usage}\n\n{all-args}\n\n{after-help}")
                .usage("zip-crypt -t <file> -p <password> encrypt [FLAGS]")
                .setting(AppSettings::DisableVersion)
                .arg(
                    Arg::with_name("help")
                        .short("h")
                        .long("help")
                        .help("print this message."),
                )
                .after_help(
                    "EXAMPLES:\n    zip-crypt -t notes.txt -p hunter2 encrypt\n        \
                     Creates notes.txt-encrypted, protected by the password 'hunter2'.",
                ),
        }
    }

    fn validate(self, _matches: &ArgMatches) -> bool {
        match self {
            CommandKind::Encrypt => true,
        }
    }

    fn run(self, spec: &CommandSpec) -> Result<Outcome, Error> {
        match self {
            CommandKind::Encrypt => {
                let mut job = ArchiveJob::new(spec);
                debug!(
                    "packaging {} into {}",
                    job.source().display(),
                    job.destination().display()
                );
                let rv = job.run();
                debug!("archive job ended {}", job.state());
                Ok(Outcome::Packaged(rv?))
            }
        }
    }
}

/// Where a command is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandState {
    Unparsed,
    Parsed,
    Invalid,
    HelpDisplayed,
    Executed,
    Errored,
}

#[derive(Debug)]
pub struct Command {
    kind: CommandKind,
    spec: CommandSpec,
    help: bool,
    state: CommandState,
}

impl Command {
    pub fn new(kind: CommandKind, spec: CommandSpec) -> Command {
        Command {
            kind,
            spec,
            help: false,
            state: CommandState::Unparsed,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Parses the command's own arguments.
    ///
    /// On a parse or validation failure the usage is printed and `false`
    /// is returned; the error itself never leaves the command.
    pub fn parse_arguments<S: AsRef<str>>(&mut self, argv: &[S]) -> bool {
        match self.try_parse(argv) {
            Ok(help) => {
                self.help = help;
                self.state = CommandState::Parsed;
                true
            }
            Err(err) => {
                debug!("{} rejected its arguments: {:?}", self.kind, err);
                self.state = CommandState::Invalid;
                self.print_usage();
                false
            }
        }
    }

    fn try_parse<S: AsRef<str>>(&self, argv: &[S]) -> Result<bool, ArgsError> {
        let args = iter::once(self.kind.name()).chain(argv.iter().map(|arg| arg.as_ref()));
        let matches = self
            .kind
            .app()
            .get_matches_from_safe(args)
            .map_err(ArgsError::Parse)?;
        if !self.kind.validate(&matches) {
            return Err(ArgsError::Validation);
        }
        Ok(matches.is_present("help"))
    }

    /// Prints the usage if help was requested. Returns `true` if so, in
    /// which case the command must not be executed.
    pub fn print_help(&mut self) -> bool {
        if self.help {
            self.print_usage();
            self.state = CommandState::HelpDisplayed;
        }
        self.help
    }

    pub fn print_usage(&self) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(err) = self.write_usage(&mut out) {
            debug!("could not print usage: {}", err);
        }
    }

    /// Renders the usage text of the command.
    pub fn write_usage<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        self.kind.app().write_help(w)?;
        writeln!(w)?;
        Ok(())
    }

    /// Executes the command. Failures are passed on unchanged.
    pub fn execute(&mut self) -> Result<Outcome, Error> {
        match self.kind.run(&self.spec) {
            Ok(outcome) => {
                self.state = CommandState::Executed;
                Ok(outcome)
            }
            Err(err) => {
                self.state = CommandState::Errored;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PackageCreationFailed, PipelineError};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn encrypt_command(target: &Path) -> Command {
        Command::new(
            CommandKind::Encrypt,
            CommandSpec::new("encrypt", target.display().to_string(), Secret::new("hunter2")),
        )
    }

    #[test]
    fn test_secret_is_redacted() {
        let spec = CommandSpec::new("encrypt", "notes.txt", Secret::new("hunter2"));
        let debugged = format!("{:?}", spec);
        assert!(!debugged.contains("hunter2"));
        assert!(debugged.contains("notes.txt"));
        assert_eq!(spec.secret().expose(), "hunter2");
    }

    #[test]
    fn test_help_skips_execution() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("notes.txt");
        fs::write(&target, b"0123456789").unwrap();

        let mut command = encrypt_command(&target);
        assert_eq!(command.state(), CommandState::Unparsed);
        assert!(command.parse_arguments(&["--help"]));
        assert!(command.print_help());
        assert_eq!(command.state(), CommandState::HelpDisplayed);
        assert!(!dir.path().join("notes.txt-encrypted").exists());

        let mut short = encrypt_command(&target);
        assert!(short.parse_arguments(&["-h"]));
        assert!(short.print_help());
    }

    #[test]
    fn test_no_arguments_parse() {
        let mut command = encrypt_command(Path::new("notes.txt"));
        assert!(command.parse_arguments::<&str>(&[]));
        assert!(!command.print_help());
        assert_eq!(command.state(), CommandState::Parsed);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let mut command = encrypt_command(Path::new("notes.txt"));
        assert!(!command.parse_arguments(&["--bogus"]));
        assert_eq!(command.state(), CommandState::Invalid);
    }

    #[test]
    fn test_usage_mentions_options() {
        let command = encrypt_command(Path::new("notes.txt"));
        let mut buf = vec![];
        command.write_usage(&mut buf).unwrap();
        let usage = String::from_utf8(buf).unwrap();
        assert!(usage.starts_with("zip-crypt encrypt\n"), "{}", usage);
        assert!(usage.contains("USAGE:"));
        assert!(usage.contains("zip-crypt -t <file> -p <password> encrypt"));
        assert!(usage.contains("--help"));
        assert!(usage.contains("Creates an encrypted package."));
        assert!(usage.contains("zip-crypt -t notes.txt -p hunter2 encrypt"));
    }

    #[test]
    fn test_execute_packages_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("notes.txt");
        fs::write(&target, b"0123456789").unwrap();

        let mut command = encrypt_command(&target);
        assert!(command.parse_arguments::<&str>(&[]));
        match command.execute().unwrap() {
            Outcome::Packaged(report) => {
                assert_eq!(report.destination, dir.path().join("notes.txt-encrypted"));
                assert!(report.total_bytes > 0);
            }
        }
        assert_eq!(command.state(), CommandState::Executed);
    }

    #[test]
    fn test_execute_passes_failure_through() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing.bin");

        let mut command = encrypt_command(&target);
        let err = command.execute().unwrap_err();
        assert_eq!(command.state(), CommandState::Errored);

        let failure = err.downcast_ref::<PackageCreationFailed>().unwrap();
        assert!(failure.path.ends_with("missing.bin-encrypted"));
        match failure.cause {
            PipelineError::SourceUnavailable { .. } => {}
            ref other => panic!("unexpected cause {:?}", other),
        }
        assert!(!dir.path().join("missing.bin-encrypted").exists());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(CommandKind::Encrypt.name(), "encrypt");
        assert_eq!(CommandKind::Encrypt.to_string(), "encrypt");
    }
}
