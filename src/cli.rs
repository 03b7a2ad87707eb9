use std::env;
use std::io::{self, Write};

use clap::{App, AppSettings, Arg};
use console::style;
use failure::{err_msg, Error};
use log::{debug, LevelFilter};

use crate::command::{CommandKind, Secret};
use crate::error::{MissingCommand, UnknownCommand};
use crate::registry::CommandRegistry;

use strum::IntoEnumIterator;

/// Exit code when everything went fine (or help was shown).
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when a command rejected its arguments.
pub const EXIT_USAGE: i32 = 2;

fn commands_help() -> String {
    let mut rv = String::from("COMMANDS:");
    for kind in CommandKind::iter() {
        rv.push_str(&format!("\n    {:<12}{}", kind.name(), kind.about()));
    }
    rv
}

fn app<'a, 'b>(commands_help: &'b str) -> App<'a, 'b> {
    App::new("zip-crypt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Packs a file into a password protected zip archive")
        .usage("zip-crypt -t <file> -p <password> <command> [args...]")
        .setting(AppSettings::AllowExternalSubcommands)
        .arg(
            Arg::with_name("target")
                .short("t")
                .long("target")
                .value_name("FILE")
                .takes_value(true)
                .required(true)
                .help("The file to package"),
        )
        .arg(
            Arg::with_name("password")
                .short("p")
                .long("password")
                .value_name("PASSWORD")
                .takes_value(true)
                .required(true)
                .help("The password protecting the package"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increases log output (repeatable)"),
        )
        .after_help(commands_help)
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

pub fn main() -> Result<i32, Error> {
    let commands_help = commands_help();
    let matches = app(&commands_help).get_matches();
    init_logging(matches.occurrences_of("verbose"));

    let target = matches
        .value_of("target")
        .ok_or_else(|| err_msg("no target given"))?;
    let secret = matches
        .value_of("password")
        .map(Secret::new)
        .ok_or_else(|| err_msg("no password given"))?;
    let registry = CommandRegistry::new(target, secret);

    let (name, args) = match matches.subcommand() {
        ("", _) | (_, None) => {
            return Err(MissingCommand {
                available: CommandRegistry::names().join(", "),
            }
            .into())
        }
        (name, Some(sub_matches)) => {
            let args: Vec<String> = sub_matches
                .values_of("")
                .map(|values| values.map(|x| x.to_string()).collect())
                .unwrap_or_default();
            (name, args)
        }
    };

    run_command(&registry, name, &args)
}

/// Resolves and drives a single command. Returns the exit code.
pub fn run_command(registry: &CommandRegistry, name: &str, args: &[String]) -> Result<i32, Error> {
    let mut command = registry.resolve(name).ok_or_else(|| UnknownCommand {
        name: name.to_string(),
        available: CommandRegistry::names().join(", "),
    })?;

    if !command.parse_arguments(args) {
        return Ok(EXIT_USAGE);
    }
    if command.print_help() {
        return Ok(EXIT_SUCCESS);
    }

    debug!(
        "running '{}' ({}) on {}",
        command.spec().name(),
        command.kind(),
        command.spec().target()
    );
    let rv = command.execute();
    debug!("command '{}' ended as {:?}", command.spec().name(), command.state());
    let outcome = rv?;
    println!("{}", style(outcome).green());
    Ok(EXIT_SUCCESS)
}

/// Writes a failure with its cause chain to `w`.
///
/// Command lookup failures get a hint listing what can be run.
pub fn report_error<W: Write>(w: &mut W, err: &Error) -> io::Result<()> {
    writeln!(w, "{} {}", style("error:").red().bold().for_stderr(), err)?;
    for cause in err.iter_causes() {
        writeln!(w, "  {} {}", style("caused by:").dim().for_stderr(), cause)?;
    }

    if err.downcast_ref::<UnknownCommand>().is_some() || err.downcast_ref::<MissingCommand>().is_some() {
        let hint = format!(
            "hint: usage is `zip-crypt -t <file> -p <password> <command>`, commands: {}",
            CommandRegistry::names().join(", ")
        );
        writeln!(w, "{}", style(hint).yellow().for_stderr())?;
    }

    if env::var("RUST_BACKTRACE").is_ok() {
        writeln!(w, "\n\nerror details:\n{:#?}", err)?;
    }
    Ok(())
}
