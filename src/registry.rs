use std::collections::HashMap;

use lazy_static::lazy_static;
use strum::IntoEnumIterator;

use crate::command::{Command, CommandKind, CommandSpec, Secret};

lazy_static! {
    /// A mapping of command name to command kind.
    static ref COMMANDS: HashMap<&'static str, CommandKind> = CommandKind::iter()
        .map(|kind| (kind.name(), kind))
        .collect();
}

/// Builds commands bound to one target and secret.
#[derive(Debug)]
pub struct CommandRegistry {
    target: String,
    secret: Secret,
}

impl CommandRegistry {
    pub fn new<S: Into<String>>(target: S, secret: Secret) -> CommandRegistry {
        CommandRegistry {
            target: target.into(),
            secret,
        }
    }

    /// Looks up a command by name. Unknown names give `None`.
    pub fn resolve(&self, name: &str) -> Option<Command> {
        COMMANDS.get(name).map(|&kind| {
            Command::new(
                kind,
                CommandSpec::new(name, self.target.clone(), self.secret.clone()),
            )
        })
    }

    /// All registered command names, sorted.
    pub fn names() -> Vec<&'static str> {
        let mut rv: Vec<_> = COMMANDS.keys().cloned().collect();
        rv.sort();
        rv
    }
}
