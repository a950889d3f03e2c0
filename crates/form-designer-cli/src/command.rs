//! Management command framework.
//!
//! A [`ManagementCommand`] names itself, declares its clap arguments and
//! handles its invocation against the shared [`FormServices`].
//! [`CommandRegistry`] collects the commands and dispatches parsed
//! arguments to them.

use std::collections::BTreeMap;

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_views::FormServices;

/// A command invoked as `form-designer <name>`.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &'static str;

    /// One-line help text.
    fn help(&self) -> &'static str;

    /// Adds the command's arguments. The default adds none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError>;
}

/// The registered commands, keyed by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing one with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    /// Returns the command with the given name.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns the command names in sorted order.
    pub fn list_commands(&self) -> Vec<&str> {
        self.commands.keys().copied().collect()
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the top-level clap command with one subcommand per registered
    /// command and a global `--settings` option.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("form-designer")
            .about("form-designer management utility")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("settings")
                    .long("settings")
                    .global(true)
                    .help("Settings file (.toml or .json)"),
            );
        for command in self.commands.values() {
            let sub = clap::Command::new(command.name()).about(command.help());
            app = app.subcommand(command.add_arguments(sub));
        }
        app
    }

    /// Dispatches parsed arguments to the selected command.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            FormDesignerError::ConfigurationError("No subcommand specified".to_string())
        })?;
        let command = self.get(name).ok_or_else(|| {
            FormDesignerError::ConfigurationError(format!("Unknown command: {name}"))
        })?;
        tracing::debug!(command = name, "running management command");
        command.handle(sub_matches, services).await
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.list_commands())
            .finish()
    }
}
