//! Built-in management commands.

pub mod check;
pub mod dumpdata;
pub mod exportlogs;
pub mod loaddata;
pub mod migrate;
pub mod runserver;

pub use check::CheckCommand;
pub use dumpdata::DumpdataCommand;
pub use exportlogs::ExportlogsCommand;
pub use loaddata::LoaddataCommand;
pub use migrate::MigrateCommand;
pub use runserver::RunserverCommand;

use form_designer_core::FormDesignerError;

use crate::command::CommandRegistry;

/// Registers every built-in command.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(RunserverCommand));
    registry.register(Box::new(MigrateCommand));
    registry.register(Box::new(LoaddataCommand));
    registry.register(Box::new(DumpdataCommand));
    registry.register(Box::new(ExportlogsCommand));
    registry.register(Box::new(CheckCommand));
}

/// Writes `content` to `path`, or to stdout when no path is given.
async fn write_output(path: Option<&String>, content: &str) -> Result<(), FormDesignerError> {
    match path {
        Some(path) => {
            tokio::fs::write(path, content).await.map_err(|e| {
                FormDesignerError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("Failed to write to {path}: {e}"),
                ))
            })?;
            tracing::info!("Output written to {path}");
        }
        None => println!("{content}"),
    }
    Ok(())
}
