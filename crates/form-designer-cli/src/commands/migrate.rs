//! The `migrate` command.

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_views::FormServices;

use crate::command::ManagementCommand;

/// Creates the database schema. Safe to run repeatedly.
pub struct MigrateCommand;

#[async_trait]
impl ManagementCommand for MigrateCommand {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn help(&self) -> &'static str {
        "Creates the database tables"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError> {
        services.store.migrate().await?;
        tracing::info!(
            database = %services.settings.database.path.display(),
            "database schema is up to date"
        );
        Ok(())
    }
}
