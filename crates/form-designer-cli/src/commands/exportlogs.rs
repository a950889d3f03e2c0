//! The `exportlogs` command.

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_views::admin::logs_to_csv;
use form_designer_views::FormServices;

use crate::command::ManagementCommand;

/// Exports the submission logs of one form as CSV, newest first.
pub struct ExportlogsCommand;

/// Returns the CSV export of the named form's logs.
pub async fn export_logs(services: &FormServices, name: &str) -> Result<String, FormDesignerError> {
    let definition = services.store.get_definition_by_name(name).await?;
    let id = definition.id.ok_or_else(|| {
        FormDesignerError::InternalServerError(format!("Stored form '{name}' has no id"))
    })?;
    let logs = services.store.list_logs(id).await?;
    logs_to_csv(&logs)
}

#[async_trait]
impl ManagementCommand for ExportlogsCommand {
    fn name(&self) -> &'static str {
        "exportlogs"
    }

    fn help(&self) -> &'static str {
        "Exports the submission logs of a form as CSV"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("name")
                .required(true)
                .help("Name of the form"),
        )
        .arg(
            clap::Arg::new("output")
                .long("output")
                .short('o')
                .help("Write to this file instead of stdout"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError> {
        let name = matches
            .get_one::<String>("name")
            .ok_or_else(|| FormDesignerError::BadRequest("No form name given".into()))?;
        let csv = export_logs(services, name).await?;
        super::write_output(matches.get_one::<String>("output"), &csv).await
    }
}
