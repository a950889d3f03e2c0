//! The `dumpdata` command.

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_models::store::FormStore;
use form_designer_views::FormServices;

use crate::command::ManagementCommand;

/// Writes form definitions as a pretty-printed JSON array, to stdout or a
/// file. The output can be read back by `loaddata`.
pub struct DumpdataCommand;

/// Serializes all definitions, or only the named one.
pub async fn dump_definitions(
    store: &dyn FormStore,
    name: Option<&str>,
) -> Result<String, FormDesignerError> {
    let definitions = match name {
        Some(name) => vec![store.get_definition_by_name(name).await?],
        None => store.list_definitions().await?,
    };
    Ok(serde_json::to_string_pretty(&definitions)?)
}

#[async_trait]
impl ManagementCommand for DumpdataCommand {
    fn name(&self) -> &'static str {
        "dumpdata"
    }

    fn help(&self) -> &'static str {
        "Writes form definitions as JSON"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(clap::Arg::new("name").help("Only dump the form with this name"))
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
        let name = matches.get_one::<String>("name").map(String::as_str);
        let json = dump_definitions(services.store.as_ref(), name).await?;
        super::write_output(matches.get_one::<String>("output"), &json).await
    }
}
