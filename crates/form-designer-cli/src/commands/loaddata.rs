//! The `loaddata` command.

use std::collections::BTreeSet;

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_models::FormDefinition;
use form_designer_views::admin::check_definition;
use form_designer_views::FormServices;

use crate::command::ManagementCommand;

/// Loads form definitions from a JSON fixture.
///
/// The fixture holds one definition or an array of them, in the format
/// `dumpdata` writes. Definitions are matched by name: existing ones are
/// replaced, new ones created. Ids in the fixture are ignored.
pub struct LoaddataCommand;

/// Counts of a [`load_definitions`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Definitions that did not exist yet.
    pub created: usize,
    /// Definitions that replaced a stored one.
    pub updated: usize,
}

/// Parses a fixture, accepting a single object or an array.
pub fn parse_fixture(json: &str) -> Result<Vec<FormDefinition>, FormDesignerError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

/// Checks and stores every definition in `json`. Nothing is stored if any
/// definition fails the checks, if two definitions share a name, or if the
/// stored definitions cannot be looked up.
pub async fn load_definitions(
    services: &FormServices,
    json: &str,
) -> Result<LoadSummary, FormDesignerError> {
    let definitions = parse_fixture(json)?;
    let mut names = BTreeSet::new();
    for definition in &definitions {
        check_definition(definition, &services.settings).map_err(|err| {
            FormDesignerError::ConfigurationError(format!("{}: {err}", definition.name))
        })?;
        if !names.insert(definition.name.as_str()) {
            return Err(FormDesignerError::ConfigurationError(format!(
                "{}: the fixture defines this form more than once",
                definition.name
            )));
        }
    }

    let mut resolved = Vec::with_capacity(definitions.len());
    for mut definition in definitions {
        definition.id = match services.store.get_definition_by_name(&definition.name).await {
            Ok(existing) => existing.id,
            Err(FormDesignerError::DoesNotExist(_)) => None,
            Err(err) => return Err(err),
        };
        resolved.push(definition);
    }

    let mut summary = LoadSummary::default();
    for definition in resolved {
        if definition.id.is_some() {
            services.store.update_definition(&definition).await?;
            summary.updated += 1;
        } else {
            services.store.create_definition(&definition).await?;
            summary.created += 1;
        }
    }
    Ok(summary)
}

#[async_trait]
impl ManagementCommand for LoaddataCommand {
    fn name(&self) -> &'static str {
        "loaddata"
    }

    fn help(&self) -> &'static str {
        "Loads form definitions from a JSON fixture"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("fixture")
                .required(true)
                .help("Path to the JSON fixture"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError> {
        let path = matches
            .get_one::<String>("fixture")
            .ok_or_else(|| FormDesignerError::BadRequest("No fixture given".into()))?;
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            FormDesignerError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to read {path}: {e}"),
            ))
        })?;

        services.store.migrate().await?;
        let summary = load_definitions(services, &json).await?;
        tracing::info!(
            "Installed {} form definition(s) from {path} ({} new, {} replaced)",
            summary.created + summary.updated,
            summary.created,
            summary.updated
        );
        Ok(())
    }
}
