//! The `runserver` command.

use async_trait::async_trait;

use form_designer_core::FormDesignerError;
use form_designer_views::{FormApp, FormServices};

use crate::command::ManagementCommand;

/// Serves the designed forms and the admin API.
///
/// Binds to the optional `addrport` argument, else the `bind` setting. The
/// schema is created first if the database is new.
pub struct RunserverCommand;

#[async_trait]
impl ManagementCommand for RunserverCommand {
    fn name(&self) -> &'static str {
        "runserver"
    }

    fn help(&self) -> &'static str {
        "Starts the web server"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("addrport")
                .help("Address to bind to, e.g. 0.0.0.0:8000"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        services: &FormServices,
    ) -> Result<(), FormDesignerError> {
        let addr = matches
            .get_one::<String>("addrport")
            .cloned()
            .unwrap_or_else(|| services.settings.bind.clone());

        services.store.migrate().await?;
        tracing::info!(
            "Starting server at http://{addr}/ (debug={})",
            services.settings.debug
        );
        FormApp::new(services.clone()).run(&addr).await
    }
}
