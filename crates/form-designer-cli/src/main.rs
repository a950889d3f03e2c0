use anyhow::Context;

use form_designer_cli::command::CommandRegistry;
use form_designer_cli::commands::register_builtin_commands;
use form_designer_core::logging::setup_logging;
use form_designer_core::settings_loader;
use form_designer_views::FormServices;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let matches = registry.build_cli().get_matches();

    let settings = match matches.get_one::<String>("settings") {
        Some(path) => settings_loader::from_file_with_env(path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => settings_loader::from_env(),
    };
    setup_logging(&settings);

    let services = FormServices::from_settings(settings).context("opening services")?;
    registry.execute(&matches, &services).await?;
    Ok(())
}
