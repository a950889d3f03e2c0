//! Shared services used by every view.

use std::sync::Arc;

use form_designer_core::{FormDesignerError, FormDesignerSettings};
use form_designer_mail::{backend_from_settings, EmailBackend, InMemoryBackend};
use form_designer_models::store::{store_from_settings, FormStore, InMemoryStore};
use form_designer_models::ChoiceModelRegistry;
use form_designer_template::Engine;

/// Settings, templates, storage, mail and choice models, bundled for the
/// handlers. Cloning is cheap.
#[derive(Clone)]
pub struct FormServices {
    /// Application settings.
    pub settings: Arc<FormDesignerSettings>,
    /// Template engine with the built-in and configured templates.
    pub engine: Arc<Engine>,
    /// Definition and log storage.
    pub store: Arc<dyn FormStore>,
    /// Outgoing mail.
    pub mail: Arc<dyn EmailBackend>,
    /// Named choice sources for model choice fields.
    pub registry: Arc<ChoiceModelRegistry>,
}

impl FormServices {
    /// Assembles services from their parts.
    pub fn new(
        settings: FormDesignerSettings,
        engine: Engine,
        store: Arc<dyn FormStore>,
        mail: Arc<dyn EmailBackend>,
    ) -> Self {
        let registry = ChoiceModelRegistry::from_settings(&settings);
        Self {
            settings: Arc::new(settings),
            engine: Arc::new(engine),
            store,
            mail,
            registry: Arc::new(registry),
        }
    }

    /// Opens the configured database and mail backend.
    ///
    /// The schema is not migrated; call [`FormStore::migrate`] first when
    /// the database may be new.
    pub fn from_settings(settings: FormDesignerSettings) -> Result<Self, FormDesignerError> {
        let store = store_from_settings(&settings.database)?;
        let mail = backend_from_settings(&settings.email)?;
        let engine = Engine::from_settings(&settings);
        Ok(Self::new(settings, engine, store, mail))
    }

    /// Services backed by memory only. Returns the outbox so callers can
    /// inspect sent mail.
    pub fn in_memory(settings: FormDesignerSettings) -> (Self, InMemoryBackend) {
        let outbox = InMemoryBackend::new();
        let engine = Engine::from_settings(&settings);
        let services = Self::new(
            settings,
            engine,
            Arc::new(InMemoryStore::new()),
            Arc::new(outbox.clone()),
        );
        (services, outbox)
    }

    /// Replaces the choice model registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ChoiceModelRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }
}

impl std::fmt::Debug for FormServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormServices")
            .field("debug", &self.settings.debug)
            .field("database", &self.settings.database.path)
            .field("mail_backend", &self.settings.email.backend)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
