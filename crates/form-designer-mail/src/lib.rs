//! # form-designer-mail
//!
//! Delivery of form submission mails.
//!
//! [`EmailBackend`] is the async seam between the delivery code and the
//! transport. Backends:
//!
//! - [`SmtpBackend`] - SMTP through `lettre`
//! - [`ConsoleBackend`] - writes mails to stdout
//! - [`FileBackend`] - writes one `.eml` file per mail
//! - [`InMemoryBackend`] - collects mails for tests
//!
//! [`backend_from_settings`] picks one according to `email.backend`.

use std::fmt::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::RwLock;

use form_designer_core::settings::EmailSettings;
use form_designer_core::FormDesignerError;

/// A plain-text mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// The subject line.
    pub subject: String,
    /// The plain-text body.
    pub body: String,
    /// The sender address.
    pub from_email: String,
    /// The recipients.
    pub to: Vec<String>,
}

impl EmailMessage {
    /// Creates a new message.
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        from_email: impl Into<String>,
        to: Vec<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            from_email: from_email.into(),
            to,
        }
    }

    /// Formats the message the way the console and file backends print it.
    pub fn format_message(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "From: {}", self.from_email);
        let _ = writeln!(output, "To: {}", self.to.join(", "));
        let _ = writeln!(output, "Subject: {}", self.subject);
        let _ = writeln!(output, "\n{}", self.body);
        output
    }

    fn ensure_recipients(&self) -> Result<(), FormDesignerError> {
        if self.to.is_empty() {
            return Err(FormDesignerError::MailError(
                "Email must have at least one recipient".to_string(),
            ));
        }
        Ok(())
    }
}

/// A transport for [`EmailMessage`]s.
#[async_trait]
pub trait EmailBackend: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: &EmailMessage) -> Result<(), FormDesignerError>;
}

/// Sends mail through an SMTP relay.
#[derive(Clone)]
pub struct SmtpBackend {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
    port: u16,
}

impl SmtpBackend {
    /// Builds the transport. With `use_tls` the connection must be upgraded
    /// to TLS; without it mail is sent in the clear (local relays).
    pub fn new(settings: &EmailSettings) -> Result<Self, FormDesignerError> {
        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host).map_err(
                |e: lettre::transport::smtp::Error| FormDesignerError::MailError(e.to_string()),
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        let mut builder = builder.port(settings.port);
        if let Some(username) = &settings.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                settings.password.clone().unwrap_or_default(),
            ));
        }
        Ok(Self {
            mailer: builder.build(),
            host: settings.host.clone(),
            port: settings.port,
        })
    }
}

impl std::fmt::Debug for SmtpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpBackend")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

fn mailbox(address: &str) -> Result<Mailbox, FormDesignerError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| {
            FormDesignerError::MailError(format!("invalid address '{address}': {e}"))
        })
}

/// Converts a message into a `lettre` message.
pub fn build_message(message: &EmailMessage) -> Result<Message, FormDesignerError> {
    message.ensure_recipients()?;
    let mut builder = Message::builder()
        .from(mailbox(&message.from_email)?)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &message.to {
        builder = builder.to(mailbox(recipient)?);
    }
    builder
        .body(message.body.clone())
        .map_err(|e| FormDesignerError::MailError(format!("failed to build email: {e}")))
}

#[async_trait]
impl EmailBackend for SmtpBackend {
    async fn send(&self, message: &EmailMessage) -> Result<(), FormDesignerError> {
        let email = build_message(message)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e: lettre::transport::smtp::Error| {
                FormDesignerError::MailError(e.to_string())
            })?;
        tracing::info!(
            host = %self.host,
            port = self.port,
            recipients = message.to.len(),
            "mail sent"
        );
        Ok(())
    }
}

/// Prints mails to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleBackend;

#[async_trait]
impl EmailBackend for ConsoleBackend {
    async fn send(&self, message: &EmailMessage) -> Result<(), FormDesignerError> {
        message.ensure_recipients()?;
        let separator = "-".repeat(60);
        let formatted = message.format_message();

        tokio::task::spawn_blocking(move || {
            println!("{separator}");
            print!("{formatted}");
            println!("{separator}");
        })
        .await
        .map_err(|e| FormDesignerError::InternalServerError(e.to_string()))?;

        Ok(())
    }
}

/// Writes each mail to its own file in a directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl FileBackend {
    /// Creates a backend writing to `dir`, created on first use.
    pub const fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            sequence: AtomicU64::new(0),
        }
    }

    /// Returns the target directory.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait]
impl EmailBackend for FileBackend {
    async fn send(&self, message: &EmailMessage) -> Result<(), FormDesignerError> {
        message.ensure_recipients()?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S-%f");
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(format!("{timestamp}-{seq}.eml"));
        tokio::fs::write(&path, message.format_message()).await?;

        tracing::debug!(path = %path.display(), "mail written to file");
        Ok(())
    }
}

/// Collects mails in memory.
///
/// Clones share the same outbox, so a test can keep one handle and give the
/// other to the code under test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    messages: Arc<RwLock<Vec<EmailMessage>>>,
}

impl InMemoryBackend {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all sent messages.
    pub async fn messages(&self) -> Vec<EmailMessage> {
        self.messages.read().await.clone()
    }

    /// Returns the number of sent messages.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Clears the outbox.
    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl EmailBackend for InMemoryBackend {
    async fn send(&self, message: &EmailMessage) -> Result<(), FormDesignerError> {
        message.ensure_recipients()?;
        self.messages.write().await.push(message.clone());
        Ok(())
    }
}

/// Creates the backend named by `settings.backend`.
///
/// # Errors
///
/// Returns `ImproperlyConfigured` for an unknown backend name, or a
/// `MailError` if the SMTP transport cannot be set up.
pub fn backend_from_settings(
    settings: &EmailSettings,
) -> Result<Arc<dyn EmailBackend>, FormDesignerError> {
    Ok(match settings.backend.as_str() {
        "smtp" => Arc::new(SmtpBackend::new(settings)?),
        "console" => Arc::new(ConsoleBackend),
        "file" => Arc::new(FileBackend::new(settings.file_path.clone())),
        "memory" | "locmem" => Arc::new(InMemoryBackend::new()),
        other => {
            return Err(FormDesignerError::ImproperlyConfigured(format!(
                "Unknown email backend '{other}'"
            )))
        }
    })
}
