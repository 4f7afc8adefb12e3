use async_trait::async_trait;
use kernel::{mailer::Mailer, model::registration::Registration};
use reqwest::Client;
use serde::Serialize;
use shared::{
    config::MailConfig,
    error::{AppError, AppResult},
};

/// Sends transactional mail through an HTTP e-mail API (Resend compatible).
/// When no API key is configured every message is logged and dropped.
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn send(&self, message: Message) -> AppResult<()> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::info!(to = %message.to, subject = %message.subject, "mail delivery disabled, skipping");
            return Ok(());
        };

        let res = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&SendRequest {
                from: &self.config.sender,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "mail API responded with {status}: {body}"
            )));
        }

        tracing::info!(to = %message.to, subject = %message.subject, "mail sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn registration_received(&self, registration: &Registration) -> AppResult<()> {
        self.send(received_message(&self.config.public_base_url, registration))
            .await
    }

    async fn registration_confirmed(&self, registration: &Registration) -> AppResult<()> {
        self.send(confirmed_message(&self.config.public_base_url, registration))
            .await
    }
}

fn event_link(base_url: &str, registration: &Registration) -> String {
    format!(
        "{}/events/{}",
        base_url.trim_end_matches('/'),
        registration.event.event_id
    )
}

pub fn received_message(base_url: &str, registration: &Registration) -> Message {
    let event = &registration.event;
    let link = event_link(base_url, registration);
    Message {
        to: registration.user.email.clone(),
        subject: format!("Inscrição recebida: {}", event.title),
        html: format!(
            "<p>Olá {},</p>\
             <p>Recebemos a sua inscrição no evento <strong>{}</strong> \
             ({}, {}). A inscrição está pendente de confirmação.</p>\
             <p><a href=\"{link}\">Ver evento</a></p>",
            registration.user.user_name,
            event.title,
            event.location,
            event.starts_at.format("%d/%m/%Y %H:%M"),
        ),
    }
}

pub fn confirmed_message(base_url: &str, registration: &Registration) -> Message {
    let event = &registration.event;
    let link = event_link(base_url, registration);
    Message {
        to: registration.user.email.clone(),
        subject: format!("Inscrição confirmada: {}", event.title),
        html: format!(
            "<p>Olá {},</p>\
             <p>A sua inscrição no evento <strong>{}</strong> foi confirmada.</p>\
             <p>Local: {}<br>Data: {}</p>\
             <p><a href=\"{link}\">Ver evento</a></p>",
            registration.user.user_name,
            event.title,
            event.location,
            event.starts_at.format("%d/%m/%Y %H:%M"),
        ),
    }
}
