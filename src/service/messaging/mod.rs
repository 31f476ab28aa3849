pub mod twilio;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{MediaAttachment, Res};

// Traits.

/// Generic messaging trait that providers must implement.
///
/// This trait defines the core functionality for talking to an SMS/MMS
/// provider like Twilio. Implementing this trait allows different messaging
/// services to be used with footprint-bot.
#[async_trait]
pub trait GenericMessagingClient: Send + Sync + 'static {
    /// Fetch the bytes of a media attachment referenced by an inbound message.
    ///
    /// Provider-hosted media may require authentication; implementations are
    /// responsible for supplying it.
    async fn fetch_media(&self, url: &str) -> Res<MediaAttachment>;

    /// Render a reply payload in the provider's wire format.
    ///
    /// For Twilio this is a TwiML `<Response><Message>` document returned in
    /// the body of the webhook response.
    fn render_reply(&self, text: &str) -> String;

    /// Content type of the rendered reply payload.
    fn reply_content_type(&self) -> &'static str;
}

// Structs.

/// Messaging client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct MessagingClient {
    inner: Arc<dyn GenericMessagingClient>,
}

impl Deref for MessagingClient {
    type Target = dyn GenericMessagingClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl MessagingClient {
    pub fn new(inner: Arc<dyn GenericMessagingClient>) -> Self {
        Self { inner }
    }
}
