//! Twilio SMS/MMS integration.
//!
//! Inbound messages arrive as webhook form posts handled by the server; this
//! client covers the outbound half: downloading MMS media (authenticated when
//! Twilio-hosted) and rendering TwiML replies.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;

use crate::base::{
    config::Config,
    types::{MediaAttachment, Res},
};

use super::{GenericMessagingClient, MessagingClient};

// Extra methods on `MessagingClient` applied by the twilio implementation.

impl MessagingClient {
    pub fn twilio(config: &Config) -> Self {
        let client = TwilioMessagingClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// Twilio messaging client implementation.
#[derive(Clone)]
pub struct TwilioMessagingClient {
    http: Client,
    config: Config,
}

impl TwilioMessagingClient {
    /// Create a new Twilio messaging client.
    #[instrument(name = "TwilioMessagingClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl GenericMessagingClient for TwilioMessagingClient {
    #[instrument(name = "TwilioMessagingClient::fetch_media", skip(self))]
    async fn fetch_media(&self, url: &str) -> Res<MediaAttachment> {
        let mut request = self.http.get(url);

        // Twilio-hosted media requires account credentials.
        if url.contains("api.twilio.com") {
            if let (Some(sid), Some(token)) = (&self.config.twilio_account_sid, &self.config.twilio_auth_token) {
                request = request.basic_auth(sid, Some(token));
            }
        }

        let response = request.send().await?.error_for_status()?;

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| mime_from_url(url).to_string());

        let bytes = response.bytes().await?.to_vec();

        Ok(MediaAttachment { bytes, mime })
    }

    fn render_reply(&self, text: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message><Body>{}</Body></Message></Response>",
            xml_escape(text)
        )
    }

    fn reply_content_type(&self) -> &'static str {
        "text/xml"
    }
}

/// Guess an image MIME type from a URL extension.
fn mime_from_url(url: &str) -> &'static str {
    let url = url.to_lowercase();

    if url.ends_with(".png") {
        "image/png"
    } else if url.ends_with(".webp") {
        "image/webp"
    } else if url.ends_with(".heic") || url.ends_with(".heif") {
        "image/heic"
    } else {
        "image/jpeg"
    }
}

/// Escape the five XML-significant characters for TwiML bodies.
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_xml_significant_characters() {
        assert_eq!(xml_escape("a < b & c > \"d\""), "a &lt; b &amp; c &gt; &quot;d&quot;");
    }

    #[test]
    fn renders_twiml_envelope() {
        let client = TwilioMessagingClient::new(&Config {
            inner: std::sync::Arc::new(crate::base::config::ConfigInner::default()),
        });

        let xml = client.render_reply("Total: 7.2 kg CO2e");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Response><Message><Body>Total: 7.2 kg CO2e</Body></Message></Response>"));
    }

    #[test]
    fn guesses_mime_from_extension() {
        assert_eq!(mime_from_url("https://x/y.PNG"), "image/png");
        assert_eq!(mime_from_url("https://x/y.webp"), "image/webp");
        assert_eq!(mime_from_url("https://api.twilio.com/media/ME123"), "image/jpeg");
    }
}
