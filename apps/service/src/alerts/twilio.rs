use async_trait::async_trait;

use super::{MAX_MESSAGE_LEN, NotifyError, Notifier};
use crate::config::TwilioConfig;
use crate::monitoring::types::PHONE_LEN;

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// SMS delivery through the Twilio messages API
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
    api_base: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Point the notifier at another API host, e.g. a local mock
    pub fn with_api_base(config: TwilioConfig, api_base: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config, api_base: api_base.into() })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

/// Check phone and message before anything goes on the wire
fn validate_parameters<'a>(phone: &'a str, message: &'a str) -> Result<(&'a str, &'a str), NotifyError> {
    let phone = phone.trim();
    if phone.chars().count() != PHONE_LEN {
        return Err(NotifyError::InvalidParameters("phone"));
    }

    let message = message.trim();
    if message.is_empty() || message.chars().count() > MAX_MESSAGE_LEN {
        return Err(NotifyError::InvalidParameters("message"));
    }

    Ok((phone, message))
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        let (phone, message) = validate_parameters(contact, message)?;
        let to = format!("{}{}", self.config.country_prefix, phone);

        let form = [("From", self.config.from_phone.as_str()), ("To", to.as_str()), ("Body", message)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 201 => Ok(()),
            other => Err(NotifyError::UnexpectedStatus(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body, header, serve_once};

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_phone: "+15005550006".to_string(),
            country_prefix: "+420".to_string(),
        }
    }

    #[test]
    fn test_parameters() {
        assert!(validate_parameters(" 123456789 ", "hello").is_ok());
        assert!(matches!(
            validate_parameters("12345", "hello"),
            Err(NotifyError::InvalidParameters("phone"))
        ));
        assert!(matches!(
            validate_parameters("123456789", "   "),
            Err(NotifyError::InvalidParameters("message"))
        ));

        let long = "x".repeat(MAX_MESSAGE_LEN + 1);
        assert!(validate_parameters("123456789", &long).is_err());
        assert!(validate_parameters("123456789", &long[1..]).is_ok());
    }

    #[test]
    fn test_messages_url() {
        let notifier = TwilioNotifier::with_api_base(config(), "http://localhost:9999/").unwrap();
        assert_eq!(
            notifier.messages_url(),
            "http://localhost:9999/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_invalid_phone_never_hits_the_network() {
        // Unroutable base: reaching the network would surface a transport error instead
        let notifier = TwilioNotifier::with_api_base(config(), "http://127.0.0.1:1").unwrap();
        let result = notifier.send("12", "Alert").await;
        assert!(matches!(result, Err(NotifyError::InvalidParameters("phone"))));
    }

    #[tokio::test]
    async fn test_send_posts_form_with_basic_auth() {
        let (addr, server) = serve_once("HTTP/1.1 201 Created".to_string()).await;
        let notifier = TwilioNotifier::with_api_base(config(), format!("http://{addr}")).unwrap();

        notifier.send(" 123456789 ", "Alert: check is up").await.unwrap();

        let request = server.await.unwrap();
        assert!(
            request.starts_with("POST /2010-04-01/Accounts/AC123/Messages.json HTTP/1.1\r\n"),
            "request was {request}"
        );
        // base64("AC123:secret")
        assert_eq!(header(&request, "authorization"), Some("Basic QUMxMjM6c2VjcmV0"));
        assert_eq!(
            header(&request, "content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(body(&request), "From=%2B15005550006&To=%2B420123456789&Body=Alert%3A+check+is+up");
    }

    #[tokio::test]
    async fn test_rejected_message_is_unexpected_status() {
        let (addr, server) = serve_once("HTTP/1.1 400 Bad Request".to_string()).await;
        let notifier = TwilioNotifier::with_api_base(config(), format!("http://{addr}")).unwrap();

        let result = notifier.send("123456789", "Alert").await;
        assert!(matches!(result, Err(NotifyError::UnexpectedStatus(400))), "got {result:?}");
        server.await.unwrap();
    }
}
