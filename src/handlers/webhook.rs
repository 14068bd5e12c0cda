use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
#[allow(dead_code)]
pub struct TwilioVoiceForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
}

fn validate_twilio_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(&str, &str)],
) -> bool {
    // Build the data to sign: URL + sorted params concatenated
    let mut data = url.to_string();
    let mut sorted_params = params.to_vec();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in &sorted_params {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data.as_bytes());
    let result = mac.finalize().into_bytes();
    let expected = base64::engine::general_purpose::STANDARD.encode(result);

    expected == signature
}

/// Answer Twilio's incoming-call webhook: play the greeting clip, then
/// connect the media stream that the session engine takes over.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<TwilioVoiceForm>,
) -> Result<Response, AppError> {
    tracing::info!(from = %form.from, "incoming call");

    // Validate Twilio signature (skip if auth token is empty — dev mode)
    if !state.config.twilio_auth_token.is_empty() {
        let signature = headers
            .get("x-twilio-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing X-Twilio-Signature header");
            return Err(AppError::Unauthorized);
        }

        // Reconstruct webhook URL — use X-Forwarded-Proto/Host if behind proxy
        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("https");
        let host = headers
            .get("x-forwarded-host")
            .or_else(|| headers.get("host"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let url = format!("{proto}://{host}/webhook/voice");

        let params = [
            ("From", form.from.as_str()),
            ("To", form.to.as_str()),
            ("CallSid", form.call_sid.as_deref().unwrap_or("")),
        ];

        if !validate_twilio_signature(&state.config.twilio_auth_token, signature, &url, &params) {
            tracing::warn!("invalid Twilio signature");
            return Err(AppError::Unauthorized);
        }
    }

    let greeting_url = format!(
        "{}/{}",
        state.config.public_url.trim_end_matches('/'),
        state.business.greeting_clip
    );
    let twiml = format!(
        "<Response>\
           <Play>{greeting_url}</Play>\
           <Connect>\
             <Stream url=\"{}\" />\
           </Connect>\
         </Response>",
        state.config.stream_url
    );

    Ok((
        [(header::CONTENT_TYPE, "text/xml")],
        twiml,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_validation_round_trip() {
        let auth_token = "secret";
        let url = "https://example.com/webhook/voice";
        let params = [("From", "+15551110000"), ("To", "+15552220000"), ("CallSid", "CA1")];

        // Compute the expected signature the same way Twilio does.
        let mut data = url.to_string();
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (k, v) in &sorted {
            data.push_str(k);
            data.push_str(v);
        }
        let mut mac = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()).unwrap();
        mac.update(data.as_bytes());
        let signature =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert!(validate_twilio_signature(auth_token, &signature, url, &params));
        assert!(!validate_twilio_signature(auth_token, "bogus", url, &params));
    }
}
