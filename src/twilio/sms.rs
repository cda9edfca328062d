//! Inbound SMS forwarding. No dialogue, no state: one webhook, one email.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;

use crate::notify::{self, Notifier};
use crate::{twiml, AppState};

#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// POST /twilio/sms — forward an incoming text message by email.
///
/// Always acknowledges with empty TwiML; Twilio must never see a notifier
/// failure, and the sender gets no auto-reply.
pub async fn handle_sms(State(state): State<AppState>, Form(form): Form<SmsForm>) -> Response {
    tracing::info!(from = %form.from, to = %form.to, "Incoming SMS");

    let subject = notify::sms_subject(&form.from);
    let body = format!(
        "From: {}\nTo: {}\n\n{}",
        form.from, form.to, form.body
    );

    let notifier: Arc<Notifier> = state.notifier.clone();
    tokio::spawn(async move {
        notifier.send(&subject, &body).await;
    });

    ([("Content-Type", "text/xml")], twiml::empty()).into_response()
}
