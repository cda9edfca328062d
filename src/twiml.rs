//! TwiML responses for the intake dialogue.
//!
//! Two shapes only: a speech `<Gather>` that routes the caller's answer to
//! the next step (with a polite fallback close if nothing is captured), and
//! a closing `<Say>` + `<Hangup/>`.

use crate::config::VoiceConfig;

/// Spoken before hanging up, both as the fallback when a gather captures
/// nothing and as the normal goodbye at the end of the dialogue.
pub const CLOSING_TEXT: &str = "Thank you so much for calling. I'll be in touch soon.";

/// Listen/silence windows for one gather step, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct StepTiming {
    /// How long Twilio waits for speech to start before giving up.
    pub listen_secs: u32,
    /// Trailing silence that ends the capture.
    pub silence_secs: u32,
}

// Short windows for yes/no-style answers, long for open-ended ones.
pub const T_NAME: StepTiming = StepTiming { listen_secs: 3, silence_secs: 1 };
pub const T_TYPE: StepTiming = StepTiming { listen_secs: 3, silence_secs: 1 };
pub const T_URGENCY: StepTiming = StepTiming { listen_secs: 3, silence_secs: 1 };
pub const T_TOPIC: StepTiming = StepTiming { listen_secs: 7, silence_secs: 2 };
pub const T_CALLBACK: StepTiming = StepTiming { listen_secs: 7, silence_secs: 2 };
pub const T_CALLBACK_TIME: StepTiming = StepTiming { listen_secs: 7, silence_secs: 2 };

/// Speak `prompt`, gather a spoken answer, and POST it to `action`.
///
/// `actionOnEmptyResult` makes Twilio POST even when nothing was said, so the
/// next handler always runs; the trailing `<Say>` + `<Hangup/>` only fire if
/// Twilio abandons the gather entirely. Action paths are relative, which
/// keeps every step on the same host as the incoming webhook.
pub fn gather(voice: &VoiceConfig, prompt: &str, action: &str, timing: StepTiming) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Gather input="speech" timeout="{listen}" speechTimeout="{silence}" action="{action}" method="POST" actionOnEmptyResult="true">
        <Say voice="{v}" language="{lang}">{prompt}</Say>
    </Gather>
    <Say voice="{v}" language="{lang}">{closing}</Say>
    <Hangup/>
</Response>"#,
        listen = timing.listen_secs,
        silence = timing.silence_secs,
        action = escape(action),
        v = escape(&voice.voice),
        lang = escape(&voice.language),
        prompt = escape(prompt),
        closing = escape(CLOSING_TEXT),
    )
}

/// Speak `text` and end the call. Terminal; no further webhooks follow.
pub fn closing(voice: &VoiceConfig, text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Say voice="{v}" language="{lang}">{text}</Say>
    <Hangup/>
</Response>"#,
        v = escape(&voice.voice),
        lang = escape(&voice.language),
        text = escape(text),
    )
}

/// Empty acknowledgment for webhooks that speak nothing (SMS intake).
pub fn empty() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Response></Response>"#
        .to_string()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
