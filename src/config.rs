use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub voice: VoiceConfig,
    pub email: EmailConfig,
    pub identity: IdentityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            voice: VoiceConfig::default(),
            email: EmailConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Twilio TTS settings used in every `<Say>` verb.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VoiceConfig {
    pub voice: String,
    pub language: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: "alice".to_string(),
            language: "en-US".to_string(),
        }
    }
}

/// Email delivery via a Google Apps Script webhook.
///
/// All three fields must be set for delivery to happen; if any is empty the
/// notifier skips sending and the dialogue still runs normally.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EmailConfig {
    pub webhook_url: String,
    pub webhook_token: String,
    /// Recipient address for call summaries and forwarded SMS.
    pub to: String,
}

impl EmailConfig {
    /// Delivery needs all three settings; anything less and the notifier
    /// skips every send.
    pub fn is_configured(&self) -> bool {
        !self.webhook_url.is_empty() && !self.webhook_token.is_empty() && !self.to.is_empty()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name the assistant introduces itself with in the greeting.
    pub assistant_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Lesia".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file from same directory as config.toml
        let env_path = config_dir().join(".env");
        match dotenvy::from_path(&env_path) {
            Ok(()) => tracing::info!("Loaded .env from {}", env_path.display()),
            Err(dotenvy::Error::Io(_)) => {
                tracing::debug!(
                    "No .env file at {}, using environment only",
                    env_path.display()
                );
            }
            Err(e) => tracing::warn!("Failed to parse .env: {e}"),
        }

        let path = config_path();

        // A missing config file is fine: the dialogue works with defaults,
        // and email delivery is simply disabled until configured.
        let mut config: Config = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!("Loading config from {}", path.display());
                toml::from_str(&contents)?
            }
            Err(_) => {
                tracing::info!(
                    "No config file at {}, using defaults and environment",
                    path.display()
                );
                Config::default()
            }
        };

        // Allow env var overrides for secrets and deployment settings
        if let Ok(v) = std::env::var("EMAIL_WEBHOOK_URL") {
            config.email.webhook_url = v;
        }
        if let Ok(v) = std::env::var("EMAIL_WEBHOOK_TOKEN") {
            config.email.webhook_token = v;
        }
        if let Ok(v) = std::env::var("SUMMARY_TO_EMAIL") {
            config.email.to = v;
        }
        if let Ok(v) = std::env::var("TWILIO_TTS_VOICE") {
            config.voice.voice = v;
        }
        if let Ok(v) = std::env::var("TWILIO_TTS_LANG") {
            config.voice.language = v;
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.parse() {
                config.server.port = port;
            }
        }

        Ok(config)
    }
}

fn config_dir() -> PathBuf {
    if let Ok(p) = std::env::var("INTAKE_LINE_CONFIG") {
        // If pointing to a file, use its parent directory
        let path = PathBuf::from(p);
        return path.parent().map(|p| p.to_path_buf()).unwrap_or(path);
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".intake-line")
}

fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("INTAKE_LINE_CONFIG") {
        return PathBuf::from(p);
    }

    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_email_disabled() {
        let config = Config::default();
        assert!(config.email.webhook_url.is_empty());
        assert!(config.email.webhook_token.is_empty());
        assert!(config.email.to.is_empty());
        assert!(!config.email.is_configured());
    }

    #[test]
    fn default_matches_empty_toml() {
        // Constructing defaults must terminate and agree with deserializing
        // an empty document, which fills sections via serde(default).
        let built = Config::default();
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(built.server.host, parsed.server.host);
        assert_eq!(built.server.port, parsed.server.port);
        assert_eq!(built.voice.voice, parsed.voice.voice);
        assert_eq!(built.voice.language, parsed.voice.language);
        assert_eq!(built.identity.assistant_name, parsed.identity.assistant_name);
    }

    #[test]
    fn email_configured_requires_all_three_fields() {
        let full = EmailConfig {
            webhook_url: "https://example.invalid/hook".to_string(),
            webhook_token: "tok".to_string(),
            to: "owner@example.com".to_string(),
        };
        assert!(full.is_configured());

        for missing in ["url", "token", "to"] {
            let mut email = full.clone();
            match missing {
                "url" => email.webhook_url.clear(),
                "token" => email.webhook_token.clear(),
                _ => email.to.clear(),
            }
            assert!(!email.is_configured(), "missing {missing}");
        }
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [voice]
            voice = "Polly.Joanna"
            "#,
        )
        .unwrap();
        assert_eq!(config.voice.voice, "Polly.Joanna");
        assert_eq!(config.voice.language, "en-US");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.identity.assistant_name, "Lesia");
    }
}
