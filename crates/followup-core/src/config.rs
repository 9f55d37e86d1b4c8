//! FollowUp configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FollowUpError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            database: DatabaseConfig::default(),
            classifier: ClassifierConfig::default(),
            composer: ComposerConfig::default(),
            channel: ChannelConfig::default(),
            scheduler: SchedulerConfig::default(),
            sequence: SequenceConfig::default(),
        }
    }
}

impl FollowUpConfig {
    /// Load config from the default path (~/.followup/config.toml), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific path (no environment overrides).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FollowUpError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| FollowUpError::Config(format!("Failed to parse config: {e}")))?;
        config.classifier.validate()?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| FollowUpError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the FollowUp home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".followup")
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).to_string())
    }

    /// Fill secrets from environment variables. Values already present in
    /// the file win; a channel section is created when its credentials are
    /// found only in the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(env_name) = env("FOLLOWUP_ENV") {
            self.environment = Environment::from_name(&env_name);
        }
        if let Some(path) = env("FOLLOWUP_DATABASE") {
            self.database.path = path;
        }

        if self.composer.api_key.is_empty() {
            if let Some(key) = env("GROQ_API_KEY").or_else(|| env("FOLLOWUP_COMPOSER_API_KEY")) {
                self.composer.api_key = key;
            }
        }
        if let Some(model) = env("GROQ_MODEL") {
            self.composer.model = model;
        }

        if let Some(key) = env("RESEND_API_KEY") {
            let resend = self.channel.resend.get_or_insert_with(ResendConfig::default);
            if resend.api_key.is_empty() {
                resend.api_key = key;
            }
        }
        if let (Some(from), Some(resend)) = (env("RESEND_FROM_EMAIL"), self.channel.resend.as_mut()) {
            resend.from_email = from;
        }

        if let (Some(host), Some(username), Some(password)) =
            (env("SMTP_HOST"), env("SMTP_USERNAME"), env("SMTP_PASSWORD"))
        {
            self.channel.smtp.get_or_insert_with(|| SmtpConfig {
                from_email: username.clone(),
                host,
                port: default_smtp_port(),
                username,
                password,
                display_name: None,
            });
        }

        if let (Some(sid), Some(token)) = (env("TWILIO_ACCOUNT_SID"), env("TWILIO_AUTH_TOKEN")) {
            let twilio = self.channel.twilio.get_or_insert_with(TwilioConfig::default);
            if twilio.account_sid.is_empty() {
                twilio.account_sid = sid;
                twilio.auth_token = token;
            }
            if let Some(from) = env("TWILIO_WHATSAPP_NUMBER") {
                twilio.whatsapp_from = from;
            }
        }

        if let (Some(token), Some(phone_id)) =
            (env("WHATSAPP_ACCESS_TOKEN"), env("WHATSAPP_PHONE_NUMBER_ID"))
        {
            let wa = self.channel.whatsapp.get_or_insert_with(WhatsAppConfig::default);
            if wa.access_token.is_empty() {
                wa.access_token = token;
                wa.phone_number_id = phone_id;
            }
        }
    }
}

/// Deployment environment. Test-only affordances (sandbox redirect) are
/// gated on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" => Self::Staging,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String { "~/.followup/followup.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_database_path() }
    }
}

/// Recency thresholds, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_active_days")]
    pub active_days: i64,
    #[serde(default = "default_followup_min_days")]
    pub needs_followup_min_days: i64,
    #[serde(default = "default_followup_max_days")]
    pub needs_followup_max_days: i64,
}

fn default_active_days() -> i64 { 3 }
fn default_followup_min_days() -> i64 { 7 }
fn default_followup_max_days() -> i64 { 20 }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            active_days: default_active_days(),
            needs_followup_min_days: default_followup_min_days(),
            needs_followup_max_days: default_followup_max_days(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.active_days < 0
            || self.needs_followup_min_days > self.needs_followup_max_days
        {
            return Err(FollowUpError::Config(format!(
                "invalid classifier thresholds: active<={}, followup in [{}, {}]",
                self.active_days, self.needs_followup_min_days, self.needs_followup_max_days
            )));
        }
        Ok(())
    }
}

/// LLM composer (OpenAI-compatible chat completions endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    #[serde(default = "default_composer_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    /// Empty = the provider's registry default.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_composer_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_composer_provider() -> String { "groq".into() }
fn default_composer_model() -> String { "llama-3.3-70b-versatile".into() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 300 }
fn default_timeout_secs() -> u64 { 30 }

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            provider: default_composer_provider(),
            api_key: String::new(),
            base_url: String::new(),
            model: default_composer_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Outbound channel providers. Order within a modality is fixed:
/// email = resend, smtp; whatsapp = twilio, whatsapp (Meta Cloud API).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub resend: Option<ResendConfig>,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub twilio: Option<TwilioConfig>,
    #[serde(default)]
    pub whatsapp: Option<WhatsAppConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_resend_from")]
    pub from_email: String,
    #[serde(default = "default_resend_base_url")]
    pub base_url: String,
    /// Outside production, every message is rerouted here when set.
    #[serde(default)]
    pub sandbox_recipient: Option<String>,
}

fn default_resend_from() -> String { "FollowUp <onboarding@resend.dev>".into() }
fn default_resend_base_url() -> String { "https://api.resend.com".into() }

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: default_resend_from(),
            base_url: default_resend_base_url(),
            sandbox_recipient: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_smtp_port() -> u16 { 587 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Sender, e.g. "whatsapp:+14155238886".
    #[serde(default = "default_twilio_from")]
    pub whatsapp_from: String,
    #[serde(default = "default_twilio_base_url")]
    pub base_url: String,
}

fn default_twilio_from() -> String { "whatsapp:+14155238886".into() }
fn default_twilio_base_url() -> String { "https://api.twilio.com".into() }

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            whatsapp_from: default_twilio_from(),
            base_url: default_twilio_base_url(),
        }
    }
}

/// WhatsApp Business Cloud API (Meta).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub phone_number_id: String,
    #[serde(default = "default_graph_version")]
    pub api_version: String,
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,
}

fn default_graph_version() -> String { "v21.0".into() }
fn default_graph_base_url() -> String { "https://graph.facebook.com".into() }

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            api_version: default_graph_version(),
            base_url: default_graph_base_url(),
        }
    }
}

/// Recurring runs driven by `followup serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 5-field cron for sequence advancement.
    #[serde(default = "default_sequence_cron")]
    pub sequence_cron: String,
    /// Optional cron for full cycles over `cycle_owners`.
    #[serde(default)]
    pub cycle_cron: Option<String>,
    #[serde(default)]
    pub cycle_owners: Vec<i64>,
    /// Per-prospect lease TTL; 0 disables leasing.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

fn default_sequence_cron() -> String { "0 * * * *".into() }
fn default_lease_secs() -> u64 { 300 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sequence_cron: default_sequence_cron(),
            cycle_cron: None,
            cycle_owners: Vec::new(),
            lease_secs: default_lease_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Treat the wait gate as satisfied for never-contacted prospects.
    /// When false, only zero-wait steps fire for them.
    #[serde(default = "bool_true")]
    pub fire_uncontacted: bool,
}

fn bool_true() -> bool { true }

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { fire_uncontacted: true }
    }
}
