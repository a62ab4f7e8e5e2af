use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use error_stack::{Report, ResultExt};

use crate::error::ConfigError;

pub const DEFAULT_PRICE_SELECTOR: &str = r#"span[data-jd-fp-adp="display"].jd-fp-strong-text"#;

const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Outbound notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
    Terminal,
}

impl Channel {
    /// Parse a `NOTIFY_CHANNEL` value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "terminal" => Some(Self::Terminal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Terminal => "terminal",
        }
    }

    /// Each channel keeps its own notification history so switching channels
    /// never suppresses an alert.
    pub fn state_file_name(self) -> &'static str {
        match self {
            Self::Email => "last_notified_price_email.txt",
            Self::Sms => "last_notified_price.txt",
            Self::Terminal => "last_notified_price_terminal.txt",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub target: TargetConfig,
    pub channel: ChannelConfig,
}

impl AppConfig {
    /// Location of the last-notified price for the configured channel.
    pub fn state_path(&self) -> PathBuf {
        match &self.general.state_file {
            Some(path) => path.clone(),
            None => self
                .general
                .state_dir
                .join(self.channel.channel().state_file_name()),
        }
    }
}

#[derive(Debug)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    pub log_format: String,
    pub state_dir: PathBuf,
    pub state_file: Option<PathBuf>,
}

/// The page being watched and what counts as an attractive price.
#[derive(Debug)]
pub struct TargetConfig {
    pub url: String,
    /// Prices strictly above this never notify. `f64::INFINITY` when unset.
    pub threshold: f64,
    pub selector: String,
    pub request_timeout: Duration,
}

#[derive(Debug)]
pub enum ChannelConfig {
    Email(EmailConfig),
    Sms(SmsConfig),
    Terminal,
}

impl ChannelConfig {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Email(_) => Channel::Email,
            Self::Sms(_) => Channel::Sms,
            Self::Terminal => Channel::Terminal,
        }
    }
}

#[derive(Clone)]
pub struct EmailConfig {
    pub server: String,
    pub port: u16,
    pub from: String,
    pub to: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}

/// Build an `AppConfig` from the process environment, falling back to values
/// read from a dotenv file. Process variables win, as with `dotenvy::dotenv`.
pub fn from_env(
    file_vars: &HashMap<String, String>,
) -> Result<AppConfig, Report<ConfigError>> {
    from_lookup(|name| {
        std::env::var(name)
            .ok()
            .or_else(|| file_vars.get(name).cloned())
    })
}

/// Read settings from `path`, or from `.env` in the working directory when no
/// path is given. Only a missing default `.env` is tolerated; an explicit file
/// that is missing, or any file with a malformed line, is an error.
pub fn read_env_file(
    path: Option<&Path>,
) -> Result<HashMap<String, String>, Report<ConfigError>> {
    match path {
        Some(path) => read_env_path(path, true),
        None => read_env_path(Path::new(DEFAULT_ENV_FILE), false),
    }
}

fn read_env_path(
    path: &Path,
    required: bool,
) -> Result<HashMap<String, String>, Report<ConfigError>> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound && !required => {
            return Ok(HashMap::new());
        }
        Err(e) => {
            return Err(Report::new(e)
                .change_context(ConfigError::EnvFile)
                .attach(format!("env file: {}", path.display())));
        }
    };

    entries
        .map(|entry| {
            entry
                .change_context(ConfigError::EnvFile)
                .attach_with(|| format!("env file: {}", path.display()))
        })
        .collect()
}

/// Build and validate an `AppConfig` from any name-to-value lookup.
///
/// Empty or whitespace-only values are treated as unset.
pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, Report<ConfigError>>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = Vars(lookup);

    let general = GeneralConfig {
        log_level: vars.optional("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        log_format: vars.optional("LOG_FORMAT").unwrap_or_else(|| "text".into()),
        state_dir: vars
            .optional("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        state_file: vars.optional("STATE_FILE").map(PathBuf::from),
    };

    if !matches!(general.log_format.as_str(), "text" | "json") {
        return Err(invalid("LOG_FORMAT", &general.log_format));
    }

    let threshold = vars.parsed("PRICE_THRESHOLD", f64::INFINITY)?;
    if threshold.is_nan() {
        return Err(invalid("PRICE_THRESHOLD", "NaN"));
    }

    let timeout_secs = vars.parsed("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
    if timeout_secs == 0 {
        return Err(invalid("REQUEST_TIMEOUT_SECS", "0"));
    }

    let target = TargetConfig {
        url: vars.required("APARTMENT_URL")?,
        threshold,
        selector: vars
            .optional("PRICE_SELECTOR")
            .unwrap_or_else(|| DEFAULT_PRICE_SELECTOR.into()),
        request_timeout: Duration::from_secs(timeout_secs),
    };

    let channel_name = vars
        .optional("NOTIFY_CHANNEL")
        .unwrap_or_else(|| Channel::Email.as_str().into());
    let channel = match Channel::from_str(&channel_name) {
        Some(Channel::Email) => ChannelConfig::Email(email_config(&vars)?),
        Some(Channel::Sms) => ChannelConfig::Sms(sms_config(&vars)?),
        Some(Channel::Terminal) => ChannelConfig::Terminal,
        None => return Err(invalid("NOTIFY_CHANNEL", &channel_name)),
    };

    Ok(AppConfig {
        general,
        target,
        channel,
    })
}

fn email_config<F>(vars: &Vars<F>) -> Result<EmailConfig, Report<ConfigError>>
where
    F: Fn(&str) -> Option<String>,
{
    let from = vars.required("EMAIL_FROM")?;
    Ok(EmailConfig {
        server: vars
            .optional("SMTP_SERVER")
            .unwrap_or_else(|| DEFAULT_SMTP_SERVER.into()),
        port: vars.parsed("SMTP_PORT", DEFAULT_SMTP_PORT)?,
        to: vars.required("EMAIL_TO")?,
        username: vars.optional("EMAIL_USERNAME").unwrap_or_else(|| from.clone()),
        password: vars.required("EMAIL_PASSWORD")?,
        from,
    })
}

fn sms_config<F>(vars: &Vars<F>) -> Result<SmsConfig, Report<ConfigError>>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(SmsConfig {
        account_sid: vars.required("TWILIO_ACCOUNT_SID")?,
        auth_token: vars.required("TWILIO_AUTH_TOKEN")?,
        from_number: vars.required("TWILIO_FROM_NUMBER")?,
        to_number: vars.required("TWILIO_TO_NUMBER")?,
    })
}

fn invalid(name: &str, value: &str) -> Report<ConfigError> {
    Report::new(ConfigError::Invalid { name: name.into() }).attach(format!("value: {value:?}"))
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, Report<ConfigError>> {
        self.optional(name)
            .ok_or_else(|| Report::new(ConfigError::Missing { name: name.into() }))
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T, Report<ConfigError>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .change_context(ConfigError::Invalid { name: name.into() })
                .attach_with(|| format!("value: {raw:?}")),
        }
    }
}
