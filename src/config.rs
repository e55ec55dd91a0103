use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "realtime-relay")]
#[command(about = "Relay between browser clients and the realtime voice session API")]
pub struct Args {
    // Address to bind the server on
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    // Upstream credential, required at startup
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    #[arg(long, env = "REALTIME_MODEL", default_value = "gpt-4o-realtime-preview-2024-12-17")]
    pub model: String,

    #[arg(long, env = "REALTIME_VOICE", default_value = "verse")]
    pub voice: String,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 50)]
    pub rate_limit: usize,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Idle seconds before a session is swept
    #[arg(long, default_value_t = 300)]
    pub session_timeout: u64,

    // Sweeper interval in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // Attempts per session creation
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    // Base backoff in seconds, doubled after every failed attempt
    #[arg(long, default_value_t = 2)]
    pub retry_delay: u64,

    // Per attempt timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub upstream_timeout: u64,

    #[arg(long, env = "SMTP_SERVER", default_value = "smtp.gmail.com")]
    pub smtp_server: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    // Sender address, falls back to the SMTP username
    #[arg(long, env = "YOUR_EMAIL")]
    pub sender: Option<String>,

    // Send a test email to the sender on startup
    #[arg(long, default_value_t = false)]
    pub verify_smtp: bool,

    // Directory with the browser client (index.html, app.js)
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 50,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub voice: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

impl Args {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit,
            window: Duration::from_secs(self.rate_window),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_secs(self.session_timeout),
            sweep_interval: Duration::from_secs(self.sweep_interval),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay),
        }
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            api_base: self.api_base.trim_end_matches('/').to_string(),
            model: self.model.clone(),
            voice: self.voice.clone(),
            timeout: Duration::from_secs(self.upstream_timeout),
        }
    }

    /// SMTP settings, or `None` when username or password is missing.
    pub fn smtp_config(&self) -> Option<SmtpConfig> {
        let username = self.smtp_username.clone().filter(|u| !u.is_empty())?;
        let password = self.smtp_password.clone().filter(|p| !p.is_empty())?;
        let sender = self.sender.clone().unwrap_or_else(|| username.clone());
        Some(SmtpConfig {
            server: self.smtp_server.clone(),
            port: self.smtp_port,
            username,
            password,
            sender,
        })
    }
}
