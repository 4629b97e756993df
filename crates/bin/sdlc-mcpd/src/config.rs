use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use sdlc_core::model::VertexConfig;
use sdlc_core::model::vertex::{
    DEFAULT_LOCATION, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_PROJECT,
};
use sdlc_mcp::server::{DEFAULT_HTTP_PORT, McpHttpServerConfig};

const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const MAX_TEMPERATURE: f32 = 2.0;

/// How the MCP protocol is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    StreamableHttp,
}

#[derive(Parser, Debug)]
#[command(name = "sdlc-mcpd", version, about = "SDLC Assist MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_service_role_key: Option<String>,

    #[arg(
        long,
        env = "SDLC_STORE_TIMEOUT_SECS",
        default_value_t = DEFAULT_STORE_TIMEOUT_SECS
    )]
    store_timeout_secs: u64,

    #[arg(long, env = "VERTEXAI_PROJECT_ID", default_value = DEFAULT_PROJECT)]
    vertex_project: String,

    #[arg(long, env = "GOOGLE_CLOUD_LOCATION", default_value = DEFAULT_LOCATION)]
    vertex_location: String,

    #[arg(long, env = "SDLC_GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(
        long,
        env = "SDLC_MODEL_TIMEOUT_SECS",
        default_value_t = DEFAULT_MODEL_TIMEOUT_SECS
    )]
    model_timeout_secs: u64,

    #[arg(
        long,
        env = "SDLC_MAX_OUTPUT_TOKENS",
        default_value_t = DEFAULT_MAX_OUTPUT_TOKENS
    )]
    max_output_tokens: u32,

    #[arg(long, env = "SDLC_MODEL_TEMPERATURE")]
    temperature: Option<f32>,

    #[arg(long, env = "SDLC_VERTEX_BASE_URL")]
    vertex_base_url: Option<String>,

    #[arg(long, env = "SDLC_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    #[arg(long, env = "HOST", default_value_t = DEFAULT_HOST)]
    host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    #[arg(
        long,
        env = "SDLC_HTTP_STATELESS",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    stateless: bool,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
///
/// Store and model credentials are optional here; the registry reports them
/// as missing when a tool first needs them.
#[derive(Clone)]
pub struct SdlcConfig {
    pub supabase_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub store_timeout: Duration,
    pub vertex: VertexConfig,
    pub transport: Transport,
    pub http_addr: SocketAddr,
    pub stateless: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl SdlcConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    pub fn http_config(&self) -> McpHttpServerConfig {
        McpHttpServerConfig::new(self.http_addr).with_stateful_mode(!self.stateless)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require_text(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingSetting(name));
    }
    Ok(trimmed.to_string())
}

fn require_secs(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidSetting {
            name,
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl TryFrom<CliArgs> for SdlcConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_output_tokens == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "SDLC_MAX_OUTPUT_TOKENS",
                value: args.max_output_tokens.to_string(),
            });
        }
        if let Some(temperature) = args.temperature
            && !(0.0..=MAX_TEMPERATURE).contains(&temperature)
        {
            return Err(ConfigError::InvalidSetting {
                name: "SDLC_MODEL_TEMPERATURE",
                value: temperature.to_string(),
            });
        }

        let vertex = VertexConfig {
            project: require_text("VERTEXAI_PROJECT_ID", args.vertex_project)?,
            location: require_text("GOOGLE_CLOUD_LOCATION", args.vertex_location)?,
            model: require_text("SDLC_GEMINI_MODEL", args.model)?,
            timeout: require_secs("SDLC_MODEL_TIMEOUT_SECS", args.model_timeout_secs)?,
            max_output_tokens: args.max_output_tokens,
            temperature: args.temperature,
            base_url: non_blank(args.vertex_base_url),
        };

        Ok(Self {
            supabase_url: non_blank(args.supabase_url),
            supabase_service_role_key: non_blank(args.supabase_service_role_key),
            store_timeout: require_secs("SDLC_STORE_TIMEOUT_SECS", args.store_timeout_secs)?,
            vertex,
            transport: args.transport,
            http_addr: SocketAddr::new(args.host, args.port),
            stateless: args.stateless,
        })
    }
}
