//! Resolved configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration, loaded from `quiver.config.json` / `quiver.config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuiverConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    /// `true`/`false` or a full HTTP transport section.
    #[serde(default)]
    pub http: HttpSetting,

    #[serde(default)]
    pub stdio: bool,

    #[serde(default)]
    pub experimental: ExperimentalConfig,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub bundler: BundlerConfig,

    #[serde(default)]
    pub runtime: RuntimeCommandConfig,
}

impl Default for QuiverConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            http: HttpSetting::default(),
            stdio: false,
            experimental: ExperimentalConfig::default(),
            template: TemplateConfig::default(),
            bundler: BundlerConfig::default(),
            runtime: RuntimeCommandConfig::default(),
        }
    }
}

impl QuiverConfig {
    /// Whether the HTTP transport is turned on.
    pub fn http_enabled(&self) -> bool {
        self.http.is_enabled()
    }

    /// Whether an external adapter owns serving.
    pub fn adapter_enabled(&self) -> bool {
        self.experimental.adapter.is_some()
    }

    /// Force the HTTP transport on and pin its port.
    pub fn override_port(&mut self, port: u16) {
        let mut http = self.http.resolve().unwrap_or_default();
        http.port = port;
        self.http = HttpSetting::Custom(http);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathsConfig {
    /// Directory holding the handler files, relative to the project root.
    pub tools: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tools: default_tools_dir(),
        }
    }
}

/// HTTP transport switch.
///
/// Accepts either a plain boolean or an object with transport settings. An
/// object always means "enabled".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HttpSetting {
    Enabled(bool),
    Custom(HttpConfig),
}

impl Default for HttpSetting {
    fn default() -> Self {
        HttpSetting::Enabled(false)
    }
}

impl HttpSetting {
    pub fn is_enabled(&self) -> bool {
        match self {
            HttpSetting::Enabled(enabled) => *enabled,
            HttpSetting::Custom(_) => true,
        }
    }

    /// Resolve to concrete settings, or `None` when the transport is off.
    pub fn resolve(&self) -> Option<HttpConfig> {
        match self {
            HttpSetting::Enabled(true) => Some(HttpConfig::default()),
            HttpSetting::Enabled(false) => None,
            HttpSetting::Custom(config) => Some(config.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub endpoint: String,
    pub body_size_limit: u64,
    pub debug: bool,
    pub cors: CorsConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            host: "127.0.0.1".to_string(),
            endpoint: "/mcp".to_string(),
            body_size_limit: 10 * 1024 * 1024,
            debug: false,
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorsConfig {
    pub origin: String,
    pub methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            methods: vec!["GET".to_string(), "POST".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "mcp-session-id".to_string(),
                "mcp-protocol-version".to_string(),
            ],
            exposed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "mcp-session-id".to_string(),
            ],
            credentials: false,
            max_age: Some(86_400),
        }
    }
}

/// Adapters that take over serving from the built-in HTTP runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    Express,
    Nextjs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentalConfig {
    pub adapter: Option<AdapterKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateConfig {
    pub name: String,
    pub description: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            name: "quiver server".to_string(),
            description: "This server was built with quiver.".to_string(),
        }
    }
}

/// External bundler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundlerConfig {
    pub command: String,
    /// Extra arguments placed before the generated ones.
    pub args: Vec<String>,
    pub out_dir: PathBuf,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: "esbuild".to_string(),
            args: Vec::new(),
            out_dir: PathBuf::from("dist"),
        }
    }
}

/// Command that launches the bundled HTTP runtime in development.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeCommandConfig {
    pub command: Vec<String>,
}

impl Default for RuntimeCommandConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".to_string(), "dist/http.js".to_string()],
        }
    }
}

pub fn default_tools_dir() -> PathBuf {
    PathBuf::from("src/tools")
}
