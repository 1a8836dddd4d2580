//! Generated artifacts: the import manifest, the runtime configuration and the
//! type declarations.
//!
//! Rendering is pure. Writing goes through a temp file in the target directory
//! followed by an atomic rename, so readers never see a partial file.

use crate::context::BuildContext;
use crate::error::{Error, Result};
use quiver_config::{CorsConfig, HttpConfig, TemplateConfig};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

const HEADER: &str = "// Generated by quiver. Do not edit.\n";

/// Which generated file an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ImportManifest,
    RuntimeConfig,
    EnvDeclarations,
}

/// A rendered file, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Where generated files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub project_root: PathBuf,
    pub runtime_dir: PathBuf,
    pub declarations_path: PathBuf,
}

impl ArtifactLayout {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            runtime_dir: project_root.join(crate::RUNTIME_DIR),
            declarations_path: project_root.join(crate::ENV_DECLARATIONS_FILE),
            project_root,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.runtime_dir.join(crate::MANIFEST_FILE)
    }

    pub fn runtime_config_path(&self) -> PathBuf {
        self.runtime_dir.join(crate::RUNTIME_CONFIG_FILE)
    }
}

/// Values fixed at build time, read by the bundled runtime.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfig<'a> {
    mode: &'a str,
    http: Option<HttpConfig>,
    cors: CorsConfig,
    template: &'a TemplateConfig,
    stdio: bool,
    adapter: Option<quiver_config::AdapterKind>,
    middleware: bool,
    tools: Vec<String>,
}

pub struct ArtifactGenerator {
    layout: ArtifactLayout,
}

impl ArtifactGenerator {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Delete the runtime directory if present and recreate it empty.
    pub fn prepare_runtime_dir(&self) -> Result<()> {
        let dir = &self.layout.runtime_dir;
        match std::fs::remove_dir_all(dir) {
            Ok(()) => tracing::debug!(dir = %dir.display(), "removed stale runtime directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::generation_io(dir, e)),
        }
        std::fs::create_dir_all(dir).map_err(|e| Error::generation_io(dir, e))
    }

    /// Render every artifact for `ctx`. Same input, same bytes.
    pub fn render(&self, ctx: &BuildContext) -> Result<Vec<GeneratedArtifact>> {
        let tools: Vec<(String, &Path)> = ctx
            .tool_paths
            .iter()
            .map(|path| (tool_key(&ctx.tools_root, path), path.as_path()))
            .collect();

        let runtime_config = self.render_runtime_config(ctx, &tools)?;

        Ok(vec![
            GeneratedArtifact {
                kind: ArtifactKind::ImportManifest,
                path: self.layout.manifest_path(),
                content: self.render_manifest(ctx, &tools).into_bytes(),
            },
            GeneratedArtifact {
                kind: ArtifactKind::RuntimeConfig,
                path: self.layout.runtime_config_path(),
                content: runtime_config.into_bytes(),
            },
            GeneratedArtifact {
                kind: ArtifactKind::EnvDeclarations,
                path: self.layout.declarations_path.clone(),
                content: render_declarations(&tools).into_bytes(),
            },
        ])
    }

    /// Write artifacts atomically, in order.
    pub fn write(&self, artifacts: &[GeneratedArtifact]) -> Result<()> {
        for artifact in artifacts {
            write_atomic(artifact)?;
            tracing::debug!(
                path = %artifact.path.display(),
                bytes = artifact.content.len(),
                "wrote generated artifact"
            );
        }
        Ok(())
    }

    /// Render and write. Returns what was written.
    pub fn generate(&self, ctx: &BuildContext) -> Result<Vec<GeneratedArtifact>> {
        let artifacts = self.render(ctx)?;
        self.write(&artifacts)?;
        Ok(artifacts)
    }

    fn render_manifest(&self, ctx: &BuildContext, tools: &[(String, &Path)]) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');

        out.push_str("export const tools = {\n");
        for (key, path) in tools {
            let _ = writeln!(
                out,
                "  {}: () => import({}),",
                js_string(key),
                js_string(&self.import_specifier(path))
            );
        }
        out.push_str("};\n\n");

        if ctx.has_middleware {
            let _ = writeln!(
                out,
                "export const middleware = () => import({});",
                js_string(&self.import_specifier(&ctx.middleware_path))
            );
        } else {
            out.push_str("export const middleware = undefined;\n");
        }
        out.push('\n');

        let _ = writeln!(
            out,
            "export {{ default as runtimeConfig }} from {};",
            js_string(&format!("./{}", crate::RUNTIME_CONFIG_FILE))
        );
        out
    }

    fn render_runtime_config(&self, ctx: &BuildContext, tools: &[(String, &Path)]) -> Result<String> {
        let config = &ctx.config;
        let http = config.http.resolve();
        let cors = http.as_ref().map(|h| h.cors.clone()).unwrap_or_default();

        let document = RuntimeConfig {
            mode: ctx.mode.as_str(),
            http,
            cors,
            template: &config.template,
            stdio: config.stdio,
            adapter: config.experimental.adapter,
            middleware: ctx.has_middleware,
            tools: tools.iter().map(|(key, _)| key.clone()).collect(),
        };

        let mut json = serde_json::to_string_pretty(&document).map_err(|e| {
            Error::generation_io(
                self.layout.runtime_config_path(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        json.push('\n');
        Ok(json)
    }

    /// Specifier used by the manifest to import `path`, relative to the runtime dir.
    fn import_specifier(&self, path: &Path) -> String {
        match path.strip_prefix(&self.layout.project_root) {
            Ok(relative) => format!("../{}", slash_path(relative)),
            Err(_) => slash_path(path),
        }
    }
}

fn render_declarations(tools: &[(String, &Path)]) -> String {
    let tool_names = if tools.is_empty() {
        "never".to_string()
    } else {
        tools
            .iter()
            .map(|(key, _)| js_string(key))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut out = String::from(HEADER);
    out.push('\n');
    out.push_str("declare module \"quiver:runtime-config\" {\n");
    out.push_str(
        "  export interface CorsConfig {\n    origin: string;\n    methods: string[];\n    allowedHeaders: string[];\n    exposedHeaders: string[];\n    credentials: boolean;\n    maxAge: number | null;\n  }\n\n",
    );
    out.push_str(
        "  export interface HttpConfig {\n    port: number;\n    host: string;\n    endpoint: string;\n    bodySizeLimit: number;\n    debug: boolean;\n    cors: CorsConfig;\n  }\n\n",
    );
    out.push_str("  export interface TemplateConfig {\n    name: string;\n    description: string;\n  }\n\n");
    let _ = writeln!(out, "  export type ToolName = {tool_names};\n");
    out.push_str(
        "  export interface RuntimeConfig {\n    mode: \"development\" | \"production\";\n    http: HttpConfig | null;\n    cors: CorsConfig;\n    template: TemplateConfig;\n    stdio: boolean;\n    adapter: \"express\" | \"nextjs\" | null;\n    middleware: boolean;\n    tools: ToolName[];\n  }\n\n",
    );
    out.push_str("  const runtimeConfig: RuntimeConfig;\n  export default runtimeConfig;\n}\n");
    out
}

fn write_atomic(artifact: &GeneratedArtifact) -> Result<()> {
    let path = &artifact.path;
    let io_err = |e| Error::generation_io(path, e);

    let dir = path
        .parent()
        .ok_or_else(|| io_err(std::io::Error::other("artifact path has no parent directory")))?;
    std::fs::create_dir_all(dir).map_err(io_err)?;

    if artifact.kind == ArtifactKind::EnvDeclarations {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&artifact.content).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Manifest key for a handler: its path relative to the tools root.
fn tool_key(tools_root: &Path, path: &Path) -> String {
    slash_path(path.strip_prefix(tools_root).unwrap_or(path))
}

/// Forward-slash rendering, independent of the host separator.
fn slash_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy(),
            Component::RootDir => {
                out.push('/');
                continue;
            }
            Component::Prefix(prefix) => prefix.as_os_str().to_string_lossy(),
            Component::CurDir => continue,
            Component::ParentDir => "..".into(),
        };
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(&part);
    }
    out
}

/// Double-quoted JS string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
