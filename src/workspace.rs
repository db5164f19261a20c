//! File-backed workspace context, driven by the `[workspace]` config section.

use async_trait::async_trait;
use chatter_core::{
    config::{shellexpand, WorkspaceConfig},
    context::{Excerpt, WorkspaceSnapshot},
    traits::WorkspaceContextProvider,
};
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct FileWorkspace {
    root: PathBuf,
    /// Resolved once at construction; `/status` reads it on the request path.
    name: Option<String>,
    active_file: Option<String>,
    /// 1-based inclusive line range.
    selection: Option<(usize, usize)>,
    preview_lines: usize,
}

impl FileWorkspace {
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        let active = config.active_file.trim();
        let root = PathBuf::from(shellexpand(&config.root));
        let name = std::fs::canonicalize(&root)
            .unwrap_or_else(|_| root.clone())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Self {
            root,
            name,
            active_file: (!active.is_empty()).then(|| active.to_string()),
            selection: config.selection,
            preview_lines: config.preview_lines.max(1),
        }
    }

    fn active_path(&self) -> Option<PathBuf> {
        let file = self.active_file.as_ref()?;
        let path = Path::new(file);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        })
    }
}

/// Language identifier for a file, from its extension.
pub fn language_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("rs") => "rust",
        Some("ts" | "mts" | "cts") => "typescript",
        Some("tsx") => "typescriptreact",
        Some("js" | "mjs" | "cjs") => "javascript",
        Some("jsx") => "javascriptreact",
        Some("py") => "python",
        Some("go") => "go",
        Some("java") => "java",
        Some("kt" | "kts") => "kotlin",
        Some("c" | "h") => "c",
        Some("cc" | "cpp" | "cxx" | "hpp") => "cpp",
        Some("cs") => "csharp",
        Some("rb") => "ruby",
        Some("php") => "php",
        Some("swift") => "swift",
        Some("sh" | "bash") => "shellscript",
        Some("json") => "json",
        Some("toml") => "toml",
        Some("yaml" | "yml") => "yaml",
        Some("md") => "markdown",
        Some("html") => "html",
        Some("css") => "css",
        Some("sql") => "sql",
        _ => "plaintext",
    }
}

/// Lines `start..=end` (1-based), clamped to the document.
fn select_lines(content: &str, start: usize, end: usize) -> String {
    let start = start.max(1);
    if end < start {
        return String::new();
    }
    content
        .lines()
        .skip(start - 1)
        .take(end - start + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl WorkspaceContextProvider for FileWorkspace {
    fn workspace_name(&self) -> Option<String> {
        self.name.clone()
    }

    fn active_file(&self) -> Option<String> {
        self.active_file.clone()
    }

    async fn current_context(&self) -> Option<WorkspaceSnapshot> {
        let path = self.active_path()?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                warn!("workspace: cannot read {}: {e}", path.display());
                return None;
            }
        };

        let selected = self
            .selection
            .map(|(start, end)| select_lines(&content, start, end))
            .filter(|s| !s.is_empty());

        let excerpt = match selected {
            Some(text) => Excerpt::Selection(text),
            None => {
                let head: Vec<&str> = content.lines().take(self.preview_lines).collect();
                Excerpt::Head {
                    lines: head.len(),
                    text: head.join("\n"),
                }
            }
        };

        Some(WorkspaceSnapshot {
            file_id: path.display().to_string(),
            language: language_for(&path).to_string(),
            excerpt,
        })
    }
}
