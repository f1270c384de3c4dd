//! LSP server for atref
//!
//! Provides editor features for `@file` mentions in any document:
//! - Completions: every workspace file when an `@` precedes the cursor
//! - Document links: mentions of existing files become clickable
//! - Semantic tokens: mentions of existing files are highlighted
//! - Hover: a preview of the mentioned file
//! - Commands: open a mentioned file, copy a path
//!
//! Nothing derived from a document is cached: each request rescans the
//! current text and stats the filesystem again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use atref_core::{
    COMPLETION_DETAIL, FileSource, HoverContext, complete, decorations, hover, links,
    resolve_path, wants_completion,
};
use eyre::{Result, WrapErr};
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use crate::commands::{MentionCommand, command_ids};
use crate::config::{Config, ConfigLayer, load_config};
use crate::position::LineIndex;

// Semantic token types for mentions
const SEMANTIC_TOKEN_TYPES: &[SemanticTokenType] = &[
    SemanticTokenType::DECORATOR, // 0: mention of an existing file
];

/// Run the LSP server over stdio.
pub async fn run(root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let root_from_cli = root.is_some();
    let project_root = match root {
        Some(r) => absolute_root(&r)?,
        None => crate::find_project_root()?,
    };
    let config = load_config(&project_root, config_path.as_ref())?;

    info!("Starting atref LSP for {}", project_root.display());

    let options = BackendOptions {
        project_root,
        root_from_cli,
        config_path,
        config,
    };

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend::new(client, options));
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

/// Make a workspace root absolute and lexically normalized.
///
/// Document paths come from `file://` URIs and are always absolute; listed
/// files must be too, or they never compare equal to them.
pub fn absolute_root(root: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().wrap_err("Failed to get current directory")?;
    Ok(resolve_path(root, &cwd))
}

/// How the backend starts out
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub project_root: PathBuf,
    /// When set, the client's workspace folders don't override the root
    pub root_from_cli: bool,
    /// Explicit config file, reloaded if the root changes
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl BackendOptions {
    /// Default config, fixed root
    pub fn for_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            root_from_cli: true,
            config_path: None,
            config: Config::default(),
        }
    }
}

pub struct Backend {
    client: Client,
    state: Mutex<LspState>,
}

struct LspState {
    /// Document content cache: uri -> content
    documents: HashMap<Url, String>,
    /// Workspace root for listing files and display paths
    project_root: PathBuf,
    root_from_cli: bool,
    config_path: Option<PathBuf>,
    config: Config,
    /// Whether the client accepts `workspace/semanticTokens/refresh`
    can_refresh_tokens: bool,
}

/// What a request needs from the state, copied out so the lock isn't held
/// while touching the filesystem.
struct DocumentSnapshot {
    path: PathBuf,
    text: String,
    project_root: PathBuf,
    config: Config,
}

impl Backend {
    pub fn new(client: Client, options: BackendOptions) -> Self {
        let project_root = absolute_root(&options.project_root).unwrap_or_else(|e| {
            warn!("{:#}", e);
            options.project_root
        });
        Self {
            client,
            state: Mutex::new(LspState {
                documents: HashMap::new(),
                project_root,
                root_from_cli: options.root_from_cli,
                config_path: options.config_path,
                config: options.config,
                can_refresh_tokens: false,
            }),
        }
    }

    async fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        let state = self.state.lock().await;
        let text = state.documents.get(uri)?.clone();
        let path = uri.to_file_path().ok()?;
        Some(DocumentSnapshot {
            path,
            text,
            project_root: state.project_root.clone(),
            config: state.config.clone(),
        })
    }
}

impl LspState {
    /// Pick up the client's workspace root and settings
    fn configure(&mut self, params: &InitializeParams) {
        #[allow(deprecated)]
        let client_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| folder.uri.clone())
            .or_else(|| params.root_uri.clone())
            .and_then(|uri| uri.to_file_path().ok());

        if !self.root_from_cli
            && let Some(root) = client_root
            && root != self.project_root
        {
            info!("Using client workspace root {}", root.display());
            match load_config(&root, self.config_path.as_ref()) {
                Ok(config) => self.config = config,
                Err(e) => warn!("Keeping previous config: {:#}", e),
            }
            self.project_root = root;
        }

        if let Some(options) = params.initialization_options.clone() {
            match ConfigLayer::from_value(options) {
                Ok(layer) => {
                    let previous = self.config.clone();
                    self.config.merge(layer);
                    if self.config.preview_lines == 0 {
                        warn!("Ignoring previewLines = 0");
                        self.config.preview_lines = previous.preview_lines;
                    }
                }
                Err(e) => warn!("Ignoring initialization options: {:#}", e),
            }
        }

        self.can_refresh_tokens = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|ws| ws.semantic_tokens.as_ref())
            .and_then(|st| st.refresh_support)
            .unwrap_or(false);
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        self.state.lock().await.configure(&params);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Sync full document content
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["@".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                }),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: SemanticTokensLegend {
                                token_types: SEMANTIC_TOKEN_TYPES.to_vec(),
                                token_modifiers: Vec::new(),
                            },
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            ..Default::default()
                        },
                    ),
                ),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: command_ids(),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "atref".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let root = self.state.lock().await.project_root.clone();
        self.client
            .log_message(
                MessageType::INFO,
                format!("atref LSP initialized for {}", root.display()),
            )
            .await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        debug!("opened {}", doc.uri);
        self.state.lock().await.documents.insert(doc.uri, doc.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.state.lock().await.documents.insert(uri, change.text);
        }
    }

    async fn did_save(&self, _: DidSaveTextDocumentParams) {
        // Saving may create a file other documents mention
        let can_refresh = self.state.lock().await.can_refresh_tokens;
        if can_refresh && let Err(e) = self.client.semantic_tokens_refresh().await {
            debug!("semantic token refresh failed: {}", e);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.state
            .lock()
            .await
            .documents
            .remove(&params.text_document.uri);
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(doc) = self.snapshot(uri).await else {
            return Ok(None);
        };

        let index = LineIndex::new(&doc.text);
        let Some(before_cursor) = index.line_prefix(position) else {
            return Ok(None);
        };
        if !wants_completion(before_cursor) {
            return Ok(None);
        }
        let Some(base_dir) = doc.path.parent() else {
            return Ok(None);
        };

        let files = match doc.config.walker(&doc.project_root).files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list workspace files: {:#}", e);
                return Ok(None);
            }
        };

        let items: Vec<CompletionItem> = complete(&files, &doc.path, base_dir)
            .into_iter()
            .map(|c| CompletionItem {
                label: c.label,
                kind: Some(CompletionItemKind::FILE),
                detail: Some(COMPLETION_DETAIL.to_string()),
                insert_text: Some(c.insert_text),
                ..Default::default()
            })
            .collect();

        debug!("{} completion candidates for {}", items.len(), uri);
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(doc) = self.snapshot(uri).await else {
            return Ok(None);
        };

        let index = LineIndex::new(&doc.text);
        let Some(offset) = index.offset(position) else {
            return Ok(None);
        };

        let ctx = HoverContext {
            document_path: &doc.path,
            workspace_root: Some(&doc.project_root),
            preview_lines: doc.config.preview_lines,
        };
        let Some((occurrence, markdown)) = hover(&doc.text, offset, &ctx) else {
            return Ok(None);
        };

        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: markdown,
            }),
            range: Some(index.range(occurrence.span())),
        }))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> LspResult<Option<Vec<DocumentLink>>> {
        let Some(doc) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        let Some(base_dir) = doc.path.parent() else {
            return Ok(None);
        };

        let index = LineIndex::new(&doc.text);
        let result = links(&doc.text, base_dir)
            .into_iter()
            .filter_map(|link| {
                let target = Url::from_file_path(&link.target).ok()?;
                Some(DocumentLink {
                    range: index.range(link.span),
                    target: Some(target),
                    tooltip: Some(link.tooltip),
                    data: None,
                })
            })
            .collect();

        Ok(Some(result))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> LspResult<Option<SemanticTokensResult>> {
        let Some(doc) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        let Some(base_dir) = doc.path.parent() else {
            return Ok(None);
        };

        let index = LineIndex::new(&doc.text);

        // Convert to delta format
        let mut prev_line = 0u32;
        let mut prev_char = 0u32;
        let mut data = Vec::new();

        for mention in decorations(&doc.text, base_dir) {
            let span = mention.occurrence.span();
            let start = index.position(span.start);
            // Mentions never contain a newline, so each fits on one line
            let length = doc.text[span].encode_utf16().count() as u32;

            let delta_line = start.line - prev_line;
            let delta_start = if delta_line == 0 {
                start.character - prev_char
            } else {
                start.character
            };

            data.push(SemanticToken {
                delta_line,
                delta_start,
                length,
                token_type: 0,
                token_modifiers_bitset: 0,
            });

            prev_line = start.line;
            prev_char = start.character;
        }

        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        })))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> LspResult<Option<serde_json::Value>> {
        match MentionCommand::parse(&params.command, &params.arguments) {
            Some(command) => command.execute(&self.client).await,
            None => debug!("ignoring command {} with {:?}", params.command, params.arguments),
        }
        Ok(None)
    }
}

/// Build a service without a transport, for driving the backend directly.
pub fn service(options: BackendOptions) -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(|client| Backend::new(client, options))
}
