//! Tests driving the language server backend directly, without a transport.

mod common;

use std::path::Path;

use atref::lsp::{Backend, BackendOptions, service};
use futures_util::{FutureExt, SinkExt, StreamExt};
use serde_json::json;
use tower::{Service, ServiceExt};
use tower_lsp::jsonrpc::{Request, Response};
use tower_lsp::lsp_types::*;
use tower_lsp::{ClientSocket, LanguageServer, LspService};

use common::{create_workspace, uri, write};

async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "markdown".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

fn position_params(uri: &Url, line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position: Position { line, character },
    }
}

/// Insert texts of the completion items (the path after `@`)
async fn completion_paths(backend: &Backend, uri: &Url, line: u32, character: u32) -> Option<Vec<String>> {
    let response = backend
        .completion(CompletionParams {
            text_document_position: position_params(uri, line, character),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        })
        .await
        .unwrap()?;

    let CompletionResponse::Array(items) = response else {
        panic!("expected a completion array");
    };
    for item in &items {
        assert_eq!(item.kind, Some(CompletionItemKind::FILE));
        assert_eq!(item.detail.as_deref(), Some(atref_core::COMPLETION_DETAIL));
        let insert_text = item.insert_text.as_deref().unwrap_or_default();
        assert_eq!(item.label, format!("@{}", insert_text));
    }
    Some(items.into_iter().filter_map(|i| i.insert_text).collect())
}

async fn hover_markdown(backend: &Backend, uri: &Url, line: u32, character: u32) -> Option<(String, Option<Range>)> {
    let hover = backend
        .hover(HoverParams {
            text_document_position_params: position_params(uri, line, character),
            work_done_progress_params: Default::default(),
        })
        .await
        .unwrap()?;

    let HoverContents::Markup(content) = hover.contents else {
        panic!("expected markup hover");
    };
    assert_eq!(content.kind, MarkupKind::Markdown);
    Some((content.value, hover.range))
}

async fn document_links(backend: &Backend, uri: &Url) -> Option<Vec<DocumentLink>> {
    backend
        .document_link(DocumentLinkParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        })
        .await
        .unwrap()
}

async fn semantic_tokens(backend: &Backend, uri: &Url) -> Option<Vec<SemanticToken>> {
    let result = backend
        .semantic_tokens_full(SemanticTokensParams {
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        })
        .await
        .unwrap()?;

    let SemanticTokensResult::Tokens(tokens) = result else {
        panic!("expected full semantic tokens");
    };
    Some(tokens.data)
}

#[tokio::test]
async fn test_initialize_capabilities() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));

    let result = service
        .inner()
        .initialize(InitializeParams::default())
        .await
        .unwrap();
    let caps = result.capabilities;

    assert_eq!(
        caps.completion_provider.unwrap().trigger_characters,
        Some(vec!["@".to_string()])
    );
    assert!(caps.document_link_provider.is_some());
    assert!(caps.hover_provider.is_some());
    assert_eq!(
        caps.execute_command_provider.unwrap().commands,
        vec!["atref.openMentionFile".to_string(), "atref.copyFilePath".to_string()]
    );

    let Some(SemanticTokensServerCapabilities::SemanticTokensOptions(tokens)) =
        caps.semantic_tokens_provider
    else {
        panic!("expected semantic token options");
    };
    assert_eq!(tokens.legend.token_types, vec![SemanticTokenType::DECORATOR]);
    assert_eq!(result.server_info.unwrap().name, "atref");
}

#[tokio::test]
async fn test_completion_lists_workspace_files() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "see @\n").await;

    let paths = completion_paths(backend, &doc, 0, 5).await.unwrap();

    assert!(paths.contains(&"./a.txt".to_string()));
    assert!(paths.contains(&"../README.md".to_string()));
    assert!(paths.contains(&"../src/lib.rs".to_string()));
    // The document itself and denylisted directories are left out
    assert!(!paths.iter().any(|l| l.ends_with("notes.md")));
    assert!(!paths.iter().any(|l| l.contains("node_modules")));
    assert!(!paths.iter().any(|l| l.contains("build/")));
}

#[tokio::test]
async fn test_completion_needs_an_at_sign() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "no mention here\nsee @\n").await;

    assert!(completion_paths(backend, &doc, 0, 10).await.is_none());
    // The '@' after the cursor doesn't count
    assert!(completion_paths(backend, &doc, 1, 2).await.is_none());
    assert!(completion_paths(backend, &doc, 1, 5).await.is_some());
}

#[tokio::test]
async fn test_completion_for_unknown_document() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));

    let doc = uri(temp.path(), "docs/never-opened.md");
    assert!(completion_paths(service.inner(), &doc, 0, 0).await.is_none());
}

#[tokio::test]
async fn test_document_links_only_for_existing_files() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "é @a.txt\n@missing.md @../src/lib.rs\n").await;

    let links = document_links(backend, &doc).await.unwrap();
    assert_eq!(links.len(), 2);

    // 'é' is one UTF-16 unit
    assert_eq!(
        links[0].range,
        Range::new(Position::new(0, 2), Position::new(0, 8))
    );
    assert_eq!(links[0].target, Some(uri(temp.path(), "docs/a.txt")));
    assert_eq!(links[0].tooltip.as_deref(), Some("Open a.txt"));

    assert_eq!(
        links[1].range,
        Range::new(Position::new(1, 12), Position::new(1, 26))
    );
    assert_eq!(links[1].target, Some(uri(temp.path(), "src/lib.rs")));
}

#[tokio::test]
async fn test_semantic_tokens_are_delta_encoded() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(
        backend,
        &doc,
        "@a.txt and @../README.md\n@nope.txt\n  @../src/lib.rs\n",
    )
    .await;

    let data = semantic_tokens(backend, &doc).await.unwrap();
    let triples: Vec<(u32, u32, u32)> = data
        .iter()
        .map(|t| (t.delta_line, t.delta_start, t.length))
        .collect();

    assert_eq!(triples, vec![(0, 0, 6), (0, 11, 13), (2, 2, 14)]);
    assert!(data.iter().all(|t| t.token_type == 0));
}

#[tokio::test]
async fn test_hover_shows_preview() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "read @../src/lib.rs first\n").await;

    let (markdown, range) = hover_markdown(backend, &doc, 0, 10).await.unwrap();

    assert_eq!(range, Some(Range::new(Position::new(0, 5), Position::new(0, 19))));
    assert!(markdown.starts_with("**📄 lib.rs**"));
    assert!(markdown.contains("*src/lib.rs*"));
    assert!(markdown.contains("```rust\n"));
    assert!(markdown.contains(" 1 │ // line 1"));
    assert!(markdown.contains("15 │ // line 15"));
    assert!(!markdown.contains("// line 16"));
    assert!(markdown.contains("*... and 5 more lines*"));
    assert!(markdown.contains("command:atref.openMentionFile?"));
    assert!(markdown.contains("command:atref.copyFilePath?"));
}

#[tokio::test]
async fn test_hover_outside_mentions() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "plain text @missing.md\n").await;

    assert!(hover_markdown(backend, &doc, 0, 2).await.is_none());
    // Mentions of missing files get no preview
    assert!(hover_markdown(backend, &doc, 0, 14).await.is_none());
    // Past the end of the document
    assert!(hover_markdown(backend, &doc, 5, 0).await.is_none());
}

#[tokio::test]
async fn test_initialization_options_override_preview_lines() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    backend
        .initialize(InitializeParams {
            initialization_options: Some(json!({ "previewLines": 3 })),
            ..Default::default()
        })
        .await
        .unwrap();

    let doc = uri(temp.path(), "notes.md");
    open(backend, &doc, "@src/lib.rs\n").await;

    let (markdown, _) = hover_markdown(backend, &doc, 0, 3).await.unwrap();
    assert!(markdown.contains(" 3 │ // line 3"));
    assert!(!markdown.contains("// line 4"));
    assert!(markdown.contains("*... and 17 more lines*"));
}

#[tokio::test]
async fn test_client_workspace_folder_sets_root() {
    let temp = create_workspace();
    let other = tempfile::tempdir().unwrap();
    write(other.path(), "elsewhere.txt", "x\n");

    let options = BackendOptions {
        root_from_cli: false,
        ..BackendOptions::for_root(other.path())
    };
    let (service, _socket) = service(options);
    let backend = service.inner();

    backend
        .initialize(InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: Url::from_file_path(temp.path()).unwrap(),
                name: "workspace".to_string(),
            }]),
            ..Default::default()
        })
        .await
        .unwrap();

    let doc = uri(temp.path(), "notes.md");
    open(backend, &doc, "@").await;

    let paths = completion_paths(backend, &doc, 0, 1).await.unwrap();
    assert!(paths.contains(&"./README.md".to_string()));
    assert!(!paths.iter().any(|l| l.contains("elsewhere.txt")));
}

#[tokio::test]
async fn test_config_file_excludes() {
    let temp = create_workspace();
    write(
        temp.path(),
        ".config/atref/config.json",
        r#"{ "exclude": ["docs/**"] }"#,
    );
    let config = atref::config::load_config(temp.path(), None).unwrap();
    let options = BackendOptions {
        config,
        ..BackendOptions::for_root(temp.path())
    };
    let (service, _socket) = service(options);
    let backend = service.inner();

    let doc = uri(temp.path(), "notes.md");
    open(backend, &doc, "@").await;

    let paths = completion_paths(backend, &doc, 0, 1).await.unwrap();
    assert!(paths.contains(&"./src/lib.rs".to_string()));
    assert!(!paths.iter().any(|l| l.starts_with("./docs/")));
}

#[tokio::test]
async fn test_changes_and_close() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "@a.txt\n").await;
    assert_eq!(document_links(backend, &doc).await.unwrap().len(), 1);

    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: doc.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "nothing to see\n".to_string(),
            }],
        })
        .await;
    assert!(document_links(backend, &doc).await.unwrap().is_empty());

    backend
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: doc.clone() },
        })
        .await;
    assert!(document_links(backend, &doc).await.is_none());
}

#[tokio::test]
async fn test_file_created_after_open_is_picked_up() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "@later.md\n").await;
    assert!(semantic_tokens(backend, &doc).await.unwrap().is_empty());

    write(temp.path(), "docs/later.md", "now here\n");
    assert_eq!(semantic_tokens(backend, &doc).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_command_is_ignored() {
    let temp = create_workspace();
    let (service, _socket) = service(BackendOptions::for_root(temp.path()));

    let result = service
        .inner()
        .execute_command(ExecuteCommandParams {
            command: "atref.openMentionFile".to_string(),
            arguments: vec![],
            work_done_progress_params: Default::default(),
        })
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_relative_root_completion() {
    let temp = create_workspace();
    let cwd = std::env::current_dir().unwrap();
    let relative_root = atref_core::mention_path(temp.path(), &cwd);
    assert!(Path::new(&relative_root).is_relative());

    let (service, _socket) = service(BackendOptions::for_root(&relative_root));
    let backend = service.inner();

    let doc = uri(temp.path(), "docs/notes.md");
    open(backend, &doc, "see @\n").await;

    let paths = completion_paths(backend, &doc, 0, 5).await.unwrap();
    assert!(!paths.iter().any(|p| p.ends_with("notes.md")), "{:?}", paths);
    assert!(paths.contains(&"./a.txt".to_string()), "{:?}", paths);
    assert!(paths.contains(&"../README.md".to_string()), "{:?}", paths);
    assert!(paths.contains(&"../src/lib.rs".to_string()), "{:?}", paths);
}

/// Run the `initialize` request through the service, so the client may
/// send requests of its own.
async fn initialize(service: &mut LspService<Backend>) {
    let request = Request::build("initialize")
        .id(1)
        .params(json!({ "capabilities": {} }))
        .finish();
    let response = service.ready().await.unwrap().call(request).await.unwrap();
    assert!(response.is_some_and(|r| r.is_ok()));
}

fn open_command(from_path: &Path, filename: &str) -> ExecuteCommandParams {
    ExecuteCommandParams {
        command: "atref.openMentionFile".to_string(),
        arguments: vec![json!({
            "fromPath": from_path.to_string_lossy(),
            "filename": filename,
        })],
        work_done_progress_params: Default::default(),
    }
}

async fn next_message(socket: &mut ClientSocket) -> Request {
    socket.next().await.expect("client socket closed")
}

#[tokio::test]
async fn test_open_missing_file_reports_error() {
    let temp = create_workspace();
    let (service, mut socket) = service(BackendOptions::for_root(temp.path()));

    let result = service
        .inner()
        .execute_command(open_command(&temp.path().join("docs/notes.md"), "gone.md"))
        .await
        .unwrap();
    assert!(result.is_none());

    let message = next_message(&mut socket).await;
    assert_eq!(message.method(), "window/showMessage");
    let params: ShowMessageParams =
        serde_json::from_value(message.params().cloned().unwrap()).unwrap();
    assert_eq!(params.typ, MessageType::ERROR);
    assert_eq!(params.message, "Could not open: gone.md");

    assert!(socket.next().now_or_never().is_none(), "only one message");
}

#[tokio::test]
async fn test_open_existing_file_shows_document() {
    let temp = create_workspace();
    let (mut service, mut socket) = service(BackendOptions::for_root(temp.path()));
    initialize(&mut service).await;

    let params = open_command(&temp.path().join("docs/notes.md"), "../src/lib.rs");
    let command = service.inner().execute_command(params);
    let client = async {
        let request = next_message(&mut socket).await;
        assert_eq!(request.method(), "window/showDocument");
        let shown: ShowDocumentParams =
            serde_json::from_value(request.params().cloned().unwrap()).unwrap();
        let id = request.id().cloned().unwrap();
        socket
            .send(Response::from_ok(id, json!({ "success": true })))
            .await
            .unwrap();
        shown
    };

    let (result, shown) = tokio::join!(command, client);
    assert!(result.unwrap().is_none());
    assert_eq!(shown.uri, uri(temp.path(), "src/lib.rs"));
    assert_eq!(shown.take_focus, Some(true));

    // Success sends nothing else
    assert!(socket.next().now_or_never().is_none());
}

#[tokio::test]
async fn test_open_refused_by_client_reports_error() {
    let temp = create_workspace();
    let (mut service, mut socket) = service(BackendOptions::for_root(temp.path()));
    initialize(&mut service).await;

    let params = open_command(&temp.path().join("docs/notes.md"), "a.txt");
    let command = service.inner().execute_command(params);
    let client = async {
        let request = next_message(&mut socket).await;
        assert_eq!(request.method(), "window/showDocument");
        let id = request.id().cloned().unwrap();
        socket
            .send(Response::from_ok(id, json!({ "success": false })))
            .await
            .unwrap();
        next_message(&mut socket).await
    };

    let (result, message) = tokio::join!(command, client);
    assert!(result.unwrap().is_none());
    assert_eq!(message.method(), "window/showMessage");
    let params: ShowMessageParams =
        serde_json::from_value(message.params().cloned().unwrap()).unwrap();
    assert_eq!(params.typ, MessageType::ERROR);
    assert_eq!(params.message, "Could not open: a.txt");
}
