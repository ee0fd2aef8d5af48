//! End-to-end flows through `ChatApp` against a mocked document backend.

use client_lib::adapters::{HttpBackend, MemoryStore, SqliteStore};
use client_lib::app::{ChatApp, LocalFile, NoticeKind, PageMode, QueryOutcome, Settings};
use docchat_core::domain::{
    Message, QueryResponse, QueryType, Role, Source, SourceType, Thread, ThreadSnapshot,
};
use docchat_core::ports::SnapshotStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> Settings {
    Settings {
        progress_tick: Duration::from_millis(5),
        typing_delay: Duration::ZERO,
        notice_ttl: Duration::from_secs(60),
        history_window: 10,
    }
}

fn app_with(server: &MockServer, store: Arc<dyn SnapshotStore>) -> ChatApp {
    ChatApp::new(settings(), Arc::new(HttpBackend::new(server.uri())), store)
}

async fn mount_upload(server: &MockServer, file_id: &str, filename: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains(format!("filename=\"{}\"", filename)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": file_id,
            "filename": filename,
            "pages": 12,
            "chunks_indexed": 40,
            "type": "pdf",
            "recommended_actions": ["summarize", "quiz"]
        })))
        .mount(server)
        .await;
}

fn pdf(name: &str) -> LocalFile {
    LocalFile::new(name, b"%PDF-1.7 test".to_vec())
}

fn texts(app: &ChatApp) -> Vec<String> {
    app.messages().iter().map(|m| m.text.clone()).collect()
}

#[tokio::test]
async fn uploading_a_document_enables_it_and_titles_a_new_thread() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "manual.pdf").await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));

    assert!(app.upload_file(pdf("manual.pdf")).await);

    assert_eq!(app.sources().len(), 1);
    assert!(app.sources()[0].enabled);
    assert!(app.use_rag());
    assert_eq!(app.target().map(|t| t.file_id.as_str()), Some("doc-1"));
    assert_eq!(app.page_mode(), PageMode::DocumentUploaded { retrieval: true });
    assert_eq!(app.threads().len(), 1);
    assert_eq!(app.threads()[0].title, "manual");
    assert_eq!(app.recommended_actions(), ["summarize", "quiz"]);
    assert_eq!(app.upload_progress(), 100);

    let last = app.messages().last().unwrap();
    assert_eq!(last.role, Role::System);
    assert!(last.text.contains("manual.pdf"));
    assert!(app
        .notices()
        .iter()
        .any(|n| n.kind == NoticeKind::Success));
}

#[tokio::test]
async fn unsupported_files_never_reach_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));

    assert!(!app.upload_file(LocalFile::new("notes.docx", b"PK".to_vec())).await);
    assert!(app.sources().is_empty());
    assert_eq!(app.page_mode(), PageMode::NoDocument);
    assert_eq!(app.notices().last().unwrap().kind, NoticeKind::Error);
}

#[tokio::test]
async fn document_query_without_a_document_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));
    let before = texts(&app);

    let outcome = app
        .submit_query("What is chapter 2 about?", QueryType::Freeform, true)
        .await;

    assert_eq!(outcome, QueryOutcome::Rejected);
    assert_eq!(texts(&app), before);
    assert!(app.threads().is_empty());
    assert!(!app.is_typing());
}

#[tokio::test]
async fn server_error_keeps_only_the_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));
    let before = app.messages().len();

    let outcome = app.send_message("hello there").await;

    assert_eq!(outcome, QueryOutcome::Failed);
    assert_eq!(app.messages().len(), before + 1);
    let last = app.messages().last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.text, "hello there");
    assert!(!app.is_typing());
    assert!(app.notices().iter().any(|n| n.kind == NoticeKind::Error
        && n.text == "Server unavailable. Please try again later."));
    // The first message of an untitled session names the thread.
    assert_eq!(app.threads()[0].title, "hello there");
}

#[tokio::test]
async fn deleting_the_target_turns_document_mode_off() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "manual.pdf").await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));
    assert!(app.upload_file(pdf("manual.pdf")).await);

    app.delete_source("doc-1").await.unwrap();

    assert_eq!(app.page_mode(), PageMode::NoDocument);
    assert!(app.recommended_actions().is_empty());
    let outcome = app
        .submit_query("Summarize it", QueryType::Summarize, true)
        .await;
    assert_eq!(outcome, QueryOutcome::Rejected);
}

#[tokio::test]
async fn disabled_target_falls_back_to_another_enabled_source() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "a.pdf").await;
    mount_upload(&server, "doc-2", "b.pdf").await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .and(body_partial_json(json!({
            "file_id": "doc-1",
            "filename": "a.pdf",
            "use_rag": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "From a.pdf.",
            "sources": [{"file": "a.pdf", "page": "?"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));
    assert!(app.upload_file(pdf("a.pdf")).await);
    assert!(app.upload_file(pdf("b.pdf")).await);
    assert_eq!(app.target().map(|t| t.file_id.as_str()), Some("doc-2"));

    app.set_all_sources(true).await;
    assert!(!app.toggle_source("doc-2").await.unwrap());

    let outcome = app.send_message("Which file is this?").await;

    assert_eq!(outcome, QueryOutcome::Answered);
    let reply = app.messages().last().unwrap();
    assert_eq!(reply.text, "From a.pdf.");
    assert_eq!(reply.citations[0].page, None);
}

#[tokio::test]
async fn select_all_switches_retrieval_on() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "manual.pdf").await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));
    assert!(app.upload_file(pdf("manual.pdf")).await);

    app.set_retrieval(false);
    app.set_all_sources(true).await;

    assert!(app.use_rag());
}

#[tokio::test]
async fn switching_threads_restores_each_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "Paris."})))
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));

    let first = app.new_thread().await;
    assert_eq!(app.send_message("Capital of France?").await, QueryOutcome::Answered);
    let first_transcript = texts(&app);

    let second = app.new_thread().await;
    assert_eq!(app.messages().len(), 2);
    assert_eq!(app.active_thread().map(|t| t.id), Some(second));

    app.select_thread(first).await.unwrap();
    assert_eq!(texts(&app), first_transcript);
    assert_eq!(app.messages().last().unwrap().text, "Paris.");
}

#[tokio::test]
async fn late_reply_goes_to_the_thread_that_asked() {
    let server = MockServer::start().await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));

    let asking = app.new_thread().await;
    let pending = app
        .begin_query("Slow question", QueryType::Freeform, false)
        .await
        .unwrap();
    assert!(app.is_typing());

    let other = app.new_thread().await;
    assert!(!app.is_typing());

    let outcome = app
        .complete_query(
            pending,
            Ok(QueryResponse {
                answer: "Slow answer".to_string(),
                sources: None,
            }),
        )
        .await;

    assert_eq!(outcome, QueryOutcome::Redirected(asking));
    assert_eq!(app.active_thread().map(|t| t.id), Some(other));
    assert!(!texts(&app).contains(&"Slow answer".to_string()));

    app.select_thread(asking).await.unwrap();
    let transcript = texts(&app);
    assert_eq!(transcript[transcript.len() - 2], "Slow question");
    assert_eq!(transcript[transcript.len() - 1], "Slow answer");
}

#[tokio::test]
async fn reply_for_a_deleted_thread_is_discarded() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let mut app = app_with(&server, store.clone());

    let asking = app.new_thread().await;
    let pending = app
        .begin_query("Anyone there?", QueryType::Freeform, false)
        .await
        .unwrap();
    app.new_thread().await;
    app.delete_thread(asking).await.unwrap();

    let outcome = app
        .complete_query(
            pending,
            Ok(QueryResponse {
                answer: "Too late".to_string(),
                sources: None,
            }),
        )
        .await;

    assert_eq!(outcome, QueryOutcome::Discarded);
    assert_eq!(store.load_snapshot(asking).await.unwrap(), None);
    assert_eq!(store.snapshot_count().await, 1);
}

#[tokio::test]
async fn restart_restores_threads_transcript_and_sources() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "manual.pdf").await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Chapter 2 covers installation.",
            "sources": [{"file": "manual.pdf", "page": 4}]
        })))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    store.run_migrations().await.unwrap();

    let mut app = app_with(&server, store.clone());
    assert!(app.upload_file(pdf("manual.pdf")).await);
    assert_eq!(
        app.send_message("What does chapter 2 cover?").await,
        QueryOutcome::Answered
    );
    let thread_id = app.active_thread().unwrap().id;
    let transcript = texts(&app);
    drop(app);

    let restored = ChatApp::restore(
        settings(),
        Arc::new(HttpBackend::new(server.uri())),
        store.clone(),
    )
    .await
    .unwrap();

    assert_eq!(restored.active_thread().map(|t| t.id), Some(thread_id));
    assert_eq!(restored.threads()[0].title, "manual");
    assert_eq!(texts(&restored), transcript);
    assert_eq!(restored.sources().len(), 1);
    assert_eq!(restored.target().map(|t| t.file_id.as_str()), Some("doc-1"));
    assert!(restored.use_rag());
    // Previews come from local bytes and do not survive a restart.
    assert!(restored.preview().is_none());
    assert_eq!(
        restored.messages().last().unwrap().citations[0].label(),
        "manual.pdf (p. 4)"
    );
}

#[tokio::test]
async fn health_probe_reports_through_notices() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    let mut app = app_with(&server, Arc::new(MemoryStore::new()));

    assert!(app.check_health().await);
    assert_eq!(app.notices().last().unwrap().kind, NoticeKind::Success);
}

#[tokio::test]
async fn document_uploaded_in_another_thread_survives_a_restart() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "manual.pdf").await;
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    store.run_migrations().await.unwrap();

    let mut app = app_with(&server, store.clone());
    let first = app.new_thread().await;
    let second = app.new_thread().await;
    assert!(app.upload_file(pdf("manual.pdf")).await);
    app.select_thread(first).await.unwrap();
    assert_eq!(app.sources().len(), 1);
    drop(app);

    let mut restored = ChatApp::restore(
        settings(),
        Arc::new(HttpBackend::new(server.uri())),
        store.clone(),
    )
    .await
    .unwrap();

    assert_eq!(restored.active_thread().map(|t| t.id), Some(first));
    assert_eq!(restored.sources().len(), 1);
    assert_eq!(restored.target().map(|t| t.file_id.as_str()), Some("doc-1"));
    assert_eq!(
        restored.page_mode(),
        PageMode::DocumentUploaded { retrieval: true }
    );

    restored.select_thread(second).await.unwrap();
    assert_eq!(restored.sources().len(), 1);
    assert!(restored.sources()[0].enabled);
}

#[tokio::test]
async fn each_thread_keeps_its_own_enable_flags() {
    let server = MockServer::start().await;
    mount_upload(&server, "doc-1", "manual.pdf").await;
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    store.run_migrations().await.unwrap();
    let mut app = app_with(&server, store.clone());

    assert!(app.upload_file(pdf("manual.pdf")).await);
    let first = app.active_thread().unwrap().id;
    let second = app.new_thread().await;
    assert!(!app.toggle_source("doc-1").await.unwrap());

    app.select_thread(first).await.unwrap();
    assert!(app.sources()[0].enabled);

    app.select_thread(second).await.unwrap();
    assert!(!app.sources()[0].enabled);

    app.select_thread(first).await.unwrap();
    assert!(app.sources()[0].enabled);

    // The thread that was active last decides the flags after a restart.
    app.select_thread(second).await.unwrap();
    drop(app);
    let restored = ChatApp::restore(
        settings(),
        Arc::new(HttpBackend::new(server.uri())),
        store.clone(),
    )
    .await
    .unwrap();
    assert_eq!(restored.active_thread().map(|t| t.id), Some(second));
    assert!(!restored.sources()[0].enabled);
}

#[tokio::test]
async fn deleting_the_active_thread_moves_to_the_next_or_resets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "Paris."})))
        .mount(&server)
        .await;
    let store = Arc::new(MemoryStore::new());
    let mut app = app_with(&server, store.clone());

    let first = app.new_thread().await;
    assert_eq!(app.send_message("Capital of France?").await, QueryOutcome::Answered);
    let first_transcript = texts(&app);
    let second = app.new_thread().await;

    app.delete_thread(second).await.unwrap();

    assert_eq!(app.active_thread().map(|t| t.id), Some(first));
    assert_eq!(texts(&app), first_transcript);
    assert_eq!(store.load_active_thread().await.unwrap(), Some(first));
    assert_eq!(store.load_threads().await.unwrap().len(), 1);

    app.delete_thread(first).await.unwrap();

    assert!(app.active_thread().is_none());
    assert!(app.threads().is_empty());
    assert_eq!(app.messages().len(), 2);
    assert_eq!(app.messages()[0].text, "New conversation started.");
    assert_eq!(app.messages()[1].role, Role::Bot);
    assert_eq!(store.load_active_thread().await.unwrap(), None);
    assert_eq!(store.snapshot_count().await, 0);
}

#[tokio::test]
async fn snapshot_sources_seed_an_empty_shared_list() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let now = chrono::Utc::now();
    let thread = Thread {
        id: uuid::Uuid::new_v4(),
        title: "manual".to_string(),
        icon: "📄".to_string(),
        created_at: now,
        updated_at: now,
    };
    let source = Source {
        file_id: "doc-1".to_string(),
        filename: "manual.pdf".to_string(),
        pages: 12,
        chunks: 40,
        source_type: SourceType::Pdf,
        uploaded_at: now,
        enabled: true,
    };
    store.save_threads(&[thread.clone()]).await.unwrap();
    store.save_active_thread(Some(thread.id)).await.unwrap();
    store
        .save_snapshot(
            thread.id,
            &ThreadSnapshot {
                messages: vec![Message::user("hi")],
                sources: vec![source],
            },
        )
        .await
        .unwrap();

    let restored = ChatApp::restore(
        settings(),
        Arc::new(HttpBackend::new(server.uri())),
        store.clone(),
    )
    .await
    .unwrap();

    assert_eq!(restored.sources().len(), 1);
    assert_eq!(restored.target().map(|t| t.file_id.as_str()), Some("doc-1"));
    assert_eq!(texts(&restored), vec!["hi".to_string()]);
}
