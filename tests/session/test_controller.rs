//! Integration tests for `ContinuationController`
//!
//! Tests the continuation and retry loop end to end against the scripted
//! backend

use std::time::Duration;

use kodegen_figma_codegen::{
    BackendCall, CodegenError, ContinuationController, ControllerState, GenerationSession,
    Manifest, MemoryMaterializer, ScriptedBackend, ScriptedChunk, ScriptedRound, SessionEvent,
    SessionOptions, generate,
};
use tokio_util::sync::CancellationToken;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn options() -> SessionOptions {
    SessionOptions::builder()
        .retry_delay(Duration::ZERO)
        .build()
        .unwrap()
}

fn count_calls(backend: &ScriptedBackend) -> (usize, usize) {
    let calls = backend.calls();
    let opens = calls
        .iter()
        .filter(|call| matches!(call, BackendCall::Open(_)))
        .count();
    (opens, calls.len() - opens)
}

#[tokio::test]
async fn test_single_round_completes() {
    init_logger();
    let backend = ScriptedBackend::new([ScriptedRound::chunks([
        r#"[{"fileName":"src/a.ts","fileCon"#,
        r#"tent":"export const a = 1;"}]"#,
    ])]);
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options());
    let mut controller = ContinuationController::new(backend.clone(), explorer.clone());
    assert_eq!(controller.state(), ControllerState::Idle);

    let report = controller.run(&mut session).await.unwrap();

    assert_eq!(controller.state(), ControllerState::Complete);
    assert_eq!(report.completed_files, vec!["src/a.ts".to_string()]);
    assert_eq!(report.rounds, 1);
    assert_eq!(explorer.get("src/a.ts").as_deref(), Some("export const a = 1;"));
    assert_eq!(count_calls(&backend), (1, 0));
}

#[tokio::test]
async fn test_truncation_recovered_by_continuation() {
    init_logger();
    let original = "line1\nline2 \"quoted\"\nline3";
    let payload = r#"[{"fileName":"a.ts","fileContent":"line1\nline2 \"quoted\"\nline3"},{"fileName":"b.ts","fileContent":"b"}]"#;
    let cut = payload.find("line3").unwrap();

    let backend = ScriptedBackend::new([
        ScriptedRound::split(&payload[..cut], 5),
        ScriptedRound::split(&payload[cut..], 3),
    ]);
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options());

    let report = ContinuationController::new(backend.clone(), explorer.clone())
        .run(&mut session)
        .await
        .unwrap();

    assert_eq!(explorer.get("a.ts").as_deref(), Some(original));
    assert_eq!(explorer.get("b.ts").as_deref(), Some("b"));
    assert_eq!(report.rounds, 2);

    let requests = backend.continuation_requests();
    assert_eq!(requests.len(), 1);
    let partial = requests[0].pending_partial.as_ref().unwrap();
    assert_eq!(partial.file_name.as_deref(), Some("a.ts"));
    assert_eq!(partial.decoded_content(), "line1\nline2 \"quoted\"\n");
    assert!(requests[0].completed_files.is_empty());

    let message = requests[0].to_message();
    assert!(message.contains("a.ts"));
    assert!(message.contains("line2 \"quoted\""));
}

#[tokio::test]
async fn test_malformed_continuation_is_continued_again() {
    init_logger();
    let backend = ScriptedBackend::new([
        ScriptedRound::chunks([
            r#"[{"fileName":"b.ts","fileContent":"b"},{"fileName":"a.ts","fileContent":"line1"#,
        ]),
        // Raw newline inside the string: the resumed record does not parse
        ScriptedRound::chunks(["\nline2\"}]"]),
        ScriptedRound::chunks([r#"\nline2"}]"#]),
    ]);
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options());

    let report = ContinuationController::new(backend.clone(), explorer.clone())
        .run(&mut session)
        .await
        .unwrap();

    assert_eq!(explorer.get("a.ts").as_deref(), Some("line1\nline2"));
    assert_eq!(explorer.get("b.ts").as_deref(), Some("b"));
    assert_eq!(report.rounds, 3);
    assert_eq!(report.malformed, 2);

    let requests = backend.continuation_requests();
    assert_eq!(requests.len(), 2);
    let partial = requests[1].pending_partial.as_ref().unwrap();
    assert_eq!(partial.file_name.as_deref(), Some("a.ts"));
    assert_eq!(partial.decoded_content(), "line1");
}

#[tokio::test]
async fn test_large_file_in_small_chunks() {
    init_logger();
    let content = "abcdefghij\n".repeat(400_000);
    let payload = format!(
        r#"[{{"fileName":"big.txt","fileContent":{}}}]"#,
        serde_json::to_string(&content).unwrap()
    );
    let cut = payload.len() / 2;

    let backend = ScriptedBackend::new([
        ScriptedRound::split(&payload[..cut], 1024),
        ScriptedRound::split(&payload[cut..], 1024),
    ]);
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options());
    let mut controller = ContinuationController::new(backend.clone(), explorer.clone());

    let report = tokio::time::timeout(Duration::from_secs(30), controller.run(&mut session))
        .await
        .expect("streaming a large file should not slow down per chunk")
        .unwrap();

    assert_eq!(report.rounds, 2);
    assert_eq!(explorer.get("big.txt").as_deref(), Some(content.as_str()));

    let requests = backend.continuation_requests();
    let partial = requests[0].pending_partial.as_ref().unwrap();
    assert_eq!(partial.file_name.as_deref(), Some("big.txt"));
    assert!(content.starts_with(&partial.decoded_content()));
    assert!(partial.decoded_content().len() > content.len() / 3);
}

#[tokio::test]
async fn test_continuation_restarting_from_scratch() {
    init_logger();
    let backend = ScriptedBackend::new([
        ScriptedRound::chunks([r#"[{"fileName":"a.ts","fileContent":"a"},{"fileName":"b.ts","fileContent":"trunc"#]),
        ScriptedRound::chunks([
            "```json\n",
            r#"[{"fileName":"a.ts","fileContent":"a"},{"fileName":"b.ts","fileContent":"full"}]"#,
            "\n```",
        ]),
    ]);
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options());

    ContinuationController::new(backend.clone(), explorer.clone())
        .run(&mut session)
        .await
        .unwrap();

    assert_eq!(explorer.get("b.ts").as_deref(), Some("full"));
    assert_eq!(explorer.write_count("a.ts"), 1);
    assert_eq!(explorer.write_count("b.ts"), 1);

    let requests = backend.continuation_requests();
    assert_eq!(requests[0].completed_files, vec!["a.ts".to_string()]);
}

#[tokio::test]
async fn test_manifest_gates_completion() {
    init_logger();
    let backend = ScriptedBackend::new([
        ScriptedRound::chunks([r#"[{"fileName":"a.ts","fileContent":"a"}]"#]),
        ScriptedRound::chunks([r#"[{"fileName":"b.ts","fileContent":"b"}]"#]),
    ]);
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options())
        .with_manifest(&Manifest::new(["a.ts", "b.ts"]))
        .unwrap();

    let report = ContinuationController::new(backend.clone(), explorer.clone())
        .run(&mut session)
        .await
        .unwrap();

    assert_eq!(report.completed_files, vec!["a.ts".to_string(), "b.ts".to_string()]);
    assert!(report.outstanding_files.is_empty());

    let requests = backend.continuation_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].completed_files, vec!["a.ts".to_string()]);
    assert_eq!(requests[0].outstanding_files, vec!["b.ts".to_string()]);
}

#[tokio::test]
async fn test_max_attempts_ceiling() {
    init_logger();
    let backend = ScriptedBackend::new([ScriptedRound::chunks([
        r#"[{"fileName":"a.ts","fileContent":"a"}]"#,
    ])])
    .with_fallback(ScriptedRound::chunks([
        r#"[{"fileName":"a.ts","fileContent":"again"},{"fileName":7}]"#,
    ]));
    let explorer = MemoryMaterializer::new();
    let mut session = GenerationSession::new("gen-1", options())
        .with_manifest(&Manifest::new(["a.ts", "b.ts"]))
        .unwrap();
    let mut controller = ContinuationController::new(backend.clone(), explorer.clone());

    let err = controller.run(&mut session).await.unwrap_err();

    match err {
        CodegenError::MaxAttemptsExceeded {
            attempts,
            completed,
            outstanding,
            malformed,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(completed, 1);
            assert_eq!(outstanding, vec!["b.ts".to_string()]);
            assert_eq!(malformed, 3);
            assert!(last_error.is_none());
        }
        other => panic!("expected max attempts exceeded, got {other:?}"),
    }
    assert_eq!(controller.state(), ControllerState::Failed);
    assert_eq!(count_calls(&backend), (1, 3));
    assert_eq!(explorer.write_count("a.ts"), 1);
    assert_eq!(explorer.get("a.ts").as_deref(), Some("a"));
}

#[tokio::test]
async fn test_transport_retry_ceiling() {
    init_logger();
    let backend =
        ScriptedBackend::default().with_fallback(ScriptedRound::Reject("connection reset".into()));
    let options = SessionOptions::builder()
        .max_retries(2)
        .retry_delay(Duration::ZERO)
        .build()
        .unwrap();
    let mut session = GenerationSession::new("gen-1", options);

    let err = ContinuationController::new(backend.clone(), MemoryMaterializer::new())
        .run(&mut session)
        .await
        .unwrap_err();

    match err {
        CodegenError::MaxAttemptsExceeded {
            attempts,
            retries,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 0);
            assert_eq!(retries, 2);
            assert!(last_error.unwrap().contains("connection reset"));
        }
        other => panic!("expected max attempts exceeded, got {other:?}"),
    }
    assert_eq!(count_calls(&backend), (3, 0));
}

#[tokio::test]
async fn test_mid_stream_failure_reissues_round() {
    init_logger();
    let full = r#"[{"fileName":"a.ts","fileContent":"a"},{"fileName":"b.ts","fileContent":"b"}]"#;
    let backend = ScriptedBackend::new([
        ScriptedRound::chunks([r#"[{"fileName":"a.ts","fileContent":"a"},"#])
            .then(ScriptedChunk::Error("stream reset".into())),
        ScriptedRound::split(full, 4),
    ]);
    let explorer = MemoryMaterializer::new();
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = GenerationSession::new("gen-1", options()).with_events(events_tx);

    let report = ContinuationController::new(backend.clone(), explorer.clone())
        .run(&mut session)
        .await
        .unwrap();

    assert_eq!(report.completed_files, vec!["a.ts".to_string(), "b.ts".to_string()]);
    assert_eq!(report.retries, 1);
    assert_eq!(report.rounds, 1);
    assert_eq!(explorer.write_count("a.ts"), 1);
    assert_eq!(count_calls(&backend), (2, 0));

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.first(), Some(&SessionEvent::RoundStarted { round: 0 }));
    assert!(events.contains(&SessionEvent::TransportRetry {
        retry: 1,
        error: "Transport error: stream reset".to_string(),
    }));
    assert!(events.contains(&SessionEvent::FileSkipped {
        path: "a.ts".to_string(),
    }));
}

#[tokio::test]
async fn test_stalled_round_is_continued() {
    init_logger();
    let backend = ScriptedBackend::new([
        ScriptedRound::chunks([r#"[{"fileName":"a.ts","fileContent":"a"}"#])
            .then(ScriptedChunk::Stall),
        ScriptedRound::chunks(["[]"]),
    ]);
    let options = SessionOptions::builder()
        .retry_delay(Duration::ZERO)
        .idle_timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let mut session = GenerationSession::new("gen-1", options);

    let report = ContinuationController::new(backend.clone(), MemoryMaterializer::new())
        .run(&mut session)
        .await
        .unwrap();

    assert_eq!(report.rounds, 2);
    assert_eq!(count_calls(&backend), (1, 1));
}

#[tokio::test]
async fn test_cancellation_aborts_session() {
    init_logger();
    let backend = ScriptedBackend::new([ScriptedRound::chunks([
        r#"[{"fileName":"a.ts","fileContent":"a"},"#,
    ])
    .then(ScriptedChunk::Stall)]);
    let explorer = MemoryMaterializer::new();
    let cancel = CancellationToken::new();
    let mut session =
        GenerationSession::new("gen-1", options()).with_cancellation(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = ContinuationController::new(backend, explorer.clone())
        .run(&mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, CodegenError::Aborted { completed: 1 }));
    assert_eq!(explorer.get("a.ts").as_deref(), Some("a"));
}

#[tokio::test]
async fn test_filesystem_error_is_fatal() {
    init_logger();
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let backend = ScriptedBackend::new([ScriptedRound::chunks([
        r#"[{"fileName":"src/a.ts","fileContent":"a"}]"#,
    ])]);
    let options = SessionOptions::builder()
        .output_root(blocker.path())
        .retry_delay(Duration::ZERO)
        .build()
        .unwrap();

    let err = generate(backend.clone(), "gen-1", options, None)
        .await
        .unwrap_err();

    assert!(matches!(err, CodegenError::Filesystem { ref path, .. } if path == "src/a.ts"));
    assert_eq!(count_calls(&backend), (1, 0));
}

#[tokio::test]
async fn test_generate_writes_to_disk() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new([ScriptedRound::split(
        "<FileName=src/index.ts>export * from './a';\n</FileName><FileName=src/a.ts>export const a = 1;\n</FileName>",
        7,
    )]);
    let options = SessionOptions::builder()
        .output_root(dir.path())
        .build()
        .unwrap();
    let manifest = Manifest::new(["src/index.ts", "src/a.ts"]);

    let report = generate(backend, "gen-1", options, Some(&manifest))
        .await
        .unwrap();

    assert_eq!(report.completed_files.len(), 2);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src").join("a.ts")).unwrap(),
        "export const a = 1;\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src").join("index.ts")).unwrap(),
        "export * from './a';\n"
    );
}
