//! Unit tests for session options, manifests, identifiers and paths

use std::time::Duration;

use kodegen_figma_codegen::types::options::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};
use kodegen_figma_codegen::types::record::normalize_path;
use kodegen_figma_codegen::{
    CodegenError, ContinuationRequest, GenerationId, Manifest, PendingPartial, RecordShape,
    SessionId, SessionOptions, WireFormat, WireSchema,
};

#[test]
fn test_default_options() {
    let options = SessionOptions::default();
    assert_eq!(options.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(options.max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(options.retry_delay, DEFAULT_RETRY_DELAY);
    assert_eq!(options.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
    assert_eq!(options.wire_format, WireFormat::Auto);
    assert_eq!(options.schema, WireSchema::default());
    assert_eq!(options.idle_timeout, None);
}

#[test]
fn test_builder_sets_fields() {
    let options = SessionOptions::builder()
        .output_root("out")
        .wire_format(WireFormat::Tagged)
        .schema(WireSchema::legacy())
        .max_attempts(5)
        .max_retries(1)
        .retry_delay(Duration::from_millis(10))
        .idle_timeout(Duration::from_secs(30))
        .max_buffer_size(1024)
        .build()
        .unwrap();

    assert_eq!(options.output_root, std::path::PathBuf::from("out"));
    assert_eq!(options.wire_format, WireFormat::Tagged);
    assert_eq!(options.schema.name_key, "aFileName");
    assert_eq!(options.max_attempts, 5);
    assert_eq!(options.max_retries, 1);
    assert_eq!(options.retry_delay, Duration::from_millis(10));
    assert_eq!(options.idle_timeout, Some(Duration::from_secs(30)));
    assert_eq!(options.max_buffer_size, 1024);
}

#[test]
fn test_builder_validation() {
    let invalid = [
        SessionOptions::builder().schema(WireSchema::new("", "fileContent")),
        SessionOptions::builder().schema(WireSchema::new("file", "file")),
        SessionOptions::builder().max_buffer_size(0),
        SessionOptions::builder().idle_timeout(Duration::ZERO),
    ];

    for builder in invalid {
        assert!(matches!(builder.build(), Err(CodegenError::InvalidConfig(_))));
    }
}

#[test]
fn test_wire_format_from_str() {
    assert_eq!("auto".parse::<WireFormat>().unwrap(), WireFormat::Auto);
    assert_eq!("json".parse::<WireFormat>().unwrap(), WireFormat::JsonArray);
    assert_eq!("JSON-ARRAY".parse::<WireFormat>().unwrap(), WireFormat::JsonArray);
    assert_eq!("tagged".parse::<WireFormat>().unwrap(), WireFormat::Tagged);
    assert!("yaml".parse::<WireFormat>().is_err());
}

#[test]
fn test_normalize_path() {
    for raw in ["src/a.ts", "/src/a.ts", "./src/a.ts", "src//a.ts", "src\\a.ts", " src/./a.ts "] {
        assert_eq!(normalize_path(raw).unwrap(), "src/a.ts", "raw path {raw:?}");
    }
    for raw in ["", "/", ".", "../a.ts", "src/../../a.ts"] {
        assert!(
            matches!(normalize_path(raw), Err(CodegenError::InvalidPath(_))),
            "raw path {raw:?}"
        );
    }
}

#[tokio::test]
async fn test_manifest_load_and_normalize() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, r#"{"remainingFiles":["./src/a.ts","src\\b.ts","src/a.ts"]}"#).unwrap();

    let manifest = Manifest::load(&path).await.unwrap();
    assert_eq!(manifest.remaining_files.len(), 3);

    let required = manifest.normalized().unwrap();
    assert_eq!(
        required.into_iter().collect::<Vec<_>>(),
        vec!["src/a.ts".to_string(), "src/b.ts".to_string()]
    );

    assert_eq!(
        serde_json::to_value(&manifest).unwrap()["remainingFiles"][0],
        "./src/a.ts"
    );
}

#[tokio::test]
async fn test_manifest_load_rejects_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(matches!(
        Manifest::load(&path).await,
        Err(CodegenError::JsonDecode(_))
    ));
    assert!(matches!(
        Manifest::load(dir.path().join("missing.json")).await,
        Err(CodegenError::Io(_))
    ));
}

#[test]
fn test_identifiers() {
    let a = SessionId::generate();
    let b = SessionId::default();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);

    let id = GenerationId::from("gen-42");
    assert_eq!(id.as_str(), "gen-42");
    assert_eq!(id.to_string(), "gen-42");
}

#[test]
fn test_continuation_request_message() {
    let request = ContinuationRequest {
        completed_files: vec!["a.ts".to_string()],
        outstanding_files: vec!["c.ts".to_string()],
        pending_partial: Some(PendingPartial {
            file_name: Some("b.ts".to_string()),
            raw_content: r"const b = é;\n".to_string(),
            raw_record: r#"{"fileName":"b.ts","fileContent":"const b = é;\n"#.to_string(),
            shape: RecordShape::Json,
        }),
    };

    let message = request.to_message();
    assert!(message.contains("Do not repeat"));
    assert!(message.contains("Files already generated: a.ts"));
    assert!(message.contains("Files still missing: c.ts"));
    assert!(message.contains("The interrupted file was: b.ts"));
    assert!(message.contains("const b = \u{e9};\n"));

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["completedFiles"][0], "a.ts");
    assert_eq!(json["outstandingFiles"][0], "c.ts");
    assert_eq!(json["pendingPartial"]["fileName"], "b.ts");
    assert_eq!(json["pendingPartial"]["rawContent"], r"const b = é;\n");
    assert!(json["pendingPartial"].get("file_name").is_none());
}

#[test]
fn test_continuation_message_carries_the_whole_partial() {
    let body = "x".repeat(5000);
    let raw_content = format!(r"HEAD\n{body}\nTAIL");
    let request = ContinuationRequest {
        completed_files: Vec::new(),
        outstanding_files: Vec::new(),
        pending_partial: Some(PendingPartial {
            file_name: Some("big.ts".to_string()),
            raw_record: format!(r#"{{"fileName":"big.ts","fileContent":"{raw_content}"#),
            raw_content,
            shape: RecordShape::Json,
        }),
    };

    let message = request.to_message();
    assert!(message.contains(&format!("HEAD\n{body}\nTAIL")));
    assert!(message.contains("The interrupted file was: big.ts"));
}

#[test]
fn test_continuation_message_for_unnamed_partial() {
    let request = ContinuationRequest {
        completed_files: Vec::new(),
        outstanding_files: Vec::new(),
        pending_partial: Some(PendingPartial {
            file_name: None,
            raw_content: String::new(),
            raw_record: "<FileName=src/".to_string(),
            shape: RecordShape::Tagged,
        }),
    };

    assert!(request.to_message().contains("before the next file name was complete"));
}
