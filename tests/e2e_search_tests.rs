//! End-to-end tests for the search SSE endpoint.

mod common;

use common::{parse_sse_frames, web_document, StubGenerator, StubRetriever, TestClient, TestServer};

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn test_search_rejects_missing_query() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![],
            fail: false,
        },
        StubGenerator {
            fragments: vec![],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("", &["web"]).await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("'q'"));
}

#[tokio::test]
async fn test_search_rejects_missing_corpus() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![],
            fail: false,
        },
        StubGenerator {
            fragments: vec![],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("anything", &[]).await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("corpus"));
}

#[tokio::test]
async fn test_search_rejects_unknown_corpus() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![],
            fail: false,
        },
        StubGenerator {
            fragments: vec![],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("anything", &["archive"]).await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("archive"));
}

#[tokio::test]
async fn test_search_rejects_unregistered_corpus() {
    // "personal" parses but has no retrievers registered in this server.
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![],
            fail: false,
        },
        StubGenerator {
            fragments: vec![],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("anything", &["personal"]).await;
    assert_eq!(response.status(), 400);
}

// ============================================================================
// Streaming Tests
// ============================================================================

#[tokio::test]
async fn test_search_streams_reference_content_and_done() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![web_document("rust", "https://rust-lang.org")],
            fail: false,
        },
        StubGenerator {
            fragments: vec!["Rust is fast <cited>0</cited>".to_string()],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("what is rust", &["web"]).await;
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let body = response.text().await.unwrap();
    let frames = parse_sse_frames(&body);

    assert_eq!(frames[0]["type"], "documentsreference");
    assert_eq!(frames[0]["data"][0]["title"], "rust");
    assert_eq!(frames[1]["type"], "text");
    assert_eq!(frames[1]["data"], "Rust is fast ");
    assert_eq!(frames[2]["type"], "citation");
    assert_eq!(frames[2]["data"], 0);
    assert_eq!(frames.last().unwrap()["type"], "done");
    assert_eq!(frames.last().unwrap()["data"], "DONE");
}

#[tokio::test]
async fn test_search_streams_code_block_verbatim() {
    let code = "```go\nfmt.Println(1)\n```";
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![web_document("go", "https://go.dev")],
            fail: false,
        },
        StubGenerator {
            fragments: vec![format!("example: {}", code)],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("print in go", &["web"]).await;
    let body = response.text().await.unwrap();
    let frames = parse_sse_frames(&body);

    let code_frame = frames
        .iter()
        .find(|f| f["type"] == "codeblock")
        .expect("no codeblock frame");
    assert_eq!(code_frame["data"], code);
}

#[tokio::test]
async fn test_marker_split_across_fragments_yields_one_citation() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![web_document("doc", "https://example.com")],
            fail: false,
        },
        StubGenerator {
            fragments: vec!["<cit".to_string(), "ed>42</cited>".to_string()],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("query", &["web"]).await;
    let body = response.text().await.unwrap();
    let frames = parse_sse_frames(&body);

    let citations: Vec<_> = frames.iter().filter(|f| f["type"] == "citation").collect();
    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0]["data"], 42);
}

// ============================================================================
// Terminal Signal Tests
// ============================================================================

#[tokio::test]
async fn test_retrieval_failure_yields_single_error_frame() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![],
            fail: true,
        },
        StubGenerator {
            fragments: vec!["never generated".to_string()],
            fail_after: None,
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("query", &["web"]).await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    let frames = parse_sse_frames(&body);

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");
}

#[tokio::test]
async fn test_generation_failure_ends_with_error_not_done() {
    let server = TestServer::spawn(
        StubRetriever {
            docs: vec![web_document("doc", "https://example.com")],
            fail: false,
        },
        StubGenerator {
            fragments: vec!["partial ".to_string(), "never sent".to_string()],
            fail_after: Some(1),
        },
    )
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.search("query", &["web"]).await;
    let body = response.text().await.unwrap();
    let frames = parse_sse_frames(&body);

    assert_eq!(frames[0]["type"], "documentsreference");
    assert!(frames.iter().any(|f| f["type"] == "text"));

    let terminals: Vec<_> = frames
        .iter()
        .filter(|f| f["type"] == "done" || f["type"] == "error")
        .collect();
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0]["type"], "error");
}
