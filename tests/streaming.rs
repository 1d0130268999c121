use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use erebos::{
    generate_character, generate_response, summarize_chat, verify_connection, CancelToken,
    Character, ChatError, Message, ProfileLength, Provider, Settings, SummaryLength,
};

fn settings_for(provider: Provider, endpoint: &str) -> Settings {
    Settings {
        api_provider: provider,
        api_key: Some("sk-test".into()),
        custom_endpoint: Some(endpoint.to_string()),
        model_name: "test-model".into(),
        ..Settings::default()
    }
}

async fn collect(mut stream: erebos::TextStream) -> Vec<String> {
    let mut fragments = Vec::new();
    while let Some(item) = stream.next().await {
        fragments.push(item.expect("stream item should be ok"));
    }
    fragments
}

#[tokio::test]
async fn sse_stream_yields_fragments_in_order() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n\
data: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Custom, &format!("{}/v1", server.uri()));
    let history = vec![Message::user("hello")];
    let stream = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .expect("request should succeed");

    assert_eq!(collect(stream).await, vec!["Hi", " there"]);
}

#[tokio::test]
async fn non_streaming_mode_yields_single_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "Hello back."}}]
        })))
        .mount(&server)
        .await;

    let mut settings = settings_for(Provider::Custom, &format!("{}/v1", server.uri()));
    settings.stream_response = false;

    let history = vec![Message::user("hello")];
    let stream = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .expect("request should succeed");

    assert_eq!(collect(stream).await, vec!["Hello back."]);
}

#[tokio::test]
async fn api_errors_surface_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Custom, &format!("{}/v1", server.uri()));
    let history = vec![Message::user("hello")];
    let err = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .err()
        .expect("401 should fail");

    match err {
        ChatError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid key");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn edge_function_dialect_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("0:\"Hel\"\n0:\"lo\\nthere\"\n", "text/plain"),
        )
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Vercel, &server.uri());
    let history = vec![Message::user("hello")];
    let stream = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .expect("request should succeed");

    assert_eq!(collect(stream).await, vec!["Hel", "lo\nthere"]);
}

#[tokio::test]
async fn gemini_requires_an_api_key() {
    let mut settings = settings_for(Provider::Gemini, "http://127.0.0.1:9");
    settings.api_key = None;

    let history = vec![Message::user("hello")];
    let err = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .err()
        .expect("missing key should fail before any request");

    assert!(matches!(err, ChatError::Configuration(_)));
}

#[tokio::test]
async fn gemini_quota_exhaustion_is_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Gemini, &server.uri());
    let history = vec![Message::user("hello")];
    let err = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .err()
        .expect("429 should fail");

    assert!(matches!(err, ChatError::QuotaExceeded));
}

#[tokio::test]
async fn gemini_stream_yields_candidate_parts() {
    let server = MockServer::start().await;
    let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Once\"}]}}]}\n\n\
data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" upon\"}]}}]}\n\n";
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Gemini, &server.uri());
    let history = vec![Message::user("hello")];
    let stream = generate_response(&history, &Character::named("Aria"), &settings, "", CancelToken::new())
        .await
        .expect("request should succeed");

    assert_eq!(collect(stream).await, vec!["Once", " upon"]);
}

#[tokio::test]
async fn summarize_accumulates_the_whole_stream() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"A concise\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\" summary.\"}}]}\n\n\
data: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("[EXISTING SUMMARY]:"))
        .and(body_string_contains("X happened."))
        .and(body_string_contains("Y happened."))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Custom, &format!("{}/v1", server.uri()));
    let log = vec![Message::user("Y happened.")];
    let summary = summarize_chat(
        &log,
        &settings,
        Some("X happened."),
        SummaryLength::Medium,
        CancelToken::new(),
    )
    .await
    .expect("summarization should succeed");

    assert_eq!(summary, "A concise summary.");
}

#[tokio::test]
async fn character_generation_routes_through_the_http_adapter() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"name\\\":\\\"Mira\\\"}\"}}]}\n\n\
data: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("expert character creator"))
        .and(body_string_contains("Prompt: a pirate queen"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Custom, &format!("{}/v1", server.uri()));
    let stream = generate_character(
        "a pirate queen",
        ProfileLength::Short,
        &settings,
        &[],
        "",
        false,
        CancelToken::new(),
        false,
    )
    .await
    .expect("generation should start");

    let output = collect(stream).await.concat();
    let profile = erebos::extract_json(&output).expect("output should contain json");
    assert_eq!(profile["name"], "Mira");
}

#[tokio::test]
async fn verify_connection_reports_reachable_provider() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let settings = settings_for(Provider::Custom, &format!("{}/v1", server.uri()));
    assert!(verify_connection(&settings).await.expect("probe should succeed"));
}

#[tokio::test]
async fn pre_cancelled_token_aborts_before_sending() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let settings = settings_for(Provider::Custom, "http://127.0.0.1:9/v1");
    let history = vec![Message::user("hello")];
    let err = generate_response(&history, &Character::named("Aria"), &settings, "", cancel)
        .await
        .err()
        .expect("cancelled token should abort");

    assert!(matches!(err, ChatError::Cancelled));
}

/// Serves one SSE frame over a chunked response and then holds the
/// connection open without ever finishing the stream.
async fn spawn_hanging_sse_server(frame: &'static str) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 8192];
            let mut seen: Vec<u8> = Vec::new();
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        seen.extend_from_slice(&buf[..n]);
                        if seen.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
            let chunk = format!("{:x}\r\n{}\r\n", frame.len(), frame);
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(chunk.as_bytes()).await;
            let _ = socket.flush().await;
            // Keep the connection open so only cancellation can end the stream.
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    });

    addr
}

#[tokio::test]
async fn cancellation_mid_stream_halts_with_cancelled() {
    let addr =
        spawn_hanging_sse_server("data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n").await;

    let settings = settings_for(Provider::Custom, &format!("http://{}/v1", addr));
    let history = vec![Message::user("hello")];
    let cancel = CancelToken::new();

    let mut stream = generate_response(&history, &Character::named("Aria"), &settings, "", cancel.clone())
        .await
        .expect("request should start");

    let first = stream
        .next()
        .await
        .expect("stream should yield a fragment")
        .expect("first fragment should be ok");
    assert_eq!(first, "Hi");

    cancel.cancel();

    match stream.next().await {
        Some(Err(ChatError::Cancelled)) => {}
        other => panic!("expected cancellation, got {:?}", other.map(|r| r.map_err(|e| e.to_string()))),
    }
    assert!(stream.next().await.is_none(), "no fragments after cancellation");
}
