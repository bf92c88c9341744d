use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use futures::StreamExt;
use sift_client::{
    ChatRequest, ChunkStream, ClientError, DeploymentClient, HistorySender, TextClassification,
    TokenClassification,
};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn collect(mut stream: ChunkStream) -> String {
    let mut out = String::new();
    while let Some(chunk) = stream.next().await {
        out.push_str(&chunk.expect("stream chunk"));
    }
    out
}

fn chat_request(user_input: &str) -> ChatRequest {
    ChatRequest {
        user_input: user_input.to_string(),
        provider: "openai".to_string(),
        session_id: None,
        constraints: HashMap::new(),
    }
}

#[tokio::test]
async fn chat_stream_delivers_chunks_in_order() {
    async fn chat() -> Body {
        let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
            Ok("The"),
            Ok(" refund"),
            Ok(" policy is..."),
            Ok("context:"),
            Ok("{\"results\":[]}"),
        ];
        Body::from_stream(futures::stream::iter(chunks))
    }
    let base = serve(Router::new().route("/chat", post(chat))).await;

    let client = DeploymentClient::new(&base);
    let stream = client
        .stream_chat(&chat_request("What is the refund policy?"))
        .await
        .expect("open stream");
    assert_eq!(
        collect(stream).await,
        "The refund policy is...context:{\"results\":[]}"
    );
}

#[tokio::test]
async fn chat_request_body_is_forwarded() {
    async fn chat(Json(body): Json<serde_json::Value>) -> Body {
        let user_input = body["user_input"].as_str().unwrap_or("<missing>");
        let department = body["constraints"]["department"].as_str().unwrap_or("<none>");
        Body::from(format!("{user_input}|{department}"))
    }
    let base = serve(Router::new().route("/chat", post(chat))).await;

    let client = DeploymentClient::new(&base);
    let mut request = chat_request("refunds?");
    request
        .constraints
        .insert("department".to_string(), "Billing".to_string());
    let stream = client.stream_chat(&request).await.expect("open stream");
    assert_eq!(collect(stream).await, "refunds?|Billing");
}

#[tokio::test]
async fn utf8_sequences_split_across_chunks_survive() {
    async fn chat() -> Body {
        // "é" (0xC3 0xA9) split across two chunks.
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
            vec![Ok(vec![0x48, 0xC3]), Ok(vec![0xA9, 0x21])];
        Body::from_stream(futures::stream::iter(chunks))
    }
    let base = serve(Router::new().route("/chat", post(chat))).await;

    let client = DeploymentClient::new(&base);
    let stream = client.stream_chat(&chat_request("hi")).await.expect("open stream");
    assert_eq!(collect(stream).await, "Hé!");
}

#[tokio::test]
async fn predict_decodes_token_classification() {
    #[derive(serde::Deserialize)]
    struct PredictParams {
        query: String,
        top_k: usize,
    }

    async fn predict(Query(params): Query<PredictParams>) -> Json<TokenClassification> {
        assert_eq!(params.top_k, 1);
        Json(TokenClassification {
            query_text: params.query,
            tokens: vec!["John".into(), "Smith".into()],
            predicted_tags: vec![vec!["NAME".into()], vec!["NAME".into()]],
        })
    }
    let base = serve(Router::new().route("/predict", get(predict))).await;

    let client = DeploymentClient::new(&base);
    let result = client.predict_tokens("John Smith", 1).await.expect("predict");
    assert_eq!(result.query_text, "John Smith");
    assert_eq!(result.tokens.len(), 2);
    assert_eq!(result.predicted_tags[0][0], "NAME");
}

#[tokio::test]
async fn predict_requires_the_bearer_token() {
    async fn predict(headers: HeaderMap) -> Result<Json<TextClassification>, StatusCode> {
        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer secret");
        if !authorized {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(TextClassification {
            predicted_classes: vec![("positive".into(), 0.9)],
        }))
    }
    let base = serve(Router::new().route("/predict", get(predict))).await;

    let denied = DeploymentClient::new(&base).predict_classes("great", 1).await;
    assert!(matches!(
        denied,
        Err(ClientError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
    ));

    let result = DeploymentClient::new(&base)
        .with_bearer_token("secret")
        .predict_classes("great", 1)
        .await
        .expect("authorized predict");
    assert_eq!(result.predicted_classes[0].0, "positive");
}

#[tokio::test]
async fn chat_history_unwraps_the_response_envelope() {
    async fn history(Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
        assert_eq!(body["provider"], "openai");
        Json(serde_json::json!({
            "status": "success",
            "message": "Successful",
            "data": {
                "chat_history": [
                    {"sender": "human", "content": "what changed?"},
                    {
                        "sender": "AI",
                        "content": "the refund window.",
                        "references": [
                            {"id": 5, "text": "30 days", "source": "policy.pdf", "score": 0.7}
                        ]
                    }
                ]
            }
        }))
    }
    let base = serve(Router::new().route("/get-chat-history", post(history))).await;

    let history = DeploymentClient::new(&base)
        .chat_history("openai")
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, HistorySender::Human);
    assert_eq!(history[1].references.len(), 1);
    assert_eq!(history[1].references[0].source, "policy.pdf");
}

#[tokio::test]
async fn set_chat_posts_the_provider() {
    async fn settings(Json(body): Json<serde_json::Value>) -> StatusCode {
        if body["provider"] == "on-prem" {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }
    let base = serve(Router::new().route("/update-chat-settings", post(settings))).await;

    let client = DeploymentClient::new(&base);
    client.set_chat("on-prem").await.expect("set chat");
    assert!(client.set_chat("bogus").await.is_err());
}

#[tokio::test]
async fn non_2xx_statuses_map_to_status_errors() {
    async fn chat() -> (StatusCode, &'static str) {
        (StatusCode::BAD_GATEWAY, "model worker crashed")
    }
    let base = serve(Router::new().route("/chat", post(chat))).await;

    let result = DeploymentClient::new(&base)
        .stream_chat(&chat_request("hello"))
        .await;
    let error = match result {
        Err(error) => error,
        Ok(_) => panic!("expected the request to fail"),
    };
    match error {
        ClientError::Status { status, body } => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert!(body.contains("model worker crashed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
