use base64::Engine;
use prompt_studio::messages::{requires_key_reselection, user_message, INVALID_API_KEY, QUOTA_EXCEEDED};
use prompt_studio::{
    AspectRatio, GeminiProvider, GenerationOptions, ImageFormat, ImageService, InputImage,
    RequestMode, StudioError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];
const JPEG: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F'];

const PREDICT_PATH: &str = "/v1beta/models/imagen-4.0-generate-001:predict";
const EDIT_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn provider(server: &MockServer) -> GeminiProvider {
    GeminiProvider::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap()
}

fn png_input() -> InputImage {
    InputImage::from_bytes(PNG.to_vec(), None).unwrap()
}

#[tokio::test]
async fn test_generate_sends_prompt_and_decodes_predictions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "parameters": {"sampleCount": 2, "aspectRatio": "9:16"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [
                {"bytesBase64Encoded": b64(&PNG), "mimeType": "image/png"},
                {"bytesBase64Encoded": b64(&JPEG), "mimeType": "image/jpeg"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = GenerationOptions::new()
        .with_count(2)
        .with_aspect_ratio(AspectRatio::Portrait);
    let images = provider(&server)
        .generate("a fox in the snow", &options)
        .await
        .unwrap();

    assert_eq!(images.len(), 2);
    assert_eq!(images[0].data, PNG.to_vec());
    assert_eq!(images[0].format, ImageFormat::Png);
    assert_eq!(images[1].format, ImageFormat::Jpeg);
    assert_eq!(images[0].metadata.mode, RequestMode::Generate);
    assert_eq!(
        images[0].metadata.model.as_deref(),
        Some("imagen-4.0-generate-001")
    );

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["instances"][0]["prompt"], "a fox in the snow");
}

#[tokio::test]
async fn test_generate_with_no_predictions_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let images = provider(&server)
        .generate("anything", &GenerationOptions::new())
        .await
        .unwrap();
    assert!(images.is_empty());
}

#[tokio::test]
async fn test_generate_all_filtered_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"raiFilteredReason": "The prompt violates policy."}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("something bad", &GenerationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::ContentBlocked(ref m) if m.contains("violates policy")));
}

#[tokio::test]
async fn test_edit_sends_inline_image_then_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Done."},
                    {"inlineData": {"mimeType": "image/png", "data": b64(&PNG)}}
                ]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let images = provider(&server)
        .edit("add a hat", &png_input())
        .await
        .unwrap();

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].metadata.mode, RequestMode::Edit);
    assert_eq!(
        images[0].metadata.model.as_deref(),
        Some("gemini-2.5-flash-image")
    );

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[0]["inlineData"]["data"], b64(&PNG));
    assert_eq!(parts[1]["text"], "add a hat");
}

#[tokio::test]
async fn test_edit_prompt_feedback_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .edit("something bad", &png_input())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::ContentBlocked(_)));
}

#[tokio::test]
async fn test_edit_safety_finish_reason_without_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "IMAGE_SAFETY"}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .edit("something bad", &png_input())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("IMAGE_SAFETY"));
}

#[tokio::test]
async fn test_invalid_key_maps_to_auth_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("a cat", &GenerationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Auth(_)));
    assert_eq!(user_message(&err), INVALID_API_KEY);
}

#[tokio::test]
async fn test_quota_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "You exceeded your current quota, please check your plan and billing details.",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("a cat", &GenerationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::QuotaExceeded(_)));
    assert_eq!(user_message(&err), QUOTA_EXCEEDED);
}

#[tokio::test]
async fn test_entity_not_found_requires_new_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EDIT_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND"
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .edit("add a hat", &png_input())
        .await
        .unwrap_err();
    assert!(requires_key_reselection(&err));
}

#[tokio::test]
async fn test_health_check_checks_both_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/imagen-4.0-generate-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/gemini-2.5-flash-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).health_check().await.unwrap();
}

#[tokio::test]
async fn test_health_check_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Permission denied"))
        .mount(&server)
        .await;

    let err = provider(&server).health_check().await.unwrap_err();
    assert!(matches!(err, StudioError::Auth(_)));
}
