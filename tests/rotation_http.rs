//! Credential rotation against a mock Gemini endpoint.
//!
//! Covers:
//! - a rejected first key falling through to the second
//! - every key rejected, and the hint that results
//! - transient 503s retried per key, then rotated
//! - no key configured: no request is made at all
//! - errors that stop rotation (safety-blocked image)

mod common;

use common::{inline_body, invalid_key_body, studio, text_body, IMAGE_PATH, TEXT_PATH};
use storyforge::media::AspectRatio;
use storyforge::{StudioError, MISSING_CREDENTIAL_HINT};

mod mock_http_tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_rejected_key_falls_through_to_next() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .and(header("x-goog-api-key", "k1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(invalid_key_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .and(header("x-goog-api-key", "k2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body(r#"["a", "b"]"#)))
            .expect(1)
            .mount(&server)
            .await;

        let studio = studio(&server, &["k1", "k2"], media.path());
        let ideas = studio.generate_ideas("Horror").await.unwrap();

        let texts: Vec<&str> = ideas.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_all_keys_rejected() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(invalid_key_body()))
            .expect(2)
            .mount(&server)
            .await;

        let studio = studio(&server, &["k1", "k2"], media.path());
        let err = studio.generate_ideas("Horror").await.unwrap_err();

        match err {
            StudioError::CredentialExhausted {
                hint,
                tried,
                rejected,
                last,
            } => {
                assert_eq!(tried, 2);
                assert!(rejected);
                assert!(hint.starts_with(MISSING_CREDENTIAL_HINT));
                assert!(hint.contains("rejected"));
                assert!(last.is_some());
            }
            other => panic!("Expected CredentialExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unavailable_is_retried_per_key_then_rotated() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .and(header("x-goog-api-key", "k1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .and(header("x-goog-api-key", "k2"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let studio = studio(&server, &["k1", "k2"], media.path());
        let err = studio.generate_ideas("Horror").await.unwrap_err();

        match err {
            StudioError::CredentialExhausted {
                tried,
                rejected,
                hint,
                ..
            } => {
                assert_eq!(tried, 2);
                assert!(!rejected);
                assert!(hint.contains("all 2 API keys failed"));
            }
            other => panic!("Expected CredentialExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_unavailable_then_success() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Polished.")))
            .expect(1)
            .mount(&server)
            .await;

        let studio = studio(&server, &["only"], media.path());
        let polished = studio.polish_story("rough draft").await.unwrap();
        assert_eq!(polished, "Polished.");
    }

    #[tokio::test]
    async fn test_no_keys_makes_no_request() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("[]")))
            .expect(0)
            .mount(&server)
            .await;

        let studio = studio(&server, &[], media.path());
        let err = studio.generate_ideas("Horror").await.unwrap_err();

        match err {
            StudioError::CredentialExhausted {
                tried, rejected, hint, ..
            } => {
                assert_eq!(tried, 0);
                assert!(!rejected);
                assert!(hint.contains("no API key configured"));
            }
            other => panic!("Expected CredentialExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blocked_image_stops_rotation() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(IMAGE_PATH))
            .and(header("x-goog-api-key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(IMAGE_PATH))
            .and(header("x-goog-api-key", "k2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(inline_body("image/png", "AAAA")))
            .expect(0)
            .mount(&server)
            .await;

        let studio = studio(&server, &["k1", "k2"], media.path());
        let err = studio
            .generate_scene_image("a crowded market", AspectRatio::Portrait, &[])
            .await
            .unwrap_err();

        match err {
            StudioError::EmptyGeneration(reason) => assert!(reason.contains("SAFETY")),
            other => panic!("Expected EmptyGeneration, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reconfigured_keys_apply_to_next_call() {
        let server = MockServer::start().await;
        let media = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .and(header("x-goog-api-key", "fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Done.")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TEXT_PATH))
            .and(header("x-goog-api-key", "stale"))
            .respond_with(ResponseTemplate::new(400).set_body_json(invalid_key_body()))
            .expect(0)
            .mount(&server)
            .await;

        let mut studio = studio(&server, &["stale"], media.path());
        studio.configure(["fresh"]);

        let text = studio.optimize_video_prompt("a cat surfing").await.unwrap();
        assert_eq!(text, "Done.");
    }
}
