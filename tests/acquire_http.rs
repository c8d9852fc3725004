// tests/acquire_http.rs
//
// Production provider chains (built from config) against local mock servers.
// Mirrors are mounted under distinct path prefixes of one server so each
// provider gets its own name.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use content_ingest::acquire::http::get_text;
use content_ingest::{AcquireError, AcquisitionConfig, ContentAcquisitionService, ProviderError};

const MIRROR_PAGE: &str = include_str!("fixtures/mirror_status.html");

fn config_for(server: &MockServer) -> AcquisitionConfig {
    let base = server.uri();
    AcquisitionConfig {
        json_endpoints: vec![format!("{base}/j")],
        mirrors: vec![format!("{base}/m1")],
        translation_mirrors: vec![
            format!("{base}/t1"),
            format!("{base}/t2"),
            format!("{base}/t3"),
        ],
        provider_timeout_ms: 2_000,
        thread_timeout_ms: 2_000,
        thread_mirror_limit: 1,
        ..Default::default()
    }
}

fn label(server: &MockServer, prefix: &str) -> String {
    let host = server.uri().trim_start_matches("http://").to_string();
    format!("{host}/{prefix}")
}

#[tokio::test]
async fn json_endpoint_failure_falls_back_to_mirror_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/j/alice/status/12345"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m1/alice/status/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MIRROR_PAGE))
        .mount(&server)
        .await;

    let svc = ContentAcquisitionService::from_config(config_for(&server)).unwrap();
    let res = svc
        .fetch_post("https://twitter.com/alice/status/12345?s=20")
        .await
        .unwrap();

    assert!(res.success());
    assert_eq!(res.source(), Some(format!("mirror:{}", label(&server, "m1")).as_str()));
    assert_eq!(res.errors().len(), 1);
    assert_eq!(res.errors()[0].reason, ProviderError::HttpStatus(500));

    let post = res.into_payload().unwrap();
    assert_eq!(post.author, "Alice Example");
    assert_eq!(post.metrics.likes, 7890);
    assert_eq!(post.source_url, "https://x.com/alice/status/12345");
    assert_eq!(post.media.len(), 2);
    assert!(post.media[0].ends_with("/m1/pic/orig/media%2Fabc.jpg"));

    let thread: Vec<_> = post.thread.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(thread, vec!["12346", "12347"]);
    assert!(post
        .formatted_text()
        .contains(r#"<a href="https://x.com/bob">@bob</a>"#));
}

#[tokio::test]
async fn json_endpoint_success_needs_no_mirror() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/j/alice/status/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "OK",
            "tweet": {
                "id": "12345",
                "text": "From the API",
                "author": { "name": "Alice Example", "screen_name": "alice" },
                "likes": 5,
                "created_timestamp": 1_700_000_000
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Thread lookup still goes to the mirror; an error page there is tolerated.
    Mock::given(method("GET"))
        .and(path("/m1/alice/status/12345"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let svc = ContentAcquisitionService::from_config(config_for(&server)).unwrap();
    let res = svc.fetch_post("https://x.com/alice/status/12345").await.unwrap();
    assert_eq!(res.source(), Some(format!("json:{}", label(&server, "j")).as_str()));
    assert!(res.errors().is_empty());
    let post = res.into_payload().unwrap();
    assert_eq!(post.text, "From the API");
    assert_eq!(post.published_at, Some(1_700_000_000));
    assert!(post.thread.is_empty());
}

#[tokio::test]
async fn slow_provider_times_out_and_next_one_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/j/alice/status/12345"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m1/alice/status/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MIRROR_PAGE))
        .mount(&server)
        .await;

    let config = AcquisitionConfig {
        provider_timeout_ms: 200,
        ..config_for(&server)
    };
    let svc = ContentAcquisitionService::from_config(config).unwrap();
    let res = svc.fetch_post("https://x.com/alice/status/12345").await.unwrap();
    assert!(res.success());
    assert_eq!(
        res.errors()[0].reason,
        ProviderError::Timeout { after_ms: 200 }
    );
}

#[tokio::test]
async fn translation_with_every_mirror_down_is_exhausted_with_three_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/t[123]/api/v1/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let svc = ContentAcquisitionService::from_config(config_for(&server)).unwrap();
    let err = svc
        .fetch_translation("Hello world", "en", "de")
        .await
        .unwrap_err();

    match &err {
        AcquireError::AllProvidersExhausted { failures } => {
            assert_eq!(failures.len(), 3);
            let names: Vec<_> = failures.iter().map(|f| f.provider.clone()).collect();
            assert_eq!(
                names,
                vec![
                    format!("translate:{}", label(&server, "t1")),
                    format!("translate:{}", label(&server, "t2")),
                    format!("translate:{}", label(&server, "t3")),
                ]
            );
            assert!(failures
                .iter()
                .all(|f| f.reason == ProviderError::HttpStatus(503)));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert!(err.to_string().contains("HTTP 503"));
}

#[tokio::test]
async fn translation_skips_broken_mirrors_until_one_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/t1/api/v1/en/de/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    // A mirror answering without the field is a failure, not an empty success.
    Mock::given(method("GET"))
        .and(path_regex(r"^/t2/api/v1/en/de/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "quota" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/t3/api/v1/en/de/Hello%20world%3F$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "translation": "Hallo Welt?" })))
        .mount(&server)
        .await;

    let svc = ContentAcquisitionService::from_config(config_for(&server)).unwrap();
    let res = svc
        .fetch_translation("Hello world?", "en", "de")
        .await
        .unwrap();
    assert_eq!(res.payload().map(String::as_str), Some("Hallo Welt?"));
    assert_eq!(res.source(), Some(format!("translate:{}", label(&server, "t3")).as_str()));
    assert_eq!(
        res.errors().iter().map(|f| f.reason.clone()).collect::<Vec<_>>(),
        vec![
            ProviderError::HttpStatus(503),
            ProviderError::MissingField("translation")
        ]
    );
}

#[tokio::test]
async fn client_timeout_maps_to_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .expect("build client");
    let err = get_text(&client, &format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    match err {
        ProviderError::Network(msg) => assert!(msg.starts_with("client timeout"), "{msg}"),
        other => panic!("expected a network failure, got {other:?}"),
    }
}
