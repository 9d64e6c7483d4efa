use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use creature_scan::config::ServerConfig;
use creature_scan::server::{self, AppState};
use creature_scan::{
    detection_channel, CaptureRegion, FileGrabber, LanguageHint, ScanError, Scanner, TextRecognizer,
    VocabularyTable,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "creature-scan-test-boundary";

/// Recognizer that reads the same text from every image
struct FixedText(&'static str);

impl TextRecognizer for FixedText {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn description(&self) -> &'static str {
        "test recognizer"
    }

    fn recognize(&self, _image: &DynamicImage, _languages: &LanguageHint) -> Result<String, ScanError> {
        Ok(self.0.to_string())
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["eng".to_string()]
    }
}

fn scanner(text: &'static str, names: &[&str]) -> Arc<Scanner> {
    Arc::new(Scanner::new(
        Arc::new(FixedText(text)),
        &VocabularyTable::from_display_strings(names.iter().copied()),
        Arc::new(FileGrabber::new("does-not-exist.png")),
    ))
}

fn app(scanner: Arc<Scanner>) -> axum::Router {
    server::router(AppState {
        scanner,
        config: Arc::new(ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_file_size: 1024 * 1024,
        }),
    })
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(240, 60, Luma([220])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

/// Build a multipart/form-data body from (name, filename, content) parts
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn analyze_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart(parts)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = app(scanner("", &[]))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_info_endpoint() {
    let response = app(scanner("", &["pikachu", "raichu"]))
        .oneshot(Request::get("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["engine"], "fixed");
    assert_eq!(json["vocabulary_size"], 2);
    assert_eq!(json["max_entities_limit"], 3);
    assert_eq!(json["languages"], serde_json::json!(["eng", "fra", "jpn"]));
}

#[tokio::test]
async fn test_analyze_single_entity() {
    let png = png_bytes();
    let response = app(scanner("CHARIZARD LV50", &["charizard", "charmander"]))
        .oneshot(analyze_request(&[("file", Some("capture.png"), png.as_slice())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["canonical_name"], "charizard");
    assert!(json["confidence"].as_f64().unwrap() >= 0.6);
    assert!(json["processing_time_ms"].is_u64());
}

#[tokio::test]
async fn test_analyze_multiple_entities() {
    let png = png_bytes();
    let response = app(scanner("PIKACHU RAICHU", &["pikachu", "raichu", "pichu"]))
        .oneshot(analyze_request(&[
            ("file", Some("capture.png"), png.as_slice()),
            ("max_entities", None, &b"2"[..]),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);

    let mut names: Vec<&str> = json["entities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["canonical_name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["pikachu", "raichu"]);
}

#[tokio::test]
async fn test_analyze_no_text_is_unsuccessful_result() {
    let png = png_bytes();
    let response = app(scanner("  ", &["charizard"]))
        .oneshot(analyze_request(&[("file", Some("capture.png"), png.as_slice())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "no text detected");
}

#[tokio::test]
async fn test_analyze_without_file() {
    let response = app(scanner("Mew", &["mew"]))
        .oneshot(analyze_request(&[("max_entities", None, &b"1"[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "MISSING_FILE");
}

#[tokio::test]
async fn test_analyze_rejects_non_image() {
    let response = app(scanner("Mew", &["mew"]))
        .oneshot(analyze_request(&[("file", Some("notes.png"), &b"definitely not a png"[..])]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_analyze_rejects_bad_max_entities() {
    let png = png_bytes();
    let response = app(scanner("Mew", &["mew"]))
        .oneshot(analyze_request(&[
            ("file", Some("capture.png"), png.as_slice()),
            ("max_entities", None, &b"many"[..]),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vocabulary_update_is_used_by_analysis() {
    let scanner = scanner("Dracaufeu", &["pikachu"]);

    let response = app(Arc::clone(&scanner))
        .oneshot(
            Request::put("/vocabulary")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"charizard": ["Charizard", "Dracaufeu", "Glurak"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["entries"], 1);
    assert_eq!(json["index_keys"], 3);

    let png = png_bytes();
    let response = app(scanner)
        .oneshot(analyze_request(&[("file", Some("capture.png"), png.as_slice())]))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["canonical_name"], "charizard");
}

#[tokio::test]
async fn test_vocabulary_rejects_invalid_json() {
    let response = app(scanner("", &[]))
        .oneshot(
            Request::put("/vocabulary")
                .body(Body::from("{\"charizard\": 3}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_VOCABULARY");
}

#[test]
fn test_live_loop_confirms_from_screenshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let screen = dir.path().join("screen.png");
    DynamicImage::ImageLuma8(GrayImage::from_pixel(400, 300, Luma([200])))
        .save(&screen)
        .unwrap();

    let scanner = Scanner::new(
        Arc::new(FixedText("PIKACHU RAICHU")),
        &VocabularyTable::from_display_strings(["pikachu", "raichu"]),
        Arc::new(FileGrabber::new(&screen)),
    );
    scanner.set_region(CaptureRegion::new(10, 10, 200, 50));
    scanner.set_max_entities(2);

    let (consumer, detections) = detection_channel();
    assert!(scanner.start_loop(0.5, consumer, 2, 0.6));

    let detection = detections.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(detection.key, "pikachu_raichu");
    assert_eq!(detection.tick, 2);
    assert_eq!(detection.image.width(), 200);
    assert!(detection.result.is_success());

    assert!(scanner.stop_loop());
    assert!(!scanner.is_running());
}

#[test]
fn test_live_loop_survives_missing_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let screen = dir.path().join("not-yet-written.png");

    let scanner = Scanner::new(
        Arc::new(FixedText("Mew")),
        &VocabularyTable::from_display_strings(["mew"]),
        Arc::new(FileGrabber::new(&screen)),
    );
    scanner.set_region(CaptureRegion::new(0, 0, 100, 40));

    let (consumer, detections) = detection_channel();
    assert!(scanner.start_loop(0.5, consumer, 1, 0.6));
    assert!(detections.recv_timeout(Duration::from_millis(700)).is_err());
    assert!(scanner.is_running());

    // The screenshot appears; the next tick picks it up
    DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 100, Luma([200])))
        .save(&screen)
        .unwrap();
    let detection = detections.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(detection.key, "mew");

    assert!(scanner.stop_loop());
}
