//! End-to-end tests of the HTTP surface against a temporary media tree.

use std::fs;
use std::path::Path;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chefpup_lib::config::MediaConfig;
use chefpup_lib::server::{create_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const VIDEO_SIZE: usize = 4096;
const BOUNDARY: &str = "chefpup-test-boundary";

struct Fixture {
    dir: TempDir,
    app: Router,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("media/audio")).unwrap();

        let video: Vec<u8> = (0..VIDEO_SIZE).map(|i| (i % 251) as u8).collect();
        fs::write(root.join("media/video.mp4"), &video).unwrap();
        fs::write(root.join("media/looping.mp4"), b"loop-loop-loop").unwrap();
        for id in 1..=5 {
            fs::write(root.join(format!("media/audio/{}.wav", id)), format!("RIFF{}", id)).unwrap();
        }

        let config = MediaConfig {
            media_root: root.to_path_buf(),
            ..MediaConfig::default()
        };
        let paths = config.resolve().unwrap();
        let app = create_router(AppState::new(paths, config.max_upload_bytes));
        Self { dir, app }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn upload_dir(&self) -> std::path::PathBuf {
        self.root().join("public/uploads")
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_range(&self, uri: &str, range: &str) -> Response {
        self.send(
            Request::get(uri)
                .header(header::RANGE, range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn upload(&self, fields: &[&str]) -> Response {
        let request = Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields)))
            .unwrap();
        self.send(request).await
    }

    async fn files_exist(&self) -> bool {
        let json = body_json(self.get("/check-files").await).await;
        json["exist"].as_bool().unwrap()
    }
}

fn multipart_body(fields: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    for name in fields {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"; filename=\"{n}.bin\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\ncontents of {n}\r\n",
                b = BOUNDARY,
                n = name
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

const ALL_FIELDS: [&str; 5] = ["video", "audio1", "audio2", "audio3", "audio4"];

#[tokio::test]
async fn audio_ids_one_to_five_are_served_as_wav() {
    let fx = Fixture::new();
    for id in 1..=5 {
        let response = fx.get(&format!("/audio/{}", id)).await;
        assert_eq!(response.status(), StatusCode::OK, "id {}", id);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/wav");
        assert_eq!(body_bytes(response).await, format!("RIFF{}", id).into_bytes());
    }
}

#[tokio::test]
async fn invalid_audio_ids_are_rejected() {
    let fx = Fixture::new();
    for id in ["0", "6", "abc"] {
        let response = fx.get(&format!("/audio/{}", id)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "id {}", id);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid audio file ID");
    }
}

#[tokio::test]
async fn video_without_range_is_served_whole() {
    let fx = Fixture::new();
    let response = fx.get("/video").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "video/mp4");
    assert_eq!(
        header_str(&response, header::CONTENT_LENGTH),
        VIDEO_SIZE.to_string()
    );
    assert_eq!(body_bytes(response).await.len(), VIDEO_SIZE);
}

#[tokio::test]
async fn video_range_returns_partial_content() {
    let fx = Fixture::new();
    let response = fx.get_range("/video", "bytes=0-99").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_str(&response, header::CONTENT_RANGE),
        format!("bytes 0-99/{}", VIDEO_SIZE)
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), "100");
    assert_eq!(header_str(&response, header::ACCEPT_RANGES), "bytes");

    let expected: Vec<u8> = (0..100).map(|i| (i % 251) as u8).collect();
    assert_eq!(body_bytes(response).await, expected);
}

#[tokio::test]
async fn open_ended_range_on_looping_video() {
    let fx = Fixture::new();
    let response = fx.get_range("/looping-video", "bytes=5-").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 5-13/14");
    assert_eq!(body_bytes(response).await, b"loop-loop".to_vec());
}

#[tokio::test]
async fn unsatisfiable_ranges_get_416() {
    let fx = Fixture::new();
    for range in [
        format!("bytes={}-", VIDEO_SIZE),
        "bytes=100-10".to_string(),
        "bytes=abc-".to_string(),
    ] {
        let response = fx.get_range("/video", &range).await;
        assert_eq!(
            response.status(),
            StatusCode::RANGE_NOT_SATISFIABLE,
            "range {}",
            range
        );
        assert_eq!(
            header_str(&response, header::CONTENT_RANGE),
            format!("bytes */{}", VIDEO_SIZE)
        );
    }
}

#[tokio::test]
async fn vanished_video_is_a_server_error() {
    let fx = Fixture::new();
    fs::remove_file(fx.root().join("media/video.mp4")).unwrap();
    let response = fx.get("/video").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to serve video file");
}

#[tokio::test]
async fn vanished_clip_is_a_server_error() {
    let fx = Fixture::new();
    fs::remove_file(fx.root().join("media/audio/3.wav")).unwrap();
    let response = fx.get("/audio/3").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to serve audio file");
}

#[tokio::test]
async fn audio_clips_honour_range() {
    let fx = Fixture::new();
    let response = fx.get_range("/audio/2", "bytes=0-3").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 0-3/5");
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/wav");
    assert_eq!(body_bytes(response).await, b"RIFF".to_vec());
}

#[tokio::test]
async fn complete_upload_round_trips_through_check_files() {
    let fx = Fixture::new();
    assert!(!fx.files_exist().await);

    let response = fx.upload(&ALL_FIELDS).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    assert!(fx.files_exist().await);
    assert_eq!(
        fs::read(fx.upload_dir().join("video.mp4")).unwrap(),
        b"contents of video"
    );
    assert_eq!(
        fs::read(fx.upload_dir().join("3.mp3")).unwrap(),
        b"contents of audio3"
    );

    // The stored clips are reachable for the page.
    let response = fx.get("/uploads/2.mp3").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"contents of audio2".to_vec());
}

#[tokio::test]
async fn upload_missing_a_clip_writes_nothing() {
    let fx = Fixture::new();
    let response = fx.upload(&["video", "audio1", "audio2", "audio3"]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing audio file 4");

    let written = fs::read_dir(fx.upload_dir()).unwrap().count();
    assert_eq!(written, 0);
    assert!(!fx.files_exist().await);
}

#[tokio::test]
async fn blocked_upload_target_fails_without_leftovers() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.upload_dir().join("video.mp4/occupied")).unwrap();

    let response = fx.upload(&ALL_FIELDS).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Upload failed");

    let parts = fs::read_dir(fx.upload_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .count();
    assert_eq!(parts, 0);
    assert!(!fx.files_exist().await);
}

#[tokio::test]
async fn upload_without_video_is_rejected() {
    let fx = Fixture::new();
    let response = fx.upload(&["audio1", "audio2", "audio3", "audio4"]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No video file provided");
}

#[tokio::test]
async fn removing_any_uploaded_file_breaks_check_files() {
    let fx = Fixture::new();
    fx.upload(&ALL_FIELDS).await;

    for name in ["video.mp4", "1.mp3", "4.mp3"] {
        let path = fx.upload_dir().join(name);
        let saved = fs::read(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(!fx.files_exist().await, "{} missing", name);
        fs::write(&path, saved).unwrap();
        assert!(fx.files_exist().await);
    }
}

#[tokio::test]
async fn non_multipart_upload_is_a_validation_error() {
    let fx = Fixture::new();
    let request = Request::post("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = fx.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}
