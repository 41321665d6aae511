use std::io::Write;

use comfydeploy_tools::{Client, Config, Error, DEFAULT_TARGET_FOLDER};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for_server(server: &MockServer) -> Client {
    Client::new(Config {
        base_url: Some(format!("{}/api", server.uri())),
        api_key: Some("cd_test_key".into()),
        ..Default::default()
    })
    .expect("client")
}

fn temp_png() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("temp file");
    file.write_all(b"\x89PNG\r\n\x1a\nfake").expect("write");
    file
}

#[tokio::test]
async fn uploads_after_ensuring_the_folder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assets/folder"))
        .and(body_json(json!({ "name": "upload", "parent_path": "/" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "upload" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/file/upload"))
        .and(header("authorization", "Bearer cd_test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asset_1",
            "file_url": "https://cdn.example.com/upload/photo.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = temp_png();
    let asset = client_for_server(&server)
        .assets()
        .upload(file.path().to_str().unwrap(), DEFAULT_TARGET_FOLDER)
        .await
        .expect("upload");

    assert_eq!(
        asset.file_url.as_deref(),
        Some("https://cdn.example.com/upload/photo.png")
    );
}

#[tokio::test]
async fn an_existing_folder_does_not_abort_the_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assets/folder"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Folder already exists"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/file/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_url": "https://cdn.example.com/upload/photo.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = temp_png();
    client_for_server(&server)
        .assets()
        .upload(file.path().to_str().unwrap(), "upload")
        .await
        .expect("upload");
}

#[tokio::test]
async fn a_foreign_already_exists_rejection_aborts_the_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assets/folder"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "An asset with this name already exists"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/file/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let file = temp_png();
    let err = client_for_server(&server)
        .assets()
        .upload(file.path().to_str().unwrap(), "upload")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UploadFolder(_)));
}

#[tokio::test]
async fn any_other_folder_failure_aborts_before_the_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/assets/folder"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/file/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let file = temp_png();
    let err = client_for_server(&server)
        .assets()
        .upload(file.path().to_str().unwrap(), "upload")
        .await
        .unwrap_err();

    match err {
        Error::UploadFolder(inner) => match *inner {
            Error::Api(api) => assert_eq!(api.status, 500),
            other => panic!("unexpected wrapped error: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn a_missing_file_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for_server(&server)
        .assets()
        .upload("/no/such/file.png", "upload")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
