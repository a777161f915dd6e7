/*
 *  tests/http_integration.rs
 *
 *  HTTP surface tests over a real listener
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 */

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use picframe::normalize::encode;
use picframe::{http, Catalog, DisplayState, MockRenderer, Normalizer, PictureFrame};

struct Server {
    _dir: TempDir,
    base: String,
    mock: MockRenderer,
}

async fn serve() -> Server {
    let dir = tempdir().unwrap();
    let static_dir = dir.path().join("static");
    fs::create_dir_all(&static_dir).unwrap();
    fs::write(static_dir.join("index.html"), "<h1>frame</h1>").unwrap();

    let catalog = Arc::new(Catalog::open(static_dir.join("pictures")).unwrap());
    let state = Arc::new(DisplayState::new(catalog));
    let mock = MockRenderer::new();
    let frame = PictureFrame::new(state, Arc::new(mock.clone()), Normalizer::default());

    let app = http::router(frame, &static_dir, 1 << 20);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server { _dir: dir, base: format!("http://{}", addr), mock }
}

fn upload_form(name: &str) -> Form {
    let img = RgbaImage::from_pixel(60, 100, Rgba([200, 10, 10, 255]));
    let bytes = encode(&DynamicImage::ImageRgba8(img), ImageFormat::Png).unwrap();
    Form::new().part("picture", Part::bytes(bytes).file_name(name.to_string()))
}

#[tokio::test]
async fn test_upload_list_display_delete() {
    let s = serve().await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{}/upload-picture", s.base)).multipart(upload_form("tall.png")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let list: Vec<String> = client.get(format!("{}/list-pictures", s.base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(list, vec!["tall.png".to_string()]);

    let resp = client.get(format!("{}/display-picture?name=tall.png", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(s.mock.calls(), 1);

    let state: serde_json::Value = client.get(format!("{}/state", s.base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(state["current"]["identifier"], "tall.png");
    assert_eq!(state["pictures"], 1);

    let resp = client.delete(format!("{}/delete-picture?name=tall.png", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let list: Vec<String> = client.get(format!("{}/list-pictures", s.base)).send().await.unwrap().json().await.unwrap();
    assert!(list.is_empty());

    let state: serde_json::Value = client.get(format!("{}/state", s.base)).send().await.unwrap().json().await.unwrap();
    assert!(state["current"].is_null());
}

#[tokio::test]
async fn test_error_statuses() {
    let s = serve().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/display-picture", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client.get(format!("{}/display-picture?name=ghost.png", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.delete(format!("{}/delete-picture?name=ghost.png", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let junk = Form::new().part("picture", Part::bytes(b"not an image".to_vec()).file_name("x.png"));
    let resp = client.post(format!("{}/upload-picture", s.base)).multipart(junk).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client.post(format!("{}/upload-picture", s.base)).multipart(upload_form("a.png")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    s.mock.set_failure(true);
    let resp = client.get(format!("{}/display-picture?name=a.png", s.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_static_fallback() {
    let s = serve().await;
    let body = reqwest::get(format!("{}/index.html", s.base)).await.unwrap().text().await.unwrap();
    assert_eq!(body, "<h1>frame</h1>");
}
