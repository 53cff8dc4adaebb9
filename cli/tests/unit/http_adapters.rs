//! HTTP adapter tests against a local mock server.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use droplet_cli::application::ports::{
    AppExaminer, AppRunner, BlobStore, ProxyConfReader, TaskExaminer,
};
use droplet_cli::application::services::droplet_runner::list_droplets;
use droplet_cli::domain::scheduler::TaskState;
use droplet_cli::domain::{AppCreateRequest, AppEnvironmentParams, BlobStoreError, DavConfig};
use droplet_cli::infra::blob_store::DavBlobStore;
use droplet_cli::infra::proxyconf::HttpProxyConfReader;
use droplet_cli::infra::receptor::{ReceptorClient, ReceptorError};
use droplet_cli::infra::verifier::verify_dav;
use droplet_common::Action;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mockito::{Matcher, Server};
use tokio::io::AsyncReadExt as _;

fn dav_config(server: &Server) -> DavConfig {
    let addr = server.socket_address();
    DavConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        username: "user".to_string(),
        password: "pass".to_string(),
    }
}

fn collection(href: &str) -> String {
    format!(
        "<D:response><D:href>{href}</D:href><D:propstat><D:prop>\
         <D:resourcetype><D:collection/></D:resourcetype>\
         </D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"
    )
}

fn file(href: &str, size: u64) -> String {
    format!(
        "<D:response><D:href>{href}</D:href><D:propstat><D:prop>\
         <D:resourcetype/><D:getcontentlength>{size}</D:getcontentlength>\
         <D:getlastmodified>Mon, 02 Jan 2006 15:04:05 GMT</D:getlastmodified>\
         </D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"
    )
}

fn multistatus(responses: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:">{}</D:multistatus>"#,
        responses.concat()
    )
}

fn basic_auth(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

fn status_of(err: &anyhow::Error) -> Option<u16> {
    err.chain().find_map(|c| match c.downcast_ref::<BlobStoreError>() {
        Some(BlobStoreError::UnexpectedStatus { status, .. }) => Some(*status),
        _ => None,
    })
}

// ── DAV blob store ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dav_list_walks_collections() {
    let mut server = Server::new_async().await;
    let root = server
        .mock("PROPFIND", "/blobs/")
        .match_header("depth", "1")
        .with_status(207)
        .with_body(multistatus(&[collection("/blobs/"), collection("/blobs/app/")]))
        .create_async()
        .await;
    let app = server
        .mock("PROPFIND", "/blobs/app/")
        .with_status(207)
        .with_body(multistatus(&[
            collection("/blobs/app/"),
            file("/blobs/app/droplet.tgz", 1024),
            file("/blobs/app/bits.zip", 10),
        ]))
        .create_async()
        .await;

    let store = DavBlobStore::new(dav_config(&server)).expect("store");
    let blobs = store.list().await.expect("list");

    let paths: Vec<_> = blobs.iter().map(|b| b.path.as_str()).collect();
    assert_eq!(paths, ["app/bits.zip", "app/droplet.tgz"]);
    assert_eq!(blobs[1].size, 1024);
    assert_eq!(blobs[1].created.map(|c| c.timestamp()), Some(1_136_214_245));

    let droplets = list_droplets(&store).await.expect("droplets");
    assert_eq!(droplets.len(), 1);
    assert_eq!(droplets[0].name, "app");

    root.assert_async().await;
    app.assert_async().await;
}

#[tokio::test]
async fn test_dav_list_of_missing_root_is_empty() {
    let mut server = Server::new_async().await;
    server
        .mock("PROPFIND", "/blobs/")
        .with_status(404)
        .create_async()
        .await;

    let store = DavBlobStore::new(dav_config(&server)).expect("store");
    assert!(store.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_dav_list_rejects_malformed_xml() {
    let mut server = Server::new_async().await;
    server
        .mock("PROPFIND", "/blobs/")
        .with_status(207)
        .with_body("<D:multistatus")
        .create_async()
        .await;

    let store = DavBlobStore::new(dav_config(&server)).expect("store");
    let err = store.list().await.unwrap_err();
    assert!(err
        .chain()
        .any(|c| matches!(c.downcast_ref::<BlobStoreError>(), Some(BlobStoreError::MalformedListing(_)))));
}

#[tokio::test]
async fn test_dav_upload_puts_file_with_basic_auth() {
    let mut server = Server::new_async().await;
    let put = server
        .mock("PUT", "/blobs/app/bits.zip")
        .match_header("authorization", basic_auth("user", "pass").as_str())
        .match_body("zip bytes")
        .with_status(201)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bits.zip");
    std::fs::write(&path, "zip bytes").expect("write");
    let file = tokio::fs::File::open(&path).await.expect("open");

    let store = DavBlobStore::new(dav_config(&server)).expect("store");
    store.upload("app/bits.zip", file).await.expect("upload");
    put.assert_async().await;
}

#[tokio::test]
async fn test_dav_download_streams_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/blobs/app/droplet.tgz")
        .with_status(200)
        .with_body("droplet bytes")
        .create_async()
        .await;

    let store = DavBlobStore::new(dav_config(&server)).expect("store");
    let mut reader = store.download("app/droplet.tgz").await.expect("download");
    let mut body = String::new();
    reader.read_to_string(&mut body).await.expect("read");
    assert_eq!(body, "droplet bytes");
}

#[tokio::test]
async fn test_dav_delete_reports_unexpected_status() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/blobs/app/droplet.tgz")
        .with_status(404)
        .create_async()
        .await;

    let store = DavBlobStore::new(dav_config(&server)).expect("store");
    let err = store.delete("app/droplet.tgz").await.unwrap_err();
    assert_eq!(status_of(&err), Some(404));
}

// ── Verifier ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_verify_dav_accepts_multistatus() {
    let mut server = Server::new_async().await;
    server
        .mock("PROPFIND", "/blobs/")
        .with_status(207)
        .with_body(multistatus(&[collection("/blobs/")]))
        .create_async()
        .await;
    assert!(verify_dav(&dav_config(&server)).await.expect("verify"));
}

#[tokio::test]
async fn test_verify_dav_rejected_credentials_are_false() {
    let mut server = Server::new_async().await;
    server
        .mock("PROPFIND", "/blobs/")
        .with_status(401)
        .create_async()
        .await;
    assert!(!verify_dav(&dav_config(&server)).await.expect("verify"));
}

#[tokio::test]
async fn test_verify_dav_server_error_is_err() {
    let mut server = Server::new_async().await;
    server
        .mock("PROPFIND", "/blobs/")
        .with_status(500)
        .create_async()
        .await;
    let err = verify_dav(&dav_config(&server)).await.unwrap_err();
    assert_eq!(status_of(&err), Some(500));
}

#[tokio::test]
async fn test_verify_dav_unreachable_is_err() {
    let config = DavConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        username: String::new(),
        password: String::new(),
    };
    assert!(verify_dav(&config).await.is_err());
}

// ── Proxy configuration ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_proxyconf_missing_document_means_no_proxy() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/proxyconf.json")
        .with_status(404)
        .create_async()
        .await;

    let reader = HttpProxyConfReader::with_url(format!("{}/proxyconf.json", server.url()));
    let conf = reader.proxy_conf().await.expect("proxy conf");
    assert_eq!(conf, Default::default());
}

#[tokio::test]
async fn test_proxyconf_parses_document() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/proxyconf.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"http_proxy":"http://proxy:3128","no_proxy":"localhost"}"#)
        .create_async()
        .await;

    let reader = HttpProxyConfReader::with_url(format!("{}/proxyconf.json", server.url()));
    let conf = reader.proxy_conf().await.expect("proxy conf");
    assert_eq!(conf.http_proxy, "http://proxy:3128");
    assert_eq!(conf.https_proxy, "");
    assert_eq!(conf.no_proxy, "localhost");
}

#[tokio::test]
async fn test_proxyconf_server_error_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/proxyconf.json")
        .with_status(500)
        .create_async()
        .await;

    let reader = HttpProxyConfReader::with_url(format!("{}/proxyconf.json", server.url()));
    assert!(reader.proxy_conf().await.is_err());
}

// ── Receptor ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_receptor_task_status_decodes_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/tasks/build-droplet-app")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"task_guid":"build-droplet-app","state":"COMPLETED","failed":true,"failure_reason":"boom"}"#,
        )
        .create_async()
        .await;

    let client = ReceptorClient::new(&server.url(), "", "").expect("client");
    let info = client.task_status("build-droplet-app").await.expect("status");
    assert_eq!(info.state, TaskState::Completed);
    assert!(info.failed);
    assert_eq!(info.failure_reason, "boom");
}

#[tokio::test]
async fn test_receptor_error_carries_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/tasks/missing")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"ResourceNotFound","message":"task not found"}"#)
        .create_async()
        .await;

    let client = ReceptorClient::new(&server.url(), "", "").expect("client");
    let err = client.task_status("missing").await.unwrap_err();
    let receptor = err.downcast_ref::<ReceptorError>().expect("receptor error");
    assert_eq!(receptor.status, 404);
    assert_eq!(receptor.message, "task not found");
}

#[tokio::test]
async fn test_receptor_lists_app_annotations() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/desired_lrps")
        .match_header("authorization", basic_auth("user", "pass").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{"process_guid":"web","annotation":"{\"droplet_source\":{\"droplet_name\":\"app\"}}"},{"process_guid":"worker"}]"#,
        )
        .create_async()
        .await;

    let client = ReceptorClient::new(&server.url(), "user", "pass").expect("client");
    let apps = client.list_apps().await.expect("apps");
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0].process_guid, "web");
    assert_eq!(apps[1].annotation, "");
}

#[tokio::test]
async fn test_receptor_create_app_posts_desired_lrp() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v1/desired_lrps")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "process_guid": "web",
            "domain": "lattice",
            "instances": 2,
            "ports": [8080],
            "routes": {"cf-router": []},
        })))
        .with_status(201)
        .create_async()
        .await;

    let client = ReceptorClient::new(&server.url(), "", "").expect("client");
    client
        .create_app(&AppCreateRequest {
            name: "web".to_string(),
            rootfs: "preloaded:cflinuxfs2".to_string(),
            start_command: "/tmp/launcher".to_string(),
            app_args: Vec::new(),
            working_dir: "/home/vcap".to_string(),
            annotation: String::new(),
            setup: Action::download("http://blobs/app/droplet.tgz", "/home/vcap"),
            params: AppEnvironmentParams {
                instances: 2,
                ..AppEnvironmentParams::default()
            },
        })
        .await
        .expect("create");
    create.assert_async().await;
}
