use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use precoview::PrecoError;
use precoview::core::auth::{Credentials, LoginOutcome};
use precoview::core::client::ApiClient;
use precoview::core::config::AppConfig;
use precoview::core::dataset::Cell;
use precoview::core::fetch::{self, DataSource};

type Routes = HashMap<String, (u16, &'static str, Vec<u8>)>;

const VALID_CSV: &str = "\
Código,PRODUTO,Preço,PLATAFORMA
1,Mouse sem fio,89.9,Shopee
2,Teclado mecânico,250.0,Mercado Livre
3,Cabo USB-C,19.9,Amazon
4,Monitor 24,899.99,Shopee
";

/// Minimal HTTP stub: answers each request from the route table and closes
/// the connection. Unknown paths get a 404.
async fn spawn_stub_server(routes: Routes) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();

                let (status, content_type, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, "text/plain", b"not found".to_vec()));
                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    _ => "Error",
                };
                let header = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn test_config(addr: SocketAddr, data_dir: &std::path::Path) -> AppConfig {
    AppConfig {
        auth_url: format!("http://{addr}/api/login"),
        base_urls: vec![format!("http://{addr}/a"), format!("http://{addr}/b")],
        filename: "dados.csv".to_string(),
        data_dir: Some(data_dir.to_path_buf()),
        request_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn first_valid_candidate_ends_the_remote_stage() {
    // The second base URL only serves the /download/ path convention.
    let mut routes = Routes::new();
    routes.insert(
        "/b/download/dados.csv".to_string(),
        (200, "text/csv", VALID_CSV.as_bytes().to_vec()),
    );
    let addr = spawn_stub_server(routes).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let client = ApiClient::new(config.clone()).unwrap();

    let acquired = tokio::time::timeout(Duration::from_secs(30), fetch::acquire(&client, &config))
        .await
        .expect("chain must finish quickly against a local stub")
        .unwrap();
    assert_eq!(acquired.source, DataSource::Remote);
    assert_eq!(acquired.path, dir.path().join("dados.csv"));
    assert!(acquired.path.exists());
    assert_eq!(acquired.dataset.len(), 4);
    assert_eq!(
        acquired.dataset.cell(0, 1),
        Some(&Cell::Text("Mouse sem fio".into()))
    );
}

#[tokio::test]
async fn json_and_small_bodies_fall_through_to_cache() {
    // Candidate responses that must all be rejected despite HTTP 200: a JSON
    // error payload and a tiny non-JSON body.
    let mut routes = Routes::new();
    let json_error = br#"{"error":"arquivo indisponivel no momento, tente novamente mais tarde"}"#;
    routes.insert(
        "/a/dados.csv".to_string(),
        (200, "application/json", json_error.to_vec()),
    );
    routes.insert(
        "/b/dados.csv".to_string(),
        (200, "text/csv", b"too small".to_vec()),
    );
    let addr = spawn_stub_server(routes).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dados.csv"), VALID_CSV).unwrap();

    let config = test_config(addr, dir.path());
    let client = ApiClient::new(config.clone()).unwrap();

    let acquired = fetch::acquire(&client, &config).await.unwrap();
    assert_eq!(acquired.source, DataSource::Cache);
    assert_eq!(acquired.dataset.len(), 4);
}

#[tokio::test]
async fn placeholder_when_every_stage_fails() {
    let addr = spawn_stub_server(Routes::new()).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let client = ApiClient::new(config.clone()).unwrap();

    let acquired = fetch::acquire(&client, &config).await.unwrap();
    assert_eq!(acquired.source, DataSource::Placeholder);

    let ds = &acquired.dataset;
    assert_eq!(
        ds.columns,
        ["Código", "Produto", "Preço", "Estoque", "Categoria"]
    );
    assert_eq!(ds.len(), 3);
    assert_eq!(ds.cell(0, 0), Some(&Cell::Number(1.0)));
    assert_eq!(ds.cell(0, 1), Some(&Cell::Text("Produto A".into())));
    assert_eq!(ds.cell(0, 2), Some(&Cell::Number(100.0)));
    assert_eq!(ds.cell(0, 3), Some(&Cell::Number(10.0)));
    assert_eq!(ds.cell(0, 4), Some(&Cell::Text("Categoria 1".into())));
    assert_eq!(ds.cell(2, 1), Some(&Cell::Text("Produto C".into())));
    assert_eq!(ds.cell(2, 2), Some(&Cell::Number(300.0)));

    // The placeholder is persisted for next time.
    assert!(dir.path().join("dados.csv").exists());
}

#[tokio::test]
async fn corrupted_cache_is_reported_not_replaced() {
    let addr = spawn_stub_server(Routes::new()).await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("dados.csv");
    std::fs::write(&cache, b"a,b\n\xff\xfe,1\n").unwrap();

    let config = test_config(addr, dir.path());
    let client = ApiClient::new(config.clone()).unwrap();

    match fetch::acquire(&client, &config).await {
        Err(PrecoError::CorruptData(path)) => assert_eq!(path, cache),
        other => panic!("expected CorruptData, got {other:?}"),
    }
    // The chain itself never deletes the cache.
    assert!(cache.exists());

    // The explicit re-download path removes it, then fails with nothing
    // reachable.
    let result = fetch::redownload_after_corruption(&client, &config, &cache).await;
    assert!(matches!(result, Err(PrecoError::DataUnavailable)));
    assert!(!cache.exists());
}

#[tokio::test]
async fn refresh_stage_never_falls_back() {
    let addr = spawn_stub_server(Routes::new()).await;

    let dir = tempfile::tempdir().unwrap();
    // A perfectly good cache exists, but the remote-only refresh must not
    // touch it.
    std::fs::write(dir.path().join("dados.csv"), VALID_CSV).unwrap();

    let config = test_config(addr, dir.path());
    let client = ApiClient::new(config.clone()).unwrap();

    assert!(fetch::fetch_remote(&client, &config).await.is_none());
}

#[tokio::test]
async fn login_classifies_blocked_and_invalid() {
    let mut routes = Routes::new();
    routes.insert(
        "/api/login".to_string(),
        (
            200,
            "application/json",
            br#"{"username":"ana","isActive":false}"#.to_vec(),
        ),
    );
    let addr = spawn_stub_server(routes).await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let mut client = ApiClient::new(config.clone()).unwrap();

    let outcome = client
        .login(&Credentials::new("ana".into(), "secret".into()))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Blocked));
    assert!(!client.is_logged_in());

    let mut routes = Routes::new();
    routes.insert(
        "/api/login".to_string(),
        (
            401,
            "application/json",
            br#"{"error":"Senha incorreta"}"#.to_vec(),
        ),
    );
    let addr = spawn_stub_server(routes).await;
    let config = test_config(addr, dir.path());
    let mut client = ApiClient::new(config.clone()).unwrap();

    let outcome = client
        .login(&Credentials::new("ana".into(), "wrong".into()))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
}

#[tokio::test]
async fn unreachable_endpoint_degrades_instead_of_failing() {
    // Bind a port, then drop the listener so connections are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(addr, dir.path());
    let mut client = ApiClient::new(config.clone()).unwrap();

    let outcome = client
        .login(&Credentials::new("ana".into(), "secret".into()))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Unreachable));

    // The status poll swallows the same failure.
    let outcome = client
        .check_status(&Credentials::new("ana".into(), "secret".into()))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Unreachable));
}

#[tokio::test]
async fn empty_credentials_never_reach_the_network() {
    let dir = tempfile::tempdir().unwrap();
    // No server at all: the rejection must happen first.
    let config = AppConfig {
        auth_url: "http://127.0.0.1:1/api/login".to_string(),
        data_dir: Some(dir.path().to_path_buf()),
        ..AppConfig::default()
    };
    let mut client = ApiClient::new(config).unwrap();

    let result = client
        .login(&Credentials::new("".into(), "secret".into()))
        .await;
    assert!(matches!(result, Err(PrecoError::Auth(_))));
}
