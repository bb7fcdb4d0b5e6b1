// Data Source - the one network call, plus the local JSON loader the server uses

use crate::error::{DashboardError, Result};
use crate::record::Record;
use reqwest::header::ACCEPT;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Endpoint the dashboard reads when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/api/data";

/// GET `endpoint` and decode the JSON array of records.
///
/// Any transport error, non-2xx status or undecodable body is a failure. There is
/// no timeout and no retry.
pub async fn fetch_records(client: &reqwest::Client, endpoint: &str) -> Result<Vec<Record>> {
    info!(%endpoint, "fetching records");

    let response = client
        .get(endpoint)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        warn!(%endpoint, %status, "data service refused request");
        return Err(DashboardError::Status(status));
    }

    let records: Vec<Record> = response.json().await?;
    info!(count = records.len(), "records fetched");
    Ok(records)
}

/// Read a JSON array of records from disk (same format the endpoint serves).
pub fn load_records_file(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path)?;
    let records: Vec<Record> = serde_json::from_str(&content)?;
    info!(path = %path.display(), count = records.len(), "records loaded from file");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request with `status` and `body`; returns the endpoint URL
    async fn serve_once(status: &str, body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/api/data", addr)
    }

    #[test]
    fn test_load_records_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"date":"2024-01-10","produit":"Tomate","prix":3.1,"unite":"kg","marche":"gros","annee":2024}},
                {{"date":"2023-06-01","produit":"Chouchou","prix":1.8,"unite":"kg","marche":"detail","annee":2023}}
            ]"#
        )
        .unwrap();

        let records = load_records_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].product, "Chouchou");
        assert_eq!(records[1].market, "detail");
    }

    #[test]
    fn test_load_records_file_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"not":"an array"}}"#).unwrap();

        assert!(matches!(load_records_file(file.path()), Err(DashboardError::Json(_))));
    }

    #[test]
    fn test_load_records_file_missing() {
        let result = load_records_file(Path::new("/nonexistent/mercuriales.json"));
        assert!(matches!(result, Err(DashboardError::Io(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_endpoint_fails() {
        // Bind then release a port so nothing listens on it
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let endpoint = format!("http://{}/api/data", addr);

        let result = fetch_records(&reqwest::Client::new(), &endpoint).await;
        assert!(matches!(result, Err(DashboardError::Request(_))));
    }

    #[tokio::test]
    async fn test_fetch_records_ok() {
        let endpoint = serve_once(
            "200 OK",
            r#"[{"date":"2024-01-10","produit":"Tomate","prix":3.1,"unite":"kg","marche":"gros","annee":2024}]"#,
        )
        .await;

        let records = fetch_records(&reqwest::Client::new(), &endpoint).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product, "Tomate");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_fails() {
        let endpoint = serve_once("503 Service Unavailable", "").await;

        let result = fetch_records(&reqwest::Client::new(), &endpoint).await;
        assert!(matches!(
            result,
            Err(DashboardError::Status(status)) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn test_fetch_body_not_an_array_fails() {
        let endpoint = serve_once("200 OK", r#"{"not":"an array"}"#).await;

        let result = fetch_records(&reqwest::Client::new(), &endpoint).await;
        assert!(matches!(result, Err(DashboardError::Request(_))));
    }
}
