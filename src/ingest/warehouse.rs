use super::{IngestError, MemorySource};
use crate::data::{DateRange, HireEvent, Station};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

/// HTTP client for the hire-data warehouse
///
/// Endpoints:
/// - `GET {base}/events?start=YYYY-MM-DD&end=YYYY-MM-DD`
/// - `GET {base}/stations`
pub struct WarehouseClient {
    client: Client,
    base_url: Url,
}

impl WarehouseClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IngestError> {
        let client = Client::builder().timeout(timeout).build()?;

        // Url::join drops the last path segment unless it ends in '/'
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Fetch hire events touching the given range
    pub async fn fetch_events(&self, range: &DateRange) -> Result<Vec<HireEvent>, IngestError> {
        let mut url = self.base_url.join("events")?;
        url.query_pairs_mut()
            .append_pair("start", &range.start.to_string())
            .append_pair("end", &range.end.to_string());

        let events: Vec<HireEvent> = self.get_json(url).await?;
        if events.is_empty() {
            return Err(IngestError::Empty("hire events"));
        }
        info!(%range, count = events.len(), "Fetched hire events from warehouse");
        Ok(events)
    }

    /// Fetch station reference data
    pub async fn fetch_stations(&self) -> Result<Vec<Station>, IngestError> {
        let url = self.base_url.join("stations")?;
        let stations: Vec<Station> = self.get_json(url).await?;
        if stations.is_empty() {
            return Err(IngestError::Empty("stations"));
        }
        info!(count = stations.len(), "Fetched stations from warehouse");
        Ok(stations)
    }

    /// Fetch both collections into an in-memory snapshot
    pub async fn snapshot(&self, range: &DateRange) -> Result<MemorySource, IngestError> {
        let (events, stations) = tokio::try_join!(self.fetch_events(range), self.fetch_stations())?;
        Ok(MemorySource::new(events, stations))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, IngestError> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!(%url, %status, "Warehouse request failed");
            return Err(IngestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| IngestError::Json {
            context: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn june_first() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, 2).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_events_sends_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "2016-06-01".into()),
                Matcher::UrlEncoded("end".into(), "2016-06-02".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id":1,"bike_id":3,"start_station_id":1,"end_station_id":2,"start_time":"2016-06-01T08:00:00Z","end_time":"2016-06-01T08:30:00Z","duration_seconds":1800}]"#,
            )
            .create_async()
            .await;

        let client = WarehouseClient::new(&format!("{}/api", server.url()), Duration::from_secs(5)).unwrap();
        let events = client.fetch_events(&june_first()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].end_station_id, 2);
    }

    #[tokio::test]
    async fn test_error_status_maps_to_ingest_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stations")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = WarehouseClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        match client.fetch_stations().await {
            Err(IngestError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_stations_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stations")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = WarehouseClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(matches!(client.fetch_stations().await, Err(IngestError::Empty("stations"))));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            WarehouseClient::new("not a url", Duration::from_secs(1)),
            Err(IngestError::Url(_))
        ));
    }
}
