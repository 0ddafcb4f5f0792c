use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{info, warn};

use super::Festival;
use crate::config::SourceConfig;
use crate::error::LoadError;

const USER_AGENT: &str = concat!("festival-calendar/", env!("CARGO_PKG_VERSION"));

/// Fetches one year of festival data and reshapes it for the configured months.
#[derive(Debug, Clone)]
pub struct FestivalLoader {
    client: reqwest::Client,
    endpoint: String,
    months: Vec<String>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl FestivalLoader {
    pub fn new(source: &SourceConfig, months: Vec<String>) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()
            .map_err(|e| LoadError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: source.endpoint.clone(),
            months,
            max_retries: source.max_retries,
            retry_backoff: Duration::from_millis(source.retry_backoff_ms),
        })
    }

    pub fn url_for(&self, year: i32) -> String {
        self.endpoint.replace("{year}", &year.to_string())
    }

    pub async fn fetch_festivals(&self, year: i32) -> Result<Vec<Festival>, LoadError> {
        let url = self.url_for(year);
        let mut attempt = 0;
        loop {
            info!(%url, attempt, "fetching festival data");
            match self.fetch_once(&url).await {
                Ok(festivals) => {
                    info!(count = festivals.len(), "festival data loaded");
                    return Ok(festivals);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("fetch failed ({}), retrying in {:?}", e, self.retry_backoff);
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<Festival>, LoadError> {
        let response = self.client.get(url).send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(transport_error)?;
        decode_payload(&body, &self.months)
    }
}

fn transport_error(e: reqwest::Error) -> LoadError {
    if e.is_timeout() {
        LoadError::Timeout
    } else {
        LoadError::Http(e)
    }
}

/// One element of a month array, as the data source sends it.
#[derive(Debug, Deserialize)]
struct RawDay {
    #[serde(default, deserialize_with = "null_as_default")]
    np: String,
    #[serde(default, deserialize_with = "null_as_default")]
    en: String,
    #[serde(default, deserialize_with = "null_as_default")]
    tithi: String,
    #[serde(default, deserialize_with = "null_as_default")]
    event: String,
    day: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    specialday: String,
    #[serde(default, deserialize_with = "null_as_default")]
    holiday: bool,
}

impl RawDay {
    fn into_festival(self, month: &str) -> Festival {
        Festival {
            np: self.np,
            en: self.en,
            tithi: self.tithi,
            event: self.event,
            day: self.day,
            specialday: self.specialday,
            holiday: self.holiday,
            month: month.to_string(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a year payload into festivals for `months`, in month order then
/// source order. Missing months are empty; malformed days are skipped.
pub fn decode_payload(body: &str, months: &[String]) -> Result<Vec<Festival>, LoadError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|e| LoadError::Decode(e.to_string()))?;
    let Value::Object(by_month) = payload else {
        return Err(LoadError::Decode(
            "expected an object keyed by month name".to_string(),
        ));
    };

    let mut festivals = Vec::new();
    for month in months {
        let days = match by_month.get(month) {
            None | Some(Value::Null) => {
                warn!(month = %month, "month missing from payload");
                continue;
            }
            Some(Value::Array(days)) => days,
            Some(_) => {
                warn!(month = %month, "month entry is not an array, skipping");
                continue;
            }
        };

        for (index, raw) in days.iter().enumerate() {
            match RawDay::deserialize(raw) {
                Ok(day) => festivals.push(day.into_festival(month)),
                Err(e) => warn!(month = %month, index, "skipping malformed day: {}", e),
            }
        }
    }

    Ok(festivals)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn months(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const PAYLOAD_2073: &str = r#"{
        "Ashwin": [{"np":"1","en":"17","tithi":"","event":"","day":1,"specialday":"","holiday":false}],
        "Kartik": [{"np":"1","en":"18","tithi":"Purnima","event":"Holiday X","day":1,"specialday":"","holiday":true}]
    }"#;

    #[test]
    fn stamps_each_day_with_its_month() {
        let festivals = decode_payload(PAYLOAD_2073, &months(&["Ashwin", "Kartik"])).unwrap();
        assert_eq!(festivals.len(), 2);
        assert_eq!(festivals[0].month, "Ashwin");
        assert_eq!(festivals[0].en, "17");
        assert!(!festivals[0].holiday);
        assert_eq!(festivals[1].month, "Kartik");
        assert_eq!(festivals[1].tithi, "Purnima");
        assert_eq!(festivals[1].event, "Holiday X");
        assert!(festivals[1].holiday);
    }

    #[test]
    fn only_configured_months_in_configured_order() {
        let festivals = decode_payload(PAYLOAD_2073, &months(&["Kartik"])).unwrap();
        assert_eq!(festivals.len(), 1);
        assert_eq!(festivals[0].month, "Kartik");

        let festivals = decode_payload(PAYLOAD_2073, &months(&["Kartik", "Ashwin"])).unwrap();
        let order: Vec<_> = festivals.iter().map(|f| f.month.as_str()).collect();
        assert_eq!(order, vec!["Kartik", "Ashwin"]);
    }

    #[test]
    fn missing_month_is_empty_not_an_error() {
        let body = r#"{"Ashwin":[{"np":"1","en":"17","tithi":"","event":"","day":1,"specialday":"","holiday":false}]}"#;
        let festivals = decode_payload(body, &months(&["Ashwin", "Kartik"])).unwrap();
        assert_eq!(festivals.len(), 1);
        assert_eq!(festivals[0].month, "Ashwin");
    }

    #[test]
    fn missing_and_null_fields_default() {
        let body = r#"{"Ashwin":[{"day":4},{"np":"5","event":null,"holiday":null,"day":5}]}"#;
        let festivals = decode_payload(body, &months(&["Ashwin"])).unwrap();
        assert_eq!(festivals.len(), 2);
        assert_eq!(festivals[0].np, "");
        assert_eq!(festivals[0].specialday, "");
        assert!(!festivals[0].holiday);
        assert_eq!(festivals[1].np, "5");
        assert_eq!(festivals[1].event, "");
    }

    #[test]
    fn malformed_days_are_skipped() {
        let body = r#"{"Ashwin":[{"np":"1","day":1},"junk",{"np":"3"},{"np":"4","day":"four"},{"np":"5","day":5}]}"#;
        let festivals = decode_payload(body, &months(&["Ashwin"])).unwrap();
        let days: Vec<_> = festivals.iter().map(|f| f.day).collect();
        assert_eq!(days, vec![1, 5]);
    }

    #[test]
    fn non_array_month_is_skipped() {
        let body = r#"{"Ashwin":{"np":"1"},"Kartik":[{"day":1}]}"#;
        let festivals = decode_payload(body, &months(&["Ashwin", "Kartik"])).unwrap();
        assert_eq!(festivals.len(), 1);
        assert_eq!(festivals[0].month, "Kartik");
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(
            decode_payload("[]", &months(&["Ashwin"])),
            Err(LoadError::Decode(_))
        ));
        assert!(matches!(
            decode_payload("<html>", &months(&["Ashwin"])),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn url_substitutes_year() {
        let loader = FestivalLoader::new(&SourceConfig::default(), months(&["Ashwin"])).unwrap();
        assert_eq!(
            loader.url_for(2073),
            "https://bibhuticoder.github.io/nepali-calendar-api/api/2073.json"
        );
    }

    #[test]
    fn only_transient_errors_retry() {
        assert!(LoadError::Timeout.is_retryable());
        assert!(LoadError::Status(503).is_retryable());
        assert!(!LoadError::Status(404).is_retryable());
        assert!(!LoadError::Decode("bad".to_string()).is_retryable());
    }

    /// Local source answering connection N with `statuses[N]`, repeating the
    /// last one. Returns the config pointing at it and a connection counter.
    async fn scripted_source(statuses: Vec<u16>) -> (SourceConfig, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses.get(n).or(statuses.last()).copied().unwrap_or(500);
                let body = if status == 200 { PAYLOAD_2073 } else { "" };

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buf[..read]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let source = SourceConfig {
            endpoint: format!("http://{}/api/{{year}}.json", addr),
            timeout_secs: 5,
            max_retries: 2,
            retry_backoff_ms: 1,
        };
        (source, hits)
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let (source, hits) = scripted_source(vec![503, 503, 200]).await;
        let loader = FestivalLoader::new(&source, months(&["Ashwin", "Kartik"])).unwrap();

        let festivals = loader.fetch_festivals(2073).await.unwrap();
        assert_eq!(festivals.len(), 2);
        assert_eq!(festivals[1].event, "Holiday X");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_retries() {
        let (mut source, hits) = scripted_source(vec![503, 503, 200]).await;
        source.max_retries = 1;
        let loader = FestivalLoader::new(&source, months(&["Ashwin"])).unwrap();

        let result = loader.fetch_festivals(2073).await;
        assert!(matches!(result, Err(LoadError::Status(503))));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (source, hits) = scripted_source(vec![404, 200]).await;
        let loader = FestivalLoader::new(&source, months(&["Ashwin"])).unwrap();

        let result = loader.fetch_festivals(2073).await;
        assert!(matches!(result, Err(LoadError::Status(404))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
