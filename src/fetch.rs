use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::calendar::{Festival, FestivalLoader};
use crate::error::LoadError;

pub type FetchResult = Result<Vec<Festival>, LoadError>;

/// A festival fetch running on the runtime, aborted when dropped.
pub struct FetchTask {
    handle: JoinHandle<()>,
    rx: oneshot::Receiver<FetchResult>,
}

impl FetchTask {
    pub fn spawn(runtime: &Handle, loader: FestivalLoader, year: i32) -> Self {
        let (tx, rx) = oneshot::channel();
        let handle = runtime.spawn(async move {
            let result = loader.fetch_festivals(year).await;
            let _ = tx.send(result);
        });
        Self { handle, rx }
    }

    /// Non-blocking check for the outcome. Yields `Some` exactly once.
    pub fn poll(&mut self) -> Option<FetchResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(LoadError::Client(
                "fetch task ended without a result".to_string(),
            ))),
        }
    }
}

impl Drop for FetchTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::SourceConfig;

    #[test]
    fn unreachable_source_reports_failure() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let source = SourceConfig {
            endpoint: "http://127.0.0.1:9/{year}.json".to_string(),
            timeout_secs: 2,
            max_retries: 0,
            retry_backoff_ms: 0,
        };
        let loader = FestivalLoader::new(&source, vec!["Ashwin".to_string()]).unwrap();
        let mut task = FetchTask::spawn(runtime.handle(), loader, 2073);

        let mut outcome = None;
        for _ in 0..100 {
            if let Some(result) = task.poll() {
                outcome = Some(result);
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(matches!(outcome, Some(Err(_))));
    }

    #[tokio::test]
    async fn dropping_the_task_aborts_the_fetch() {
        // Accepts the request but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let source = SourceConfig {
            endpoint: format!("http://{}/{{year}}.json", listener.local_addr().unwrap()),
            timeout_secs: 30,
            max_retries: 0,
            retry_backoff_ms: 0,
        };
        let loader = FestivalLoader::new(&source, vec!["Ashwin".to_string()]).unwrap();
        let task = FetchTask::spawn(&Handle::current(), loader, 2073);
        let abort = task.handle.abort_handle();

        let (mut socket, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = socket.read(&mut buf).await.unwrap();
            assert!(read > 0, "client hung up before sending a request");
            request.extend_from_slice(&buf[..read]);
        }

        drop(task);

        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "connection still open after the task was dropped");
        assert!(abort.is_finished());
    }
}
