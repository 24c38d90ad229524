use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use tokio::fs;

use crate::core::bluetooth::RadioError;

/// Asynchronously ensures that a directory exists, creating it if it does not.
/// This function is idempotent.
pub async fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        if let Err(e) = fs::create_dir_all(path).await {
            error!("Failed to create directory at {:?}: {}", path, e);
            return Err(e.into());
        }
        info!("Created directory at: {:?}", path);
    }
    Ok(())
}

/// Runs a radio operation under an optional deadline. `None` leaves timing to the platform stack.
pub async fn with_timeout<T, F>(limit: Option<Duration>, operation: &'static str, fut: F) -> Result<T, RadioError>
where
    F: Future<Output = Result<T, RadioError>>,
{
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| RadioError::Timeout { operation, after })?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_turns_into_timeout_error() {
        let result: Result<(), RadioError> = with_timeout(
            Some(Duration::from_millis(20)),
            "write",
            std::future::pending(),
        )
        .await;
        assert!(matches!(result, Err(RadioError::Timeout { operation: "write", .. })));
    }

    #[tokio::test]
    async fn no_deadline_passes_result_through() {
        let result = with_timeout(None, "connect", async { Ok::<_, RadioError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn creates_nested_directories() {
        let dir = std::env::temp_dir().join(format!("rc-remote-utils-{}", std::process::id())).join("a/b");
        ensure_directory_exists(&dir).await.unwrap();
        assert!(dir.is_dir());
        ensure_directory_exists(&dir).await.unwrap();
        let _ = std::fs::remove_dir_all(dir.parent().unwrap().parent().unwrap());
    }
}
