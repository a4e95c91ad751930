pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub(crate) type BoxResult<T> = Result<T, BoxError>;

#[cfg(test)]
pub(crate) use test_utils::*;

#[cfg(test)]
mod test_utils {
    use std::{path::Path, time::Duration};

    use tokio::task::JoinHandle;

    /// make sure to abort a task on drop, so that it's easier to
    /// do assertion in tests with less worry about cleaning up
    pub(crate) struct AbortHdl<T>(pub(crate) JoinHandle<T>);

    impl<T> Drop for AbortHdl<T> {
        fn drop(&mut self) {
            self.0.abort()
        }
    }

    /// poll the file until it holds exactly `expected`, or give up after a few seconds
    pub(crate) async fn wait_for_contents(path: &Path, expected: &str) -> String {
        let mut last = String::new();
        for _ in 0..100 {
            last = tokio::fs::read_to_string(path).await.unwrap_or_default();
            if last == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        last
    }
}
