use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, info};

use super::error::BrowserError;
use super::instance::BrowserInstance;

/// fixed list handed out in turn, the index is the only thing behind the lock
pub struct RoundRobin<T> {
    items: Vec<T>,
    next: Mutex<usize>,
}

impl<T: Clone> RoundRobin<T> {
    /// None for an empty list, there'd be nothing to hand out
    pub fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            items,
            next: Mutex::new(0),
        })
    }

    pub fn next(&self) -> T {
        let mut next = self.next.lock();
        let item = self.items[*next].clone();
        *next = (*next + 1) % self.items.len();
        item
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

/// a fixed set of chrome processes shared by every resolution. Contexts are cheap, browsers are
/// not, so many resolutions can sit on one instance at the same time
pub struct BrowserPool {
    browsers: RoundRobin<Arc<BrowserInstance>>,
    closed: AtomicBool,
}

impl BrowserPool {
    /// launches `size` browsers at once, if any of them fails the others are closed again
    pub async fn create(size: usize, chrome_path: &Path) -> Result<Self, BrowserError> {
        if size == 0 {
            return Err(BrowserError::LaunchFailed {
                context: "pool size must be at least 1".to_string(),
            });
        }

        info!("launching {} browsers from {}", size, chrome_path.display());

        let launches = (0..size).map(|id| BrowserInstance::launch(id, chrome_path));
        let results = futures::future::join_all(launches).await;

        let mut browsers = Vec::with_capacity(size);
        let mut failure = None;
        for result in results {
            match result {
                Ok(browser) => browsers.push(Arc::new(browser)),
                Err(e) => {
                    error!("browser launch failed: {}", e);
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            for browser in &browsers {
                browser.close().await;
            }
            return Err(e);
        }

        let browsers = RoundRobin::new(browsers).ok_or_else(|| BrowserError::LaunchFailed {
            context: "no browser started".to_string(),
        })?;

        info!("browser pool ready ({} instances)", size);

        Ok(Self {
            browsers,
            closed: AtomicBool::new(false),
        })
    }

    /// never blocks for more than the index lock, the same instance can be lent to many callers
    pub fn lend(&self) -> Arc<BrowserInstance> {
        self.browsers.next()
    }

    pub fn size(&self) -> usize {
        self.browsers.items().len()
    }

    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("shutting down {} browsers", self.size());
        futures::future::join_all(self.browsers.items().iter().map(|b| b.close())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_wraps_around() {
        let rr = RoundRobin::new(vec![0, 1, 2]).unwrap();
        let taken: Vec<i32> = (0..7).map(|_| rr.next()).collect();
        assert_eq!(taken, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn round_robin_rejects_empty_list() {
        assert!(RoundRobin::<u8>::new(Vec::new()).is_none());
    }

    #[test]
    fn round_robin_is_fair_across_threads() {
        let rr = Arc::new(RoundRobin::new(vec![0usize, 1, 2, 3]).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rr = rr.clone();
                std::thread::spawn(move || (0..100).map(|_| rr.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts = [0usize; 4];
        for handle in handles {
            for idx in handle.join().unwrap() {
                counts[idx] += 1;
            }
        }
        assert_eq!(counts, [100, 100, 100, 100]);
    }

    #[tokio::test]
    async fn empty_pool_is_a_launch_error() {
        let err = BrowserPool::create(0, Path::new("/nonexistent/chrome"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BrowserError::LaunchFailed { .. }));
    }

    #[tokio::test]
    async fn missing_binary_fails_the_whole_pool() {
        let err = BrowserPool::create(2, Path::new("/nonexistent/chrome"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BrowserError::LaunchFailed { .. }));
    }
}
