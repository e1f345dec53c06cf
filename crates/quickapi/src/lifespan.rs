//! Startup and shutdown hooks.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use common::AppResult;

use crate::errors::ServeError;

/// When a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifespanEvent {
    /// Before the listener is bound
    Startup,
    /// After the server has stopped accepting connections and drained
    Shutdown,
}

type HookFn = dyn Fn() -> BoxFuture<'static, AppResult<()>> + Send + Sync;

/// A named async hook.
#[derive(Clone)]
pub struct LifespanHook {
    name: String,
    hook: Arc<HookFn>,
}

impl LifespanHook {
    pub fn new<F, Fut>(name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            hook: Arc::new(move || -> BoxFuture<'static, AppResult<()>> { Box::pin(hook()) }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self) -> AppResult<()> {
        (self.hook)().await
    }
}

impl std::fmt::Debug for LifespanHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LifespanHook").field(&self.name).finish()
    }
}

/// Run startup hooks in order. The first failure aborts.
pub(crate) async fn run_startup(hooks: &[LifespanHook]) -> Result<(), ServeError> {
    for hook in hooks {
        tracing::debug!(hook = hook.name(), "running startup hook");
        hook.run().await.map_err(|source| ServeError::Startup {
            hook: hook.name().to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Run every shutdown hook in order, logging failures.
pub(crate) async fn run_shutdown(hooks: &[LifespanHook]) {
    for hook in hooks {
        tracing::debug!(hook = hook.name(), "running shutdown hook");
        if let Err(e) = hook.run().await {
            tracing::error!(hook = hook.name(), error = %e, "shutdown hook failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AppError;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &'static str, fail: bool) -> LifespanHook {
        let log = log.clone();
        LifespanHook::new(name, move || {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name.to_string());
                if fail {
                    Err(AppError::internal("boom"))
                } else {
                    Ok(())
                }
            }
        })
    }

    #[tokio::test]
    async fn test_startup_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = vec![
            recording(&log, "db", false),
            recording(&log, "cache", true),
            recording(&log, "never", false),
        ];

        let err = run_startup(&hooks).await.unwrap_err();
        assert!(matches!(err, ServeError::Startup { ref hook, .. } if hook == "cache"));
        assert_eq!(*log.lock().unwrap(), vec!["db", "cache"]);
    }

    #[tokio::test]
    async fn test_shutdown_runs_every_hook() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks = vec![recording(&log, "flush", true), recording(&log, "close", false)];

        run_shutdown(&hooks).await;
        assert_eq!(*log.lock().unwrap(), vec!["flush", "close"]);
    }
}
