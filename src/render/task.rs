//! Time-bounded rendering on the tokio blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::model::Node;

use super::markdown::to_markdown;
use super::options::RenderOptions;

/// Render `root` on a blocking thread, giving up after `limit`.
///
/// A render cannot be interrupted: when the limit passes the call returns
/// [`Error::Timeout`] and the finished output, if any, is dropped. A panic
/// inside the render (a malformed tree) is resumed on the caller.
pub async fn render_with_timeout(
    root: Arc<Node>,
    options: RenderOptions,
    limit: Duration,
) -> Result<String> {
    options.validate()?;

    let handle = tokio::task::spawn_blocking(move || to_markdown(&root, &options));
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                std::panic::resume_unwind(join_error.into_panic());
            }
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                join_error.to_string(),
            )))
        }
        Err(_) => {
            warn!(?limit, "render exceeded its time limit");
            Err(Error::Timeout(limit))
        }
    }
}
