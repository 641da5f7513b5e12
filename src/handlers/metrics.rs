use crate::error::AppError;
use crate::metrics::render;

pub async fn metrics_handler() -> Result<String, AppError> {
    Ok(render()?)
}
