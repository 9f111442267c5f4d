use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::status::Status;
use crate::timeout;
use crate::Service;

#[derive(Debug, Error)]
#[error("check {id:?} is {status} at startup: {detail}")]
pub struct NotGreenError {
    pub id: String,
    pub status: Status,
    pub detail: String,
}

// Not invoked by the core on its own; a host's start-up hook calls this
// when `ServiceOptions::fail_fast_on_startup` is set.
pub async fn wait_until_green(service: &Service) -> Result<(), NotGreenError> {
    let already_green: std::collections::HashSet<String> = service
        .list_results(Some(Arc::new(|r: &crate::status::CheckResult| {
            r.status == Status::Green
        })))
        .await
        .into_iter()
        .map(|r| r.id)
        .collect();

    for registered in service.list_checks().await {
        if already_green.contains(&registered.check.id) {
            continue;
        }

        info!(check_id = %registered.check.id, "running check synchronously for startup gate");
        let result =
            timeout::run_with_timeout(&registered.check.id, &registered.probe, registered.opts.timeout).await;

        if result.status != Status::Green {
            let detail = result
                .err
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".to_string());
            warn!(check_id = %registered.check.id, status = %result.status, "startup gate failing fast");
            return Err(NotGreenError {
                id: registered.check.id.clone(),
                status: result.status,
                detail,
            });
        }
    }

    Ok(())
}
