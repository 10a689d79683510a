// system-tests/tests/helpers/readiness.rs
// ============================================================================
// Module: Readiness Helpers
// Description: Readiness polling for individually started stub services.
// Purpose: Ensure services are ready without arbitrary sleeps.
// Dependencies: rolebind-bringup, tokio
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use rolebind_bringup::Readiness;
use rolebind_bringup::ServiceHandle;
use tokio::time::sleep;

/// Starts `service` and polls its readiness until ready, failed, or timed out.
pub async fn start_and_wait(service: &dyn ServiceHandle, timeout: Duration) -> Result<(), String> {
    service.start().await.map_err(|err| err.to_string())?;
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match service.readiness().await {
            Readiness::Ready => return Ok(()),
            Readiness::Failed(reason) => {
                return Err(format!("{} failed to start: {reason}", service.name()));
            }
            Readiness::Starting => {
                if start.elapsed() > timeout {
                    return Err(format!(
                        "{} readiness timeout after {attempts} attempts",
                        service.name()
                    ));
                }
                sleep(Duration::from_millis(20)).await;
            }
        }
    }
}
