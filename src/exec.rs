//! Helpers for driving external CLI tools.

use std::sync::LazyLock;

use tokio::sync::Semaphore;

use crate::prelude::*;

/// Semaphore used to limit the number of concurrent `pdftocairo` and
/// `tesseract` processes.
static CPU_SEMAPHORE: LazyLock<Semaphore> =
    LazyLock::new(|| Semaphore::new(num_cpus::get()));

/// Call an async function while holding a permit from the CPU semaphore.
///
/// External conversion tools will happily use 100% of a CPU core each, so we
/// cap how many of them may run at once.
#[instrument(level = "trace", skip_all)]
pub async fn with_cpu_semaphore<Func, Fut, R>(f: Func) -> Result<R>
where
    Func: FnOnce() -> Fut,
    Fut: Future<Output = Result<R>>,
{
    // Acquire a permit from the semaphore.
    let permit = CPU_SEMAPHORE
        .acquire()
        .await
        .context("Could not acquire CPU permit")?;
    // Run the function while holding the permit.
    let result = f().await;
    // Release the permit.
    drop(permit);
    result
}

/// Report any command failures, and include any error output.
///
/// The output of standard error and standard output will be logged at
/// appropriate levels. And standard error may be optionally checked line by
/// line to determine if the command failed.
pub fn check_for_command_failure(
    command_name: &str,
    output: &std::process::Output,
    error_line_check: Option<&dyn Fn(&str) -> bool>,
) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        command_name = command_name,
        output = %stdout,
        "Standard output from command"
    );
    debug!(
        command_name = command_name,
        output = %stderr,
        "Standard error from command",
    );

    if output.status.success() {
        if let Some(check) = error_line_check {
            if stderr.lines().any(check) {
                return Err(anyhow!(
                    "{} printed error output:\n{}",
                    command_name,
                    stderr,
                ));
            }
        }
        Ok(())
    } else if let Some(exit_code) = output.status.code() {
        Err(anyhow!(
            "{} failed with exit code {} and error output:\n{}",
            command_name,
            exit_code,
            stderr,
        ))
    } else {
        Err(anyhow!(
            "{} failed with error output:\n{}",
            command_name,
            stderr,
        ))
    }
}
