//! Runtime helper for spawning dedicated worker loops.

use std::future::Future;
use std::thread;
use tokio::runtime::Builder;

/// Runs `run_loop` to completion on its own OS thread with a
/// current-thread runtime, so workers never depend on (or block) the
/// caller's runtime.
pub(crate) fn spawn_worker_loop<F>(thread_name: &str, run_loop: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let name = thread_name.to_string();
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create Tokio runtime");

            runtime.block_on(run_loop);
        })
        .expect("Failed to spawn worker thread");
}

#[cfg(test)]
mod tests {
    use super::spawn_worker_loop;
    use std::sync::mpsc;

    #[test]
    fn worker_loop_runs_off_the_calling_thread() {
        let (tx, rx) = mpsc::channel();
        spawn_worker_loop("flowplane-test-worker", async move {
            let _ = tx.send(std::thread::current().name().map(str::to_string));
        });

        let worker_name = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("worker ran");
        assert_eq!(worker_name.as_deref(), Some("flowplane-test-worker"));
    }
}
