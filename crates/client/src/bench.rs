use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use kbctl_core::Statement;

use crate::dispatch::{success_predicate, Dispatcher};
use crate::error::{ClientError, Result};
use crate::http::{HttpClient, Mode, Response};
use crate::transport::Transport;

/// Aggregate of one benchmark run, recomputed from the raw response list.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchSummary {
    pub duration: Duration,
    pub total_commands: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl BenchSummary {
    fn from_responses(
        stmt: &Statement,
        duration: Duration,
        responses: &[Response],
    ) -> BenchSummary {
        let predicate = success_predicate(stmt.kind);
        let success_count = responses.iter().filter(|r| predicate(r)).count() as u64;
        let total_commands = responses.len() as u64;
        BenchSummary {
            duration,
            total_commands,
            success_count,
            failure_count: total_commands - success_count,
        }
    }

    pub fn qps(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_commands as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives repeated executions of one nested statement, sequentially or
/// across a fixed pool of workers. Workers share only the immutable
/// transport configuration plus a copy of the session token; each owns its
/// own client, so no state is shared mid-run.
pub struct BenchRunner {
    transport: Transport,
    token: Option<String>,
    mode: Mode,
}

impl BenchRunner {
    pub fn new(transport: Transport, token: Option<String>, mode: Mode) -> Self {
        BenchRunner {
            transport,
            token,
            mode,
        }
    }

    fn worker_dispatcher(&self) -> Result<Dispatcher> {
        let mut http = HttpClient::new(self.transport.clone())?;
        http.set_token(self.token.clone());
        Ok(Dispatcher::new(http, self.mode))
    }

    pub fn run(&self, stmt: &Statement, concurrency: u64, iterations: u64) -> Result<BenchSummary> {
        if concurrency == 0 {
            return Err(ClientError::InvalidArgument(
                "concurrency must be at least 1".into(),
            ));
        }
        info!(
            command = stmt.kind.as_str(),
            concurrency, iterations, "starting benchmark"
        );
        if concurrency == 1 {
            self.run_sequential(stmt, iterations)
        } else {
            self.run_concurrent(stmt, concurrency, iterations)
        }
    }

    fn run_sequential(&self, stmt: &Statement, iterations: u64) -> Result<BenchSummary> {
        let dispatcher = self.worker_dispatcher()?;
        // A dispatcher with native batching for this command is authoritative
        // for the whole run.
        if let Some((duration, responses)) = dispatcher.execute_batch(stmt, iterations)? {
            debug!("dispatcher handled the batch natively");
            return Ok(BenchSummary::from_responses(stmt, duration, &responses));
        }
        let started = Instant::now();
        let mut responses = Vec::with_capacity(iterations as usize);
        for _ in 0..iterations {
            responses.push(dispatcher.call(stmt).unwrap_or_else(|_| Response::failed()));
        }
        Ok(BenchSummary::from_responses(
            stmt,
            started.elapsed(),
            &responses,
        ))
    }

    fn run_concurrent(
        &self,
        stmt: &Statement,
        concurrency: u64,
        iterations: u64,
    ) -> Result<BenchSummary> {
        let started = Instant::now();
        let mut handles = Vec::with_capacity(concurrency as usize);
        for worker in 0..concurrency {
            let stmt = stmt.clone();
            let transport = self.transport.clone();
            let token = self.token.clone();
            let mode = self.mode;
            handles.push(thread::spawn(move || {
                let mut responses = Vec::with_capacity(iterations as usize);
                let dispatcher = HttpClient::new(transport).map(|mut http| {
                    http.set_token(token);
                    Dispatcher::new(http, mode)
                });
                match dispatcher {
                    Ok(dispatcher) => {
                        for _ in 0..iterations {
                            responses
                                .push(dispatcher.call(&stmt).unwrap_or_else(|_| Response::failed()));
                        }
                    }
                    Err(_) => {
                        responses.resize_with(iterations as usize, Response::failed);
                    }
                }
                debug!(worker, "worker finished");
                responses
            }));
        }
        let mut responses = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(worker_responses) => responses.extend(worker_responses),
                // A panicked worker still has to account for its share.
                Err(_) => responses.resize(responses.len() + iterations as usize, Response::failed()),
            }
        }
        // Wall clock across the whole concurrent phase, not per worker.
        Ok(BenchSummary::from_responses(
            stmt,
            started.elapsed(),
            &responses,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbctl_core::CommandKind;

    fn ping() -> Statement {
        Statement::new(CommandKind::PingServer)
    }

    fn pong() -> Response {
        Response {
            status: 200,
            body: b"pong".to_vec(),
            headers: Default::default(),
        }
    }

    #[test]
    fn counts_partition_the_total() {
        let responses = vec![pong(), Response::failed(), pong(), Response::failed()];
        let summary =
            BenchSummary::from_responses(&ping(), Duration::from_secs(2), &responses);
        assert_eq!(summary.total_commands, 4);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failure_count, 2);
        assert_eq!(
            summary.success_count + summary.failure_count,
            summary.total_commands
        );
    }

    #[test]
    fn qps_is_total_over_duration() {
        let responses = vec![pong(); 10];
        let summary =
            BenchSummary::from_responses(&ping(), Duration::from_secs(2), &responses);
        assert!((summary.qps() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_duration_means_zero_qps() {
        let summary = BenchSummary::from_responses(&ping(), Duration::ZERO, &[pong()]);
        assert_eq!(summary.qps(), 0.0);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let runner = BenchRunner::new(Transport::default(), None, Mode::User);
        let err = runner.run(&ping(), 0, 10).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn all_transport_failures_complete_the_run() {
        // Port 1 on localhost refuses connections immediately.
        let mut transport = Transport::new("127.0.0.1", 1);
        transport.timeout = Duration::from_millis(500);
        let runner = BenchRunner::new(transport, None, Mode::User);
        let summary = runner.run(&ping(), 2, 3).unwrap();
        assert_eq!(summary.total_commands, 6);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.failure_count, 6);
    }

    #[test]
    fn json_statements_count_failures_from_envelopes() {
        let stmt = Statement::new(CommandKind::ListUserDatasets);
        let ok = Response {
            status: 200,
            body: br#"{"code":0,"data":[]}"#.to_vec(),
            headers: Default::default(),
        };
        let summary = BenchSummary::from_responses(
            &stmt,
            Duration::from_secs(1),
            &[ok, Response::failed()],
        );
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failure_count, 1);
    }
}
