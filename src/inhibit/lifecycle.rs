//! Acquire, hold and release the pair of inhibition leases behind one Run.
//!
//! Acquisition happens inline so failures reach the caller. Release happens
//! on a detached task after the requested duration and is only reported
//! through [`crate::ui::emit`], since nobody is waiting for it.

use super::{InhibitBackend, InhibitError, InhibitTarget, Lease};
use crate::config::RunnerConfig;
use crate::runner::{DurationIntent, InvalidMatchId};
use crate::ui::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// "Until disabled" was requested; nothing is inhibited for it yet.
    Indefinite,
    /// Both leases are held and a release is scheduled.
    Held {
        power: Lease,
        screen_saver: Lease,
        duration: Duration,
    },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidMatchId),

    #[error("cannot reach the session bus: {0}")]
    TransportUnavailable(#[source] InhibitError),

    #[error("inhibit request rejected: {source}")]
    AcquisitionFailed {
        target: InhibitTarget,
        #[source]
        source: InhibitError,
    },
}

/// Result of releasing a set of leases, one entry per lease attempted.
#[derive(Debug)]
pub struct ReleaseReport {
    pub results: Vec<(Lease, Result<(), InhibitError>)>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Lease, &InhibitError)> {
        self.results
            .iter()
            .filter_map(|(lease, r)| r.as_ref().err().map(|e| (lease, e)))
    }

    fn report(&self) {
        let leases: Vec<_> = self.results.iter().map(|(lease, _)| lease).collect();
        if self.is_clean() {
            let cookies = leases
                .iter()
                .map(|l| format!("{} {}", l.target, l.cookie))
                .collect::<Vec<_>>()
                .join(" and ");
            emit(
                Level::Success,
                "caffeinate.released",
                &format!("Released inhibition of {}", cookies),
                Some(json!({ "leases": leases })),
            );
            return;
        }

        for (lease, err) in self.failures() {
            emit(
                Level::Error,
                "caffeinate.release_failed",
                &format!(
                    "Failed to release {} cookie {}: {}",
                    lease.target, lease.cookie, err
                ),
                Some(json!({ "lease": lease, "error": err.to_string() })),
            );
        }
    }
}

/// Release two leases concurrently. A failure of one never stops the other.
pub async fn release_pair<B: InhibitBackend + ?Sized>(
    backend: &B,
    first: Lease,
    second: Lease,
) -> ReleaseReport {
    let (a, b) = tokio::join!(backend.uninhibit(first), backend.uninhibit(second));
    ReleaseReport {
        results: vec![(first, a), (second, b)],
    }
}

/// Runs match ids produced by the matcher.
///
/// Cheap to share: every [`Caffeinator::run`] owns its own leases and its own
/// release task, so concurrent runs need no locking.
pub struct Caffeinator<B: InhibitBackend> {
    backend: Arc<B>,
    config: RunnerConfig,
}

impl<B: InhibitBackend> Caffeinator<B> {
    pub fn new(backend: Arc<B>, config: RunnerConfig) -> Self {
        Self { backend, config }
    }

    /// Execute a match.
    ///
    /// Returns as soon as both leases are held; the release happens
    /// `duration` later on a background task that cannot be cancelled.
    pub async fn run(&self, match_id: &str) -> Result<RunOutcome, RunError> {
        let duration = match DurationIntent::from_match_id(match_id)? {
            DurationIntent::Indefinite => {
                emit(
                    Level::Warn,
                    "caffeinate.indefinite",
                    "Caffeinating until disabled is not supported yet, nothing was inhibited",
                    None,
                );
                return Ok(RunOutcome::Indefinite);
            }
            DurationIntent::Fixed(duration) => duration,
        };

        if let Err(e) = self.backend.connect().await {
            emit(
                Level::Error,
                "caffeinate.transport_failed",
                &format!("Cannot reach the session bus: {}", e),
                None,
            );
            return Err(RunError::TransportUnavailable(e));
        }

        let power = self.acquire(InhibitTarget::PowerManagement, duration).await?;
        let screen_saver = match self.acquire(InhibitTarget::ScreenSaver, duration).await {
            Ok(lease) => lease,
            Err(err) => {
                // The power lease must not outlive the failed request.
                match self.backend.uninhibit(power).await {
                    Ok(()) => emit(
                        Level::Info,
                        "caffeinate.rolled_back",
                        &format!("Released {} cookie {}", power.target, power.cookie),
                        None,
                    ),
                    Err(e) => emit(
                        Level::Error,
                        "caffeinate.release_failed",
                        &format!(
                            "Failed to release {} cookie {}: {}",
                            power.target, power.cookie, e
                        ),
                        Some(json!({ "lease": power, "error": e.to_string() })),
                    ),
                }
                return Err(err);
            }
        };

        emit(
            Level::Info,
            "caffeinate.inhibited",
            &format!(
                "Power management inhibited with cookie {} and screen saver with cookie {} for {}ns",
                power.cookie,
                screen_saver.cookie,
                duration.as_nanos()
            ),
            Some(json!({
                "power": power.cookie,
                "screen_saver": screen_saver.cookie,
                "duration_ns": duration.as_nanos().to_string(),
            })),
        );

        self.schedule_release(power, screen_saver, duration);

        Ok(RunOutcome::Held {
            power,
            screen_saver,
            duration,
        })
    }

    async fn acquire(&self, target: InhibitTarget, duration: Duration) -> Result<Lease, RunError> {
        match self
            .backend
            .inhibit(target, &self.config.app_name, &self.config.reason)
            .await
        {
            Ok(cookie) => {
                emit(
                    Level::Debug,
                    "caffeinate.acquired",
                    &format!("{} granted cookie {}", target, cookie),
                    None,
                );
                Ok(Lease { target, cookie })
            }
            Err(source) => {
                emit(
                    Level::Error,
                    "caffeinate.acquire_failed",
                    &format!(
                        "Failed to inhibit {} for {}ns: {}",
                        target,
                        duration.as_nanos(),
                        source
                    ),
                    None,
                );
                Err(RunError::AcquisitionFailed { target, source })
            }
        }
    }

    fn schedule_release(&self, power: Lease, screen_saver: Lease, duration: Duration) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            release_pair(backend.as_ref(), power, screen_saver)
                .await
                .report();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::match_query;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const POWER_COOKIE: u32 = 11;
    const SCREEN_SAVER_COOKIE: u32 = 22;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Connect,
        Inhibit {
            target: InhibitTarget,
            app_name: String,
            reason: String,
        },
        UnInhibit(Lease),
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
        fail_connect: bool,
        fail_inhibit: Option<InhibitTarget>,
        fail_uninhibit: Option<InhibitTarget>,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn uninhibits(&self) -> Vec<Lease> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::UnInhibit(lease) => Some(lease),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl InhibitBackend for RecordingBackend {
        async fn connect(&self) -> Result<(), InhibitError> {
            self.record(Call::Connect);
            if self.fail_connect {
                return Err(InhibitError::Transport("no bus".to_string()));
            }
            Ok(())
        }

        async fn inhibit(
            &self,
            target: InhibitTarget,
            app_name: &str,
            reason: &str,
        ) -> Result<u32, InhibitError> {
            self.record(Call::Inhibit {
                target,
                app_name: app_name.to_string(),
                reason: reason.to_string(),
            });
            if self.fail_inhibit == Some(target) {
                return Err(InhibitError::Call {
                    target,
                    message: "denied".to_string(),
                });
            }
            Ok(match target {
                InhibitTarget::PowerManagement => POWER_COOKIE,
                InhibitTarget::ScreenSaver => SCREEN_SAVER_COOKIE,
            })
        }

        async fn uninhibit(&self, lease: Lease) -> Result<(), InhibitError> {
            self.record(Call::UnInhibit(lease));
            if self.fail_uninhibit == Some(lease.target) {
                return Err(InhibitError::Call {
                    target: lease.target,
                    message: "unknown cookie".to_string(),
                });
            }
            Ok(())
        }
    }

    fn caffeinator(backend: RecordingBackend) -> (Arc<RecordingBackend>, Caffeinator<RecordingBackend>) {
        let backend = Arc::new(backend);
        let caffeinator = Caffeinator::new(Arc::clone(&backend), RunnerConfig::default());
        (backend, caffeinator)
    }

    fn inhibit_call(target: InhibitTarget) -> Call {
        Call::Inhibit {
            target,
            app_name: "Caffeinate".to_string(),
            reason: "user triggered".to_string(),
        }
    }

    fn power_lease() -> Lease {
        Lease {
            target: InhibitTarget::PowerManagement,
            cookie: POWER_COOKIE,
        }
    }

    fn screen_saver_lease() -> Lease {
        Lease {
            target: InhibitTarget::ScreenSaver,
            cookie: SCREEN_SAVER_COOKIE,
        }
    }

    #[tokio::test]
    async fn test_invalid_id_makes_no_calls() {
        let (backend, caffeinator) = caffeinator(RecordingBackend::default());
        for id in ["not-a-number", "", "0", "-20", "1h"] {
            let result = caffeinator.run(id).await;
            assert!(
                matches!(result, Err(RunError::InvalidArgument(_))),
                "id {id:?}"
            );
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_indefinite_has_no_side_effects() {
        let (backend, caffeinator) = caffeinator(RecordingBackend::default());
        let outcome = caffeinator.run("-1").await.unwrap();
        assert_eq!(outcome, RunOutcome::Indefinite);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let (backend, caffeinator) = caffeinator(RecordingBackend {
            fail_connect: true,
            ..Default::default()
        });
        let result = caffeinator.run("1000000000").await;
        assert!(matches!(result, Err(RunError::TransportUnavailable(_))));
        assert_eq!(backend.calls(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn test_power_failure_skips_screen_saver() {
        let (backend, caffeinator) = caffeinator(RecordingBackend {
            fail_inhibit: Some(InhibitTarget::PowerManagement),
            ..Default::default()
        });
        let result = caffeinator.run("1000000000").await;
        assert!(matches!(
            result,
            Err(RunError::AcquisitionFailed {
                target: InhibitTarget::PowerManagement,
                ..
            })
        ));
        assert_eq!(
            backend.calls(),
            vec![Call::Connect, inhibit_call(InhibitTarget::PowerManagement)]
        );
    }

    #[tokio::test]
    async fn test_screen_saver_failure_releases_power_lease() {
        let (backend, caffeinator) = caffeinator(RecordingBackend {
            fail_inhibit: Some(InhibitTarget::ScreenSaver),
            ..Default::default()
        });
        let result = caffeinator.run("1000000000").await;
        assert!(matches!(
            result,
            Err(RunError::AcquisitionFailed {
                target: InhibitTarget::ScreenSaver,
                ..
            })
        ));
        assert_eq!(
            backend.calls(),
            vec![
                Call::Connect,
                inhibit_call(InhibitTarget::PowerManagement),
                inhibit_call(InhibitTarget::ScreenSaver),
                Call::UnInhibit(power_lease()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_then_released_after_duration() {
        let (backend, caffeinator) = caffeinator(RecordingBackend::default());
        let hour = Duration::from_secs(3600);

        let started = tokio::time::Instant::now();
        let outcome = caffeinator.run("3600000000000").await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(
            outcome,
            RunOutcome::Held {
                power: power_lease(),
                screen_saver: screen_saver_lease(),
                duration: hour,
            }
        );
        assert_eq!(
            backend.calls(),
            vec![
                Call::Connect,
                inhibit_call(InhibitTarget::PowerManagement),
                inhibit_call(InhibitTarget::ScreenSaver),
            ]
        );

        tokio::time::sleep(hour - Duration::from_secs(1)).await;
        assert!(backend.uninhibits().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let released = backend.uninhibits();
        assert_eq!(released.len(), 2);
        assert!(released.contains(&power_lease()));
        assert!(released.contains(&screen_saver_lease()));

        tokio::time::sleep(hour * 3).await;
        assert_eq!(backend.uninhibits().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_failure_still_attempts_other_lease() {
        let (backend, caffeinator) = caffeinator(RecordingBackend {
            fail_uninhibit: Some(InhibitTarget::PowerManagement),
            ..Default::default()
        });
        caffeinator.run("60000000000").await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        let released = backend.uninhibits();
        assert_eq!(released.len(), 2);
        assert!(released.contains(&screen_saver_lease()));
    }

    #[tokio::test]
    async fn test_release_pair_reports_each_lease() {
        let backend = RecordingBackend {
            fail_uninhibit: Some(InhibitTarget::ScreenSaver),
            ..Default::default()
        };
        let report = release_pair(&backend, power_lease(), screen_saver_lease()).await;
        assert!(!report.is_clean());
        let failures: Vec<_> = report.failures().map(|(lease, _)| *lease).collect();
        assert_eq!(failures, vec![screen_saver_lease()]);
        assert_eq!(backend.uninhibits().len(), 2);

        let clean = release_pair(&RecordingBackend::default(), power_lease(), screen_saver_lease()).await;
        assert!(clean.is_clean());
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_then_run_one_hour() {
        let (backend, caffeinator) = caffeinator(RecordingBackend::default());
        let matches = match_query("caff 1h");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "3600000000000");
        assert_eq!(matches[0].text, "Caffeinate for 1h");

        caffeinator.run(&matches[0].id).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3601)).await;

        let calls = backend.calls();
        assert_eq!(calls[1], inhibit_call(InhibitTarget::PowerManagement));
        assert_eq!(calls[2], inhibit_call(InhibitTarget::ScreenSaver));
        let released = backend.uninhibits();
        assert!(released.contains(&power_lease()));
        assert!(released.contains(&screen_saver_lease()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_runs_are_independent() {
        let (backend, caffeinator) = caffeinator(RecordingBackend::default());
        let (a, b) = tokio::join!(caffeinator.run("10000000000"), caffeinator.run("20000000000"));
        assert!(a.is_ok() && b.is_ok());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(backend.uninhibits().len(), 2);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.uninhibits().len(), 4);
    }
}
