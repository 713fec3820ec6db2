//! Authentication Gate
//!
//! Simulated sign-in in front of the dashboard. There is no credential check:
//! any well-formed submission succeeds after a fixed delay. The gate also
//! reports whether the VPN command-line tool is installed.
//!
//! # Invariants
//! - The CLI probe runs at most once per gate.
//! - A probe failure or timeout reads as "not available"; it never surfaces
//!   as an error.
//! - At most one submission is pending at a time.
//! - `teardown()` cancels a pending submission; it resolves `Cancelled`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::probe::CliProbe;
use super::types::{is_email_shaped, AuthError, Identity, PrerequisiteStatus};
use crate::config::AuthSettings;

/// Clears the busy flag when the submission ends, including when the
/// submitting future is dropped
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AuthGate {
    probe: Arc<dyn CliProbe>,
    login_delay: Duration,
    probe_timeout: Duration,
    download_url: String,
    prerequisite: OnceCell<bool>,
    busy: AtomicBool,
    cancel: CancellationToken,
}

impl AuthGate {
    pub fn new(probe: Arc<dyn CliProbe>, settings: &AuthSettings) -> Self {
        Self {
            probe,
            login_delay: Duration::from_millis(settings.login_delay_ms),
            probe_timeout: Duration::from_millis(settings.probe_timeout_ms),
            download_url: settings.cli_download_url.clone(),
            prerequisite: OnceCell::new(),
            busy: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Whether the VPN CLI is installed. The probe runs on the first call;
    /// later calls return the cached answer.
    pub async fn check_prerequisite(&self) -> bool {
        *self
            .prerequisite
            .get_or_init(|| async {
                match tokio::time::timeout(self.probe_timeout, self.probe.is_available()).await {
                    Ok(Ok(available)) => {
                        info!("VPN CLI available: {}", available);
                        available
                    }
                    Ok(Err(e)) => {
                        warn!("VPN CLI probe failed, treating as not installed: {}", e);
                        false
                    }
                    Err(_) => {
                        warn!(
                            "VPN CLI probe timed out after {:?}, treating as not installed",
                            self.probe_timeout
                        );
                        false
                    }
                }
            })
            .await
    }

    pub fn prerequisite_status(&self) -> PrerequisiteStatus {
        match self.prerequisite.get() {
            None => PrerequisiteStatus::Unknown,
            Some(true) => PrerequisiteStatus::Available,
            Some(false) => PrerequisiteStatus::Missing {
                download_url: self.download_url.clone(),
            },
        }
    }

    /// Whether a submission is pending (submit control disabled)
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Simulated sign-in round trip
    pub async fn submit(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim();
        if !is_email_shaped(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        if self.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sign-in rejected: submission already pending");
            return Err(AuthError::Pending);
        }
        let _busy = BusyGuard(&self.busy);

        debug!("Sign-in submitted for {}", email);
        tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Sign-in for {} cancelled", email);
                Err(AuthError::Cancelled)
            }
            _ = tokio::time::sleep(self.login_delay) => {
                info!("Signed in as {}", email);
                Ok(Identity::new(email))
            }
        }
    }

    /// Cancel any pending submission. The gate rejects submissions afterwards.
    pub fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Authentication gate torn down");
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::probe::{ProbeError, StaticProbe};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingProbe {
        calls: AtomicUsize,
        answer: bool,
    }

    #[async_trait]
    impl CliProbe for CountingProbe {
        async fn is_available(&self) -> Result<bool, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl CliProbe for FailingProbe {
        async fn is_available(&self) -> Result<bool, ProbeError> {
            Err(ProbeError::Unavailable("host bridge not ready".to_string()))
        }
    }

    struct StalledProbe;

    #[async_trait]
    impl CliProbe for StalledProbe {
        async fn is_available(&self) -> Result<bool, ProbeError> {
            std::future::pending().await
        }
    }

    fn gate(probe: Arc<dyn CliProbe>) -> AuthGate {
        AuthGate::new(probe, &AuthSettings::default())
    }

    #[tokio::test]
    async fn test_probe_runs_once() {
        let probe = Arc::new(CountingProbe {
            calls: AtomicUsize::new(0),
            answer: true,
        });
        let gate = gate(probe.clone());
        assert_eq!(gate.prerequisite_status(), PrerequisiteStatus::Unknown);

        assert!(gate.check_prerequisite().await);
        assert!(gate.check_prerequisite().await);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.prerequisite_status(), PrerequisiteStatus::Available);
    }

    #[tokio::test]
    async fn test_probe_failure_reads_as_missing() {
        let gate = gate(Arc::new(FailingProbe));
        assert!(!gate.check_prerequisite().await);
        assert_eq!(
            gate.prerequisite_status(),
            PrerequisiteStatus::Missing {
                download_url: "https://nordvpn.com/download/linux/".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_probe_times_out_as_missing() {
        let gate = gate(Arc::new(StalledProbe));
        let started = tokio::time::Instant::now();

        assert!(!gate.check_prerequisite().await);
        assert!(started.elapsed() >= Duration::from_millis(5000));
        assert!(matches!(gate.prerequisite_status(), PrerequisiteStatus::Missing { .. }));
        assert!(gate.prerequisite_status().is_definite());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_succeeds_after_delay() {
        let gate = gate(Arc::new(StaticProbe(false)));
        let started = tokio::time::Instant::now();

        let identity = gate.submit(" user@example.com ", "hunter2").await.unwrap();
        assert_eq!(identity.email, "user@example.com");
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn test_submit_validates_input() {
        let gate = gate(Arc::new(StaticProbe(true)));
        assert_eq!(gate.submit("not-an-email", "pw").await, Err(AuthError::InvalidEmail));
        assert_eq!(gate.submit("user@example.com", "").await, Err(AuthError::EmptyPassword));
        assert!(!gate.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_rejected() {
        let gate = Arc::new(gate(Arc::new(StaticProbe(true))));

        let pending = tokio::spawn({
            let gate = gate.clone();
            async move { gate.submit("user@example.com", "pw").await }
        });
        tokio::task::yield_now().await;
        assert!(gate.is_busy());

        assert_eq!(gate.submit("other@example.com", "pw").await, Err(AuthError::Pending));

        let identity = pending.await.unwrap().unwrap();
        assert_eq!(identity.email, "user@example.com");
        assert!(!gate.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_submission() {
        let gate = Arc::new(gate(Arc::new(StaticProbe(true))));

        let pending = tokio::spawn({
            let gate = gate.clone();
            async move { gate.submit("user@example.com", "pw").await }
        });
        tokio::task::yield_now().await;
        assert!(gate.is_busy());

        gate.teardown();
        assert_eq!(pending.await.unwrap(), Err(AuthError::Cancelled));
        assert!(!gate.is_busy());
        assert!(gate.is_torn_down());

        assert_eq!(gate.submit("user@example.com", "pw").await, Err(AuthError::Cancelled));
    }
}
