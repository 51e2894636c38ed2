// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard supervisor.
//!
//! While the session is `Connected`, the dashboard reports the device
//! location once and polls fitness data on a fixed interval (first poll
//! immediately). Any session state change ends the current activation;
//! a later `Connected` starts a fresh one with its own location report.

use crate::models::SessionState;
use crate::services::location::LocationReporter;
use crate::services::poller::FitnessPoller;
use crate::services::session::AuthSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Dashboard {
    session: Arc<AuthSession>,
    poller: Arc<FitnessPoller>,
    reporter: Arc<LocationReporter>,
    interval: Duration,
}

/// Running supervisor. Dropping the handle stops it.
pub struct DashboardHandle {
    task: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the supervisor and wait for it to unwind.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

impl Dashboard {
    pub fn new(
        session: Arc<AuthSession>,
        poller: Arc<FitnessPoller>,
        reporter: Arc<LocationReporter>,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            poller,
            reporter,
            interval,
        }
    }

    pub fn spawn(self) -> DashboardHandle {
        let task = tokio::spawn(self.supervise());
        DashboardHandle { task: Some(task) }
    }

    async fn supervise(self) {
        let mut state_rx = self.session.subscribe();

        loop {
            let state = *state_rx.borrow_and_update();
            if state != SessionState::Connected {
                if state_rx.changed().await.is_err() {
                    break;
                }
                continue;
            }

            let keep_running = self.activate(&mut state_rx).await;

            if !self.session.is_connected() {
                tracing::info!("Session ended, clearing dashboard");
                self.poller.clear();
            }
            if !keep_running {
                break;
            }
        }

        tracing::debug!("Dashboard supervisor stopped");
    }

    /// One connected period. Returns false once the session is gone for good.
    async fn activate(&self, state_rx: &mut watch::Receiver<SessionState>) -> bool {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Session connected, starting dashboard"
        );

        let reporter = Arc::clone(&self.reporter);
        tokio::spawn(async move {
            let outcome = reporter.report_once().await;
            tracing::debug!(?outcome, "Location report finished");
        });

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(token) = self.session.access_token() else {
                        return true;
                    };
                    // Failures are already on the view and in the logs.
                    let _ = self.poller.poll(&token).await;
                }
                changed = state_rx.changed() => {
                    return changed.is_ok();
                }
            }
        }
    }
}
