use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::config::ShipmentIdentity;
use crate::diff::{changed_fields, has_changed};
use crate::error::Result;
use crate::notify::{Notifier, compose};
use crate::tracking::{TrackingRecord, TrackingSource};
use log::{debug, error, info};
use strum_macros::Display;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    #[strum(to_string = "unchanged")]
    Unchanged,
    #[strum(to_string = "notified")]
    Notified,
}

/// Drives fetch, compare and notify for a single shipment.
///
/// Owns the last-seen record. `None` means nothing has been fetched yet,
/// so the first successful fetch always notifies.
pub struct Poller<S, N> {
    source: S,
    notifier: N,
    identity: ShipmentIdentity,
    channel: Option<String>,
    last_seen: Option<TrackingRecord>,
}

impl<S: TrackingSource, N: Notifier> Poller<S, N> {
    pub const fn new(
        source: S,
        notifier: N,
        identity: ShipmentIdentity,
        channel: Option<String>,
    ) -> Self {
        Self {
            source,
            notifier,
            identity,
            channel,
            last_seen: None,
        }
    }

    /// Runs one cycle.
    ///
    /// A failed fetch leaves the last-seen record alone. On a change the
    /// last-seen record is replaced before delivery is attempted, so a
    /// failed delivery is reported but not retried on the next cycle.
    pub fn poll_once(&mut self) -> Result<PollOutcome> {
        let record = self.source.fetch(&self.identity)?;

        if !has_changed(self.last_seen.as_ref(), &record) {
            debug!("No change for {}", self.identity.nickname);
            return Ok(PollOutcome::Unchanged);
        }

        match &self.last_seen {
            Some(previous) => info!(
                "Tracking update for {}: {} changed",
                self.identity.nickname,
                changed_fields(previous, &record).join(", ")
            ),
            None => info!("First tracking update for {}", self.identity.nickname),
        }

        let payload = compose(&self.identity, &record, self.channel.as_deref());
        self.last_seen = Some(record);
        self.notifier.deliver(&payload)?;
        Ok(PollOutcome::Notified)
    }

    /// Polls immediately and then once per `interval` until `shutdown`
    /// receives a message or its sender is dropped. Failed cycles are
    /// logged and the loop carries on.
    pub fn run(&mut self, interval: Duration, shutdown: &Receiver<()>) {
        info!(
            "Tracking {} every {}s",
            self.identity.nickname,
            interval.as_secs()
        );

        loop {
            match self.poll_once() {
                Ok(outcome) => debug!("Poll finished: {outcome}"),
                Err(e) if e.retried_next_poll() => {
                    error!("Poll failed, retrying next interval: {e}")
                }
                Err(e) => error!("Notification dropped: {e}"),
            }

            match shutdown.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("Stopped tracking {}", self.identity.nickname);
    }
}
