//! Host leaderboard
//!
//! Ranking is done entirely by the host. The client sends a request tagged
//! with a correlation id and hands back a future that resolves with the
//! entries, or with `Timeout` once the deadline passes.

use std::collections::HashMap;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::consts::LEADERBOARD_TIMEOUT_MS;
use crate::platform::{HostChannel, HostError, OutboundMessage};

/// Longest name shown before truncation
pub const MAX_NAME_CHARS: usize = 12;

/// A single ranked row, as supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "level", default)]
    pub level_reached: u32,
    #[serde(rename = "coins", default)]
    pub currency: u64,
}

/// Why a leaderboard request produced no entries
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("leaderboard request timed out")]
    Timeout,
    #[error("leaderboard request was cancelled")]
    Cancelled,
    #[error("could not send leaderboard request: {0}")]
    Send(#[from] HostError),
}

pub type LeaderboardOutcome = Result<Vec<LeaderboardEntry>, LeaderboardError>;

/// Pending leaderboard request. Resolves exactly once.
///
/// The frame loop polls it with a no-op waker; a dropped sender (listener
/// cancelled) resolves as `Cancelled`.
#[derive(Debug)]
pub struct LeaderboardRequest {
    id: u64,
    rx: oneshot::Receiver<LeaderboardOutcome>,
}

impl LeaderboardRequest {
    /// Correlation id sent to the host
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for LeaderboardRequest {
    type Output = LeaderboardOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(LeaderboardError::Cancelled)))
    }
}

/// One-shot listener registered for a correlation id
struct Listener {
    deadline_ms: f64,
    respond: oneshot::Sender<LeaderboardOutcome>,
}

/// Request/response boundary to the host leaderboard
pub struct LeaderboardClient {
    host: Rc<dyn HostChannel>,
    timeout_ms: f64,
    last_id: u64,
    listeners: HashMap<u64, Listener>,
}

impl LeaderboardClient {
    pub fn new(host: Rc<dyn HostChannel>) -> Self {
        Self {
            host,
            timeout_ms: LEADERBOARD_TIMEOUT_MS,
            last_id: 0,
            listeners: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_ms: f64) -> Self {
        self.timeout_ms = timeout_ms.max(0.0);
        self
    }

    /// Fresh correlation id: the current timestamp, bumped if it would repeat
    fn next_id(&mut self, now_ms: f64) -> u64 {
        let id = (now_ms.max(0.0) as u64).max(self.last_id + 1);
        self.last_id = id;
        id
    }

    /// Send a request and register its listener
    pub fn request(&mut self, now_ms: f64) -> LeaderboardRequest {
        let id = self.next_id(now_ms);
        let (tx, rx) = oneshot::channel();
        let request = LeaderboardRequest { id, rx };

        match self.host.send(&OutboundMessage::RequestLeaderboard { id }) {
            Ok(()) => {
                log::info!("Leaderboard requested (id {})", id);
                self.listeners.insert(
                    id,
                    Listener {
                        deadline_ms: now_ms + self.timeout_ms,
                        respond: tx,
                    },
                );
            }
            Err(e) => {
                log::warn!("Leaderboard request failed: {}", e);
                let _ = tx.send(Err(e.into()));
            }
        }

        request
    }

    /// Deliver a host response. Returns false if nobody is waiting for this id.
    pub fn handle_response(&mut self, id: u64, entries: Vec<LeaderboardEntry>) -> bool {
        match self.listeners.remove(&id) {
            Some(listener) => {
                log::info!("Leaderboard received ({} entries)", entries.len());
                let _ = listener.respond.send(Ok(entries));
                true
            }
            None => {
                log::debug!("Dropping stale leaderboard response (id {})", id);
                false
            }
        }
    }

    /// Time out every listener whose deadline has passed. Returns how many expired.
    pub fn expire(&mut self, now_ms: f64) -> usize {
        let expired: Vec<u64> = self
            .listeners
            .iter()
            .filter(|(_, l)| now_ms >= l.deadline_ms)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(listener) = self.listeners.remove(id) {
                log::info!("Leaderboard request {} timed out", id);
                let _ = listener.respond.send(Err(LeaderboardError::Timeout));
            }
        }
        expired.len()
    }

    /// Deregister a listener before its response or deadline.
    /// Dropping its sender resolves the request as `Cancelled`.
    pub fn cancel(&mut self, id: u64) {
        if self.listeners.remove(&id).is_some() {
            log::debug!("Leaderboard request {} cancelled", id);
        }
    }

    /// Listeners still waiting
    pub fn pending(&self) -> usize {
        self.listeners.len()
    }
}

/// A display-ready leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    /// Medal for the podium, number otherwise
    pub rank: String,
    pub name: String,
    pub level: u32,
    pub coins: u64,
    /// Row belongs to the local player
    pub is_local: bool,
}

/// What the leaderboard panel shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LeaderboardView {
    Loading,
    Ready { rows: Vec<LeaderboardRow> },
    NoData,
}

impl LeaderboardView {
    /// Turn a resolved request into something to draw
    pub fn from_outcome(outcome: LeaderboardOutcome, local_user_id: u64) -> Self {
        match outcome {
            Ok(entries) if !entries.is_empty() => LeaderboardView::Ready {
                rows: rows(&entries, local_user_id),
            },
            Ok(_) => LeaderboardView::NoData,
            Err(e) => {
                log::info!("Leaderboard unavailable: {}", e);
                LeaderboardView::NoData
            }
        }
    }
}

/// Rank label for a zero-based position
pub fn rank_label(index: usize) -> String {
    match index {
        0 => "🥇".to_string(),
        1 => "🥈".to_string(),
        2 => "🥉".to_string(),
        _ => (index + 1).to_string(),
    }
}

/// Username or `user<id>`, shortened to fit the panel
pub fn display_name(entry: &LeaderboardEntry) -> String {
    let name = match entry.username.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("user{}", entry.user_id),
    };
    if name.chars().count() > MAX_NAME_CHARS {
        let short: String = name.chars().take(MAX_NAME_CHARS - 2).collect();
        format!("{}..", short)
    } else {
        name
    }
}

/// Rows in host order
pub fn rows(entries: &[LeaderboardEntry], local_user_id: u64) -> Vec<LeaderboardRow> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| LeaderboardRow {
            rank: rank_label(i),
            name: display_name(entry),
            level: entry.level_reached,
            coins: entry.currency,
            is_local: entry.user_id == local_user_id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingChannel;

    fn entry(user_id: u64, username: Option<&str>) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id,
            username: username.map(str::to_string),
            level_reached: 3,
            currency: 10,
        }
    }

    fn client() -> (LeaderboardClient, Rc<RecordingChannel>) {
        let host = Rc::new(RecordingChannel::new());
        (LeaderboardClient::new(host.clone()), host)
    }

    fn poll_now(request: &mut LeaderboardRequest) -> Poll<LeaderboardOutcome> {
        let mut cx = Context::from_waker(std::task::Waker::noop());
        Pin::new(request).poll(&mut cx)
    }

    #[test]
    fn test_request_sends_correlation_id() {
        let (mut client, host) = client();
        let request = client.request(1000.0);
        assert_eq!(request.id(), 1000);
        assert_eq!(
            host.sent(),
            vec![OutboundMessage::RequestLeaderboard { id: 1000 }]
        );
        assert_eq!(client.pending(), 1);
    }

    #[test]
    fn test_ids_are_fresh() {
        let (mut client, _host) = client();
        let a = client.request(5.0);
        let b = client.request(5.0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_matching_response_resolves() {
        let (mut client, _host) = client();
        let mut request = client.request(0.0);
        assert!(poll_now(&mut request).is_pending());

        assert!(!client.handle_response(request.id() + 1, vec![]));
        assert!(client.handle_response(request.id(), vec![entry(1, Some("Ann"))]));

        match poll_now(&mut request) {
            Poll::Ready(Ok(entries)) => assert_eq!(entries.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(client.pending(), 0);
    }

    #[test]
    fn test_timeout_resolves_and_removes_listener() {
        let (mut client, _host) = client();
        let mut request = client.request(100.0);
        assert_eq!(client.expire(3099.0), 0);
        assert!(poll_now(&mut request).is_pending());

        assert_eq!(client.expire(3100.0), 1);
        assert!(matches!(
            poll_now(&mut request),
            Poll::Ready(Err(LeaderboardError::Timeout))
        ));
        assert_eq!(client.pending(), 0);

        // A late response finds nobody listening
        assert!(!client.handle_response(request.id(), vec![entry(1, None)]));
    }

    #[test]
    fn test_cancel_deregisters() {
        let (mut client, _host) = client();
        let mut request = client.request(0.0);
        client.cancel(request.id());
        assert_eq!(client.pending(), 0);
        assert!(matches!(
            poll_now(&mut request),
            Poll::Ready(Err(LeaderboardError::Cancelled))
        ));
    }

    #[test]
    fn test_send_failure_resolves_immediately() {
        let (mut client, host) = client();
        host.set_failing(true);
        let mut request = client.request(0.0);
        assert_eq!(client.pending(), 0);
        assert!(matches!(
            poll_now(&mut request),
            Poll::Ready(Err(LeaderboardError::Send(_)))
        ));
    }

    #[test]
    fn test_rows_and_labels() {
        let entries = vec![
            entry(1, Some("Ann")),
            entry(2, Some("Bartholomew the Great")),
            entry(3, None),
            entry(4, Some("Dee")),
        ];
        let rows = rows(&entries, 3);
        assert_eq!(rows[0].rank, "🥇");
        assert_eq!(rows[1].rank, "🥈");
        assert_eq!(rows[2].rank, "🥉");
        assert_eq!(rows[3].rank, "4");
        assert_eq!(rows[1].name, "Bartholome..");
        assert_eq!(rows[2].name, "user3");
        assert!(rows[2].is_local);
        assert!(!rows[0].is_local);
    }

    #[test]
    fn test_view_from_outcome() {
        assert_eq!(
            LeaderboardView::from_outcome(Ok(vec![]), 1),
            LeaderboardView::NoData
        );
        assert_eq!(
            LeaderboardView::from_outcome(Err(LeaderboardError::Timeout), 1),
            LeaderboardView::NoData
        );
        assert!(matches!(
            LeaderboardView::from_outcome(Ok(vec![entry(1, None)]), 1),
            LeaderboardView::Ready { .. }
        ));
    }
}
