//! Fan-out of change events to role- and entity-keyed rooms.
//!
//! Every event is stored in `Notifications_` (one row per room) so clients
//! that were offline can catch up, then broadcast to live subscribers.

use std::collections::HashSet;
use std::fmt;

use chrono::{NaiveDateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Admin,
    Employee(i64),
    Client(i64),
    Project(i64),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Admin => f.write_str("admin"),
            Room::Employee(id) => write!(f, "employee:{id}"),
            Room::Client(id) => write!(f, "client:{id}"),
            Room::Project(id) => write!(f, "project:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    TaskAssigned,
    TaskUpdated,
    ProjectCreated,
    ProjectUpdated,
    FeedbackReceived,
    MeetingScheduled,
    MeetingUpdated,
    AttendanceMarked,
    EmployeeCreated,
    ClientCreated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskAssigned => "task-assigned",
            EventKind::TaskUpdated => "task-updated",
            EventKind::ProjectCreated => "project-created",
            EventKind::ProjectUpdated => "project-updated",
            EventKind::FeedbackReceived => "feedback-received",
            EventKind::MeetingScheduled => "meeting-scheduled",
            EventKind::MeetingUpdated => "meeting-updated",
            EventKind::AttendanceMarked => "attendance-marked",
            EventKind::EmployeeCreated => "employee-created",
            EventKind::ClientCreated => "client-created",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub notification_id: Option<i64>,
    pub room: String,
    pub event: EventKind,
    pub message: String,
    pub payload: Value,
    pub created_at: NaiveDateTime,
}

impl Event {
    /// One Server-Sent Events frame.
    pub fn to_sse_frame(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.event.as_str(), data)
    }
}

pub struct NotificationHub {
    sender: broadcast::Sender<Event>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Sends to live subscribers only. Returns how many received it.
    pub fn broadcast(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub async fn publish(
        &self,
        pool: &MySqlPool,
        rooms: &[Room],
        kind: EventKind,
        message: &str,
        payload: &Value,
    ) -> Result<(), sqlx::Error> {
        let created_at = Utc::now().naive_utc();
        let payload_text = payload.to_string();
        let mut seen = HashSet::new();
        for room in rooms.iter().map(Room::to_string) {
            if !seen.insert(room.clone()) {
                continue;
            }
            let result = sqlx::query(
                "INSERT INTO Notifications_ (room, event, message, payload, is_read, created_at)
                 VALUES (?, ?, ?, ?, false, ?)",
            )
            .bind(&room)
            .bind(kind.as_str())
            .bind(message)
            .bind(&payload_text)
            .bind(created_at)
            .execute(pool)
            .await?;

            let delivered = self.broadcast(Event {
                notification_id: Some(result.last_insert_id() as i64),
                room: room.clone(),
                event: kind,
                message: message.to_string(),
                payload: payload.clone(),
                created_at,
            });
            info!("{} sent to {} ({} live subscribers)", kind.as_str(), room, delivered);
        }
        Ok(())
    }

    /// Like [`publish`](Self::publish), but a failure is logged instead of
    /// failing the request that triggered it.
    pub async fn notify(
        &self,
        pool: &MySqlPool,
        rooms: &[Room],
        kind: EventKind,
        message: &str,
        payload: Value,
    ) {
        if let Err(e) = self.publish(pool, rooms, kind, message, &payload).await {
            error!("Failed to store {} notification: {}", kind.as_str(), e);
        }
    }
}

/// Waits for the next event addressed to one of `rooms`. `None` once the hub is gone.
pub async fn next_for_rooms(
    receiver: &mut broadcast::Receiver<Event>,
    rooms: &HashSet<String>,
) -> Option<Event> {
    loop {
        match receiver.recv().await {
            Ok(event) if rooms.contains(&event.room) => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Notification subscriber lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(room: Room, kind: EventKind) -> Event {
        Event {
            notification_id: None,
            room: room.to_string(),
            event: kind,
            message: "hello".to_string(),
            payload: json!({ "task_id": 7 }),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn rooms_render_as_role_and_id() {
        assert_eq!(Room::Admin.to_string(), "admin");
        assert_eq!(Room::Employee(4).to_string(), "employee:4");
        assert_eq!(Room::Client(9).to_string(), "client:9");
        assert_eq!(Room::Project(2).to_string(), "project:2");
    }

    #[test]
    fn event_names_match_serialized_form() {
        for kind in [EventKind::TaskAssigned, EventKind::FeedbackReceived, EventKind::MeetingUpdated] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn sse_frame_names_the_event() {
        let frame = event(Room::Admin, EventKind::ProjectUpdated).to_sse_frame();
        assert!(frame.starts_with("event: project-updated\ndata: {"));
        assert!(frame.ends_with("\n\n"));
        assert!(frame.contains("\"room\":\"admin\""));
    }

    #[test]
    fn broadcast_without_subscribers_is_not_an_error() {
        let hub = NotificationHub::new(8);
        assert_eq!(hub.broadcast(event(Room::Admin, EventKind::TaskUpdated)), 0);
    }

    #[tokio::test]
    async fn subscribers_only_see_their_rooms() {
        let hub = NotificationHub::new(8);
        let mut receiver = hub.subscribe();
        let rooms: HashSet<String> = [Room::Employee(3).to_string()].into_iter().collect();

        hub.broadcast(event(Room::Employee(4), EventKind::TaskAssigned));
        hub.broadcast(event(Room::Admin, EventKind::TaskUpdated));
        hub.broadcast(event(Room::Employee(3), EventKind::TaskAssigned));

        let received = next_for_rooms(&mut receiver, &rooms).await.unwrap();
        assert_eq!(received.room, "employee:3");
        assert_eq!(received.event, EventKind::TaskAssigned);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let hub = NotificationHub::new(2);
        let mut receiver = hub.subscribe();
        let rooms: HashSet<String> = [Room::Admin.to_string()].into_iter().collect();

        for _ in 0..5 {
            hub.broadcast(event(Room::Admin, EventKind::ProjectCreated));
        }

        assert!(next_for_rooms(&mut receiver, &rooms).await.is_some());
    }

    #[tokio::test]
    async fn dropped_hub_ends_the_stream() {
        let hub = NotificationHub::new(4);
        let mut receiver = hub.subscribe();
        drop(hub);
        let rooms: HashSet<String> = [Room::Admin.to_string()].into_iter().collect();
        assert!(next_for_rooms(&mut receiver, &rooms).await.is_none());
    }
}
