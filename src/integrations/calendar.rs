use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

/// A one-hour session to place on the participants' calendars.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub attendees: Vec<String>,
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Create the event and return the provider's event id.
    async fn create_event(&self, event: &CalendarEvent) -> anyhow::Result<String>;
}

/// Records the event in the logs and hands back a synthetic id.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCalendar;

#[async_trait]
impl CalendarClient for SimulatedCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> anyhow::Result<String> {
        let id = format!("sim-{}", Uuid::new_v4().simple());
        info!(
            event_id = %id,
            summary = %event.summary,
            start = %event.start,
            attendees = event.attendees.len(),
            "calendar event simulated"
        );
        Ok(id)
    }
}
