use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub staff: String,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingOutcome {
    pub success: bool,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn check_availability(
        &self,
        staff: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<bool>;

    async fn create_booking(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome>;

    /// Bounded forward search for the next open slot of the given duration
    /// after `after`. `None` means nothing within the backend's search
    /// horizon.
    async fn find_next_available(
        &self,
        staff: &str,
        duration_minutes: i64,
        after: NaiveDateTime,
    ) -> anyhow::Result<Option<Slot>>;
}

#[derive(Deserialize)]
struct AvailabilityResponse {
    available: bool,
}

#[derive(Deserialize)]
struct NextAvailableResponse {
    #[serde(default)]
    slot: Option<Slot>,
}

/// Client for the calendar proxy that fronts the staff Google calendars.
pub struct HttpCalendarProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCalendarProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    async fn check_availability(
        &self,
        staff: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<bool> {
        let resp = self
            .client
            .get(format!("{}/availability", self.base_url))
            .query(&[
                ("staff", staff),
                ("start", &start.format("%Y-%m-%dT%H:%M:%S").to_string()),
                ("end", &end.format("%Y-%m-%dT%H:%M:%S").to_string()),
            ])
            .send()
            .await
            .context("failed to call calendar availability")?
            .error_for_status()
            .context("calendar availability returned error")?;

        let data: AvailabilityResponse = resp
            .json()
            .await
            .context("failed to parse availability response")?;
        Ok(data.available)
    }

    async fn create_booking(&self, request: &BookingRequest) -> anyhow::Result<BookingOutcome> {
        let resp = self
            .client
            .post(format!("{}/bookings", self.base_url))
            .json(request)
            .send()
            .await
            .context("failed to call calendar booking")?
            .error_for_status()
            .context("calendar booking returned error")?;

        resp.json()
            .await
            .context("failed to parse booking response")
    }

    async fn find_next_available(
        &self,
        staff: &str,
        duration_minutes: i64,
        after: NaiveDateTime,
    ) -> anyhow::Result<Option<Slot>> {
        let resp = self
            .client
            .get(format!("{}/next-available", self.base_url))
            .query(&[
                ("staff", staff),
                ("duration", &duration_minutes.to_string()),
                ("after", &after.format("%Y-%m-%dT%H:%M:%S").to_string()),
            ])
            .send()
            .await
            .context("failed to call calendar slot search")?
            .error_for_status()
            .context("calendar slot search returned error")?;

        let data: NextAvailableResponse = resp
            .json()
            .await
            .context("failed to parse slot search response")?;
        Ok(data.slot)
    }
}
