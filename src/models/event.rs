use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Backend event as rendered on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "eventTitle")]
    pub event_title: String,
    #[serde(rename = "eventDateTime")]
    pub event_date_time: Option<String>,
    #[serde(rename = "eventSummary")]
    pub event_summary: Option<String>,
    #[serde(rename = "eventAddress")]
    pub event_address: Option<String>,
    #[serde(rename = "eventImageUrl")]
    pub event_image_url: Option<String>,
    #[serde(rename = "eventPageUrl")]
    pub event_page_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "ticketsSold", default)]
    pub tickets_sold: i64,
    #[serde(rename = "eventStartTime")]
    pub event_start_time: Option<String>,
    #[serde(rename = "eventEndTime")]
    pub event_end_time: Option<String>,
    #[serde(rename = "eventSource")]
    pub event_source: Option<String>,
    #[serde(rename = "timeAdded")]
    pub time_added: Option<String>,
    #[serde(rename = "timeUpdated")]
    pub time_updated: Option<String>,
}

impl Event {
    /// Coordinate pair for marker placement
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Event date for display: "Feb 06, 2026".
    /// The backend emits local timestamps without an offset; RFC 3339 is
    /// accepted as a fallback.
    pub fn formatted_date(&self) -> String {
        match &self.event_date_time {
            Some(date) => {
                if let Ok(dt) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
                    dt.format("%b %d, %Y").to_string()
                } else if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
                    dt.format("%b %d, %Y").to_string()
                } else {
                    date.chars().take(10).collect()
                }
            }
            None => "TBD".to_string(),
        }
    }
}

/// Bounding box for the in-bounds event search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSearchRequest {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    /// Reference time, "yyyy-MM-dd HH:mm:ss"; the backend defaults to now
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_response() {
        let json = r#"{
            "id": 42,
            "eventTitle": "Rooftop Jazz Night",
            "eventDateTime": "2026-08-07T19:00:00",
            "eventSummary": "Live jazz with skyline views",
            "eventAddress": "230 Fifth Ave, New York, NY",
            "eventImageUrl": "https://img.example.com/jazz.jpg",
            "eventPageUrl": "https://events.example.com/jazz",
            "latitude": 40.7440,
            "longitude": -73.9881,
            "ticketsSold": 180,
            "eventStartTime": "19:00",
            "eventEndTime": "23:00",
            "eventSource": "eventbrite",
            "timeAdded": "2026-08-01T12:00:00",
            "timeUpdated": "2026-08-05T08:30:00"
        }"#;

        let event: Event = serde_json::from_str(json).expect("failed to parse event");
        assert_eq!(event.id, 42);
        assert_eq!(event.event_title, "Rooftop Jazz Night");
        assert_eq!(event.tickets_sold, 180);
        assert_eq!(event.coordinates(), (40.7440, -73.9881));
        assert_eq!(event.formatted_date(), "Aug 07, 2026");
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"eventTitle": "Pop-up Market", "latitude": 0.0, "longitude": 0.0}"#;
        let event: Event = serde_json::from_str(json).expect("failed to parse event");
        assert_eq!(event.id, 0);
        assert_eq!(event.tickets_sold, 0);
        assert_eq!(event.formatted_date(), "TBD");
    }

    #[test]
    fn test_bounds_request_omits_absent_reference_time() {
        let bounds = GeoSearchRequest {
            north: 40.8,
            south: 40.7,
            east: -73.9,
            west: -74.0,
            now: None,
        };
        let json = serde_json::to_string(&bounds).expect("failed to encode");
        assert!(!json.contains("now"));
    }
}
