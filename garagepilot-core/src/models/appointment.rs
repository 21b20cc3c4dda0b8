use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::Record;

/// Mechanic placeholder for appointments nobody has picked up yet.
pub const UNASSIGNED: &str = "Unassigned";

/// Appointment state enumeration.
///
/// - Waiting: booked, no mechanic yet
/// - Accepted: a mechanic is assigned and the slot is held
/// - Cancelled: terminal, the only state that may be purged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentState {
    Waiting,
    Accepted,
    Cancelled,
}

impl fmt::Display for AppointmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentState::Waiting => write!(f, "waiting"),
            AppointmentState::Accepted => write!(f, "accepted"),
            AppointmentState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A scheduled service slot for a client's vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    /// Monotonic identifier
    pub id: u64,

    /// Client identity document number
    pub client_id: String,

    /// Client name snapshot taken at booking
    pub client_name: String,

    /// Plate of the vehicle being serviced
    pub vehicle_plate: String,

    /// Day of the appointment
    pub date: NaiveDate,

    /// Start time, serialized as `HH:MM`
    #[serde(with = "hhmm")]
    pub time: NaiveTime,

    /// What the client reported
    #[serde(default)]
    pub description: String,

    /// Assigned mechanic name, or [`UNASSIGNED`]
    pub mechanic: String,

    pub state: AppointmentState,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Anything not cancelled still occupies the vehicle and the mechanic.
    pub fn is_active(&self) -> bool {
        self.state != AppointmentState::Cancelled
    }

    pub fn is_assigned(&self) -> bool {
        self.mechanic != UNASSIGNED
    }

    pub fn minutes(&self) -> i64 {
        minutes_since_midnight(self.time)
    }
}

impl Record for Appointment {
    const ENTITY: &'static str = "appointment";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

pub fn minutes_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Booking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub client_id: String,
    pub vehicle_plate: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub description: String,
    /// Cancel the vehicle's current waiting appointment instead of failing.
    #[serde(default)]
    pub replace_active: bool,
}

/// Edit of an existing appointment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
    pub description: Option<String>,
    pub state: Option<AppointmentState>,
}

/// `HH:MM` time representation; `HH:MM:SS` is accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => super::serialize(t, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_round_trips_as_hh_mm() {
        let req: CreateAppointment = serde_json::from_str(
            r#"{"client_id":"1-111","vehicle_plate":"ABC123","date":"2025-03-01","time":"09:30"}"#,
        )
        .unwrap();
        assert_eq!(minutes_since_midnight(req.time), 570);
        assert!(!req.replace_active);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["time"], "09:30");
    }

    #[test]
    fn test_patch_time_is_optional() {
        let patch: AppointmentPatch = serde_json::from_str(r#"{"description":"noise"}"#).unwrap();
        assert!(patch.time.is_none());

        let patch: AppointmentPatch = serde_json::from_str(r#"{"time":"10:10:00"}"#).unwrap();
        assert_eq!(patch.time.map(minutes_since_midnight), Some(610));
    }
}
