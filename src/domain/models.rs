use crate::error::AttendanceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A latitude/longitude pair in decimal degrees.
///
/// Used both for the configured reference point and for captured samples.
/// Has no identity beyond its coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    // ---
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    // ---

    /// Builds a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AttendanceError> {
        // ---
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AttendanceError::InvalidCoordinates(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AttendanceError::InvalidCoordinates(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// One check-in event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    // ---
    pub id: Uuid,

    pub date_time: DateTime<Utc>,

    /// Course code, a key into [`SUBJECTS`].
    pub subject: String,

    /// Daily key supplied at submission time. Kept for audit only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default)]
    pub wallet_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl AttendanceRecord {
    // ---
    pub fn new(
        date_time: DateTime<Utc>,
        subject: String,
        password: Option<String>,
        wallet_address: Option<String>,
        location: Option<GeoPoint>,
    ) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            date_time,
            subject,
            password,
            wallet_address,
            latitude: location.map(|p| p.latitude),
            longitude: location.map(|p| p.longitude),
        }
    }

    /// Timestamp formatted for display in UTC, e.g. `Jun 15, 2024 3:04 PM`.
    pub fn display_time(&self) -> String {
        // ---
        self.date_time.format("%b %-d, %Y %-I:%M %p").to_string()
    }
}

/// A course the user can check in to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Subject {
    pub value: &'static str,
    pub label: &'static str,
}

/// Static subject catalog.
pub const SUBJECTS: &[Subject] = &[
    Subject {
        value: "math-101",
        label: "Calculus I",
    },
    Subject {
        value: "phys-202",
        label: "Physics for Engineers",
    },
    Subject {
        value: "chem-301",
        label: "General Chemistry",
    },
    Subject {
        value: "cs-101",
        label: "Intro to Computer Science",
    },
    Subject {
        value: "ee-201",
        label: "Circuit Theory I",
    },
    Subject {
        value: "me-301",
        label: "Thermodynamics",
    },
    Subject {
        value: "ce-201",
        label: "Statics",
    },
    Subject {
        value: "cs-305",
        label: "Data Structures & Algorithms",
    },
    Subject {
        value: "ee-302",
        label: "Signals and Systems",
    },
    Subject {
        value: "me-302",
        label: "Fluid Mechanics",
    },
    Subject {
        value: "ce-302",
        label: "Structural Analysis",
    },
    Subject {
        value: "eng-100",
        label: "Introduction to Engineering Design",
    },
];

/// Human-readable label for a subject code; unknown codes display as themselves.
pub fn subject_label(value: &str) -> &str {
    // ---
    SUBJECTS
        .iter()
        .find(|s| s.value == value)
        .map(|s| s.label)
        .unwrap_or(value)
}
