//! Fleet domain records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Booking state of a vehicle.
///
/// Stored as free text; `Available` and `Booked` are recognised
/// case-insensitively and any other text is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VehicleStatus {
    /// Free to be assigned or requested.
    Available,
    /// Taken by a booking. Terminal: no release path exists.
    Booked,
    /// Unrecognised status text found on disk (never available).
    Other(String),
}

impl VehicleStatus {
    /// Whether the vehicle can be booked.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Text written to storage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for VehicleStatus {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("available") {
            Self::Available
        } else if value.eq_ignore_ascii_case("booked") {
            Self::Booked
        } else {
            Self::Other(value)
        }
    }
}

impl From<VehicleStatus> for String {
    fn from(value: VehicleStatus) -> Self {
        match value {
            VehicleStatus::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vehicle in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique key.
    #[serde(default)]
    pub vehicle_id: String,
    /// Free-text category such as `Bus`, `Truck` or `Car`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default = "empty_status")]
    pub status: VehicleStatus,
}

fn empty_status() -> VehicleStatus {
    VehicleStatus::Other(String::new())
}

impl Vehicle {
    /// A freshly registered vehicle, always `Available`.
    pub fn new(vehicle_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            kind: kind.into(),
            status: VehicleStatus::Available,
        }
    }

    /// Row shown in the availability listing.
    pub fn availability_line(&self) -> String {
        format!("ID: {} | Type: {}", self.vehicle_id, self.kind)
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | Type: {} | Status: {}",
            self.vehicle_id, self.kind, self.status
        )
    }
}

/// A registered client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    /// Contact detail; empty when not provided.
    #[serde(default)]
    pub contact: String,
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {} | Name: {} | Contact: {}",
            self.client_id, self.name, self.contact
        )
    }
}

/// Link between a client and the vehicle booked for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub vehicle_id: String,
}

impl Booking {
    pub fn new(client_id: impl Into<String>, vehicle_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            vehicle_id: vehicle_id.into(),
        }
    }

    /// Row shown in a client's own booking list.
    pub fn vehicle_line(&self) -> String {
        format!("Vehicle: {}", self.vehicle_id)
    }
}

/// A booking joined with the booked client's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    pub client_id: String,
    /// Client name, or `None` when the client could not be resolved.
    pub client_name: Option<String>,
    pub vehicle_id: String,
}

impl BookingView {
    /// Name to display, falling back to the raw client id.
    pub fn client_label(&self) -> &str {
        match self.client_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.client_id,
        }
    }
}

impl fmt::Display for BookingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Client: {} | Vehicle: {}",
            self.client_label(),
            self.vehicle_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(
            VehicleStatus::from("available".to_string()),
            VehicleStatus::Available
        );
        assert_eq!(
            VehicleStatus::from("BOOKED".to_string()),
            VehicleStatus::Booked
        );
        let other = VehicleStatus::from("In Service".to_string());
        assert!(!other.is_available());
        assert_eq!(String::from(other), "In Service");
    }

    #[test]
    fn rows_render_like_the_listings() {
        let vehicle = Vehicle::new("V1", "Truck");
        assert_eq!(vehicle.to_string(), "ID: V1 | Type: Truck | Status: Available");
        assert_eq!(vehicle.availability_line(), "ID: V1 | Type: Truck");

        let client = Client {
            client_id: "C1".to_string(),
            name: "Alice".to_string(),
            contact: String::new(),
        };
        assert_eq!(client.to_string(), "ID: C1 | Name: Alice | Contact: ");
    }

    #[test]
    fn booking_view_falls_back_to_client_id() {
        let mut view = BookingView {
            client_id: "C9".to_string(),
            client_name: None,
            vehicle_id: "V1".to_string(),
        };
        assert_eq!(view.to_string(), "Client: C9 | Vehicle: V1");

        view.client_name = Some(String::new());
        assert_eq!(view.client_label(), "C9");

        view.client_name = Some("Alice".to_string());
        assert_eq!(view.to_string(), "Client: Alice | Vehicle: V1");
    }
}
