//! Vehicle, client and booking operations.
//!
//! Each operation reloads the collections it reads from the [`RecordStore`],
//! checks its preconditions, and persists the result. Booking a vehicle
//! writes the status change and the new booking through one [`Changeset`],
//! so a vehicle is never left `Booked` without its booking row.

use std::collections::HashMap;

use tracing::info;

use crate::{
    config::AppConfig,
    error::{LedgerError, LedgerResult},
    models::{Booking, BookingView, Client, Vehicle, VehicleStatus},
    session::ClientSession,
    store::{Changeset, Keyed, RecordStore},
};

/// Business operations over the fleet collections.
#[derive(Debug, Clone)]
pub struct FleetLedger {
    store: RecordStore,
}

impl FleetLedger {
    /// Wrap an already opened store.
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Open the record store described by `config` and wrap it.
    pub fn open(config: AppConfig) -> LedgerResult<Self> {
        Ok(Self::new(RecordStore::open(config)?))
    }

    /// The backing record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Register a new vehicle as `Available`.
    pub fn add_vehicle(&self, vehicle_id: &str, kind: &str) -> LedgerResult<Vehicle> {
        require(vehicle_id, "Vehicle ID")?;
        require(kind, "Vehicle Type")?;

        let mut vehicles = self.store.load::<Vehicle>()?;
        if find(&vehicles, vehicle_id).is_some() {
            return Err(LedgerError::Duplicate {
                entity: "Vehicle",
                id: vehicle_id.to_string(),
            });
        }

        let vehicle = Vehicle::new(vehicle_id, kind);
        vehicles.push(vehicle.clone());
        self.store.save(&vehicles)?;
        info!(vehicle_id, kind, "Vehicle added");
        Ok(vehicle)
    }

    /// Register a new client; a missing contact is stored as an empty string.
    pub fn add_client(
        &self,
        client_id: &str,
        name: &str,
        contact: Option<&str>,
    ) -> LedgerResult<Client> {
        require(client_id, "Client ID")?;
        require(name, "Name")?;

        let mut clients = self.store.load::<Client>()?;
        if find(&clients, client_id).is_some() {
            return Err(LedgerError::Duplicate {
                entity: "Client",
                id: client_id.to_string(),
            });
        }

        let client = Client {
            client_id: client_id.to_string(),
            name: name.to_string(),
            contact: contact.unwrap_or_default().to_string(),
        };
        clients.push(client.clone());
        self.store.save(&clients)?;
        info!(client_id, "Client added");
        Ok(client)
    }

    /// Every vehicle in file order.
    pub fn list_vehicles(&self) -> LedgerResult<Vec<Vehicle>> {
        Ok(self.store.load::<Vehicle>()?)
    }

    /// Every client in file order.
    pub fn list_clients(&self) -> LedgerResult<Vec<Client>> {
        Ok(self.store.load::<Client>()?)
    }

    /// Vehicles whose status reads `available`, in any case.
    pub fn list_available_vehicles(&self) -> LedgerResult<Vec<Vehicle>> {
        Ok(available(self.store.load::<Vehicle>()?))
    }

    /// Admin path: book `vehicle_id` for `client_id`.
    pub fn assign_vehicle(&self, client_id: &str, vehicle_id: &str) -> LedgerResult<Booking> {
        require(client_id, "Client ID")?;
        require(vehicle_id, "Vehicle ID")?;
        self.ensure_client(client_id)?;

        let vehicles = self.store.load::<Vehicle>()?;
        let vehicle = find(&vehicles, vehicle_id).ok_or_else(|| LedgerError::NotFound {
            entity: "Vehicle",
            id: vehicle_id.to_string(),
        })?;
        if !vehicle.status.is_available() {
            return Err(LedgerError::Conflict(vehicle_id.to_string()));
        }

        self.book(vehicles, client_id, vehicle_id)
    }

    /// Client path: book `vehicle_id`, which must be in the availability
    /// listing taken at the start of the call.
    pub fn request_transport(&self, client_id: &str, vehicle_id: &str) -> LedgerResult<Booking> {
        require(client_id, "Client ID")?;
        require(vehicle_id, "Vehicle ID")?;
        self.ensure_client(client_id)?;

        let vehicles = self.store.load::<Vehicle>()?;
        let snapshot = available(vehicles.clone());
        if find(&snapshot, vehicle_id).is_none() {
            return Err(match find(&vehicles, vehicle_id) {
                Some(_) => LedgerError::Conflict(vehicle_id.to_string()),
                None => LedgerError::NotFound {
                    entity: "Vehicle",
                    id: vehicle_id.to_string(),
                },
            });
        }

        self.book(vehicles, client_id, vehicle_id)
    }

    /// Every booking joined with the client's name.
    pub fn list_bookings(&self) -> LedgerResult<Vec<BookingView>> {
        let bookings = self.store.load::<Booking>()?;
        let clients = self.store.load::<Client>()?;

        let mut names: HashMap<&str, &str> = HashMap::new();
        for client in &clients {
            names
                .entry(client.client_id.as_str())
                .or_insert(client.name.as_str());
        }

        Ok(bookings
            .into_iter()
            .map(|booking| BookingView {
                client_name: names
                    .get(booking.client_id.as_str())
                    .map(|name| name.to_string()),
                client_id: booking.client_id,
                vehicle_id: booking.vehicle_id,
            })
            .collect())
    }

    /// Bookings made by `client_id`, in file order.
    pub fn list_bookings_for_client(&self, client_id: &str) -> LedgerResult<Vec<Booking>> {
        require(client_id, "Client ID")?;
        let bookings = self.store.load::<Booking>()?;
        Ok(bookings
            .into_iter()
            .filter(|booking| booking.client_id == client_id)
            .collect())
    }

    /// Resolve a client id to the client's name.
    pub fn authenticate_client(&self, client_id: &str) -> LedgerResult<String> {
        require(client_id, "Client ID")?;
        Ok(self.ensure_client(client_id)?.name)
    }

    /// Authenticate and produce the session value used by client-path calls.
    pub fn login_client(&self, client_id: &str) -> LedgerResult<ClientSession> {
        let name = self.authenticate_client(client_id)?;
        info!(client_id, "Client logged in");
        Ok(ClientSession::new(client_id, name))
    }

    fn ensure_client(&self, client_id: &str) -> LedgerResult<Client> {
        let clients = self.store.load::<Client>()?;
        find(&clients, client_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                entity: "Client",
                id: client_id.to_string(),
            })
    }

    fn book(
        &self,
        mut vehicles: Vec<Vehicle>,
        client_id: &str,
        vehicle_id: &str,
    ) -> LedgerResult<Booking> {
        for vehicle in vehicles
            .iter_mut()
            .filter(|vehicle| vehicle.vehicle_id == vehicle_id)
        {
            vehicle.status = VehicleStatus::Booked;
        }

        let booking = Booking::new(client_id, vehicle_id);
        let mut bookings = self.store.load::<Booking>()?;
        bookings.push(booking.clone());

        let mut changeset = Changeset::new();
        changeset.stage(&vehicles)?.stage(&bookings)?;
        self.store.commit(changeset)?;
        info!(client_id, vehicle_id, "Vehicle booked");
        Ok(booking)
    }
}

fn require(value: &str, field: &'static str) -> LedgerResult<()> {
    if value.is_empty() {
        return Err(LedgerError::Validation(field));
    }
    Ok(())
}

fn find<'a, R: Keyed>(records: &'a [R], key: &str) -> Option<&'a R> {
    records.iter().find(|record| record.key() == key)
}

fn available(vehicles: Vec<Vehicle>) -> Vec<Vehicle> {
    vehicles
        .into_iter()
        .filter(|vehicle| vehicle.status.is_available())
        .collect()
}
