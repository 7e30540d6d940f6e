use std::collections::BTreeSet;

use proptest::prelude::*;
use tempfile::tempdir;

use fleetdesk_core::{AppConfig, FleetLedger, LedgerError, VehicleStatus};

#[derive(Debug, Clone)]
enum Action {
    AddVehicle { vehicle: u8 },
    AddClient { client: u8 },
    Assign { client: u8, vehicle: u8 },
    Request { client: u8, vehicle: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..6).prop_map(|vehicle| Action::AddVehicle { vehicle }),
        (0u8..4).prop_map(|client| Action::AddClient { client }),
        (0u8..5, 0u8..7).prop_map(|(client, vehicle)| Action::Assign { client, vehicle }),
        (0u8..5, 0u8..7).prop_map(|(client, vehicle)| Action::Request { client, vehicle }),
    ]
}

fn vehicle_id(idx: u8) -> String {
    format!("V{idx}")
}

fn client_id(idx: u8) -> String {
    format!("C{idx}")
}

fn open_ledger(dir: &std::path::Path) -> FleetLedger {
    FleetLedger::open(AppConfig::with_data_dir(dir)).expect("open ledger")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn vehicle_ids_stay_unique(id in "[A-Za-z0-9]{1,8}", first in "[a-z]{1,6}", second in "[a-z]{1,6}") {
        let dir = tempdir().expect("tempdir");
        let ledger = open_ledger(dir.path());

        ledger.add_vehicle(&id, &first).expect("first add");
        let before = ledger.list_vehicles().expect("list");
        let duplicate = ledger.add_vehicle(&id, &second);
        let rejected = matches!(duplicate, Err(LedgerError::Duplicate { .. }));
        prop_assert!(rejected, "expected Duplicate, got {:?}", duplicate);

        let after = ledger.list_vehicles().expect("list");
        prop_assert_eq!(&before, &after);
        let matching: Vec<_> = after.iter().filter(|v| v.vehicle_id == id).collect();
        prop_assert_eq!(matching.len(), 1);
        prop_assert_eq!(&matching[0].status, &VehicleStatus::Available);
    }

    #[test]
    fn clients_authenticate_iff_added(added in prop::collection::btree_set(0u8..10, 0..5), candidate in 0u8..10) {
        let dir = tempdir().expect("tempdir");
        let ledger = open_ledger(dir.path());
        for idx in &added {
            ledger.add_client(&client_id(*idx), "Name", None).expect("add client");
        }

        let result = ledger.authenticate_client(&client_id(candidate));
        prop_assert_eq!(result.is_ok(), added.contains(&candidate));
        if added.contains(&candidate) {
            let again = ledger.add_client(&client_id(candidate), "Again", None);
            let rejected = matches!(again, Err(LedgerError::Duplicate { .. }));
            prop_assert!(rejected, "expected Duplicate, got {:?}", again);
        }
    }

    #[test]
    fn random_sequences_keep_status_and_bookings_consistent(actions in prop::collection::vec(action_strategy(), 1..40)) {
        let dir = tempdir().expect("tempdir");
        let ledger = open_ledger(dir.path());

        for action in actions {
            let before = ledger.list_bookings().expect("bookings").len();
            let result = match action {
                Action::AddVehicle { vehicle } => ledger.add_vehicle(&vehicle_id(vehicle), "Bus").map(|_| ()),
                Action::AddClient { client } => ledger.add_client(&client_id(client), "Name", None).map(|_| ()),
                Action::Assign { client, vehicle } => ledger.assign_vehicle(&client_id(client), &vehicle_id(vehicle)).map(|_| ()),
                Action::Request { client, vehicle } => ledger.request_transport(&client_id(client), &vehicle_id(vehicle)).map(|_| ()),
            };
            if let Err(err) = &result {
                prop_assert!(err.is_user_error(), "unexpected storage error: {err}");
            }
            let booked = matches!(action, Action::Assign { .. } | Action::Request { .. }) && result.is_ok();
            let after = ledger.list_bookings().expect("bookings").len();
            prop_assert_eq!(after, before + usize::from(booked));
        }

        let vehicles = ledger.list_vehicles().expect("vehicles");
        let bookings = ledger.list_bookings().expect("bookings");
        let booked_ids: BTreeSet<&str> = bookings.iter().map(|b| b.vehicle_id.as_str()).collect();
        let client_ids: BTreeSet<String> = ledger
            .list_clients()
            .expect("clients")
            .into_iter()
            .map(|c| c.client_id)
            .collect();

        let unique: BTreeSet<&str> = vehicles.iter().map(|v| v.vehicle_id.as_str()).collect();
        prop_assert_eq!(unique.len(), vehicles.len());

        for vehicle in &vehicles {
            let is_booked = vehicle.status == VehicleStatus::Booked;
            prop_assert_eq!(is_booked, booked_ids.contains(vehicle.vehicle_id.as_str()));
        }
        for booking in &bookings {
            prop_assert!(client_ids.contains(&booking.client_id));
            prop_assert!(unique.contains(booking.vehicle_id.as_str()));
        }
        for vehicle in ledger.list_available_vehicles().expect("available") {
            prop_assert!(!booked_ids.contains(vehicle.vehicle_id.as_str()));
        }
    }
}
