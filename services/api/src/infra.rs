use dealer_credit::workflows::financing::{
    ClientDirectory, ClientId, ClientSummary, VehicleDirectory, VehicleId, VehicleSummary,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Dealership client records for the demo deployment. A real installation
/// would back this with the CRM.
#[derive(Debug, Clone)]
pub(crate) struct InMemoryClientDirectory {
    clients: Vec<ClientSummary>,
}

impl InMemoryClientDirectory {
    pub(crate) fn seeded() -> Self {
        let clients = [
            ("C-1001", "Marta Ibáñez"),
            ("C-1002", "Julián Restrepo"),
            ("C-1003", "Carolina Vélez"),
            ("C-1004", "Andrés Peña"),
        ]
        .into_iter()
        .map(|(id, full_name)| ClientSummary {
            id: ClientId(id.to_string()),
            full_name: full_name.to_string(),
        })
        .collect();

        Self { clients }
    }

    pub(crate) fn entries(&self) -> &[ClientSummary] {
        &self.clients
    }
}

impl ClientDirectory for InMemoryClientDirectory {
    fn client(&self, id: &ClientId) -> Option<ClientSummary> {
        self.clients.iter().find(|client| &client.id == id).cloned()
    }
}

/// Showroom inventory for the demo deployment, prices in COP.
#[derive(Debug, Clone)]
pub(crate) struct InMemoryVehicleDirectory {
    vehicles: Vec<VehicleSummary>,
}

impl InMemoryVehicleDirectory {
    pub(crate) fn seeded() -> Self {
        let vehicles = [
            ("V-2001", "2023 Toyota Hilux SRV", dec!(68_000_000)),
            ("V-2002", "2024 Mazda CX-50 Grand Touring", dec!(94_500_000)),
            ("V-2003", "2022 Chevrolet Onix LT", dec!(52_300_000)),
            ("V-2004", "2022 Renault Duster Zen", dec!(41_900_000)),
        ]
        .into_iter()
        .map(|(id, label, price)| VehicleSummary {
            id: VehicleId(id.to_string()),
            label: label.to_string(),
            price,
        })
        .collect();

        Self { vehicles }
    }

    pub(crate) fn entries(&self) -> &[VehicleSummary] {
        &self.vehicles
    }
}

impl VehicleDirectory for InMemoryVehicleDirectory {
    fn vehicle(&self, id: &VehicleId) -> Option<VehicleSummary> {
        self.vehicles
            .iter()
            .find(|vehicle| &vehicle.id == id)
            .cloned()
    }
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .replace('_', "")
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as a decimal amount ({err})"))
}
