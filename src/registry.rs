//! Static record-type registry and candidate selection.
//!
//! The record universe is declared once, in order, at compile time. The
//! slice order is load-bearing: it is the order the validate-and-report
//! loop tries candidates in, and the first success wins.

use serde_json::Value;

use crate::schema::{
    AxiBus, CanBus, Chiplet, CpuCluster, DataReceivedEvent, EthSwitch, EthernetInterface,
    NetworkTopology, Operation, TimingEvent, UcieInterface, ValidationFailure,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Cluster,
    Chiplet,
    AxiBus,
    EthernetInterface,
    UcieInterface,
    CanBus,
    EthSwitch,
    NetworkTopology,
    TimingEvent,
    DataReceivedEvent,
    Operation,
}

/// One entry of the record universe. `construct` runs the type's validating
/// constructor and renders the canonical default-filled form.
pub struct RecordSpec {
    pub kind: RecordKind,
    pub name: &'static str,
    pub construct: fn(&Value) -> Result<Value, ValidationFailure>,
}

pub static REGISTRY: &[RecordSpec] = &[
    RecordSpec {
        kind: RecordKind::Cluster,
        name: "cluster",
        construct: |v| CpuCluster::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::Chiplet,
        name: "chiplet",
        construct: |v| Chiplet::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::AxiBus,
        name: "axi_bus",
        construct: |v| AxiBus::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::EthernetInterface,
        name: "ethernet_interface",
        construct: |v| EthernetInterface::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::UcieInterface,
        name: "ucie_interface",
        construct: |v| UcieInterface::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::CanBus,
        name: "can_bus",
        construct: |v| CanBus::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::EthSwitch,
        name: "eth_switch",
        construct: |v| EthSwitch::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::NetworkTopology,
        name: "network_topology",
        construct: |v| NetworkTopology::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::TimingEvent,
        name: "timing_event",
        construct: |v| TimingEvent::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::DataReceivedEvent,
        name: "data_received_event",
        construct: |v| DataReceivedEvent::from_value(v).map(|r| r.to_value()),
    },
    RecordSpec {
        kind: RecordKind::Operation,
        name: "operation",
        construct: |v| Operation::from_value(v).map(|r| r.to_value()),
    },
];

/// Candidate selection: a type is a candidate iff its name appears
/// case-insensitively as a substring of the context blob. No match fails
/// open to the whole universe so the loop always has something to try.
pub fn candidates(context: &str) -> Vec<&'static RecordSpec> {
    let lower = context.to_lowercase();
    let hits: Vec<&RecordSpec> = REGISTRY.iter().filter(|s| lower.contains(s.name)).collect();
    if hits.is_empty() {
        REGISTRY.iter().collect()
    } else {
        hits
    }
}

pub fn spec_for(kind: RecordKind) -> &'static RecordSpec {
    REGISTRY
        .iter()
        .find(|s| s.kind == kind)
        .expect("every RecordKind is registered")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chiplet_context_selects_chiplet_only() {
        let names: Vec<&str> = candidates("the chiplet carries an NPU")
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["chiplet"]);
    }

    #[test]
    fn selector_is_case_insensitive() {
        let names: Vec<&str> = candidates("Add a Chiplet").iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["chiplet"]);
    }

    #[test]
    fn no_match_fails_open_to_full_universe() {
        let cands = candidates("nothing relevant here");
        assert_eq!(cands.len(), REGISTRY.len());
    }

    #[test]
    fn matches_preserve_registry_order() {
        let names: Vec<&str> = candidates("a chiplet with a cluster on a can_bus")
            .iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["cluster", "chiplet", "can_bus"]);
    }

    #[test]
    fn every_kind_is_registered() {
        for spec in REGISTRY {
            assert_eq!(spec_for(spec.kind).name, spec.name);
        }
    }
}
