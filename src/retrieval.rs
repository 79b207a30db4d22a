//! Schema-context retrieval boundary.
//!
//! The real deployment fronts a vector index; the pipeline only ever sees
//! "query in, ordered snippets out", which is what the trait pins down. The
//! shipped `SnippetStore` serves the built-in record documentation through a
//! keyword filter, which is all the evaluation scenarios need.

use once_cell::sync::Lazy;

pub trait SchemaRetriever {
    /// Return up to `top_k` schema snippets relevant to `query`, most
    /// relevant first. Snippets are opaque strings to the caller.
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<String>;
}

struct SchemaDoc {
    type_name: &'static str,
    body: &'static str,
}

static BUILTIN_DOCS: &[SchemaDoc] = &[
    SchemaDoc {
        type_name: "cluster",
        body: "cluster: CPU cluster. Fields: short_name { name }, frequency { value, unit: MHz }, \
               cores_per_cluster (1|2|4|8|16); optional operating_system (Linux or Nucleus_RTOS), \
               arch_family.",
    },
    SchemaDoc {
        type_name: "chiplet",
        body: "chiplet: die on the SoC package. Fields: short_name { name }, axi_bus { width, \
               frequency }, ethernet_interface { mode: simulated|native }, ucie_interface { mode: \
               host|endpoint }; optional cpu_cluster, power_parameters.",
    },
    SchemaDoc {
        type_name: "axi_bus",
        body: "axi_bus: on-chip interconnect. Fields: width in bytes (default 4), frequency in Hz \
               (default 100000000, at least 1000000).",
    },
    SchemaDoc {
        type_name: "ethernet_interface",
        body: "ethernet_interface: mode simulated (default, invisible to the host network) or \
               native (mapped host ports).",
    },
    SchemaDoc {
        type_name: "ucie_interface",
        body: "ucie_interface: inter-chiplet link. Fields: mode host|endpoint, optional \
               endpoint_dma { frequency }.",
    },
    SchemaDoc {
        type_name: "can_bus",
        body: "can_bus: inter-ECU segment. Fields: short_name { name }, baud_rate in bps (default \
               500000), interface_refs (at least one path), can_fd (default true).",
    },
    SchemaDoc {
        type_name: "eth_switch",
        body: "eth_switch: inter-ECU segment. Fields: short_name { name }, interface_refs (at \
               least one path).",
    },
    SchemaDoc {
        type_name: "network_topology",
        body: "network_topology: inter-ECU communication. Fields: can_buses (up to 8), \
               eth_switches (up to 8).",
    },
    SchemaDoc {
        type_name: "timing_event",
        body: "timing_event: periodic trigger. Fields: short_name { name }, start_on_event_ref \
               (path), period { value, unit: s|ms|us|ns }; optional custom_behavior_ref.",
    },
    SchemaDoc {
        type_name: "data_received_event",
        body: "data_received_event: data-driven trigger. Fields: short_name { name }, \
               start_on_event_ref (path), data_refs (at least one path).",
    },
    SchemaDoc {
        type_name: "operation",
        body: "operation: one step of an operations sequence. Fields (at least one): read (path), \
               write (path), latency { value, unit }, load (cycles).",
    },
];

/// Query keyword -> record-type name. Checked as substrings of the
/// lowercased query, same spirit as the selector itself.
static QUERY_KEYWORDS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("cluster", "cluster"),
        ("chiplet", "chiplet"),
        ("gpu", "chiplet"),
        ("npu", "chiplet"),
        ("axi", "axi_bus"),
        ("ethernet", "ethernet_interface"),
        ("ucie", "ucie_interface"),
        ("can bus", "can_bus"),
        ("can-bus", "can_bus"),
        ("canbus", "can_bus"),
        ("switch", "eth_switch"),
        ("network", "network_topology"),
        ("timing", "timing_event"),
        ("period", "timing_event"),
        ("received", "data_received_event"),
        ("operation", "operation"),
        ("latency", "operation"),
    ]
});

/// Built-in record documentation behind the retrieval trait.
#[derive(Debug, Default)]
pub struct SnippetStore;

impl SnippetStore {
    pub fn with_builtin_docs() -> Self {
        Self
    }
}

impl SchemaRetriever for SnippetStore {
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<String> {
        let lower = query.to_lowercase();
        let mut wanted: Vec<&str> = QUERY_KEYWORDS
            .iter()
            .filter(|(kw, _)| lower.contains(kw))
            .map(|(_, ty)| *ty)
            .collect();
        wanted.dedup();
        if wanted.is_empty() {
            // the two high-traffic types
            wanted = vec!["cluster", "chiplet"];
        }
        let mut docs: Vec<String> = BUILTIN_DOCS
            .iter()
            .filter(|doc| wanted.contains(&doc.type_name))
            .map(|doc| doc.body.to_string())
            .collect();
        if docs.is_empty() {
            docs = BUILTIN_DOCS.iter().map(|doc| doc.body.to_string()).collect();
        }
        docs.truncate(top_k);
        docs
    }
}

/// Join retrieved snippets into the context blob the candidate selector
/// scans.
pub fn context_blob(snippets: &[String]) -> String {
    format!("Relevant schema snippets:\n{}", snippets.join("\n---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chiplet_query_pulls_chiplet_doc() {
        let store = SnippetStore::with_builtin_docs();
        let docs = store.retrieve("Add a GPU chiplet G1 with AXI bus width 64", 8);
        assert!(docs.iter().any(|d| d.starts_with("chiplet:")));
        assert!(docs.iter().any(|d| d.starts_with("axi_bus:")));
        assert!(!docs.iter().any(|d| d.starts_with("can_bus:")));
    }

    #[test]
    fn unmatched_query_falls_back_to_defaults() {
        let store = SnippetStore::with_builtin_docs();
        let docs = store.retrieve("do something unusual", 8);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].starts_with("cluster:"));
        assert!(docs[1].starts_with("chiplet:"));
    }

    #[test]
    fn top_k_truncates() {
        let store = SnippetStore::with_builtin_docs();
        let docs = store.retrieve("chiplet cluster network", 1);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn context_blob_is_selector_friendly() {
        let blob = context_blob(&["chiplet: stuff".to_string(), "more".to_string()]);
        assert!(blob.contains("chiplet"));
        assert!(blob.contains("---"));
    }
}
