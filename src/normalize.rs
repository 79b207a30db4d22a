//! Field normalizer: deterministic reshaping of loosely structured model
//! output toward a record type's declared shape.
//!
//! Normalization never fails. Every rule either rewrites a value into the
//! declared form or leaves it untouched; whether the result is actually
//! valid is decided later, at record construction. Normalizing data that is
//! already canonical is a no-op.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use strsim::damerau_levenshtein;

use crate::registry::RecordKind;
use crate::schema::{ETHERNET_MODES, FREQUENCY_UNITS, TIME_UNITS, UCIE_MODES};

/// Keys are renamed to a declared key at most this edit distance away.
/// Damerau-Levenshtein counts a transposition as one edit, so the classic
/// `ucei_interface` slip is covered even without its alias entry.
const MAX_KEY_DIST: usize = 1;

/// Known misspellings and legacy spellings, applied before the fuzzy pass.
/// New entries are data, not code.
static KEY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("name", "short_name"),
        ("ucei_interface", "ucie_interface"),
        ("Endpoint_DMA_Configuration", "endpoint_dma"),
        ("Frequency", "frequency"),
        ("data_iref", "data_refs"),
        ("Split_power_mw", "split_power_mw"),
        ("Delay_power_mw", "delay_power_mw"),
        ("Sequential_power_mw", "sequential_power_mw"),
        ("Static_Power_Leakage_mw", "static_power_leakage_mw"),
        ("Clock_Tree_Power_mw", "clock_tree_power_mw"),
        ("Power_Per_Nominal_Clock_Mhz", "power_per_nominal_clock_mhz"),
    ])
});

static OS_KEY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Show_UART_Terminal", "show_uart_terminal"),
        ("Affine-tasks-byOS", "affine_tasks_by_os"),
        ("Ubuntu_File_System", "file_system"),
        ("Buildroot_File_System", "file_system"),
    ])
});

static ETHERNET_MODE_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("enabled", "simulated"),
        ("on", "simulated"),
        ("true", "simulated"),
        ("disabled", "native"),
        ("off", "native"),
        ("false", "native"),
    ])
});

static UCIE_MODE_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("device", "endpoint")]));

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

const POWER_PARAMETER_KEYS: &[&str] = &[
    "split_power_mw",
    "delay_power_mw",
    "sequential_power_mw",
    "static_power_leakage_mw",
    "clock_tree_power_mw",
    "power_per_nominal_clock_mhz",
];

const OS_BLOCK_KEYS: &[&str] = &["file_system", "affine_tasks_by_os", "show_uart_terminal"];

fn declared_keys(kind: RecordKind) -> &'static [&'static str] {
    match kind {
        RecordKind::Cluster => &[
            "short_name",
            "frequency",
            "cores_per_cluster",
            "operating_system",
            "arch_family",
        ],
        RecordKind::Chiplet => &[
            "short_name",
            "axi_bus",
            "frequency",
            "ethernet_interface",
            "ucie_interface",
            "cpu_cluster",
            "power_parameters",
        ],
        RecordKind::AxiBus => &["width", "frequency"],
        RecordKind::EthernetInterface => &["mode"],
        RecordKind::UcieInterface => &["mode", "endpoint_dma"],
        RecordKind::CanBus => &["short_name", "baud_rate", "interface_refs", "can_fd"],
        RecordKind::EthSwitch => &["short_name", "interface_refs"],
        RecordKind::NetworkTopology => &["can_buses", "eth_switches"],
        RecordKind::TimingEvent => &[
            "short_name",
            "start_on_event_ref",
            "custom_behavior_ref",
            "period",
        ],
        RecordKind::DataReceivedEvent => &["short_name", "start_on_event_ref", "data_refs"],
        RecordKind::Operation => &["read", "write", "latency", "load"],
    }
}

/* ------------------------------------------------------------------ */
/*  Entry points                                                      */
/* ------------------------------------------------------------------ */

/// Reshape `raw` toward `kind`'s declared form. Pure; never fails.
pub fn normalize(kind: RecordKind, raw: &Value) -> Value {
    match kind {
        RecordKind::Cluster => normalize_cluster(raw, true),
        RecordKind::Chiplet => normalize_chiplet(raw),
        RecordKind::AxiBus => normalize_axi(raw),
        RecordKind::EthernetInterface => {
            normalize_mode_block(raw, &ETHERNET_MODE_SYNONYMS, ETHERNET_MODES, "simulated")
        }
        RecordKind::UcieInterface => normalize_ucie(raw),
        RecordKind::CanBus => normalize_can_bus(raw),
        RecordKind::EthSwitch => normalize_eth_switch(raw),
        RecordKind::NetworkTopology => normalize_network_topology(raw),
        RecordKind::TimingEvent => normalize_timing_event(raw),
        RecordKind::DataReceivedEvent => normalize_data_received_event(raw),
        RecordKind::Operation => normalize_operation(raw),
    }
}

/// Models often wrap the payload in a tool-call envelope; peel the known
/// ones off before any per-type rule runs.
pub fn unwrap_tool_envelope(v: Value) -> Value {
    const ENVELOPE_KEYS: &[&str] = &[
        "add_chiplet",
        "add_cpu_cluster",
        "create_cpu_cluster",
        "parameters",
        "args",
        "operation",
    ];
    if let Value::Object(map) = &v {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if ENVELOPE_KEYS.contains(&key.as_str()) && inner.is_object() {
                    return inner.clone();
                }
            }
        }
        // {"tool": ..., "args": {...}} tool-call form
        if let (Some(Value::String(_)), Some(inner @ Value::Object(_))) =
            (map.get("tool"), map.get("args"))
        {
            return inner.clone();
        }
    }
    v
}

/* ------------------------------------------------------------------ */
/*  Shared rules                                                      */
/* ------------------------------------------------------------------ */

/// Strip key whitespace, apply the alias table, then rename any remaining
/// unknown key to a declared key within `MAX_KEY_DIST`. First writer wins
/// when two raw keys collapse onto the same canonical key.
fn rekey(
    map: &Map<String, Value>,
    declared: &[&str],
    aliases: &HashMap<&'static str, &'static str>,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        let trimmed = key.trim();
        let aliased = aliases.get(trimmed).copied().unwrap_or(trimmed);
        let canonical = if declared.contains(&aliased) {
            aliased.to_string()
        } else {
            declared
                .iter()
                .find(|d| damerau_levenshtein(d, aliased) <= MAX_KEY_DIST)
                .map(|d| d.to_string())
                .unwrap_or_else(|| aliased.to_string())
        };
        out.entry(canonical).or_insert_with(|| value.clone());
    }
    out
}

/// `"C1"` or `{"value": "C1"}` or `{"name": "C1"}` -> `{"name": "C1"}`.
fn normalize_identity(v: &Value) -> Value {
    match v {
        Value::String(s) => json!({ "name": s }),
        Value::Object(map) => {
            let stripped: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.trim().to_string(), v.clone()))
                .collect();
            if let Some(inner) = stripped.get("value").or_else(|| stripped.get("name")) {
                json!({ "name": inner.clone() })
            } else {
                Value::Object(stripped)
            }
        }
        _ => v.clone(),
    }
}

fn parse_quantity(input: &str) -> Option<(u64, Option<&str>)> {
    use nom::character::complete::{alpha1, digit1, multispace0};
    use nom::combinator::opt;
    use nom::IResult;

    fn quantity(input: &str) -> IResult<&str, (&str, Option<&str>)> {
        let (input, _) = multispace0(input)?;
        let (input, digits) = digit1(input)?;
        let (input, _) = multispace0(input)?;
        let (input, unit) = opt(alpha1)(input)?;
        Ok((input, (digits, unit)))
    }

    let (_, (digits, unit)) = quantity(input).ok()?;
    digits.parse::<u64>().ok().map(|value| (value, unit))
}

/// Numbers get wrapped with the default unit; strings give up their first
/// digit run (and their unit token when it names a known unit); mappings
/// pass through untouched.
fn normalize_quantity(v: &Value, default_unit: &str, units: &[&str]) -> Value {
    match v {
        Value::Number(_) => json!({ "value": v.clone(), "unit": default_unit }),
        Value::String(s) => {
            let start = match s.find(|c: char| c.is_ascii_digit()) {
                Some(i) => i,
                None => return v.clone(),
            };
            match parse_quantity(&s[start..]) {
                Some((value, unit)) => {
                    let unit = unit
                        .and_then(|u| units.iter().find(|known| known.eq_ignore_ascii_case(u)))
                        .map(|u| u.to_string())
                        .unwrap_or_else(|| default_unit.to_string());
                    json!({ "value": value, "unit": unit })
                }
                None => v.clone(),
            }
        }
        _ => v.clone(),
    }
}

/// Integer-ish coercion: first digit run of a string, `{"value": n}`
/// wrapper unwrap, numbers unchanged.
fn coerce_count(v: &Value) -> Value {
    match v {
        Value::String(s) => match DIGIT_RUN
            .find(s)
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            Some(n) => json!(n),
            None => v.clone(),
        },
        Value::Object(map) if map.len() == 1 => match map.get("value") {
            Some(inner) => coerce_count(inner),
            None => v.clone(),
        },
        _ => v.clone(),
    }
}

fn coerce_bool(v: &Value) -> Value {
    match v {
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => json!(true),
            "false" | "off" | "no" | "0" => json!(false),
            _ => v.clone(),
        },
        Value::Number(n) => match n.as_i64() {
            Some(0) => json!(false),
            Some(1) => json!(true),
            _ => v.clone(),
        },
        _ => v.clone(),
    }
}

/// Reference blocks collapse to their path string: `{"DEST": "/x"}`,
/// `{"iref": ...}` and nested combinations all become `"/x"`.
fn normalize_ref(v: &Value) -> Value {
    if let Value::Object(map) = v {
        for key in ["DEST", "dest", "IREF", "iref"] {
            if let Some(inner) = map.get(key) {
                return normalize_ref(inner);
            }
        }
    }
    v.clone()
}

/// A collection field given a bare scalar becomes a one-element list.
fn normalize_ref_list(v: &Value) -> Value {
    match v {
        Value::Array(items) => Value::Array(items.iter().map(normalize_ref).collect()),
        Value::String(_) | Value::Object(_) => Value::Array(vec![normalize_ref(v)]),
        _ => v.clone(),
    }
}

fn normalize_mode(
    raw: &str,
    synonyms: &HashMap<&'static str, &'static str>,
    allowed: &[&str],
    default: &str,
) -> String {
    let lower = raw.trim().to_lowercase();
    if allowed.contains(&lower.as_str()) {
        return lower;
    }
    synonyms
        .get(lower.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| default.to_string())
}

fn normalize_mode_block(
    v: &Value,
    synonyms: &HashMap<&'static str, &'static str>,
    allowed: &[&str],
    default: &str,
) -> Value {
    let mode_of = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) => Some(normalize_mode(s, synonyms, allowed, default)),
            // booleans ride the synonym table: true/false behave like the
            // strings "true"/"false"
            Value::Bool(b) => Some(normalize_mode(
                if *b { "true" } else { "false" },
                synonyms,
                allowed,
                default,
            )),
            _ => None,
        }
    };
    match v {
        Value::String(_) | Value::Bool(_) => match mode_of(v) {
            Some(mode) => json!({ "mode": mode }),
            None => v.clone(),
        },
        Value::Object(map) => {
            let mut map = rekey(map, &["mode"], &KEY_ALIASES);
            if let Some(mode) = map.get("mode").cloned().as_ref().and_then(mode_of) {
                map.insert("mode".to_string(), json!(mode));
            }
            Value::Object(map)
        }
        _ => v.clone(),
    }
}

/* ------------------------------------------------------------------ */
/*  Per-type rules                                                    */
/* ------------------------------------------------------------------ */

fn normalize_cluster(v: &Value, top_level: bool) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::Cluster), &KEY_ALIASES);
    if let Some(sn) = map.get("short_name").cloned() {
        map.insert("short_name".to_string(), normalize_identity(&sn));
    }
    match map.get("frequency").cloned() {
        Some(freq) => {
            map.insert(
                "frequency".to_string(),
                normalize_quantity(&freq, "MHz", FREQUENCY_UNITS),
            );
        }
        // A top-level cluster with no frequency gets the shaped zero form;
        // construction still rejects it, but the failure names the value,
        // not the shape. Nested clusters keep the field absent.
        None if top_level => {
            map.insert("frequency".to_string(), json!({ "value": 0, "unit": "MHz" }));
        }
        None => {}
    }
    if let Some(cores) = map.get("cores_per_cluster").cloned() {
        map.insert("cores_per_cluster".to_string(), coerce_count(&cores));
    }
    if let Some(os) = map.get("operating_system").cloned() {
        map.insert("operating_system".to_string(), normalize_os(&os));
    }
    Value::Object(map)
}

fn normalize_os(v: &Value) -> Value {
    match v {
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "linux" => json!({ "Linux": {} }),
            "nucleus" | "nucleus_rtos" | "nucleus rtos" => json!({ "Nucleus_RTOS": {} }),
            _ => v.clone(),
        },
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, body) in map {
                let canonical = match key.trim().to_lowercase().as_str() {
                    "linux" => "Linux".to_string(),
                    "nucleus" | "nucleus_rtos" | "nucleusrtos" => "Nucleus_RTOS".to_string(),
                    _ => key.trim().to_string(),
                };
                out.insert(canonical, normalize_os_block(body));
            }
            Value::Object(out)
        }
        _ => v.clone(),
    }
}

fn normalize_os_block(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut out = Map::new();
    for (key, value) in rekey(raw, OS_BLOCK_KEYS, &OS_KEY_ALIASES) {
        let value = match key.as_str() {
            "affine_tasks_by_os" | "show_uart_terminal" => coerce_bool(&value),
            _ => value,
        };
        out.insert(key, value);
    }
    Value::Object(out)
}

fn normalize_chiplet(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::Chiplet), &KEY_ALIASES);
    if let Some(sn) = map.get("short_name").cloned() {
        map.insert("short_name".to_string(), normalize_identity(&sn));
    }
    if let Some(axi) = map.get("axi_bus").cloned() {
        map.insert("axi_bus".to_string(), normalize_axi(&axi));
    }
    if let Some(freq) = map.get("frequency").cloned() {
        map.insert(
            "frequency".to_string(),
            normalize_quantity(&freq, "MHz", FREQUENCY_UNITS),
        );
    }
    if let Some(eth) = map.get("ethernet_interface").cloned() {
        map.insert(
            "ethernet_interface".to_string(),
            normalize_mode_block(&eth, &ETHERNET_MODE_SYNONYMS, ETHERNET_MODES, "simulated"),
        );
    }
    if let Some(ucie) = map.get("ucie_interface").cloned() {
        map.insert("ucie_interface".to_string(), normalize_ucie(&ucie));
    }
    if let Some(cluster) = map.get("cpu_cluster").cloned() {
        map.insert(
            "cpu_cluster".to_string(),
            normalize_cluster(&cluster, false),
        );
    }
    if let Some(power) = map.get("power_parameters").cloned() {
        if let Value::Object(power) = &power {
            map.insert(
                "power_parameters".to_string(),
                Value::Object(rekey(power, POWER_PARAMETER_KEYS, &KEY_ALIASES)),
            );
        }
    }
    Value::Object(map)
}

fn normalize_axi(v: &Value) -> Value {
    match v {
        // a bare number is a width: "AXI bus width 64"
        Value::Number(_) | Value::String(_) => json!({ "width": coerce_count(v) }),
        Value::Object(raw) => {
            let map = rekey(raw, declared_keys(RecordKind::AxiBus), &KEY_ALIASES);
            // {"value": 64, "unit": "bytes"} routes by unit
            if let (Some(value), Some(Value::String(unit))) = (map.get("value"), map.get("unit")) {
                let unit = unit.to_lowercase();
                if unit.starts_with("byte") {
                    return json!({ "width": coerce_count(value) });
                }
                if matches!(unit.as_str(), "hz" | "khz" | "mhz" | "ghz") {
                    return json!({ "frequency": coerce_count(value) });
                }
            }
            let mut out = Map::new();
            for (key, value) in map {
                let value = match key.as_str() {
                    "width" | "frequency" => coerce_count(&value),
                    _ => value,
                };
                out.insert(key, value);
            }
            Value::Object(out)
        }
        _ => v.clone(),
    }
}

fn normalize_ucie(v: &Value) -> Value {
    match v {
        Value::String(_) | Value::Bool(_) => {
            normalize_mode_block(v, &UCIE_MODE_SYNONYMS, UCIE_MODES, "host")
        }
        Value::Object(raw) => {
            let mut map = rekey(raw, declared_keys(RecordKind::UcieInterface), &KEY_ALIASES);
            if let Some(Value::String(mode)) = map.get("mode").cloned() {
                map.insert(
                    "mode".to_string(),
                    json!(normalize_mode(
                        &mode,
                        &UCIE_MODE_SYNONYMS,
                        UCIE_MODES,
                        "host"
                    )),
                );
            }
            if let Some(Value::Object(dma)) = map.get("endpoint_dma").cloned() {
                let mut dma = rekey(&dma, &["frequency"], &KEY_ALIASES);
                if let Some(freq) = dma.get("frequency").cloned() {
                    dma.insert("frequency".to_string(), coerce_count(&freq));
                }
                map.insert("endpoint_dma".to_string(), Value::Object(dma));
            }
            Value::Object(map)
        }
        _ => v.clone(),
    }
}

fn normalize_can_bus(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::CanBus), &KEY_ALIASES);
    if let Some(sn) = map.get("short_name").cloned() {
        map.insert("short_name".to_string(), normalize_identity(&sn));
    }
    if let Some(baud) = map.get("baud_rate").cloned() {
        map.insert("baud_rate".to_string(), coerce_count(&baud));
    }
    if let Some(refs) = map.get("interface_refs").cloned() {
        map.insert("interface_refs".to_string(), normalize_ref_list(&refs));
    }
    if let Some(fd) = map.get("can_fd").cloned() {
        map.insert("can_fd".to_string(), coerce_bool(&fd));
    }
    Value::Object(map)
}

fn normalize_eth_switch(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::EthSwitch), &KEY_ALIASES);
    if let Some(sn) = map.get("short_name").cloned() {
        map.insert("short_name".to_string(), normalize_identity(&sn));
    }
    if let Some(refs) = map.get("interface_refs").cloned() {
        map.insert("interface_refs".to_string(), normalize_ref_list(&refs));
    }
    Value::Object(map)
}

fn normalize_network_topology(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::NetworkTopology), &KEY_ALIASES);
    for (field, rule) in [
        ("can_buses", normalize_can_bus as fn(&Value) -> Value),
        ("eth_switches", normalize_eth_switch),
    ] {
        if let Some(segments) = map.get(field).cloned() {
            let normalized = match &segments {
                Value::Array(items) => Value::Array(items.iter().map(rule).collect()),
                Value::Object(_) => Value::Array(vec![rule(&segments)]),
                _ => segments.clone(),
            };
            map.insert(field.to_string(), normalized);
        }
    }
    Value::Object(map)
}

fn normalize_timing_event(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::TimingEvent), &KEY_ALIASES);
    if let Some(sn) = map.get("short_name").cloned() {
        map.insert("short_name".to_string(), normalize_identity(&sn));
    }
    for field in ["start_on_event_ref", "custom_behavior_ref"] {
        if let Some(r) = map.get(field).cloned() {
            map.insert(field.to_string(), normalize_ref(&r));
        }
    }
    if let Some(period) = map.get("period").cloned() {
        map.insert(
            "period".to_string(),
            normalize_quantity(&period, "ms", TIME_UNITS),
        );
    }
    Value::Object(map)
}

fn normalize_data_received_event(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(
        raw,
        declared_keys(RecordKind::DataReceivedEvent),
        &KEY_ALIASES,
    );
    if let Some(sn) = map.get("short_name").cloned() {
        map.insert("short_name".to_string(), normalize_identity(&sn));
    }
    if let Some(r) = map.get("start_on_event_ref").cloned() {
        map.insert("start_on_event_ref".to_string(), normalize_ref(&r));
    }
    if let Some(refs) = map.get("data_refs").cloned() {
        map.insert("data_refs".to_string(), normalize_ref_list(&refs));
    }
    Value::Object(map)
}

fn normalize_operation(v: &Value) -> Value {
    let raw = match v {
        Value::Object(map) => map,
        _ => return v.clone(),
    };
    let mut map = rekey(raw, declared_keys(RecordKind::Operation), &KEY_ALIASES);
    for field in ["read", "write"] {
        if let Some(r) = map.get(field).cloned() {
            map.insert(field.to_string(), normalize_ref(&r));
        }
    }
    if let Some(latency) = map.get("latency").cloned() {
        map.insert(
            "latency".to_string(),
            normalize_quantity(&latency, "ns", TIME_UNITS),
        );
    }
    if let Some(load) = map.get("load").cloned() {
        map.insert("load".to_string(), coerce_count(&load));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cluster_scenario_shapes_all_fields() {
        let raw = json!({
            "short_name": "C1",
            "frequency": "2000 MHz",
            "cores_per_cluster": 4,
        });
        let shaped = normalize(RecordKind::Cluster, &raw);
        assert_eq!(
            shaped,
            json!({
                "short_name": { "name": "C1" },
                "frequency": { "value": 2000, "unit": "MHz" },
                "cores_per_cluster": 4,
            })
        );
    }

    #[test]
    fn mistyped_ucie_key_and_device_mode_are_repaired() {
        let raw = json!({
            "short_name": "G1",
            "ucei_interface": "device",
        });
        let shaped = normalize(RecordKind::Chiplet, &raw);
        assert_eq!(shaped["ucie_interface"], json!({ "mode": "endpoint" }));
        assert!(shaped.get("ucei_interface").is_none());
    }

    #[test]
    fn fuzzy_rename_covers_novel_typos() {
        let raw = json!({
            "short_name": "C1",
            "frequncy": 100,
            "cores_per_cluster": 1,
        });
        let shaped = normalize(RecordKind::Cluster, &raw);
        assert_eq!(shaped["frequency"], json!({ "value": 100, "unit": "MHz" }));
    }

    #[test]
    fn keys_with_surrounding_whitespace_are_stripped() {
        let raw = json!({ " name ": "C1", "frequency": 10, "cores_per_cluster": 2 });
        let shaped = normalize(RecordKind::Cluster, &raw);
        assert_eq!(shaped["short_name"], json!({ "name": "C1" }));
    }

    #[test]
    fn identity_value_key_wins_over_name() {
        let raw = json!({ "short_name": { "value": "C2" }, "frequency": 1, "cores_per_cluster": 1 });
        let shaped = normalize(RecordKind::Cluster, &raw);
        assert_eq!(shaped["short_name"], json!({ "name": "C2" }));
    }

    #[test]
    fn ethernet_synonyms_and_fallback() {
        for (raw, want) in [
            ("enabled", "simulated"),
            ("on", "simulated"),
            ("true", "simulated"),
            ("disabled", "native"),
            ("off", "native"),
            ("garbage", "simulated"),
            ("native", "native"),
        ] {
            let shaped = normalize(RecordKind::EthernetInterface, &json!(raw));
            assert_eq!(shaped, json!({ "mode": want }), "input {raw:?}");
        }
    }

    #[test]
    fn ucie_unknown_mode_falls_back_to_host() {
        let shaped = normalize(RecordKind::UcieInterface, &json!("weird"));
        assert_eq!(shaped, json!({ "mode": "host" }));
    }

    #[test]
    fn axi_value_unit_pairs_route_by_unit() {
        let bytes = normalize(RecordKind::AxiBus, &json!({ "value": 64, "unit": "bytes" }));
        assert_eq!(bytes, json!({ "width": 64 }));
        let hz = normalize(RecordKind::AxiBus, &json!({ "value": 2000000, "unit": "Hz" }));
        assert_eq!(hz, json!({ "frequency": 2000000 }));
    }

    #[test]
    fn missing_top_level_cluster_frequency_gets_shaped_zero() {
        let shaped = normalize(RecordKind::Cluster, &json!({ "short_name": "C1" }));
        assert_eq!(shaped["frequency"], json!({ "value": 0, "unit": "MHz" }));
        // nested clusters are left alone
        let chiplet = normalize(
            RecordKind::Chiplet,
            &json!({ "short_name": "G1", "cpu_cluster": { "short_name": "C1" } }),
        );
        assert!(chiplet["cpu_cluster"].get("frequency").is_none());
    }

    #[test]
    fn scalar_ref_becomes_single_element_list() {
        let raw = json!({
            "short_name": "E1",
            "start_on_event_ref": "/SWC1/B/R",
            "data_refs": "/SWC2/B/R/Elem",
        });
        let shaped = normalize(RecordKind::DataReceivedEvent, &raw);
        assert_eq!(shaped["data_refs"], json!(["/SWC2/B/R/Elem"]));
    }

    #[test]
    fn reference_blocks_collapse_to_path_strings() {
        let raw = json!({
            "write": { "IREF": { "DEST": "/swc/b/r/v" } },
            "load": { "value": 25000 },
        });
        let shaped = normalize(RecordKind::Operation, &raw);
        assert_eq!(shaped["write"], json!("/swc/b/r/v"));
        assert_eq!(shaped["load"], json!(25000));
    }

    #[test]
    fn operation_latency_default_unit_is_ns() {
        let shaped = normalize(RecordKind::Operation, &json!({ "latency": 6 }));
        assert_eq!(shaped["latency"], json!({ "value": 6, "unit": "ns" }));
    }

    #[test]
    fn envelope_unwrap() {
        let wrapped = json!({ "add_chiplet": { "short_name": "G1" } });
        assert_eq!(
            unwrap_tool_envelope(wrapped),
            json!({ "short_name": "G1" })
        );

        let tool_call = json!({ "tool": "create_cpu_cluster", "args": { "short_name": "C1" } });
        assert_eq!(
            unwrap_tool_envelope(tool_call),
            json!({ "short_name": "C1" })
        );

        let plain = json!({ "short_name": "C1", "frequency": 1 });
        assert_eq!(unwrap_tool_envelope(plain.clone()), plain);
    }

    #[test]
    fn operating_system_bare_string_and_legacy_keys() {
        let raw = json!({
            "short_name": "C1",
            "frequency": 100,
            "cores_per_cluster": 4,
            "operating_system": { "Linux": {
                "Show_UART_Terminal": "true",
                "Ubuntu_File_System": "22.04",
            }},
        });
        let shaped = normalize(RecordKind::Cluster, &raw);
        assert_eq!(
            shaped["operating_system"],
            json!({ "Linux": { "show_uart_terminal": true, "file_system": "22.04" } })
        );

        let bare = normalize(
            RecordKind::Cluster,
            &json!({ "short_name": "C1", "frequency": 1, "cores_per_cluster": 1, "operating_system": "linux" }),
        );
        assert_eq!(bare["operating_system"], json!({ "Linux": {} }));
    }

    fn messy_cluster() -> impl Strategy<Value = serde_json::Value> {
        let name = prop_oneof![
            "[A-Z][0-9]{1,3}".prop_map(|s| json!(s)),
            "[A-Z][0-9]{1,3}".prop_map(|s| json!({ "name": s })),
        ];
        let frequency = prop_oneof![
            (1u64..5000).prop_map(|n| json!(n)),
            (1u64..5000).prop_map(|n| json!(format!("{n} MHz"))),
            (1u64..5000).prop_map(|n| json!({ "value": n, "unit": "MHz" })),
        ];
        let cores = prop_oneof![
            prop::sample::select(vec![1u64, 2, 3, 4, 8, 16]).prop_map(|n| json!(n)),
            prop::sample::select(vec![1u64, 2, 4]).prop_map(|n| json!(format!("{n} cores"))),
        ];
        (name, frequency, cores).prop_map(|(n, f, c)| {
            json!({ "short_name": n, "frequency": f, "cores_per_cluster": c })
        })
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in messy_cluster()) {
            let once = normalize(RecordKind::Cluster, &raw);
            let twice = normalize(RecordKind::Cluster, &once);
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn chiplet_normalization_is_idempotent_on_samples() {
        let samples = [
            json!({
                "short_name": "G1",
                "axi_bus": { "value": 64, "unit": "bytes" },
                "frequency": "1000000 Hz",
                "ethernet_interface": "enabled",
                "ucei_interface": "device",
            }),
            json!({
                "short_name": { "value": "N1" },
                "axi_bus": 128,
                "ethernet_interface": { "mode": "off" },
                "ucie_interface": { "mode": "endpoint", "Endpoint_DMA_Configuration": { "Frequency": 110 } },
                "cpu_cluster": { "short_name": "C1", "frequency": 2000, "cores_per_cluster": 4 },
            }),
        ];
        for raw in samples {
            let once = normalize(RecordKind::Chiplet, &raw);
            let twice = normalize(RecordKind::Chiplet, &once);
            assert_eq!(once, twice);
        }
    }
}
