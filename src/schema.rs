//! Configuration record types for the simulated hardware platform.
//!
//! Every record is built once from a raw `serde_json::Value` mapping via its
//! `from_value` constructor and is immutable afterwards. Construction is the
//! validation step: required fields, numeric bounds, enumeration membership
//! and collection cardinality are all enforced here, recursively for nested
//! records. `to_value` renders the canonical, default-filled form.

use std::fmt;

use serde_json::{json, Map, Value};

/// A single constraint violation, with enough context to name the offending
/// field through arbitrary nesting.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    MissingField(&'static str),
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: Option<u64>,
    },
    OutOfRangeFloat {
        field: &'static str,
        value: f64,
        min: f64,
    },
    NotInSet {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
    Cardinality {
        field: &'static str,
        len: usize,
        min: usize,
        max: Option<usize>,
    },
    EmptyValue {
        field: &'static str,
    },
    Nested {
        field: &'static str,
        source: Box<ValidationFailure>,
    },
    Element {
        field: &'static str,
        index: usize,
        source: Box<ValidationFailure>,
    },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{}` is missing", field),
            Self::WrongType { field, expected } => {
                write!(f, "field `{}` expected {}", field, expected)
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max: Some(max),
            } => write!(
                f,
                "field `{}` value {} outside {}..={}",
                field, value, min, max
            ),
            Self::OutOfRange {
                field, value, min, ..
            } => write!(f, "field `{}` value {} below minimum {}", field, value, min),
            Self::OutOfRangeFloat { field, value, min } => {
                write!(f, "field `{}` value {} below minimum {}", field, value, min)
            }
            Self::NotInSet {
                field,
                value,
                allowed,
            } => write!(
                f,
                "field `{}` value `{}` not one of [{}]",
                field,
                value,
                allowed.join(", ")
            ),
            Self::Cardinality {
                field,
                len,
                min,
                max,
            } => match max {
                Some(max) => write!(
                    f,
                    "field `{}` has {} elements, expected {}..={}",
                    field, len, min, max
                ),
                None => write!(
                    f,
                    "field `{}` has {} elements, expected at least {}",
                    field, len, min
                ),
            },
            Self::EmptyValue { field } => write!(f, "field `{}` must not be empty", field),
            Self::Nested { field, source } => write!(f, "{}: {}", field, source),
            Self::Element {
                field,
                index,
                source,
            } => write!(f, "{}[{}]: {}", field, index, source),
        }
    }
}

impl std::error::Error for ValidationFailure {}

/* ------------------------------------------------------------------ */
/*  Field helpers                                                     */
/* ------------------------------------------------------------------ */

fn as_object<'a>(
    v: &'a Value,
    field: &'static str,
) -> Result<&'a Map<String, Value>, ValidationFailure> {
    v.as_object()
        .ok_or(ValidationFailure::WrongType { field, expected: "object" })
}

/// Explicit `null` counts as absent; the normalizer fills optional blocks
/// with `null` instead of inventing values.
fn present<'a>(map: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    match map.get(field) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    }
}

fn req<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationFailure> {
    present(map, field).ok_or(ValidationFailure::MissingField(field))
}

fn uint(v: &Value, field: &'static str) -> Result<u64, ValidationFailure> {
    v.as_u64().ok_or(ValidationFailure::WrongType {
        field,
        expected: "unsigned integer",
    })
}

fn bounded_int(
    v: &Value,
    field: &'static str,
    min: u64,
    max: Option<u64>,
) -> Result<u64, ValidationFailure> {
    let n = uint(v, field)?;
    if n < min || max.map_or(false, |m| n > m) {
        return Err(ValidationFailure::OutOfRange {
            field,
            value: n,
            min,
            max,
        });
    }
    Ok(n)
}

fn float_min(v: &Value, field: &'static str, min: f64) -> Result<f64, ValidationFailure> {
    let x = v.as_f64().ok_or(ValidationFailure::WrongType {
        field,
        expected: "number",
    })?;
    if x < min {
        return Err(ValidationFailure::OutOfRangeFloat { field, value: x, min });
    }
    Ok(x)
}

fn string(v: &Value, field: &'static str) -> Result<String, ValidationFailure> {
    v.as_str()
        .map(str::to_string)
        .ok_or(ValidationFailure::WrongType {
            field,
            expected: "string",
        })
}

fn boolean(v: &Value, field: &'static str) -> Result<bool, ValidationFailure> {
    v.as_bool().ok_or(ValidationFailure::WrongType {
        field,
        expected: "boolean",
    })
}

fn nested<T>(
    field: &'static str,
    result: Result<T, ValidationFailure>,
) -> Result<T, ValidationFailure> {
    result.map_err(|source| ValidationFailure::Nested {
        field,
        source: Box::new(source),
    })
}

fn string_list(
    map: &Map<String, Value>,
    field: &'static str,
    min: usize,
) -> Result<Vec<String>, ValidationFailure> {
    let v = match present(map, field) {
        Some(v) => v,
        None if min == 0 => return Ok(Vec::new()),
        None => return Err(ValidationFailure::MissingField(field)),
    };
    let arr = v.as_array().ok_or(ValidationFailure::WrongType {
        field,
        expected: "array",
    })?;
    let mut out = Vec::with_capacity(arr.len());
    for (index, item) in arr.iter().enumerate() {
        match item.as_str() {
            Some(s) => out.push(s.to_string()),
            None => {
                return Err(ValidationFailure::Element {
                    field,
                    index,
                    source: Box::new(ValidationFailure::WrongType {
                        field,
                        expected: "string",
                    }),
                })
            }
        }
    }
    if out.len() < min {
        return Err(ValidationFailure::Cardinality {
            field,
            len: out.len(),
            min,
            max: None,
        });
    }
    Ok(out)
}

fn record_list<T>(
    map: &Map<String, Value>,
    field: &'static str,
    max: usize,
    build: fn(&Value) -> Result<T, ValidationFailure>,
) -> Result<Vec<T>, ValidationFailure> {
    let v = match present(map, field) {
        Some(v) => v,
        None => return Ok(Vec::new()),
    };
    let arr = v.as_array().ok_or(ValidationFailure::WrongType {
        field,
        expected: "array",
    })?;
    if arr.len() > max {
        return Err(ValidationFailure::Cardinality {
            field,
            len: arr.len(),
            min: 0,
            max: Some(max),
        });
    }
    let mut out = Vec::with_capacity(arr.len());
    for (index, item) in arr.iter().enumerate() {
        out.push(build(item).map_err(|source| ValidationFailure::Element {
            field,
            index,
            source: Box::new(source),
        })?);
    }
    Ok(out)
}

/* ------------------------------------------------------------------ */
/*  Shared leaf types                                                 */
/* ------------------------------------------------------------------ */

/// `{ "name": <string> }` identity block, required non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "short_name")?;
        let name = string(req(map, "name")?, "name")?;
        if name.trim().is_empty() {
            return Err(ValidationFailure::EmptyValue { field: "name" });
        }
        Ok(Self { name })
    }

    pub fn to_value(&self) -> Value {
        json!({ "name": self.name })
    }
}

pub const FREQUENCY_UNITS: &[&str] = &["Hz", "kHz", "MHz", "GHz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyUnit {
    Hz,
    KHz,
    MHz,
    GHz,
}

impl FrequencyUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hz" => Some(Self::Hz),
            "khz" => Some(Self::KHz),
            "mhz" => Some(Self::MHz),
            "ghz" => Some(Self::GHz),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hz => "Hz",
            Self::KHz => "kHz",
            Self::MHz => "MHz",
            Self::GHz => "GHz",
        }
    }
}

pub const FREQUENCY_MIN: u64 = 1;
pub const FREQUENCY_MAX: u64 = 1_000_000_000;

/// `{ "value": <int>, "unit": "MHz" }`; the unit defaults to MHz when the
/// mapping omits it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frequency {
    pub value: u64,
    pub unit: FrequencyUnit,
}

impl Frequency {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "frequency")?;
        let value = bounded_int(req(map, "value")?, "value", FREQUENCY_MIN, Some(FREQUENCY_MAX))?;
        let unit = match present(map, "unit") {
            None => FrequencyUnit::MHz,
            Some(u) => {
                let s = string(u, "unit")?;
                FrequencyUnit::parse(&s).ok_or(ValidationFailure::NotInSet {
                    field: "unit",
                    value: s,
                    allowed: FREQUENCY_UNITS,
                })?
            }
        };
        Ok(Self { value, unit })
    }

    pub fn to_value(&self) -> Value {
        json!({ "value": self.value, "unit": self.unit.as_str() })
    }
}

pub const TIME_UNITS: &[&str] = &["s", "ms", "us", "ns"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    S,
    Ms,
    Us,
    Ns,
}

impl TimeUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s" => Some(Self::S),
            "ms" => Some(Self::Ms),
            "us" => Some(Self::Us),
            "ns" => Some(Self::Ns),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "s",
            Self::Ms => "ms",
            Self::Us => "us",
            Self::Ns => "ns",
        }
    }
}

/// Time quantity used for event periods and operation latencies. Both the
/// value and the unit are required; the normalizer supplies default units,
/// never this constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeValue {
    pub value: u64,
    pub unit: TimeUnit,
}

impl TimeValue {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "period")?;
        let value = bounded_int(req(map, "value")?, "value", 1, None)?;
        let s = string(req(map, "unit")?, "unit")?;
        let unit = TimeUnit::parse(&s).ok_or(ValidationFailure::NotInSet {
            field: "unit",
            value: s,
            allowed: TIME_UNITS,
        })?;
        Ok(Self { value, unit })
    }

    pub fn to_value(&self) -> Value {
        json!({ "value": self.value, "unit": self.unit.as_str() })
    }
}

/* ------------------------------------------------------------------ */
/*  Buses and interfaces                                              */
/* ------------------------------------------------------------------ */

pub const AXI_WIDTH_DEFAULT: u32 = 4;
pub const AXI_FREQUENCY_DEFAULT: u64 = 100_000_000;
pub const AXI_FREQUENCY_MIN: u64 = 1_000_000;

/// AXI bus: width in bytes, frequency in Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct AxiBus {
    pub width: u32,
    pub frequency: u64,
}

impl Default for AxiBus {
    fn default() -> Self {
        Self {
            width: AXI_WIDTH_DEFAULT,
            frequency: AXI_FREQUENCY_DEFAULT,
        }
    }
}

impl AxiBus {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "axi_bus")?;
        let width = match present(map, "width") {
            None => AXI_WIDTH_DEFAULT,
            Some(w) => bounded_int(w, "width", 1, Some(u32::MAX as u64))? as u32,
        };
        let frequency = match present(map, "frequency") {
            None => AXI_FREQUENCY_DEFAULT,
            Some(f) => bounded_int(f, "frequency", AXI_FREQUENCY_MIN, None)?,
        };
        Ok(Self { width, frequency })
    }

    pub fn to_value(&self) -> Value {
        json!({ "width": self.width, "frequency": self.frequency })
    }
}

pub const ETHERNET_MODES: &[&str] = &["simulated", "native"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EthernetMode {
    #[default]
    Simulated,
    Native,
}

impl EthernetMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Native => "native",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EthernetInterface {
    pub mode: EthernetMode,
}

impl EthernetInterface {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "ethernet_interface")?;
        let mode = match present(map, "mode") {
            None => EthernetMode::Simulated,
            Some(m) => match string(m, "mode")?.as_str() {
                "simulated" => EthernetMode::Simulated,
                "native" => EthernetMode::Native,
                other => {
                    return Err(ValidationFailure::NotInSet {
                        field: "mode",
                        value: other.to_string(),
                        allowed: ETHERNET_MODES,
                    })
                }
            },
        };
        Ok(Self { mode })
    }

    pub fn to_value(&self) -> Value {
        json!({ "mode": self.mode.as_str() })
    }
}

pub const UCIE_MODES: &[&str] = &["host", "endpoint"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UcieMode {
    Host,
    Endpoint,
}

impl UcieMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Endpoint => "endpoint",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDmaConfig {
    pub frequency: u64,
}

impl EndpointDmaConfig {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "endpoint_dma")?;
        let frequency = bounded_int(req(map, "frequency")?, "frequency", 1, None)?;
        Ok(Self { frequency })
    }

    pub fn to_value(&self) -> Value {
        json!({ "frequency": self.frequency })
    }
}

/// Inter-chiplet communication interface over UCIe.
#[derive(Debug, Clone, PartialEq)]
pub struct UcieInterface {
    pub mode: UcieMode,
    pub endpoint_dma: Option<EndpointDmaConfig>,
}

impl UcieInterface {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "ucie_interface")?;
        let mode = match string(req(map, "mode")?, "mode")?.as_str() {
            "host" => UcieMode::Host,
            "endpoint" => UcieMode::Endpoint,
            other => {
                return Err(ValidationFailure::NotInSet {
                    field: "mode",
                    value: other.to_string(),
                    allowed: UCIE_MODES,
                })
            }
        };
        let endpoint_dma = match present(map, "endpoint_dma") {
            None => None,
            Some(v) => Some(nested("endpoint_dma", EndpointDmaConfig::from_value(v))?),
        };
        Ok(Self { mode, endpoint_dma })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("mode".to_string(), json!(self.mode.as_str()));
        if let Some(dma) = &self.endpoint_dma {
            map.insert("endpoint_dma".to_string(), dma.to_value());
        }
        Value::Object(map)
    }
}

/* ------------------------------------------------------------------ */
/*  CPU cluster                                                       */
/* ------------------------------------------------------------------ */

pub const CORES_PER_CLUSTER: &[u64] = &[1, 2, 4, 8, 16];
const CORES_PER_CLUSTER_NAMES: &[&str] = &["1", "2", "4", "8", "16"];

#[derive(Debug, Clone, PartialEq)]
pub enum OperatingSystem {
    NucleusRtos {
        affine_tasks_by_os: bool,
        show_uart_terminal: bool,
    },
    Linux {
        file_system: Option<String>,
        affine_tasks_by_os: bool,
        show_uart_terminal: bool,
    },
}

pub const OS_KINDS: &[&str] = &["Nucleus_RTOS", "Linux"];

impl OperatingSystem {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "operating_system")?;
        if map.len() != 1 {
            return Err(ValidationFailure::NotInSet {
                field: "operating_system",
                value: Value::Object(map.clone()).to_string(),
                allowed: OS_KINDS,
            });
        }
        let (kind, body) = map.iter().next().ok_or(ValidationFailure::MissingField(
            "operating_system",
        ))?;
        let body = as_object(body, "operating_system")?;
        let affine_tasks_by_os = match present(body, "affine_tasks_by_os") {
            None => false,
            Some(v) => boolean(v, "affine_tasks_by_os")?,
        };
        let show_uart_terminal = match present(body, "show_uart_terminal") {
            None => false,
            Some(v) => boolean(v, "show_uart_terminal")?,
        };
        match kind.as_str() {
            "Nucleus_RTOS" => Ok(Self::NucleusRtos {
                affine_tasks_by_os,
                show_uart_terminal,
            }),
            "Linux" => {
                let file_system = match present(body, "file_system") {
                    None => None,
                    Some(v) => Some(string(v, "file_system")?),
                };
                Ok(Self::Linux {
                    file_system,
                    affine_tasks_by_os,
                    show_uart_terminal,
                })
            }
            other => Err(ValidationFailure::NotInSet {
                field: "operating_system",
                value: other.to_string(),
                allowed: OS_KINDS,
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::NucleusRtos {
                affine_tasks_by_os,
                show_uart_terminal,
            } => json!({
                "Nucleus_RTOS": {
                    "affine_tasks_by_os": affine_tasks_by_os,
                    "show_uart_terminal": show_uart_terminal,
                }
            }),
            Self::Linux {
                file_system,
                affine_tasks_by_os,
                show_uart_terminal,
            } => {
                let mut body = Map::new();
                if let Some(fs) = file_system {
                    body.insert("file_system".to_string(), json!(fs));
                }
                body.insert("affine_tasks_by_os".to_string(), json!(affine_tasks_by_os));
                body.insert("show_uart_terminal".to_string(), json!(show_uart_terminal));
                json!({ "Linux": body })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuCluster {
    pub short_name: Identity,
    pub frequency: Frequency,
    pub cores_per_cluster: u8,
    pub operating_system: Option<OperatingSystem>,
    pub arch_family: Option<String>,
}

impl CpuCluster {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "cluster")?;
        let short_name = nested("short_name", Identity::from_value(req(map, "short_name")?))?;
        let frequency = nested("frequency", Frequency::from_value(req(map, "frequency")?))?;
        let cores = uint(req(map, "cores_per_cluster")?, "cores_per_cluster")?;
        if !CORES_PER_CLUSTER.contains(&cores) {
            return Err(ValidationFailure::NotInSet {
                field: "cores_per_cluster",
                value: cores.to_string(),
                allowed: CORES_PER_CLUSTER_NAMES,
            });
        }
        let operating_system = match present(map, "operating_system") {
            None => None,
            Some(v) => Some(nested(
                "operating_system",
                OperatingSystem::from_value(v),
            )?),
        };
        let arch_family = match present(map, "arch_family") {
            None => None,
            Some(v) => Some(string(v, "arch_family")?),
        };
        Ok(Self {
            short_name,
            frequency,
            cores_per_cluster: cores as u8,
            operating_system,
            arch_family,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("short_name".to_string(), self.short_name.to_value());
        map.insert("frequency".to_string(), self.frequency.to_value());
        map.insert(
            "cores_per_cluster".to_string(),
            json!(self.cores_per_cluster),
        );
        if let Some(os) = &self.operating_system {
            map.insert("operating_system".to_string(), os.to_value());
        }
        if let Some(arch) = &self.arch_family {
            map.insert("arch_family".to_string(), json!(arch));
        }
        Value::Object(map)
    }
}

/* ------------------------------------------------------------------ */
/*  Chiplet                                                           */
/* ------------------------------------------------------------------ */

/// Per-chiplet power model, milliwatt figures. All floats are bounded below
/// by zero and carry the platform defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerParameters {
    pub split_power_mw: f64,
    pub delay_power_mw: f64,
    pub sequential_power_mw: f64,
    pub static_power_leakage_mw: f64,
    pub clock_tree_power_mw: f64,
    pub power_per_nominal_clock_mhz: u32,
}

impl Default for PowerParameters {
    fn default() -> Self {
        Self {
            split_power_mw: 10.0,
            delay_power_mw: 10.0,
            sequential_power_mw: 12.0,
            static_power_leakage_mw: 0.05,
            clock_tree_power_mw: 1.0,
            power_per_nominal_clock_mhz: 100,
        }
    }
}

impl PowerParameters {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "power_parameters")?;
        let defaults = Self::default();
        let field_or = |field: &'static str, fallback: f64| -> Result<f64, ValidationFailure> {
            match present(map, field) {
                None => Ok(fallback),
                Some(v) => float_min(v, field, 0.0),
            }
        };
        let power_per_nominal_clock_mhz = match present(map, "power_per_nominal_clock_mhz") {
            None => defaults.power_per_nominal_clock_mhz,
            Some(v) => {
                bounded_int(v, "power_per_nominal_clock_mhz", 1, Some(u32::MAX as u64))? as u32
            }
        };
        Ok(Self {
            split_power_mw: field_or("split_power_mw", defaults.split_power_mw)?,
            delay_power_mw: field_or("delay_power_mw", defaults.delay_power_mw)?,
            sequential_power_mw: field_or("sequential_power_mw", defaults.sequential_power_mw)?,
            static_power_leakage_mw: field_or(
                "static_power_leakage_mw",
                defaults.static_power_leakage_mw,
            )?,
            clock_tree_power_mw: field_or("clock_tree_power_mw", defaults.clock_tree_power_mw)?,
            power_per_nominal_clock_mhz,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "split_power_mw": self.split_power_mw,
            "delay_power_mw": self.delay_power_mw,
            "sequential_power_mw": self.sequential_power_mw,
            "static_power_leakage_mw": self.static_power_leakage_mw,
            "clock_tree_power_mw": self.clock_tree_power_mw,
            "power_per_nominal_clock_mhz": self.power_per_nominal_clock_mhz,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chiplet {
    pub short_name: Identity,
    pub axi_bus: AxiBus,
    pub frequency: Option<Frequency>,
    pub ethernet_interface: EthernetInterface,
    pub ucie_interface: UcieInterface,
    pub cpu_cluster: Option<CpuCluster>,
    pub power_parameters: Option<PowerParameters>,
}

impl Chiplet {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "chiplet")?;
        let short_name = nested("short_name", Identity::from_value(req(map, "short_name")?))?;
        let axi_bus = match present(map, "axi_bus") {
            None => AxiBus::default(),
            Some(v) => nested("axi_bus", AxiBus::from_value(v))?,
        };
        let frequency = match present(map, "frequency") {
            None => None,
            Some(v) => Some(nested("frequency", Frequency::from_value(v))?),
        };
        let ethernet_interface = match present(map, "ethernet_interface") {
            None => EthernetInterface::default(),
            Some(v) => nested("ethernet_interface", EthernetInterface::from_value(v))?,
        };
        let ucie_interface = nested(
            "ucie_interface",
            UcieInterface::from_value(req(map, "ucie_interface")?),
        )?;
        let cpu_cluster = match present(map, "cpu_cluster") {
            None => None,
            Some(v) => Some(nested("cpu_cluster", CpuCluster::from_value(v))?),
        };
        let power_parameters = match present(map, "power_parameters") {
            None => None,
            Some(v) => Some(nested("power_parameters", PowerParameters::from_value(v))?),
        };
        Ok(Self {
            short_name,
            axi_bus,
            frequency,
            ethernet_interface,
            ucie_interface,
            cpu_cluster,
            power_parameters,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("short_name".to_string(), self.short_name.to_value());
        map.insert("axi_bus".to_string(), self.axi_bus.to_value());
        if let Some(freq) = &self.frequency {
            map.insert("frequency".to_string(), freq.to_value());
        }
        map.insert(
            "ethernet_interface".to_string(),
            self.ethernet_interface.to_value(),
        );
        map.insert("ucie_interface".to_string(), self.ucie_interface.to_value());
        if let Some(cluster) = &self.cpu_cluster {
            map.insert("cpu_cluster".to_string(), cluster.to_value());
        }
        if let Some(power) = &self.power_parameters {
            map.insert("power_parameters".to_string(), power.to_value());
        }
        Value::Object(map)
    }
}

/* ------------------------------------------------------------------ */
/*  Network topology                                                  */
/* ------------------------------------------------------------------ */

pub const CAN_BAUD_RATE_DEFAULT: u64 = 500_000;
pub const NETWORK_SEGMENT_MAX: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct CanBus {
    pub short_name: Identity,
    pub baud_rate: u64,
    pub interface_refs: Vec<String>,
    pub can_fd: bool,
}

impl CanBus {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "can_bus")?;
        let short_name = nested("short_name", Identity::from_value(req(map, "short_name")?))?;
        let baud_rate = match present(map, "baud_rate") {
            None => CAN_BAUD_RATE_DEFAULT,
            Some(v) => bounded_int(v, "baud_rate", 1, None)?,
        };
        let interface_refs = string_list(map, "interface_refs", 1)?;
        let can_fd = match present(map, "can_fd") {
            None => true,
            Some(v) => boolean(v, "can_fd")?,
        };
        Ok(Self {
            short_name,
            baud_rate,
            interface_refs,
            can_fd,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "short_name": self.short_name.to_value(),
            "baud_rate": self.baud_rate,
            "interface_refs": self.interface_refs,
            "can_fd": self.can_fd,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EthSwitch {
    pub short_name: Identity,
    pub interface_refs: Vec<String>,
}

impl EthSwitch {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "eth_switch")?;
        let short_name = nested("short_name", Identity::from_value(req(map, "short_name")?))?;
        let interface_refs = string_list(map, "interface_refs", 1)?;
        Ok(Self {
            short_name,
            interface_refs,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "short_name": self.short_name.to_value(),
            "interface_refs": self.interface_refs,
        })
    }
}

/// Inter-ECU communication segments; at most eight of each kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetworkTopology {
    pub can_buses: Vec<CanBus>,
    pub eth_switches: Vec<EthSwitch>,
}

impl NetworkTopology {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "network_topology")?;
        let can_buses = record_list(map, "can_buses", NETWORK_SEGMENT_MAX, CanBus::from_value)?;
        let eth_switches = record_list(
            map,
            "eth_switches",
            NETWORK_SEGMENT_MAX,
            EthSwitch::from_value,
        )?;
        Ok(Self {
            can_buses,
            eth_switches,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "can_buses": self.can_buses.iter().map(CanBus::to_value).collect::<Vec<_>>(),
            "eth_switches": self.eth_switches.iter().map(EthSwitch::to_value).collect::<Vec<_>>(),
        })
    }
}

/* ------------------------------------------------------------------ */
/*  Events and operations                                             */
/* ------------------------------------------------------------------ */

#[derive(Debug, Clone, PartialEq)]
pub struct TimingEvent {
    pub short_name: Identity,
    /// Symbolic path to the triggered runnable; free text, not resolved.
    pub start_on_event_ref: String,
    pub custom_behavior_ref: Option<String>,
    pub period: TimeValue,
}

impl TimingEvent {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "timing_event")?;
        let short_name = nested("short_name", Identity::from_value(req(map, "short_name")?))?;
        let start_on_event_ref = string(req(map, "start_on_event_ref")?, "start_on_event_ref")?;
        let custom_behavior_ref = match present(map, "custom_behavior_ref") {
            None => None,
            Some(v) => Some(string(v, "custom_behavior_ref")?),
        };
        let period = nested("period", TimeValue::from_value(req(map, "period")?))?;
        Ok(Self {
            short_name,
            start_on_event_ref,
            custom_behavior_ref,
            period,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("short_name".to_string(), self.short_name.to_value());
        map.insert(
            "start_on_event_ref".to_string(),
            json!(self.start_on_event_ref),
        );
        if let Some(r) = &self.custom_behavior_ref {
            map.insert("custom_behavior_ref".to_string(), json!(r));
        }
        map.insert("period".to_string(), self.period.to_value());
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataReceivedEvent {
    pub short_name: Identity,
    pub start_on_event_ref: String,
    pub data_refs: Vec<String>,
}

impl DataReceivedEvent {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "data_received_event")?;
        let short_name = nested("short_name", Identity::from_value(req(map, "short_name")?))?;
        let start_on_event_ref = string(req(map, "start_on_event_ref")?, "start_on_event_ref")?;
        let data_refs = string_list(map, "data_refs", 1)?;
        Ok(Self {
            short_name,
            start_on_event_ref,
            data_refs,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "short_name": self.short_name.to_value(),
            "start_on_event_ref": self.start_on_event_ref,
            "data_refs": self.data_refs,
        })
    }
}

/// One step of an operations sequence. Every kind is optional in the data
/// model but an operation that specifies none of them is meaningless, so
/// construction requires at least one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operation {
    pub read: Option<String>,
    pub write: Option<String>,
    pub latency: Option<TimeValue>,
    pub load: Option<u64>,
}

impl Operation {
    pub fn from_value(v: &Value) -> Result<Self, ValidationFailure> {
        let map = as_object(v, "operation")?;
        let read = match present(map, "read") {
            None => None,
            Some(v) => Some(string(v, "read")?),
        };
        let write = match present(map, "write") {
            None => None,
            Some(v) => Some(string(v, "write")?),
        };
        let latency = match present(map, "latency") {
            None => None,
            Some(v) => Some(nested("latency", TimeValue::from_value(v))?),
        };
        let load = match present(map, "load") {
            None => None,
            Some(v) => Some(bounded_int(v, "load", 1, None)?),
        };
        if read.is_none() && write.is_none() && latency.is_none() && load.is_none() {
            return Err(ValidationFailure::MissingField("operation"));
        }
        Ok(Self {
            read,
            write,
            latency,
            load,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(r) = &self.read {
            map.insert("read".to_string(), json!(r));
        }
        if let Some(w) = &self.write {
            map.insert("write".to_string(), json!(w));
        }
        if let Some(l) = &self.latency {
            map.insert("latency".to_string(), l.to_value());
        }
        if let Some(l) = &self.load {
            map.insert("load".to_string(), json!(l));
        }
        Value::Object(map)
    }
}
