//! Validate-and-report loop and end-to-end request orchestration.
//!
//! The loop walks an ordered candidate list, normalizing the raw payload
//! for each candidate type and attempting construction. The first candidate
//! that constructs wins; rejections are logged at debug level and never
//! surfaced. When every candidate rejects, the caller still gets the raw
//! payload back, marked unvalidated, so no best-effort data is ever lost.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;

use crate::generate::{GenerationError, TextGenerator};
use crate::normalize;
use crate::prompt::{PromptError, PromptTemplate};
use crate::registry::{self, RecordKind, RecordSpec};
use crate::repair::{self, ExtractError};
use crate::retrieval::{self, SchemaRetriever};
use crate::schema::ValidationFailure;

/// Terminal state of one validation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A candidate constructed; carries the matched type name and the
    /// canonical default-filled record.
    Validated {
        type_name: &'static str,
        record: Value,
    },
    /// Every candidate rejected; the raw payload is echoed back.
    Unvalidated { raw: Value },
}

impl Outcome {
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated { .. })
    }
}

/// Try candidates in list order; first successful construction wins. There
/// is deliberately no ranking between multiple types that would both
/// validate (first-match-wins is the documented design choice).
pub fn validate_first(candidates: &[&'static RecordSpec], raw: &Value) -> Outcome {
    for spec in candidates {
        let shaped = normalize::normalize(spec.kind, raw);
        match (spec.construct)(&shaped) {
            Ok(record) => {
                info!("validated as `{}`", spec.name);
                return Outcome::Validated {
                    type_name: spec.name,
                    record,
                };
            }
            Err(failure) => {
                debug!("candidate `{}` rejected: {}", spec.name, failure);
            }
        }
    }
    warn!("no candidate type accepted the payload");
    Outcome::Unvalidated { raw: raw.clone() }
}

/// Single-type entry point for callers that already know what they expect.
pub fn validate_as(kind: RecordKind, raw: &Value) -> Result<Value, ValidationFailure> {
    let spec = registry::spec_for(kind);
    (spec.construct)(&normalize::normalize(kind, raw))
}

/// Why a request produced no payload at all. Validation exhaustion is not
/// represented here: it still yields an `Outcome`.
#[derive(Debug)]
pub enum RequestError {
    NoJsonFound,
    MalformedJson(serde_json::Error),
    Prompt(PromptError),
    Generation(GenerationError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJsonFound => write!(f, "no JSON object found in model output"),
            Self::MalformedJson(e) => write!(f, "malformed JSON after repair: {}", e),
            Self::Prompt(e) => write!(f, "{}", e),
            Self::Generation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<ExtractError> for RequestError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::NoJsonFound => Self::NoJsonFound,
            ExtractError::MalformedJson(e) => Self::MalformedJson(e),
        }
    }
}

impl From<GenerationError> for RequestError {
    fn from(e: GenerationError) -> Self {
        Self::Generation(e)
    }
}

impl From<PromptError> for RequestError {
    fn from(e: PromptError) -> Self {
        Self::Prompt(e)
    }
}

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_TOP_K: usize = 8;

/// One natural-language request, start to finish: retrieve schema context,
/// build the prompt, generate, extract and repair, select candidates,
/// normalize and validate. Synchronous; one request at a time.
pub struct Pipeline<R, G> {
    retriever: R,
    generator: G,
    template: PromptTemplate,
    timeout: Duration,
    top_k: usize,
}

impl<R: SchemaRetriever, G: TextGenerator> Pipeline<R, G> {
    pub fn new(retriever: R, generator: G) -> Self {
        Self {
            retriever,
            generator,
            template: PromptTemplate::builtin(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn run(&self, query: &str) -> Result<Outcome, RequestError> {
        let snippets = self.retriever.retrieve(query, self.top_k);
        debug!("retrieved {} schema snippets", snippets.len());
        let context = retrieval::context_blob(&snippets);

        let prompt = self.template.render_request(query, &snippets)?;
        let completion = self.generator.generate(&prompt, self.timeout)?;

        let parsed = repair::extract_object(&completion)?;
        let payload = normalize::unwrap_tool_envelope(parsed);

        let candidates = registry::candidates(&context);
        debug!(
            "trying {} candidate type(s): {:?}",
            candidates.len(),
            candidates.iter().map(|s| s.name).collect::<Vec<_>>()
        );
        Ok(validate_first(&candidates, &payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::MockGenerator;
    use crate::retrieval::SnippetStore;
    use serde_json::json;

    fn specs(names: &[&str]) -> Vec<&'static RecordSpec> {
        names
            .iter()
            .map(|n| {
                registry::REGISTRY
                    .iter()
                    .find(|s| s.name == *n)
                    .expect("known name")
            })
            .collect()
    }

    #[test]
    fn first_matching_candidate_wins() {
        // an empty object constructs as both network_topology (both lists
        // default empty) and axi_bus (both fields defaulted); order decides
        let raw = json!({});
        let forward = validate_first(&specs(&["axi_bus", "network_topology"]), &raw);
        assert!(
            matches!(forward, Outcome::Validated { type_name: "axi_bus", .. }),
            "{forward:?}"
        );
        let reverse = validate_first(&specs(&["network_topology", "axi_bus"]), &raw);
        assert!(matches!(
            reverse,
            Outcome::Validated {
                type_name: "network_topology",
                ..
            }
        ));
    }

    #[test]
    fn exhaustion_echoes_the_raw_payload() {
        let raw = json!({ "definitely": "not a record" });
        let outcome = validate_first(&specs(&["cluster", "chiplet"]), &raw);
        assert_eq!(outcome, Outcome::Unvalidated { raw });
    }

    #[test]
    fn validate_as_normalizes_then_constructs() {
        let raw = json!({
            "short_name": "C1",
            "frequency": "2000 MHz",
            "cores_per_cluster": "4 cores",
        });
        let record = validate_as(RecordKind::Cluster, &raw).unwrap();
        assert_eq!(
            record,
            json!({
                "short_name": { "name": "C1" },
                "frequency": { "value": 2000, "unit": "MHz" },
                "cores_per_cluster": 4,
            })
        );
    }

    #[test]
    fn boundary_values_survive_the_whole_path() {
        let ok = validate_as(RecordKind::Cluster, &json!({
            "short_name": "C1",
            "frequency": { "value": 1 },
            "cores_per_cluster": 1,
        }));
        assert!(ok.is_ok());
        let low = validate_as(RecordKind::Cluster, &json!({
            "short_name": "C1",
            "frequency": { "value": 0 },
            "cores_per_cluster": 1,
        }));
        assert!(low.is_err());
    }

    #[test]
    fn end_to_end_cluster_request() {
        let completion = r#"Sure, calling the tool now:
{"tool": "create_cpu_cluster", "args": {"short_name": "C1", "frequency": "2000 MHz", "cores_per_cluster": 4}}
Done."#;
        let pipeline = Pipeline::new(
            SnippetStore::with_builtin_docs(),
            MockGenerator::always(completion),
        );
        let outcome = pipeline
            .run("Create a CPU cluster named C1 with frequency 2000 MHz and 4 cores per cluster.")
            .unwrap();
        match outcome {
            Outcome::Validated { type_name, record } => {
                assert_eq!(type_name, "cluster");
                assert_eq!(record["frequency"], json!({ "value": 2000, "unit": "MHz" }));
            }
            other => panic!("expected validated cluster, got {other:?}"),
        }
    }

    #[test]
    fn end_to_end_truncated_chiplet_request() {
        // truncated mid-object: repair closes the structures, the typo key
        // and the loose mode value are normalized away
        let completion =
            "{\"add_chiplet\": {\"short_name\": \"G1\", \"ucei_interface\": \"device\", \"axi_bus\": {\"width\": 64, \"frequency\": 1000000";
        let pipeline = Pipeline::new(
            SnippetStore::with_builtin_docs(),
            MockGenerator::always(completion),
        );
        let outcome = pipeline
            .run("Add a GPU chiplet G1 with AXI bus width 64 bytes in device mode.")
            .unwrap();
        match outcome {
            Outcome::Validated { type_name, record } => {
                assert_eq!(type_name, "chiplet");
                assert_eq!(record["ucie_interface"], json!({ "mode": "endpoint" }));
            }
            other => panic!("expected validated chiplet, got {other:?}"),
        }
    }

    #[test]
    fn garbage_completion_is_a_request_error() {
        let pipeline = Pipeline::new(
            SnippetStore::with_builtin_docs(),
            MockGenerator::always("I cannot help with that."),
        );
        let err = pipeline.run("Create a CPU cluster named C1.").unwrap_err();
        assert!(matches!(err, RequestError::NoJsonFound));
    }

    #[test]
    fn unparseable_payload_is_echoed_not_dropped() {
        // parses fine but matches nothing; the pipeline must hand the raw
        // payload back rather than lose it
        let completion = "{\"mystery\": true}";
        let pipeline = Pipeline::new(
            SnippetStore::with_builtin_docs(),
            MockGenerator::always(completion),
        );
        let outcome = pipeline.run("Create a CPU cluster named C1.").unwrap();
        assert_eq!(
            outcome,
            Outcome::Unvalidated {
                raw: json!({ "mystery": true })
            }
        );
    }
}
