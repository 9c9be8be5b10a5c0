//! Parse generated text into process records
//!
//! Generated JSON is treated as untrusted: every field is optional, values of
//! the wrong type are ignored, and missing identity fields are synthesized.
//! The parser remembers which fields it synthesized so source validation can
//! skip them.

use crate::error::ExtractorError;
use processflow_domain::{
    Phase, Process, ProcessMetrics, ProcessStatus, Resource, SubProcess, ValidationCriteria,
    DEFAULT_DESCRIPTION,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

const FENCE: &str = "```";

/// Strip code fences and make sure the text is bracketed as a JSON array
///
/// With at least one complete fence pair, the first fenced body is used and a
/// leading `json` language tag is dropped. A single unterminated fence keeps
/// the text after it.
///
/// ```
/// use processflow_extractor::clean_json_string;
///
/// assert_eq!(clean_json_string("```json\n[{\"id\": \"a\"}]\n```"), "[{\"id\": \"a\"}]");
/// assert_eq!(clean_json_string("{\"id\": \"a\"}"), "[{\"id\": \"a\"}]");
/// ```
pub fn clean_json_string(text: &str) -> String {
    let mut body = text;

    if text.contains(FENCE) {
        let parts: Vec<&str> = text.split(FENCE).collect();
        if parts.len() >= 3 {
            body = parts[1];
            if let Some(rest) = body.strip_prefix("json") {
                body = rest;
            }
        } else {
            body = parts[parts.len() - 1];
        }
    }

    let body = body.trim();
    let mut cleaned = String::with_capacity(body.len() + 2);
    if !body.starts_with('[') {
        cleaned.push('[');
    }
    cleaned.push_str(body);
    if !body.ends_with(']') {
        cleaned.push(']');
    }
    cleaned
}

/// A field the parser may synthesize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Record id
    Id,
    /// Record name
    Name,
    /// Record description
    Description,
    /// Sub-process order
    Order,
}

/// Location of a field within a process record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// Field of the process itself
    Process(Field),
    /// Field of the sub-process at the given index
    Step(usize, Field),
}

/// A parsed process and the fields the parser filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProcess {
    /// The process record
    pub process: Process,
    synthesized: HashSet<FieldRef>,
}

impl ParsedProcess {
    /// Whether the given field was filled in by the parser
    pub fn is_synthesized(&self, field: FieldRef) -> bool {
        self.synthesized.contains(&field)
    }

    /// Consume into the process record
    pub fn into_process(self) -> Process {
        self.process
    }
}

/// Parse a cleaned JSON array into process records
///
/// # Errors
///
/// - [`ExtractorError::JsonParse`] if the text is not valid JSON
/// - [`ExtractorError::MalformedResponse`] if it is not an array of objects
pub fn parse_processes(json: &str) -> Result<Vec<ParsedProcess>, ExtractorError> {
    debug!("Attempting to parse JSON: {}", json);

    let value: Value = serde_json::from_str(json)?;
    let records = match value {
        Value::Array(records) => records,
        other => {
            return Err(ExtractorError::MalformedResponse(format!(
                "Expected JSON array, got {}",
                type_name(&other)
            )))
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| match record {
            Value::Object(map) => Ok(parse_process(idx + 1, &map)),
            other => Err(ExtractorError::MalformedResponse(format!(
                "Expected object for process {}, got {}",
                idx + 1,
                type_name(&other)
            ))),
        })
        .collect()
}

fn parse_process(n: usize, obj: &Map<String, Value>) -> ParsedProcess {
    let mut synthesized = HashSet::new();

    let id = text_field(obj, "id").unwrap_or_else(|| {
        synthesized.insert(FieldRef::Process(Field::Id));
        format!("process_{}", n)
    });
    let name = text_field(obj, "name").unwrap_or_else(|| {
        synthesized.insert(FieldRef::Process(Field::Name));
        format!("Process {}", n)
    });
    let description = text_field(obj, "description").unwrap_or_else(|| {
        synthesized.insert(FieldRef::Process(Field::Description));
        DEFAULT_DESCRIPTION.to_string()
    });

    let raw_steps: Vec<&Map<String, Value>> = match obj.get("sub_processes") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let step = item.as_object();
                if step.is_none() {
                    warn!("Skipping non-object sub-process in process '{}'", id);
                }
                step
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut phases = match obj.get("phases") {
        Some(Value::Array(items)) => parse_phases(&id, items),
        _ => infer_phases(&id, &raw_steps),
    };

    let sub_processes = raw_steps
        .iter()
        .enumerate()
        .map(|(idx, step)| parse_step(&id, idx, step, &mut phases, &mut synthesized))
        .collect();

    let process = Process {
        name,
        description,
        category: text_field(obj, "category"),
        priority: number_field(obj, "priority").and_then(|p| u8::try_from(p).ok()),
        owner: text_field(obj, "owner"),
        status: status_field(obj),
        phases,
        sub_processes,
        metrics: lenient::<ProcessMetrics>(obj, "metrics"),
        start_date: text_field(obj, "start_date"),
        end_date: text_field(obj, "end_date"),
        stakeholders: string_list(obj, "stakeholders"),
        documentation: string_map(obj, "documentation"),
        id,
    };

    ParsedProcess { process, synthesized }
}

fn parse_step(
    process_id: &str,
    idx: usize,
    obj: &Map<String, Value>,
    phases: &mut Vec<Phase>,
    synthesized: &mut HashSet<FieldRef>,
) -> SubProcess {
    let id = text_field(obj, "id").unwrap_or_else(|| {
        synthesized.insert(FieldRef::Step(idx, Field::Id));
        format!("{}_sub_{}", process_id, idx)
    });
    let name = text_field(obj, "name").unwrap_or_else(|| {
        synthesized.insert(FieldRef::Step(idx, Field::Name));
        format!("Step {}", idx + 1)
    });
    let description = text_field(obj, "description").unwrap_or_else(|| {
        synthesized.insert(FieldRef::Step(idx, Field::Description));
        DEFAULT_DESCRIPTION.to_string()
    });
    let order = number_field(obj, "order")
        .and_then(|o| u32::try_from(o).ok())
        .unwrap_or_else(|| {
            synthesized.insert(FieldRef::Step(idx, Field::Order));
            (idx + 1) as u32
        });

    let explicit = text_field(obj, "phase_id");
    let known = explicit
        .as_ref()
        .is_some_and(|phase_id| phases.iter().any(|phase| &phase.id == phase_id));
    let phase_id = match explicit {
        Some(phase_id) if known => phase_id,
        unknown => {
            if let Some(unknown) = unknown {
                warn!("Sub-process '{}' refers to unknown phase '{}'", id, unknown);
            }
            match phase_marker(&id) {
                Some(n) => marked_phase(process_id, n, phases),
                None => first_phase(process_id, phases),
            }
        }
    };

    SubProcess {
        id,
        phase_id,
        name,
        description,
        order,
        estimated_duration: text_field(obj, "estimated_duration"),
        dependencies: string_list(obj, "dependencies"),
        owner: text_field(obj, "owner"),
        required_resources: lenient::<Vec<Resource>>(obj, "required_resources").unwrap_or_default(),
        validation_criteria: lenient::<Vec<ValidationCriteria>>(obj, "validation_criteria")
            .unwrap_or_default(),
        expected_output: text_field(obj, "expected_output"),
        notes: text_field(obj, "notes"),
        status: status_field(obj),
        actual_duration: text_field(obj, "actual_duration"),
        issues: string_list(obj, "issues"),
    }
}

/// Phases given explicitly in the record
fn parse_phases(process_id: &str, items: &[Value]) -> Vec<Phase> {
    items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(idx, obj)| {
            let n = (idx + 1) as u32;
            let order = number_field(obj, "order")
                .and_then(|o| u32::try_from(o).ok())
                .unwrap_or(n);
            let mut phase = Phase::new(
                text_field(obj, "id").unwrap_or_else(|| phase_key(process_id, n)),
                text_field(obj, "name").unwrap_or_else(|| format!("Phase {}", n)),
                text_field(obj, "description").unwrap_or_default(),
                order,
            );
            phase.objectives = string_list(obj, "objectives");
            phase.status = status_field(obj);
            phase
        })
        .collect()
}

/// One phase per distinct `_phase<digits>` marker in sub-process ids, ascending
fn infer_phases(process_id: &str, steps: &[&Map<String, Value>]) -> Vec<Phase> {
    let numbers: BTreeSet<u32> = steps
        .iter()
        .filter_map(|step| text_field(step, "id"))
        .filter_map(|id| phase_marker(&id))
        .collect();

    numbers
        .into_iter()
        .map(|n| {
            Phase::new(
                phase_key(process_id, n),
                format!("Phase {}", n),
                format!("Phase {} of the process", n),
                n,
            )
        })
        .collect()
}

/// Id of the first phase, creating the default phase if there is none
fn first_phase(process_id: &str, phases: &mut Vec<Phase>) -> String {
    if phases.is_empty() {
        phases.push(Phase::new(
            phase_key(process_id, 1),
            "Phase 1",
            "Main phase of the process",
            1,
        ));
    }
    phases[0].id.clone()
}

/// Id of the phase for marker `n`, inserting it by order if it is missing
fn marked_phase(process_id: &str, n: u32, phases: &mut Vec<Phase>) -> String {
    let key = phase_key(process_id, n);
    if !phases.iter().any(|phase| phase.id == key) {
        let pos = phases.iter().position(|phase| phase.order > n).unwrap_or(phases.len());
        phases.insert(
            pos,
            Phase::new(key.clone(), format!("Phase {}", n), format!("Phase {} of the process", n), n),
        );
    }
    key
}

fn phase_key(process_id: &str, n: u32) -> String {
    format!("{}_phase{}", process_id, n)
}

/// Phase number from an id containing `_phase<digits>`
pub fn phase_marker(id: &str) -> Option<u32> {
    id.match_indices("_phase").find_map(|(pos, marker)| {
        let rest = &id[pos + marker.len()..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        rest[..end].parse().ok()
    })
}

/// String value, with numbers and booleans rendered as text
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Non-negative integer value, accepting numeric strings
fn number_field(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    match obj.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn status_field(obj: &Map<String, Value>) -> ProcessStatus {
    text_field(obj, "status")
        .and_then(|s| ProcessStatus::parse(&s))
        .unwrap_or_default()
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn string_map(obj: &Map<String, Value>, key: &str) -> BTreeMap<String, String> {
    match obj.get(key) {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Deserialize a nested structure, ignoring it if it does not fit
fn lenient<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    let value = obj.get(key)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("Ignoring unparseable '{}': {}", key, e);
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
