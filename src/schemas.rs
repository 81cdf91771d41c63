//! JSON Schemas for the machine-readable outputs.
//!
//! Schemas ship inside the binary so validation works from any working
//! directory. Each compiles on demand; callers validate single values or
//! whole JSONL streams.

use anyhow::{Result, anyhow};
use jsonschema::JSONSchema;
use serde_json::Value;

const INDEX_DOCUMENT: &str = include_str!("../schema/index_document.schema.json");
const CANDIDATE: &str = include_str!("../schema/candidate.schema.json");
const CHANGE_SUMMARY: &str = include_str!("../schema/change_summary.schema.json");

/// A compiled output contract.
pub struct OutputSchema {
    name: &'static str,
    compiled: JSONSchema,
}

impl OutputSchema {
    pub fn index_document() -> Result<Self> {
        Self::compile("index_document", INDEX_DOCUMENT)
    }

    pub fn candidate() -> Result<Self> {
        Self::compile("candidate", CANDIDATE)
    }

    pub fn change_summary() -> Result<Self> {
        Self::compile("change_summary", CHANGE_SUMMARY)
    }

    fn compile(name: &'static str, text: &str) -> Result<Self> {
        let raw: Value =
            serde_json::from_str(text).map_err(|err| anyhow!("parsing {name} schema: {err}"))?;
        let compiled = JSONSchema::compile(&raw)
            .map_err(|err| anyhow!("compiling {name} schema: {err}"))?;
        Ok(Self { name, compiled })
    }

    /// Validate one value, joining every violation into the error.
    pub fn validate(&self, value: &Value) -> Result<()> {
        if let Err(errors) = self.compiled.validate(value) {
            let details = errors
                .map(|err| {
                    let pointer = err.instance_path.to_string();
                    if pointer.is_empty() {
                        err.to_string()
                    } else {
                        format!("{pointer}: {err}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(anyhow!("{} violation: {details}", self.name));
        }
        Ok(())
    }

    /// Validate every non-blank line of a JSONL stream. Returns one message
    /// per bad line, prefixed with its 1-based line number.
    pub fn validate_jsonl(&self, text: &str) -> Vec<String> {
        let mut problems = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let outcome = serde_json::from_str::<Value>(line)
                .map_err(|err| anyhow!("invalid JSON: {err}"))
                .and_then(|value| self.validate(&value));
            if let Err(err) = outcome {
                problems.push(format!("line {}: {err:#}", idx + 1));
            }
        }
        problems
    }
}
