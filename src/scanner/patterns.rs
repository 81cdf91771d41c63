//! Line pattern registry for the candidate scanner.
//!
//! Each entry pairs a candidate kind with a compiled regex and a rule for
//! turning captures into a value. Every entry is tried against every line;
//! entries are independent, so one line may yield several candidates.
//! Supporting a new framework idiom means adding a row to `PATTERNS`.

use crate::scanner::CandidateKind;
use anyhow::{Context, Result};
use regex::{Captures, Regex};

// Dotted subject inside matching quotes: `invoice.created`, `crm.contact.*`.
macro_rules! subject {
    () => {
        r#"["'`]([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-*>]+)+)["'`]"#
    };
}

#[derive(Clone, Copy, Debug)]
enum Extract {
    /// Capture group 1 is the subject.
    Subject,
    /// Capture 1 is the method, capture 2 the optional path (`/` when absent).
    MethodPath,
    /// Capture 1 is the path, capture 2 an optional method.
    PathMethod,
}

struct PatternRow {
    kind: CandidateKind,
    pattern: &'static str,
    extract: Extract,
}

const PATTERNS: &[PatternRow] = &[
    // nc.publish("a.b"), js.publish(...), this.client.emit("a.b"), bus.send('a.b')
    PatternRow {
        kind: CandidateKind::Publish,
        pattern: concat!(
            r"\b(?:publish|publishAsync|publishEvent|publishMessage|emit|send|dispatch)\s*\(\s*",
            subject!()
        ),
        extract: Extract::Subject,
    },
    // nc.subscribe("a.b"), js.pullSubscribe('a.*'), consumer.consume("a.b")
    PatternRow {
        kind: CandidateKind::Subscribe,
        pattern: concat!(
            r"\b(?:subscribe|queueSubscribe|pullSubscribe|consume|addListener)\s*\(\s*",
            subject!()
        ),
        extract: Extract::Subject,
    },
    // @MessagePattern('a.b'), @EventPattern("a.b")
    PatternRow {
        kind: CandidateKind::Subscribe,
        pattern: concat!(r"@(?:MessagePattern|EventPattern)\s*\(\s*", subject!()),
        extract: Extract::Subject,
    },
    // @Get(':id'), @Post(), @GetMapping("/x")
    PatternRow {
        kind: CandidateKind::Http,
        pattern: r#"@(Get|Post|Put|Patch|Delete|Head|Options|All)(?:Mapping)?\s*\(\s*(?:["'`]([^"'`]*)["'`])?"#,
        extract: Extract::MethodPath,
    },
    // app.get('/x', ...), router.post("/x"), @app.get("/x")
    PatternRow {
        kind: CandidateKind::Http,
        pattern: r#"\b(?:app|router|api|server)\.(get|post|put|patch|delete|head|options|all)\s*\(\s*["'`]([^"'`]+)["'`]"#,
        extract: Extract::MethodPath,
    },
    // @app.route("/x"), @bp.route('/x', methods=['POST'])
    PatternRow {
        kind: CandidateKind::Http,
        pattern: r#"@\w+\.route\s*\(\s*["'`]([^"'`]+)["'`](?:[^)]*?methods\s*=\s*[\[(]\s*["'`](\w+)["'`])?"#,
        extract: Extract::PathMethod,
    },
];

/// A compiled registry row.
pub(crate) struct LinePattern {
    pub(crate) kind: CandidateKind,
    regex: Regex,
    extract: Extract,
}

impl LinePattern {
    /// Every value this pattern finds on `line`.
    pub(crate) fn values<'a>(&'a self, line: &'a str) -> impl Iterator<Item = String> + 'a {
        self.regex
            .captures_iter(line)
            .filter_map(move |caps| self.value_from(&caps))
    }

    fn value_from(&self, caps: &Captures<'_>) -> Option<String> {
        let group = |idx: usize| caps.get(idx).map(|m| m.as_str().trim());
        match self.extract {
            Extract::Subject => group(1).map(str::to_string),
            Extract::MethodPath => {
                let method = group(1)?.to_uppercase();
                let path = group(2).filter(|p| !p.is_empty()).unwrap_or("/");
                Some(format!("{method} {path}"))
            }
            Extract::PathMethod => {
                let path = group(1)?;
                Some(match group(2) {
                    Some(method) => format!("{} {path}", method.to_uppercase()),
                    None => path.to_string(),
                })
            }
        }
    }
}

/// Compile the registry in declaration order.
pub(crate) fn compile_patterns() -> Result<Vec<LinePattern>> {
    PATTERNS
        .iter()
        .map(|row| {
            let regex = Regex::new(row.pattern)
                .with_context(|| format!("compiling {} pattern {}", row.kind, row.pattern))?;
            Ok(LinePattern {
                kind: row.kind,
                regex,
                extract: row.extract,
            })
        })
        .collect()
}

/// Per-file state for interface definition files.
///
/// Tracks the most recent `service` declaration so each following `rpc`
/// can be reported as `Service.Method`.
pub(crate) struct ProtoScanContext {
    service_decl: Regex,
    rpc_decl: Regex,
    current_service: Option<String>,
}

impl ProtoScanContext {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            service_decl: Regex::new(r"^\s*service\s+(\w+)").context("compiling service pattern")?,
            rpc_decl: Regex::new(r"^\s*rpc\s+(\w+)\s*\(").context("compiling rpc pattern")?,
            current_service: None,
        })
    }

    /// Feed the next line; returns a candidate value for rpc declarations.
    pub(crate) fn observe(&mut self, line: &str) -> Option<String> {
        if let Some(caps) = self.service_decl.captures(line) {
            self.current_service = caps.get(1).map(|m| m.as_str().to_string());
            return None;
        }
        let method = self.rpc_decl.captures(line)?.get(1)?.as_str();
        Some(match &self.current_service {
            Some(service) => format!("{service}.{method}"),
            None => method.to_string(),
        })
    }
}
