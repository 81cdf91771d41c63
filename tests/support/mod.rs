use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const SERVICE_CATALOG: &str = r#"
services:
  - id: billing
    name: Billing
    domain: finance
    type: backend
    messaging:
      publishes: [invoice.created, invoice.voided]
    repo: {path: services/billing}
  - id: crm
    name: CRM
    domain: sales
    type: backend
    interfaces:
      grpc: [{proto: services/crm/proto/contact.proto}]
    messaging:
      consumes: [invoice.created]
    repo: {path: services/crm}
"#;

pub const EVENT_CATALOG: &str = r#"
catalog:
  events:
    - id: evt.invoice.created
      kind: event
      subject: invoice.created
      status: active
      producer: {service: billing}
      consumers: [{service: crm}, {service: ghost}]
    - id: evt.invoice.paid
      kind: event
      subject: invoice.paid
      producer: {service: billing}
      consumers: []
  commands: []
  queries:
    - id: qry.contact.get
      kind: query
      responder: crm
      transport:
        grpc: {service: ContactService, method: GetContact}
"#;

/// Path of a compiled helper binary.
pub fn helper_binary(name: &str) -> PathBuf {
    let path = match name {
        "docpack" => env!("CARGO_BIN_EXE_docpack"),
        "validate-docpack" => env!("CARGO_BIN_EXE_validate-docpack"),
        "build-indexes" => env!("CARGO_BIN_EXE_build-indexes"),
        "scan-candidates" => env!("CARGO_BIN_EXE_scan-candidates"),
        "map-changes" => env!("CARGO_BIN_EXE_map-changes"),
        other => panic!("unknown helper {other}"),
    };
    PathBuf::from(path)
}

/// A command for `name` that ignores any docpack settings in the caller's
/// environment.
pub fn helper_command(name: &str) -> Command {
    let mut cmd = Command::new(helper_binary(name));
    for var in [
        "DOCPACK_ROOT",
        "DOCPACK_SERVICE_CATALOG",
        "DOCPACK_EVENT_CATALOG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

pub fn write_file(root: &Path, rel: &str, contents: &str) -> Result<PathBuf> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// A small repository with both catalogs, a context doc, and two services.
pub fn fixture_repo() -> Result<TempDir> {
    let temp = TempDir::new()?;
    let root = temp.path();
    write_file(root, "AI_CONTEXT.md", "# Context\n")?;
    write_file(root, "catalogs/service_catalog.yaml", SERVICE_CATALOG)?;
    write_file(root, "catalogs/event_catalog.yaml", EVENT_CATALOG)?;
    write_file(
        root,
        "services/billing/src/invoice.ts",
        concat!(
            "export function issue(nc, payload) {\n",
            "  nc.publish(\"invoice.created\", payload)\n",
            "  nc.publish(\"invoice.refunded\", payload)\n",
            "}\n",
        ),
    )?;
    write_file(
        root,
        "services/crm/proto/contact.proto",
        concat!(
            "syntax = \"proto3\";\n",
            "service ContactService {\n",
            "  rpc GetContact (GetContactRequest) returns (Contact);\n",
            "}\n",
        ),
    )?;
    write_file(root, "shared/util.ts", "export const noop = () => {};\n")?;
    Ok(temp)
}

pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
