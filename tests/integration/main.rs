//! Integration tests for the depline binary
//!
//! These run the CLI against a temporary workspace analyzed twice.

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn depline(root: &Path, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_depline"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute depline");
    assert!(
        output.status.success(),
        "depline {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

const GATEWAY_V1: &str = r#"
package com.acme.pay;

import com.acme.core.Ledger;

public class Gateway {
    private Ledger ledger;

    public void charge(long cents) {
        ledger.record(cents);
    }
}
"#;

const GATEWAY_V2: &str = r#"
package com.acme.pay;

import com.acme.core.Audit;

public class Gateway {
    private Audit audit;

    public void charge(long cents) { }
}
"#;

const LEDGER: &str = r#"
package com.acme.core;

public class Ledger {
    public void record(long cents) { }
}
"#;

const AUDIT: &str = "package com.acme.core;\npublic class Audit { }\n";

fn pom(jackson: &str) -> String {
    format!(
        r#"<project>
  <groupId>com.acme</groupId>
  <artifactId>pay</artifactId>
  <properties>
    <jackson.version>{}</jackson.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>com.fasterxml.jackson.core</groupId>
      <artifactId>jackson-databind</artifactId>
      <version>${{jackson.version}}</version>
    </dependency>
  </dependencies>
</project>
"#,
        jackson
    )
}

fn analyze_two_versions(root: &Path) {
    write(root, "src/com/acme/pay/Gateway.java", GATEWAY_V1);
    write(root, "src/com/acme/core/Ledger.java", LEDGER);
    write(root, "pom.xml", &pom("2.17.0"));
    depline(root, &["analyze", "--project", "com.acme.pay", "--version", "1.0"]);

    write(root, "src/com/acme/pay/Gateway.java", GATEWAY_V2);
    write(root, "src/com/acme/core/Audit.java", AUDIT);
    write(root, "pom.xml", &pom("2.17.1"));
    depline(root, &["analyze", "--project", "com.acme.pay", "--version", "2.0"]);
}

fn has_entry(entries: &[Value], start: &str, end: &str, status: &str) -> bool {
    entries.iter().any(|e| {
        e["startPath"] == start && e["endPath"] == end && e["changeStatus"] == status && e["syntheticStart"] == false
    })
}

#[test]
fn help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_depline"))
        .arg("--help")
        .output()
        .expect("Failed to execute depline");
    let text = stdout(&output);
    for command in ["analyze", "diff", "versions", "show", "rollup", "clear"] {
        assert!(text.contains(command), "missing {}", command);
    }
}

#[test]
fn diff_between_analyzed_versions() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    analyze_two_versions(root);

    assert!(root.join(".depline/graph.json").exists());
    assert_eq!(
        stdout(&depline(root, &["versions", "--project", "com.acme.pay"])),
        "1.0\n2.0\n"
    );

    let out = root.join("diff.json");
    depline(
        root,
        &["diff", "--project", "com.acme.pay", "--to", "2.0", "--out", out.to_str().unwrap()],
    );
    let artifact: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(artifact["projectName"], "com-acme-pay");
    assert_eq!(artifact["versionName"], "2.0");

    let entries = artifact["dependencyEntries"].as_array().unwrap();
    assert!(has_entry(
        entries,
        "com-acme-pay.com.acme.pay.Gateway",
        "com-acme-pay.com.acme.core.Audit",
        "added"
    ));
    assert!(has_entry(
        entries,
        "com-acme-pay.com.acme.pay.Gateway",
        "com-acme-pay.com.acme.core.Ledger",
        "removed"
    ));
    assert!(has_entry(
        entries,
        "com-acme-pay.com.acme.pay.Gateway.charge(long)",
        "com-acme-pay.com.acme.core.Ledger.record(long)",
        "removed"
    ));
    // rolled up to the enclosing package
    assert!(entries.iter().any(|e| {
        e["startPath"] == "com-acme-pay.com.acme.pay"
            && e["endPath"] == "com-acme-pay.com.acme.core.Audit"
            && e["syntheticStart"] == true
    }));

    let manifest = artifact["manifestEntries"].as_array().unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0]["toProject"], "jackson-databind");
    assert_eq!(manifest[0]["newVersion"], "2.17.1");
    assert_eq!(manifest[0]["updated"], true);
}

#[test]
fn show_and_clear() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    analyze_two_versions(root);

    let tree = stdout(&depline(root, &["show", "--project", "com.acme.pay", "--version", "1.0"]));
    assert!(tree.starts_with("project com-acme-pay\n"));
    assert!(tree.contains("class Ledger"));
    assert!(!tree.contains("class Audit"));

    let rollup = stdout(&depline(
        root,
        &["rollup", "--project", "com.acme.pay", "--version", "2.0", "--level", "package"],
    ));
    assert!(rollup.contains("com-acme-pay.com.acme.pay -> com-acme-pay.com.acme.core (1)"));

    depline(root, &["clear"]);
    assert!(!root.join(".depline").exists());
}

#[test]
fn reanalyzing_a_version_is_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "src/com/acme/core/Audit.java", AUDIT);
    depline(root, &["analyze", "--project", "shop", "--version", "1.0"]);

    let report = root.join("report.json");
    depline(
        root,
        &["analyze", "--project", "shop", "--version", "1.0", "--report", report.to_str().unwrap()],
    );
    let report: Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["skipped"], true);
}
