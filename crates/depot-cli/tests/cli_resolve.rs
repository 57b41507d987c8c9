mod common;

use common::Sandbox;
use predicates::prelude::*;

#[test]
fn test_resolve_prints_listing_root_first() {
    let sb = Sandbox::new();
    sb.publish("org.example", "app", "1.0", &["org.example:lib:2.0"]);
    sb.publish("org.example", "lib", "2.0", &[]);

    sb.depot()
        .args(["resolve", "org.example:app:1.0"])
        .assert()
        .success()
        .stdout(
            "org.example+app;version=\"1.0\"\norg.example+lib;version=\"2.0\"\n",
        );
}

#[test]
fn test_resolve_json_report() {
    let sb = Sandbox::new();
    sb.publish("g", "a", "1.0", &["g:b:1.0", "g:missing:1.0"]);
    sb.publish("g", "b", "1.0", &[]);

    let output = sb
        .depot()
        .args(["resolve", "g:a:1.0", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["root"], "g:a:1.0");
    assert_eq!(report["scope"], "compile");
    assert_eq!(report["dependencies"], serde_json::json!(["g:b:1.0"]));
    assert_eq!(
        report["diagnostics"][0]["message"],
        "Cannot find g:missing:1.0 from top"
    );
}

#[test]
fn test_resolve_reports_missing_but_succeeds() {
    let sb = Sandbox::new();
    sb.publish("g", "a", "1.0", &["g:missing:1.0"]);

    sb.depot()
        .args(["resolve", "g:a:1.0"])
        .assert()
        .success()
        .stdout("g+a;version=\"1.0\"\n")
        .stderr(predicate::str::contains("Cannot find g:missing:1.0 from top"));
}

#[test]
fn test_resolve_strict_fails_on_diagnostics() {
    let sb = Sandbox::new();
    sb.publish("g", "a", "1.0", &["g:missing:1.0"]);

    sb.depot()
        .args(["resolve", "g:a:1.0", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be resolved"));
}

#[test]
fn test_resolve_writes_output_file() {
    let sb = Sandbox::new();
    sb.publish("g", "a", "1.0", &[]);
    let out = sb.home.path().join("listing.txt");

    sb.depot()
        .args(["resolve", "g:a:1.0", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout("");
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "g+a;version=\"1.0\"\n"
    );
}

#[test]
fn test_resolve_project_directory() {
    let sb = Sandbox::new();
    sb.publish("g", "lib", "1.0", &[]);
    let project = tempfile::TempDir::new().unwrap();
    std::fs::write(
        project.path().join("pom.xml"),
        common::pom_xml("g", "app", "0.1", &["g:lib:1.0"]),
    )
    .unwrap();

    sb.depot()
        .arg("resolve")
        .arg(project.path())
        .assert()
        .success()
        .stdout("g+app;version=\"0.1\"\ng+lib;version=\"1.0\"\n");
}

#[test]
fn test_resolve_unknown_root_fails() {
    let sb = Sandbox::new();

    sb.depot()
        .args(["resolve", "g:nothing:1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("g:nothing:1.0"));
}

#[test]
fn test_resolve_rejects_unknown_scope() {
    let sb = Sandbox::new();

    sb.depot()
        .args(["resolve", "g:a:1.0", "--scope", "everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown dependency scope"));
}

#[test]
fn test_resolve_define_fills_open_macro() {
    let sb = Sandbox::new();
    sb.publish("g", "app", "1.0", &["g:lib:${lib.release}"]);
    sb.publish("g", "lib", "3.0", &[]);

    sb.depot()
        .args(["resolve", "g:app:1.0", "-D", "lib.release=3.0"])
        .assert()
        .success()
        .stdout("g+app;version=\"1.0\"\ng+lib;version=\"3.0\"\n");
}

#[test]
fn test_resolve_strict_prints_errors() {
    let sb = Sandbox::new();
    sb.publish("g", "a", "1.0", &["g:missing:1.0"]);

    sb.depot()
        .args(["resolve", "g:a:1.0", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Cannot find g:missing:1.0 from top"));
}
