#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use reqtx_core::IsolationLevel;
use reqtx_web::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
    actions:
      - route: "PUT /items/:key"
        transactonal: true # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.transactions.simulation_header, "X-REQUEST-SIMULATION");
    assert_eq!(cfg.transactions.coordinator_order, 0);
    assert!(cfg.controllers.is_empty());
}

#[test]
fn controller_and_action_metadata_parse() {
    let ok = r#"
version: 1
transactions:
  coordinator_order: 7
controllers:
  - name: "items"
    transactional: true
    isolation: read_committed
    actions:
      - route: "GET /items/:key"
        transactional: false
      - route: "PUT /items/:key"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.transactions.coordinator_order, 7);

    let items = &cfg.controllers[0];
    let controller = items.policy().expect("controller metadata");
    assert!(controller.enabled);
    assert_eq!(controller.isolation, IsolationLevel::ReadCommitted);

    assert!(!items.actions[0].policy().expect("action metadata").enabled);
    assert!(items.actions[1].policy().is_none());
}

#[test]
fn shipped_config_is_valid() {
    let cfg = config::load_from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/../../reqtx.yaml"))
        .expect("reqtx.yaml must parse");
    assert_eq!(cfg.controllers.len(), 1);
}

#[test]
fn rejects_unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_CONFIG");
}

#[test]
fn rejects_route_without_method() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
    actions:
      - route: "/items/:key"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn rejects_route_declared_twice() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
    actions:
      - route: "PUT /items/:key"
  - name: "legacy_items"
    actions:
      - route: "PUT /items/:key"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("route declared twice"));
}

#[test]
fn rejects_duplicate_controller() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
  - name: "items"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn rejects_invalid_simulation_header() {
    let bad = r#"
version: 1
transactions:
  simulation_header: "not a header"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_CONFIG");
}

#[test]
fn rejects_unknown_isolation_level() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
    transactional: true
    isolation: eventually
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn rejects_route_repeated_with_different_spacing() {
    let bad = r#"
version: 1
controllers:
  - name: "a"
    transactional: true
    actions:
      - route: "PUT /items/:key"
  - name: "b"
    transactional: false
    actions:
      - route: "PUT  /items/:key"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_CONFIG");
    assert!(err.to_string().contains("route declared twice"));
}

#[test]
fn rejects_lowercase_route_method() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
    transactional: true
    actions:
      - route: "put /items/:key"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("invalid route method"));
}

#[test]
fn rejects_extension_route_method() {
    let bad = r#"
version: 1
controllers:
  - name: "items"
    actions:
      - route: "PURGE /items/:key"
"#;
    assert!(config::load_from_str(bad).is_err());
}
