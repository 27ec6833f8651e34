use super::*;
use std::error::Error as _;

#[test]
fn http_status_mapping() {
    assert_eq!(ProxyError::privilege("secret_op", DenyReason::NotPublic).http_status(), 403);
    assert_eq!(ProxyError::Pool { role: DbRole::Member, limit: 2 }.http_status(), 503);
    assert_eq!(ProxyError::config("bad").http_status(), 500);
    assert_eq!(ProxyError::fixture("bad").http_status(), 500);
    assert_eq!(ProxyError::from(anyhow::anyhow!("nope")).http_status(), 422);
}

#[test]
fn exit_codes_are_distinct_per_class() {
    let codes = [
        ProxyError::privilege("x", DenyReason::InternalOnly).exit_code(),
        ProxyError::Pool { role: DbRole::Admin, limit: 1 }.exit_code(),
        ProxyError::config("x").exit_code(),
        ProxyError::from(anyhow::anyhow!("x")).exit_code(),
    ];
    let mut sorted = codes.to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), codes.len());
}

#[test]
fn privilege_message_names_attribute() {
    let e = ProxyError::privilege("_load_persona_row", DenyReason::NotPublic);
    let msg = e.to_string();
    assert!(msg.contains("_load_persona_row"), "{msg}");
    assert_eq!(e.code_str(), "privilege_error");
}

#[test]
fn operation_errors_are_transparent() {
    let e = ProxyError::from(anyhow::anyhow!("Not privileged."));
    assert_eq!(e.to_string(), "Not privileged.");
    assert_eq!(e.code_str(), "operation_error");
}

#[test]
fn missing_resource_keeps_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "attachment 7 absent");
    let e = ProxyError::MissingResource { operation: "get_assembly_attachment".into(), source: Box::new(io) };
    assert!(e.to_string().contains("provisioned resource"));
    let cause = e.source().expect("cause kept");
    assert_eq!(cause.to_string(), "attachment 7 absent");
}
