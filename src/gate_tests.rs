use super::*;

#[test]
fn decision_table() {
    let cases = [
        (Some(OperationDescriptor::PUBLIC), false, GateDecision::Allow),
        (Some(OperationDescriptor::PUBLIC), true, GateDecision::Allow),
        (Some(OperationDescriptor::INTERNAL), false, GateDecision::Deny(DenyReason::InternalOnly)),
        (Some(OperationDescriptor::INTERNAL), true, GateDecision::Allow),
        (Some(OperationDescriptor::PRIVATE), false, GateDecision::Deny(DenyReason::NotPublic)),
        (Some(OperationDescriptor::PRIVATE), true, GateDecision::Deny(DenyReason::NotPublic)),
        (None, false, GateDecision::Deny(DenyReason::NotCallable)),
        (None, true, GateDecision::Deny(DenyReason::NotCallable)),
    ];
    for (desc, internal, expected) in cases {
        assert_eq!(check(desc.as_ref(), internal), expected, "{desc:?} internal={internal}");
    }
}

#[test]
fn internal_marker_without_public_is_still_denied() {
    let d = OperationDescriptor { public: false, internal: true };
    assert_eq!(check(Some(&d), true), GateDecision::Deny(DenyReason::NotPublic));
}

#[test]
fn passthrough_bypasses_markers() {
    let gate = CapabilityGate::new(false, ["subman"]);
    assert_eq!(gate.check("subman", None), GateDecision::PassThrough);
    assert_eq!(gate.check("subman", Some(&OperationDescriptor::PRIVATE)), GateDecision::PassThrough);
    assert_eq!(gate.check("other", None), GateDecision::Deny(DenyReason::NotCallable));
}

#[test]
fn passthrough_list_is_closed() {
    let gate = CapabilityGate::new(true, Vec::<String>::new());
    assert!(!gate.is_passthrough("subman"));
    assert_eq!(gate.passthrough().count(), 0);
}
