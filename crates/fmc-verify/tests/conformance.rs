//! Structural and end-to-end conformance of in-process candidates

use fmc_contract::{CheckId, CheckStatus, InconclusiveCause, OperationSlot, PatternContract, Role};
use fmc_test_utils::{pascal_binding, Fixture, Naming};
use fmc_verify::Verifier;
use pretty_assertions::assert_eq;

#[test]
fn conforming_candidate_passes_every_clause() {
    let fixture = Fixture::conforming();
    let verdict = Verifier::default().verify(&fixture.candidate("conforming"), &fixture.binding());

    assert!(verdict.passed(), "{:#?}", verdict.results());
    assert_eq!(verdict.results().len(), 10);
    let ids: Vec<CheckId> = verdict.results().iter().map(|r| r.id).collect();
    assert_eq!(ids, PatternContract::describe().clauses());
}

#[test]
fn camel_case_naming_is_just_another_binding() {
    let fixture = Fixture::conforming().with_naming(Naming::CAMEL);
    let verdict = Verifier::default().verify(&fixture.candidate("camel"), &fixture.binding());
    assert!(verdict.passed(), "{:#?}", verdict.results());

    // The PascalCase binding names operations this candidate does not have.
    let verdict = Verifier::default().verify(&fixture.candidate("camel"), &pascal_binding());
    assert!(!verdict.passed());
    let signature = verdict
        .result(&CheckId::Signature {
            slot: OperationSlot::ProductOperation,
        })
        .unwrap();
    assert_eq!(signature.status, CheckStatus::Fail);
}

#[test]
fn concrete_product_base_fails_only_abstract_product() {
    let fixture = Fixture::conforming().with_concrete_product_base();
    let verdict = Verifier::default().verify(&fixture.candidate("concrete-product"), &fixture.binding());

    assert!(!verdict.passed());
    let summary = verdict.summary();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 9);

    let abstract_product = verdict.result(&CheckId::Abstract { role: Role::Product }).unwrap();
    assert_eq!(abstract_product.status, CheckStatus::Fail);
    assert!(abstract_product.message.contains("'Product'"));
}

#[test]
fn concrete_creator_base_fails_abstract_creator() {
    let fixture = Fixture::conforming().with_concrete_creator_base();
    let verdict = Verifier::default().verify(&fixture.candidate("concrete-creator"), &fixture.binding());

    let problems: Vec<CheckId> = verdict.problems().map(|r| r.id).collect();
    assert_eq!(problems, vec![CheckId::Abstract { role: Role::Creator }]);
}

#[test]
fn verification_is_idempotent() {
    let fixture = Fixture::conforming().with_orchestration(
        fmc_test_utils::OrchestrationBehavior::Fixed("done".to_string()),
    );
    let candidate = fixture.candidate("repeat");
    let binding = fixture.binding();
    let verifier = Verifier::default();

    let first = verifier.verify(&candidate, &binding);
    let second = verifier.verify(&candidate, &binding);
    assert_eq!(first, second);
}

#[test]
fn missing_concrete_type_is_inconclusive_not_fatal() {
    let fixture = Fixture::conforming();
    let binding = fixture.binding().with_role(Role::ConcreteCreator, "ConcreteCreatorB");
    let verdict = Verifier::default().verify(&fixture.candidate("missing"), &binding);

    assert!(!verdict.passed());
    assert_eq!(verdict.results().len(), 10);
    for id in [
        CheckId::Inherits {
            child: Role::ConcreteCreator,
            parent: Role::Creator,
            variant: 0,
        },
        CheckId::FactoryReturnsProduct {
            role: Role::ConcreteCreator,
            variant: 0,
        },
        CheckId::OrchestrationEmbedsProduct {
            role: Role::ConcreteCreator,
            variant: 0,
        },
    ] {
        assert_eq!(verdict.result(&id).unwrap().cause, Some(InconclusiveCause::MissingType));
    }
    let operation = verdict
        .result(&CheckId::OperationNonEmpty {
            role: Role::ConcreteProduct,
            variant: 0,
        })
        .unwrap();
    assert!(operation.is_pass());
}
