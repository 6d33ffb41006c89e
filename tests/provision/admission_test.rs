//! Service-account admission under dynamic service-account security.

use std::sync::Arc;

use podguard::node::PodTemplate;
use podguard::provision::{ProvisionError, ProvisionSettings, Provisioner};
use podguard::scope::Scope;
use podguard::selector::{SelectorError, ServiceAccountSelector};
use podguard::step::WithAllowedServiceAccountsStep;

use crate::common::{labels_of, FakeCluster};

const SECURED: ProvisionSettings = ProvisionSettings {
    dynamic_service_account_security: true,
};

fn environments() -> Arc<FakeCluster> {
    Arc::new(
        FakeCluster::new("ci")
            .with_account("dev-sa", "ci", &[("environment", "dev")])
            .with_account("prod-sa", "ci", &[("environment", "prod")]),
    )
}

fn template_using(account: &str) -> PodTemplate {
    PodTemplate::new("deploy", "deployer")
        .protected()
        .with_service_account(account)
}

fn scope_allowing(environment: &str) -> Scope {
    WithAllowedServiceAccountsStep::new(ServiceAccountSelector::from_labels(labels_of(&[(
        "environment",
        environment,
    )])))
    .body_scope(&Scope::root())
}

#[tokio::test]
async fn approved_account_is_admitted() {
    let provisioner = Provisioner::new(environments(), SECURED);
    let result = provisioner
        .admit(&template_using("prod-sa"), &scope_allowing("prod"))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn unapproved_account_is_rejected() {
    let provisioner = Provisioner::new(environments(), SECURED);
    let err = provisioner
        .admit(&template_using("prod-sa"), &scope_allowing("dev"))
        .await
        .expect_err("prod account is not granted by a dev scope");

    assert!(matches!(err, ProvisionError::ServiceAccountNotAllowed { .. }));
    assert_eq!(
        err.to_string(),
        "Dynamic Service Account Security enabled and Service account prod-sa is not allowed in namespace ci"
    );
}

#[tokio::test]
async fn missing_selector_allows_nothing() {
    let provisioner = Provisioner::new(environments(), SECURED);
    let result = provisioner
        .admit(&template_using("dev-sa"), &Scope::root())
        .await;
    assert!(matches!(result, Err(ProvisionError::ServiceAccountNotAllowed { .. })));
}

#[tokio::test]
async fn nested_scopes_accumulate_grants() {
    let provisioner = Provisioner::new(environments(), SECURED);
    let nested = WithAllowedServiceAccountsStep::new(ServiceAccountSelector::from_names(["other"]))
        .body_scope(&scope_allowing("prod"));

    assert!(provisioner.admit(&template_using("prod-sa"), &nested).await.is_ok());
    assert!(provisioner.admit(&template_using("other"), &nested).await.is_ok());
}

#[tokio::test]
async fn namespace_must_match_too() {
    let provisioner = Provisioner::new(environments(), SECURED);
    let template = template_using("prod-sa").in_namespace("elsewhere");

    let result = provisioner.admit(&template, &scope_allowing("prod")).await;
    assert!(matches!(
        result,
        Err(ProvisionError::ServiceAccountNotAllowed { ref namespace, .. }) if namespace == "elsewhere"
    ));
}

#[tokio::test]
async fn disabled_security_admits_anything() {
    let provisioner = Provisioner::new(environments(), ProvisionSettings::default());
    let result = provisioner
        .admit(&template_using("cluster-admin"), &Scope::root())
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn template_without_account_is_admitted() {
    let cluster = environments();
    let provisioner = Provisioner::new(cluster.clone(), SECURED);
    let template = PodTemplate::new("build", "builder").protected();

    assert!(provisioner.admit(&template, &Scope::root()).await.is_ok());
    assert!(cluster.queries().is_empty());
}

#[tokio::test]
async fn selector_is_resolved_at_admission_time() {
    let cluster = environments();
    let provisioner = Provisioner::new(cluster.clone(), SECURED);
    let scope = scope_allowing("prod");

    provisioner
        .admit(&template_using("prod-sa"), &scope)
        .await
        .expect("first admission");
    provisioner
        .admit(&template_using("prod-sa"), &scope)
        .await
        .expect("second admission");

    assert_eq!(cluster.queries().len(), 2, "selector results must not be cached");
}

#[tokio::test]
async fn unreachable_cluster_fails_provisioning() {
    let provisioner = Provisioner::new(Arc::new(FakeCluster::new("ci").unreachable()), SECURED);
    let result = provisioner
        .admit(&template_using("prod-sa"), &scope_allowing("prod"))
        .await;
    assert!(matches!(
        result,
        Err(ProvisionError::Selector(SelectorError::Cluster(_)))
    ));
}

#[tokio::test]
async fn malformed_label_grant_admits_nothing() {
    let cluster = environments();
    let provisioner = Provisioner::new(cluster.clone(), SECURED);
    let scope = WithAllowedServiceAccountsStep::new(ServiceAccountSelector::from_labels(
        labels_of(&[("environment!", "dev")]),
    ))
    .body_scope(&Scope::root());

    let result = provisioner.admit(&template_using("prod-sa"), &scope).await;

    assert!(matches!(
        result,
        Err(ProvisionError::Selector(SelectorError::Invalid(_)))
    ));
    assert!(cluster.queries().is_empty());
}
