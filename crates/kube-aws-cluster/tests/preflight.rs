//! End-to-end provisioning flow against in-memory providers.
//!
//! Run with:
//!   cargo test -p kube-aws-cluster --test preflight

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use kube_aws_cluster::mock::{MockDnsApi, MockIdentityApi, MockNetworkApi, MockStackApi};
use kube_aws_cluster::{
    Cluster, ClusterError, OrchestratorConfig, ProviderClients, StackEvent, StackStatus, StackTag,
};
use kube_aws_core::ClusterConfig;

const TEMPLATE: &str = r#"{"AWSTemplateFormatVersion": "2010-09-09", "Resources": {}}"#;

// =============================================================================
// Fixtures
// =============================================================================

struct Providers {
    network: Arc<MockNetworkApi>,
    stacks: Arc<MockStackApi>,
    clients: ProviderClients,
}

fn providers() -> Providers {
    let network = Arc::new(MockNetworkApi::new());
    network.add_vpc(
        "vpc-xxx1",
        "10.5.0.0/16",
        &["10.5.1.0/24", "10.5.2.0/24", "10.5.10.100/29"],
    );

    let dns = Arc::new(MockDnsApi::new());
    dns.add_zone("/hostedzone/staging_id_1", "core-os.net.", &["core-os.net."]);
    dns.add_zone(
        "/hostedzone/staging_id_2",
        "staging.core-os.net.",
        &["staging.core-os.net.", "existing-record.staging.core-os.net."],
    );

    let stacks = Arc::new(MockStackApi::new());

    let clients = ProviderClients {
        network: network.clone(),
        identity: Arc::new(MockIdentityApi::with_keys(&["test-key-name"])),
        dns,
        stacks: stacks.clone(),
    };

    Providers {
        network,
        stacks,
        clients,
    }
}

/// A cluster placed into the existing VPC with a DNS record.
fn existing_vpc_config() -> ClusterConfig {
    serde_json::from_value(serde_json::json!({
        "externalDNSName": "test.staging.core-os.net",
        "keyName": "test-key-name",
        "region": "us-west-1",
        "availabilityZone": "us-west-1c",
        "clusterName": "test-cluster-name",
        "kmsKeyArn": "arn:aws:kms:us-west-1:xxxxxxxxx:key/xxxxxxxxxxxxxxxxxxx",
        "vpcId": "vpc-xxx1",
        "vpcCIDR": "10.5.0.0/16",
        "instanceCIDR": "10.5.11.0/24",
        "controllerIP": "10.5.11.10",
        "createRecordSet": true,
        "hostedZone": "staging.core-os.net",
        "stackTags": {
            "Name": "Test",
            "Environment": "Production"
        }
    }))
    .unwrap()
}

fn fast() -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval_seconds: 1,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn provisions_into_existing_vpc() {
    let p = providers();
    p.stacks
        .script_new_stacks(&[StackStatus::CreateInProgress, StackStatus::CreateComplete]);

    let cluster =
        Cluster::new(existing_vpc_config(), p.clients).with_orchestrator_config(fast());
    let info = cluster.create(TEMPLATE).await.unwrap();

    assert_eq!(info.status, StackStatus::CreateComplete);
    assert_eq!(p.network.describe_calls(), 1);

    let requests = p.stacks.create_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].stack_name, "test-cluster-name");
    assert_eq!(requests[0].template_body, TEMPLATE);
    let mut tags = requests[0].tags.clone();
    tags.sort();
    assert_eq!(
        tags,
        vec![
            StackTag::new("Environment", "Production"),
            StackTag::new("Name", "Test"),
        ]
    );
}

#[tokio::test]
async fn preflight_failures_submit_nothing() {
    let cases: [(&str, fn(&mut ClusterConfig)); 5] = [
        ("cidr mismatch", |c: &mut ClusterConfig| {
            c.vpc_cidr = "10.10.0.0/16".to_string();
            c.instance_cidr = "10.10.11.0/24".to_string();
            c.controller_ip = "10.10.11.10".to_string();
        }),
        ("subnet overlap", |c: &mut ClusterConfig| {
            c.instance_cidr = "10.5.2.0/28".to_string();
            c.controller_ip = "10.5.2.10".to_string();
        }),
        ("missing key", |c: &mut ClusterConfig| {
            c.key_name = "invalidKeyName".to_string();
        }),
        ("missing zone", |c: &mut ClusterConfig| {
            c.hosted_zone = "non-existant-zone".to_string();
            c.external_dns_name = "test.non-existant-zone".to_string();
        }),
        ("dns conflict", |c: &mut ClusterConfig| {
            c.external_dns_name = "existing-record.staging.core-os.net".to_string();
        }),
    ];

    for (name, mutate) in cases {
        let p = providers();
        let mut config = existing_vpc_config();
        mutate(&mut config);

        let err = Cluster::new(config, p.clients)
            .create(TEMPLATE)
            .await
            .unwrap_err();
        assert!(err.is_preflight(), "{name}: expected preflight error, got {err:?}");
        assert!(!err.is_retriable(), "{name}: preflight errors are final");
        assert!(p.stacks.create_requests().is_empty(), "{name}: stack submitted");
    }
}

#[tokio::test(start_paused = true)]
async fn failed_stack_reports_root_causes() {
    let p = providers();
    p.stacks.script_new_stacks(&[
        StackStatus::CreateInProgress,
        StackStatus::CreateInProgress,
        StackStatus::RollbackInProgress,
    ]);

    let cluster =
        Cluster::new(existing_vpc_config(), p.clients).with_orchestrator_config(fast());

    let create = cluster.create(TEMPLATE);
    tokio::pin!(create);

    // Events are attached once the stack exists; the first poll sleeps.
    tokio::select! {
        res = &mut create => panic!("stack settled too early: {res:?}"),
        () = tokio::time::sleep(Duration::from_millis(500)) => {}
    }
    let handle = cluster.info().await.unwrap().handle;
    p.stacks.set_events(
        &handle,
        vec![
            StackEvent::new("CREATE_FAILED", "AWS::EC2::Instance")
                .with_logical_id("InstanceController")
                .with_reason("The image id '[ami-0000]' does not exist"),
            StackEvent::new("CREATE_FAILED", "AWS::EC2::Subnet")
                .with_logical_id("Subnet0")
                .with_reason("Resource creation cancelled"),
            StackEvent::new("CREATE_COMPLETE", "AWS::EC2::VPC").with_logical_id("VPC"),
        ],
    );

    let err = create.await.unwrap_err();
    let ClusterError::StackFailed {
        status, messages, ..
    } = &err
    else {
        panic!("expected StackFailed, got {err:?}");
    };
    assert_eq!(*status, StackStatus::RollbackInProgress);
    assert_eq!(
        messages,
        &vec![
            "CREATE_FAILED AWS::EC2::Instance InstanceController The image id '[ami-0000]' does not exist"
                .to_string()
        ]
    );
    assert!(err
        .to_string()
        .contains("Printing the most recent failed stack events:"));
}

#[tokio::test]
async fn duplicate_cluster_rejected_by_provider() {
    let p = providers();
    p.stacks.script_new_stacks(&[StackStatus::CreateComplete]);

    let cluster = Cluster::new(existing_vpc_config(), p.clients);
    cluster.create(TEMPLATE).await.unwrap();

    let err = cluster.create(TEMPLATE).await.unwrap_err();
    assert!(matches!(
        err,
        ClusterError::Api(ref e) if e.code() == Some("AlreadyExistsException")
    ));
    assert_eq!(p.stacks.stack_count(), 1);
}

#[tokio::test]
async fn outputs_reported_by_info() {
    let p = providers();
    p.stacks.script_new_stacks(&[StackStatus::CreateComplete]);

    let cluster = Cluster::new(existing_vpc_config(), p.clients);
    let created = cluster.create(TEMPLATE).await.unwrap();

    let mut outputs = BTreeMap::new();
    outputs.insert("ControllerIP".to_string(), "10.5.11.10".to_string());
    p.stacks.set_outputs(&created.handle, outputs);

    let info = cluster.info().await.unwrap();
    assert_eq!(info.outputs["ControllerIP"], "10.5.11.10");

    cluster.destroy().await.unwrap();
    assert_eq!(p.stacks.stack_count(), 0);
}
