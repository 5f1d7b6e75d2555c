//! In-memory provider doubles for tests.
//!
//! Every mock can be told to fail all calls with a given [`ApiError`] via
//! `fail_with`, which is how transport failures are simulated.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::api::{
    ApiError, ApiResult, CreateStackRequest, DnsApi, HostedZone, IdentityApi, KeyPairInfo,
    NetworkApi, ResourceRecordSet, StackApi, StackDescription, Subnet, Vpc, KEY_PAIR_NOT_FOUND,
};
use crate::status::StackStatus;
use crate::types::{StackEvent, StackHandle};

/// A mock compute service holding VPCs and their subnets.
#[derive(Default)]
pub struct MockNetworkApi {
    vpcs: Mutex<HashMap<String, MockVpc>>,
    failure: Mutex<Option<ApiError>>,
    describe_calls: AtomicUsize,
}

struct MockVpc {
    cidr: Option<String>,
    subnets: Vec<Subnet>,
}

impl MockNetworkApi {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a VPC with the given subnets.
    pub fn add_vpc(&self, vpc_id: &str, cidr: &str, subnets: &[&str]) {
        let subnets = subnets
            .iter()
            .enumerate()
            .map(|(i, cidr)| Subnet {
                subnet_id: Some(format!("subnet-{vpc_id}-{i}")),
                cidr_block: Some((*cidr).to_string()),
            })
            .collect();
        self.vpcs.lock().insert(
            vpc_id.to_string(),
            MockVpc {
                cidr: Some(cidr.to_string()),
                subnets,
            },
        );
    }

    /// Add a subnet to an existing VPC.
    pub fn add_subnet(&self, vpc_id: &str, cidr: &str) {
        if let Some(vpc) = self.vpcs.lock().get_mut(vpc_id) {
            let id = format!("subnet-{vpc_id}-{}", vpc.subnets.len());
            vpc.subnets.push(Subnet {
                subnet_id: Some(id),
                cidr_block: Some(cidr.to_string()),
            });
        }
    }

    /// Fail every subsequent call with `error`.
    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock() = Some(error);
    }

    /// Number of `describe_vpc` calls made.
    #[must_use]
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> ApiResult<()> {
        self.failure.lock().clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl NetworkApi for MockNetworkApi {
    async fn describe_vpc(&self, vpc_id: &str) -> ApiResult<Option<Vpc>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.vpcs.lock().get(vpc_id).map(|vpc| Vpc {
            vpc_id: vpc_id.to_string(),
            cidr_block: vpc.cidr.clone(),
        }))
    }

    async fn describe_subnets(&self, vpc_id: &str) -> ApiResult<Vec<Subnet>> {
        self.check_failure()?;
        Ok(self
            .vpcs
            .lock()
            .get(vpc_id)
            .map(|vpc| vpc.subnets.clone())
            .unwrap_or_default())
    }
}

/// A mock compute service holding key pair names.
#[derive(Default)]
pub struct MockIdentityApi {
    keys: Mutex<Vec<String>>,
    failure: Mutex<Option<ApiError>>,
}

impl MockIdentityApi {
    /// Create a mock knowing the given key pairs.
    #[must_use]
    pub fn with_keys(keys: &[&str]) -> Self {
        Self {
            keys: Mutex::new(keys.iter().map(|k| (*k).to_string()).collect()),
            failure: Mutex::new(None),
        }
    }

    /// Fail every subsequent call with `error`.
    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock() = Some(error);
    }
}

#[async_trait]
impl IdentityApi for MockIdentityApi {
    async fn describe_key_pair(&self, key_name: &str) -> ApiResult<KeyPairInfo> {
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        if self.keys.lock().iter().any(|k| k == key_name) {
            Ok(KeyPairInfo {
                key_name: key_name.to_string(),
                fingerprint: None,
            })
        } else {
            Err(ApiError::service(
                KEY_PAIR_NOT_FOUND,
                format!("The key pair '{key_name}' does not exist"),
            ))
        }
    }
}

/// A mock DNS service holding hosted zones and their record names.
#[derive(Default)]
pub struct MockDnsApi {
    zones: Mutex<BTreeMap<String, MockZone>>,
    failure: Mutex<Option<ApiError>>,
}

struct MockZone {
    id: String,
    records: Vec<String>,
}

impl MockDnsApi {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hosted zone holding the given record names.
    pub fn add_zone(&self, id: &str, name: &str, records: &[&str]) {
        self.zones.lock().insert(
            name.to_string(),
            MockZone {
                id: id.to_string(),
                records: records.iter().map(|r| (*r).to_string()).collect(),
            },
        );
    }

    /// Fail every subsequent call with `error`.
    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock() = Some(error);
    }

    fn check_failure(&self) -> ApiResult<()> {
        self.failure.lock().clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl DnsApi for MockDnsApi {
    /// Lists zones sorting at or after `dns_name`, like a paginated listing
    /// would.
    async fn list_hosted_zones_by_name(&self, dns_name: &str) -> ApiResult<Vec<HostedZone>> {
        self.check_failure()?;
        Ok(self
            .zones
            .lock()
            .range(dns_name.to_string()..)
            .map(|(name, zone)| HostedZone {
                id: zone.id.clone(),
                name: name.clone(),
            })
            .collect())
    }

    async fn list_resource_record_sets(&self, zone_id: &str) -> ApiResult<Vec<ResourceRecordSet>> {
        self.check_failure()?;
        let zones = self.zones.lock();
        let zone = zones
            .values()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| {
                ApiError::service(
                    "NoSuchHostedZone",
                    format!("No hosted zone found with ID: {zone_id}"),
                )
            })?;
        Ok(zone
            .records
            .iter()
            .map(|name| ResourceRecordSet {
                name: name.clone(),
                record_type: Some("A".to_string()),
            })
            .collect())
    }
}

/// A mock orchestration service.
///
/// New stacks report `CREATE_IN_PROGRESS` until a status sequence is
/// scripted with [`MockStackApi::script_statuses`]. Each describe call
/// consumes one scripted status; the last one sticks.
#[derive(Default)]
pub struct MockStackApi {
    stacks: Mutex<HashMap<String, MockStack>>,
    requests: Mutex<Vec<CreateStackRequest>>,
    template_error: Mutex<Option<ApiError>>,
    initial_statuses: Mutex<Vec<StackStatus>>,
    event_calls: AtomicUsize,
}

struct MockStack {
    id: String,
    statuses: VecDeque<StackStatus>,
    status_reason: Option<String>,
    events: Vec<StackEvent>,
    outputs: BTreeMap<String, String>,
}

impl MockStack {
    fn current_status(&mut self) -> StackStatus {
        if self.statuses.len() > 1 {
            self.statuses.pop_front().unwrap_or(StackStatus::CreateInProgress)
        } else {
            self.statuses
                .front()
                .cloned()
                .unwrap_or(StackStatus::CreateInProgress)
        }
    }
}

impl MockStackApi {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All creation requests received, including rejected ones.
    #[must_use]
    pub fn create_requests(&self) -> Vec<CreateStackRequest> {
        self.requests.lock().clone()
    }

    /// Number of stacks currently held.
    #[must_use]
    pub fn stack_count(&self) -> usize {
        self.stacks.lock().len()
    }

    /// Number of `describe_stack_events` calls made.
    #[must_use]
    pub fn event_calls(&self) -> usize {
        self.event_calls.load(Ordering::SeqCst)
    }

    /// Reject every subsequent template validation with `error`.
    pub fn reject_templates(&self, error: ApiError) {
        *self.template_error.lock() = Some(error);
    }

    /// Set the status sequence reported by stacks created from now on.
    pub fn script_new_stacks(&self, statuses: &[StackStatus]) {
        *self.initial_statuses.lock() = statuses.to_vec();
    }

    /// Set the status sequence reported for a stack.
    pub fn script_statuses(&self, handle: &StackHandle, statuses: &[StackStatus]) {
        self.with_stack(handle, |s| s.statuses = statuses.iter().cloned().collect());
    }

    /// Set the stack-level status reason.
    pub fn set_status_reason(&self, handle: &StackHandle, reason: &str) {
        self.with_stack(handle, |s| s.status_reason = Some(reason.to_string()));
    }

    /// Set the event history of a stack.
    pub fn set_events(&self, handle: &StackHandle, events: Vec<StackEvent>) {
        self.with_stack(handle, |s| s.events = events);
    }

    /// Set the outputs of a stack.
    pub fn set_outputs(&self, handle: &StackHandle, outputs: BTreeMap<String, String>) {
        self.with_stack(handle, |s| s.outputs = outputs);
    }

    fn with_stack(&self, handle: &StackHandle, f: impl FnOnce(&mut MockStack)) {
        if let Some(stack) = self
            .stacks
            .lock()
            .values_mut()
            .find(|s| s.id == handle.as_str())
        {
            f(stack);
        }
    }
}

/// Find a stack by name or id.
fn lookup<'a>(
    stacks: &'a mut HashMap<String, MockStack>,
    stack: &str,
) -> Option<(&'a String, &'a mut MockStack)> {
    stacks
        .iter_mut()
        .find(|(name, s)| name.as_str() == stack || s.id == stack)
}

#[async_trait]
impl StackApi for MockStackApi {
    async fn create_stack(&self, request: &CreateStackRequest) -> ApiResult<StackHandle> {
        self.requests.lock().push(request.clone());

        let mut stacks = self.stacks.lock();
        if stacks.contains_key(&request.stack_name) {
            return Err(ApiError::service(
                "AlreadyExistsException",
                format!("Stack [{}] already exists", request.stack_name),
            ));
        }

        let id = format!(
            "arn:aws:cloudformation:us-west-1:000000000000:stack/{}/{}",
            request.stack_name,
            Uuid::new_v4()
        );
        stacks.insert(
            request.stack_name.clone(),
            MockStack {
                id: id.clone(),
                statuses: self.initial_statuses.lock().iter().cloned().collect(),
                status_reason: None,
                events: Vec::new(),
                outputs: BTreeMap::new(),
            },
        );

        Ok(StackHandle::new(id))
    }

    async fn describe_stack(&self, stack: &str) -> ApiResult<Option<StackDescription>> {
        let mut stacks = self.stacks.lock();
        Ok(lookup(&mut stacks, stack).map(|(name, s)| StackDescription {
            stack_id: s.id.clone(),
            stack_name: name.clone(),
            status: s.current_status(),
            status_reason: s.status_reason.clone(),
            outputs: s.outputs.clone(),
        }))
    }

    async fn describe_stack_events(&self, stack: &str) -> ApiResult<Vec<StackEvent>> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        let mut stacks = self.stacks.lock();
        lookup(&mut stacks, stack)
            .map(|(_, s)| s.events.clone())
            .ok_or_else(|| {
                ApiError::service("ValidationError", format!("Stack [{stack}] does not exist"))
            })
    }

    async fn validate_template(&self, _template_body: &str) -> ApiResult<()> {
        self.template_error.lock().clone().map_or(Ok(()), Err)
    }

    async fn delete_stack(&self, stack_name: &str) -> ApiResult<()> {
        let mut stacks = self.stacks.lock();
        let name = lookup(&mut stacks, stack_name).map(|(name, _)| name.clone());
        if let Some(name) = name {
            stacks.remove(&name);
        }
        Ok(())
    }
}
