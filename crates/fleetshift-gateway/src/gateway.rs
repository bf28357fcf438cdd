//! The platform gateway trait.
//!
//! One method per control-plane request. Implementations map their SDK's
//! failures into [`GatewayError`] at this boundary and do nothing else: no
//! retries, no caching, no business rules.

use std::future::Future;
use std::pin::Pin;

use fleetshift_core::{
    ClusterMember, ComputeInstance, LaunchTemplate, MachineImage, MemberStatus, ScalingGroup,
    Service, ServiceUpdate, Task, TaskDefinition, TaskDefinitionRequest,
};

use crate::error::GatewayResult;

/// Boxed future returned by every gateway operation.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send + 'a>>;

/// Request/response operations against the container platform.
pub trait PlatformGateway: Send + Sync {
    // ── Images & compute ──────────────────────────────────────────

    /// Describe a machine image by id.
    fn describe_image<'a>(&'a self, image_id: &'a str) -> GatewayFuture<'a, MachineImage>;

    /// Describe raw compute instances by id.
    fn describe_instances<'a>(
        &'a self,
        instance_ids: &'a [String],
    ) -> GatewayFuture<'a, Vec<ComputeInstance>>;

    // ── Cluster membership ────────────────────────────────────────

    /// List the ARNs of container instances in `cluster` with `status`.
    fn list_container_instances<'a>(
        &'a self,
        cluster: &'a str,
        status: MemberStatus,
    ) -> GatewayFuture<'a, Vec<String>>;

    /// Describe container instances by ARN.
    fn describe_container_instances<'a>(
        &'a self,
        cluster: &'a str,
        arns: &'a [String],
    ) -> GatewayFuture<'a, Vec<ClusterMember>>;

    /// Transition container instances to `status` (e.g. DRAINING).
    fn update_container_instances_state<'a>(
        &'a self,
        cluster: &'a str,
        arns: &'a [String],
        status: MemberStatus,
    ) -> GatewayFuture<'a, ()>;

    // ── Launch templates ──────────────────────────────────────────

    fn describe_launch_template<'a>(&'a self, name: &'a str) -> GatewayFuture<'a, LaunchTemplate>;

    /// Create a template. Fails if the name is already taken.
    fn create_launch_template<'a>(&'a self, template: &'a LaunchTemplate)
    -> GatewayFuture<'a, ()>;

    /// Delete a template. Fails while any scaling group is bound to it.
    fn delete_launch_template<'a>(&'a self, name: &'a str) -> GatewayFuture<'a, ()>;

    // ── Scaling groups ────────────────────────────────────────────

    /// Describe every scaling group bound to `template_name`.
    fn describe_scaling_groups<'a>(
        &'a self,
        template_name: &'a str,
    ) -> GatewayFuture<'a, Vec<ScalingGroup>>;

    fn create_scaling_group<'a>(&'a self, group: &'a ScalingGroup) -> GatewayFuture<'a, ()>;

    /// Rebind a scaling group to another launch template.
    fn update_scaling_group_template<'a>(
        &'a self,
        group: &'a str,
        template: &'a str,
    ) -> GatewayFuture<'a, ()>;

    /// Delete a scaling group; `force` also terminates its instances.
    fn delete_scaling_group<'a>(&'a self, name: &'a str, force: bool) -> GatewayFuture<'a, ()>;

    // ── Services & task definitions ───────────────────────────────

    fn describe_service<'a>(&'a self, cluster: &'a str, service: &'a str)
    -> GatewayFuture<'a, Service>;

    fn describe_task_definition<'a>(&'a self, arn: &'a str) -> GatewayFuture<'a, TaskDefinition>;

    /// Register a new revision under the request's family.
    fn register_task_definition<'a>(
        &'a self,
        request: &'a TaskDefinitionRequest,
    ) -> GatewayFuture<'a, TaskDefinition>;

    fn update_service<'a>(&'a self, update: &'a ServiceUpdate) -> GatewayFuture<'a, Service>;

    // ── Tasks ─────────────────────────────────────────────────────

    /// List the ARNs of tasks belonging to `service`.
    fn list_tasks<'a>(&'a self, cluster: &'a str, service: &'a str)
    -> GatewayFuture<'a, Vec<String>>;

    fn describe_tasks<'a>(
        &'a self,
        cluster: &'a str,
        arns: &'a [String],
    ) -> GatewayFuture<'a, Vec<Task>>;
}
