//! In-memory simulated platform.
//!
//! `InMemoryPlatform` implements [`PlatformGateway`] over process-local state
//! seeded from a JSON fixture. It enforces the same constraints the real
//! control plane does (unique template names, no deleting a template that a
//! group still uses) and simulates eventual convergence: new instances take a
//! few membership polls to register, draining members take a few describe
//! polls to shed their tasks, and service deployments take a few service
//! polls to settle.
//!
//! Every mutating request is recorded as a [`PlatformCall`] so tests can
//! assert on exactly what a rollout did.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use fleetshift_core::{
    ClusterMember, ComputeInstance, LaunchTemplate, MachineImage, MemberStatus, ScalingGroup,
    Service, ServiceUpdate, Task, TaskDefinition, TaskDefinitionRequest,
};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{GatewayFuture, PlatformGateway};

// ── Fixture ───────────────────────────────────────────────────────

/// Convergence knobs for the simulated platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Membership polls before a new scaling-group instance shows up ACTIVE.
    pub activation_polls: u32,
    /// Describe polls before a draining member reports zero running tasks.
    pub drain_polls: u32,
    /// Service polls before a deployment settles.
    pub deployment_polls: u32,
    /// Cluster that new instances register into (default: first cluster).
    pub join_cluster: Option<String>,
    /// Task definition ARNs whose deployments never settle.
    pub stalled_revisions: Vec<String>,
    /// Operations that fail with `Unavailable`, by gateway method name.
    pub fail_operations: Vec<String>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            activation_polls: 1,
            drain_polls: 1,
            deployment_polls: 1,
            join_cluster: None,
            stalled_revisions: Vec::new(),
            fail_operations: Vec::new(),
        }
    }
}

/// Initial platform state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformFixture {
    pub images: Vec<MachineImage>,
    pub instances: Vec<ComputeInstance>,
    /// Cluster name → registered members.
    pub clusters: BTreeMap<String, Vec<ClusterMember>>,
    pub launch_templates: Vec<LaunchTemplate>,
    pub scaling_groups: Vec<ScalingGroup>,
    pub task_definitions: Vec<TaskDefinition>,
    pub services: Vec<Service>,
    pub simulation: Simulation,
}

impl PlatformFixture {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: PlatformFixture = serde_json::from_str(&content)?;
        Ok(fixture)
    }
}

/// A mutating request the platform received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    CreateLaunchTemplate { name: String, image_id: String },
    DeleteLaunchTemplate { name: String },
    CreateScalingGroup { name: String, launch_template: String },
    UpdateScalingGroupTemplate { group: String, launch_template: String },
    DeleteScalingGroup { name: String },
    UpdateContainerInstancesState { arns: Vec<String>, status: MemberStatus },
    RegisterTaskDefinition { arn: String },
    UpdateService(ServiceUpdate),
}

// ── State ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct JoiningMember {
    cluster: String,
    member: ClusterMember,
    polls_left: u32,
}

#[derive(Debug)]
struct Deployment {
    polls_left: u32,
    stalled: bool,
}

#[derive(Debug)]
struct ServiceState {
    service: Service,
    tasks: Vec<Task>,
    deployment: Option<Deployment>,
}

#[derive(Debug)]
struct PlatformState {
    images: BTreeMap<String, MachineImage>,
    instances: BTreeMap<String, ComputeInstance>,
    clusters: BTreeMap<String, Vec<ClusterMember>>,
    joining: Vec<JoiningMember>,
    /// Draining member ARN → describe polls left before its tasks are gone.
    draining: BTreeMap<String, u32>,
    templates: BTreeMap<String, LaunchTemplate>,
    groups: BTreeMap<String, ScalingGroup>,
    task_definitions: BTreeMap<String, TaskDefinition>,
    services: BTreeMap<(String, String), ServiceState>,
    simulation: Simulation,
    calls: Vec<PlatformCall>,
    next_id: u64,
}

/// Simulated container platform backed by in-process state.
#[derive(Debug)]
pub struct InMemoryPlatform {
    state: Mutex<PlatformState>,
}

impl InMemoryPlatform {
    pub fn new(fixture: PlatformFixture) -> Self {
        let mut next_id = 1;
        let mut services = BTreeMap::new();
        for service in fixture.services {
            let tasks = (0..service.running_count)
                .map(|_| new_task(&service.cluster, &service.task_definition, &mut next_id))
                .collect();
            services.insert(
                (service.cluster.clone(), service.name.clone()),
                ServiceState {
                    service,
                    tasks,
                    deployment: None,
                },
            );
        }

        let state = PlatformState {
            images: fixture
                .images
                .into_iter()
                .map(|i| (i.image_id.clone(), i))
                .collect(),
            instances: fixture
                .instances
                .into_iter()
                .map(|i| (i.instance_id.clone(), i))
                .collect(),
            clusters: fixture.clusters,
            joining: Vec::new(),
            draining: BTreeMap::new(),
            templates: fixture
                .launch_templates
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            groups: fixture
                .scaling_groups
                .into_iter()
                .map(|g| (g.name.clone(), g))
                .collect(),
            task_definitions: fixture
                .task_definitions
                .into_iter()
                .map(|t| (t.arn.clone(), t))
                .collect(),
            services,
            simulation: fixture.simulation,
            calls: Vec::new(),
            next_id,
        };

        Self {
            state: Mutex::new(state),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(PlatformFixture::from_file(path)?))
    }

    /// Make `operation` fail with `Unavailable` from now on.
    pub async fn fail_on(&self, operation: &str) {
        let mut state = self.state.lock().await;
        state.simulation.fail_operations.push(operation.to_string());
    }

    /// Every mutating call received so far, in order.
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().await.calls.clone()
    }

    /// Every update-service request received so far, in order.
    pub async fn service_updates(&self) -> Vec<ServiceUpdate> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                PlatformCall::UpdateService(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn launch_template(&self, name: &str) -> Option<LaunchTemplate> {
        self.state.lock().await.templates.get(name).cloned()
    }

    pub async fn scaling_groups(&self) -> Vec<ScalingGroup> {
        self.state.lock().await.groups.values().cloned().collect()
    }

    pub async fn members(&self, cluster: &str) -> Vec<ClusterMember> {
        self.state
            .lock()
            .await
            .clusters
            .get(cluster)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn service(&self, cluster: &str, name: &str) -> Option<Service> {
        self.state
            .lock()
            .await
            .services
            .get(&(cluster.to_string(), name.to_string()))
            .map(|s| s.service.clone())
    }
}

fn new_task(cluster: &str, task_definition: &str, next_id: &mut u64) -> Task {
    let id = *next_id;
    *next_id += 1;
    Task {
        arn: format!("arn:fleetshift:task/{cluster}/{id:08x}"),
        task_definition_arn: task_definition.to_string(),
        last_status: "RUNNING".to_string(),
    }
}

impl PlatformState {
    fn check(&self, operation: &str) -> GatewayResult<()> {
        if self.simulation.fail_operations.iter().any(|op| op == operation) {
            return Err(GatewayError::Unavailable(format!(
                "{operation}: injected failure"
            )));
        }
        Ok(())
    }

    fn cluster_mut(&mut self, cluster: &str) -> GatewayResult<&mut Vec<ClusterMember>> {
        self.clusters
            .get_mut(cluster)
            .ok_or_else(|| GatewayError::not_found("cluster", cluster))
    }

    fn describe_image(&self, image_id: &str) -> GatewayResult<MachineImage> {
        self.check("describe_image")?;
        self.images
            .get(image_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("machine image", image_id))
    }

    fn describe_instances(&self, ids: &[String]) -> GatewayResult<Vec<ComputeInstance>> {
        self.check("describe_instances")?;
        ids.iter()
            .map(|id| {
                self.instances
                    .get(id)
                    .cloned()
                    .ok_or_else(|| GatewayError::not_found("instance", id.as_str()))
            })
            .collect()
    }

    fn list_container_instances(
        &mut self,
        cluster: &str,
        status: MemberStatus,
    ) -> GatewayResult<Vec<String>> {
        self.check("list_container_instances")?;
        let members = self
            .clusters
            .get_mut(cluster)
            .ok_or_else(|| GatewayError::not_found("cluster", cluster))?;

        // Registration progresses one step per membership poll.
        let mut still_joining = Vec::new();
        for mut joining in std::mem::take(&mut self.joining) {
            if joining.cluster != cluster {
                still_joining.push(joining);
            } else if joining.polls_left == 0 {
                debug!(arn = %joining.member.arn, "simulated member registered");
                members.push(joining.member);
            } else {
                joining.polls_left -= 1;
                still_joining.push(joining);
            }
        }
        self.joining = still_joining;

        Ok(members
            .iter()
            .filter(|m| m.status == status)
            .map(|m| m.arn.clone())
            .collect())
    }

    fn describe_container_instances(
        &mut self,
        cluster: &str,
        arns: &[String],
    ) -> GatewayResult<Vec<ClusterMember>> {
        self.check("describe_container_instances")?;
        let members = self
            .clusters
            .get_mut(cluster)
            .ok_or_else(|| GatewayError::not_found("cluster", cluster))?;

        let mut described = Vec::with_capacity(arns.len());
        for arn in arns {
            let Some(member) = members.iter_mut().find(|m| &m.arn == arn) else {
                continue;
            };
            if let Some(polls_left) = self.draining.get_mut(arn) {
                if *polls_left == 0 {
                    member.running_tasks = 0;
                    self.draining.remove(arn);
                } else {
                    *polls_left -= 1;
                }
            }
            described.push(member.clone());
        }
        Ok(described)
    }

    fn update_container_instances_state(
        &mut self,
        cluster: &str,
        arns: &[String],
        status: MemberStatus,
    ) -> GatewayResult<()> {
        self.check("update_container_instances_state")?;
        let drain_polls = self.simulation.drain_polls;
        let members = self.cluster_mut(cluster)?;
        let mut changed = Vec::new();
        for member in members.iter_mut().filter(|m| arns.contains(&m.arn)) {
            member.status = status;
            changed.push(member.arn.clone());
        }
        if status == MemberStatus::Draining {
            for arn in &changed {
                self.draining.insert(arn.clone(), drain_polls);
            }
        }
        self.calls.push(PlatformCall::UpdateContainerInstancesState {
            arns: arns.to_vec(),
            status,
        });
        Ok(())
    }

    fn describe_launch_template(&self, name: &str) -> GatewayResult<LaunchTemplate> {
        self.check("describe_launch_template")?;
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("launch template", name))
    }

    fn create_launch_template(&mut self, template: &LaunchTemplate) -> GatewayResult<()> {
        self.check("create_launch_template")?;
        if self.templates.contains_key(&template.name) {
            return Err(GatewayError::rejected(
                "create_launch_template",
                format!("launch template {} already exists", template.name),
            ));
        }
        debug!(name = %template.name, image = %template.image_id, "simulated template created");
        self.templates
            .insert(template.name.clone(), template.clone());
        self.calls.push(PlatformCall::CreateLaunchTemplate {
            name: template.name.clone(),
            image_id: template.image_id.clone(),
        });
        Ok(())
    }

    fn delete_launch_template(&mut self, name: &str) -> GatewayResult<()> {
        self.check("delete_launch_template")?;
        if !self.templates.contains_key(name) {
            return Err(GatewayError::not_found("launch template", name));
        }
        if let Some(group) = self.groups.values().find(|g| g.launch_template == name) {
            return Err(GatewayError::rejected(
                "delete_launch_template",
                format!("launch template {name} is in use by {}", group.name),
            ));
        }
        self.templates.remove(name);
        self.calls.push(PlatformCall::DeleteLaunchTemplate {
            name: name.to_string(),
        });
        Ok(())
    }

    fn describe_scaling_groups(&self, template_name: &str) -> GatewayResult<Vec<ScalingGroup>> {
        self.check("describe_scaling_groups")?;
        Ok(self
            .groups
            .values()
            .filter(|g| g.launch_template == template_name)
            .cloned()
            .collect())
    }

    fn create_scaling_group(&mut self, group: &ScalingGroup) -> GatewayResult<()> {
        self.check("create_scaling_group")?;
        if self.groups.contains_key(&group.name) {
            return Err(GatewayError::rejected(
                "create_scaling_group",
                format!("scaling group {} already exists", group.name),
            ));
        }
        let template = self
            .templates
            .get(&group.launch_template)
            .ok_or_else(|| GatewayError::not_found("launch template", group.launch_template.as_str()))?;
        let image_id = template.image_id.clone();

        let join_cluster = self
            .simulation
            .join_cluster
            .clone()
            .or_else(|| self.clusters.keys().next().cloned());

        let mut created = group.clone();
        created.instances.clear();
        for _ in 0..group.desired_capacity {
            let instance_id = format!("i-{:017x}", self.next_id);
            self.next_id += 1;
            self.instances.insert(
                instance_id.clone(),
                ComputeInstance {
                    instance_id: instance_id.clone(),
                    image_id: image_id.clone(),
                },
            );
            if let Some(cluster) = &join_cluster {
                self.joining.push(JoiningMember {
                    cluster: cluster.clone(),
                    member: ClusterMember {
                        arn: format!("arn:fleetshift:container-instance/{cluster}/{instance_id}"),
                        instance_id: instance_id.clone(),
                        status: MemberStatus::Active,
                        running_tasks: 0,
                        image_id: None,
                    },
                    polls_left: self.simulation.activation_polls,
                });
            }
            created.instances.push(instance_id);
        }

        debug!(name = %group.name, instances = created.instances.len(), "simulated group created");
        self.groups.insert(created.name.clone(), created);
        self.calls.push(PlatformCall::CreateScalingGroup {
            name: group.name.clone(),
            launch_template: group.launch_template.clone(),
        });
        Ok(())
    }

    fn update_scaling_group_template(&mut self, group: &str, template: &str) -> GatewayResult<()> {
        self.check("update_scaling_group_template")?;
        if !self.templates.contains_key(template) {
            return Err(GatewayError::not_found("launch template", template));
        }
        let existing = self
            .groups
            .get_mut(group)
            .ok_or_else(|| GatewayError::not_found("scaling group", group))?;
        existing.launch_template = template.to_string();
        self.calls.push(PlatformCall::UpdateScalingGroupTemplate {
            group: group.to_string(),
            launch_template: template.to_string(),
        });
        Ok(())
    }

    fn delete_scaling_group(&mut self, name: &str, force: bool) -> GatewayResult<()> {
        self.check("delete_scaling_group")?;
        let group = self
            .groups
            .remove(name)
            .ok_or_else(|| GatewayError::not_found("scaling group", name))?;
        if force {
            for members in self.clusters.values_mut() {
                members.retain(|m| !group.instances.contains(&m.instance_id));
            }
            for id in &group.instances {
                self.instances.remove(id);
            }
        }
        self.calls.push(PlatformCall::DeleteScalingGroup {
            name: name.to_string(),
        });
        Ok(())
    }

    fn describe_service(&mut self, cluster: &str, name: &str) -> GatewayResult<Service> {
        self.check("describe_service")?;
        let state = self
            .services
            .get_mut(&(cluster.to_string(), name.to_string()))
            .ok_or_else(|| GatewayError::not_found("service", name))?;

        let settled = match &mut state.deployment {
            Some(deployment) if !deployment.stalled => {
                if deployment.polls_left == 0 {
                    true
                } else {
                    deployment.polls_left -= 1;
                    false
                }
            }
            _ => false,
        };

        if settled {
            let service = &mut state.service;
            state.tasks = (0..service.desired_count)
                .map(|_| new_task(cluster, &service.task_definition, &mut self.next_id))
                .collect();
            service.running_count = service.desired_count;
            service.pending_count = 0;
            state.deployment = None;
            debug!(service = %name, revision = %service.task_definition, "simulated deployment settled");
        }

        Ok(state.service.clone())
    }

    fn describe_task_definition(&self, arn: &str) -> GatewayResult<TaskDefinition> {
        self.check("describe_task_definition")?;
        self.task_definitions
            .get(arn)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("task definition", arn))
    }

    fn register_task_definition(
        &mut self,
        request: &TaskDefinitionRequest,
    ) -> GatewayResult<TaskDefinition> {
        self.check("register_task_definition")?;
        let revision = self
            .task_definitions
            .values()
            .filter(|t| t.family == request.family)
            .map(|t| t.revision)
            .max()
            .unwrap_or(0)
            + 1;
        let definition = TaskDefinition {
            arn: format!("arn:fleetshift:task-definition/{}:{revision}", request.family),
            family: request.family.clone(),
            revision,
            task_role_arn: request.task_role_arn.clone(),
            containers: request.containers.clone(),
        };
        self.task_definitions
            .insert(definition.arn.clone(), definition.clone());
        self.calls.push(PlatformCall::RegisterTaskDefinition {
            arn: definition.arn.clone(),
        });
        Ok(definition)
    }

    fn update_service(&mut self, update: &ServiceUpdate) -> GatewayResult<Service> {
        self.check("update_service")?;
        if !self.task_definitions.contains_key(&update.task_definition) {
            return Err(GatewayError::not_found(
                "task definition",
                update.task_definition.as_str(),
            ));
        }
        let state = self
            .services
            .get_mut(&(update.cluster.clone(), update.service.clone()))
            .ok_or_else(|| GatewayError::not_found("service", update.service.as_str()))?;

        state.service.task_definition = update.task_definition.clone();
        state.service.desired_count = update.desired_count;
        state.service.deployment_configuration = update.deployment_configuration;
        state.service.pending_count = update.desired_count;
        state.deployment = Some(Deployment {
            polls_left: self.simulation.deployment_polls,
            stalled: self
                .simulation
                .stalled_revisions
                .contains(&update.task_definition),
        });
        let service = state.service.clone();
        self.calls.push(PlatformCall::UpdateService(update.clone()));
        Ok(service)
    }

    fn list_tasks(&self, cluster: &str, service: &str) -> GatewayResult<Vec<String>> {
        self.check("list_tasks")?;
        let state = self
            .services
            .get(&(cluster.to_string(), service.to_string()))
            .ok_or_else(|| GatewayError::not_found("service", service))?;
        Ok(state.tasks.iter().map(|t| t.arn.clone()).collect())
    }

    fn describe_tasks(&self, cluster: &str, arns: &[String]) -> GatewayResult<Vec<Task>> {
        self.check("describe_tasks")?;
        Ok(self
            .services
            .iter()
            .filter(|((c, _), _)| c == cluster)
            .flat_map(|(_, s)| s.tasks.iter())
            .filter(|t| arns.contains(&t.arn))
            .cloned()
            .collect())
    }
}

impl PlatformGateway for InMemoryPlatform {
    fn describe_image<'a>(&'a self, image_id: &'a str) -> GatewayFuture<'a, MachineImage> {
        Box::pin(async move { self.state.lock().await.describe_image(image_id) })
    }

    fn describe_instances<'a>(
        &'a self,
        instance_ids: &'a [String],
    ) -> GatewayFuture<'a, Vec<ComputeInstance>> {
        Box::pin(async move { self.state.lock().await.describe_instances(instance_ids) })
    }

    fn list_container_instances<'a>(
        &'a self,
        cluster: &'a str,
        status: MemberStatus,
    ) -> GatewayFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.state
                .lock()
                .await
                .list_container_instances(cluster, status)
        })
    }

    fn describe_container_instances<'a>(
        &'a self,
        cluster: &'a str,
        arns: &'a [String],
    ) -> GatewayFuture<'a, Vec<ClusterMember>> {
        Box::pin(async move {
            self.state
                .lock()
                .await
                .describe_container_instances(cluster, arns)
        })
    }

    fn update_container_instances_state<'a>(
        &'a self,
        cluster: &'a str,
        arns: &'a [String],
        status: MemberStatus,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.state
                .lock()
                .await
                .update_container_instances_state(cluster, arns, status)
        })
    }

    fn describe_launch_template<'a>(&'a self, name: &'a str) -> GatewayFuture<'a, LaunchTemplate> {
        Box::pin(async move { self.state.lock().await.describe_launch_template(name) })
    }

    fn create_launch_template<'a>(
        &'a self,
        template: &'a LaunchTemplate,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move { self.state.lock().await.create_launch_template(template) })
    }

    fn delete_launch_template<'a>(&'a self, name: &'a str) -> GatewayFuture<'a, ()> {
        Box::pin(async move { self.state.lock().await.delete_launch_template(name) })
    }

    fn describe_scaling_groups<'a>(
        &'a self,
        template_name: &'a str,
    ) -> GatewayFuture<'a, Vec<ScalingGroup>> {
        Box::pin(async move { self.state.lock().await.describe_scaling_groups(template_name) })
    }

    fn create_scaling_group<'a>(&'a self, group: &'a ScalingGroup) -> GatewayFuture<'a, ()> {
        Box::pin(async move { self.state.lock().await.create_scaling_group(group) })
    }

    fn update_scaling_group_template<'a>(
        &'a self,
        group: &'a str,
        template: &'a str,
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            self.state
                .lock()
                .await
                .update_scaling_group_template(group, template)
        })
    }

    fn delete_scaling_group<'a>(&'a self, name: &'a str, force: bool) -> GatewayFuture<'a, ()> {
        Box::pin(async move { self.state.lock().await.delete_scaling_group(name, force) })
    }

    fn describe_service<'a>(
        &'a self,
        cluster: &'a str,
        service: &'a str,
    ) -> GatewayFuture<'a, Service> {
        Box::pin(async move { self.state.lock().await.describe_service(cluster, service) })
    }

    fn describe_task_definition<'a>(&'a self, arn: &'a str) -> GatewayFuture<'a, TaskDefinition> {
        Box::pin(async move { self.state.lock().await.describe_task_definition(arn) })
    }

    fn register_task_definition<'a>(
        &'a self,
        request: &'a TaskDefinitionRequest,
    ) -> GatewayFuture<'a, TaskDefinition> {
        Box::pin(async move { self.state.lock().await.register_task_definition(request) })
    }

    fn update_service<'a>(&'a self, update: &'a ServiceUpdate) -> GatewayFuture<'a, Service> {
        Box::pin(async move { self.state.lock().await.update_service(update) })
    }

    fn list_tasks<'a>(
        &'a self,
        cluster: &'a str,
        service: &'a str,
    ) -> GatewayFuture<'a, Vec<String>> {
        Box::pin(async move { self.state.lock().await.list_tasks(cluster, service) })
    }

    fn describe_tasks<'a>(
        &'a self,
        cluster: &'a str,
        arns: &'a [String],
    ) -> GatewayFuture<'a, Vec<Task>> {
        Box::pin(async move { self.state.lock().await.describe_tasks(cluster, arns) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetshift_core::DeploymentConfiguration;

    fn template(name: &str, image: &str) -> LaunchTemplate {
        LaunchTemplate {
            name: name.to_string(),
            image_id: image.to_string(),
            key_name: Some("ops".to_string()),
            security_groups: vec!["sg-1".to_string()],
            user_data: String::new(),
            instance_type: "m5.large".to_string(),
            iam_instance_profile: None,
            monitoring: false,
            ebs_optimized: false,
        }
    }

    fn group(name: &str, template: &str, desired: u32) -> ScalingGroup {
        ScalingGroup {
            name: name.to_string(),
            launch_template: template.to_string(),
            min_size: desired,
            max_size: desired * 2,
            desired_capacity: desired,
            placement: vec!["subnet-a".to_string()],
            health_check_grace_period: 300,
            instances: Vec::new(),
        }
    }

    fn fixture() -> PlatformFixture {
        PlatformFixture {
            clusters: BTreeMap::from([("prod".to_string(), Vec::new())]),
            launch_templates: vec![template("workers", "ami-00000001")],
            scaling_groups: vec![group("asg-a", "workers", 2)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn template_in_use_cannot_be_deleted() {
        let platform = InMemoryPlatform::new(fixture());
        let err = platform.delete_launch_template("workers").await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert!(platform.launch_template("workers").await.is_some());
    }

    #[tokio::test]
    async fn duplicate_template_name_is_rejected() {
        let platform = InMemoryPlatform::new(fixture());
        let err = platform
            .create_launch_template(&template("workers", "ami-00000002"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
    }

    #[tokio::test]
    async fn new_group_members_register_after_activation_polls() {
        let platform = InMemoryPlatform::new(fixture());
        platform.create_scaling_group(&group("asg-b", "workers", 2)).await.unwrap();

        // activation_polls = 1: first poll decrements, second registers.
        let first = platform.list_container_instances("prod", MemberStatus::Active).await.unwrap();
        assert!(first.is_empty());
        let second = platform.list_container_instances("prod", MemberStatus::Active).await.unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn draining_members_shed_tasks() {
        let mut fx = fixture();
        fx.clusters.insert(
            "prod".to_string(),
            vec![ClusterMember {
                arn: "arn:ci/1".to_string(),
                instance_id: "i-1".to_string(),
                status: MemberStatus::Active,
                running_tasks: 4,
                image_id: None,
            }],
        );
        let platform = InMemoryPlatform::new(fx);
        let arns = vec!["arn:ci/1".to_string()];
        platform
            .update_container_instances_state("prod", &arns, MemberStatus::Draining)
            .await
            .unwrap();

        let first = platform.describe_container_instances("prod", &arns).await.unwrap();
        assert_eq!(first[0].running_tasks, 4);
        assert_eq!(first[0].status, MemberStatus::Draining);
        let second = platform.describe_container_instances("prod", &arns).await.unwrap();
        assert_eq!(second[0].running_tasks, 0);
    }

    #[tokio::test]
    async fn service_deployment_settles_and_replaces_tasks() {
        let td = TaskDefinition {
            arn: "arn:td/web:1".to_string(),
            family: "web".to_string(),
            revision: 1,
            task_role_arn: None,
            containers: Vec::new(),
        };
        let fx = PlatformFixture {
            task_definitions: vec![td],
            services: vec![Service {
                name: "web".to_string(),
                cluster: "prod".to_string(),
                task_definition: "arn:td/web:1".to_string(),
                desired_count: 2,
                running_count: 2,
                pending_count: 0,
                deployment_configuration: DeploymentConfiguration::default(),
            }],
            simulation: Simulation {
                deployment_polls: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let platform = InMemoryPlatform::new(fx);
        let registered = platform
            .register_task_definition(&TaskDefinitionRequest {
                family: "web".to_string(),
                task_role_arn: None,
                containers: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(registered.revision, 2);

        platform
            .update_service(&ServiceUpdate {
                cluster: "prod".to_string(),
                service: "web".to_string(),
                task_definition: registered.arn.clone(),
                desired_count: 3,
                deployment_configuration: DeploymentConfiguration::default(),
            })
            .await
            .unwrap();

        let svc = platform.describe_service("prod", "web").await.unwrap();
        assert_eq!(svc.running_count, 3);
        assert_eq!(svc.pending_count, 0);

        let arns = platform.list_tasks("prod", "web").await.unwrap();
        let tasks = platform.describe_tasks("prod", &arns).await.unwrap();
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.task_definition_arn == registered.arn));
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_unavailable() {
        let platform = InMemoryPlatform::new(fixture());
        platform.fail_on("describe_launch_template").await;
        let err = platform.describe_launch_template("workers").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn fixture_parses_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.json");
        std::fs::write(&path, r#"{"clusters": {"prod": []}}"#).unwrap();
        let fx = PlatformFixture::from_file(&path).unwrap();
        assert!(fx.clusters.contains_key("prod"));
        assert_eq!(fx.simulation.activation_polls, 1);
    }

    #[test]
    fn demo_fixture_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/platform.json");
        let fx = PlatformFixture::from_file(&path).unwrap();
        assert_eq!(fx.clusters["prod"].len(), 2);
        assert_eq!(fx.task_definitions[0].containers.len(), 2);
        assert_eq!(
            fx.task_definitions[0].containers[0].extra["essential"],
            serde_json::json!(true)
        );
        assert_eq!(fx.simulation.deployment_polls, 3);
        assert!(fx.simulation.stalled_revisions.is_empty());
    }
}
