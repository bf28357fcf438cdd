//! Rollout planner — derives target configuration from a snapshot.
//!
//! Nothing here touches the platform. Launch templates cannot be created
//! under a name that still exists, so an AMI rollout parks its groups on a
//! `{name}-copy` template while the original name is freed and recreated.

use fleetshift_core::{LaunchTemplate, ScalingGroup, TaskDefinition, TaskDefinitionRequest};

use crate::error::{RolloutError, RolloutResult};

/// Suffix of the temporary parking template.
pub const COPY_SUFFIX: &str = "-copy";

pub fn copy_name(template_name: &str) -> String {
    format!("{template_name}{COPY_SUFFIX}")
}

/// Which template is being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTarget {
    /// Temporary duplicate named `{original}-copy`.
    Copy,
    /// Replacement under the original name.
    Final,
}

/// Fields a template plan may override. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOverrides {
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
}

pub fn plan_template(
    current: &LaunchTemplate,
    overrides: &TemplateOverrides,
    target: PlanTarget,
) -> LaunchTemplate {
    let name = match target {
        PlanTarget::Copy => copy_name(&current.name),
        PlanTarget::Final => current.name.clone(),
    };
    LaunchTemplate {
        name,
        image_id: overrides
            .image_id
            .clone()
            .unwrap_or_else(|| current.image_id.clone()),
        instance_type: overrides
            .instance_type
            .clone()
            .unwrap_or_else(|| current.instance_type.clone()),
        ..current.clone()
    }
}

/// Clone each group's sizing and placement onto a new group bound to
/// `template_name`. Names are `{prefix}-{stamp}-{index}`.
pub fn plan_replacement_groups(
    existing: &[ScalingGroup],
    template_name: &str,
    prefix: &str,
    stamp: u64,
) -> Vec<ScalingGroup> {
    existing
        .iter()
        .enumerate()
        .map(|(index, group)| ScalingGroup {
            name: format!("{prefix}-{stamp}-{index}"),
            launch_template: template_name.to_string(),
            min_size: group.min_size,
            max_size: group.max_size,
            desired_capacity: group.desired_capacity,
            placement: group.placement.clone(),
            health_check_grace_period: group.health_check_grace_period,
            instances: Vec::new(),
        })
        .collect()
}

/// New revision request: same family, role and containers, with the first
/// container's image replaced.
pub fn plan_task_definition(
    current: &TaskDefinition,
    image: &str,
) -> RolloutResult<TaskDefinitionRequest> {
    let mut containers = current.containers.clone();
    let first = containers.first_mut().ok_or_else(|| {
        RolloutError::Plan(format!(
            "task definition {} has no container definitions",
            current.arn
        ))
    })?;
    first.image = image.to_string();

    Ok(TaskDefinitionRequest {
        family: current.family.clone(),
        task_role_arn: current.task_role_arn.clone(),
        containers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetshift_core::ContainerSpec;
    use std::collections::BTreeMap;

    fn current() -> LaunchTemplate {
        LaunchTemplate {
            name: "workers".to_string(),
            image_id: "ami-00000001".to_string(),
            key_name: Some("ops-key".to_string()),
            security_groups: vec!["sg-1".to_string(), "sg-2".to_string()],
            user_data: "IyEvYmluL2Jhc2gK".to_string(),
            instance_type: "m5.large".to_string(),
            iam_instance_profile: Some("ecs-instance".to_string()),
            monitoring: true,
            ebs_optimized: true,
        }
    }

    #[test]
    fn unset_overrides_copy_everything() {
        let planned = plan_template(&current(), &TemplateOverrides::default(), PlanTarget::Final);
        assert_eq!(planned, current());
    }

    #[test]
    fn image_override_replaces_only_image() {
        let overrides = TemplateOverrides {
            image_id: Some("ami-00000002".to_string()),
            instance_type: None,
        };
        let planned = plan_template(&current(), &overrides, PlanTarget::Final);
        assert_eq!(planned.image_id, "ami-00000002");
        assert_eq!(
            planned,
            LaunchTemplate {
                image_id: "ami-00000002".to_string(),
                ..current()
            }
        );
    }

    #[test]
    fn instance_type_override_replaces_only_instance_type() {
        let overrides = TemplateOverrides {
            image_id: None,
            instance_type: Some("c5.xlarge".to_string()),
        };
        let planned = plan_template(&current(), &overrides, PlanTarget::Final);
        assert_eq!(
            planned,
            LaunchTemplate {
                instance_type: "c5.xlarge".to_string(),
                ..current()
            }
        );
    }

    #[test]
    fn copy_target_is_named_copy_regardless_of_overrides() {
        let overrides = TemplateOverrides {
            image_id: Some("ami-00000002".to_string()),
            instance_type: Some("c5.xlarge".to_string()),
        };
        let copy = plan_template(&current(), &overrides, PlanTarget::Copy);
        assert_eq!(copy.name, "workers-copy");
        let plain = plan_template(&current(), &TemplateOverrides::default(), PlanTarget::Copy);
        assert_eq!(plain.name, "workers-copy");
    }

    #[test]
    fn final_target_keeps_original_name() {
        let overrides = TemplateOverrides {
            image_id: Some("ami-00000002".to_string()),
            instance_type: Some("c5.xlarge".to_string()),
        };
        let planned = plan_template(&current(), &overrides, PlanTarget::Final);
        assert_eq!(planned.name, "workers");
    }

    #[test]
    fn replacement_groups_clone_sizing() {
        let existing = vec![
            ScalingGroup {
                name: "asg-a".to_string(),
                launch_template: "workers-copy".to_string(),
                min_size: 2,
                max_size: 6,
                desired_capacity: 3,
                placement: vec!["subnet-a".to_string(), "subnet-b".to_string()],
                health_check_grace_period: 120,
                instances: vec!["i-1".to_string(), "i-2".to_string(), "i-3".to_string()],
            },
            ScalingGroup {
                name: "asg-b".to_string(),
                launch_template: "workers-copy".to_string(),
                min_size: 1,
                max_size: 1,
                desired_capacity: 1,
                placement: vec!["subnet-c".to_string()],
                health_check_grace_period: 60,
                instances: vec!["i-4".to_string()],
            },
        ];
        let planned = plan_replacement_groups(&existing, "workers", "ASG", 1_700_000_000);
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].name, "ASG-1700000000-0");
        assert_eq!(planned[1].name, "ASG-1700000000-1");
        assert_eq!(planned[0].launch_template, "workers");
        assert_eq!(planned[0].desired_capacity, 3);
        assert_eq!(planned[0].placement, existing[0].placement);
        assert_eq!(planned[1].health_check_grace_period, 60);
        assert!(planned.iter().all(|g| g.instances.is_empty()));
    }

    fn container(name: &str, image: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: image.to_string(),
            extra: BTreeMap::from([("memory".to_string(), serde_json::json!(512))]),
        }
    }

    #[test]
    fn task_plan_replaces_first_container_image_only() {
        let current = TaskDefinition {
            arn: "arn:td/web:4".to_string(),
            family: "web".to_string(),
            revision: 4,
            task_role_arn: Some("arn:role/web".to_string()),
            containers: vec![container("app", "repo/app:1"), container("sidecar", "repo/proxy:9")],
        };
        let request = plan_task_definition(&current, "repo/app:2").unwrap();
        assert_eq!(request.family, "web");
        assert_eq!(request.task_role_arn.as_deref(), Some("arn:role/web"));
        assert_eq!(request.containers[0].image, "repo/app:2");
        assert_eq!(request.containers[0].extra, current.containers[0].extra);
        assert_eq!(request.containers[1], current.containers[1]);
        // The current revision is untouched.
        assert_eq!(current.containers[0].image, "repo/app:1");
    }

    #[test]
    fn task_plan_without_containers_fails() {
        let current = TaskDefinition {
            arn: "arn:td/web:4".to_string(),
            family: "web".to_string(),
            revision: 4,
            task_role_arn: None,
            containers: Vec::new(),
        };
        let err = plan_task_definition(&current, "repo/app:2").unwrap_err();
        assert!(matches!(err, RolloutError::Plan(_)));
    }
}
