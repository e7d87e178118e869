// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::deployment::{FunctionDetails, UpdateOptions};
use funcmeta_api::record::{FunctionRecord, ImmutableField, UpdateDecision};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// If false, an update that only changes the resource limits is
    /// considered to contain no change.
    pub resources_count_as_change: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            resources_count_as_change: true,
        }
    }
}

/// Decides whether an update is applied, by comparing the incoming
/// normalized spec with the stored record.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlanner {
    config: PlannerConfig,
}

impl UpdatePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    fn same_spec(&self, current: &FunctionDetails, incoming: &FunctionDetails) -> bool {
        current.id == incoming.id
            && current.component_type == incoming.component_type
            && current.runtime == incoming.runtime
            && current.class_name == incoming.class_name
            && current.parallelism == incoming.parallelism
            && current.inputs == incoming.inputs
            && current.output == incoming.output
            && current.output_serde == incoming.output_serde
            && current.processing_guarantee == incoming.processing_guarantee
            && (!self.config.resources_count_as_change || current.resources == incoming.resources)
    }

    /// `package_changed` is true if the update carries a new package or a
    /// new transform function package.
    pub fn plan(&self, current: &FunctionRecord, incoming: &FunctionDetails, package_changed: bool, options: &UpdateOptions) -> UpdateDecision {
        if current.details.input_topic_names() != incoming.input_topic_names() {
            return UpdateDecision::RejectImmutableFieldChanged(ImmutableField::InputTopics);
        }

        if !package_changed && self.same_spec(&current.details, incoming) {
            if !options.update_auth_data {
                return UpdateDecision::RejectNoChange;
            }
            log::debug!("function {} updated only to refresh its authentication data", current.id());
        }

        UpdateDecision::Apply(FunctionRecord {
            details: incoming.clone(),
            package_location: current.package_location.clone(),
            transform_function_package_location: current.transform_function_package_location.clone(),
            create_time: current.create_time,
            version: current.version + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> FunctionRecord {
        let mut record = crate::test_utils::record("t", "n", "f");
        record.version = 3;
        record.create_time = 1234;
        record
    }

    #[test]
    fn test_input_topics_immutable() {
        let planner = UpdatePlanner::default();
        let mut incoming = current().details;
        incoming.inputs.insert("persistent://public/default/other".to_string(), "json".to_string());
        incoming.parallelism = 5;
        let decision = planner.plan(&current(), &incoming, true, &UpdateOptions { update_auth_data: true });
        assert_eq!(UpdateDecision::RejectImmutableFieldChanged(ImmutableField::InputTopics), decision);
        assert_eq!("Input Topics cannot be altered", decision.into_result().unwrap_err().to_string());
    }

    #[test]
    fn test_input_serde_is_mutable() {
        let planner = UpdatePlanner::default();
        let mut incoming = current().details;
        for serde in incoming.inputs.values_mut() {
            *serde = "avro".to_string();
        }
        assert!(matches!(
            planner.plan(&current(), &incoming, false, &UpdateOptions::default()),
            UpdateDecision::Apply(_)
        ));
    }

    #[test]
    fn test_no_change_and_auth_refresh() {
        let planner = UpdatePlanner::default();
        let incoming = current().details;
        assert_eq!(UpdateDecision::RejectNoChange, planner.plan(&current(), &incoming, false, &UpdateOptions::default()));

        match planner.plan(&current(), &incoming, false, &UpdateOptions { update_auth_data: true }) {
            UpdateDecision::Apply(record) => {
                assert_eq!(4, record.version);
                assert_eq!(1234, record.create_time);
                assert_eq!(current().details, record.details);
            }
            decision => panic!("unexpected decision {:?}", decision),
        }
    }

    #[test]
    fn test_new_package_is_a_change() {
        let planner = UpdatePlanner::default();
        assert!(matches!(
            planner.plan(&current(), &current().details, true, &UpdateOptions::default()),
            UpdateDecision::Apply(_)
        ));
    }

    #[test]
    fn test_mutable_fields() {
        let planner = UpdatePlanner::default();
        let mut incoming = current().details;
        incoming.output = Some("another-output-topic".to_string());
        incoming.class_name = "other".to_string();
        match planner.plan(&current(), &incoming, false, &UpdateOptions::default()) {
            UpdateDecision::Apply(record) => {
                assert_eq!(incoming, record.details);
                assert_eq!(current().package_location, record.package_location);
            }
            decision => panic!("unexpected decision {:?}", decision),
        }
    }

    #[test]
    fn test_resources_change_configurable() {
        let mut incoming = current().details;
        incoming.resources.cpu = 2.0;

        let planner = UpdatePlanner::default();
        assert!(matches!(
            planner.plan(&current(), &incoming, false, &UpdateOptions::default()),
            UpdateDecision::Apply(_)
        ));

        let planner = UpdatePlanner::new(PlannerConfig {
            resources_count_as_change: false,
        });
        assert_eq!(UpdateDecision::RejectNoChange, planner.plan(&current(), &incoming, false, &UpdateOptions::default()));
    }
}
