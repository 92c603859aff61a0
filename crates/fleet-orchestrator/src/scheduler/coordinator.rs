//! Execution-goal coordination: control goals inhibit, otherwise the target
//! goal named after the firing trigger runs.

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::goal_evaluator::GoalEvaluator;
use crate::context::ScheduleContext;
use crate::errors::SchedulerError;

/// How one candidate trigger's coordination ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CoordinationOutcome {
    /// The target goal was evaluated. `satisfied` reports its preconditions;
    /// its actions ran when they held.
    Completed { target_goal: String, satisfied: bool },
    /// A control goal was satisfied and suppressed the target goal.
    Inhibited { control_goal: String },
    /// Nothing was evaluated (disabled execution goal, no matching target goal).
    Skipped { reason: String },
    /// Coordination failed; the error was logged.
    Failed { error: String },
}

/// Outcome of coordinating one candidate trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoordinationReport {
    pub trigger_id: String,
    pub execution_goal_id: String,
    pub outcome: CoordinationOutcome,
    /// Control goals whose evaluation errored and were counted as unsatisfied.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded_control_goals: Vec<String>,
}

impl CoordinationReport {
    pub(crate) fn new(trigger_id: &str, execution_goal_id: &str, outcome: CoordinationOutcome) -> Self {
        Self {
            trigger_id: trigger_id.to_string(),
            execution_goal_id: execution_goal_id.to_string(),
            outcome,
            degraded_control_goals: Vec::new(),
        }
    }

    /// Whether any control goal failed to evaluate.
    pub fn is_degraded(&self) -> bool {
        !self.degraded_control_goals.is_empty()
    }
}

/// Coordinates one execution goal for one firing trigger.
///
/// Never fails outward: every error is logged and reported as an outcome.
#[derive(Clone)]
pub struct Coordinator {
    evaluator: GoalEvaluator,
}

impl Coordinator {
    pub fn new(evaluator: GoalEvaluator) -> Self {
        Self { evaluator }
    }

    pub async fn coordinate(&self, ctx: &ScheduleContext, cancel: &CancellationToken) -> CoordinationReport {
        let goal = ctx.execution_goal();
        let trigger = ctx.trigger();
        let mut degraded = Vec::new();
        let finish = |outcome: CoordinationOutcome, degraded: Vec<String>| CoordinationReport {
            degraded_control_goals: degraded,
            ..CoordinationReport::new(&trigger.id, &goal.id, outcome)
        };

        // Control goals, concurrently. A satisfied control goal inhibits even
        // when one of its own actions fails afterwards. Each goal publishes
        // outputs into its own scope.
        let controls = join_all(goal.control_goals.iter().map(|control| async move {
            let scope = ctx.goal_scope();
            let satisfied = self.evaluator.preconditions_satisfied(control, &scope, cancel).await;
            if let Ok(true) = satisfied {
                if let Err(e) = self.evaluator.execute_actions(control, &scope, cancel).await {
                    tracing::warn!(
                        trigger_id = %trigger.id,
                        execution_goal_id = %goal.id,
                        control_goal = %control.name,
                        "control goal action failed: {e}"
                    );
                }
            }
            (control, satisfied)
        }))
        .await;

        let mut inhibited_by = None;
        for (control, result) in controls {
            match result {
                Ok(true) => {
                    inhibited_by.get_or_insert_with(|| control.name.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        trigger_id = %trigger.id,
                        execution_goal_id = %goal.id,
                        control_goal = %control.name,
                        "control goal evaluation failed, counted as unsatisfied: {e}"
                    );
                    degraded.push(control.name.clone());
                }
            }
        }

        if let Some(control_goal) = inhibited_by {
            tracing::info!(
                trigger_id = %trigger.id,
                execution_goal_id = %goal.id,
                control_goal = %control_goal,
                "target goal inhibited by control goal"
            );
            return finish(CoordinationOutcome::Inhibited { control_goal }, degraded);
        }

        let Some(target) = goal.target_goal(&trigger.name) else {
            tracing::warn!(
                trigger_id = %trigger.id,
                execution_goal_id = %goal.id,
                trigger_name = %trigger.name,
                "execution goal has no target goal for trigger"
            );
            let reason = SchedulerError::MissingTargetGoal {
                execution_goal_id: goal.id.clone(),
                trigger_name: trigger.name.clone(),
            }
            .to_string();
            return finish(CoordinationOutcome::Skipped { reason }, degraded);
        };

        let outcome = match self.evaluator.evaluate_goal(target, &ctx.goal_scope(), cancel).await {
            Ok(satisfied) => {
                tracing::info!(
                    trigger_id = %trigger.id,
                    execution_goal_id = %goal.id,
                    target_goal = %target.name,
                    satisfied,
                    "target goal evaluated"
                );
                CoordinationOutcome::Completed {
                    target_goal: target.name.clone(),
                    satisfied,
                }
            }
            Err(e) => {
                tracing::error!(
                    trigger_id = %trigger.id,
                    execution_goal_id = %goal.id,
                    target_goal = %target.name,
                    "target goal failed: {e}"
                );
                CoordinationOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        finish(outcome, degraded)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::ProviderRegistry;
    use crate::test_support::*;
    use crate::traits::ActionProvider;
    use crate::types::{Action, Condition, ParameterValue};

    struct Fixture {
        coordinator: Coordinator,
        create: Arc<RecordingAction>,
        disable: Arc<RecordingAction>,
    }

    fn fixture() -> Fixture {
        let registry = ProviderRegistry::new();
        registry.register_condition(Arc::new(FixedCondition::new("satisfied", true)));
        registry.register_condition(Arc::new(FixedCondition::new("unsatisfied", false)));
        registry.register_condition(Arc::new(FixedCondition::failing("erroring")));
        let create = Arc::new(RecordingAction::new("create"));
        let disable = Arc::new(RecordingAction::new("disable"));
        registry.register_action(create.clone());
        registry.register_action(disable.clone());
        Fixture {
            coordinator: Coordinator::new(GoalEvaluator::new(registry)),
            create,
            disable,
        }
    }

    fn control(name: &str, condition: &str) -> crate::types::Goal {
        goal(name, vec![Condition::new(condition)], vec![Action::new("disable")])
    }

    fn target(name: &str) -> crate::types::Goal {
        goal(
            name,
            vec![Condition::new("timer")],
            vec![Action::new("create")],
        )
    }

    #[tokio::test]
    async fn test_satisfied_control_goal_inhibits() {
        let f = fixture();
        let mut def = execution_goal("goal-1");
        def.control_goals = vec![
            control("too-many-failures", "satisfied"),
            control("quiet", "unsatisfied"),
        ];
        def.target_goals = vec![target("daily")];

        let report = f
            .coordinator
            .coordinate(&context(def, trigger("daily", "0 0 * * *")), &CancellationToken::new())
            .await;

        assert_eq!(
            report.outcome,
            CoordinationOutcome::Inhibited {
                control_goal: "too-many-failures".into()
            }
        );
        assert!(f.create.executed().is_empty());
        assert_eq!(f.disable.executed(), vec!["daily"]);
    }

    #[tokio::test]
    async fn test_matching_target_goal_runs_once() {
        let f = fixture();
        let mut def = execution_goal("goal-1");
        def.control_goals = vec![control("quiet", "unsatisfied")];
        def.target_goals = vec![target("daily"), target("weekly")];

        let report = f
            .coordinator
            .coordinate(&context(def, trigger("weekly", "0 0 * * 1")), &CancellationToken::new())
            .await;

        assert_eq!(
            report.outcome,
            CoordinationOutcome::Completed {
                target_goal: "weekly".into(),
                satisfied: true
            }
        );
        assert_eq!(f.create.executed(), vec!["weekly"]);
        assert!(f.disable.executed().is_empty());
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_erroring_control_goal_is_unsatisfied_and_flagged() {
        let f = fixture();
        let mut def = execution_goal("goal-1");
        def.control_goals = vec![control("telemetry", "erroring")];
        def.target_goals = vec![target("daily")];

        let report = f
            .coordinator
            .coordinate(&context(def, trigger("daily", "0 0 * * *")), &CancellationToken::new())
            .await;

        assert!(matches!(report.outcome, CoordinationOutcome::Completed { .. }));
        assert_eq!(report.degraded_control_goals, vec!["telemetry"]);
        assert_eq!(f.create.executed(), vec!["daily"]);
    }

    #[tokio::test]
    async fn test_missing_target_goal_is_skipped() {
        let f = fixture();
        let mut def = execution_goal("goal-1");
        def.target_goals = vec![target("daily")];

        let report = f
            .coordinator
            .coordinate(&context(def, trigger("hourly", "0 * * * *")), &CancellationToken::new())
            .await;

        assert_eq!(
            report.outcome,
            CoordinationOutcome::Skipped {
                reason: "execution goal 'goal-1' has no target goal for trigger 'hourly'".into()
            }
        );
        assert!(f.create.executed().is_empty());
    }

    /// Condition waiting for every other holder of the barrier.
    struct RendezvousCondition {
        barrier: Arc<tokio::sync::Barrier>,
    }

    #[async_trait::async_trait]
    impl crate::traits::ConditionProvider for RendezvousCondition {
        fn provider_type(&self) -> &str {
            "rendezvous"
        }

        async fn evaluate(
            &self,
            _condition: &Condition,
            _ctx: &ScheduleContext,
            _cancel: &CancellationToken,
        ) -> Result<crate::types::ConditionResult, SchedulerError> {
            self.barrier.wait().await;
            Ok(crate::types::ConditionResult::satisfied(false))
        }
    }

    #[tokio::test]
    async fn test_control_goals_evaluate_concurrently() {
        let registry = ProviderRegistry::new();
        registry.register_condition(Arc::new(RendezvousCondition {
            barrier: Arc::new(tokio::sync::Barrier::new(3)),
        }));
        let coordinator = Coordinator::new(GoalEvaluator::new(registry));
        let mut def = execution_goal("goal-1");
        def.control_goals = ["failures", "in-progress", "capacity"]
            .into_iter()
            .map(|name| goal(name, vec![Condition::new("rendezvous")], vec![]))
            .collect();
        def.target_goals = vec![goal("daily", vec![], vec![])];

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            coordinator.coordinate(&context(def, trigger("daily", "0 0 * * *")), &CancellationToken::new()),
        )
        .await
        .expect("control goals were evaluated one after another");

        assert_eq!(
            report.outcome,
            CoordinationOutcome::Completed {
                target_goal: "daily".into(),
                satisfied: true
            }
        );
    }

    /// Action publishing a marker output, recording what it saw beforehand.
    struct PublishingAction {
        seen: parking_lot::Mutex<Vec<Option<ParameterValue>>>,
    }

    #[async_trait::async_trait]
    impl ActionProvider for PublishingAction {
        fn provider_type(&self) -> &str {
            "publish"
        }

        async fn execute(
            &self,
            _action: &Action,
            ctx: &ScheduleContext,
            _cancel: &CancellationToken,
        ) -> Result<(), SchedulerError> {
            self.seen.lock().push(ctx.output("marker"));
            ctx.publish_output("marker", "from-control");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_each_goal_publishes_into_its_own_scope() {
        let registry = ProviderRegistry::new();
        let publish = Arc::new(PublishingAction {
            seen: parking_lot::Mutex::new(Vec::new()),
        });
        registry.register_action(publish.clone());
        let coordinator = Coordinator::new(GoalEvaluator::new(registry));

        let mut def = execution_goal("goal-1");
        def.control_goals = vec![
            goal("annotate", vec![], vec![Action::new("publish")]),
            goal("audit", vec![], vec![Action::new("publish")]),
        ];
        def.target_goals = vec![target("daily")];

        let report = coordinator
            .coordinate(&context(def, trigger("daily", "0 0 * * *")), &CancellationToken::new())
            .await;

        assert_eq!(
            report.outcome,
            CoordinationOutcome::Inhibited {
                control_goal: "annotate".into()
            }
        );
        assert_eq!(publish.seen.lock().clone(), vec![None, None]);
    }

    #[tokio::test]
    async fn test_target_failure_is_reported_not_raised() {
        let registry = ProviderRegistry::new();
        registry.register_action(Arc::new(RecordingAction::failing_for("create", &["daily"])));
        let coordinator = Coordinator::new(GoalEvaluator::new(registry));
        let mut def = execution_goal("goal-1");
        def.target_goals = vec![target("daily")];

        let report = coordinator
            .coordinate(&context(def, trigger("daily", "0 0 * * *")), &CancellationToken::new())
            .await;

        match report.outcome {
            CoordinationOutcome::Failed { error } => assert!(error.contains("HTTP 500"), "{error}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
