//! Goal evaluation: preconditions AND together, then actions run in order.

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

use crate::context::ScheduleContext;
use crate::errors::SchedulerError;
use crate::registry::ProviderRegistry;
use crate::types::{Goal, TIMER_CONDITION_TYPE};

/// Evaluates goals against the providers of a [`ProviderRegistry`].
#[derive(Clone)]
pub struct GoalEvaluator {
    registry: ProviderRegistry,
}

impl GoalEvaluator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate the goal's preconditions and, if they all hold, run its
    /// actions. Returns whether the preconditions were satisfied.
    ///
    /// An action failure aborts the remaining actions and is returned.
    pub async fn evaluate_goal(
        &self,
        goal: &Goal,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<bool, SchedulerError> {
        let satisfied = self.preconditions_satisfied(goal, ctx, cancel).await?;
        if satisfied {
            self.execute_actions(goal, ctx, cancel).await?;
        }
        Ok(satisfied)
    }

    /// AND of every non-timer precondition, evaluated concurrently.
    ///
    /// Every provider is resolved before any is invoked, so an unknown
    /// provider type fails the goal without side effects. A goal with no
    /// evaluable preconditions is satisfied.
    pub async fn preconditions_satisfied(
        &self,
        goal: &Goal,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<bool, SchedulerError> {
        let evaluations = goal
            .preconditions
            .iter()
            .filter(|c| c.provider_type != TIMER_CONDITION_TYPE)
            .map(|condition| -> Result<_, SchedulerError> {
                let provider = self.registry.condition(&condition.provider_type)?;
                Ok(async move { provider.evaluate(condition, ctx, cancel).await })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results = try_join_all(evaluations).await?;
        let satisfied = results.iter().all(|r| r.satisfied);

        tracing::debug!(
            trigger_id = %ctx.trigger().id,
            execution_goal_id = %ctx.execution_goal().id,
            goal = %goal.name,
            conditions = results.len(),
            satisfied,
            "goal preconditions evaluated"
        );
        Ok(satisfied)
    }

    /// Run the goal's actions sequentially in declared order.
    pub async fn execute_actions(
        &self,
        goal: &Goal,
        ctx: &ScheduleContext,
        cancel: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        for action in &goal.actions {
            if cancel.is_cancelled() {
                return Err(SchedulerError::Cancelled);
            }
            let provider = self.registry.action(&action.provider_type)?;
            provider.execute(action, ctx, cancel).await.map_err(|e| {
                tracing::error!(
                    trigger_id = %ctx.trigger().id,
                    execution_goal_id = %ctx.execution_goal().id,
                    goal = %goal.name,
                    action = %action.provider_type,
                    "action failed: {e}"
                );
                e
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Barrier;

    use super::*;
    use crate::test_support::*;
    use crate::traits::ConditionProvider;
    use crate::types::{Action, Condition, ConditionResult};

    /// Condition that holds only once every other evaluation sharing the
    /// barrier is in flight.
    struct RendezvousCondition {
        provider_type: &'static str,
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl ConditionProvider for RendezvousCondition {
        fn provider_type(&self) -> &str {
            self.provider_type
        }

        async fn evaluate(
            &self,
            _condition: &Condition,
            _ctx: &ScheduleContext,
            _cancel: &CancellationToken,
        ) -> Result<ConditionResult, SchedulerError> {
            self.barrier.wait().await;
            Ok(ConditionResult::satisfied(true))
        }
    }

    #[tokio::test]
    async fn test_preconditions_evaluate_concurrently() {
        let barrier = Arc::new(Barrier::new(2));
        let registry = ProviderRegistry::new();
        for provider_type in ["failure_budget", "capacity"] {
            registry.register_condition(Arc::new(RendezvousCondition {
                provider_type,
                barrier: Arc::clone(&barrier),
            }));
        }
        let evaluator = GoalEvaluator::new(registry);
        let g = goal(
            "g",
            vec![Condition::new("failure_budget"), Condition::new("capacity")],
            vec![],
        );

        let satisfied = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            evaluator.preconditions_satisfied(&g, &ctx(), &CancellationToken::new()),
        )
        .await
        .expect("preconditions were evaluated one after another")
        .unwrap();
        assert!(satisfied);
    }

    fn ctx() -> ScheduleContext {
        context(execution_goal("goal-1"), trigger("daily", "0 0 * * *"))
    }

    #[tokio::test]
    async fn test_preconditions_and_together() {
        let registry = ProviderRegistry::new();
        let yes = Arc::new(FixedCondition::new("yes", true));
        let no = Arc::new(FixedCondition::new("no", false));
        let action = Arc::new(RecordingAction::new("record"));
        registry.register_condition(yes.clone());
        registry.register_condition(no.clone());
        registry.register_action(action.clone());
        let evaluator = GoalEvaluator::new(registry);
        let cancel = CancellationToken::new();

        let all_true = goal(
            "g",
            vec![Condition::new("yes"), Condition::new("yes")],
            vec![Action::new("record")],
        );
        assert!(evaluator.evaluate_goal(&all_true, &ctx(), &cancel).await.unwrap());
        assert_eq!(action.executed().len(), 1);

        let one_false = goal(
            "g",
            vec![Condition::new("yes"), Condition::new("no"), Condition::new("yes")],
            vec![Action::new("record")],
        );
        assert!(!evaluator.evaluate_goal(&one_false, &ctx(), &cancel).await.unwrap());
        assert_eq!(action.executed().len(), 1, "actions must not run when unsatisfied");
        assert_eq!(no.calls(), 1);
        assert_eq!(yes.calls(), 4);
    }

    #[tokio::test]
    async fn test_timer_skipped_and_empty_is_satisfied() {
        let registry = ProviderRegistry::new();
        let timer = Arc::new(FixedCondition::new(TIMER_CONDITION_TYPE, false));
        registry.register_condition(timer.clone());
        let evaluator = GoalEvaluator::new(registry);

        let g = goal("g", vec![Condition::new(TIMER_CONDITION_TYPE)], vec![]);
        assert!(evaluator
            .evaluate_goal(&g, &ctx(), &CancellationToken::new())
            .await
            .unwrap());
        assert_eq!(timer.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_condition_fails_before_evaluation() {
        let registry = ProviderRegistry::new();
        let yes = Arc::new(FixedCondition::new("yes", true));
        registry.register_condition(yes.clone());
        let evaluator = GoalEvaluator::new(registry);

        let g = goal(
            "g",
            vec![Condition::new("yes"), Condition::new("missing")],
            vec![],
        );
        let err = evaluator
            .evaluate_goal(&g, &ctx(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownProvider { .. }));
        assert_eq!(yes.calls(), 0);
    }

    #[tokio::test]
    async fn test_action_failure_aborts_remaining() {
        let registry = ProviderRegistry::new();
        let first = Arc::new(RecordingAction::new("first"));
        let failing = Arc::new(RecordingAction::failing_for("failing", &["daily"]));
        let last = Arc::new(RecordingAction::new("last"));
        registry.register_action(first.clone());
        registry.register_action(failing.clone());
        registry.register_action(last.clone());
        let evaluator = GoalEvaluator::new(registry);

        let g = goal(
            "g",
            vec![],
            vec![Action::new("first"), Action::new("failing"), Action::new("last")],
        );
        let err = evaluator
            .evaluate_goal(&g, &ctx(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Downstream(_)));
        assert_eq!(first.executed(), vec!["daily"]);
        assert_eq!(failing.executed(), vec!["daily"]);
        assert!(last.executed().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_checked_before_actions() {
        let registry = ProviderRegistry::new();
        let action = Arc::new(RecordingAction::new("record"));
        registry.register_action(action.clone());
        let evaluator = GoalEvaluator::new(registry);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let g = goal("g", vec![], vec![Action::new("record")]);
        let err = evaluator.evaluate_goal(&g, &ctx(), &cancel).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Cancelled));
        assert!(action.executed().is_empty());
    }
}
