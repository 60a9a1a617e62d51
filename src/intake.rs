//! Creating actions from command-line input, with the plan optionally
//! drafted by the suggestion service.

use anyhow::{Result, bail};

use crate::action::{ActionRecord, LifecycleManager};
use crate::anthropic::MessageSender;
use crate::cli::CreateArgs;
use crate::store::RecordStore;
use crate::suggest::SuggestionService;
use crate::ui;

/// Where the plan of a newly created action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOrigin {
    Given,
    Drafted,
}

/// Creates the action described by `args`.
///
/// An explicit `--plan` always wins. Without one the plan is drafted from the
/// description first, and if no draft can be produced nothing is stored: the
/// fallback text is reported as the error instead of becoming the plan.
pub async fn create_action<S: RecordStore, C: MessageSender>(
    manager: &LifecycleManager<S>,
    suggestions: &SuggestionService<C>,
    args: CreateArgs,
) -> Result<(ActionRecord, PlanOrigin)> {
    let (plan, origin) = match args.plan.clone() {
        Some(plan) => (plan, PlanOrigin::Given),
        None => {
            let draft = ui::with_spinner(
                suggestions.is_enabled(),
                "Drafting action plan...",
                suggestions.plan_suggestion(&args.description),
            )
            .await;
            match draft {
                Ok(plan) => (plan, PlanOrigin::Drafted),
                Err(e) => bail!("{} ({e})", e.fallback_message()),
            }
        }
    };
    let record = manager.create(args.into_new_action(plan)).await?;
    Ok((record, origin))
}
