// src/governor/budget.rs
// Budget decisioning over the usage ledger. Deliberately not transactional
// with usage logging: two concurrent requests can both pass a check that,
// summed, exceeds the cap. The cap is a soft control; a denial must never
// block, so there is no lock to wait on either.

use chrono::Utc;
use tracing::info;

use super::store::GovernorStore;
use super::types::{AccessDecision, BudgetCaps};
use crate::error::{require_org_id, CoreResult};

/// Checks whether spending `estimated_additional_cost_usd` would push the
/// org past its daily or monthly cap. Denials carry a human-readable
/// reason; callers fall back to deterministic output instead of erroring.
pub async fn decide_paid_ai_access(
    store: &GovernorStore,
    org_id: &str,
    estimated_additional_cost_usd: f64,
    caps: BudgetCaps,
) -> CoreResult<AccessDecision> {
    require_org_id(org_id)?;

    let usage = store.usage_totals(org_id, Utc::now()).await?;

    if usage.daily_spent_usd + estimated_additional_cost_usd > caps.daily_usd {
        let reason = format!(
            "Daily AI budget reached (${:.2} of ${:.2} spent today); using deterministic scoring until tomorrow",
            usage.daily_spent_usd, caps.daily_usd
        );
        info!("Denied paid AI access for org {}: {}", org_id, reason);
        return Ok(AccessDecision { allowed: false, reason: Some(reason), usage });
    }

    if usage.monthly_spent_usd + estimated_additional_cost_usd > caps.monthly_usd {
        let reason = format!(
            "Monthly AI budget reached (${:.2} of ${:.2} spent this month); using deterministic scoring until the next cycle",
            usage.monthly_spent_usd, caps.monthly_usd
        );
        info!("Denied paid AI access for org {}: {}", org_id, reason);
        return Ok(AccessDecision { allowed: false, reason: Some(reason), usage });
    }

    Ok(AccessDecision { allowed: true, reason: None, usage })
}
