use crate::advanced::simulation::PreparedTransaction;
use crate::core::config::TransactionConfig;
use crate::error::{LumenitosSdkError, Result};
use stellar_xdr::curr::TransactionExt;
use tracing::{debug, info};

/// Adds the custom authorizer's verification cost, which simulation cannot
/// see, to an assembled transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudgetAdjuster {
    pub instruction_margin: u32,
    pub resource_fee_margin: i64,
}

impl ResourceBudgetAdjuster {
    pub fn new(instruction_margin: u32, resource_fee_margin: i64) -> Self {
        Self {
            instruction_margin,
            resource_fee_margin,
        }
    }

    pub fn from_config(config: &TransactionConfig) -> Self {
        Self::new(config.instruction_margin, config.resource_fee_margin)
    }

    /// Apply the margins once. Returns whether resources changed; a
    /// transaction without address credentials is marked adjusted as is.
    pub fn apply(&self, prepared: &mut PreparedTransaction) -> Result<bool> {
        if prepared.budget_adjusted {
            return Err(LumenitosSdkError::BudgetAdjustment(
                "margin already applied to this transaction".into(),
            ));
        }
        if !prepared.has_address_credentials() {
            prepared.budget_adjusted = true;
            debug!("no address credentials, budget left as simulated");
            return Ok(false);
        }

        let fee_margin = u32::try_from(self.resource_fee_margin).map_err(|_| {
            LumenitosSdkError::BudgetAdjustment(format!(
                "invalid resource fee margin {}",
                self.resource_fee_margin
            ))
        })?;

        let transaction = &mut prepared.transaction;
        let TransactionExt::V1(data) = &mut transaction.ext else {
            return Err(LumenitosSdkError::BudgetAdjustment(
                "transaction has no resource data".into(),
            ));
        };

        let before = data.resources.instructions;
        data.resources.instructions = before
            .checked_add(self.instruction_margin)
            .ok_or_else(|| LumenitosSdkError::BudgetAdjustment("instruction overflow".into()))?;
        data.resource_fee = data
            .resource_fee
            .checked_add(self.resource_fee_margin)
            .ok_or_else(|| LumenitosSdkError::BudgetAdjustment("resource fee overflow".into()))?;
        transaction.fee = transaction
            .fee
            .checked_add(fee_margin)
            .ok_or_else(|| LumenitosSdkError::BudgetAdjustment("fee overflow".into()))?;

        info!(
            instructions_before = before,
            instructions_after = data.resources.instructions,
            resource_fee = data.resource_fee,
            fee = transaction.fee,
            "applied resource budget margin"
        );
        prepared.budget_adjusted = true;
        Ok(true)
    }
}
