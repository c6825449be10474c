//! The fixed plan table.

use std::str::FromStr;

use serde::Serialize;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Monthly,
    Lifetime,
}

impl PlanType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Monthly => "MONTHLY",
            PlanType::Lifetime => "LIFETIME",
        }
    }
}

impl FromStr for PlanType {
    type Err = AppError;

    /// Case-insensitive: the pricing page sends `monthly`, older clients `MONTHLY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MONTHLY" => Ok(PlanType::Monthly),
            "LIFETIME" => Ok(PlanType::Lifetime),
            _ => Err(AppError::Validation("Invalid plan type".to_string())),
        }
    }
}

/// Stripe Checkout mode for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Recurring billing.
    Subscription,
    /// One-time charge.
    Payment,
}

impl CheckoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub plan_type: PlanType,
    pub name: &'static str,
    /// Whole US dollars.
    pub price_usd: u32,
    /// Stripe price id.
    pub price_id: String,
    pub mode: CheckoutMode,
}

#[derive(Debug, Clone)]
pub struct PlanCatalog {
    monthly: Plan,
    lifetime: Plan,
}

impl PlanCatalog {
    pub fn new(monthly_price_id: String, lifetime_price_id: String) -> Self {
        Self {
            monthly: Plan {
                plan_type: PlanType::Monthly,
                name: "Monthly Subscription",
                price_usd: 29,
                price_id: monthly_price_id,
                mode: CheckoutMode::Subscription,
            },
            lifetime: Plan {
                plan_type: PlanType::Lifetime,
                name: "Lifetime Access",
                price_usd: 99,
                price_id: lifetime_price_id,
                mode: CheckoutMode::Payment,
            },
        }
    }

    pub fn get(&self, plan_type: PlanType) -> &Plan {
        match plan_type {
            PlanType::Monthly => &self.monthly,
            PlanType::Lifetime => &self.lifetime,
        }
    }
}
