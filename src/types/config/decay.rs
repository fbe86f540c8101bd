use serde::Deserialize;

/// What to do when a sender claims the same action twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleClaimPolicy {
    /// The later amount replaces the earlier one in the action slot.
    #[default]
    Overwrite,
    /// The repeated claim is dropped; slot, totals and loss stay as they were.
    Reject,
    /// The later amount is added to the earlier one in the action slot.
    Sum,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub double_claim_policy: DoubleClaimPolicy,
}
