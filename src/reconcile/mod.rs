//! Offer Status Reconciliation
//!
//! After fee or offer uploads, each applicant's status in the latest
//! iteration is recomputed from two inputs:
//!
//! - the payment flags in `FEES_PAID` (admission fee, tuition fee)
//! - the applicant's two most recent `ITERATION_OFFER` rows
//!
//! | admission | tuition | status |
//! |-----------|---------|--------|
//! | paid      | paid    | `accept & upgraded` if upgraded, else `accept` |
//! | unpaid    | unpaid  | `withdraw` |
//! | paid      | unpaid  | `upgrade` when the latest offer is `WL`, else `withdraw` |
//! | unpaid    | paid    | `withdraw` |
//!
//! An applicant is *upgraded* when the two most recent iterations carry
//! different offers and the older one had been accepted.
//!
//! The decision functions here are pure; [`apply`] runs them against a
//! connection inside the upload transaction.

pub mod apply;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offer code for a waitlisted applicant.
pub const WAITLIST_OFFER: &str = "WL";

/// Status written to `ITERATION_OFFER.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    #[serde(rename = "accept")]
    Accept,
    #[serde(rename = "accept & upgraded")]
    AcceptUpgraded,
    #[serde(rename = "upgrade")]
    Upgrade,
    #[serde(rename = "withdraw")]
    Withdraw,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Accept => "accept",
            OfferStatus::AcceptUpgraded => "accept & upgraded",
            OfferStatus::Upgrade => "upgrade",
            OfferStatus::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `ITERATION_OFFER` row as seen by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferSnapshot {
    pub itr_no: i64,
    pub offer: Option<String>,
    pub status: Option<String>,
}

impl OfferSnapshot {
    pub fn new(itr_no: i64, offer: Option<&str>, status: Option<&str>) -> Self {
        Self {
            itr_no,
            offer: offer.map(str::to_string),
            status: status.map(str::to_string),
        }
    }
}

/// Payment flags for one applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeFlags {
    pub admission_paid: bool,
    pub tuition_paid: bool,
}

impl FeeFlags {
    pub fn new(admission_paid: bool, tuition_paid: bool) -> Self {
        Self {
            admission_paid,
            tuition_paid,
        }
    }

    pub fn fully_paid(&self) -> bool {
        self.admission_paid && self.tuition_paid
    }
}

/// `history` is newest first and holds at most the two latest iterations.
pub fn is_upgraded(history: &[OfferSnapshot]) -> bool {
    match history {
        [latest, previous] => {
            latest.offer != previous.offer
                && previous
                    .status
                    .as_deref()
                    .is_some_and(|status| status.contains("accept"))
        }
        _ => false,
    }
}

/// Status after a fee snapshot upload.
///
/// `latest_offer` is the offer recorded for the latest iteration.
pub fn status_after_fee_upload(
    flags: FeeFlags,
    history: &[OfferSnapshot],
    latest_offer: Option<&str>,
) -> OfferStatus {
    match (flags.admission_paid, flags.tuition_paid) {
        (true, true) if is_upgraded(history) => OfferStatus::AcceptUpgraded,
        (true, true) => OfferStatus::Accept,
        (true, false) if latest_offer == Some(WAITLIST_OFFER) => OfferStatus::Upgrade,
        _ => OfferStatus::Withdraw,
    }
}

/// Status after a new offer iteration is uploaded.
///
/// Only fully paid applicants whose offer changed are touched; `None`
/// leaves the row as uploaded.
pub fn status_after_iteration_upload(
    flags: FeeFlags,
    history: &[OfferSnapshot],
) -> Option<OfferStatus> {
    (flags.fully_paid() && is_upgraded(history)).then_some(OfferStatus::AcceptUpgraded)
}
