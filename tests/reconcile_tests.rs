use admissions::reconcile::{
    status_after_fee_upload, FeeFlags, OfferSnapshot, OfferStatus, WAITLIST_OFFER,
};
use rstest::rstest;

fn upgraded_history() -> Vec<OfferSnapshot> {
    vec![
        OfferSnapshot::new(2, Some("CSE"), None),
        OfferSnapshot::new(1, Some("ECE"), Some("accept")),
    ]
}

fn steady_history() -> Vec<OfferSnapshot> {
    vec![
        OfferSnapshot::new(2, Some("CSE"), None),
        OfferSnapshot::new(1, Some("CSE"), Some("accept")),
    ]
}

#[rstest]
#[case::paid_upgraded(true, true, true, Some("CSE"), OfferStatus::AcceptUpgraded)]
#[case::paid_steady(true, true, false, Some("CSE"), OfferStatus::Accept)]
#[case::nothing_paid(false, false, false, Some("CSE"), OfferStatus::Withdraw)]
#[case::nothing_paid_upgraded(false, false, true, Some("CSE"), OfferStatus::Withdraw)]
#[case::admission_only_waitlisted(true, false, false, Some(WAITLIST_OFFER), OfferStatus::Upgrade)]
#[case::admission_only_offered(true, false, false, Some("CSE"), OfferStatus::Withdraw)]
#[case::admission_only_no_offer(true, false, false, None, OfferStatus::Withdraw)]
#[case::tuition_only(false, true, false, Some(WAITLIST_OFFER), OfferStatus::Withdraw)]
fn test_fee_upload_decision_table(
    #[case] admission_paid: bool,
    #[case] tuition_paid: bool,
    #[case] upgraded: bool,
    #[case] latest_offer: Option<&str>,
    #[case] expected: OfferStatus,
) {
    let history = if upgraded {
        upgraded_history()
    } else {
        steady_history()
    };

    let status = status_after_fee_upload(
        FeeFlags::new(admission_paid, tuition_paid),
        &history,
        latest_offer,
    );
    assert_eq!(status, expected);
}

#[rstest]
#[case::no_history(vec![])]
#[case::single_iteration(vec![OfferSnapshot::new(1, Some("ECE"), Some("accept"))])]
fn test_fully_paid_without_prior_offer_is_plain_accept(#[case] history: Vec<OfferSnapshot>) {
    assert_eq!(
        status_after_fee_upload(FeeFlags::new(true, true), &history, Some("ECE")),
        OfferStatus::Accept
    );
}
