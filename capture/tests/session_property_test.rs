use capture::types::{AttendanceSubmission, LocationFix};
use capture::validator::validate_at;
use capture::{Direction, FailureReason, QrPayload, ScanSession, SessionStatus};
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy)]
enum Event {
    Start,
    Locate,
    Decode,
    BeginValidation,
    Validated,
    Succeed,
    Fail,
    Retry,
}

const EVENTS: [Event; 8] = [
    Event::Start,
    Event::Locate,
    Event::Decode,
    Event::BeginValidation,
    Event::Validated,
    Event::Succeed,
    Event::Fail,
    Event::Retry,
];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap()
}

fn payload() -> QrPayload {
    validate_at(
        r#"{"stationId":"STA-1","expiredAt":"2025-09-08T10:05:00Z","signature":"abc"}"#,
        now(),
    )
    .unwrap()
}

/// Applies `event`, returning the submission if one was built.
fn apply(session: &mut ScanSession, event: Event, fix: LocationFix) -> Option<AttendanceSubmission> {
    let _ = match event {
        Event::Start => session.start(),
        Event::Locate => session.location_acquired(fix),
        Event::Decode => session.decoded("{}".into()),
        Event::BeginValidation => session.begin_validation().map(|_| ()),
        Event::Validated => return session.validated(payload(), "u-1", now()).ok(),
        Event::Succeed => session.succeeded(),
        Event::Fail => session.fail(FailureReason::NetworkError("x".into())),
        Event::Retry => session.retry(),
    };
    None
}

#[test]
fn submission_needs_a_location_from_the_same_attempt() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);

    for _ in 0..2_000 {
        let mut session = ScanSession::new(Direction::CheckIn);
        let mut located_this_attempt: Option<LocationFix> = None;
        let mut submissions_this_attempt = 0;
        let mut attempt = session.attempt();

        for _ in 0..rng.usize(1..24) {
            let event = EVENTS[rng.usize(..EVENTS.len())];
            let fix = LocationFix::new(rng.f64() * 10.0, rng.f64() * 10.0, None);

            let before = session.status().clone();
            let built = apply(&mut session, event, fix);

            if session.attempt() != attempt {
                attempt = session.attempt();
                located_this_attempt = None;
                submissions_this_attempt = 0;
            }
            if matches!(event, Event::Locate) && before == SessionStatus::AcquiringLocation {
                located_this_attempt = Some(fix);
            }
            if let Some(submission) = built {
                assert_eq!(
                    Some(*submission.location()),
                    located_this_attempt,
                    "submission built without this attempt's fix (attempt {attempt})"
                );
                submissions_this_attempt += 1;
                assert_eq!(submissions_this_attempt, 1);
            }
        }
    }
}

#[test]
fn sequences_without_locate_never_reach_submitting() {
    let mut rng = fastrand::Rng::with_seed(42);
    let without_locate: Vec<Event> = EVENTS
        .into_iter()
        .filter(|e| !matches!(e, Event::Locate))
        .collect();

    for _ in 0..1_000 {
        let mut session = ScanSession::new(Direction::CheckOut);
        for _ in 0..rng.usize(1..24) {
            let event = without_locate[rng.usize(..without_locate.len())];
            let built = apply(&mut session, event, LocationFix::new(0.0, 0.0, None));
            assert!(built.is_none());
            assert!(!matches!(
                session.status(),
                SessionStatus::Scanning
                    | SessionStatus::Decoded
                    | SessionStatus::Validating
                    | SessionStatus::Submitting
                    | SessionStatus::Succeeded
            ));
        }
    }
}
