//! Clock arithmetic for timed variants.
//!
//! Clocks are charged lazily: a mover pays for the time elapsed since the
//! previous move when their next move arrives. An expired clock is therefore
//! only observed on the next move attempt, not when it actually reaches zero.

use chrono::{DateTime, Utc};

use crate::models::game_session::{Color, SessionState};
use crate::models::variant::GameVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutcome {
    /// Variant has no clock.
    Untimed,
    /// Mover still has time; carries their remaining seconds after increment.
    Running { remaining: i64 },
    /// Mover flagged. Their clock is now zero.
    Expired,
}

/// Whole seconds between the last move and `now`, floored at zero to
/// tolerate clock skew.
pub fn elapsed_seconds(last_move_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_move_at).num_seconds().max(0)
}

/// Time left for the mover after spending `elapsed` seconds.
/// The increment is added after the floor at zero, and never to a flagged clock.
pub fn deduct(current: i64, elapsed: i64, variant: GameVariant) -> ClockOutcome {
    if !variant.is_timed() {
        return ClockOutcome::Untimed;
    }
    let remaining = (current - elapsed.max(0)).max(0);
    if remaining == 0 {
        return ClockOutcome::Expired;
    }
    ClockOutcome::Running {
        remaining: remaining + variant.increment_seconds(),
    }
}

/// Charges the side to move for the time since the last move, writing the
/// result into the session. Must be called under the session lock.
pub fn charge_mover(session: &mut SessionState, now: DateTime<Utc>) -> ClockOutcome {
    let mover = session.side_to_move();
    let Some(current) = session.clock_of(mover) else {
        return ClockOutcome::Untimed;
    };
    let elapsed = elapsed_seconds(session.last_move_at, now);
    let outcome = deduct(current, elapsed, session.variant);
    match outcome {
        ClockOutcome::Running { remaining } => session.set_clock(mover, remaining),
        ClockOutcome::Expired => session.set_clock(mover, 0),
        ClockOutcome::Untimed => {}
    }
    outcome
}

/// Read-only view of both clocks at `now`: the side to move has the running
/// time subtracted, without increment and without mutating the session.
pub fn remaining_at(session: &SessionState, now: DateTime<Utc>) -> (Option<i64>, Option<i64>) {
    let running = |color: Color, seconds: Option<i64>| {
        seconds.map(|s| {
            if session.status.is_in_progress() && session.side_to_move() == color {
                (s - elapsed_seconds(session.last_move_at, now)).max(0)
            } else {
                s
            }
        })
    };
    (
        running(Color::White, session.white_seconds),
        running(Color::Black, session.black_seconds),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::match_record::MatchRecord;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_deduct_without_increment() {
        assert_eq!(
            deduct(100, 5, GameVariant::Rapid),
            ClockOutcome::Running { remaining: 95 }
        );
    }

    #[test]
    fn test_deduct_adds_increment_after_subtraction() {
        assert_eq!(
            deduct(100, 5, GameVariant::Blitz),
            ClockOutcome::Running { remaining: 96 }
        );
    }

    #[test]
    fn test_exactly_zero_expires_before_increment() {
        assert_eq!(deduct(5, 5, GameVariant::Blitz), ClockOutcome::Expired);
        assert_eq!(deduct(5, 50, GameVariant::Rapid), ClockOutcome::Expired);
    }

    #[test]
    fn test_untimed_never_touches_clock() {
        assert_eq!(deduct(0, 1_000, GameVariant::Standard), ClockOutcome::Untimed);
    }

    #[test]
    fn test_elapsed_floors_clock_skew() {
        let t0 = Utc::now();
        assert_eq!(elapsed_seconds(t0, t0 - Duration::seconds(30)), 0);
        assert_eq!(elapsed_seconds(t0, t0 + Duration::milliseconds(5_900)), 5);
    }

    #[test]
    fn test_charge_mover_updates_session() {
        let mut session =
            SessionState::from_record(&MatchRecord::new("alice", "bob", GameVariant::Blitz));
        let t0 = session.last_move_at;

        let outcome = charge_mover(&mut session, t0 + Duration::seconds(10));
        assert_eq!(outcome, ClockOutcome::Running { remaining: 171 });
        assert_eq!(session.white_seconds, Some(171));
        assert_eq!(session.black_seconds, Some(180));
    }

    #[test]
    fn test_charge_mover_flags_expired_clock() {
        let mut session =
            SessionState::from_record(&MatchRecord::new("alice", "bob", GameVariant::Rapid));
        session.white_to_move = false;
        let t0 = session.last_move_at;

        let outcome = charge_mover(&mut session, t0 + Duration::seconds(601));
        assert_eq!(outcome, ClockOutcome::Expired);
        assert_eq!(session.black_seconds, Some(0));
    }

    #[test]
    fn test_remaining_at_only_runs_side_to_move() {
        let session =
            SessionState::from_record(&MatchRecord::new("alice", "bob", GameVariant::Rapid));
        let (white, black) = remaining_at(&session, session.last_move_at + Duration::seconds(30));
        assert_eq!(white, Some(570));
        assert_eq!(black, Some(600));
    }

    proptest! {
        #[test]
        fn prop_remaining_is_bounded(current in 0i64..10_000, elapsed in -100i64..20_000) {
            match deduct(current, elapsed, GameVariant::Blitz) {
                ClockOutcome::Running { remaining } => {
                    prop_assert!(remaining >= 1);
                    prop_assert!(remaining <= current + GameVariant::Blitz.increment_seconds());
                }
                ClockOutcome::Expired => prop_assert!(current <= elapsed.max(0)),
                ClockOutcome::Untimed => prop_assert!(false, "blitz is timed"),
            }
        }

        #[test]
        fn prop_elapsed_is_never_negative(offset in -100_000i64..100_000) {
            let t0 = Utc::now();
            prop_assert!(elapsed_seconds(t0, t0 + Duration::seconds(offset)) >= 0);
        }
    }
}
