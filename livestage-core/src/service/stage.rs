//! Stage session state machine
//!
//! A non-host participant moves between Viewer, HandRaised, Invited and
//! OnStage. Publishing needs both sides' consent: a host invite alone or a
//! raised hand alone never reaches OnStage.
//!
//! | From       | Event     | Who          | To         |
//! |------------|-----------|--------------|------------|
//! | Viewer     | RaiseHand | participant  | HandRaised |
//! | HandRaised | RaiseHand | participant  | HandRaised |
//! | Viewer     | Invite    | host         | Invited    |
//! | Invited    | Invite    | host         | Invited    |
//! | HandRaised | Accept    | host         | OnStage    |
//! | Invited    | Accept    | participant  | OnStage    |
//! | OnStage    | Accept    | either       | OnStage    |
//! | HandRaised | Reject    | either       | Viewer     |
//! | Invited    | Reject    | participant  | Viewer     |
//! | any        | Remove    | either       | Viewer     |
//!
//! `remove_from_stage` fires Reject for a pending request (a host turning
//! down a raised hand, a participant withdrawing it or declining an invite)
//! and Remove otherwise.

use crate::{
    models::{Actor, Identity, StageEvent, StageState},
    Error, Result,
};

/// Who may fire a given transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Host,
    Participant,
    Either,
}

impl Authority {
    fn permits(self, actor: &Actor, target: &Identity) -> bool {
        match self {
            Self::Host => actor.is_host(),
            Self::Participant => actor.is_self(target),
            Self::Either => actor.is_host() || actor.is_self(target),
        }
    }
}

/// Look up the transition table entry for `(from, event)`
#[must_use]
pub const fn rule(from: StageState, event: StageEvent) -> Option<(Authority, StageState)> {
    use StageEvent as E;
    use StageState as S;

    match (from, event) {
        (S::Viewer | S::HandRaised, E::RaiseHand) => Some((Authority::Participant, S::HandRaised)),
        (S::Viewer | S::Invited, E::Invite) => Some((Authority::Host, S::Invited)),
        (S::HandRaised, E::Accept) => Some((Authority::Host, S::OnStage)),
        (S::Invited, E::Accept) => Some((Authority::Participant, S::OnStage)),
        (S::OnStage, E::Accept) => Some((Authority::Either, S::OnStage)),
        (S::HandRaised, E::Reject) => Some((Authority::Either, S::Viewer)),
        (S::Invited, E::Reject) => Some((Authority::Participant, S::Viewer)),
        (_, E::Remove) => Some((Authority::Either, S::Viewer)),
        _ => None,
    }
}

/// Apply `event` fired by `actor` against participant `target` in state `from`.
///
/// Undefined transitions fail with `IllegalTransition` whoever asks; defined
/// ones fail with `Unauthorized` when the actor lacks authority.
pub fn apply(
    from: StageState,
    event: StageEvent,
    actor: &Actor,
    target: &Identity,
) -> Result<StageState> {
    let (authority, to) = rule(from, event).ok_or(Error::IllegalTransition { from, event })?;

    if !authority.permits(actor, target) {
        return Err(Error::Unauthorized(format!(
            "{} may not {event} for {target}",
            actor.identity()
        )));
    }

    Ok(to)
}

/// Event a host invite resolves to: a raised hand is accepted directly
#[must_use]
pub const fn invite_event(current: StageState) -> StageEvent {
    match current {
        StageState::HandRaised | StageState::OnStage => StageEvent::Accept,
        StageState::Viewer | StageState::Invited => StageEvent::Invite,
    }
}

/// Event a viewer's raise-hand resolves to: a pending invite is accepted
#[must_use]
pub const fn raise_hand_event(current: StageState) -> StageEvent {
    match current {
        StageState::Invited | StageState::OnStage => StageEvent::Accept,
        StageState::Viewer | StageState::HandRaised => StageEvent::RaiseHand,
    }
}

/// Event a removal resolves to for `actor` acting on `target`
#[must_use]
pub fn remove_event(current: StageState, actor: &Actor, target: &Identity) -> StageEvent {
    match current {
        StageState::HandRaised => StageEvent::Reject,
        StageState::Invited if actor.is_self(target) => StageEvent::Reject,
        StageState::Viewer | StageState::Invited | StageState::OnStage => StageEvent::Remove,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Actor {
        Actor::Host(Identity::from("host"))
    }

    fn alice() -> Identity {
        Identity::from("alice")
    }

    fn as_alice() -> Actor {
        Actor::Viewer(alice())
    }

    fn as_bob() -> Actor {
        Actor::Viewer(Identity::from("bob"))
    }

    #[test]
    fn test_raise_hand_from_viewer() {
        let to = apply(StageState::Viewer, StageEvent::RaiseHand, &as_alice(), &alice()).unwrap();
        assert_eq!(to, StageState::HandRaised);
    }

    #[test]
    fn test_raise_hand_for_someone_else_is_unauthorized() {
        let err = apply(StageState::Viewer, StageEvent::RaiseHand, &as_bob(), &alice()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let err = apply(StageState::Viewer, StageEvent::RaiseHand, &host(), &alice()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_invite_is_host_only_and_idempotent() {
        let to = apply(StageState::Viewer, StageEvent::Invite, &host(), &alice()).unwrap();
        assert_eq!(to, StageState::Invited);
        let again = apply(to, StageEvent::Invite, &host(), &alice()).unwrap();
        assert_eq!(again, StageState::Invited);

        let err = apply(StageState::Viewer, StageEvent::Invite, &as_bob(), &alice()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_accept_requires_intermediate_state() {
        for actor in [host(), as_alice()] {
            let err = apply(StageState::Viewer, StageEvent::Accept, &actor, &alice()).unwrap_err();
            assert!(matches!(
                err,
                Error::IllegalTransition {
                    from: StageState::Viewer,
                    event: StageEvent::Accept
                }
            ));
        }
    }

    #[test]
    fn test_accept_is_two_sided() {
        // Host accepts a raised hand
        let to = apply(StageState::HandRaised, StageEvent::Accept, &host(), &alice()).unwrap();
        assert_eq!(to, StageState::OnStage);
        // Viewer cannot accept their own raised hand
        let err =
            apply(StageState::HandRaised, StageEvent::Accept, &as_alice(), &alice()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        // Viewer accepts a host invite
        let to = apply(StageState::Invited, StageEvent::Accept, &as_alice(), &alice()).unwrap();
        assert_eq!(to, StageState::OnStage);
        // Host cannot accept on the viewer's behalf
        let err = apply(StageState::Invited, StageEvent::Accept, &host(), &alice()).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_reject() {
        assert_eq!(
            apply(StageState::HandRaised, StageEvent::Reject, &host(), &alice()).unwrap(),
            StageState::Viewer
        );
        assert_eq!(
            apply(StageState::HandRaised, StageEvent::Reject, &as_alice(), &alice()).unwrap(),
            StageState::Viewer
        );
        assert_eq!(
            apply(StageState::Invited, StageEvent::Reject, &as_alice(), &alice()).unwrap(),
            StageState::Viewer
        );
        assert!(apply(StageState::OnStage, StageEvent::Reject, &host(), &alice()).is_err());
        assert!(apply(StageState::Viewer, StageEvent::Reject, &as_alice(), &alice()).is_err());
    }

    #[test]
    fn test_remove_from_any_state() {
        for from in StageState::ALL {
            assert_eq!(
                apply(from, StageEvent::Remove, &host(), &alice()).unwrap(),
                StageState::Viewer
            );
            assert_eq!(
                apply(from, StageEvent::Remove, &as_alice(), &alice()).unwrap(),
                StageState::Viewer
            );
            assert!(matches!(
                apply(from, StageEvent::Remove, &as_bob(), &alice()),
                Err(Error::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn test_resolved_events() {
        assert_eq!(invite_event(StageState::Viewer), StageEvent::Invite);
        assert_eq!(invite_event(StageState::HandRaised), StageEvent::Accept);
        assert_eq!(raise_hand_event(StageState::Viewer), StageEvent::RaiseHand);
        assert_eq!(raise_hand_event(StageState::Invited), StageEvent::Accept);
    }

    #[test]
    fn test_remove_resolves_pending_requests_to_reject() {
        assert_eq!(
            remove_event(StageState::HandRaised, &host(), &alice()),
            StageEvent::Reject
        );
        assert_eq!(
            remove_event(StageState::HandRaised, &as_alice(), &alice()),
            StageEvent::Reject
        );
        assert_eq!(
            remove_event(StageState::Invited, &as_alice(), &alice()),
            StageEvent::Reject
        );
        // A host withdrawing their own invite is a plain removal
        assert_eq!(
            remove_event(StageState::Invited, &host(), &alice()),
            StageEvent::Remove
        );
        assert_eq!(
            remove_event(StageState::OnStage, &as_alice(), &alice()),
            StageEvent::Remove
        );
        assert_eq!(
            remove_event(StageState::Viewer, &host(), &alice()),
            StageEvent::Remove
        );

        // Every resolved event is permitted for the host or the participant
        for from in StageState::ALL {
            for actor in [host(), as_alice()] {
                let event = remove_event(from, &actor, &alice());
                assert_eq!(apply(from, event, &actor, &alice()).unwrap(), StageState::Viewer);
            }
        }
    }

    #[test]
    fn test_every_defined_transition_lands_in_a_known_state() {
        let events = [
            StageEvent::RaiseHand,
            StageEvent::Invite,
            StageEvent::Accept,
            StageEvent::Reject,
            StageEvent::Remove,
        ];
        for from in StageState::ALL {
            for event in events {
                if let Some((_, to)) = rule(from, event) {
                    assert!(StageState::ALL.contains(&to));
                    // Publishing is reached only through a two-party step
                    if to == StageState::OnStage && from != StageState::OnStage {
                        assert_eq!(event, StageEvent::Accept);
                        assert_ne!(from, StageState::Viewer);
                    }
                }
            }
        }
    }
}
