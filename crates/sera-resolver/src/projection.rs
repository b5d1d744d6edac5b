//! Pure projections from event histories to current state.
//!
//! Nothing here performs I/O. The resolver feeds query results through these
//! functions, and tests can feed fabricated histories directly.
//!
//! ## Precedence
//!
//! The controlling event for `(address, id)` is the first event of the first
//! non-empty tier, in the order `Edit > Create > Share`. Tiers are never
//! merged: one edit anywhere in the history hides every create and share.
//!
//! ## Lifecycle
//!
//! ```text
//! Absent --Create|Share--> Live --Edit--> Live
//!    |                      |
//!    +-------Remove-------> Removed (terminal)
//! ```

use std::cmp::Reverse;
use std::collections::HashSet;

use sera_core::{Action, Address, CredentialId, Event, TxId, ID_TAG};

use crate::config::OrderingPolicy;

/// Resolution tiers in precedence order.
pub const TIERS: [Action; 3] = [Action::Edit, Action::Create, Action::Share];

/// How a credential became visible at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Created,
    Shared,
}

/// Visibility state of one credential at one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialLifecycle {
    #[default]
    Absent,
    Live {
        origin: Origin,
        edited: bool,
    },
    Removed,
}

impl CredentialLifecycle {
    /// Apply one action.
    pub fn apply(self, action: Action) -> Self {
        use CredentialLifecycle::*;

        match (self, action) {
            (Removed, _) | (_, Action::Remove) => Removed,
            (Absent, Action::Create) => Live {
                origin: Origin::Created,
                edited: false,
            },
            (Absent, Action::Share) => Live {
                origin: Origin::Shared,
                edited: false,
            },
            (Live { origin, .. }, Action::Edit) => Live {
                origin,
                edited: true,
            },
            // An edit with no visible origin, a repeated origin, or a fee
            // transaction changes nothing.
            (state, _) => state,
        }
    }

    /// Replay a history, oldest first.
    pub fn replay(actions: impl IntoIterator<Item = Action>) -> Self {
        actions
            .into_iter()
            .fold(CredentialLifecycle::Absent, CredentialLifecycle::apply)
    }

    pub fn is_live(self) -> bool {
        matches!(self, CredentialLifecycle::Live { .. })
    }

    pub fn is_removed(self) -> bool {
        matches!(self, CredentialLifecycle::Removed)
    }
}

/// Whether `event` belongs to `tier` as seen from `address`.
///
/// Shares count for their recipient; every other action for its publisher.
pub fn in_tier(event: &Event, tier: Action, address: &Address) -> bool {
    if event.action() != Some(tier) {
        return false;
    }
    match tier {
        Action::Share => event.target.as_ref() == Some(address),
        _ => &event.owner == address,
    }
}

/// The controlling event for `(address, id)` in an ordered history.
pub fn select_current<'a>(
    events: &'a [Event],
    address: &Address,
    id: &CredentialId,
) -> Option<(Action, &'a Event)> {
    TIERS.iter().find_map(|&tier| {
        events
            .iter()
            .find(|e| e.tag(ID_TAG) == Some(id.as_str()) && in_tier(e, tier, address))
            .map(|e| (tier, e))
    })
}

/// Reorder query results according to `policy`.
pub fn order_events(events: &mut [Event], policy: OrderingPolicy) {
    match policy {
        OrderingPolicy::TrustQueryOrder => {}
        OrderingPolicy::SortByBlockHeight => {
            // Stable: events in the same block keep the collaborator's order.
            events.sort_by_key(|e| match e.block {
                None => (false, Reverse(0)),
                Some(block) => (true, Reverse(block.height)),
            });
        }
    }
}

/// A credential visible at an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCredential {
    pub id: CredentialId,
    /// True when the originating event is a share addressed to this address.
    pub is_shared: bool,
    /// The originating Create or Share.
    pub tx_id: TxId,
}

impl LiveCredential {
    pub fn origin(&self) -> Origin {
        if self.is_shared {
            Origin::Shared
        } else {
            Origin::Created
        }
    }
}

/// One candidate per id from the Create and Share result sets.
///
/// Create results come first; the first occurrence of an id wins. Events
/// without a usable `ID` tag are skipped.
pub fn candidates(creates: &[Event], shares: &[Event]) -> Vec<LiveCredential> {
    let share_txs: HashSet<TxId> = shares.iter().map(|e| e.tx_id).collect();
    let mut seen = HashSet::new();

    creates
        .iter()
        .chain(shares)
        .filter_map(|event| {
            let id = event.credential_id()?;
            if !seen.insert(id.clone()) {
                return None;
            }
            Some(LiveCredential {
                id,
                is_shared: share_txs.contains(&event.tx_id),
                tx_id: event.tx_id,
            })
        })
        .collect()
}

/// Keep the candidates whose lifecycle is still live given the tombstoned ids.
pub fn project_live(
    candidates: Vec<LiveCredential>,
    removed: &HashSet<CredentialId>,
) -> Vec<LiveCredential> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let origin = match candidate.origin() {
                Origin::Created => Action::Create,
                Origin::Shared => Action::Share,
            };
            let tombstone = removed.contains(&candidate.id).then_some(Action::Remove);
            CredentialLifecycle::replay(std::iter::once(origin).chain(tombstone)).is_live()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sera_core::{lifecycle_tags, BlockInfo, Winston, DEFAULT_APP_NAME};
    use sera_testkit::generators;

    fn event(seed: u8, owner: u8, target: Option<u8>, id: &str, action: Action) -> Event {
        let owner_key = vec![owner; 64];
        Event {
            tx_id: TxId::from_bytes([seed; 32]),
            owner: Address::from_owner_key(&owner_key),
            owner_key: owner_key.into(),
            target: target.map(|t| Address::from_owner_key(&[t; 64])),
            quantity: Winston::ZERO,
            tags: lifecycle_tags(DEFAULT_APP_NAME, &CredentialId::new(id).unwrap(), action),
            body: Default::default(),
            block: None,
        }
    }

    fn addr(seed: u8) -> Address {
        Address::from_owner_key(&[seed; 64])
    }

    fn id(s: &str) -> CredentialId {
        CredentialId::new(s).unwrap()
    }

    #[test]
    fn test_edit_beats_create_and_share() {
        // Most recent first.
        let history = vec![
            event(1, 1, None, "x1", Action::Create),
            event(2, 1, None, "x1", Action::Edit),
            event(3, 9, Some(1), "x1", Action::Share),
            event(4, 1, None, "x1", Action::Edit),
        ];

        let (tier, current) = select_current(&history, &addr(1), &id("x1")).unwrap();
        assert_eq!(tier, Action::Edit);
        assert_eq!(current.tx_id, TxId::from_bytes([2; 32]));
    }

    #[test]
    fn test_create_beats_share() {
        let history = vec![
            event(1, 9, Some(1), "x1", Action::Share),
            event(2, 1, None, "x1", Action::Create),
        ];
        let (tier, current) = select_current(&history, &addr(1), &id("x1")).unwrap();
        assert_eq!(tier, Action::Create);
        assert_eq!(current.tx_id, TxId::from_bytes([2; 32]));
    }

    #[test]
    fn test_share_counts_for_recipient_only() {
        let history = vec![event(1, 9, Some(1), "x1", Action::Share)];

        let (tier, _) = select_current(&history, &addr(1), &id("x1")).unwrap();
        assert_eq!(tier, Action::Share);
        assert!(select_current(&history, &addr(9), &id("x1")).is_none());
    }

    #[test]
    fn test_other_publishers_and_ids_are_ignored() {
        let history = vec![
            event(1, 2, None, "x1", Action::Edit),
            event(2, 1, None, "x2", Action::Edit),
            event(3, 1, None, "x1", Action::Create),
        ];
        let (tier, current) = select_current(&history, &addr(1), &id("x1")).unwrap();
        assert_eq!(tier, Action::Create);
        assert_eq!(current.tx_id, TxId::from_bytes([3; 32]));

        assert!(select_current(&history, &addr(1), &id("x3")).is_none());
    }

    #[test]
    fn test_sort_by_block_height() {
        let mut events = vec![
            event(1, 1, None, "x1", Action::Edit),
            event(2, 1, None, "x1", Action::Edit),
            event(3, 1, None, "x1", Action::Edit),
            event(4, 1, None, "x1", Action::Edit),
        ];
        events[0].block = Some(BlockInfo { height: 5, timestamp: 0 });
        events[1].block = Some(BlockInfo { height: 9, timestamp: 0 });
        events[2].block = None;
        events[3].block = Some(BlockInfo { height: 9, timestamp: 0 });

        let mut trusted = events.clone();
        order_events(&mut trusted, OrderingPolicy::TrustQueryOrder);
        assert_eq!(trusted, events);

        order_events(&mut events, OrderingPolicy::SortByBlockHeight);
        let order: Vec<u8> = events.iter().map(|e| e.tx_id.as_bytes()[0]).collect();
        assert_eq!(order, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_candidates_dedupe_and_flag_shares() {
        let creates = vec![
            event(1, 1, None, "x1", Action::Create),
            event(2, 1, None, "x2", Action::Create),
            event(3, 1, None, "x1", Action::Create),
        ];
        let shares = vec![
            event(4, 9, Some(1), "x2", Action::Share),
            event(5, 9, Some(1), "x3", Action::Share),
        ];

        let listed = candidates(&creates, &shares);
        let summary: Vec<(&str, bool)> = listed
            .iter()
            .map(|c| (c.id.as_str(), c.is_shared))
            .collect();
        assert_eq!(summary, vec![("x1", false), ("x2", false), ("x3", true)]);
        assert_eq!(listed[0].tx_id, TxId::from_bytes([1; 32]));
    }

    #[test]
    fn test_project_live_drops_tombstoned() {
        let listed = candidates(
            &[event(1, 1, None, "x1", Action::Create), event(2, 1, None, "x2", Action::Create)],
            &[],
        );
        let removed: HashSet<_> = [id("x1")].into_iter().collect();

        let live = project_live(listed, &removed);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, id("x2"));
    }

    #[test]
    fn test_lifecycle_transitions() {
        use CredentialLifecycle::*;

        assert_eq!(Absent.apply(Action::Edit), Absent);
        assert_eq!(
            Absent.apply(Action::Share).apply(Action::Edit),
            Live { origin: Origin::Shared, edited: true }
        );
        assert_eq!(
            CredentialLifecycle::replay([Action::Create, Action::Remove, Action::Create, Action::Edit]),
            Removed
        );
        assert_eq!(
            CredentialLifecycle::replay([Action::Create, Action::ShareFee]),
            Live { origin: Origin::Created, edited: false }
        );
    }

    proptest! {
        #[test]
        fn prop_remove_is_terminal(history in generators::history(12)) {
            let state = CredentialLifecycle::replay(history.iter().copied());
            if history.contains(&Action::Remove) {
                prop_assert!(state.is_removed());
            } else if history.iter().any(|a| matches!(a, Action::Create | Action::Share)) {
                prop_assert!(state.is_live());
            } else {
                prop_assert_eq!(state, CredentialLifecycle::Absent);
            }
        }

        #[test]
        fn prop_any_edit_controls(
            creates in 0usize..4,
            shares in 0usize..4,
            edits in 1usize..4,
        ) {
            let mut history = Vec::new();
            let mut seed = 0u8;
            for _ in 0..creates {
                seed += 1;
                history.push(event(seed, 1, None, "x1", Action::Create));
            }
            for _ in 0..shares {
                seed += 1;
                history.push(event(seed, 9, Some(1), "x1", Action::Share));
            }
            for _ in 0..edits {
                seed += 1;
                history.push(event(seed, 1, None, "x1", Action::Edit));
            }

            let (tier, current) = select_current(&history, &addr(1), &id("x1")).unwrap();
            prop_assert_eq!(tier, Action::Edit);
            prop_assert_eq!(current.tx_id, TxId::from_bytes([(creates + shares + 1) as u8; 32]));
        }
    }
}
