//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sera_core::{Action, Credential, CredentialId, CredentialUpdate};

/// Generate a credential id in the generated-id alphabet.
pub fn credential_id() -> impl Strategy<Value = CredentialId> {
    "[A-Za-z0-9_-]{1,21}".prop_map(|s| CredentialId::new(s).expect("non-empty id"))
}

/// Generate a site name.
pub fn site() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}\\.(com|org|net|io)"
}

/// Generate a credential with arbitrary printable username and password.
pub fn credential() -> impl Strategy<Value = Credential> {
    (site(), "\\PC{0,32}", "\\PC{0,64}")
        .prop_map(|(site, username, password)| Credential::new(site, username, password))
}

/// Generate a partial update.
pub fn update() -> impl Strategy<Value = CredentialUpdate> {
    (
        proptest::option::of("\\PC{0,32}"),
        proptest::option::of("\\PC{0,64}"),
    )
        .prop_map(|(username, password)| CredentialUpdate { username, password })
}

/// Generate one of the four lifecycle actions.
pub fn lifecycle_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Create),
        Just(Action::Edit),
        Just(Action::Share),
        Just(Action::Remove),
    ]
}

/// Generate a lifecycle history for one credential, oldest first.
pub fn history(max_len: usize) -> impl Strategy<Value = Vec<Action>> {
    prop::collection::vec(lifecycle_action(), 0..=max_len)
}
