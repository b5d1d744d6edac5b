//! Event: one immutable, tagged lifecycle record on the ledger.
//!
//! Events are never edited. A credential's "current value" is a projection
//! over its events, and deletion is a later `Remove` event, not erasure.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{Address, CredentialId, TxId, Winston};

/// Tag naming the application namespace.
pub const APP_NAME_TAG: &str = "App-Name";

/// Tag carrying the credential identifier.
pub const ID_TAG: &str = "ID";

/// Tag carrying the lifecycle action.
pub const ACTION_TAG: &str = "Action";

/// Default application namespace.
pub const DEFAULT_APP_NAME: &str = "Sera";

/// Page size used when a filter does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// The lifecycle action an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// A new credential owned by the publisher.
    Create,
    /// New content for an existing credential.
    Edit,
    /// A copy re-encrypted for the transaction target.
    Share,
    /// Terminal tombstone for `(owner, id)`.
    Remove,
    /// Fee transfer accompanying a share. Never consulted by resolution.
    ShareFee,
}

impl Action {
    /// The tag value for this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Edit => "Edit",
            Action::Share => "Share",
            Action::Remove => "Remove",
            Action::ShareFee => "Share-Fee",
        }
    }

    /// Parse a tag value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Create" => Some(Action::Create),
            "Edit" => Some(Action::Edit),
            "Share" => Some(Action::Share),
            "Remove" => Some(Action::Remove),
            "Share-Fee" => Some(Action::ShareFee),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s).ok_or_else(|| CoreError::UnknownAction(s.to_owned()))
    }
}

/// A name/value tag attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The three tags every lifecycle event carries, in publication order.
pub fn lifecycle_tags(app_name: &str, id: &CredentialId, action: Action) -> Vec<Tag> {
    vec![
        Tag::new(APP_NAME_TAG, app_name),
        Tag::new(ID_TAG, id.as_str()),
        Tag::new(ACTION_TAG, action.as_str()),
    ]
}

/// Block inclusion metadata reported by the query collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block height.
    pub height: u64,
    /// Block timestamp (Unix seconds).
    pub timestamp: i64,
}

/// A published event as returned by a query collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Content-addressed transaction id.
    pub tx_id: TxId,

    /// The publishing identity.
    pub owner: Address,

    /// The publisher's RSA modulus (big-endian). Source of key-directory lookups.
    pub owner_key: Bytes,

    /// Recipient of a transfer or share, if any.
    pub target: Option<Address>,

    /// Token amount transferred to `target`.
    pub quantity: Winston,

    /// Transaction tags, in publication order.
    pub tags: Vec<Tag>,

    /// Envelope for Create/Edit/Share, padding for Remove.
    pub body: Bytes,

    /// `None` while the transaction is pending.
    pub block: Option<BlockInfo>,
}

impl Event {
    /// First value of the named tag.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    /// The credential identifier, if the event carries a valid `ID` tag.
    pub fn credential_id(&self) -> Option<CredentialId> {
        self.tag(ID_TAG).and_then(|v| CredentialId::new(v).ok())
    }

    /// The lifecycle action, if the event carries a known `Action` tag.
    pub fn action(&self) -> Option<Action> {
        self.tag(ACTION_TAG).and_then(Action::parse)
    }

    pub fn app_name(&self) -> Option<&str> {
        self.tag(APP_NAME_TAG)
    }

    /// Whether the event has been included in a block.
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }
}

/// Filter over published events.
///
/// `owner` matches the publisher; `recipient` matches the transaction target.
/// Shares are found by recipient, every other action by owner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    pub app_name: Option<String>,
    pub owner: Option<Address>,
    pub recipient: Option<Address>,
    pub id: Option<CredentialId>,
    pub action: Option<Action>,
    /// Maximum results for a single page. `None` means [`DEFAULT_PAGE_SIZE`].
    pub page_size: Option<usize>,
}

impl EventFilter {
    fn by_owner(owner: &Address, action: Action) -> Self {
        Self {
            app_name: Some(DEFAULT_APP_NAME.to_owned()),
            owner: Some(owner.clone()),
            action: Some(action),
            ..Self::default()
        }
    }

    /// Create events published by `owner`.
    pub fn created_by(owner: &Address) -> Self {
        Self::by_owner(owner, Action::Create)
    }

    /// Edit events published by `owner`.
    pub fn edited_by(owner: &Address) -> Self {
        Self::by_owner(owner, Action::Edit)
    }

    /// Remove events published by `owner`.
    pub fn removed_by(owner: &Address) -> Self {
        Self::by_owner(owner, Action::Remove)
    }

    /// Share events addressed to `recipient`.
    pub fn shared_with(recipient: &Address) -> Self {
        Self {
            app_name: Some(DEFAULT_APP_NAME.to_owned()),
            recipient: Some(recipient.clone()),
            action: Some(Action::Share),
            ..Self::default()
        }
    }

    /// Restrict to one credential id.
    pub fn with_id(mut self, id: &CredentialId) -> Self {
        self.id = Some(id.clone());
        self
    }

    /// Override the application namespace.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Effective page size.
    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Check whether an event satisfies every constraint of this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(app_name) = &self.app_name {
            if event.app_name() != Some(app_name.as_str()) {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if &event.owner != owner {
                return false;
            }
        }
        if let Some(recipient) = &self.recipient {
            if event.target.as_ref() != Some(recipient) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if event.tag(ID_TAG) != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(action) = self.action {
            if event.action() != Some(action) {
                return false;
            }
        }
        true
    }
}
