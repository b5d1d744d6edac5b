//! The history resolver.
//!
//! Issues tag-filtered queries against a [`QueryService`] and projects the
//! results into live credentials and controlling events. Stateless across
//! calls: dropping a future mid-flight leaves nothing behind.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use sera_core::{Action, Address, BlockInfo, CredentialId, Event, EventFilter, TxId};
use sera_ledger::QueryService;

use crate::config::{OrderingPolicy, ResolverConfig};
use crate::error::{ResolverError, Result};
use crate::projection::{self, LiveCredential, Origin, TIERS};

/// The event currently controlling a credential's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentEvent {
    pub tx_id: TxId,
    /// The tier it was found in: `Edit`, `Create` or `Share`.
    pub action: Action,
    pub owner: Address,
    pub block: Option<BlockInfo>,
}

impl CurrentEvent {
    fn from_event(action: Action, event: &Event) -> Self {
        Self {
            tx_id: event.tx_id,
            action,
            owner: event.owner.clone(),
            block: event.block,
        }
    }

    /// Whether the event has been included in a block.
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }
}

/// Resolves live credentials and their current events for an address.
pub struct HistoryResolver<Q: ?Sized> {
    query: Arc<Q>,
    config: ResolverConfig,
}

impl<Q: ?Sized> Clone for HistoryResolver<Q> {
    fn clone(&self) -> Self {
        Self {
            query: Arc::clone(&self.query),
            config: self.config.clone(),
        }
    }
}

impl<Q> HistoryResolver<Q>
where
    Q: QueryService + ?Sized + 'static,
{
    pub fn new(query: Arc<Q>, config: ResolverConfig) -> Self {
        Self { query, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    fn scoped(&self, filter: EventFilter) -> EventFilter {
        filter.with_app_name(self.config.app_name.clone())
    }

    /// Run one query under the configured deadline and ordering policy.
    ///
    /// `all` requests every match; otherwise the first page is enough unless
    /// results are re-sorted locally.
    async fn run(&self, filter: EventFilter, all: bool) -> Result<Vec<Event>> {
        let sorting = self.config.ordering == OrderingPolicy::SortByBlockHeight;
        let call = async {
            if all || sorting {
                self.query.query_all_events(&filter).await
            } else {
                self.query.query_events(&filter).await
            }
        };

        let mut events = match tokio::time::timeout(self.config.query_timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(timeout = ?self.config.query_timeout, "query timed out");
                return Err(ResolverError::TransientNetwork(format!(
                    "query timed out after {:?}",
                    self.config.query_timeout
                )));
            }
        };
        projection::order_events(&mut events, self.config.ordering);
        Ok(events)
    }

    fn tier_filter(&self, tier: Action, id: &CredentialId, address: &Address) -> EventFilter {
        let filter = match tier {
            Action::Share => EventFilter::shared_with(address),
            Action::Create => EventFilter::created_by(address),
            _ => EventFilter::edited_by(address),
        };
        self.scoped(filter.with_id(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every credential visible at `address`: created there or shared to it,
    /// and never removed there.
    ///
    /// One entry per id; an id found among both creates and shares is
    /// reported once, as created.
    pub async fn list_live_credentials(&self, address: &Address) -> Result<Vec<LiveCredential>> {
        let creates = self
            .run(self.scoped(EventFilter::created_by(address)), true)
            .await?;
        let shares = self
            .run(self.scoped(EventFilter::shared_with(address)), true)
            .await?;

        let candidates = projection::candidates(&creates, &shares);
        let ids: Vec<CredentialId> = candidates.iter().map(|c| c.id.clone()).collect();

        let mut removed = HashSet::new();
        let checks = self
            .for_each_bounded(ids, address, |resolver, id, address| async move {
                let removed = resolver.is_removed(&id, &address).await?;
                Ok::<_, ResolverError>((id, removed))
            })
            .await;
        for check in checks {
            let (id, is_removed) = check?;
            if is_removed {
                removed.insert(id);
            }
        }

        let live = projection::project_live(candidates, &removed);
        tracing::debug!(
            %address,
            live = live.len(),
            tombstoned = removed.len(),
            "listed credentials"
        );
        Ok(live)
    }

    /// The event controlling the current value of `id` at `address`.
    ///
    /// Tiers are consulted in order `Edit`, `Create`, `Share`; the first
    /// non-empty one decides. Fails with
    /// [`ResolverError::CredentialNotFound`] when all three are empty.
    pub async fn resolve_current(&self, id: &CredentialId, address: &Address) -> Result<CurrentEvent> {
        for tier in TIERS {
            let events = self.run(self.tier_filter(tier, id, address), false).await?;
            if let Some((action, event)) = projection::select_current(&events, address, id) {
                tracing::debug!(%id, %address, tier = %action, tx = %event.tx_id, "resolved current event");
                return Ok(CurrentEvent::from_event(action, event));
            }
        }

        Err(ResolverError::CredentialNotFound {
            id: id.clone(),
            address: address.clone(),
        })
    }

    /// Whether a `Remove` for `id` has been published by `address`.
    pub async fn is_removed(&self, id: &CredentialId, address: &Address) -> Result<bool> {
        let filter = self.scoped(EventFilter::removed_by(address).with_id(id).with_page_size(1));
        let tombstones = self.run(filter, false).await?;
        if !tombstones.is_empty() {
            tracing::debug!(%id, %address, "credential tombstoned");
        }
        Ok(!tombstones.is_empty())
    }

    /// How `id` became visible at `address`, ignoring tombstones.
    ///
    /// A create by `address` wins over a share to it, as in listing.
    pub async fn origin(&self, id: &CredentialId, address: &Address) -> Result<Option<Origin>> {
        for (tier, origin) in [(Action::Create, Origin::Created), (Action::Share, Origin::Shared)] {
            let events = self
                .run(self.tier_filter(tier, id, address).with_page_size(1), false)
                .await?;
            if !events.is_empty() {
                return Ok(Some(origin));
            }
        }
        Ok(None)
    }

    /// Resolve many ids concurrently, at most `max_concurrency` at a time.
    ///
    /// Results are returned in input order; each id fails independently.
    pub async fn resolve_many(
        &self,
        ids: &[CredentialId],
        address: &Address,
    ) -> Vec<Result<CurrentEvent>> {
        self.for_each_bounded(ids.to_vec(), address, |resolver, id, address| async move {
            resolver.resolve_current(&id, &address).await
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn for_each_bounded<T, F, Fut>(
        &self,
        ids: Vec<CredentialId>,
        address: &Address,
        task: F,
    ) -> Vec<Result<T>>
    where
        T: Send + 'static,
        F: Fn(Self, CredentialId, Address) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, id) in ids.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let work = task(self.clone(), id.clone(), address.clone());
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => work.await,
                    Err(e) => Err(ResolverError::Internal(e.to_string())),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<T>>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::warn!("resolution task failed: {}", e),
            }
        }

        results
            .into_iter()
            .zip(ids)
            .map(|(result, id)| {
                result.unwrap_or_else(|| {
                    Err(ResolverError::Internal(format!("resolution of {id} was lost")))
                })
            })
            .collect()
    }
}
