use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info};

use crate::analytics::{
    compute_groupings, compute_profit_analysis, compute_totals, compute_totals_by_date, Groupings,
    ProfitAnalysis, TotalsRecord,
};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::filter::{filter_trades, FilterCriteria, FilteredTrades};
use crate::source::{JournalSnapshot, JournalSource};

/// Every derived aggregate for one filter criteria set. Replaced as a whole
/// after each recompute.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsState {
    pub criteria: FilterCriteria,
    pub filtered: FilteredTrades,
    pub totals: TotalsRecord,
    pub totals_by_date: BTreeMap<i64, TotalsRecord>,
    pub groupings: Groupings,
    pub profit_analysis: ProfitAnalysis,
}

impl AnalyticsState {
    pub fn has_data(&self) -> bool {
        self.filtered.has_data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// This call ran the pipeline (possibly several times, for requests
    /// that arrived meanwhile).
    Completed,
    /// A run was already in flight; it will pick up these criteria.
    Coalesced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    Recomputed { has_data: bool, trades: usize },
}

/// Run the whole pipeline over `snapshot` for `criteria`.
pub fn build_state(
    snapshot: &JournalSnapshot,
    criteria: FilterCriteria,
    config: &AnalyticsConfig,
    tz: Tz,
) -> AnalyticsState {
    let filtered = filter_trades(&snapshot.days, &criteria, &snapshot.lookups());
    if !filtered.has_data {
        return AnalyticsState {
            criteria,
            ..Default::default()
        };
    }

    let totals = compute_totals(&filtered.flat_trades);
    let totals_by_date = compute_totals_by_date(&filtered.flat_trades, tz);
    let groupings = compute_groupings(&filtered.flat_trades, &config.grouping, tz);
    let profit_analysis =
        compute_profit_analysis(&totals, &snapshot.excursions, &filtered.days, &config.r_ladder);

    AnalyticsState {
        criteria,
        filtered,
        totals,
        totals_by_date,
        groupings,
        profit_analysis,
    }
}

/// Holds the current journal snapshot and the analytics derived from it.
///
/// `recompute` is single-flight: while a run is in progress further
/// requests only replace the pending criteria, and the running call loops
/// until nothing is pending.
pub struct AnalyticsStore {
    config: AnalyticsConfig,
    tz: Tz,
    snapshot: RwLock<JournalSnapshot>,
    state: Arc<RwLock<AnalyticsState>>,
    in_flight: AtomicBool,
    pending: Mutex<Option<FilterCriteria>>,
    events_tx: broadcast::Sender<AnalyticsEvent>,
}

impl AnalyticsStore {
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        let tz = config.timezone()?;
        let (events_tx, _) = broadcast::channel(32);
        Ok(Self {
            config,
            tz,
            snapshot: RwLock::new(JournalSnapshot::default()),
            state: Arc::new(RwLock::new(AnalyticsState::default())),
            in_flight: AtomicBool::new(false),
            pending: Mutex::new(None),
            events_tx,
        })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalyticsEvent> {
        self.events_tx.subscribe()
    }

    /// Shared handle to the current state for readers that outlive a call.
    pub fn state_handle(&self) -> Arc<RwLock<AnalyticsState>> {
        Arc::clone(&self.state)
    }

    pub async fn state(&self) -> AnalyticsState {
        self.state.read().await.clone()
    }

    pub async fn has_data(&self) -> bool {
        self.state.read().await.has_data()
    }

    pub async fn replace_snapshot(&self, snapshot: JournalSnapshot) {
        info!(
            "Journal snapshot replaced: {} days, {} trades",
            snapshot.days.len(),
            snapshot.trade_count()
        );
        *self.snapshot.write().await = snapshot;
    }

    pub async fn recompute(&self, criteria: FilterCriteria) -> RecomputeOutcome {
        *self.pending.lock().await = Some(criteria);

        let mut outcome = RecomputeOutcome::Coalesced;
        loop {
            if self
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                if outcome == RecomputeOutcome::Coalesced {
                    debug!("Recompute already in flight, criteria queued");
                }
                return outcome;
            }

            self.drain_pending().await;
            outcome = RecomputeOutcome::Completed;
            self.in_flight.store(false, Ordering::Release);

            // A request may have queued between the last drain and the
            // flag reset.
            if self.pending.lock().await.is_none() {
                return outcome;
            }
        }
    }

    async fn drain_pending(&self) {
        loop {
            let Some(criteria) = self.pending.lock().await.take() else {
                break;
            };

            let state = {
                let snapshot = self.snapshot.read().await;
                build_state(&snapshot, criteria, &self.config, self.tz)
            };
            let event = AnalyticsEvent::Recomputed {
                has_data: state.has_data(),
                trades: state.filtered.trade_count(),
            };
            info!(
                "Analytics recomputed: {} trades, net P&L {}",
                state.filtered.trade_count(),
                state.totals.net.proceeds
            );

            *self.state.write().await = state;
            let _ = self.events_tx.send(event);
        }
    }

    /// Fetch a fresh snapshot through `source`, then recompute. A failed
    /// fetch leaves an empty snapshot behind, so the resulting state has no
    /// data.
    pub async fn refresh(&self, source: &dyn JournalSource, criteria: FilterCriteria) -> RecomputeOutcome {
        let mut accounts: Vec<String> = criteria.accounts.iter().cloned().collect();
        accounts.sort();

        match JournalSnapshot::fetch(source, criteria.date_range, accounts).await {
            Ok(snapshot) => self.replace_snapshot(snapshot).await,
            Err(e) => {
                error!("Failed to fetch journal data: {}", e);
                self.replace_snapshot(JournalSnapshot::default()).await;
            }
        }
        self.recompute(criteria).await
    }
}
