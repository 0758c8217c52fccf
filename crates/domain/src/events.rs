//! Engine events and the bounded in-memory log they are recorded into.

use crate::pair::PairKey;
use crate::token::{AccountId, AssetId, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::info;

/// Type of engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEventType {
    PoolCreated,
    LiquidityAdded,
    LiquidityRemoved,
    Swapped,
    ProtocolFeesClaimed,
    FeeRateUpdated,
    ScheduleCreated,
    TokensReleased,
    ScheduleRevoked,
    EmergencyModeChanged,
    EmergencyWithdrawal,
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventData {
    /// A pool was registered.
    PoolCreated { pair: PairKey, fee_rate_bps: u32 },
    /// Liquidity was deposited.
    LiquidityAdded {
        pair: PairKey,
        provider: AccountId,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
        shares: TokenAmount,
    },
    /// Liquidity was withdrawn.
    LiquidityRemoved {
        pair: PairKey,
        provider: AccountId,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
        shares: TokenAmount,
    },
    /// A swap was executed.
    Swapped {
        pair: PairKey,
        trader: AccountId,
        asset_in: AssetId,
        amount_in: TokenAmount,
        amount_out: TokenAmount,
        protocol_fee: TokenAmount,
    },
    /// Protocol fees were paid to the fee recipient.
    ProtocolFeesClaimed {
        pair: PairKey,
        recipient: AccountId,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
    },
    /// A fee rate changed; `pair` is `None` for the default rate.
    FeeRateUpdated {
        pair: Option<PairKey>,
        old_bps: u32,
        new_bps: u32,
    },
    /// A vesting schedule was funded.
    ScheduleCreated {
        beneficiary: AccountId,
        total_amount: TokenAmount,
        cliff_duration: u64,
        vesting_duration: u64,
    },
    /// Vested tokens were paid out.
    TokensReleased {
        beneficiary: AccountId,
        amount: TokenAmount,
    },
    /// A schedule was revoked.
    ScheduleRevoked {
        beneficiary: AccountId,
        returned: TokenAmount,
    },
    /// Emergency mode switched.
    EmergencyModeChanged { active: bool },
    /// Escrowed tokens were moved out under emergency mode.
    EmergencyWithdrawal {
        withdrawer: AccountId,
        to: AccountId,
        amount: TokenAmount,
    },
}

impl EventData {
    pub fn event_type(&self) -> EngineEventType {
        match self {
            Self::PoolCreated { .. } => EngineEventType::PoolCreated,
            Self::LiquidityAdded { .. } => EngineEventType::LiquidityAdded,
            Self::LiquidityRemoved { .. } => EngineEventType::LiquidityRemoved,
            Self::Swapped { .. } => EngineEventType::Swapped,
            Self::ProtocolFeesClaimed { .. } => EngineEventType::ProtocolFeesClaimed,
            Self::FeeRateUpdated { .. } => EngineEventType::FeeRateUpdated,
            Self::ScheduleCreated { .. } => EngineEventType::ScheduleCreated,
            Self::TokensReleased { .. } => EngineEventType::TokensReleased,
            Self::ScheduleRevoked { .. } => EngineEventType::ScheduleRevoked,
            Self::EmergencyModeChanged { .. } => EngineEventType::EmergencyModeChanged,
            Self::EmergencyWithdrawal { .. } => EngineEventType::EmergencyWithdrawal,
        }
    }
}

/// A recorded engine event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Event ID.
    pub id: String,
    /// Event type.
    pub event_type: EngineEventType,
    /// Engine clock at the time of the operation.
    pub engine_time: u64,
    /// Wall-clock time the event was recorded.
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    /// Event-specific data.
    pub data: EventData,
}

impl EngineEvent {
    /// Creates a new event stamped with `engine_time`.
    pub fn new(engine_time: u64, data: EventData) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: data.event_type(),
            engine_time,
            recorded_at: chrono::Utc::now(),
            data,
        }
    }
}

/// Default number of events kept in memory.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10_000;

/// Bounded event history; the oldest events are dropped first.
#[derive(Debug)]
pub struct EventLog {
    events: RwLock<VecDeque<EngineEvent>>,
    capacity: usize,
}

impl EventLog {
    /// Creates a log holding at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(1_024))),
            capacity: capacity.max(1),
        }
    }

    /// Appends an event, evicting the oldest one when full.
    pub async fn record(&self, engine_time: u64, data: EventData) -> EngineEvent {
        let event = EngineEvent::new(engine_time, data);
        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            engine_time,
            "Event recorded"
        );
        event
    }

    /// All retained events, oldest first.
    pub async fn events(&self) -> Vec<EngineEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    /// Retained events of one type, oldest first.
    pub async fn events_of_type(&self, event_type: EngineEventType) -> Vec<EngineEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// The `n` most recent events, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<EngineEvent> {
        let events = self.events.read().await;
        let skip = events.len().saturating_sub(n);
        events.iter().skip(skip).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}
