//! Broker Gateway — the SINGLE choke-point for all broker operations.
//!
//! # Invariant (enforced at both compile-time and runtime)
//!
//! **Compile-time:** `OrderRouter` is `pub(crate)` and is never re-exported
//! from `lib.rs`. External crates have no way to construct one. The only
//! public API that reaches a broker adapter is `BrokerGateway`.
//!
//! **Runtime:** Every call to `submit` / `cancel` / `replace` evaluates
//! three gates in order and refuses with `GateRefusal` if any fails:
//!
//! 1. `IntegrityGate::is_armed`   — system integrity is not disarmed or halted
//! 2. `RiskGate::is_allowed`      — risk engine returned Allow for this request
//! 3. `ReconcileGate::is_clean`   — most recent reconcile report is Clean
//!
//! Gates are owned by the gateway itself (not caller-supplied verdicts), so
//! a caller cannot forge a pass by constructing a struct literal.
//!
//! `submit` additionally enforces outbox-first dispatch: the broker-facing
//! order id always comes from the claimed outbox row's idempotency key, never
//! from the caller's request. `cancel`/`replace` enforce order provenance:
//! the internal order id must be present in the caller-supplied
//! `BrokerOrderMap`, checked only after the three gates pass.

use crate::id_map::BrokerOrderMap;
use crate::order_router::{
    BrokerAdapter, BrokerCancelResponse, BrokerReplaceRequest, BrokerReplaceResponse,
    BrokerSubmitRequest, BrokerSubmitResponse, OrderRouter,
};

// ---------------------------------------------------------------------------
// Gate traits
// ---------------------------------------------------------------------------

/// Reports whether the system's integrity state permits broker dispatch.
pub trait IntegrityGate {
    fn is_armed(&self) -> bool;
}

/// Reports the current risk engine verdict for broker dispatch.
pub trait RiskGate {
    fn is_allowed(&self) -> bool;
}

/// Reports whether the most recent reconcile pass was clean.
pub trait ReconcileGate {
    fn is_clean(&self) -> bool;
}

// ---------------------------------------------------------------------------
// GateRefusal
// ---------------------------------------------------------------------------

/// The reason a broker operation was refused at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRefusal {
    IntegrityDisarmed,
    RiskBlocked,
    ReconcileNotClean,
}

impl std::fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateRefusal::IntegrityDisarmed => write!(f, "GATE_REFUSED: integrity disarmed or halted"),
            GateRefusal::RiskBlocked => write!(f, "GATE_REFUSED: risk engine did not allow"),
            GateRefusal::ReconcileNotClean => write!(f, "GATE_REFUSED: reconcile is not clean"),
        }
    }
}

impl std::error::Error for GateRefusal {}

// ---------------------------------------------------------------------------
// UnknownOrder
// ---------------------------------------------------------------------------

/// Returned by `cancel`/`replace` when the internal order id has no entry
/// in the caller-supplied `BrokerOrderMap` — either it was never submitted
/// by this system, or it was already deregistered at a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOrder {
    pub internal_id: String,
}

impl std::fmt::Display for UnknownOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CANCEL_REPLACE_REFUSED: no broker mapping for internal order id {}",
            self.internal_id
        )
    }
}

impl std::error::Error for UnknownOrder {}

// ---------------------------------------------------------------------------
// OutboxClaimToken
// ---------------------------------------------------------------------------

/// Proof that an outbox row was claimed before submit. The only valid way
/// to obtain one is [`OutboxClaimToken::from_claimed_row`] — the private
/// `_priv` field forbids struct-literal construction outside this crate's
/// outbox-claim path, so a caller cannot submit without first claiming.
#[derive(Debug, Clone)]
pub struct OutboxClaimToken {
    _priv: (),
    pub outbox_id: i64,
    pub idempotency_key: String,
}

impl OutboxClaimToken {
    /// Construct from a row that has already been claimed from the outbox.
    pub fn from_claimed_row(outbox_id: i64, idempotency_key: impl Into<String>) -> Self {
        Self {
            _priv: (),
            outbox_id,
            idempotency_key: idempotency_key.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BrokerGateway
// ---------------------------------------------------------------------------

/// The SINGLE choke-point through which ALL broker operations must flow.
///
/// Owns a **private** `OrderRouter<B>` plus the three live gate
/// implementations. Because `OrderRouter` is `pub(crate)`, external code
/// can only reach a broker adapter through the gated methods below.
///
/// ```text
/// External code
///     │
///     └──► BrokerGateway::submit / cancel / replace
///                │
///                ├── enforce_gates (integrity → risk → reconcile)
///                │        └── GateRefusal  ◄── refused here if any fails
///                │
///                ├── outbox-key override (submit) / map lookup (cancel, replace)
///                │        └── UnknownOrder ◄── refused here if provenance missing
///                │
///                └── OrderRouter::route_*  ◄── only reached if all checks pass
///                         └── BrokerAdapter::*
/// ```
pub struct BrokerGateway<B: BrokerAdapter, I: IntegrityGate, R: RiskGate, Rc: ReconcileGate> {
    router: OrderRouter<B>,
    integrity: I,
    risk: R,
    reconcile: Rc,
}

impl<B: BrokerAdapter, I: IntegrityGate, R: RiskGate, Rc: ReconcileGate> BrokerGateway<B, I, R, Rc> {
    pub fn new(broker: B, integrity: I, risk: R, reconcile: Rc) -> Self {
        Self {
            router: OrderRouter::new(broker),
            integrity,
            risk,
            reconcile,
        }
    }

    /// Evaluate all three gates in order. Returns the first refusal, or
    /// `Ok(())` if all pass.
    fn enforce_gates(&self) -> Result<(), GateRefusal> {
        if !self.integrity.is_armed() {
            return Err(GateRefusal::IntegrityDisarmed);
        }
        if !self.risk.is_allowed() {
            return Err(GateRefusal::RiskBlocked);
        }
        if !self.reconcile.is_clean() {
            return Err(GateRefusal::ReconcileNotClean);
        }
        Ok(())
    }

    /// Submit a new broker order.
    ///
    /// `req.order_id` is overridden with `claim.idempotency_key` — the
    /// broker always sees the outbox-claimed key, never a caller-supplied
    /// value, so dispatch can never bypass the outbox.
    pub fn submit(
        &self,
        claim: &OutboxClaimToken,
        mut req: BrokerSubmitRequest,
    ) -> Result<BrokerSubmitResponse, Box<dyn std::error::Error>> {
        self.enforce_gates()?;
        req.order_id = claim.idempotency_key.clone();
        self.router.route_submit(req)
    }

    /// Cancel a broker order, keyed by the internal order id.
    ///
    /// Gates are checked first; only if they pass is `internal_id` looked
    /// up in `map`. A missing mapping refuses with [`UnknownOrder`].
    pub fn cancel(
        &self,
        internal_id: &str,
        map: &BrokerOrderMap,
    ) -> Result<BrokerCancelResponse, Box<dyn std::error::Error>> {
        self.enforce_gates()?;
        let broker_id = map.broker_id(internal_id).ok_or_else(|| UnknownOrder {
            internal_id: internal_id.to_string(),
        })?;
        self.router.route_cancel(broker_id)
    }

    /// Replace a broker order, keyed by the internal order id.
    ///
    /// Gates are checked first; only if they pass is `internal_id` looked
    /// up in `map`. A missing mapping refuses with [`UnknownOrder`].
    pub fn replace(
        &self,
        internal_id: &str,
        map: &BrokerOrderMap,
        quantity: i32,
        limit_price: Option<i64>,
        time_in_force: String,
    ) -> Result<BrokerReplaceResponse, Box<dyn std::error::Error>> {
        self.enforce_gates()?;
        let broker_id = map.broker_id(internal_id).ok_or_else(|| UnknownOrder {
            internal_id: internal_id.to_string(),
        })?;
        self.router.route_replace(BrokerReplaceRequest {
            broker_order_id: broker_id.to_string(),
            quantity,
            limit_price,
            time_in_force,
        })
    }
}

// ---------------------------------------------------------------------------
// Idempotency derivation
// ---------------------------------------------------------------------------

/// Derive the stable `client_order_id` for a given intent ID. Identity
/// mapping: intent IDs are already stable, unique, run-scoped identifiers,
/// so retries of the same intent deterministically reuse the same key.
pub fn intent_id_to_client_order_id(intent_id: &str) -> String {
    intent_id.to_string()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_router::BrokerInvokeToken;

    struct AlwaysOkBroker;

    impl BrokerAdapter for AlwaysOkBroker {
        fn submit_order(&self, req: BrokerSubmitRequest, _token: &BrokerInvokeToken) -> Result<BrokerSubmitResponse, Box<dyn std::error::Error>> {
            Ok(BrokerSubmitResponse {
                broker_order_id: format!("b-{}", req.order_id),
                submitted_at: 1,
                status: "ok".to_string(),
            })
        }

        fn cancel_order(&self, order_id: &str, _token: &BrokerInvokeToken) -> Result<BrokerCancelResponse, Box<dyn std::error::Error>> {
            Ok(BrokerCancelResponse {
                broker_order_id: order_id.to_string(),
                cancelled_at: 1,
                status: "ok".to_string(),
            })
        }

        fn replace_order(&self, req: BrokerReplaceRequest, _token: &BrokerInvokeToken) -> Result<BrokerReplaceResponse, Box<dyn std::error::Error>> {
            Ok(BrokerReplaceResponse {
                broker_order_id: req.broker_order_id,
                replaced_at: 1,
                status: "ok".to_string(),
            })
        }
    }

    struct BoolGate(bool);
    impl IntegrityGate for BoolGate {
        fn is_armed(&self) -> bool {
            self.0
        }
    }
    impl RiskGate for BoolGate {
        fn is_allowed(&self) -> bool {
            self.0
        }
    }
    impl ReconcileGate for BoolGate {
        fn is_clean(&self) -> bool {
            self.0
        }
    }

    fn make_gateway(integrity: bool, risk: bool, reconcile: bool) -> BrokerGateway<AlwaysOkBroker, BoolGate, BoolGate, BoolGate> {
        BrokerGateway::new(AlwaysOkBroker, BoolGate(integrity), BoolGate(risk), BoolGate(reconcile))
    }

    fn submit_req() -> BrokerSubmitRequest {
        BrokerSubmitRequest {
            order_id: "ord-1".to_string(),
            symbol: "AAPL".to_string(),
            quantity: 10,
            order_type: "market".to_string(),
            limit_price: None,
            time_in_force: "day".to_string(),
        }
    }

    fn claim() -> OutboxClaimToken {
        OutboxClaimToken::from_claimed_row(1, "ord-1")
    }

    #[test]
    fn all_clear_submit_succeeds() {
        let gw = make_gateway(true, true, true);
        assert!(gw.submit(&claim(), submit_req()).is_ok());
    }

    #[test]
    fn integrity_checked_before_risk_and_reconcile() {
        let gw = make_gateway(false, false, false);
        let err = gw.submit(&claim(), submit_req()).unwrap_err();
        let refusal = err.downcast::<GateRefusal>().unwrap();
        assert_eq!(*refusal, GateRefusal::IntegrityDisarmed);
    }

    #[test]
    fn all_clear_cancel_succeeds() {
        let gw = make_gateway(true, true, true);
        let mut map = BrokerOrderMap::new();
        map.register("ord-1", "b-ord-1");
        assert!(gw.cancel("ord-1", &map).is_ok());
    }

    #[test]
    fn cancel_unknown_order_refused() {
        let gw = make_gateway(true, true, true);
        let map = BrokerOrderMap::new();
        let err = gw.cancel("unknown", &map).unwrap_err();
        let refused = err.downcast::<UnknownOrder>().unwrap();
        assert_eq!(refused.internal_id, "unknown");
    }

    #[test]
    fn all_clear_replace_succeeds() {
        let gw = make_gateway(true, true, true);
        let mut map = BrokerOrderMap::new();
        map.register("ord-1", "b-ord-1");
        assert!(gw.replace("ord-1", &map, 20, None, "day".to_string()).is_ok());
    }
}
