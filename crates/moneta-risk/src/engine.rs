//! Risk engine state, account membership and admin setters.

use crate::error::{RiskError, RiskResult};
use crate::params::{
    validate_close_factor, validate_collateral_factor, validate_liquidation_incentive,
    validate_max_assets, MarketPolicy, RiskParams,
};
use alloy_primitives::U256;
use moneta_core::{Account, Event, Exp, MarketId, PauseTarget, SnapshotSource};
use moneta_interfaces::PriceOracle;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RiskEngine {
    admin: Account,
    pending_admin: Option<Account>,
    pub(crate) params: Arc<RiskParams>,
    pub(crate) markets: BTreeMap<MarketId, MarketPolicy>,
    pub(crate) memberships: HashMap<Account, Vec<MarketId>>,
    pub(crate) oracle: Arc<dyn PriceOracle>,
}

impl fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskEngine")
            .field("admin", &self.admin)
            .field("pending_admin", &self.pending_admin)
            .field("params", &self.params)
            .field("markets", &self.markets)
            .field("oracle", &self.oracle.name())
            .finish_non_exhaustive()
    }
}

impl RiskEngine {
    pub fn new(admin: Account, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            admin,
            pending_admin: None,
            params: Arc::new(RiskParams::default()),
            markets: BTreeMap::new(),
            memberships: HashMap::new(),
            oracle,
        }
    }

    pub fn is_admin(&self, account: &Account) -> bool {
        *account == self.admin
    }

    pub fn admin(&self) -> Account {
        self.admin
    }

    pub fn pending_admin(&self) -> Option<Account> {
        self.pending_admin
    }

    /// Current parameter snapshot.
    pub fn params(&self) -> Arc<RiskParams> {
        Arc::clone(&self.params)
    }

    pub fn market(&self, market: &MarketId) -> Option<&MarketPolicy> {
        self.markets.get(market)
    }

    pub fn is_listed(&self, market: &MarketId) -> bool {
        self.markets.get(market).is_some_and(|m| m.is_listed)
    }

    pub fn oracle(&self) -> &Arc<dyn PriceOracle> {
        &self.oracle
    }

    /// Markets `account` has entered, in entry order.
    pub fn assets_in(&self, account: &Account) -> &[MarketId] {
        self.memberships
            .get(account)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn check_membership(&self, account: &Account, market: &MarketId) -> bool {
        self.assets_in(account).contains(market)
    }

    pub(crate) fn listed_policy(&self, market: &MarketId) -> RiskResult<&MarketPolicy> {
        self.markets
            .get(market)
            .filter(|m| m.is_listed)
            .ok_or(RiskError::MarketNotListed(*market))
    }

    fn ensure_admin(&self, caller: &Account) -> RiskResult<()> {
        if !self.is_admin(caller) {
            warn!(%caller, "Admin call refused");
            return Err(RiskError::Unauthorized);
        }
        Ok(())
    }

    fn update_params(&mut self, f: impl FnOnce(&mut RiskParams)) {
        let params = Arc::make_mut(&mut self.params);
        f(params);
        params.version += 1;
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Enter every market in `markets`. All-or-nothing: an unlisted market or
    /// going past `max_assets` refuses the whole call. Markets already entered
    /// are skipped silently.
    pub fn enter_markets(
        &mut self,
        account: Account,
        markets: &[MarketId],
    ) -> RiskResult<Vec<Event>> {
        let mut joined: Vec<MarketId> = Vec::new();
        for market in markets {
            self.listed_policy(market)?;
            if !self.check_membership(&account, market) && !joined.contains(market) {
                joined.push(*market);
            }
        }
        if self.assets_in(&account).len() + joined.len() > self.params.max_assets {
            return Err(RiskError::TooManyAssets);
        }

        Ok(joined
            .into_iter()
            .map(|market| self.add_membership(account, market))
            .collect())
    }

    /// Whether a borrow in `market` would need to enter it first, and whether
    /// there is room to.
    pub(crate) fn check_can_enter(&self, account: &Account, market: &MarketId) -> RiskResult<bool> {
        if self.check_membership(account, market) {
            return Ok(false);
        }
        if self.assets_in(account).len() >= self.params.max_assets {
            return Err(RiskError::TooManyAssets);
        }
        Ok(true)
    }

    /// Record membership after a borrow that auto-entered `market`.
    pub fn commit_enter_market(&mut self, account: Account, market: MarketId) -> Option<Event> {
        if self.check_membership(&account, &market) {
            return None;
        }
        Some(self.add_membership(account, market))
    }

    fn add_membership(&mut self, account: Account, market: MarketId) -> Event {
        self.memberships.entry(account).or_default().push(market);
        debug!(%account, %market, "Market entered");
        Event::MarketEntered { market, account }
    }

    /// Leave `market`. Refused while the account holds tokens or owes in it, or
    /// while the account is short of liquidity. Leaving a market never
    /// entered is a no-op.
    pub fn exit_market(
        &mut self,
        source: &dyn SnapshotSource,
        account: Account,
        market: MarketId,
    ) -> RiskResult<Option<Event>> {
        if !self.check_membership(&account, &market) {
            return Ok(None);
        }
        let snapshot = source
            .account_snapshot(&market, &account)?
            .ok_or(RiskError::MarketNotDeployed(market))?;
        if !snapshot.borrow_balance.is_zero() {
            return Err(RiskError::NonzeroBorrowBalance(market));
        }
        if !snapshot.tokens.is_zero() {
            return Err(RiskError::NonzeroBalance(market));
        }
        let liquidity = self.get_hypothetical_account_liquidity(
            source,
            &account,
            Some(market),
            U256::ZERO,
            U256::ZERO,
        )?;
        if !liquidity.shortfall.is_zero() {
            return Err(RiskError::InsufficientLiquidity);
        }

        if let Some(assets) = self.memberships.get_mut(&account) {
            assets.retain(|m| *m != market);
        }
        debug!(%account, %market, "Market exited");
        Ok(Some(Event::MarketExited { market, account }))
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    /// List a deployed market. Collateral factor starts at zero.
    pub fn support_market(&mut self, caller: &Account, market: MarketId) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        if self.is_listed(&market) {
            return Err(RiskError::MarketAlreadyListed(market));
        }
        self.markets.insert(market, MarketPolicy::listed());
        info!(%market, "Market listed");
        Ok(Event::MarketListed { market })
    }

    pub fn set_collateral_factor(
        &mut self,
        caller: &Account,
        market: MarketId,
        new: Exp,
    ) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        self.listed_policy(&market)?;
        validate_collateral_factor(new)?;
        if !new.is_zero() {
            self.oracle.price(&market)?;
        }

        let policy = self
            .markets
            .get_mut(&market)
            .ok_or(RiskError::MarketNotListed(market))?;
        let old = policy.collateral_factor;
        policy.collateral_factor = new;
        info!(%market, %old, %new, "Collateral factor updated");
        Ok(Event::NewCollateralFactor { market, old, new })
    }

    pub fn set_close_factor(&mut self, caller: &Account, new: Exp) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        validate_close_factor(new)?;
        let old = self.params.close_factor;
        self.update_params(|p| p.close_factor = new);
        info!(%old, %new, "Close factor updated");
        Ok(Event::NewCloseFactor { old, new })
    }

    pub fn set_liquidation_incentive(&mut self, caller: &Account, new: Exp) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        validate_liquidation_incentive(new)?;
        let old = self.params.liquidation_incentive;
        self.update_params(|p| p.liquidation_incentive = new);
        info!(%old, %new, "Liquidation incentive updated");
        Ok(Event::NewLiquidationIncentive { old, new })
    }

    pub fn set_max_assets(&mut self, caller: &Account, new: usize) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        validate_max_assets(new)?;
        let old = self.params.max_assets;
        self.update_params(|p| p.max_assets = new);
        info!(old, new, "Max assets updated");
        Ok(Event::NewMaxAssets { old, new })
    }

    pub fn set_price_oracle(
        &mut self,
        caller: &Account,
        oracle: Arc<dyn PriceOracle>,
    ) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        let old = self.oracle.name().to_string();
        let new = oracle.name().to_string();
        self.oracle = oracle;
        info!(%old, %new, "Price oracle updated");
        Ok(Event::NewPriceOracle { old, new })
    }

    /// Set borrow caps; zero removes the cap. Validated as a whole before any
    /// cap changes.
    pub fn set_market_borrow_caps(
        &mut self,
        caller: &Account,
        caps: &[(MarketId, U256)],
    ) -> RiskResult<Vec<Event>> {
        self.ensure_admin(caller)?;
        for (market, _) in caps {
            self.listed_policy(market)?;
        }

        let mut events = Vec::with_capacity(caps.len());
        for (market, cap) in caps {
            if let Some(policy) = self.markets.get_mut(market) {
                policy.borrow_cap = *cap;
                info!(%market, %cap, "Borrow cap updated");
                events.push(Event::NewBorrowCap {
                    market: *market,
                    cap: *cap,
                });
            }
        }
        Ok(events)
    }

    pub fn set_incentivized(
        &mut self,
        caller: &Account,
        market: MarketId,
        incentivized: bool,
    ) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        let policy = self
            .markets
            .get_mut(&market)
            .filter(|m| m.is_listed)
            .ok_or(RiskError::MarketNotListed(market))?;
        policy.is_incentivized = incentivized;
        info!(%market, incentivized, "Market incentive flag updated");
        Ok(Event::MarketIncentivized {
            market,
            incentivized,
        })
    }

    pub fn set_protocol_paused(&mut self, caller: &Account, state: bool) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        self.update_params(|p| p.pause.protocol_paused = state);
        info!(state, "Protocol pause updated");
        Ok(Event::ActionProtocolPaused { state })
    }

    pub fn set_action_paused(
        &mut self,
        caller: &Account,
        target: PauseTarget,
        state: bool,
    ) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        if let Some(market) = target.market() {
            self.listed_policy(&market)?;
        }

        self.update_params(|p| match target {
            PauseTarget::Mint(market) => toggle(&mut p.pause.mint_paused, market, state),
            PauseTarget::Borrow(market) => toggle(&mut p.pause.borrow_paused, market, state),
            PauseTarget::Transfer => p.pause.transfer_paused = state,
            PauseTarget::Seize => p.pause.seize_paused = state,
        });
        let action = target.action();
        info!(%action, market = ?target.market(), state, "Action pause updated");
        Ok(Event::ActionPaused {
            market: target.market(),
            action,
            state,
        })
    }

    /// First step of an admin handover. `None` cancels a pending handover.
    pub fn set_pending_admin(
        &mut self,
        caller: &Account,
        new: Option<Account>,
    ) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        let old = self.pending_admin;
        self.pending_admin = new;
        info!(?old, ?new, "Pending admin updated");
        Ok(Event::NewPendingAdmin { old, new })
    }

    /// Second step of an admin handover, called by the pending admin.
    pub fn accept_admin(&mut self, caller: &Account) -> RiskResult<Vec<Event>> {
        if self.pending_admin != Some(*caller) {
            warn!(%caller, "Admin acceptance refused");
            return Err(RiskError::Unauthorized);
        }
        let old = self.admin;
        self.admin = *caller;
        self.pending_admin = None;
        info!(%old, new = %caller, "Admin handed over");
        Ok(vec![
            Event::NewAdmin { old, new: *caller },
            Event::NewPendingAdmin {
                old: Some(*caller),
                new: None,
            },
        ])
    }

    /// Replace the whole parameter snapshot in one step.
    ///
    /// The incoming `version` is ignored; the stored snapshot gets the next
    /// version number.
    pub fn apply_params(&mut self, caller: &Account, params: RiskParams) -> RiskResult<Event> {
        self.ensure_admin(caller)?;
        params.validate(|m| self.is_listed(m))?;

        let version = self.params.version + 1;
        self.params = Arc::new(RiskParams { version, ..params });
        info!(version, "Risk parameters applied");
        Ok(Event::NewRiskParams { version })
    }
}

fn toggle(set: &mut BTreeSet<MarketId>, market: MarketId, state: bool) {
    if state {
        set.insert(market);
    } else {
        set.remove(&market);
    }
}
