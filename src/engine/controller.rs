//! # engine::controller
//!
//! **Ladder Controller** — the state machine that runs one ladder from start
//! to profit target.
//!
//! ```text
//!             entry submitted            fill confirmed
//!  WATCHING ─────────────────▶ ENTERING ───────────────▶ WATCHING
//!     │
//!     │ floating profit >= target
//!     ▼
//!  CLOSING ──────────────────▶ TERMINATED
//!             position flat
//! ```
//!
//! Only klines of the tracked instrument are evaluated.  Every other update
//! only refreshes the gateway's snapshots.  At most one entry or close is in
//! flight at any time: order mode blocks on the confirmation wait, target
//! mode pauses the ladder until the previous target is reached.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::executor::{await_order, await_position, build_close, build_entry};
use crate::engine::ladder::{LadderParams, LadderState, VolumeProgression};
use crate::engine::signal::{evaluate, TradeSignal};
use crate::error::GatewayError;
use crate::events::{TradeAction, TradeEvent};
use crate::gateway::{Gateway, UpdateEvent};
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Watching,
    Entering,
    Closing,
    Terminated,
}

/// Summary of a run that reached its profit target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// Rungs taken (entries that advanced the ladder).
    pub entries: u32,
    pub final_target_price: Decimal,
    /// Lots closed on exit.
    pub closed_volume: u64,
    /// Lots still held when the close order finished.
    pub remaining_volume: u64,
    /// Floating profit that triggered the exit.
    pub floating_profit: Decimal,
}

pub struct LadderController<G: Gateway> {
    params:         LadderParams,
    ladder:         LadderState,
    gateway:        G,
    notifier:       Arc<dyn Notifier>,
    phase:          Phase,
    /// Target-volume mode: signed target not yet reached.
    pending_target: Option<i64>,
    entries:        u32,
}

impl<G: Gateway> LadderController<G> {
    pub fn new(
        params:   LadderParams,
        ladder:   LadderState,
        gateway:  G,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            params,
            ladder,
            gateway,
            notifier,
            phase: Phase::Watching,
            pending_target: None,
            entries: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ladder(&self) -> &LadderState {
        &self.ladder
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    // ─── Main Loop ────────────────────────────────────────────────────────────

    /// Run until the profit target closes the position.  Any gateway failure
    /// ends the run.
    pub async fn run(&mut self) -> Result<RunOutcome, GatewayError> {
        let account = self.gateway.current_account();
        let position = self.gateway.current_position(&self.params.instrument);
        info!(
            instrument      = %self.params.instrument,
            direction       = %self.params.direction,
            mode            = ?self.params.progression,
            target_price    = %self.ladder.target_price(),
            price_step      = %self.ladder.price_step(),
            volume_step     = self.ladder.volume_step(),
            target_profit   = %self.params.target_profit,
            max_ratio       = %self.params.max_position_ratio,
            balance         = %account.balance,
            available       = %account.available,
            held            = self.params.direction.held_volume(&position),
            floating_profit = %account.floating_profit,
            "Ladder controller started"
        );

        loop {
            let update = self.gateway.next_update().await?;
            if let Some(outcome) = self.on_update(&update).await? {
                return Ok(outcome);
            }
        }
    }

    /// Handle one update already received from the gateway.  Returns the
    /// outcome once the run has terminated.
    pub async fn on_update(
        &mut self,
        update: &UpdateEvent,
    ) -> Result<Option<RunOutcome>, GatewayError> {
        if self.phase == Phase::Terminated {
            debug!("Update after termination ignored");
            return Ok(None);
        }

        self.reconcile_target();

        let Some(kline) = update.kline_for(&self.params.instrument) else {
            return Ok(None);
        };
        let price = kline.close;
        let account = self.gateway.current_account();
        let position = self.gateway.current_position(&self.params.instrument);

        info!(
            %price,
            high            = %kline.high,
            low             = %kline.low,
            target_price    = %self.ladder.target_price(),
            held            = self.params.direction.held_volume(&position),
            floating_profit = %account.floating_profit,
            "Kline update"
        );

        let signal = evaluate(
            &self.params,
            &self.ladder,
            price,
            &account,
            &position,
            self.pending_target.is_some(),
        );

        match signal {
            TradeSignal::NoAction => Ok(None),
            TradeSignal::Enter { target_volume } => {
                self.enter(price, target_volume).await?;
                Ok(None)
            }
            TradeSignal::Close => self.close(price, account.floating_profit).await.map(Some),
        }
    }

    // ─── Entry ────────────────────────────────────────────────────────────────

    async fn enter(&mut self, price: Decimal, target_volume: i64) -> Result<(), GatewayError> {
        let direction = self.params.direction;
        let instrument = self.params.instrument.clone();

        match self.params.progression {
            VolumeProgression::FixedIncrement => {
                let intent = build_entry(direction, self.ladder.volume_step(), price);
                let handle = self.gateway.submit_order(&instrument, &intent).await?;
                self.transition(Phase::Entering);
                self.emit(
                    TradeAction::OpenRequest,
                    format!(
                        "Open {:?} {} lots @ {} (position → {}), order {}",
                        intent.side, intent.volume, price, target_volume, handle
                    ),
                );

                let done = await_order(&mut self.gateway, &handle, self.params.confirm_timeout).await?;
                let filled = done.filled();
                self.emit(
                    TradeAction::OpenSuccess,
                    format!("Order {handle} finished, filled {filled}/{} lots", done.volume_origin),
                );

                if filled > 0 {
                    self.take_rung(price);
                } else {
                    warn!(order_id = %handle, %price, "Entry finished without fill — rung kept");
                }
                self.transition(Phase::Watching);
            }

            VolumeProgression::TargetVolume => {
                self.gateway.set_target_volume(&instrument, target_volume).await?;
                self.emit(
                    TradeAction::OpenRequest,
                    format!("Target {instrument} position {target_volume} @ {price}"),
                );
                self.pending_target = Some(target_volume);
                self.transition(Phase::Entering);
                self.take_rung(price);
            }
        }
        Ok(())
    }

    fn take_rung(&mut self, price: Decimal) {
        let previous = self.ladder.target_price();
        let next = self.ladder.advance(self.params.direction);
        self.entries += 1;
        info!(
            %price,
            previous_target = %previous,
            target_price    = %next,
            entries         = self.entries,
            "🪜 Ladder advanced"
        );
    }

    /// Target mode: report the pending target once the position shows it.
    fn reconcile_target(&mut self) {
        let Some(target) = self.pending_target else { return };
        let position = self.gateway.current_position(&self.params.instrument);
        if self.params.direction.signed_volume(&position) == target {
            self.pending_target = None;
            self.emit(
                TradeAction::OpenSuccess,
                format!("{} position reached {target}", self.params.instrument),
            );
            self.transition(Phase::Watching);
        }
    }

    // ─── Exit ─────────────────────────────────────────────────────────────────

    async fn close(
        &mut self,
        price: Decimal,
        floating_profit: Decimal,
    ) -> Result<RunOutcome, GatewayError> {
        let direction = self.params.direction;
        let instrument = self.params.instrument.clone();
        let held = direction.held_volume(&self.gateway.current_position(&instrument));

        info!(
            %price,
            %floating_profit,
            target_profit = %self.params.target_profit,
            held,
            "💰 Profit target reached — closing position"
        );
        self.transition(Phase::Closing);

        let closed = match self.params.progression {
            VolumeProgression::FixedIncrement if held == 0 => {
                info!(instrument = %instrument, "Nothing held — no close order needed");
                0
            }

            VolumeProgression::FixedIncrement => {
                let intent = build_close(direction, held, price);
                let handle = self.gateway.submit_order(&instrument, &intent).await?;
                self.emit(
                    TradeAction::CloseRequest,
                    format!("Close {:?} {held} lots of {instrument} @ {price}, order {handle}", intent.side),
                );

                let done = await_order(&mut self.gateway, &handle, self.params.confirm_timeout).await?;
                if done.volume_left > 0 {
                    warn!(
                        order_id    = %handle,
                        volume_left = done.volume_left,
                        "Close order finished with volume left"
                    );
                }
                done.filled()
            }

            VolumeProgression::TargetVolume => {
                self.pending_target = None;
                self.gateway.set_target_volume(&instrument, 0).await?;
                self.emit(
                    TradeAction::CloseRequest,
                    format!("Target {instrument} position 0, closing {held} lots @ {price}"),
                );
                await_position(&mut self.gateway, &instrument, direction, 0, self.params.confirm_timeout)
                    .await?;
                held
            }
        };

        let remaining = held.saturating_sub(closed);
        let message = if remaining == 0 {
            format!("Position closed: {closed} lots of {instrument}, floating profit {floating_profit}")
        } else {
            format!(
                "Position partially closed: {closed} of {held} lots of {instrument}, \
                 {remaining} still open, floating profit {floating_profit}"
            )
        };
        self.emit(TradeAction::CloseSuccess, message);
        self.transition(Phase::Terminated);

        Ok(RunOutcome {
            entries: self.entries,
            final_target_price: self.ladder.target_price(),
            closed_volume: closed,
            remaining_volume: remaining,
            floating_profit,
        })
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────

    fn transition(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
    }

    fn emit(&self, action: TradeAction, message: String) {
        let event = TradeEvent::new(action, &self.params.instrument, message);
        info!(action = %event.action, "{}", event.message);
        self.notifier.notify(&event);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::gateway::{FillMode, SimFeed, SimGateway};
    use crate::models::{
        AccountSnapshot, Direction, Kline, Offset, OrderSide, OrderStatus, OrderUpdate,
        PositionSnapshot,
    };
    use rust_decimal_macros::dec;

    const SYMBOL: &str = "SHFE.rb2405";

    #[derive(Default)]
    struct Recorder(Mutex<Vec<TradeEvent>>);

    impl Notifier for Recorder {
        fn notify(&self, event: &TradeEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    impl Recorder {
        fn actions(&self) -> Vec<TradeAction> {
            self.0.lock().unwrap().iter().map(|e| e.action).collect()
        }
    }

    fn params(direction: Direction, progression: VolumeProgression) -> LadderParams {
        LadderParams {
            instrument: SYMBOL.into(),
            direction,
            target_profit: dec!(500),
            max_position_ratio: dec!(0.5),
            progression,
            confirm_timeout: None,
        }
    }

    /// Account with `used` of 100 000 equity committed.
    fn account(used: Decimal, profit: Decimal) -> AccountSnapshot {
        AccountSnapshot {
            balance: dec!(100000),
            available: dec!(100000) * (Decimal::ONE - used),
            floating_profit: profit,
        }
    }

    fn kline(close: Decimal) -> Kline {
        Kline { datetime: None, high: close + dec!(5), low: close - dec!(5), close }
    }

    fn controller(
        params: LadderParams,
        volume_step: u64,
        fill_mode: FillMode,
        account: AccountSnapshot,
        position: PositionSnapshot,
    ) -> (SimFeed, LadderController<SimGateway>, Arc<Recorder>) {
        let (feed, gw) = SimGateway::new(fill_mode);
        let gw = gw.with_snapshot(account, SYMBOL, position);
        let ladder = LadderState::new(dec!(3000), dec!(10), volume_step).unwrap();
        let recorder = Arc::new(Recorder::default());
        let ctl = LadderController::new(params, ladder, gw, recorder.clone());
        (feed, ctl, recorder)
    }

    /// Process everything currently available on the stream.
    async fn pump(ctl: &mut LadderController<SimGateway>) -> Option<RunOutcome> {
        while let Ok(update) =
            tokio::time::timeout(Duration::from_millis(50), ctl.gateway_mut().next_update()).await
        {
            if let Some(outcome) = ctl.on_update(&update.unwrap()).await.unwrap() {
                return Some(outcome);
            }
        }
        None
    }

    #[tokio::test]
    async fn test_long_scenario_enter_refuse_close() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.4), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2995)));
        feed.account(account(dec!(0.6), dec!(0)));
        feed.kline(SYMBOL, kline(dec!(2990)));
        feed.account(account(dec!(0.6), dec!(520)));
        feed.kline(SYMBOL, kline(dec!(2990)));
        feed.kline(SYMBOL, kline(dec!(2900)));

        let outcome = ctl.run().await.unwrap();

        assert_eq!(ctl.phase(), Phase::Terminated);
        assert_eq!(outcome.entries, 1);
        assert_eq!(outcome.closed_volume, 1);
        assert_eq!(outcome.final_target_price, dec!(2990));
        assert_eq!(outcome.floating_profit, dec!(520));

        let submitted = ctl.gateway().submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].1.side, OrderSide::Buy);
        assert_eq!(submitted[0].1.offset, Offset::Open);
        assert_eq!(submitted[0].1.volume, 1);
        assert_eq!(submitted[0].1.limit_price, dec!(2995));
        assert_eq!(submitted[1].1.side, OrderSide::Sell);
        assert_eq!(submitted[1].1.offset, Offset::Close);
        assert_eq!(submitted[1].1.volume, 1);

        assert_eq!(
            recorder.actions(),
            vec![
                TradeAction::OpenRequest,
                TradeAction::OpenSuccess,
                TradeAction::CloseRequest,
                TradeAction::CloseSuccess,
            ]
        );

        // The kline after the close was never consumed.
        let close = loop {
            let next = ctl.gateway_mut().next_update().await.unwrap();
            if let Some(k) = next.kline_for(SYMBOL) {
                break k.close;
            }
        };
        assert_eq!(close, dec!(2900));
    }

    #[tokio::test]
    async fn test_short_scenario_sells_and_raises_rung() {
        let (feed, mut ctl, _recorder) = controller(
            params(Direction::Short, VolumeProgression::FixedIncrement),
            2,
            FillMode::Immediate,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(3005)));
        drop(feed);

        assert!(matches!(ctl.run().await, Err(GatewayError::StreamClosed)));
        assert_eq!(ctl.ladder().target_price(), dec!(3010));
        let submitted = ctl.gateway().submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].1.side, OrderSide::Sell);
        assert_eq!(submitted[0].1.volume, 2);
        assert_eq!(ctl.gateway().current_position(SYMBOL).volume_short, 2);
    }

    #[tokio::test]
    async fn test_long_rung_never_rises() {
        let (feed, mut ctl, _recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        let mut targets = vec![ctl.ladder().target_price()];
        for price in [dec!(2995), dec!(3020), dec!(2985), dec!(2950), dec!(2999), dec!(2940)] {
            feed.kline(SYMBOL, kline(price));
            assert!(pump(&mut ctl).await.is_none());
            targets.push(ctl.ladder().target_price());
        }

        assert!(targets.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(ctl.ladder().target_price(), dec!(2960));
        assert_eq!(ctl.gateway().current_position(SYMBOL).volume_long, 4);
    }

    #[tokio::test]
    async fn test_short_rung_never_falls() {
        let (feed, mut ctl, _recorder) = controller(
            params(Direction::Short, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        let mut targets = vec![ctl.ladder().target_price()];
        for price in [dec!(3001), dec!(2980), dec!(3015), dec!(3050)] {
            feed.kline(SYMBOL, kline(price));
            assert!(pump(&mut ctl).await.is_none());
            targets.push(ctl.ladder().target_price());
        }

        assert!(targets.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(ctl.ladder().target_price(), dec!(3030));
    }

    #[tokio::test]
    async fn test_exit_has_priority_over_entry() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(600)),
            PositionSnapshot { volume_long: 3, volume_short: 0 },
        );

        feed.kline(SYMBOL, kline(dec!(2900)));
        let outcome = ctl.run().await.unwrap();

        let submitted = ctl.gateway().submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].1.offset, Offset::Close);
        assert_eq!(submitted[0].1.volume, 3);
        assert_eq!(outcome.entries, 0);
        assert_eq!(ctl.ladder().target_price(), dec!(3000));
        assert!(!recorder.actions().contains(&TradeAction::OpenRequest));
    }

    #[tokio::test]
    async fn test_one_order_in_flight() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Manual,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2995)));
        feed.kline(SYMBOL, kline(dec!(2980)));
        feed.kline(SYMBOL, kline(dec!(2970)));
        feed.order(OrderUpdate {
            order_id: "sim-1".into(),
            status: OrderStatus::Finished,
            volume_origin: 1,
            volume_left: 0,
        });
        drop(feed);

        assert!(matches!(ctl.run().await, Err(GatewayError::StreamClosed)));
        assert_eq!(ctl.gateway().submitted().len(), 1);
        assert_eq!(ctl.ladder().target_price(), dec!(2990));
        assert_eq!(ctl.phase(), Phase::Watching);
        assert_eq!(recorder.actions(), vec![TradeAction::OpenRequest, TradeAction::OpenSuccess]);
    }

    #[tokio::test]
    async fn test_unfilled_entry_keeps_rung() {
        let (feed, mut ctl, _recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Manual,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2995)));
        feed.order(OrderUpdate {
            order_id: "sim-1".into(),
            status: OrderStatus::Finished,
            volume_origin: 1,
            volume_left: 1,
        });
        drop(feed);

        assert!(matches!(ctl.run().await, Err(GatewayError::StreamClosed)));
        assert_eq!(ctl.ladder().target_price(), dec!(3000));
    }

    #[tokio::test]
    async fn test_quiet_ticks_do_nothing() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(100)),
            PositionSnapshot::default(),
        );

        for price in [dec!(3005), dec!(3010), dec!(3001), dec!(3200)] {
            feed.kline(SYMBOL, kline(price));
        }
        feed.kline("DCE.m2405", kline(dec!(2000)));
        drop(feed);

        assert!(matches!(ctl.run().await, Err(GatewayError::StreamClosed)));
        assert!(ctl.gateway().submitted().is_empty());
        assert!(recorder.actions().is_empty());
        assert_eq!(ctl.ladder().target_price(), dec!(3000));
    }

    #[tokio::test]
    async fn test_zero_balance_never_enters() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            AccountSnapshot { balance: dec!(0), available: dec!(50), floating_profit: dec!(0) },
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2000)));
        drop(feed);

        assert!(matches!(ctl.run().await, Err(GatewayError::StreamClosed)));
        assert!(ctl.gateway().submitted().is_empty());
        assert!(recorder.actions().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_confirmation_times_out() {
        let mut p = params(Direction::Long, VolumeProgression::FixedIncrement);
        p.confirm_timeout = Some(Duration::from_millis(50));
        let (feed, mut ctl, _recorder) = controller(
            p,
            1,
            FillMode::Manual,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2995)));

        assert!(matches!(ctl.run().await, Err(GatewayError::ConfirmationTimeout { .. })));
        assert_eq!(ctl.phase(), Phase::Entering);
        drop(feed);
    }

    #[tokio::test]
    async fn test_close_when_already_flat() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(700)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(3100)));
        let outcome = ctl.run().await.unwrap();

        assert_eq!(outcome.closed_volume, 0);
        assert!(ctl.gateway().submitted().is_empty());
        assert_eq!(recorder.actions(), vec![TradeAction::CloseSuccess]);
    }

    #[tokio::test]
    async fn test_target_volume_mode_round_trip() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::TargetVolume),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2995)));
        feed.kline(SYMBOL, kline(dec!(2985)));
        feed.account(account(dec!(0.2), dec!(650)));
        feed.kline(SYMBOL, kline(dec!(2985)));

        let outcome = ctl.run().await.unwrap();

        assert_eq!(
            ctl.gateway().targets(),
            &[(SYMBOL.to_string(), 1), (SYMBOL.to_string(), 2), (SYMBOL.to_string(), 0)]
        );
        assert!(ctl.gateway().submitted().is_empty());
        assert_eq!(outcome.entries, 2);
        assert_eq!(outcome.closed_volume, 2);
        assert_eq!(
            recorder.actions(),
            vec![
                TradeAction::OpenRequest,
                TradeAction::OpenSuccess,
                TradeAction::OpenRequest,
                TradeAction::OpenSuccess,
                TradeAction::CloseRequest,
                TradeAction::CloseSuccess,
            ]
        );
    }

    #[tokio::test]
    async fn test_target_volume_waits_for_previous_target() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Short, VolumeProgression::TargetVolume),
            1,
            FillMode::Manual,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(3005)));
        feed.kline(SYMBOL, kline(dec!(3020)));
        assert!(pump(&mut ctl).await.is_none());
        assert_eq!(ctl.gateway().targets(), &[(SYMBOL.to_string(), -1)]);
        assert_eq!(ctl.phase(), Phase::Entering);

        feed.position(SYMBOL, PositionSnapshot { volume_long: 0, volume_short: 1 });
        feed.kline(SYMBOL, kline(dec!(3020)));
        assert!(pump(&mut ctl).await.is_none());

        assert_eq!(
            ctl.gateway().targets(),
            &[(SYMBOL.to_string(), -1), (SYMBOL.to_string(), -2)]
        );
        assert_eq!(ctl.ladder().target_price(), dec!(3020));
        assert_eq!(
            recorder.actions(),
            vec![TradeAction::OpenRequest, TradeAction::OpenSuccess, TradeAction::OpenRequest]
        );
    }

    #[tokio::test]
    async fn test_target_reached_returns_to_watching() {
        let (feed, mut ctl, _recorder) = controller(
            params(Direction::Long, VolumeProgression::TargetVolume),
            2,
            FillMode::Manual,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );

        feed.kline(SYMBOL, kline(dec!(2995)));
        assert!(pump(&mut ctl).await.is_none());
        assert_eq!(ctl.phase(), Phase::Entering);

        feed.position(SYMBOL, PositionSnapshot { volume_long: 2, volume_short: 0 });
        assert!(pump(&mut ctl).await.is_none());
        assert_eq!(ctl.phase(), Phase::Watching);
    }

    #[tokio::test]
    async fn test_partial_close_reports_what_was_closed() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Manual,
            account(dec!(0.1), dec!(550)),
            PositionSnapshot { volume_long: 3, volume_short: 0 },
        );

        feed.kline(SYMBOL, kline(dec!(3050)));
        feed.order(OrderUpdate {
            order_id: "sim-1".into(),
            status: OrderStatus::Finished,
            volume_origin: 3,
            volume_left: 2,
        });

        let outcome = ctl.run().await.unwrap();

        assert_eq!(outcome.closed_volume, 1);
        assert_eq!(outcome.remaining_volume, 2);
        assert_eq!(ctl.phase(), Phase::Terminated);

        let events = recorder.0.lock().unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.action, TradeAction::CloseSuccess);
        assert!(last.message.contains("1 of 3 lots"), "{}", last.message);
        assert!(last.message.contains("2 still open"), "{}", last.message);
    }

    #[tokio::test]
    async fn test_rejected_entry_ends_run_without_advancing() {
        let (feed, mut ctl, recorder) = controller(
            params(Direction::Long, VolumeProgression::FixedIncrement),
            1,
            FillMode::Immediate,
            account(dec!(0.1), dec!(0)),
            PositionSnapshot::default(),
        );
        ctl.gateway_mut().reject_next_order("insufficient margin");

        feed.kline(SYMBOL, kline(dec!(2995)));

        let result = ctl.run().await;
        assert!(matches!(result, Err(GatewayError::Rejected(reason)) if reason == "insufficient margin"));
        assert_eq!(ctl.ladder().target_price(), dec!(3000));
        assert_eq!(ctl.phase(), Phase::Watching);
        assert!(ctl.gateway().submitted().is_empty());
        assert!(recorder.actions().is_empty());
        drop(feed);
    }
}
