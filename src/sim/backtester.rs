//! Backtest run loop
//!
//! Merges the recorded event stream with scheduled simulation events.
//! Exchange-side state advances at exchange timestamps; the strategy's view
//! advances at local timestamps plus the configured observation delay, so
//! the replay carries no lookahead bias. On a timestamp tie the market
//! event dispatches before scheduled events.

use super::{EventQueue, LatencyModel, MatchingEngine, OrderId, OrderStatus, SimEvent};
use crate::book::OrderBookState;
use crate::config::Config;
use crate::data::{load_all, EventKind, EventReader, InputError, MarketEvent, Nanos};
use crate::metrics::{BacktestResult, MetricsAggregator};
use crate::signal::SignalEngine;
use crate::strategy::{Strategy, TickAction, TickCtx};
use std::path::Path;

/// Owns all per-run state and drives one deterministic replay.
pub struct Backtester<S, L> {
    reader: EventReader,
    exch_book: OrderBookState,
    local_book: OrderBookState,
    engine: MatchingEngine,
    signals: SignalEngine,
    queue: EventQueue,
    latency: L,
    strategy: S,
    metrics: MetricsAggregator,
    tick_interval: Nanos,
    clock: Nanos,
    stream_done: bool,
}

impl<S: Strategy, L: LatencyModel> Backtester<S, L> {
    /// Open the data file (and optional initial book snapshot) and assemble
    /// a run. The configuration must already be validated.
    pub fn new(
        config: &Config,
        data_file: &Path,
        snapshot: Option<&Path>,
        strategy: S,
        latency: L,
    ) -> Result<Self, InputError> {
        let reader = EventReader::open(data_file)?;
        let tick_size = config.instrument.tick_size;
        let mut exch_book = OrderBookState::new(tick_size);
        let mut local_book = OrderBookState::new(tick_size);

        if let Some(path) = snapshot {
            let events = load_all(path)?;
            for event in &events {
                let _ = exch_book.apply(event);
                let _ = local_book.apply(event);
            }
            tracing::info!(levels = events.len(), "seeded book from snapshot");
        }

        Ok(Self {
            reader,
            exch_book,
            local_book,
            engine: MatchingEngine::new(
                tick_size,
                config.simulation.fee_rate,
                config.matching.assumed_queue_depth,
            ),
            signals: SignalEngine::new(config.signal.depth_levels, config.signal.trade_window),
            queue: EventQueue::new(),
            latency,
            strategy,
            metrics: MetricsAggregator::new(
                config.simulation.initial_capital,
                config.simulation.tick_interval_ns,
            ),
            tick_interval: config.simulation.tick_interval_ns,
            clock: 0,
            stream_done: false,
        })
    }

    /// Replay to completion. Fatal input errors abort the run; the result
    /// is then tagged incomplete and covers the replayed prefix.
    pub fn run(mut self) -> BacktestResult {
        match self.reader.peek() {
            Ok(Some(first)) => {
                self.clock = first.exch_ts;
                self.queue
                    .schedule(first.exch_ts + self.tick_interval, SimEvent::Tick);
            }
            Ok(None) => return self.finish(Some(InputError::EmptyStream.to_string())),
            Err(err) => return self.finish(Some(err.to_string())),
        }

        loop {
            let next_market_ts = if self.stream_done {
                None
            } else {
                match self.reader.peek() {
                    Ok(Some(event)) => Some(event.exch_ts),
                    Ok(None) => {
                        self.stream_done = true;
                        None
                    }
                    Err(err) => {
                        let reason = err.to_string();
                        tracing::error!(error = %reason, "replay aborted on malformed input");
                        return self.finish(Some(reason));
                    }
                }
            };

            let take_market = match (next_market_ts, self.queue.next_time()) {
                (Some(market_ts), Some(sched_ts)) => market_ts <= sched_ts,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if take_market {
                let event = match self.reader.next_event() {
                    Ok(Some(event)) => event,
                    Ok(None) => {
                        self.stream_done = true;
                        continue;
                    }
                    Err(err) => return self.finish(Some(err.to_string())),
                };
                self.clock = event.exch_ts;
                self.on_exchange_event(&event);
            } else {
                let Some((ts, event)) = self.queue.pop() else {
                    break;
                };
                self.clock = ts;
                match event {
                    SimEvent::LocalMarket(market_event) => self.on_local_event(&market_event),
                    SimEvent::Tick => {
                        if let Err(err) = self.on_tick() {
                            let reason = format!("strategy failed: {err}");
                            tracing::error!(error = %reason, "replay aborted");
                            return self.finish(Some(reason));
                        }
                    }
                    SimEvent::OrderArrival(id) => self.on_order_arrival(id),
                    SimEvent::CancelArrival(id) => self.on_cancel_arrival(id),
                }
            }
        }

        self.finish(None)
    }

    /// Apply one market event on the exchange side: match against the
    /// strategy's resting orders first (queue accounting needs the pre-event
    /// book), then mutate the book, then schedule the strategy-side
    /// observation.
    fn on_exchange_event(&mut self, event: &MarketEvent) {
        let fills = self.engine.on_event(event, &self.exch_book, self.clock);
        for fill in &fills {
            tracing::debug!(
                order_id = fill.order_id,
                price = fill.price,
                qty = fill.qty,
                "order filled"
            );
            self.metrics.record_fill(fill);
        }

        if let Err(err) = self.exch_book.apply(event) {
            tracing::debug!(%err, "tolerated book inconsistency");
        }

        let observe_at = event.local_ts + self.latency.market_observation_delay();
        self.queue
            .schedule(observe_at.max(self.clock), SimEvent::LocalMarket(*event));
    }

    fn on_local_event(&mut self, event: &MarketEvent) {
        if let Err(err) = self.local_book.apply(event) {
            tracing::debug!(%err, "tolerated book inconsistency on local view");
        }
        if event.kind == EventKind::Trade {
            self.signals.record_trade(event.side, event.qty);
        }
    }

    fn on_tick(&mut self) -> anyhow::Result<()> {
        self.engine.clear_inactive();

        let snapshot = self.signals.snapshot(&self.local_book);
        let position = self.engine.position();
        self.metrics
            .record_tick(self.clock, &position, self.local_book.mid_price());

        let mut ctx = TickCtx::new(self.clock, &self.local_book, &snapshot, &mut self.engine);
        self.strategy.on_tick(&mut ctx)?;

        for action in ctx.into_actions() {
            let arrival = self.clock + self.latency.exchange_ack_delay();
            match action {
                TickAction::Submit(id) => {
                    self.metrics.note_submitted();
                    self.queue.schedule(arrival, SimEvent::OrderArrival(id));
                }
                TickAction::Cancel(id) => {
                    self.queue.schedule(arrival, SimEvent::CancelArrival(id));
                }
            }
        }

        if !self.stream_done {
            self.queue
                .schedule(self.clock + self.tick_interval, SimEvent::Tick);
        }
        Ok(())
    }

    fn on_order_arrival(&mut self, id: OrderId) {
        let fills = self.engine.activate(id, &mut self.exch_book, self.clock);
        for fill in &fills {
            self.metrics.record_fill(fill);
        }
        if self
            .engine
            .order(id)
            .is_some_and(|o| o.status == OrderStatus::Rejected)
        {
            self.metrics.note_rejected();
        }
    }

    fn on_cancel_arrival(&mut self, id: OrderId) {
        if self.engine.apply_cancel(id, self.clock) {
            self.metrics.note_cancelled();
        } else {
            tracing::debug!(order_id = id, "cancel arrived after terminal state");
        }
    }

    fn finish(self, error: Option<String>) -> BacktestResult {
        let position = self.engine.position();
        let final_mark = self.exch_book.mid_price();
        let result = self
            .metrics
            .finalize(&position, final_mark, self.clock, error);
        tracing::info!(
            net_pnl = result.summary.net_pnl,
            fills = result.summary.total_fills,
            complete = result.complete,
            "backtest finished"
        );
        result
    }
}
