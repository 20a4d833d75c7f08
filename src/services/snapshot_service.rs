use chrono::Utc;

use crate::{
    models::{Holding, HoldingWithPrice, PortfolioSnapshot, PriceAlert},
    services::{
        price_cache::PriceSnapshot,
        store::{Store, StoreError},
    },
};

/// Rounds to 2 decimals, half away from zero on the scaled value.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

struct Valuation {
    market_value: f64,
    cost_basis: f64,
}

fn valuation(h: &Holding, price: f64) -> Valuation {
    Valuation {
        market_value: h.quantity * price,
        cost_basis: h.quantity * h.avg_cost,
    }
}

/// Values one holding at `price`. An unknown price is passed in as 0 and
/// shows up as a full loss.
pub fn value_holding(h: Holding, price: f64) -> HoldingWithPrice {
    let v = valuation(&h, price);
    let pnl = v.market_value - v.cost_basis;
    let pnl_pct = if v.cost_basis > 0.0 {
        (pnl / v.cost_basis) * 100.0
    } else {
        0.0
    };

    HoldingWithPrice {
        holding: h,
        price: round2(price),
        market_value: round2(v.market_value),
        cost_basis: round2(v.cost_basis),
        pnl: round2(pnl),
        pnl_pct: round2(pnl_pct),
    }
}

/// Whether an untriggered alert should fire at the current prices.
pub fn should_fire(alert: &PriceAlert, prices: &PriceSnapshot) -> bool {
    if alert.triggered {
        return false;
    }

    match prices.get(&alert.price_key()) {
        Some(price) if price > 0.0 => alert.direction.is_hit(price, alert.threshold),
        _ => false,
    }
}

/// Joins holdings, alerts and prices into a snapshot, persisting any alert
/// that fires.
///
/// Listing failures abort the build. A failure to persist one trigger is
/// logged and that alert is left for the next build.
pub async fn build_snapshot(
    store: &dyn Store,
    prices: &PriceSnapshot,
) -> Result<PortfolioSnapshot, StoreError> {
    let holdings = store.list_holdings().await?;
    let alerts = store.list_alerts().await?;

    let updated_at = Utc::now();

    let mut total_value = 0.0;
    let mut total_cost = 0.0;
    let mut rows: Vec<HoldingWithPrice> = Vec::with_capacity(holdings.len());

    for h in holdings {
        let price = prices.get(&h.price_key()).unwrap_or(0.0);

        // totals accumulate unrounded values and are rounded once at the end
        let v = valuation(&h, price);
        total_value += v.market_value;
        total_cost += v.cost_basis;

        rows.push(value_holding(h, price));
    }

    let mut alerts_fired: Vec<PriceAlert> = vec![];
    for mut alert in alerts {
        if !should_fire(&alert, prices) {
            continue;
        }

        let now = Utc::now();
        match store.mark_alert_triggered(alert.id, now).await {
            Ok(true) => {
                tracing::info!(
                    "alert fired: id={} {} {} {}",
                    alert.id,
                    alert.price_key(),
                    alert.direction.as_str(),
                    alert.threshold
                );
                alert.mark_triggered(now);
                alerts_fired.push(alert);
            }
            // another run got there first
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("failed to mark alert triggered: id={} err={}", alert.id, e);
            }
        }
    }

    Ok(PortfolioSnapshot {
        holdings: rows,
        total_value: round2(total_value),
        total_cost: round2(total_cost),
        total_pnl: round2(total_value - total_cost),
        updated_at,
        alerts_fired,
    })
}
