use technical_analysis::{levels_summary, technical_target, TechnicalTarget, LEVELS_RANGE};
use watchlist_core::{Direction, FetchError, PriceSource, Symbol};

/// Nearest support (sell) or resistance (buy) from recent daily bars.
pub async fn suggest_target(
    source: &dyn PriceSource,
    symbol: &Symbol,
    direction: Direction,
) -> Result<Option<TechnicalTarget>, FetchError> {
    let bars = source.daily_bars(symbol, LEVELS_RANGE).await?;
    Ok(technical_target(&bars, direction))
}

pub async fn analyze(source: &dyn PriceSource, symbol: &Symbol) -> Result<String, FetchError> {
    let bars = source.daily_bars(symbol, LEVELS_RANGE).await?;
    Ok(levels_summary(symbol.as_str(), &bars))
}
