//! Backtest performance metrics

/// Largest peak-to-trough decline of an equity curve, in percent.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0;
    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak * 100.0;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Sharpe ratio over per-trade percent returns (zero risk-free rate,
/// population standard deviation). Zero when returns do not vary.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        0.0
    } else {
        mean / std_dev
    }
}

/// Gross profit over gross loss.
///
/// `None` when there are profits but no losses (an infinite factor);
/// `Some(0.0)` when there are no profits either.
pub fn profit_factor(returns: &[f64]) -> Option<f64> {
    let gross_profit: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| -r).sum();
    if gross_loss > 0.0 {
        Some(gross_profit / gross_loss)
    } else if gross_profit > 0.0 {
        None
    } else {
        Some(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_drawdown() {
        assert_eq!(max_drawdown(&[100.0, 120.0, 90.0, 130.0]), 25.0);
        assert_eq!(max_drawdown(&[100.0, 110.0, 120.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_ratio() {
        assert_eq!(sharpe_ratio(&[]), 0.0);
        assert_eq!(sharpe_ratio(&[5.0, 5.0, 5.0]), 0.0);
        // mean 1, population std 1 over [0, 2]
        assert!((sharpe_ratio(&[0.0, 2.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_profit_factor() {
        assert_eq!(profit_factor(&[10.0, -5.0]), Some(2.0));
        assert_eq!(profit_factor(&[10.0, 5.0]), None);
        assert_eq!(profit_factor(&[-10.0]), Some(0.0));
        assert_eq!(profit_factor(&[]), Some(0.0));
    }
}
