use std::f64::consts::PI;
use crate::types::Black76Inputs;
use instrument::OptionType;

/// Shortest time to expiry fed to the model, in years.
pub const MIN_TIME: f64 = 1e-8;

pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz-Stegun 26.2.17).
///
/// `norm_cdf(x) + norm_cdf(-x) == 1` holds exactly.
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.2316419 * x.abs());
    let poly = k * (0.319381530
        + k * (-0.356563782
        + k * (1.781477937
        + k * (-1.821255978
        + k * 1.330274429))));

    let approx = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 {
        approx
    } else {
        1.0 - approx
    }
}

pub fn d1_d2(input: &Black76Inputs) -> (f64, f64) {
    let f = input.forward;
    let k = input.strike;
    let t = input.time.max(MIN_TIME);
    let v = input.vol;

    let vol_sqrt_t = v * t.sqrt();
    let d1 = ((f / k).ln() + 0.5 * v * v * t) / vol_sqrt_t;
    let d2 = d1 - vol_sqrt_t;

    (d1, d2)
}

/// Forward implied by a spot price under continuous compounding.
pub fn forward_from_spot(spot: f64, rate: f64, time: f64) -> f64 {
    spot * (rate * time).exp()
}

/// Black-76 price of a European option on a forward.
///
/// Inputs are expected positive; time is floored at [`MIN_TIME`].
pub fn black76_price(input: Black76Inputs) -> f64 {
    let (d1, d2) = d1_d2(&input);
    let f = input.forward;
    let k = input.strike;
    let t = input.time.max(MIN_TIME);
    let discount = (-input.rate * t).exp();

    let price = match input.option_type {
        OptionType::Call => discount * (f * norm_cdf(d1) - k * norm_cdf(d2)),
        OptionType::Put => discount * (k * norm_cdf(-d2) - f * norm_cdf(-d1)),
    };

    price.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intrinsic_value(forward: f64, strike: f64, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => (forward - strike).max(0.0),
            OptionType::Put => (strike - forward).max(0.0),
        }
    }

    fn inputs(forward: f64, strike: f64, option_type: OptionType) -> Black76Inputs {
        Black76Inputs {
            forward,
            strike,
            time: 30.0 / 365.0,
            vol: 0.5,
            rate: 0.0,
            option_type,
        }
    }

    #[test]
    fn test_call_price_itm() {
        let price = black76_price(inputs(60000.0, 50000.0, OptionType::Call));
        assert!(price >= 10000.0);
    }

    #[test]
    fn test_put_price_otm() {
        let price = black76_price(inputs(60000.0, 50000.0, OptionType::Put));
        assert!(price > 0.0 && price < 1000.0);
    }

    #[test]
    fn test_put_call_parity() {
        for (forward, strike, rate, vol, time) in [
            (50000.0, 50000.0, 0.0, 0.5, 30.0 / 365.0),
            (97000.0, 95000.0, 0.05, 0.45, 0.25),
            (90000.0, 110000.0, 0.02, 0.8, 1.5),
        ] {
            let call = black76_price(Black76Inputs {
                forward, strike, time, vol, rate,
                option_type: OptionType::Call,
            });
            let put = black76_price(Black76Inputs {
                forward, strike, time, vol, rate,
                option_type: OptionType::Put,
            });

            let parity_rhs = (-rate * time).exp() * (forward - strike);
            assert!(
                (call - put - parity_rhs).abs() < 1e-6 * forward,
                "parity broken for F={forward} K={strike}: {} vs {}",
                call - put,
                parity_rhs
            );
        }
    }

    #[test]
    fn test_atm_call_matches_closed_form() {
        // At the money with r = 0: C = F * (2 * N(0.5 * sigma * sqrt(t)) - 1)
        let input = inputs(50000.0, 50000.0, OptionType::Call);
        let half = 0.5 * input.vol * input.time.sqrt();
        let expected = 50000.0 * (2.0 * norm_cdf(half) - 1.0);
        assert!((black76_price(input) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_discounting() {
        let undiscounted = black76_price(inputs(50000.0, 50000.0, OptionType::Call));
        let discounted = black76_price(Black76Inputs {
            rate: 0.05,
            time: 30.0 / 365.0,
            ..inputs(50000.0, 50000.0, OptionType::Call)
        });
        let factor = (-0.05_f64 * 30.0 / 365.0).exp();
        assert!((discounted - undiscounted * factor).abs() < 1e-6);
    }

    #[test]
    fn test_forward_from_spot() {
        assert_eq!(forward_from_spot(100.0, 0.0, 1.0), 100.0);
        assert!((forward_from_spot(100.0, 0.05, 1.0) - 105.127109).abs() < 1e-6);
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        assert!((norm_cdf(0.5) + norm_cdf(-0.5) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_norm_cdf_extreme() {
        assert!((norm_cdf(10.0) - 1.0).abs() < 1e-10);
        assert!(norm_cdf(-10.0).abs() < 1e-10);
    }

    #[test]
    fn test_near_expiry_converges_to_intrinsic() {
        let input = Black76Inputs {
            time: 0.0,
            ..inputs(60000.0, 50000.0, OptionType::Call)
        };

        let price = black76_price(input);
        let intrinsic = intrinsic_value(60000.0, 50000.0, OptionType::Call);

        assert!(price.is_finite());
        assert!((price - intrinsic).abs() < 1.0);
    }

    #[test]
    fn test_deep_itm_call() {
        let price = black76_price(inputs(100000.0, 10000.0, OptionType::Call));
        let intrinsic = intrinsic_value(100000.0, 10000.0, OptionType::Call);
        assert!(price > intrinsic * 0.99);
    }
}
