//! Instrument catalog and strike resolution.
//!
//! The catalog holds the instruments listed for one expiry. It is built once
//! at startup from the exchange listing and never refreshed during a run.

use common::ExpiryCode;
use ordered_float::OrderedFloat;
use tracing::{debug, info, instrument};

use crate::error::{InstrumentError, InstrumentResult};
use crate::types::{ListedInstrument, OptionType, ResolvedTarget};

/// Instruments listed for a single underlying and expiry.
#[derive(Debug, Clone)]
pub struct InstrumentCatalog {
    expiry: ExpiryCode,
    instruments: Vec<ListedInstrument>,
}

impl InstrumentCatalog {
    /// Build a catalog from an exchange listing, keeping only the instruments
    /// of `expiry`.
    pub fn new(expiry: ExpiryCode, listing: impl IntoIterator<Item = ListedInstrument>) -> Self {
        let instruments: Vec<ListedInstrument> = listing
            .into_iter()
            .filter(|inst| expiry.matches_instrument(inst.id.as_str()))
            .collect();

        debug!(
            expiry = %expiry,
            count = instruments.len(),
            "Instrument catalog built"
        );

        Self { expiry, instruments }
    }

    pub fn expiry(&self) -> &ExpiryCode {
        &self.expiry
    }

    pub fn instruments(&self) -> &[ListedInstrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Resolve a requested strike and side to a listed instrument.
    ///
    /// Returns the instrument with exactly that strike when listed, otherwise
    /// the one of the same side with the smallest absolute strike distance.
    /// Equidistant candidates resolve to the smaller strike.
    pub fn resolve(
        &self,
        strike: f64,
        option_type: OptionType,
    ) -> InstrumentResult<ResolvedTarget> {
        if strike.is_nan() || strike <= 0.0 {
            return Err(InstrumentError::InvalidStrike(strike));
        }
        if self.instruments.is_empty() {
            return Err(InstrumentError::NoInstrumentsListed {
                expiry: self.expiry.to_string(),
            });
        }

        let candidates = self
            .instruments
            .iter()
            .filter(|inst| inst.option_type == option_type);

        let closest = candidates
            .min_by_key(|inst| {
                (
                    OrderedFloat((inst.strike - strike).abs()),
                    OrderedFloat(inst.strike),
                    inst.id.clone(),
                )
            })
            .ok_or_else(|| InstrumentError::NoInstrumentsForSide {
                expiry: self.expiry.to_string(),
                option_type,
            })?;

        Ok(ResolvedTarget {
            requested_strike: strike,
            option_type,
            instrument: closest.clone(),
            is_standard: closest.strike == strike,
        })
    }

    /// Resolve every distinct requested strike for both sides.
    ///
    /// Targets come back in request order, call before put. Any failure
    /// aborts the whole resolution.
    #[instrument(skip(self), fields(expiry = %self.expiry))]
    pub fn resolve_all(&self, strikes: &[f64]) -> InstrumentResult<Vec<ResolvedTarget>> {
        let mut seen: Vec<f64> = Vec::with_capacity(strikes.len());
        let mut targets = Vec::with_capacity(strikes.len() * 2);

        for &strike in strikes {
            if seen.contains(&strike) {
                continue;
            }
            seen.push(strike);

            for option_type in OptionType::ALL {
                let target = self.resolve(strike, option_type)?;
                if target.is_standard {
                    debug!(
                        strike,
                        %option_type,
                        instrument = %target.instrument.id,
                        "Standard instrument"
                    );
                } else {
                    info!(
                        strike,
                        %option_type,
                        closest = %target.instrument.id,
                        distance = target.strike_distance(),
                        "Strike not listed, closest instrument used"
                    );
                }
                targets.push(target);
            }
        }

        Ok(targets)
    }
}
