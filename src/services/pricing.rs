use serde::Serialize;

use crate::models::booking::{BinSelection, ServiceTier};

/// Price list, amounts in pence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCatalog {
    /// One-off price by number of wheelie bins (index 0 is one bin).
    pub one_off_bins: Vec<u32>,
    pub one_off_caddy: u32,
    pub monthly_all_bins: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub description: String,
    pub amount_pence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub service: ServiceTier,
    pub lines: Vec<QuoteLine>,
    pub total_pence: u32,
}

impl Default for PriceCatalog {
    fn default() -> Self {
        Self {
            one_off_bins: vec![800, 1600, 1800],
            one_off_caddy: 200,
            monthly_all_bins: 1500,
        }
    }
}

impl PriceCatalog {
    /// Estimate the price of a booking.
    ///
    /// Returns `None` when nothing is selected or the tier is priced on
    /// enquiry (the 6 clean package).
    pub fn quote(&self, bins: &BinSelection, service: ServiceTier) -> Option<Quote> {
        if bins.is_empty() {
            return None;
        }

        let lines = match service {
            ServiceTier::OneOff => {
                let wheelie = bins.iter().filter(|bin| bin.is_wheelie()).count();
                let mut lines = Vec::new();
                if wheelie > 0 {
                    let index = wheelie.min(self.one_off_bins.len()).saturating_sub(1);
                    lines.push(QuoteLine {
                        description: match wheelie {
                            1 => "1 Bin".to_string(),
                            n => format!("{} Bins", n),
                        },
                        amount_pence: *self.one_off_bins.get(index)?,
                    });
                }
                if bins.iter().any(|bin| !bin.is_wheelie()) {
                    lines.push(QuoteLine {
                        description: "Food Caddy".to_string(),
                        amount_pence: self.one_off_caddy,
                    });
                }
                lines
            }
            ServiceTier::MonthlyClean => vec![QuoteLine {
                description: "Monthly Plan (All Bins)".to_string(),
                amount_pence: self.monthly_all_bins,
            }],
            ServiceTier::SixClean => return None,
        };

        let total_pence = lines.iter().map(|line| line.amount_pence).sum();
        Some(Quote {
            service,
            lines,
            total_pence,
        })
    }
}
