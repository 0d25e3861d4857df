//! Core configuration
//!
//! All settings can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | COMEDOR_TIMEZONE | America/Santo_Domingo | Business timezone |
//! | NO_SHOW_TOLERANCE_MINUTES | 15 | Grace window past reservation start |
//! | DEFAULT_RESERVATION_MINUTES | 120 | Duration when the request omits one |
//! | INVOICE_PREFIX | FAC | Invoice number prefix |

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Business timezone; invoice numbering dates follow it
    pub timezone: Tz,
    /// Minutes past start time before a reservation may be marked no-show
    pub no_show_tolerance_minutes: i64,
    /// Reservation duration when the request does not specify one
    pub default_reservation_minutes: i64,
    /// Invoice number prefix
    pub invoice_prefix: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Santo_Domingo,
            no_show_tolerance_minutes: 15,
            default_reservation_minutes: 120,
            invoice_prefix: "FAC".to_string(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timezone: std::env::var("COMEDOR_TIMEZONE")
                .ok()
                .and_then(|tz| {
                    tz.parse::<Tz>()
                        .map_err(|e| {
                            tracing::warn!(timezone = %tz, error = %e, "Invalid COMEDOR_TIMEZONE, using default");
                        })
                        .ok()
                })
                .unwrap_or(defaults.timezone),
            no_show_tolerance_minutes: std::env::var("NO_SHOW_TOLERANCE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.no_show_tolerance_minutes),
            default_reservation_minutes: std::env::var("DEFAULT_RESERVATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_reservation_minutes),
            invoice_prefix: std::env::var("INVOICE_PREFIX")
                .unwrap_or(defaults.invoice_prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.timezone, chrono_tz::America::Santo_Domingo);
        assert_eq!(config.no_show_tolerance_minutes, 15);
        assert_eq!(config.default_reservation_minutes, 120);
        assert_eq!(config.invoice_prefix, "FAC");
    }
}
