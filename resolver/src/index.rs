use crate::records::{AgentRecord, TariffRecord};
use indexmap::IndexMap;

/// Approximate share of taxes embedded in a residential bill. Fixed
/// business rule, not configurable.
const EMBEDDED_TAX_RATE: f64 = 0.25;

/// Sums the two per-MWh components, converts to per-kWh and grosses up
/// by the embedded-tax factor.
pub fn tariff_per_kwh(energy_mwh: f64, usage_mwh: f64) -> f64 {
    (energy_mwh + usage_mwh) / 1000.0 * (1.0 / (1.0 - EMBEDDED_TAX_RATE))
}

/// The two lookup tables driving distributor selection, built once per
/// load cycle and immutable afterwards.
#[derive(Debug, Default)]
pub struct ResolvedTariffs {
    distributors_by_state: IndexMap<String, Vec<String>>,
    tariff_by_distributor: IndexMap<String, f64>,
}

impl ResolvedTariffs {
    /// Folds the two raw record sets into the lookup tables.
    ///
    /// Tariff records must arrive in descending effective-date order;
    /// the first record seen for a distributor wins and later (older,
    /// or same-date) records for that code are ignored. Distributor
    /// codes are deduplicated per state in first-sight order.
    pub fn from_records(agents: &[AgentRecord], tariffs: &[TariffRecord]) -> Self {
        let mut resolved = Self::default();

        for record in tariffs {
            let Some(agent) = non_empty(&record.agent) else {
                continue;
            };
            if !record.is_residential_conventional() {
                continue;
            }
            resolved
                .tariff_by_distributor
                .entry(agent.to_string())
                .or_insert_with(|| tariff_per_kwh(record.energy.as_mwh(), record.usage.as_mwh()));
        }

        for record in agents {
            let (Some(state), Some(agent)) = (non_empty(&record.state), non_empty(&record.agent))
            else {
                continue;
            };
            if !record.is_distribution() {
                continue;
            }
            let codes = resolved
                .distributors_by_state
                .entry(state.to_string())
                .or_default();
            if !codes.iter().any(|code| code == agent) {
                codes.push(agent.to_string());
            }
        }

        resolved
    }

    /// State codes with at least one distributor, sorted.
    pub fn states(&self) -> Vec<&str> {
        let mut states: Vec<&str> = self
            .distributors_by_state
            .keys()
            .map(String::as_str)
            .collect();
        states.sort_unstable();
        states
    }

    /// Distributor codes for a state, sorted. Only distributors with a
    /// known tariff are offered.
    pub fn distributors(&self, state: &str) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .distributors_by_state
            .get(state)
            .map(|codes| {
                codes
                    .iter()
                    .map(String::as_str)
                    .filter(|code| self.tariff_by_distributor.contains_key(*code))
                    .collect()
            })
            .unwrap_or_default();
        codes.sort_unstable();
        codes
    }

    /// Tax-adjusted per-kWh tariff for a distributor code.
    pub fn tariff(&self, distributor: &str) -> Option<f64> {
        self.tariff_by_distributor.get(distributor).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.distributors_by_state.is_empty() && self.tariff_by_distributor.is_empty()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(state: &str, code: &str) -> AgentRecord {
        serde_json::from_str(&format!(r#"{{"SigUF": "{state}", "SigAgente": "{code}"}}"#)).unwrap()
    }

    fn tariff(code: &str, te: &str, tusd: &str, date: &str) -> TariffRecord {
        serde_json::from_str(&format!(
            r#"{{"SigAgente": "{code}", "VlrTE": "{te}", "VlrTUSD": "{tusd}", "DatVigencia": "{date}"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn duplicate_distributors_collapse_per_state() {
        let agents = vec![agent("SP", "X"), agent("SP", "X"), agent("RJ", "Y")];
        let tariffs = vec![
            tariff("X", "100", "50", "2024-02-01"),
            tariff("Y", "100", "50", "2024-02-01"),
        ];
        let resolved = ResolvedTariffs::from_records(&agents, &tariffs);
        assert_eq!(resolved.states(), vec!["RJ", "SP"]);
        assert_eq!(resolved.distributors("SP"), vec!["X"]);
        assert_eq!(resolved.distributors("RJ"), vec!["Y"]);
    }

    #[test]
    fn most_recent_tariff_wins() {
        let tariffs = vec![
            tariff("X", "100", "50", "2024-02-01"),
            tariff("X", "10", "5", "2024-01-01"),
        ];
        let resolved = ResolvedTariffs::from_records(&[], &tariffs);
        let value = resolved.tariff("X").unwrap();
        assert!((value - 0.2).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn same_date_records_keep_first_seen() {
        let tariffs = vec![
            tariff("X", "100", "50", "2024-02-01"),
            tariff("X", "999", "999", "2024-02-01"),
        ];
        let resolved = ResolvedTariffs::from_records(&[], &tariffs);
        let value = resolved.tariff("X").unwrap();
        assert!((value - 0.2).abs() < 1e-9);
    }

    #[test]
    fn distributor_without_tariff_is_not_offered() {
        let agents = vec![agent("SP", "X"), agent("SP", "Z")];
        let tariffs = vec![tariff("X", "100", "50", "2024-02-01")];
        let resolved = ResolvedTariffs::from_records(&agents, &tariffs);
        assert_eq!(resolved.distributors("SP"), vec!["X"]);
        assert_eq!(resolved.tariff("Z"), None);
    }

    #[test]
    fn non_b1_records_are_skipped() {
        let tariffs: Vec<TariffRecord> = vec![
            serde_json::from_str(
                r#"{"SigAgente": "X", "VlrTE": "100", "VlrTUSD": "50", "DscSubGrupo": "A4"}"#,
            )
            .unwrap(),
            serde_json::from_str(
                r#"{"SigAgente": "X", "VlrTE": "10", "VlrTUSD": "5", "DscSubGrupo": "B1"}"#,
            )
            .unwrap(),
        ];
        let resolved = ResolvedTariffs::from_records(&[], &tariffs);
        let value = resolved.tariff("X").unwrap();
        assert!((value - 0.02).abs() < 1e-9);
    }

    #[test]
    fn malformed_price_counts_as_zero_component() {
        let tariffs = vec![tariff("X", "abc", "50", "2024-02-01")];
        let resolved = ResolvedTariffs::from_records(&[], &tariffs);
        let value = resolved.tariff("X").unwrap();
        let expected = 50.0 / 1000.0 * (1.0 / 0.75);
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn blank_codes_are_ignored() {
        let agents: Vec<AgentRecord> = vec![
            serde_json::from_str(r#"{"SigUF": "", "SigAgente": "X"}"#).unwrap(),
            serde_json::from_str(r#"{"SigUF": "SP"}"#).unwrap(),
        ];
        let resolved = ResolvedTariffs::from_records(&agents, &[]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn formula_matches_reference_value() {
        // (100 + 50) / 1000 * (1 / 0.75) = 0.2
        assert!((tariff_per_kwh(100.0, 50.0) - 0.2).abs() < 1e-9);
    }
}
