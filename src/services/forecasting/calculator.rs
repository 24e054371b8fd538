//! Closed-form demand projection.
//!
//! Everything here is pure: no I/O, no clock, no randomness. Given the same
//! history, horizon and reference date the output is identical.

use crate::config::MAX_HORIZON_DAYS;
use crate::errors::ServiceError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of most recent observations averaged for the baseline.
pub const MOVING_AVERAGE_WINDOW: usize = 7;

const NO_DATA_NOTE: &str = "no historical data";

/// Aggregated demand for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandObservation {
    pub date: NaiveDate,
    pub quantity: i64,
}

impl DemandObservation {
    pub fn new(date: NaiveDate, quantity: i64) -> Self {
        Self { date, quantity }
    }
}

/// Projected demand for one future day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_demand: i32,
    pub confidence: f64,
}

/// Descriptive statistics behind a forecast run, persisted alongside every row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastFactors {
    pub moving_average: f64,
    pub trend: f64,
    /// Mean demand per weekday present in the history, keyed by lowercase weekday name
    pub seasonal_patterns: BTreeMap<String, f64>,
    pub historical_days: usize,
    pub average_daily_demand: f64,
    pub standard_deviation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub forecasts: Vec<ForecastPoint>,
    pub confidence: f64,
    pub factors: ForecastFactors,
}

impl ForecastResult {
    /// Result for an item without any order history; never persisted.
    pub fn no_data() -> Self {
        Self {
            forecasts: Vec::new(),
            confidence: 0.0,
            factors: ForecastFactors {
                note: Some(NO_DATA_NOTE.to_string()),
                ..ForecastFactors::default()
            },
        }
    }

    pub fn has_data(&self) -> bool {
        !self.forecasts.is_empty()
    }

    pub fn total_predicted_demand(&self) -> i64 {
        self.forecasts
            .iter()
            .map(|p| i64::from(p.predicted_demand))
            .sum()
    }
}

/// Projects `horizon_days` days of demand starting the day after `today`.
pub fn calculate_forecast(
    history: &[DemandObservation],
    horizon_days: u32,
    today: NaiveDate,
) -> Result<ForecastResult, ServiceError> {
    if horizon_days == 0 || horizon_days > MAX_HORIZON_DAYS {
        return Err(ServiceError::ComputationError(format!(
            "forecast horizon must be between 1 and {} days, got {}",
            MAX_HORIZON_DAYS, horizon_days
        )));
    }
    if history.is_empty() {
        return Ok(ForecastResult::no_data());
    }

    let quantities: Vec<f64> = history.iter().map(|o| o.quantity as f64).collect();
    let moving_average = moving_average(&quantities, MOVING_AVERAGE_WINDOW);
    let trend = trend_slope(&quantities);
    let seasonal = SeasonalProfile::from_history(history);
    let (mean, standard_deviation) = mean_and_std_dev(&quantities);
    let confidence = confidence_level(mean, standard_deviation);

    let forecasts = (1..=horizon_days)
        .map(|offset| {
            let date = today + Duration::days(i64::from(offset));
            let mut base = moving_average + trend * f64::from(offset);
            if let Some(index) = seasonal.index_for(date.weekday()) {
                base *= index;
            }
            ForecastPoint {
                date,
                predicted_demand: base.max(0.0).round() as i32,
                confidence,
            }
        })
        .collect();

    Ok(ForecastResult {
        forecasts,
        confidence,
        factors: ForecastFactors {
            moving_average,
            trend,
            seasonal_patterns: seasonal.to_named_map(),
            historical_days: history.len(),
            average_daily_demand: mean,
            standard_deviation,
            note: None,
        },
    })
}

/// Mean of the last `window` values, or of all of them when fewer exist.
pub fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() || window == 0 {
        return 0.0;
    }
    let tail = &values[values.len().saturating_sub(window)..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Ordinary least-squares slope of the values against their index.
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denominator
}

/// Population mean and standard deviation.
pub fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// `1 - stdDev/mean` clamped to `[0, 1]`; a zero mean yields 0.
pub fn confidence_level(mean: f64, standard_deviation: f64) -> f64 {
    let cv = if mean == 0.0 {
        1.0
    } else {
        standard_deviation / mean
    };
    (1.0 - cv).clamp(0.0, 1.0)
}

/// Mean demand per weekday, only for weekdays that occur in the history.
#[derive(Debug, Clone, Default)]
struct SeasonalProfile {
    factors: [Option<f64>; 7],
    mean_factor: f64,
}

impl SeasonalProfile {
    fn from_history(history: &[DemandObservation]) -> Self {
        let mut sums = [(0.0_f64, 0_u32); 7];
        for obs in history {
            let slot = &mut sums[obs.date.weekday().num_days_from_monday() as usize];
            slot.0 += obs.quantity as f64;
            slot.1 += 1;
        }

        let mut factors = [None; 7];
        for (factor, (sum, count)) in factors.iter_mut().zip(sums.iter()) {
            if *count > 0 {
                *factor = Some(sum / f64::from(*count));
            }
        }

        let present: Vec<f64> = factors.iter().flatten().copied().collect();
        let mean_factor = if present.is_empty() {
            0.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };

        Self {
            factors,
            mean_factor,
        }
    }

    /// Multiplier for a target weekday; `None` leaves the baseline untouched.
    fn index_for(&self, weekday: Weekday) -> Option<f64> {
        if self.mean_factor == 0.0 {
            return None;
        }
        self.factors[weekday.num_days_from_monday() as usize].map(|f| f / self.mean_factor)
    }

    fn to_named_map(&self) -> BTreeMap<String, f64> {
        self.factors
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.map(|value| (weekday_name(i).to_string(), value)))
            .collect()
    }
}

fn weekday_name(days_from_monday: usize) -> &'static str {
    match days_from_monday {
        0 => "monday",
        1 => "tuesday",
        2 => "wednesday",
        3 => "thursday",
        4 => "friday",
        5 => "saturday",
        _ => "sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Consecutive daily observations ending the day before `today`.
    fn series(today: NaiveDate, quantities: &[i64]) -> Vec<DemandObservation> {
        let n = quantities.len() as i64;
        quantities
            .iter()
            .enumerate()
            .map(|(i, q)| DemandObservation::new(today - Duration::days(n - i as i64), *q))
            .collect()
    }

    const EPS: f64 = 1e-9;

    #[test]
    fn moving_average_uses_only_last_seven() {
        let values = [100.0, 100.0, 100.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert!((moving_average(&values, MOVING_AVERAGE_WINDOW) - 4.0).abs() < EPS);
    }

    #[test]
    fn moving_average_short_series_uses_everything() {
        assert!((moving_average(&[3.0, 6.0, 9.0], MOVING_AVERAGE_WINDOW) - 6.0).abs() < EPS);
    }

    #[rstest]
    #[case(5.0, 2.0, 10)]
    #[case(40.0, -3.0, 12)]
    #[case(0.0, 0.5, 30)]
    fn trend_matches_linear_step(#[case] start: f64, #[case] step: f64, #[case] len: usize) {
        let values: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
        assert!((trend_slope(&values) - step).abs() < 1e-9);
    }

    #[test]
    fn trend_is_zero_for_single_point() {
        assert_eq!(trend_slope(&[42.0]), 0.0);
        assert_eq!(trend_slope(&[]), 0.0);
    }

    #[test]
    fn confidence_is_zero_when_mean_is_zero() {
        let (mean, std_dev) = mean_and_std_dev(&[0.0, 0.0, 0.0]);
        assert_eq!(confidence_level(mean, std_dev), 0.0);
    }

    #[rstest]
    #[case(&[10.0, 10.0, 10.0, 10.0], 1.0)]
    #[case(&[1.0, 3.0], 0.5)]
    #[case(&[0.0, 0.0, 0.0, 12.0], 0.0)]
    fn confidence_follows_coefficient_of_variation(#[case] values: &[f64], #[case] expected: f64) {
        let (mean, std_dev) = mean_and_std_dev(values);
        assert!((confidence_level(mean, std_dev) - expected).abs() < 1e-9);
    }

    #[test]
    fn confidence_approaches_one_as_variation_shrinks() {
        let noisy = mean_and_std_dev(&[90.0, 110.0, 90.0, 110.0]);
        let calm = mean_and_std_dev(&[99.0, 101.0, 99.0, 101.0]);
        let noisy_conf = confidence_level(noisy.0, noisy.1);
        let calm_conf = confidence_level(calm.0, calm.1);
        assert!(calm_conf > noisy_conf);
        assert!(calm_conf > 0.98);
    }

    #[test]
    fn flat_series_projects_flat_demand() {
        let today = date(2024, 3, 15);
        let result = calculate_forecast(&series(today, &[2; 10]), 30, today).unwrap();

        assert_eq!(result.forecasts.len(), 30);
        assert!(result.factors.trend.abs() < EPS);
        assert!((result.factors.moving_average - 2.0).abs() < EPS);
        assert!((result.confidence - 1.0).abs() < EPS);
        assert!(result.forecasts.iter().all(|p| p.predicted_demand == 2));
        assert_eq!(result.factors.historical_days, 10);
        assert_eq!(result.factors.note, None);
    }

    #[test]
    fn forecast_dates_are_contiguous_from_tomorrow() {
        let today = date(2024, 2, 27);
        let result = calculate_forecast(&series(today, &[5, 6, 7]), 5, today).unwrap();
        let dates: Vec<NaiveDate> = result.forecasts.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1),
                date(2024, 3, 2),
                date(2024, 3, 3),
            ]
        );
    }

    #[test]
    fn empty_history_yields_no_data_result() {
        let result = calculate_forecast(&[], 30, date(2024, 1, 1)).unwrap();
        assert!(!result.has_data());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.factors.historical_days, 0);
        assert_eq!(result.factors.note.as_deref(), Some("no historical data"));
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_HORIZON_DAYS + 1)]
    fn invalid_horizon_is_a_computation_error(#[case] horizon: u32) {
        let today = date(2024, 1, 1);
        assert_matches!(
            calculate_forecast(&series(today, &[1, 2, 3]), horizon, today),
            Err(ServiceError::ComputationError(_))
        );
    }

    #[test]
    fn seasonal_factor_rescales_matching_weekday() {
        // Two weeks: Mondays sell 20, every other day sells 10.
        let today = date(2024, 3, 17); // Sunday
        let start = date(2024, 3, 4); // Monday
        let history: Vec<DemandObservation> = (0..14)
            .map(|i| {
                let d = start + Duration::days(i);
                let q = if d.weekday() == Weekday::Mon { 20 } else { 10 };
                DemandObservation::new(d, q)
            })
            .collect();

        let result = calculate_forecast(&history, 7, today).unwrap();
        let factors = &result.factors;
        assert_eq!(factors.seasonal_patterns.len(), 7);
        assert!((factors.seasonal_patterns["monday"] - 20.0).abs() < EPS);
        assert!((factors.seasonal_patterns["tuesday"] - 10.0).abs() < EPS);

        let monday = result.forecasts.iter().find(|p| p.date.weekday() == Weekday::Mon).unwrap();
        let tuesday = result.forecasts.iter().find(|p| p.date.weekday() == Weekday::Tue).unwrap();
        assert!(monday.predicted_demand > tuesday.predicted_demand);
    }

    #[test]
    fn absent_weekday_falls_back_to_baseline() {
        // History only on Mondays; a Tuesday target keeps the unscaled base.
        let history = vec![
            DemandObservation::new(date(2024, 3, 4), 8),
            DemandObservation::new(date(2024, 3, 11), 8),
        ];
        let today = date(2024, 3, 11);
        let result = calculate_forecast(&history, 2, today).unwrap();

        assert_eq!(result.factors.seasonal_patterns.len(), 1);
        let tuesday = result.forecasts[0];
        assert_eq!(tuesday.date.weekday(), Weekday::Tue);
        assert_eq!(tuesday.predicted_demand, 8);
    }

    #[test]
    fn steep_decline_is_floored_at_zero() {
        let today = date(2024, 5, 1);
        let history = series(today, &[50, 40, 30, 20, 10, 0]);
        let result = calculate_forecast(&history, 30, today).unwrap();
        assert!(result.factors.trend < 0.0);
        assert_eq!(result.forecasts.last().unwrap().predicted_demand, 0);
        assert!(result.forecasts.iter().all(|p| p.predicted_demand >= 0));
    }

    #[test]
    fn calculation_is_deterministic() {
        let today = date(2024, 6, 10);
        let history = series(today, &[3, 9, 4, 12, 7, 5, 8, 11, 2, 6]);
        let first = calculate_forecast(&history, 30, today).unwrap();
        let second = calculate_forecast(&history, 30, today).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn factors_serialize_with_weekday_names() {
        let today = date(2024, 3, 15);
        let result = calculate_forecast(&series(today, &[4, 4]), 1, today).unwrap();
        let json = serde_json::to_value(&result.factors).unwrap();
        assert!(json.get("note").is_none());
        assert!(json["seasonal_patterns"].get("wednesday").is_some());
        assert!(json["seasonal_patterns"].get("thursday").is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn predicted_demand_is_never_negative(
            quantities in prop::collection::vec(0i64..500, 1..60),
            horizon in 1u32..90,
        ) {
            let today = date(2024, 7, 1);
            let result = calculate_forecast(&series(today, &quantities), horizon, today).unwrap();
            prop_assert!(result.forecasts.iter().all(|p| p.predicted_demand >= 0));
        }

        #[test]
        fn forecast_length_matches_horizon(
            quantities in prop::collection::vec(0i64..500, 1..60),
            horizon in 1u32..=MAX_HORIZON_DAYS,
        ) {
            let today = date(2024, 7, 1);
            let result = calculate_forecast(&series(today, &quantities), horizon, today).unwrap();
            prop_assert_eq!(result.forecasts.len(), horizon as usize);
            prop_assert!((0.0..=1.0).contains(&result.confidence));
        }
    }
}
