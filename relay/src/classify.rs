use crate::model::TelemetryRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a single reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning/critical limits for one metric.
///
/// With `inverse` set, lower values are worse (pressure drop, battery drain).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
    pub inverse: bool,
}

impl Threshold {
    pub const fn rising(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            inverse: false,
        }
    }

    pub const fn falling(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            inverse: true,
        }
    }
}

/// Maps a reading to its severity. Critical is always checked first.
///
/// Non-finite values are compared as-is: `NaN` never crosses a limit and is
/// reported `Normal`.
pub fn classify(value: f64, threshold: &Threshold) -> Severity {
    if threshold.inverse {
        if value <= threshold.critical {
            return Severity::Critical;
        }
        if value <= threshold.warning {
            return Severity::Warning;
        }
    } else {
        if value >= threshold.critical {
            return Severity::Critical;
        }
        if value >= threshold.warning {
            return Severity::Warning;
        }
    }
    Severity::Normal
}

/// Limits for every metric a device reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub temperature: Threshold,
    pub humidity: Threshold,
    pub pressure: Threshold,
    pub vibration: Threshold,
    pub battery: Threshold,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            temperature: Threshold::rising(30.0, 35.0),
            humidity: Threshold::rising(70.0, 75.0),
            pressure: Threshold::falling(985.0, 980.0),
            vibration: Threshold::rising(4.5, 5.5),
            battery: Threshold::falling(80.0, 70.0),
        }
    }
}

impl ThresholdTable {
    pub fn assess(&self, record: &TelemetryRecord) -> Assessment {
        Assessment {
            temperature: classify(record.temperature, &self.temperature),
            humidity: classify(record.humidity, &self.humidity),
            pressure: classify(record.pressure, &self.pressure),
            vibration: classify(record.vibration, &self.vibration),
            battery: classify(record.battery_level, &self.battery),
        }
    }
}

/// Per-metric severities of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub temperature: Severity,
    pub humidity: Severity,
    pub pressure: Severity,
    pub vibration: Severity,
    pub battery: Severity,
}

impl Assessment {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Severity)> {
        [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("pressure", self.pressure),
            ("vibration", self.vibration),
            ("battery", self.battery),
        ]
        .into_iter()
    }

    pub fn worst(&self) -> Severity {
        self.iter()
            .map(|(_, severity)| severity)
            .max()
            .unwrap_or(Severity::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(temperature: f64, pressure: f64, battery_level: f64) -> TelemetryRecord {
        TelemetryRecord {
            device_id: "device001".to_string(),
            temperature,
            humidity: 50.0,
            pressure,
            vibration: 1.0,
            battery_level,
            timestamp: "2024-05-01T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_default_table() {
        let table = ThresholdTable::default();
        assert_eq!(table.temperature, Threshold { warning: 30.0, critical: 35.0, inverse: false });
        assert_eq!(table.humidity, Threshold { warning: 70.0, critical: 75.0, inverse: false });
        assert_eq!(table.pressure, Threshold { warning: 985.0, critical: 980.0, inverse: true });
        assert_eq!(table.vibration, Threshold { warning: 4.5, critical: 5.5, inverse: false });
        assert_eq!(table.battery, Threshold { warning: 80.0, critical: 70.0, inverse: true });
    }

    #[test]
    fn test_temperature_scenarios() {
        let t = ThresholdTable::default().temperature;
        assert_eq!(classify(36.0, &t), Severity::Critical);
        assert_eq!(classify(32.0, &t), Severity::Warning);
        assert_eq!(classify(20.0, &t), Severity::Normal);
    }

    #[test]
    fn test_inverse_scenarios() {
        let table = ThresholdTable::default();
        assert_eq!(classify(978.0, &table.pressure), Severity::Critical);
        assert_eq!(classify(65.0, &table.battery), Severity::Critical);
    }

    #[test]
    fn test_rising_boundaries() {
        let table = ThresholdTable::default();
        for t in [table.temperature, table.humidity, table.vibration] {
            assert_eq!(classify(t.critical, &t), Severity::Critical);
            assert_eq!(classify(t.warning, &t), Severity::Warning);
            assert_eq!(classify(t.critical - 0.01, &t), Severity::Warning);
            assert_eq!(classify(t.warning - 0.01, &t), Severity::Normal);
        }
    }

    #[test]
    fn test_falling_boundaries() {
        let table = ThresholdTable::default();
        for t in [table.pressure, table.battery] {
            assert_eq!(classify(t.critical, &t), Severity::Critical);
            assert_eq!(classify(t.critical + 0.01, &t), Severity::Warning);
            assert_eq!(classify(t.warning, &t), Severity::Warning);
            assert_eq!(classify(t.warning + 0.01, &t), Severity::Normal);
        }
    }

    #[test]
    fn test_critical_wins_when_limits_overlap() {
        let t = Threshold::rising(10.0, 10.0);
        assert_eq!(classify(10.0, &t), Severity::Critical);

        let t = Threshold::falling(10.0, 10.0);
        assert_eq!(classify(10.0, &t), Severity::Critical);
    }

    #[test]
    fn test_classify_is_pure() {
        let t = ThresholdTable::default().humidity;
        let first = classify(72.0, &t);
        for _ in 0..10 {
            assert_eq!(classify(72.0, &t), first);
        }
    }

    #[test]
    fn test_non_finite_values() {
        let table = ThresholdTable::default();
        assert_eq!(classify(f64::NAN, &table.temperature), Severity::Normal);
        assert_eq!(classify(f64::NAN, &table.battery), Severity::Normal);
        assert_eq!(classify(f64::INFINITY, &table.temperature), Severity::Critical);
        assert_eq!(classify(f64::NEG_INFINITY, &table.pressure), Severity::Critical);
    }

    #[test]
    fn test_assess_record() {
        let table = ThresholdTable::default();
        let assessment = table.assess(&record(32.0, 1000.0, 65.0));

        assert_eq!(assessment.temperature, Severity::Warning);
        assert_eq!(assessment.humidity, Severity::Normal);
        assert_eq!(assessment.pressure, Severity::Normal);
        assert_eq!(assessment.battery, Severity::Critical);
        assert_eq!(assessment.worst(), Severity::Critical);
    }

    #[test]
    fn test_worst_of_healthy_record() {
        let table = ThresholdTable::default();
        assert_eq!(table.assess(&record(20.0, 1000.0, 95.0)).worst(), Severity::Normal);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }
}
