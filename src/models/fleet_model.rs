use serde::{Deserialize, Serialize};

/// Badge colour family used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Caution,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    pub fn from_score(health: u8) -> Self {
        if health >= 90 {
            HealthBand::Good
        } else if health >= 70 {
            HealthBand::Fair
        } else {
            HealthBand::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Operational,
    Warning,
    Maintenance,
}

impl EquipmentStatus {
    pub fn tone(self) -> Tone {
        match self {
            EquipmentStatus::Operational => Tone::Success,
            EquipmentStatus::Warning => Tone::Warning,
            EquipmentStatus::Maintenance => Tone::Danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanStatus {
    Operational,
    Warning,
    Error,
}

impl FanStatus {
    pub fn tone(self) -> Tone {
        match self {
            FanStatus::Operational => Tone::Success,
            FanStatus::Warning => Tone::Caution,
            FanStatus::Error => Tone::Danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn tone(self) -> Tone {
        match self {
            Severity::Low => Tone::Caution,
            Severity::Medium => Tone::Warning,
            Severity::High => Tone::Danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Warning,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    pub status: EquipmentStatus,
    /// 0..=100
    pub health: u8,
    pub last_maintenance: String,
    pub next_maintenance: String,
    pub alerts: u32,
}

impl Equipment {
    pub fn is_fan(&self) -> bool {
        self.name.to_lowercase().contains("fan")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fan {
    pub id: String,
    pub name: String,
    pub status: FanStatus,
    pub rpm: u32,
    pub efficiency: u8,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u32,
    pub kind: AlertKind,
    pub equipment: String,
    pub message: String,
    pub raised: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub title: String,
    pub value: String,
    pub change: String,
    pub trend: Trend,
}

/// Static rows shown next to the live charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetCatalog {
    pub equipment: Vec<Equipment>,
    pub fans: Vec<Fan>,
    pub alerts: Vec<Alert>,
    pub metrics: Vec<Metric>,
}

impl FleetCatalog {
    pub fn alerts_at_least(&self, severity: Severity) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| a.severity >= severity)
            .collect()
    }
}

fn equipment(
    id: &str,
    name: &str,
    status: EquipmentStatus,
    health: u8,
    last: &str,
    next: &str,
    alerts: u32,
) -> Equipment {
    Equipment {
        id: id.to_string(),
        name: name.to_string(),
        status,
        health,
        last_maintenance: last.to_string(),
        next_maintenance: next.to_string(),
        alerts,
    }
}

fn fan(id: &str, name: &str, status: FanStatus, rpm: u32, efficiency: u8, location: &str) -> Fan {
    Fan {
        id: id.to_string(),
        name: name.to_string(),
        status,
        rpm,
        efficiency,
        location: location.to_string(),
    }
}

fn alert(id: u32, kind: AlertKind, equipment: &str, message: &str, raised: &str, severity: Severity) -> Alert {
    Alert {
        id,
        kind,
        equipment: equipment.to_string(),
        message: message.to_string(),
        raised: raised.to_string(),
        severity,
    }
}

fn metric(title: &str, value: &str, change: &str, trend: Trend) -> Metric {
    Metric {
        title: title.to_string(),
        value: value.to_string(),
        change: change.to_string(),
        trend,
    }
}

impl Default for FleetCatalog {
    fn default() -> Self {
        use EquipmentStatus as E;

        Self {
            equipment: vec![
                equipment("motor-a", "Motor Unit A", E::Operational, 94, "2024-01-15", "2024-02-15", 1),
                equipment("pump-b", "Pump B", E::Warning, 78, "2024-01-10", "2024-02-10", 2),
                equipment("fan-c1", "Cooling Fan C1", E::Operational, 96, "2024-01-20", "2024-02-20", 0),
                equipment("fan-c2", "Exhaust Fan C2", E::Operational, 92, "2024-01-18", "2024-02-18", 0),
                equipment("press-d", "Hydraulic Press D", E::Maintenance, 45, "2024-01-05", "2024-01-25", 0),
            ],
            fans: vec![
                fan("FAN-001", "Cooling Fan A1", FanStatus::Operational, 1250, 96, "Zone A"),
                fan("FAN-002", "Exhaust Fan B1", FanStatus::Warning, 1180, 89, "Zone B"),
                fan("FAN-003", "Intake Fan C1", FanStatus::Operational, 1300, 94, "Zone C"),
                fan("FAN-004", "Cooling Fan A2", FanStatus::Operational, 1220, 97, "Zone A"),
            ],
            alerts: vec![
                alert(1, AlertKind::Warning, "Motor Unit A", "Vibration levels trending upward", "2 min ago", Severity::Medium),
                alert(2, AlertKind::Alert, "Pump B", "Temperature spike detected", "5 min ago", Severity::High),
                alert(3, AlertKind::Warning, "Cooling Fan C1", "RPM fluctuation detected", "8 min ago", Severity::Low),
                alert(4, AlertKind::Warning, "Exhaust Fan C2", "Performance below optimal", "12 min ago", Severity::Low),
            ],
            metrics: vec![
                metric("Equipment Health Score", "94%", "+2.1%", Trend::Up),
                metric("Active Alerts", "3", "-1", Trend::Down),
                metric("Avg Temperature", "68.4°F", "+0.8°F", Trend::Up),
                metric("Fan Systems", "12 Active", "All operational", Trend::Stable),
            ],
        }
    }
}
