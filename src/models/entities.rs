//! Domain entities as the backend returns them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AgentId, AlertId, CropId, ObservationId, OperationId, PlotId, ProducerId, VisitId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub id: PlotId,
    pub name: String,
    pub agent_id: AgentId,
    #[serde(default)]
    pub producer_id: Option<ProducerId>,
    pub area_hectares: f64,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropStatus {
    Planned,
    Active,
    Harvested,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub id: CropId,
    pub plot_id: PlotId,
    pub crop_type: String,
    #[serde(default)]
    pub variety: Option<String>,
    pub status: CropStatus,
    #[serde(default)]
    pub sowing_date: Option<NaiveDate>,
    #[serde(default)]
    pub expected_harvest_date: Option<NaiveDate>,
}

/// A field action (sowing, weeding, spraying, harvest...) on a plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub plot_id: PlotId,
    #[serde(default)]
    pub crop_id: Option<CropId>,
    pub operation_type: String,
    pub operation_date: NaiveDate,
    #[serde(default)]
    pub product_used: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    pub plot_id: PlotId,
    #[serde(default)]
    pub crop_id: Option<CropId>,
    pub observation_date: NaiveDate,
    /// pest, disease, growth, weather...
    pub category: String,
    /// 1 (minor) to 5 (critical)
    #[serde(default)]
    pub severity: Option<u8>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub producer_id: Option<ProducerId>,
    #[serde(default)]
    pub plot_id: Option<PlotId>,
    pub scheduled_at: DateTime<Utc>,
    pub status: VisitStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub plot_id: Option<PlotId>,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub id: ProducerId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub cooperative: Option<String>,
}

impl Producer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Aggregates shown on an agent's home screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_plots: u32,
    pub active_crops: u32,
    pub upcoming_visits: u32,
    pub unread_alerts: u32,
    pub total_area_hectares: f64,
}
