use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Chart payload as the dashboards consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub chart_type: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDashboardStats {
    pub upcoming_events_count: u32,
    pub total_tickets_reserved: u32,
    pub total_expected_attendees: u32,
    pub average_attendance_rate: f64,
    pub top_events_chart: ChartData,
    pub attendance_by_category_chart: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStatistics {
    pub event_id: u64,
    pub event_name: String,
    pub fill_percentage: f64,
    pub unique_reservation_amount: u32,
    pub attributed_tickets_amount: u32,
    pub scanned_tickets_number: u32,
    pub zone_fill_rate_chart: ChartData,
    pub ticket_status_chart: ChartData,
}
