//! Cache Key Builders
//!
//! Every domain key is built here. Keys have the shape
//! `<domain>:<scope>:<id>` with an optional `:<filters>` suffix, so a view
//! and all of its filtered variants are covered by the exact key plus the
//! `<domain>:<scope>:<id>:` prefix.
//!
//! Ids are escaped so they never contain `:`, and filters render as a
//! canonical JSON object. Two different views therefore never share a key.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::cache::KeyPattern;
use crate::domain::{AgentId, CropId, PlotId, ProducerId, VisitId};

// == Filters ==
/// Narrowing parameters of a list view, rendered in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Canonical JSON: names sorted, values as JSON strings.
impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Percent-escapes `%` and `:` so an id is always a single key segment.
fn escape_segment(id: &str) -> Cow<'_, str> {
    if !id.contains(['%', ':']) {
        return Cow::Borrowed(id);
    }
    let mut escaped = String::with_capacity(id.len() + 4);
    for ch in id.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

// == Domain ==
/// Top-level key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Plots,
    Crops,
    Operations,
    Observations,
    Visits,
    Alerts,
    Producers,
    Dashboard,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Plots,
        Domain::Crops,
        Domain::Operations,
        Domain::Observations,
        Domain::Visits,
        Domain::Alerts,
        Domain::Producers,
        Domain::Dashboard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Domain::Plots => "plots",
            Domain::Crops => "crops",
            Domain::Operations => "operations",
            Domain::Observations => "observations",
            Domain::Visits => "visits",
            Domain::Alerts => "alerts",
            Domain::Producers => "producers",
            Domain::Dashboard => "dashboard",
        }
    }

    /// Matches every key in this domain.
    pub fn pattern(self) -> KeyPattern {
        KeyPattern::prefix(format!("{}:", self.name()))
    }
}

// == Cache Key ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKey {
    PlotsByAgent(AgentId, Filters),
    PlotDetail(PlotId),
    CropsByPlot(PlotId, Filters),
    /// The one crop currently growing on a plot
    ActiveCrop(PlotId),
    CropDetail(CropId),
    OperationsByPlot(PlotId, Filters),
    ObservationsByPlot(PlotId, Filters),
    VisitsByAgent(AgentId, Filters),
    VisitDetail(VisitId),
    UpcomingVisits(AgentId),
    AlertsByAgent(AgentId, Filters),
    UnreadAlerts(AgentId),
    ProducersByAgent(AgentId, Filters),
    ProducerDetail(ProducerId),
    AgentDashboard(AgentId),
}

impl CacheKey {
    pub fn domain(&self) -> Domain {
        match self {
            CacheKey::PlotsByAgent(..) | CacheKey::PlotDetail(_) => Domain::Plots,
            CacheKey::CropsByPlot(..) | CacheKey::ActiveCrop(_) | CacheKey::CropDetail(_) => {
                Domain::Crops
            }
            CacheKey::OperationsByPlot(..) => Domain::Operations,
            CacheKey::ObservationsByPlot(..) => Domain::Observations,
            CacheKey::VisitsByAgent(..)
            | CacheKey::VisitDetail(_)
            | CacheKey::UpcomingVisits(_) => Domain::Visits,
            CacheKey::AlertsByAgent(..) | CacheKey::UnreadAlerts(_) => Domain::Alerts,
            CacheKey::ProducersByAgent(..) | CacheKey::ProducerDetail(_) => Domain::Producers,
            CacheKey::AgentDashboard(_) => Domain::Dashboard,
        }
    }

    fn scope(&self) -> (&'static str, &str) {
        match self {
            CacheKey::PlotsByAgent(agent, _) => ("agent", agent.as_str()),
            CacheKey::PlotDetail(plot) => ("detail", plot.as_str()),
            CacheKey::CropsByPlot(plot, _) => ("plot", plot.as_str()),
            CacheKey::ActiveCrop(plot) => ("active", plot.as_str()),
            CacheKey::CropDetail(crop) => ("detail", crop.as_str()),
            CacheKey::OperationsByPlot(plot, _) => ("plot", plot.as_str()),
            CacheKey::ObservationsByPlot(plot, _) => ("plot", plot.as_str()),
            CacheKey::VisitsByAgent(agent, _) => ("agent", agent.as_str()),
            CacheKey::VisitDetail(visit) => ("detail", visit.as_str()),
            CacheKey::UpcomingVisits(agent) => ("upcoming", agent.as_str()),
            CacheKey::AlertsByAgent(agent, _) => ("agent", agent.as_str()),
            CacheKey::UnreadAlerts(agent) => ("unread", agent.as_str()),
            CacheKey::ProducersByAgent(agent, _) => ("agent", agent.as_str()),
            CacheKey::ProducerDetail(producer) => ("detail", producer.as_str()),
            CacheKey::AgentDashboard(agent) => ("agent", agent.as_str()),
        }
    }

    fn filters(&self) -> Option<&Filters> {
        match self {
            CacheKey::PlotsByAgent(_, filters)
            | CacheKey::CropsByPlot(_, filters)
            | CacheKey::OperationsByPlot(_, filters)
            | CacheKey::ObservationsByPlot(_, filters)
            | CacheKey::VisitsByAgent(_, filters)
            | CacheKey::AlertsByAgent(_, filters)
            | CacheKey::ProducersByAgent(_, filters) => Some(filters),
            _ => None,
        }
    }

    /// The key with filters left out.
    pub fn base(&self) -> String {
        let (scope, id) = self.scope();
        format!("{}:{scope}:{}", self.domain().name(), escape_segment(id))
    }

    /// Matches the filtered variants of this view, not the base key itself.
    pub fn variants(&self) -> KeyPattern {
        KeyPattern::prefix(format!("{}:", self.base()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())?;
        match self.filters() {
            Some(filters) if !filters.is_empty() => write!(f, ":{filters}"),
            _ => Ok(()),
        }
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
