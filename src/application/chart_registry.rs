// Chart registry - owns the chart collection of the active workspace
use crate::application::effects::EffectSender;
use crate::domain::chart::{AxisBound, Chart, ChartSeries, TagNode, XUnit};
use crate::domain::workspace::DEFAULT_WORKSPACE_ID;
use uuid::Uuid;

/// Every mutation swaps the affected chart for a new value built by a pure
/// `Chart -> Chart` transform, then queues a save of the whole collection.
/// Rejected or unknown-id operations change nothing and save nothing.
#[derive(Debug)]
pub struct ChartRegistry {
    workspace_id: String,
    charts: Vec<Chart>,
    effects: EffectSender,
    sampling_interval_ms: u64,
}

impl ChartRegistry {
    pub fn new(effects: EffectSender, sampling_interval_ms: u64) -> Self {
        Self {
            workspace_id: DEFAULT_WORKSPACE_ID.to_string(),
            charts: vec![Chart::initial()],
            effects,
            sampling_interval_ms,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub fn chart(&self, id: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == id)
    }

    /// Switch the persistence key. Saved charts replace the current ones
    /// when there are any; every charted tag is then subscribed in one call.
    pub fn activate_workspace(&mut self, workspace_id: String, saved: Vec<Chart>) {
        tracing::info!(
            workspace = %workspace_id,
            saved = saved.len(),
            "Activating workspace"
        );
        self.workspace_id = workspace_id;
        if !saved.is_empty() {
            self.charts = saved;
        }

        let mut tags: Vec<String> = Vec::new();
        for tag in self.charts.iter().flat_map(|c| c.tags()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.effects.subscribe(tags, self.sampling_interval_ms);
    }

    /// New paused chart at the front of the list. Returns its id.
    pub fn add_chart(&mut self, now: i64) -> String {
        let id = format!("chart-{}", Uuid::new_v4().simple());
        let title = format!("Chart {}", self.charts.len() + 1);
        self.charts.insert(0, Chart::new(id.clone(), title, now));
        self.persist();
        id
    }

    pub fn remove_chart(&mut self, id: &str) -> bool {
        let before = self.charts.len();
        self.charts.retain(|c| c.id != id);
        if self.charts.len() == before {
            return false;
        }
        self.persist();
        true
    }

    pub fn add_series_to_chart(&mut self, chart_id: &str, node: &TagNode) -> bool {
        if !node.is_variable {
            tracing::debug!(tag = %node.tag, "Rejected series: not a value-bearing node");
            return false;
        }
        let Some(chart) = self.chart(chart_id) else {
            return false;
        };
        if chart.has_series(&node.tag) || chart.is_full() {
            tracing::debug!(
                chart = chart_id,
                tag = %node.tag,
                series = chart.series.len(),
                "Rejected series: duplicate or chart full"
            );
            return false;
        }

        let series = ChartSeries::from_node(node);
        self.effects
            .subscribe(vec![series.tag.clone()], self.sampling_interval_ms);
        self.update(chart_id, |c| c.with_series(series))
    }

    /// Adds to the last chart in the list.
    pub fn add_series_to_active_chart(&mut self, node: &TagNode) -> bool {
        let Some(chart_id) = self.charts.last().map(|c| c.id.clone()) else {
            return false;
        };
        self.add_series_to_chart(&chart_id, node)
    }

    pub fn toggle_series(&mut self, chart_id: &str, tag: &str) -> bool {
        self.update(chart_id, |c| c.with_series_toggled(tag))
    }

    pub fn remove_series(&mut self, chart_id: &str, tag: &str) -> bool {
        self.update(chart_id, |c| c.without_series(tag))
    }

    pub fn set_series_label(&mut self, chart_id: &str, tag: &str, label: Option<String>) -> bool {
        self.update(chart_id, |c| c.with_series_label(tag, label))
    }

    pub fn set_series_color(&mut self, chart_id: &str, tag: &str, color: Option<String>) -> bool {
        self.update(chart_id, |c| c.with_series_color(tag, color))
    }

    pub fn set_title(&mut self, chart_id: &str, title: String) -> bool {
        self.update(chart_id, |c| c.with_title(title))
    }

    pub fn pause_chart(&mut self, chart_id: &str, paused: bool, now: i64) -> bool {
        self.update(chart_id, |c| c.with_paused(paused, now))
    }

    pub fn set_y_scale(
        &mut self,
        chart_id: &str,
        y_min: Option<AxisBound>,
        y_max: Option<AxisBound>,
    ) -> bool {
        self.update(chart_id, |c| c.with_y_scale(y_min, y_max))
    }

    pub fn set_x_range_minutes(&mut self, chart_id: &str, minutes: u32) -> bool {
        self.update(chart_id, |c| c.with_x_range_minutes(minutes))
    }

    pub fn set_x_range_seconds(&mut self, chart_id: &str, seconds: u32) -> bool {
        self.update(chart_id, |c| c.with_x_range_seconds(seconds))
    }

    pub fn set_x_unit(&mut self, chart_id: &str, unit: XUnit) -> bool {
        self.update(chart_id, |c| c.with_x_unit(unit))
    }

    pub fn set_zoom(&mut self, chart_id: &str, range: Option<(i64, i64)>) -> bool {
        self.update(chart_id, |c| c.with_zoom(range))
    }

    pub fn pan_chart(&mut self, chart_id: &str, delta_ms: i64, now: i64) -> bool {
        self.update(chart_id, |c| c.panned(delta_ms, now))
    }

    fn update(&mut self, chart_id: &str, f: impl FnOnce(Chart) -> Chart) -> bool {
        let Some(pos) = self.charts.iter().position(|c| c.id == chart_id) else {
            return false;
        };
        let next = f(self.charts[pos].clone());
        self.charts[pos] = next;
        self.persist();
        true
    }

    fn persist(&self) {
        self.effects
            .persist(self.workspace_id.clone(), self.charts.clone());
    }
}
