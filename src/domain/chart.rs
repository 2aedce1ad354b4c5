// Chart domain model - chart definitions and per-chart view state
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::window::pan_anchor;

pub const MAX_SERIES_PER_CHART: usize = 8;
pub const DEFAULT_X_RANGE_MINUTES: u32 = 15;
pub const DEFAULT_X_RANGE_SECONDS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XUnit {
    Seconds,
    #[default]
    Minutes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Numeric,
}

impl ValueKind {
    /// Map a source data type name ("Boolean", "Double", ...) to a value kind.
    pub fn from_data_type(data_type: &str) -> Option<Self> {
        match data_type {
            "Boolean" => Some(ValueKind::Boolean),
            "SByte" | "Byte" | "Int16" | "UInt16" | "Int32" | "UInt32" | "Int64" | "UInt64"
            | "Float" | "Double" => Some(ValueKind::Numeric),
            _ => None,
        }
    }
}

/// Y axis bound: a fixed number or `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AxisBound {
    #[default]
    Auto,
    Fixed(f64),
}

impl Serialize for AxisBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AxisBound::Auto => serializer.serialize_str("auto"),
            AxisBound::Fixed(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for AxisBound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(AxisBound::Fixed(v)),
            Raw::Text(s) if s == "auto" => Ok(AxisBound::Auto),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"auto\", got {:?}",
                s
            ))),
        }
    }
}

/// A data source node offered for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagNode {
    pub tag: String,
    pub browse_name: String,
    /// Only variables carry values; folders and objects do not.
    #[serde(default = "default_true")]
    pub is_variable: bool,
    #[serde(default)]
    pub data_type: Option<String>,
}

fn default_true() -> bool {
    true
}

impl TagNode {
    pub fn variable(tag: impl Into<String>, browse_name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            browse_name: browse_name.into(),
            is_variable: true,
            data_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub tag: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_kind: Option<ValueKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
}

impl ChartSeries {
    pub fn from_node(node: &TagNode) -> Self {
        Self {
            tag: node.tag.clone(),
            label: node.browse_name.clone(),
            value_kind: node.data_type.as_deref().and_then(ValueKind::from_data_type),
            visible: Some(true),
            color: None,
            custom_label: None,
        }
    }

    /// Unset counts as visible.
    pub fn is_visible(&self) -> bool {
        self.visible != Some(false)
    }

    pub fn display_label(&self) -> &str {
        self.custom_label.as_deref().unwrap_or(&self.label)
    }
}

fn default_x_range_minutes() -> u32 {
    DEFAULT_X_RANGE_MINUTES
}

fn default_x_range_seconds() -> u32 {
    DEFAULT_X_RANGE_SECONDS
}

/// Persisted chart definition. View state (pause, anchor, zoom) is stored
/// alongside the scale configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub series: Vec<ChartSeries>,
    #[serde(default)]
    pub x_unit: XUnit,
    #[serde(default = "default_x_range_seconds")]
    pub x_range_seconds: u32,
    #[serde(default = "default_x_range_minutes")]
    pub x_range_minutes: u32,
    #[serde(default)]
    pub y_min: AxisBound,
    #[serde(default)]
    pub y_max: AxisBound,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_right: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_zoom: Option<(i64, i64)>,
}

impl Chart {
    /// A chart created by the user: paused and anchored at `now`.
    pub fn new(id: String, title: String, now: i64) -> Self {
        Self {
            paused: true,
            x_right: Some(now),
            ..Self::live(id, title)
        }
    }

    /// The chart a fresh workspace starts with.
    pub fn initial() -> Self {
        Self::live("chart-1".to_string(), "Chart 1".to_string())
    }

    fn live(id: String, title: String) -> Self {
        Self {
            id,
            title,
            series: Vec::new(),
            x_unit: XUnit::Minutes,
            x_range_seconds: DEFAULT_X_RANGE_SECONDS,
            x_range_minutes: DEFAULT_X_RANGE_MINUTES,
            y_min: AxisBound::Auto,
            y_max: AxisBound::Auto,
            paused: false,
            x_right: None,
            x_zoom: None,
        }
    }

    /// Visible window length in milliseconds.
    pub fn window_ms(&self) -> i64 {
        match self.x_unit {
            XUnit::Seconds => i64::from(self.x_range_seconds) * 1_000,
            XUnit::Minutes => i64::from(self.x_range_minutes) * 60_000,
        }
    }

    pub fn has_series(&self, tag: &str) -> bool {
        self.series.iter().any(|s| s.tag == tag)
    }

    pub fn is_full(&self) -> bool {
        self.series.len() >= MAX_SERIES_PER_CHART
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.tag.as_str())
    }

    pub fn with_series(mut self, series: ChartSeries) -> Self {
        self.series.push(series);
        self
    }

    pub fn without_series(mut self, tag: &str) -> Self {
        self.series.retain(|s| s.tag != tag);
        self
    }

    pub fn with_series_toggled(self, tag: &str) -> Self {
        self.map_series(tag, |s| ChartSeries {
            visible: Some(!s.is_visible()),
            ..s
        })
    }

    pub fn with_series_label(self, tag: &str, label: Option<String>) -> Self {
        self.map_series(tag, |s| ChartSeries {
            custom_label: label.clone(),
            ..s
        })
    }

    pub fn with_series_color(self, tag: &str, color: Option<String>) -> Self {
        self.map_series(tag, |s| ChartSeries {
            color: color.clone(),
            ..s
        })
    }

    fn map_series(mut self, tag: &str, f: impl Fn(ChartSeries) -> ChartSeries) -> Self {
        self.series = self
            .series
            .into_iter()
            .map(|s| if s.tag == tag { f(s) } else { s })
            .collect();
        self
    }

    pub fn with_title(self, title: String) -> Self {
        Self { title, ..self }
    }

    /// Pausing anchors the window at `now`; resuming drops the anchor. Either
    /// way the zoom is reset.
    pub fn with_paused(self, paused: bool, now: i64) -> Self {
        Self {
            paused,
            x_right: paused.then_some(now),
            x_zoom: None,
            ..self
        }
    }

    /// Only the bounds that are given change.
    pub fn with_y_scale(self, y_min: Option<AxisBound>, y_max: Option<AxisBound>) -> Self {
        Self {
            y_min: y_min.unwrap_or(self.y_min),
            y_max: y_max.unwrap_or(self.y_max),
            ..self
        }
    }

    pub fn with_x_range_minutes(self, minutes: u32) -> Self {
        Self {
            x_range_minutes: minutes,
            ..self
        }
    }

    pub fn with_x_range_seconds(self, seconds: u32) -> Self {
        Self {
            x_range_seconds: seconds,
            x_unit: XUnit::Seconds,
            ..self
        }
    }

    pub fn with_x_unit(self, x_unit: XUnit) -> Self {
        Self { x_unit, ..self }
    }

    pub fn with_zoom(self, x_zoom: Option<(i64, i64)>) -> Self {
        Self { x_zoom, ..self }
    }

    /// Shift the paused anchor by `delta_ms`. Live charts do not pan.
    pub fn panned(self, delta_ms: i64, now: i64) -> Self {
        if !self.paused {
            return self;
        }
        Self {
            x_right: Some(pan_anchor(self.x_right, delta_ms, now)),
            ..self
        }
    }
}
