// Window resolution - which slice of the point buffer a chart shows
use serde::Serialize;

use super::chart::Chart;
use super::point::{Point, PointBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeDomain {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Window<'a> {
    pub domain: TimeDomain,
    pub visible: Vec<&'a Point>,
}

/// Time domain of a chart at `now`. Zoom wins over the pause anchor, the
/// anchor wins over the live edge.
pub fn resolve_domain(chart: &Chart, now: i64) -> TimeDomain {
    if let Some((from, to)) = chart.x_zoom {
        return TimeDomain { from, to };
    }
    let to = if chart.paused {
        chart.x_right.unwrap_or(now)
    } else {
        now
    };
    TimeDomain {
        from: to.saturating_sub(chart.window_ms()),
        to,
    }
}

pub fn resolve<'a>(chart: &Chart, buffer: &'a PointBuffer, now: i64) -> Window<'a> {
    let domain = resolve_domain(chart, now);
    Window {
        domain,
        visible: buffer.range(domain.from, domain.to).collect(),
    }
}

/// New right edge after panning by `delta_ms`, kept within `[0, now]`.
pub fn pan_anchor(x_right: Option<i64>, delta_ms: i64, now: i64) -> i64 {
    let current = x_right.unwrap_or(now);
    current.saturating_add(delta_ms).max(0).min(now.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::XUnit;

    fn buffer_every_second(count: i64) -> PointBuffer {
        let mut buffer = PointBuffer::new();
        for i in 0..count {
            buffer.merge("A", i as f64, i * 1_000);
        }
        buffer
    }

    #[test]
    fn test_paused_chart_domain() {
        let chart = Chart::new("c".into(), "c".into(), 1_000_000);
        let domain = resolve_domain(&chart, 5_000_000);
        assert_eq!(domain, TimeDomain { from: 100_000, to: 1_000_000 });
    }

    #[test]
    fn test_paused_without_anchor_uses_now() {
        let mut chart = Chart::initial();
        chart.paused = true;
        let domain = resolve_domain(&chart, 2_000_000);
        assert_eq!(domain.to, 2_000_000);
    }

    #[test]
    fn test_live_chart_follows_now() {
        let chart = Chart::initial().with_x_range_seconds(10);
        assert_eq!(chart.x_unit, XUnit::Seconds);
        let domain = resolve_domain(&chart, 50_000);
        assert_eq!(domain, TimeDomain { from: 40_000, to: 50_000 });
    }

    #[test]
    fn test_zoom_overrides_window() {
        let chart = Chart::new("c".into(), "c".into(), 1_000_000).with_zoom(Some((3_000, 7_000)));
        let buffer = buffer_every_second(10);
        let window = resolve(&chart, &buffer, 9_999_999);
        assert_eq!(window.domain, TimeDomain { from: 3_000, to: 7_000 });
        let ts: Vec<i64> = window.visible.iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![3_000, 4_000, 5_000, 6_000, 7_000]);

        let reset = chart.with_zoom(None);
        assert_eq!(resolve_domain(&reset, 0).to, 1_000_000);
    }

    #[test]
    fn test_visible_bounds_inclusive() {
        let chart = Chart::initial().with_x_range_seconds(3);
        let buffer = buffer_every_second(10);
        let window = resolve(&chart, &buffer, 5_000);
        let ts: Vec<i64> = window.visible.iter().map(|p| p.t).collect();
        assert_eq!(ts, vec![2_000, 3_000, 4_000, 5_000]);
    }

    #[test]
    fn test_empty_buffer_keeps_domain() {
        let chart = Chart::initial();
        let buffer = PointBuffer::new();
        let window = resolve(&chart, &buffer, 1_000_000);
        assert!(window.visible.is_empty());
        assert_eq!(window.domain, TimeDomain { from: 100_000, to: 1_000_000 });
    }

    #[test]
    fn test_extreme_anchor_saturates() {
        let chart: Chart = serde_json::from_value(serde_json::json!({
            "id": "c",
            "title": "c",
            "paused": true,
            "x_right": -9_223_372_036_854_775_800_i64
        }))
        .unwrap();
        let domain = resolve_domain(&chart, 1_000);
        assert_eq!(domain, TimeDomain { from: i64::MIN, to: -9_223_372_036_854_775_800 });

        let buffer = buffer_every_second(3);
        assert!(resolve(&chart, &buffer, 1_000).visible.is_empty());
    }

    #[test]
    fn test_pan_anchor_clamps() {
        assert_eq!(pan_anchor(Some(5_000), -1_000, 10_000), 4_000);
        assert_eq!(pan_anchor(Some(5_000), 60_000, 10_000), 10_000);
        assert_eq!(pan_anchor(Some(500), -1_000, 10_000), 0);
        assert_eq!(pan_anchor(None, -2_000, 10_000), 8_000);
    }
}
