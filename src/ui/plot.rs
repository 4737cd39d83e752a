use eframe::egui::{self, Color32, Stroke, Ui};
use egui_plot::{
    BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, LineStyle, MarkerShape, Plot,
    PlotPoints, Points,
};
use rusty_torque::chart::{
    ChartSpec, GroupedBoxChart, MultiLineChart, ScatterChart, SequenceChart,
};
use rusty_torque::config::DashStyle;

use super::color32;

/// Render any chart spec into an interactive plot.
pub fn chart(ui: &mut Ui, id: &str, spec: &ChartSpec, height: f32) {
    ui.label(egui::RichText::new(spec.title()).strong());
    match spec {
        ChartSpec::GroupedBox(c) => grouped_box(ui, id, c, height),
        ChartSpec::ScatterTrend(c) => scatter(ui, id, c, height),
        ChartSpec::MultiLine(c) => multi_line(ui, id, c, height),
        ChartSpec::Sequence(c) => sequence(ui, id, c, height),
    }
}

fn line_style(dash: DashStyle) -> LineStyle {
    match dash {
        DashStyle::Solid => LineStyle::Solid,
        DashStyle::Dot => LineStyle::Dotted { spacing: 5.0 },
        DashStyle::Dash | DashStyle::DashDot => LineStyle::Dashed { length: 8.0 },
        DashStyle::LongDash | DashStyle::LongDashDot => LineStyle::Dashed { length: 16.0 },
    }
}

fn grouped_box(ui: &mut Ui, id: &str, c: &GroupedBoxChart, height: f32) {
    let labels: Vec<String> = c.boxes.iter().map(|b| b.group.clone()).collect();
    let axis_labels = labels.clone();

    Plot::new(id)
        .height(height)
        .legend(Legend::default())
        .x_axis_label(c.group_column.as_str())
        .y_axis_label(c.column.as_str())
        .x_axis_formatter(move |mark: GridMark, _range| {
            // Only integral positions carry a group.
            let i = mark.value.round();
            if (mark.value - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            axis_labels.get(i as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for (i, b) in c.boxes.iter().enumerate() {
                let Some(stats) = &b.stats else { continue };
                let color = color32(&b.color);
                let x = i as f64;
                let spread = BoxSpread::new(
                    stats.lower_whisker,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.upper_whisker,
                );
                let elem = BoxElem::new(x, spread)
                    .name(&b.group)
                    .box_width(0.5)
                    .fill(color.gamma_multiply(0.3))
                    .stroke(Stroke::new(1.5, color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&b.group).color(color));

                if !stats.outliers.is_empty() {
                    let outliers: PlotPoints = stats.outliers.iter().map(|&v| [x, v]).collect();
                    plot_ui.points(
                        Points::new(outliers)
                            .color(color)
                            .radius(2.5)
                            .shape(MarkerShape::Circle)
                            .name(&b.group),
                    );
                }
            }

            let trend: Vec<[f64; 2]> = c
                .trend
                .points
                .iter()
                .filter_map(|p| {
                    let i = labels.iter().position(|l| *l == p.group)?;
                    Some([i as f64, p.mean])
                })
                .collect();
            let trend_color = color32(&c.trend.color);
            plot_ui.line(
                Line::new(PlotPoints::from(trend.clone()))
                    .color(trend_color)
                    .style(line_style(c.trend.dash))
                    .width(2.0)
                    .name(&c.trend.name),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(trend))
                    .color(trend_color)
                    .radius(3.5)
                    .shape(MarkerShape::Diamond)
                    .name(&c.trend.name),
            );
        });
}

fn scatter(ui: &mut Ui, id: &str, c: &ScatterChart, height: f32) {
    Plot::new(id)
        .height(height)
        .legend(Legend::default())
        .x_axis_label(c.x_column.as_str())
        .y_axis_label(c.y_column.as_str())
        .show(ui, |plot_ui| {
            for g in &c.groups {
                let color = color32(&g.color);
                plot_ui.points(
                    Points::new(PlotPoints::from(g.points.clone()))
                        .color(color)
                        .radius(3.0)
                        .shape(MarkerShape::Circle)
                        .name(&g.group),
                );
                if let Some(fit) = &g.fit {
                    let [a, b] = fit.segment();
                    plot_ui.line(
                        Line::new(PlotPoints::from(vec![a, b]))
                            .color(color)
                            .width(1.5)
                            .name(format!("{} (R² = {:.3})", g.group, fit.r_squared)),
                    );
                }
            }
        });
}

fn multi_line(ui: &mut Ui, id: &str, c: &MultiLineChart, height: f32) {
    Plot::new(id)
        .height(height)
        .legend(Legend::default())
        .x_axis_label(c.x_column.as_str())
        .y_axis_label(c.y_column.as_str())
        .show(ui, |plot_ui| {
            for s in &c.series {
                let color = color32(&s.color);
                plot_ui.line(
                    Line::new(PlotPoints::from(s.points.clone()))
                        .color(color)
                        .width(1.5)
                        .name(&s.name),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(s.points.clone()))
                        .color(color)
                        .radius(2.0)
                        .name(&s.name),
                );
            }
        });
}

fn sequence(ui: &mut Ui, id: &str, c: &SequenceChart, height: f32) {
    let color = if c.color.is_empty() {
        Color32::LIGHT_BLUE
    } else {
        color32(&c.color)
    };
    Plot::new(id)
        .height(height)
        .x_axis_label(c.x_title.as_str())
        .y_axis_label(c.column.as_str())
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(c.points.clone()))
                    .color(color)
                    .width(1.5)
                    .name(&c.column),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(c.points.clone()))
                    .color(color)
                    .radius(2.0)
                    .name(&c.column),
            );
        });
}
