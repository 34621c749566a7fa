// HTML rendering of AQI reports with an inline SVG month-to-date chart
use crate::application::report_service::{ChartBar, Report};
use crate::domain::aqi::Category;
use crate::infrastructure::config::fill_template;
use std::collections::HashMap;
use std::fmt::Write;

const CHART_WIDTH: f64 = 760.0;
const CHART_HEIGHT: f64 = 300.0;
const CHART_MARGIN: f64 = 40.0;

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Air Quality Index Report - ${date}</title>
<style>
    body { font-family: 'Times New Roman', serif; background: #f5f5f5; margin: 0; padding: 20px; }
    .page { background: white; max-width: 860px; margin: 0 auto; padding: 24px; }
    h1, h2, h3 { text-align: center; margin: 6px 0; }
    table { border-collapse: collapse; margin: 16px auto; }
    th, td { border: 1px solid #000; padding: 6px 10px; font-size: 12px; }
    th { background: #f0f0f0; }
    .aqi-value { font-weight: bold; font-size: 16px; color: ${current_color}; text-shadow: 0 0 1px #000; }
    .chart { text-align: center; margin: 20px 0; }
    .notes { text-align: center; font-size: 11px; line-height: 1.4; }
</style>
</head>
<body>
<div class="page">
    <h1>Air Quality Index (AQI)</h1>
    <h3>${date}</h3>
    <table>
        <thead>
            <tr>
                <th>Location</th>
                <th>Parameter used to calculate AQI</th>
                <th>PEQS value</th>
                <th>Conc. (&micro;g/m&sup3;) used to calculate AQI</th>
                <th>AQI-PM&#8322;.&#8325;</th>
                <th>Category</th>
            </tr>
        </thead>
        <tbody>
            <tr>
                <td>${location}</td>
                <td>PM&#8322;.&#8325;</td>
                <td>${parameter_limit}</td>
                <td>${concentration}</td>
                <td class="aqi-value">${index}</td>
                <td>${category}</td>
            </tr>
        </tbody>
    </table>
    <div class="chart">
${chart}
    </div>
    <h3>AQI Categories</h3>
    <table>
        <thead>
            <tr><th>AQI Range</th><th>Health Category</th><th>Color Code</th></tr>
        </thead>
        <tbody>
${legend}
        </tbody>
    </table>
    <div class="notes">
        <p><strong>Note:</strong></p>
        <p>i. AQI report based on PM&#8322;.&#8325; measured by gravimetric filter sampling</p>
        <p>ii. Daily values before the report date are simulated for trend display</p>
    </div>
</div>
</body>
</html>
"#;

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Text color readable on top of a category color.
fn contrast_text(category: Category) -> &'static str {
    match category {
        Category::Good | Category::Moderate | Category::UnhealthyForSensitiveGroups => "#000",
        _ => "#fff",
    }
}

fn legend_rows() -> String {
    let mut rows = String::new();
    for category in Category::ALL {
        let (lo, hi) = category.index_range();
        let _ = writeln!(
            rows,
            "            <tr><td>{}-{}</td><td>{}</td><td style=\"background: {}; color: {}; font-weight: bold;\">{}</td></tr>",
            lo,
            hi,
            category.label(),
            category.color(),
            contrast_text(category),
            category.color_name()
        );
    }
    rows
}

/// Upper bound of the y axis: the tallest bar rounded up to the next 50, at least 100.
fn y_axis_max(bars: &[ChartBar]) -> u16 {
    let tallest = bars.iter().map(|b| b.index).max().unwrap_or(0).max(100);
    tallest.div_ceil(50) * 50
}

/// Bar chart of the history; the last bar (the measured day) gets a heavier outline.
pub fn render_chart(bars: &[ChartBar]) -> String {
    let mut svg = String::new();
    let plot_width = CHART_WIDTH - 2.0 * CHART_MARGIN;
    let plot_height = CHART_HEIGHT - 2.0 * CHART_MARGIN;
    let y_max = f64::from(y_axis_max(bars));

    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\" font-family=\"Times New Roman\" font-size=\"10\">",
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    );

    // Horizontal grid every 50 index points
    let mut level = 0.0;
    while level <= y_max {
        let y = CHART_MARGIN + plot_height - level / y_max * plot_height;
        let _ = writeln!(
            svg,
            "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#e0e0e0\"/><text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>",
            CHART_MARGIN,
            y,
            CHART_MARGIN + plot_width,
            y,
            CHART_MARGIN - 4.0,
            y + 3.0,
            level
        );
        level += 50.0;
    }

    if !bars.is_empty() {
        let slot = plot_width / bars.len() as f64;
        let bar_width = slot * 0.8;
        let last = bars.len() - 1;

        for (i, bar) in bars.iter().enumerate() {
            let height = f64::from(bar.index).min(y_max) / y_max * plot_height;
            let x = CHART_MARGIN + i as f64 * slot + (slot - bar_width) / 2.0;
            let y = CHART_MARGIN + plot_height - height;
            let stroke_width = if i == last { 2.0 } else { 0.5 };

            let _ = writeln!(
                svg,
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\" stroke=\"#000\" stroke-width=\"{}\"><title>{}: {}</title></rect>",
                x, y, bar_width, height, bar.color, stroke_width, bar.label, bar.index
            );
            let _ = writeln!(
                svg,
                "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text><text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>",
                x + bar_width / 2.0,
                y - 3.0,
                bar.index,
                x + bar_width / 2.0,
                CHART_MARGIN + plot_height + 14.0,
                bar.date.format("%d")
            );
        }
    }

    svg.push_str("</svg>");
    svg
}

pub fn render_report(report: &Report) -> String {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("date", report.date_label());
    vars.insert("location", escape_html(&report.location));
    vars.insert("parameter_limit", format!("{}", report.parameter_limit));
    vars.insert("concentration", format!("{:.1}", report.concentration));
    vars.insert("index", report.result.index.to_string());
    vars.insert("category", report.result.category.label().to_string());
    vars.insert("current_color", report.result.color().to_string());
    vars.insert("chart", render_chart(&report.bars));
    vars.insert("legend", legend_rows());

    fill_template(REPORT_TEMPLATE, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aqi::AqiResult;
    use chrono::NaiveDate;

    fn bar(d: u32, index: u16) -> ChartBar {
        ChartBar::from(crate::domain::history::HistoryEntry {
            date: NaiveDate::from_ymd_opt(2025, 8, d).unwrap(),
            index,
        })
    }

    fn report() -> Report {
        Report {
            location: "Station <A> & B".to_string(),
            parameter_limit: 35.0,
            date: NaiveDate::from_ymd_opt(2025, 8, 3).unwrap(),
            concentration: 103.959,
            result: AqiResult::from_concentration(103.959),
            bars: vec![bar(1, 70), bar(2, 120), bar(3, 176)],
        }
    }

    #[test]
    fn test_render_report() {
        let html = render_report(&report());

        assert!(html.contains("Sunday August 03, 2025"));
        assert!(html.contains("Station &lt;A&gt; &amp; B"));
        assert!(html.contains("<td>104.0</td>"));
        assert!(html.contains("<td class=\"aqi-value\">176</td>"));
        assert!(html.contains("<td>Unhealthy</td>"));
        assert!(!html.contains("${"), "unfilled placeholder left in report");
    }

    #[test]
    fn test_chart_has_one_bar_per_day() {
        let svg = render_chart(&report().bars);
        assert_eq!(svg.matches("<rect").count(), 3);
        assert!(svg.contains("fill=\"#FF0000\""));
        assert!(svg.contains("08/03/2025: 176"));
    }

    #[test]
    fn test_y_axis_max() {
        assert_eq!(y_axis_max(&[]), 100);
        assert_eq!(y_axis_max(&[bar(1, 176)]), 200);
        assert_eq!(y_axis_max(&[bar(1, 250)]), 250);
    }

    #[test]
    fn test_legend_lists_every_category() {
        let legend = legend_rows();
        for category in Category::ALL {
            assert!(legend.contains(category.label()));
        }
        assert!(legend.contains("301-500"));
    }
}
