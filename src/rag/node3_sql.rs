//! Node 3: SQL Generation + ECharts Configuration (spec §4.7), ported from
//! `node3_sql_generation.py`. Builds the SQL query for the chosen chart
//! axes, executes it through the `MetricsStore` trait, and produces both an
//! ECharts option document and a matplotlib code sample for downstream
//! consumers that prefer static images.

use serde_json::{json, Value};

use crate::rag::error::RagError;
use crate::rag::state::RagState;
use crate::rag::store::{ChartRow, MetricsStore};

pub async fn run<M: MetricsStore>(state: &mut RagState, store: &M) -> Result<(), RagError> {
    let sql_query = generate_sql(
        &state.title,
        &state.season,
        state.week,
        &state.x_axis,
        &state.y_axis,
        &state.chart_filter,
    );

    let sql_result = store.execute_chart_sql(&sql_query).await.unwrap_or_else(|_| Vec::new());

    state.chart_config = generate_echarts(&sql_result, state.chart_type, &state.chart_title, &state.y_axis);
    state.python_code = generate_python_code(&sql_query, state.chart_type, &state.chart_title, &state.x_axis, &state.y_axis);
    state.sql_query = sql_query;
    state.sql_result = sql_result;

    Ok(())
}

/// Doubles embedded single quotes; `week` is typed `i32` so it cannot carry
/// injected SQL on its own. `chart_filter` is an LLM-authored SQL fragment
/// and is trusted as-is, matching the trait boundary `execute_chart_sql`
/// exposes (a single opaque SQL string, since axis names cannot be bind
/// parameters).
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn generate_sql(title: &str, season: &str, week: i32, x_axis: &str, y_axis: &str, chart_filter: &str) -> String {
    let mut conditions = vec![
        format!("title = '{}'", escape_literal(title)),
        format!("season = '{}'", escape_literal(season)),
        format!("week_number = {week}"),
    ];

    if !chart_filter.is_empty() {
        conditions.push(chart_filter.to_string());
    }

    if x_axis == "segment_combo" {
        conditions.push("segment_combo IS NOT NULL".to_string());
    }

    let where_clause = conditions.join(" AND ");

    format!(
        "SELECT\n    {x_axis},\n    metric_name,\n    {y_axis},\n    value_current,\n    value_previous,\n    value_delta,\n    is_outlier,\n    outlier_type\nFROM metrics_data\nWHERE {where_clause}\nORDER BY {y_axis} DESC NULLS LAST\nLIMIT 10"
    )
}

fn clean_label(raw: &str) -> String {
    raw.replace('_', " ").replace('=', ": ")
}

fn generate_echarts(data: &[ChartRow], chart_type: crate::rag::state::ChartType, chart_title: &str, y_axis: &str) -> Value {
    use crate::rag::state::ChartType;

    if data.is_empty() {
        return json!({
            "title": {"text": chart_title},
            "xAxis": {"type": "category", "data": []},
            "yAxis": {"type": "value"},
            "series": [{"type": chart_type_label(chart_type), "data": []}]
        });
    }

    let x_data: Vec<String> = data
        .iter()
        .map(|row| row.x_value.as_deref().map(clean_label).unwrap_or_else(|| "Unknown".to_string()))
        .collect();

    let y_data: Vec<f64> = data
        .iter()
        .map(|row| {
            let raw = row.y_value.unwrap_or(0.0);
            if y_axis == "contribution_value" {
                (raw * 100.0 * 10.0).round() / 10.0
            } else {
                raw
            }
        })
        .collect();

    let y_axis_name = if y_axis == "contribution_value" { "Contribution %".to_string() } else { y_axis.to_string() };

    match chart_type {
        ChartType::Bar => json!({
            "title": {"text": chart_title, "left": "center"},
            "tooltip": {"trigger": "axis"},
            "grid": {"left": "3%", "right": "4%", "bottom": "15%", "containLabel": true},
            "xAxis": {"type": "category", "data": x_data, "axisLabel": {"rotate": 45, "interval": 0}},
            "yAxis": {"type": "value", "name": y_axis_name},
            "series": [{
                "type": "bar",
                "data": y_data,
                "itemStyle": {
                    "color": {
                        "type": "linear", "x": 0, "y": 0, "x2": 0, "y2": 1,
                        "colorStops": [
                            {"offset": 0, "color": "#83bff6"},
                            {"offset": 1, "color": "#188df0"}
                        ]
                    }
                },
                "label": {"show": true, "position": "top", "formatter": "{c}%"}
            }]
        }),
        ChartType::Pie => {
            let pie_data: Vec<Value> = x_data
                .iter()
                .zip(y_data.iter())
                .map(|(x, y)| json!({"value": y, "name": x}))
                .collect();
            json!({
                "title": {"text": chart_title, "left": "center"},
                "tooltip": {"trigger": "item"},
                "grid": {"left": "3%", "right": "4%", "bottom": "15%", "containLabel": true},
                "series": [{
                    "type": "pie",
                    "radius": ["40%", "70%"],
                    "data": pie_data,
                    "emphasis": {"itemStyle": {"shadowBlur": 10, "shadowOffsetX": 0, "shadowColor": "rgba(0, 0, 0, 0.5)"}},
                    "label": {"formatter": "{b}: {d}%"}
                }]
            })
        }
        ChartType::Line => json!({
            "title": {"text": chart_title, "left": "center"},
            "tooltip": {"trigger": "axis"},
            "grid": {"left": "3%", "right": "4%", "bottom": "15%", "containLabel": true},
            "xAxis": {"type": "category", "data": x_data},
            "yAxis": {"type": "value"},
            "series": [{"type": "line", "data": y_data, "smooth": true}]
        }),
        ChartType::Scatter => json!({
            "title": {"text": chart_title, "left": "center"},
            "tooltip": {"trigger": "item"},
            "grid": {"left": "3%", "right": "4%", "bottom": "15%", "containLabel": true},
            "xAxis": {"type": "category", "data": x_data},
            "yAxis": {"type": "value"},
            "series": [{"type": "scatter", "data": y_data}]
        }),
    }
}

fn chart_type_label(chart_type: crate::rag::state::ChartType) -> &'static str {
    use crate::rag::state::ChartType;
    match chart_type {
        ChartType::Bar => "bar",
        ChartType::Line => "line",
        ChartType::Pie => "pie",
        ChartType::Scatter => "scatter",
    }
}

fn generate_python_code(sql_query: &str, chart_type: crate::rag::state::ChartType, chart_title: &str, x_axis: &str, y_axis: &str) -> String {
    use crate::rag::state::ChartType;

    let mut code = format!(
        "import pandas as pd\nimport matplotlib.pyplot as plt\nimport seaborn as sns\n\n# SQL Query\nsql = \"\"\"\n{sql_query}\n\"\"\"\n\n# df = pd.read_sql(sql, connection)\ndf = pd.DataFrame(data)  # data from SQL result\n\nplt.figure(figsize=(12, 6))\n"
    );

    match chart_type {
        ChartType::Bar => {
            code.push_str(&format!(
                "\n# Bar chart\nsns.barplot(data=df, x='{x_axis}', y='{y_axis}', palette='Blues_d')\nplt.title('{chart_title}')\nplt.xlabel('{}')\nplt.ylabel('{}')\nplt.xticks(rotation=45, ha='right')\nplt.tight_layout()\n",
                clean_label(x_axis), clean_label(y_axis)
            ));
        }
        ChartType::Pie => {
            code.push_str(&format!(
                "\n# Pie chart\nplt.pie(df['{y_axis}'], labels=df['{x_axis}'], autopct='%1.1f%%')\nplt.title('{chart_title}')\n"
            ));
        }
        ChartType::Line => {
            code.push_str(&format!(
                "\n# Line chart\nplt.plot(df['{x_axis}'], df['{y_axis}'], marker='o')\nplt.title('{chart_title}')\nplt.xlabel('{}')\nplt.ylabel('{}')\nplt.xticks(rotation=45, ha='right')\nplt.tight_layout()\n",
                clean_label(x_axis), clean_label(y_axis)
            ));
        }
        ChartType::Scatter => {
            code.push_str(&format!(
                "\n# Scatter plot\nplt.scatter(df['{x_axis}'], df['{y_axis}'])\nplt.title('{chart_title}')\n"
            ));
        }
    }

    code.push_str("\nplt.savefig('chart.png', dpi=150, bbox_inches='tight')\nplt.show()\n");
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_sql_escapes_single_quotes_in_title() {
        let sql = generate_sql("o'brien", "Season 3", 2, "segment_combo", "contribution_value", "");
        assert!(sql.contains("title = 'o''brien'"));
        assert!(sql.contains("segment_combo IS NOT NULL"));
    }

    #[test]
    fn generate_sql_appends_chart_filter_when_present() {
        let sql = generate_sql("t", "s", 1, "metric_name", "value_current", "is_outlier = true");
        assert!(sql.contains("is_outlier = true"));
    }

    #[test]
    fn empty_chart_rows_yield_empty_series() {
        let option = generate_echarts(&[], crate::rag::state::ChartType::Bar, "Title", "value_current");
        assert_eq!(option["series"][0]["data"], serde_json::json!([]));
    }

    #[test]
    fn contribution_value_is_converted_to_percentage() {
        let rows = vec![ChartRow {
            x_value: Some("whales".to_string()),
            metric_name: Some("dau".to_string()),
            y_value: Some(0.4567),
            value_current: None,
            value_previous: None,
            value_delta: None,
            is_outlier: Some(false),
            outlier_type: None,
        }];
        let option = generate_echarts(&rows, crate::rag::state::ChartType::Bar, "Title", "contribution_value");
        assert_eq!(option["series"][0]["data"][0], 45.7);
        assert_eq!(option["xAxis"]["data"][0], "whales");
    }
}
