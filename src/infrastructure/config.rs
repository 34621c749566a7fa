use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub report: ReportSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// SQLite file path, or ":memory:" for a throwaway store
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportSettings {
    pub location: String,
    /// Regulatory PM2.5 limit (µg/m³) printed alongside the result
    pub parameter_limit: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HistorySettings {
    /// Fixed seed for the synthetic chart history; unset draws fresh entropy per report
    pub seed: Option<u64>,
}

pub const IN_MEMORY_DATABASE: &str = ":memory:";

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/aqi")
}

pub fn load_app_config_from(name: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.bind_address", "0.0.0.0:8080")?
        .set_default("database.path", "aqi_data.db")?
        .set_default(
            "report.location",
            "Divisional Environmental Complex & Monitoring Center, Adyala Road, Rawalpindi",
        )?
        .set_default("report.parameter_limit", 35.0)?
        .add_source(config::File::with_name(name).required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${key}` placeholders in a template string
pub fn fill_template(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    // Single left-to-right pass; substituted values are never rescanned
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            rest = &rest[start..];
            break;
        };
        match vars.get(&after[..end]) {
            Some(value) => result.push_str(value),
            None => result.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template() {
        let mut vars = HashMap::new();
        vars.insert("index", "176".to_string());
        vars.insert("category", "Unhealthy".to_string());

        let template = "<td>${index}</td><td>${category}</td><td>${missing}</td>";
        let result = fill_template(template, &vars);

        assert_eq!(result, "<td>176</td><td>Unhealthy</td><td>${missing}</td>");
    }

    #[test]
    fn test_fill_template_does_not_expand_values() {
        let mut vars = HashMap::new();
        vars.insert("location", "Lab ${index}".to_string());
        vars.insert("index", "176".to_string());
        vars.insert("category", "${location}".to_string());

        let result = fill_template("${location}|${index}|${category}|${open", &vars);
        assert_eq!(result, "Lab ${index}|176|${location}|${open");
    }

    #[test]
    fn test_defaults_apply_without_file() {
        let config = load_app_config_from("config/does-not-exist").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database.path, "aqi_data.db");
        assert_eq!(config.report.parameter_limit, 35.0);
        assert_eq!(config.history.seed, None);
    }
}
