//! What chart templates see: `values`, `release` and `chart`

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::values::Values;

/// Service name exposed as `release.service`
pub const RELEASE_SERVICE: &str = "lokoctl";

/// The release a component's chart is rendered for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseInfo {
    /// Release name, the component name
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub service: &'static str,
}

impl ReleaseInfo {
    /// First revision of `name` in `namespace`
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            service: RELEASE_SERVICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    pub app_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// Chart defaults merged with the component's values
    pub values: JsonValue,
    pub release: ReleaseInfo,
    pub chart: ChartInfo,
}

impl TemplateContext {
    pub fn new(values: Values, release: ReleaseInfo, chart: ChartInfo) -> Self {
        Self {
            values: values.into_inner(),
            release,
            chart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_context() {
        let values = Values::from_yaml("replicas: 3").unwrap();
        let release = ReleaseInfo::for_install("contour", "projectcontour");
        let chart = ChartInfo {
            name: "contour".to_string(),
            version: "0.2.0".to_string(),
            app_version: Some("v1.10.0".to_string()),
        };

        let ctx = serde_json::to_value(TemplateContext::new(values, release, chart)).unwrap();

        assert_eq!(ctx["values"]["replicas"], 3);
        assert_eq!(ctx["release"]["namespace"], "projectcontour");
        assert_eq!(ctx["release"]["revision"], 1);
        assert_eq!(ctx["release"]["service"], "lokoctl");
        assert_eq!(ctx["chart"]["appVersion"], "v1.10.0");
    }
}
