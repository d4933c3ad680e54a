//! Chart script overlay text

use serde::{Deserialize, Serialize};

use crate::gamma::GammaLevels;

/// Overlay formatting options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Written as a leading `//` comment line
    pub title: Option<String>,
    /// Decimal places for strikes
    pub decimals: usize,
    /// Text placed before each assignment, e.g. `float `
    pub prefix: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            title: None,
            decimals: 2,
            prefix: String::new(),
        }
    }
}

impl OverlayConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Render one assignment per level; `gammaFlip` is omitted when absent
pub fn render_overlay(levels: &GammaLevels, config: &OverlayConfig) -> String {
    let mut out = String::new();
    if let Some(title) = &config.title {
        out.push_str(&format!("// {}\n", title));
    }

    let mut assign = |name: &str, value: f64| {
        out.push_str(&format!(
            "{}{} = {:.*}\n",
            config.prefix, name, config.decimals, value
        ));
    };

    assign("putWall", levels.put_wall);
    assign("callWall", levels.call_wall);
    if let Some(flip) = levels.gamma_flip {
        assign("gammaFlip", flip);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(flip: Option<f64>) -> GammaLevels {
        GammaLevels {
            gamma_flip: flip,
            put_wall: 4500.0,
            call_wall: 4650.0,
        }
    }

    #[test]
    fn test_default_overlay() {
        let text = render_overlay(&levels(Some(4587.456)), &OverlayConfig::default());
        assert_eq!(
            text,
            "putWall = 4500.00\ncallWall = 4650.00\ngammaFlip = 4587.46\n"
        );
    }

    #[test]
    fn test_absent_flip_omitted() {
        let text = render_overlay(&levels(None), &OverlayConfig::default());
        assert!(!text.contains("gammaFlip"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_title_and_prefix() {
        let config = OverlayConfig {
            decimals: 1,
            ..OverlayConfig::default()
        }
        .with_title("SPX 0DTE")
        .with_prefix("float ");
        let text = render_overlay(&levels(None), &config);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "// SPX 0DTE");
        assert_eq!(lines[1], "float putWall = 4500.0");
    }
}
