use crate::pipeline::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_INPUT_PATH: &str = "all 2.xlsx";
pub const DEFAULT_OUTPUT_PATH: &str = "data/publication.tsv";
pub const DEFAULT_COLOR_MAP_PATH: &str = "pubJavascripts/myscripts/themeColors.json";

/// The optional configuration file. Every entry may be overridden on the
/// command line.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "inputPath")]
    pub input_path: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
    #[serde(rename = "authorSeparator")]
    pub author_separator: Option<String>,
    #[serde(rename = "groupOrder")]
    pub _group_order: Option<String>,
    pub acronyms: Option<Vec<String>>,
    #[serde(rename = "colorMapPath")]
    pub color_map_path: Option<String>,
}

impl PipelineConfig {
    pub fn group_order(&self) -> PipelineResult<GroupOrder> {
        match self._group_order.as_deref() {
            None | Some("firstSeen") => Ok(GroupOrder::FirstSeen),
            Some("sorted") => Ok(GroupOrder::Sorted),
            Some(x) => whatever!("unknown group order: {} (expected firstSeen or sorted)", x),
        }
    }

    /// The aggregation rules. `sorted` comes from the command line and wins
    /// over the file.
    pub fn aggregation_rules(&self, sorted: bool) -> PipelineResult<AggregationRules> {
        let group_order = if sorted {
            GroupOrder::Sorted
        } else {
            self.group_order()?
        };
        let defaults = AggregationRules::default();
        let separator = self
            .author_separator
            .as_deref()
            .unwrap_or(&defaults.author_separator);
        Ok(AggregationRules::new(separator, group_order))
    }

    pub fn theme_normalizer(&self) -> ThemeNormalizer {
        match &self.acronyms {
            Some(acronyms) => ThemeNormalizer::new(acronyms),
            None => ThemeNormalizer::default(),
        }
    }
}

pub fn read_config(path: &str) -> PipelineResult<PipelineConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: PipelineConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    info!("Read configuration {}", path);
    Ok(config)
}

#[derive(Debug, Deserialize)]
struct ColorMapFile {
    #[serde(rename = "themeColors")]
    theme_colors: Option<BTreeMap<String, String>>,
}

/// Reads the colors of the themes. A missing or malformed file gives an
/// empty map.
pub fn read_color_map(path: &str) -> BTreeMap<String, String> {
    if !Path::new(path).is_file() {
        debug!("read_color_map: no color map at {}", path);
        return BTreeMap::new();
    }
    let parsed: Result<ColorMapFile, String> = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()));
    match parsed {
        Ok(cm) => cm.theme_colors.unwrap_or_default(),
        Err(e) => {
            warn!("Ignoring the color map {}: {}", path, e);
            BTreeMap::new()
        }
    }
}
