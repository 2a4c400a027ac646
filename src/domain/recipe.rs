//! Recipe parsing: `/`-delimited material strings paired with positional
//! thickness fields, turned into a percentage-weighted layer breakdown.

use crate::domain::categories::{normalize_code, CategoryMap};
use serde::{Deserialize, Serialize};

pub const RECIPE_DELIMITER: char = '/';
pub const DEFAULT_MARKER: &str = "-EVOH";

/// What happens to a recipe token containing the exclusion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExclusionPolicy {
    /// Remove the marker from the token and keep the layer at its position.
    #[default]
    Strip,
    /// Remove the whole token before thickness pairing. Every later token
    /// shifts one thickness slot to the left.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRules {
    pub marker: String,
    pub policy: ExclusionPolicy,
}

impl Default for RecipeRules {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            policy: ExclusionPolicy::Strip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialLayer {
    /// 1-based position in the recipe.
    pub position: usize,
    pub material: String,
    pub thickness: Option<f64>,
    pub category: String,
    /// Share of the total thickness in percent, unrounded.
    pub proportion: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerBreakdown {
    layers: Vec<MaterialLayer>,
    total_thickness: f64,
}

impl LayerBreakdown {
    pub const EXPOSED_LAYERS: usize = 3;

    pub fn layers(&self) -> &[MaterialLayer] {
        &self.layers
    }

    /// The layers that get flat output columns.
    pub fn exposed(&self) -> &[MaterialLayer] {
        let end = self.layers.len().min(Self::EXPOSED_LAYERS);
        &self.layers[..end]
    }

    pub fn total_thickness(&self) -> f64 {
        self.total_thickness
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Splits a recipe into trimmed, non-empty tokens in authored order.
pub fn split_recipe(recipe: &str) -> Vec<&str> {
    recipe
        .split(RECIPE_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Numeric thickness from a raw field. Accepts a decimal comma.
/// Unparseable values count as zero.
pub fn parse_thickness(raw: &str) -> f64 {
    let cleaned = raw.trim().replace(',', ".");
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            tracing::debug!("Unparseable thickness '{}' treated as 0", raw);
            0.0
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn parse_layers(
    recipe: Option<&str>,
    thicknesses: [Option<&str>; 3],
    rules: &RecipeRules,
    categories: &CategoryMap,
) -> LayerBreakdown {
    let Some(recipe) = recipe.filter(|r| !r.trim().is_empty()) else {
        return LayerBreakdown::default();
    };

    // 只收集有值的厚度，依欄位順序排列
    let positional: Vec<&str> = thicknesses
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let marker = normalize_code(&rules.marker);
    let mut tokens: Vec<String> = split_recipe(recipe)
        .into_iter()
        .map(normalize_code)
        .collect();

    if !marker.is_empty() {
        tokens = match rules.policy {
            ExclusionPolicy::Drop => tokens
                .into_iter()
                .filter(|token| !token.contains(&marker))
                .collect(),
            ExclusionPolicy::Strip => tokens
                .into_iter()
                .map(|token| strip_marker(token, &marker))
                .collect(),
        };
    }

    let mut layers: Vec<MaterialLayer> = tokens
        .into_iter()
        .enumerate()
        .map(|(idx, material)| {
            let thickness = positional.get(idx).map(|raw| parse_thickness(raw));
            let category = categories.category_for(&material).to_string();
            MaterialLayer {
                position: idx + 1,
                material,
                thickness,
                category,
                proportion: 0.0,
            }
        })
        .collect();

    let total_thickness: f64 = layers.iter().filter_map(|l| l.thickness).sum();
    if total_thickness > 0.0 {
        for layer in &mut layers {
            layer.proportion = layer.thickness.unwrap_or(0.0) / total_thickness * 100.0;
        }
    }

    LayerBreakdown {
        layers,
        total_thickness,
    }
}

fn strip_marker(token: String, marker: &str) -> String {
    if !token.contains(marker) {
        return token;
    }
    let stripped = token.replace(marker, "").trim().to_string();
    if stripped.is_empty() {
        // nothing but the marker; keep it so the position survives
        token
    } else {
        stripped
    }
}
