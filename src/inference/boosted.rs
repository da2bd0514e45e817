//! Gradient-boosted tree ensembles in the XGBoost JSON model format,
//! evaluated natively.
//!
//! Only the fields needed for prediction are read:
//! `learner.learner_model_param.base_score`, `learner.objective.name` and
//! per tree `left_children`, `right_children`, `split_indices`,
//! `split_conditions` (leaf values live here for leaf nodes) and
//! `default_left`.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::estimator::RiskEstimator;
use super::features::{FeatureVector, FEATURE_COUNT};
use super::InferenceError;

const LEAF: i32 = -1;

#[derive(Deserialize)]
struct ModelDocument {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    learner_model_param: LearnerModelParam,
    objective: ObjectiveSpec,
    gradient_booster: GradientBooster,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: String,
}

#[derive(Deserialize)]
struct ObjectiveSpec {
    name: String,
}

#[derive(Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<TreeEnsemble>,
}

#[derive(Deserialize)]
struct TreeEnsemble {
    trees: Vec<RawTree>,
}

#[derive(Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    #[serde(deserialize_with = "flags")]
    default_left: Vec<bool>,
}

/// Older exports write `default_left` as booleans, newer ones as 0/1.
fn flags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<bool>, D::Error> {
    use serde::de::Error;
    Vec::<Value>::deserialize(d)?
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
            other => Err(D::Error::custom(format!("invalid default_left entry: {other}"))),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Objective {
    /// Margin passed through the sigmoid.
    Logistic,
    /// Margin returned as is.
    Raw,
}

impl Objective {
    fn parse(name: &str) -> Result<Self, InferenceError> {
        match name {
            "binary:logistic" | "reg:logistic" => Ok(Objective::Logistic),
            "binary:logitraw" | "reg:squarederror" | "reg:linear" => Ok(Objective::Raw),
            other => Err(InferenceError::Unsupported(format!("objective {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    /// Split threshold, or the leaf value for leaves.
    value: f32,
    default_left: bool,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: RawTree, index: usize) -> Result<Self, InferenceError> {
        let n = raw.left_children.len();
        let lengths = [
            raw.right_children.len(),
            raw.split_indices.len(),
            raw.split_conditions.len(),
            raw.default_left.len(),
        ];
        if n == 0 || lengths.iter().any(|&l| l != n) {
            return Err(InferenceError::Malformed(format!(
                "tree {index}: inconsistent node arrays"
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (raw.left_children[i], raw.right_children[i]);
            let is_leaf = left == LEAF;
            if is_leaf != (right == LEAF) {
                return Err(InferenceError::Malformed(format!(
                    "tree {index}: node {i} has a single child"
                )));
            }
            if !is_leaf {
                for child in [left, right] {
                    if child <= i as i32 || child as usize >= n {
                        return Err(InferenceError::Malformed(format!(
                            "tree {index}: node {i} has invalid child {child}"
                        )));
                    }
                }
                let feature = raw.split_indices[i] as usize;
                if feature >= FEATURE_COUNT {
                    return Err(InferenceError::FeatureMismatch {
                        expected: FEATURE_COUNT,
                        actual: feature + 1,
                    });
                }
            }
            nodes.push(Node {
                left,
                right,
                feature: raw.split_indices[i] as usize,
                value: raw.split_conditions[i],
                default_left: raw.default_left[i],
            });
        }
        Ok(Self { nodes })
    }

    /// Children always have larger indices than their parent (checked at
    /// load), so the walk terminates.
    fn leaf_value(&self, features: &FeatureVector) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.left == LEAF {
                return node.value;
            }
            let x = features[node.feature];
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                x < node.value
            };
            let next = if go_left { node.left } else { node.right };
            idx = next as usize;
        }
    }
}

/// A loaded boosted-tree ensemble.
#[derive(Debug, Clone)]
pub struct BoostedTreeModel {
    name: String,
    trees: Vec<Tree>,
    base_margin: f64,
    objective: Objective,
}

impl BoostedTreeModel {
    pub fn load(name: &str, path: &Path) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(name, &raw)
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, InferenceError> {
        let doc: ModelDocument =
            serde_json::from_str(json).map_err(|e| InferenceError::Malformed(e.to_string()))?;
        let learner = doc.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(InferenceError::Unsupported(format!(
                "booster {}",
                learner.gradient_booster.name
            )));
        }
        let ensemble = learner
            .gradient_booster
            .model
            .ok_or_else(|| InferenceError::Malformed("missing gradient_booster.model".into()))?;

        let objective = Objective::parse(&learner.objective.name)?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let base_margin = match objective {
            Objective::Logistic => {
                if base_score.is_nan() || base_score <= 0.0 || base_score >= 1.0 {
                    return Err(InferenceError::Malformed(format!(
                        "base_score {base_score} outside (0, 1) for logistic objective"
                    )));
                }
                (base_score / (1.0 - base_score)).ln()
            }
            Objective::Raw => base_score,
        };

        let trees = ensemble
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_raw(t, i))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(model = name, trees = trees.len(), ?objective, "Boosted tree model parsed");

        Ok(Self {
            name: name.to_string(),
            trees,
            base_margin,
            objective,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn margin(&self, features: &FeatureVector) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|t| f64::from(t.leaf_value(features)))
                .sum::<f64>()
    }
}

impl RiskEstimator for BoostedTreeModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let margin = self.margin(features);
        Ok(match self.objective {
            Objective::Logistic => 1.0 / (1.0 + (-margin).exp()),
            Objective::Raw => margin,
        })
    }
}

/// `"5E-1"` in most exports, `"[5E-1]"` in multi-target capable versions.
fn parse_base_score(raw: &str) -> Result<f64, InferenceError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let first = trimmed.split(',').next().unwrap_or("").trim();
    first
        .parse::<f64>()
        .map_err(|_| InferenceError::Malformed(format!("base_score {raw:?}")))
}
