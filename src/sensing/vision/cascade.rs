//! Boosted Haar cascades in the XML layout written by OpenCV's `opencv_traincascade`, together with
//! the multi-scale sliding window detector that evaluates them.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use image::{imageops::FilterType, GrayImage};
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use super::{
    grouping::{group_rectangles, Rect},
    integral::IntegralImage,
};

/// Similarity tolerance used when merging neighbouring hits.
const GROUPING_EPS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Ratio between consecutive pyramid levels, must be above 1.
    pub scale_factor: f64,
    /// Raw hits a cluster needs beyond this number to count as a detection.
    pub min_neighbors: u32,
    /// Smallest object side in pixels. 0 means the cascade window size.
    #[serde(default)]
    pub min_size: u32,
}

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

#[derive(Debug, Clone)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
    tilted: bool,
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

/// A decision tree. Children `<= 0` point into `leaves` as `-child`.
#[derive(Debug, Clone)]
struct WeakClassifier {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

#[derive(Debug, Clone)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
    has_tilted: bool,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| anyhow!("<{}> has no <{name}>", node.tag_name().name()))
}

fn text<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    Ok(child(node, name)?.text().unwrap_or_default().trim())
}

fn parse_number<T: std::str::FromStr>(node: Node, name: &str) -> Result<T> {
    let value = text(node, name)?;
    value
        .parse::<T>()
        .map_err(|_| anyhow!("<{name}> holds {value:?} which isn't a number"))
}

fn numbers(value: &str) -> Result<Vec<f64>> {
    value
        .split_whitespace()
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| anyhow!("{v:?} isn't a number"))
        })
        .collect()
}

/// Items of an OpenCV sequence are `<_>` elements.
fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn parse_stage(node: Node) -> Result<Stage> {
    let threshold = parse_number::<f64>(node, "stageThreshold")?;
    let classifiers = items(child(node, "weakClassifiers")?)
        .map(|weak| {
            let internal = numbers(text(weak, "internalNodes")?)?;
            if internal.is_empty() || internal.len() % 4 != 0 {
                bail!(
                    "internalNodes must hold groups of 4 values, got {}",
                    internal.len()
                );
            }
            let nodes = internal
                .chunks_exact(4)
                .map(|node| {
                    if node[2] < 0.0 {
                        bail!("Negative feature index {}", node[2]);
                    }
                    Ok(TreeNode {
                        left: node[0] as i32,
                        right: node[1] as i32,
                        feature: node[2] as usize,
                        threshold: node[3],
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let leaves = numbers(text(weak, "leafValues")?)?;
            Ok(WeakClassifier { nodes, leaves })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_feature(node: Node) -> Result<HaarFeature> {
    let rects = items(child(node, "rects")?)
        .map(|rect| {
            let values = numbers(rect.text().unwrap_or_default())?;
            let [x, y, width, height, weight] = values[..] else {
                bail!("A feature rectangle needs 5 values, got {values:?}");
            };
            if x < 0.0 || y < 0.0 || width < 0.0 || height < 0.0 {
                bail!("Negative feature rectangle {values:?}");
            }
            Ok(WeightedRect {
                x: x as u32,
                y: y as u32,
                width: width as u32,
                height: height as u32,
                weight,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if rects.is_empty() {
        bail!("Feature without rectangles");
    }
    let tilted = match node.children().find(|n| n.has_tag_name("tilted")) {
        Some(tilted) => tilted.text().unwrap_or_default().trim() != "0",
        None => false,
    };
    Ok(HaarFeature { rects, tilted })
}

impl HaarCascade {
    pub fn load(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path).with_context(|| format!("Can't read {path:?}"))?;
        Self::from_xml_str(&xml).with_context(|| format!("Invalid cascade {path:?}"))
    }

    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let document = roxmltree::Document::parse(xml)?;
        let cascade = document
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .context("Missing <cascade>. Only the traincascade layout is supported")?;

        let stage_type = text(cascade, "stageType")?;
        if stage_type != "BOOST" {
            bail!("Unsupported stage type {stage_type}");
        }
        let feature_type = text(cascade, "featureType")?;
        if feature_type != "HAAR" {
            bail!("Unsupported feature type {feature_type}");
        }

        let window_width = parse_number::<u32>(cascade, "width")?;
        let window_height = parse_number::<u32>(cascade, "height")?;
        if window_width < 3 || window_height < 3 {
            bail!("Window {window_width}x{window_height} is too small");
        }

        let stages = items(child(cascade, "stages")?)
            .enumerate()
            .map(|(index, stage)| parse_stage(stage).with_context(|| format!("Stage {index}")))
            .collect::<Result<Vec<_>>>()?;
        let features = items(child(cascade, "features")?)
            .enumerate()
            .map(|(index, feature)| {
                parse_feature(feature).with_context(|| format!("Feature {index}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let cascade = Self {
            window_width,
            window_height,
            has_tilted: features.iter().any(|f| f.tilted),
            stages,
            features,
        };
        cascade.validate()?;
        Ok(cascade)
    }

    fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            bail!("Cascade has no stages");
        }
        for (s, stage) in self.stages.iter().enumerate() {
            for (w, weak) in stage.classifiers.iter().enumerate() {
                for (n, node) in weak.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        bail!("Stage {s} classifier {w} references missing feature {}", node.feature);
                    }
                    // Children always come after their parent, which also rules out cycles.
                    for next in [node.left, node.right] {
                        let valid = if next > 0 {
                            (next as usize) > n && (next as usize) < weak.nodes.len()
                        } else {
                            (next.unsigned_abs() as usize) < weak.leaves.len()
                        };
                        if !valid {
                            bail!("Stage {s} classifier {w} has a dangling branch {next}");
                        }
                    }
                }
            }
        }
        for (index, feature) in self.features.iter().enumerate() {
            for rect in &feature.rects {
                let fits = if feature.tilted {
                    rect.x >= rect.height
                        && rect.x + rect.width <= self.window_width
                        && rect.y + rect.width + rect.height <= self.window_height
                } else {
                    rect.x + rect.width <= self.window_width
                        && rect.y + rect.height <= self.window_height
                };
                if !fits {
                    bail!("Feature {index} leaves the {}x{} window", self.window_width, self.window_height);
                }
            }
        }
        Ok(())
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    fn feature_value(&self, integral: &IntegralImage, feature: &HaarFeature, x: u32, y: u32) -> f64 {
        feature
            .rects
            .iter()
            .map(|rect| {
                let sum = if feature.tilted {
                    integral.tilted_sum(x + rect.x, y + rect.y, rect.width, rect.height)
                } else {
                    integral.rect_sum(x + rect.x, y + rect.y, rect.width, rect.height)
                };
                rect.weight * sum as f64
            })
            .sum()
    }

    /// Inverse variance normalization for the window at `(x, y)`, computed over the window minus a
    /// 1 pixel border. Flat windows get a factor of 1 and are still evaluated.
    fn normalization(&self, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        let (w, h) = (self.window_width - 2, self.window_height - 2);
        let area = (w * h) as f64;
        let sum = integral.rect_sum(x + 1, y + 1, w, h) as f64;
        let squares = integral.rect_square_sum(x + 1, y + 1, w, h) as f64;
        let spread = area * squares - sum * sum;
        if spread > 0.0 {
            1.0 / spread.sqrt()
        } else {
            1.0
        }
    }

    fn evaluate_window(&self, integral: &IntegralImage, x: u32, y: u32) -> bool {
        let inverse = self.normalization(integral, x, y);
        for stage in &self.stages {
            let mut score = 0.0;
            for weak in &stage.classifiers {
                let mut index = 0usize;
                let leaf = loop {
                    let node = weak.nodes[index];
                    let value =
                        self.feature_value(integral, &self.features[node.feature], x, y) * inverse;
                    let next = if value < node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                    if next <= 0 {
                        break next.unsigned_abs() as usize;
                    }
                    index = next as usize;
                };
                score += weak.leaves[leaf];
            }
            if score < stage.threshold {
                return false;
            }
        }
        true
    }

    /// Scans `image` over an image pyramid and returns every window accepted by all stages,
    /// mapped back to `image` coordinates, in scan order. A level is scanned only while the scaled
    /// image is strictly larger than the window, and the last column and row of offsets are
    /// excluded.
    pub fn raw_detections(&self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Rect>> {
        if !(params.scale_factor > 1.0) {
            bail!("Scale factor must be above 1, got {}", params.scale_factor);
        }
        let (width, height) = image.dimensions();
        let mut hits = vec![];
        let mut factor = 1.0f64;
        loop {
            let window_w = (self.window_width as f64 * factor).round() as u32;
            let window_h = (self.window_height as f64 * factor).round() as u32;
            let scaled_w = (width as f64 / factor).round() as u32;
            let scaled_h = (height as f64 / factor).round() as u32;
            if scaled_w <= self.window_width || scaled_h <= self.window_height {
                break;
            }
            if window_w.min(window_h) >= params.min_size {
                let scaled = if factor == 1.0 {
                    image.clone()
                } else {
                    image::imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle)
                };
                let integral = IntegralImage::new(&scaled, self.has_tilted);
                let step = if factor > 2.0 { 1 } else { 2 };
                let before = hits.len();
                for y in (0..scaled_h - self.window_height).step_by(step) {
                    for x in (0..scaled_w - self.window_width).step_by(step) {
                        if self.evaluate_window(&integral, x, y) {
                            hits.push(Rect::new(
                                (x as f64 * factor).round() as u32,
                                (y as f64 * factor).round() as u32,
                                window_w,
                                window_h,
                            ));
                        }
                    }
                }
                trace!("Scale {factor:.3} produced {} hits", hits.len() - before);
            }
            factor *= params.scale_factor;
        }
        Ok(hits)
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect_multi_scale(&self, image: &GrayImage, params: &DetectionParams) -> Result<Vec<Rect>> {
        let hits = self.raw_detections(image, params)?;
        Ok(group_rectangles(&hits, params.min_neighbors, GROUPING_EPS))
    }
}
