//! Shape signatures: classification and similarity scoring.

use serde::{Deserialize, Serialize};

use crate::contour::{approx_polygon, Contour};

/// Fraction of the perimeter used as polygon-approximation tolerance.
const APPROX_TOLERANCE_FRAC: f32 = 0.03;
const CIRCLE_MIN_COMPACTNESS: f32 = 0.85;
const CIRCLE_MIN_VERTICES: usize = 8;

/// Weights of the similarity score.
const TYPE_WEIGHT: f32 = 0.4;
const AREA_WEIGHT: f32 = 0.2;
const COMPACTNESS_WEIGHT: f32 = 0.2;
const VERTEX_WEIGHT: f32 = 0.2;
/// Type contribution when the classified types disagree.
const TYPE_MISMATCH: f32 = 0.3;

/// Shape classes distinguished by the analyzer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Circle,
    Triangle,
    Rectangle,
    Polygon,
    Unknown,
}

/// Geometric signature of a contour.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShapeSignature {
    pub shape_type: ShapeType,
    pub area: f32,
    /// `4*pi*area / perimeter^2`; 1.0 for a perfect circle.
    pub compactness: f32,
    /// Vertex count after polygon approximation.
    pub vertex_count: usize,
}

/// Compute the signature of a contour.
pub fn analyze_shape(contour: &Contour) -> ShapeSignature {
    let area = contour.area();
    let perimeter = contour.perimeter();
    let compactness = if perimeter > f32::EPSILON {
        (4.0 * std::f32::consts::PI * area / (perimeter * perimeter)).min(1.0)
    } else {
        0.0
    };
    let approx = approx_polygon(&contour.points, APPROX_TOLERANCE_FRAC * perimeter);
    let vertex_count = approx.len();
    ShapeSignature {
        shape_type: classify(compactness, vertex_count),
        area,
        compactness,
        vertex_count,
    }
}

fn classify(compactness: f32, vertices: usize) -> ShapeType {
    if vertices < 3 {
        ShapeType::Unknown
    } else if compactness > CIRCLE_MIN_COMPACTNESS && vertices >= CIRCLE_MIN_VERTICES {
        ShapeType::Circle
    } else if vertices == 3 {
        ShapeType::Triangle
    } else if vertices == 4 {
        ShapeType::Rectangle
    } else {
        ShapeType::Polygon
    }
}

/// Score a candidate contour against the reference signature.
///
/// `0.4*type + 0.2*area + 0.2*compactness + 0.2*vertices`, each similarity
/// in [0, 1]. Vertex counts of circles are unstable under approximation,
/// so a circle reference always grants full vertex similarity.
pub fn match_score(candidate: &Contour, reference: &ShapeSignature) -> f32 {
    let sig = analyze_shape(candidate);

    let type_match = if sig.shape_type == reference.shape_type {
        1.0
    } else {
        TYPE_MISMATCH
    };
    let area_sim = 1.0
        - ((sig.area - reference.area).abs() / reference.area.max(f32::EPSILON)).min(1.0);
    let compactness_sim = 1.0
        - ((sig.compactness - reference.compactness).abs() / reference.compactness.max(0.1))
            .min(1.0);
    let vertex_sim = if reference.shape_type == ShapeType::Circle
        || sig.vertex_count == reference.vertex_count
    {
        1.0
    } else {
        0.5
    };

    TYPE_WEIGHT * type_match
        + AREA_WEIGHT * area_sim
        + COMPACTNESS_WEIGHT * compactness_sim
        + VERTEX_WEIGHT * vertex_sim
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn regular_polygon(n: usize, radius: f32) -> Contour {
        let points = (0..n)
            .map(|k| {
                let t = k as f32 / n as f32 * std::f32::consts::TAU;
                Point2::new(100.0 + radius * t.cos(), 100.0 + radius * t.sin())
            })
            .collect();
        Contour { points }
    }

    fn square(side: f32) -> Contour {
        Contour {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(side, 0.0),
                Point2::new(side, side),
                Point2::new(0.0, side),
            ],
        }
    }

    #[test]
    fn circle_classifies_as_circle() {
        // 32-gon of radius 18: area ~1011, compactness ~0.997
        let sig = analyze_shape(&regular_polygon(32, 18.0));
        assert_eq!(sig.shape_type, ShapeType::Circle);
        assert!(sig.compactness > 0.95, "compactness = {}", sig.compactness);
        assert!((sig.area - 1000.0).abs() < 50.0, "area = {}", sig.area);
        assert!(sig.vertex_count >= 8);
    }

    #[test]
    fn triangle_and_rectangle_classify() {
        let tri = analyze_shape(&regular_polygon(3, 20.0));
        assert_eq!(tri.shape_type, ShapeType::Triangle);

        let rect = analyze_shape(&square(20.0));
        assert_eq!(rect.shape_type, ShapeType::Rectangle);
        assert_relative_eq!(rect.compactness, std::f32::consts::FRAC_PI_4, epsilon = 0.01);
    }

    #[test]
    fn degenerate_contour_is_unknown() {
        let sig = analyze_shape(&Contour {
            points: vec![Point2::new(1.0, 1.0)],
        });
        assert_eq!(sig.shape_type, ShapeType::Unknown);
        assert_eq!(sig.area, 0.0);
    }

    #[test]
    fn identical_shape_scores_near_one() {
        let circle = regular_polygon(32, 18.0);
        let reference = analyze_shape(&circle);
        let score = match_score(&circle, &reference);
        assert!(score > 0.95, "score = {score}");
    }

    #[test]
    fn square_against_circle_reference_scores_low() {
        // equal-area square against a circle reference: the type mismatch
        // caps the score well below a tight acceptance threshold
        let circle_ref = analyze_shape(&regular_polygon(32, 18.0));
        let side = circle_ref.area.sqrt();
        let score = match_score(&square(side), &circle_ref);
        assert!(score < 0.7, "score = {score}");
        // and it scores clearly worse than the matching shape
        let self_score = match_score(&regular_polygon(32, 18.0), &circle_ref);
        assert!(score < self_score - 0.2);
    }

    #[test]
    fn area_mismatch_lowers_score() {
        let reference = analyze_shape(&square(20.0));
        let near = match_score(&square(21.0), &reference);
        let far = match_score(&square(40.0), &reference);
        assert!(near > far);
    }
}
