//! Cost matrices and linear assignment for tracklet association.

use ndarray::Array2;

use crate::entity::BoundingBox;

/// Padding cost for rows/columns added to square up the assignment problem.
const PAD_COST: f64 = 1e6;

/// `1 - IoU` between every track box (rows) and detection box (columns).
pub fn iou_distance(track_boxes: &[BoundingBox], det_boxes: &[BoundingBox]) -> Array2<f64> {
    Array2::from_shape_fn((track_boxes.len(), det_boxes.len()), |(i, j)| {
        1.0 - track_boxes[i].iou(&det_boxes[j])
    })
}

/// Raw IoU between every box in `a` and every box in `b`.
pub fn iou_matrix(a: &[BoundingBox], b: &[BoundingBox]) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i].iou(&b[j]))
}

/// Weight IoU similarity by detection confidence, column-wise.
pub fn fuse_score(cost_matrix: &mut Array2<f64>, scores: &[f32]) {
    for ((_, j), cost) in cost_matrix.indexed_iter_mut() {
        let similarity = (1.0 - *cost) * scores[j] as f64;
        *cost = 1.0 - similarity;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// (row, column) pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Minimum-cost assignment, rejecting pairs whose cost exceeds `thresh`.
pub fn linear_assignment(cost_matrix: &Array2<f64>, thresh: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: Vec::new(),
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    let size = num_rows.max(num_cols);
    let padded = Array2::from_shape_fn((size, size), |(i, j)| {
        if i < num_rows && j < num_cols {
            cost_matrix[[i, j]]
        } else {
            PAD_COST
        }
    });

    let mut result = AssignmentResult::default();
    let mut detection_free = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
                if col < num_cols && cost_matrix[[row, col]] <= thresh {
                    result.matches.push((row, col));
                    detection_free[col] = false;
                } else {
                    result.unmatched_tracks.push(row);
                }
            }
        }
        Err(_) => result.unmatched_tracks = (0..num_rows).collect(),
    }

    result.unmatched_detections = detection_free
        .iter()
        .enumerate()
        .filter_map(|(j, &free)| free.then_some(j))
        .collect();
    result
}
