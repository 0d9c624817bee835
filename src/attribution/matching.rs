// attribution/matching.rs
//
// Exact one-to-one assignment between speaker clusters and candidate names.
//
// Kuhn-Munkres works on ordered integer weights, so cosine similarities are
// scaled to fixed-point before solving. The algorithm wants at least as many
// columns as rows; when clusters outnumber candidates the matrix is
// transposed and the assignment inverted, leaving surplus rows unmatched.

use anyhow::{anyhow, Result};
use pathfinding::prelude::{kuhn_munkres, Matrix};

const WEIGHT_SCALE: f64 = 1_000_000.0;

fn to_weight(similarity: f32) -> i64 {
    (similarity as f64 * WEIGHT_SCALE).round() as i64
}

/// Solve the maximum-similarity one-to-one assignment over a rectangular
/// similarity matrix (rows = clusters, columns = candidate names).
///
/// Returns, for each row, the assigned column or `None` when rows outnumber
/// columns and the row was left out of the optimal pairing.
pub fn max_similarity_assignment(similarities: &[Vec<f32>]) -> Result<Vec<Option<usize>>> {
    let rows = similarities.len();
    if rows == 0 {
        return Ok(Vec::new());
    }
    let cols = similarities[0].len();
    if cols == 0 {
        return Ok(vec![None; rows]);
    }

    if rows <= cols {
        let weights = Matrix::from_rows(
            similarities
                .iter()
                .map(|row| row.iter().map(|s| to_weight(*s)).collect::<Vec<i64>>()),
        )
        .map_err(|e| anyhow!("Invalid similarity matrix: {:?}", e))?;

        let (_, assignment) = kuhn_munkres(&weights);
        Ok(assignment.into_iter().map(Some).collect())
    } else {
        // More clusters than names: solve the transposed problem, then map
        // each candidate's chosen cluster back to a row assignment.
        let weights = Matrix::from_rows(
            (0..cols).map(|c| (0..rows).map(|r| to_weight(similarities[r][c])).collect::<Vec<i64>>()),
        )
        .map_err(|e| anyhow!("Invalid similarity matrix: {:?}", e))?;

        let (_, assignment) = kuhn_munkres(&weights);
        let mut result = vec![None; rows];
        for (col, row) in assignment.into_iter().enumerate() {
            result[row] = Some(col);
        }
        Ok(result)
    }
}
