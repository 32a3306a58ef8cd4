use std::f64::consts::PI;
use serde::Serialize;

const CENTER: f64 = 50.0;
const RADIUS: f64 = 35.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    pub agent_id: String,
    pub x: f64,
    pub y: f64,
}

/// Place `n` nodes evenly on a circle, first node at the top, clockwise.
/// Coordinates are percentages of the canvas.
pub fn positions(n: usize) -> Vec<(f64, f64)> {
    if n == 0 {
        return Vec::new();
    }
    let step = 2.0 * PI / n as f64;
    (0..n)
        .map(|i| {
            let angle = i as f64 * step - PI / 2.0;
            (CENTER + RADIUS * angle.cos(), CENTER + RADIUS * angle.sin())
        })
        .collect()
}

pub fn layout<S: AsRef<str>>(agent_ids: &[S]) -> Vec<AgentPosition> {
    positions(agent_ids.len())
        .into_iter()
        .zip(agent_ids)
        .map(|((x, y), id)| AgentPosition {
            agent_id: id.as_ref().to_string(),
            x,
            y,
        })
        .collect()
}
