//! Scatter layout for answer notes.
//!
//! Each note is a node in a small 2-D force simulation: mutual repulsion
//! inside a collision radius plus a mild pull back toward a randomized
//! anchor, run for a fixed number of iterations. The result is a
//! non-overlapping, visually scattered arrangement.
//!
//! Positions are cosmetic and computed locally per device; two devices
//! showing the same board will scatter differently, and nothing is
//! persisted or shared.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Tuning for the scatter force loop.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Board width in layout units.
    pub width: f64,
    /// Board height in layout units.
    pub height: f64,
    /// Fixed number of relaxation iterations.
    pub iterations: usize,
    /// Collision radius around each note.
    pub node_radius: f64,
    /// Displacement per iteration for overlapping pairs.
    pub repulsion: f64,
    /// Fraction of the distance back to the anchor applied per iteration.
    pub anchor_pull: f64,
    /// Seed for deterministic layouts; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            iterations: 120,
            node_radius: 90.0,
            repulsion: 4.0,
            anchor_pull: 0.02,
            seed: None,
        }
    }
}

/// One positioned answer note.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Scatter the given texts over the board.
pub fn scatter(texts: &[String], config: &LayoutConfig) -> Vec<Note> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // Keep notes clear of the border, but never invert the range on a
    // tiny board.
    let margin_x = config.node_radius.min(config.width / 2.0);
    let margin_y = config.node_radius.min(config.height / 2.0);

    let n = texts.len();
    let mut pos: Vec<(f64, f64)> = (0..n)
        .map(|_| {
            (
                rng.gen_range(margin_x..=config.width - margin_x),
                rng.gen_range(margin_y..=config.height - margin_y),
            )
        })
        .collect();
    let anchors = pos.clone();

    for _ in 0..config.iterations {
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = pos[j].0 - pos[i].0;
                let dy = pos[j].1 - pos[i].1;
                let dist = (dx * dx + dy * dy).sqrt();
                let min_dist = 2.0 * config.node_radius;
                if dist >= min_dist {
                    continue;
                }
                // Coincident notes separate along a random axis.
                let (ux, uy) = if dist < f64::EPSILON {
                    let angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                    (angle.cos(), angle.sin())
                } else {
                    (dx / dist, dy / dist)
                };
                let push = config.repulsion * (min_dist - dist) / min_dist;
                pos[i].0 -= ux * push;
                pos[i].1 -= uy * push;
                pos[j].0 += ux * push;
                pos[j].1 += uy * push;
            }
        }
        for i in 0..n {
            pos[i].0 += (anchors[i].0 - pos[i].0) * config.anchor_pull;
            pos[i].1 += (anchors[i].1 - pos[i].1) * config.anchor_pull;
            pos[i].0 = pos[i].0.clamp(margin_x, config.width - margin_x);
            pos[i].1 = pos[i].1.clamp(margin_y, config.height - margin_y);
        }
    }

    texts
        .iter()
        .cloned()
        .zip(pos)
        .map(|(text, (x, y))| Note { text, x, y })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("answer {i}")).collect()
    }

    fn seeded() -> LayoutConfig {
        LayoutConfig { seed: Some(7), ..Default::default() }
    }

    #[test]
    fn notes_stay_within_bounds() {
        let config = seeded();
        for note in scatter(&texts(24), &config) {
            assert!(note.x >= 0.0 && note.x <= config.width);
            assert!(note.y >= 0.0 && note.y <= config.height);
        }
    }

    #[test]
    fn notes_do_not_pile_up() {
        let config = seeded();
        let notes = scatter(&texts(8), &config);
        for (i, a) in notes.iter().enumerate() {
            for b in notes.iter().skip(i + 1) {
                let dist = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(dist > config.node_radius, "notes {a:?} and {b:?} overlap");
            }
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let config = seeded();
        assert_eq!(scatter(&texts(10), &config), scatter(&texts(10), &config));
    }

    #[test]
    fn text_order_is_preserved() {
        let notes = scatter(&texts(3), &seeded());
        assert_eq!(notes[0].text, "answer 0");
        assert_eq!(notes[2].text, "answer 2");
    }

    #[test]
    fn empty_input_yields_empty_layout() {
        assert!(scatter(&[], &seeded()).is_empty());
    }
}
