//! Wavefront OBJ point export

use std::io::{self, Write};

use crate::colormap::Rgb;

/// `v x y z [r g b]` per point, then one `p i` element per point
///
/// `colors`, when given, must be as long as `positions`.
pub fn write_obj<W: Write>(
    mut out: W,
    positions: &[[f64; 3]],
    colors: Option<&[Rgb]>,
) -> io::Result<()> {
    writeln!(out, "# Point cloud exported from LAZ file")?;
    writeln!(out, "# Points: {}", positions.len())?;
    writeln!(out)?;

    match colors {
        Some(colors) => {
            for ([x, y, z], [r, g, b]) in positions.iter().zip(colors) {
                writeln!(out, "v {x:.6} {y:.6} {z:.6} {r:.3} {g:.3} {b:.3}")?;
            }
        }
        None => {
            for [x, y, z] in positions {
                writeln!(out, "v {x:.6} {y:.6} {z:.6}")?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "# Points")?;
    for i in 1..=positions.len() {
        writeln!(out, "p {i}")?;
    }
    out.flush()
}
