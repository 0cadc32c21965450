//! `convert` command implementation.

use anyhow::{Context, Result};
use pointcloud::ConvertOptions;
use tracing::info;

use crate::args::ConvertArgs;

impl From<&ConvertArgs> for ConvertOptions {
    fn from(args: &ConvertArgs) -> Self {
        Self {
            color_by: args.color_by,
            colormap: args.colormap,
            subsample: args.subsample,
            stack: args.stack,
            spacing: args.spacing,
            max_files: args.max_files,
            seed: args.seed,
            show_progress: !args.no_progress,
        }
    }
}

/// Execute the `convert` command
pub fn run_convert(args: &ConvertArgs) -> Result<()> {
    let options = ConvertOptions::from(args);
    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        color_by = %options.color_by,
        colormap = %options.colormap,
        "Converting point cloud"
    );

    let summary = pointcloud::convert(&args.input, &args.output, &options)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    println!("\n=== Conversion Summary ===\n");
    println!("  Files:    {}", summary.files);
    println!("  Points:   {}", summary.points);
    println!("  Colored:  {}", if summary.colored { "yes" } else { "no" });
    if !summary.bounds.is_empty() {
        let (min, max) = (summary.bounds.min, summary.bounds.max);
        println!(
            "  Bounds:   [{:.2}, {:.2}, {:.2}] .. [{:.2}, {:.2}, {:.2}]",
            min[0], min[1], min[2], max[0], max[1], max[2]
        );
    }
    println!("  Output:   {}\n", args.output.display());
    Ok(())
}
