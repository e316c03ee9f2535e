//! Example: Address a seismic survey and read traces with storage-order
//! awareness
//!
//! Run with: cargo run --example seismic_volume

use anyhow::Result;
use seisvol::{
    BrickIterator, CornerPoints, DatasetDescriptor, MemoryFrameStore, Point2, PostStackAccessor,
    PostStackOrder, RangeAxis, SurveyGeometry, SurveyOrientation, Trace, TraceData, TraceStatus,
    VolumeBounds,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("SeisVol Example: Seismic Volume Access");
    println!("======================================\n");

    // Define the survey: 50 inlines by 40 crosslines, 251 samples per trace.
    let inline_range = RangeAxis::new(1000.0, 1049.0, 1.0)?;
    let xline_range = RangeAxis::new(2000.0, 2078.0, 2.0)?;
    let z_range = RangeAxis::new(0.0, 1000.0, 4.0)?;

    println!("Survey dimensions:");
    println!("  Inline:    {} lines {}", inline_range.num_steps(), inline_range);
    println!("  Crossline: {} lines {}", xline_range.num_steps(), xline_range);
    println!("  Z:         {} samples {}", z_range.num_steps(), z_range);
    println!();

    // World geometry from the three known survey corners; the fourth is
    // completed automatically.
    let geometry = SurveyGeometry::new(
        "demo-survey",
        inline_range,
        xline_range,
        CornerPoints::from_three(
            Point2::new(650_000.0, 4_100_000.0),
            Point2::new(650_975.0, 4_100_000.0),
            Point2::new(650_000.0, 4_101_225.0),
        ),
        SurveyOrientation::RowIsInline,
    );
    let center = geometry.inline_xline_to_xy(1025.0, 2040.0)?;
    println!("Survey center (inline 1025, xline 2040) -> x={:.1} y={:.1}", center.x, center.y);
    println!();

    // An inline-major store: frames hold whole inlines, crossline rows
    // inside each frame, samples fastest.
    let descriptor = DatasetDescriptor::new(
        "demo-survey",
        vec!["TIME".to_string(), "XLINE_NO".to_string(), "INLINE_NO".to_string()],
        vec![
            z_range.num_steps(),
            xline_range.num_steps(),
            inline_range.num_steps(),
        ],
    )?
    .with_storage_order(PostStackOrder::InlineXlineZ.title());

    let bounds = VolumeBounds::post_stack(inline_range, xline_range, z_range);
    let store = MemoryFrameStore::new(descriptor);

    // AutoCalculated resolves the order from the store's axis labels.
    let mut accessor =
        PostStackAccessor::new(store, geometry, bounds, PostStackOrder::AutoCalculated)?;
    println!("Resolved storage order: {}", accessor.order());
    println!();

    // Write one inline of synthetic traces.
    let traces: Vec<Trace> = (0..xline_range.num_steps())
        .map(|xl| {
            let xline = xline_range.value(xl);
            let samples = (0..z_range.num_steps())
                .map(|s| (xl * 1000 + s) as f32)
                .collect::<Vec<f32>>();
            Trace {
                inline: 1010.0,
                xline,
                offset: None,
                z_start: z_range.start(),
                z_delta: z_range.delta(),
                x: 0.0,
                y: 0.0,
                status: Trace::status_of(&samples),
                samples,
            }
        })
        .collect();
    accessor
        .write_inline(
            1010.0,
            xline_range.start(),
            xline_range.end(),
            z_range.start(),
            z_range.end(),
            &TraceData::new(traces),
        )
        .await?;
    println!("Wrote inline 1010 ({} traces)", xline_range.num_steps());

    // Read it back with two crosslines requested beyond the survey edge;
    // those come back zero-filled and tagged Missing.
    let data = accessor
        .read_inline(1010.0, 1996.0, 2080.0, 0.0, 1000.0)
        .await?;
    let missing = data
        .traces()
        .iter()
        .filter(|t| t.status == TraceStatus::Missing)
        .count();
    println!(
        "Read inline 1010: {} traces, {} missing at the survey edges",
        data.num_traces(),
        missing
    );
    println!();

    // Walk the survey brick by brick, sized to roughly a million values.
    let mut iterator = BrickIterator::new(inline_range, xline_range, z_range);
    iterator.auto_size_cursor_shape(1_000_000);
    iterator.optimize_cursor_max_shape();
    println!(
        "Brick plan: shape {:?}, {} iterations",
        iterator.cursor_max_shape(),
        iterator.num_iterations()
    );

    let mut bricks = 0usize;
    while iterator.has_next() {
        bricks += 1;
        iterator.next();
    }
    println!("Visited {} bricks", bricks);
    println!();

    println!("Done.");
    Ok(())
}
