//! Basic usage of rattree: stack a few thematic layers, assign rows, and
//! print the resulting attribute table.

use rand::Rng;
use rattree::{Config, RatTree, NODATA_ROW};

fn main() -> rattree::Result<()> {
    example_tuples()?;
    example_block()?;
    Ok(())
}

fn example_tuples() -> rattree::Result<()> {
    println!("=== Tuples ===\n");

    let mut tree: RatTree<u32> = RatTree::with_config(Config::default().with_grow_size(10))?;
    for tuple in [[5u32, 3, 9], [5, 4, 8], [5, 3, 9], [5, 4, 7], [9, 0, 1]] {
        let row = tree.insert_or_lookup(&tuple)?;
        println!("{:?} -> row {}", tuple, row);
    }

    println!("\nTree:\n{:#?}", tree);

    let table = tree.finalize();
    println!("\nTable ({} rows):", table.len());
    for (row, values) in table.rows() {
        println!("  row {} = {:?} (count {})", row, values, table.count(row).unwrap_or(0));
    }
    println!();
    Ok(())
}

fn example_block() -> rattree::Result<()> {
    println!("=== Block ===\n");

    const NLAYERS: usize = 3;
    const NPIXELS: usize = 256 * 256;
    const NODATA: u8 = 0;

    let mut rng = rand::thread_rng();
    let layers: Vec<Vec<u8>> = (0..NLAYERS)
        .map(|_| (0..NPIXELS).map(|_| rng.gen_range(0..9)).collect())
        .collect();
    let layer_refs: Vec<&[u8]> = layers.iter().map(Vec::as_slice).collect();

    let mut tree: RatTree<u8> = RatTree::new();
    let rows = tree.insert_block(&layer_refs, &[NODATA; NLAYERS])?;

    let nodata_pixels = rows.iter().filter(|&&r| r == NODATA_ROW).count();
    let table = tree.into_table();
    println!("Pixels: {}", rows.len());
    println!("Nodata pixels: {}", nodata_pixels);
    println!("Distinct combinations: {}", table.len());

    if let Some(stats) = table.statistics() {
        println!(
            "Row statistics: min {} max {} mean {:.1} stddev {:.1} mode {} median {}",
            stats.minimum, stats.maximum, stats.mean, stats.std_dev, stats.mode, stats.median
        );
    }
    Ok(())
}
