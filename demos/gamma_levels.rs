//! Example: Gamma levels from a wide-layout chain export
//!
//! Run with: cargo run --example gamma_levels

use std::sync::Arc;

use gamma_levels::prelude::*;

fn main() {
    // Title row, then headers: calls left of Strike, puts right
    let mut rows: Vec<Vec<String>> = vec![
        ["CALLS", "", "", "", "PUTS", "", ""].map(String::from).to_vec(),
        ["Impl Vol", "Open.Int", "Gamma", "Strike", "Gamma", "Open.Int", "Impl Vol"]
            .map(String::from)
            .to_vec(),
    ];

    // Call gamma peaks above 500, put gamma below
    for i in 0..13 {
        let strike = 470.0 + 5.0 * i as f64;
        let call_gamma = 0.05 * (-((strike - 510.0) / 15.0).powi(2)).exp();
        let put_gamma = 0.06 * (-((strike - 485.0) / 15.0).powi(2)).exp();
        let iv = 18.0 + (strike - 500.0).abs() * 0.1;

        rows.push(vec![
            format!("{:.1}%", iv),
            format!("{}", 1000 + 100 * i),
            format!("{:.5}", call_gamma),
            format!("{}", strike),
            format!("{:.5}", put_gamma),
            if i == 3 { "N/A".to_string() } else { format!("{}", 2000 - 100 * i) },
            format!("{:.1}%", iv + 2.0),
        ]);
    }
    let table = RawTable::from_strings(rows);

    // Run the pipeline through the upload cache
    let pipeline = GammaPipeline::new();
    let mut cache = AnalysisCache::new(CacheConfig::default());
    let upload = UploadId::from_name("demo_chain.csv");
    let analysis = match cache.get_or_compute(upload, || pipeline.analyze(&table)) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return;
        }
    };

    println!("=== Gamma Analysis ===\n");
    println!("Header row: {}", analysis.report.header_row);
    println!("Split: {:?}", analysis.split.method);
    println!("Calls: {} | Puts: {}", analysis.calls().len(), analysis.puts().len());
    for warning in &analysis.warnings {
        println!("Warning: {}", warning.message());
    }
    let filled = analysis.filled_puts();
    let zero_oi = filled.iter().filter(|r| r.open_interest == 0.0).count();
    println!("Puts with zero-filled open interest: {}", zero_oi);

    println!("\n--- Net Gamma by Strike ---\n");
    for point in analysis.net_series().points() {
        println!("{:>7.1}  {:+.5}", point.strike, point.net_gamma);
    }

    let levels = match analysis.levels() {
        Ok(levels) => levels,
        Err(e) => {
            println!("\nNo levels: {}", e);
            return;
        }
    };

    println!("\n--- Levels ---\n");
    println!("Gamma flip: {}", levels.describe_flip());
    println!("Put wall: {:.2}", levels.put_wall);
    println!("Call wall: {:.2}", levels.call_wall);
    if let Some(gamma) = analysis.net_series().value_at(levels.call_wall) {
        println!("Net gamma at call wall: {:+.5}", gamma);
    }

    println!("\n--- Overlay ---\n");
    let overlay = OverlayConfig::default().with_title("Demo chain");
    print!("{}", render_overlay(levels, &overlay));

    println!("\n--- Table ---\n");
    match level_table_string(levels, 2) {
        Ok(text) => print!("{}", text),
        Err(e) => eprintln!("Table export failed: {}", e),
    }

    // Same upload again is served from the cache
    if let Ok(again) = cache.get_or_compute(upload, || pipeline.analyze(&table)) {
        println!("\nCache reused: {}", Arc::ptr_eq(&analysis, &again));
    }
    cache.clear();

    // Dealer convention vs open-interest weighting
    let weighted = GammaPipeline::with_config(GammaConfig::open_interest_weighted());
    if let Ok(levels) = weighted.levels(&table) {
        println!("\nOI-weighted flip: {}", levels.describe_flip());
    }
}
