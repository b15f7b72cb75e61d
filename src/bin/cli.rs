//! ratermatch CLI - Inter-rater reliability evaluation for street labels
//!
//! Usage:
//!   ratermatch-cli evaluate <streets.geojson> <gt.geojson> <crowd.geojson> [--output <dir>]
//!   ratermatch-cli synthetic [--seed <n>] [--output <dir>]
//!
//! Loads a street network and two label collections from GeoJSON, runs
//! the evaluation pipeline, prints per-granularity confusion stats, and
//! optionally exports the per-segment count tables as CSV files.

use clap::{Parser, Subcommand};
use geojson::{GeoJson, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ratermatch::synthetic::SyntheticScenario;
use ratermatch::{
    ConfusionStats, CountCategory, EvalConfig, EvaluationEngine, GpsPoint, Granularity, Label,
    LabelType, SegmentCountTable, StreetSegment,
};

#[derive(Parser)]
#[command(name = "ratermatch-cli")]
#[command(about = "Inter-rater reliability evaluation for street labels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate crowd labels against ground truth
    Evaluate {
        /// Street network GeoJSON (LineString features)
        streets: PathBuf,

        /// Ground-truth label GeoJSON (Point features)
        ground_truth: PathBuf,

        /// Crowd label GeoJSON (Point features)
        crowd: PathBuf,

        /// Output directory for CSV count tables
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Track each label type independently instead of one Problem bucket
        #[arg(long)]
        per_type: bool,

        /// Record 0/1 presence flags instead of additive counts
        #[arg(long)]
        binary: bool,

        /// Drop temporary members of low-severity cluster types
        #[arg(long)]
        filter_low_severity: bool,

        /// Chunk spacings in meters
        #[arg(long, value_delimiter = ',', default_values_t = vec![5.0, 10.0])]
        spacing: Vec<f64>,

        /// Crowd labels already carry cluster ids
        #[arg(long)]
        crowd_pre_clustered: bool,
    },

    /// Generate a synthetic dataset and evaluate it
    Synthetic {
        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output directory for CSV count tables
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Evaluate {
            streets,
            ground_truth,
            crowd,
            output,
            per_type,
            binary,
            filter_low_severity,
            spacing,
            crowd_pre_clustered,
        } => run_evaluate(
            &streets,
            &ground_truth,
            &crowd,
            output.as_deref(),
            EvalConfig {
                merge_problem_categories: !per_type,
                saturating_counts: binary,
                filter_low_severity,
                chunk_spacings_m: spacing,
                crowd_pre_clustered,
                ..EvalConfig::default()
            },
        ),
        Commands::Synthetic { seed, output } => run_synthetic(seed, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_evaluate(
    streets_path: &Path,
    gt_path: &Path,
    crowd_path: &Path,
    output: Option<&Path>,
    config: EvalConfig,
) -> Result<(), Box<dyn Error>> {
    let streets = load_streets(streets_path)?;
    let ground_truth = load_labels(gt_path)?;
    let crowd = load_labels(crowd_path)?;
    println!(
        "Loaded {} streets, {} ground-truth labels, {} crowd labels",
        streets.len(),
        ground_truth.len(),
        crowd.len()
    );

    evaluate_and_report(&streets, &ground_truth, &crowd, config, output)
}

fn run_synthetic(seed: u64, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let scenario = SyntheticScenario {
        seed,
        ..SyntheticScenario::default()
    };
    let dataset = scenario.generate();
    println!(
        "Generated {} streets, {} ground-truth labels, {} crowd labels (seed {seed})",
        dataset.streets.len(),
        dataset.ground_truth.len(),
        dataset.crowd.len()
    );

    let config = EvalConfig {
        crowd_pre_clustered: true,
        ..EvalConfig::default()
    };
    evaluate_and_report(
        &dataset.streets,
        &dataset.ground_truth,
        &dataset.crowd,
        config,
        output,
    )
}

fn evaluate_and_report(
    streets: &[StreetSegment],
    ground_truth: &[Label],
    crowd: &[Label],
    config: EvalConfig,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let engine = EvaluationEngine::new(config)?;
    let tables = engine.run(streets, ground_truth, crowd)?;
    let summary = engine.summarize(&tables);

    print_summary(&summary);

    if let Some(dir) = output {
        export_csv(dir, &tables)?;
        println!("\nCount tables written to {}", dir.display());
    }
    Ok(())
}

fn print_summary(summary: &BTreeMap<Granularity, BTreeMap<CountCategory, ConfusionStats>>) {
    for (granularity, categories) in summary {
        println!("\n{}", "=".repeat(60));
        println!("Granularity: {granularity}");
        println!("{}", "=".repeat(60));
        for (category, stats) in categories {
            println!("  {category}:");
            println!(
                "    tp={} fp={} fn={} tn={}",
                stats.true_positive,
                stats.false_positive,
                stats.false_negative,
                stats.true_negative
            );
            println!(
                "    precision={:.3} recall={:.3} specificity={:.3} f1={:.3}",
                stats.precision, stats.recall, stats.specificity, stats.f1
            );
        }
    }
}

/// Write one CSV per (granularity, category): `gt,crowd` per segment row.
fn export_csv(
    dir: &Path,
    tables: &BTreeMap<Granularity, SegmentCountTable>,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    for (granularity, table) in tables {
        for (category, rows) in table.iter() {
            let path = dir.join(format!("{granularity}_{category}.csv"));
            let mut writer = BufWriter::new(File::create(&path)?);
            writeln!(writer, "gt,crowd")?;
            for counts in rows {
                writeln!(writer, "{},{}", counts.ground_truth, counts.crowd)?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// GeoJSON loading
// ============================================================================

/// Load LineString features with `route_id` and `street_edge_id` properties.
fn load_streets(path: &Path) -> Result<Vec<StreetSegment>, Box<dyn Error>> {
    let geojson: GeoJson = fs::read_to_string(path)?.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(format!("{}: expected a FeatureCollection", path.display()).into());
    };

    let mut streets = Vec::new();
    for feature in collection.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let Value::LineString(coords) = &geometry.value else {
            continue;
        };

        let points = coords
            .iter()
            .map(|c| GpsPoint::new(c[1], c[0]))
            .collect::<Vec<_>>();
        let route_id = int_property(&feature, "route_id").unwrap_or(-1);
        let street_edge_id = int_property(&feature, "street_edge_id").unwrap_or(-1);
        streets.push(StreetSegment::new(route_id, street_edge_id, points));
    }
    Ok(streets)
}

/// Load Point features with label properties.
fn load_labels(path: &Path) -> Result<Vec<Label>, Box<dyn Error>> {
    let geojson: GeoJson = fs::read_to_string(path)?.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(format!("{}: expected a FeatureCollection", path.display()).into());
    };

    let mut labels = Vec::new();
    for feature in collection.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let Value::Point(coord) = &geometry.value else {
            continue;
        };

        let type_name = feature
            .property("label_type")
            .and_then(|v| v.as_str())
            .ok_or("label feature missing label_type")?;
        let label_type = LabelType::from_str(type_name)?;

        let mut label = Label::new(
            label_type,
            int_property(&feature, "condition_id").unwrap_or(-1),
            int_property(&feature, "route_id").unwrap_or(-1),
            GpsPoint::new(coord[1], coord[0]),
        );
        label.cluster_id = int_property(&feature, "cluster_id");
        label.temporary = feature.property("temporary").and_then(|v| v.as_bool());
        label.severity = feature
            .property("severity")
            .and_then(|v| v.as_u64())
            .map(|s| s as u8);
        labels.push(label);
    }
    Ok(labels)
}

fn int_property(feature: &geojson::Feature, key: &str) -> Option<i64> {
    feature.property(key).and_then(|v| v.as_i64())
}
