//! Entry point for the `papa` binary.
//! Parses the CLI, sets up logging and the thread pool, and dispatches subcommands.

use clap::Parser;
use log::LevelFilter;
use netcdf::open;
use papa_tools::{
    animation::{animate_variable, AnimationOptions},
    cruises::{cruises_in_month, get_cruises, Cruise, CruiseMonth},
    diff::run_diff_plot,
    humidity::{rhcalc_netcdf, write_rh_netcdf, HumidityFields, HumidityUnits},
    longitude::sort_longitude_netcdf,
    models::{apply_model_to_netcdf, InferenceModel, ModelRegistry, ModelRun},
    netcdf_io::{read_variable_f64, save_compressed},
    parallel::ParallelConfig,
    plot::{Colormap, HeatmapOptions, Normalize},
    presets::{builtin_presets, find_preset, load_presets, PlotPreset},
    statistics::fit_metrics,
    Result,
};
use std::path::Path;

mod cli;

use cli::{Args, ColormapArg, Command, RhInput};

fn main() {
    let args = Args::parse();

    logger_builder(args.verbose, std::env::var("PAPA_LOG").ok().as_deref()).init();

    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

/// `PAPA_LOG` directives replace the default `warn,papa_tools=info`;
/// `--verbose` raises the crate to `debug` on top of either.
fn logger_builder(verbose: bool, env_filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::default();
    match env_filters {
        Some(filters) => {
            builder.parse_filters(filters);
        }
        None => {
            builder
                .filter_level(LevelFilter::Warn)
                .filter_module("papa_tools", LevelFilter::Info)
                .filter_module("papa", LevelFilter::Info);
        }
    }
    if verbose {
        builder
            .filter_module("papa_tools", LevelFilter::Debug)
            .filter_module("papa", LevelFilter::Debug);
    }
    builder
}

fn run(args: Args) -> Result<()> {
    ParallelConfig::new(args.threads).setup_global_pool()?;

    match args.command {
        Command::Diff {
            reference,
            model,
            preset,
            presets_file,
            freq,
            out_dir,
        } => {
            let presets = collect_presets(presets_file.as_deref())?;
            let selected: Vec<&PlotPreset> = if preset.is_empty() {
                presets.iter().collect()
            } else {
                preset
                    .iter()
                    .map(|key| find_preset(&presets, key))
                    .collect::<Result<_>>()?
            };
            for p in selected {
                let plot = run_diff_plot(&reference, &model, p, &freq, &out_dir)?;
                println!(
                    "✅ {} (max |error| {:.4}) saved to {}",
                    p.title,
                    plot.max_abs,
                    plot.path.display()
                );
            }
        }

        Command::Presets { presets_file } => {
            for p in collect_presets(presets_file.as_deref())? {
                println!(
                    "- {} ({}): \"{}\" [{}, {}]",
                    p.fig_name, p.variable, p.title, p.vmin, p.vmax
                );
            }
        }

        Command::Rh {
            input,
            output_netcdf,
        } => run_rh(&input, output_netcdf.as_deref())?,

        Command::Stats {
            pred_file,
            pred,
            truth_file,
            truth,
            skip_nan,
        } => {
            let pred_nc = open(&pred_file)?;
            let (ypred, _) = read_variable_f64(&pred_nc, &pred)?;
            let (ytruth, _) = match truth_file {
                Some(path) => read_variable_f64(&open(&path)?, &truth)?,
                None => read_variable_f64(&pred_nc, &truth)?,
            };
            let ypred: Vec<f64> = ypred.iter().copied().collect();
            let ytruth: Vec<f64> = ytruth.iter().copied().collect();
            let m = fit_metrics(&ypred, &ytruth, skip_nan)?;

            println!("\n Skill of {} against {}", pred, truth);
            println!("================================");
            println!("   MSE:  {:.6}", m.mse);
            println!("   RMSE: {:.6}", m.rmse);
            println!("   R²:   {:.4}", m.r2);
            println!("   Bias: {:.6}", m.bias);
            println!("   Pairs: {}", m.n);
        }

        Command::Cruises { month, json } => {
            let cruises = get_cruises();
            let shown: Vec<&Cruise> = match month {
                Some(m) => cruises_in_month(&cruises, m.parse::<CruiseMonth>()?),
                None => cruises.iter().collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if shown.is_empty() {
                println!("   (No cruises found)");
            } else {
                for c in shown {
                    let months: Vec<String> = c.months.iter().map(|m| m.to_string()).collect();
                    println!("    {} (pcode {}): {}", c.name, c.pcode, months.join(" "));
                }
            }
        }

        Command::Animate {
            file,
            var,
            output,
            fps,
            loop_count,
            scale,
            vmin,
            vmax,
            colormap,
        } => {
            let nc = open(&file)?;
            let mut heatmap = HeatmapOptions::new(Normalize::new(vmin, vmax)?);
            heatmap.colormap = match colormap {
                ColormapArg::Balance => Colormap::Balance,
                ColormapArg::Viridis => Colormap::Viridis,
            };
            let opts = AnimationOptions {
                fps,
                loop_count,
                scale,
            };
            let summary = animate_variable(&nc, &var, &output, &heatmap, &opts)?;
            println!(
                "✅ {} frames ({} seconds at {} FPS) saved to {}",
                summary.frames,
                summary.duration_secs,
                fps,
                output.display()
            );
        }

        Command::Compress { file, output } => {
            let report = save_compressed(&open(&file)?, &output)?;
            if !report.skipped.is_empty() {
                println!("⚠ Skipped non-numeric variables: {}", report.skipped.join(", "));
            }
            println!(
                "✅ Compressed {} variables into {}",
                report.compressed.len(),
                output.display()
            );
        }

        Command::ApplyModel {
            file,
            model,
            vars,
            output,
        } => {
            let registry = ModelRegistry::with_builtins();
            let model = registry.get(&model)?;
            match apply_model_to_netcdf(&open(&file)?, &output, model, &vars)? {
                ModelRun::Written(names) => {
                    println!("✅ Saved {} to {}", names.join(", "), output.display())
                }
                ModelRun::MissingInput(names) => println!(
                    "⚠ Missing inputs ({}), model '{}' produced no output",
                    names.join(", "),
                    model.name()
                ),
            }
        }

        Command::SortLon { file, var, output } => {
            sort_longitude_netcdf(&open(&file)?, &var, &output)?;
            println!("✅ Saved sorted '{}' to {}", var, output.display());
        }
    }

    Ok(())
}

fn collect_presets(extra: Option<&Path>) -> Result<Vec<PlotPreset>> {
    let mut presets = builtin_presets();
    if let Some(path) = extra {
        presets.extend(load_presets(path)?);
    }
    Ok(presets)
}

fn run_rh(input: &RhInput, output: Option<&Path>) -> Result<()> {
    let nc = open(&input.file)?;
    let fields = HumidityFields {
        temperature: input.ta.clone(),
        pressure: input.p.clone(),
        specific_humidity: input.qa.clone(),
    };
    let units = if input.g_per_kg {
        HumidityUnits::GPerKg
    } else {
        HumidityUnits::KgPerKg
    };

    if let Some(path) = output {
        write_rh_netcdf(&nc, path, &fields, units)?;
        println!("✅ Saved relative humidity to {}", path.display());
        return Ok(());
    }

    let (rh, dims) = rhcalc_netcdf(&nc, &fields, units)?;
    let valid: Vec<f64> = rh.iter().copied().filter(|v| v.is_finite()).collect();
    println!("\n Relative humidity ({})", dims.join(", "));
    println!("================================");
    if valid.is_empty() {
        println!("⚠ No valid (finite) values");
    } else {
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        println!("   Min: {:.2} %", min);
        println!("   Max: {:.2} %", max);
        println!("   Mean: {:.2} %", mean);
        println!("   Valid elements: {} / {}", valid.len(), rh.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(logger: &env_logger::Logger, level: Level, target: &str) -> bool {
        logger.enabled(&Metadata::builder().level(level).target(target).build())
    }

    #[test]
    fn verbose_overrides_env_filters() {
        let logger = logger_builder(true, Some("error")).build();
        assert!(enabled(&logger, Level::Debug, "papa_tools::diff"));
        assert!(!enabled(&logger, Level::Warn, "netcdf"));
    }

    #[test]
    fn env_filters_apply_without_verbose() {
        let logger = logger_builder(false, Some("error")).build();
        assert!(!enabled(&logger, Level::Info, "papa_tools::diff"));

        let logger = logger_builder(false, None).build();
        assert!(enabled(&logger, Level::Info, "papa_tools::diff"));
        assert!(!enabled(&logger, Level::Debug, "papa_tools::diff"));
    }
}
