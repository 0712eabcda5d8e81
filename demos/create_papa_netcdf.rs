//! Writes a synthetic C1D PAPA reference/DNN pair for trying out `papa diff`.
//!
//! Creates `C1D_PAPA_1d_20100615_20110614_grid_T.nc` (reference) and
//! `C1D_PAPA_DNN_1d_20100615_20110614_grid_T.nc` (model) in the current
//! directory, one year of daily profiles on 30 levels.

use netcdf::create;
use std::path::Path;

const N_DAYS: usize = 365;
const N_LEVELS: usize = 30;

fn write_pair_member(path: &Path, bias: impl Fn(usize, usize) -> (f32, f32)) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut file = create(path)?;
    file.add_attribute("title", "C1D PAPA synthetic column")?;
    file.add_dimension("time_counter", N_DAYS)?;
    file.add_dimension("deptht", N_LEVELS)?;
    file.add_dimension("y", 1)?;
    file.add_dimension("x", 1)?;

    {
        let mut time = file.add_variable::<f64>("time_counter", &["time_counter"])?;
        time.put_attribute("units", "seconds since 2010-06-15 12:00:00")?;
        time.put_attribute("calendar", "gregorian")?;
        let values: Vec<f64> = (0..N_DAYS).map(|d| d as f64 * 86_400.0).collect();
        time.put_values(&values, ..)?;
    }
    {
        let mut depth = file.add_variable::<f32>("deptht", &["deptht"])?;
        depth.put_attribute("units", "m")?;
        depth.put_attribute("positive", "down")?;
        let values: Vec<f32> = (0..N_LEVELS).map(|k| 0.5 + 10.0 * k as f32).collect();
        depth.put_values(&values, ..)?;
    }

    let dims = ["time_counter", "deptht", "y", "x"];
    let mut temp = Vec::with_capacity(N_DAYS * N_LEVELS);
    let mut salt = Vec::with_capacity(N_DAYS * N_LEVELS);
    for d in 0..N_DAYS {
        let season = (d as f32 * std::f32::consts::TAU / 365.0).sin();
        for k in 0..N_LEVELS {
            let mixing = (-(k as f32) / 6.0).exp();
            let (dt, ds) = bias(d, k);
            temp.push(4.0 + 8.0 * mixing + 3.0 * season * mixing + dt);
            salt.push(32.6 + 0.02 * k as f32 + ds);
        }
    }
    {
        let mut var = file.add_variable::<f32>("votemper", &dims)?;
        var.put_attribute("units", "degC")?;
        var.put_attribute("long_name", "Temperature")?;
        var.put_values(&temp, ..)?;
    }
    {
        let mut var = file.add_variable::<f32>("vosaline", &dims)?;
        var.put_attribute("units", "1e-3")?;
        var.put_attribute("long_name", "Salinity")?;
        var.put_values(&salt, ..)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let reference = Path::new("C1D_PAPA_1d_20100615_20110614_grid_T.nc");
    let model = Path::new("C1D_PAPA_DNN_1d_20100615_20110614_grid_T.nc");

    write_pair_member(reference, |_, _| (0.0, 0.0))?;
    // the model drifts warm and fresh in the mixed layer through the year
    write_pair_member(model, |d, k| {
        let drift = d as f32 / N_DAYS as f32;
        let ml = if k < 8 { 1.0 } else { 0.2 };
        (1.2 * drift * ml, -0.15 * drift * ml)
    })?;

    println!("✅ Wrote {} and {}", reference.display(), model.display());
    println!("\n🧪 Plot the errors with:");
    println!(
        "   cargo run -- diff --reference {} --model {}",
        reference.display(),
        model.display()
    );
    Ok(())
}
