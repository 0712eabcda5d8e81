//! Builders for small NEMO-like column files used across the integration tests

#![allow(dead_code)]

use netcdf::{create, Result};
use std::path::Path;

pub const N_TIME: usize = 40;
pub const DEPTHS: [f64; 3] = [0.5, 10.0, 50.0];

/// Temperature profile of the reference run
pub fn reference_temperature(t: usize, z: usize) -> f32 {
    12.0 - 0.1 * z as f32 + 0.01 * t as f32
}

/// Writes a `(time_counter, <depth>, y, x)` column file.
///
/// `field(t, z)` fills `votemper`; passing `None` for the depth name leaves
/// the file without a depth coordinate.
pub fn write_column<F>(path: &Path, depth_name: Option<&str>, field: F) -> Result<()>
where
    F: Fn(usize, usize) -> f32,
{
    let depth_dim = depth_name.unwrap_or("deptht");
    let mut file = create(path)?;
    file.add_dimension("time_counter", N_TIME)?;
    file.add_dimension(depth_dim, DEPTHS.len())?;
    file.add_dimension("y", 1)?;
    file.add_dimension("x", 1)?;
    file.add_attribute("title", "C1D PAPA test column")?;

    {
        let mut time = file.add_variable::<f64>("time_counter", &["time_counter"])?;
        time.put_attribute("units", "seconds since 2010-06-13 12:00:00")?;
        let values: Vec<f64> = (0..N_TIME).map(|d| d as f64 * 86_400.0).collect();
        time.put_values(&values, ..)?;
    }

    if let Some(name) = depth_name {
        let mut depth = file.add_variable::<f64>(name, &[name])?;
        depth.put_attribute("units", "m")?;
        depth.put_values(&DEPTHS[..], ..)?;
    }

    {
        let mut var =
            file.add_variable::<f32>("votemper", &["time_counter", depth_dim, "y", "x"])?;
        var.put_attribute("units", "degC")?;
        var.put_attribute("long_name", "temperature")?;
        let mut values = Vec::with_capacity(N_TIME * DEPTHS.len());
        for t in 0..N_TIME {
            for z in 0..DEPTHS.len() {
                values.push(field(t, z));
            }
        }
        var.put_values(&values, ..)?;
    }
    Ok(())
}
