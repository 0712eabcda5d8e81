mod common;

use common::{reference_temperature, write_column, DEPTHS, N_TIME};
use netcdf::{create, open, types::FloatType, types::NcVariableType, AttributeValue};
use papa_tools::{
    animation::{animate_variable, AnimationOptions},
    diff::{run_diff_plot, ProfileDiff},
    errors::{PapaError, Result},
    humidity::{rhcalc, rhcalc_netcdf, write_rh_netcdf, HumidityFields, HumidityUnits},
    longitude::sort_longitude_netcdf,
    models::{apply_model_to_netcdf, Add100, InferenceModel, ModelRun},
    netcdf_io::{read_depth, read_time_counter, read_variable_f64, save_compressed},
    plot::{HeatmapOptions, Normalize},
    presets::{builtin_presets, find_preset},
    statistics::fit_metrics,
};
use ndarray::ArrayD;
use tempfile::tempdir;

#[test]
fn test_profile_diff_and_heatmap() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let ref_path = temp_dir.path().join("C1D_PAPA_1d_20100615_20110614_grid_T.nc");
    let model_path = temp_dir
        .path()
        .join("C1D_PAPA_DNN_1d_20100615_20110614_grid_T.nc");

    write_column(&ref_path, Some("deptht"), reference_temperature)?;
    // the model runs 0.5 degrees warm at the middle level only
    write_column(&model_path, Some("deptht"), |t, z| {
        reference_temperature(t, z) + if z == 1 { 0.5 } else { 0.0 }
    })?;

    let profile = ProfileDiff::compute(&open(&ref_path)?, &open(&model_path)?, "votemper")?;
    assert_eq!(profile.diff.dim(), (DEPTHS.len(), N_TIME));
    assert_eq!(profile.depth_name, "deptht");
    assert_eq!(profile.times[0].to_string(), "2010-06-13 12:00:00");
    for t in 0..N_TIME {
        assert!(profile.diff[[0, t]].abs() < 1e-6);
        assert!((profile.diff[[1, t]] - 0.5).abs() < 1e-6);
        assert!(profile.diff[[2, t]].abs() < 1e-6);
    }

    let presets = builtin_presets();
    let preset = find_preset(&presets, "T")?;
    let plot = run_diff_plot(&ref_path, &model_path, preset, "1d", temp_dir.path())?;
    assert!(plot.path.ends_with("C1D_PAPA_DNN_1d_T_error.png"));
    assert!(plot.path.exists());
    assert!((plot.max_abs - 0.5).abs() < 1e-6);
    let labels: Vec<&str> = plot.layout.ticks.iter().map(|(_, l)| l.as_str()).collect();
    assert_eq!(labels, vec!["2010-06", "2010-07"]);

    let img = image::open(&plot.path).expect("PNG should decode").to_rgb8();
    assert_eq!((img.width(), img.height()), (plot.layout.width, plot.layout.height));

    Ok(())
}

#[test]
fn test_depth_coordinate_fallback() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let u_path = temp_dir.path().join("grid_U.nc");
    let bare_path = temp_dir.path().join("bare.nc");

    write_column(&u_path, Some("depthu"), reference_temperature)?;
    write_column(&bare_path, None, reference_temperature)?;

    let (name, depth) = read_depth(&open(&u_path)?)?;
    assert_eq!(name, "depthu");
    assert_eq!(depth, DEPTHS.to_vec());

    match read_depth(&open(&bare_path)?) {
        Err(PapaError::NoDepthCoordinate { tried }) => {
            assert_eq!(tried, vec!["deptht", "depthu", "depthv"]);
        }
        other => panic!("Expected NoDepthCoordinate, got {:?}", other),
    }

    let times = read_time_counter(&open(&u_path)?)?;
    assert_eq!(times.len(), N_TIME);
    Ok(())
}

#[test]
fn test_diff_with_missing_variable() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("column.nc");
    write_column(&path, Some("deptht"), reference_temperature)?;
    let file = open(&path)?;

    match ProfileDiff::compute(&file, &file, "vosaline") {
        Err(PapaError::VariableNotFound { var }) => assert_eq!(var, "vosaline"),
        other => panic!("Expected VariableNotFound, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_relative_humidity_dataset() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("flux.nc");
    let output_path = temp_dir.path().join("rh.nc");

    let ta = [5.0f32, 15.0, 25.0, 30.0];
    let p = [1000.0f32, 1005.0, 1010.0, 1015.0];
    let qa = [4.0f32, 8.0, 15.0, 20.0]; // g/kg
    {
        let mut file = create(&input_path)?;
        file.add_dimension("time", ta.len())?;
        file.add_variable::<f32>("ta", &["time"])?.put_values(&ta[..], ..)?;
        file.add_variable::<f32>("p", &["time"])?.put_values(&p[..], ..)?;
        file.add_variable::<f32>("qa", &["time"])?.put_values(&qa[..], ..)?;
    }

    let input = open(&input_path)?;
    let fields = HumidityFields::default();
    let (rh, dims) = rhcalc_netcdf(&input, &fields, HumidityUnits::GPerKg)?;
    assert_eq!(dims, vec!["time"]);
    for i in 0..ta.len() {
        let expected = rhcalc(
            f64::from(ta[i]),
            f64::from(p[i]),
            f64::from(qa[i]) / 1000.0,
        );
        assert!((rh[[i]] - expected).abs() < 1e-9);
        assert!(rh[[i]] > 0.0 && rh[[i]] < 110.0);
    }

    write_rh_netcdf(&input, &output_path, &fields, HumidityUnits::GPerKg)?;
    let output = open(&output_path)?;
    let var = output.variable("rh").expect("rh should exist");
    assert!(matches!(var.vartype(), NcVariableType::Float(FloatType::F32)));
    let stored: Vec<f64> = var.get_values::<f64, _>(..)?;
    assert!((stored[2] - rh[[2]]).abs() < 1e-4);
    assert!(output.attribute("history").is_some());

    Ok(())
}

#[test]
fn test_save_compressed() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("raw.nc");
    let output_path = temp_dir.path().join("packed.nc");

    {
        let mut file = create(&input_path)?;
        file.add_dimension("lon", 3)?;
        file.add_attribute("source", "buoy")?;
        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_values(&[-145.0f64, -144.5, -144.0], ..)?;
        let mut sst = file.add_variable::<f64>("sst", &["lon"])?;
        sst.put_attribute("_FillValue", -999.0f64)?;
        sst.put_attribute("units", "degC")?;
        sst.put_values(&[10.25f64, -999.0, 10.75], ..)?;
    }

    let report = save_compressed(&open(&input_path)?, &output_path)?;
    assert_eq!(report.compressed, vec!["sst"]);
    assert_eq!(report.coordinates, vec!["lon"]);
    assert!(report.skipped.is_empty());

    let output = open(&output_path)?;
    let sst = output.variable("sst").expect("sst should exist");
    assert!(matches!(sst.vartype(), NcVariableType::Float(FloatType::F32)));
    match sst.attribute("_FillValue").map(|a| a.value()).transpose()? {
        Some(AttributeValue::Float(fill)) => assert_eq!(fill, -999.0),
        other => panic!("fill value not narrowed to f32: {:?}", other),
    }
    let values: Vec<f32> = sst.get_values::<f32, _>(..)?;
    assert_eq!(values, vec![10.25, -999.0, 10.75]);

    let lon = output.variable("lon").expect("lon should exist");
    assert!(matches!(lon.vartype(), NcVariableType::Float(FloatType::F64)));
    match output.attribute("source").map(|a| a.value()).transpose()? {
        Some(AttributeValue::Str(s)) => assert_eq!(s, "buoy"),
        other => panic!("global attribute not copied: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_apply_model() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("sst.nc");
    let output_path = temp_dir.path().join("sst_plus.nc");
    let skipped_path = temp_dir.path().join("never.nc");

    {
        let mut file = create(&input_path)?;
        file.add_dimension("y", 2)?;
        file.add_dimension("x", 2)?;
        let mut sst = file.add_variable::<f64>("sst", &["y", "x"])?;
        sst.put_attribute("units", "degC")?;
        sst.put_values(&[1.0f64, 2.0, 3.0, 4.0], ..)?;
    }
    let input = open(&input_path)?;

    let run = apply_model_to_netcdf(&input, &output_path, &Add100, &["sst".to_string()])?;
    assert_eq!(run, ModelRun::Written(vec!["sst".to_string()]));
    let output = open(&output_path)?;
    let values: Vec<f64> = output
        .variable("sst")
        .expect("sst should exist")
        .get_values::<f64, _>(..)?;
    assert_eq!(values, vec![101.0, 102.0, 103.0, 104.0]);

    let run = apply_model_to_netcdf(&input, &skipped_path, &Add100, &["tos".to_string()])?;
    assert_eq!(run, ModelRun::MissingInput(vec!["tos".to_string()]));
    assert!(!skipped_path.exists());
    Ok(())
}

#[test]
fn test_animate_variable() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("column.nc");
    let gif_path = temp_dir.path().join("my-animation.gif");
    write_column(&path, Some("deptht"), reference_temperature)?;

    let mut heatmap = HeatmapOptions::new(Normalize::new(11.0, 13.0)?);
    heatmap.colorbar_width = 0;
    let summary = animate_variable(
        &open(&path)?,
        "votemper",
        &gif_path,
        &heatmap,
        &AnimationOptions {
            fps: 20.0,
            loop_count: 0,
            scale: 1,
        },
    )?;
    assert_eq!(summary.frames, N_TIME);
    assert_eq!(summary.duration_secs, 2.0);
    assert_eq!(
        (summary.width, summary.height),
        (heatmap.cell_width, DEPTHS.len() as u32 * heatmap.cell_height)
    );
    assert!(gif_path.exists());
    Ok(())
}

#[test]
fn test_sort_longitude_dataset() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("lon.nc");
    let output_path = temp_dir.path().join("lon_sorted.nc");

    {
        let mut file = create(&input_path)?;
        file.add_dimension("lat", 1)?;
        file.add_dimension("lon", 4)?;
        file.add_variable::<f64>("lon", &["lon"])?
            .put_values(&[-170.0f64, -10.0, 0.0, 20.0], ..)?;
        file.add_variable::<f64>("sst", &["lat", "lon"])?
            .put_values(&[1.0f64, 2.0, 3.0, 4.0], ..)?;
    }

    sort_longitude_netcdf(&open(&input_path)?, "sst", &output_path)?;
    let output = open(&output_path)?;
    let lon: Vec<f64> = output.variable("lon").expect("lon").get_values::<f64, _>(..)?;
    let sst: Vec<f64> = output.variable("sst").expect("sst").get_values::<f64, _>(..)?;
    assert_eq!(lon, vec![20.0, 190.0, 350.0, 360.0]);
    assert_eq!(sst, vec![4.0, 1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn test_fill_values_are_masked_before_scoring() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("skill.nc");

    {
        let mut file = create(&input_path)?;
        file.add_dimension("time", 4)?;
        let mut pred = file.add_variable::<f32>("pred", &["time"])?;
        pred.put_attribute("_FillValue", -999.0f32)?;
        pred.put_values(&[1.0f32, -999.0, 3.0, 4.0], ..)?;
        let mut truth = file.add_variable::<i16>("truth", &["time"])?;
        truth.put_attribute("scale_factor", 0.5f32)?;
        truth.put_attribute("add_offset", 1.0f32)?;
        truth.put_attribute("missing_value", -1i16)?;
        truth.put_values(&[0i16, 2, 4, 6], ..)?;
    }

    let input = open(&input_path)?;
    let (pred, _) = read_variable_f64(&input, "pred")?;
    let (truth, _) = read_variable_f64(&input, "truth")?;
    assert!(pred[[1]].is_nan());
    assert_eq!(truth.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0]);

    let pred: Vec<f64> = pred.iter().copied().collect();
    let truth: Vec<f64> = truth.iter().copied().collect();
    let m = fit_metrics(&pred, &truth, true)?;
    assert_eq!(m.n, 3);
    assert_eq!(m.mse, 0.0);
    Ok(())
}

#[test]
fn test_save_compressed_keeps_auxiliary_coordinates() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("grid_T.nc");
    let output_path = temp_dir.path().join("grid_T_packed.nc");
    let seconds = [3_485_217_600.0f64, 3_485_347_210.0];

    {
        let mut file = create(&input_path)?;
        file.add_unlimited_dimension("time_counter")?;
        file.add_dimension("x", 1)?;
        let extent = (&[0usize, 0][..], &[2usize, 1][..]);

        let mut centered = file.add_variable::<f64>("time_centered", &["time_counter"])?;
        centered.put_attribute("units", "seconds since 1900-01-01 00:00:00")?;
        centered.put_values(&seconds, (&[0usize][..], &[2usize][..]))?;

        let mut sst = file.add_variable::<f64>("sst", &["time_counter", "x"])?;
        sst.put_attribute("coordinates", "time_centered nav_lat nav_lon")?;
        sst.put_values(&[8.5f64, 8.25], extent)?;
    }

    let report = save_compressed(&open(&input_path)?, &output_path)?;
    assert_eq!(report.compressed, vec!["sst"]);
    assert_eq!(report.coordinates, vec!["time_centered"]);

    let output = open(&output_path)?;
    let time = output.dimension("time_counter").expect("time_counter should exist");
    assert!(time.is_unlimited());
    assert_eq!(time.len(), 2);

    let centered = output.variable("time_centered").expect("time_centered should exist");
    assert!(matches!(centered.vartype(), NcVariableType::Float(FloatType::F64)));
    assert_eq!(centered.get_values::<f64, _>(..)?, seconds.to_vec());
    let sst = output.variable("sst").expect("sst should exist");
    assert!(matches!(sst.vartype(), NcVariableType::Float(FloatType::F32)));
    Ok(())
}

/// Returns the sum and the difference of two fields
struct SumDiff;

impl InferenceModel for SumDiff {
    fn name(&self) -> &str {
        "pair"
    }

    fn n_inputs(&self) -> usize {
        2
    }

    fn n_outputs(&self) -> usize {
        2
    }

    fn compute(&self, inputs: &[ArrayD<f64>]) -> Result<Vec<ArrayD<f64>>> {
        Ok(vec![&inputs[0] + &inputs[1], &inputs[0] - &inputs[1]])
    }
}

#[test]
fn test_apply_multi_output_model() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input_path = temp_dir.path().join("fluxes.nc");
    let output_path = temp_dir.path().join("pair.nc");

    {
        let mut file = create(&input_path)?;
        file.add_dimension("time", 3)?;
        file.add_dimension("x", 1)?;
        let mut a = file.add_variable::<f64>("qsw", &["time", "x"])?;
        a.put_attribute("units", "W m-2")?;
        a.put_values(&[10.0f64, 20.0, 30.0], ..)?;
        let mut b = file.add_variable::<f64>("qlw", &["time", "x"])?;
        b.put_attribute("units", "W m-2")?;
        b.put_values(&[1.0f64, 2.0, 3.0], ..)?;
    }

    let vars = ["qsw".to_string(), "qlw".to_string()];
    let run = apply_model_to_netcdf(&open(&input_path)?, &output_path, &SumDiff, &vars)?;
    assert_eq!(
        run,
        ModelRun::Written(vec!["pair_0".to_string(), "pair_1".to_string()])
    );

    let output = open(&output_path)?;
    for (name, expected) in [("pair_0", [11.0, 22.0, 33.0]), ("pair_1", [9.0, 18.0, 27.0])] {
        let var = output.variable(name).expect("model output should exist");
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        assert_eq!(dims, vec!["time", "x"]);
        assert_eq!(var.get_values::<f64, _>(..)?, expected.to_vec());
        assert!(var.attribute("units").is_none());
    }
    assert!(output.variable("qsw").is_none());
    Ok(())
}
