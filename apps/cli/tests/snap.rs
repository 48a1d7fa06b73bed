use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn duplicate_layers_register_once_in_order() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let report = snap(
        workspace.path(),
        &[
            "medford:schools",
            "medford:roads",
            "medford:schools",
            "--basemap",
            "OpenStreetMap",
        ],
    )?;

    let names: Vec<_> = report["targets"]
        .as_array()
        .ok_or("targets should be an array")?
        .iter()
        .map(|target| target["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["medford:schools", "medford:roads"]);
    assert_eq!(report["targets"][0]["source"], "local");
    assert_eq!(report["selected"], "medford:roads");
    assert_eq!(report["skipped"], 2);
    Ok(())
}

#[test]
fn configured_source_labels_targets() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let state_dir = workspace.path().join(".mapview");
    fs::create_dir_all(&state_dir)?;
    fs::write(
        state_dir.join("config.json"),
        r#"{ "snapping": { "source": "geoserver" } }"#,
    )?;

    let report = snap(workspace.path(), &["medford:parcels"])?;
    assert_eq!(report["targets"][0]["source"], "geoserver");
    assert_eq!(report["targets"][0]["name"], "medford:parcels");
    Ok(())
}

#[test]
fn basemaps_alone_produce_no_targets() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let report = snap(workspace.path(), &["--basemap", "OpenStreetMap"])?;
    assert_eq!(report["targets"].as_array().map(Vec::len), Some(0));
    assert!(report["selected"].is_null());
    Ok(())
}

fn snap(workspace: &Path, args: &[&str]) -> Result<serde_json::Value, Box<dyn Error>> {
    let output = Command::cargo_bin("mapview-cli")?
        .env_remove("RUST_LOG")
        .arg("--workspace")
        .arg(workspace)
        .arg("snap")
        .args(args)
        .output()?;
    assert!(output.status.success(), "snap failed: {output:?}");
    Ok(serde_json::from_slice(&output.stdout)?)
}
