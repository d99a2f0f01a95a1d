//! Tests for the `devmap` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use crate::fixtures::{batch_dir, consolidated_dir, write_config};

fn devmap(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("devmap").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--no-progress")
        .arg("--config")
        .arg(config);
    cmd
}

#[tokio::test]
async fn test_markers_geojson_for_initial_batch() -> Result<()> {
    let data = batch_dir(40, 20).await?;
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    let output = devmap(&config)
        .args(["markers", "--bbox", "-90,-180,90,180", "--source"])
        .arg(data.path())
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let geojson: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(geojson["type"], "FeatureCollection");
    let features = geojson["features"].as_array().unwrap();
    // Only the first batch is loaded at zoom 0 and every location resolves
    assert_eq!(features.len(), 20);
    for feature in features {
        let coords = feature["geometry"]["coordinates"].as_array().unwrap();
        assert_eq!(coords.len(), 2);
        assert!(coords[0].as_f64().unwrap().abs() <= 180.0);
        assert!(coords[1].as_f64().unwrap().abs() <= 90.0);
    }
    Ok(())
}

#[tokio::test]
async fn test_markers_zoom_loads_more_batches() -> Result<()> {
    let data = batch_dir(60, 20).await?;
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    devmap(&config)
        .args(["markers", "--bbox", "-90,-180,90,180", "--zoom", "5", "--format", "table", "--source"])
        .arg(data.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("of 60 loaded developers (3 batch(es))"));
    Ok(())
}

#[tokio::test]
async fn test_list_search_and_sort() -> Result<()> {
    let data = batch_dir(40, 100).await?;
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    let output = devmap(&config)
        .args(["list", "--search", "berlin", "--format", "json", "--source"])
        .arg(data.path())
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let rows: Vec<Value> = serde_json::from_slice(&output.stdout)?;
    // Berlin is every eighth sample location: dev0001, dev0009, ...
    assert_eq!(rows.len(), 5);
    let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["dev0033", "dev0025", "dev0017", "dev0009", "dev0001"]);
    Ok(())
}

#[tokio::test]
async fn test_list_limit_from_flag() -> Result<()> {
    let data = batch_dir(30, 100).await?;
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    devmap(&config)
        .args(["list", "--limit", "3", "--source"])
        .arg(data.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("dev0029"))
        .stdout(predicate::str::contains("dev0027"))
        .stdout(predicate::str::contains("dev0026").not())
        .stderr(predicate::str::contains("3 of 30 match(es)"));
    Ok(())
}

#[tokio::test]
async fn test_resolve_json() -> Result<()> {
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    let output = devmap(&config)
        .args(["resolve", "--format", "json", "SF", "Lagos", "Somewhere in Europe"])
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let rows: Vec<Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["input"], "SF");
    assert_eq!(rows[0]["resolution"]["status"], "resolved");
    assert_eq!(rows[0]["resolution"]["tier"], "metro");
    assert_eq!(rows[1]["resolution"]["tier"], "region");
    assert_eq!(rows[2]["resolution"]["tier"], "continent");
    Ok(())
}

#[tokio::test]
async fn test_resolve_without_default_fallback() -> Result<()> {
    let work = TempDir::new()?;
    let config = write_config(work.path(), "[resolver]\nfallback_to_default = false\n")?;

    devmap(&config)
        .args(["resolve", "The Internet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unresolved"));
    Ok(())
}

#[tokio::test]
async fn test_stats_with_consolidated_fallback() -> Result<()> {
    let data = consolidated_dir(12).await?;
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    let output = devmap(&config)
        .args(["stats", "--format", "json", "--source"])
        .arg(data.path())
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stats: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["total_loaded"], 12);
    assert_eq!(stats["batches_loaded"], 0);
    Ok(())
}

#[tokio::test]
async fn test_split_then_stats() -> Result<()> {
    let data = consolidated_dir(25).await?;
    let out = TempDir::new()?;
    let work = TempDir::new()?;
    let config = write_config(work.path(), "")?;

    devmap(&config)
        .arg("split")
        .arg(data.path().join("developers.json"))
        .arg(out.path())
        .args(["--batch-size", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25 developer(s) into 3 batch(es)"));

    assert!(out.path().join("index.json").exists());
    assert!(out.path().join("batch_002.json").exists());

    devmap(&config)
        .args(["stats", "--zoom", "6", "--source"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("total loaded:   25"))
        .stdout(predicate::str::contains("total batches:  3"));
    Ok(())
}

#[test]
fn test_split_rejects_zero_batch_size() {
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), "").unwrap();

    devmap(&config)
        .arg("split")
        .arg(work.path().join("developers.json"))
        .arg(work.path().join("out"))
        .args(["--batch-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--batch-size must be at least 1"));
}

#[test]
fn test_markers_rejects_inverted_bbox() {
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), "").unwrap();

    devmap(&config)
        .args(["markers", "--source", "./data", "--bbox", "50,0,10,10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("south edge"));
}

#[test]
fn test_missing_source_fails_with_suggestion() {
    let work = TempDir::new().unwrap();
    let config = write_config(work.path(), "").unwrap();

    devmap(&config)
        .args(["stats", "--source"])
        .arg(work.path().join("nowhere"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No developers could be loaded"));
}

#[test]
fn test_invalid_config_is_a_configuration_error() {
    let work = TempDir::new().unwrap();
    let config = work.path().join("broken.toml");
    std::fs::write(&config, "[loader\nbatch_delay_ms = ").unwrap();

    devmap(&config)
        .args(["resolve", "Berlin"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}
