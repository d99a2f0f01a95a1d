//! Library-level sessions over directory sources.

use anyhow::Result;
use devmap::core::DevmapError;
use devmap::geo::BoundingRegion;
use devmap::loader::LoaderSettings;
use devmap::models::{Developer, SortKey};
use devmap::render::MarkerSettings;
use devmap::session::{NoticeLevel, Session, SessionSettings, ViewMode};
use devmap::source::DirSource;
use devmap::split::split_file;
use devmap::test_utils::DatasetFixture;
use std::collections::HashSet;
use std::time::Duration;
use tempfile::TempDir;

use crate::fixtures::{batch_dir, consolidated_dir};

fn fast_settings() -> SessionSettings {
    SessionSettings {
        loader: LoaderSettings {
            batch_delay: Duration::ZERO,
            ..LoaderSettings::default()
        },
        markers: MarkerSettings {
            group_delay: Duration::ZERO,
            ..MarkerSettings::default()
        },
        ..SessionSettings::default()
    }
}

fn session(dir: &TempDir) -> Session<DirSource> {
    Session::new(DirSource::new(dir.path()), fast_settings(), None).unwrap()
}

#[tokio::test]
async fn test_consolidated_fallback_feeds_map_and_list() -> Result<()> {
    let data = consolidated_dir(16).await?;
    let session = session(&data);

    let report = session.start().await?;
    assert!(report.used_fallback);
    assert_eq!(report.added, 16);

    let notices = session.notices().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);

    // Zooming in never retries the batch system once the fallback is in use
    let update = session.on_viewport_change(&BoundingRegion::world(), 8.0).await;
    assert!(update.load.loaded.is_empty());
    assert!(update.load.failed.is_empty());
    assert_eq!(update.markers.len(), 16);

    let status = session.status().await;
    assert_eq!(status.total_loaded, 16);
    assert_eq!(status.batches_loaded, 0);
    assert_eq!(status.shown, 16);
    Ok(())
}

#[tokio::test]
async fn test_missing_source_reports_no_developers() {
    let empty = TempDir::new().unwrap();
    let session = session(&empty);

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, DevmapError::NoDevelopers { .. }));

    let notices = session.notices().await;
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_duplicate_ids_keep_first_record() -> Result<()> {
    let data = TempDir::new()?;
    DatasetFixture::cities(10)
        .with_developer(Developer::new("dev0000").with_followers(999))
        .with_batch_size(10)
        .write_batches(data.path())
        .await?;

    let session = session(&data);
    session.start().await?;
    let update = session.on_viewport_change(&BoundingRegion::world(), 4.0).await;
    assert_eq!(update.load.loaded, vec![1]);
    assert_eq!(update.load.added, 0);

    let list = session.list().await;
    assert_eq!(list.len(), 10);
    let first = list.iter().find(|d| d.id == "dev0000").unwrap();
    assert_eq!(first.follower_count, 0);
    assert_eq!(first.location.as_deref(), Some("San Francisco, CA"));
    Ok(())
}

#[tokio::test]
async fn test_co_located_markers_are_spread() -> Result<()> {
    let developers: Vec<Developer> = (0..12u64)
        .map(|i| Developer::new(format!("berliner{i}")).with_location("Berlin").with_followers(i))
        .collect();
    let data = TempDir::new()?;
    DatasetFixture::new(developers).write_batches(data.path()).await?;

    let session = session(&data);
    session.start().await?;
    let update = session.on_viewport_change(&BoundingRegion::world(), 2.0).await;
    assert!(update.committed);
    assert_eq!(update.markers.len(), 12);

    let positions: HashSet<(i64, i64)> = update
        .markers
        .markers
        .iter()
        .map(|m| ((m.position.lat * 1e6) as i64, (m.position.lng * 1e6) as i64))
        .collect();
    assert_eq!(positions.len(), 12);
    assert!(update.markers.markers.iter().all(|m| m.group_size == 12));

    let base = update.markers.markers[0].base;
    assert!(update.markers.markers.iter().all(|m| m.base == base));
    Ok(())
}

#[tokio::test]
async fn test_reset_starts_over() -> Result<()> {
    let data = batch_dir(90, 30).await?;
    let session = session(&data);

    session.start().await?;
    session.on_viewport_change(&BoundingRegion::world(), 6.0).await;
    assert_eq!(session.status().await.total_loaded, 90);
    assert!(session.resolver().stats().entries > 0);

    session.reset().await?;
    let status = session.status().await;
    assert_eq!(status.total_loaded, 30);
    assert_eq!(status.batches_loaded, 1);
    assert_eq!(status.shown, 0);
    assert_eq!(session.resolver().stats().entries, 0);
    Ok(())
}

#[tokio::test]
async fn test_list_view_ignores_viewport() -> Result<()> {
    let data = batch_dir(24, 100).await?;
    let mut session = session(&data);
    session.start().await?;

    let pacific = BoundingRegion::new(-10.0, -170.0, 10.0, -150.0)?;
    session.on_viewport_change(&pacific, 3.0).await;

    assert_eq!(session.toggle_view(), ViewMode::List);
    session.set_sort(SortKey::Stars);
    let list = session.list().await;
    assert_eq!(list.len(), 24);
    assert!(list.windows(2).all(|w| w[0].total_stars >= w[1].total_stars));

    session.set_query("TOKYO");
    let tokyo = session.list().await;
    assert_eq!(tokyo.len(), 3);
    assert_eq!(session.list_matches().await, 3);
    Ok(())
}

#[tokio::test]
async fn test_split_output_is_loadable() -> Result<()> {
    let input = consolidated_dir(33).await?;
    let out = TempDir::new()?;

    let index = split_file(&input.path().join("developers.json"), out.path(), 10).await?;
    assert_eq!(index.total_developers, 33);
    assert_eq!(index.total_batches, 4);

    let session = session(&out);
    session.start().await?;
    session.on_viewport_change(&BoundingRegion::world(), 7.0).await;

    let status = session.status().await;
    assert_eq!(status.total_loaded, 33);
    assert_eq!(status.batches_loaded, 4);
    assert_eq!(status.total_batches, Some(4));
    Ok(())
}

#[tokio::test]
async fn test_malformed_record_does_not_sink_its_batch() -> Result<()> {
    let data = TempDir::new()?;
    tokio::fs::write(
        data.path().join("batch_000.json"),
        r#"{"batch_index": 0, "developers": [{"login": "a", "location": "Berlin"}, {"login": "b"}, {"name": "no handle"}]}"#,
    )
    .await?;
    let session = session(&data);

    let report = session.start().await?;
    assert_eq!(report.loaded, vec![0]);
    assert_eq!(report.added, 2);
    assert!(!report.used_fallback);

    let status = session.status().await;
    assert_eq!(status.total_loaded, 2);
    assert_eq!(status.batches_loaded, 1);
    Ok(())
}
