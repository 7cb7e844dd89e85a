use assert_cmd::Command;
use ndarray::Array2;
use predicates::prelude::*;
use tempfile::tempdir;

use ac2art::split::ALIGNED_SUBDIRS;
use ac2art::storage;

#[test]
fn split_command_reports_cut_recordings() -> anyhow::Result<()> {
    let temp = tempdir()?;
    let speaker = temp.path().join("Donnees_pretraitees").join("MNGU0");
    for subdir in ALIGNED_SUBDIRS {
        let dir = speaker.join(subdir);
        storage::ensure_dir(&dir)?;
        storage::write_matrix(&storage::array_path(&dir, "long"), &Array2::zeros((600, 3)))?;
        storage::write_matrix(&storage::array_path(&dir, "short"), &Array2::zeros((20, 3)))?;
    }

    Command::cargo_bin("ac2art")?
        .arg("--root")
        .arg(temp.path())
        .arg("split")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 recordings cut into 2 segments"));

    assert!(speaker.join("ema/long_split_1.npy").exists());
    assert!(!speaker.join("ema/long.npy").exists());
    Ok(())
}

#[test]
fn split_without_preprocessed_data_fails() -> anyhow::Result<()> {
    let temp = tempdir()?;
    Command::cargo_bin("ac2art")?
        .arg("--root")
        .arg(temp.path())
        .arg("split")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Preprocessed directory does not exist"));
    Ok(())
}

#[test]
fn unknown_config_keys_are_rejected() -> anyhow::Result<()> {
    let temp = tempdir()?;
    let config = temp.path().join("ac2art.json");
    std::fs::write(&config, r#"{"colour": "blue"}"#)?;
    Command::cargo_bin("ac2art")?
        .arg("--root")
        .arg(temp.path())
        .arg("--config")
        .arg(&config)
        .arg("split")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
    Ok(())
}
