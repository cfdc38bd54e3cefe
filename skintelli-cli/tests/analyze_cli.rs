use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use image::{Rgb, RgbImage};
use serde_json::Value;
use tempfile::tempdir;

fn write_skin(path: &Path, with_lesion: bool) -> Result<(), Box<dyn Error>> {
    let mut img = RgbImage::from_pixel(128, 128, Rgb([205, 170, 150]));
    if with_lesion {
        for y in 40..80 {
            for x in 50..90 {
                img.put_pixel(x, y, Rgb([80, 55, 45]));
            }
        }
    }
    img.save(path)?;
    Ok(())
}

fn read_report(path: &Path) -> Result<Value, Box<dyn Error>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn directory_run_writes_report_and_overlays() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let photos = work_dir.path().join("photos");
    fs::create_dir(&photos)?;
    write_skin(&photos.join("clear.png"), false)?;
    write_skin(&photos.join("lesion.png"), true)?;
    fs::write(photos.join("notes.txt"), "not an image")?;

    let json_path = work_dir.path().join("report.json");
    let overlays = work_dir.path().join("overlays");

    let mut cmd = cargo_bin_cmd!("skintelli");
    cmd.current_dir(work_dir.path())
        .arg("--input")
        .arg(&photos)
        .arg("--json")
        .arg(&json_path)
        .arg("--output-dir")
        .arg(&overlays)
        .arg("--explain")
        .arg("--timings");
    cmd.assert().success();

    let report = read_report(&json_path)?;
    assert_eq!(report["analyzed"], 2);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["flagged"], 1);

    let images = report["images"].as_array().expect("images array");
    assert!(images[0]["image"].as_str().expect("path").ends_with("clear.png"));
    assert_eq!(images[0]["tier"], "none");
    assert_eq!(images[0]["has_issues"], false);

    let lesion = &images[1];
    assert_eq!(lesion["strategy"], "heuristic");
    assert_eq!(lesion["has_issues"], true);
    assert_eq!(lesion["regions"].as_array().expect("regions").len(), 1);
    assert_eq!(lesion["regions"][0]["dominant_feature"], "dark_spot");
    assert!(lesion["explanation"].as_str().expect("explanation").contains("Note:"));
    assert!(lesion["timings_ms"]["detect"].is_number());
    assert!(lesion.get("classification").is_none());

    for stem in ["clear", "lesion"] {
        let overlay = overlays.join(format!("{stem}_heatmap.png"));
        assert!(overlay.exists(), "missing {}", overlay.display());
        assert_eq!(image::image_dimensions(&overlay)?, (128, 128));
    }
    Ok(())
}

#[test]
fn unloadable_model_falls_back_to_heuristics() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("skin.png");
    write_skin(&image_path, true)?;
    let json_path = work_dir.path().join("report.json");

    let mut cmd = cargo_bin_cmd!("skintelli");
    cmd.current_dir(work_dir.path())
        .arg("--input")
        .arg(&image_path)
        .arg("--strategy")
        .arg("model")
        .arg("--model")
        .arg(work_dir.path().join("missing.onnx"))
        .arg("--json")
        .arg(&json_path);
    cmd.assert().success();

    let report = read_report(&json_path)?;
    assert_eq!(report["images"][0]["strategy"], "heuristic");
    Ok(())
}

#[test]
fn report_goes_to_stdout_without_json_flag() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("skin.bmp");
    write_skin(&image_path, false)?;

    let mut cmd = cargo_bin_cmd!("skintelli");
    let output = cmd
        .current_dir(work_dir.path())
        .arg("--input")
        .arg(&image_path)
        .output()?;
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["analyzed"], 1);
    assert!(report["images"][0].get("overlay").is_none());
    Ok(())
}

#[test]
fn undersized_images_fail_validation() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let image_path = work_dir.path().join("tiny.png");
    RgbImage::from_pixel(32, 32, Rgb([200, 160, 140])).save(&image_path)?;

    let mut cmd = cargo_bin_cmd!("skintelli");
    cmd.current_dir(work_dir.path())
        .arg("--input")
        .arg(&image_path);
    cmd.assert().failure();

    let mut cmd = cargo_bin_cmd!("skintelli");
    cmd.current_dir(work_dir.path())
        .arg("--input")
        .arg(&image_path)
        .arg("--no-validate");
    cmd.assert().success();
    Ok(())
}

#[test]
fn directory_without_images_fails() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    fs::write(work_dir.path().join("readme.md"), "nothing here")?;

    let mut cmd = cargo_bin_cmd!("skintelli");
    cmd.current_dir(work_dir.path())
        .arg("--input")
        .arg(work_dir.path());
    cmd.assert().failure();
    Ok(())
}
