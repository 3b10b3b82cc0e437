use anyhow::Result;
use image::{Rgb, RgbImage};

use motion_watch::{
    DetectorSettings, EndReason, FileConfig, FileSource, FrameSource, LogPresenter,
    MotionDetector, Pipeline, Verdict,
};

fn small_detector() -> MotionDetector {
    MotionDetector::new(DetectorSettings {
        working_width: 160,
        blur_kernel: 7,
        min_area: 100.0,
        ..DetectorSettings::default()
    })
    .expect("valid settings")
}

fn room_still() -> RgbImage {
    RgbImage::from_fn(320, 240, |x, y| {
        let shade = 70 + ((x / 8 + y / 8) % 4) as u8 * 10;
        Rgb([shade, shade, shade])
    })
}

fn visitor_still() -> RgbImage {
    let mut image = room_still();
    for y in 80..180 {
        for x in 120..200 {
            image.put_pixel(x, y, Rgb([235, 220, 200]));
        }
    }
    image
}

#[test]
fn image_directory_stream_is_classified_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    room_still().save(dir.path().join("frame_000.png"))?;
    room_still().save(dir.path().join("frame_001.png"))?;
    visitor_still().save(dir.path().join("frame_002.png"))?;
    visitor_still().save(dir.path().join("frame_003.png"))?;
    room_still().save(dir.path().join("frame_004.png"))?;

    let source = FileSource::new(FileConfig {
        path: dir.path().display().to_string(),
    })?;
    let summary = Pipeline::new(source, small_detector(), LogPresenter::new()).run()?;

    assert_eq!(summary.end, EndReason::SourceExhausted);
    assert_eq!(summary.frames_read, 5);
    assert_eq!(summary.bootstrapped, 1);
    assert_eq!(summary.occupied, 2);
    assert_eq!(summary.unoccupied, 2);
    Ok(())
}

#[test]
fn verdicts_follow_the_visitor_through_a_still_sequence() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stills = [room_still(), room_still(), visitor_still(), room_still()];
    for (i, still) in stills.iter().enumerate() {
        still.save(dir.path().join(format!("{i:03}.bmp")))?;
    }

    let mut source = FileSource::new(FileConfig {
        path: dir.path().display().to_string(),
    })?;
    source.connect()?;
    let mut detector = small_detector();

    let mut verdicts = Vec::new();
    while let Some(frame) = source.next_frame()? {
        verdicts.push(detector.process(frame)?.verdict());
    }
    assert_eq!(
        verdicts,
        vec![
            None,
            Some(Verdict::Unoccupied),
            Some(Verdict::Occupied),
            Some(Verdict::Unoccupied),
        ]
    );

    // The reference is still the first still; nothing rebaselined.
    let reference = detector.reference().expect("reference captured");
    assert_eq!(reference.width(), 160);
    Ok(())
}

#[test]
fn synthetic_clip_runs_to_completion() -> Result<()> {
    let source = FileSource::new(FileConfig {
        path: "stub://hallway".to_string(),
    })?;
    let summary = Pipeline::new(source, small_detector(), LogPresenter::new()).run()?;

    assert_eq!(summary.end, EndReason::SourceExhausted);
    assert_eq!(summary.frames_read, 150);
    assert_eq!(summary.bootstrapped, 1);
    assert_eq!(summary.occupied, 50);
    assert_eq!(summary.unoccupied, 99);
    Ok(())
}
