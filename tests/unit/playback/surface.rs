use super::*;
use crate::foundation::core::Canvas;

#[test]
fn in_memory_surface_records_blits_and_resizes() {
    let mut s = InMemorySurface::new();
    s.resize(2, 1).unwrap();
    s.blit(&FrameRGBA::transparent(Canvas::new(2, 1))).unwrap();
    assert_eq!(s.size(), Some((2, 1)));
    assert_eq!(s.resizes(), &[(2, 1)]);
    assert_eq!(s.blits().len(), 1);
    assert_eq!(s.last().unwrap().width, 2);

    s.clear();
    assert!(s.blits().is_empty());
    assert_eq!(s.size(), Some((2, 1)));
}

#[test]
fn png_sequence_surface_writes_decodable_files() {
    let dir = std::path::PathBuf::from("target").join("png_sequence_surface");
    let _ = std::fs::remove_dir_all(&dir);
    let mut s = PngSequenceSurface::new(&dir).unwrap();

    let mut frame = FrameRGBA::transparent(Canvas::new(2, 2));
    frame.data[..4].copy_from_slice(&[10, 20, 30, 255]);
    s.blit(&frame).unwrap();
    assert_eq!(s.written(), 1);

    let img = image::open(dir.join("blit_00000.png")).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (2, 2));
    assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
    assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 0]);
}

#[test]
fn png_sequence_surface_rejects_empty_size() {
    let dir = std::path::PathBuf::from("target").join("png_sequence_surface_empty");
    let mut s = PngSequenceSurface::new(&dir).unwrap();
    assert!(matches!(s.resize(0, 4), Err(PlayerError::Surface(_))));
}
