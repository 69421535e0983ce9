use crate::core::Session;
use std::fmt::Write;

/// Terminal rendition of the session page.
pub fn render_report(session: &Session) -> String {
    let mut out = String::new();
    let threshold = session.settings().threshold_mb;

    let Some(size_mb) = session.original_size_mb() else {
        let _ = writeln!(out, "No image processed yet ({})", session.state().as_str());
        return out;
    };

    if let Some(image) = session.uploaded() {
        let _ = writeln!(out, "📷 {}", image.filename());
    }
    let _ = writeln!(out, "Original image size: {:.2} MB", size_mb);

    if session.variants().is_empty() {
        let _ = writeln!(out, "✅ Image size is under {}MB. No optimization needed.", threshold);
        return out;
    }

    let _ = writeln!(out, "⚠️  Image is larger than {}MB. Let's optimize it.", threshold);
    for variant in session.variants() {
        let _ = writeln!(
            out,
            "   {} Quality Preview (Simulated Size: {:.2} MB)",
            variant.quality,
            variant.simulated_size_mb()
        );
    }

    if let Some(quality) = session.selected_quality() {
        if let Some(variant) = session.variants().iter().find(|v| v.quality == quality) {
            let _ = writeln!(
                out,
                "Selected {} Quality - Simulated Size: {:.2} MB",
                quality,
                variant.simulated_size_mb()
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Quality, SessionSettings, UploadedImage};
    use tempfile::TempDir;

    #[test]
    fn large_image_report() {
        let root = TempDir::new().unwrap();
        let mut session = Session::create(SessionSettings::default(), root.path(), false).unwrap();
        session
            .process(UploadedImage::new("big.jpg", vec![0u8; 3 * 1024 * 1024]).unwrap())
            .unwrap();
        session.select(Quality::new(50).unwrap()).unwrap();

        let report = render_report(&session);
        assert!(report.contains("Original image size: 3.00 MB"));
        assert!(report.contains("Image is larger than 2MB. Let's optimize it."));
        assert!(report.contains("25% Quality Preview (Simulated Size: 0.75 MB)"));
        assert!(report.contains("Selected 50% Quality - Simulated Size: 1.50 MB"));
    }

    #[test]
    fn small_image_report() {
        let root = TempDir::new().unwrap();
        let mut session = Session::create(SessionSettings::default(), root.path(), false).unwrap();
        session
            .process(UploadedImage::new("small.png", vec![0u8; 1024]).unwrap())
            .unwrap();

        let report = render_report(&session);
        assert!(report.contains("Original image size: 0.00 MB"));
        assert!(report.contains("No optimization needed."));
        assert!(!report.contains("Quality Preview"));
    }

    #[test]
    fn empty_session_report() {
        let root = TempDir::new().unwrap();
        let session = Session::create(SessionSettings::default(), root.path(), false).unwrap();
        assert!(render_report(&session).contains("No image processed yet (idle)"));
    }
}
