use crate::error::NamingError;
use crate::metadata::ImageDescriptor;
use crate::pattern::NamingPattern;
use crate::registry::NameRegistry;
use std::path::{Path, PathBuf};

/// Computes the canonical target path for a descriptor whose date is known.
///
/// The target lives next to the original (or below it, for nested layouts)
/// as `<base>_<seq>.<ext>`, where `seq` is a zero-padded, four-digit number
/// drawn from the registry. Every name carries a suffix, the first one
/// included, and extensions are lowercased.
pub fn generate_name(
    desc: &mut ImageDescriptor,
    pattern: NamingPattern,
    registry: &NameRegistry,
) -> Result<PathBuf, NamingError> {
    let original = desc.original_path();
    let date = desc
        .date
        .ok_or_else(|| NamingError::MissingDate(original.to_path_buf()))?;
    if original.file_name().is_none() {
        return Err(NamingError::NoFileName(original.to_path_buf()));
    }

    let dir = original.parent().unwrap_or_else(|| Path::new(""));
    let ext = lowercase_extension(original);
    let base = pattern.format_date(&date);

    let seq = registry.next_sequence(&base);

    let target = dir.join(format!("{base}_{seq:04}{ext}"));
    desc.new_path = Some(target.clone());
    Ok(target)
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::generate_name;
    use crate::error::NamingError;
    use crate::metadata::ImageDescriptor;
    use crate::pattern::NamingPattern;
    use crate::registry::NameRegistry;
    use chrono::{Local, TimeZone};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    fn dated(path: &str) -> ImageDescriptor {
        let mut desc = ImageDescriptor::new(path);
        desc.date = Some(Local.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        desc
    }

    #[test]
    fn first_name_carries_zero_suffix_and_lowercase_extension() {
        let registry = NameRegistry::new();
        let mut desc = dated("/photos/trip/IMG_0001.JPG");

        let target =
            generate_name(&mut desc, NamingPattern::DashedDate, &registry).expect("name");
        assert_eq!(target, PathBuf::from("/photos/trip/2024-05-01_0000.jpg"));
        assert_eq!(desc.new_path, Some(target.clone()));
        // only an actual move claims the path
        assert!(!registry.is_reserved(&target));
    }

    #[test]
    fn collisions_increment_suffix() {
        let registry = NameRegistry::new();
        let mut a = dated("/photos/a.jpg");
        let mut b = dated("/photos/b.HEIC");

        generate_name(&mut a, NamingPattern::DashedDate, &registry).expect("name a");
        let second = generate_name(&mut b, NamingPattern::DashedDate, &registry).expect("name b");
        assert_eq!(second, PathBuf::from("/photos/2024-05-01_0001.heic"));
    }

    #[test]
    fn nested_pattern_places_file_in_subdirectories() {
        let registry = NameRegistry::new();
        let mut desc = dated("/photos/a.jpeg");

        let target =
            generate_name(&mut desc, NamingPattern::NestedMonth, &registry).expect("name");
        assert_eq!(target, PathBuf::from("/photos/2024/05-01_0000.jpeg"));
    }

    #[test]
    fn missing_date_is_rejected() {
        let registry = NameRegistry::new();
        let mut desc = ImageDescriptor::new("/photos/a.jpg");
        let err = generate_name(&mut desc, NamingPattern::DashedDate, &registry)
            .expect_err("no date yet");
        assert!(matches!(err, NamingError::MissingDate(_)));
        assert_eq!(registry.count("2024-05-01"), 0);
    }

    #[test]
    fn concurrent_generation_never_repeats_a_name() {
        let registry = Arc::new(NameRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| {
                            let mut desc = dated(&format!("/photos/w{worker}/IMG_{i}.jpg"));
                            generate_name(&mut desc, NamingPattern::DashedDate, &registry)
                                .expect("name")
                                .file_name()
                                .map(|n| n.to_string_lossy().to_string())
                                .unwrap_or_default()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let names: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("worker thread"))
            .collect();
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(names.len(), 800);
        assert_eq!(unique.len(), 800);
        assert!(unique.contains(&"2024-05-01_0799.jpg".to_string()));
    }
}
