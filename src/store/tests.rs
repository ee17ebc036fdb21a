use super::*;
use crate::spectrum::{SpectrumBuilder, SpectrumType};

fn raw(store: &mut SpectrumStore, spectrum_type: SpectrumType, level: f64) -> Spectrum {
    SpectrumBuilder::new(store.allocate_scan_number(), spectrum_type)
        .integration_time(100_000)
        .wavelengths(vec![400.0, 500.0])
        .counts(vec![level, level])
        .build()
        .unwrap()
}

#[test]
fn test_append_updates_matching_slot() {
    let mut store = SpectrumStore::new();
    let dark = raw(&mut store, SpectrumType::Dark, 100.0);
    let reference = raw(&mut store, SpectrumType::Reference, 1000.0);

    assert_eq!(store.append(dark), 0);
    assert_eq!(store.append(reference), 1);

    assert_eq!(store.slot_index(Slot::Dark), Some(0));
    assert_eq!(store.slot_index(Slot::Reference), Some(1));
    assert!(store.slot(Slot::Current).is_none());
    assert!(matches!(
        store.require(Slot::Current),
        Err(SpectrometerError::SlotNotSet(Slot::Current))
    ));
}

#[test]
fn test_overwriting_slot_keeps_history() {
    let mut store = SpectrumStore::new();
    let first = raw(&mut store, SpectrumType::Reference, 1000.0);
    let second = raw(&mut store, SpectrumType::Reference, 1200.0);
    store.append(first);
    store.append(second);

    assert_eq!(store.len(), 2);
    assert_eq!(store.slot_index(Slot::Reference), Some(1));

    store.set_slot(Slot::Reference, 0).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.require(Slot::Reference).unwrap().counts().get(0), Some(1000.0));
    assert_eq!(store.get(1).unwrap().counts().get(0), Some(1200.0));
}

#[test]
fn test_set_slot_out_of_range() {
    let mut store = SpectrumStore::new();
    let dark = raw(&mut store, SpectrumType::Dark, 5.0);
    store.append(dark);

    assert!(matches!(
        store.set_slot(Slot::Dark, 4),
        Err(SpectrometerError::IndexOutOfRange { index: 4, len: 1 })
    ));
}

#[test]
fn test_derived_entries_are_history_only() {
    let mut store = SpectrumStore::new();
    let absorbance = SpectrumBuilder::new(store.allocate_scan_number(), SpectrumType::Absorbance)
        .integration_time(10)
        .wavelengths(vec![400.0])
        .counts(vec![0.3])
        .build()
        .unwrap();
    let index = store.append(absorbance);

    for slot in Slot::ALL {
        assert!(store.slot_index(slot).is_none());
    }
    assert!(matches!(
        store.set_slot(Slot::Reference, index),
        Err(SpectrometerError::InvalidParameter(_))
    ));
}

#[test]
fn test_scan_numbers_never_reused() {
    let mut store = SpectrumStore::new();
    let a = store.allocate_scan_number();
    let b = store.allocate_scan_number();
    assert!(b > a);

    // A pushed spectrum with a larger number advances the counter
    let spectrum = SpectrumBuilder::new(41, SpectrumType::Sample)
        .integration_time(10)
        .wavelengths(vec![400.0])
        .counts(vec![1.0])
        .build()
        .unwrap();
    store.push(spectrum);
    assert_eq!(store.peek_scan_number(), 42);
}

#[test]
fn test_resolve_reference() {
    let mut store = SpectrumStore::new();
    assert!(matches!(
        store.resolve_reference(None),
        Err(SpectrometerError::SlotNotSet(Slot::Reference))
    ));

    let sample = raw(&mut store, SpectrumType::Sample, 700.0);
    let reference = raw(&mut store, SpectrumType::Reference, 1000.0);
    store.append(sample);
    store.append(reference);

    assert_eq!(store.resolve_reference(None).unwrap().scan_number(), 1);
    assert_eq!(store.resolve_reference(Some(0)).unwrap().scan_number(), 0);
}

#[test]
fn test_describe_marks_slots() {
    let mut store = SpectrumStore::new();
    let dark = raw(&mut store, SpectrumType::Dark, 100.0);
    store.append(dark);

    let description = store.describe();
    assert_eq!(description.rows.len(), 1);
    assert_eq!(description.rows[0].slots, vec![Slot::Dark]);

    let text = description.to_string();
    assert!(text.starts_with("Scan\tDateTime\tSpectrumType"));
    assert!(text.contains("\tdark\tdark\t"));
}

#[test]
fn test_manifest_from_store() {
    let mut store = SpectrumStore::new();
    let dark = raw(&mut store, SpectrumType::Dark, 100.0);
    let sample = raw(&mut store, SpectrumType::Sample, 600.0);
    store.append(dark);
    store.append(sample);

    let names = vec!["Scan_0_dark.xy".to_string(), "Scan_1_sample.xy".to_string()];
    let manifest = Manifest::from_store(uuid::Uuid::new_v4(), Some("SIM".into()), &store, &names);

    assert_eq!(manifest.entries.len(), 2);
    assert_eq!(manifest.slots.get("dark"), Some(&0));
    assert_eq!(manifest.slots.get("current"), Some(&1));
    assert!(!manifest.slots.contains_key("reference"));

    let json = manifest.to_json().unwrap();
    assert!(json.contains("\"spectrum_type\": \"dark\""));
    let back = Manifest::from_json(&json).unwrap();
    assert_eq!(back.entries[1].file_name, "Scan_1_sample.xy");
    assert_eq!(back.entries[0].spectrum_type, SpectrumType::Dark);
    assert_eq!(back.session_id, manifest.session_id);
}

#[test]
fn test_manifest_save_replaces_previous() {
    let dir = tempfile::tempdir().unwrap();
    let store = SpectrumStore::new();
    let first = Manifest::from_store(uuid::Uuid::new_v4(), None, &store, &[]);
    let second = Manifest::from_store(uuid::Uuid::new_v4(), None, &store, &[]);

    first.save(dir.path()).unwrap();
    let path = second.save(dir.path()).unwrap();
    assert_eq!(path, dir.path().join(MANIFEST_FILE_NAME));

    let back = Manifest::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back.session_id, second.session_id);
    assert!(back.device.is_none());
}
