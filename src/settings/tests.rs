use super::*;
use crate::driver::{Driver, SimulatedDriver, SimulatedWidget, Widget, WidgetType, WidgetValue};
use crate::error::{DriverError, SettingsError};
use crate::tree::{ConfigKind, LeafValue, NodeBody};

fn ready_driver() -> SimulatedDriver {
    let mut driver = SimulatedDriver::new();
    driver.init().unwrap();
    driver
}

#[test]
fn test_read_mirrors_structure_and_kinds() {
    let mut driver = ready_driver();
    let tree = ConfigSync::new("main").read(&mut driver).unwrap();

    assert_eq!(tree.name, "main");
    assert_eq!(tree.kind(), ConfigKind::Section);
    let sections: Vec<&str> = tree.children().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        sections,
        ["actions", "settings", "status", "imgsettings", "capturesettings"]
    );

    let iso = tree.find("imgsettings.iso").unwrap();
    assert_eq!(iso.kind(), ConfigKind::Radio);
    assert_eq!(iso.value(), Some(LeafValue::Text("Auto".to_string())));

    let focus = tree.find("capturesettings.focusmode").unwrap();
    assert_eq!(focus.kind(), ConfigKind::Menu);

    let af = tree.find("actions.autofocusdrive").unwrap();
    assert_eq!(af.value(), Some(LeafValue::Toggle(false)));

    let zoom = tree.find("capturesettings.zoom").unwrap();
    assert_eq!(zoom.body, NodeBody::range(0.0, 0.0, 100.0, 1.0));
    assert!(zoom.choices().is_empty());

    let serial = tree.find("status.serialnumber").unwrap();
    assert_eq!(serial.kind(), ConfigKind::Text);
}

#[test]
fn test_choice_lists_match_driver_order() {
    let mut driver = ready_driver();
    let tree = ConfigSync::new("main").read(&mut driver).unwrap();
    let mut native = driver.get_config_tree().unwrap();

    for name in ["iso", "whitebalance", "f-number", "shutterspeed", "focusmode", "manualfocusdrive"] {
        let node = tree.find_by_name(name).unwrap();
        let widget = native.child_by_name_mut(name).unwrap();
        assert_eq!(node.choices(), widget.choices().as_slice(), "choices of {}", name);
    }
}

#[test]
fn test_buttons_and_dates_are_skipped() {
    let mut driver = ready_driver();
    let tree = ConfigSync::new("main").read(&mut driver).unwrap();
    assert!(tree.find("actions.syncdatetime").is_none());
    assert!(tree.find("settings.datetime").is_none());
    assert!(tree.find("settings.capturetarget").is_some());
}

#[test]
fn test_read_subgroup_and_empty_section() {
    let config = SimulatedWidget::window(
        "main",
        "Root",
        vec![
            SimulatedWidget::section("empty", "Nothing here", vec![]),
            SimulatedWidget::section(
                "imgsettings",
                "Image",
                vec![SimulatedWidget::text("owner", "Owner", "me")],
            ),
        ],
    )
    .with_ids(10);
    let mut driver = SimulatedDriver::new().with_config(config);
    driver.init().unwrap();

    let tree = ConfigSync::new("main").read(&mut driver).unwrap();
    let empty = tree.find("empty").unwrap();
    assert!(empty.is_section());
    assert!(empty.children().is_empty());
    assert_eq!(tree.id, 10);

    let group = ConfigSync::new("imgsettings").read(&mut driver).unwrap();
    assert_eq!(group.name, "imgsettings");
    assert_eq!(group.children().len(), 1);
}

#[test]
fn test_read_missing_group_fails() {
    let mut driver = ready_driver();
    let err = ConfigSync::new("nope").read(&mut driver).unwrap_err();
    assert!(matches!(err, SettingsError::GroupNotFound { .. }));
}

#[test]
fn test_read_driver_failure_propagates() {
    let mut driver = ready_driver();
    driver.control().fail_get_config(true);
    let err = ConfigSync::new("main").read(&mut driver).unwrap_err();
    assert!(matches!(err, SettingsError::Driver(DriverError::Call { .. })));
}

#[test]
fn test_write_then_read_round_trip() {
    let mut driver = ready_driver();
    let sync = ConfigSync::new("main");

    sync.write(&mut driver, "iso", "400").unwrap();
    sync.write(&mut driver, "reviewtime", "off").unwrap();
    sync.write(&mut driver, "zoom", "42").unwrap();
    sync.write(&mut driver, "d108", "0x2a").unwrap();

    let tree = sync.read(&mut driver).unwrap();
    assert_eq!(
        tree.find("imgsettings.iso").unwrap().value(),
        Some(LeafValue::Text("400".to_string()))
    );
    assert_eq!(
        tree.find("settings.reviewtime").unwrap().value(),
        Some(LeafValue::Toggle(false))
    );
    assert_eq!(
        tree.find("capturesettings.zoom").unwrap().value(),
        Some(LeafValue::Range(42.0))
    );
    assert_eq!(
        tree.find("capturesettings.d108").unwrap().value(),
        Some(LeafValue::Text("0x2a".to_string()))
    );
}

#[test]
fn test_write_rejects_bad_values() {
    let mut driver = ready_driver();
    let sync = ConfigSync::new("main");

    assert!(matches!(
        sync.write(&mut driver, "iso", "123"),
        Err(SettingsError::InvalidValue { .. })
    ));
    assert!(matches!(
        sync.write(&mut driver, "zoom", "150"),
        Err(SettingsError::InvalidValue { .. })
    ));
    assert!(matches!(
        sync.write(&mut driver, "zoom", "wide"),
        Err(SettingsError::InvalidValue { .. })
    ));
    assert!(matches!(
        sync.write(&mut driver, "reviewtime", "maybe"),
        Err(SettingsError::InvalidValue { .. })
    ));
    assert!(matches!(
        sync.write(&mut driver, "serialnumber", "1"),
        Err(SettingsError::ReadOnly { .. })
    ));
    assert!(matches!(
        sync.write(&mut driver, "missing", "1"),
        Err(SettingsError::ChildNotFound { .. })
    ));
}

#[test]
fn test_write_rejects_non_finite_range_values() {
    let mut driver = ready_driver();
    let sync = ConfigSync::new("main");

    for value in ["NaN", "inf", "-inf"] {
        assert!(
            matches!(
                sync.write(&mut driver, "zoom", value),
                Err(SettingsError::InvalidValue { .. })
            ),
            "zoom accepted {}",
            value
        );
    }

    let tree = sync.read(&mut driver).unwrap();
    assert_eq!(
        tree.find("capturesettings.zoom").unwrap().value(),
        Some(LeafValue::Range(0.0))
    );

    let mut native = driver.get_config_tree().unwrap();
    let zoom = native.child_by_name_mut("zoom").unwrap();
    assert!(zoom.set_value(WidgetValue::Range(f32::NAN)).is_err());
}

#[test]
fn test_write_rejects_dotted_paths() {
    let mut driver = ready_driver();
    let err = ConfigSync::new("main")
        .write(&mut driver, "imgsettings.iso", "400")
        .unwrap_err();
    assert!(matches!(err, SettingsError::DeepPath { .. }));
}

#[test]
fn test_failed_commit_leaves_value_unchanged() {
    let mut driver = ready_driver();
    let sync = ConfigSync::new("main");
    driver.control().fail_set_config(true);

    assert!(sync.write(&mut driver, "iso", "800").is_err());

    driver.control().fail_set_config(false);
    let tree = sync.read(&mut driver).unwrap();
    assert_eq!(
        tree.find("imgsettings.iso").unwrap().value(),
        Some(LeafValue::Text("Auto".to_string()))
    );
}

#[test]
fn test_step_per_kind() {
    let mut driver = ready_driver();
    let sync = ConfigSync::new("main");

    assert_eq!(
        sync.step(&mut driver, "autofocusdrive").unwrap(),
        WidgetValue::Toggle(true)
    );
    assert_eq!(
        sync.step(&mut driver, "zoom").unwrap(),
        WidgetValue::Range(1.0)
    );
    assert_eq!(
        sync.step(&mut driver, "colortemperature").unwrap(),
        WidgetValue::Range(5300.0)
    );
    assert_eq!(
        sync.step(&mut driver, "d108").unwrap(),
        WidgetValue::Text("1".to_string())
    );
    assert!(sync.step(&mut driver, "whitebalance").is_err());
}

#[test]
fn test_step_clamps_to_range_max() {
    let widget = SimulatedWidget::range("zoom", "Zoom", 99.5, 0.0, 100.0, 1.0);
    assert_eq!(widget.widget_type(), WidgetType::Range);
    assert_eq!(step_value(&widget).unwrap(), WidgetValue::Range(100.0));
}
