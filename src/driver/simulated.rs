//! In-process camera used when no vendor driver is linked in, and by tests.

use super::{CameraEvent, Driver, DriverResult, RemoteFile, Widget, WidgetType, WidgetValue};
use crate::error::DriverError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
enum SimValue {
    None,
    Text(String),
    Toggle(bool),
    Range(f32),
}

/// Owned configuration widget of the simulated camera
#[derive(Debug, Clone)]
pub struct SimulatedWidget {
    name: String,
    label: String,
    id: i32,
    widget_type: WidgetType,
    children: Vec<SimulatedWidget>,
    choices: Vec<String>,
    value: SimValue,
    bounds: (f32, f32, f32),
    readonly: bool,
}

impl SimulatedWidget {
    fn new(name: &str, label: &str, widget_type: WidgetType, value: SimValue) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            id: 0,
            widget_type,
            children: Vec::new(),
            choices: Vec::new(),
            value,
            bounds: (0.0, 0.0, 0.0),
            readonly: false,
        }
    }

    pub fn window(name: &str, label: &str, children: Vec<SimulatedWidget>) -> Self {
        let mut widget = Self::new(name, label, WidgetType::Window, SimValue::None);
        widget.children = children;
        widget
    }

    pub fn section(name: &str, label: &str, children: Vec<SimulatedWidget>) -> Self {
        let mut widget = Self::new(name, label, WidgetType::Section, SimValue::None);
        widget.children = children;
        widget
    }

    pub fn text(name: &str, label: &str, value: &str) -> Self {
        Self::new(name, label, WidgetType::Text, SimValue::Text(value.to_string()))
    }

    pub fn radio(name: &str, label: &str, value: &str, choices: &[&str]) -> Self {
        let mut widget = Self::new(name, label, WidgetType::Radio, SimValue::Text(value.to_string()));
        widget.choices = choices.iter().map(|c| c.to_string()).collect();
        widget
    }

    pub fn menu(name: &str, label: &str, value: &str, choices: &[&str]) -> Self {
        let mut widget = Self::new(name, label, WidgetType::Menu, SimValue::Text(value.to_string()));
        widget.choices = choices.iter().map(|c| c.to_string()).collect();
        widget
    }

    pub fn toggle(name: &str, label: &str, value: bool) -> Self {
        Self::new(name, label, WidgetType::Toggle, SimValue::Toggle(value))
    }

    pub fn range(name: &str, label: &str, value: f32, min: f32, max: f32, step: f32) -> Self {
        let mut widget = Self::new(name, label, WidgetType::Range, SimValue::Range(value));
        widget.bounds = (min, max, step);
        widget
    }

    pub fn button(name: &str, label: &str) -> Self {
        Self::new(name, label, WidgetType::Button, SimValue::None)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, WidgetType::Date, SimValue::None)
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Assign driver ids depth-first, starting at `first`
    pub fn with_ids(mut self, first: i32) -> Self {
        let mut next = first;
        self.assign_ids(&mut next);
        self
    }

    fn assign_ids(&mut self, next: &mut i32) {
        self.id = *next;
        *next += 1;
        for child in &mut self.children {
            child.assign_ids(next);
        }
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut SimulatedWidget> {
        if let Some(index) = self.children.iter().position(|c| c.name == name) {
            return self.children.get_mut(index);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    /// Copy any widget graph into an owned simulated graph
    pub fn from_widget(widget: &dyn Widget) -> Self {
        let widget_type = widget.widget_type();
        let value = match widget_type {
            WidgetType::Text | WidgetType::Radio | WidgetType::Menu => widget
                .text_value()
                .map(SimValue::Text)
                .unwrap_or(SimValue::None),
            WidgetType::Toggle => widget
                .toggle_value()
                .map(SimValue::Toggle)
                .unwrap_or(SimValue::None),
            WidgetType::Range => widget
                .range_value()
                .map(SimValue::Range)
                .unwrap_or(SimValue::None),
            _ => SimValue::None,
        };

        let children = (0..widget.child_count())
            .filter_map(|i| widget.child(i))
            .map(SimulatedWidget::from_widget)
            .collect();

        Self {
            name: widget.name().to_string(),
            label: widget.label().to_string(),
            id: widget.id(),
            widget_type,
            children,
            choices: widget.choices(),
            value,
            bounds: widget.range_bounds().unwrap_or((0.0, 0.0, 0.0)),
            readonly: widget.is_readonly(),
        }
    }

    fn wrong_accessor(&self, accessor: &'static str) -> DriverError {
        DriverError::WrongAccessor {
            name: self.name.clone(),
            accessor,
        }
    }

    /// Settings graph resembling a typical DSLR
    pub fn default_tree() -> Self {
        Self::window(
            "main",
            "Camera and Driver Configuration",
            vec![
                Self::section(
                    "actions",
                    "Camera Actions",
                    vec![
                        Self::toggle("autofocusdrive", "Drive Canon DSLR Autofocus", false),
                        Self::radio(
                            "manualfocusdrive",
                            "Drive Canon DSLR Manual focus",
                            "None",
                            &["Near 3", "Near 2", "Near 1", "None", "Far 1", "Far 2", "Far 3"],
                        ),
                        Self::button("syncdatetime", "Set camera date and time to PC time"),
                    ],
                ),
                Self::section(
                    "settings",
                    "Camera Settings",
                    vec![
                        Self::date("datetime", "Camera Date and Time"),
                        Self::radio(
                            "capturetarget",
                            "Capture Target",
                            "Internal RAM",
                            &["Internal RAM", "Memory card"],
                        ),
                        Self::toggle("reviewtime", "Quick Review Time", true),
                    ],
                ),
                Self::section(
                    "status",
                    "Camera Status Information",
                    vec![
                        Self::text("manufacturer", "Camera Manufacturer", "Simulated Optics")
                            .readonly(),
                        Self::text("cameramodel", "Camera Model", "SIM-1").readonly(),
                        Self::text("serialnumber", "Serial Number", "000000000001").readonly(),
                        Self::text("batterylevel", "Battery Level", "100%").readonly(),
                    ],
                ),
                Self::section(
                    "imgsettings",
                    "Image Settings",
                    vec![
                        Self::radio(
                            "iso",
                            "ISO Speed",
                            "Auto",
                            &["Auto", "100", "200", "400", "800", "1600", "3200"],
                        ),
                        Self::radio(
                            "whitebalance",
                            "WhiteBalance",
                            "Auto",
                            &[
                                "Auto",
                                "Daylight",
                                "Shadow",
                                "Cloudy",
                                "Tungsten",
                                "Fluorescent",
                                "Flash",
                                "Manual",
                            ],
                        ),
                        Self::range("colortemperature", "Color Temperature", 5200.0, 2500.0, 10000.0, 100.0),
                    ],
                ),
                Self::section(
                    "capturesettings",
                    "Capture Settings",
                    vec![
                        Self::radio(
                            "f-number",
                            "Aperture",
                            "5.6",
                            &["2.8", "3.5", "4", "5.6", "8", "11", "16", "22"],
                        ),
                        Self::radio(
                            "shutterspeed",
                            "Shutter Speed",
                            "1/125",
                            &["1/4000", "1/1000", "1/250", "1/125", "1/60", "1/30", "1/4", "1", "30"],
                        ),
                        Self::menu(
                            "focusmode",
                            "Focus Mode",
                            "One Shot",
                            &["One Shot", "AI Focus", "AI Servo", "Manual"],
                        ),
                        Self::text("d108", "Focus Point", "0"),
                        Self::range("zoom", "Zoom", 0.0, 0.0, 100.0, 1.0),
                    ],
                ),
            ],
        )
        .with_ids(0)
    }
}

impl Widget for SimulatedWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn widget_type(&self) -> WidgetType {
        self.widget_type
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }

    fn child(&self, index: usize) -> Option<&dyn Widget> {
        self.children.get(index).map(|c| c as &dyn Widget)
    }

    fn child_by_name_mut(&mut self, name: &str) -> Option<&mut dyn Widget> {
        self.find_mut(name).map(|c| c as &mut dyn Widget)
    }

    fn choices(&self) -> Vec<String> {
        self.choices.clone()
    }

    fn text_value(&self) -> DriverResult<String> {
        match &self.value {
            SimValue::Text(value) => Ok(value.clone()),
            _ => Err(self.wrong_accessor("text")),
        }
    }

    fn toggle_value(&self) -> DriverResult<bool> {
        match self.value {
            SimValue::Toggle(value) => Ok(value),
            _ => Err(self.wrong_accessor("toggle")),
        }
    }

    fn range_value(&self) -> DriverResult<f32> {
        match self.value {
            SimValue::Range(value) => Ok(value),
            _ => Err(self.wrong_accessor("range")),
        }
    }

    fn range_bounds(&self) -> DriverResult<(f32, f32, f32)> {
        match self.widget_type {
            WidgetType::Range => Ok(self.bounds),
            _ => Err(self.wrong_accessor("range")),
        }
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn set_value(&mut self, value: WidgetValue) -> DriverResult<()> {
        if self.readonly {
            return Err(DriverError::call(
                "set_value",
                format!("'{}' is read-only", self.name),
            ));
        }

        self.value = match (self.widget_type, value) {
            (WidgetType::Text | WidgetType::Radio | WidgetType::Menu, WidgetValue::Text(v)) => {
                SimValue::Text(v)
            }
            (WidgetType::Toggle, WidgetValue::Toggle(v)) => SimValue::Toggle(v),
            (WidgetType::Range, WidgetValue::Range(v)) => {
                let (min, max, _) = self.bounds;
                if !v.is_finite() || v < min || v > max {
                    return Err(DriverError::call(
                        "set_value",
                        format!("{} outside {}..{}", v, min, max),
                    ));
                }
                SimValue::Range(v)
            }
            (widget_type, value) => {
                return Err(DriverError::call(
                    "set_value",
                    format!("{:?} does not accept {:?}", widget_type, value),
                ))
            }
        };
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ControlState {
    disconnected: bool,
    fail_get_config: bool,
    fail_set_config: bool,
    fail_capture_after: Option<u64>,
    fail_retrieve: bool,
    fail_delete: bool,
    fail_preview_after: Option<u64>,
    empty_preview_every: Option<u64>,
    captures: u64,
    deleted: u64,
    frames_served: u64,
    events_polled: u64,
    events: VecDeque<CameraEvent>,
}

/// Failure injection and counters shared with a [`SimulatedDriver`]
#[derive(Debug, Clone, Default)]
pub struct SimulatedControl {
    state: Arc<Mutex<ControlState>>,
}

impl SimulatedControl {
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state.lock().disconnected = disconnected;
    }

    pub fn fail_get_config(&self, fail: bool) {
        self.state.lock().fail_get_config = fail;
    }

    pub fn fail_set_config(&self, fail: bool) {
        self.state.lock().fail_set_config = fail;
    }

    /// Let `successes` more exposures succeed, then fail every trigger
    pub fn fail_capture_after(&self, successes: u64) {
        let mut state = self.state.lock();
        state.fail_capture_after = Some(state.captures + successes);
    }

    pub fn fail_retrieve(&self, fail: bool) {
        self.state.lock().fail_retrieve = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().fail_delete = fail;
    }

    /// Serve `frames` more preview frames, then fail
    pub fn fail_preview_after(&self, frames: u64) {
        let mut state = self.state.lock();
        state.fail_preview_after = Some(state.frames_served + frames);
    }

    /// Return an empty preview for every n-th fetch
    pub fn empty_preview_every(&self, n: u64) {
        self.state.lock().empty_preview_every = Some(n.max(1));
    }

    pub fn queue_event(&self, event: CameraEvent) {
        self.state.lock().events.push_back(event);
    }

    pub fn captures(&self) -> u64 {
        self.state.lock().captures
    }

    pub fn deleted_files(&self) -> u64 {
        self.state.lock().deleted
    }

    pub fn frames_served(&self) -> u64 {
        self.state.lock().frames_served
    }

    pub fn events_polled(&self) -> u64 {
        self.state.lock().events_polled
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().events.len()
    }
}

/// Camera driver backed entirely by memory
pub struct SimulatedDriver {
    initialized: bool,
    config: SimulatedWidget,
    files: BTreeMap<String, Vec<u8>>,
    preview_interval: Duration,
    preview_size: usize,
    preview_fetches: u64,
    control: SimulatedControl,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self {
            initialized: false,
            config: SimulatedWidget::default_tree(),
            files: BTreeMap::new(),
            preview_interval: Duration::ZERO,
            preview_size: 0,
            preview_fetches: 0,
            control: SimulatedControl::default(),
        }
    }

    pub fn with_config(mut self, config: SimulatedWidget) -> Self {
        self.config = config;
        self
    }

    /// Block each preview fetch for the given time, like a real sensor
    pub fn with_preview_interval(mut self, interval: Duration) -> Self {
        self.preview_interval = interval;
        self
    }

    /// Pad every preview frame to at least `bytes` with JPEG fill bytes
    pub fn with_preview_size(mut self, bytes: usize) -> Self {
        self.preview_size = bytes;
        self
    }

    pub fn control(&self) -> SimulatedControl {
        self.control.clone()
    }

    fn ensure_connected(&self, operation: &'static str) -> DriverResult<()> {
        if self.control.state.lock().disconnected {
            return Err(DriverError::NotFound);
        }
        if !self.initialized {
            return Err(DriverError::call(operation, "driver not initialized"));
        }
        Ok(())
    }
}

/// Minimal JPEG-framed payload: SOI, comment segment, EOI
fn fake_jpeg(comment: &str, padding: usize) -> Vec<u8> {
    let mut payload = comment.as_bytes().to_vec();
    payload.resize(payload.len() + padding, 0x20);
    let segment_len = (payload.len() + 2) as u16;

    let mut data = Vec::with_capacity(payload.len() + 8);
    data.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xFE]);
    data.extend_from_slice(&segment_len.to_be_bytes());
    data.extend_from_slice(&payload);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

impl Driver for SimulatedDriver {
    fn init(&mut self) -> DriverResult<()> {
        if self.control.state.lock().disconnected {
            self.initialized = false;
            return Err(DriverError::NotFound);
        }
        self.initialized = true;
        debug!("Simulated camera initialized");
        Ok(())
    }

    fn camera_present(&self) -> bool {
        self.initialized && !self.control.state.lock().disconnected
    }

    fn get_config_tree(&mut self) -> DriverResult<Box<dyn Widget>> {
        self.ensure_connected("get_config")?;
        if self.control.state.lock().fail_get_config {
            return Err(DriverError::call("get_config", "injected failure"));
        }
        Ok(Box::new(self.config.clone()))
    }

    fn set_config(&mut self, root: &dyn Widget) -> DriverResult<()> {
        self.ensure_connected("set_config")?;
        if self.control.state.lock().fail_set_config {
            return Err(DriverError::call("set_config", "injected failure"));
        }
        self.config = SimulatedWidget::from_widget(root);
        Ok(())
    }

    fn capture_still(&mut self, folder: &str, name: &str) -> DriverResult<RemoteFile> {
        self.ensure_connected("capture")?;
        let mut state = self.control.state.lock();
        if let Some(limit) = state.fail_capture_after {
            if state.captures >= limit {
                return Err(DriverError::call("capture", "injected failure"));
            }
        }
        state.captures += 1;

        let file = RemoteFile::new(folder, name);
        let key = file.to_string();
        let data = fake_jpeg(&format!("capture {} {}", state.captures, key), 512);
        state.events.push_back(CameraEvent::FileAdded(file.clone()));
        state.events.push_back(CameraEvent::CaptureComplete);
        drop(state);

        trace!("Simulated exposure stored at {}", key);
        self.files.insert(key, data);
        Ok(file)
    }

    fn retrieve_file(&mut self, file: &RemoteFile) -> DriverResult<Vec<u8>> {
        self.ensure_connected("file_get")?;
        if self.control.state.lock().fail_retrieve {
            return Err(DriverError::call("file_get", "injected failure"));
        }
        self.files
            .get(&file.to_string())
            .cloned()
            .ok_or_else(|| DriverError::call("file_get", format!("no such file {}", file)))
    }

    fn delete_remote_file(&mut self, file: &RemoteFile) -> DriverResult<()> {
        self.ensure_connected("file_delete")?;
        if self.control.state.lock().fail_delete {
            return Err(DriverError::call("file_delete", "injected failure"));
        }
        match self.files.remove(&file.to_string()) {
            Some(_) => {
                self.control.state.lock().deleted += 1;
                Ok(())
            }
            None => Err(DriverError::call(
                "file_delete",
                format!("no such file {}", file),
            )),
        }
    }

    fn fetch_preview_frame(&mut self) -> DriverResult<Vec<u8>> {
        self.ensure_connected("capture_preview")?;
        if !self.preview_interval.is_zero() {
            std::thread::sleep(self.preview_interval);
        }

        self.preview_fetches += 1;
        let mut state = self.control.state.lock();
        if let Some(limit) = state.fail_preview_after {
            if state.frames_served >= limit {
                return Err(DriverError::call("capture_preview", "injected failure"));
            }
        }
        if let Some(every) = state.empty_preview_every {
            if self.preview_fetches % every == 0 {
                return Ok(Vec::new());
            }
        }

        state.frames_served += 1;
        let sequence = state.frames_served;
        let mut frame = fake_jpeg(&format!("preview {}", sequence), (sequence % 64) as usize);
        if frame.len() < self.preview_size {
            // 0xFF fill is legal ahead of the EOI marker
            let eoi = frame.len() - 2;
            let fill = self.preview_size - frame.len();
            frame.splice(eoi..eoi, std::iter::repeat(0xFF).take(fill));
        }
        Ok(frame)
    }

    fn poll_event(&mut self, _timeout: Duration) -> DriverResult<CameraEvent> {
        self.ensure_connected("wait_for_event")?;
        let mut state = self.control.state.lock();
        state.events_polled += 1;
        Ok(state.events.pop_front().unwrap_or(CameraEvent::Timeout))
    }
}
