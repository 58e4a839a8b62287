//! Synchronization between the driver's widget graph and [`ConfigNode`].
//!
//! Reads snapshot a whole settings group. Writes address a single widget by
//! name and commit the full graph back through the driver; dotted paths are
//! not writable.

mod read;
mod write;
#[cfg(test)]
mod tests;

pub use read::{convert_widget, find_widget};
pub use write::{parse_value, step_value};

use crate::driver::{Driver, Widget, WidgetValue};
use crate::error::SettingsError;
use crate::tree::ConfigNode;
use tracing::{debug, info};

/// Translator between driver widgets and the serializable tree
#[derive(Debug, Clone)]
pub struct ConfigSync {
    root_group: String,
}

impl ConfigSync {
    pub fn new<S: Into<String>>(root_group: S) -> Self {
        Self {
            root_group: root_group.into(),
        }
    }

    /// Snapshot the configured settings group
    pub fn read(&self, driver: &mut dyn Driver) -> Result<ConfigNode, SettingsError> {
        let root = driver.get_config_tree()?;
        let group = find_widget(root.as_ref(), &self.root_group).ok_or_else(|| {
            SettingsError::GroupNotFound {
                name: self.root_group.clone(),
            }
        })?;

        let tree = convert_widget(group).ok_or_else(|| SettingsError::GroupNotFound {
            name: self.root_group.clone(),
        })?;
        debug!(
            "Read settings group '{}' with {} leaves",
            self.root_group,
            tree.leaf_count()
        );
        Ok(tree)
    }

    /// Parse `value` according to the widget's type and commit it
    pub fn write(
        &self,
        driver: &mut dyn Driver,
        name: &str,
        value: &str,
    ) -> Result<(), SettingsError> {
        self.modify(driver, name, |widget| parse_value(widget, value))?;
        info!("Setting '{}' set to '{}'", name, value);
        Ok(())
    }

    /// Advance a widget's current value by one step and commit it
    pub fn step(&self, driver: &mut dyn Driver, name: &str) -> Result<WidgetValue, SettingsError> {
        let value = self.modify(driver, name, step_value)?;
        info!("Setting '{}' stepped to {:?}", name, value);
        Ok(value)
    }

    /// Locate `name`, compute its new value, apply it and commit the graph
    pub fn modify<F>(
        &self,
        driver: &mut dyn Driver,
        name: &str,
        f: F,
    ) -> Result<WidgetValue, SettingsError>
    where
        F: FnOnce(&dyn Widget) -> Result<WidgetValue, SettingsError>,
    {
        if name.contains('.') {
            return Err(SettingsError::DeepPath {
                path: name.to_string(),
            });
        }

        let mut root = driver.get_config_tree()?;
        let value = {
            let widget = root
                .child_by_name_mut(name)
                .ok_or_else(|| SettingsError::ChildNotFound {
                    name: name.to_string(),
                })?;
            if widget.is_readonly() {
                return Err(SettingsError::ReadOnly {
                    name: name.to_string(),
                });
            }

            let value = f(&*widget)?;
            widget.set_value(value.clone())?;
            value
        };

        driver.set_config(root.as_ref())?;
        Ok(value)
    }
}
