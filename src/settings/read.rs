use crate::driver::{Widget, WidgetType};
use crate::tree::{ConfigNode, NodeBody};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Find `name` at or below `widget`, depth-first
pub fn find_widget<'a>(widget: &'a dyn Widget, name: &str) -> Option<&'a dyn Widget> {
    if widget.name() == name {
        return Some(widget);
    }
    (0..widget.child_count())
        .filter_map(|i| widget.child(i))
        .find_map(|child| find_widget(child, name))
}

/// Convert a widget and everything below it.
///
/// Widgets with children become sections. Childless widgets are classified
/// by their native type; buttons, dates and leaves whose value cannot be read
/// through their typed accessor are left out.
pub fn convert_widget(widget: &dyn Widget) -> Option<ConfigNode> {
    let count = widget.child_count();
    if count > 0 {
        let mut seen = HashSet::new();
        let mut children = Vec::with_capacity(count);
        for child in (0..count).filter_map(|i| widget.child(i)) {
            if !seen.insert(child.name().to_string()) {
                warn!(
                    "Duplicate setting '{}' under '{}', keeping the first",
                    child.name(),
                    widget.name()
                );
                continue;
            }
            if let Some(node) = convert_widget(child) {
                children.push(node);
            }
        }
        return Some(node_with(widget, NodeBody::Section { children }));
    }

    let body = match leaf_body(widget) {
        Ok(Some(body)) => body,
        Ok(None) => {
            debug!(
                "Skipping '{}' of unsupported type {:?}",
                widget.name(),
                widget.widget_type()
            );
            return None;
        }
        Err(e) => {
            warn!("Skipping unreadable setting '{}': {}", widget.name(), e);
            return None;
        }
    };
    Some(node_with(widget, body))
}

fn node_with(widget: &dyn Widget, body: NodeBody) -> ConfigNode {
    ConfigNode {
        name: widget.name().to_string(),
        label: widget.label().to_string(),
        id: widget.id(),
        body,
    }
}

fn leaf_body(widget: &dyn Widget) -> crate::driver::DriverResult<Option<NodeBody>> {
    let body = match widget.widget_type() {
        WidgetType::Window | WidgetType::Section => NodeBody::Section {
            children: Vec::new(),
        },
        WidgetType::Text => NodeBody::text(widget.text_value()?),
        WidgetType::Radio => NodeBody::Radio {
            value: widget.text_value()?,
            choices: widget.choices(),
        },
        WidgetType::Menu => NodeBody::Menu {
            value: widget.text_value()?,
            choices: widget.choices(),
        },
        WidgetType::Toggle => NodeBody::toggle(widget.toggle_value()?),
        WidgetType::Range => {
            let (min, max, step) = widget.range_bounds()?;
            NodeBody::range(widget.range_value()?, min, max, step)
        }
        WidgetType::Button | WidgetType::Date => return Ok(None),
    };
    Ok(Some(body))
}
