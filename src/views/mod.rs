//! Section toggling for the console shell.
//!
//! Exactly one section is visible at a time. Switching sections is
//! synchronous; a section may carry a refresh callback that runs each time
//! it is shown.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Dashboard,
    CreateDriver,
    ManageDrivers,
    MonitorDrivers,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Dashboard,
        Section::CreateDriver,
        Section::ManageDrivers,
        Section::MonitorDrivers,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::CreateDriver => "createDriver",
            Section::ManageDrivers => "manageDrivers",
            Section::MonitorDrivers => "monitorDrivers",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Dashboard => "Admin Dashboard",
            Section::CreateDriver => "Create Driver Account",
            Section::ManageDrivers => "Manage Drivers",
            Section::MonitorDrivers => "Monitor Drivers",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSection(pub String);

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.id() == raw)
            .ok_or_else(|| UnknownSection(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionVisibility {
    pub section: Section,
    pub visible: bool,
    pub nav_active: bool,
}

/// What the shell should display after a switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub current: Section,
    pub title: &'static str,
    pub sections: Vec<SectionVisibility>,
}

pub type RefreshCallback = Box<dyn Fn() + Send + Sync>;

pub struct ViewRouter {
    current: Section,
    callbacks: HashMap<Section, RefreshCallback>,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self {
            current: Section::Dashboard,
            callbacks: HashMap::new(),
        }
    }

    pub fn on_show(&mut self, section: Section, callback: RefreshCallback) {
        self.callbacks.insert(section, callback);
    }

    pub fn current(&self) -> Section {
        self.current
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            current: self.current,
            title: self.current.title(),
            sections: Section::ALL
                .into_iter()
                .map(|section| SectionVisibility {
                    section,
                    visible: section == self.current,
                    nav_active: section == self.current,
                })
                .collect(),
        }
    }

    pub fn show(&mut self, section: Section) -> ViewState {
        self.current = section;
        if let Some(callback) = self.callbacks.get(&section) {
            callback();
        }
        self.state()
    }

    /// Like [`ViewRouter::show`] for raw identifiers; unknown ones change nothing.
    pub fn show_named(&mut self, raw: &str) -> Result<ViewState, UnknownSection> {
        let section = raw.parse::<Section>()?;
        Ok(self.show(section))
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}
