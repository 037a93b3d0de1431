//! Role-based selection of the faculty or student home view.

use serde::Serialize;
use tracing::warn;

use crate::models::Role;

/// The two mutually exclusive rendering branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum HomeView {
    Faculty,
    Student,
}

/// What a home view lets its user do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum Capability {
    MarkAttendance,
    ViewAttendance,
    ManageAssignments,
    SubmitAssignments,
    ManageEvents,
    ViewEvents,
    ReviewLeave,
    ApplyLeave,
    ViewResources,
    ViewProfile,
}

const FACULTY_CAPABILITIES: &[Capability] = &[
    Capability::MarkAttendance,
    Capability::ManageAssignments,
    Capability::ManageEvents,
    Capability::ReviewLeave,
    Capability::ViewResources,
    Capability::ViewProfile,
];

const STUDENT_CAPABILITIES: &[Capability] = &[
    Capability::ViewAttendance,
    Capability::SubmitAssignments,
    Capability::ViewEvents,
    Capability::ApplyLeave,
    Capability::ViewProfile,
];

impl HomeView {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            HomeView::Faculty => FACULTY_CAPABILITIES,
            HomeView::Student => STUDENT_CAPABILITIES,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn title(&self) -> &'static str {
        match self {
            HomeView::Faculty => "Faculty Dashboard",
            HomeView::Student => "Student Dashboard",
        }
    }
}

impl From<Role> for HomeView {
    fn from(role: Role) -> Self {
        match role {
            Role::Faculty => HomeView::Faculty,
            Role::Student => HomeView::Student,
        }
    }
}

impl Capability {
    pub fn label(&self) -> &'static str {
        match self {
            Capability::MarkAttendance => "Mark attendance",
            Capability::ViewAttendance => "View attendance",
            Capability::ManageAssignments => "Manage assignments",
            Capability::SubmitAssignments => "Submit assignments",
            Capability::ManageEvents => "Manage events",
            Capability::ViewEvents => "View events",
            Capability::ReviewLeave => "Review leave requests",
            Capability::ApplyLeave => "Apply for leave",
            Capability::ViewResources => "Resources",
            Capability::ViewProfile => "Profile",
        }
    }
}

/// Pick the home view for a raw role string. Unrecognized roles get the
/// student view, which grants the least.
pub fn resolve_home_view(role: &str) -> HomeView {
    match Role::parse(role) {
        Some(role) => role.into(),
        None => {
            warn!(role = %role, "Unrecognized role, falling back to student view");
            HomeView::Student
        }
    }
}
