//! Which role may open which workflow, and where each role logs in.

use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, SerializeDisplay,
    DeserializeFromStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Role {
    ResponsiblePerson,
    DevelopmentOfficer,
    SiteEngineer,
    ProvincialDirector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Screen {
    AddActivity,
    ActivityList,
    ActivityManagement,
    AllocationPlanner,
    AllocationList,
    EngineerActivities,
    MyActivities,
    ApprovalReviewer,
    ReportGenerator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleProfile {
    pub role: Role,
    pub title: &'static str,
    /// `None` when the role has no server-side login and must be given a token.
    pub login_path: Option<&'static str>,
    pub register_path: Option<&'static str>,
    pub screens: &'static [Screen],
}

pub static ROLE_TABLE: [RoleProfile; 4] = [
    RoleProfile {
        role: Role::ResponsiblePerson,
        title: "Responsible Person",
        login_path: Some("user/responsible_person/login"),
        register_path: Some("user/responsible_person/register"),
        screens: &[Screen::AddActivity, Screen::ActivityList],
    },
    RoleProfile {
        role: Role::DevelopmentOfficer,
        title: "Development Officer",
        login_path: Some("dev_office/login"),
        register_path: Some("dev_office/register"),
        screens: &[
            Screen::AddActivity,
            Screen::ActivityManagement,
            Screen::AllocationPlanner,
            Screen::AllocationList,
        ],
    },
    RoleProfile {
        role: Role::SiteEngineer,
        title: "Site Engineer",
        login_path: Some("login/engineer"),
        register_path: Some("register/engineer"),
        screens: &[Screen::EngineerActivities, Screen::MyActivities],
    },
    RoleProfile {
        role: Role::ProvincialDirector,
        title: "Provincial Director",
        login_path: None,
        register_path: None,
        screens: &[Screen::ApprovalReviewer, Screen::ReportGenerator],
    },
];

impl Role {
    pub fn profile(self) -> &'static RoleProfile {
        let index = match self {
            Role::ResponsiblePerson => 0,
            Role::DevelopmentOfficer => 1,
            Role::SiteEngineer => 2,
            Role::ProvincialDirector => 3,
        };
        &ROLE_TABLE[index]
    }

    pub fn can_open(self, screen: Screen) -> bool {
        self.profile().screens.contains(&screen)
    }

    /// Roles allowed to open `screen`.
    pub fn with_access_to(screen: Screen) -> Vec<Role> {
        Role::iter().filter(|r| r.can_open(screen)).collect()
    }
}
