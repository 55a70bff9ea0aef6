//! Module/action header tagging
//!
//! Every outgoing call is annotated with `X-Module` / `X-Action` headers
//! picked from an ordered table of path-substring rules. All rules are
//! checked; the last matching rule wins.

use serde::{Deserialize, Serialize};

/// Header naming the portal module behind a call
pub const MODULE_HEADER: &str = "X-Module";
/// Header describing the action being performed
pub const ACTION_HEADER: &str = "X-Action";

/// One path-substring rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTag {
    /// Substring matched against the request path
    pub path: String,
    pub module: String,
    pub action: String,
}

impl RouteTag {
    pub fn new(path: &str, module: &str, action: &str) -> Self {
        Self {
            path: path.to_string(),
            module: module.to_string(),
            action: action.to_string(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        !self.path.is_empty() && path.contains(&self.path)
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTagTable {
    rules: Vec<RouteTag>,
}

impl RouteTagTable {
    pub fn new(rules: Vec<RouteTag>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RouteTag] {
        &self.rules
    }

    /// The portal's built-in rules
    pub fn builtin() -> Vec<RouteTag> {
        vec![
            RouteTag::new("/logout", "log_out", "user Logout attempt"),
            RouteTag::new("/getstatscom", "Statistics Data", "Fetching Incubatees Statistics data"),
            RouteTag::new("/getcombyfield", "Chart Data", "Fetching data by Field of work"),
            RouteTag::new("/getcombystage", "Chart Data", "Fetching data by company Stage"),
            RouteTag::new("/getcollecteddocsdash", "List of Documents", "Fetching List of Collected Documents"),
            RouteTag::new("/getincubatessdash", "List of Incubatees", "Fetching List of Incubatees"),
            RouteTag::new("/changepassword", "Change Password", "Changing User Password"),
            RouteTag::new("/getspocs", "SPOCS", "Fetching Incubatee SPOCS Details"),
            RouteTag::new("/getfileurl", "Chat Module", "Fetching document preview URL"),
            RouteTag::new("/chat/close", "Chat Module", "chat close attempt"),
            RouteTag::new("/getchatlist", "Chat Module", "Fetching chat list"),
            RouteTag::new("/initiate", "Chat Module", "Creating new chat"),
            RouteTag::new("/getchatdetails", "Chat Module", "Fetching chat details"),
            RouteTag::new("/chat/send", "Chat Module", "Sending message in chat"),
        ]
    }

    /// Last rule whose substring occurs in `path`
    pub fn resolve(&self, path: &str) -> Option<&RouteTag> {
        self.rules.iter().filter(|rule| rule.matches(path)).last()
    }
}

impl Default for RouteTagTable {
    fn default() -> Self {
        Self::new(Self::builtin())
    }
}
