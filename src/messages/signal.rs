//! Navigation signals - one per completed workflow

use std::fmt;

/// A named transition, optionally tied to a stored request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Home,
    Browse,
    Create,
    ImportCurl,
    About,
    Exit,
    /// Request detail menu; `display` renders the details box first
    Select { name: String, display: bool },
    Run(String),
    Curl(String),
    Edit(String),
    Delete(String),
    /// A workflow failed; carries the user-facing message
    Failed(String),
}

impl Signal {
    pub fn select(name: impl Into<String>) -> Self {
        Signal::Select {
            name: name.into(),
            display: true,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Home => f.write_str("home"),
            Signal::Browse => f.write_str("browse"),
            Signal::Create => f.write_str("create"),
            Signal::ImportCurl => f.write_str("import-curl"),
            Signal::About => f.write_str("about"),
            Signal::Exit => f.write_str("exit"),
            Signal::Select { name, .. } => write!(f, "select({})", name),
            Signal::Run(name) => write!(f, "run({})", name),
            Signal::Curl(name) => write!(f, "curl({})", name),
            Signal::Edit(name) => write!(f, "edit({})", name),
            Signal::Delete(name) => write!(f, "delete({})", name),
            Signal::Failed(_) => f.write_str("failed"),
        }
    }
}
