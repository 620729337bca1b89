use std::fmt;

/// Pages the voting panel can hand the user over to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// queue & execute page of the last proposal
    Execute,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Execute => "/execute",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The application router.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}
