use facet::Facet;

/// Errors raised while building, mounting, or updating a virtual tree.
///
/// Nothing is rolled back when one of these propagates: host mutations
/// applied before the failure stay in place.
#[derive(Facet, Debug, Clone, PartialEq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum Error {
    /// component {component} must implement render
    MissingRender { component: String },

    /// component has no insertion point; mount it before updating
    NotMounted,

    /// component is already mounted
    AlreadyMounted,

    /// component has been unmounted
    Unmounted,

    /// component instance no longer exists
    Dropped,

    /// host node {node} does not exist
    UnknownNode { node: u64 },

    /// insertion point {point} does not exist
    UnknownPoint { point: u64 },

    /// host node is not an element
    NotAnElement,

    /// host node has no parent to position against
    DetachedSibling,

    /// {message}
    Handler { message: String },
}

impl Error {
    /// Failure raised from user code: a render function, a lifecycle hook,
    /// or an event handler.
    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
