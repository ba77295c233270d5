mod constraint;
mod context;
mod exit;
mod map;

pub use constraint::{QtiClass, TimeConstraint};
pub use context::{
    Action, ActionEndpoints, ContextProgress, ItemSessionState, NavigationMode, TestContext,
    TestState, UnknownItemSessionState, UnknownNavigationMode, UnknownTestState,
};
pub use exit::{ItemExitCode, MetaData, TestExitCode};
pub use map::{Item, Locator, Part, Section, TestMap, TestMapError};
