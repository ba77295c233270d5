use thiserror::Error;

use crate::model::TestMapError;
use crate::navigation::NavigationError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Map(#[from] TestMapError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}
