use thiserror::Error;

use crate::api::RemoteError;
use crate::cache::PersistenceError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Latitude outside [-90, 90], longitude outside [-180, 180], or NaN.
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
