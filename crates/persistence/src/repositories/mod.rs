//! Repository implementations.

pub mod alert;
pub mod command;
pub mod device;
pub mod geofence;
pub mod location;

pub use alert::AlertRepository;
pub use command::{CommandError, CommandRepository};
pub use device::{DeviceRepository, RegistrationInput};
pub use geofence::GeofenceRepository;
pub use location::{LocationInput, LocationRepository};
