//! Domain model definitions.

pub mod alert;
pub mod command;
pub mod device;
pub mod geofence;
pub mod location;

pub use alert::{Alert, AlertSeverity, AlertType};
pub use command::{CommandStatus, CommandType, RemoteCommand};
pub use device::{Device, DeviceStatus, DeviceType};
pub use geofence::{GeoPoint, Geofence, GeofenceShape};
pub use location::{LocationSample, LocationSource};
